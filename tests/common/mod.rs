//! Common test utilities for E2E tests

use std::collections::HashMap;

use authgate::auth::Principal;
use authgate::{AppState, config};
use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;

pub const BASE_URL: &str = "http://localhost";
pub const COOKIE_NAME: &str = "authgate.session-token";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with GitHub enabled and Google disabled
    pub async fn new() -> Self {
        Self::with_github_endpoints(config::ProviderEndpoints::default()).await
    }

    /// Same as [`TestServer::new`], with GitHub talking to the given endpoints
    pub async fn with_github_endpoints(endpoints: config::ProviderEndpoints) -> Self {
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            auth: config::AuthConfig {
                secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 2_592_000,
                cookie_name: COOKIE_NAME.to_string(),
                login_path: "/auth/login".to_string(),
                dashboard_path: "/dashboard".to_string(),
            },
            providers: config::ProvidersConfig {
                google: config::ProviderCredentials {
                    client_id: Some("google-client-id".to_string()),
                    ..Default::default()
                },
                github: config::ProviderCredentials {
                    client_id: Some("test-client-id".to_string()),
                    client_secret: Some("test-client-secret".to_string()),
                    endpoints,
                },
            },
            logging: config::LoggingConfig::default(),
        };

        let state = AppState::new(config).unwrap();

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = authgate::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            client,
        }
    }

    /// Get URL for a request path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Principal used by authenticated tests
    pub fn test_principal() -> Principal {
        Principal {
            id: "gh-583231".to_string(),
            name: Some("Mona Lisa Octocat".to_string()),
            email: Some("mona@example.com".to_string()),
            image: None,
        }
    }

    /// Issue a signed session token for the test principal
    pub fn create_test_token(&self) -> String {
        let (_, signed) = self
            .state
            .issuer
            .issue(&Self::test_principal())
            .expect("Failed to create test token");
        signed
    }

    /// `Cookie` header value carrying a session token
    pub fn session_cookie(&self, token: &str) -> String {
        format!("{COOKIE_NAME}={token}")
    }
}

/// Read the `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// All `Set-Cookie` header values of a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

/// The `Set-Cookie` value for `name`, if the response sets it
pub fn find_set_cookie<'a>(set_cookies: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{name}=");
    set_cookies
        .iter()
        .map(String::as_str)
        .find(|c| c.starts_with(&prefix))
}

/// `name=value` part of a `Set-Cookie` value, ready for a `Cookie` header
pub fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie.split(';').next().unwrap_or_default()
}

pub const MOCK_CODE: &str = "mock-authorization-code";
pub const MOCK_ACCESS_TOKEN: &str = "gho_mock_access_token";

/// Local stand-in for GitHub's OAuth and REST endpoints
pub struct MockProvider {
    pub addr: String,
}

#[derive(Clone)]
struct MockProfile {
    public_email: Option<String>,
}

impl MockProvider {
    /// Start the mock; `public_email` is what `/user` reports
    pub async fn start(public_email: Option<&str>) -> Self {
        let profile = MockProfile {
            public_email: public_email.map(str::to_string),
        };
        let app = Router::new()
            .route("/login/oauth/access_token", post(mock_access_token))
            .route("/user", get(mock_user))
            .route("/user/emails", get(mock_user_emails))
            .with_state(profile);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr }
    }

    pub fn endpoints(&self) -> config::ProviderEndpoints {
        config::ProviderEndpoints {
            authorize_url: Some(format!("{}/login/oauth/authorize", self.addr)),
            token_url: Some(format!("{}/login/oauth/access_token", self.addr)),
            userinfo_url: Some(format!("{}/user", self.addr)),
            emails_url: Some(format!("{}/user/emails", self.addr)),
        }
    }
}

async fn mock_access_token(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
    let code_ok = form.get("code").map(String::as_str) == Some(MOCK_CODE);
    let secret_ok = form.get("client_secret").map(String::as_str) == Some("test-client-secret");

    if code_ok && secret_ok {
        Json(serde_json::json!({
            "access_token": MOCK_ACCESS_TOKEN,
            "token_type": "bearer",
            "scope": "read:user,user:email"
        }))
    } else {
        Json(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
    }
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {MOCK_ACCESS_TOKEN}"))
}

async fn mock_user(State(profile): State<MockProfile>, headers: HeaderMap) -> Response {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(serde_json::json!({
        "login": "octocat",
        "id": 583231,
        "name": "Mona Lisa Octocat",
        "email": profile.public_email,
        "avatar_url": null
    }))
    .into_response()
}

async fn mock_user_emails(headers: HeaderMap) -> Response {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(serde_json::json!([
        { "email": "octocat@users.noreply.github.com", "primary": false, "verified": true },
        { "email": "mona.private@example.com", "primary": true, "verified": true }
    ]))
    .into_response()
}

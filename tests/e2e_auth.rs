//! E2E tests for the sign-in, session and sign-out endpoints

mod common;

use common::{
    COOKIE_NAME, MOCK_CODE, MockProvider, TestServer, cookie_pair, find_set_cookie, location,
    set_cookies,
};

#[tokio::test]
async fn test_providers_lists_only_fully_configured() {
    let server = TestServer::new().await;

    let body: serde_json::Value = server
        .client
        .get(server.url("/api/auth/providers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(body.get("github").is_some());
    assert!(body.get("google").is_none());
    assert_eq!(body["github"]["name"], "GitHub");
    assert_eq!(
        body["github"]["callbackUrl"],
        "http://localhost/api/auth/callback/github"
    );
}

#[tokio::test]
async fn test_github_sign_in_sets_state_cookie_and_redirects() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/auth/signin/github?callbackUrl=%2Fsettings"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let target = location(&response);
    assert!(target.starts_with("https://github.com/login/oauth/authorize?"));
    assert!(target.contains("client_id=test-client-id"));
    assert!(target.contains("state="));
    assert!(target.contains("redirect_uri=http%3A%2F%2Flocalhost%2Fapi%2Fauth%2Fcallback%2Fgithub"));

    let set_cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect();
    assert!(set_cookies.iter().any(|c| c.starts_with("authgate.state=")));
    assert!(set_cookies.iter().any(|c| c.starts_with("authgate.callback-url=")));
}

#[tokio::test]
async fn test_disabled_provider_sign_in_is_not_found() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/auth/signin/google"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_callback_without_state_cookie_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/auth/callback/github?code=dummy&state=dummy"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/error?error=state_mismatch");
}

#[tokio::test]
async fn test_callback_with_mismatched_state_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/auth/callback/github?code=dummy&state=one"))
        .header("Cookie", "authgate.state=two")
        .send()
        .await
        .unwrap();

    assert_eq!(location(&response), "/auth/error?error=state_mismatch");

    let set_cookies = set_cookies(&response);
    for name in ["authgate.state", "authgate.callback-url"] {
        let cleared = find_set_cookie(&set_cookies, name)
            .unwrap_or_else(|| panic!("{name} not cleared: {set_cookies:?}"));
        assert!(cleared.contains("Max-Age=0"));
    }
}

#[tokio::test]
async fn test_callback_with_provider_error_redirects_to_error_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/auth/callback/github?error=access_denied"))
        .send()
        .await
        .unwrap();

    assert_eq!(location(&response), "/auth/error?error=access_denied");
}

#[tokio::test]
async fn test_session_is_empty_when_signed_out() {
    let server = TestServer::new().await;

    let body: serde_json::Value = server
        .client
        .get(server.url("/api/auth/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, serde_json::json!({}));
}

#[tokio::test]
async fn test_session_exposes_projected_user() {
    let server = TestServer::new().await;
    let token = server.create_test_token();

    let body: serde_json::Value = server
        .client
        .get(server.url("/api/auth/session"))
        .header("Cookie", server.session_cookie(&token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["user"]["id"], "gh-583231");
    assert_eq!(body["user"]["role"], "USER");
    assert_eq!(body["user"]["name"], "Mona Lisa Octocat");
    assert_eq!(body["user"]["email"], "mona@example.com");
    assert!(body["expires"].is_string());
}

#[tokio::test]
async fn test_sign_out_clears_session_cookie() {
    let server = TestServer::new().await;
    let token = server.create_test_token();

    let response = server
        .client
        .post(server.url("/api/auth/signout"))
        .header("Cookie", server.session_cookie(&token))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");

    let set_cookie_values: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect();
    assert!(
        set_cookie_values
            .iter()
            .any(|v| v.starts_with(&format!("{COOKIE_NAME}=")) && v.contains("Max-Age=0")),
        "expected cookie removal header, got: {set_cookie_values:?}"
    );
}

/// Run the sign-in redirect and return the CSRF state plus the `Cookie`
/// header the browser would send back to the callback.
async fn start_sign_in(server: &TestServer, mock: &MockProvider, query: &str) -> (String, String) {
    let response = server
        .client
        .get(server.url(&format!("/api/auth/signin/github{query}")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 307);
    let target = url::Url::parse(&location(&response)).unwrap();
    assert!(
        target
            .as_str()
            .starts_with(&format!("{}/login/oauth/authorize?", mock.addr))
    );
    let csrf_state = target
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter");

    let set_cookies = set_cookies(&response);
    let cookie_header = ["authgate.state", "authgate.callback-url"]
        .iter()
        .map(|name| cookie_pair(find_set_cookie(&set_cookies, name).unwrap()).to_string())
        .collect::<Vec<_>>()
        .join("; ");

    (csrf_state, cookie_header)
}

#[tokio::test]
async fn test_successful_callback_sets_session_and_redirects() {
    let mock = MockProvider::start(Some("mona@example.com")).await;
    let server = TestServer::with_github_endpoints(mock.endpoints()).await;

    let (csrf_state, cookie_header) =
        start_sign_in(&server, &mock, "?callbackUrl=%2Fsettings%3Ftab%3Dprofile").await;

    let response = server
        .client
        .get(server.url(&format!(
            "/api/auth/callback/github?code={MOCK_CODE}&state={csrf_state}"
        )))
        .header("Cookie", cookie_header)
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/settings?tab=profile");

    let set_cookies = set_cookies(&response);
    let session = find_set_cookie(&set_cookies, COOKIE_NAME)
        .unwrap_or_else(|| panic!("no session cookie: {set_cookies:?}"));
    assert!(session.contains("HttpOnly"));
    assert!(session.contains("SameSite=Lax"));
    assert!(session.contains("Path=/"));
    assert!(session.contains("Max-Age=2592000"));
    // plain http on localhost
    assert!(!session.contains("Secure"));

    for name in ["authgate.state", "authgate.callback-url"] {
        let cleared = find_set_cookie(&set_cookies, name).unwrap();
        assert!(cleared.contains("Max-Age=0"), "{name} not cleared: {cleared}");
    }

    // The issued cookie is accepted by the guard and carries the profile
    let response = server
        .client
        .get(server.url("/dashboard"))
        .header("Cookie", cookie_pair(session))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Mona Lisa Octocat"));
    assert!(body.contains("583231"));
    assert!(body.contains("mona@example.com"));
}

#[tokio::test]
async fn test_foreign_callback_url_lands_on_dashboard() {
    let mock = MockProvider::start(Some("mona@example.com")).await;
    let server = TestServer::with_github_endpoints(mock.endpoints()).await;

    let (csrf_state, cookie_header) =
        start_sign_in(&server, &mock, "?callbackUrl=https%3A%2F%2Fevil.example.net%2F").await;

    let response = server
        .client
        .get(server.url(&format!(
            "/api/auth/callback/github?code={MOCK_CODE}&state={csrf_state}"
        )))
        .header("Cookie", cookie_header)
        .send()
        .await
        .unwrap();

    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_private_github_email_falls_back_to_primary_address() {
    let mock = MockProvider::start(None).await;
    let server = TestServer::with_github_endpoints(mock.endpoints()).await;

    let (csrf_state, cookie_header) = start_sign_in(&server, &mock, "").await;

    let response = server
        .client
        .get(server.url(&format!(
            "/api/auth/callback/github?code={MOCK_CODE}&state={csrf_state}"
        )))
        .header("Cookie", cookie_header)
        .send()
        .await
        .unwrap();
    let set_cookies = set_cookies(&response);
    let session = find_set_cookie(&set_cookies, COOKIE_NAME).expect("session cookie");

    let body: serde_json::Value = server
        .client
        .get(server.url("/api/auth/session"))
        .header("Cookie", cookie_pair(session))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["user"]["email"], "mona.private@example.com");
    assert_eq!(body["user"]["id"], "583231");
}

#[tokio::test]
async fn test_rejected_code_redirects_to_error_and_clears_state() {
    let mock = MockProvider::start(Some("mona@example.com")).await;
    let server = TestServer::with_github_endpoints(mock.endpoints()).await;

    let (csrf_state, cookie_header) = start_sign_in(&server, &mock, "").await;

    let response = server
        .client
        .get(server.url(&format!(
            "/api/auth/callback/github?code=expired-code&state={csrf_state}"
        )))
        .header("Cookie", cookie_header)
        .send()
        .await
        .unwrap();

    assert_eq!(location(&response), "/auth/error?error=callback_failed");
    let set_cookies = set_cookies(&response);
    assert!(find_set_cookie(&set_cookies, COOKIE_NAME).is_none());
    let cleared = find_set_cookie(&set_cookies, "authgate.state").unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

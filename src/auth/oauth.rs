//! Social login flow
//!
//! Implements the OAuth 2.0 authorization code flow against the enabled
//! identity providers and manages the session cookie.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::Deserialize;

use super::claims::Principal;
use super::cookies;
use super::middleware::MaybeSession;
use super::providers::{Provider, ProviderEmail, primary_verified_email};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::SIGN_INS_TOTAL;

/// Create authentication router
///
/// Routes:
/// - GET /api/auth/providers - Enabled providers
/// - GET /api/auth/session - Current session view
/// - GET /api/auth/signin/:provider - Redirect to provider
/// - GET /api/auth/callback/:provider - OAuth callback
/// - POST /api/auth/signout - Sign out
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/providers", get(list_providers))
        .route("/api/auth/session", get(current_session))
        .route("/api/auth/signin/:provider", get(sign_in))
        .route("/api/auth/callback/:provider", get(callback))
        .route("/api/auth/signout", post(sign_out))
}

// =============================================================================
// Discovery
// =============================================================================

/// GET /api/auth/providers
async fn list_providers(State(state): State<AppState>) -> Json<serde_json::Value> {
    let base_url = state.config.server.base_url();
    let providers: serde_json::Map<String, serde_json::Value> = state
        .providers
        .iter()
        .map(|provider| {
            let id = provider.kind.id();
            (
                id.to_string(),
                serde_json::json!({
                    "id": id,
                    "name": provider.kind.display_name(),
                    "type": "oauth",
                    "signinUrl": format!("{base_url}/api/auth/signin/{id}"),
                    "callbackUrl": redirect_uri(&state, provider),
                }),
            )
        })
        .collect();
    Json(serde_json::Value::Object(providers))
}

/// GET /api/auth/session
///
/// Returns `{}` when signed out.
async fn current_session(
    MaybeSession(session): MaybeSession,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = match session {
        Some(view) => serde_json::to_value(view).map_err(|e| AppError::Internal(e.into()))?,
        None => serde_json::json!({}),
    };
    Ok(Json(body))
}

// =============================================================================
// Sign in
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignInQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
}

/// GET /api/auth/signin/:provider
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state and callback URL in cookies
/// 3. Redirect to the provider with client_id, redirect_uri, scope, state
async fn sign_in(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(query): Query<SignInQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let provider = state.providers.get(&provider_id).ok_or(AppError::NotFound)?;

    let csrf_state = generate_csrf_state();
    let callback_url = sanitize_callback_url(&state, query.callback_url.as_deref());

    let authorize_url = url::Url::parse_with_params(
        &provider.authorize_url,
        &[
            ("client_id", provider.client_id.as_str()),
            ("redirect_uri", redirect_uri(&state, provider).as_str()),
            ("response_type", "code"),
            ("scope", provider.kind.scope()),
            ("state", csrf_state.as_str()),
        ],
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    let (state_cookie, callback_cookie) = cookies::sign_in_cookies(
        &csrf_state,
        &callback_url,
        state.config.should_use_secure_cookies(),
    );

    Ok((
        jar.add(state_cookie).add(callback_cookie),
        Redirect::temporary(authorize_url.as_str()),
    ))
}

// =============================================================================
// Callback
// =============================================================================

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Token endpoint response (both providers answer JSON with `Accept: application/json`)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /api/auth/callback/:provider
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch the provider profile
/// 4. Issue the session token and set the cookie
/// 5. Redirect to the stored callback URL
async fn callback(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), Response> {
    let provider = state
        .providers
        .get(&provider_id)
        .ok_or_else(|| sign_in_error("unknown_provider"))?;
    let provider_label = provider.kind.id();

    if let Some(error) = &query.error {
        let desc = query.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(
            provider = provider_label,
            error = %error,
            description = %desc,
            "OAuth error from provider"
        );
        SIGN_INS_TOTAL
            .with_label_values(&[provider_label, "denied"])
            .inc();
        return Err(sign_in_error("access_denied"));
    }

    let code = query
        .code
        .ok_or_else(|| sign_in_error("missing_code"))?;
    let received_state = query
        .state
        .ok_or_else(|| sign_in_error("state_mismatch"))?;
    let stored_state =
        cookies::get_state(&jar).ok_or_else(|| sign_in_error("state_mismatch"))?;

    if received_state != stored_state {
        tracing::warn!(provider = provider_label, "OAuth state mismatch");
        return Err(sign_in_error("state_mismatch"));
    }

    let principal = match fetch_principal(&state, provider, &code).await {
        Ok(principal) => principal,
        Err(e) => {
            tracing::error!(provider = provider_label, error = %e, "Sign-in failed");
            SIGN_INS_TOTAL
                .with_label_values(&[provider_label, "failed"])
                .inc();
            return Err(sign_in_error("callback_failed"));
        }
    };

    let (_, signed) = state.issuer.issue(&principal).map_err(|e| {
        tracing::error!(error = %e, "Session token could not be issued");
        sign_in_error("session_failed")
    })?;

    let session_cookie = cookies::session_cookie(
        &state.config.auth.cookie_name,
        &signed,
        state.issuer.max_age().num_seconds(),
        state.config.should_use_secure_cookies(),
    );
    let target = sanitize_callback_url(&state, cookies::get_callback_url(&jar).as_deref());
    let (clear_state, clear_callback) = cookies::clear_sign_in_cookies();

    SIGN_INS_TOTAL
        .with_label_values(&[provider_label, "success"])
        .inc();
    tracing::info!(provider = provider_label, user_id = %principal.id, "Sign-in successful");

    Ok((
        jar.add(session_cookie).add(clear_state).add(clear_callback),
        Redirect::to(&target),
    ))
}

/// Exchange the authorization code and read the provider profile.
async fn fetch_principal(
    state: &AppState,
    provider: &Provider,
    code: &str,
) -> Result<Principal, AppError> {
    let redirect_uri = redirect_uri(state, provider);
    let token: TokenResponse = state
        .http_client
        .post(&provider.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let access_token = match token {
        TokenResponse {
            access_token: Some(access_token),
            ..
        } => access_token,
        TokenResponse {
            error,
            error_description,
            ..
        } => {
            return Err(AppError::Provider(format!(
                "token exchange failed: {} {}",
                error.unwrap_or_default(),
                error_description.unwrap_or_default()
            )));
        }
    };

    let profile: serde_json::Value = state
        .http_client
        .get(&provider.userinfo_url)
        .bearer_auth(&access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let mut principal = provider.kind.parse_profile(profile)?;

    let emails_url = provider
        .emails_url
        .as_deref()
        .filter(|_| principal.email.is_none());
    if let Some(emails_url) = emails_url {
        match fetch_primary_email(state, emails_url, &access_token).await {
            Ok(email) => principal.email = email,
            Err(e) => {
                tracing::warn!(provider = provider.kind.id(), error = %e, "Email lookup failed");
            }
        }
    }

    Ok(principal)
}

/// Primary verified address for accounts that keep their email private.
async fn fetch_primary_email(
    state: &AppState,
    emails_url: &str,
    access_token: &str,
) -> Result<Option<String>, AppError> {
    let emails: Vec<ProviderEmail> = state
        .http_client
        .get(emails_url)
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(primary_verified_email(&emails))
}

// =============================================================================
// Sign out
// =============================================================================

/// POST /api/auth/signout
///
/// Clears session cookie and redirects to login.
async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let clear = cookies::clear_session_cookie(&state.config.auth.cookie_name);
    (jar.add(clear), Redirect::to(&state.config.auth.login_path))
}

// =============================================================================
// Helpers
// =============================================================================

fn redirect_uri(state: &AppState, provider: &Provider) -> String {
    format!(
        "{}/api/auth/callback/{}",
        state.config.server.base_url(),
        provider.kind.id()
    )
}

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Keep callback targets on this origin.
///
/// Relative paths pass through; absolute URLs on the service origin are
/// reduced to their path. Anything else falls back to the dashboard.
fn sanitize_callback_url(state: &AppState, raw: Option<&str>) -> String {
    safe_callback_target(
        &state.config.server.base_url(),
        &state.config.auth.dashboard_path,
        raw,
    )
}

fn safe_callback_target(base_url: &str, fallback: &str, raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return fallback.to_string();
    };

    let candidate = match raw.strip_prefix(base_url) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        Some(_) => return fallback.to_string(),
        None => raw,
    };

    if candidate.starts_with('/') && !candidate.starts_with("//") && !candidate.contains('\\') {
        candidate.to_string()
    } else {
        fallback.to_string()
    }
}

/// Redirect to the error page, dropping the half-finished sign-in state.
fn sign_in_error(code: &str) -> Response {
    let (clear_state, clear_callback) = cookies::clear_sign_in_cookies();
    let jar = CookieJar::new().add(clear_state).add(clear_callback);
    let encoded = urlencoding::encode(code);
    (jar, Redirect::to(&format!("/auth/error?error={encoded}"))).into_response()
}

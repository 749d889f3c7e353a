//! Session extractors
//!
//! Handlers read the current session through [`MaybeSession`]. The route
//! guard may already have verified the cookie and left the token in the
//! request extensions; otherwise the cookie is read here.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::claims::{SessionToken, SessionView};
use crate::AppState;

fn token_from_headers(headers: &HeaderMap, state: &AppState) -> Option<SessionToken> {
    let jar = CookieJar::from_headers(headers);
    jar.get(&state.config.auth.cookie_name)
        .and_then(|cookie| state.issuer.read(cookie.value()))
}

/// Optional current session extractor
///
/// Returns `None` if not authenticated, instead of error.
///
/// # Usage
/// ```ignore
/// async fn handler(MaybeSession(session): MaybeSession) -> impl IntoResponse {
///     match session {
///         Some(view) => format!("Hello, {:?}", view.user),
///         None => "Hello, stranger".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<SessionView>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = match parts.extensions.get::<SessionToken>().cloned() {
            Some(token) => Some(token),
            None => {
                let token = token_from_headers(&parts.headers, &app_state);
                if let Some(token) = &token {
                    parts.extensions.insert(token.clone());
                }
                token
            }
        };

        Ok(MaybeSession(
            token.map(|token| app_state.issuer.session(&token)),
        ))
    }
}

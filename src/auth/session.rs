//! Session token issuing
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::claims::{Principal, SessionToken, SessionView, enrich_token, project_session};
use crate::config::AuthConfig;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `token` - Claims to encode
/// * `secret` - HMAC secret key
pub fn create_session_token(token: &SessionToken, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(token).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns `Unauthorized` if the signature is invalid, the token is
/// malformed or it has expired.
pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionToken, AppError> {
    if secret.is_empty() {
        return Err(AppError::Config("session secret is empty".to_string()));
    }

    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let claims: SessionToken =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if claims.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

/// Issues, reads and projects session tokens for one signing secret.
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    secret: String,
    max_age: Duration,
}

impl SessionIssuer {
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.secret.clone(),
            max_age: Duration::seconds(auth.session_max_age),
        }
    }

    /// Session lifetime, also used as the cookie max age.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Build and sign the token for a fresh sign-in.
    pub fn issue(&self, principal: &Principal) -> Result<(SessionToken, String), AppError> {
        let now = Utc::now();
        let base = SessionToken {
            id: String::new(),
            role: Default::default(),
            name: principal.name.clone(),
            email: principal.email.clone(),
            picture: principal.image.clone(),
            issued_at: now,
            expires_at: now + self.max_age,
        };
        let token = enrich_token(base, Some(principal));
        let signed = create_session_token(&token, &self.secret)?;
        Ok((token, signed))
    }

    /// Re-run enrichment on an existing token.
    pub fn refresh(&self, token: SessionToken) -> SessionToken {
        enrich_token(token, None)
    }

    /// Read a session cookie value.
    ///
    /// Any failure (bad signature, malformed payload, expiry, missing
    /// secret) yields `None`: callers treat it as signed out.
    pub fn read(&self, raw: &str) -> Option<SessionToken> {
        match verify_session_token(raw, &self.secret) {
            Ok(token) => Some(self.refresh(token)),
            Err(error) => {
                tracing::debug!(error = %error, "Rejected session token");
                None
            }
        }
    }

    /// Project a verified token into the view exposed to handlers.
    pub fn session(&self, token: &SessionToken) -> SessionView {
        project_session(SessionView::from_token(token), token)
    }
}

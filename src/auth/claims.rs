//! Session claims
//!
//! A [`Principal`] comes back from an identity provider once per sign-in.
//! It is turned into a long-lived [`SessionToken`] by [`enrich_token`], and
//! every session read projects that token into a request-scoped
//! [`SessionView`] through [`project_session`].
//!
//! Both steps pin the role to [`Role::User`]. Nothing in this crate ever
//! produces [`Role::Admin`]; see `DESIGN.md` before changing that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verified identity returned by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable provider-scoped identifier
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// Role claim carried by tokens and session views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

/// Long-lived signed session claims.
///
/// `issued_at` and `expires_at` belong to the issuer; the claim shaper
/// only ever touches `id` and `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub id: String,
    #[serde(default)]
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// User portion of a [`SessionView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// Request-scoped projection of a session token handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub user: Option<SessionUser>,
    pub expires: DateTime<Utc>,
}

impl SessionView {
    /// Default view built from the token's display claims, before projection.
    pub fn from_token(token: &SessionToken) -> Self {
        Self {
            user: Some(SessionUser {
                id: String::new(),
                role: Role::default(),
                name: token.name.clone(),
                email: token.email.clone(),
                image: token.picture.clone(),
            }),
            expires: token.expires_at,
        }
    }
}

/// Enrich a token when it is created or refreshed.
///
/// `principal` is only present on the sign-in that created the token; in
/// that case the principal id is copied in and the role is set to
/// [`Role::User`]. On refresh the token is returned unchanged.
pub fn enrich_token(mut token: SessionToken, principal: Option<&Principal>) -> SessionToken {
    if let Some(principal) = principal {
        token.id = principal.id.clone();
        token.role = Role::User;
    }
    token
}

/// Project token claims into the session view on every session read.
///
/// The role is always [`Role::User`], whatever the token carries.
pub fn project_session(mut session: SessionView, token: &SessionToken) -> SessionView {
    if let Some(user) = session.user.as_mut() {
        user.id = token.id.clone();
        user.role = Role::User;
    }
    session
}

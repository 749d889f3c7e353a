//! Social login authentication
//!
//! Handles:
//! - Google / GitHub OAuth flow
//! - Signed session tokens and claim shaping
//! - Route protection middleware

pub mod claims;
mod cookies;
pub mod guard;
mod middleware;
mod oauth;
pub mod providers;
pub mod session;

pub use claims::{
    Principal, Role, SessionToken, SessionUser, SessionView, enrich_token, project_session,
};
pub use guard::{GuardDecision, RouteGuard, route_guard};
pub use middleware::MaybeSession;
pub use oauth::auth_router;
pub use providers::{Provider, ProviderKind, ProviderSet};
pub use session::{SessionIssuer, create_session_token, verify_session_token};

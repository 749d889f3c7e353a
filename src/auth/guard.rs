//! Route guard
//!
//! Runs before every page and API handler. Paths are checked against an
//! ordered rule list; the first matching rule decides what happens. Paths
//! that match no rule pass straight through without the session cookie
//! even being read.

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::config::AppConfig;
use crate::metrics::GUARD_DECISIONS_TOTAL;

/// How a rule's path is compared with the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// The path itself and anything below it (`/dashboard`, `/dashboard/x`)
    Prefix(String),
    /// Only this exact path
    Exact(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Prefix(prefix) => {
                let prefix = prefix.trim_end_matches('/');
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// What to do when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Signed-out requests are sent to the login page
    RequireSession,
    /// Signed-in requests are sent to the dashboard
    RedirectAuthenticated,
}

#[derive(Debug, Clone)]
pub struct GuardRule {
    pub pattern: PathPattern,
    pub policy: Policy,
}

/// Outcome for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

impl GuardDecision {
    fn label(&self) -> &'static str {
        match self {
            GuardDecision::Allow => "allow",
            GuardDecision::Redirect(_) => "redirect",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    rules: Vec<GuardRule>,
    origin: String,
    login_path: String,
    dashboard_path: String,
}

impl RouteGuard {
    /// Default rule table: `/dashboard/*` and `/settings/*` need a session,
    /// the login page turns signed-in users away.
    pub fn from_config(config: &AppConfig) -> Self {
        let rules = vec![
            GuardRule {
                pattern: PathPattern::Prefix("/dashboard".to_string()),
                policy: Policy::RequireSession,
            },
            GuardRule {
                pattern: PathPattern::Prefix("/settings".to_string()),
                policy: Policy::RequireSession,
            },
            GuardRule {
                pattern: PathPattern::Exact(config.auth.login_path.clone()),
                policy: Policy::RedirectAuthenticated,
            },
        ];
        Self::new(
            rules,
            config.server.base_url(),
            config.auth.login_path.clone(),
            config.auth.dashboard_path.clone(),
        )
    }

    pub fn new(
        rules: Vec<GuardRule>,
        origin: impl Into<String>,
        login_path: impl Into<String>,
        dashboard_path: impl Into<String>,
    ) -> Self {
        Self {
            rules,
            origin: origin.into().trim_end_matches('/').to_string(),
            login_path: login_path.into(),
            dashboard_path: dashboard_path.into(),
        }
    }

    /// First rule whose pattern matches `path`.
    pub fn rule_for(&self, path: &str) -> Option<&GuardRule> {
        self.rules.iter().find(|rule| rule.pattern.matches(path))
    }

    /// Decide for a request. `uri` is the original request target.
    pub fn decide(&self, uri: &Uri, authenticated: bool) -> GuardDecision {
        let Some(rule) = self.rule_for(uri.path()) else {
            return GuardDecision::Allow;
        };

        match (rule.policy, authenticated) {
            (Policy::RequireSession, false) => {
                GuardDecision::Redirect(self.login_redirect(original_target(uri)))
            }
            (Policy::RedirectAuthenticated, true) => {
                GuardDecision::Redirect(format!("{}{}", self.origin, self.dashboard_path))
            }
            _ => GuardDecision::Allow,
        }
    }

    /// `<origin><login>?callbackUrl=<target>`
    pub fn login_redirect(&self, callback: &str) -> String {
        format!(
            "{}{}?callbackUrl={}",
            self.origin,
            self.login_path,
            urlencoding::encode(callback)
        )
    }
}

fn original_target(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path())
}

/// Middleware enforcing the [`RouteGuard`] table
///
/// A session cookie that fails verification for any reason counts as no
/// session. Allowed requests carrying a valid token get the decoded
/// [`SessionToken`](super::SessionToken) added to their extensions.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .merge(pages::pages_router())
///     .layer(middleware::from_fn_with_state(state.clone(), route_guard));
/// ```
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.guard.rule_for(request.uri().path()).is_none() {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let token = jar
        .get(&state.config.auth.cookie_name)
        .and_then(|cookie| state.issuer.read(cookie.value()));

    let decision = state.guard.decide(request.uri(), token.is_some());
    GUARD_DECISIONS_TOTAL
        .with_label_values(&[decision.label()])
        .inc();

    match decision {
        GuardDecision::Allow => {
            if let Some(token) = token {
                request.extensions_mut().insert(token);
            }
            next.run(request).await
        }
        GuardDecision::Redirect(location) => {
            tracing::debug!(
                path = %request.uri().path(),
                location = %location,
                "Route guard redirect"
            );
            Redirect::temporary(&location).into_response()
        }
    }
}

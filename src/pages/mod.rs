//! Server-rendered pages
//!
//! Pure view code driven by the session view; no business logic lives here.

mod dashboard;
mod login;
mod nav;

use axum::{Router, extract::State, response::Html, routing::get};

use crate::AppState;
use crate::auth::MaybeSession;

/// Create page router
///
/// Routes:
/// - GET / - Landing page
/// - GET /auth/login - Provider chooser
/// - GET /auth/error - Sign-in failure page
/// - GET /dashboard - Dashboard (protected)
/// - GET /settings - Account settings (protected)
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/auth/login", get(login::login_page))
        .route("/auth/error", get(login::error_page))
        .route("/dashboard", get(dashboard::dashboard_page))
        .route("/settings", get(dashboard::settings_page))
}

/// GET /
async fn landing(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Html<String> {
    let action = match session {
        Some(_) => format!(
            r#"<a class="button" href="{}">Go to dashboard</a>"#,
            attr(&state.config.auth.dashboard_path)
        ),
        None => format!(
            r#"<a class="button" href="{}">Sign in</a>"#,
            attr(&state.config.auth.login_path)
        ),
    };

    layout(
        "Authgate",
        &format!(
            r#"<main class="center">
    <h1>Authgate</h1>
    <p>Social login with Google and GitHub, protected routes and a dashboard.</p>
    {action}
</main>"#
        ),
    )
}

/// Wrap page content in the shared document shell.
pub(crate) fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = text(title),
    ))
}

/// Escape text content.
pub(crate) fn text(value: &str) -> String {
    html_escape::encode_text(value).into_owned()
}

/// Escape a double-quoted attribute value.
pub(crate) fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; background: #0f172a; color: #e2e8f0; }
a { color: #67e8f9; }
.center { min-height: 100vh; display: flex; flex-direction: column; align-items: center; justify-content: center; gap: 1rem; }
.card { width: 100%; max-width: 28rem; padding: 1.5rem; border: 1px solid rgba(255,255,255,.1); border-radius: 1rem; background: rgba(255,255,255,.05); }
.button, button { display: block; width: 100%; padding: .6rem 1rem; border: 1px solid rgba(255,255,255,.2); border-radius: .5rem; background: transparent; color: inherit; cursor: pointer; text-align: center; text-decoration: none; }
button[disabled] { opacity: .5; cursor: progress; }
header { display: flex; align-items: center; justify-content: space-between; padding: 1rem 2rem; border-bottom: 1px solid rgba(255,255,255,.1); }
main.content { max-width: 56rem; margin: 2rem auto; display: grid; gap: 1.5rem; padding: 0 1rem; }
.muted { color: #94a3b8; font-size: .875rem; }
.menu { position: relative; }
.menu summary { list-style: none; cursor: pointer; }
.menu .panel { position: absolute; right: 0; width: 16rem; padding: .75rem; border-radius: .75rem; background: #1e293b; border: 1px solid rgba(255,255,255,.1); }
.avatar { width: 2.5rem; height: 2.5rem; border-radius: 50%; display: flex; align-items: center; justify-content: center; background: #0e7490; font-weight: 600; overflow: hidden; }
.avatar img { width: 100%; height: 100%; object-fit: cover; }
.danger { color: #f87171; border-color: rgba(248,113,113,.4); }
"#;

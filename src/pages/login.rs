use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

use super::{attr, layout, text};
use crate::AppState;

/// GET /auth/login
///
/// One button per enabled provider. Each sign-in lands on the dashboard.
pub(super) async fn login_page(State(state): State<AppState>) -> Html<String> {
    let callback = &state.config.auth.dashboard_path;

    let buttons: String = state
        .providers
        .iter()
        .map(|provider| {
            format!(
                r#"<form class="provider" method="get" action="/api/auth/signin/{id}">
            <input type="hidden" name="callbackUrl" value="{callback}">
            <button type="submit">Sign in with {name}</button>
        </form>"#,
                id = attr(provider.kind.id()),
                callback = attr(callback),
                name = text(provider.kind.display_name()),
            )
        })
        .collect();

    let buttons = if buttons.is_empty() {
        r#"<p class="muted">No sign-in providers are configured.</p>"#.to_string()
    } else {
        buttons
    };

    layout(
        "Sign in",
        &format!(
            r#"<main class="center">
    <div class="card">
        <h1>Welcome Back</h1>
        <p class="muted">Sign in to your account to continue</p>
        {buttons}
        <p class="muted">By signing in, you agree to our Terms of Service and Privacy Policy</p>
    </div>
</main>
<script>
document.querySelectorAll("form.provider").forEach(function (form) {{
    form.addEventListener("submit", function () {{
        document.querySelectorAll("form.provider button").forEach(function (b) {{ b.disabled = true; }});
    }});
}});
</script>"#
        ),
    )
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorQuery {
    error: Option<String>,
}

/// GET /auth/error
pub(super) async fn error_page(
    State(state): State<AppState>,
    Query(query): Query<ErrorQuery>,
) -> Html<String> {
    let message = match query.error.as_deref() {
        Some("access_denied") => "The provider did not grant access.",
        Some("state_mismatch") => "The sign-in request expired or was tampered with.",
        Some("unknown_provider") => "That sign-in provider is not enabled.",
        Some("callback_failed") => "The provider could not confirm your identity.",
        Some("session_failed") => "Your session could not be created.",
        _ => "Something went wrong while signing in.",
    };

    layout(
        "Sign-in error",
        &format!(
            r#"<main class="center">
    <div class="card">
        <h1>Sign-in failed</h1>
        <p>{message}</p>
        <a class="button" href="{login}">Try again</a>
    </div>
</main>"#,
            message = text(message),
            login = attr(&state.config.auth.login_path),
        ),
    )
}

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};

use super::{layout, nav, text};
use crate::AppState;
use crate::auth::{MaybeSession, SessionUser};

/// GET /dashboard
///
/// The route guard already turned signed-out visitors away; a missing
/// session here still redirects instead of rendering.
pub(super) async fn dashboard_page(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Response {
    let Some(user) = session.and_then(|view| view.user) else {
        return Redirect::to(&state.config.auth.login_path).into_response();
    };

    let body = format!(
        r#"{header}
<main class="content">
    <section class="card">
        <h2>Welcome back, {name}!</h2>
        <p><span class="muted">Email:</span> {email}</p>
        <p><span class="muted">User ID:</span> {id}</p>
    </section>
    <section class="card">
        <h3>Getting Started</h3>
        <ol>
            <li><strong>Customize your profile</strong><br><span class="muted">Add your bio, avatar, and preferences in Settings</span></li>
            <li><strong>Create your first project</strong><br><span class="muted">Start building something amazing</span></li>
            <li><strong>Invite team members</strong><br><span class="muted">Collaborate with others on your projects</span></li>
        </ol>
    </section>
</main>"#,
        header = page_header("Dashboard", &user, &state),
        name = text(user.name.as_deref().unwrap_or_default()),
        email = text(user.email.as_deref().unwrap_or_default()),
        id = text(&user.id),
    );

    layout("Dashboard", &body).into_response()
}

/// GET /settings
pub(super) async fn settings_page(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Response {
    let Some(user) = session.and_then(|view| view.user) else {
        return Redirect::to(&state.config.auth.login_path).into_response();
    };

    let body = format!(
        r#"{header}
<main class="content">
    <section class="card">
        <h2>Profile</h2>
        <dl>
            <dt class="muted">Name</dt><dd>{name}</dd>
            <dt class="muted">Email</dt><dd>{email}</dd>
            <dt class="muted">User ID</dt><dd>{id}</dd>
            <dt class="muted">Role</dt><dd>{role}</dd>
        </dl>
    </section>
</main>"#,
        header = page_header("Settings", &user, &state),
        name = text(user.name.as_deref().unwrap_or("-")),
        email = text(user.email.as_deref().unwrap_or("-")),
        id = text(&user.id),
        role = user.role.as_str(),
    );

    layout("Settings", &body).into_response()
}

fn page_header(title: &str, user: &SessionUser, state: &AppState) -> String {
    format!(
        r#"<header><h1>{title}</h1>{menu}</header>"#,
        title = text(title),
        menu = nav::account_menu(user, &state.config.auth.dashboard_path),
    )
}

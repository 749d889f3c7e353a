//! Account menu shown in the page header.

use super::{attr, text};
use crate::auth::SessionUser;

/// First letter of each word of the name, upper-cased; `U` without a name.
pub(crate) fn initials(name: Option<&str>) -> String {
    let initials: String = name
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if initials.is_empty() {
        "U".to_string()
    } else {
        initials
    }
}

/// Render the avatar dropdown with profile details and navigation.
pub(crate) fn account_menu(user: &SessionUser, dashboard_path: &str) -> String {
    let display_name = user.name.as_deref().unwrap_or("User");
    let avatar = match user.image.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => format!(
            r#"<img src="{}" alt="{}">"#,
            attr(url),
            attr(display_name)
        ),
        None => text(&initials(user.name.as_deref())),
    };

    format!(
        r#"<details class="menu">
    <summary><span class="avatar">{avatar}</span></summary>
    <div class="panel">
        <p><strong>{name}</strong><br><span class="muted">{email}</span></p>
        <hr>
        <p><a href="{dashboard}">Dashboard</a></p>
        <p><a href="/settings">Settings</a></p>
        <hr>
        <form method="post" action="/api/auth/signout">
            <button type="submit" class="danger">Sign out</button>
        </form>
    </div>
</details>"#,
        name = text(user.name.as_deref().unwrap_or_default()),
        email = text(user.email.as_deref().unwrap_or_default()),
        dashboard = attr(dashboard_path),
    )
}

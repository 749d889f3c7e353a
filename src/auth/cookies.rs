use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

const STATE_COOKIE_NAME: &str = "authgate.state";
const CALLBACK_COOKIE_NAME: &str = "authgate.callback-url";
const AUTH_PATH: &str = "/api/auth";

/// Create CSRF state + callback URL cookies for the authorization request.
pub(super) fn sign_in_cookies(
    state: &str,
    callback_url: &str,
    secure: bool,
) -> (Cookie<'static>, Cookie<'static>) {
    let state = Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(AUTH_PATH)
        .max_age(Duration::minutes(10))
        .build();

    let callback = Cookie::build((
        CALLBACK_COOKIE_NAME,
        urlencoding::encode(callback_url).into_owned(),
    ))
    .http_only(true)
    .secure(secure)
    .same_site(SameSite::Lax)
    .path(AUTH_PATH)
    .max_age(Duration::minutes(10))
    .build();

    (state, callback)
}

/// Create removal cookies for the sign-in state.
pub(super) fn clear_sign_in_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let state = Cookie::build((STATE_COOKIE_NAME, ""))
        .path(AUTH_PATH)
        .max_age(Duration::ZERO)
        .build();

    let callback = Cookie::build((CALLBACK_COOKIE_NAME, ""))
        .path(AUTH_PATH)
        .max_age(Duration::ZERO)
        .build();

    (state, callback)
}

/// Create session cookie.
pub(super) fn session_cookie(
    name: &str,
    token: &str,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Create removal cookie for session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub(super) fn get_state(jar: &CookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

pub(super) fn get_callback_url(jar: &CookieJar) -> Option<String> {
    jar.get(CALLBACK_COOKIE_NAME)
        .and_then(|c| urlencoding::decode(c.value()).ok().map(|v| v.into_owned()))
}

pub mod identity;
pub mod session;
pub mod validate;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_id";

/// Session cookie for a fresh login. SameSite=Lax per the auth design;
/// Secure is config-gated so development over plain HTTP keeps working.
pub fn session_cookie(token: &str, max_age_hours: u64, secure: bool) -> String {
    let max_age_secs = max_age_hours * 3600;
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Expired cookie that clears the session on logout.
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

use axum::http::{header::COOKIE, HeaderMap};

pub const REFRESH_COOKIE_NAME: &str = "jwt";

#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub max_age_days: i64,
}

pub fn build_refresh_cookie(value: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        REFRESH_COOKIE_NAME,
        value,
        options.max_age_days.max(0) * 24 * 60 * 60
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn build_clear_cookie(options: CookieOptions) -> String {
    let mut cookie = format!("{REFRESH_COOKIE_NAME}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| extract_cookie_value(raw, REFRESH_COOKIE_NAME))
        .filter(|v| !v.is_empty())
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

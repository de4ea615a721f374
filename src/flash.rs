//! One-shot flash messages carried in a cookie and cleared on the next
//! rendered page.

use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub const FLASH_COOKIE: &str = "intranet_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Level> {
        match s {
            "info" => Some(Level::Info),
            "success" => Some(Level::Success),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

/// Set-Cookie value carrying one pending message.
pub fn set_cookie(level: Level, message: &str) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!("{}:{}", level.as_str(), message));
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE, payload
    )
}

/// Set-Cookie value that removes the flash cookie.
pub fn clear_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", FLASH_COOKIE)
}

/// Read the pending flash message from the request headers, if any.
pub fn take(headers: &HeaderMap) -> Option<(Level, String)> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    let raw = cookie_header.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(FLASH_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .filter(|v| !v.is_empty())
    })?;
    let decoded = URL_SAFE_NO_PAD.decode(raw).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (level, message) = decoded.split_once(':')?;
    Some((Level::parse(level)?, message.to_string()))
}

/// Append a Set-Cookie header, silently skipping values that are not valid
/// header content.
pub fn append(headers: &mut HeaderMap, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        headers.append(header::SET_COOKIE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn roundtrip_preserves_level_and_text() {
        let cookie = set_cookie(Level::Error, "Credenciales inválidas.");
        let value = cookie.split(';').next().unwrap();
        let headers = request_headers(value);
        let (level, message) = take(&headers).expect("flash present");
        assert_eq!(level, Level::Error);
        assert_eq!(message, "Credenciales inválidas.");
    }

    #[test]
    fn take_ignores_other_cookies_and_garbage() {
        let headers = request_headers("theme=dark; intranet_flash=!!not-base64!!");
        assert!(take(&headers).is_none());

        let headers = request_headers("theme=dark");
        assert!(take(&headers).is_none());
    }

    #[test]
    fn message_may_contain_colons() {
        let cookie = set_cookie(Level::Info, "a:b:c");
        let value = cookie.split(';').next().unwrap();
        let (_, message) = take(&request_headers(value)).unwrap();
        assert_eq!(message, "a:b:c");
    }
}

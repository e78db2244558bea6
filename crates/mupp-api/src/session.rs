use std::collections::BTreeMap;

use crate::error::ApiError;

/// Header the backend reads the session key from.
pub const SESSION_HEADER: &str = "session-key";
/// Cookie the session key is stored under after login.
pub const SESSION_COOKIE: &str = "session";

/// An authenticated session's key, as issued by `POST /login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cookie string form, e.g. `session=abc123`.
    pub fn to_cookie(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.0)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a cookie header string (`"a=1; b=2"`) into a name -> value map.
///
/// Malformed segments without an `=` are skipped; values keep any embedded
/// `=` characters intact.
pub fn parse_cookie_header(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|segment| {
            let (name, value) = segment.trim().split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Extracts the session key from a cookie string, failing when the user has
/// no active session.
pub fn session_from_cookies(raw: &str) -> Result<SessionKey, ApiError> {
    parse_cookie_header(raw)
        .remove(SESSION_COOKIE)
        .filter(|value| !value.is_empty())
        .map(SessionKey::new)
        .ok_or(ApiError::NoActiveSession)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_parses_into_map() {
        let cookies = parse_cookie_header("session=abc123; theme=dark");
        assert_eq!(cookies["session"], "abc123");
        assert_eq!(cookies["theme"], "dark");
    }

    #[test]
    fn cookie_parsing_trims_and_skips_garbage() {
        let cookies = parse_cookie_header("  session=abc ;junk; token=a=b=c");
        assert_eq!(cookies["session"], "abc");
        assert!(!cookies.contains_key("junk"));
        assert_eq!(cookies["token"], "a=b=c");
    }

    #[test]
    fn session_extraction_requires_the_cookie() {
        let key = session_from_cookies("theme=dark; session=s3cret").expect("session");
        assert_eq!(key.as_str(), "s3cret");

        assert!(matches!(
            session_from_cookies("theme=dark"),
            Err(ApiError::NoActiveSession)
        ));
        assert!(matches!(
            session_from_cookies("session="),
            Err(ApiError::NoActiveSession)
        ));
    }

    #[test]
    fn session_key_round_trips_through_cookie_form() {
        let key = SessionKey::new("abc123");
        assert_eq!(key.to_cookie(), "session=abc123");
        let parsed = session_from_cookies(&key.to_cookie()).expect("session");
        assert_eq!(parsed, key);
    }
}

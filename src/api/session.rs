//! Session credentials read from the caller's cookies.
//!
//! The browser session stores `token` and an optional `token_type`.
//! Both are read per request; nothing is cached.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const TOKEN_COOKIE: &str = "token";
pub const TOKEN_TYPE_COOKIE: &str = "token_type";
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Bearer credentials forwarded to the diagnosis service.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    token: String,
    token_type: String,
}

impl AuthContext {
    pub fn new(token: impl Into<String>, token_type: Option<String>) -> Self {
        let token_type = token_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        Self {
            token: token.into(),
            token_type,
        }
    }

    /// Read credentials from `Cookie` headers. `None` when no token is set.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let mut token = None;
        let mut token_type = None;

        for pair in headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
        {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match name.trim() {
                TOKEN_COOKIE => token = Some(value.to_string()),
                TOKEN_TYPE_COOKIE => token_type = Some(value.to_string()),
                _ => {}
            }
        }

        token
            .filter(|t| !t.is_empty())
            .map(|t| Self::new(t, token_type))
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// `Authorization` header value: `"<token_type> <token>"`.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

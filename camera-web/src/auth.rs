//! Cookie-backed login sessions.
//!
//! Tokens are random 32-byte values handed out in an HttpOnly `session`
//! cookie and tracked in memory with a TTL. Restarting the server logs
//! everyone out, which is acceptable at this deployment scale.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    expires_at: Instant,
}

/// In-memory session table.
pub struct AuthSessions {
    ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl AuthSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a token for a user who just authenticated. Expired entries
    /// are swept here, so the table stays bounded by login traffic.
    pub async fn issue(&self, username: &str) -> String {
        let token = new_token();
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            token.clone(),
            SessionEntry {
                username: username.to_string(),
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Resolve a token to its username, if present and unexpired.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(token)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.username.clone())
    }

    /// Drop a token; reports whether it was present.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }
}

fn new_token() -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Pull the `session` cookie value out of a request's Cookie header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Resolve the request's session or fail with 401.
pub async fn require_session(
    sessions: &AuthSessions,
    headers: &HeaderMap,
) -> Result<String, ApiError> {
    let token =
        session_token(headers).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    sessions
        .resolve(&token)
        .await
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

/// Set-Cookie value issued on login.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax")
}

/// Set-Cookie value that clears the session on logout.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn issue_resolve_revoke_round_trip() {
        let sessions = AuthSessions::new(Duration::from_secs(60));
        let token = sessions.issue("alice").await;

        assert_eq!(sessions.resolve(&token).await.as_deref(), Some("alice"));
        assert!(sessions.revoke(&token).await);
        assert!(!sessions.revoke(&token).await);
        assert!(sessions.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn expired_tokens_do_not_resolve() {
        let sessions = AuthSessions::new(Duration::from_millis(10));
        let token = sessions.issue("alice").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(sessions.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let sessions = AuthSessions::new(Duration::from_secs(60));
        let a = sessions.issue("alice").await;
        let b = sessions.issue("alice").await;
        assert_ne!(a, b);
    }

    #[test]
    fn cookie_header_parsing_finds_the_session() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=tok123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("tok123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_token(&headers).is_none());
    }
}

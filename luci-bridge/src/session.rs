//! Session lifecycle for the LuCI web UI
//!
//! Owns login, token caching and the credentials-rejected latch:
//! - a token is valid for a fixed TTL from issuance (the router does not
//!   declare one), and is dropped early when a request using it comes back
//!   unauthorized
//! - HTTP 403 at login latches the manager: no further login attempts until
//!   the process restarts or is reconfigured
//!
//! All state lives in one `SessionState` value behind a mutex, so
//! overlapping refreshes single-flight the login instead of racing it.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::SessionError;
use crate::transport::Transport;

/// Tokens are renewed two hours after issuance.
pub const TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);

const LOGIN_PATH: &str = "/cgi-bin/luci/";

/// The login page embeds both values in a script block.
const SESSION_PATTERN: &str = r#""sessionid": "(.*?)", "token": "(.*?)""#;

/// One authenticated session with the router.
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// Session id; doubles as the `sysauth_http` cookie value and as the
    /// first positional argument of every ubus call.
    pub sysauth: String,
    /// CSRF token required by the form endpoints (apply/confirm, subscribe).
    pub csrf: String,
    issued_at: Instant,
}

impl SessionToken {
    pub fn new(sysauth: impl Into<String>, csrf: impl Into<String>) -> Self {
        Self {
            sysauth: sysauth.into(),
            csrf: csrf.into(),
            issued_at: Instant::now(),
        }
    }

    /// Cookie header value for authenticated page requests.
    pub fn cookie(&self) -> String {
        format!("sysauth_http={}", self.sysauth)
    }

    pub fn is_fresh(&self) -> bool {
        self.issued_at.elapsed() < TOKEN_TTL
    }
}

#[derive(Default)]
struct SessionState {
    token: Option<SessionToken>,
    locked_out: bool,
}

/// Owns the session state for one configured router.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    host: String,
    username: String,
    password: String,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(config: &BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            host: config.host.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Return the cached token while it is fresh, otherwise log in.
    ///
    /// Locked-out state short-circuits without touching the network.
    pub async fn token(&self) -> Result<SessionToken, SessionError> {
        let mut state = self.state.lock().await;
        if let Some(token) = &state.token {
            if token.is_fresh() {
                return Ok(token.clone());
            }
            debug!("cached session for {} expired, logging in again", self.host);
        }
        if state.locked_out {
            return Err(SessionError::LockedOut);
        }
        let token = self.login(&mut state).await?;
        state.token = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next cycle performs a fresh login.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
    }

    pub async fn is_locked_out(&self) -> bool {
        self.state.lock().await.locked_out
    }

    async fn login(&self, state: &mut SessionState) -> Result<SessionToken, SessionError> {
        let url = format!("{}{}", self.host, LOGIN_PATH);
        let fields = [
            ("luci_username".to_string(), self.username.clone()),
            ("luci_password".to_string(), self.password.clone()),
        ];
        let headers = [(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        )];
        debug!("logging in to {}", url);

        let reply = self.transport.post_form(&url, &headers, &fields).await?;

        if reply.status == 403 {
            warn!(
                "{} rejected the configured credentials, disabling further login attempts",
                self.host
            );
            state.locked_out = true;
            return Err(SessionError::InvalidCredentials);
        }
        if reply.status != 200 && reply.status != 302 {
            return Err(SessionError::UnexpectedStatus(reply.status));
        }

        let captures = session_regex()
            .captures(&reply.body)
            .ok_or(SessionError::Unparseable)?;
        let token = SessionToken::new(&captures[1], &captures[2]);
        info!("logged in to {}", self.host);
        Ok(token)
    }
}

fn session_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SESSION_PATTERN).expect("static pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_extracts_session_and_csrf() {
        let body = r#"<script>window.luci = { "sessionid": "abc123", "token": "tok456" }</script>"#;
        let caps = session_regex().captures(body).unwrap();
        assert_eq!(&caps[1], "abc123");
        assert_eq!(&caps[2], "tok456");
    }

    #[test]
    fn pattern_misses_on_arbitrary_html() {
        assert!(session_regex().captures("<html>login form</html>").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn token_freshness_follows_the_ttl() {
        let token = SessionToken::new("s", "c");
        assert!(token.is_fresh());

        tokio::time::advance(TOKEN_TTL - Duration::from_secs(1)).await;
        assert!(token.is_fresh());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!token.is_fresh());
    }

    #[test]
    fn cookie_renders_the_sysauth_value() {
        let token = SessionToken::new("abc", "tok");
        assert_eq!(token.cookie(), "sysauth_http=abc");
    }
}

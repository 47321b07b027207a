//! Error taxonomy for the bridge
//!
//! Everything here is recoverable at the scheduler boundary: a failed cycle
//! is reported to the host, which keeps scheduling the next one. The single
//! latched condition is `AuthLocked`: the router rejected the configured
//! credentials and no further login attempts are made until reconfiguration.

use thiserror::Error;

/// Failures at the raw HTTP layer.
///
/// Non-200 statuses are NOT transport errors; callers branch on the status
/// carried by [`crate::transport::HttpReply`]. These variants cover the cases
/// where no reply exists at all.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
}

/// Failures while obtaining or renewing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("router rejected the configured credentials")]
    InvalidCredentials,
    #[error("logins disabled after a credentials rejection")]
    LockedOut,
    #[error("login page did not contain a session id/token pair")]
    Unparseable,
    #[error("unexpected login status {0}")]
    UnexpectedStatus(u16),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures while fetching telemetry with an established session.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The router no longer accepts the session cookie (401/403).
    #[error("session rejected by the router")]
    Unauthorized,
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("response was not the expected JSON: {0}")]
    Unparseable(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures while driving a switch or button.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no switch or button named {0}")]
    UnknownEntity(String),
    #[error("router refused the change")]
    Rejected,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// What one refresh cycle reports to the host scheduler.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Credentials were rejected at login; latched until reconfiguration.
    #[error("credentials rejected, bridge must be reconfigured")]
    AuthLocked,
    /// The cached session expired mid-cycle; the next cycle logs in again.
    #[error("session expired, will log in again next cycle")]
    Unauthenticated,
    #[error("no session this cycle: {0}")]
    Session(#[from] SessionError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

impl UpdateError {
    /// True for the one condition the host cannot recover from by retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpdateError::AuthLocked)
    }
}

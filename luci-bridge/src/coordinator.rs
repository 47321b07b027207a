//! The periodic refresh cycle
//!
//! Entry point the host scheduler drives. One tick:
//! 1. obtain a session token (cached, or fresh login)
//! 2. fetch device identity once per process lifetime
//! 3. fan out the three independent fetches and join
//! 4. on any unauthorized reply, invalidate the token and fail the cycle
//! 5. otherwise merge everything into one snapshot
//!
//! Cycles never overlap for one device: the whole refresh is single-flighted
//! behind a mutex, so the token cache and lockout latch see sequential
//! access even if the host double-fires.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::{FetchError, SessionError, UpdateError};
use crate::fetcher::{DataFetcher, DeviceIdentity};
use crate::session::SessionManager;
use crate::snapshot::Snapshot;
use crate::transport::Transport;

pub struct UpdateCoordinator {
    host: String,
    update_interval: Duration,
    session: Arc<SessionManager>,
    fetcher: DataFetcher,
    identity: Mutex<Option<DeviceIdentity>>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl UpdateCoordinator {
    pub fn new(
        config: &BridgeConfig,
        session: Arc<SessionManager>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            host: config.host.clone(),
            update_interval: config.update_interval(),
            session,
            fetcher: DataFetcher::new(&config.host, transport),
            identity: Mutex::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// How often the host should schedule [`Self::refresh`].
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Run one refresh cycle and return the merged snapshot.
    ///
    /// Every failure is a typed [`UpdateError`]; the host reports the cycle
    /// as failed and keeps scheduling. Nothing here aborts the scheduler.
    pub async fn refresh(&self) -> Result<Snapshot, UpdateError> {
        let _gate = self.refresh_gate.lock().await;

        let token = match self.session.token().await {
            Ok(token) => token,
            Err(SessionError::LockedOut) | Err(SessionError::InvalidCredentials) => {
                return Err(UpdateError::AuthLocked);
            }
            Err(e) => return Err(UpdateError::Session(e)),
        };

        if self.identity.lock().is_none() {
            match self.fetcher.fetch_identity(&token).await {
                Ok(identity) => {
                    debug!(
                        "device identity for {}: {} ({})",
                        self.host, identity.device_name, identity.model
                    );
                    *self.identity.lock() = Some(identity);
                }
                // Identity is cosmetic; the telemetry cycle goes on without it.
                Err(e) => warn!("device identity fetch failed for {}: {}", self.host, e),
            }
        }

        let (status, plugin, switches) = tokio::join!(
            self.fetcher.fetch_status(&token),
            self.fetcher.fetch_plugin_status(&token),
            self.fetcher.fetch_switch_states(&token),
        );

        let unauthorized = [
            status.as_ref().err(),
            plugin.as_ref().err(),
            switches.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .any(|e| matches!(e, FetchError::Unauthorized));
        if unauthorized {
            debug!(
                "session for {} rejected mid-cycle, forcing re-login next tick",
                self.host
            );
            self.session.invalidate().await;
            return Err(UpdateError::Unauthenticated);
        }

        let mut snapshot = Snapshot::default();
        snapshot.metrics.extend(status?);
        snapshot.metrics.extend(plugin?);
        snapshot.switch = switches?;
        if let Some(identity) = self.identity.lock().clone() {
            snapshot.insert("sw_version", identity.sw_version);
            snapshot.insert("device_name", identity.device_name);
            snapshot.insert("model", identity.model);
        }
        snapshot.querytime = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Ok(snapshot)
    }
}

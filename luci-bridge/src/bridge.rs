//! Host-facing facade
//!
//! What a host platform holds per configured router: `refresh()` for the
//! scheduled cycle, `turn_on`/`turn_off`/`press` for the actionable
//! entities, and the static metadata tables for registration.

use std::sync::Arc;
use std::time::Duration;

use crate::actions::ActionRunner;
use crate::config::BridgeConfig;
use crate::coordinator::UpdateCoordinator;
use crate::error::{ActionError, TransportError, UpdateError};
use crate::session::SessionManager;
use crate::snapshot::Snapshot;
use crate::transport::{HttpTransport, Transport};

pub struct Bridge {
    coordinator: UpdateCoordinator,
    actions: ActionRunner,
}

impl Bridge {
    /// Bridge over the production HTTP transport.
    pub fn new(config: BridgeConfig) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Ok(Self::with_transport(config, transport))
    }

    /// Bridge over an arbitrary transport (devkit stubs, tests).
    pub fn with_transport(config: BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        let session = Arc::new(SessionManager::new(&config, transport.clone()));
        let coordinator = UpdateCoordinator::new(&config, session.clone(), transport.clone());
        let actions = ActionRunner::new(&config.host, session, transport);
        Self {
            coordinator,
            actions,
        }
    }

    pub fn host(&self) -> &str {
        self.coordinator.host()
    }

    pub fn update_interval(&self) -> Duration {
        self.coordinator.update_interval()
    }

    /// Run one refresh cycle; the host publishes the snapshot or marks the
    /// device unavailable on error.
    pub async fn refresh(&self) -> Result<Snapshot, UpdateError> {
        self.coordinator.refresh().await
    }

    pub async fn turn_on(&self, switch: &str) -> Result<(), ActionError> {
        self.actions.set_switch(switch, true).await
    }

    pub async fn turn_off(&self, switch: &str) -> Result<(), ActionError> {
        self.actions.set_switch(switch, false).await
    }

    pub async fn press(&self, button: &str) -> Result<(), ActionError> {
        self.actions.press(button).await
    }
}

//! LuCI Bridge - OpenWrt router telemetry for host automation platforms
//!
//! This library polls a router's LuCI web API on a host-driven interval:
//! - Session-cookie login with token caching and a credentials lockout latch
//! - Batched ubus JSON-RPC status queries, id-correlated on the way back
//! - One flat telemetry snapshot per cycle, merged from parallel fetches
//! - Switches and buttons (uci commit sequence, reboot, interface reconnect)
//!
//! The host runtime supplies the scheduling loop and entity registration;
//! the bridge never runs standalone.

pub mod actions;
pub mod bridge;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod fetcher;
pub mod session;
pub mod snapshot;
pub mod transport;
pub mod ubus;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{ActionError, FetchError, SessionError, TransportError, UpdateError};
pub use fetcher::DeviceIdentity;
pub use session::{SessionManager, SessionToken};
pub use snapshot::{Snapshot, SwitchState};
pub use transport::{HttpReply, HttpTransport, Transport};

/*!
Test harness for the bridge

Wires a [`luci_bridge::Bridge`] onto the scripted transport with a standard
configuration, plus shortcuts scripting a whole healthy router so refresh
tests only spell out what they change.
*/

use std::sync::Arc;

use luci_bridge::{Bridge, BridgeConfig};

use crate::payloads;
use crate::transport_stub::MockTransport;

pub const TEST_HOST: &str = "http://192.168.1.1";

pub struct TestHarness {
    pub transport: MockTransport,
    pub bridge: Bridge,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig {
            host: TEST_HOST.to_string(),
            username: "root".to_string(),
            password: "secret".to_string(),
            update_interval_seconds: 10,
        })
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();
        let transport = MockTransport::new();
        let bridge = Bridge::with_transport(config, Arc::new(transport.clone()));
        Self { transport, bridge }
    }

    /// Script a successful login.
    pub fn script_login(&self) {
        self.transport.reply(
            "POST",
            "/cgi-bin/luci/",
            200,
            payloads::login_page_body("test-session", "test-csrf"),
        );
    }

    /// Script every endpoint one healthy refresh cycle touches.
    ///
    /// The three ubus conversations share `/ubus/`, so they are routed on
    /// request content rather than arrival order.
    pub fn script_healthy_router(&self) {
        self.script_login();
        self.transport.reply_when(
            "POST",
            "/ubus/",
            "\"board\"",
            200,
            payloads::batch_reply(&[(
                41,
                payloads::board_info("5.15.0", "OpenWrt", "OpenWrt 23.05.2"),
            )]),
        );
        self.transport.reply_when(
            "POST",
            "/ubus/",
            "getRealtimeStats",
            200,
            payloads::status_batch(),
        );
        self.transport.reply_when(
            "POST",
            "/ubus/",
            "\"option\"",
            200,
            payloads::uci_value("1"),
        );
        self.transport.reply_json(
            "GET",
            "/admin/services/passwall/ip",
            200,
            payloads::passwall_ip("203.0.113.9", "JP"),
        );
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

//! End-to-end refresh cycles against a scripted router

use luci_bridge::error::{SessionError, TransportError, UpdateError};
use luci_devkit::{payloads, TestHarness};
use serde_json::json;

fn login_attempts(harness: &TestHarness) -> usize {
    harness
        .transport
        .requests_to("/cgi-bin/luci/")
        .iter()
        .filter(|r| r.method == "POST" && r.form.iter().any(|(k, _)| k == "luci_username"))
        .count()
}

fn board_fetches(harness: &TestHarness) -> usize {
    harness
        .transport
        .requests_to("/ubus/")
        .iter()
        .filter(|r| {
            r.json
                .as_ref()
                .map(|j| j.to_string().contains("board"))
                .unwrap_or(false)
        })
        .count()
}

#[tokio::test]
async fn full_refresh_merges_every_fragment() {
    let harness = TestHarness::new();
    harness.script_healthy_router();

    let snap = harness.bridge.refresh().await.unwrap();

    // status batch
    assert_eq!(snap.metrics["uptime"], "1天1小时1分钟");
    assert_eq!(snap.metrics["cpu"], "12");
    assert_eq!(snap.metrics["cputemp"], 0);
    assert_eq!(snap.metrics["memory"], 50.0);
    assert_eq!(snap.metrics["memory_total_gb"], 1.0);
    assert_eq!(snap.metrics["conncount"], "1234");
    assert_eq!(snap.metrics["user_online"], 5);
    assert_eq!(snap.metrics["wan_ip"], "203.0.113.2");
    assert_eq!(snap.metrics["wan_uptime"], "2小时0分钟");
    assert_eq!(snap.metrics["wan6_ip"], "2001:db8::1");
    assert_eq!(snap.metrics["rx"], "1.00");
    assert_eq!(snap.metrics["tx"], "512.00");
    assert_eq!(snap.metrics["rx_rate"], "1.00");
    assert_eq!(snap.metrics["tx_rate"], "2.00");
    // plugin status
    assert_eq!(snap.metrics["passwall_ip"], "203.0.113.9");
    assert_eq!(snap.metrics["passwall_country"], "JP");
    // device identity
    assert_eq!(snap.metrics["sw_version"], "5.15.0");
    assert_eq!(snap.metrics["device_name"], "OpenWrt");
    assert_eq!(snap.metrics["model"], "OpenWrt 23.05.2");
    // switches + timestamp
    assert_eq!(snap.switch.len(), 1);
    assert_eq!(snap.switch[0].name, "passwall");
    assert_eq!(snap.switch[0].onoff, "on");
    assert!(!snap.querytime.is_empty());
}

#[tokio::test]
async fn identity_is_fetched_once_per_process() {
    let harness = TestHarness::new();
    harness.script_healthy_router();

    harness.bridge.refresh().await.unwrap();
    harness.bridge.refresh().await.unwrap();

    assert_eq!(board_fetches(&harness), 1);
    assert_eq!(login_attempts(&harness), 1);
}

#[tokio::test]
async fn unchanged_router_state_yields_equal_snapshots() {
    let harness = TestHarness::new();
    harness.script_healthy_router();

    let first = harness.bridge.refresh().await.unwrap();
    let second = harness.bridge.refresh().await.unwrap();
    assert!(first.same_state_as(&second));
}

#[tokio::test]
async fn unauthorized_cycle_forces_relogin_next_tick() {
    let harness = TestHarness::new();
    harness.script_healthy_router();
    harness.bridge.refresh().await.unwrap();

    // The router drops the session: the status batch starts answering 401.
    harness
        .transport
        .reply_when("POST", "/ubus/", "getRealtimeStats", 401, json!(""));
    let err = harness.bridge.refresh().await.unwrap_err();
    assert!(matches!(err, UpdateError::Unauthenticated));

    // Router is healthy again; the next cycle logs in from scratch.
    harness
        .transport
        .reply_when("POST", "/ubus/", "getRealtimeStats", 200, payloads::status_batch());
    let snap = harness.bridge.refresh().await.unwrap();
    assert_eq!(snap.metrics["cpu"], "12");
    assert_eq!(login_attempts(&harness), 2);
}

#[tokio::test]
async fn rejected_credentials_lock_the_bridge() {
    let harness = TestHarness::new();
    harness
        .transport
        .reply("POST", "/cgi-bin/luci/", 403, "Forbidden");

    let err = harness.bridge.refresh().await.unwrap_err();
    assert!(matches!(err, UpdateError::AuthLocked));
    assert!(err.is_fatal());

    // The latch holds: no second login attempt goes out.
    let err = harness.bridge.refresh().await.unwrap_err();
    assert!(matches!(err, UpdateError::AuthLocked));
    assert_eq!(login_attempts(&harness), 1);
}

#[tokio::test]
async fn login_timeout_skips_the_cycle() {
    let harness = TestHarness::new();
    harness.transport.fail_timeout("POST", "/cgi-bin/luci/");

    let err = harness.bridge.refresh().await.unwrap_err();
    assert!(matches!(
        err,
        UpdateError::Session(SessionError::Transport(TransportError::Timeout(_)))
    ));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn connection_failure_surfaces_as_update_failure() {
    let harness = TestHarness::new();
    harness.transport.fail_connect("POST", "/cgi-bin/luci/");

    let err = harness.bridge.refresh().await.unwrap_err();
    assert!(matches!(
        err,
        UpdateError::Session(SessionError::Transport(TransportError::Connect(_)))
    ));
}

#[tokio::test]
async fn identity_failure_does_not_abort_the_cycle() {
    let harness = TestHarness::new();
    harness.script_login();
    harness
        .transport
        .reply_when("POST", "/ubus/", "\"board\"", 500, json!(""));
    harness
        .transport
        .reply_when("POST", "/ubus/", "getRealtimeStats", 200, payloads::status_batch());
    harness
        .transport
        .reply_when("POST", "/ubus/", "\"option\"", 200, payloads::uci_value("0"));
    harness.transport.reply_json(
        "GET",
        "/admin/services/passwall/ip",
        200,
        payloads::passwall_ip("203.0.113.9", "JP"),
    );

    let snap = harness.bridge.refresh().await.unwrap();
    assert_eq!(snap.metrics["cpu"], "12");
    assert!(snap.get("sw_version").is_none());
    assert_eq!(snap.switch[0].onoff, "off");
}

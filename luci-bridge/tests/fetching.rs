//! DataFetcher behavior against scripted router endpoints

use std::sync::Arc;

use luci_bridge::error::FetchError;
use luci_bridge::fetcher::DataFetcher;
use luci_bridge::SessionToken;
use luci_devkit::{payloads, MockTransport};
use serde_json::json;

fn fetcher(transport: &MockTransport) -> DataFetcher {
    DataFetcher::new("http://192.168.1.1", Arc::new(transport.clone()))
}

fn token() -> SessionToken {
    SessionToken::new("sess", "csrf")
}

#[tokio::test]
async fn status_batch_decodes_end_to_end() {
    let transport = MockTransport::new();
    transport.reply_json("POST", "/ubus/", 200, payloads::status_batch());

    let frag = fetcher(&transport).fetch_status(&token()).await.unwrap();
    assert_eq!(frag["uptime"], "1天1小时1分钟");
    assert_eq!(frag["cpu"], "12");
    assert_eq!(frag["wan_ip"], "203.0.113.2");

    // The batch carries all ten sub-calls, stamped with the session id.
    let sent = transport.requests_to("/ubus/");
    let calls = sent[0].json.as_ref().unwrap().as_array().unwrap().clone();
    assert_eq!(calls.len(), 10);
    assert!(calls.iter().all(|c| c["params"][0] == "sess"));
    assert_eq!(calls[0]["params"][1], "system");
    assert_eq!(calls[9]["params"][2], "getRealtimeStats");
}

#[tokio::test]
async fn unauthorized_status_short_circuits() {
    let transport = MockTransport::new();
    transport.reply("POST", "/ubus/", 401, "");
    let err = fetcher(&transport)
        .fetch_status(&token())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Unauthorized));
}

#[tokio::test]
async fn non_json_status_body_is_unparseable() {
    let transport = MockTransport::new();
    transport.reply("POST", "/ubus/", 200, "<html>gateway error</html>");
    let err = fetcher(&transport)
        .fetch_status(&token())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Unparseable(_)));
}

#[tokio::test]
async fn plugin_status_reads_exit_ip_and_country() {
    let transport = MockTransport::new();
    transport.reply_json(
        "GET",
        "/admin/services/passwall/ip",
        200,
        payloads::passwall_ip("203.0.113.9", "JP"),
    );
    let frag = fetcher(&transport)
        .fetch_plugin_status(&token())
        .await
        .unwrap();
    assert_eq!(frag["passwall_ip"], "203.0.113.9");
    assert_eq!(frag["passwall_country"], "JP");

    let sent = transport.requests_to("/admin/services/passwall/ip");
    assert_eq!(sent[0].header("Cookie").unwrap(), "sysauth_http=sess");
}

#[tokio::test]
async fn plugin_status_defaults_missing_shape() {
    let transport = MockTransport::new();
    transport.reply_json(
        "GET",
        "/admin/services/passwall/ip",
        200,
        json!({"unexpected": "shape"}),
    );
    let frag = fetcher(&transport)
        .fetch_plugin_status(&token())
        .await
        .unwrap();
    assert_eq!(frag["passwall_ip"], "");
    assert_eq!(frag["passwall_country"], "");
}

#[tokio::test]
async fn plugin_status_gateway_error_fails_the_fetch() {
    let transport = MockTransport::new();
    transport.reply("GET", "/admin/services/passwall/ip", 502, "Bad Gateway");
    let err = fetcher(&transport)
        .fetch_plugin_status(&token())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::UnexpectedStatus(502)));
}

#[tokio::test]
async fn switch_states_read_the_uci_option() {
    let transport = MockTransport::new();
    transport.reply_json("POST", "/ubus/", 200, payloads::uci_value("1"));
    let states = fetcher(&transport)
        .fetch_switch_states(&token())
        .await
        .unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].name, "passwall");
    assert_eq!(states[0].onoff, "on");

    let sent = transport.requests_to("/ubus/");
    let params = &sent[0].json.as_ref().unwrap()["params"];
    assert_eq!(params[1], "uci");
    assert_eq!(params[3]["config"], "passwall");
    assert_eq!(params[3]["option"], "enabled");
}

#[tokio::test]
async fn non_one_uci_value_reads_as_off() {
    let transport = MockTransport::new();
    transport.reply_json("POST", "/ubus/", 200, payloads::uci_value("0"));
    let states = fetcher(&transport)
        .fetch_switch_states(&token())
        .await
        .unwrap();
    assert_eq!(states[0].onoff, "off");
}

#[tokio::test]
async fn identity_tolerates_missing_keys() {
    let transport = MockTransport::new();
    transport.reply_json(
        "POST",
        "/ubus/",
        200,
        payloads::batch_reply(&[(41, json!({"hostname": "OpenWrt"}))]),
    );
    let identity = fetcher(&transport).fetch_identity(&token()).await.unwrap();
    assert_eq!(identity.device_name, "OpenWrt");
    assert_eq!(identity.sw_version, "");
    assert_eq!(identity.model, "");
}

#[tokio::test]
async fn identity_reads_the_board_payload() {
    let transport = MockTransport::new();
    transport.reply_json(
        "POST",
        "/ubus/",
        200,
        payloads::batch_reply(&[(
            41,
            payloads::board_info("5.15.0", "router1", "OpenWrt 23.05.2"),
        )]),
    );
    let identity = fetcher(&transport).fetch_identity(&token()).await.unwrap();
    assert_eq!(identity.sw_version, "5.15.0");
    assert_eq!(identity.device_name, "router1");
    assert_eq!(identity.model, "OpenWrt 23.05.2");
}

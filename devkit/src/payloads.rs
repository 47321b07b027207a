/*!
Canned router payloads for tests

Builders for the JSON the LuCI endpoints actually return, so tests read as
"given this router state" instead of inline JSON walls.
*/

use serde_json::{json, Value};

/// Login page body embedding the session id / CSRF token pair the way the
/// LuCI index page does.
pub fn login_page_body(sessionid: &str, token: &str) -> String {
    format!(
        r#"<script type="text/javascript">window.luci = {{ "sessionid": "{sessionid}", "token": "{token}" }}</script>"#
    )
}

/// Batched ubus reply: one `{id, result: [0, payload]}` object per entry.
pub fn batch_reply(entries: &[(u64, Value)]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|(id, payload)| json!({"jsonrpc": "2.0", "id": id, "result": [0, payload]}))
            .collect(),
    )
}

/// Single ubus reply with status 0 and an empty payload.
pub fn ubus_ok() -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": [0, {}]})
}

/// `uci get` reply for one option value.
pub fn uci_value(value: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": [0, {"value": value}]})
}

/// `uci changes` reply, with or without staged changes.
pub fn uci_changes(pending: bool) -> Value {
    let changes = if pending {
        json!({"passwall": [["set", "@global[0]", "enabled", "1"]]})
    } else {
        json!({})
    };
    json!({"jsonrpc": "2.0", "id": 1, "result": [0, {"changes": changes}]})
}

/// apply_rollback reply carrying the confirm token.
pub fn rollback_token(token: &str) -> Value {
    json!({"token": token})
}

/// Passwall status page body: exit IP plus geolocation.
pub fn passwall_ip(outboard: &str, country: &str) -> Value {
    json!({"outboard": outboard, "outboardip": {"country": country}})
}

/// `system board` payload.
pub fn board_info(kernel: &str, hostname: &str, description: &str) -> Value {
    json!({
        "kernel": kernel,
        "hostname": hostname,
        "release": {"distribution": "OpenWrt", "description": description},
    })
}

/// `network.interface dump` payload with one named interface.
pub fn interface_dump(name: &str, ipv4: &str, uptime: u64) -> Value {
    json!({
        "interface": [{
            "interface": name,
            "up": true,
            "uptime": uptime,
            "ipv4-address": [{"address": ipv4, "mask": 24}],
        }]
    })
}

/// A full, healthy ten-call status batch reply.
pub fn status_batch() -> Value {
    batch_reply(&[
        (
            1,
            json!({
                "uptime": 90_061,
                "memory": {
                    "total": 1_073_741_824u64,
                    "free": 268_435_456u64,
                    "shared": 1_048_576u64,
                    "buffered": 33_554_432u64,
                    "available": 536_870_912u64,
                    "cached": 134_217_728u64,
                },
            }),
        ),
        (2, json!({"cpuinfo": "ARMv8 Processor x 4"})),
        (3, json!({"cpuusage": "12%"})),
        (4, json!({"tempinfo": ""})),
        (5, json!({"data": "1234\n"})),
        (6, json!({"onlineusers": 5})),
        (
            7,
            json!({
                "wan": {"ipaddr": "203.0.113.2", "uptime": 7200, "proto": "pppoe"},
                "wan6": {"ipaddr": "2001:db8::1", "uptime": 7200},
            }),
        ),
        (8, interface_dump("lan", "192.168.1.1", 7200)),
        (
            9,
            json!({"br-lan": {"stats": {"rx_bytes": 1_073_741_824u64, "tx_bytes": 536_870_912u64}}}),
        ),
        (
            10,
            json!({"result": [[100, 1000, 2, 2000], [101, 2024, 4, 4048]]}),
        ),
    ])
}

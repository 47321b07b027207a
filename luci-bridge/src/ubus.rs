//! Structured ubus JSON-RPC calls
//!
//! The router's `/ubus/` endpoint takes a JSON array of call objects, each
//! addressed to an internal object/method pair and stamped with a numeric id.
//! Replies carry the same ids but not necessarily the same order, so they are
//! parsed into an id-keyed map and never read positionally.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

pub const UBUS_PATH: &str = "/ubus/";

/// One JSON-RPC 2.0 `call` object.
#[derive(Debug, Clone, Serialize)]
pub struct UbusCall {
    jsonrpc: &'static str,
    pub id: u64,
    method: &'static str,
    params: (String, String, String, Value),
}

impl UbusCall {
    pub fn new(id: u64, sysauth: &str, object: &str, method: &str, args: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: "call",
            params: (
                sysauth.to_string(),
                object.to_string(),
                method.to_string(),
                args,
            ),
        }
    }
}

/// Split a reply object into its ubus status code and payload.
/// `result` is `[code, payload]`; the payload may be absent.
pub fn result_parts(reply: &Value) -> Option<(i64, Option<&Value>)> {
    let result = reply.get("result")?.as_array()?;
    let code = result.first()?.as_i64()?;
    Some((code, result.get(1)))
}

/// Correlate a batched reply array back to the request ids.
///
/// Entries without an id or without a payload are skipped; unknown ids
/// are forward-compatible noise, not errors.
pub fn payload_map(raw: &Value) -> HashMap<u64, Value> {
    let mut out = HashMap::new();
    let Some(replies) = raw.as_array() else {
        return out;
    };
    for reply in replies {
        let Some(id) = reply.get("id").and_then(Value::as_u64) else {
            continue;
        };
        if let Some((_, Some(payload))) = result_parts(reply) {
            out.insert(id, payload.clone());
        }
    }
    out
}

/// Payload of a single (non-batched) reply object.
pub fn single_payload(raw: &Value) -> Option<Value> {
    match result_parts(raw) {
        Some((_, Some(payload))) => Some(payload.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_serializes_to_wire_shape() {
        let call = UbusCall::new(7, "s1", "uci", "get", json!({"config": "network"}));
        let wire = serde_json::to_value(&call).unwrap();
        assert_eq!(
            wire,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "call",
                "params": ["s1", "uci", "get", {"config": "network"}],
            })
        );
    }

    #[test]
    fn payload_map_ignores_reply_order() {
        let raw = json!([
            {"jsonrpc": "2.0", "id": 3, "result": [0, {"cpuusage": "7%"}]},
            {"jsonrpc": "2.0", "id": 1, "result": [0, {"uptime": 42}]},
        ]);
        let map = payload_map(&raw);
        assert_eq!(map[&1]["uptime"], 42);
        assert_eq!(map[&3]["cpuusage"], "7%");
    }

    #[test]
    fn payload_map_skips_malformed_entries() {
        let raw = json!([
            {"jsonrpc": "2.0", "result": [0, {"orphan": true}]},
            {"jsonrpc": "2.0", "id": 5, "result": [6]},
            {"jsonrpc": "2.0", "id": 2, "result": [0, {"ok": true}]},
            "garbage",
        ]);
        let map = payload_map(&raw);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&2]["ok"], true);
    }

    #[test]
    fn single_payload_reads_result_pair() {
        let raw = json!({"jsonrpc": "2.0", "id": 1, "result": [0, {"value": "1"}]});
        assert_eq!(single_payload(&raw).unwrap()["value"], "1");
        assert!(single_payload(&json!({"result": [4]})).is_none());
    }
}

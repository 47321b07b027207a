//! Telemetry aggregation
//!
//! Issues the batched ubus status query plus the auxiliary passwall status
//! query and reshapes the combined result into flat snapshot fragments.
//! Key access is default-valued throughout: a missing sub-result degrades to
//! an empty placeholder, never a panic. Only an outright unauthorized reply
//! (401/403) aborts the cycle, so the coordinator can force a re-login.

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::convert::{hum_convert_nounit, to_gib, uptime_display};
use crate::entities::{self, SwitchMeta};
use crate::error::FetchError;
use crate::session::SessionToken;
use crate::snapshot::{Fragment, SwitchState};
use crate::transport::{HttpReply, Transport};
use crate::ubus::{self, UbusCall, UBUS_PATH};

const PASSWALL_STATUS_PATH: &str = "/cgi-bin/luci/admin/services/passwall/ip";
const CONNTRACK_COUNT_PATH: &str = "/proc/sys/net/netfilter/nf_conntrack_count";

/// Static device identity, fetched once per process lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceIdentity {
    pub sw_version: String,
    pub device_name: String,
    pub model: String,
}

/// Fetches and decodes router telemetry over an established session.
pub struct DataFetcher {
    transport: Arc<dyn Transport>,
    host: String,
}

impl DataFetcher {
    pub fn new(host: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            host: host.to_string(),
        }
    }

    fn ubus_url(&self) -> String {
        format!("{}{}", self.host, UBUS_PATH)
    }

    fn ubus_headers(token: &SessionToken) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Cookie".to_string(), token.cookie()),
        ]
    }

    /// The ten status sub-calls, ids 1-10. Replies are correlated by id on
    /// the way back, never by position.
    fn status_batch(sysauth: &str) -> Vec<UbusCall> {
        vec![
            UbusCall::new(1, sysauth, "system", "info", json!({})),
            UbusCall::new(2, sysauth, "luci", "getCPUInfo", json!({})),
            UbusCall::new(3, sysauth, "luci", "getCPUUsage", json!({})),
            UbusCall::new(4, sysauth, "luci", "getTempInfo", json!({})),
            UbusCall::new(5, sysauth, "file", "read", json!({"path": CONNTRACK_COUNT_PATH})),
            UbusCall::new(6, sysauth, "luci", "getOnlineUsers", json!({})),
            UbusCall::new(7, sysauth, "uci", "get", json!({"config": "network"})),
            UbusCall::new(8, sysauth, "network.interface", "dump", json!({})),
            UbusCall::new(9, sysauth, "luci-rpc", "getNetworkDevices", json!({})),
            UbusCall::new(
                10,
                sysauth,
                "luci",
                "getRealtimeStats",
                json!({"mode": "interface", "device": "br-lan"}),
            ),
        ]
    }

    /// One batched status query, decoded into a snapshot fragment.
    pub async fn fetch_status(&self, token: &SessionToken) -> Result<Fragment, FetchError> {
        let batch = Self::status_batch(&token.sysauth);
        let body = serde_json::to_value(&batch)
            .map_err(|e| FetchError::Unparseable(e.to_string()))?;
        let reply = self
            .transport
            .post_json(&self.ubus_url(), &Self::ubus_headers(token), body)
            .await?;
        let raw = checked_json(&reply)?;
        Ok(decode_status(&ubus::payload_map(&raw)))
    }

    /// Exit IP / exit country of the passwall plugin. Not ubus: a plugin
    /// status page returning a bare JSON object.
    pub async fn fetch_plugin_status(&self, token: &SessionToken) -> Result<Fragment, FetchError> {
        let url = format!("{}{}", self.host, PASSWALL_STATUS_PATH);
        let headers = vec![("Cookie".to_string(), token.cookie())];
        let reply = self.transport.get(&url, &headers).await?;
        let raw = checked_json(&reply)?;

        let mut out = Fragment::new();
        out.insert(
            "passwall_ip".to_string(),
            raw.get("outboard").cloned().unwrap_or_else(|| json!("")),
        );
        out.insert(
            "passwall_country".to_string(),
            raw.pointer("/outboardip/country")
                .cloned()
                .unwrap_or_else(|| json!("")),
        );
        Ok(out)
    }

    /// Read every configured toggle's backing uci option concurrently.
    pub async fn fetch_switch_states(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<SwitchState>, FetchError> {
        let reads = entities::switches()
            .iter()
            .map(|meta| self.switch_state(token, meta));
        try_join_all(reads).await
    }

    async fn switch_state(
        &self,
        token: &SessionToken,
        meta: &SwitchMeta,
    ) -> Result<SwitchState, FetchError> {
        let call = UbusCall::new(
            1,
            &token.sysauth,
            "uci",
            "get",
            json!({"config": meta.config, "section": meta.section, "option": meta.option}),
        );
        let body = serde_json::to_value(&call)
            .map_err(|e| FetchError::Unparseable(e.to_string()))?;
        let reply = self
            .transport
            .post_json(&self.ubus_url(), &Self::ubus_headers(token), body)
            .await?;
        let raw = checked_json(&reply)?;

        let value = ubus::single_payload(&raw)
            .and_then(|p| p.get("value").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_default();
        let onoff = if value == "1" { "on" } else { "off" };
        Ok(SwitchState {
            name: meta.name.to_string(),
            onoff: onoff.to_string(),
        })
    }

    /// One-shot board info query. Missing keys default to empty strings
    /// rather than failing.
    pub async fn fetch_identity(&self, token: &SessionToken) -> Result<DeviceIdentity, FetchError> {
        let batch = vec![UbusCall::new(41, &token.sysauth, "system", "board", json!({}))];
        let body = serde_json::to_value(&batch)
            .map_err(|e| FetchError::Unparseable(e.to_string()))?;
        let reply = self
            .transport
            .post_json(&self.ubus_url(), &Self::ubus_headers(token), body)
            .await?;
        let raw = checked_json(&reply)?;

        let board = ubus::payload_map(&raw).remove(&41).unwrap_or_else(|| json!({}));
        Ok(DeviceIdentity {
            sw_version: field_string(&board, "kernel"),
            device_name: field_string(&board, "hostname"),
            model: board
                .pointer("/release/description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Status gate shared by every authenticated fetch: 401/403 invalidates the
/// session, anything else non-200 fails the cycle with its code.
fn checked_json(reply: &HttpReply) -> Result<Value, FetchError> {
    if reply.status == 401 || reply.status == 403 {
        return Err(FetchError::Unauthorized);
    }
    if !reply.is_ok() {
        return Err(FetchError::UnexpectedStatus(reply.status));
    }
    reply
        .json()
        .map_err(|e| FetchError::Unparseable(e.to_string()))
}

fn field_f64(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn field_string(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Reshape the id-keyed batch results into the flat status fragment.
/// Ids not handled here are skipped, not errors.
fn decode_status(results: &HashMap<u64, Value>) -> Fragment {
    let mut out = Fragment::new();

    if let Some(info) = results.get(&1) {
        if let Some(uptime) = info.get("uptime") {
            out.insert("uptime".to_string(), json!(uptime_display(uptime)));
        }
        if let Some(memory) = info.get("memory") {
            let total = field_f64(memory, "total");
            let available = field_f64(memory, "available");
            if total > 0.0 {
                let used_pct = ((1.0 - available / total) * 100.0).round();
                out.insert("memory".to_string(), json!(used_pct));
            }
            out.insert("memory_attrs".to_string(), memory.clone());
            for key in ["total", "free", "shared", "buffered", "available", "cached"] {
                let raw = memory.get(key).cloned().unwrap_or_else(|| json!(0));
                let bytes = raw.as_f64().unwrap_or(0.0);
                out.insert(format!("memory_{key}"), raw);
                out.insert(format!("memory_{key}_gb"), json!(to_gib(bytes)));
            }
        }
    }

    if results.contains_key(&2) {
        // TODO: read the real value once getTempInfo's reply shape is mapped.
        out.insert("cputemp".to_string(), json!(0));
    }

    if let Some(usage) = results.get(&3) {
        if let Some(cpu) = usage.get("cpuusage").and_then(Value::as_str) {
            out.insert("cpu".to_string(), json!(cpu.replace('%', "")));
        }
    }

    if let Some(file) = results.get(&5) {
        if let Some(data) = file.get("data").and_then(Value::as_str) {
            out.insert("conncount".to_string(), json!(data.replace('\n', "")));
        }
    }

    if let Some(users) = results.get(&6) {
        if let Some(count) = users.get("onlineusers") {
            out.insert("user_online".to_string(), count.clone());
        }
    }

    let network = results.get(&7).cloned().unwrap_or_else(|| json!({}));
    decode_wan_section(&mut out, &network, "wan", "wan_ip", "wan_ip_attrs", "wan_uptime");
    decode_wan_section(&mut out, &network, "wan6", "wan6_ip", "wan6_ip_attrs", "wan6_uptime");

    // No wan section in the network config: some setups only expose the
    // address on the interface literally named "lan". Deliberate fallback.
    let wan_ip_empty = out
        .get("wan_ip")
        .and_then(Value::as_str)
        .map(str::is_empty)
        .unwrap_or(true);
    if wan_ip_empty {
        if let Some(ifaces) = results.get(&8).and_then(|d| d.get("interface")).and_then(Value::as_array) {
            for iface in ifaces {
                if iface.get("interface").and_then(Value::as_str) != Some("lan") {
                    continue;
                }
                if let Some(addr) = iface.pointer("/ipv4-address/0/address") {
                    out.insert("wan_ip".to_string(), addr.clone());
                }
                if let Some(up) = iface.get("uptime") {
                    out.insert("wan_uptime".to_string(), json!(uptime_display(up)));
                }
            }
        }
    }

    if let Some(stats) = results.get(&9).and_then(|d| d.pointer("/br-lan/stats")) {
        out.insert(
            "rx".to_string(),
            json!(hum_convert_nounit(field_f64(stats, "rx_bytes"))),
        );
        out.insert(
            "tx".to_string(),
            json!(hum_convert_nounit(field_f64(stats, "tx_bytes"))),
        );
    }

    if let Some(samples) = results.get(&10).and_then(|r| r.get("result")).and_then(Value::as_array) {
        if samples.len() >= 2 {
            let col = |row: usize, idx: usize| {
                samples
                    .get(row)
                    .and_then(|r| r.get(idx))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
            };
            let dt = col(1, 0) - col(0, 0);
            if dt > 0.0 {
                let rx_rate = (col(1, 1) - col(0, 1)) / dt;
                let tx_rate = (col(1, 3) - col(0, 3)) / dt;
                out.insert("rx_rate".to_string(), json!(hum_convert_nounit(rx_rate)));
                out.insert("tx_rate".to_string(), json!(hum_convert_nounit(tx_rate)));
            }
        }
    }

    out
}

fn decode_wan_section(
    out: &mut Fragment,
    network: &Value,
    section: &str,
    ip_key: &str,
    attrs_key: &str,
    uptime_key: &str,
) {
    match network.get(section) {
        Some(sec) => {
            out.insert(
                ip_key.to_string(),
                sec.get("ipaddr").cloned().unwrap_or_else(|| json!("")),
            );
            out.insert(attrs_key.to_string(), sec.clone());
            let uptime = sec.get("uptime").cloned().unwrap_or(Value::Null);
            out.insert(uptime_key.to_string(), json!(uptime_display(&uptime)));
        }
        None => {
            out.insert(ip_key.to_string(), json!(""));
            out.insert(uptime_key.to_string(), json!(""));
        }
    }
}

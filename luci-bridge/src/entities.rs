//! Static entity metadata
//!
//! Display metadata for everything the bridge publishes: one sensor per
//! fixed metric key, one switch per configured toggle, one button per
//! one-shot action. Pure lookup tables, no logic beyond name resolution
//! and unique-id derivation.

pub const DOMAIN: &str = "luci_bridge";

#[derive(Debug, Clone, Copy)]
pub struct SensorMeta {
    pub key: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct SwitchMeta {
    pub key: &'static str,
    pub name: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    /// uci location of the backing option.
    pub config: &'static str,
    pub section: &'static str,
    pub option: &'static str,
    pub turn_on_value: &'static str,
    pub turn_off_value: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum ButtonAction {
    /// ubus `system reboot`.
    Reboot,
    /// Bounce a named network interface (down, then up).
    ReconnectInterface(&'static str),
    /// Submit a preconfigured form; `{{action_token}}` in a field value is
    /// replaced with the live CSRF token.
    SubmitForm {
        path: &'static str,
        fields: &'static [(&'static str, &'static str)],
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ButtonMeta {
    pub key: &'static str,
    pub label: &'static str,
    pub device_class: &'static str,
    pub action: ButtonAction,
}

pub const SENSORS: &[SensorMeta] = &[
    SensorMeta { key: "uptime", label: "OpenWrt启动时长", icon: "mdi:clock-time-eight", unit: None, device_class: None },
    SensorMeta { key: "cpu", label: "CPU占用", icon: "mdi:cpu-64-bit", unit: Some("%"), device_class: None },
    SensorMeta { key: "cputemp", label: "CPU温度", icon: "mdi:thermometer", unit: Some("°C"), device_class: Some("temperature") },
    SensorMeta { key: "memory", label: "内存占用", icon: "mdi:memory", unit: Some("%"), device_class: None },
    SensorMeta { key: "memory_total", label: "内存总数", icon: "mdi:memory", unit: Some("B"), device_class: None },
    SensorMeta { key: "memory_total_gb", label: "内存总数", icon: "mdi:memory", unit: Some("GiB"), device_class: None },
    SensorMeta { key: "memory_free", label: "空闲内存", icon: "mdi:memory", unit: Some("B"), device_class: None },
    SensorMeta { key: "memory_free_gb", label: "空闲内存", icon: "mdi:memory", unit: Some("GiB"), device_class: None },
    SensorMeta { key: "memory_shared", label: "共享内存", icon: "mdi:memory", unit: Some("B"), device_class: None },
    SensorMeta { key: "memory_shared_gb", label: "共享内存", icon: "mdi:memory", unit: Some("GiB"), device_class: None },
    SensorMeta { key: "memory_buffered", label: "缓冲内存", icon: "mdi:memory", unit: Some("B"), device_class: None },
    SensorMeta { key: "memory_buffered_gb", label: "缓冲内存", icon: "mdi:memory", unit: Some("GiB"), device_class: None },
    SensorMeta { key: "memory_available", label: "可用内存", icon: "mdi:memory", unit: Some("B"), device_class: None },
    SensorMeta { key: "memory_available_gb", label: "可用内存", icon: "mdi:memory", unit: Some("GiB"), device_class: None },
    SensorMeta { key: "memory_cached", label: "缓存内存", icon: "mdi:memory", unit: Some("B"), device_class: None },
    SensorMeta { key: "memory_cached_gb", label: "缓存内存", icon: "mdi:memory", unit: Some("GiB"), device_class: None },
    SensorMeta { key: "wan_ip", label: "WAN IP", icon: "mdi:wan", unit: None, device_class: None },
    SensorMeta { key: "wan_uptime", label: "WAN Uptime", icon: "mdi:timer-sync-outline", unit: None, device_class: None },
    SensorMeta { key: "wan6_ip", label: "WAN IP6", icon: "mdi:wan", unit: None, device_class: None },
    SensorMeta { key: "wan6_uptime", label: "WAN IP6 Uptime", icon: "mdi:timer-sync-outline", unit: None, device_class: None },
    SensorMeta { key: "user_online", label: "在线用户数", icon: "mdi:account-multiple", unit: None, device_class: None },
    SensorMeta { key: "conncount", label: "活动连接", icon: "mdi:lan-connect", unit: None, device_class: None },
    SensorMeta { key: "tx", label: "上传总量", icon: "mdi:upload-network", unit: Some("GB"), device_class: None },
    SensorMeta { key: "tx_rate", label: "上传速度", icon: "mdi:upload-network", unit: Some("KB/s"), device_class: None },
    SensorMeta { key: "rx", label: "下载总量", icon: "mdi:download-network", unit: Some("GB"), device_class: None },
    SensorMeta { key: "rx_rate", label: "下载速度", icon: "mdi:download-network", unit: Some("KB/s"), device_class: None },
    SensorMeta { key: "passwall_ip", label: "PassWall IP", icon: "mdi:ip-network-outline", unit: None, device_class: None },
    SensorMeta { key: "passwall_country", label: "PassWall节点", icon: "mdi:lan-connect", unit: None, device_class: None },
];

pub const SWITCHES: &[SwitchMeta] = &[SwitchMeta {
    key: "passwall",
    name: "passwall",
    label: "PassWall开关",
    icon: "mdi:account-lock",
    config: "passwall",
    section: "@global[0]",
    option: "enabled",
    turn_on_value: "1",
    turn_off_value: "0",
}];

// The subscribe form mirrors what the LuCI page posts; the cfg section ids
// vary per router and are captured from the running UI.
const NODE_SUBSCRIBE_FIELDS: &[(&str, &str)] = &[
    ("token", "{{action_token}}"),
    ("cbi.submit", "1"),
    ("cbi.cbe.passwall.cfg08b7d7.subscribe_proxy", "1"),
    ("cbid.passwall.cfg08b7d7.filter_keyword_mode", "1"),
    ("cbid.passwall.cfg08b7d7.filter_discard_list", "s801"),
    ("cbid.passwall.cfg08b7d7.filter_discard_list", "剩余流量"),
    ("cbid.passwall.cfg08b7d7.filter_discard_list", "QQ群"),
    ("cbid.passwall.cfg08b7d7.filter_discard_list", "官网"),
    ("cbid.passwall.cfg08b7d7.filter_keep_list", ""),
    ("cbid.passwall.cfg08b7d7.ss_aead_type", "xray"),
    ("cbid.passwall.cfg08b7d7.trojan_type", "trojan-plus"),
    ("cbi.sts.passwall.subscribe_list", ""),
    ("cbid.passwall.cfg108b02.remark", "SS"),
    ("cbid.passwall.cfg108b02.url", "https://xxxxxxxxxxxxxxxxxxxx"),
    ("cbid.passwall.cfg108b02._update", "手动订阅"),
];

pub const BUTTONS: &[ButtonMeta] = &[
    ButtonMeta {
        key: "restart",
        label: "OpenWrt重启",
        device_class: "restart",
        action: ButtonAction::Reboot,
    },
    ButtonMeta {
        key: "reconnect_wan",
        label: "OpenWrt重连wan网络",
        device_class: "restart",
        action: ButtonAction::ReconnectInterface("wan"),
    },
    ButtonMeta {
        key: "reconnect_wan6",
        label: "OpenWrt重连wan6网络",
        device_class: "restart",
        action: ButtonAction::ReconnectInterface("wan6"),
    },
    ButtonMeta {
        key: "reconnect_gw",
        label: "OpenWrt重连GW网络",
        device_class: "restart",
        action: ButtonAction::ReconnectInterface("gw"),
    },
    ButtonMeta {
        key: "reconnect_docker",
        label: "OpenWrt重连docker网络",
        device_class: "restart",
        action: ButtonAction::ReconnectInterface("docker"),
    },
    ButtonMeta {
        key: "node_subscribe",
        label: "OpenWrt重新订阅fq节点",
        device_class: "restart",
        action: ButtonAction::SubmitForm {
            path: "admin/services/passwall/node_subscribe",
            fields: NODE_SUBSCRIBE_FIELDS,
        },
    },
];

pub fn sensors() -> &'static [SensorMeta] {
    SENSORS
}

pub fn switches() -> &'static [SwitchMeta] {
    SWITCHES
}

pub fn buttons() -> &'static [ButtonMeta] {
    BUTTONS
}

pub fn switch(name: &str) -> Option<&'static SwitchMeta> {
    SWITCHES.iter().find(|s| s.key == name || s.name == name)
}

pub fn button(name: &str) -> Option<&'static ButtonMeta> {
    BUTTONS.iter().find(|b| b.key == name)
}

/// Entity ids are keyed by device host so several routers can coexist.
pub fn unique_id(kind: &str, key: &str, host: &str) -> String {
    format!("{DOMAIN}_{kind}_{key}_{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sensor_keys_are_unique() {
        let keys: HashSet<_> = SENSORS.iter().map(|s| s.key).collect();
        assert_eq!(keys.len(), SENSORS.len());
    }

    #[test]
    fn lookups_resolve_by_name() {
        assert!(switch("passwall").is_some());
        assert!(switch("nonexistent").is_none());
        assert!(button("restart").is_some());
        assert!(matches!(
            button("reconnect_wan").unwrap().action,
            ButtonAction::ReconnectInterface("wan")
        ));
    }

    #[test]
    fn unique_ids_are_host_scoped() {
        assert_eq!(
            unique_id("sensor", "uptime", "http://192.168.1.1"),
            "luci_bridge_sensor_uptime_http://192.168.1.1"
        );
    }
}

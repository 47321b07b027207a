//! The merged per-cycle telemetry record

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Metric-key -> value fragment produced by one fetch.
pub type Fragment = BTreeMap<String, Value>;

/// On/off state of one configured toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchState {
    pub name: String,
    pub onoff: String,
}

/// One fully merged telemetry record.
///
/// Either fully populated (empty-string placeholders allowed for
/// unavailable sub-fields) or not produced at all: a failed cycle yields
/// an error, never a partial snapshot. The host diffs/publishes the flat
/// map as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub metrics: Fragment,
    pub switch: Vec<SwitchState>,
    pub querytime: String,
}

impl Snapshot {
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.metrics.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metrics.get(key)
    }

    /// True when two snapshots describe the same router state, ignoring
    /// the per-cycle timestamp.
    pub fn same_state_as(&self, other: &Snapshot) -> bool {
        self.metrics == other.metrics && self.switch == other.switch
    }
}

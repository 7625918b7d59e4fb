//! Telemetry payloads carried inside `METRICS_UPDATE`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One telemetry sample pushed by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// ISO-8601 or millisecond epoch, only ever used for display.
    pub timestamp: String,
    pub bots_online: u32,
    pub bots_total: u32,
    pub packets_sent_per_second: f64,
    pub packets_received_per_second: f64,
    pub bytes_sent_per_second: f64,
    pub bytes_received_per_second: f64,
    pub avg_health: f64,
    pub avg_food_level: f64,
    pub avg_tick_duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distributions {
    pub dimension_counts: BTreeMap<String, u32>,
    pub bot_positions: Vec<BotPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotPosition { pub x: f64, pub z: f64, pub dimension: String }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo { pub friendly_name: String, pub state: String }

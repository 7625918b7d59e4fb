//! Display-ready digest of a [`SessionView`] for the dashboard screen.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::phase::Phase;
use crate::session::SessionView;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSlice {
    pub dimension: String,
    pub count: u32,
}

/// One x-axis tick shared by the line and area charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub time: String,
    pub online: u32,
    pub total: u32,
    pub packets_sent: f64,
    pub packets_received: f64,
    pub upload: f64,
    pub download: f64,
    pub health: f64,
    pub food: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionPoint {
    pub x: f64,
    pub z: f64,
    pub dimension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub phase: Phase,
    pub headline: String,
    pub instance_state: Option<String>,
    pub status: String,
    pub tiles: Vec<Tile>,
    pub last_updated: String,
    pub dimensions: Vec<DimensionSlice>,
    pub series: Vec<SeriesPoint>,
    pub positions: Vec<PositionPoint>,
    pub history_len: usize,
}

impl DashboardSummary {
    pub fn new(view: &SessionView, status: &str) -> Self {
        let metrics = &view.metrics;
        let latest = metrics.snapshots.last();
        let headline = match (view.phase, &metrics.instance_info) {
            (Phase::Loading, _) => "SoulFire is loading...".to_owned(),
            (Phase::Displaying, Some(info)) => info.friendly_name.clone(),
            _ => "Connected, waiting for metrics...".to_owned(),
        };

        let dash = || "-".to_owned();
        let tiles = vec![
            Tile {
                label: "Online",
                value: latest.map_or_else(
                    || "-/-".to_owned(),
                    |s| format!("{}/{}", s.bots_online, s.bots_total),
                ),
            },
            Tile {
                label: "Pkt/s",
                value: latest.map_or_else(dash, |s| {
                    format_number(s.packets_sent_per_second + s.packets_received_per_second)
                }),
            },
            Tile {
                label: "Traffic",
                value: latest.map_or_else(dash, |s| {
                    format_bytes(s.bytes_sent_per_second + s.bytes_received_per_second)
                }),
            },
            Tile {
                label: "Health",
                value: latest.map_or_else(dash, |s| format!("{:.1}", s.avg_health)),
            },
            Tile {
                label: "Tick",
                value: latest.map_or_else(dash, |s| format!("{:.1}ms", s.avg_tick_duration_ms)),
            },
        ];

        let dimensions = metrics
            .distributions
            .iter()
            .flat_map(|d| d.dimension_counts.iter())
            .map(|(dim, count)| DimensionSlice {
                dimension: short_dimension(dim).to_owned(),
                count: *count,
            })
            .collect();

        let series = metrics
            .snapshots
            .iter()
            .map(|s| SeriesPoint {
                time: format_time(&s.timestamp).unwrap_or_else(|| s.timestamp.clone()),
                online: s.bots_online,
                total: s.bots_total,
                packets_sent: s.packets_sent_per_second.round(),
                packets_received: s.packets_received_per_second.round(),
                upload: s.bytes_sent_per_second,
                download: s.bytes_received_per_second,
                health: round1(s.avg_health),
                food: round1(s.avg_food_level),
            })
            .collect();

        let positions = metrics
            .distributions
            .iter()
            .flat_map(|d| d.bot_positions.iter())
            .map(|p| PositionPoint {
                x: p.x,
                z: p.z,
                dimension: short_dimension(&p.dimension).to_owned(),
            })
            .collect();

        Self {
            phase: view.phase,
            headline,
            instance_state: metrics.instance_info.as_ref().map(|i| i.state.clone()),
            status: status.to_owned(),
            tiles,
            last_updated: latest
                .and_then(|s| format_time(&s.timestamp))
                .unwrap_or_else(|| "N/A".to_owned()),
            dimensions,
            series,
            positions,
            history_len: metrics.snapshots.len(),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n < 1000.0 {
        format!("{n:.0}")
    } else if n < 1_000_000.0 {
        format!("{:.1}K", n / 1000.0)
    } else {
        format!("{:.1}M", n / 1_000_000.0)
    }
}

pub fn format_bytes(bytes: f64) -> String {
    const KIB: f64 = 1024.0;
    if bytes < KIB {
        format!("{bytes:.0} B/s")
    } else if bytes < KIB * KIB {
        format!("{:.1} KB/s", bytes / KIB)
    } else {
        format!("{:.1} MB/s", bytes / (KIB * KIB))
    }
}

/// `HH:MM:SS` (UTC) from an RFC 3339 string or a millisecond epoch.
pub fn format_time(timestamp: &str) -> Option<String> {
    let parsed = match timestamp.parse::<i64>() {
        Ok(millis) => DateTime::<Utc>::from_timestamp_millis(millis)?,
        Err(_) => DateTime::parse_from_rfc3339(timestamp).ok()?.with_timezone(&Utc),
    };
    Some(parsed.format("%H:%M:%S").to_string())
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn short_dimension(dimension: &str) -> &str {
    dimension.strip_prefix("minecraft:").unwrap_or(dimension)
}

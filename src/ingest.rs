//! Rolling metrics state fed by `METRICS_UPDATE` / `METRICS_STOP`.

use std::collections::VecDeque;

use serde::Serialize;

use crate::types::{Distributions, InstanceInfo, Snapshot};

pub const MAX_SNAPSHOTS: usize = 20;

/// Arrival-ordered history, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SnapshotWindow {
    entries: VecDeque<Snapshot>,
}

impl SnapshotWindow {
    pub fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == MAX_SNAPSHOTS {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}

#[derive(Debug, Default)]
pub struct MetricsIngestor {
    window: SnapshotWindow,
    distributions: Option<Distributions>,
    instance_info: Option<InstanceInfo>,
}

impl MetricsIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the snapshot and replaces the latest-only fields wholesale.
    /// Callers gate this on the session phase.
    pub fn on_update(
        &mut self,
        snapshot: Snapshot,
        distributions: Distributions,
        instance_info: InstanceInfo,
    ) {
        self.window.push(snapshot);
        self.distributions = Some(distributions);
        self.instance_info = Some(instance_info);
    }

    pub fn on_stop(&mut self) {
        self.window.clear();
        self.distributions = None;
        self.instance_info = None;
    }

    pub fn window(&self) -> &SnapshotWindow {
        &self.window
    }

    pub fn distributions(&self) -> Option<&Distributions> {
        self.distributions.as_ref()
    }

    pub fn instance_info(&self) -> Option<&InstanceInfo> {
        self.instance_info.as_ref()
    }
}

/// What the presentation layer gets to see. Owned, so holding one never
/// blocks the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsView {
    pub snapshots: Vec<Snapshot>,
    pub distributions: Option<Distributions>,
    pub instance_info: Option<InstanceInfo>,
}

impl From<&MetricsIngestor> for MetricsView {
    fn from(ingestor: &MetricsIngestor) -> Self {
        Self {
            snapshots: ingestor.window.iter().cloned().collect(),
            distributions: ingestor.distributions.clone(),
            instance_info: ingestor.instance_info.clone(),
        }
    }
}

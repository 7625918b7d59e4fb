//! Session phase and the transitions between phases.

use serde::Serialize;

/// Coarse session lifecycle. Never returns to `Loading` once left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Loading,
    Authenticated,
    Displaying,
}

impl Phase {
    /// Metrics messages are only acted upon once the peer is trusted.
    pub fn accepts_metrics(self) -> bool {
        matches!(self, Self::Authenticated | Self::Displaying)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Authenticated => "authenticated",
            Self::Displaying => "displaying",
        }
    }
}

#[derive(Debug, Default)]
pub struct PhaseMachine {
    phase: Phase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Phase {
        self.phase
    }

    /// `Loading -> Authenticated`. Returns whether the phase changed.
    pub fn authenticate(&mut self) -> bool {
        if self.phase != Phase::Loading {
            return false;
        }
        self.phase = Phase::Authenticated;
        true
    }

    /// `Authenticated | Displaying -> Displaying`.
    pub fn display(&mut self) -> bool {
        if !self.phase.accepts_metrics() {
            return false;
        }
        self.phase = Phase::Displaying;
        true
    }

    /// `Authenticated | Displaying -> Authenticated`.
    pub fn reset(&mut self) -> bool {
        if !self.phase.accepts_metrics() {
            return false;
        }
        self.phase = Phase::Authenticated;
        true
    }
}

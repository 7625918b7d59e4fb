//! Session aggregate: handshake, phase and ingested metrics in one owned
//! value. Handling a message is a pure state transition that reports what
//! the receiver should tell the transport.

use serde::Serialize;
use tracing::debug;

use crate::handshake::{Handshake, Nonce, Verdict};
use crate::ingest::{MetricsIngestor, MetricsView};
use crate::phase::{Phase, PhaseMachine};
use crate::protocol::{InboundMessage, OutboundMessage};

pub const STATUS_LOADING: &str = "Loading";
pub const STATUS_SHOWING: &str = "Showing graphs";
pub const STATUS_INVALID_CHALLENGE: &str = "Invalid challenge";

/// Side effects of one handled message.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub replies: Vec<OutboundMessage>,
    pub status: Option<&'static str>,
    /// Whether anything observable by the presentation layer changed.
    pub changed: bool,
}

impl Outcome {
    fn reply(message: OutboundMessage) -> Self {
        Self {
            replies: vec![message],
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    handshake: Handshake,
    phase: PhaseMachine,
    metrics: MetricsIngestor,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.handshake.begin();
    }

    pub fn begin_with(&mut self, nonce: Nonce) {
        self.handshake.begin_with(nonce);
    }

    pub fn phase(&self) -> Phase {
        self.phase.current()
    }

    pub fn is_trusted(&self) -> bool {
        self.handshake.is_trusted()
    }

    pub fn metrics(&self) -> &MetricsIngestor {
        &self.metrics
    }

    pub fn handle(&mut self, message: InboundMessage) -> Outcome {
        match message {
            InboundMessage::InitialHello => Outcome::reply(self.handshake.challenge()),
            InboundMessage::ChallengeResponse { challenge } => self.on_challenge(&challenge),
            InboundMessage::MetricsUpdate {
                snapshot,
                distributions,
                instance_info,
            } => {
                if !self.metrics_allowed("METRICS_UPDATE") {
                    return Outcome::default();
                }
                self.metrics.on_update(snapshot, distributions, instance_info);
                self.phase.display();
                Outcome {
                    changed: true,
                    ..Outcome::default()
                }
            }
            InboundMessage::MetricsStop => {
                if !self.metrics_allowed("METRICS_STOP") {
                    return Outcome::default();
                }
                let changed = self.phase() == Phase::Displaying || !self.metrics.window().is_empty();
                self.metrics.on_stop();
                self.phase.reset();
                Outcome {
                    changed,
                    ..Outcome::default()
                }
            }
            InboundMessage::Unknown => Outcome::default(),
        }
    }

    fn on_challenge(&mut self, challenge: &str) -> Outcome {
        match self.handshake.verify(challenge) {
            Verdict::Accepted => {
                self.phase.authenticate();
                Outcome {
                    replies: vec![OutboundMessage::LoginSuccess],
                    status: Some(STATUS_SHOWING),
                    changed: true,
                }
            }
            Verdict::Reaffirmed => Outcome {
                replies: vec![OutboundMessage::LoginSuccess],
                status: Some(STATUS_SHOWING),
                changed: false,
            },
            Verdict::Rejected => Outcome {
                status: Some(STATUS_INVALID_CHALLENGE),
                ..Outcome::default()
            },
        }
    }

    fn metrics_allowed(&self, kind: &str) -> bool {
        let allowed = self.handshake.is_trusted() && self.phase().accepts_metrics();
        if !allowed {
            debug!(kind, phase = self.phase().as_str(), "dropping metrics message from untrusted peer");
        }
        allowed
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase(),
            metrics: MetricsView::from(&self.metrics),
        }
    }
}

/// Immutable picture of the session for rendering. Never carries the nonce.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionView {
    pub phase: Phase,
    #[serde(flatten)]
    pub metrics: MetricsView,
}

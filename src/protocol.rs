//! Wire shapes exchanged over the custom-message namespace.
//!
//! Every payload is a JSON object discriminated by its `type` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{Distributions, InstanceInfo, Snapshot};

/// Namespace the controller and the receiver agree on.
pub const DEFAULT_NAMESPACE: &str = "urn:x-cast:com.soulfiremc";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    InitialHello,
    ChallengeResponse {
        challenge: String,
    },
    MetricsUpdate {
        snapshot: Snapshot,
        distributions: Distributions,
        #[serde(rename = "instanceInfo")]
        instance_info: InstanceInfo,
    },
    MetricsStop,
    /// Any `type` this receiver does not know about.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialHello => "INITIAL_HELLO",
            Self::ChallengeResponse { .. } => "CHALLENGE_RESPONSE",
            Self::MetricsUpdate { .. } => "METRICS_UPDATE",
            Self::MetricsStop => "METRICS_STOP",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    ChallengeRequest { challenge: String },
    LoginSuccess,
    GenericMessage { message: String },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload has no string `type` field")]
    MissingType,
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Decodes a raw payload. Unknown discriminators come back as
/// [`InboundMessage::Unknown`]; only a missing `type` or a known `type` with
/// a broken body is an error.
pub fn decode_inbound(payload: Value) -> Result<InboundMessage, CodecError> {
    let kind = payload
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingType)?
        .to_owned();
    serde_json::from_value(payload).map_err(|source| CodecError::Malformed { kind, source })
}

pub fn encode_outbound(message: &OutboundMessage) -> Result<Value, CodecError> {
    serde_json::to_value(message).map_err(CodecError::from)
}

//! Host transport seam. The receiver never talks to sockets directly; it is
//! handed something that implements [`Transport`].

pub mod memory;
pub mod ws;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    Json,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    pub custom_namespaces: BTreeMap<String, MessageType>,
    pub skip_players_load: bool,
    pub disable_idle_timeout: bool,
}

impl StartOptions {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            custom_namespaces: BTreeMap::from([(namespace.to_owned(), MessageType::Json)]),
            skip_players_load: true,
            disable_idle_timeout: true,
        }
    }
}

/// Everything the host can tell the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Ready,
    PeerConnected(Uuid),
    PeerDisconnected(Uuid),
    Message { namespace: String, data: Value },
    /// Host-side request to tear the session down.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not started")]
    NotStarted,
    #[error("namespace {0} is not declared")]
    UnknownNamespace(String),
    #[error("transport already started")]
    AlreadyStarted,
    #[error("transport closed")]
    Closed,
}

pub type TransportResult<T> = Result<T, TransportError>;

pub trait Transport {
    fn add_message_listener(&mut self, namespace: &str);
    fn remove_message_listener(&mut self, namespace: &str);
    fn add_ready_listener(&mut self);
    fn remove_ready_listener(&mut self);

    fn start(&mut self, options: StartOptions) -> TransportResult<()>;
    fn stop(&mut self);

    /// No peer target: the host delivers to whoever is connected.
    fn send(&mut self, namespace: &str, payload: Value) -> TransportResult<()>;

    /// Free-form status line shown by the host.
    fn set_application_state(&mut self, status: &str);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn add_message_listener(&mut self, namespace: &str) {
        (**self).add_message_listener(namespace)
    }

    fn remove_message_listener(&mut self, namespace: &str) {
        (**self).remove_message_listener(namespace)
    }

    fn add_ready_listener(&mut self) {
        (**self).add_ready_listener()
    }

    fn remove_ready_listener(&mut self) {
        (**self).remove_ready_listener()
    }

    fn start(&mut self, options: StartOptions) -> TransportResult<()> {
        (**self).start(options)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn send(&mut self, namespace: &str, payload: Value) -> TransportResult<()> {
        (**self).send(namespace, payload)
    }

    fn set_application_state(&mut self, status: &str) {
        (**self).set_application_state(status)
    }
}

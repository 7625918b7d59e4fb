//! Recording transport for tests and embedding.

use std::collections::BTreeSet;

use serde_json::Value;

use super::{StartOptions, Transport, TransportError, TransportResult};

#[derive(Debug, Default)]
pub struct MemoryTransport {
    pub message_listeners: BTreeSet<String>,
    pub ready_listener: bool,
    pub options: Option<StartOptions>,
    pub running: bool,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub sent: Vec<(String, Value)>,
    pub statuses: Vec<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads sent so far, namespace dropped.
    pub fn payloads(&self) -> Vec<Value> {
        self.sent.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }

    pub fn has_listeners(&self) -> bool {
        self.ready_listener || !self.message_listeners.is_empty()
    }
}

impl Transport for MemoryTransport {
    fn add_message_listener(&mut self, namespace: &str) {
        self.message_listeners.insert(namespace.to_owned());
    }

    fn remove_message_listener(&mut self, namespace: &str) {
        self.message_listeners.remove(namespace);
    }

    fn add_ready_listener(&mut self) {
        self.ready_listener = true;
    }

    fn remove_ready_listener(&mut self) {
        self.ready_listener = false;
    }

    fn start(&mut self, options: StartOptions) -> TransportResult<()> {
        if self.running {
            return Err(TransportError::AlreadyStarted);
        }
        self.start_calls += 1;
        self.options = Some(options);
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_calls += 1;
        self.running = false;
    }

    fn send(&mut self, namespace: &str, payload: Value) -> TransportResult<()> {
        if !self.running {
            return Err(TransportError::NotStarted);
        }
        let declared = self
            .options
            .as_ref()
            .is_some_and(|o| o.custom_namespaces.contains_key(namespace));
        if !declared {
            return Err(TransportError::UnknownNamespace(namespace.to_owned()));
        }
        self.sent.push((namespace.to_owned(), payload));
        Ok(())
    }

    fn set_application_state(&mut self, status: &str) {
        self.statuses.push(status.to_owned());
    }
}

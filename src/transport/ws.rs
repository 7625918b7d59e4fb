//! WebSocket host: every connected socket is a peer, every text frame is an
//! `{"namespace", "data"}` envelope.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{StartOptions, Transport, TransportError, TransportEvent, TransportResult};

const OUTBOUND_DEPTH: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    namespace: String,
    data: Value,
}

#[derive(Debug, Default)]
struct Registry {
    namespaces: BTreeSet<String>,
    ready: bool,
    running: bool,
    declared: BTreeSet<String>,
    status: String,
}

struct HubInner {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: broadcast::Sender<String>,
    registry: RwLock<Registry>,
}

/// Shared between the HTTP side (sockets) and the session side
/// ([`WsTransport`]).
#[derive(Clone)]
pub struct WsHub {
    inner: Arc<HubInner>,
}

impl WsHub {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (outbound, _) = broadcast::channel(OUTBOUND_DEPTH);
        let hub = Self {
            inner: Arc::new(HubInner {
                events,
                outbound,
                registry: RwLock::new(Registry::default()),
            }),
        };
        (hub, rx)
    }

    pub fn transport(&self) -> WsTransport {
        WsTransport { hub: self.clone() }
    }

    /// Injects an event as if it came from the host, e.g. a shutdown request.
    pub fn notify(&self, event: TransportEvent) -> TransportResult<()> {
        self.inner.events.send(event).map_err(|_| TransportError::Closed)
    }

    pub fn status(&self) -> String {
        self.inner.registry.read().status.clone()
    }

    pub fn peer_count(&self) -> usize {
        self.inner.outbound.receiver_count()
    }

    /// Routes one inbound text frame. Returns whether it reached the session.
    pub fn deliver(&self, frame: &str) -> bool {
        let envelope: Envelope = match serde_json::from_str(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "dropping malformed frame");
                return false;
            }
        };
        {
            let registry = self.inner.registry.read();
            if !registry.running || !registry.namespaces.contains(&envelope.namespace) {
                debug!(namespace = %envelope.namespace, "no listener for frame");
                return false;
            }
        }
        self.notify(TransportEvent::Message {
            namespace: envelope.namespace,
            data: envelope.data,
        })
        .is_ok()
    }

    pub async fn serve_peer(self, socket: WebSocket) {
        let peer = Uuid::new_v4();
        let mut outbound = self.inner.outbound.subscribe();
        let _ = self.notify(TransportEvent::PeerConnected(peer));
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.deliver(&text);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(%peer, error = %e, "socket read failed");
                        break;
                    }
                },
                out = outbound.recv() => match out {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%peer, skipped, "peer lagging, outbound messages skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        let _ = self.notify(TransportEvent::PeerDisconnected(peer));
    }
}

pub struct WsTransport {
    hub: WsHub,
}

impl Transport for WsTransport {
    fn add_message_listener(&mut self, namespace: &str) {
        self.hub.inner.registry.write().namespaces.insert(namespace.to_owned());
    }

    fn remove_message_listener(&mut self, namespace: &str) {
        self.hub.inner.registry.write().namespaces.remove(namespace);
    }

    fn add_ready_listener(&mut self) {
        self.hub.inner.registry.write().ready = true;
    }

    fn remove_ready_listener(&mut self) {
        self.hub.inner.registry.write().ready = false;
    }

    fn start(&mut self, options: StartOptions) -> TransportResult<()> {
        let ready = {
            let mut registry = self.hub.inner.registry.write();
            if registry.running {
                return Err(TransportError::AlreadyStarted);
            }
            registry.running = true;
            registry.declared = options.custom_namespaces.into_keys().collect();
            registry.ready
        };
        info!("websocket transport started");
        if ready {
            self.hub.notify(TransportEvent::Ready)?;
        }
        Ok(())
    }

    fn stop(&mut self) {
        let mut registry = self.hub.inner.registry.write();
        registry.running = false;
        registry.declared.clear();
        info!("websocket transport stopped");
    }

    fn send(&mut self, namespace: &str, payload: Value) -> TransportResult<()> {
        {
            let registry = self.hub.inner.registry.read();
            if !registry.running {
                return Err(TransportError::NotStarted);
            }
            if !registry.declared.contains(namespace) {
                return Err(TransportError::UnknownNamespace(namespace.to_owned()));
            }
        }
        let envelope = Envelope {
            namespace: namespace.to_owned(),
            data: payload,
        };
        let text = serde_json::to_string(&envelope).map_err(|_| TransportError::Closed)?;
        if self.hub.inner.outbound.send(text).is_err() {
            debug!("no peer connected, outbound message dropped");
        }
        Ok(())
    }

    fn set_application_state(&mut self, status: &str) {
        info!(status, "application state");
        self.hub.inner.registry.write().status = status.to_owned();
    }
}

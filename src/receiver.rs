//! Binds a [`SessionState`] to a transport handle.
//!
//! The receiver registers its listeners, starts the transport, turns every
//! delivered event into a state transition and publishes a fresh
//! [`SessionView`] whenever something observable changed. `shutdown` undoes
//! all of it and also runs from `Drop`.

use std::ops::ControlFlow;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::handshake::Nonce;
use crate::protocol::{self, OutboundMessage, DEFAULT_NAMESPACE};
use crate::session::{SessionState, SessionView, STATUS_LOADING};
use crate::transport::{StartOptions, Transport, TransportError, TransportEvent, TransportResult};

pub const DEFAULT_GREETING: &str = "Hello from Chromecast!";

#[derive(Debug, Clone)]
pub struct ReceiverOptions {
    pub namespace: String,
    pub greeting: String,
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            greeting: DEFAULT_GREETING.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    ShutDown,
}

pub struct Receiver<T: Transport> {
    transport: T,
    options: ReceiverOptions,
    state: SessionState,
    lifecycle: Lifecycle,
    views: watch::Sender<SessionView>,
}

impl<T: Transport> Receiver<T> {
    pub fn new(transport: T, options: ReceiverOptions) -> Self {
        let (views, _) = watch::channel(SessionView::default());
        Self {
            transport,
            options,
            state: SessionState::new(),
            lifecycle: Lifecycle::Idle,
            views,
        }
    }

    /// Latest-value feed for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.views.subscribe()
    }

    pub fn view(&self) -> SessionView {
        self.state.view()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn start(&mut self) -> TransportResult<()> {
        self.start_with(Nonce::generate())
    }

    /// Starts the session with a caller-chosen nonce.
    pub fn start_with(&mut self, nonce: Nonce) -> TransportResult<()> {
        if self.lifecycle != Lifecycle::Idle {
            return Err(TransportError::AlreadyStarted);
        }
        self.state.begin_with(nonce);

        let namespace = self.options.namespace.clone();
        self.transport.add_message_listener(&namespace);
        self.transport.add_ready_listener();
        self.transport.set_application_state(STATUS_LOADING);

        if let Err(e) = self.transport.start(StartOptions::for_namespace(&namespace)) {
            warn!(error = %e, "transport failed to start");
            self.remove_listeners();
            return Err(e);
        }
        self.lifecycle = Lifecycle::Running;
        info!(namespace = %namespace, "receiver session started");
        Ok(())
    }

    pub fn handle_event(&mut self, event: TransportEvent) -> ControlFlow<()> {
        if self.lifecycle != Lifecycle::Running {
            debug!(?event, "event after teardown ignored");
            return ControlFlow::Break(());
        }
        match event {
            TransportEvent::Ready => {
                let greeting = OutboundMessage::GenericMessage {
                    message: self.options.greeting.clone(),
                };
                self.send(&greeting);
            }
            TransportEvent::PeerConnected(peer) => info!(%peer, "peer connected"),
            TransportEvent::PeerDisconnected(peer) => info!(%peer, "peer disconnected"),
            TransportEvent::Message { namespace, data } => self.on_message(&namespace, data),
            TransportEvent::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_message(&mut self, namespace: &str, data: serde_json::Value) {
        if namespace != self.options.namespace {
            debug!(namespace, "message on foreign namespace dropped");
            return;
        }
        let message = match protocol::decode_inbound(data) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "undecodable payload dropped");
                return;
            }
        };
        let kind = message.kind();
        let before = self.state.phase();
        let outcome = self.state.handle(message);

        for reply in &outcome.replies {
            self.send(reply);
        }
        if let Some(status) = outcome.status {
            self.transport.set_application_state(status);
        }
        if outcome.changed {
            let view = self.state.view();
            if view.phase != before {
                info!(kind, from = before.as_str(), to = view.phase.as_str(), "session phase changed");
            }
            self.views.send_replace(view);
        }
    }

    fn send(&mut self, message: &OutboundMessage) {
        let payload = match protocol::encode_outbound(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound message");
                return;
            }
        };
        if let Err(e) = self.transport.send(&self.options.namespace, payload) {
            warn!(error = %e, "failed to send outbound message");
        }
    }

    fn remove_listeners(&mut self) {
        let namespace = self.options.namespace.clone();
        self.transport.remove_message_listener(&namespace);
        self.transport.remove_ready_listener();
    }

    /// Deregisters every listener, stops the transport once and drops all
    /// session state. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.lifecycle == Lifecycle::ShutDown {
            return;
        }
        let was_running = self.lifecycle == Lifecycle::Running;
        self.lifecycle = Lifecycle::ShutDown;
        self.remove_listeners();
        if was_running {
            self.transport.stop();
        }
        self.state = SessionState::new();
        self.views.send_replace(SessionView::default());
        info!("receiver session torn down");
    }
}

impl<T: Transport> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::phase::Phase;
    use crate::session::{STATUS_INVALID_CHALLENGE, STATUS_SHOWING};
    use crate::transport::memory::MemoryTransport;

    fn msg(data: Value) -> TransportEvent {
        TransportEvent::Message {
            namespace: DEFAULT_NAMESPACE.into(),
            data,
        }
    }

    fn update(n: u32) -> TransportEvent {
        msg(json!({
            "type": "METRICS_UPDATE",
            "snapshot": {
                "timestamp": format!("{}", 1_714_564_800_000u64 + u64::from(n) * 1000),
                "botsOnline": n,
                "botsTotal": 30,
                "packetsSentPerSecond": 1.0,
                "packetsReceivedPerSecond": 2.0,
                "bytesSentPerSecond": 3.0,
                "bytesReceivedPerSecond": 4.0,
                "avgHealth": 20.0,
                "avgFoodLevel": 20.0,
                "avgTickDurationMs": 1.5
            },
            "distributions": {
                "dimensionCounts": { "minecraft:the_nether": n },
                "botPositions": []
            },
            "instanceInfo": { "friendlyName": "Farm", "state": "RUNNING" }
        }))
    }

    fn login(receiver: &mut Receiver<&mut MemoryTransport>) {
        let _ = receiver.handle_event(msg(json!({ "type": "CHALLENGE_RESPONSE", "challenge": "abc" })));
    }

    #[test]
    fn start_registers_listeners_and_declares_namespace() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        receiver.start_with(Nonce::from("abc")).unwrap();

        let t = receiver.transport();
        assert!(t.message_listeners.contains(DEFAULT_NAMESPACE));
        assert!(t.ready_listener);
        assert!(t.running);
        assert_eq!(t.last_status(), Some(STATUS_LOADING));
        let options = t.options.as_ref().unwrap();
        assert!(options.skip_players_load && options.disable_idle_timeout);
        assert!(matches!(receiver.start(), Err(TransportError::AlreadyStarted)));
    }

    #[test]
    fn ready_sends_greeting() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        receiver.start_with(Nonce::from("abc")).unwrap();
        let _ = receiver.handle_event(TransportEvent::Ready);
        assert_eq!(
            receiver.transport().payloads(),
            vec![json!({ "type": "GENERIC_MESSAGE", "message": DEFAULT_GREETING })]
        );
    }

    #[test]
    fn scenario_hello_then_correct_response() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        receiver.start_with(Nonce::from("abc")).unwrap();

        let _ = receiver.handle_event(msg(json!({ "type": "INITIAL_HELLO" })));
        assert_eq!(
            receiver.transport().payloads(),
            vec![json!({ "type": "CHALLENGE_REQUEST", "challenge": "abc" })]
        );

        login(&mut receiver);
        assert_eq!(receiver.view().phase, Phase::Authenticated);
        assert_eq!(
            receiver.transport().payloads().last(),
            Some(&json!({ "type": "LOGIN_SUCCESS" }))
        );
        assert_eq!(receiver.transport().last_status(), Some(STATUS_SHOWING));
    }

    #[test]
    fn scenario_wrong_response() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        receiver.start_with(Nonce::from("abc")).unwrap();

        let _ = receiver.handle_event(msg(json!({ "type": "CHALLENGE_RESPONSE", "challenge": "xyz" })));
        assert_eq!(receiver.view().phase, Phase::Loading);
        assert!(receiver.transport().sent.is_empty());
        assert_eq!(receiver.transport().last_status(), Some(STATUS_INVALID_CHALLENGE));

        // no lockout
        login(&mut receiver);
        assert_eq!(receiver.view().phase, Phase::Authenticated);
    }

    #[test]
    fn stale_response_between_logins_does_not_stick() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        receiver.start_with(Nonce::from("abc")).unwrap();

        login(&mut receiver);
        let _ = receiver.handle_event(msg(json!({ "type": "CHALLENGE_RESPONSE", "challenge": "stale" })));
        assert_eq!(receiver.transport().last_status(), Some(STATUS_INVALID_CHALLENGE));

        login(&mut receiver);
        assert_eq!(receiver.transport().last_status(), Some(STATUS_SHOWING));
        assert_eq!(receiver.view().phase, Phase::Authenticated);
        assert!(receiver.state().is_trusted());
    }

    #[test]
    fn scenario_window_overflow_then_stop() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        let mut views = receiver.subscribe();
        receiver.start_with(Nonce::from("abc")).unwrap();
        login(&mut receiver);

        for n in 1..=21 {
            let _ = receiver.handle_event(update(n));
        }
        assert!(views.has_changed().unwrap());
        let view = views.borrow_and_update().clone();
        assert_eq!(view.phase, Phase::Displaying);
        let online: Vec<u32> = view.metrics.snapshots.iter().map(|s| s.bots_online).collect();
        assert_eq!(online, (2..=21).collect::<Vec<_>>());
        assert_eq!(
            view.metrics.distributions.unwrap().dimension_counts["minecraft:the_nether"],
            21
        );

        let _ = receiver.handle_event(msg(json!({ "type": "METRICS_STOP" })));
        let view = views.borrow_and_update().clone();
        assert_eq!(view.phase, Phase::Authenticated);
        assert!(view.metrics.snapshots.is_empty());
        assert!(view.metrics.distributions.is_none());
        assert!(view.metrics.instance_info.is_none());
    }

    #[test]
    fn untrusted_metrics_and_noise_are_dropped() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        let views = receiver.subscribe();
        receiver.start_with(Nonce::from("abc")).unwrap();

        let _ = receiver.handle_event(update(1));
        let _ = receiver.handle_event(msg(json!({ "type": "METRICS_STOP" })));
        let _ = receiver.handle_event(msg(json!({ "type": "SOMETHING_NEW" })));
        let _ = receiver.handle_event(msg(json!({ "type": "METRICS_UPDATE" })));
        let _ = receiver.handle_event(msg(json!("not an object")));
        let _ = receiver.handle_event(TransportEvent::Message {
            namespace: "urn:x-cast:other".into(),
            data: json!({ "type": "INITIAL_HELLO" }),
        });

        assert!(!views.has_changed().unwrap());
        assert_eq!(receiver.view(), SessionView::default());
        assert!(receiver.transport().sent.is_empty());
    }

    #[test]
    fn shutdown_is_complete_and_runs_once() {
        let mut transport = MemoryTransport::new();
        {
            let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
            receiver.start_with(Nonce::from("abc")).unwrap();
            login(&mut receiver);
            let _ = receiver.handle_event(update(1));

            receiver.shutdown();
            receiver.shutdown();
            assert_eq!(receiver.view(), SessionView::default());
            assert!(!receiver.is_running());
            assert!(receiver.handle_event(TransportEvent::Ready).is_break());
        }
        assert!(!transport.has_listeners());
        assert!(!transport.running);
        assert_eq!(transport.stop_calls, 1);
    }

    #[test]
    fn drop_tears_down() {
        let mut transport = MemoryTransport::new();
        {
            let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
            receiver.start_with(Nonce::from("abc")).unwrap();
        }
        assert!(!transport.has_listeners());
        assert_eq!(transport.stop_calls, 1);
    }

    #[test]
    fn shutdown_event_breaks_the_loop() {
        let mut transport = MemoryTransport::new();
        let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
        receiver.start_with(Nonce::from("abc")).unwrap();
        assert!(receiver.handle_event(TransportEvent::Shutdown).is_break());
        assert!(!receiver.is_running());
    }

    #[test]
    fn failed_start_leaves_no_listeners() {
        let mut transport = MemoryTransport::new();
        transport.running = true;
        {
            let mut receiver = Receiver::new(&mut transport, ReceiverOptions::default());
            assert!(receiver.start_with(Nonce::from("abc")).is_err());
            assert!(!receiver.transport().has_listeners());
        }
        // never started by this receiver, so never stopped by it
        assert_eq!(transport.stop_calls, 0);
    }
}

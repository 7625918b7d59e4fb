//! Event loop that owns the receiver for the life of the process.

use tokio::sync::mpsc;
use tracing::info;

use crate::receiver::Receiver;
use crate::transport::{Transport, TransportEvent};

/// Drives the receiver one event at a time until the host asks for a
/// shutdown or every event source is gone. Teardown runs on both paths.
pub async fn run_session<T: Transport>(
    mut receiver: Receiver<T>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) -> Receiver<T> {
    while let Some(event) = events.recv().await {
        if receiver.handle_event(event).is_break() {
            break;
        }
    }
    info!("session loop finished");
    receiver.shutdown();
    receiver
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handshake::Nonce;
    use crate::phase::Phase;
    use crate::protocol::DEFAULT_NAMESPACE;
    use crate::receiver::ReceiverOptions;
    use crate::transport::memory::MemoryTransport;

    #[tokio::test]
    async fn processes_events_in_order_then_tears_down() {
        let mut receiver = Receiver::new(MemoryTransport::new(), ReceiverOptions::default());
        let views = receiver.subscribe();
        receiver.start_with(Nonce::from("abc")).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let message = |data| TransportEvent::Message {
            namespace: DEFAULT_NAMESPACE.into(),
            data,
        };
        tx.send(TransportEvent::Ready).unwrap();
        tx.send(message(json!({ "type": "INITIAL_HELLO" }))).unwrap();
        tx.send(message(json!({ "type": "CHALLENGE_RESPONSE", "challenge": "abc" })))
            .unwrap();
        drop(tx);

        let receiver = run_session(receiver, rx).await;
        let types: Vec<_> = receiver
            .transport()
            .payloads()
            .into_iter()
            .map(|p| p["type"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(types, ["GENERIC_MESSAGE", "CHALLENGE_REQUEST", "LOGIN_SUCCESS"]);
        assert!(!receiver.is_running());
        assert!(!receiver.transport().has_listeners());
        assert_eq!(receiver.transport().stop_calls, 1);
        // torn down, so the last published view is the empty one
        assert_eq!(views.borrow().phase, Phase::Loading);
    }

    #[tokio::test]
    async fn shutdown_event_stops_early() {
        let mut receiver = Receiver::new(MemoryTransport::new(), ReceiverOptions::default());
        receiver.start_with(Nonce::from("abc")).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TransportEvent::Shutdown).unwrap();
        tx.send(TransportEvent::Ready).unwrap();

        let receiver = run_session(receiver, rx).await;
        assert!(receiver.transport().sent.is_empty());
        assert_eq!(receiver.transport().stop_calls, 1);
    }
}

//! Publish/subscribe transport boundary.
//!
//! The harness treats the messaging transport as an external collaborator
//! providing reliable, ordered delivery of self-describing payloads within a
//! topic, at-least-once publish, and request/reply with a caller-specified
//! timeout. [`MessageBus`] is that seam; [`LocalBus`] is the in-process
//! implementation used by tests and single-process runs.
//!
//! Transport delivery never touches node state directly: subscriptions and
//! request streams are plain channels that the node's own dispatch loop
//! drains, so every handler runs serialized with the tick function.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::{HarnessError, Result};

/// One inbound request with its reply handle.
///
/// Dropping the handle without replying surfaces as a transport error on the
/// caller side (or a timeout, whichever fires first).
pub struct InboundRequest {
    pub payload: Vec<u8>,
    pub reply: oneshot::Sender<Vec<u8>>,
}

/// Ordered stream of published payloads for one topic.
pub type Subscription = mpsc::UnboundedReceiver<Vec<u8>>;

/// Ordered stream of inbound requests for one request/reply topic.
pub type RequestStream = mpsc::UnboundedReceiver<InboundRequest>;

/// Asynchronous publish/subscribe messaging with request/reply.
#[async_trait::async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Publish a payload to every current subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Subscribe to `topic`. Payloads published after this call are delivered
    /// in publish order.
    async fn subscribe(&self, topic: &str) -> Result<Subscription>;

    /// Register as the responder for a request/reply topic.
    ///
    /// One responder per topic; a later registration replaces the earlier one.
    async fn serve(&self, topic: &str) -> Result<RequestStream>;

    /// Issue a request and wait up to `timeout` for exactly one reply.
    async fn request(&self, topic: &str, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>>;
}

#[derive(Default)]
struct Registry {
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Vec<u8>>>>,
    responders: HashMap<String, mpsc::UnboundedSender<InboundRequest>>,
}

/// In-process bus over tokio channels.
///
/// Delivery within a topic is ordered and lossless as long as the receiver is
/// alive; closed receivers are pruned on the next publish.
#[derive(Default)]
pub struct LocalBus {
    registry: Mutex<Registry>,
}

impl LocalBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl MessageBus for LocalBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let mut registry = self.registry.lock().expect("bus registry poisoned");
        if let Some(senders) = registry.subscribers.get_mut(topic) {
            senders.retain(|tx| tx.send(payload.clone()).is_ok());
        }
        trace!(topic, bytes = payload.len(), "published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().expect("bus registry poisoned");
        registry.subscribers.entry(topic.to_string()).or_default().push(tx);
        Ok(rx)
    }

    async fn serve(&self, topic: &str) -> Result<RequestStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().expect("bus registry poisoned");
        registry.responders.insert(topic.to_string(), tx);
        Ok(rx)
    }

    async fn request(&self, topic: &str, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>> {
        let responder = {
            let registry = self.registry.lock().expect("bus registry poisoned");
            registry.responders.get(topic).cloned()
        };

        let Some(responder) = responder else {
            return Err(HarnessError::transport(topic, "no responder registered"));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        responder
            .send(InboundRequest { payload, reply: reply_tx })
            .map_err(|_| HarnessError::transport(topic, "responder gone"))?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(HarnessError::transport(topic, "reply dropped")),
            Err(_) => Err(HarnessError::timeout(topic, timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_preserves_order_per_topic() {
        let bus = LocalBus::new();
        let mut sub = bus.subscribe("producer.data").await.unwrap();

        for i in 0u8..5 {
            bus.publish("producer.data", vec![i]).await.unwrap();
        }

        for i in 0u8..5 {
            assert_eq!(sub.recv().await.unwrap(), vec![i]);
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let bus = LocalBus::new();
        let mut a = bus.subscribe("relay.data").await.unwrap();
        let mut b = bus.subscribe("relay.data").await.unwrap();

        bus.publish("relay.data", b"x".to_vec()).await.unwrap();

        assert_eq!(a.recv().await.unwrap(), b"x");
        assert_eq!(b.recv().await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn request_reply_round_trip() {
        let bus = LocalBus::new();
        let mut requests = bus.serve("node.get").await.unwrap();

        let bus_clone = Arc::clone(&bus);
        let client = tokio::spawn(async move {
            bus_clone.request("node.get", b"ping".to_vec(), Duration::from_secs(1)).await
        });

        let req = requests.recv().await.unwrap();
        assert_eq!(req.payload, b"ping");
        req.reply.send(b"pong".to_vec()).unwrap();

        assert_eq!(client.await.unwrap().unwrap(), b"pong");
    }

    #[tokio::test]
    async fn request_without_responder_is_transport_error() {
        let bus = LocalBus::new();
        let err = bus
            .request("nobody.get", Vec::new(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Transport { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out() {
        let bus = LocalBus::new();
        // Responder registered but never drains its queue.
        let _requests = bus.serve("slow.set").await.unwrap();

        let err = bus
            .request("slow.set", Vec::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
    }
}

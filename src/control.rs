//! Remote get/set control protocol.
//!
//! Each node binds four request/reply endpoints under its own name
//! (`<node>.get`, `<node>.get-log`, `<node>.set`, `<node>.set-log`); data
//! packets flow separately on `<node>.data`. [`ControlClient`] is the caller
//! side: every remote call blocks up to [`RPC_TIMEOUT`] and surfaces timeout
//! or transport failure as an error, never silently.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::attrs::{ATTR_ALIVE, ATTR_PAUSED};
use crate::bus::MessageBus;
use crate::error::{HarnessError, Result};
use crate::types::Packet;

/// Caller-enforced request/reply timeout.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(1);

/// Topic naming, all scoped by node name.
pub mod topics {
    pub fn get(node: &str) -> String {
        format!("{node}.get")
    }

    pub fn get_log(node: &str) -> String {
        format!("{node}.get-log")
    }

    pub fn set(node: &str) -> String {
        format!("{node}.set")
    }

    pub fn set_log(node: &str) -> String {
        format!("{node}.set-log")
    }

    pub fn data(node: &str) -> String {
        format!("{node}.data")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    pub author: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetResponse {
    pub success: bool,
    #[serde(default)]
    pub data: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    pub author: String,
    pub name: String,
    pub data: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetResponse {
    pub success: bool,
    #[serde(default)]
    pub reason: String,
}

/// Request payload for `get-log`; only identifies the requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRequest {
    pub author: String,
}

/// Caller-side convenience layer for the control protocol.
#[derive(Clone)]
pub struct ControlClient {
    bus: Arc<dyn MessageBus>,
    author: String,
}

impl ControlClient {
    pub fn new(bus: Arc<dyn MessageBus>, author: impl Into<String>) -> Self {
        Self { bus, author: author.into() }
    }

    /// Read one attribute from a remote node.
    pub async fn remote_get(&self, node: &str, name: &str) -> Result<i64> {
        let req = GetRequest { author: self.author.clone(), name: name.to_string() };
        let resp: GetResponse = self.request(&topics::get(node), &req).await?;
        if resp.success {
            Ok(resp.data)
        } else {
            Err(HarnessError::remote(resp.reason))
        }
    }

    /// Write one attribute on a remote node.
    pub async fn remote_set(&self, node: &str, name: &str, value: i64) -> Result<()> {
        let req = SetRequest { author: self.author.clone(), name: name.to_string(), data: value };
        let resp: SetResponse = self.request(&topics::set(node), &req).await?;
        if resp.success {
            Ok(())
        } else {
            Err(HarnessError::remote(resp.reason))
        }
    }

    /// Retrieve the full ordered packet log from a remote node.
    pub async fn remote_get_log(&self, node: &str) -> Result<Vec<Packet>> {
        let req = LogRequest { author: self.author.clone() };
        self.request(&topics::get_log(node), &req).await
    }

    /// Replace a remote node's packet log wholesale (empty slice clears it).
    pub async fn remote_set_log(&self, node: &str, packets: &[Packet]) -> Result<()> {
        let resp: SetResponse = self.request(&topics::set_log(node), &packets).await?;
        if resp.success {
            Ok(())
        } else {
            Err(HarnessError::remote(resp.reason))
        }
    }

    /// Pause one or more nodes, stopping at the first failure.
    pub async fn pause(&self, nodes: &[&str]) -> Result<()> {
        for node in nodes {
            self.remote_set(node, ATTR_PAUSED, 1).await?;
        }
        Ok(())
    }

    /// Unpause one or more nodes, stopping at the first failure.
    pub async fn unpause(&self, nodes: &[&str]) -> Result<()> {
        for node in nodes {
            self.remote_set(node, ATTR_PAUSED, 0).await?;
        }
        Ok(())
    }

    /// Terminate one or more nodes, stopping at the first failure.
    pub async fn kill(&self, nodes: &[&str]) -> Result<()> {
        for node in nodes {
            self.remote_set(node, ATTR_ALIVE, 0).await?;
        }
        Ok(())
    }

    async fn request<Req, Resp>(&self, topic: &str, req: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(req)?;
        let reply = self.bus.request(topic, payload, RPC_TIMEOUT).await?;
        serde_json::from_slice(&reply)
            .map_err(|e| HarnessError::codec(topic.to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;

    #[test]
    fn topic_names_are_scoped_by_node() {
        assert_eq!(topics::get("producer"), "producer.get");
        assert_eq!(topics::get_log("consumer"), "consumer.get-log");
        assert_eq!(topics::set("relay"), "relay.set");
        assert_eq!(topics::set_log("consumer"), "consumer.set-log");
        assert_eq!(topics::data("relay"), "relay.data");
    }

    #[tokio::test]
    async fn remote_get_surfaces_structured_failure() {
        let bus = LocalBus::new();
        let mut requests = bus.serve(&topics::get("node")).await.unwrap();

        tokio::spawn(async move {
            let req = requests.recv().await.unwrap();
            let decoded: GetRequest = serde_json::from_slice(&req.payload).unwrap();
            assert_eq!(decoded.author, "tester");
            let resp = GetResponse {
                success: false,
                reason: format!("Trying to access non-existing attribute \"{}\"", decoded.name),
                ..GetResponse::default()
            };
            req.reply.send(serde_json::to_vec(&resp).unwrap()).unwrap();
        });

        let client = ControlClient::new(bus, "tester");
        let err = client.remote_get("node", "bogus").await.unwrap_err();
        match err {
            HarnessError::Remote { reason } => assert!(reason.contains("bogus")),
            other => panic!("expected Remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remote_set_round_trip() {
        let bus = LocalBus::new();
        let mut requests = bus.serve(&topics::set("producer")).await.unwrap();

        tokio::spawn(async move {
            let req = requests.recv().await.unwrap();
            let decoded: SetRequest = serde_json::from_slice(&req.payload).unwrap();
            assert_eq!(decoded.name, "rate");
            assert_eq!(decoded.data, 20);
            let resp = SetResponse { success: true, ..SetResponse::default() };
            req.reply.send(serde_json::to_vec(&resp).unwrap()).unwrap();
        });

        let client = ControlClient::new(bus, "coordinator");
        client.remote_set("producer", "rate", 20).await.unwrap();
    }

    #[tokio::test]
    async fn pause_stops_at_first_failure() {
        let bus = LocalBus::new();
        // Only "a" answers; "b" has no responder, so pausing [a, b, c] must
        // fail on "b" before ever reaching "c".
        let mut requests = bus.serve(&topics::set("a")).await.unwrap();
        tokio::spawn(async move {
            while let Some(req) = requests.recv().await {
                let resp = SetResponse { success: true, ..SetResponse::default() };
                let _ = req.reply.send(serde_json::to_vec(&resp).unwrap());
            }
        });

        let client = ControlClient::new(bus, "coordinator");
        let err = client.pause(&["a", "b", "c"]).await.unwrap_err();
        match err {
            HarnessError::Transport { topic, .. } => assert_eq!(topic, "b.set"),
            other => panic!("expected Transport error, got {other:?}"),
        }
    }
}

//! Node runtime: the state machine tying attributes, control protocol and the
//! role-specific behavior together.
//!
//! Each node is one logical actor. A single `select!` loop owns the role
//! state and the packet log and serializes everything that touches them: the
//! rate-limited tick, the four control endpoints and the data subscription.
//! Transport tasks only ever feed channels, so there is no shared mutable
//! state and no lock.
//!
//! State machine: `Alive&Running` (alive=1, paused=0), `Alive&Paused`
//! (alive=1, paused=1), `Dead` (alive=0, terminal). Transitions happen only
//! through attribute writes, locally from a tick or remotely through `set`.
//! A node that never receives control traffic runs forever at its default
//! rate performing no-op ticks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::attrs::Attributes;
use crate::attrs::ControlAttrs;
use crate::bus::{InboundRequest, MessageBus, Subscription};
use crate::clock::ClockOffsetEstimator;
use crate::control::{GetRequest, GetResponse, SetRequest, SetResponse, topics};
use crate::error::{HarnessError, Result};
use crate::storage;
use crate::types::Packet;

/// Everything a role may touch during a tick or packet handler.
///
/// Borrowed from the node for exactly one dispatch, which is what keeps role
/// handlers serialized with the control protocol.
pub struct RoleContext<'a> {
    /// The node's own name (topic scope).
    pub name: &'a str,
    /// Transport handle for publishing.
    pub bus: &'a Arc<dyn MessageBus>,
    /// Clock-offset estimate captured for this dispatch, nanoseconds.
    pub offset_ns: i64,
    /// Live estimator handle for dispatches that outlast the snapshot
    /// (the coordinator runs a whole campaign inside one tick).
    pub estimator: &'a ClockOffsetEstimator,
    /// The node-owned packet log (consumer appends, coordinator drains).
    pub log: &'a mut Vec<Packet>,
}

/// Role-specific behavior plugged into the node runtime.
///
/// The producer uses `tick` (self-driven cadence); relay and consumer are
/// passive and only implement `on_packet`, driven by the upstream data
/// subscription at arrival rate.
#[async_trait::async_trait]
pub trait Role: Attributes + Send + 'static {
    /// Control-plane flags (rate/paused/alive) embedded in the role state.
    fn control(&self) -> &ControlAttrs;

    /// Upstream data topic to subscribe to, if this role is packet-driven.
    fn subscribes_to(&self) -> Option<String> {
        None
    }

    /// Invoked once per loop iteration while alive and unpaused.
    async fn tick(&mut self, _ctx: &mut RoleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Invoked per arriving packet while alive and unpaused.
    async fn on_packet(&mut self, _packet: Packet, _ctx: &mut RoleContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Node construction parameters.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Node name; scopes every topic the node binds.
    pub name: String,
    /// Directory for `get-log` CSV snapshots.
    pub snapshot_dir: PathBuf,
}

impl NodeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), snapshot_dir: PathBuf::from("logs") }
    }

    pub fn snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }
}

/// One networked agent: attribute store, control endpoints and run loop.
pub struct Node<R: Role> {
    name: String,
    snapshot_dir: PathBuf,
    bus: Arc<dyn MessageBus>,
    estimator: Arc<ClockOffsetEstimator>,
    role: R,
    log: Vec<Packet>,
    cancel: CancellationToken,
}

impl<R: Role> Node<R> {
    pub fn new(
        config: NodeConfig,
        bus: Arc<dyn MessageBus>,
        estimator: Arc<ClockOffsetEstimator>,
        role: R,
    ) -> Self {
        Self {
            name: config.name,
            snapshot_dir: config.snapshot_dir,
            bus,
            estimator,
            role,
            log: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled when the run loop exits; the clock estimator loop is
    /// driven by it so estimator lifetime matches node lifetime.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run until `alive` transitions to 0 or a fatal error occurs.
    pub async fn run(mut self) -> Result<()> {
        let mut get_rx = self.bus.serve(&topics::get(&self.name)).await?;
        let mut get_log_rx = self.bus.serve(&topics::get_log(&self.name)).await?;
        let mut set_rx = self.bus.serve(&topics::set(&self.name)).await?;
        let mut set_log_rx = self.bus.serve(&topics::set_log(&self.name)).await?;

        let mut data_rx = match self.role.subscribes_to() {
            Some(topic) => Some(self.bus.subscribe(&topic).await?),
            None => None,
        };

        info!(node = %self.name, "node started");

        let mut tick = Box::pin(tokio::time::sleep(tick_period(&self.role)));

        let result = loop {
            if !self.role.control().alive {
                info!(node = %self.name, "node terminated");
                break Ok(());
            }

            tokio::select! {
                _ = &mut tick => {
                    if !self.role.control().paused {
                        let mut ctx = RoleContext {
                            name: &self.name,
                            bus: &self.bus,
                            offset_ns: self.estimator.current_offset(),
                            estimator: &self.estimator,
                            log: &mut self.log,
                        };
                        if let Err(e) = self.role.tick(&mut ctx).await {
                            break Err(e);
                        }
                    }
                    // Rate is re-read on every re-arm.
                    tick = Box::pin(tokio::time::sleep(tick_period(&self.role)));
                }
                Some(req) = get_rx.recv() => self.handle_get(req),
                Some(req) = set_rx.recv() => {
                    let before = tick_period(&self.role);
                    self.handle_set(req);
                    let after = tick_period(&self.role);
                    // A rate change takes effect immediately, not after the
                    // in-flight interval at the old rate expires.
                    if after != before {
                        tick = Box::pin(tokio::time::sleep(after));
                    }
                }
                Some(req) = get_log_rx.recv() => {
                    if let Err(e) = self.handle_get_log(req) {
                        break Err(e);
                    }
                }
                Some(req) = set_log_rx.recv() => self.handle_set_log(req),
                Some(payload) = recv_data(&mut data_rx) => {
                    if let Err(e) = self.handle_data(payload).await {
                        break Err(e);
                    }
                }
            }
        };

        self.cancel.cancel();
        result
    }

    fn handle_get(&mut self, req: InboundRequest) {
        let resp = match serde_json::from_slice::<GetRequest>(&req.payload) {
            Ok(get) => match self.role.get(&get.name) {
                Some(value) => {
                    info!(node = %self.name, attr = %get.name, by = %get.author, "get");
                    GetResponse { success: true, data: value, ..GetResponse::default() }
                }
                None => GetResponse {
                    success: false,
                    reason: HarnessError::unknown_attribute(&get.name).to_string(),
                    ..GetResponse::default()
                },
            },
            Err(e) => GetResponse {
                success: false,
                reason: format!("malformed get request: {e}"),
                ..GetResponse::default()
            },
        };
        reply_json(req, &resp);
    }

    fn handle_set(&mut self, req: InboundRequest) {
        let resp = match serde_json::from_slice::<SetRequest>(&req.payload) {
            Ok(set) => {
                if self.role.set(&set.name, set.data) {
                    info!(
                        node = %self.name,
                        attr = %set.name,
                        value = set.data,
                        by = %set.author,
                        "set"
                    );
                    SetResponse { success: true, ..SetResponse::default() }
                } else {
                    SetResponse {
                        success: false,
                        reason: HarnessError::unknown_attribute(&set.name).to_string(),
                    }
                }
            }
            Err(e) => SetResponse { success: false, reason: format!("malformed set request: {e}") },
        };
        reply_json(req, &resp);
    }

    /// Answer with the full log, persisting a CSV snapshot first.
    ///
    /// The snapshot is best-effort for the caller (the reply goes out either
    /// way), but a failed write is an unrecoverable storage error for this
    /// node and stops the loop after the reply.
    fn handle_get_log(&mut self, req: InboundRequest) -> Result<()> {
        let file_name = format!("{}.csv", chrono::Local::now().format("%y%m%d_%H%M%S"));
        let snapshot = self.snapshot_dir.join(file_name);
        let persisted = storage::write_packet_csv(&snapshot, &self.log);
        if let Err(e) = &persisted {
            warn!(node = %self.name, "log snapshot failed: {e}");
        } else {
            debug!(node = %self.name, path = %snapshot.display(), "log snapshot written");
        }

        reply_json(req, &self.log);
        persisted
    }

    fn handle_set_log(&mut self, req: InboundRequest) {
        let resp = match serde_json::from_slice::<Vec<Packet>>(&req.payload) {
            Ok(packets) => {
                debug!(node = %self.name, len = packets.len(), "log replaced");
                self.log = packets;
                SetResponse { success: true, ..SetResponse::default() }
            }
            Err(e) => SetResponse { success: false, reason: format!("malformed log: {e}") },
        };
        reply_json(req, &resp);
    }

    async fn handle_data(&mut self, payload: Vec<u8>) -> Result<()> {
        if self.role.control().paused {
            trace!(node = %self.name, "paused, packet dropped");
            return Ok(());
        }

        let packet = match serde_json::from_slice::<Packet>(&payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(node = %self.name, "undecodable packet dropped: {e}");
                return Ok(());
            }
        };

        let mut ctx = RoleContext {
            name: &self.name,
            bus: &self.bus,
            offset_ns: self.estimator.current_offset(),
            estimator: &self.estimator,
            log: &mut self.log,
        };
        self.role.on_packet(packet, &mut ctx).await
    }
}

fn tick_period<R: Role>(role: &R) -> Duration {
    Duration::from_secs_f64(1.0 / role.control().effective_rate() as f64)
}

/// Data branch helper: a role without a subscription never yields.
async fn recv_data(rx: &mut Option<Subscription>) -> Option<Vec<u8>> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn reply_json<T: serde::Serialize>(req: InboundRequest, value: &T) {
    match serde_json::to_vec(value) {
        Ok(bytes) => {
            // A dropped reply means the caller gave up; it already sees a
            // timeout, nothing to do here.
            let _ = req.reply.send(bytes);
        }
        Err(e) => warn!("reply encoding failed: {e}"),
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub(crate) fn now_ns() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

//! Distributed hop-latency test harness.
//!
//! Hopwatch measures end-to-end latency and data integrity across a chain of
//! networked agents (producer, relay, consumer) while correcting for clock
//! skew between machines. A coordinator drives test campaigns: it remotely
//! reconfigures the chain over a get/set control protocol, starts and stops
//! traffic, and collects timestamped packet records for offline analysis.
//!
//! # Architecture
//!
//! - Every agent is a [`node::Node`] wrapping a [`node::Role`]: one actor
//!   loop owns the role state and packet log and serializes ticks, control
//!   requests and packet arrivals
//! - Transport is behind the [`bus::MessageBus`] trait; [`bus::LocalBus`]
//!   wires a whole deployment inside one process for tests and demos
//! - Clock skew is corrected with a [`clock::ClockOffsetEstimator`] polling
//!   an external [`clock::TimeReference`]
//!
//! # Example (in-process chain)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hopwatch::bus::{LocalBus, MessageBus};
//! use hopwatch::clock::{ClockOffsetEstimator, StaticReference};
//! use hopwatch::node::{Node, NodeConfig};
//! use hopwatch::roles::{Consumer, Producer, Relay};
//! use hopwatch::types::StaticPose;
//!
//! #[tokio::main]
//! async fn main() -> hopwatch::Result<()> {
//!     let bus: Arc<dyn MessageBus> = LocalBus::new();
//!     let estimator = ClockOffsetEstimator::new(
//!         Arc::new(StaticReference::default()),
//!         Duration::from_millis(250),
//!     );
//!
//!     let producer = Node::new(
//!         NodeConfig::new("producer"),
//!         Arc::clone(&bus),
//!         Arc::clone(&estimator),
//!         Producer::new(),
//!     );
//!     let relay = Node::new(
//!         NodeConfig::new("relay"),
//!         Arc::clone(&bus),
//!         Arc::clone(&estimator),
//!         Relay::new("producer"),
//!     );
//!     let consumer = Node::new(
//!         NodeConfig::new("consumer"),
//!         Arc::clone(&bus),
//!         Arc::clone(&estimator),
//!         Consumer::new("relay", Arc::new(StaticPose::default())),
//!     );
//!
//!     tokio::spawn(producer.run());
//!     tokio::spawn(relay.run());
//!     consumer.run().await
//! }
//! ```

pub mod attrs;
pub mod bus;
pub mod campaign;
pub mod clock;
pub mod config;
pub mod control;
mod error;
pub mod node;
pub mod roles;
pub mod storage;
pub mod types;

pub use campaign::{CampaignPlan, Coordinator, TestCase};
pub use config::{CampaignConfig, HarnessConfig};
pub use control::ControlClient;
pub use error::{HarnessError, Result};
pub use node::{Node, NodeConfig, Role, RoleContext};
pub use types::Packet;

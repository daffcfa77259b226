//! Role-specific behavior for the packet relay chain.
//!
//! - [`Producer`]: self-driven; builds a packet per tick with `t1`/`e1`, a
//!   seeded checksum and a fresh sequence number, then publishes it
//! - [`Relay`]: passive; stamps `t2`/`e2` on arrival, optionally simulates
//!   compute load, stamps `t3`/`e3` and republishes
//! - [`Consumer`]: passive; stamps `t4`/`e4`, assigns the frame id, samples
//!   the pose source, folds the checksum a second time, clears the payload
//!   and appends the record to the node log
//!
//! Producer cadence is owned by the node's rate-limited loop; relay and
//! consumer process at arrival rate, so the coordinator can pause the whole
//! chain uniformly through the shared `paused` attribute.

mod consumer;
mod producer;
mod relay;

pub use consumer::Consumer;
pub use producer::Producer;
pub use relay::Relay;

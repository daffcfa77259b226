//! Core types for measurement data representation.
//!
//! - [`Packet`] is the measurement record that flows through the relay chain,
//!   carrying per-hop wall-clock timestamps (`t1..t4`) and the clock-offset
//!   estimates captured at the same instants (`e1..e4`)
//! - [`PacketHeader`] carries the producer sequence number, the origin stamp
//!   and the consumer-assigned frame id
//! - [`PoseSample`] and [`PoseSource`] are the boundary to the external
//!   pose/GPS subsystem sampled at the consumer
//! - [`checksum`] is the rolling XOR integrity check: seeded once at the
//!   producer, folded a second time over the same payload at the consumer,
//!   a zero result signals a clean round trip

mod packet;
mod pose;

pub use packet::{Packet, PacketHeader, checksum};
pub use pose::{PoseSample, PoseSource, StaticPose};

//! Consumer role: final hop and measurement sink.

use std::sync::Arc;

use tracing::trace;

use crate::attrs::{Attributes, ControlAttrs};
use crate::control::topics;
use crate::error::Result;
use crate::node::{Role, RoleContext, now_ns};
use crate::types::{Packet, PoseSource, checksum};

/// Passive terminal hop.
///
/// On arrival it stamps `t4`/`e4`, assigns the destination frame id, captures
/// a pose/GPS sample, folds the checksum a second time over the payload
/// (zero result means the round trip was clean), clears the payload to bound
/// log size, and appends the record to the node log.
pub struct Consumer {
    control: ControlAttrs,
    upstream: String,
    pose: Arc<dyn PoseSource>,
}

impl Consumer {
    /// `upstream` is the relay node name whose data topic this consumer reads.
    pub fn new(upstream: impl Into<String>, pose: Arc<dyn PoseSource>) -> Self {
        Self { control: ControlAttrs::default(), upstream: upstream.into(), pose }
    }
}

impl Attributes for Consumer {
    fn get(&self, name: &str) -> Option<i64> {
        self.control.get(name)
    }

    fn set(&mut self, name: &str, value: i64) -> bool {
        self.control.set(name, value)
    }
}

#[async_trait::async_trait]
impl Role for Consumer {
    fn control(&self) -> &ControlAttrs {
        &self.control
    }

    fn subscribes_to(&self) -> Option<String> {
        Some(topics::data(&self.upstream))
    }

    async fn on_packet(&mut self, mut packet: Packet, ctx: &mut RoleContext<'_>) -> Result<()> {
        packet.header.frame_id = ctx.name.to_string();
        packet.t4 = now_ns();
        packet.e4 = ctx.offset_ns;

        let pose = self.pose.sample();
        packet.x = pose.x;
        packet.y = pose.y;
        packet.yaw = pose.yaw;
        packet.velocity = pose.velocity;
        packet.latitude = pose.latitude;
        packet.longitude = pose.longitude;

        // Second fold over the same payload; zero means uncorrupted. The
        // non-zero case is recorded for offline analysis, never rejected.
        packet.chk = checksum(&packet.data, packet.chk);
        packet.data.clear();

        trace!(
            node = %ctx.name,
            seq = packet.header.seq,
            valid = packet.is_valid(),
            "packet logged"
        );
        ctx.log.push(packet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{LocalBus, MessageBus};
    use crate::clock::{ClockOffsetEstimator, StaticReference};
    use crate::types::{PoseSample, StaticPose};
    use std::time::Duration;

    fn test_bus() -> Arc<dyn MessageBus> {
        LocalBus::new()
    }

    fn estimator() -> Arc<ClockOffsetEstimator> {
        ClockOffsetEstimator::new(Arc::new(StaticReference::default()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn arrival_finalizes_and_logs_the_packet() {
        let bus = test_bus();
        let pose = StaticPose(PoseSample {
            x: 1.0,
            y: 2.0,
            yaw: 0.5,
            velocity: 3.5,
            latitude: 59.35,
            longitude: 18.07,
        });
        let mut consumer = Consumer::new("relay", Arc::new(pose));
        assert_eq!(consumer.subscribes_to().as_deref(), Some("relay.data"));

        let data = vec![0xAB, 0xCD, 0x12];
        let mut inbound = Packet { chk: checksum(&data, 0), data, ..Packet::default() };
        inbound.header.seq = 9;
        inbound.t1 = 1;
        inbound.t2 = 2;
        inbound.t3 = 3;

        let estimator = estimator();
        let mut log = Vec::new();
        let mut ctx = RoleContext {
            name: "consumer",
            bus: &bus,
            offset_ns: -4,
            estimator: &estimator,
            log: &mut log,
        };
        consumer.on_packet(inbound, &mut ctx).await.unwrap();

        assert_eq!(log.len(), 1);
        let logged = &log[0];
        assert_eq!(logged.header.frame_id, "consumer");
        assert_eq!(logged.header.seq, 9);
        assert!(logged.t4 >= logged.t3);
        assert_eq!(logged.e4, -4);
        assert_eq!(logged.x, 1.0);
        assert_eq!(logged.latitude, 59.35);
        // Clean round trip folds to zero and the payload is erased.
        assert!(logged.is_valid());
        assert!(logged.data.is_empty());
    }

    #[tokio::test]
    async fn corrupted_payload_is_logged_not_rejected() {
        let bus = test_bus();
        let mut consumer = Consumer::new("relay", Arc::new(StaticPose::default()));

        let mut inbound = Packet {
            chk: checksum(&[1, 2, 3], 0),
            // Payload differs from what the checksum was seeded with.
            data: vec![1, 2, 4],
            ..Packet::default()
        };
        inbound.header.seq = 1;

        let estimator = estimator();
        let mut log = Vec::new();
        let mut ctx = RoleContext {
            name: "consumer",
            bus: &bus,
            offset_ns: 0,
            estimator: &estimator,
            log: &mut log,
        };
        consumer.on_packet(inbound, &mut ctx).await.unwrap();

        assert_eq!(log.len(), 1);
        assert!(!log[0].is_valid());
        assert!(log[0].data.is_empty());
    }
}

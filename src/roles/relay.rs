//! Relay role: intermediate processing hop.

use std::time::Duration;

use tracing::trace;

use crate::attrs::{ATTR_COMPUTE_TIME, Attributes, ControlAttrs};
use crate::control::topics;
use crate::error::Result;
use crate::node::{Role, RoleContext, now_ns};
use crate::types::Packet;

/// Passive hop that stamps receive/finish times and republishes.
///
/// `COMPUTE_TIME` (milliseconds) simulates processing load between the `t2`
/// and `t3` stamps; the coordinator resets it per test case.
pub struct Relay {
    control: ControlAttrs,
    compute_time_ms: i64,
    upstream: String,
}

impl Relay {
    /// `upstream` is the producer node name whose data topic this relay consumes.
    pub fn new(upstream: impl Into<String>) -> Self {
        Self { control: ControlAttrs::default(), compute_time_ms: 0, upstream: upstream.into() }
    }
}

impl Attributes for Relay {
    fn get(&self, name: &str) -> Option<i64> {
        match name {
            ATTR_COMPUTE_TIME => Some(self.compute_time_ms),
            _ => self.control.get(name),
        }
    }

    fn set(&mut self, name: &str, value: i64) -> bool {
        match name {
            ATTR_COMPUTE_TIME => self.compute_time_ms = value,
            _ => return self.control.set(name, value),
        }
        true
    }
}

#[async_trait::async_trait]
impl Role for Relay {
    fn control(&self) -> &ControlAttrs {
        &self.control
    }

    fn subscribes_to(&self) -> Option<String> {
        Some(topics::data(&self.upstream))
    }

    async fn on_packet(&mut self, mut packet: Packet, ctx: &mut RoleContext<'_>) -> Result<()> {
        packet.t2 = now_ns();
        packet.e2 = ctx.offset_ns;

        if self.compute_time_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.compute_time_ms as u64)).await;
        }

        packet.t3 = now_ns();
        packet.e3 = ctx.offset_ns;

        let payload = serde_json::to_vec(&packet)?;
        ctx.bus.publish(&topics::data(ctx.name), payload).await?;
        trace!(node = %ctx.name, seq = packet.header.seq, "packet relayed");
        Ok(())
    }
}

//! Producer role: origin of the relay chain.

use rand::Rng;
use tracing::trace;

use crate::attrs::{ATTR_DATA_SEQ, ATTR_DATA_SIZE, Attributes, ControlAttrs};
use crate::control::topics;
use crate::error::{HarnessError, Result};
use crate::node::{Role, RoleContext, now_ns};
use crate::types::{Packet, checksum};

/// Default payload size in bytes.
const DEFAULT_DATA_SIZE: i64 = 1000;

/// Self-driven packet source.
///
/// Remotely settable attributes: `rate`, `paused`, `alive`, `DATA_SIZE`
/// (payload bytes per packet), `DATA_SEQ` (next sequence number; the
/// coordinator resets it to 0 per test case).
pub struct Producer {
    control: ControlAttrs,
    data_size: i64,
    data_seq: i64,
}

impl Producer {
    pub fn new() -> Self {
        Self { control: ControlAttrs::default(), data_size: DEFAULT_DATA_SIZE, data_seq: 0 }
    }
}

impl Default for Producer {
    fn default() -> Self {
        Self::new()
    }
}

impl Attributes for Producer {
    fn get(&self, name: &str) -> Option<i64> {
        match name {
            ATTR_DATA_SIZE => Some(self.data_size),
            ATTR_DATA_SEQ => Some(self.data_seq),
            _ => self.control.get(name),
        }
    }

    fn set(&mut self, name: &str, value: i64) -> bool {
        match name {
            ATTR_DATA_SIZE => self.data_size = value,
            ATTR_DATA_SEQ => self.data_seq = value,
            _ => return self.control.set(name, value),
        }
        true
    }
}

#[async_trait::async_trait]
impl Role for Producer {
    fn control(&self) -> &ControlAttrs {
        &self.control
    }

    async fn tick(&mut self, ctx: &mut RoleContext<'_>) -> Result<()> {
        let size = usize::try_from(self.data_size.max(0)).unwrap_or(0);
        let mut data = vec![0u8; size];
        // Running without a payload is meaningless for the measurement, so a
        // generation failure is fatal for the node.
        rand::thread_rng()
            .try_fill(data.as_mut_slice())
            .map_err(|e| HarnessError::Payload { details: e.to_string() })?;

        let mut packet = Packet {
            chk: checksum(&data, 0),
            data,
            ..Packet::default()
        };
        packet.header.seq = self.data_seq;
        packet.header.stamp = now_ns();
        packet.t1 = now_ns();
        packet.e1 = ctx.offset_ns;

        let payload = serde_json::to_vec(&packet)?;
        ctx.bus.publish(&topics::data(ctx.name), payload).await?;
        trace!(node = %ctx.name, seq = packet.header.seq, bytes = size, "packet produced");

        self.data_seq += 1;
        Ok(())
    }
}

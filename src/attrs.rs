//! Remotely settable node attributes.
//!
//! Every node exposes a fixed, role-specific set of named integer attributes
//! over the control protocol. Instead of a stringly-typed map, each role keeps
//! a typed state struct and dispatches attribute names to its fields through
//! the [`Attributes`] trait, so remote settability never costs compile-time
//! field safety.
//!
//! Invariant: only names in the role's schema resolve. A `set` on an unknown
//! name fails without mutating anything and never creates new attributes.

/// Attribute names shared by every node.
pub const ATTR_RATE: &str = "rate";
pub const ATTR_PAUSED: &str = "paused";
pub const ATTR_ALIVE: &str = "alive";

/// Producer-specific attribute names.
pub const ATTR_DATA_SIZE: &str = "DATA_SIZE";
pub const ATTR_DATA_SEQ: &str = "DATA_SEQ";

/// Relay-specific attribute names.
pub const ATTR_COMPUTE_TIME: &str = "COMPUTE_TIME";

/// Named integer attribute access with a fixed schema.
pub trait Attributes {
    /// Look up an attribute by name. `None` means the name is not in the
    /// schema for this role.
    fn get(&self, name: &str) -> Option<i64>;

    /// Write an attribute by name. Returns `false` (and mutates nothing)
    /// when the name is not in the schema for this role.
    fn set(&mut self, name: &str, value: i64) -> bool;
}

/// Control-plane attributes common to every role.
///
/// `alive=0` terminates the run loop (terminal); `paused=1` suspends tick and
/// packet handling while the control protocol stays responsive. `rate` is the
/// self-driven tick frequency in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlAttrs {
    pub rate: i64,
    pub paused: bool,
    pub alive: bool,
}

impl Default for ControlAttrs {
    fn default() -> Self {
        // Nodes start alive but paused at 1 Hz; the coordinator unpauses them.
        Self { rate: 1, paused: true, alive: true }
    }
}

impl ControlAttrs {
    /// Tick frequency clamped to at least 1 Hz.
    pub fn effective_rate(&self) -> i64 {
        self.rate.max(1)
    }
}

impl Attributes for ControlAttrs {
    fn get(&self, name: &str) -> Option<i64> {
        match name {
            ATTR_RATE => Some(self.rate),
            ATTR_PAUSED => Some(i64::from(self.paused)),
            ATTR_ALIVE => Some(i64::from(self.alive)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: i64) -> bool {
        match name {
            ATTR_RATE => self.rate = value,
            ATTR_PAUSED => self.paused = value != 0,
            ATTR_ALIVE => self.alive = value != 0,
            _ => return false,
        }
        true
    }
}

//! Test-case identifier decoding.
//!
//! A test case is a compact three-digit identifier read positionally:
//! the low digit selects rate and payload size, the middle two digits
//! (tens plus hundreds) select injected load and mobility, and the hundreds
//! digit selects the feature label. Decoding is a pure function of the
//! identifier; any digit outside the tables is a configuration error, never
//! a silent default.

use crate::error::{HarnessError, Result};

/// Decoded traffic parameters for one campaign run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: u32,
    /// Producer tick rate in Hz.
    pub rate: i64,
    /// Payload size in bytes.
    pub size: i64,
    /// Injected background load in percent.
    pub load: i64,
    /// Whether the consumer platform is moving during the run.
    pub mobility: bool,
    /// Feature configuration label.
    pub feature: &'static str,
}

/// Low digit -> (rate Hz, size B).
const RATE_SIZE: [(i64, i64); 7] = [
    (10, 1_000),
    (20, 1_000),
    (10, 10_000),
    (20, 10_000),
    (20, 100_000),
    (10, 100_000),
    (10, 500_000),
];

/// Middle digit pair -> (load %, mobility).
const LOAD_MOBILITY: [(u32, i64, bool); 21] = [
    (0, 0, false),
    (1, 0, false),
    (2, 50, false),
    (3, 90, false),
    (4, 0, true),
    (5, 50, true),
    (6, 90, true),
    (7, 0, true),
    (8, 90, true),
    (9, 50, true),
    (10, 100, false),
    (11, 200, false),
    (12, 400, false),
    (13, 800, false),
    (20, 100, false),
    (21, 200, false),
    (22, 400, false),
    (23, 800, false),
    (31, 0, false),
    (32, 50, false),
    (33, 90, false),
];

/// High digit -> feature label.
const FEATURES: [&str; 3] = ["Debug", "Baseline", "Absolute Priority"];

/// Decode one identifier against the digit tables.
pub fn decode(id: u32) -> Result<TestCase> {
    let low = (id % 10) as usize;
    let (rate, size) = *RATE_SIZE
        .get(low)
        .ok_or_else(|| HarnessError::config(format!("Unrecognized rate/size digit in TC{id}")))?;

    let middle = (id / 10) % 100;
    let (_, load, mobility) = *LOAD_MOBILITY
        .iter()
        .find(|(digits, _, _)| *digits == middle)
        .ok_or_else(|| {
            HarnessError::config(format!("Unrecognized load/mobility digits in TC{id}"))
        })?;

    let high = ((id / 100) % 10) as usize;
    let feature = *FEATURES
        .get(high)
        .ok_or_else(|| HarnessError::config(format!("Unrecognized feature digit in TC{id}")))?;

    Ok(TestCase { id, rate, size, load, mobility, feature })
}

/// Decode a whole case list, failing on the first invalid identifier.
pub fn decode_all(ids: &[u32]) -> Result<Vec<TestCase>> {
    ids.iter().map(|id| decode(*id)).collect()
}

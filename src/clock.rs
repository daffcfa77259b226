//! Clock-offset estimation against an external time reference.
//!
//! Each node runs one [`ClockOffsetEstimator`] polling loop for the lifetime
//! of the node. Every hop reads the latest estimate when it stamps a packet,
//! so cross-machine timestamps can be corrected offline.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;

/// Default interval between reference queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One offset estimate from the external reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    /// Estimated local-minus-reference clock offset in nanoseconds.
    pub offset_ns: i64,
}

/// External time reference, queried periodically.
///
/// The actual query mechanism (NTP or otherwise) is an external collaborator;
/// the estimator only needs one offset sample per round trip.
#[async_trait::async_trait]
pub trait TimeReference: Send + Sync + 'static {
    async fn query(&self) -> Result<ClockSample>;
}

/// Reference that always reports a fixed offset. Stands in when no external
/// reference is reachable (offset correction degrades to zero).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticReference {
    pub offset_ns: i64,
}

#[async_trait::async_trait]
impl TimeReference for StaticReference {
    async fn query(&self) -> Result<ClockSample> {
        Ok(ClockSample { offset_ns: self.offset_ns })
    }
}

/// Latest clock-offset estimate, refreshed by a background polling loop.
///
/// Query failures are logged and leave the previous estimate in place; the
/// loop only stops when its cancellation token fires (wired to the owning
/// node's `alive` transition).
pub struct ClockOffsetEstimator {
    reference: Arc<dyn TimeReference>,
    poll_interval: Duration,
    offset_ns: AtomicI64,
}

impl ClockOffsetEstimator {
    pub fn new(reference: Arc<dyn TimeReference>, poll_interval: Duration) -> Arc<Self> {
        Arc::new(Self { reference, poll_interval, offset_ns: AtomicI64::new(0) })
    }

    /// Latest estimated offset in nanoseconds. Never blocks.
    pub fn current_offset(&self) -> i64 {
        self.offset_ns.load(Ordering::Relaxed)
    }

    /// Polling loop: query the reference once per interval until cancelled.
    ///
    /// A failed query keeps the stale estimate and continues; no single
    /// iteration blocks for longer than one query round trip.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        debug!(poll_interval = ?self.poll_interval, "clock estimator started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.reference.query().await {
                Ok(sample) => {
                    self.offset_ns.store(sample.offset_ns, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("time reference query failed: {e}");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        debug!("clock estimator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use std::sync::atomic::AtomicUsize;

    /// Reference that yields a scripted sequence of results.
    struct ScriptedReference {
        script: Vec<Result<ClockSample>>,
        cursor: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TimeReference for ScriptedReference {
        async fn query(&self) -> Result<ClockSample> {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            match self.script.get(i.min(self.script.len() - 1)) {
                Some(Ok(sample)) => Ok(*sample),
                _ => Err(HarnessError::transport("ntp", "unreachable")),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_query_retains_previous_estimate() {
        let reference = Arc::new(ScriptedReference {
            script: vec![
                Ok(ClockSample { offset_ns: 1500 }),
                Err(HarnessError::transport("ntp", "unreachable")),
            ],
            cursor: AtomicUsize::new(0),
        });
        let estimator = ClockOffsetEstimator::new(reference, Duration::from_millis(10));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&estimator).run(cancel.clone()));

        // Let a few poll rounds pass: one good sample, then failures.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(estimator.current_offset(), 1500);

        cancel.cancel();
        task.await.unwrap();
        // Stale value survives shutdown too.
        assert_eq!(estimator.current_offset(), 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop() {
        let estimator = ClockOffsetEstimator::new(
            Arc::new(StaticReference { offset_ns: -42 }),
            Duration::from_millis(10),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&estimator).run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(estimator.current_offset(), -42);

        cancel.cancel();
        task.await.unwrap();
    }
}

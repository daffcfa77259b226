//! Campaign driver: the coordinator role and test-case decoding.
//!
//! A campaign walks `Idle -> Connectivity-Check -> {Configure -> Run ->
//! Collect -> Cooldown}* -> Finished`. The coordinator is an ordinary node
//! role: its single tick executes the whole campaign over the control
//! protocol, then flips itself to paused so the tick never re-runs. Any
//! remote failure aborts the campaign; there is no partial-result salvage.

mod testcase;

pub use testcase::{TestCase, decode, decode_all};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::attrs::{
    ATTR_COMPUTE_TIME, ATTR_DATA_SEQ, ATTR_DATA_SIZE, ATTR_RATE, Attributes, ControlAttrs,
};
use crate::control::ControlClient;
use crate::error::{HarnessError, Result};
use crate::node::{Role, RoleContext};
use crate::storage::{self, CaseRecord};

/// Delay between pausing the upstream hops and pausing the consumer, so
/// in-flight packets can still land in the log.
const PAUSE_GRACE: Duration = Duration::from_millis(250);

/// Campaign metadata file name inside the run directory.
const METADATA_FILE: &str = "flags.yml";

/// Everything one campaign run needs, resolved before any network activity.
#[derive(Debug, Clone)]
pub struct CampaignPlan {
    /// Ordered test-case identifiers.
    pub cases: Vec<u32>,
    /// Per-case rate overrides in Hz; empty means use the decoded rates.
    pub rates: Vec<i64>,
    /// Per-case payload-size overrides in bytes; empty means decoded sizes.
    pub sizes: Vec<i64>,
    /// Traffic duration of one case.
    pub duration: Duration,
    /// Idle interval between cases.
    pub cooldown: Duration,
    /// How many times the full case list is executed.
    pub repetitions: u32,
    /// Block on an operator confirmation instead of the cooldown sleep.
    pub manual: bool,
    /// Emit a per-second progress line during each run.
    pub verbose: bool,
    /// Root under which the timestamped campaign directory is created.
    pub output_root: PathBuf,
    /// Length of the initial relay-chain smoke pass.
    pub connectivity_check: Duration,
}

impl Default for CampaignPlan {
    fn default() -> Self {
        Self {
            cases: Vec::new(),
            rates: Vec::new(),
            sizes: Vec::new(),
            duration: Duration::from_secs(120),
            cooldown: Duration::from_secs(30),
            repetitions: 1,
            manual: false,
            verbose: false,
            output_root: PathBuf::from("logs"),
            connectivity_check: Duration::from_secs(5),
        }
    }
}

impl CampaignPlan {
    /// Reject inconsistent plans before any network activity.
    pub fn validate(&self) -> Result<()> {
        if self.cases.is_empty() {
            return Err(HarnessError::config("campaign has no test cases"));
        }
        if !self.rates.is_empty() && self.rates.len() != self.cases.len() {
            return Err(HarnessError::config(format!(
                "{} rate overrides for {} test cases",
                self.rates.len(),
                self.cases.len()
            )));
        }
        if !self.sizes.is_empty() && self.sizes.len() != self.cases.len() {
            return Err(HarnessError::config(format!(
                "{} size overrides for {} test cases",
                self.sizes.len(),
                self.cases.len()
            )));
        }
        decode_all(&self.cases)?;
        Ok(())
    }
}

/// Campaign-driving role.
///
/// Controls the chain purely through the remote get/set protocol, so it
/// works unchanged whether the other nodes share its process or not.
pub struct Coordinator {
    control: ControlAttrs,
    plan: CampaignPlan,
    producer: String,
    relay: String,
    consumer: String,
}

impl Coordinator {
    pub fn new(
        plan: CampaignPlan,
        producer: impl Into<String>,
        relay: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            control: ControlAttrs::default(),
            plan,
            producer: producer.into(),
            relay: relay.into(),
            consumer: consumer.into(),
        }
    }

    async fn run_campaign(&self, ctx: &mut RoleContext<'_>) -> Result<()> {
        self.plan.validate()?;
        let cases = decode_all(&self.plan.cases)?;
        let client = ControlClient::new(Arc::clone(ctx.bus), ctx.name);

        let started_at = chrono::Local::now().format("%y%m%d_%H%M").to_string();
        let dir = storage::campaign_dir(&self.plan.output_root, &started_at)?;
        let case_list =
            self.plan.cases.iter().map(|id| format!("TC{id}")).collect::<Vec<_>>().join(", ");
        storage::write_metadata_header(&dir.join(METADATA_FILE), &started_at, &case_list)?;

        info!(cases = %case_list, repetitions = self.plan.repetitions, "campaign started");
        self.connectivity_check(&client, ctx).await?;

        let mut first = true;
        for repetition in 0..self.plan.repetitions.max(1) {
            for (index, case) in cases.iter().enumerate() {
                if !first {
                    self.pace().await?;
                }
                first = false;

                let rate = self.plan.rates.get(index).copied().unwrap_or(case.rate);
                let size = self.plan.sizes.get(index).copied().unwrap_or(case.size);
                info!(
                    case = case.id,
                    repetition,
                    rate,
                    size,
                    load = case.load,
                    mobility = case.mobility,
                    feature = case.feature,
                    "configuring test case"
                );
                client.remote_set(&self.producer, ATTR_RATE, rate).await?;
                client.remote_set(&self.producer, ATTR_DATA_SIZE, size).await?;
                client.remote_set(&self.producer, ATTR_DATA_SEQ, 0).await?;
                client.remote_set(&self.relay, ATTR_COMPUTE_TIME, 0).await?;

                let case_started = chrono::Local::now().format("%y%m%d_%H%M").to_string();
                self.run_chain(&client, ctx, self.plan.duration).await?;

                let log = client.remote_get_log(&self.consumer).await?;
                client.remote_set_log(&self.consumer, &[]).await?;

                let filename = format!("{case_started}__TC{}.csv", case.id);
                storage::write_packet_csv(&dir.join(&filename), &log)?;
                storage::append_case_record(
                    &dir.join(METADATA_FILE),
                    &CaseRecord {
                        case: case.id,
                        rate,
                        size,
                        load: case.load,
                        mobility: case.mobility,
                        features: case.feature.to_string(),
                        datetime: case_started,
                        duration: self.plan.duration.as_secs_f64(),
                        cooldown: self.plan.cooldown.as_secs_f64(),
                        filename,
                    },
                )?;
                info!(case = case.id, packets = log.len(), "test case collected");
            }
        }

        info!("campaign finished");
        Ok(())
    }

    /// Short smoke pass over the chain; zero received packets means the
    /// network is not wired up, which is fatal before any case runs.
    async fn connectivity_check(
        &self,
        client: &ControlClient,
        ctx: &mut RoleContext<'_>,
    ) -> Result<()> {
        client.remote_set_log(&self.consumer, &[]).await?;
        self.run_chain(client, ctx, self.plan.connectivity_check).await?;

        let log = client.remote_get_log(&self.consumer).await?;
        if log.is_empty() {
            return Err(HarnessError::config("connectivity check received zero packets"));
        }
        client.remote_set_log(&self.consumer, &[]).await?;
        info!(packets = log.len(), "connectivity check passed");
        Ok(())
    }

    /// One traffic window: unpause downstream-first, wait, pause
    /// upstream-first with a grace delay so tail packets land.
    async fn run_chain(
        &self,
        client: &ControlClient,
        ctx: &mut RoleContext<'_>,
        duration: Duration,
    ) -> Result<()> {
        client.unpause(&[&self.consumer, &self.relay, &self.producer]).await?;
        self.wait_run(ctx, duration).await;
        client.pause(&[&self.producer, &self.relay]).await?;
        tokio::time::sleep(PAUSE_GRACE).await;
        client.pause(&[&self.consumer]).await?;
        Ok(())
    }

    async fn wait_run(&self, ctx: &RoleContext<'_>, duration: Duration) {
        if !self.plan.verbose {
            tokio::time::sleep(duration).await;
            return;
        }

        let mut remaining = duration;
        while !remaining.is_zero() {
            let step = remaining.min(Duration::from_secs(1));
            tokio::time::sleep(step).await;
            remaining -= step;
            // Read the estimator live; a campaign outlives the offset
            // snapshot taken when the coordinator's tick was dispatched.
            info!(
                remaining_s = remaining.as_secs(),
                offset_ns = ctx.estimator.current_offset(),
                "run in progress"
            );
        }
    }

    /// Inter-case gap: operator confirmation in manual mode, otherwise the
    /// configured cooldown.
    async fn pace(&self) -> Result<()> {
        if self.plan.manual {
            info!("press enter to start the next test case");
            let mut line = String::new();
            BufReader::new(tokio::io::stdin())
                .read_line(&mut line)
                .await
                .map_err(|e| HarnessError::config(format!("operator input closed: {e}")))?;
        } else {
            tokio::time::sleep(self.plan.cooldown).await;
        }
        Ok(())
    }
}

impl Attributes for Coordinator {
    fn get(&self, name: &str) -> Option<i64> {
        self.control.get(name)
    }

    fn set(&mut self, name: &str, value: i64) -> bool {
        self.control.set(name, value)
    }
}

#[async_trait::async_trait]
impl Role for Coordinator {
    fn control(&self) -> &ControlAttrs {
        &self.control
    }

    /// The first unpaused tick runs the whole campaign, then the coordinator
    /// parks itself so the campaign never re-runs.
    async fn tick(&mut self, ctx: &mut RoleContext<'_>) -> Result<()> {
        let outcome = self.run_campaign(ctx).await;
        self.control.paused = true;
        if let Err(e) = &outcome {
            warn!("campaign aborted: {e}");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(cases: &[u32]) -> CampaignPlan {
        CampaignPlan { cases: cases.to_vec(), ..CampaignPlan::default() }
    }

    #[test]
    fn plan_validation_rejects_inconsistent_inputs() {
        assert!(plan(&[]).validate().is_err());
        assert!(plan(&[132]).validate().is_ok());

        let mismatched = CampaignPlan { rates: vec![10, 20], ..plan(&[132]) };
        assert!(mismatched.validate().is_err());
        let mismatched = CampaignPlan { sizes: vec![1000], ..plan(&[132, 0]) };
        assert!(mismatched.validate().is_err());

        // Undecodable case ids are caught before any network activity.
        assert!(plan(&[132, 9999]).validate().is_err());

        let matched = CampaignPlan {
            rates: vec![10, 20],
            sizes: vec![1000, 2000],
            ..plan(&[132, 0])
        };
        assert!(matched.validate().is_ok());
    }

    #[test]
    fn default_plan_matches_campaign_defaults() {
        let plan = CampaignPlan::default();
        assert_eq!(plan.duration, Duration::from_secs(120));
        assert_eq!(plan.cooldown, Duration::from_secs(30));
        assert_eq!(plan.repetitions, 1);
        assert_eq!(plan.connectivity_check, Duration::from_secs(5));
        assert!(!plan.manual);
        assert!(!plan.verbose);
    }
}

//! YAML configuration surface.
//!
//! One file configures a whole deployment: transport and time-reference
//! endpoints plus the campaign the coordinator will drive. Validation runs
//! before any network activity so a bad file aborts at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::campaign::CampaignPlan;
use crate::error::{HarnessError, Result};

/// Top-level harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Messaging endpoint the nodes connect to.
    pub bus_address: String,
    /// External time-reference endpoint for clock-offset estimation.
    pub time_reference_address: String,
    /// Time-reference poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Root directory for campaign output and log snapshots.
    pub output_root: PathBuf,
    pub campaign: CampaignConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bus_address: "localhost:4222".into(),
            time_reference_address: "pool.ntp.org".into(),
            poll_interval_ms: 250,
            output_root: PathBuf::from("logs"),
            campaign: CampaignConfig::default(),
        }
    }
}

/// Campaign section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Ordered test-case identifiers to execute.
    pub cases: Vec<u32>,
    /// Optional per-case rate overrides in Hz (1:1 with `cases`).
    pub rates: Vec<i64>,
    /// Optional per-case payload-size overrides in bytes (1:1 with `cases`).
    pub sizes: Vec<i64>,
    /// Traffic duration of one case, seconds.
    pub duration_s: f64,
    /// Idle interval between cases, seconds.
    pub cooldown_s: f64,
    /// How many times the full case list is executed.
    pub repetitions: u32,
    /// Wait for operator confirmation between cases instead of the cooldown.
    pub manual: bool,
    /// Emit a per-second progress line during each run.
    pub verbose: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            cases: Vec::new(),
            rates: Vec::new(),
            sizes: Vec::new(),
            duration_s: 120.0,
            cooldown_s: 30.0,
            repetitions: 1,
            manual: false,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| HarnessError::config(format!("malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml =
            std::fs::read_to_string(path).map_err(|e| HarnessError::storage(path, e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Startup validation; anything wrong here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.bus_address.trim().is_empty() {
            return Err(HarnessError::config("bus address is empty"));
        }
        if self.time_reference_address.trim().is_empty() {
            return Err(HarnessError::config("time-reference address is empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(HarnessError::config("poll interval must be positive"));
        }
        self.plan().validate()
    }

    /// Time-reference poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve the campaign section into an executable plan.
    pub fn plan(&self) -> CampaignPlan {
        CampaignPlan {
            cases: self.campaign.cases.clone(),
            rates: self.campaign.rates.clone(),
            sizes: self.campaign.sizes.clone(),
            duration: Duration::from_secs_f64(self.campaign.duration_s.max(0.0)),
            cooldown: Duration::from_secs_f64(self.campaign.cooldown_s.max(0.0)),
            repetitions: self.campaign.repetitions,
            manual: self.campaign.manual,
            verbose: self.campaign.verbose,
            output_root: self.output_root.clone(),
            ..CampaignPlan::default()
        }
    }
}

//! Durable output: packet record files and campaign metadata.
//!
//! A campaign produces one directory named by its start timestamp, holding
//! one row-oriented CSV per executed test case plus a YAML metadata file
//! (`flags.yml`) describing each case. Nodes reuse [`write_packet_csv`] for
//! their `get-log` snapshots.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{HarnessError, Result};
use crate::types::Packet;

/// Column order of a packet record file.
const CSV_HEADER: &str = "t1,t2,t3,t4,e1,e2,e3,e4,x,y,yaw,vel,lat,lon,seq,valid,frame_id";

/// Write one packet log as a CSV record file, creating parent directories.
pub fn write_packet_csv(path: &Path, packets: &[Packet]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| HarnessError::storage(parent, e))?;
    }

    let mut file = File::create(path).map_err(|e| HarnessError::storage(path, e))?;
    writeln!(file, "{CSV_HEADER}").map_err(|e| HarnessError::storage(path, e))?;

    for p in packets {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            p.t1,
            p.t2,
            p.t3,
            p.t4,
            p.e1,
            p.e2,
            p.e3,
            p.e4,
            p.x,
            p.y,
            p.yaw,
            p.velocity,
            p.latitude,
            p.longitude,
            p.header.seq,
            p.chk,
            p.header.frame_id,
        )
        .map_err(|e| HarnessError::storage(path, e))?;
    }

    Ok(())
}

/// Metadata for one executed test case, appended to the campaign record file.
#[derive(Debug, Clone, Serialize)]
pub struct CaseRecord {
    pub case: u32,
    pub rate: i64,
    pub size: i64,
    pub load: i64,
    pub mobility: bool,
    pub features: String,
    pub datetime: String,
    pub duration: f64,
    pub cooldown: f64,
    pub filename: String,
}

/// Start the campaign metadata file with a header comment.
pub fn write_metadata_header(path: &Path, started_at: &str, cases: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| HarnessError::storage(parent, e))?;
    }
    let mut file = File::create(path).map_err(|e| HarnessError::storage(path, e))?;
    writeln!(file, "# Test suite started at {started_at} with following test(s): {cases}")
        .map_err(|e| HarnessError::storage(path, e))?;
    Ok(())
}

/// Append one case record to the campaign metadata file as a YAML list item.
pub fn append_case_record(path: &Path, record: &CaseRecord) -> Result<()> {
    let yaml = serde_yaml_ng::to_string(std::slice::from_ref(record))
        .map_err(|e| HarnessError::codec("case record", e.to_string()))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HarnessError::storage(path, e))?;
    file.write_all(yaml.as_bytes()).map_err(|e| HarnessError::storage(path, e))?;
    Ok(())
}

/// Create (if needed) and return the output directory for one campaign run.
pub fn campaign_dir(root: &Path, started_at: &str) -> Result<PathBuf> {
    let dir = root.join(started_at);
    fs::create_dir_all(&dir).map_err(|e| HarnessError::storage(&dir, e))?;
    Ok(dir)
}

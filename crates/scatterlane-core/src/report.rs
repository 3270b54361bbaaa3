use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;
use uuid::Uuid;

use crate::fanout::ContainerPlan;

const REPORT_SCHEMA_VERSION: u32 = 1;
const MILLIS_PER_SECOND: f64 = 1_000.0;

/// Summary of a set of container plans. Two plans with the same
/// `structure_hash` place the same assets with the same spacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanReport {
    pub schema_version: u32,
    pub session_id: String,
    pub container_count: usize,
    pub channel_count: usize,
    pub event_count: usize,
    pub crossfade_count: usize,
    pub skipped_count: usize,
    pub structure_hash: String,
}

#[derive(Serialize)]
struct ChannelFingerprint<'a> {
    container: &'a str,
    channel: usize,
    events: Vec<(&'a str, i64, i64)>,
}

#[instrument(skip(plans), fields(session_id = %session_id, plans = plans.len()))]
pub fn plan_report(session_id: Uuid, plans: &[ContainerPlan]) -> Result<PlanReport> {
    let fingerprints: Vec<ChannelFingerprint<'_>> = plans
        .iter()
        .flat_map(|plan| {
            let origin = plan.window.start();
            plan.channels.iter().map(move |channel| ChannelFingerprint {
                container: &plan.container_name,
                channel: channel.channel_index,
                events: channel
                    .events
                    .iter()
                    .map(|event| {
                        (
                            event.asset.name.as_str(),
                            to_millis(event.start_time - origin),
                            to_millis(event.length),
                        )
                    })
                    .collect(),
            })
        })
        .collect();
    let structure_bytes =
        serde_json::to_vec(&fingerprints).context("failed to serialize plan structure")?;

    Ok(PlanReport {
        schema_version: REPORT_SCHEMA_VERSION,
        session_id: session_id.to_string(),
        container_count: plans.len(),
        channel_count: fingerprints.len(),
        event_count: plans.iter().map(ContainerPlan::event_count).sum(),
        crossfade_count: plans.iter().map(ContainerPlan::crossfade_count).sum(),
        skipped_count: plans.iter().map(|plan| plan.skips.skipped).sum(),
        structure_hash: hash_hex(&structure_bytes),
    })
}

pub fn read_plan_report(path: &Path) -> Result<PlanReport> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read plan report: {}", path.display()))?;
    let report: PlanReport =
        serde_json::from_slice(&bytes).context("failed to parse plan report json")?;
    Ok(report)
}

pub fn write_plan_report(path: &Path, report: &PlanReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(report).context("failed to encode plan report json")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write plan report: {}", path.display()))?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn to_millis(seconds: f64) -> i64 {
    (seconds * MILLIS_PER_SECOND).round() as i64
}

fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    fanout::{self, ContainerPlan},
    host::{self, ApplyStats, HostBatch, HostError, TimelineHost, TrackTarget},
    model::{Container, Group, IntervalMode, Session},
    resolve::ParameterSource,
    scheduler::ScheduleOptions,
    time::TimeWindow,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("group not found: {0}")]
    GroupNotFound(Uuid),
    #[error("container {container_id} not found in group {group_id}")]
    ContainerNotFound { group_id: Uuid, container_id: Uuid },
    #[error("interval mode `{0}` has no placement algorithm")]
    UnsupportedIntervalMode(IntervalMode),
    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationOptions {
    pub schedule: ScheduleOptions,
    /// Pins the random stream; `None` seeds from the OS.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum GenerationScope {
    Session,
    Group { group_id: Uuid },
    Container { group_id: Uuid, container_id: Uuid },
}

impl fmt::Display for GenerationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => f.write_str("session"),
            Self::Group { group_id } => write!(f, "group {group_id}"),
            Self::Container { container_id, .. } => write!(f, "container {container_id}"),
        }
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationSummary {
    pub skipped_count: usize,
    /// Largest overlap that forced a skip, i.e. the asset length that would
    /// have avoided every skip of the pass.
    pub min_required_length: f64,
    pub containers_generated: usize,
    pub containers_failed: usize,
    /// Events handed to the host. Channels that got no track are left out.
    pub events_placed: usize,
    pub apply: ApplyStats,
}

impl GenerationSummary {
    fn record_skips(&mut self, plan: &ContainerPlan) {
        self.skipped_count += plan.skips.skipped;
        self.min_required_length = self
            .min_required_length
            .max(plan.skips.min_required_length);
    }
}

/// Everything a pass needs, passed in rather than looked up: the session
/// tree, the host and the random stream.
pub struct GenerationContext<'a, H: TimelineHost + ?Sized> {
    session: &'a Session,
    host: &'a mut H,
    options: GenerationOptions,
    rng: ChaCha8Rng,
}

impl<'a, H: TimelineHost + ?Sized> GenerationContext<'a, H> {
    pub fn new(session: &'a Session, host: &'a mut H, options: GenerationOptions) -> Self {
        Self {
            session,
            host,
            options,
            rng: seeded_rng(options.seed),
        }
    }

    /// Regenerates every container in `scope`. Only an unknown group or
    /// container fails the call; per-container problems are logged,
    /// counted and skipped.
    #[instrument(skip(self, window, scope), fields(session_id = %self.session.id, start = window.start(), end = window.end(), %scope))]
    pub fn generate(
        &mut self,
        window: TimeWindow,
        scope: GenerationScope,
    ) -> Result<GenerationSummary, GenerationError> {
        let mut host = HostBatch::begin(&mut *self.host, format!("Generate {scope}"));
        let targets = collect_targets(self.session, scope)?;

        let mut summary = GenerationSummary::default();
        for (group, container) in targets {
            let params = ParameterSource::of(group, container).resolve();
            let plan = match fanout::plan_container(
                &params,
                window,
                &self.options.schedule,
                &mut self.rng,
            ) {
                Ok(plan) => plan,
                Err(error) => {
                    warn!(container = %container.name, %error, "container skipped");
                    summary.containers_failed += 1;
                    continue;
                }
            };
            summary.record_skips(&plan);
            warn_skips(&plan);

            let target = TrackTarget {
                group_id: group.id,
                group_name: &group.name,
                container_id: container.id,
                container_name: &container.name,
                channel_mode: container.channel_mode,
            };
            let tracks = match host.container_tracks(&target) {
                Ok(tracks) => tracks,
                Err(error) => {
                    warn!(container = %container.name, %error, "no tracks for container, skipped");
                    summary.containers_failed += 1;
                    summary.apply.failures += 1;
                    continue;
                }
            };
            if tracks.len() < plan.channels.len() {
                warn!(
                    container = %container.name,
                    tracks = tracks.len(),
                    channels = plan.channels.len(),
                    "host returned fewer tracks than channels"
                );
            }

            for (channel, track) in plan.channels.iter().zip(&tracks) {
                let stats = host::apply_channel_plan(&mut *host, track, window, channel);
                summary.apply.merge(&stats);
                summary.events_placed += channel.events.len();
            }
            summary.containers_generated += 1;
        }

        info!(
            containers = summary.containers_generated,
            failed = summary.containers_failed,
            events = summary.events_placed,
            skipped = summary.skipped_count,
            host_failures = summary.apply.failures,
            "generation pass complete"
        );
        Ok(summary)
    }
}

/// Computes placement for `scope` without a host.
#[instrument(skip(session, window, scope, options), fields(session_id = %session.id, start = window.start(), end = window.end(), %scope))]
pub fn plan_scope(
    session: &Session,
    scope: GenerationScope,
    window: TimeWindow,
    options: &GenerationOptions,
) -> Result<Vec<ContainerPlan>, GenerationError> {
    let mut rng = seeded_rng(options.seed);
    let mut plans = Vec::new();
    for (group, container) in collect_targets(session, scope)? {
        let params = ParameterSource::of(group, container).resolve();
        match fanout::plan_container(&params, window, &options.schedule, &mut rng) {
            Ok(plan) => {
                warn_skips(&plan);
                plans.push(plan);
            }
            Err(error) => warn!(container = %container.name, %error, "container skipped"),
        }
    }
    Ok(plans)
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_os_rng, ChaCha8Rng::seed_from_u64)
}

fn warn_skips(plan: &ContainerPlan) {
    if plan.skips.is_empty() {
        return;
    }
    warn!(
        container = %plan.container_name,
        skipped = plan.skips.skipped,
        min_required_length = plan.skips.min_required_length,
        "items skipped: assets shorter than the requested overlap"
    );
}

fn collect_targets(
    session: &Session,
    scope: GenerationScope,
) -> Result<Vec<(&Group, &Container)>, GenerationError> {
    match scope {
        GenerationScope::Session => Ok(session
            .groups
            .iter()
            .flat_map(|group| {
                group
                    .containers
                    .iter()
                    .map(move |container| (group, container))
            })
            .collect()),
        GenerationScope::Group { group_id } => {
            let group = session
                .group(group_id)
                .ok_or(GenerationError::GroupNotFound(group_id))?;
            Ok(group
                .containers
                .iter()
                .map(|container| (group, container))
                .collect())
        }
        GenerationScope::Container {
            group_id,
            container_id,
        } => {
            let group = session
                .group(group_id)
                .ok_or(GenerationError::GroupNotFound(group_id))?;
            let container =
                group
                    .container(container_id)
                    .ok_or(GenerationError::ContainerNotFound {
                        group_id,
                        container_id,
                    })?;
            Ok(vec![(group, container)])
        }
    }
}

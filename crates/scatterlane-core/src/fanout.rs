use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    generation::GenerationError,
    interval::{self, IntervalPlan},
    model::ChannelMode,
    resolve::EffectiveParameters,
    scheduler::{self, ChannelPlan, ScheduleOptions, SkipStats},
    time::TimeWindow,
};

/// Placement decisions for every output channel of one container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerPlan {
    pub container_id: Uuid,
    pub container_name: String,
    pub channel_mode: ChannelMode,
    pub window: TimeWindow,
    pub interval: IntervalPlan,
    pub channels: Vec<ChannelPlan>,
    pub skips: SkipStats,
}

impl ContainerPlan {
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.channels.iter().map(|channel| channel.events.len()).sum()
    }

    #[must_use]
    pub fn crossfade_count(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.crossfades.len())
            .sum()
    }
}

/// Runs the scheduler once per output channel. Each channel draws from its
/// own stream forked off `rng`, so asset picks, positions and drift differ
/// between channels.
#[instrument(skip(params, window, options, rng), fields(container = %params.container_name, start = window.start(), end = window.end()))]
pub fn plan_container<R: Rng + ?Sized>(
    params: &EffectiveParameters,
    window: TimeWindow,
    options: &ScheduleOptions,
    rng: &mut R,
) -> Result<ContainerPlan, GenerationError> {
    let interval = interval::plan_interval(params, window.len())?;

    if params.placeable_items().next().is_none() {
        warn!(
            items = params.items.len(),
            "container has no placeable items, nothing generated"
        );
    }

    let mut skips = SkipStats::default();
    let channels: Vec<ChannelPlan> = (0..params.channel_mode.channel_count())
        .map(|channel_index| {
            let mut stream = ChaCha8Rng::seed_from_u64(rng.random::<u64>());
            let plan = scheduler::schedule_channel(
                params,
                window,
                &interval,
                channel_index,
                options,
                &mut stream,
            );
            skips.merge(&plan.skips);
            plan
        })
        .collect();

    Ok(ContainerPlan {
        container_id: params.container_id,
        container_name: params.container_name.clone(),
        channel_mode: params.channel_mode,
        window,
        interval,
        channels,
        skips,
    })
}

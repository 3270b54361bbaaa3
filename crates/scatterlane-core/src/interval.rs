use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    generation::GenerationError,
    model::{ChunkSettings, IntervalMode},
    resolve::EffectiveParameters,
};

/// Nominal gap between the end of one item and the start of the next, in
/// seconds. Negative values request overlap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntervalPlan {
    Continuous { interval: f64 },
    Chunked { interval: f64, chunk: ChunkSettings },
}

impl IntervalPlan {
    #[must_use]
    pub const fn interval(&self) -> f64 {
        match self {
            Self::Continuous { interval } | Self::Chunked { interval, .. } => *interval,
        }
    }
}

/// Computes the interval for a window of `window_length` seconds.
pub fn plan_interval(
    params: &EffectiveParameters,
    window_length: f64,
) -> Result<IntervalPlan, GenerationError> {
    let rate = params.trigger.rate;
    let plan = match params.trigger.mode {
        IntervalMode::Absolute => IntervalPlan::Continuous { interval: rate },
        IntervalMode::Relative => IntervalPlan::Continuous {
            interval: window_length * rate / 100.0,
        },
        IntervalMode::Coverage => IntervalPlan::Continuous {
            interval: coverage_interval(params, window_length),
        },
        IntervalMode::Chunk => IntervalPlan::Chunked {
            interval: rate,
            chunk: params.chunk,
        },
        mode @ (IntervalMode::Noise | IntervalMode::Euclidean) => {
            return Err(GenerationError::UnsupportedIntervalMode(mode));
        }
    };

    if !plan.interval().is_finite() {
        warn!(
            container = %params.container_name,
            rate,
            "non-finite interval, falling back to the window length"
        );
        return Ok(match plan {
            IntervalPlan::Continuous { .. } => IntervalPlan::Continuous {
                interval: window_length,
            },
            IntervalPlan::Chunked { chunk, .. } => IntervalPlan::Chunked {
                interval: window_length,
                chunk,
            },
        });
    }

    debug!(
        container = %params.container_name,
        mode = %params.trigger.mode,
        interval = plan.interval(),
        "interval planned"
    );
    Ok(plan)
}

fn coverage_interval(params: &EffectiveParameters, window_length: f64) -> f64 {
    let average_length = params.average_item_length();
    let coverage = params.trigger.rate / 100.0;
    let desired_count = if average_length > 0.0 {
        window_length * coverage / average_length
    } else {
        0.0
    };

    if desired_count > 0.0 && desired_count.is_finite() {
        window_length / desired_count
    } else {
        debug!(
            container = %params.container_name,
            average_length,
            coverage,
            "degenerate coverage count, using the window length as interval"
        );
        window_length
    }
}

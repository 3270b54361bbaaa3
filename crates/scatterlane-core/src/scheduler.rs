//! Placement of asset instances inside a window for a single channel.
//!
//! Everything here is pure: the scheduler only decides where items go and
//! returns them as [`PlacementEvent`]s. Applying them to a timeline is the
//! job of [`crate::host`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    crossfade::{self, CrossfadeLink},
    interval::IntervalPlan,
    model::{ChunkSettings, CrossfadeShape, SoundAsset},
    resolve::EffectiveParameters,
    sampler::{self, FadeCurve, ItemAttributes},
    time::{MIN_CURSOR_ADVANCE, TimeWindow},
};

pub const DEFAULT_CHUNK_ITEM_CAP: usize = 1_000;
/// Floor for a jittered active chunk span, in seconds.
pub const MIN_ACTIVE_CHUNK_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleOptions {
    pub crossfade_shape: CrossfadeShape,
    pub chunk_item_cap: usize,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            crossfade_shape: CrossfadeShape::default(),
            chunk_item_cap: DEFAULT_CHUNK_ITEM_CAP,
        }
    }
}

/// One item instance to create on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementEvent {
    pub asset: SoundAsset,
    pub start_time: f64,
    pub length: f64,
    pub channel_index: usize,
    pub attributes: ItemAttributes,
    pub fade_in: FadeCurve,
    pub fade_out: FadeCurve,
}

impl PlacementEvent {
    #[must_use]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.length
    }
}

/// Draws that were discarded because the asset could not honour a negative
/// interval.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SkipStats {
    pub skipped: usize,
    /// Shortest asset length that would have avoided every skip.
    pub min_required_length: f64,
}

impl SkipStats {
    pub fn record(&mut self, required_length: f64) {
        self.skipped += 1;
        self.min_required_length = self.min_required_length.max(required_length);
    }

    pub fn merge(&mut self, other: &Self) {
        self.skipped += other.skipped;
        self.min_required_length = self.min_required_length.max(other.min_required_length);
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.skipped == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelPlan {
    pub channel_index: usize,
    pub events: Vec<PlacementEvent>,
    pub crossfades: Vec<CrossfadeLink>,
    /// Spans that were eligible for placement. Covers the whole window
    /// outside chunk mode.
    pub active_spans: Vec<TimeWindow>,
    pub skips: SkipStats,
    /// Chunks that stopped early on the per-chunk item cap.
    pub capped_chunks: usize,
}

impl ChannelPlan {
    fn empty(channel_index: usize) -> Self {
        Self {
            channel_index,
            ..Self::default()
        }
    }
}

/// Schedules one channel of a container over `window`.
pub fn schedule_channel<R: Rng + ?Sized>(
    params: &EffectiveParameters,
    window: TimeWindow,
    interval: &IntervalPlan,
    channel_index: usize,
    options: &ScheduleOptions,
    rng: &mut R,
) -> ChannelPlan {
    let mut plan = ChannelPlan::empty(channel_index);
    let pool: Vec<&SoundAsset> = params.placeable_items().collect();
    if pool.is_empty() {
        return plan;
    }

    let runner = SpanRunner {
        params,
        pool,
        channel_index,
        options,
    };

    match *interval {
        IntervalPlan::Continuous { interval } => {
            plan.active_spans.push(window);
            runner.run(window, interval, None, rng, &mut plan);
        }
        IntervalPlan::Chunked { interval, chunk } => {
            runner.run_chunks(window, interval, &chunk, rng, &mut plan);
        }
    }

    debug!(
        container = %params.container_name,
        channel = channel_index,
        events = plan.events.len(),
        crossfades = plan.crossfades.len(),
        skipped = plan.skips.skipped,
        "channel scheduled"
    );
    plan
}

struct SpanRunner<'a> {
    params: &'a EffectiveParameters,
    pool: Vec<&'a SoundAsset>,
    channel_index: usize,
    options: &'a ScheduleOptions,
}

impl SpanRunner<'_> {
    /// Fills `span` and returns `true` when `item_cap` stopped it early.
    ///
    /// The interval is the gap from one item's end to the next item's start,
    /// so drift-free spacing is `length + interval`, not `interval`.
    fn run<R: Rng + ?Sized>(
        &self,
        span: TimeWindow,
        interval: f64,
        item_cap: Option<usize>,
        rng: &mut R,
        plan: &mut ChannelPlan,
    ) -> bool {
        let mut cursor = span.start();
        let mut previous: Option<usize> = None;
        let mut is_first = true;
        let mut placed = 0_usize;

        while cursor < span.end() {
            if item_cap.is_some_and(|cap| placed >= cap) {
                return true;
            }

            let asset = self.pool[rng.random_range(0..self.pool.len())];
            if interval < 0.0 && asset.length < interval.abs() {
                plan.skips.record(interval.abs());
                cursor += MIN_CURSOR_ADVANCE;
                continue;
            }

            let position = if is_first && interval > 0.0 {
                span.start() + rng.random::<f64>() * interval
            } else {
                let spread = interval.abs() * self.params.trigger.drift / 100.0;
                let drift = sampler::uniform(rng, -spread / 2.0, spread / 2.0);
                (cursor + interval + drift).max(span.start())
            };
            if position >= span.end() {
                break;
            }

            let length = asset.length.min(span.end() - position);
            let event = self.build_event(asset, position, length, rng);
            let index = plan.events.len();
            if let Some(previous_index) = previous.filter(|_| position < cursor) {
                let link = crossfade::link(
                    (previous_index, &plan.events[previous_index]),
                    (index, &event),
                    self.options.crossfade_shape,
                );
                plan.crossfades.extend(link);
            }

            trace!(position, length, asset = %asset.name, "item placed");
            cursor = (position + length).max(cursor + MIN_CURSOR_ADVANCE);
            plan.events.push(event);
            previous = Some(index);
            is_first = false;
            placed += 1;
        }
        false
    }

    fn run_chunks<R: Rng + ?Sized>(
        &self,
        window: TimeWindow,
        interval: f64,
        chunk: &ChunkSettings,
        rng: &mut R,
        plan: &mut ChannelPlan,
    ) {
        let active_variation = chunk.active_variation.abs() / 100.0;
        let silence_variation = chunk.silence_variation.abs() / 100.0;
        let mut cursor = window.start();

        while cursor < window.end() {
            let active = (chunk.active_duration
                * (1.0 + sampler::uniform(rng, -active_variation, active_variation)))
            .max(MIN_ACTIVE_CHUNK_SECONDS);
            let silence = (chunk.silence_duration
                * (1.0 + sampler::uniform(rng, -silence_variation, silence_variation)))
            .max(0.0);

            if let Some(span) = window.sub_window(cursor, cursor + active) {
                plan.active_spans.push(span);
                if self.run(span, interval, Some(self.options.chunk_item_cap), rng, plan) {
                    plan.capped_chunks += 1;
                    debug!(
                        container = %self.params.container_name,
                        chunk_start = span.start(),
                        cap = self.options.chunk_item_cap,
                        "chunk reached its item cap"
                    );
                }
            }
            cursor += active + silence;
        }
    }

    fn build_event<R: Rng + ?Sized>(
        &self,
        asset: &SoundAsset,
        start_time: f64,
        length: f64,
        rng: &mut R,
    ) -> PlacementEvent {
        let attributes = sampler::sample_attributes(&self.params.randomization, asset, rng);
        PlacementEvent {
            asset: asset.clone(),
            start_time,
            length,
            channel_index: self.channel_index,
            attributes,
            fade_in: sampler::fade_curve(&self.params.fades.fade_in, length),
            fade_out: sampler::fade_curve(&self.params.fades.fade_out, length),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::{
        model::{Container, Group, IntervalMode},
        resolve::ParameterSource,
    };

    fn params(rate: f64, drift: f64, lengths: &[f64]) -> EffectiveParameters {
        let mut container = Container::new("Wind").with_items(
            lengths
                .iter()
                .map(|length| SoundAsset::new("gust", "gust.wav", *length))
                .collect(),
        );
        container.override_parent = true;
        container.settings.trigger.mode = IntervalMode::Absolute;
        container.settings.trigger.rate = rate;
        container.settings.trigger.drift = drift;
        ParameterSource::of(&Group::new("Air"), &container).resolve()
    }

    fn window(start: f64, end: f64) -> TimeWindow {
        TimeWindow::new(start, end).expect("test window should be valid")
    }

    #[test]
    fn empty_pool_places_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = schedule_channel(
            &params(1.0, 0.0, &[]),
            window(0.0, 10.0),
            &IntervalPlan::Continuous { interval: 1.0 },
            0,
            &ScheduleOptions::default(),
            &mut rng,
        );
        assert!(plan.events.is_empty());
        assert!(plan.active_spans.is_empty());
    }

    #[test]
    fn zero_interval_places_back_to_back_without_crossfades() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let plan = schedule_channel(
            &params(0.0, 0.0, &[1.0]),
            window(0.0, 5.0),
            &IntervalPlan::Continuous { interval: 0.0 },
            0,
            &ScheduleOptions::default(),
            &mut rng,
        );
        let starts: Vec<f64> = plan.events.iter().map(|event| event.start_time).collect();
        assert_eq!(starts.len(), 5);
        for (index, start) in starts.iter().enumerate() {
            assert!((start - index as f64).abs() < 1e-9);
        }
        assert!(plan.crossfades.is_empty());
    }

    #[test]
    fn negative_interval_links_every_consecutive_pair() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let plan = schedule_channel(
            &params(-0.5, 0.0, &[2.0]),
            window(0.0, 12.0),
            &IntervalPlan::Continuous { interval: -0.5 },
            0,
            &ScheduleOptions::default(),
            &mut rng,
        );
        assert!(plan.events.len() > 2);
        assert_eq!(plan.crossfades.len(), plan.events.len() - 1);
        for link in &plan.crossfades {
            assert_eq!(link.second, link.first + 1);
            assert!(link.overlap_length > 0.0);
        }
    }

    #[test]
    fn exact_overlap_still_terminates() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let plan = schedule_channel(
            &params(-1.0, 0.0, &[1.0]),
            window(0.0, 3.0),
            &IntervalPlan::Continuous { interval: -1.0 },
            0,
            &ScheduleOptions::default(),
            &mut rng,
        );
        assert!(!plan.events.is_empty());
        assert!(plan.events.len() <= 31);
    }

    #[test]
    fn chunk_item_cap_bounds_each_chunk() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let options = ScheduleOptions {
            chunk_item_cap: 3,
            ..ScheduleOptions::default()
        };
        let chunk = ChunkSettings {
            active_duration: 10.0,
            active_variation: 0.0,
            silence_duration: 10.0,
            silence_variation: 0.0,
        };
        let plan = schedule_channel(
            &params(0.0, 0.0, &[0.2]),
            window(0.0, 40.0),
            &IntervalPlan::Chunked {
                interval: 0.0,
                chunk,
            },
            0,
            &options,
            &mut rng,
        );
        assert_eq!(plan.active_spans.len(), 2);
        assert_eq!(plan.events.len(), 6);
        assert_eq!(plan.capped_chunks, 2);
    }

    #[test]
    fn skip_stats_merge_keeps_largest_requirement() {
        let mut left = SkipStats::default();
        left.record(1.0);
        let mut right = SkipStats::default();
        right.record(2.5);
        right.record(2.5);
        left.merge(&right);
        assert_eq!(left.skipped, 3);
        assert!((left.min_required_length - 2.5).abs() < f64::EPSILON);
    }
}

//! Contract between the placement core and whatever owns the real
//! timeline, plus the phase that applies a finished plan to it.

use std::{
    fmt::Debug,
    ops::{Deref, DerefMut},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    model::{ChannelMode, CrossfadeShape, SoundAsset},
    sampler::FadeCurve,
    scheduler::ChannelPlan,
    time::TimeWindow,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("no track available for {0}")]
    TrackUnavailable(String),
    #[error("item rejected: {0}")]
    ItemRejected(String),
    #[error("host operation `{operation}` failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },
}

/// What the host needs to know to hand out the tracks of a container.
#[derive(Debug, Clone, Copy)]
pub struct TrackTarget<'a> {
    pub group_id: Uuid,
    pub group_name: &'a str,
    pub container_id: Uuid,
    pub container_name: &'a str,
    pub channel_mode: ChannelMode,
}

impl TrackTarget<'_> {
    #[must_use]
    pub const fn channel_count(&self) -> usize {
        self.channel_mode.channel_count()
    }
}

/// Timeline operations the core relies on. Track layout, folders and
/// routing stay on the host's side.
pub trait TimelineHost {
    type Track: Clone + Debug;
    type Item: Clone + Debug;

    /// Opens an undo/refresh bracket. Always paired with [`end_batch`](Self::end_batch).
    fn begin_batch(&mut self, label: &str);
    fn end_batch(&mut self, label: &str);

    /// One track per output channel, in channel order.
    fn container_tracks(&mut self, target: &TrackTarget<'_>)
    -> Result<Vec<Self::Track>, HostError>;

    /// Removes previously generated content of `track` inside `window`.
    fn clear_items(&mut self, track: &Self::Track, window: TimeWindow) -> Result<(), HostError>;

    fn create_item(
        &mut self,
        track: &Self::Track,
        asset: &SoundAsset,
        start_time: f64,
        length: f64,
    ) -> Result<Self::Item, HostError>;

    fn set_item_gain(&mut self, item: &Self::Item, gain: f64) -> Result<(), HostError>;
    fn set_item_pitch(&mut self, item: &Self::Item, semitones: f64) -> Result<(), HostError>;
    fn set_item_pan(&mut self, item: &Self::Item, pan: f64) -> Result<(), HostError>;

    fn set_item_fades(
        &mut self,
        item: &Self::Item,
        fade_in: &FadeCurve,
        fade_out: &FadeCurve,
    ) -> Result<(), HostError>;

    fn create_crossfade(
        &mut self,
        first: &Self::Item,
        second: &Self::Item,
        shape: CrossfadeShape,
    ) -> Result<(), HostError>;
}

/// Holds a host batch open for its lifetime and closes it on drop, on
/// every exit path.
pub struct HostBatch<'a, H: TimelineHost + ?Sized> {
    host: &'a mut H,
    label: String,
}

impl<'a, H: TimelineHost + ?Sized> HostBatch<'a, H> {
    pub fn begin(host: &'a mut H, label: impl Into<String>) -> Self {
        let label = label.into();
        host.begin_batch(&label);
        Self { host, label }
    }
}

impl<H: TimelineHost + ?Sized> Deref for HostBatch<'_, H> {
    type Target = H;

    fn deref(&self) -> &Self::Target {
        self.host
    }
}

impl<H: TimelineHost + ?Sized> DerefMut for HostBatch<'_, H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.host
    }
}

impl<H: TimelineHost + ?Sized> Drop for HostBatch<'_, H> {
    fn drop(&mut self) {
        self.host.end_batch(&self.label);
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyStats {
    pub items_created: usize,
    pub crossfades_created: usize,
    pub failures: usize,
}

impl ApplyStats {
    pub fn merge(&mut self, other: &Self) {
        self.items_created += other.items_created;
        self.crossfades_created += other.crossfades_created;
        self.failures += other.failures;
    }
}

/// Writes one channel plan onto `track`. Failures are logged and counted;
/// the remaining events are still applied.
pub fn apply_channel_plan<H: TimelineHost + ?Sized>(
    host: &mut H,
    track: &H::Track,
    window: TimeWindow,
    plan: &ChannelPlan,
) -> ApplyStats {
    let mut stats = ApplyStats::default();

    if let Err(error) = host.clear_items(track, window) {
        warn!(?track, %error, "failed to clear previous items, continuing");
        stats.failures += 1;
    }

    let mut items: Vec<Option<H::Item>> = Vec::with_capacity(plan.events.len());
    for event in &plan.events {
        let item = match host.create_item(track, &event.asset, event.start_time, event.length) {
            Ok(item) => item,
            Err(error) => {
                warn!(
                    asset = %event.asset.name,
                    start_time = event.start_time,
                    %error,
                    "item creation failed, skipping event"
                );
                stats.failures += 1;
                items.push(None);
                continue;
            }
        };

        let attributes = &event.attributes;
        let results = [
            host.set_item_gain(&item, attributes.volume),
            host.set_item_pitch(&item, attributes.pitch),
            host.set_item_pan(&item, attributes.pan),
            host.set_item_fades(&item, &event.fade_in, &event.fade_out),
        ];
        for error in results.into_iter().filter_map(Result::err) {
            warn!(asset = %event.asset.name, %error, "item property update failed");
            stats.failures += 1;
        }

        stats.items_created += 1;
        items.push(Some(item));
    }

    for link in &plan.crossfades {
        let pair = items
            .get(link.first)
            .and_then(Option::as_ref)
            .zip(items.get(link.second).and_then(Option::as_ref));
        let Some((first, second)) = pair else {
            debug!(
                first = link.first,
                second = link.second,
                "crossfade skipped, an item is missing"
            );
            continue;
        };
        match host.create_crossfade(first, second, link.shape) {
            Ok(()) => stats.crossfades_created += 1,
            Err(error) => {
                warn!(%error, "crossfade creation failed");
                stats.failures += 1;
            }
        }
    }

    stats
}

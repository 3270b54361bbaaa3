use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::{
    host::{HostError, TimelineHost, TrackTarget},
    model::{CrossfadeShape, SoundAsset},
    sampler::FadeCurve,
    time::TimeWindow,
};

/// In-process timeline used by the CLI and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredTimeline")]
pub struct MemoryTimeline {
    pub tracks: Vec<MemoryTrack>,
    pub crossfades: Vec<MemoryCrossfade>,
    /// Labels of batches that have been closed, in closing order.
    pub completed_batches: Vec<String>,
    #[serde(skip)]
    batch_depth: usize,
    #[serde(skip)]
    next_item_id: u64,
    #[serde(skip)]
    item_attempts: usize,
    #[serde(skip)]
    failures: FailurePlan,
}

/// Persisted part of a [`MemoryTimeline`]. Loading resumes item ids after
/// the largest stored one.
#[derive(Deserialize)]
struct StoredTimeline {
    tracks: Vec<MemoryTrack>,
    #[serde(default)]
    crossfades: Vec<MemoryCrossfade>,
    #[serde(default)]
    completed_batches: Vec<String>,
}

impl From<StoredTimeline> for MemoryTimeline {
    fn from(stored: StoredTimeline) -> Self {
        let next_item_id = stored
            .tracks
            .iter()
            .flat_map(|track| track.items.iter())
            .map(|item| item.id + 1)
            .max()
            .unwrap_or(0);
        Self {
            tracks: stored.tracks,
            crossfades: stored.crossfades,
            completed_batches: stored.completed_batches,
            next_item_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct FailurePlan {
    item_attempts: BTreeSet<usize>,
    track_containers: BTreeSet<Uuid>,
    track_limits: BTreeMap<Uuid, usize>,
    crossfades: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryTrack {
    pub name: String,
    pub container_id: Uuid,
    pub channel_index: usize,
    pub items: Vec<MemoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryItem {
    pub id: u64,
    pub asset_name: String,
    pub file_path: String,
    pub source_offset: f64,
    pub start_time: f64,
    pub length: f64,
    pub gain: f64,
    pub pitch: f64,
    pub pan: f64,
    pub fade_in: FadeCurve,
    pub fade_out: FadeCurve,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryCrossfade {
    pub first: u64,
    pub second: u64,
    pub shape: CrossfadeShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryItemRef {
    pub track: usize,
    pub id: u64,
}

impl MemoryTimeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`th (zero based) item creation attempts fail.
    #[must_use]
    pub fn failing_item_attempts(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.failures.item_attempts.extend(attempts);
        self
    }

    #[must_use]
    pub fn failing_tracks_for(mut self, container_id: Uuid) -> Self {
        self.failures.track_containers.insert(container_id);
        self
    }

    /// Hands out at most `limit` tracks for `container_id`.
    #[must_use]
    pub fn limited_tracks_for(mut self, container_id: Uuid, limit: usize) -> Self {
        self.failures.track_limits.insert(container_id, limit);
        self
    }

    #[must_use]
    pub fn failing_crossfades(mut self) -> Self {
        self.failures.crossfades = true;
        self
    }

    #[must_use]
    pub const fn batch_depth(&self) -> usize {
        self.batch_depth
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.tracks.iter().map(|track| track.items.len()).sum()
    }

    pub fn tracks_for(&self, container_id: Uuid) -> impl Iterator<Item = &MemoryTrack> {
        self.tracks
            .iter()
            .filter(move |track| track.container_id == container_id)
    }

    fn item_mut(&mut self, item: &MemoryItemRef) -> Result<&mut MemoryItem, HostError> {
        self.tracks
            .get_mut(item.track)
            .and_then(|track| track.items.iter_mut().find(|entry| entry.id == item.id))
            .ok_or_else(|| HostError::ItemRejected(format!("unknown item {}", item.id)))
    }
}

impl TimelineHost for MemoryTimeline {
    type Track = usize;
    type Item = MemoryItemRef;

    fn begin_batch(&mut self, label: &str) {
        self.batch_depth += 1;
        trace!(label, depth = self.batch_depth, "batch opened");
    }

    fn end_batch(&mut self, label: &str) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.completed_batches.push(label.to_string());
        trace!(label, depth = self.batch_depth, "batch closed");
    }

    fn container_tracks(
        &mut self,
        target: &TrackTarget<'_>,
    ) -> Result<Vec<Self::Track>, HostError> {
        if self.failures.track_containers.contains(&target.container_id) {
            return Err(HostError::TrackUnavailable(target.container_name.to_string()));
        }

        let channel_count = target.channel_count();
        let available = self
            .failures
            .track_limits
            .get(&target.container_id)
            .map_or(channel_count, |limit| channel_count.min(*limit));
        (0..available)
            .map(|channel_index| {
                let existing = self.tracks.iter().position(|track| {
                    track.container_id == target.container_id
                        && track.channel_index == channel_index
                });
                Ok(existing.unwrap_or_else(|| {
                    let name = if channel_count == 1 {
                        target.container_name.to_string()
                    } else {
                        format!("{} ch{}", target.container_name, channel_index + 1)
                    };
                    self.tracks.push(MemoryTrack {
                        name,
                        container_id: target.container_id,
                        channel_index,
                        items: Vec::new(),
                    });
                    self.tracks.len() - 1
                }))
            })
            .collect()
    }

    fn clear_items(&mut self, track: &Self::Track, window: TimeWindow) -> Result<(), HostError> {
        let entry = self
            .tracks
            .get_mut(*track)
            .ok_or_else(|| HostError::TrackUnavailable(format!("track #{track}")))?;
        let mut removed = BTreeSet::new();
        entry.items.retain(|item| {
            let inside = window.contains(item.start_time);
            if inside {
                removed.insert(item.id);
            }
            !inside
        });
        self.crossfades.retain(|crossfade| {
            !removed.contains(&crossfade.first) && !removed.contains(&crossfade.second)
        });
        Ok(())
    }

    fn create_item(
        &mut self,
        track: &Self::Track,
        asset: &SoundAsset,
        start_time: f64,
        length: f64,
    ) -> Result<Self::Item, HostError> {
        let attempt = self.item_attempts;
        self.item_attempts += 1;
        if self.failures.item_attempts.contains(&attempt) {
            return Err(HostError::ItemRejected(format!(
                "{} at {start_time:.3}s",
                asset.name
            )));
        }

        let id = self.next_item_id;
        let entry = self
            .tracks
            .get_mut(*track)
            .ok_or_else(|| HostError::TrackUnavailable(format!("track #{track}")))?;
        self.next_item_id += 1;
        entry.items.push(MemoryItem {
            id,
            asset_name: asset.name.clone(),
            file_path: asset.file_path.clone(),
            source_offset: asset.start_offset,
            start_time,
            length,
            gain: asset.original_volume,
            pitch: asset.original_pitch,
            pan: asset.original_pan,
            fade_in: FadeCurve::none(),
            fade_out: FadeCurve::none(),
        });
        Ok(MemoryItemRef { track: *track, id })
    }

    fn set_item_gain(&mut self, item: &Self::Item, gain: f64) -> Result<(), HostError> {
        self.item_mut(item)?.gain = gain;
        Ok(())
    }

    fn set_item_pitch(&mut self, item: &Self::Item, semitones: f64) -> Result<(), HostError> {
        self.item_mut(item)?.pitch = semitones;
        Ok(())
    }

    fn set_item_pan(&mut self, item: &Self::Item, pan: f64) -> Result<(), HostError> {
        self.item_mut(item)?.pan = pan;
        Ok(())
    }

    fn set_item_fades(
        &mut self,
        item: &Self::Item,
        fade_in: &FadeCurve,
        fade_out: &FadeCurve,
    ) -> Result<(), HostError> {
        let entry = self.item_mut(item)?;
        entry.fade_in = *fade_in;
        entry.fade_out = *fade_out;
        Ok(())
    }

    fn create_crossfade(
        &mut self,
        first: &Self::Item,
        second: &Self::Item,
        shape: CrossfadeShape,
    ) -> Result<(), HostError> {
        if self.failures.crossfades {
            return Err(HostError::Operation {
                operation: "create_crossfade",
                message: "crossfades disabled".to_string(),
            });
        }
        self.crossfades.push(MemoryCrossfade {
            first: first.id,
            second: second.id,
            shape,
        });
        Ok(())
    }
}

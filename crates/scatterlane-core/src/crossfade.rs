use serde::{Deserialize, Serialize};

use crate::{model::CrossfadeShape, scheduler::PlacementEvent};

/// Request for the host to blend two overlapping events of the same
/// channel, identified by their index in the channel's event list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CrossfadeLink {
    pub first: usize,
    pub second: usize,
    pub overlap_start: f64,
    pub overlap_length: f64,
    pub shape: CrossfadeShape,
}

/// Pairs `previous` with `next` when `next` starts before `previous` ends.
/// A true gap, including two events that merely touch, yields `None`.
#[must_use]
pub fn link(
    previous: (usize, &PlacementEvent),
    next: (usize, &PlacementEvent),
    shape: CrossfadeShape,
) -> Option<CrossfadeLink> {
    let (first, earlier) = previous;
    let (second, later) = next;
    let previous_end = earlier.end_time();
    if later.start_time >= previous_end {
        return None;
    }

    let overlap_end = previous_end.min(later.end_time());
    let overlap_length = (overlap_end - later.start_time).max(0.0);
    Some(CrossfadeLink {
        first,
        second,
        overlap_start: later.start_time,
        overlap_length,
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::SoundAsset,
        sampler::{FadeCurve, ItemAttributes},
    };

    fn event(start_time: f64, length: f64) -> PlacementEvent {
        PlacementEvent {
            asset: SoundAsset::new("wave", "wave.wav", length),
            start_time,
            length,
            channel_index: 0,
            attributes: ItemAttributes {
                pitch: 0.0,
                volume: 1.0,
                pan: 0.0,
            },
            fade_in: FadeCurve::none(),
            fade_out: FadeCurve::none(),
        }
    }

    #[test]
    fn overlapping_events_are_linked() {
        let link = link((0, &event(0.0, 4.0)), (1, &event(3.0, 2.0)), CrossfadeShape::EqualPower)
            .expect("overlap should produce a crossfade");
        assert_eq!(link.first, 0);
        assert_eq!(link.second, 1);
        assert!((link.overlap_start - 3.0).abs() < f64::EPSILON);
        assert!((link.overlap_length - 1.0).abs() < f64::EPSILON);
        assert_eq!(link.shape, CrossfadeShape::EqualPower);
    }

    #[test]
    fn contained_event_overlap_is_its_own_length() {
        let link = link((0, &event(0.0, 10.0)), (1, &event(2.0, 1.0)), CrossfadeShape::Linear)
            .expect("contained event overlaps");
        assert!((link.overlap_length - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gaps_and_touching_events_are_not_linked() {
        let touching = link(
            (0, &event(0.0, 2.0)),
            (1, &event(2.0, 1.0)),
            CrossfadeShape::Linear,
        );
        assert!(touching.is_none());
        let apart = link(
            (0, &event(0.0, 2.0)),
            (1, &event(3.5, 1.0)),
            CrossfadeShape::Linear,
        );
        assert!(apart.is_none());
    }
}

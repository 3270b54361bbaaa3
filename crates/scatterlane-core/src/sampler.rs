use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    model::{FadeShape, FadeUnit, RandomAxis, RandomRange, RandomizationSettings, SoundAsset},
    resolve::ResolvedFade,
};

/// Per-instance values handed to the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ItemAttributes {
    /// Semitones.
    pub pitch: f64,
    /// Linear gain.
    pub volume: f64,
    /// `[-1, 1]`.
    pub pan: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FadeCurve {
    pub length: f64,
    pub shape: FadeShape,
    pub curve: f64,
}

impl FadeCurve {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            length: 0.0,
            shape: FadeShape::Linear,
            curve: 0.0,
        }
    }
}

#[must_use]
pub fn db_to_gain(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Uniform draw in `[low, high)`; a degenerate range yields `low`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    low + rng.random::<f64>() * (high - low)
}

fn draw_offset<R: Rng + ?Sized>(axis: &RandomAxis, rng: &mut R) -> Option<f64> {
    if !axis.enabled {
        return None;
    }
    let RandomRange { min, max } = axis.effective_range();
    Some(uniform(rng, min, max))
}

/// Draws pitch, volume and pan for one instance of `asset`. Disabled axes
/// pass the asset's own values through untouched.
pub fn sample_attributes<R: Rng + ?Sized>(
    settings: &RandomizationSettings,
    asset: &SoundAsset,
    rng: &mut R,
) -> ItemAttributes {
    let pitch = draw_offset(&settings.pitch, rng)
        .map_or(asset.original_pitch, |offset| asset.original_pitch + offset);
    let volume = draw_offset(&settings.volume, rng).map_or(asset.original_volume, |offset_db| {
        asset.original_volume * db_to_gain(offset_db)
    });
    let pan = draw_offset(&settings.pan, rng).map_or(asset.original_pan, |offset_percent| {
        (asset.original_pan + offset_percent / 100.0).clamp(-1.0, 1.0)
    });

    ItemAttributes { pitch, volume, pan }
}

/// Converts a resolved fade to seconds for an item of `item_length`.
#[must_use]
pub fn fade_curve(fade: &ResolvedFade, item_length: f64) -> FadeCurve {
    if !fade.enabled || item_length <= 0.0 {
        return FadeCurve::none();
    }
    let length = match fade.unit {
        FadeUnit::Seconds => fade.duration,
        FadeUnit::Percent => item_length * fade.duration / 100.0,
    };
    FadeCurve {
        length: length.clamp(0.0, item_length),
        shape: fade.shape,
        curve: fade.curve,
    }
}

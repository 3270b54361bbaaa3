//! Merging of group and container settings into the values a single
//! generation pass works with.
//!
//! The result owns everything it holds: callers may mutate an
//! [`EffectiveParameters`] freely without touching the session tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    ChannelMode, ChunkSettings, Container, EuclideanSettings, FadeShape, FadeSpec, FadeUnit,
    Group, NoiseSettings, RandomizationSettings, SoundAsset, TriggerSettings,
};

/// Where a container's settings come from.
#[derive(Debug, Clone, Copy)]
pub enum ParameterSource<'a> {
    Own(&'a Container),
    Inherited {
        group: &'a Group,
        container: &'a Container,
    },
}

impl<'a> ParameterSource<'a> {
    #[must_use]
    pub fn of(group: &'a Group, container: &'a Container) -> Self {
        if container.override_parent {
            Self::Own(container)
        } else {
            Self::Inherited { group, container }
        }
    }

    #[must_use]
    pub fn container(&self) -> &'a Container {
        match self {
            Self::Own(container) | Self::Inherited { container, .. } => container,
        }
    }

    #[must_use]
    pub fn resolve(&self) -> EffectiveParameters {
        let mut params = match *self {
            Self::Own(container) => EffectiveParameters {
                container_id: container.id,
                container_name: container.name.clone(),
                items: container.items.clone(),
                randomization: container.settings.randomization.clone(),
                trigger: container.settings.trigger.clone(),
                chunk: container.settings.chunk,
                fades: ResolvedFades {
                    fade_in: ResolvedFade::from_spec(
                        &container.settings.fades.fade_in,
                        container.settings.fades.fade_in.enabled,
                    ),
                    fade_out: ResolvedFade::from_spec(
                        &container.settings.fades.fade_out,
                        container.settings.fades.fade_out.enabled,
                    ),
                },
                noise: container.settings.noise,
                euclidean: container.settings.euclidean,
                channel_mode: container.channel_mode,
                inherited: false,
            },
            Self::Inherited { group, container } => {
                let own = &container.settings.fades;
                let parent = &group.settings.fades;
                EffectiveParameters {
                    container_id: container.id,
                    container_name: container.name.clone(),
                    items: container.items.clone(),
                    randomization: group.settings.randomization.clone(),
                    trigger: group.settings.trigger.clone(),
                    chunk: group.settings.chunk,
                    fades: ResolvedFades {
                        fade_in: ResolvedFade::from_spec(
                            &parent.fade_in,
                            own.fade_in.enabled.or(parent.fade_in.enabled),
                        ),
                        fade_out: ResolvedFade::from_spec(
                            &parent.fade_out,
                            own.fade_out.enabled.or(parent.fade_out.enabled),
                        ),
                    },
                    noise: group.settings.noise,
                    euclidean: group.settings.euclidean,
                    channel_mode: container.channel_mode,
                    inherited: true,
                }
            }
        };

        // Channel identity replaces stereo pan on multichannel layouts.
        if params.channel_mode.is_multichannel() {
            params.randomization.pan.enabled = false;
        }
        params
    }
}

/// Resolved settings for one container during one pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveParameters {
    pub container_id: Uuid,
    pub container_name: String,
    pub items: Vec<SoundAsset>,
    pub randomization: RandomizationSettings,
    pub trigger: TriggerSettings,
    pub chunk: ChunkSettings,
    pub fades: ResolvedFades,
    pub noise: NoiseSettings,
    pub euclidean: EuclideanSettings,
    pub channel_mode: ChannelMode,
    pub inherited: bool,
}

impl EffectiveParameters {
    /// Assets that can actually be placed.
    pub fn placeable_items(&self) -> impl Iterator<Item = &SoundAsset> {
        self.items
            .iter()
            .filter(|asset| asset.length.is_finite() && asset.length > 0.0)
    }

    #[must_use]
    pub fn average_item_length(&self) -> f64 {
        let (count, total) = self
            .placeable_items()
            .fold((0_usize, 0.0_f64), |(count, total), asset| {
                (count + 1, total + asset.length)
            });
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ResolvedFades {
    pub fade_in: ResolvedFade,
    pub fade_out: ResolvedFade,
}

/// A fade whose enabled flag has been settled to a plain bool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResolvedFade {
    pub enabled: bool,
    pub duration: f64,
    pub unit: FadeUnit,
    pub shape: FadeShape,
    pub curve: f64,
}

impl Default for ResolvedFade {
    fn default() -> Self {
        Self::from_spec(&FadeSpec::default(), None)
    }
}

impl ResolvedFade {
    fn from_spec(spec: &FadeSpec, enabled: Option<bool>) -> Self {
        Self {
            enabled: enabled.unwrap_or(false),
            duration: spec.duration,
            unit: spec.unit,
            shape: spec.shape,
            curve: spec.curve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IntervalMode, RandomAxis, RandomRange};

    fn group_with_container(override_parent: bool) -> Group {
        let mut group = Group::new("Forest");
        group.settings.trigger.rate = 4.0;
        group.settings.trigger.mode = IntervalMode::Coverage;
        group.settings.randomization.pitch = RandomAxis::enabled(RandomRange::new(-1.0, 1.0));
        group.settings.fades.fade_in.enabled = Some(true);
        group.settings.fades.fade_in.duration = 0.5;

        let mut container = Container::new("Birds")
            .with_items(vec![SoundAsset::new("chirp", "chirp.wav", 1.5)]);
        container.override_parent = override_parent;
        container.settings.trigger.rate = 12.0;
        container.settings.trigger.mode = IntervalMode::Relative;
        container.settings.randomization.pitch = RandomAxis::disabled();
        group.containers.push(container);
        group
    }

    #[test]
    fn inherited_container_takes_group_settings() {
        let group = group_with_container(false);
        let params = ParameterSource::of(&group, &group.containers[0]).resolve();

        assert!(params.inherited);
        assert_eq!(params.trigger.mode, IntervalMode::Coverage);
        assert!((params.trigger.rate - 4.0).abs() < f64::EPSILON);
        assert!(params.randomization.pitch.enabled);
        assert!(params.fades.fade_in.enabled);
        assert!((params.fades.fade_in.duration - 0.5).abs() < f64::EPSILON);
        assert_eq!(params.items.len(), 1);
        assert_eq!(params.container_name, "Birds");
    }

    #[test]
    fn overriding_container_reads_nothing_from_group() {
        let group = group_with_container(true);
        let params = ParameterSource::of(&group, &group.containers[0]).resolve();

        assert!(!params.inherited);
        assert_eq!(params.trigger.mode, IntervalMode::Relative);
        assert!((params.trigger.rate - 12.0).abs() < f64::EPSILON);
        assert!(!params.randomization.pitch.enabled);
        assert!(!params.fades.fade_in.enabled);
    }

    #[test]
    fn explicit_container_fade_flag_wins_over_group() {
        let mut group = group_with_container(false);
        group.containers[0].settings.fades.fade_in.enabled = Some(false);
        let params = ParameterSource::of(&group, &group.containers[0]).resolve();
        assert!(!params.fades.fade_in.enabled);
    }

    #[test]
    fn unset_fade_flags_default_to_disabled() {
        let group = group_with_container(false);
        let params = ParameterSource::of(&group, &group.containers[0]).resolve();
        assert!(!params.fades.fade_out.enabled);
    }

    #[test]
    fn multichannel_forces_pan_randomization_off() {
        let mut group = group_with_container(true);
        group.containers[0].settings.randomization.pan =
            RandomAxis::enabled(RandomRange::new(-50.0, 50.0));
        group.containers[0].channel_mode = crate::model::ChannelMode::Quad;
        let params = ParameterSource::of(&group, &group.containers[0]).resolve();
        assert!(!params.randomization.pan.enabled);
        assert!(group.containers[0].settings.randomization.pan.enabled);
    }

    #[test]
    fn resolved_parameters_do_not_alias_storage() {
        let group = group_with_container(false);
        let mut params = ParameterSource::of(&group, &group.containers[0]).resolve();
        params.items[0].length = 99.0;
        params.randomization.pitch.range.max = 24.0;
        assert!((group.containers[0].items[0].length - 1.5).abs() < f64::EPSILON);
        assert!((group.settings.randomization.pitch.range.max - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_length_ignores_unplaceable_items() {
        let mut group = group_with_container(false);
        group.containers[0]
            .items
            .push(SoundAsset::new("empty", "empty.wav", 0.0));
        group.containers[0]
            .items
            .push(SoundAsset::new("long", "long.wav", 2.5));
        let params = ParameterSource::of(&group, &group.containers[0]).resolve();
        assert!((params.average_item_length() - 2.0).abs() < 1e-9);
    }
}

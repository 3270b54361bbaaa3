use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TRIGGER_RATE_SECONDS: f64 = 10.0;
pub const DEFAULT_TRIGGER_DRIFT_PERCENT: f64 = 30.0;
pub const DEFAULT_CHUNK_ACTIVE_SECONDS: f64 = 10.0;
pub const DEFAULT_CHUNK_SILENCE_SECONDS: f64 = 5.0;
pub const DEFAULT_PITCH_RANGE: RandomRange = RandomRange::new(-3.0, 3.0);
pub const DEFAULT_VOLUME_RANGE: RandomRange = RandomRange::new(-3.0, 3.0);
pub const DEFAULT_PAN_RANGE: RandomRange = RandomRange::new(-100.0, 100.0);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub groups: Vec<Group>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            groups: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn group(&self, group_id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub fn group_mut(&mut self, group_id: Uuid) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.id == group_id)
    }

    #[must_use]
    pub fn container_count(&self) -> usize {
        self.groups.iter().map(|group| group.containers.len()).sum()
    }

    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| group.containers.iter())
            .map(|container| container.items.len())
            .sum()
    }
}

/// A parent of containers. Its settings act as the defaults every
/// non-overriding container inherits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub settings: GenerationSettings,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            settings: GenerationSettings::default(),
            containers: Vec::new(),
        }
    }

    #[must_use]
    pub fn container(&self, container_id: Uuid) -> Option<&Container> {
        self.containers
            .iter()
            .find(|container| container.id == container_id)
    }

    pub fn container_mut(&mut self, container_id: Uuid) -> Option<&mut Container> {
        self.containers
            .iter_mut()
            .find(|container| container.id == container_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Container {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub items: Vec<SoundAsset>,
    #[serde(default)]
    pub settings: GenerationSettings,
    /// When set, nothing is read from the owning group.
    #[serde(default)]
    pub override_parent: bool,
    #[serde(default)]
    pub channel_mode: ChannelMode,
}

impl Container {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            items: Vec::new(),
            settings: GenerationSettings::default(),
            override_parent: false,
            channel_mode: ChannelMode::default(),
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: Vec<SoundAsset>) -> Self {
        self.items = items;
        self
    }
}

/// Reference to a slice of a source file. Lengths and offsets are seconds,
/// `original_volume` is a linear gain and `original_pan` lies in `[-1, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoundAsset {
    pub name: String,
    pub file_path: String,
    pub start_offset: f64,
    pub length: f64,
    pub original_pitch: f64,
    pub original_volume: f64,
    pub original_pan: f64,
    pub channel_count: u16,
}

impl Default for SoundAsset {
    fn default() -> Self {
        Self {
            name: String::new(),
            file_path: String::new(),
            start_offset: 0.0,
            length: 0.0,
            original_pitch: 0.0,
            original_volume: 1.0,
            original_pan: 0.0,
            channel_count: 2,
        }
    }
}

impl SoundAsset {
    #[must_use]
    pub fn new(name: impl Into<String>, file_path: impl Into<String>, length: f64) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            length,
            ..Self::default()
        }
    }
}

/// Every setting a group hands down to its containers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
    pub randomization: RandomizationSettings,
    pub trigger: TriggerSettings,
    pub chunk: ChunkSettings,
    pub fades: FadeSettings,
    pub noise: NoiseSettings,
    pub euclidean: EuclideanSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RandomizationSettings {
    /// Semitones.
    pub pitch: RandomAxis,
    /// Decibels.
    pub volume: RandomAxis,
    /// Percent, `-100` is hard left.
    pub pan: RandomAxis,
}

impl Default for RandomizationSettings {
    fn default() -> Self {
        Self {
            pitch: RandomAxis::enabled(DEFAULT_PITCH_RANGE),
            volume: RandomAxis::enabled(DEFAULT_VOLUME_RANGE),
            pan: RandomAxis::enabled(DEFAULT_PAN_RANGE),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RandomAxis {
    pub enabled: bool,
    pub range: RandomRange,
    pub link: RangeLink,
}

impl Default for RandomAxis {
    fn default() -> Self {
        Self {
            enabled: false,
            range: RandomRange::new(0.0, 0.0),
            link: RangeLink::default(),
        }
    }
}

impl RandomAxis {
    #[must_use]
    pub const fn enabled(range: RandomRange) -> Self {
        Self {
            enabled: true,
            range,
            link: RangeLink::Unlinked,
        }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            range: RandomRange::new(0.0, 0.0),
            link: RangeLink::Unlinked,
        }
    }

    /// The range actually sampled once the link mode has been applied.
    #[must_use]
    pub fn effective_range(&self) -> RandomRange {
        let ordered = self.range.ordered();
        match self.link {
            RangeLink::Unlinked | RangeLink::Linked => ordered,
            RangeLink::Mirrored => {
                let magnitude = ordered.min.abs().max(ordered.max.abs());
                RandomRange::new(-magnitude, magnitude)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RangeLink {
    #[default]
    Unlinked,
    /// Bounds are edited together. Sampling treats it like `Unlinked`.
    Linked,
    /// Samples from `[-m, m]` where `m` is the larger bound magnitude.
    Mirrored,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RandomRange {
    pub min: f64,
    pub max: f64,
}

impl RandomRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn ordered(self) -> Self {
        if self.min <= self.max {
            self
        } else {
            Self::new(self.max, self.min)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriggerSettings {
    /// Seconds in `Absolute` mode, percent otherwise. Negative values overlap.
    pub rate: f64,
    /// Percent of `|interval|`.
    pub drift: f64,
    pub mode: IntervalMode,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            rate: DEFAULT_TRIGGER_RATE_SECONDS,
            drift: DEFAULT_TRIGGER_DRIFT_PERCENT,
            mode: IntervalMode::Absolute,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMode {
    #[default]
    Absolute,
    Relative,
    Coverage,
    Chunk,
    Noise,
    Euclidean,
}

impl std::fmt::Display for IntervalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Absolute => "absolute",
            Self::Relative => "relative",
            Self::Coverage => "coverage",
            Self::Chunk => "chunk",
            Self::Noise => "noise",
            Self::Euclidean => "euclidean",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkSettings {
    pub active_duration: f64,
    /// Percent jitter applied to each active span.
    pub active_variation: f64,
    pub silence_duration: f64,
    /// Percent jitter applied to each silent span.
    pub silence_variation: f64,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            active_duration: DEFAULT_CHUNK_ACTIVE_SECONDS,
            active_variation: 0.0,
            silence_duration: DEFAULT_CHUNK_SILENCE_SECONDS,
            silence_variation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FadeSettings {
    pub fade_in: FadeSpec,
    pub fade_out: FadeSpec,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FadeSpec {
    /// `None` means "not set here"; see the resolver for how it falls back.
    pub enabled: Option<bool>,
    pub duration: f64,
    pub unit: FadeUnit,
    pub shape: FadeShape,
    /// Host-specific curvature in `[-1, 1]`.
    pub curve: f64,
}

impl Default for FadeSpec {
    fn default() -> Self {
        Self {
            enabled: None,
            duration: 0.1,
            unit: FadeUnit::Seconds,
            shape: FadeShape::Linear,
            curve: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FadeUnit {
    #[default]
    Seconds,
    Percent,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FadeShape {
    #[default]
    Linear,
    FastStart,
    FastEnd,
    FastStartSteep,
    FastEndSteep,
    SlowStartEnd,
    SlowStartEndSteep,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrossfadeShape {
    #[default]
    Linear,
    EqualPower,
    SCurve,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: u64,
    pub octaves: u8,
    pub frequency: f64,
    pub amplitude: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 2,
            frequency: 1.0,
            amplitude: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EuclideanSettings {
    pub pulses: u32,
    pub steps: u32,
    pub rotation: u32,
}

impl Default for EuclideanSettings {
    fn default() -> Self {
        Self {
            pulses: 3,
            steps: 8,
            rotation: 0,
        }
    }
}

/// Output layout of a container. Anything but `Stereo` is scheduled once
/// per output channel, each channel on its own track.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    #[default]
    Stereo,
    Quad,
    Surround50,
    Surround70,
}

impl ChannelMode {
    #[must_use]
    pub const fn is_multichannel(self) -> bool {
        !matches!(self, Self::Stereo)
    }

    /// Number of independently scheduled sequences.
    #[must_use]
    pub const fn channel_count(self) -> usize {
        match self {
            Self::Stereo => 1,
            Self::Quad => 4,
            Self::Surround50 => 5,
            Self::Surround70 => 7,
        }
    }
}

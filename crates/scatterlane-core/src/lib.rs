pub mod assets;
pub mod config;
pub mod crossfade;
pub mod diagnostics;
pub mod engine;
pub mod fanout;
pub mod fixtures;
pub mod generation;
pub mod host;
pub mod interval;
pub mod model;
pub mod persistence;
pub mod report;
pub mod resolve;
pub mod sampler;
pub mod scheduler;
pub mod time;
pub mod timeline;

pub use assets::{
    SoundFileEntry, SoundProbe, load_asset_pool, probe_sound_asset, probe_sound_asset_with_cache,
    probe_sound_file, scan_sound_files,
};
pub use config::ScatterConfig;
pub use crossfade::CrossfadeLink;
pub use diagnostics::{TelemetryGuard, init_tracing, init_tracing_with_config};
pub use engine::{AddContainerRequest, ContainerPatch, Engine, EngineError};
pub use fanout::{ContainerPlan, plan_container};
pub use generation::{
    GenerationContext, GenerationError, GenerationOptions, GenerationScope, GenerationSummary,
    plan_scope,
};
pub use host::{ApplyStats, HostBatch, HostError, TimelineHost, TrackTarget};
pub use interval::{IntervalPlan, plan_interval};
pub use model::{
    ChannelMode, ChunkSettings, Container, CrossfadeShape, EuclideanSettings, FadeSettings,
    FadeShape, FadeSpec, FadeUnit, GenerationSettings, Group, IntervalMode, NoiseSettings,
    RandomAxis, RandomRange, RandomizationSettings, RangeLink, Session, SoundAsset,
    TriggerSettings,
};
pub use report::{PlanReport, plan_report};
pub use resolve::{EffectiveParameters, ParameterSource};
pub use sampler::{FadeCurve, ItemAttributes};
pub use scheduler::{ChannelPlan, PlacementEvent, ScheduleOptions, SkipStats};
pub use time::{TimeWindow, TimeWindowError};
pub use timeline::MemoryTimeline;

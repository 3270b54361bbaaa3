use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{
    ChannelMode, Container, FadeUnit, Group, IntervalMode, RandomAxis, RandomRange, Session,
    SoundAsset,
};

fn fixed_id(value: &str) -> Uuid {
    Uuid::parse_str(value).expect("fixture id should be valid")
}

fn asset(name: &str, length: f64) -> SoundAsset {
    SoundAsset::new(name, format!("library/{name}.wav"), length)
}

/// A forest ambience exercising each supported interval mode, both
/// inheritance paths and a quad container.
#[must_use]
pub fn demo_session() -> Session {
    let mut session = Session::new("Scatterlane Demo");
    session.id = fixed_id("5b8d3c1e-7a2f-4e61-9d0b-3c4e5f607182");
    let fixed_timestamp = DateTime::parse_from_rfc3339("2026-02-23T00:00:00Z")
        .expect("fixture timestamp should be valid")
        .with_timezone(&Utc);
    session.created_at = fixed_timestamp;
    session.updated_at = fixed_timestamp;

    let mut forest = Group::new("Forest");
    forest.id = fixed_id("0f6c2b8a-1d3e-4f50-8a7b-9c0d1e2f3a4b");
    forest.settings.trigger.rate = 4.0;
    forest.settings.trigger.drift = 25.0;
    forest.settings.trigger.mode = IntervalMode::Absolute;
    forest.settings.randomization.pitch = RandomAxis::enabled(RandomRange::new(-2.0, 2.0));
    forest.settings.randomization.volume = RandomAxis::enabled(RandomRange::new(-6.0, 0.0));
    forest.settings.fades.fade_in.enabled = Some(true);
    forest.settings.fades.fade_in.duration = 0.25;
    forest.settings.fades.fade_out.enabled = Some(true);
    forest.settings.fades.fade_out.unit = FadeUnit::Percent;
    forest.settings.fades.fade_out.duration = 20.0;

    let mut birds = Container::new("Birds").with_items(vec![
        asset("robin-call", 1.8),
        asset("wren-trill", 2.6),
        asset("thrush-song", 4.1),
    ]);
    birds.id = fixed_id("8e1f2a3b-4c5d-4e6f-8a9b-0c1d2e3f4a5b");

    let mut wind = Container::new("Wind Bed").with_items(vec![
        asset("wind-low", 12.0),
        asset("wind-gusty", 9.5),
    ]);
    wind.id = fixed_id("1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d");
    wind.override_parent = true;
    wind.settings.trigger.mode = IntervalMode::Absolute;
    wind.settings.trigger.rate = -2.0;
    wind.settings.trigger.drift = 10.0;

    let mut insects = Container::new("Insects").with_items(vec![
        asset("cricket-pulse", 0.9),
        asset("cicada-buzz", 3.2),
    ]);
    insects.id = fixed_id("2b3c4d5e-6f7a-4b8c-9d0e-1f2a3b4c5d6e");
    insects.override_parent = true;
    insects.settings.trigger.mode = IntervalMode::Chunk;
    insects.settings.trigger.rate = 0.5;
    insects.settings.chunk.active_duration = 8.0;
    insects.settings.chunk.active_variation = 20.0;
    insects.settings.chunk.silence_duration = 6.0;
    insects.settings.chunk.silence_variation = 30.0;

    forest.containers.extend([birds, wind, insects]);

    let mut weather = Group::new("Weather");
    weather.id = fixed_id("3c4d5e6f-7a8b-4c9d-8e0f-2a3b4c5d6e7f");
    weather.settings.trigger.mode = IntervalMode::Coverage;
    weather.settings.trigger.rate = 80.0;

    let mut rain = Container::new("Rain Surround").with_items(vec![
        asset("rain-leaves", 6.0),
        asset("rain-roof", 7.5),
        asset("rain-drips", 2.0),
    ]);
    rain.id = fixed_id("4d5e6f7a-8b9c-4d0e-9f1a-3b4c5d6e7f80");
    rain.channel_mode = ChannelMode::Quad;
    weather.containers.push(rain);

    session.groups.extend([forest, weather]);
    session
}

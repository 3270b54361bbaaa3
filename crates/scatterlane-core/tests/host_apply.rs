use scatterlane_core::{
    Engine, GenerationError, GenerationOptions, GenerationScope, MemoryTimeline, TimeWindow,
    fixtures::demo_session,
};
use uuid::Uuid;

fn engine(seed: u64) -> Engine {
    Engine::new(demo_session()).with_options(GenerationOptions {
        seed: Some(seed),
        ..GenerationOptions::default()
    })
}

fn window() -> TimeWindow {
    TimeWindow::new(0.0, 120.0).expect("window should be valid")
}

#[test]
fn rejected_items_do_not_stop_the_pass() {
    let engine = engine(51);
    let mut timeline = MemoryTimeline::new().failing_item_attempts([0, 3]);
    let summary = engine
        .generate_session(&mut timeline, window())
        .expect("generation should succeed");

    assert_eq!(summary.containers_generated, 4);
    assert_eq!(summary.containers_failed, 0);
    assert_eq!(summary.apply.failures, 2);
    assert_eq!(summary.apply.items_created, summary.events_placed - 2);
    assert_eq!(timeline.item_count(), summary.apply.items_created);
}

#[test]
fn unavailable_tracks_skip_only_that_container() {
    let session = demo_session();
    let birds = session.groups[0].containers[0].id;
    let engine = engine(52);
    let mut timeline = MemoryTimeline::new().failing_tracks_for(birds);
    let summary = engine
        .generate_session(&mut timeline, window())
        .expect("generation should succeed");

    assert_eq!(summary.containers_failed, 1);
    assert_eq!(summary.containers_generated, 3);
    assert_eq!(timeline.tracks_for(birds).count(), 0);
    assert!(timeline.item_count() > 0);
}

#[test]
fn channels_without_a_track_are_not_counted_as_placed() {
    let session = demo_session();
    let weather = session.groups[1].id;
    let rain = session.groups[1].containers[0].id;
    let engine = engine(58);

    let full_plan = engine
        .plan(
            window(),
            GenerationScope::Container {
                group_id: weather,
                container_id: rain,
            },
        )
        .expect("plan should succeed");
    let first_two: usize = full_plan[0].channels[..2]
        .iter()
        .map(|channel| channel.events.len())
        .sum();

    let mut timeline = MemoryTimeline::new().limited_tracks_for(rain, 2);
    let summary = engine
        .generate_container(&mut timeline, window(), weather, rain)
        .expect("generation should succeed");

    assert_eq!(timeline.tracks_for(rain).count(), 2);
    assert_eq!(summary.events_placed, first_two);
    assert!(summary.events_placed < full_plan[0].event_count());
    assert_eq!(timeline.item_count(), summary.events_placed);
}

#[test]
fn unavailable_tracks_leave_no_placed_events() {
    let session = demo_session();
    let forest = session.groups[0].id;
    let birds = session.groups[0].containers[0].id;
    let engine = engine(59);

    let mut timeline = MemoryTimeline::new().failing_tracks_for(birds);
    let summary = engine
        .generate_container(&mut timeline, window(), forest, birds)
        .expect("generation should succeed");

    assert_eq!(summary.containers_failed, 1);
    assert_eq!(summary.events_placed, 0);
}

#[test]
fn failed_crossfades_are_counted_and_items_kept() {
    let session = demo_session();
    let forest = session.groups[0].id;
    let wind = session.groups[0].containers[1].id;
    let engine = engine(53);

    let mut timeline = MemoryTimeline::new().failing_crossfades();
    let summary = engine
        .generate_container(&mut timeline, window(), forest, wind)
        .expect("generation should succeed");

    assert!(summary.events_placed > 1);
    assert_eq!(summary.apply.crossfades_created, 0);
    assert_eq!(summary.apply.failures, summary.events_placed - 1);
    assert_eq!(timeline.item_count(), summary.events_placed);
    assert!(timeline.crossfades.is_empty());
}

#[test]
fn overlapping_wind_bed_is_crossfaded() {
    let session = demo_session();
    let forest = session.groups[0].id;
    let wind = session.groups[0].containers[1].id;
    let engine = engine(54);

    let mut timeline = MemoryTimeline::new();
    let summary = engine
        .generate_container(&mut timeline, window(), forest, wind)
        .expect("generation should succeed");

    assert_eq!(summary.apply.crossfades_created, summary.events_placed - 1);
    assert_eq!(timeline.crossfades.len(), summary.apply.crossfades_created);
}

#[test]
fn batch_is_closed_when_scope_is_unknown() {
    let engine = engine(55);
    let mut timeline = MemoryTimeline::new();
    let missing = Uuid::new_v4();

    let error = engine
        .generate_group(&mut timeline, window(), missing)
        .expect_err("unknown group should fail");
    assert!(matches!(error, GenerationError::GroupNotFound(id) if id == missing));
    assert_eq!(timeline.batch_depth(), 0);
    assert_eq!(timeline.completed_batches.len(), 1);
    assert_eq!(timeline.item_count(), 0);
}

#[test]
fn unknown_container_reports_both_ids() {
    let session = demo_session();
    let forest = session.groups[0].id;
    let engine = engine(56);
    let mut timeline = MemoryTimeline::new();
    let missing = Uuid::new_v4();

    let error = engine
        .generate(
            &mut timeline,
            window(),
            GenerationScope::Container {
                group_id: forest,
                container_id: missing,
            },
        )
        .expect_err("unknown container should fail");
    assert!(matches!(
        error,
        GenerationError::ContainerNotFound { group_id, container_id }
            if group_id == forest && container_id == missing
    ));
    assert_eq!(timeline.batch_depth(), 0);
}

#[test]
fn regeneration_replaces_items_inside_the_window_only() {
    let session = demo_session();
    let forest = session.groups[0].id;
    let birds = session.groups[0].containers[0].id;
    let engine = engine(57);
    let mut timeline = MemoryTimeline::new();

    let outer = TimeWindow::new(0.0, 200.0).expect("window should be valid");
    engine
        .generate_container(&mut timeline, outer, forest, birds)
        .expect("generation should succeed");
    let late_items: Vec<f64> = timeline
        .tracks_for(birds)
        .flat_map(|track| track.items.iter())
        .filter(|item| item.start_time >= 100.0)
        .map(|item| item.start_time)
        .collect();
    assert!(!late_items.is_empty());

    let inner = TimeWindow::new(0.0, 100.0).expect("window should be valid");
    let summary = engine
        .generate_container(&mut timeline, inner, forest, birds)
        .expect("generation should succeed");

    let items: Vec<f64> = timeline
        .tracks_for(birds)
        .flat_map(|track| track.items.iter())
        .map(|item| item.start_time)
        .collect();
    let inside = items.iter().filter(|start| **start < 100.0).count();
    let outside: Vec<f64> = items.iter().copied().filter(|start| *start >= 100.0).collect();
    assert_eq!(inside, summary.apply.items_created);
    assert_eq!(outside, late_items);
    assert_eq!(timeline.completed_batches.len(), 2);
}

#[test]
fn applied_items_carry_sampled_attributes_and_fades() {
    let session = demo_session();
    let forest = session.groups[0].id;
    let birds = session.groups[0].containers[0].id;
    let engine = engine(58);

    let plans = engine
        .plan(
            window(),
            GenerationScope::Container {
                group_id: forest,
                container_id: birds,
            },
        )
        .expect("plan should succeed");
    let mut timeline = MemoryTimeline::new();
    engine
        .generate_container(&mut timeline, window(), forest, birds)
        .expect("generation should succeed");

    let items: Vec<_> = timeline
        .tracks_for(birds)
        .flat_map(|track| track.items.iter())
        .collect();
    let events = &plans[0].channels[0].events;
    assert_eq!(items.len(), events.len());
    for (item, event) in items.iter().zip(events) {
        assert!((item.start_time - event.start_time).abs() < f64::EPSILON);
        assert!((item.gain - event.attributes.volume).abs() < f64::EPSILON);
        assert!((item.pitch - event.attributes.pitch).abs() < f64::EPSILON);
        assert_eq!(item.fade_in, event.fade_in);
        assert_eq!(item.fade_out, event.fade_out);
        assert!(item.fade_in.length > 0.0);
    }
}

#[test]
fn unsupported_interval_mode_skips_only_that_container() {
    let mut session = demo_session();
    session.groups[1].settings.trigger.mode = scatterlane_core::IntervalMode::Euclidean;
    let rain = session.groups[1].containers[0].id;
    let engine = Engine::new(session).with_options(GenerationOptions {
        seed: Some(59),
        ..GenerationOptions::default()
    });

    let mut timeline = MemoryTimeline::new();
    let summary = engine
        .generate_session(&mut timeline, window())
        .expect("generation should succeed");

    assert_eq!(summary.containers_failed, 1);
    assert_eq!(summary.containers_generated, 3);
    assert_eq!(timeline.tracks_for(rain).count(), 0);

    let plans = engine
        .plan(window(), GenerationScope::Session)
        .expect("plan should succeed");
    assert_eq!(plans.len(), 3);
}

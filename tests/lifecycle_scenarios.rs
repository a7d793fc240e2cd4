//! End-to-end lifecycle scenarios: create, edit, delete, sort, and restart
//! through a snapshot store.

use workout_map::persistence::{ROUTES_KEY, WORKOUTS_KEY};
use workout_map::{
    EditingSession, FixedPosition, GpsPoint, Layer, ManualClock, MemoryStore, RecordedView,
    SnapshotCodec, SnapshotStore, SortKey, WorkoutEngine, WorkoutError, WorkoutInput, WorkoutKind,
};

type Engine = WorkoutEngine<RecordedView, MemoryStore>;

const START_MS: i64 = 1_700_000_000_000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn home() -> GpsPoint {
    GpsPoint::new(46.948, 7.447)
}

fn started(store: MemoryStore, clock: &ManualClock) -> Engine {
    init_logging();
    let mut engine = WorkoutEngine::new(
        RecordedView::default(),
        store,
        Box::new(FixedPosition::at(home())),
    )
    .with_clock(clock.clone());
    engine.restore().unwrap();
    engine.start().unwrap();
    engine
}

fn saved_workouts(store: &MemoryStore) -> Vec<serde_json::Value> {
    match store.get(WORKOUTS_KEY).unwrap() {
        Some(json) => serde_json::from_str(&json).unwrap(),
        None => Vec::new(),
    }
}

#[test]
fn running_and_cycling_metrics() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);

    let run = engine
        .create(GpsPoint::new(46.95, 7.44), &WorkoutInput::running(5.0, 30.0, 178.0))
        .unwrap();
    clock.advance_millis(1);
    let ride = engine
        .create(GpsPoint::new(46.96, 7.45), &WorkoutInput::cycling(27.0, 95.0, 523.0))
        .unwrap();

    assert_eq!(engine.workout(&run).unwrap().metric(), 6.0);
    let speed = engine.workout(&ride).unwrap().metric();
    assert!((speed - 27.0 / (95.0 / 60.0)).abs() < 1e-9);
    assert_eq!(engine.workout(&ride).unwrap().summary().metric, "17.1");
    assert_eq!(saved_workouts(engine.store()).len(), 2);
}

#[test]
fn rejected_inputs_change_nothing() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);
    let spot = GpsPoint::new(46.95, 7.44);

    let bad = [
        WorkoutInput::running(0.0, 30.0, 178.0),
        WorkoutInput::running(5.0, -30.0, 178.0),
        WorkoutInput::running(5.0, 30.0, f64::NAN),
        WorkoutInput::cycling(10.0, 30.0, 0.0),
        WorkoutInput::from_form(WorkoutKind::Running, "abc", "30", "170"),
    ];
    for input in &bad {
        let err = engine.create(spot, input).unwrap_err();
        assert!(matches!(err, WorkoutError::Validation { .. }), "{:?}", input);
    }

    assert_eq!(engine.workout_count(), 0);
    assert_eq!(engine.annotations().marker_count(), 0);
    assert!(engine.store().get(WORKOUTS_KEY).unwrap().is_none());
}

#[test]
fn negative_elevation_gain_is_accepted() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);
    let id = engine
        .create(GpsPoint::new(46.95, 7.44), &WorkoutInput::cycling(12.0, 40.0, -80.0))
        .unwrap();
    assert_eq!(engine.workout(&id).unwrap().details().attribute(), -80.0);
}

#[test]
fn delete_reduces_counts_by_one() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);

    let mut ids = Vec::new();
    for i in 0..4 {
        clock.advance_millis(5);
        let id = engine
            .create(
                GpsPoint::new(46.9 + i as f64 * 0.01, 7.4),
                &WorkoutInput::running(5.0 + i as f64, 30.0, 170.0),
            )
            .unwrap();
        ids.push(id);
    }

    engine.delete(&ids[1]).unwrap();
    assert_eq!(engine.workout_count(), 3);
    assert_eq!(engine.annotations().marker_count(), 3);
    assert_eq!(engine.view().markers.len(), 3);
    assert_eq!(saved_workouts(engine.store()).len(), 3);
    assert!(engine.workout(&ids[1]).is_none());

    // Unknown id leaves everything alone
    let before = saved_workouts(engine.store());
    assert!(matches!(
        engine.delete("0000000001"),
        Err(WorkoutError::NotFound { .. })
    ));
    assert_eq!(engine.workout_count(), 3);
    assert_eq!(saved_workouts(engine.store()), before);
}

#[test]
fn drawn_route_places_workout_and_goes_with_it() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);

    let summary = engine
        .add_route(vec![
            GpsPoint::new(46.94, 7.44),
            GpsPoint::new(46.95, 7.44),
            GpsPoint::new(46.95, 7.46),
        ])
        .unwrap();
    assert_eq!(engine.view().routes.len(), 1);

    let id = engine
        .create(
            GpsPoint::new(0.0, 0.0),
            &WorkoutInput::running(summary.suggested_distance_km, 20.0, 172.0),
        )
        .unwrap();
    let workout = engine.workout(&id).unwrap();
    assert_eq!(workout.coords(), summary.center);
    assert_eq!(engine.annotations().layer(Layer::Routed).count(), 1);

    // The following click-placed workout is back in the free layer
    clock.advance_millis(1);
    engine
        .create(GpsPoint::new(46.9, 7.4), &WorkoutInput::running(3.0, 18.0, 165.0))
        .unwrap();
    assert_eq!(engine.annotations().layer(Layer::Free).count(), 1);

    engine.delete(&id).unwrap();
    assert_eq!(engine.annotations().route_count(), 0);
    assert!(engine.view().routes.is_empty());
    let routes_json = engine.store().get(ROUTES_KEY).unwrap().unwrap();
    assert_eq!(routes_json, "[]");
}

#[test]
fn restart_restores_workouts_and_routes() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);

    let route = engine
        .add_route(vec![GpsPoint::new(46.94, 7.44), GpsPoint::new(46.95, 7.45)])
        .unwrap();
    let routed = engine
        .create(GpsPoint::new(0.0, 0.0), &WorkoutInput::cycling(1.4, 4.0, 12.0))
        .unwrap();
    clock.advance_millis(50);
    let free = engine
        .create(GpsPoint::new(46.91, 7.41), &WorkoutInput::running(5.0, 27.5, 176.0))
        .unwrap();
    let original: Vec<_> = engine.workouts().to_vec();

    let store = engine.into_store();
    let mut restored = started(store, &clock);

    assert_eq!(restored.workout_count(), 2);
    for (before, after) in original.iter().zip(restored.workouts()) {
        assert_eq!(before.id(), after.id());
        assert_eq!(before.kind(), after.kind());
        assert_eq!(before.coords(), after.coords());
        assert_eq!(before.distance(), after.distance());
        assert_eq!(before.duration(), after.duration());
        assert_eq!(before.details(), after.details());
        assert_eq!(before.metric(), after.metric());
        assert_eq!(before.description(), after.description());
    }

    // Restored markers and routes reach the map once it is ready
    assert_eq!(restored.view().map, Some((home(), 17)));
    assert_eq!(restored.view().markers.len(), 2);
    assert_eq!(restored.view().routes.len(), 1);
    assert_eq!(restored.view().entry_ids(), vec![routed.as_str(), free.as_str()]);
    assert!(restored.annotations().pending_center().is_none());

    // The restored route still follows its workout
    assert_eq!(restored.annotations().routes()[0].center, route.center);
    restored.delete(&routed).unwrap();
    assert_eq!(restored.annotations().route_count(), 0);
}

#[test]
fn restore_without_position_keeps_list() {
    init_logging();
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);
    engine
        .create(GpsPoint::new(46.91, 7.41), &WorkoutInput::running(5.0, 27.5, 176.0))
        .unwrap();
    let store = engine.into_store();

    let mut offline = WorkoutEngine::new(
        RecordedView::default(),
        store,
        Box::new(FixedPosition::unavailable("permission denied")),
    )
    .with_clock(clock.clone());
    assert_eq!(offline.restore().unwrap(), 1);
    assert!(matches!(
        offline.start(),
        Err(WorkoutError::PositionUnavailable { .. })
    ));

    assert_eq!(offline.view().entries.len(), 1);
    assert!(offline.view().markers.is_empty());
    assert_eq!(offline.view().notices.len(), 1);
    assert!(offline.view().notices[0].ends_with("permission denied"));
    assert!(!offline.is_map_ready());
}

#[test]
fn sort_orders_are_non_decreasing_and_saved() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);

    let inputs = [
        WorkoutInput::running(7.2, 41.0, 170.0),
        WorkoutInput::cycling(30.0, 75.0, 400.0),
        WorkoutInput::running(3.1, 19.0, 168.0),
        WorkoutInput::cycling(15.5, 41.0, 120.0),
    ];
    for (i, input) in inputs.iter().enumerate() {
        clock.advance_millis(7);
        engine
            .create(GpsPoint::new(46.9, 7.4 + i as f64 * 0.01), input)
            .unwrap();
    }

    engine.sort(SortKey::Distance).unwrap();
    let distances: Vec<f64> = engine.workouts().iter().map(|w| w.distance()).collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));

    let saved: Vec<f64> = saved_workouts(engine.store())
        .iter()
        .map(|w| w["distance"].as_f64().unwrap())
        .collect();
    assert_eq!(saved, distances);

    engine.sort(SortKey::Duration).unwrap();
    let durations: Vec<f64> = engine.workouts().iter().map(|w| w.duration()).collect();
    assert!(durations.windows(2).all(|w| w[0] <= w[1]));
    // Stable: the two 41-minute workouts keep their distance order
    assert_eq!(engine.workouts()[1].distance(), 7.2);
    assert_eq!(engine.workouts()[2].distance(), 15.5);

    engine.sort(SortKey::Date).unwrap();
    let ids: Vec<u64> = engine
        .workouts()
        .iter()
        .map(|w| w.id().parse().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn delete_all_leaves_empty_snapshot() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);
    engine
        .add_route(vec![GpsPoint::new(46.94, 7.44), GpsPoint::new(46.95, 7.45)])
        .unwrap();
    engine
        .create(GpsPoint::new(0.0, 0.0), &WorkoutInput::running(1.2, 7.0, 170.0))
        .unwrap();

    engine.delete_all().unwrap();
    assert_eq!(engine.workout_count(), 0);
    assert!(engine.view().markers.is_empty());
    assert!(engine.view().entries.is_empty());

    let snapshot = SnapshotCodec::load(engine.store()).unwrap();
    assert!(snapshot.is_empty());
}

#[test]
fn edit_flow_keeps_identity_and_position() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);
    let spot = GpsPoint::new(46.93, 7.43);
    let id = engine
        .create(spot, &WorkoutInput::cycling(20.0, 60.0, 250.0))
        .unwrap();

    engine.select(&id).unwrap();
    let prefill = engine.begin_edit(&id).unwrap();
    assert_eq!(engine.view().form, Some(prefill));

    clock.advance_millis(60_000);
    let edited = WorkoutInput {
        distance: 30.0,
        ..prefill
    };
    // Coordinates of the submit are ignored while editing
    assert_eq!(engine.create(GpsPoint::new(1.0, 1.0), &edited).unwrap(), id);

    let workout = engine.workout(&id).unwrap();
    assert_eq!(workout.coords(), spot);
    assert_eq!(workout.metric(), 30.0);
    assert_eq!(*engine.session(), EditingSession::Idle);
    assert_eq!(engine.annotations().marker_count(), 1);
    assert_eq!(saved_workouts(engine.store())[0]["speed"].as_f64(), Some(30.0));

    // Entry highlight fades after the configured delay
    assert_eq!(engine.highlighted(), Some(id.as_str()));
    clock.advance_millis(5_000);
    engine.tick();
    assert!(engine.highlighted().is_none());
    assert!(engine.view().highlighted.is_none());
}

#[test]
fn begin_edit_without_selection_is_ignored() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);
    let id = engine
        .create(GpsPoint::new(46.93, 7.43), &WorkoutInput::running(5.0, 30.0, 170.0))
        .unwrap();
    assert!(engine.begin_edit(&id).is_none());
    assert_eq!(*engine.session(), EditingSession::Idle);
    assert!(engine.view().form.is_none());
}

#[test]
fn unreadable_snapshot_starts_empty() {
    let clock = ManualClock::from_millis(START_MS);
    let store = MemoryStore::new().with_entry(ROUTES_KEY, "[[[46.9, 7.4], [46.95, 7.45]]]");
    let engine = started(store, &clock);
    assert_eq!(engine.workout_count(), 0);
    assert_eq!(engine.annotations().route_count(), 0);
}

#[test]
fn broken_route_does_not_lose_workouts() {
    let clock = ManualClock::from_millis(START_MS);
    let mut engine = started(MemoryStore::new(), &clock);
    let id = engine
        .create(GpsPoint::new(46.91, 7.41), &WorkoutInput::running(5.0, 27.5, 176.0))
        .unwrap();
    let mut store = engine.into_store();
    store.set(ROUTES_KEY, "[[[1.0,2.0],[3.0]]]").unwrap();

    let mut restored = started(store, &clock);
    assert_eq!(restored.workout_count(), 1);
    assert!(restored.workout(&id).is_some());

    // The next save keeps the workout
    restored.sort(SortKey::Date).unwrap();
    assert_eq!(saved_workouts(restored.store()).len(), 1);
}

//! Transport integration test
//!
//! Полный App (SimulationPlugin) headless, tick'и гоняются напрямую через FixedUpdate.
//!
//! Проверяем:
//! - Authoritative spawn → bogies → pose
//! - Движение locomotive вдоль heading
//! - Observer: spawn data + реплицированные bogies
//! - Saves, потерянные позиции, потерянный bogie
//! - Removal ниже пола, rider, teardown сессии

use bevy::ecs::system::RunSystemOnce;
use bevy::math::DVec3;
use bevy::prelude::*;
use trackline_simulation::transport::{
    bogie_bundle, rider_position, Rider, SessionEnded, TransportCorrupted, TransportHitbox, TransportRemoved,
};
use trackline_simulation::*;

const FIRST_TRAIN: &str = "entityfirsttrain";

fn create_transport_app(role: SimulationRole) -> App {
    let mut app = create_headless_app(42);
    app.insert_resource(role);
    app.add_plugins(SimulationPlugin);
    app
}

fn spawn_train(app: &mut App, position: DVec3, yaw: f64) -> Entity {
    app.world_mut()
        .spawn_transport(TransportSpawn::new(FIRST_TRAIN, position).with_yaw(yaw))
        .unwrap()
}

fn state(app: &App, transport: Entity) -> TransportState {
    app.world().get::<TransportState>(transport).unwrap().clone()
}

fn bogies_of(app: &mut App, transport: Entity) -> Vec<Entity> {
    let mut query = app.world_mut().query::<(Entity, &Bogie)>();
    query
        .iter(app.world())
        .filter(|(_, bogie)| bogie.transport == transport)
        .map(|(entity, _)| entity)
        .collect()
}

fn count_events<E: Event>(app: &App) -> usize {
    app.world().resource::<Events<E>>().iter_current_update_events().count()
}

#[test]
fn test_spawned_train_gets_bogies_and_pose() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut app, DVec3::new(10.0, 0.0, -4.0), 30.0);

    // Tick 1: bogies спавнятся, Tick 2: pose из них
    run_ticks(&mut app, 2);

    let state = state(&app, train);
    assert_eq!(state.followers.len(), 2);
    assert_eq!(bogies_of(&mut app, train).len(), 2);
    assert!((state.pose.position - DVec3::new(10.0, 0.0, -4.0)).length() < 1e-9);
    assert!((state.pose.yaw - 30.0).abs() < 1e-9);
    assert!(state.pose.pitch.abs() < 1e-9);

    let transform = app.world().get::<Transform>(train).unwrap();
    assert!((transform.translation - Vec3::new(10.0, 0.0, -4.0)).length() < 1e-4);
}

#[test]
fn test_idle_train_does_not_drift() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut app, DVec3::new(0.0, 0.0, 0.0), 45.0);

    run_ticks(&mut app, 2);
    let before = state(&app, train);
    run_ticks(&mut app, 100);
    let after = state(&app, train);

    assert!((after.pose.position - before.pose.position).length() < 1e-9);
    assert!((after.pose.yaw - before.pose.yaw).abs() < 1e-9);
    assert_eq!(after.followers, before.followers);
}

#[test]
fn test_throttle_moves_train_along_heading() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut app, DVec3::ZERO, 30.0);
    app.world_mut().get_mut::<MotivePower>(train).unwrap().set_throttle(1.0);

    run_ticks(&mut app, 60);

    let state = state(&app, train);
    let travelled = state.pose.position;
    assert!(travelled.x > 0.0);
    assert!(travelled.z > 0.0);
    assert!((travelled.z / travelled.x - 30f64.to_radians().tan()).abs() < 1e-6);
    assert!((state.pose.yaw - 30.0).abs() < 1e-6);

    // Bogies остаются на своих offsets
    let spacing = state.follower_positions[1] - state.follower_positions[0];
    assert!((spacing.length() - 3.6).abs() < 1e-9);
}

#[test]
fn test_hitboxes_follow_pose() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut app, DVec3::new(5.0, 0.0, 5.0), 90.0);

    run_ticks(&mut app, 3);

    let mut query = app.world_mut().query::<(&TransportHitbox, &Transform)>();
    let mut hitboxes: Vec<(usize, Vec3)> = query
        .iter(app.world())
        .filter(|(hitbox, _)| hitbox.transport == train)
        .map(|(hitbox, transform)| (hitbox.index, transform.translation))
        .collect();
    hitboxes.sort_by_key(|(index, _)| *index);

    assert_eq!(hitboxes.len(), 3);
    assert!((hitboxes[0].1 - Vec3::new(5.0, 0.0, 4.0)).length() < 1e-4);
    assert!((hitboxes[1].1 - Vec3::new(5.0, 0.0, 5.0)).length() < 1e-4);
    assert!((hitboxes[2].1 - Vec3::new(5.0, 0.0, 6.0)).length() < 1e-4);
}

#[test]
fn test_rider_sits_on_seat_and_dismounts_on_removal() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut app, DVec3::new(0.0, 0.0, 0.0), 0.0);
    let rider = app
        .world_mut()
        .spawn((Rider { vehicle: train }, Transform::default()))
        .id();

    run_ticks(&mut app, 3);

    let expected = {
        let registry = app.world().resource::<TransportRegistry>();
        let config = app.world().resource::<TransportConfig>();
        let descriptor = registry.lookup(&TransportTypeId::from(FIRST_TRAIN)).unwrap();
        rider_position(&state(&app, train), descriptor, config)
    };
    let seat = app.world().get::<Transform>(rider).unwrap().translation;
    assert!((seat - expected.as_vec3()).length() < 1e-4);
    assert!((seat - Vec3::new(-1.2, 1.5, 0.0)).length() < 1e-4);

    app.world_mut().despawn(train);
    run_ticks(&mut app, 1);

    assert!(app.world().get::<Rider>(rider).is_none());
    assert!(app.world().get_entity(rider).is_ok());
    assert!(bogies_of(&mut app, train).is_empty());
}

#[test]
fn test_train_below_floor_is_removed() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut app, DVec3::new(0.0, -100.0, 0.0), 0.0);

    run_ticks(&mut app, 1);

    assert!(app.world().get_entity(train).is_err());
    assert_eq!(count_events::<TransportRemoved>(&app), 1);

    let mut hitboxes = app.world_mut().query::<&TransportHitbox>();
    assert_eq!(hitboxes.iter(app.world()).count(), 0);
}

#[test]
fn test_lost_persisted_positions_despawn_transport() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let type_id = TransportTypeId::from(FIRST_TRAIN);
    let train = app
        .world_mut()
        .load_transport(&type_id, DVec3::ZERO, "{\"extended.islocked\": false}")
        .unwrap();

    run_ticks(&mut app, 1);

    assert!(app.world().get_entity(train).is_err());
    let events = app.world().resource::<Events<TransportCorrupted>>();
    let corrupted: Vec<_> = events.iter_current_update_events().copied().collect();
    assert_eq!(corrupted, vec![TransportCorrupted { transport: train, expected: 2 }]);
}

#[test]
fn test_save_load_restores_train() {
    let mut source_app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut source_app, DVec3::new(-3.0, 0.0, 7.0), 120.0);
    run_ticks(&mut source_app, 2);
    let json = source_app.world().save_transport(train).unwrap().to_json().unwrap();
    let original = state(&source_app, train);

    let mut app = create_transport_app(SimulationRole::Authoritative);
    let type_id = TransportTypeId::from(FIRST_TRAIN);
    let loaded = app
        .world_mut()
        .load_transport(&type_id, DVec3::new(-3.0, 0.0, 7.0), &json)
        .unwrap();
    run_ticks(&mut app, 2);

    let restored = state(&app, loaded);
    assert_eq!(restored.owner, original.owner);
    assert_eq!(restored.followers.len(), 2);
    assert!((restored.pose.position - original.pose.position).length() < 1e-9);
    assert!((restored.pose.yaw - original.pose.yaw).abs() < 1e-9);
}

#[test]
fn test_partial_save_completed_from_pose() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let type_id = TransportTypeId::from(FIRST_TRAIN);
    let json = "{\"extended.bogies\": [{\"bogie\": 0, \"x\": -1.8, \"y\": 0.0, \"z\": 0.0}]}";
    let train = app.world_mut().load_transport(&type_id, DVec3::ZERO, json).unwrap();

    run_ticks(&mut app, 2);

    let state = state(&app, train);
    assert_eq!(state.follower_positions.len(), 2);
    assert_eq!(state.followers.len(), 2);
    assert_eq!(bogies_of(&mut app, train).len(), 2);
}

#[test]
fn test_lost_bogie_rebuilds_set() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    let train = spawn_train(&mut app, DVec3::new(2.0, 0.0, 2.0), 0.0);
    run_ticks(&mut app, 2);
    let old = state(&app, train).followers;

    app.world_mut().despawn(old[0]);
    run_ticks(&mut app, 2);

    let state = state(&app, train);
    assert_eq!(state.followers.len(), 2);
    assert!(state.followers.iter().all(|follower| !old.contains(follower)));
    assert_eq!(bogies_of(&mut app, train).len(), 2);
    assert!(app.world().get_entity(old[1]).is_err());
    assert!((state.pose.position - DVec3::new(2.0, 0.0, 2.0)).length() < 1e-9);
}

#[test]
fn test_observer_mirrors_authoritative_pose() {
    let mut authority = create_transport_app(SimulationRole::Authoritative);
    let source = spawn_train(&mut authority, DVec3::new(4.0, 0.0, -2.0), 75.0);
    run_ticks(&mut authority, 2);
    let payload = authority.world().transport_spawn_data(source).unwrap().unwrap();
    let original = state(&authority, source);

    let mut observer = create_transport_app(SimulationRole::Observer);
    let type_id = TransportTypeId::from(FIRST_TRAIN);
    let mirror = observer
        .world_mut()
        .spawn_replicated_transport(&type_id, DVec3::new(4.0, 0.0, -2.0), &payload)
        .unwrap();

    // Bogies ещё не пришли: observer их не спавнит, но transport уже активен
    run_ticks(&mut observer, 3);
    assert!(bogies_of(&mut observer, mirror).is_empty());
    assert!(observer.world().resource::<ActiveTransports>().contains(mirror));

    // Репликация bogies в порядке offsets
    for position in &original.follower_positions {
        observer.world_mut().spawn(bogie_bundle(mirror, *position));
    }
    run_ticks(&mut observer, 1);

    let mirrored = state(&observer, mirror);
    assert_eq!(mirrored.followers.len(), 2);
    assert_eq!(mirrored.owner, original.owner);
    assert!((mirrored.pose.position - original.pose.position).length() < 1e-9);
    assert!((mirrored.pose.yaw - original.pose.yaw).abs() < 1e-9);
    assert_eq!(observer.world().resource::<ActiveTransports>().len(), 1);
}

#[test]
fn test_authoritative_never_registers_active() {
    let mut app = create_transport_app(SimulationRole::Authoritative);
    spawn_train(&mut app, DVec3::new(1.0, 0.0, 1.0), 0.0);

    run_ticks(&mut app, 5);

    assert!(app.world().resource::<ActiveTransports>().is_empty());
}

#[test]
fn test_session_end_clears_active_transports() {
    let mut authority = create_transport_app(SimulationRole::Authoritative);
    let source = spawn_train(&mut authority, DVec3::new(1.0, 0.0, 1.0), 0.0);
    let payload = authority.world().transport_spawn_data(source).unwrap().unwrap();

    let mut observer = create_transport_app(SimulationRole::Observer);
    let type_id = TransportTypeId::from(FIRST_TRAIN);
    observer
        .world_mut()
        .spawn_replicated_transport(&type_id, DVec3::new(1.0, 0.0, 1.0), &payload)
        .unwrap();
    run_ticks(&mut observer, 1);
    assert_eq!(observer.world().resource::<ActiveTransports>().len(), 1);

    observer
        .world_mut()
        .run_system_once(|mut events: EventWriter<SessionEnded>| {
            events.write(SessionEnded);
        })
        .unwrap();
    run_ticks(&mut observer, 1);

    assert!(observer.world().resource::<ActiveTransports>().is_empty());
}

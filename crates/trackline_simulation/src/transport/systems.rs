//! ECS системы transport
//!
//! Порядок выполнения (FixedUpdate, см. TransportPlugin):
//! 1. link_replicated_bogies: observer подключает пришедшие bogies
//! 2. handle_lost_bogies: потерян bogie → transport пересобирает набор
//! 3. step_transports: kinematic step каждого transport
//! 4. cleanup_transport_parts: bogies/hitboxes/riders удалённых transport
//! 5. sync_bogie_transforms: DVec3 → Transform
//! 6. rapier velocity, hitboxes, riders
//! 7. end_transport_session: teardown ActiveTransports

use bevy::math::DVec3;
use bevy::prelude::*;

use super::active::ActiveTransports;
use super::bogie::{bogie_bundle, bogie_translation, integrate_bogie, Bogie};
use super::motive::MotivePower;
use super::seating::{Rider, TransportHitbox};
use super::state::{TransportPose, TransportState};
use super::step::{step_transport, FollowerSample, StepOutcome, TransportError, TransportHost};
use crate::config::{SimulationRole, TransportConfig};
use crate::geometry::heading_rotation;
use crate::logger;

/// Transport удалён (выпал из мира)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRemoved {
    pub transport: Entity,
}

/// Transport удалён из-за потерянного persisted state
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCorrupted {
    pub transport: Entity,
    pub expected: usize,
}

/// Host закрыл уровень/сессию: реестр активных transport сбрасывается
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct SessionEnded;

/// Transform transport из его pose
pub fn transport_transform(pose: &TransportPose) -> Transform {
    Transform::from_translation(pose.position.as_vec3())
        .with_rotation(heading_rotation(pose.pitch, pose.yaw, 0.0).as_quat())
}

/// TransportHost поверх ECS (bogie = entity с компонентом Bogie)
struct EcsHost<'a, 'w, 's, 'qw, 'qs> {
    role: SimulationRole,
    config: TransportConfig,
    transport: Entity,
    commands: &'a mut Commands<'w, 's>,
    bogies: &'a mut Query<'qw, 'qs, &'static mut Bogie>,
    removal_requested: bool,
}

impl TransportHost for EcsHost<'_, '_, '_, '_, '_> {
    fn is_authoritative(&self) -> bool {
        self.role.is_authoritative()
    }

    fn spawn_follower(&mut self, position: DVec3) -> Entity {
        self.commands.spawn(bogie_bundle(self.transport, position)).id()
    }

    fn follower(&self, follower: Entity) -> Option<FollowerSample> {
        let bogie = self.bogies.get(follower).ok()?;
        Some(FollowerSample {
            position: bogie.position,
            min_y: bogie.min_y(),
        })
    }

    fn push_follower(&mut self, follower: Entity, impulse: DVec3) {
        if let Ok(mut bogie) = self.bogies.get_mut(follower) {
            bogie.push(impulse);
        }
    }

    fn move_follower(&mut self, follower: Entity) {
        if let Ok(mut bogie) = self.bogies.get_mut(follower) {
            integrate_bogie(&mut bogie, &self.config);
        }
    }

    fn place_follower(&mut self, follower: Entity, x: f64, z: f64) -> Option<DVec3> {
        let mut bogie = self.bogies.get_mut(follower).ok()?;
        bogie.position.x = x;
        bogie.position.z = z;
        Some(bogie.position)
    }

    fn request_removal(&mut self) {
        self.removal_requested = true;
    }
}

/// Система: kinematic step всех transport
#[allow(clippy::too_many_arguments)]
pub fn step_transports(
    mut commands: Commands,
    mut transports: Query<(Entity, &mut TransportState, Option<&mut MotivePower>, &mut Transform)>,
    mut bogies: Query<&'static mut Bogie>,
    mut active: ResMut<ActiveTransports>,
    mut removed_events: EventWriter<TransportRemoved>,
    mut corrupted_events: EventWriter<TransportCorrupted>,
    config: Res<TransportConfig>,
    role: Res<SimulationRole>,
) {
    let config = *config;
    let role = *role;

    for (entity, mut state, mut drive, mut transform) in transports.iter_mut() {
        let mut host = EcsHost {
            role,
            config,
            transport: entity,
            commands: &mut commands,
            bogies: &mut bogies,
            removal_requested: false,
        };

        let result = step_transport(
            entity,
            &mut state,
            drive.as_deref_mut(),
            &mut host,
            &mut active,
            &config,
        );
        let removal_requested = host.removal_requested;

        match result {
            Ok(_) if removal_requested => {
                logger::log_info(&format!(
                    "🕳️ Transport {:?} fell out of the world at y={:.2}",
                    entity, state.pose.position.y
                ));
                commands.entity(entity).despawn();
                removed_events.write(TransportRemoved { transport: entity });
            }
            Ok(StepOutcome::Posed(pose)) => {
                *transform = transport_transform(&pose);
            }
            Ok(_) => {}
            Err(TransportError::MissingFollowerPositions { expected }) => {
                logger::log_error(&format!(
                    "💥 Transport {:?} ({}) removed: {}",
                    entity,
                    state.type_id,
                    TransportError::MissingFollowerPositions { expected }
                ));
                commands.entity(entity).despawn();
                corrupted_events.write(TransportCorrupted {
                    transport: entity,
                    expected,
                });
            }
        }
    }
}

/// Система: observer подключает bogies, пришедшие по репликации
///
/// Порядок прихода = порядок offsets.
pub fn link_replicated_bogies(
    new_bogies: Query<(Entity, &Bogie), Added<Bogie>>,
    mut transports: Query<&mut TransportState>,
) {
    for (entity, bogie) in new_bogies.iter() {
        let Ok(mut state) = transports.get_mut(bogie.transport) else {
            logger::log_warning(&format!(
                "Bogie {:?} arrived for unknown transport {:?}",
                entity, bogie.transport
            ));
            continue;
        };

        if state.attach_follower(entity) {
            logger::log(&format!(
                "🔗 Bogie {:?} linked to {:?} ({}/{})",
                entity,
                bogie.transport,
                state.followers.len(),
                state.expected_followers()
            ));
        }
    }
}

/// Система: потерян bogie → остальные удаляются, набор собирается заново
pub fn handle_lost_bogies(
    mut commands: Commands,
    mut removed: RemovedComponents<Bogie>,
    mut transports: Query<(Entity, &mut TransportState)>,
) {
    let lost: Vec<Entity> = removed.read().collect();
    if lost.is_empty() {
        return;
    }

    for (entity, mut state) in transports.iter_mut() {
        if !state.followers.iter().any(|follower| lost.contains(follower)) {
            continue;
        }

        for follower in state.followers.iter().filter(|follower| !lost.contains(follower)) {
            if let Ok(mut sibling) = commands.get_entity(*follower) {
                sibling.despawn();
            }
        }

        logger::log_warning(&format!(
            "Transport {:?} lost a bogie, rebuilding {} bogies",
            entity,
            state.expected_followers()
        ));
        state.followers.clear();
    }
}

/// Система: убирает части удалённых transport
pub fn cleanup_transport_parts(
    mut commands: Commands,
    mut removed: RemovedComponents<TransportState>,
    bogies: Query<(Entity, &Bogie)>,
    hitboxes: Query<(Entity, &TransportHitbox)>,
    riders: Query<(Entity, &Rider)>,
    mut active: ResMut<ActiveTransports>,
) {
    let gone: Vec<Entity> = removed.read().collect();
    if gone.is_empty() {
        return;
    }

    for transport in &gone {
        active.remove(*transport);
    }

    for (entity, bogie) in bogies.iter() {
        if gone.contains(&bogie.transport) {
            commands.entity(entity).despawn();
        }
    }

    for (entity, hitbox) in hitboxes.iter() {
        if gone.contains(&hitbox.transport) {
            commands.entity(entity).despawn();
        }
    }

    // Rider остаётся в мире, просто спешивается
    for (entity, rider) in riders.iter() {
        if gone.contains(&rider.vehicle) {
            commands.entity(entity).remove::<Rider>();
        }
    }
}

/// Система: Transform bogie из его f64 позиции
pub fn sync_bogie_transforms(mut query: Query<(&Bogie, &mut Transform), Changed<Bogie>>) {
    for (bogie, mut transform) in query.iter_mut() {
        transform.translation = bogie_translation(bogie.position);
    }
}

/// Система: teardown реестра активных transport при закрытии сессии
pub fn end_transport_session(mut events: EventReader<SessionEnded>, mut active: ResMut<ActiveTransports>) {
    if events.read().last().is_some() {
        logger::log_info(&format!("Session ended, forgetting {} active transports", active.len()));
        active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportPlugin, TransportSpawn, TransportWorldExt};
    use crate::DeterministicRng;

    fn transport_app() -> App {
        let mut app = App::new();
        app.insert_resource(DeterministicRng::new(3));
        app.add_plugins(TransportPlugin);
        app
    }

    #[test]
    fn test_plugin_schedule_steps_transport() {
        let mut app = transport_app();
        let train = app
            .world_mut()
            .spawn_transport(TransportSpawn::new("entityfirsttrain", DVec3::new(6.0, 0.0, 0.0)).with_yaw(90.0))
            .unwrap();

        app.world_mut().run_schedule(FixedUpdate);
        app.world_mut().run_schedule(FixedUpdate);

        let state = app.world().get::<TransportState>(train).unwrap();
        assert_eq!(state.followers.len(), 2);
        assert!((state.pose.yaw - 90.0).abs() < 1e-9);

        let transform = app.world().get::<Transform>(train).unwrap();
        assert!((transform.translation - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-4);

        let bogie = app.world().get::<Transform>(state.followers[1]).unwrap();
        assert!((bogie.translation.z - 1.8).abs() < 1e-4);
    }
}

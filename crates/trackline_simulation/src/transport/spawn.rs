//! Spawn transport: authoritative (новый), replicated (spawn data), persisted (save)

use bevy::math::DVec3;
use bevy::prelude::*;
use thiserror::Error;

use super::motive::MotivePower;
use super::registry::{RegistryError, TransportRegistry, TransportTypeId, VehicleTypeDescriptor};
use super::seating::hitbox_bundle;
use super::state::{OwnerId, TransportState};
use super::systems::transport_transform;
use crate::geometry::wrap_degrees;
use crate::logger;
use crate::sync::{decode_spawn_data, encode_spawn_data, PersistError, TransportRecord, WireError};
use crate::DeterministicRng;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Запрос на новый transport (authoritative сторона)
#[derive(Debug, Clone)]
pub struct TransportSpawn {
    pub type_id: TransportTypeId,
    pub position: DVec3,
    /// Градусы
    pub yaw: f64,
    /// None → случайный id из DeterministicRng
    pub owner: Option<OwnerId>,
    pub colors: [u8; 3],
}

impl TransportSpawn {
    pub fn new(type_id: impl Into<TransportTypeId>, position: DVec3) -> Self {
        Self {
            type_id: type_id.into(),
            position,
            yaw: 0.0,
            owner: None,
            colors: [0, 0, 0],
        }
    }

    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = yaw;
        self
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Новый transport: позиции bogies раскладываются по offsets от pose
pub fn spawn_transport(
    commands: &mut Commands,
    registry: &TransportRegistry,
    rng: &mut DeterministicRng,
    request: TransportSpawn,
) -> Result<Entity, SpawnError> {
    let descriptor = registry.require(&request.type_id)?;

    let mut state = TransportState::new(descriptor, request.position);
    state.pose.yaw = wrap_degrees(request.yaw);
    state.colors = request.colors;
    state.set_owner(request.owner.unwrap_or_else(|| OwnerId::random(&mut rng.rng)));
    state.place_followers_at_offsets();

    Ok(spawn_with_state(commands, descriptor, state))
}

/// Observer: transport из spawn data authoritative стороны
///
/// Bogies не спавнятся: они придут по репликации (link_replicated_bogies).
pub fn spawn_replicated_transport(
    commands: &mut Commands,
    registry: &TransportRegistry,
    type_id: &TransportTypeId,
    position: DVec3,
    payload: &[u8],
) -> Result<Entity, SpawnError> {
    let descriptor = registry.require(type_id)?;

    let mut state = TransportState::new(descriptor, position);
    decode_spawn_data(&mut state, payload)?;

    Ok(spawn_with_state(commands, descriptor, state))
}

/// Transport из save; bogies респавнит первый kinematic step
pub fn spawn_persisted_transport(
    commands: &mut Commands,
    registry: &TransportRegistry,
    type_id: &TransportTypeId,
    position: DVec3,
    record: &TransportRecord,
) -> Result<Entity, SpawnError> {
    let descriptor = registry.require(type_id)?;

    let mut state = TransportState::new(descriptor, position);
    record.apply_to(&mut state);

    Ok(spawn_with_state(commands, descriptor, state))
}

fn spawn_with_state(commands: &mut Commands, descriptor: &VehicleTypeDescriptor, state: TransportState) -> Entity {
    let transform = transport_transform(&state.pose);
    let mut entity = commands.spawn((state, transform));
    if descriptor.self_driven {
        entity.insert(MotivePower::default());
    }
    let transport = entity.id();

    for index in 0..descriptor.hitbox_positions.len() {
        commands.spawn(hitbox_bundle(transport, index));
    }

    logger::log_info(&format!(
        "🚂 Spawned {} as {:?} ({} bogies, {} hitboxes)",
        descriptor.type_id,
        transport,
        descriptor.offsets.len(),
        descriptor.hitbox_positions.len()
    ));
    transport
}

/// Spawn/save операции напрямую над World (тесты, headless runner, host glue)
pub trait TransportWorldExt {
    fn spawn_transport(&mut self, request: TransportSpawn) -> Result<Entity, SpawnError>;

    fn spawn_replicated_transport(
        &mut self,
        type_id: &TransportTypeId,
        position: DVec3,
        payload: &[u8],
    ) -> Result<Entity, SpawnError>;

    fn load_transport(&mut self, type_id: &TransportTypeId, position: DVec3, json: &str) -> Result<Entity, SpawnError>;

    /// None: entity не transport
    fn save_transport(&self, transport: Entity) -> Option<TransportRecord>;

    fn transport_spawn_data(&self, transport: Entity) -> Option<Result<Vec<u8>, WireError>>;
}

impl TransportWorldExt for World {
    fn spawn_transport(&mut self, request: TransportSpawn) -> Result<Entity, SpawnError> {
        let spawned = self.resource_scope(|world, registry: Mut<TransportRegistry>| {
            world.resource_scope(|world, mut rng: Mut<DeterministicRng>| {
                let mut commands = world.commands();
                spawn_transport(&mut commands, &registry, &mut rng, request)
            })
        })?;
        self.flush();
        Ok(spawned)
    }

    fn spawn_replicated_transport(
        &mut self,
        type_id: &TransportTypeId,
        position: DVec3,
        payload: &[u8],
    ) -> Result<Entity, SpawnError> {
        let spawned = self.resource_scope(|world, registry: Mut<TransportRegistry>| {
            let mut commands = world.commands();
            spawn_replicated_transport(&mut commands, &registry, type_id, position, payload)
        })?;
        self.flush();
        Ok(spawned)
    }

    fn load_transport(&mut self, type_id: &TransportTypeId, position: DVec3, json: &str) -> Result<Entity, SpawnError> {
        let record = TransportRecord::from_json(json)?;
        let spawned = self.resource_scope(|world, registry: Mut<TransportRegistry>| {
            let mut commands = world.commands();
            spawn_persisted_transport(&mut commands, &registry, type_id, position, &record)
        })?;
        self.flush();
        Ok(spawned)
    }

    fn save_transport(&self, transport: Entity) -> Option<TransportRecord> {
        let state = self.get::<TransportState>(transport)?;
        Some(TransportRecord::from_state(state))
    }

    fn transport_spawn_data(&self, transport: Entity) -> Option<Result<Vec<u8>, WireError>> {
        let state = self.get::<TransportState>(transport)?;
        Some(encode_spawn_data(state))
    }
}

//! Rail transport module
//!
//! Transport = главная entity + N bogies (follower bodies) на фиксированных
//! offsets вдоль оси. Каждый tick поза transport выводится из крайних bogies,
//! после чего bogies возвращаются на свои offsets.
//!
//! ECS ответственность:
//! - TransportState, pose, bogies, hitboxes, rider
//! - Kinematic step (step.rs) через TransportHost
//!
//! Host ответственность (rapier / renderer / сеть):
//! - Коллизии bogies, рендер, доставка spawn data и saves

use bevy::prelude::*;
use bevy_rapier3d::plugin::PhysicsSet;

pub mod active;
pub mod bogie;
pub mod motive;
pub mod registry;
pub mod seating;
pub mod spawn;
pub mod state;
pub mod step;
pub mod systems;


// Re-export основных типов
pub use active::ActiveTransports;
pub use bogie::{bogie_bundle, integrate_bogie, sync_bogie_velocity_to_rapier, Bogie};
pub use motive::MotivePower;
pub use registry::{
    builtin_vehicle_types, CatalogItem, RegistryError, TransportAssets, TransportRegistry, TransportTypeId,
    VehicleTypeDescriptor,
};
pub use seating::{hitbox_centers, rider_position, Rider, TransportHitbox};
pub use spawn::{
    spawn_persisted_transport, spawn_replicated_transport, spawn_transport, SpawnError, TransportSpawn,
    TransportWorldExt,
};
pub use state::{Lamp, OwnerId, TransportPose, TransportState};
pub use step::{step_transport, FollowerSample, StepOutcome, TransportError, TransportHost};
pub use systems::{transport_transform, SessionEnded, TransportCorrupted, TransportRemoved};

use crate::config::{SimulationRole, TransportConfig};

/// Transport Plugin
///
/// Регистрирует transport системы в FixedUpdate (20Hz).
///
/// Порядок выполнения:
/// 1. link_replicated_bogies: observer подключает bogies
/// 2. handle_lost_bogies: пересборка набора bogies
/// 3. step_transports: kinematic step, removal, corruption
/// 4. cleanup_transport_parts: части удалённых transport
/// 5. sync_bogie_transforms / sync_bogie_velocity_to_rapier
/// 6. align_hitboxes / align_riders
/// 7. end_transport_session
pub struct TransportPlugin;

impl Plugin for TransportPlugin {
    fn build(&self, app: &mut App) {
        // init_resource: host может вставить свои значения до plugin
        app.init_resource::<TransportConfig>()
            .init_resource::<SimulationRole>()
            .init_resource::<TransportRegistry>()
            .init_resource::<ActiveTransports>();

        app.add_event::<TransportRemoved>()
            .add_event::<TransportCorrupted>()
            .add_event::<SessionEnded>();

        app.add_systems(
            FixedUpdate,
            (
                // Фаза 1: набор bogies
                systems::link_replicated_bogies,
                systems::handle_lost_bogies,

                // Фаза 2: kinematic step
                systems::step_transports,
                systems::cleanup_transport_parts,

                // Фаза 3: синхронизация в rapier
                systems::sync_bogie_transforms,
                sync_bogie_velocity_to_rapier,

                // Фаза 4: зависимые от pose точки
                seating::align_hitboxes,
                seating::align_riders,

                systems::end_transport_session,
            )
                .chain()
                .before(PhysicsSet::SyncBackend),
        );
    }
}

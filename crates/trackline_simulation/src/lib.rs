//! TRACKLINE Simulation Core
//!
//! ECS-симуляция rail transport на Bevy 0.16
//!
//! Слои:
//! - transport = kinematic step, bogies, hitboxes, rider (ECS)
//! - sync = spawn data (wire) и saves (persist)
//! - host = rapier коллизии, рендер, доставка пакетов

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod config;
pub mod geometry;
pub mod logger;
pub mod sync;
pub mod transport;

// Re-export базовых типов для удобства
pub use config::{SimulationRole, TransportConfig, TICK_HZ};
pub use sync::{TransportRecord, WireError};
pub use transport::{
    ActiveTransports, Bogie, MotivePower, OwnerId, TransportPlugin, TransportRegistry, TransportSpawn,
    TransportState, TransportTypeId, TransportWorldExt, VehicleTypeDescriptor,
};

/// Главный plugin симуляции
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Fixed timestep 20Hz: rail physics считается в блоках за tick
        app.insert_resource(Time::<Fixed>::from_hz(TICK_HZ));

        // Seed из create_headless_app не перетираем
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app.add_plugins(TransportPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(TICK_HZ));

    app
}

/// Прогоняет `ticks` fixed tick'ов напрямую (без ожидания реального времени)
pub fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.world_mut().run_schedule(FixedUpdate);
    }
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Debug формат достаточен: f64 печатается без потерь
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

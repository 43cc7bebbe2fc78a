//! Bogie: follower body одной точки сочленения
//!
//! Архитектура:
//! - Позиция/velocity в f64 (DVec3), единицы за tick
//! - Rapier коллайдер (KinematicPositionBased): коллизии решает host
//! - Интеграцию velocity делаем сами (как KinematicController)

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::config::TransportConfig;

/// Bogie компонент
///
/// `position`: нижняя точка bogie (стоит на рельсе), поэтому min_y = position.y.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Bogie {
    /// Transport, которому принадлежит bogie
    pub transport: Entity,
    pub position: DVec3,
    pub velocity: DVec3,
    pub grounded: bool,
}

impl Bogie {
    pub fn new(transport: Entity, position: DVec3) -> Self {
        Self {
            transport,
            position,
            velocity: DVec3::ZERO,
            grounded: false,
        }
    }

    /// Нижняя граница bounding box
    pub fn min_y(&self) -> f64 {
        self.position.y
    }

    /// Добавляет горизонтальный импульс, вертикальная скорость сохраняется
    pub fn push(&mut self, impulse: DVec3) {
        self.velocity.x += impulse.x;
        self.velocity.z += impulse.z;
    }
}

/// Размеры коллайдера bogie (половины, метры)
pub const BOGIE_HALF_EXTENTS: Vec3 = Vec3::new(0.49, 0.2, 0.49);

/// Один tick интеграции bogie
///
/// position += velocity, затем drag по горизонтали и gravity по вертикали.
/// Рельс (`rail_height`) не даёт провалиться: grounded → velocity.y = 0.
pub fn integrate_bogie(bogie: &mut Bogie, config: &TransportConfig) {
    bogie.position += bogie.velocity;

    bogie.velocity.x *= config.bogie_drag;
    bogie.velocity.z *= config.bogie_drag;

    if bogie.position.y <= config.rail_height {
        bogie.position.y = config.rail_height;
        bogie.velocity.y = 0.0;
        bogie.grounded = true;
    } else {
        bogie.velocity.y += config.bogie_gravity;
        bogie.grounded = false;
    }
}

/// Bundle для spawn bogie entity
pub fn bogie_bundle(transport: Entity, position: DVec3) -> impl Bundle {
    (
        Bogie::new(transport, position),
        Transform::from_translation(bogie_translation(position)),
        // Rapier physics
        RigidBody::KinematicPositionBased,
        Collider::cuboid(BOGIE_HALF_EXTENTS.x, BOGIE_HALF_EXTENTS.y, BOGIE_HALF_EXTENTS.z),
        Velocity::default(),
    )
}

/// Центр коллайдера = нижняя точка + половина высоты
pub fn bogie_translation(position: DVec3) -> Vec3 {
    position.as_vec3() + Vec3::Y * BOGIE_HALF_EXTENTS.y
}

/// Синхронизация velocity bogie → Rapier (host решает коллизии)
pub fn sync_bogie_velocity_to_rapier(mut query: Query<(&Bogie, &mut Velocity)>) {
    for (bogie, mut rapier_velocity) in query.iter_mut() {
        // Rapier считает в м/с, у нас блоки за tick
        rapier_velocity.linvel = (bogie.velocity * crate::config::TICK_HZ).as_vec3();
    }
}

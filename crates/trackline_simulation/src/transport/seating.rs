//! Rider и multipart hitboxes: точки, привязанные к позе transport

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::registry::{TransportRegistry, VehicleTypeDescriptor};
use super::state::{TransportPose, TransportState};
use crate::config::TransportConfig;
use crate::geometry::{heading_rotation, rotate_offset};

/// Entity сидит в transport
#[derive(Component, Debug, Clone, Copy)]
pub struct Rider {
    pub vehicle: Entity,
}

/// Часть multipart hitbox transport
#[derive(Component, Debug, Clone, Copy)]
pub struct TransportHitbox {
    pub transport: Entity,
    /// Индекс в `hitbox_positions` descriptor
    pub index: usize,
}

/// Половины размеров одного hitbox
pub const HITBOX_HALF_EXTENTS: Vec3 = Vec3::new(0.5, 0.75, 0.5);

/// Позиция rider в мире
///
/// Есть пара bogies: сиденье на повёрнутом rider offset, иначе просто над центром.
pub fn rider_position(
    state: &TransportState,
    descriptor: &VehicleTypeDescriptor,
    config: &TransportConfig,
) -> DVec3 {
    let pose = state.pose;
    if state.followers.len() > 1 {
        let seat = DVec3::new(descriptor.rider_offset, config.rider_height, 0.0);
        pose.position + rotate_offset(seat, pose.pitch, pose.yaw, 0.0)
    } else {
        pose.position + DVec3::Y * config.rider_fallback_height
    }
}

/// Центры hitboxes в мире (порядок = `hitbox_positions`)
pub fn hitbox_centers(pose: &TransportPose, descriptor: &VehicleTypeDescriptor) -> Vec<DVec3> {
    descriptor
        .hitbox_positions
        .iter()
        .map(|&along| pose.position + rotate_offset(DVec3::new(along, 0.0, 0.0), pose.pitch, pose.yaw, 0.0))
        .collect()
}

pub fn hitbox_bundle(transport: Entity, index: usize) -> impl Bundle {
    (
        TransportHitbox { transport, index },
        Transform::default(),
        Collider::cuboid(HITBOX_HALF_EXTENTS.x, HITBOX_HALF_EXTENTS.y, HITBOX_HALF_EXTENTS.z),
        Sensor,
    )
}

/// Система: hitboxes следуют за позой transport
pub fn align_hitboxes(
    mut hitboxes: Query<(&TransportHitbox, &mut Transform)>,
    transports: Query<&TransportState>,
    registry: Res<TransportRegistry>,
) {
    for (hitbox, mut transform) in hitboxes.iter_mut() {
        let Ok(state) = transports.get(hitbox.transport) else {
            continue;
        };
        let Some(descriptor) = registry.lookup(&state.type_id) else {
            continue;
        };
        let Some(center) = hitbox_centers(&state.pose, descriptor).get(hitbox.index).copied() else {
            continue;
        };

        transform.translation = center.as_vec3();
        transform.rotation = heading_rotation(state.pose.pitch, state.pose.yaw, 0.0).as_quat();
    }
}

/// Система: rider на своём сиденье
pub fn align_riders(
    mut riders: Query<(&Rider, &mut Transform)>,
    transports: Query<&TransportState>,
    registry: Res<TransportRegistry>,
    config: Res<TransportConfig>,
) {
    for (rider, mut transform) in riders.iter_mut() {
        let Ok(state) = transports.get(rider.vehicle) else {
            continue;
        };
        let Some(descriptor) = registry.lookup(&state.type_id) else {
            continue;
        };

        transform.translation = rider_position(state, descriptor, &config).as_vec3();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car() -> VehicleTypeDescriptor {
        let mut descriptor = VehicleTypeDescriptor::new("test_car", vec![-2.0, 2.0]);
        descriptor.rider_offset = -1.0;
        descriptor.hitbox_positions = vec![-1.0, 0.0, 1.0];
        descriptor
    }

    fn assert_close(a: DVec3, b: DVec3) {
        assert!((a - b).length() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_rider_on_rotated_seat() {
        let descriptor = car();
        let config = TransportConfig::default();
        let mut state = TransportState::new(&descriptor, DVec3::new(10.0, 64.0, 10.0));
        state.followers = vec![Entity::from_raw(1), Entity::from_raw(2)];
        state.pose.yaw = 90.0;

        let seat = rider_position(&state, &descriptor, &config);

        assert_close(seat, DVec3::new(10.0, 65.5, 9.0));
    }

    #[test]
    fn test_rider_fallback_without_bogies() {
        let descriptor = car();
        let config = TransportConfig::default();
        let state = TransportState::new(&descriptor, DVec3::new(1.0, 2.0, 3.0));

        assert_close(rider_position(&state, &descriptor, &config), DVec3::new(1.0, 4.0, 3.0));
    }

    #[test]
    fn test_hitbox_centers_follow_heading() {
        let pose = TransportPose {
            position: DVec3::new(5.0, 0.0, 5.0),
            yaw: 180.0,
            pitch: 0.0,
        };

        let centers = hitbox_centers(&pose, &car());

        assert_eq!(centers.len(), 3);
        assert_close(centers[0], DVec3::new(6.0, 0.0, 5.0));
        assert_close(centers[1], DVec3::new(5.0, 0.0, 5.0));
        assert_close(centers[2], DVec3::new(4.0, 0.0, 5.0));
    }
}

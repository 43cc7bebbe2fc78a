//! Геометрия transport: поворот offset векторов, yaw/pitch из пары bogies
//!
//! Конвенция осей:
//! - X: продольная ось transport (вдоль offsets)
//! - Y: вертикаль
//! - Z: поперечная ось
//!
//! Все углы в градусах. `(d, 0, 0)` повёрнутый на yaw даёт
//! `(d·cos yaw, 0, d·sin yaw)`, поэтому `atan2(dz, dx)` возвращает тот же yaw.

use bevy::math::{DQuat, DVec3};

/// Поворачивает offset из локального frame transport в мировой
///
/// Порядок: roll (вокруг X), затем pitch (вокруг Z), затем yaw (вокруг Y).
pub fn rotate_offset(offset: DVec3, pitch: f64, yaw: f64, roll: f64) -> DVec3 {
    heading_rotation(pitch, yaw, roll) * offset
}

/// Кватернион того же поворота (для Transform визуала)
pub fn heading_rotation(pitch: f64, yaw: f64, roll: f64) -> DQuat {
    // Минус: правосторонний поворот вокруг Y уводит +X в -Z
    DQuat::from_rotation_y(-yaw.to_radians())
        * DQuat::from_rotation_z(pitch.to_radians())
        * DQuat::from_rotation_x(roll.to_radians())
}

/// Yaw от первого bogie ко второму
pub fn derive_yaw(first: DVec3, last: DVec3) -> f64 {
    (last.z - first.z).atan2(last.x - first.x).to_degrees()
}

/// Pitch от первого bogie ко второму: наклон линии между ними
pub fn derive_pitch(first: DVec3, last: DVec3) -> f64 {
    let horizontal = (last.x - first.x).hypot(last.z - first.z);
    (last.y - first.y).atan2(horizontal).to_degrees()
}

/// Нормализует угол в (-180, 180]
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

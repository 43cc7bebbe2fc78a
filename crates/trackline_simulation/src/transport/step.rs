//! Kinematic step: поза transport из позиций bogies
//!
//! Один вызов на transport за tick:
//! 1. Boundary check (выпал из мира → removal)
//! 2. Bogies существуют (authoritative респавнит из follower_positions)
//! 3. Motion propagation от тяги к bogies
//! 4. Pose: midpoint крайних bogies, yaw/pitch из их разницы
//! 5. Snap-back bogies на повёрнутые offsets + запись позиций
//! 6. Observer регистрирует transport в ActiveTransports
//!
//! Host (ECS, тестовый mock) подключается через `TransportHost`.

use bevy::math::DVec3;
use bevy::prelude::*;
use thiserror::Error;

use super::active::ActiveTransports;
use super::motive::MotivePower;
use super::state::{TransportPose, TransportState};
use crate::config::TransportConfig;
use crate::geometry::{derive_pitch, derive_yaw, rotate_offset};
use crate::logger;

/// Ниже этого горизонтального расстояния между крайними bogies yaw не пересчитывается
const MIN_EXTREME_DISTANCE: f64 = 1e-6;

/// Что host знает о bogie
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowerSample {
    pub position: DVec3,
    /// Нижняя граница bounding box
    pub min_y: f64,
}

/// Возможности host, нужные kinematic step
pub trait TransportHost {
    fn is_authoritative(&self) -> bool;

    /// Spawn bogie в мире; handle может стать читаемым только со следующего tick
    fn spawn_follower(&mut self, position: DVec3) -> Entity;

    /// None: bogie ещё не появился (или уже исчез)
    fn follower(&self, follower: Entity) -> Option<FollowerSample>;

    /// Добавить горизонтальную скорость (вертикальная сохраняется)
    fn push_follower(&mut self, follower: Entity, impulse: DVec3);

    /// Интеграция движения bogie (коллизии: забота host)
    fn move_follower(&mut self, follower: Entity);

    /// Поставить bogie в (x, z), высоту оставить; вернуть итоговую позицию
    fn place_follower(&mut self, follower: Entity, x: f64, z: f64) -> Option<DVec3>;

    fn request_removal(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Transport выпал из мира, host удаляет его
    Removed,
    /// Bogies ещё не готовы: пропускаем tick
    Pending,
    Posed(TransportPose),
}

#[derive(Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("transport expects {expected} bogies but has no recorded bogie positions (persisted state lost)")]
    MissingFollowerPositions { expected: usize },
}

/// Один tick kinematic step
pub fn step_transport(
    transport: Entity,
    state: &mut TransportState,
    drive: Option<&mut MotivePower>,
    host: &mut impl TransportHost,
    active: &mut ActiveTransports,
    config: &TransportConfig,
) -> Result<StepOutcome, TransportError> {
    if state.pose.position.y < config.floor_y {
        host.request_removal();
        return Ok(StepOutcome::Removed);
    }

    let expected = state.expected_followers();
    if expected > 0 && !state.followers_complete() && host.is_authoritative() {
        respawn_followers(transport, state, host)?;
    }

    let mut outcome = StepOutcome::Pending;
    if expected > 0 && state.followers_complete() {
        if let Some(drive) = drive {
            propagate_motion(state, drive, host);
        }

        if let Some(pose) = derive_pose(state, host) {
            state.pose = pose;
            snap_followers(state, host);
            outcome = StepOutcome::Posed(pose);
        }
    }

    if !host.is_authoritative() && has_replicated_positions(state) && active.insert(transport) {
        logger::log(&format!("🚃 Transport {:?} registered as active", transport));
    }

    Ok(outcome)
}

/// Authoritative: спавнит недостающие bogies по записанным позициям
fn respawn_followers(
    transport: Entity,
    state: &mut TransportState,
    host: &mut impl TransportHost,
) -> Result<(), TransportError> {
    let expected = state.expected_followers();

    if state.follower_positions.is_empty() {
        return Err(TransportError::MissingFollowerPositions { expected });
    }

    if state.follower_positions.len() < expected {
        logger::log_warning(&format!(
            "Transport {:?}: {} of {} bogie positions recorded, completing from pose",
            transport,
            state.follower_positions.len(),
            expected
        ));
        state.place_followers_at_offsets();
    }

    for index in state.followers.len()..expected {
        let follower = host.spawn_follower(state.follower_positions[index]);
        state.followers.push(follower);
    }

    Ok(())
}

/// Тяга → горизонтальная скорость каждого bogie вдоль текущего yaw
fn propagate_motion(state: &TransportState, drive: &mut MotivePower, host: &mut impl TransportHost) {
    let speed = drive.process_movement(state.reverse);
    let motion = rotate_offset(DVec3::new(speed, 0.0, 0.0), 0.0, state.pose.yaw, 0.0);

    for &follower in &state.followers {
        host.push_follower(follower, motion);
        host.move_follower(follower);
    }
}

/// Pose из крайних bogies; None пока они не читаются
fn derive_pose(state: &TransportState, host: &impl TransportHost) -> Option<TransportPose> {
    let first = host.follower(*state.followers.first()?)?;
    let last = host.follower(*state.followers.last()?)?;

    let mut pose = state.pose;
    pose.position = DVec3::new(
        (first.position.x + last.position.x) * 0.5,
        (first.min_y + last.min_y) * 0.5,
        (first.position.z + last.position.z) * 0.5,
    );

    // Один bogie (или оба в одной точке): направление не определено, углы сохраняем
    let horizontal = (last.position.x - first.position.x).hypot(last.position.z - first.position.z);
    if state.followers.len() > 1 && horizontal > MIN_EXTREME_DISTANCE {
        pose.yaw = derive_yaw(first.position, last.position);
        pose.pitch = derive_pitch(first.position, last.position);
    }

    Some(pose)
}

/// Каждый bogie на свой offset от новой позы, позиция записывается обратно
fn snap_followers(state: &mut TransportState, host: &mut impl TransportHost) {
    let pose = state.pose;

    for index in 0..state.followers.len() {
        let Some(&offset) = state.offsets().get(index) else {
            break;
        };
        let target = pose.position + rotate_offset(DVec3::new(offset, 0.0, 0.0), 0.0, pose.yaw, 0.0);

        let Some(resulting) = host.place_follower(state.followers[index], target.x, target.z) else {
            continue;
        };

        // push только в конец: индексы позиций = индексы offsets
        if index < state.follower_positions.len() {
            state.follower_positions[index] = resulting;
        } else if index == state.follower_positions.len() {
            state.follower_positions.push(resulting);
        }
    }
}

/// Позиции пришли по репликации/из save (не нулевые)
fn has_replicated_positions(state: &TransportState) -> bool {
    state.follower_positions.len() > 1 && state.follower_positions[0] != DVec3::ZERO
}

//! TransportState: данные одного rail transport
//!
//! Чистый data aggregate: никакой логики host. Kinematic step, codecs и
//! системы работают с ним через явные параметры.

use bevy::math::DVec3;
use bevy::prelude::*;
use rand::Rng;

use super::registry::{TransportTypeId, VehicleTypeDescriptor};
use crate::geometry::rotate_offset;

/// 128-bit идентификатор владельца (обычно игрок, заспавнивший transport)
///
/// На wire и в saves хранится двумя i64 половинами (high, low).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OwnerId(pub u128);

impl OwnerId {
    pub const NIL: OwnerId = OwnerId(0);

    pub fn from_halves(high: i64, low: i64) -> Self {
        Self(((high as u64 as u128) << 64) | (low as u64 as u128))
    }

    pub fn high(self) -> i64 {
        (self.0 >> 64) as u64 as i64
    }

    pub fn low(self) -> i64 {
        self.0 as u64 as i64
    }

    /// Случайный id для transport без владельца (spawn из скрипта, тесты)
    pub fn random(rng: &mut impl Rng) -> Self {
        Self(rng.gen())
    }
}

/// Фонарь transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lamp {
    pub on: bool,
    /// Block position источника света
    pub position: IVec3,
}

impl Lamp {
    pub fn toggle(&mut self) -> bool {
        self.on = !self.on;
        self.on
    }
}

/// Выведенная из bogies поза transport (углы в градусах)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportPose {
    pub position: DVec3,
    pub yaw: f64,
    pub pitch: f64,
}

/// Состояние rail transport
///
/// Инварианты:
/// - `offsets` неизменны после создания (берутся из descriptor)
/// - `follower_positions.len() == offsets.len()` после полной инициализации
/// - индексы 0 и len-1: крайние bogies, по ним выводится pose
#[derive(Component, Debug, Clone)]
pub struct TransportState {
    pub type_id: TransportTypeId,
    offsets: Vec<f64>,
    pub follower_positions: Vec<DVec3>,
    pub followers: Vec<Entity>,
    pub owner: Option<OwnerId>,
    pub locked: bool,
    pub reverse: bool,
    pub lamp: Lamp,
    /// Цвета skin (RGB)
    pub colors: [u8; 3],
    pub pose: TransportPose,
}

impl TransportState {
    /// Пустое состояние: offsets известны, позиций и bogies ещё нет
    pub fn new(descriptor: &VehicleTypeDescriptor, position: DVec3) -> Self {
        Self {
            type_id: descriptor.type_id.clone(),
            offsets: descriptor.offsets.clone(),
            follower_positions: Vec::new(),
            followers: Vec::new(),
            owner: None,
            locked: false,
            reverse: false,
            lamp: Lamp::default(),
            colors: [0, 0, 0],
            pose: TransportPose {
                position,
                ..default()
            },
        }
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn expected_followers(&self) -> usize {
        self.offsets.len()
    }

    /// Все bogies на месте (kinematic step может выводить pose)
    pub fn followers_complete(&self) -> bool {
        self.followers.len() >= self.offsets.len()
    }

    /// Позиция bogie `index` по offset от текущей pose
    pub fn offset_position(&self, index: usize) -> Option<DVec3> {
        let offset = *self.offsets.get(index)?;
        let rotated = rotate_offset(DVec3::new(offset, 0.0, 0.0), 0.0, self.pose.yaw, 0.0);
        Some(self.pose.position + rotated)
    }

    /// Заполняет follower_positions по offsets от текущей pose
    ///
    /// Используется authoritative стороной при первом spawn transport.
    pub fn place_followers_at_offsets(&mut self) {
        for index in self.follower_positions.len()..self.offsets.len() {
            if let Some(position) = self.offset_position(index) {
                self.follower_positions.push(position);
            }
        }
    }

    /// Подключить bogie (observer: bogie пришёл по репликации)
    ///
    /// Идемпотентно: повторное подключение того же entity игнорируется.
    pub fn attach_follower(&mut self, follower: Entity) -> bool {
        if self.followers.contains(&follower) || self.followers_complete() {
            return false;
        }
        self.followers.push(follower);
        true
    }

    pub fn set_owner(&mut self, owner: OwnerId) {
        self.owner = Some(owner);
    }

    pub fn is_owner(&self, player: OwnerId) -> bool {
        self.owner == Some(player)
    }

    /// Может ли игрок взаимодействовать (locked → только владелец)
    pub fn can_interact(&self, player: OwnerId) -> bool {
        !self.locked || self.is_owner(player)
    }

    /// Переключает lock; разрешено только владельцу
    pub fn toggle_lock(&mut self, player: OwnerId) -> Option<bool> {
        if !self.is_owner(player) {
            return None;
        }
        self.locked = !self.locked;
        Some(self.locked)
    }
}

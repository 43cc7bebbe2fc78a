//! Конфигурация transport симуляции (Bevy resources)

use bevy::prelude::*;

/// Tick rate симуляции (rail physics считается в блоках за tick)
pub const TICK_HZ: f64 = 20.0;

/// Сторона симуляции
///
/// - Authoritative: спавнит bogies, применяет движение, пишет saves
/// - Observer: получает spawn data / saves и заново выводит pose локально
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationRole {
    #[default]
    Authoritative,
    Observer,
}

impl SimulationRole {
    pub fn is_authoritative(self) -> bool {
        self == SimulationRole::Authoritative
    }
}

/// Параметры kinematic step и интеграции bogies
///
/// Все скорости в единицах за tick (не за секунду).
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct TransportConfig {
    /// Ниже этой высоты transport удаляется (выпал из мира)
    pub floor_y: f64,
    /// Затухание горизонтальной скорости bogie за tick
    pub bogie_drag: f64,
    /// Гравитация для bogie (добавляется к velocity.y каждый tick)
    pub bogie_gravity: f64,
    /// Высота рельса: bogie не проваливается ниже
    pub rail_height: f64,
    /// Высота сиденья rider над осью transport
    pub rider_height: f64,
    /// Высота rider у transport без пары bogies
    pub rider_fallback_height: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            floor_y: -64.0,
            bogie_drag: 0.96,
            bogie_gravity: -0.04,
            rail_height: 0.0,
            rider_height: 1.5,
            rider_fallback_height: 2.0,
        }
    }
}

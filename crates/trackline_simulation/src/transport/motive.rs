//! Тяга self-driven transport (locomotive)

use bevy::prelude::*;

/// Тяга locomotive
///
/// `speed`: текущая скорость (блоки за tick), стремится к `throttle × max_speed`
/// не быстрее `acceleration` за tick.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MotivePower {
    /// Положение рукоятки [-1, 1]
    pub throttle: f64,
    pub max_speed: f64,
    pub acceleration: f64,
    pub speed: f64,
}

impl Default for MotivePower {
    fn default() -> Self {
        Self {
            throttle: 0.0,
            max_speed: 0.4,
            acceleration: 0.005,
            speed: 0.0,
        }
    }
}

impl MotivePower {
    pub fn set_throttle(&mut self, throttle: f64) {
        self.throttle = throttle.clamp(-1.0, 1.0);
    }

    /// Один tick тяги: возвращает скорость для motion propagation
    ///
    /// `reverse` разворачивает направление движения.
    pub fn process_movement(&mut self, reverse: bool) -> f64 {
        let target = self.throttle * self.max_speed;
        let delta = (target - self.speed).clamp(-self.acceleration, self.acceleration);
        self.speed += delta;

        if reverse {
            -self.speed
        } else {
            self.speed
        }
    }
}

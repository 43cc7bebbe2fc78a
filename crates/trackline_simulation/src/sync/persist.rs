//! Persistent record transport (save/load между перезапусками симуляции)
//!
//! Плоское пространство ключей `extended.*`, позиции bogies: упорядоченный
//! список записей с тегом индекса. Текстовый формат: JSON.

use bevy::math::DVec3;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::logger;
use crate::transport::{OwnerId, TransportState};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode transport record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode transport record: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Тег записи, которую не удалось прочитать
const MALFORMED_TAG: i8 = -1;

/// Позиция одного bogie в save
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BogieRecord {
    /// Индекс bogie; отрицательный тег = битая запись, пропускается
    pub bogie: i8,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BogieRecord {
    /// Читает запись без отказа: нет тега или он не влезает в i8 → MALFORMED_TAG,
    /// нет координаты → 0
    fn from_value(value: &Value) -> Self {
        let bogie = value
            .get("bogie")
            .and_then(Value::as_i64)
            .and_then(|tag| i8::try_from(tag).ok())
            .unwrap_or(MALFORMED_TAG);

        Self {
            bogie,
            x: coordinate(value, "x"),
            y: coordinate(value, "y"),
            z: coordinate(value, "z"),
        }
    }
}

fn coordinate(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Список bogies читается поштучно: битая запись не валит весь record
fn lenient_bogies<'de, D>(deserializer: D) -> Result<Vec<BogieRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries.iter().map(BogieRecord::from_value).collect())
}

/// Сохраняемое состояние transport
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransportRecord {
    #[serde(rename = "extended.islocked", default)]
    pub locked: bool,
    #[serde(rename = "extended.lamp", default)]
    pub lamp_on: bool,
    #[serde(rename = "extended.lamp.x", default)]
    pub lamp_x: i32,
    #[serde(rename = "extended.lamp.y", default)]
    pub lamp_y: i32,
    #[serde(rename = "extended.lamp.z", default)]
    pub lamp_z: i32,
    #[serde(rename = "extended.isreverse", default)]
    pub reverse: bool,
    #[serde(rename = "extended.ownerm", default)]
    pub owner_high: i64,
    #[serde(rename = "extended.ownerl", default)]
    pub owner_low: i64,
    #[serde(rename = "extended.colors", default)]
    pub colors: [u8; 3],
    #[serde(rename = "extended.bogies", default, deserialize_with = "lenient_bogies")]
    pub bogies: Vec<BogieRecord>,
}

impl TransportRecord {
    /// Снимок state для save
    ///
    /// Transport без owner сохраняется с нулевым id.
    pub fn from_state(state: &TransportState) -> Self {
        let owner = state.owner.unwrap_or(OwnerId::NIL);

        let mut bogies = Vec::with_capacity(state.follower_positions.len());
        for (index, position) in state.follower_positions.iter().enumerate() {
            let Ok(tag) = i8::try_from(index) else {
                logger::log_warning(&format!(
                    "Transport {}: bogie #{} does not fit the save tag, dropped",
                    state.type_id, index
                ));
                continue;
            };
            bogies.push(BogieRecord {
                bogie: tag,
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }

        Self {
            locked: state.locked,
            lamp_on: state.lamp.on,
            lamp_x: state.lamp.position.x,
            lamp_y: state.lamp.position.y,
            lamp_z: state.lamp.position.z,
            reverse: state.reverse,
            owner_high: owner.high(),
            owner_low: owner.low(),
            colors: state.colors,
            bogies,
        }
    }

    /// Применяет record к свежему state
    ///
    /// Позиции добавляются в `follower_positions` в порядке списка.
    /// Возвращает число пропущенных записей с отрицательным тегом.
    pub fn apply_to(&self, state: &mut TransportState) -> usize {
        state.locked = self.locked;
        state.lamp.on = self.lamp_on;
        state.lamp.position.x = self.lamp_x;
        state.lamp.position.y = self.lamp_y;
        state.lamp.position.z = self.lamp_z;
        state.reverse = self.reverse;
        state.owner = Some(OwnerId::from_halves(self.owner_high, self.owner_low));
        state.colors = self.colors;

        let mut skipped = 0;
        for record in &self.bogies {
            if record.bogie < 0 {
                skipped += 1;
                continue;
            }
            state.follower_positions.push(DVec3::new(record.x, record.y, record.z));
        }

        if skipped > 0 {
            logger::log_warning(&format!(
                "Transport {}: skipped {} malformed bogie records",
                state.type_id, skipped
            ));
        }
        skipped
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(PersistError::Encode)
    }

    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        serde_json::from_str(text).map_err(PersistError::Decode)
    }
}

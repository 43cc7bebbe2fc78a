//! Spawn data: бинарный формат репликации transport при spawn
//!
//! Битовая структура (network byte order, big-endian):
//! - u8: reverse (0 / не 0)
//! - i64: owner high
//! - i64: owner low
//! - N × (f64 x, f64 y, f64 z): позиции bogies
//!
//! Длин нет: получатель знает N из offsets своего типа.

use bevy::math::DVec3;
use thiserror::Error;

use crate::logger;
use crate::transport::{OwnerId, TransportState};

const BOOL_LEN: usize = 1;
const LONG_LEN: usize = 8;
const DOUBLE_LEN: usize = 8;
const TRIPLE_LEN: usize = DOUBLE_LEN * 3;

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("owner must be assigned before spawn data is encoded")]
    OwnerUnset,
    #[error("transport has {found} bogie positions, its type expects {expected}")]
    FollowerCountMismatch { expected: usize, found: usize },
    #[error("spawn data truncated at byte {offset}: need {needed} more, {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Точный размер spawn data для transport с `followers` bogies
pub fn spawn_data_len(followers: usize) -> usize {
    BOOL_LEN + LONG_LEN * 2 + TRIPLE_LEN * followers
}

/// Кодирует reverse, owner и позиции bogies
pub fn encode_spawn_data(state: &TransportState) -> Result<Vec<u8>, WireError> {
    let owner = state.owner.ok_or(WireError::OwnerUnset)?;

    let expected = state.expected_followers();
    if state.follower_positions.len() != expected {
        return Err(WireError::FollowerCountMismatch {
            expected,
            found: state.follower_positions.len(),
        });
    }

    let mut writer = WireWriter::with_capacity(spawn_data_len(expected));
    writer.write_bool(state.reverse);
    writer.write_i64(owner.high());
    writer.write_i64(owner.low());
    for position in &state.follower_positions {
        writer.write_f64(position.x);
        writer.write_f64(position.y);
        writer.write_f64(position.z);
    }

    Ok(writer.into_bytes())
}

/// Декодирует spawn data в state
///
/// Читает ровно `offsets.len()` позиций и добавляет их в `follower_positions`.
/// При ошибке state не меняется.
pub fn decode_spawn_data(state: &mut TransportState, bytes: &[u8]) -> Result<(), WireError> {
    let mut reader = WireReader::new(bytes);

    let reverse = reader.read_bool()?;
    let owner = OwnerId::from_halves(reader.read_i64()?, reader.read_i64()?);

    let expected = state.expected_followers();
    let mut positions = Vec::with_capacity(expected);
    for _ in 0..expected {
        positions.push(DVec3::new(reader.read_f64()?, reader.read_f64()?, reader.read_f64()?));
    }

    if reader.remaining() > 0 {
        logger::log(&format!(
            "Spawn data for {}: ignoring {} trailing bytes",
            state.type_id,
            reader.remaining()
        ));
    }

    state.reverse = reverse;
    state.owner = Some(owner);
    state.follower_positions.extend(positions);
    Ok(())
}

struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

struct WireReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let available = self.remaining();
        if available < N {
            return Err(WireError::Truncated {
                offset: self.cursor,
                needed: N,
                available,
            });
        }

        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.cursor..self.cursor + N]);
        self.cursor += N;
        Ok(out)
    }

    fn read_bool(&mut self) -> Result<bool, WireError> {
        let [byte] = self.take::<BOOL_LEN>()?;
        Ok(byte != 0)
    }

    fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.take::<LONG_LEN>()?))
    }

    fn read_f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_be_bytes(self.take::<DOUBLE_LEN>()?))
    }
}

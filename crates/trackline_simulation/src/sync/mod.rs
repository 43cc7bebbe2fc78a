//! Sync codecs transport
//!
//! - wire: spawn data для observer (бинарный, byte-exact)
//! - persist: save record (именованные поля, JSON)

pub mod persist;
pub mod wire;

pub use persist::{BogieRecord, PersistError, TransportRecord};
pub use wire::{decode_spawn_data, encode_spawn_data, spawn_data_len, WireError};

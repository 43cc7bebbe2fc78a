//! ActiveTransports: observer-side реестр transport для периферии (свет, рендер)
//!
//! Явный resource вместо глобального списка:
//! - создаётся TransportPlugin при build
//! - `clear()` при завершении сессии
//! - запись удаляется при despawn transport

use bevy::prelude::*;

#[derive(Resource, Debug, Default, Clone)]
pub struct ActiveTransports {
    entries: Vec<Entity>,
}

impl ActiveTransports {
    /// Идемпотентная вставка: true если transport добавлен впервые
    pub fn insert(&mut self, transport: Entity) -> bool {
        if self.entries.contains(&transport) {
            return false;
        }
        self.entries.push(transport);
        true
    }

    pub fn remove(&mut self, transport: Entity) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| *entry != transport);
        before != self.entries.len()
    }

    pub fn contains(&self, transport: Entity) -> bool {
        self.entries.contains(&transport)
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

//! Transport Registry: каталог типов rail transport
//!
//! # Архитектура
//!
//! **VehicleTypeDescriptor**: статический blueprint типа:
//! - offsets bogies, rider offset, hitbox layout
//! - связанный catalog item, имя, размер инвентаря
//! - визуальные ассеты (пути, сами ассеты грузит host)
//!
//! **TransportRegistry**: resource с lookup по `TransportTypeId`.
//! Заполняется при старте (`Default` = встроенный каталог), дальше только чтение.

use bevy::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// Идентификатор типа transport (world name, lower-case)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransportTypeId(pub String);

impl From<&str> for TransportTypeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TransportTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item, который выдаёт/спавнит transport (inventory system вне этого crate)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CatalogItem(pub String);

/// Визуальные ассеты типа (только пути)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportAssets {
    pub model: String,
    pub texture: String,
    pub bogie_model: Option<String>,
    pub bogie_texture: Option<String>,
}

/// Статическое описание типа transport
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleTypeDescriptor {
    pub type_id: TransportTypeId,
    pub display_name: String,
    /// Продольные offsets bogies от центра transport (порядок = порядок bogies)
    pub offsets: Vec<f64>,
    /// Продольный offset сиденья rider
    pub rider_offset: f64,
    /// Продольные позиции multipart hitboxes
    pub hitbox_positions: Vec<f64>,
    pub item: CatalogItem,
    pub inventory_size: usize,
    /// Есть тяга (locomotive): получает MotivePower при spawn
    pub self_driven: bool,
    pub assets: TransportAssets,
    /// Тег дыма для рендера ('n' = нет)
    pub smoke: char,
}

impl VehicleTypeDescriptor {
    /// Rolling stock без тяги и ассетов; остальные поля заполняет caller
    pub fn new(type_id: impl Into<TransportTypeId>, offsets: Vec<f64>) -> Self {
        let type_id = type_id.into();
        Self {
            display_name: type_id.0.clone(),
            item: CatalogItem(format!("item_{}", type_id.0)),
            type_id,
            offsets,
            rider_offset: 0.0,
            hitbox_positions: vec![0.0],
            inventory_size: 9,
            self_driven: false,
            assets: TransportAssets {
                model: String::new(),
                texture: String::new(),
                bogie_model: None,
                bogie_texture: None,
            },
            smoke: 'n',
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("transport type `{0}` is already registered")]
    Duplicate(TransportTypeId),
    #[error("unknown transport type `{0}`")]
    UnknownType(TransportTypeId),
}

/// Каталог типов transport
#[derive(Resource, Debug, Clone)]
pub struct TransportRegistry {
    descriptors: HashMap<TransportTypeId, VehicleTypeDescriptor>,
    /// Порядок регистрации (для детерминированного list)
    order: Vec<TransportTypeId>,
}

impl TransportRegistry {
    pub fn empty() -> Self {
        Self {
            descriptors: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, descriptor: VehicleTypeDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(&descriptor.type_id) {
            return Err(RegistryError::Duplicate(descriptor.type_id));
        }
        self.order.push(descriptor.type_id.clone());
        self.descriptors.insert(descriptor.type_id.clone(), descriptor);
        Ok(())
    }

    pub fn lookup(&self, type_id: &TransportTypeId) -> Option<&VehicleTypeDescriptor> {
        self.descriptors.get(type_id)
    }

    pub fn require(&self, type_id: &TransportTypeId) -> Result<&VehicleTypeDescriptor, RegistryError> {
        self.lookup(type_id)
            .ok_or_else(|| RegistryError::UnknownType(type_id.clone()))
    }

    /// Все типы в порядке регистрации
    pub fn list_vehicle_types(&self) -> impl Iterator<Item = &VehicleTypeDescriptor> {
        self.order.iter().filter_map(|id| self.descriptors.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for TransportRegistry {
    /// Встроенный каталог
    fn default() -> Self {
        let mut registry = Self::empty();
        for descriptor in builtin_vehicle_types() {
            // Встроенные id уникальны
            let _ = registry.register(descriptor);
        }
        registry
    }
}

/// Встроенные типы transport
pub fn builtin_vehicle_types() -> Vec<VehicleTypeDescriptor> {
    vec![VehicleTypeDescriptor {
        type_id: TransportTypeId::from("entityfirsttrain"),
        display_name: "First Train".to_string(),
        offsets: vec![-1.8, 1.8],
        rider_offset: -1.2,
        hitbox_positions: vec![-1.0, 0.0, 1.0],
        item: CatalogItem("item_first_train".to_string()),
        inventory_size: 3,
        self_driven: true,
        assets: TransportAssets {
            model: "models/trains/train_test_1.obj".to_string(),
            texture: "textures/train/null.png".to_string(),
            bogie_model: None,
            bogie_texture: None,
        },
        smoke: 'n',
    }]
}

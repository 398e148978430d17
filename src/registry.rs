use std::{fs, path::Path};

use ahash::AHashSet;

use crate::{
    errors::PersistError,
    model::{ColumnType, EntityType, PRIMARY_KEY},
};

/// Entity type backing the single-row version record.
pub const VERSION_ENTITY: &str = "DataVersion";
/// Field of [`VERSION_ENTITY`] holding the data-format version string.
pub const VERSION_FIELD: &str = "version";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRegistry {
    entities: Vec<EntityType>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: vec![EntityType::new(VERSION_ENTITY).column(VERSION_FIELD, ColumnType::Text)],
        }
    }

    /// Registers every entity and checks that all references resolve.
    pub fn from_entities<I>(entities: I) -> Result<Self, PersistError>
    where
        I: IntoIterator<Item = EntityType>,
    {
        let mut registry = Self::new();
        for entity in entities {
            registry.register(entity)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Loads a JSON array of entity types.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| PersistError::io(format!("{}: {e}", path.display())))?;
        let entities: Vec<EntityType> = serde_json::from_str(&raw).map_err(|e| {
            PersistError::configuration(format!("invalid schema file {}: {e}", path.display()))
        })?;
        Self::from_entities(entities)
    }

    /// Adds one entity type. References to types registered later are
    /// allowed; [`EntityRegistry::validate`] checks them.
    pub fn register(&mut self, entity: EntityType) -> Result<(), PersistError> {
        if entity.name.is_empty() {
            return Err(PersistError::configuration("entity type name must not be empty"));
        }
        if self.get(&entity.name).is_some() {
            return Err(PersistError::configuration(format!(
                "entity type {} registered twice",
                entity.name
            )));
        }
        let mut seen = AHashSet::new();
        for field in entity.field_names() {
            if field == PRIMARY_KEY {
                return Err(PersistError::configuration(format!(
                    "{}: field name '{PRIMARY_KEY}' is reserved for the primary key",
                    entity.name
                )));
            }
            if !seen.insert(field) {
                return Err(PersistError::configuration(format!(
                    "{}: duplicate field {field}",
                    entity.name
                )));
            }
        }
        for index in &entity.indexes {
            if index.columns.is_empty() {
                return Err(PersistError::configuration(format!(
                    "{}: index without columns",
                    entity.name
                )));
            }
            if let Some(unknown) = index
                .columns
                .iter()
                .find(|c| c.as_str() != PRIMARY_KEY && !seen.contains(c.as_str()))
            {
                return Err(PersistError::configuration(format!(
                    "{}: index references unknown field {unknown}",
                    entity.name
                )));
            }
        }
        self.entities.push(entity);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PersistError> {
        for entity in &self.entities {
            for fk in &entity.foreign_keys {
                if self.get(&fk.references).is_none() {
                    return Err(PersistError::configuration(format!(
                        "{}.{} references unknown entity type {}",
                        entity.name, fk.field, fk.references
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&EntityType, PersistError> {
        self.get(name)
            .ok_or_else(|| PersistError::configuration(format!("unknown entity type {name}")))
    }

    /// Entity types in registration order.
    pub fn entities(&self) -> &[EntityType] {
        &self.entities
    }

    pub fn version_entity(&self) -> &EntityType {
        &self.entities[0]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

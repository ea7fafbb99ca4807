//! Domain metamodel: the entities and attributes queries are resolved against.
//!
//! The translator only sees the [`DomainModel`] trait. [`MappingMetamodel`]
//! is the in-memory implementation, assembled with a builder or loaded from a
//! TOML mapping file:
//!
//! ```toml
//! [[entity]]
//! name = "Book"
//! id = { name = "id", type = "long" }
//!
//! [[entity.attribute]]
//! name = "title"
//! type = "string"
//!
//! [[entity.attribute]]
//! name = "author"
//! many_to_one = "Person"
//! ```
//!
//! Table and column names default to the snake-cased entity and attribute
//! names (`publishedOn` -> `published_on`).

mod builder;
mod loader;
mod model;
#[cfg(test)]
pub(crate) mod test_model;

use std::path::PathBuf;

use thiserror::Error;

pub use builder::{EntityBuilder, MappingMetamodel, MetamodelBuilder};
pub use loader::{AttributeMapping, EntityMapping, MappingFile};
pub use model::{Attribute, AttributeKind, Discriminator, EntityType};

/// Errors raised while building or loading a metamodel.
#[derive(Debug, Error)]
pub enum MetamodelError {
    #[error("Mapping file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read mapping file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse mapping file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Entity '{0}' is mapped more than once")]
    DuplicateEntity(String),

    #[error("Entity '{0}' has no identifier")]
    MissingIdentifier(String),

    #[error("Attribute '{entity}.{attribute}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        attribute: String,
        target: String,
    },

    #[error("Entity '{entity}' extends unknown entity '{super_type}'")]
    UnknownSuperType { entity: String, super_type: String },

    #[error("Attribute '{entity}.{attribute}' is mapped by '{mapped_by}', which is not a to-one attribute of '{target}'")]
    InvalidMappedBy {
        entity: String,
        attribute: String,
        target: String,
        mapped_by: String,
    },

    #[error("Unknown type '{ty}' for attribute '{entity}.{attribute}'")]
    UnknownType {
        entity: String,
        attribute: String,
        ty: String,
    },

    #[error("Invalid mapping for '{entity}.{attribute}': {message}")]
    InvalidAttribute {
        entity: String,
        attribute: String,
        message: String,
    },
}

/// Read access to the mapped entities.
///
/// Entity names may be given as the query name (`Book`) or as the mapped
/// class name, qualified or not.
pub trait DomainModel {
    fn entity(&self, name: &str) -> Option<&EntityType>;

    fn entities(&self) -> Vec<&EntityType>;

    /// Attribute by name on `entity` or any of its super types, with the
    /// entity that declares it.
    fn find_attribute(&self, entity: &str, name: &str) -> Option<(&EntityType, &Attribute)> {
        let mut current = self.entity(entity);
        while let Some(e) = current {
            if let Some(attribute) = e.declared_attribute(name) {
                return Some((e, attribute));
            }
            current = e.super_type.as_deref().and_then(|s| self.entity(s));
        }
        None
    }

    /// Root of the inheritance hierarchy `entity` belongs to.
    fn root_entity(&self, entity: &str) -> Option<&EntityType> {
        let mut current = self.entity(entity)?;
        while let Some(parent) = current.super_type.as_deref().and_then(|s| self.entity(s)) {
            current = parent;
        }
        Some(current)
    }

    fn is_subtype_of(&self, entity: &str, super_type: &str) -> bool {
        let mut current = self.entity(entity);
        while let Some(e) = current {
            if e.is_named(super_type) {
                return true;
            }
            current = e.super_type.as_deref().and_then(|s| self.entity(s));
        }
        false
    }

    /// Every subtype of `entity`, direct or not, in mapping order.
    fn subtypes(&self, entity: &str) -> Vec<&EntityType> {
        let Some(base) = self.entity(entity) else {
            return Vec::new();
        };
        self.entities()
            .into_iter()
            .filter(|e| e.name != base.name && self.is_subtype_of(&e.name, &base.name))
            .collect()
    }

    fn discriminator(&self, entity: &str) -> Option<&Discriminator> {
        self.root_entity(entity)?.discriminator.as_ref()
    }

    /// Discriminator values selecting `entity` and its subtypes.
    fn discriminator_values(&self, entity: &str) -> Vec<String> {
        let Some(e) = self.entity(entity) else {
            return Vec::new();
        };
        std::iter::once(e)
            .chain(self.subtypes(&e.name))
            .filter_map(|e| e.discriminator_value.clone())
            .collect()
    }

    /// Declared and inherited attributes, super types first.
    fn all_attributes(&self, entity: &str) -> Vec<&Attribute> {
        let mut chain = Vec::new();
        let mut current = self.entity(entity);
        while let Some(e) = current {
            chain.push(e);
            current = e.super_type.as_deref().and_then(|s| self.entity(s));
        }
        chain
            .into_iter()
            .rev()
            .flat_map(|e| e.attributes.iter())
            .collect()
    }
}

//! TOML mapping files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::builder::{EntityBuilder, MappingMetamodel};
use super::model::{Attribute, AttributeKind};
use super::MetamodelError;
use crate::sqm::types::BasicType;

/// Root of a mapping file: a list of `[[entity]]` tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingFile {
    #[serde(rename = "entity")]
    pub entities: Vec<EntityMapping>,
}

/// One `[[entity]]` table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EntityMapping {
    pub name: String,
    pub class: Option<String>,
    pub table: Option<String>,
    pub id: Option<ColumnMapping>,
    pub version: Option<ColumnMapping>,
    pub discriminator: Option<DiscriminatorMapping>,
    pub discriminator_value: Option<String>,
    pub extends: Option<String>,
    #[serde(rename = "where")]
    pub where_restriction: Option<String>,
    #[serde(rename = "attribute")]
    pub attributes: Vec<AttributeMapping>,
}

/// `{ name = "id", type = "long", column = "book_id" }`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColumnMapping {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub column: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscriminatorMapping {
    pub column: String,
    #[serde(rename = "type", default = "default_discriminator_type")]
    pub ty: String,
}

fn default_discriminator_type() -> String {
    "string".to_string()
}

/// One `[[entity.attribute]]` table. Exactly one of `type`, `many_to_one`,
/// `one_to_many`, `many_to_many` or `embeddable` says what it maps.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AttributeMapping {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub column: Option<String>,
    pub formula: Option<String>,
    pub many_to_one: Option<String>,
    pub join_columns: Vec<String>,
    pub optional: Option<bool>,
    pub one_to_many: Option<String>,
    pub mapped_by: Option<String>,
    pub many_to_many: Option<String>,
    pub join_table: Option<String>,
    pub owner_columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub order_by: Option<String>,
    pub embeddable: Option<String>,
    pub attributes: Vec<AttributeMapping>,
}

impl MappingFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MetamodelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MetamodelError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, MetamodelError> {
        Ok(toml::from_str(content)?)
    }

    pub fn into_metamodel(self) -> Result<MappingMetamodel, MetamodelError> {
        let mut builder = MappingMetamodel::builder();
        for entity in self.entities {
            builder = builder.entity(entity.into_builder()?);
        }
        builder.build()
    }
}

impl MappingMetamodel {
    /// Load and validate a TOML mapping file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MetamodelError> {
        MappingFile::from_file(path)?.into_metamodel()
    }

    pub fn from_toml(content: &str) -> Result<Self, MetamodelError> {
        MappingFile::from_toml(content)?.into_metamodel()
    }
}

impl EntityMapping {
    fn into_builder(self) -> Result<EntityBuilder, MetamodelError> {
        let entity = self.name.clone();
        let mut builder = EntityBuilder::new(&self.name);
        if let Some(class) = self.class {
            builder = builder.class_name(class);
        }
        if let Some(table) = self.table {
            builder = builder.table(table);
        }
        if let Some(id) = self.id {
            let ty = parse_type(&entity, &id.name, &id.ty)?;
            builder = match &id.column {
                Some(column) => builder.id_column(&id.name, column, ty),
                None => builder.id(&id.name, ty),
            };
        }
        if let Some(d) = self.discriminator {
            let ty = parse_type(&entity, &d.column, &d.ty)?;
            builder = builder.discriminator(&d.column, ty);
        }
        if let Some(value) = self.discriminator_value {
            builder = builder.discriminator_value(value);
        }
        if let Some(super_type) = self.extends {
            builder = builder.extends(super_type);
        }
        if let Some(sql) = self.where_restriction {
            builder = builder.where_restriction(sql);
        }
        for attribute in self.attributes {
            builder = builder.attribute(attribute.into_attribute(&entity)?);
        }
        if let Some(version) = self.version {
            let ty = parse_type(&entity, &version.name, &version.ty)?;
            builder = match &version.column {
                Some(column) => builder.version_column(&version.name, column, ty),
                None => builder.version(&version.name, ty),
            };
        }
        Ok(builder)
    }
}

impl AttributeMapping {
    fn into_attribute(self, entity: &str) -> Result<Attribute, MetamodelError> {
        use inflector::Inflector;

        let invalid = |message: &str| MetamodelError::InvalidAttribute {
            entity: entity.to_string(),
            attribute: self.name.clone(),
            message: message.to_string(),
        };

        let kinds = [
            self.ty.is_some(),
            self.many_to_one.is_some(),
            self.one_to_many.is_some(),
            self.many_to_many.is_some(),
            self.embeddable.is_some(),
        ];
        if kinds.iter().filter(|k| **k).count() != 1 {
            return Err(invalid(
                "expected exactly one of type, many_to_one, one_to_many, many_to_many, embeddable",
            ));
        }

        let kind = if let Some(ty) = &self.ty {
            AttributeKind::Basic {
                column: self
                    .column
                    .clone()
                    .unwrap_or_else(|| self.name.to_snake_case()),
                ty: parse_type(entity, &self.name, ty)?,
                formula: self.formula.clone(),
            }
        } else if let Some(target) = &self.many_to_one {
            AttributeKind::ToOne {
                target: target.clone(),
                join_columns: self.join_columns.clone(),
                optional: self.optional.unwrap_or(true),
            }
        } else if let Some(target) = &self.one_to_many {
            AttributeKind::OneToMany {
                target: target.clone(),
                mapped_by: self
                    .mapped_by
                    .clone()
                    .ok_or_else(|| invalid("one_to_many requires mapped_by"))?,
                order_by: self.order_by.clone(),
            }
        } else if let Some(target) = &self.many_to_many {
            AttributeKind::ManyToMany {
                target: target.clone(),
                join_table: self.join_table.clone().unwrap_or_default(),
                owner_columns: self.owner_columns.clone(),
                target_columns: self.target_columns.clone(),
                order_by: self.order_by.clone(),
            }
        } else {
            let embeddable = self.embeddable.clone().unwrap_or_default();
            let mut attributes = Vec::with_capacity(self.attributes.len());
            for nested in self.attributes.clone() {
                let nested = nested.into_attribute(entity)?;
                if !matches!(nested.kind, AttributeKind::Basic { .. }) {
                    return Err(invalid("embeddables may only contain basic attributes"));
                }
                attributes.push(nested);
            }
            AttributeKind::Embedded {
                embeddable,
                attributes,
            }
        };

        Ok(Attribute {
            name: self.name,
            kind,
        })
    }
}

fn parse_type(entity: &str, attribute: &str, ty: &str) -> Result<BasicType, MetamodelError> {
    BasicType::from_name(ty).ok_or_else(|| MetamodelError::UnknownType {
        entity: entity.to_string(),
        attribute: attribute.to_string(),
        ty: ty.to_string(),
    })
}

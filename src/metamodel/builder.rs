//! In-memory metamodel and its builder.

use std::collections::HashMap;

use inflector::Inflector;

use super::model::{Attribute, AttributeKind, Discriminator, EntityType};
use super::{DomainModel, MetamodelError};
use crate::sqm::types::BasicType;

/// The in-memory [`DomainModel`].
#[derive(Debug, Clone, Default)]
pub struct MappingMetamodel {
    entities: Vec<EntityType>,
    index: HashMap<String, usize>,
}

impl MappingMetamodel {
    pub fn builder() -> MetamodelBuilder {
        MetamodelBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl DomainModel for MappingMetamodel {
    fn entity(&self, name: &str) -> Option<&EntityType> {
        self.index.get(name).map(|i| &self.entities[*i])
    }

    fn entities(&self) -> Vec<&EntityType> {
        self.entities.iter().collect()
    }
}

/// Collects entity definitions and validates them as a whole.
#[derive(Debug, Default)]
#[must_use = "call build() to obtain the metamodel"]
pub struct MetamodelBuilder {
    entities: Vec<EntityBuilder>,
}

impl MetamodelBuilder {
    pub fn entity(mut self, entity: EntityBuilder) -> Self {
        self.entities.push(entity);
        self
    }

    /// Resolve defaults and cross-entity references.
    pub fn build(self) -> Result<MappingMetamodel, MetamodelError> {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (i, e) in self.entities.iter().enumerate() {
            if by_name.insert(e.name.clone(), i).is_some() {
                return Err(MetamodelError::DuplicateEntity(e.name.clone()));
            }
        }

        let root_of = |start: usize| -> Result<usize, MetamodelError> {
            let mut current = start;
            let mut hops = 0;
            while let Some(parent) = &self.entities[current].super_type {
                current = *by_name.get(parent).ok_or_else(|| MetamodelError::UnknownSuperType {
                    entity: self.entities[current].name.clone(),
                    super_type: parent.clone(),
                })?;
                hops += 1;
                if hops > self.entities.len() {
                    return Err(MetamodelError::UnknownSuperType {
                        entity: self.entities[start].name.clone(),
                        super_type: parent.clone(),
                    });
                }
            }
            Ok(current)
        };

        // first pass: tables, identifiers and discriminators
        let mut entities = Vec::with_capacity(self.entities.len());
        for (i, e) in self.entities.iter().enumerate() {
            let root = &self.entities[root_of(i)?];
            let table = root.table.clone().unwrap_or_else(|| root.name.to_snake_case());
            let identifier = root
                .identifier
                .clone()
                .ok_or_else(|| MetamodelError::MissingIdentifier(e.name.clone()))?;

            let discriminator_value = match (&root.discriminator, &e.discriminator_value) {
                (None, _) => None,
                (Some(_), Some(value)) => Some(value.clone()),
                (Some(d), None) if d.ty.is_textual() => Some(format!("'{}'", e.name)),
                (Some(d), None) => {
                    return Err(MetamodelError::InvalidAttribute {
                        entity: e.name.clone(),
                        attribute: d.column.clone(),
                        message: format!("a {} discriminator needs an explicit value", d.ty),
                    })
                }
            };

            entities.push(EntityType {
                name: e.name.clone(),
                class_name: e.class_name.clone(),
                table,
                identifier,
                attributes: e.attributes.clone(),
                version: e.version.clone(),
                discriminator: if e.super_type.is_none() {
                    e.discriminator.clone()
                } else {
                    None
                },
                discriminator_value,
                super_type: e.super_type.clone(),
                where_restriction: e.where_restriction.clone(),
            });
        }

        let id_columns: HashMap<String, (String, String)> = entities
            .iter()
            .map(|e| (e.name.clone(), (e.table.clone(), e.id_column().to_string())))
            .collect();

        // second pass: association defaults
        for entity in &mut entities {
            let owner_table = entity.table.clone();
            let owner_id = entity.id_column().to_string();
            for attribute in &mut entity.attributes {
                let unknown_target = |target: &str| MetamodelError::UnknownTarget {
                    entity: entity.name.clone(),
                    attribute: attribute.name.clone(),
                    target: target.to_string(),
                };
                let attribute_name = attribute.name.to_snake_case();
                match &mut attribute.kind {
                    AttributeKind::ToOne {
                        target,
                        join_columns,
                        ..
                    } => {
                        let (_, target_id) =
                            id_columns.get(target.as_str()).ok_or_else(|| unknown_target(target))?;
                        if join_columns.is_empty() {
                            join_columns.push(format!("{attribute_name}_{target_id}"));
                        }
                    }
                    AttributeKind::OneToMany { target, .. } => {
                        if !id_columns.contains_key(target.as_str()) {
                            return Err(unknown_target(target));
                        }
                    }
                    AttributeKind::ManyToMany {
                        target,
                        join_table,
                        owner_columns,
                        target_columns,
                        ..
                    } => {
                        let (target_table, target_id) =
                            id_columns.get(target.as_str()).ok_or_else(|| unknown_target(target))?;
                        if join_table.is_empty() {
                            *join_table = format!("{owner_table}_{attribute_name}");
                        }
                        if owner_columns.is_empty() {
                            owner_columns.push(format!("{owner_table}_{owner_id}"));
                        }
                        if target_columns.is_empty() {
                            target_columns.push(format!("{target_table}_{target_id}"));
                        }
                    }
                    AttributeKind::Basic { .. } | AttributeKind::Embedded { .. } => {}
                }
            }
        }

        let mut model = MappingMetamodel {
            index: HashMap::new(),
            entities,
        };
        for (i, e) in model.entities.iter().enumerate() {
            model.index.insert(e.name.clone(), i);
            if let Some(class_name) = &e.class_name {
                model.index.entry(class_name.clone()).or_insert(i);
                if let Some(simple) = class_name.rsplit('.').next() {
                    model.index.entry(simple.to_string()).or_insert(i);
                }
            }
        }

        check_mapped_by(&model)?;
        Ok(model)
    }
}

fn check_mapped_by(model: &MappingMetamodel) -> Result<(), MetamodelError> {
    for entity in &model.entities {
        for attribute in &entity.attributes {
            if let AttributeKind::OneToMany {
                target, mapped_by, ..
            } = &attribute.kind
            {
                let valid = matches!(
                    model.find_attribute(target, mapped_by),
                    Some((_, Attribute { kind: AttributeKind::ToOne { .. }, .. }))
                );
                if !valid {
                    return Err(MetamodelError::InvalidMappedBy {
                        entity: entity.name.clone(),
                        attribute: attribute.name.clone(),
                        target: target.clone(),
                        mapped_by: mapped_by.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Definition of one entity.
///
/// Column names default to the snake-cased attribute name; to-one join
/// columns default to `<attribute>_<target id column>`.
#[derive(Debug, Clone)]
#[must_use = "builders do nothing until added to a MetamodelBuilder"]
pub struct EntityBuilder {
    name: String,
    class_name: Option<String>,
    table: Option<String>,
    identifier: Option<Attribute>,
    attributes: Vec<Attribute>,
    version: Option<String>,
    discriminator: Option<Discriminator>,
    discriminator_value: Option<String>,
    super_type: Option<String>,
    where_restriction: Option<String>,
}

impl EntityBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: None,
            table: None,
            identifier: None,
            attributes: Vec::new(),
            version: None,
            discriminator: None,
            discriminator_value: None,
            super_type: None,
            where_restriction: None,
        }
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn id(self, name: &str, ty: BasicType) -> Self {
        let column = name.to_snake_case();
        self.id_column(name, &column, ty)
    }

    pub fn id_column(mut self, name: &str, column: &str, ty: BasicType) -> Self {
        self.identifier = Some(Attribute::basic(name, column, ty));
        self
    }

    pub fn basic(self, name: &str, ty: BasicType) -> Self {
        let column = name.to_snake_case();
        self.basic_column(name, &column, ty)
    }

    pub fn basic_column(self, name: &str, column: &str, ty: BasicType) -> Self {
        self.attribute(Attribute::basic(name, column, ty))
    }

    /// Read-only attribute computed by a SQL fragment over the entity's columns.
    pub fn formula(self, name: &str, sql: &str, ty: BasicType) -> Self {
        self.attribute(Attribute {
            name: name.to_string(),
            kind: AttributeKind::Basic {
                column: name.to_snake_case(),
                ty,
                formula: Some(sql.to_string()),
            },
        })
    }

    pub fn embedded(self, name: &str, embeddable: &str, attributes: Vec<Attribute>) -> Self {
        self.attribute(Attribute {
            name: name.to_string(),
            kind: AttributeKind::Embedded {
                embeddable: embeddable.to_string(),
                attributes,
            },
        })
    }

    pub fn many_to_one(self, name: &str, target: &str) -> Self {
        self.many_to_one_columns(name, target, &[])
    }

    pub fn many_to_one_columns(self, name: &str, target: &str, join_columns: &[&str]) -> Self {
        self.attribute(Attribute {
            name: name.to_string(),
            kind: AttributeKind::ToOne {
                target: target.to_string(),
                join_columns: join_columns.iter().map(|c| c.to_string()).collect(),
                optional: true,
            },
        })
    }

    pub fn one_to_many(self, name: &str, target: &str, mapped_by: &str) -> Self {
        self.attribute(Attribute {
            name: name.to_string(),
            kind: AttributeKind::OneToMany {
                target: target.to_string(),
                mapped_by: mapped_by.to_string(),
                order_by: None,
            },
        })
    }

    pub fn many_to_many(self, name: &str, target: &str) -> Self {
        self.attribute(Attribute {
            name: name.to_string(),
            kind: AttributeKind::ManyToMany {
                target: target.to_string(),
                join_table: String::new(),
                owner_columns: Vec::new(),
                target_columns: Vec::new(),
                order_by: None,
            },
        })
    }

    /// Order applied when the collection `name` is fetched, as a SQL
    /// fragment over the element table's columns.
    pub fn collection_order_by(mut self, name: &str, fragment: &str) -> Self {
        if let Some(attribute) = self.attributes.iter_mut().find(|a| a.name == name) {
            if let AttributeKind::OneToMany { order_by, .. }
            | AttributeKind::ManyToMany { order_by, .. } = &mut attribute.kind
            {
                *order_by = Some(fragment.to_string());
            }
        }
        self
    }

    pub fn version(self, name: &str, ty: BasicType) -> Self {
        let column = name.to_snake_case();
        self.version_column(name, &column, ty)
    }

    pub fn version_column(mut self, name: &str, column: &str, ty: BasicType) -> Self {
        self.version = Some(name.to_string());
        self.basic_column(name, column, ty)
    }

    pub fn discriminator(mut self, column: &str, ty: BasicType) -> Self {
        self.discriminator = Some(Discriminator {
            column: column.to_string(),
            ty,
        });
        self
    }

    pub fn discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }

    pub fn extends(mut self, super_type: impl Into<String>) -> Self {
        self.super_type = Some(super_type.into());
        self
    }

    pub fn where_restriction(mut self, sql: impl Into<String>) -> Self {
        self.where_restriction = Some(sql.into());
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        // later definitions replace earlier ones in place
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> MappingMetamodel {
        MappingMetamodel::builder()
            .entity(
                EntityBuilder::new("Person")
                    .id("id", BasicType::Long)
                    .basic("name", BasicType::String),
            )
            .entity(
                EntityBuilder::new("Publication")
                    .class_name("org.example.Publication")
                    .id("id", BasicType::Long)
                    .basic("publishedOn", BasicType::Date)
                    .many_to_one("author", "Person")
                    .many_to_many("tags", "Tag")
                    .discriminator("kind", BasicType::String),
            )
            .entity(
                EntityBuilder::new("Novel")
                    .extends("Publication")
                    .basic("genre", BasicType::String),
            )
            .entity(EntityBuilder::new("Tag").id("id", BasicType::Long))
            .build()
            .unwrap()
    }

    #[test]
    fn test_naming_defaults() {
        let model = library();
        let publication = model.entity("Publication").unwrap();
        assert_eq!(publication.table, "publication");
        let (_, published_on) = model.find_attribute("Publication", "publishedOn").unwrap();
        assert_eq!(published_on.owned_columns(), vec!["published_on"]);
        let (_, author) = model.find_attribute("Publication", "author").unwrap();
        assert_eq!(author.owned_columns(), vec!["author_id"]);
    }

    #[test]
    fn test_many_to_many_defaults() {
        let model = library();
        let (_, tags) = model.find_attribute("Publication", "tags").unwrap();
        match &tags.kind {
            AttributeKind::ManyToMany {
                join_table,
                owner_columns,
                target_columns,
                ..
            } => {
                assert_eq!(join_table, "publication_tags");
                assert_eq!(owner_columns, &vec!["publication_id".to_string()]);
                assert_eq!(target_columns, &vec!["tag_id".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_single_table_inheritance() {
        let model = library();
        let novel = model.entity("Novel").unwrap();
        assert_eq!(novel.table, "publication");
        assert_eq!(novel.id_column(), "id");
        assert_eq!(novel.discriminator_value.as_deref(), Some("'Novel'"));
        assert!(model.find_attribute("Novel", "author").is_some());
        assert!(model.find_attribute("Publication", "genre").is_none());
        assert_eq!(
            model.discriminator_values("Publication"),
            vec!["'Publication'".to_string(), "'Novel'".to_string()]
        );
        assert_eq!(model.discriminator("Novel").unwrap().column, "kind");
    }

    #[test]
    fn test_lookup_by_class_name() {
        let model = library();
        assert_eq!(model.entity("org.example.Publication").unwrap().name, "Publication");
        assert!(model.entity("Missing").is_none());
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = MappingMetamodel::builder()
            .entity(EntityBuilder::new("A").id("id", BasicType::Long))
            .entity(EntityBuilder::new("A").id("id", BasicType::Long))
            .build();
        assert!(matches!(duplicate, Err(MetamodelError::DuplicateEntity(_))));

        let unknown = MappingMetamodel::builder()
            .entity(
                EntityBuilder::new("A")
                    .id("id", BasicType::Long)
                    .many_to_one("b", "B"),
            )
            .build();
        assert!(matches!(unknown, Err(MetamodelError::UnknownTarget { .. })));

        let no_id = MappingMetamodel::builder().entity(EntityBuilder::new("A")).build();
        assert!(matches!(no_id, Err(MetamodelError::MissingIdentifier(_))));

        let bad_mapped_by = MappingMetamodel::builder()
            .entity(
                EntityBuilder::new("A")
                    .id("id", BasicType::Long)
                    .one_to_many("bs", "B", "owner"),
            )
            .entity(EntityBuilder::new("B").id("id", BasicType::Long))
            .build();
        assert!(matches!(bad_mapped_by, Err(MetamodelError::InvalidMappedBy { .. })));
    }
}

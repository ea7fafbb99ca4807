//! Entity and attribute descriptors.

use serde::Serialize;

use crate::sqm::types::{BasicType, SqmExpressible};

/// A mapped entity.
///
/// Subtypes use single-table inheritance: they share the table of the root of
/// their hierarchy and are told apart by the discriminator column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityType {
    /// Name used in queries (`Book`).
    pub name: String,
    /// Fully qualified class name, if mapped (`com.acme.Book`).
    pub class_name: Option<String>,
    pub table: String,
    pub identifier: Attribute,
    /// Declared attributes, in declaration order. Inherited attributes are
    /// found through [`DomainModel::find_attribute`](super::DomainModel::find_attribute).
    pub attributes: Vec<Attribute>,
    /// Name of the version attribute, if versioned.
    pub version: Option<String>,
    /// Discriminator column; only set on the root of a hierarchy.
    pub discriminator: Option<Discriminator>,
    /// Discriminator value as SQL literal text (`'Novel'`).
    pub discriminator_value: Option<String>,
    pub super_type: Option<String>,
    /// Mapping-author SQL restriction applied to every query of this entity.
    pub where_restriction: Option<String>,
}

impl EntityType {
    /// Declared attribute by name, including the identifier.
    pub fn declared_attribute(&self, name: &str) -> Option<&Attribute> {
        if self.identifier.name == name {
            return Some(&self.identifier);
        }
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn id_column(&self) -> &str {
        match &self.identifier.kind {
            AttributeKind::Basic { column, .. } => column,
            // identifiers are always basic; the builder rejects anything else
            _ => "id",
        }
    }

    pub fn id_type(&self) -> BasicType {
        match &self.identifier.kind {
            AttributeKind::Basic { ty, .. } => *ty,
            _ => BasicType::Long,
        }
    }

    pub fn version_attribute(&self) -> Option<&Attribute> {
        self.version
            .as_deref()
            .and_then(|name| self.declared_attribute(name))
    }

    /// Whether the simple name or the class name matches.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
            || self.class_name.as_deref() == Some(name)
            || self
                .class_name
                .as_deref()
                .and_then(|c| c.rsplit('.').next())
                == Some(name)
    }
}

/// Discriminator column of an inheritance hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discriminator {
    pub column: String,
    pub ty: BasicType,
}

/// A named attribute of an entity or embeddable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

/// What an attribute maps to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// One column, or a read-only SQL formula.
    Basic {
        column: String,
        ty: BasicType,
        formula: Option<String>,
    },
    /// Embedded value whose basic attributes live in the owner's table.
    Embedded {
        embeddable: String,
        attributes: Vec<Attribute>,
    },
    /// Many-to-one or one-to-one owned through foreign key columns.
    ToOne {
        target: String,
        join_columns: Vec<String>,
        optional: bool,
    },
    /// Inverse side of a `ToOne` on the target.
    OneToMany {
        target: String,
        mapped_by: String,
        order_by: Option<String>,
    },
    ManyToMany {
        target: String,
        join_table: String,
        owner_columns: Vec<String>,
        target_columns: Vec<String>,
        order_by: Option<String>,
    },
}

impl Attribute {
    pub fn basic(name: impl Into<String>, column: impl Into<String>, ty: BasicType) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Basic {
                column: column.into(),
                ty,
                formula: None,
            },
        }
    }

    pub fn is_plural(&self) -> bool {
        matches!(
            self.kind,
            AttributeKind::OneToMany { .. } | AttributeKind::ManyToMany { .. }
        )
    }

    pub fn is_association(&self) -> bool {
        matches!(self.kind, AttributeKind::ToOne { .. }) || self.is_plural()
    }

    /// Target entity of an association.
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            AttributeKind::ToOne { target, .. }
            | AttributeKind::OneToMany { target, .. }
            | AttributeKind::ManyToMany { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Columns in the owner's table, in selection order.
    pub fn owned_columns(&self) -> Vec<&str> {
        match &self.kind {
            AttributeKind::Basic { column, formula: None, .. } => vec![column.as_str()],
            AttributeKind::Basic { .. } => Vec::new(),
            AttributeKind::Embedded { attributes, .. } => {
                attributes.iter().flat_map(Attribute::owned_columns).collect()
            }
            AttributeKind::ToOne { join_columns, .. } => {
                join_columns.iter().map(String::as_str).collect()
            }
            AttributeKind::OneToMany { .. } | AttributeKind::ManyToMany { .. } => Vec::new(),
        }
    }

    /// Semantic type of a path ending at this attribute.
    pub fn expressible(&self) -> SqmExpressible {
        match &self.kind {
            AttributeKind::Basic { ty, .. } => SqmExpressible::Basic(*ty),
            AttributeKind::Embedded { embeddable, .. } => {
                SqmExpressible::Embeddable(embeddable.clone())
            }
            AttributeKind::ToOne { target, .. }
            | AttributeKind::OneToMany { target, .. }
            | AttributeKind::ManyToMany { target, .. } => SqmExpressible::Entity(target.clone()),
        }
    }

    /// Nested attribute of an embedded value.
    pub fn sub_attribute(&self, name: &str) -> Option<&Attribute> {
        match &self.kind {
            AttributeKind::Embedded { attributes, .. } => {
                attributes.iter().find(|a| a.name == name)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Attribute {
        Attribute {
            name: "author".into(),
            kind: AttributeKind::ToOne {
                target: "Person".into(),
                join_columns: vec!["author_id".into()],
                optional: true,
            },
        }
    }

    #[test]
    fn test_owned_columns() {
        assert_eq!(author().owned_columns(), vec!["author_id"]);
        let address = Attribute {
            name: "address".into(),
            kind: AttributeKind::Embedded {
                embeddable: "Address".into(),
                attributes: vec![
                    Attribute::basic("city", "city", BasicType::String),
                    Attribute::basic("zip", "zip_code", BasicType::String),
                ],
            },
        };
        assert_eq!(address.owned_columns(), vec!["city", "zip_code"]);
        assert_eq!(address.sub_attribute("zip").map(|a| a.name.as_str()), Some("zip"));
    }

    #[test]
    fn test_association_classification() {
        let author = author();
        assert!(author.is_association());
        assert!(!author.is_plural());
        assert_eq!(author.target(), Some("Person"));
        assert_eq!(author.expressible(), SqmExpressible::Entity("Person".into()));
    }
}

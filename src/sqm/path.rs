//! Navigable paths and path expressions.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

use super::error::{SqmError, SqmResult};
use super::types::SqmExpressible;
use crate::metamodel::{AttributeKind, DomainModel};

static NEXT_FROM_ID: AtomicU32 = AtomicU32::new(1);
static NEXT_PARAM_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a from-clause node. Paths refer to their from node by id,
/// never by reference, so trees can be copied and re-pointed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FromId(u32);

impl FromId {
    pub fn next() -> Self {
        FromId(NEXT_FROM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a parameter node; occurrences of one parameter share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParamId(u32);

impl ParamId {
    pub fn next() -> Self {
        ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Dot-qualified logical path of a from node or attribute, with aliases in
/// parentheses: `Book(b).author(a).name`.
///
/// Used as the identity key for implicit-join reuse and locking roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NavigablePath(String);

impl NavigablePath {
    pub fn root(name: &str, alias: Option<&str>) -> Self {
        NavigablePath(with_alias(name, alias))
    }

    pub fn append(&self, name: &str, alias: Option<&str>) -> Self {
        NavigablePath(format!("{}.{}", self.0, with_alias(name, alias)))
    }

    pub fn treat_as(&self, entity: &str) -> Self {
        NavigablePath(format!("{}.treat({entity})", self.0))
    }

    pub fn full_path(&self) -> &str {
        &self.0
    }

    /// Path this one was appended to.
    pub fn parent(&self) -> Option<NavigablePath> {
        let mut depth = 0usize;
        for (i, c) in self.0.char_indices().rev() {
            match c {
                ')' => depth += 1,
                '(' => depth = depth.saturating_sub(1),
                '.' if depth == 0 => return Some(NavigablePath(self.0[..i].to_string())),
                _ => {}
            }
        }
        None
    }

    pub fn is_parent_of(&self, other: &NavigablePath) -> bool {
        other.parent().as_ref() == Some(self)
    }
}

fn with_alias(name: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("{name}({alias})"),
        None => name.to_string(),
    }
}

impl std::fmt::Display for NavigablePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One step of a path below its from node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Attribute(String),
    Treat(String),
}

/// A column of a derived table, CTE or function join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedColumn {
    pub name: String,
    pub expressible: Option<SqmExpressible>,
}

/// What a path points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Single column; cannot be dereferenced further.
    Basic,
    /// Embedded value of `owner.attribute`.
    Embedded { owner: String, attribute: String },
    Entity { entity: String },
    /// Collection whose elements are `element` entities.
    Plural { element: String },
    /// Discriminator of an entity path, as produced by `type(x)`.
    Discriminator { entity: String },
    /// Row of a derived table, CTE or set-returning function.
    Derived { columns: Vec<DerivedColumn> },
}

/// A navigable reference relative to a from node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqmPath {
    pub lhs: FromId,
    pub segments: Vec<PathSegment>,
    pub navigable_path: NavigablePath,
    pub kind: PathKind,
    pub expressible: Option<SqmExpressible>,
}

impl SqmPath {
    /// The path denoting the from node itself.
    pub fn of_from(lhs: FromId, navigable_path: NavigablePath, kind: PathKind) -> Self {
        let expressible = match &kind {
            PathKind::Entity { entity } => Some(SqmExpressible::Entity(entity.clone())),
            _ => None,
        };
        Self {
            lhs,
            segments: Vec::new(),
            navigable_path,
            kind,
            expressible,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, PathKind::Basic | PathKind::Discriminator { .. })
    }

    pub fn is_from_reference(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn entity_name(&self) -> Option<&str> {
        match &self.kind {
            PathKind::Entity { entity } => Some(entity),
            PathKind::Plural { element } => Some(element),
            _ => None,
        }
    }

    pub fn last_attribute(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| match s {
            PathSegment::Attribute(name) => Some(name.as_str()),
            PathSegment::Treat(_) => None,
        })
    }

    /// Dereference `name`, resolving it against the metamodel.
    pub fn get(&self, model: &dyn DomainModel, name: &str) -> SqmResult<SqmPath> {
        let (kind, expressible) = match &self.kind {
            PathKind::Basic | PathKind::Discriminator { .. } => {
                return Err(SqmError::TerminalPathDereference {
                    path: self.navigable_path.to_string(),
                    attribute: name.to_string(),
                })
            }
            PathKind::Plural { .. } => {
                return Err(SqmError::IllegalPathUsage(format!(
                    "Plural path '{}' cannot be dereferenced; join it to access '{name}'",
                    self.navigable_path
                )))
            }
            PathKind::Derived { columns } => {
                let column = columns.iter().find(|c| c.name == name).ok_or_else(|| {
                    SqmError::UnknownPathElement {
                        container: self.navigable_path.to_string(),
                        attribute: name.to_string(),
                    }
                })?;
                (PathKind::Basic, column.expressible.clone())
            }
            PathKind::Embedded { owner, attribute } => {
                let nested = model
                    .find_attribute(owner, attribute)
                    .and_then(|(_, a)| a.sub_attribute(name))
                    .ok_or_else(|| SqmError::UnknownPathElement {
                        container: self.navigable_path.to_string(),
                        attribute: name.to_string(),
                    })?;
                (PathKind::Basic, Some(nested.expressible()))
            }
            PathKind::Entity { entity } => {
                let (declaring, attribute) =
                    model.find_attribute(entity, name).ok_or_else(|| {
                        SqmError::UnknownPathElement {
                            container: entity.clone(),
                            attribute: name.to_string(),
                        }
                    })?;
                let kind = match &attribute.kind {
                    AttributeKind::Basic { .. } => PathKind::Basic,
                    AttributeKind::Embedded { .. } => PathKind::Embedded {
                        owner: declaring.name.clone(),
                        attribute: attribute.name.clone(),
                    },
                    AttributeKind::ToOne { target, .. } => PathKind::Entity {
                        entity: target.clone(),
                    },
                    AttributeKind::OneToMany { target, .. }
                    | AttributeKind::ManyToMany { target, .. } => PathKind::Plural {
                        element: target.clone(),
                    },
                };
                (kind, Some(attribute.expressible()))
            }
        };

        let mut segments = self.segments.clone();
        segments.push(PathSegment::Attribute(name.to_string()));
        Ok(SqmPath {
            lhs: self.lhs,
            segments,
            navigable_path: self.navigable_path.append(name, None),
            kind,
            expressible,
        })
    }

    /// `treat(path as Subtype)`.
    pub fn treat_as(&self, model: &dyn DomainModel, entity: &str) -> SqmResult<SqmPath> {
        let current = match &self.kind {
            PathKind::Entity { entity } | PathKind::Plural { element: entity } => entity,
            PathKind::Discriminator { .. } => {
                return Err(SqmError::TreatMisuse(format!(
                    "treat() cannot be applied to the discriminator path '{}'",
                    self.navigable_path
                )))
            }
            _ => {
                return Err(SqmError::TreatMisuse(format!(
                    "treat() requires an entity-valued path, '{}' is not one",
                    self.navigable_path
                )))
            }
        };
        let target = model
            .entity(entity)
            .ok_or_else(|| SqmError::UnknownEntity(entity.to_string()))?;
        if !model.is_subtype_of(&target.name, current) {
            return Err(SqmError::TreatMisuse(format!(
                "'{}' is not a subtype of '{current}'",
                target.name
            )));
        }

        let mut segments = self.segments.clone();
        segments.push(PathSegment::Treat(target.name.clone()));
        let kind = match self.kind {
            PathKind::Plural { .. } => PathKind::Plural {
                element: target.name.clone(),
            },
            _ => PathKind::Entity {
                entity: target.name.clone(),
            },
        };
        Ok(SqmPath {
            lhs: self.lhs,
            segments,
            navigable_path: self.navigable_path.treat_as(&target.name),
            kind,
            expressible: Some(SqmExpressible::Entity(target.name.clone())),
        })
    }

    /// `type(path)`: the discriminator of an entity path.
    pub fn discriminator(&self) -> SqmResult<SqmPath> {
        let entity = match &self.kind {
            PathKind::Entity { entity } => entity.clone(),
            _ => {
                return Err(SqmError::IllegalPathUsage(format!(
                    "type() requires an entity-valued path, '{}' is not one",
                    self.navigable_path
                )))
            }
        };
        Ok(SqmPath {
            lhs: self.lhs,
            segments: self.segments.clone(),
            navigable_path: self.navigable_path.append("{type}", None),
            kind: PathKind::Discriminator { entity },
            expressible: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigable_path_rendering() {
        let root = NavigablePath::root("Book", Some("b"));
        let author = root.append("author", None);
        assert_eq!(author.to_string(), "Book(b).author");
        assert_eq!(author.append("name", None).to_string(), "Book(b).author.name");
        assert_eq!(root.append("chapters", Some("c")).to_string(), "Book(b).chapters(c)");
    }

    #[test]
    fn test_parent_skips_aliases() {
        let path = NavigablePath::root("Book", Some("b")).append("author", Some("a.x"));
        assert_eq!(path.parent(), Some(NavigablePath::root("Book", Some("b"))));
        assert!(NavigablePath::root("Book", Some("b")).is_parent_of(&path));
        assert_eq!(NavigablePath::root("Book", None).parent(), None);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(FromId::next(), FromId::next());
        assert_ne!(ParamId::next(), ParamId::next());
    }
}

//! From-clause nodes: roots, joins and correlations.

use super::expression::SqmExpression;
use super::operator::SqmJoinType;
use super::path::{DerivedColumn, FromId, NavigablePath, PathKind, SqmPath};
use super::predicate::SqmPredicate;
use super::statement::SqmQuery;

/// Where the rows of a from node come from.
#[derive(Debug, Clone, PartialEq)]
pub enum FromSource {
    /// An entity root, or an entity join (`join Author a on ...`).
    Entity(String),
    /// An attribute join of the parent node, optionally treated.
    Attribute {
        attribute: String,
        treat: Option<String>,
    },
    /// A root of a subquery standing for a from node of an enclosing query.
    Correlated { outer: FromId },
    /// `from (select ...) d` or `join lateral (select ...) d`.
    Derived {
        query: Box<SqmQuery>,
        lateral: bool,
        columns: Vec<DerivedColumn>,
    },
    /// Reference to a CTE declared by the statement.
    Cte {
        name: String,
        columns: Vec<DerivedColumn>,
    },
    /// Set-returning function.
    Function {
        name: String,
        arguments: Vec<SqmExpression>,
        columns: Vec<DerivedColumn>,
    },
}

/// How a join node attaches to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    pub join_type: SqmJoinType,
    pub fetch: bool,
    pub on: Option<SqmPredicate>,
}

/// A root or join of a from clause. Joins are owned by the node they hang off.
#[derive(Debug, Clone, PartialEq)]
pub struct SqmFrom {
    pub id: FromId,
    pub source: FromSource,
    pub alias: Option<String>,
    pub navigable_path: NavigablePath,
    /// Entity type of the rows, for entity-valued nodes.
    pub entity: Option<String>,
    pub joins: Vec<SqmFrom>,
    /// `None` for roots.
    pub join: Option<JoinInfo>,
}

impl SqmFrom {
    pub fn root(entity: impl Into<String>, alias: Option<String>) -> Self {
        let entity = entity.into();
        Self {
            id: FromId::next(),
            navigable_path: NavigablePath::root(&entity, alias.as_deref()),
            source: FromSource::Entity(entity.clone()),
            alias,
            entity: Some(entity),
            joins: Vec::new(),
            join: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.join.is_none()
    }

    pub fn is_fetched(&self) -> bool {
        self.join.as_ref().is_some_and(|j| j.fetch)
    }

    pub fn join_type(&self) -> Option<SqmJoinType> {
        self.join.as_ref().map(|j| j.join_type)
    }

    /// Columns exposed by derived, CTE and function nodes.
    pub fn derived_columns(&self) -> Option<&[DerivedColumn]> {
        match &self.source {
            FromSource::Derived { columns, .. }
            | FromSource::Cte { columns, .. }
            | FromSource::Function { columns, .. } => Some(columns),
            _ => None,
        }
    }

    /// The path denoting this node.
    pub fn path(&self) -> SqmPath {
        let kind = match (&self.entity, self.derived_columns()) {
            (_, Some(columns)) => PathKind::Derived {
                columns: columns.to_vec(),
            },
            (Some(entity), None) => PathKind::Entity {
                entity: entity.clone(),
            },
            (None, None) => PathKind::Derived {
                columns: Vec::new(),
            },
        };
        SqmPath::of_from(self.id, self.navigable_path.clone(), kind)
    }

    /// Attach a join below this node.
    pub fn add_join(&mut self, join: SqmFrom) {
        self.joins.push(join);
    }

    /// Attach a restriction to the join; repeated calls conjoin.
    pub fn apply_on(&mut self, predicate: SqmPredicate) {
        if let Some(info) = self.join.as_mut() {
            info.on = Some(match info.on.take() {
                Some(existing) => SqmPredicate::and(existing, predicate),
                None => predicate,
            });
        }
    }

    /// This node and every join below it, depth first.
    pub fn walk(&self) -> Vec<&SqmFrom> {
        let mut out = vec![self];
        for join in &self.joins {
            out.extend(join.walk());
        }
        out
    }

    pub fn find(&self, id: FromId) -> Option<&SqmFrom> {
        if self.id == id {
            return Some(self);
        }
        self.joins.iter().find_map(|j| j.find(id))
    }

    pub fn find_mut(&mut self, id: FromId) -> Option<&mut SqmFrom> {
        if self.id == id {
            return Some(self);
        }
        self.joins.iter_mut().find_map(|j| j.find_mut(id))
    }

    pub fn find_by_alias(&self, alias: &str) -> Option<&SqmFrom> {
        self.walk()
            .into_iter()
            .find(|f| f.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(alias)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path() {
        let root = SqmFrom::root("Book", Some("b".into()));
        assert_eq!(root.navigable_path.to_string(), "Book(b)");
        let path = root.path();
        assert_eq!(path.lhs, root.id);
        assert_eq!(path.entity_name(), Some("Book"));
        assert!(root.is_root());
    }

    #[test]
    fn test_find_nested_join() {
        let mut root = SqmFrom::root("Book", Some("b".into()));
        let mut author = SqmFrom::root("Person", Some("a".into()));
        author.join = Some(JoinInfo {
            join_type: SqmJoinType::Left,
            fetch: false,
            on: None,
        });
        let author_id = author.id;
        root.add_join(author);

        assert_eq!(root.find(author_id).map(|f| f.alias.as_deref()), Some(Some("a")));
        assert!(root.find_by_alias("A").is_some());
        assert_eq!(root.walk().len(), 2);
    }
}

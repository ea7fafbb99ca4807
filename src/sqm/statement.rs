//! Query parts and statements.

use super::error::{SqmError, SqmResult};
use super::expression::SqmExpression;
use super::from::SqmFrom;
use super::operator::{FetchClauseType, NullPrecedence, SetOperator, SortDirection};
use super::path::{FromId, SqmPath};
use super::predicate::{combine_predicates, SqmPredicate};
use super::types::SqmExpressible;

/// Where a statement was built; reported in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqmQuerySource {
    #[default]
    Hql,
    Criteria,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSortSpec {
    pub expr: SqmExpression,
    pub direction: SortDirection,
    pub nulls: NullPrecedence,
}

impl SqmSortSpec {
    pub fn new(expr: SqmExpression, direction: SortDirection) -> Self {
        Self {
            expr,
            direction,
            nulls: NullPrecedence::None,
        }
    }
}

/// Result class of `select new ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiationTarget {
    List,
    Map,
    Class(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmDynamicInstantiation {
    pub target: InstantiationTarget,
    pub arguments: Vec<SqmSelection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmSelectable {
    Expression(SqmExpression),
    Instantiation(SqmDynamicInstantiation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSelection {
    pub item: SqmSelectable,
    pub alias: Option<String>,
}

impl SqmSelection {
    pub fn expression(expr: SqmExpression) -> Self {
        Self {
            item: SqmSelectable::Expression(expr),
            alias: None,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl From<SqmExpression> for SqmSelection {
    fn from(expr: SqmExpression) -> Self {
        SqmSelection::expression(expr)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqmSelectClause {
    pub distinct: bool,
    pub selections: Vec<SqmSelection>,
}

/// One `select ... from ... where ... group by ... having ...` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqmQuerySpec {
    pub from: Vec<SqmFrom>,
    pub select: SqmSelectClause,
    pub where_: Option<SqmPredicate>,
    pub group_by: Vec<SqmExpression>,
    pub having: Option<SqmPredicate>,
}

impl SqmQuerySpec {
    /// Add a root, rejecting aliases already used in this block.
    pub fn add_root(&mut self, root: SqmFrom) -> SqmResult<()> {
        for from in root.walk() {
            self.check_alias(from.alias.as_deref())?;
        }
        self.from.push(root);
        Ok(())
    }

    /// Attach `join` below the node `parent`.
    pub fn add_join(&mut self, parent: FromId, join: SqmFrom) -> SqmResult<()> {
        for from in join.walk() {
            self.check_alias(from.alias.as_deref())?;
        }
        let node = self
            .from
            .iter_mut()
            .find_map(|root| root.find_mut(parent))
            .ok_or_else(|| SqmError::interpretation("join parent is not part of this query"))?;
        node.add_join(join);
        Ok(())
    }

    fn check_alias(&self, alias: Option<&str>) -> SqmResult<()> {
        let Some(alias) = alias else { return Ok(()) };
        if self.find_by_alias(alias).is_some() {
            return Err(SqmError::AliasCollision {
                alias: alias.to_string(),
                context: "from clause".into(),
            });
        }
        Ok(())
    }

    pub fn find_from(&self, id: FromId) -> Option<&SqmFrom> {
        self.from.iter().find_map(|r| r.find(id))
    }

    pub fn find_by_alias(&self, alias: &str) -> Option<&SqmFrom> {
        self.from.iter().find_map(|r| r.find_by_alias(alias))
    }

    /// Conjoin a restriction: `existing and predicate`.
    pub fn apply_predicate(&mut self, predicate: SqmPredicate) {
        self.where_ = Some(combine_predicates(self.where_.take(), predicate));
    }

    pub fn add_selection(&mut self, selection: SqmSelection) {
        self.select.selections.push(selection);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmQueryPart {
    Spec(Box<SqmQuerySpec>),
    /// Set operation; every part may carry its own ordering and limits.
    Group { op: SetOperator, parts: Vec<SqmQuery> },
}

/// A query part plus the clauses that apply to its result.
#[derive(Debug, Clone, PartialEq)]
pub struct SqmQuery {
    pub part: SqmQueryPart,
    pub order_by: Vec<SqmSortSpec>,
    pub offset: Option<SqmExpression>,
    pub fetch: Option<SqmExpression>,
    pub fetch_type: FetchClauseType,
}

impl SqmQuery {
    pub fn new(spec: SqmQuerySpec) -> Self {
        Self {
            part: SqmQueryPart::Spec(Box::new(spec)),
            order_by: Vec::new(),
            offset: None,
            fetch: None,
            fetch_type: FetchClauseType::RowsOnly,
        }
    }

    /// The first query spec, walking into set operations.
    pub fn first_spec(&self) -> Option<&SqmQuerySpec> {
        match &self.part {
            SqmQueryPart::Spec(spec) => Some(spec),
            SqmQueryPart::Group { parts, .. } => parts.first().and_then(SqmQuery::first_spec),
        }
    }

    pub fn spec_mut(&mut self) -> Option<&mut SqmQuerySpec> {
        match &mut self.part {
            SqmQueryPart::Spec(spec) => Some(spec),
            SqmQueryPart::Group { .. } => None,
        }
    }

    /// Type of a query used as a scalar subquery.
    pub fn single_selection_type(&self) -> Option<SqmExpressible> {
        let spec = self.first_spec()?;
        match spec.select.selections.as_slice() {
            [SqmSelection {
                item: SqmSelectable::Expression(expr),
                ..
            }] => expr.expressible(),
            _ => None,
        }
    }

    pub fn has_limit(&self) -> bool {
        self.offset.is_some() || self.fetch.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmCte {
    pub name: String,
    pub columns: Vec<String>,
    pub query: SqmQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSelectStatement {
    pub ctes: Vec<SqmCte>,
    pub query: SqmQuery,
    pub source: SqmQuerySource,
}

impl SqmSelectStatement {
    pub fn new(query: SqmQuery, source: SqmQuerySource) -> Self {
        Self {
            ctes: Vec::new(),
            query,
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmAssignment {
    pub path: SqmPath,
    pub value: SqmExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmUpdateStatement {
    pub target: SqmFrom,
    pub versioned: bool,
    pub assignments: Vec<SqmAssignment>,
    pub where_: Option<SqmPredicate>,
    pub source: SqmQuerySource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmDeleteStatement {
    pub target: SqmFrom,
    pub where_: Option<SqmPredicate>,
    pub source: SqmQuerySource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmInsertSource {
    Select(SqmQuery),
    Values(Vec<Vec<SqmExpression>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmInsertStatement {
    pub target: SqmFrom,
    pub paths: Vec<SqmPath>,
    pub values: SqmInsertSource,
    pub source: SqmQuerySource,
}

/// A complete statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqmStatement {
    Select(SqmSelectStatement),
    Update(SqmUpdateStatement),
    Delete(SqmDeleteStatement),
    Insert(SqmInsertStatement),
}

impl SqmStatement {
    pub fn source(&self) -> SqmQuerySource {
        match self {
            SqmStatement::Select(s) => s.source,
            SqmStatement::Update(s) => s.source,
            SqmStatement::Delete(s) => s.source,
            SqmStatement::Insert(s) => s.source,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, SqmStatement::Select(_))
    }

    /// Conjoin a restriction onto the statement's where clause.
    ///
    /// Set operations and inserts have no single where clause.
    pub fn apply_predicate(&mut self, predicate: SqmPredicate) -> SqmResult<()> {
        match self {
            SqmStatement::Select(s) => match s.query.spec_mut() {
                Some(spec) => spec.apply_predicate(predicate),
                None => {
                    return Err(SqmError::IllegalPathUsage(
                        "cannot restrict a set operation as a whole".into(),
                    ))
                }
            },
            SqmStatement::Update(s) => s.where_ = Some(combine_predicates(s.where_.take(), predicate)),
            SqmStatement::Delete(s) => s.where_ = Some(combine_predicates(s.where_.take(), predicate)),
            SqmStatement::Insert(_) => {
                return Err(SqmError::IllegalPathUsage(
                    "insert statements have no where clause".into(),
                ))
            }
        }
        Ok(())
    }
}

//! SQL AST produced by translation.
//!
//! The tree is dialect-aware but not yet text: table groups carry their
//! generated aliases and join keys, expressions reference columns by
//! qualifier and name. [`render`] turns a statement into SQL and parameter
//! bindings through the fragment builders.

pub mod render;

use crate::sql::lock::LockOptions;
use crate::sqm::expression::{LiteralValue, ParamLabel, Quantifier};
use crate::sqm::operator::{
    BinaryArithmeticOperator, BooleanOperator, CastType, ComparisonOperator, FetchClauseType,
    FrameExclusion, FrameKind, FrameMode, NullPrecedence, SetOperator, SortDirection, SqmJoinType,
    TrimSpec,
};
use crate::sqm::path::{NavigablePath, ParamId};
use crate::sqm::types::SqmExpressible;

pub use render::{JdbcOperation, JdbcParameterBinding, SqlRenderer};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Insert(InsertStatement),
}

impl SqlStatement {
    /// Tables read or written by the statement, in first-seen order.
    pub fn affected_tables(&self) -> Vec<String> {
        let mut tables = Vec::new();
        match self {
            SqlStatement::Select(select) => {
                for cte in &select.ctes {
                    collect_query_tables(&cte.query, &mut tables);
                }
                collect_query_tables(&select.query, &mut tables);
            }
            SqlStatement::Update(update) => push_unique(&mut tables, &update.table),
            SqlStatement::Delete(delete) => push_unique(&mut tables, &delete.table),
            SqlStatement::Insert(insert) => push_unique(&mut tables, &insert.table),
        }
        tables
    }
}

fn push_unique(tables: &mut Vec<String>, table: &str) {
    if !tables.iter().any(|t| t == table) {
        tables.push(table.to_string());
    }
}

fn collect_query_tables(query: &Query, tables: &mut Vec<String>) {
    match &query.body {
        QueryBody::Spec(spec) => {
            for root in &spec.from {
                collect_group_tables(root, tables);
            }
        }
        QueryBody::Group { parts, .. } => {
            for part in parts {
                collect_query_tables(part, tables);
            }
        }
    }
}

fn collect_group_tables(group: &TableGroup, tables: &mut Vec<String>) {
    if let Some(association) = &group.association_table {
        push_unique(tables, &association.table);
    }
    match &group.table {
        TableReference::Named { table } => push_unique(tables, table),
        TableReference::Derived { query, .. } => collect_query_tables(query, tables),
        TableReference::Cte { .. } => {}
    }
    for join in &group.joins {
        collect_group_tables(&join.group, tables);
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub ctes: Vec<CteStatement>,
    pub query: Query,
    pub lock: Option<LockOptions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CteStatement {
    pub name: String,
    pub columns: Vec<String>,
    pub query: Query,
}

/// A query body with the clauses that apply to its result.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub body: QueryBody,
    pub order_by: Vec<SortSpecification>,
    pub offset: Option<Expression>,
    pub fetch: Option<Expression>,
    pub fetch_type: FetchClauseType,
}

impl Query {
    pub fn spec(spec: QuerySpec) -> Self {
        Self {
            body: QueryBody::Spec(Box::new(spec)),
            order_by: Vec::new(),
            offset: None,
            fetch: None,
            fetch_type: FetchClauseType::RowsOnly,
        }
    }

    pub fn first_spec(&self) -> Option<&QuerySpec> {
        match &self.body {
            QueryBody::Spec(spec) => Some(spec),
            QueryBody::Group { parts, .. } => parts.first().and_then(Query::first_spec),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    Spec(Box<QuerySpec>),
    Group { op: SetOperator, parts: Vec<Query> },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    pub distinct: bool,
    pub selections: Vec<SqlSelection>,
    pub from: Vec<TableGroup>,
    pub where_: Option<Predicate>,
    pub group_by: Vec<Expression>,
    pub having: Option<Predicate>,
    /// Table groups a pessimistic lock applies to, in selection order and
    /// without duplicates.
    pub root_paths_for_locking: Vec<NavigablePath>,
}

impl QuerySpec {
    /// Record a locking root; repeated paths are ignored.
    pub fn add_root_path_for_locking(&mut self, path: NavigablePath) {
        if !self.root_paths_for_locking.contains(&path) {
            self.root_paths_for_locking.push(path);
        }
    }

    /// Find a table group anywhere in the from clause.
    pub fn find_group(&self, path: &NavigablePath) -> Option<&TableGroup> {
        self.from.iter().find_map(|root| root.find(path))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelection {
    pub expression: Expression,
    /// Column alias, for derived tables and CTEs.
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpecification {
    pub expression: Expression,
    pub direction: SortDirection,
    pub nulls: NullPrecedence,
}

// ============================================================================
// From clause
// ============================================================================

/// A table (or derived table) with its alias and the groups joined to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup {
    pub navigable_path: NavigablePath,
    pub table: TableReference,
    pub alias: String,
    /// Primary key columns of the table, for `for update of` lists.
    pub key_columns: Vec<String>,
    /// Link table a many-to-many join goes through.
    pub association_table: Option<AssociationTable>,
    pub joins: Vec<TableGroupJoin>,
}

impl TableGroup {
    pub fn find(&self, path: &NavigablePath) -> Option<&TableGroup> {
        if &self.navigable_path == path {
            return Some(self);
        }
        self.joins.iter().find_map(|join| join.group.find(path))
    }

    pub fn is_named_table(&self) -> bool {
        matches!(self.table, TableReference::Named { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableReference {
    Named {
        table: String,
    },
    /// Selections of the query carry the column names as aliases.
    Derived {
        query: Box<Query>,
        lateral: bool,
    },
    Cte {
        name: String,
    },
}

/// `link_table alias` joined as `owner.key=alias.owner_column`, with the
/// target joined on `alias.target_column=target.key`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationTable {
    pub table: String,
    pub alias: String,
    pub owner_columns: Vec<String>,
    pub target_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableGroupJoin {
    pub join_type: SqmJoinType,
    pub group: TableGroup,
    pub key: Option<JoinKey>,
    /// `on` predicate plus restrictions of the joined entity.
    pub predicate: Option<Predicate>,
}

/// Key equality `lhs_columns[i]=<joined alias>.rhs_columns[i]`.
///
/// Left-hand columns are qualified already; right-hand columns belong to the
/// joined table. With an [`AssociationTable`] the left-hand columns meet the
/// link table's owner columns instead, and the link table's target columns
/// meet the right-hand columns.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinKey {
    pub lhs_columns: Vec<String>,
    pub rhs_columns: Vec<String>,
}

// ============================================================================
// Mutations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    /// Version column incremented by `update versioned`.
    pub version_increment: Option<String>,
    pub where_: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub columns: Vec<String>,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub where_: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expression>>),
    Query(Query),
}

// ============================================================================
// Expressions and predicates
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    /// Table alias; `None` renders the bare column.
    pub qualifier: Option<String>,
    pub column: String,
}

impl ColumnReference {
    pub fn new(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            column: column.into(),
        }
    }

    pub fn unqualified(column: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            column: column.into(),
        }
    }

    pub fn text(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{q}.{}", self.column),
            None => self.column.clone(),
        }
    }
}

/// A JDBC parameter occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcParameter {
    pub id: ParamId,
    pub label: ParamLabel,
    pub expressible: Option<SqmExpressible>,
    /// Attribute of an embeddable value bound through this marker.
    pub component: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnReference),
    /// SQL text with aliases already injected (formulas).
    Formula(String),
    Literal(LiteralValue),
    Parameter(JdbcParameter),
    Binary {
        op: BinaryArithmeticOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Negate(Box<Expression>),
    Function(Box<FunctionCall>),
    Cast {
        operand: Box<Expression>,
        target: CastType,
    },
    Extract {
        field: String,
        source: Box<Expression>,
    },
    Trim {
        spec: TrimSpec,
        character: Option<Box<Expression>>,
        source: Box<Expression>,
    },
    CaseSearched {
        whens: Vec<(Predicate, Expression)>,
        otherwise: Option<Box<Expression>>,
    },
    CaseSimple {
        operand: Box<Expression>,
        whens: Vec<(Expression, Expression)>,
        otherwise: Option<Box<Expression>>,
    },
    Tuple(Vec<Expression>),
    Subquery(Box<Query>),
    Quantified {
        quantifier: Quantifier,
        query: Box<Query>,
    },
    Star,
}

impl Expression {
    pub fn column(qualifier: Option<&str>, column: &str) -> Self {
        Expression::Column(ColumnReference {
            qualifier: qualifier.map(str::to_string),
            column: column.to_string(),
        })
    }

    /// Single expressions as they are, several as a tuple.
    pub fn from_columns(mut columns: Vec<Expression>) -> Self {
        if columns.len() == 1 {
            columns.remove(0)
        } else {
            Expression::Tuple(columns)
        }
    }

    /// The components of a tuple, or the expression itself.
    pub fn components(&self) -> Vec<&Expression> {
        match self {
            Expression::Tuple(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expression>,
    pub distinct: bool,
    pub filter: Option<Predicate>,
    pub over: Option<Window>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Window {
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<SortSpecification>,
    pub frame: Option<Frame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub mode: FrameMode,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
    pub exclusion: Option<FrameExclusion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameBound {
    pub kind: FrameKind,
    pub offset: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        lhs: Expression,
        op: ComparisonOperator,
        rhs: Expression,
    },
    Between {
        expr: Expression,
        lower: Expression,
        upper: Expression,
        negated: bool,
    },
    Like {
        expr: Expression,
        pattern: Expression,
        escape: Option<Expression>,
        negated: bool,
        case_sensitive: bool,
    },
    Null {
        expr: Expression,
        negated: bool,
    },
    InList {
        expr: Expression,
        list: Vec<Expression>,
        negated: bool,
    },
    InSubquery {
        expr: Expression,
        query: Box<Query>,
        negated: bool,
    },
    Exists {
        query: Box<Query>,
        negated: bool,
    },
    Junction {
        op: BooleanOperator,
        lhs: Box<Predicate>,
        rhs: Box<Predicate>,
    },
    BooleanExpression {
        expr: Expression,
        negated: bool,
    },
    /// Restriction text with aliases already injected.
    Formula(String),
    Constant(bool),
}

impl Predicate {
    /// `lhs and rhs`, absorbing missing operands.
    pub fn combine(lhs: Option<Predicate>, rhs: Option<Predicate>) -> Option<Predicate> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Some(Predicate::Junction {
                op: BooleanOperator::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }),
            (lhs, None) => lhs,
            (None, rhs) => rhs,
        }
    }

    /// Conjunction of all predicates, right-associated.
    pub fn all(predicates: Vec<Predicate>) -> Option<Predicate> {
        predicates
            .into_iter()
            .rev()
            .fold(None, |acc, p| Predicate::combine(Some(p), acc))
    }
}

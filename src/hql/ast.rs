//! Syntax tree of an HQL statement.
//!
//! The tree mirrors the text: names are unresolved and paths are plain
//! dotted identifiers. The semantic builder resolves them against the
//! domain model when it lowers the tree to SQM.

use super::span::{Span, Spanned};
use crate::sqm::operator::{
    ComparisonOperator, FetchClauseType, FrameExclusion, FrameKind, FrameMode, NullPrecedence,
    SetOperator, SortDirection, SqmJoinType, TrimSpec,
};

pub type Ident = Spanned<String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Insert(InsertStatement),
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub ctes: Vec<Cte>,
    pub query: QueryExpression,
}

/// `name (col, ...) as (query)`
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: Ident,
    pub columns: Vec<Ident>,
    pub query: QueryExpression,
}

/// A query body with its own ordering and row limits.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpression {
    pub body: QueryBody,
    pub order_by: Vec<SortItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub fetch: Option<FetchClause>,
    pub span: Span,
}

impl QueryExpression {
    pub fn has_limit(&self) -> bool {
        self.limit.is_some() || self.offset.is_some() || self.fetch.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    Spec(Box<QuerySpec>),
    /// `a union b union c`; operands of one operator are flattened.
    SetOperation {
        op: SetOperator,
        parts: Vec<QueryExpression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// `None` when the query starts at `from`.
    pub select: Option<SelectClause>,
    pub from: Vec<FromRoot>,
    pub where_: Option<Predicate>,
    pub group_by: Vec<Expr>,
    pub having: Option<Predicate>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub value: Selectable,
    pub alias: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selectable {
    Expr(Expr),
    /// `new list(...)`, `new map(...)`, `new a.b.Class(...)`
    Instantiation {
        target: Ident,
        arguments: Vec<SelectItem>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    pub expr: Expr,
    pub direction: SortDirection,
    pub nulls: NullPrecedence,
}

/// `fetch first|next n [percent] rows only|with ties`
#[derive(Debug, Clone, PartialEq)]
pub struct FetchClause {
    pub count: Expr,
    pub kind: FetchClauseType,
}

// ============================================================================
// From clause
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FromRoot {
    pub source: RootSource,
    pub alias: Option<Ident>,
    pub joins: Vec<Join>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RootSource {
    /// Entity or CTE name, possibly qualified (`org.example.Book`).
    Entity(Ident),
    Subquery {
        query: Box<QueryExpression>,
        lateral: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: SqmJoinType,
    pub fetch: bool,
    pub target: JoinTarget,
    pub alias: Option<Ident>,
    pub on: Option<Predicate>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    /// `b.author`, or a bare entity name for entity joins.
    Path(PathExpr),
    /// `treat(b.author as Writer)`
    Treat { path: PathExpr, entity: Ident },
    Subquery {
        query: Box<QueryExpression>,
        lateral: bool,
    },
}

// ============================================================================
// Mutations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub versioned: bool,
    pub entity: Ident,
    pub alias: Option<Ident>,
    pub assignments: Vec<Assignment>,
    pub where_: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub path: PathExpr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub entity: Ident,
    pub alias: Option<Ident>,
    pub where_: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub entity: Ident,
    pub paths: Vec<PathExpr>,
    pub values: InsertValues,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertValues {
    Query(QueryExpression),
    Rows(Vec<Vec<Expr>>),
}

// ============================================================================
// Expressions
// ============================================================================

/// Dotted identifiers, optionally starting from a `treat(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub root: PathRoot,
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl PathExpr {
    pub fn simple(ident: Ident) -> Self {
        let span = ident.span.clone();
        Self {
            root: PathRoot::Ident(ident),
            segments: Vec::new(),
            span,
        }
    }

    /// `a.b.c` rendered back, for messages and qualified names.
    pub fn dotted(&self) -> String {
        let mut out = match &self.root {
            PathRoot::Ident(ident) => ident.value.clone(),
            PathRoot::Treat { path, entity } => {
                format!("treat({} as {})", path.dotted(), entity.value)
            }
        };
        for segment in &self.segments {
            out.push('.');
            out.push_str(segment);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathRoot {
    Ident(Ident),
    Treat { path: Box<PathExpr>, entity: Ident },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    /// As written, including any suffix.
    Number(String),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Named(String),
    Positional(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

/// `all`, `any`/`some`, `every` before a subquery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    All,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Path(PathExpr),
    Literal(Literal),
    Parameter(Parameter),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Negate(Box<Expr>),
    Function(Box<FunctionCall>),
    CaseSearched {
        whens: Vec<(Predicate, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    CaseSimple {
        operand: Box<Expr>,
        whens: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        target: Ident,
    },
    Trim {
        spec: TrimSpec,
        character: Option<Box<Expr>>,
        source: Box<Expr>,
    },
    Extract {
        field: Ident,
        source: Box<Expr>,
    },
    /// `type(path)`
    Type(PathExpr),
    /// `size(path)`
    Size(PathExpr),
    Tuple(Vec<Expr>),
    Subquery(Box<QueryExpression>),
    Quantified {
        quantifier: QuantifierKind,
        query: Box<QueryExpression>,
    },
    /// `*`, only as a function argument.
    Star,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Ident,
    pub distinct: bool,
    pub arguments: Vec<Expr>,
    pub filter: Option<Predicate>,
    pub over: Option<Window>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Window {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<SortItem>,
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
    pub offset: Option<Box<Expr>>,
}

// ============================================================================
// Predicates
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub kind: PredicateKind,
    pub span: Span,
}

impl Predicate {
    pub fn new(kind: PredicateKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateKind {
    Comparison {
        lhs: Expr,
        op: ComparisonOperator,
        rhs: Expr,
    },
    Between {
        expr: Expr,
        lower: Expr,
        upper: Expr,
        negated: bool,
    },
    Like {
        expr: Expr,
        pattern: Expr,
        escape: Option<Expr>,
        negated: bool,
        case_sensitive: bool,
    },
    IsNull {
        expr: Expr,
        negated: bool,
    },
    IsEmpty {
        path: PathExpr,
        negated: bool,
    },
    /// `in (a, b)` or `in :list`
    InList {
        expr: Expr,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Expr,
        query: Box<QueryExpression>,
        negated: bool,
    },
    Exists {
        query: Box<QueryExpression>,
        negated: bool,
    },
    MemberOf {
        expr: Expr,
        path: PathExpr,
        negated: bool,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    /// A boolean expression in predicate position.
    Expr(Expr),
}

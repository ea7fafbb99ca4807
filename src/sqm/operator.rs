//! Closed operator vocabularies shared by the SQM, the translator and the renderer.
//!
//! Every enum here is a stateless value with per-variant behaviour: SQL text,
//! negation, inversion (operand swap) and the broader/sharper ordering used
//! when predicates are merged.

use serde::Serialize;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    DistinctFrom,
    NotDistinctFrom,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperator {
    /// The operator that matches exactly the rows this one rejects.
    pub fn negated(self) -> Self {
        use ComparisonOperator::*;
        match self {
            Equal => NotEqual,
            NotEqual => Equal,
            DistinctFrom => NotDistinctFrom,
            NotDistinctFrom => DistinctFrom,
            LessThan => GreaterThanOrEqual,
            LessThanOrEqual => GreaterThan,
            GreaterThan => LessThanOrEqual,
            GreaterThanOrEqual => LessThan,
        }
    }

    /// The operator to use when the operands are swapped (`a < b` == `b > a`).
    pub fn invert(self) -> Self {
        use ComparisonOperator::*;
        match self {
            LessThan => GreaterThan,
            LessThanOrEqual => GreaterThanOrEqual,
            GreaterThan => LessThan,
            GreaterThanOrEqual => LessThanOrEqual,
            other => other,
        }
    }

    /// The least restrictive operator of the same direction.
    pub fn broader(self) -> Self {
        use ComparisonOperator::*;
        match self {
            LessThan | LessThanOrEqual => LessThanOrEqual,
            GreaterThan | GreaterThanOrEqual => GreaterThanOrEqual,
            other => other,
        }
    }

    /// The most restrictive operator of the same direction.
    pub fn sharper(self) -> Self {
        use ComparisonOperator::*;
        match self {
            LessThan | LessThanOrEqual => LessThan,
            GreaterThan | GreaterThanOrEqual => GreaterThan,
            other => other,
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(
            self,
            ComparisonOperator::Equal | ComparisonOperator::NotDistinctFrom
        )
    }

    pub fn sql_text(self) -> &'static str {
        use ComparisonOperator::*;
        match self {
            Equal => "=",
            NotEqual => "<>",
            DistinctFrom => " is distinct from ",
            NotDistinctFrom => " is not distinct from ",
            LessThan => "<",
            LessThanOrEqual => "<=",
            GreaterThan => ">",
            GreaterThanOrEqual => ">=",
        }
    }

    pub const ALL: [ComparisonOperator; 8] = [
        ComparisonOperator::Equal,
        ComparisonOperator::NotEqual,
        ComparisonOperator::DistinctFrom,
        ComparisonOperator::NotDistinctFrom,
        ComparisonOperator::LessThan,
        ComparisonOperator::LessThanOrEqual,
        ComparisonOperator::GreaterThan,
        ComparisonOperator::GreaterThanOrEqual,
    ];
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_text().trim())
    }
}

/// Boolean junction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOperator {
    And,
    Or,
}

impl BooleanOperator {
    /// De Morgan dual.
    pub fn negated(self) -> Self {
        match self {
            BooleanOperator::And => BooleanOperator::Or,
            BooleanOperator::Or => BooleanOperator::And,
        }
    }

    pub fn sql_text(self) -> &'static str {
        match self {
            BooleanOperator::And => "and",
            BooleanOperator::Or => "or",
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    /// `/` with the operand types deciding integer or decimal division.
    Divide,
    /// JPA `quot`: always a numeric (non-integer) division.
    Quot,
    Modulo,
}

impl BinaryArithmeticOperator {
    pub fn operator_symbol(self) -> &'static str {
        use BinaryArithmeticOperator::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide | Quot => "/",
            Modulo => "%",
        }
    }

    /// Binding strength used to decide when operands need parentheses.
    pub fn precedence(self) -> u8 {
        use BinaryArithmeticOperator::*;
        match self {
            Add | Subtract => 1,
            Multiply | Divide | Quot | Modulo => 2,
        }
    }

    pub fn to_logging_text(self, lhs: &str, rhs: &str) -> String {
        match self {
            BinaryArithmeticOperator::Modulo => format!("mod({lhs}, {rhs})"),
            _ => format!("({lhs} {} {rhs})", self.operator_symbol()),
        }
    }
}

/// Unary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryArithmeticOperator {
    UnaryPlus,
    UnaryMinus,
}

impl UnaryArithmeticOperator {
    pub fn operator_char(self) -> char {
        match self {
            UnaryArithmeticOperator::UnaryPlus => '+',
            UnaryArithmeticOperator::UnaryMinus => '-',
        }
    }
}

/// Set operators combining query parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOperator {
    pub fn sql_text(self) -> &'static str {
        use SetOperator::*;
        match self {
            Union => "union",
            UnionAll => "union all",
            Intersect => "intersect",
            IntersectAll => "intersect all",
            Except => "except",
            ExceptAll => "except all",
        }
    }

    pub fn is_all(self) -> bool {
        matches!(
            self,
            SetOperator::UnionAll | SetOperator::IntersectAll | SetOperator::ExceptAll
        )
    }
}

/// Broad family of a [`CastType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    Boolean,
    Numeric,
    Text,
    Temporal,
    Other,
}

/// Target types understood by `cast(x as T)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CastType {
    String,
    Clob,
    Boolean,
    IntegerBoolean,
    YnBoolean,
    TfBoolean,
    Integer,
    Long,
    Float,
    Double,
    Fixed,
    Date,
    Time,
    Timestamp,
    OffsetTimestamp,
    ZoneTimestamp,
    Null,
    Other,
}

impl CastType {
    pub fn kind(self) -> CastKind {
        use CastType::*;
        match self {
            String | Clob => CastKind::Text,
            Boolean | IntegerBoolean | YnBoolean | TfBoolean => CastKind::Boolean,
            Integer | Long | Float | Double | Fixed => CastKind::Numeric,
            Date | Time | Timestamp | OffsetTimestamp | ZoneTimestamp => CastKind::Temporal,
            Null | Other => CastKind::Other,
        }
    }

    /// Resolve the target named in HQL (`cast(x as Integer)`), case-insensitively.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let simple = lower.rsplit('.').next().unwrap_or(&lower);
        Some(match simple {
            "string" | "varchar" | "char" | "character" | "text" => CastType::String,
            "clob" => CastType::Clob,
            "boolean" | "bool" => CastType::Boolean,
            "integer" | "int" | "short" | "byte" => CastType::Integer,
            "long" | "biginteger" | "bigint" => CastType::Long,
            "float" | "real" => CastType::Float,
            "double" => CastType::Double,
            "bigdecimal" | "decimal" | "numeric" => CastType::Fixed,
            "date" | "localdate" => CastType::Date,
            "time" | "localtime" => CastType::Time,
            "timestamp" | "localdatetime" | "instant" => CastType::Timestamp,
            "offsetdatetime" => CastType::OffsetTimestamp,
            "zoneddatetime" => CastType::ZoneTimestamp,
            _ => return None,
        })
    }
}

/// Window frame units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameMode {
    Rows,
    Range,
    Groups,
}

impl FrameMode {
    pub fn sql_text(self) -> &'static str {
        match self {
            FrameMode::Rows => "rows",
            FrameMode::Range => "range",
            FrameMode::Groups => "groups",
        }
    }
}

/// Window frame bound kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    UnboundedPreceding,
    OffsetPreceding,
    CurrentRow,
    OffsetFollowing,
    UnboundedFollowing,
}

impl FrameKind {
    /// SQL text; offset bounds are prefixed with their offset expression by the caller.
    pub fn sql_text(self) -> &'static str {
        match self {
            FrameKind::UnboundedPreceding => "unbounded preceding",
            FrameKind::OffsetPreceding => "preceding",
            FrameKind::CurrentRow => "current row",
            FrameKind::OffsetFollowing => "following",
            FrameKind::UnboundedFollowing => "unbounded following",
        }
    }

    pub fn has_offset(self) -> bool {
        matches!(self, FrameKind::OffsetPreceding | FrameKind::OffsetFollowing)
    }
}

/// Window frame exclusions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameExclusion {
    CurrentRow,
    Group,
    Ties,
    NoOthers,
}

impl FrameExclusion {
    pub fn sql_text(self) -> &'static str {
        match self {
            FrameExclusion::CurrentRow => "exclude current row",
            FrameExclusion::Group => "exclude group",
            FrameExclusion::Ties => "exclude ties",
            FrameExclusion::NoOthers => "exclude no others",
        }
    }
}

/// Shape of a `fetch first` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchClauseType {
    #[default]
    RowsOnly,
    RowsWithTies,
    PercentOnly,
    PercentWithTies,
}

impl FetchClauseType {
    pub fn is_percent(self) -> bool {
        matches!(
            self,
            FetchClauseType::PercentOnly | FetchClauseType::PercentWithTies
        )
    }

    pub fn with_ties(self) -> bool {
        matches!(
            self,
            FetchClauseType::RowsWithTies | FetchClauseType::PercentWithTies
        )
    }
}

/// Sort direction of an order-by item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn sql_text(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Placement of nulls in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPrecedence {
    #[default]
    None,
    First,
    Last,
}

/// Join types at the semantic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqmJoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl SqmJoinType {
    pub fn text(self) -> &'static str {
        match self {
            SqmJoinType::Inner => "inner",
            SqmJoinType::Left => "left outer",
            SqmJoinType::Right => "right outer",
            SqmJoinType::Full => "full outer",
            SqmJoinType::Cross => "cross",
        }
    }

    pub fn is_outer(self) -> bool {
        matches!(self, SqmJoinType::Left | SqmJoinType::Right | SqmJoinType::Full)
    }
}

/// `trim` specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimSpec {
    Leading,
    Trailing,
    #[default]
    Both,
}

impl TrimSpec {
    pub fn sql_text(self) -> &'static str {
        match self {
            TrimSpec::Leading => "leading",
            TrimSpec::Trailing => "trailing",
            TrimSpec::Both => "both",
        }
    }
}

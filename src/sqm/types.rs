//! Expressible types carried by SQM nodes and the precedence rules used to
//! infer result types eagerly at construction time.

use serde::Serialize;

use super::operator::{BinaryArithmeticOperator, CastType};

/// Basic (single-column) value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicType {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    BigInteger,
    Float,
    Double,
    BigDecimal,
    Character,
    String,
    Date,
    Time,
    Timestamp,
    OffsetTimestamp,
    Duration,
    Uuid,
    Binary,
}

impl BasicType {
    pub fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            BasicType::Byte
                | BasicType::Short
                | BasicType::Integer
                | BasicType::Long
                | BasicType::BigInteger
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            BasicType::Date | BasicType::Time | BasicType::Timestamp | BasicType::OffsetTimestamp
        )
    }

    pub fn is_textual(self) -> bool {
        matches!(self, BasicType::String | BasicType::Character)
    }

    fn numeric_rank(self) -> Option<u8> {
        Some(match self {
            BasicType::Byte => 1,
            BasicType::Short => 2,
            BasicType::Integer => 3,
            BasicType::Long => 4,
            BasicType::BigInteger => 5,
            BasicType::Float => 6,
            BasicType::Double => 7,
            BasicType::BigDecimal => 8,
            _ => return None,
        })
    }

    /// Whether a value of `self` can hold every value of `other` but not vice versa.
    pub fn is_wider_than(self, other: BasicType) -> bool {
        match (self.numeric_rank(), other.numeric_rank()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }

    /// Resolve a type name as written in mapping files.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => BasicType::Boolean,
            "byte" => BasicType::Byte,
            "short" => BasicType::Short,
            "integer" | "int" => BasicType::Integer,
            "long" => BasicType::Long,
            "big_integer" | "biginteger" => BasicType::BigInteger,
            "float" => BasicType::Float,
            "double" => BasicType::Double,
            "big_decimal" | "bigdecimal" | "decimal" => BasicType::BigDecimal,
            "char" | "character" => BasicType::Character,
            "string" | "text" => BasicType::String,
            "date" => BasicType::Date,
            "time" => BasicType::Time,
            "timestamp" | "datetime" | "instant" => BasicType::Timestamp,
            "offset_timestamp" => BasicType::OffsetTimestamp,
            "duration" => BasicType::Duration,
            "uuid" => BasicType::Uuid,
            "binary" | "bytes" => BasicType::Binary,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicType::Boolean => "boolean",
            BasicType::Byte => "byte",
            BasicType::Short => "short",
            BasicType::Integer => "integer",
            BasicType::Long => "long",
            BasicType::BigInteger => "big_integer",
            BasicType::Float => "float",
            BasicType::Double => "double",
            BasicType::BigDecimal => "big_decimal",
            BasicType::Character => "character",
            BasicType::String => "string",
            BasicType::Date => "date",
            BasicType::Time => "time",
            BasicType::Timestamp => "timestamp",
            BasicType::OffsetTimestamp => "offset_timestamp",
            BasicType::Duration => "duration",
            BasicType::Uuid => "uuid",
            BasicType::Binary => "binary",
        }
    }

    pub fn from_cast_type(cast: CastType) -> Option<Self> {
        Some(match cast {
            CastType::String | CastType::Clob => BasicType::String,
            CastType::Boolean
            | CastType::IntegerBoolean
            | CastType::YnBoolean
            | CastType::TfBoolean => BasicType::Boolean,
            CastType::Integer => BasicType::Integer,
            CastType::Long => BasicType::Long,
            CastType::Float => BasicType::Float,
            CastType::Double => BasicType::Double,
            CastType::Fixed => BasicType::BigDecimal,
            CastType::Date => BasicType::Date,
            CastType::Time => BasicType::Time,
            CastType::Timestamp => BasicType::Timestamp,
            CastType::OffsetTimestamp | CastType::ZoneTimestamp => BasicType::OffsetTimestamp,
            CastType::Null | CastType::Other => return None,
        })
    }
}

impl std::fmt::Display for BasicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The semantic type of an SQM node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqmExpressible {
    Basic(BasicType),
    Entity(String),
    Embeddable(String),
    Tuple(Vec<SqmExpressible>),
}

impl SqmExpressible {
    pub fn basic(&self) -> Option<BasicType> {
        match self {
            SqmExpressible::Basic(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.basic().is_some_and(BasicType::is_numeric)
    }

    pub fn type_name(&self) -> String {
        match self {
            SqmExpressible::Basic(b) => b.name().to_string(),
            SqmExpressible::Entity(e) | SqmExpressible::Embeddable(e) => e.clone(),
            SqmExpressible::Tuple(items) => format!(
                "tuple({})",
                items
                    .iter()
                    .map(SqmExpressible::type_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl From<BasicType> for SqmExpressible {
    fn from(b: BasicType) -> Self {
        SqmExpressible::Basic(b)
    }
}

/// The type with the highest precedence of two operand types.
///
/// Unknown operands defer to the known one; numeric operands widen; otherwise
/// the first operand wins.
pub fn highest_precedence_type(
    first: Option<&SqmExpressible>,
    second: Option<&SqmExpressible>,
) -> Option<SqmExpressible> {
    match (first, second) {
        (None, None) => None,
        (Some(t), None) | (None, Some(t)) => Some(t.clone()),
        (Some(SqmExpressible::Basic(a)), Some(SqmExpressible::Basic(b))) if b.is_wider_than(*a) => {
            Some(SqmExpressible::Basic(*b))
        }
        (Some(a), Some(_)) => Some(a.clone()),
    }
}

/// [`highest_precedence_type`] folded over any number of operands.
pub fn highest_precedence_of<'a, I>(types: I) -> Option<SqmExpressible>
where
    I: IntoIterator<Item = Option<&'a SqmExpressible>>,
{
    types
        .into_iter()
        .fold(None, |acc, t| highest_precedence_type(acc.as_ref(), t))
}

/// Result type of a binary arithmetic expression.
pub fn arithmetic_result_type(
    op: BinaryArithmeticOperator,
    lhs: Option<&SqmExpressible>,
    rhs: Option<&SqmExpressible>,
    integer_division_yields_decimal: bool,
) -> Option<SqmExpressible> {
    let (l, r) = (
        lhs.and_then(SqmExpressible::basic),
        rhs.and_then(SqmExpressible::basic),
    );

    match op {
        BinaryArithmeticOperator::Quot => Some(BasicType::Double.into()),
        BinaryArithmeticOperator::Subtract
            if l.is_some_and(BasicType::is_temporal) && r.is_some_and(BasicType::is_temporal) =>
        {
            Some(BasicType::Duration.into())
        }
        BinaryArithmeticOperator::Add | BinaryArithmeticOperator::Subtract
            if l.is_some_and(BasicType::is_temporal) && r == Some(BasicType::Duration) =>
        {
            lhs.cloned()
        }
        BinaryArithmeticOperator::Divide
            if integer_division_yields_decimal
                && l.is_some_and(BasicType::is_integral)
                && r.is_some_and(BasicType::is_integral) =>
        {
            Some(BasicType::BigDecimal.into())
        }
        _ => highest_precedence_type(lhs, rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(b: BasicType) -> SqmExpressible {
        SqmExpressible::Basic(b)
    }

    #[test]
    fn test_numeric_widening() {
        let result = highest_precedence_type(
            Some(&basic(BasicType::Integer)),
            Some(&basic(BasicType::Double)),
        );
        assert_eq!(result, Some(basic(BasicType::Double)));

        let result = highest_precedence_type(
            Some(&basic(BasicType::BigDecimal)),
            Some(&basic(BasicType::Long)),
        );
        assert_eq!(result, Some(basic(BasicType::BigDecimal)));
    }

    #[test]
    fn test_unknown_operand_defers() {
        let result = highest_precedence_type(None, Some(&basic(BasicType::String)));
        assert_eq!(result, Some(basic(BasicType::String)));
        assert_eq!(highest_precedence_of([None, None]), None);
    }

    #[test]
    fn test_integer_division_depends_on_flag() {
        let int = basic(BasicType::Integer);
        assert_eq!(
            arithmetic_result_type(BinaryArithmeticOperator::Divide, Some(&int), Some(&int), false),
            Some(basic(BasicType::Integer))
        );
        assert_eq!(
            arithmetic_result_type(BinaryArithmeticOperator::Divide, Some(&int), Some(&int), true),
            Some(basic(BasicType::BigDecimal))
        );
        assert_eq!(
            arithmetic_result_type(BinaryArithmeticOperator::Quot, Some(&int), Some(&int), false),
            Some(basic(BasicType::Double))
        );
    }

    #[test]
    fn test_temporal_arithmetic() {
        let ts = basic(BasicType::Timestamp);
        assert_eq!(
            arithmetic_result_type(BinaryArithmeticOperator::Subtract, Some(&ts), Some(&ts), false),
            Some(basic(BasicType::Duration))
        );
        assert_eq!(
            arithmetic_result_type(
                BinaryArithmeticOperator::Add,
                Some(&ts),
                Some(&basic(BasicType::Duration)),
                false
            ),
            Some(ts)
        );
    }
}

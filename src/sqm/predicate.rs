//! Predicate nodes.
//!
//! Junctions are binary. Every variant knows its own negation, so `not`
//! rewrites the tree in place instead of wrapping it, and negating twice
//! gives back the original node.

use super::expression::SqmExpression;
use super::operator::{BooleanOperator, ComparisonOperator};
use super::path::SqmPath;
use super::statement::SqmQuery;

#[derive(Debug, Clone, PartialEq)]
pub enum SqmPredicate {
    Comparison {
        lhs: SqmExpression,
        op: ComparisonOperator,
        rhs: SqmExpression,
    },
    Between {
        expr: SqmExpression,
        lower: SqmExpression,
        upper: SqmExpression,
        negated: bool,
    },
    Like {
        expr: SqmExpression,
        pattern: SqmExpression,
        escape: Option<SqmExpression>,
        negated: bool,
        case_sensitive: bool,
    },
    Null {
        expr: SqmExpression,
        negated: bool,
    },
    /// `plural is [not] empty`
    Empty {
        path: SqmPath,
        negated: bool,
    },
    InList {
        expr: SqmExpression,
        list: Vec<SqmExpression>,
        negated: bool,
    },
    InSubquery {
        expr: SqmExpression,
        query: Box<SqmQuery>,
        negated: bool,
    },
    Exists {
        query: Box<SqmQuery>,
        negated: bool,
    },
    /// `expr [not] member of plural`
    MemberOf {
        expr: SqmExpression,
        path: SqmPath,
        negated: bool,
    },
    Junction {
        op: BooleanOperator,
        lhs: Box<SqmPredicate>,
        rhs: Box<SqmPredicate>,
    },
    /// A boolean-typed expression used as a predicate.
    BooleanExpression {
        expr: SqmExpression,
        negated: bool,
    },
    /// Always true (`1=1`) or always false (`1<>1`).
    Constant(bool),
}

impl SqmPredicate {
    pub fn and(lhs: SqmPredicate, rhs: SqmPredicate) -> Self {
        SqmPredicate::Junction {
            op: BooleanOperator::And,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn or(lhs: SqmPredicate, rhs: SqmPredicate) -> Self {
        SqmPredicate::Junction {
            op: BooleanOperator::Or,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Right-associated junction of all predicates: `a op (b op c)`.
    /// An empty list yields the operator's identity.
    pub fn junction(op: BooleanOperator, predicates: Vec<SqmPredicate>) -> Self {
        let mut iter = predicates.into_iter().rev();
        let Some(last) = iter.next() else {
            return SqmPredicate::Constant(op == BooleanOperator::And);
        };
        iter.fold(last, |rhs, lhs| SqmPredicate::Junction {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// Negate in place.
    pub fn negate(&mut self) {
        match self {
            SqmPredicate::Comparison { op, .. } => *op = op.negated(),
            SqmPredicate::Between { negated, .. }
            | SqmPredicate::Like { negated, .. }
            | SqmPredicate::Null { negated, .. }
            | SqmPredicate::Empty { negated, .. }
            | SqmPredicate::InList { negated, .. }
            | SqmPredicate::InSubquery { negated, .. }
            | SqmPredicate::Exists { negated, .. }
            | SqmPredicate::MemberOf { negated, .. }
            | SqmPredicate::BooleanExpression { negated, .. } => *negated = !*negated,
            SqmPredicate::Junction { op, lhs, rhs } => {
                *op = op.negated();
                lhs.negate();
                rhs.negate();
            }
            SqmPredicate::Constant(value) => *value = !*value,
        }
    }

    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate();
        self
    }

    pub fn is_negated(&self) -> bool {
        match self {
            SqmPredicate::Between { negated, .. }
            | SqmPredicate::Like { negated, .. }
            | SqmPredicate::Null { negated, .. }
            | SqmPredicate::Empty { negated, .. }
            | SqmPredicate::InList { negated, .. }
            | SqmPredicate::InSubquery { negated, .. }
            | SqmPredicate::Exists { negated, .. }
            | SqmPredicate::MemberOf { negated, .. }
            | SqmPredicate::BooleanExpression { negated, .. } => *negated,
            _ => false,
        }
    }
}

/// `existing and new`, or just `new`.
pub fn combine_predicates(
    existing: Option<SqmPredicate>,
    predicate: SqmPredicate,
) -> SqmPredicate {
    match existing {
        Some(existing) => SqmPredicate::and(existing, predicate),
        None => predicate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqm::expression::LiteralValue;
    use crate::sqm::types::BasicType;

    fn int(v: i64) -> SqmExpression {
        SqmExpression::literal(LiteralValue::Numeric {
            text: v.to_string(),
            ty: BasicType::Integer,
        })
    }

    fn lt(a: i64, b: i64) -> SqmPredicate {
        SqmPredicate::Comparison {
            lhs: int(a),
            op: ComparisonOperator::LessThan,
            rhs: int(b),
        }
    }

    #[test]
    fn test_double_negation_restores() {
        let original = SqmPredicate::and(
            lt(1, 2),
            SqmPredicate::Null {
                expr: int(3),
                negated: false,
            },
        );
        let twice = original.clone().negated().negated();
        assert_eq!(twice, original);
    }

    #[test]
    fn test_junction_negation_is_de_morgan() {
        let negated = SqmPredicate::and(lt(1, 2), lt(3, 4)).negated();
        let SqmPredicate::Junction { op, lhs, .. } = negated else {
            panic!("expected junction");
        };
        assert_eq!(op, BooleanOperator::Or);
        assert!(matches!(
            *lhs,
            SqmPredicate::Comparison {
                op: ComparisonOperator::GreaterThanOrEqual,
                ..
            }
        ));
    }

    #[test]
    fn test_junction_right_associates() {
        let p = SqmPredicate::junction(BooleanOperator::And, vec![lt(1, 2), lt(3, 4), lt(5, 6)]);
        let SqmPredicate::Junction { lhs, rhs, .. } = p else {
            panic!("expected junction");
        };
        assert_eq!(*lhs, lt(1, 2));
        assert!(matches!(*rhs, SqmPredicate::Junction { .. }));
    }

    #[test]
    fn test_empty_junction_is_identity() {
        assert_eq!(
            SqmPredicate::junction(BooleanOperator::And, vec![]),
            SqmPredicate::Constant(true)
        );
        assert_eq!(
            SqmPredicate::junction(BooleanOperator::Or, vec![]),
            SqmPredicate::Constant(false)
        );
    }
}

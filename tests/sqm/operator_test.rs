//! Operator vocabularies: negation, inversion and ordering laws.

use hqlc::sqm::operator::{
    BinaryArithmeticOperator, BooleanOperator, ComparisonOperator, FetchClauseType, SetOperator,
    SortDirection, SqmJoinType,
};

#[test]
fn test_negation_is_an_involution() {
    for op in ComparisonOperator::ALL {
        assert_eq!(op.negated().negated(), op, "{op:?}");
        assert_ne!(op.negated(), op, "{op:?}");
    }
}

#[test]
fn test_invert_swaps_direction_only() {
    for op in ComparisonOperator::ALL {
        assert_eq!(op.invert().invert(), op, "{op:?}");
    }
    assert_eq!(ComparisonOperator::LessThan.invert(), ComparisonOperator::GreaterThan);
    assert_eq!(
        ComparisonOperator::GreaterThanOrEqual.invert(),
        ComparisonOperator::LessThanOrEqual
    );
    assert_eq!(ComparisonOperator::Equal.invert(), ComparisonOperator::Equal);
    assert_eq!(ComparisonOperator::DistinctFrom.invert(), ComparisonOperator::DistinctFrom);
}

#[test]
fn test_broader_and_sharper_are_idempotent() {
    for op in ComparisonOperator::ALL {
        assert_eq!(op.broader().broader(), op.broader(), "{op:?}");
        assert_eq!(op.sharper().sharper(), op.sharper(), "{op:?}");
        assert_eq!(op.broader().sharper(), op.sharper(), "{op:?}");
    }
}

#[test]
fn test_negated_comparisons() {
    assert_eq!(
        ComparisonOperator::LessThan.negated(),
        ComparisonOperator::GreaterThanOrEqual
    );
    assert_eq!(
        ComparisonOperator::NotDistinctFrom.negated(),
        ComparisonOperator::DistinctFrom
    );
    assert!(ComparisonOperator::NotDistinctFrom.is_equality());
    assert!(!ComparisonOperator::NotEqual.is_equality());
}

#[test]
fn test_display_trims_keyword_operators() {
    let texts: Vec<String> = ComparisonOperator::ALL.iter().map(ToString::to_string).collect();
    assert_eq!(
        texts,
        vec!["=", "<>", "is distinct from", "is not distinct from", "<", "<=", ">", ">="]
    );
    assert_eq!(
        ComparisonOperator::NotDistinctFrom.sql_text(),
        " is not distinct from "
    );
}

#[test]
fn test_boolean_and_arithmetic() {
    assert_eq!(BooleanOperator::Or.sql_text(), "or");
    assert_eq!(BooleanOperator::And.negated().sql_text(), "or");

    assert_eq!(BinaryArithmeticOperator::Quot.operator_symbol(), "/");
    assert!(BinaryArithmeticOperator::Modulo.precedence() > BinaryArithmeticOperator::Add.precedence());
    assert_eq!(
        BinaryArithmeticOperator::Modulo.to_logging_text("a", "b"),
        "mod(a, b)"
    );
    assert_eq!(
        BinaryArithmeticOperator::Subtract.to_logging_text("a", "b"),
        "(a - b)"
    );
}

#[test]
fn test_set_sort_join_and_fetch_vocabularies() {
    assert_eq!(SetOperator::ExceptAll.sql_text(), "except all");
    assert!(SetOperator::UnionAll.is_all());
    assert!(!SetOperator::Intersect.is_all());

    assert_eq!(SortDirection::default().reverse().sql_text(), "desc");

    assert_eq!(SqmJoinType::Left.text(), "left outer");
    assert!(SqmJoinType::Full.is_outer());
    assert!(!SqmJoinType::Cross.is_outer());

    assert!(FetchClauseType::PercentWithTies.is_percent());
    assert!(FetchClauseType::PercentWithTies.with_ties());
    assert!(!FetchClauseType::default().with_ties());
}

//! Oracle theta-style outer joins with `(+)` markers.
//!
//! Joins become a comma cross join in FROM plus key predicates in WHERE.
//! The `(+)` marker goes on the side that may be null: after the primary
//! key for LEFT/FULL, after the foreign key for RIGHT/FULL.

use super::{check_key_arity, JoinBuffers, JoinFragmentBuilder, JoinType};
use crate::sql::fragment::{FragmentError, FragmentResult};

/// Characters that start a comparison operator.
const OPERATOR_CHARS: [char; 4] = ['=', '<', '>', '!'];

/// Keyword whose preceding space receives a marker (`col(+) is null`).
const IS_KEYWORD: &str = "is ";

const OUTER_JOIN_MARKER: &str = "(+)";

/// Oracle 8i join fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleJoinFragment {
    buffers: JoinBuffers,
}

impl OracleJoinFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an on clause to a LEFT OUTER join, marking every operand that sits
    /// left of an operator as optional.
    fn add_left_outer_join_condition(&mut self, on: &str) {
        self.add_condition(&mark_outer_join_operands(on));
    }
}

/// Byte offsets where `(+)` is inserted into a left-outer-join on clause.
///
/// Rules, applied outside single-quoted literals:
/// 1. before the first character of every operator made of `= < > !`;
/// 2. at a space immediately followed by `is `.
///
/// The operand on the left of each operator is assumed to be the column of
/// the optional table. Conditions written the other way round are marked on
/// the wrong side.
pub fn outer_join_insert_points(on: &str) -> Vec<usize> {
    let mut points = Vec::new();
    let mut in_literal = false;
    let mut previous_was_operator = false;

    for (i, c) in on.char_indices() {
        if c == '\'' {
            in_literal = !in_literal;
            previous_was_operator = false;
            continue;
        }
        if in_literal {
            continue;
        }

        let is_operator = OPERATOR_CHARS.contains(&c);
        if is_operator && !previous_was_operator {
            points.push(i);
        } else if c == ' ' && starts_with_ignore_case(&on[i + 1..], IS_KEYWORD) {
            points.push(i);
        }
        previous_was_operator = is_operator;
    }
    points
}

/// Insert `(+)` at every point found by [`outer_join_insert_points`].
pub fn mark_outer_join_operands(on: &str) -> String {
    let points = outer_join_insert_points(on);
    let mut marked = String::with_capacity(on.len() + points.len() * OUTER_JOIN_MARKER.len());
    let mut last = 0;
    for point in points {
        marked.push_str(&on[last..point]);
        marked.push_str(OUTER_JOIN_MARKER);
        last = point;
    }
    marked.push_str(&on[last..]);
    marked
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

impl JoinFragmentBuilder for OracleJoinFragment {
    fn add_join(
        &mut self,
        table: &str,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
        join_type: JoinType,
        on: Option<&str>,
    ) -> FragmentResult<()> {
        check_key_arity(fk_columns, pk_columns)?;
        let on = on.filter(|o| !o.is_empty());
        if on.is_some() && !matches!(join_type, JoinType::Inner | JoinType::LeftOuter) {
            return Err(FragmentError::Unsupported(format!(
                "join type {join_type:?} with an on clause is not supported by Oracle theta joins"
            )));
        }

        self.add_cross_join(table, alias);

        let marks_fk = matches!(join_type, JoinType::RightOuter | JoinType::Full);
        let marks_pk = matches!(join_type, JoinType::LeftOuter | JoinType::Full);
        let where_part = &mut self.buffers.after_where;
        for (fk, pk) in fk_columns.iter().zip(pk_columns) {
            where_part.push_str(" and ");
            where_part.push_str(fk);
            if marks_fk {
                where_part.push_str(OUTER_JOIN_MARKER);
            }
            where_part.push('=');
            where_part.push_str(alias);
            where_part.push('.');
            where_part.push_str(pk);
            if marks_pk {
                where_part.push_str(OUTER_JOIN_MARKER);
            }
        }
        self.buffers.has_theta_joins = true;

        if let Some(on) = on {
            if join_type == JoinType::LeftOuter {
                self.add_left_outer_join_condition(on);
            } else {
                self.add_condition(on);
            }
        }
        Ok(())
    }

    fn buffers(&self) -> &JoinBuffers {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut JoinBuffers {
        &mut self.buffers
    }
}

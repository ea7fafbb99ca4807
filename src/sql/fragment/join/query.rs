//! Join fragment used when rendering translated queries.

use super::{check_key_arity, JoinBuffers, JoinFragmentBuilder, JoinType};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::fragment::FragmentResult;

/// Collects the joins of one query.
///
/// Outer joins are rendered by the dialect's own fragment and merged in.
/// Inner joins follow the same path unless theta-style inner joins were
/// requested, in which case they become a cross join plus key predicates.
///
/// [`add_condition`](JoinFragmentBuilder::add_condition) is set-like: a
/// condition whose trimmed text already occurs anywhere in either buffer is
/// skipped. The check is plain substring containment, so a condition that is
/// a textual part of a longer one is also skipped, and the same condition
/// spelled with different spacing is added twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryJoinFragment {
    buffers: JoinBuffers,
    dialect: Dialect,
    use_theta_style_inner_joins: bool,
}

impl QueryJoinFragment {
    pub fn new(dialect: Dialect, use_theta_style_inner_joins: bool) -> Self {
        Self {
            buffers: JoinBuffers::default(),
            dialect,
            use_theta_style_inner_joins,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn clear_where_part(&mut self) {
        self.buffers.after_where.clear();
    }

    fn contains_condition(&self, condition: &str) -> bool {
        let trimmed = condition.trim();
        self.buffers.after_from.contains(trimmed) || self.buffers.after_where.contains(trimmed)
    }
}

impl JoinFragmentBuilder for QueryJoinFragment {
    fn add_join(
        &mut self,
        table: &str,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
        join_type: JoinType,
        on: Option<&str>,
    ) -> FragmentResult<()> {
        if !self.use_theta_style_inner_joins || join_type != JoinType::Inner {
            let mut fragment = self.dialect.create_outer_join_fragment();
            fragment.add_join(table, alias, fk_columns, pk_columns, join_type, on)?;
            self.add_fragment(&fragment);
        } else {
            check_key_arity(fk_columns, pk_columns)?;
            self.add_cross_join(table, alias);
            self.add_key_condition(alias, fk_columns, pk_columns)?;
            if let Some(on) = on {
                self.add_condition(on);
            }
        }
        Ok(())
    }

    fn add_key_condition(
        &mut self,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
    ) -> FragmentResult<()> {
        check_key_arity(fk_columns, pk_columns)?;
        let where_part = &mut self.buffers.after_where;
        for (fk, pk) in fk_columns.iter().zip(pk_columns) {
            where_part.push_str(" and ");
            where_part.push_str(fk);
            where_part.push('=');
            where_part.push_str(alias);
            where_part.push('.');
            where_part.push_str(pk);
        }
        Ok(())
    }

    fn add_condition(&mut self, condition: &str) -> bool {
        // empty text is always "contained", so it is never appended
        if self.contains_condition(condition) {
            return false;
        }
        if !condition.starts_with(" and ") {
            self.buffers.after_where.push_str(" and ");
        }
        self.buffers.after_where.push_str(condition);
        true
    }

    fn buffers(&self) -> &JoinBuffers {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut JoinBuffers {
        &mut self.buffers
    }
}

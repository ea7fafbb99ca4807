//! Join fragments: accumulate the joins of one FROM clause.
//!
//! A join fragment exposes two independent strings, the text to append
//! after the FROM clause and the text to append to the WHERE clause. ANSI
//! databases only use the first; theta-style dialects (Oracle 8i, Sybase 11)
//! express their joins as extra WHERE predicates.
//!
//! ```text
//!   add_join / add_cross_join / add_condition ...   (build)
//!                     │
//!                     ▼
//!   to_from_fragment_string()   " left outer join dept d on e.dept_id=d.id"
//!   to_where_fragment_string()  " and d.active=1"
//! ```
//!
//! The dialect picks the variant through
//! [`SqlDialect::create_outer_join_fragment`](crate::sql::dialect::SqlDialect::create_outer_join_fragment).
//! [`QueryJoinFragment`] wraps whichever variant the dialect selects.

mod ansi;
mod oracle;
mod query;
mod sybase;

pub use ansi::AnsiJoinFragment;
pub use oracle::{mark_outer_join_operands, outer_join_insert_points, OracleJoinFragment};
pub use query::QueryJoinFragment;
pub use sybase::Sybase11JoinFragment;

use serde::Serialize;

use super::{append_condition, FragmentError, FragmentResult};
use crate::sqm::operator::SqmJoinType;

/// Join kind requested from a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    /// No join semantics; only valid for cross joins.
    None,
    Inner,
    LeftOuter,
    RightOuter,
    Full,
}

impl JoinType {
    pub fn is_outer(self) -> bool {
        matches!(self, JoinType::LeftOuter | JoinType::RightOuter | JoinType::Full)
    }
}

impl From<SqmJoinType> for JoinType {
    fn from(join_type: SqmJoinType) -> Self {
        match join_type {
            SqmJoinType::Inner => JoinType::Inner,
            SqmJoinType::Left => JoinType::LeftOuter,
            SqmJoinType::Right => JoinType::RightOuter,
            SqmJoinType::Full => JoinType::Full,
            SqmJoinType::Cross => JoinType::None,
        }
    }
}

/// Outer-join syntax family of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStyle {
    /// `left outer join t a on ...`
    Ansi,
    /// `, t a` plus `fk=a.pk(+)` predicates.
    OracleTheta,
    /// `, t a` plus `fk *= a.pk` predicates.
    Sybase,
}

/// The join-fragment capability shared by every variant.
pub trait JoinFragmentBuilder {
    /// Append one join keyed by `fk_columns[i] = alias.pk_columns[i]`.
    fn add_join(
        &mut self,
        table: &str,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
        join_type: JoinType,
        on: Option<&str>,
    ) -> FragmentResult<()>;

    /// Append `, table alias`.
    fn add_cross_join(&mut self, table: &str, alias: &str) {
        let buffers = self.buffers_mut();
        buffers.after_from.push_str(", ");
        buffers.after_from.push_str(table);
        buffers.after_from.push(' ');
        buffers.after_from.push_str(alias);
    }

    /// Append ` and alias.col<suffix>` once per column.
    fn add_condition_columns(&mut self, alias: &str, columns: &[&str], suffix: &str) {
        let buffers = self.buffers_mut();
        for column in columns {
            buffers.after_where.push_str(" and ");
            buffers.after_where.push_str(alias);
            buffers.after_where.push('.');
            buffers.after_where.push_str(column);
            buffers.after_where.push_str(suffix);
        }
    }

    /// Append ` and fk=alias.pk` pairs without a join.
    fn add_key_condition(
        &mut self,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
    ) -> FragmentResult<()> {
        let _ = (alias, fk_columns, pk_columns);
        Err(FragmentError::Unsupported(
            "key conditions are only accepted by query join fragments".into(),
        ))
    }

    /// Append a free-form predicate. Returns whether it was appended.
    fn add_condition(&mut self, condition: &str) -> bool {
        append_condition(&mut self.buffers_mut().after_where, condition)
    }

    /// Append already rendered join text.
    fn add_joins(&mut self, from: &str, where_part: &str) {
        let buffers = self.buffers_mut();
        buffers.after_from.push_str(from);
        buffers.after_where.push_str(where_part);
    }

    fn add_from_fragment_string(&mut self, text: &str) {
        self.buffers_mut().after_from.push_str(text);
    }

    /// Merge another fragment's rendered text, keeping its theta-join flag.
    fn add_fragment(&mut self, other: &dyn JoinFragmentBuilder) {
        if other.has_theta_joins() {
            self.buffers_mut().has_theta_joins = true;
        }
        self.add_joins(&other.to_from_fragment_string(), &other.to_where_fragment_string());
    }

    fn to_from_fragment_string(&self) -> String {
        self.buffers().after_from.clone()
    }

    fn to_where_fragment_string(&self) -> String {
        self.buffers().after_where.clone()
    }

    fn has_theta_joins(&self) -> bool {
        self.buffers().has_theta_joins
    }

    fn buffers(&self) -> &JoinBuffers;

    fn buffers_mut(&mut self) -> &mut JoinBuffers;
}

/// The accumulated FROM and WHERE text of a fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinBuffers {
    pub after_from: String,
    pub after_where: String,
    pub has_theta_joins: bool,
}

pub(crate) fn check_key_arity(fk_columns: &[&str], pk_columns: &[&str]) -> FragmentResult<()> {
    if fk_columns.len() != pk_columns.len() {
        return Err(FragmentError::AssertionFailure(format!(
            "join key arity mismatch: {} foreign key column(s) vs {} primary key column(s)",
            fk_columns.len(),
            pk_columns.len()
        )));
    }
    Ok(())
}

/// A join fragment of any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinFragment {
    Ansi(AnsiJoinFragment),
    Oracle(OracleJoinFragment),
    Sybase11(Sybase11JoinFragment),
    Query(QueryJoinFragment),
}

impl JoinFragment {
    /// A fresh, empty fragment for the given outer-join style.
    pub fn for_style(style: JoinStyle) -> Self {
        match style {
            JoinStyle::Ansi => JoinFragment::Ansi(AnsiJoinFragment::default()),
            JoinStyle::OracleTheta => JoinFragment::Oracle(OracleJoinFragment::default()),
            JoinStyle::Sybase => JoinFragment::Sybase11(Sybase11JoinFragment::default()),
        }
    }

    /// Deep copy; later mutation of either side is invisible to the other.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    fn inner(&self) -> &dyn JoinFragmentBuilder {
        match self {
            JoinFragment::Ansi(f) => f,
            JoinFragment::Oracle(f) => f,
            JoinFragment::Sybase11(f) => f,
            JoinFragment::Query(f) => f,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn JoinFragmentBuilder {
        match self {
            JoinFragment::Ansi(f) => f,
            JoinFragment::Oracle(f) => f,
            JoinFragment::Sybase11(f) => f,
            JoinFragment::Query(f) => f,
        }
    }
}

impl JoinFragmentBuilder for JoinFragment {
    fn add_join(
        &mut self,
        table: &str,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
        join_type: JoinType,
        on: Option<&str>,
    ) -> FragmentResult<()> {
        self.inner_mut()
            .add_join(table, alias, fk_columns, pk_columns, join_type, on)
    }

    fn add_cross_join(&mut self, table: &str, alias: &str) {
        self.inner_mut().add_cross_join(table, alias)
    }

    fn add_condition_columns(&mut self, alias: &str, columns: &[&str], suffix: &str) {
        self.inner_mut().add_condition_columns(alias, columns, suffix)
    }

    fn add_key_condition(
        &mut self,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
    ) -> FragmentResult<()> {
        self.inner_mut().add_key_condition(alias, fk_columns, pk_columns)
    }

    fn add_condition(&mut self, condition: &str) -> bool {
        self.inner_mut().add_condition(condition)
    }

    fn add_joins(&mut self, from: &str, where_part: &str) {
        self.inner_mut().add_joins(from, where_part)
    }

    fn add_fragment(&mut self, other: &dyn JoinFragmentBuilder) {
        self.inner_mut().add_fragment(other)
    }

    fn buffers(&self) -> &JoinBuffers {
        self.inner().buffers()
    }

    fn buffers_mut(&mut self) -> &mut JoinBuffers {
        self.inner_mut().buffers_mut()
    }
}

//! Sybase Adaptive Server 11 dialect.
//!
//! Legacy syntax throughout:
//! - Outer joins as `*=` / `=*` predicates in the WHERE clause, no FULL joins
//! - `holdlock` table hints instead of `for update`
//! - No pagination, no `with` clause, no window functions
//! - `+` for concatenation, `%` for modulo

use super::helpers;
use super::{LimitStyle, SqlDialect, SqlFunction};
use crate::sql::fragment::join::JoinStyle;
use crate::sql::lock::{LockMode, LockTimeout};
use crate::sqm::operator::CastType;
use crate::sqm::types::BasicType;

static SYBASE_FUNCTIONS: &[SqlFunction] = &[
    SqlFunction::new("getdate", Some(BasicType::Timestamp)),
    SqlFunction::new("isnull", None),
    SqlFunction::new("char_length", Some(BasicType::Integer)),
    SqlFunction::new("charindex", Some(BasicType::Integer)),
];

/// Sybase 11 dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sybase11;

impl SqlDialect for Sybase11 {
    fn name(&self) -> &'static str {
        "sybase11"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn join_style(&self) -> JoinStyle {
        JoinStyle::Sybase
    }

    fn supports_full_outer_join(&self) -> bool {
        false
    }

    fn uses_lock_hints(&self) -> bool {
        true
    }

    fn append_lock_hint(&self, mode: LockMode, _timeout: LockTimeout, table: &str) -> String {
        if mode.is_pessimistic() {
            format!("{table} holdlock")
        } else {
            table.to_string()
        }
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::Unsupported
    }

    fn concat_operator(&self) -> &'static str {
        "+"
    }

    fn modulo_uses_operator(&self) -> bool {
        true
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn supports_window_functions(&self) -> bool {
        false
    }

    fn supports_with_clause(&self) -> bool {
        false
    }

    fn supports_row_value_comparison(&self) -> bool {
        false
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_sybase(name)
    }

    fn extra_functions(&self) -> &'static [SqlFunction] {
        SYBASE_FUNCTIONS
    }

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        helpers::cast_type_name_tsql(cast)
    }
}

//! T-SQL (SQL Server) dialect.
//!
//! T-SQL has significant differences from ANSI:
//! - Square bracket identifier quoting (`[name]`)
//! - OFFSET FETCH for pagination (requires ORDER BY)
//! - Table lock hints (`with (updlock,rowlock)`) instead of `for update`
//! - N'...' prefix for Unicode strings
//! - String concatenation with `+`, modulo with `%`
//! - No row value comparisons

use super::helpers;
use super::{LimitStyle, SqlDialect, SqlFunction};
use crate::sql::lock::{LockMode, LockTimeout};
use crate::sqm::operator::CastType;
use crate::sqm::types::BasicType;

static TSQL_FUNCTIONS: &[SqlFunction] = &[
    SqlFunction::new("getdate", Some(BasicType::Timestamp)),
    SqlFunction::new("isnull", None),
    SqlFunction::new("len", Some(BasicType::Integer)),
    SqlFunction::new("charindex", Some(BasicType::Integer)),
    SqlFunction::new("datediff", Some(BasicType::Integer)),
];

/// T-SQL (SQL Server) dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn open_quote(&self) -> char {
        '['
    }

    fn close_quote(&self) -> char {
        ']'
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        if !s.is_ascii() {
            helpers::quote_string_unicode(s)
        } else {
            helpers::quote_string_single(s)
        }
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn uses_lock_hints(&self) -> bool {
        true
    }

    fn append_lock_hint(&self, mode: LockMode, timeout: LockTimeout, table: &str) -> String {
        helpers::lock_hint_sqlserver(mode, timeout, table)
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
    }

    fn requires_order_by_for_offset(&self) -> bool {
        true
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

    fn supports_row_value_comparison(&self) -> bool {
        false
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_tsql(name)
    }

    fn extra_functions(&self) -> &'static [SqlFunction] {
        TSQL_FUNCTIONS
    }

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        helpers::cast_type_name_tsql(cast)
    }

    fn no_columns_insert_string(&self) -> &'static str {
        "default values"
    }
}

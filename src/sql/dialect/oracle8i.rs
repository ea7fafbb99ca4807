//! Oracle 8i SQL dialect.
//!
//! Predates ANSI join support:
//! - Outer joins as theta joins with `(+)` markers in the WHERE clause
//! - `decode(...)` instead of searched `case`
//! - `rownum` subquery wrapping for pagination
//! - No `with` clause, no `skip locked`

use super::helpers;
use super::oracle::{ORACLE_FUNCTIONS, ORACLE_KEYWORDS};
use super::{ForUpdateOfStyle, LimitStyle, SqlDialect, SqlFunction};
use crate::sql::fragment::case::CaseStyle;
use crate::sql::fragment::join::JoinStyle;
use crate::sqm::operator::CastType;

/// Oracle 8i SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Oracle8i;

impl SqlDialect for Oracle8i {
    fn name(&self) -> &'static str {
        "oracle8i"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn join_style(&self) -> JoinStyle {
        JoinStyle::OracleTheta
    }

    fn case_style(&self) -> CaseStyle {
        CaseStyle::Decode
    }

    fn for_update_of_style(&self) -> ForUpdateOfStyle {
        ForUpdateOfStyle::Columns
    }

    fn supports_nowait(&self) -> bool {
        true
    }

    fn supports_lock_with_pagination(&self) -> bool {
        false
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::RowNum
    }

    fn supports_with_clause(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_oracle(name)
    }

    fn extra_functions(&self) -> &'static [SqlFunction] {
        ORACLE_FUNCTIONS
    }

    fn keywords(&self) -> &'static [&'static str] {
        ORACLE_KEYWORDS
    }

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        helpers::cast_type_name_oracle(cast)
    }
}

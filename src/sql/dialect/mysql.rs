//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - `||` is logical OR by default (use `concat()`)
//! - No FULL OUTER JOIN
//! - No NULLS FIRST/LAST
//! - Integer division yields a decimal
//! - `for update of <alias>` / `for share` (8.0+)

use super::helpers;
use super::{ForUpdateOfStyle, SqlDialect};
use crate::sqm::operator::CastType;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn open_quote(&self) -> char {
        '`'
    }

    fn close_quote(&self) -> char {
        '`'
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn supports_full_outer_join(&self) -> bool {
        false
    }

    fn read_lock_string(&self) -> &'static str {
        " for share"
    }

    fn for_update_of_style(&self) -> ForUpdateOfStyle {
        ForUpdateOfStyle::Tables
    }

    fn supports_nowait(&self) -> bool {
        true
    }

    fn supports_skip_locked(&self) -> bool {
        true
    }

    fn supports_lock_with_aggregation(&self) -> bool {
        true
    }

    fn supports_concat_operator(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        match cast {
            CastType::String | CastType::Other | CastType::Null => "char",
            CastType::Integer | CastType::Long | CastType::IntegerBoolean => "signed",
            CastType::Boolean => "unsigned",
            CastType::Float | CastType::Double => "double",
            CastType::Timestamp => "datetime",
            other => helpers::cast_type_name_ansi(other),
        }
    }

    fn integer_division_yields_decimal(&self) -> bool {
        true
    }

    fn no_columns_insert_string(&self) -> &'static str {
        "() values ()"
    }

    fn identity_insert_string(&self) -> Option<&'static str> {
        Some("null")
    }
}

//! Oracle (12c and later) SQL dialect.
//!
//! Oracle differences from ANSI:
//! - Booleans rendered as 1/0
//! - `offset ? rows fetch first ? rows only` pagination
//! - `for update of <alias>.<column>` with `nowait`, `skip locked`, `wait n`
//! - `substr`/`ceil` function names

use super::helpers;
use super::{ForUpdateOfStyle, LimitStyle, SqlDialect, SqlFunction};
use crate::sqm::operator::CastType;
use crate::sqm::types::BasicType;

pub(super) static ORACLE_FUNCTIONS: &[SqlFunction] = &[
    SqlFunction::new("sysdate", Some(BasicType::Timestamp)).no_parens(),
    SqlFunction::new("systimestamp", Some(BasicType::Timestamp)).no_parens(),
    SqlFunction::new("nvl", None),
    SqlFunction::new("decode", None),
    SqlFunction::new("to_char", Some(BasicType::String)),
    SqlFunction::new("to_date", Some(BasicType::Timestamp)),
    SqlFunction::new("instr", Some(BasicType::Integer)),
    SqlFunction::new("substr", Some(BasicType::String)),
];

pub(super) static ORACLE_KEYWORDS: &[&str] = &["rownum", "rowid", "level", "uid", "user"];

/// Oracle SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Oracle;

impl SqlDialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn for_update_of_style(&self) -> ForUpdateOfStyle {
        ForUpdateOfStyle::Columns
    }

    fn supports_nowait(&self) -> bool {
        true
    }

    fn supports_skip_locked(&self) -> bool {
        true
    }

    fn supports_wait(&self) -> bool {
        true
    }

    fn supports_lock_with_pagination(&self) -> bool {
        false
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
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

//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features:
//! - ANSI identifier quoting (`"`)
//! - Native boolean type (true/false)
//! - `for update of <table alias>` with `nowait` and `skip locked`
//! - `for share` for pessimistic reads
//! - `default values` inserts
//! - native `ilike`

use super::helpers;
use super::{ForUpdateOfStyle, SqlDialect};

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
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

    fn supports_case_insensitive_like(&self) -> bool {
        true
    }

    fn keywords(&self) -> &'static [&'static str] {
        &["current_user", "session_user", "localtime", "localtimestamp"]
    }

    fn no_columns_insert_string(&self) -> &'static str {
        "default values"
    }

    fn identity_insert_string(&self) -> Option<&'static str> {
        Some("default")
    }
}

//! ANSI SQL reference dialect.
//!
//! Used when no database is configured. Renders portable SQL:
//! double-quoted identifiers, `join ... on` syntax, `limit/offset`
//! and a bare `for update`.

use super::helpers;
use super::SqlDialect;

/// ANSI SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }
}

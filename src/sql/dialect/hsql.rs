//! HSQLDB dialect.
//!
//! ANSI joins and `limit/offset`, but case fragments use the legacy
//! `casewhen(...)` function.

use super::helpers;
use super::{SqlDialect, SqlFunction};
use crate::sql::fragment::case::CaseStyle;

static HSQL_FUNCTIONS: &[SqlFunction] = &[SqlFunction::new("casewhen", None)];

/// HSQLDB dialect.
#[derive(Debug, Clone, Copy)]
pub struct Hsql;

impl SqlDialect for Hsql {
    fn name(&self) -> &'static str {
        "hsql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn case_style(&self) -> CaseStyle {
        CaseStyle::Hsql
    }

    fn extra_functions(&self) -> &'static [SqlFunction] {
        HSQL_FUNCTIONS
    }

    fn identity_insert_string(&self) -> Option<&'static str> {
        Some("null")
    }
}

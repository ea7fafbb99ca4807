//! SQL dialect definitions and formatting rules.
//!
//! This module is the dialect SPI consumed by the fragment builders, template
//! interpolation, the translator and the renderer. Each dialect implements
//! `SqlDialect` to describe its differences from ANSI SQL:
//!
//! - Join syntax: ANSI `join ... on`, Oracle theta `(+)`, Sybase `*=`
//! - Case fragments: ANSI `case`, Oracle `decode(...)`, HSQL `casewhen(...)`
//! - Identifier quote characters
//! - Pessimistic lock clauses: `for update [of ...] [nowait|skip locked]`,
//!   or table lock hints
//! - Pagination: `limit/offset`, `offset/fetch`, `rownum` wrapping
//! - Keywords, registered functions, cast type names and numeric widening
//!
//! # Usage
//!
//! ```ignore
//! use hqlc::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Oracle8i;
//! let mut joins = dialect.create_outer_join_fragment();
//! ```
//!
//! # Capability matrix
//!
//! | Feature | ANSI | Postgres | MySQL | Oracle | Oracle 8i | Sybase 11 | SQL Server | HSQL |
//! |---------|------|----------|-------|--------|-----------|-----------|------------|------|
//! | Join style | ANSI | ANSI | ANSI | ANSI | theta `(+)` | `*=` | ANSI | ANSI |
//! | FULL join | ✓ | ✓ | ❌ | ✓ | ✓ | ❌ | ✓ | ✓ |
//! | FOR UPDATE OF | ❌ | tables | tables | columns | columns | ❌ | hints | ❌ |
//! | NOWAIT | ❌ | ✓ | ✓ | ✓ | ✓ | ❌ | hint | ❌ |
//! | SKIP LOCKED | ❌ | ✓ | ✓ | ✓ | ❌ | ❌ | hint | ❌ |
//! | Pagination | limit | limit | limit | fetch | rownum | ❌ | fetch | limit |
//! | CTE | ✓ | ✓ | ✓ | ✓ | ❌ | ❌ | ✓ | ✓ |

mod ansi;
pub mod helpers;
mod hsql;
mod mysql;
mod oracle;
mod oracle8i;
mod postgres;
mod sybase;
mod tsql;

pub use ansi::Ansi;
pub use helpers::SqlFunction;
pub use hsql::Hsql;
pub use mysql::MySql;
pub use oracle::Oracle;
pub use oracle8i::Oracle8i;
pub use postgres::Postgres;
pub use sybase::Sybase11;
pub use tsql::TSql;

use serde::{Deserialize, Serialize};

use super::fragment::case::{CaseFragment, CaseStyle};
use super::fragment::join::{JoinFragment, JoinStyle};
use super::lock::{LockMode, LockOptions, LockTimeout};
use crate::sqm::operator::{BinaryArithmeticOperator, CastType};
use crate::sqm::types::{self, SqmExpressible};

/// How a dialect paginates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `limit ? offset ?`
    LimitOffset,
    /// `offset ? rows fetch first ? rows only`
    OffsetFetch,
    /// `rownum` subquery wrapping.
    RowNum,
    /// No pagination syntax.
    Unsupported,
}

/// What may follow `for update of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForUpdateOfStyle {
    Unsupported,
    /// Table aliases (`for update of b1_0`).
    Tables,
    /// Qualified key columns (`for update of b1_0.id`).
    Columns,
}

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    fn open_quote(&self) -> char {
        '"'
    }

    fn close_quote(&self) -> char {
        '"'
    }

    /// Quote an identifier unconditionally.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a mapping name if, and only if, it was written backtick-quoted.
    fn quote(&self, name: &str) -> String {
        match name.strip_prefix('`').and_then(|n| n.strip_suffix('`')) {
            Some(inner) => self.quote_identifier(inner),
            None => name.to_string(),
        }
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Joins and case fragments
    // =========================================================================

    fn join_style(&self) -> JoinStyle {
        JoinStyle::Ansi
    }

    fn supports_full_outer_join(&self) -> bool {
        true
    }

    /// Fresh join fragment in this dialect's outer-join syntax.
    fn create_outer_join_fragment(&self) -> JoinFragment {
        JoinFragment::for_style(self.join_style())
    }

    fn case_style(&self) -> CaseStyle {
        CaseStyle::Ansi
    }

    fn create_case_fragment(&self) -> CaseFragment {
        CaseFragment::new(self.case_style())
    }

    // =========================================================================
    // Pessimistic locking
    // =========================================================================

    fn for_update_string(&self) -> &'static str {
        " for update"
    }

    /// Clause used for `PessimisticRead`.
    fn read_lock_string(&self) -> &'static str {
        self.for_update_string()
    }

    fn for_update_of_style(&self) -> ForUpdateOfStyle {
        ForUpdateOfStyle::Unsupported
    }

    fn supports_nowait(&self) -> bool {
        false
    }

    fn supports_skip_locked(&self) -> bool {
        false
    }

    /// Whether `wait <seconds>` may follow the lock clause.
    fn supports_wait(&self) -> bool {
        false
    }

    /// Whether locks are requested through table hints instead of a clause.
    fn uses_lock_hints(&self) -> bool {
        false
    }

    /// Decorate `table alias` with a lock hint.
    fn append_lock_hint(&self, mode: LockMode, timeout: LockTimeout, table: &str) -> String {
        let _ = (mode, timeout);
        table.to_string()
    }

    /// Full lock clause for the given options; `of` lists the lock targets
    /// already formatted for [`SqlDialect::for_update_of_style`].
    fn for_update_clause(&self, options: &LockOptions, of: Option<&str>) -> String {
        helpers::for_update_clause(self, options, of)
    }

    /// Whether the lock clause may follow a paginated query.
    fn supports_lock_with_pagination(&self) -> bool {
        true
    }

    /// Whether the lock clause may follow a distinct, grouped, aggregated or
    /// windowed select.
    fn supports_lock_with_aggregation(&self) -> bool {
        self.uses_lock_hints()
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    /// Whether OFFSET/FETCH needs an ORDER BY.
    fn requires_order_by_for_offset(&self) -> bool {
        false
    }

    // =========================================================================
    // Operators and functions
    // =========================================================================

    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// MySQL uses `||` as logical OR by default.
    fn supports_concat_operator(&self) -> bool {
        true
    }

    /// Whether modulo renders as `a % b` rather than `mod(a,b)`.
    fn modulo_uses_operator(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Native case-insensitive `ilike`.
    fn supports_case_insensitive_like(&self) -> bool {
        false
    }

    fn supports_window_functions(&self) -> bool {
        true
    }

    fn supports_with_clause(&self) -> bool {
        true
    }

    /// `(a, b) = (?, ?)` row value comparisons.
    fn supports_row_value_comparison(&self) -> bool {
        true
    }

    /// Remap a function name for this dialect (matched case-insensitively).
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    /// Functions registered on top of the standard set.
    fn extra_functions(&self) -> &'static [SqlFunction] {
        &[]
    }

    fn function(&self, name: &str) -> Option<SqlFunction> {
        helpers::lookup_function(name, self.extra_functions())
    }

    /// Dialect-specific reserved words.
    fn keywords(&self) -> &'static [&'static str] {
        &[]
    }

    fn is_keyword(&self, word: &str) -> bool {
        let lower = word.to_ascii_lowercase();
        self.keywords().iter().any(|k| *k == lower)
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        helpers::cast_type_name_ansi(cast)
    }

    fn integer_division_yields_decimal(&self) -> bool {
        false
    }

    /// Result type of an arithmetic expression on this database.
    fn arithmetic_type(
        &self,
        op: BinaryArithmeticOperator,
        lhs: Option<&SqmExpressible>,
        rhs: Option<&SqmExpressible>,
    ) -> Option<SqmExpressible> {
        types::arithmetic_result_type(op, lhs, rhs, self.integer_division_yields_decimal())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn no_columns_insert_string(&self) -> &'static str {
        "values ( )"
    }

    /// Value to insert into an identity column, if the column must be listed.
    fn identity_insert_string(&self) -> Option<&'static str> {
        None
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Ansi,
    Postgres,
    MySql,
    Oracle,
    Oracle8i,
    Sybase11,
    TSql,
    Hsql,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Ansi => &Ansi,
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::Oracle => &Oracle,
            Dialect::Oracle8i => &Oracle8i,
            Dialect::Sybase11 => &Sybase11,
            Dialect::TSql => &TSql,
            Dialect::Hsql => &Hsql,
        }
    }

    pub const ALL: [Dialect; 8] = [
        Dialect::Ansi,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::Oracle,
        Dialect::Oracle8i,
        Dialect::Sybase11,
        Dialect::TSql,
        Dialect::Hsql,
    ];
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown dialect '{s}'"))
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn open_quote(&self) -> char {
        self.dialect().open_quote()
    }

    fn close_quote(&self) -> char {
        self.dialect().close_quote()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote(&self, name: &str) -> String {
        self.dialect().quote(name)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn join_style(&self) -> JoinStyle {
        self.dialect().join_style()
    }

    fn supports_full_outer_join(&self) -> bool {
        self.dialect().supports_full_outer_join()
    }

    fn case_style(&self) -> CaseStyle {
        self.dialect().case_style()
    }

    fn for_update_string(&self) -> &'static str {
        self.dialect().for_update_string()
    }

    fn read_lock_string(&self) -> &'static str {
        self.dialect().read_lock_string()
    }

    fn for_update_of_style(&self) -> ForUpdateOfStyle {
        self.dialect().for_update_of_style()
    }

    fn supports_nowait(&self) -> bool {
        self.dialect().supports_nowait()
    }

    fn supports_skip_locked(&self) -> bool {
        self.dialect().supports_skip_locked()
    }

    fn supports_wait(&self) -> bool {
        self.dialect().supports_wait()
    }

    fn uses_lock_hints(&self) -> bool {
        self.dialect().uses_lock_hints()
    }

    fn append_lock_hint(&self, mode: LockMode, timeout: LockTimeout, table: &str) -> String {
        self.dialect().append_lock_hint(mode, timeout, table)
    }

    fn for_update_clause(&self, options: &LockOptions, of: Option<&str>) -> String {
        self.dialect().for_update_clause(options, of)
    }

    fn supports_lock_with_pagination(&self) -> bool {
        self.dialect().supports_lock_with_pagination()
    }

    fn supports_lock_with_aggregation(&self) -> bool {
        self.dialect().supports_lock_with_aggregation()
    }

    fn limit_style(&self) -> LimitStyle {
        self.dialect().limit_style()
    }

    fn requires_order_by_for_offset(&self) -> bool {
        self.dialect().requires_order_by_for_offset()
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn supports_concat_operator(&self) -> bool {
        self.dialect().supports_concat_operator()
    }

    fn modulo_uses_operator(&self) -> bool {
        self.dialect().modulo_uses_operator()
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn supports_case_insensitive_like(&self) -> bool {
        self.dialect().supports_case_insensitive_like()
    }

    fn supports_window_functions(&self) -> bool {
        self.dialect().supports_window_functions()
    }

    fn supports_with_clause(&self) -> bool {
        self.dialect().supports_with_clause()
    }

    fn supports_row_value_comparison(&self) -> bool {
        self.dialect().supports_row_value_comparison()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }

    fn extra_functions(&self) -> &'static [SqlFunction] {
        self.dialect().extra_functions()
    }

    fn keywords(&self) -> &'static [&'static str] {
        self.dialect().keywords()
    }

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        self.dialect().cast_type_name(cast)
    }

    fn integer_division_yields_decimal(&self) -> bool {
        self.dialect().integer_division_yields_decimal()
    }

    fn no_columns_insert_string(&self) -> &'static str {
        self.dialect().no_columns_insert_string()
    }

    fn identity_insert_string(&self) -> Option<&'static str> {
        self.dialect().identity_insert_string()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::lock::{LockMode, LockOptions, LockTimeout};

    #[test]
    fn test_dialect_display_and_parse() {
        assert_eq!(Dialect::Oracle8i.to_string(), "oracle8i");
        assert_eq!(Dialect::TSql.to_string(), "tsql");
        assert_eq!("Sybase11".parse::<Dialect>(), Ok(Dialect::Sybase11));
        assert!("db2".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_quote_only_backticked_names() {
        assert_eq!(Dialect::Postgres.quote("book"), "book");
        assert_eq!(Dialect::Postgres.quote("`Order`"), "\"Order\"");
        assert_eq!(Dialect::MySql.quote("`Order`"), "`Order`");
        assert_eq!(Dialect::TSql.quote("`Order`"), "[Order]");
    }

    #[test]
    fn test_quote_characters() {
        assert_eq!(Dialect::Ansi.open_quote(), '"');
        assert_eq!(Dialect::MySql.open_quote(), '`');
        assert_eq!(Dialect::TSql.open_quote(), '[');
        assert_eq!(Dialect::TSql.close_quote(), ']');
    }

    #[test]
    fn test_join_styles() {
        assert_eq!(Dialect::Postgres.join_style(), JoinStyle::Ansi);
        assert_eq!(Dialect::Oracle8i.join_style(), JoinStyle::OracleTheta);
        assert_eq!(Dialect::Sybase11.join_style(), JoinStyle::Sybase);
        assert_eq!(Dialect::Oracle.join_style(), JoinStyle::Ansi);
    }

    #[test]
    fn test_case_styles() {
        assert_eq!(Dialect::Oracle8i.case_style(), CaseStyle::Decode);
        assert_eq!(Dialect::Hsql.case_style(), CaseStyle::Hsql);
        assert_eq!(Dialect::Postgres.case_style(), CaseStyle::Ansi);
    }

    #[test]
    fn test_for_update_clauses() {
        let write = LockOptions::new(LockMode::PessimisticWrite);
        assert_eq!(Dialect::Ansi.for_update_clause(&write, Some("b1_0")), " for update");
        assert_eq!(
            Dialect::Postgres.for_update_clause(&write, Some("b1_0")),
            " for update of b1_0"
        );

        let nowait = LockOptions::new(LockMode::UpgradeNowait);
        assert_eq!(
            Dialect::Oracle.for_update_clause(&nowait, Some("b1_0.id")),
            " for update of b1_0.id nowait"
        );
        assert_eq!(Dialect::Hsql.for_update_clause(&nowait, None), " for update");

        let read = LockOptions::new(LockMode::PessimisticRead);
        assert_eq!(Dialect::Postgres.for_update_clause(&read, None), " for share");

        let wait = LockOptions::new(LockMode::PessimisticWrite).with_timeout(LockTimeout::Millis(3000));
        assert_eq!(Dialect::Oracle.for_update_clause(&wait, None), " for update wait 3");

        assert_eq!(
            Dialect::Postgres.for_update_clause(&LockOptions::new(LockMode::Optimistic), None),
            ""
        );
    }

    #[test]
    fn test_sqlserver_uses_lock_hints() {
        let write = LockOptions::new(LockMode::PessimisticWrite);
        assert!(Dialect::TSql.uses_lock_hints());
        assert_eq!(Dialect::TSql.for_update_clause(&write, Some("b1_0")), "");
        assert_eq!(
            Dialect::TSql.append_lock_hint(LockMode::PessimisticWrite, LockTimeout::SkipLocked, "book b1_0"),
            "book b1_0 with (updlock,rowlock,readpast)"
        );
    }

    #[test]
    fn test_function_registry() {
        assert!(Dialect::Ansi.function("upper").is_some());
        assert!(Dialect::Ansi.function("sysdate").is_none());
        let sysdate = Dialect::Oracle.function("SYSDATE").unwrap();
        assert!(!sysdate.has_parens_if_no_args);
        assert_eq!(Dialect::TSql.remap_function("length"), Some("len"));
    }

    #[test]
    fn test_integer_division_widening() {
        use crate::sqm::types::BasicType;
        let int = SqmExpressible::Basic(BasicType::Integer);
        assert_eq!(
            Dialect::MySql.arithmetic_type(BinaryArithmeticOperator::Divide, Some(&int), Some(&int)),
            Some(SqmExpressible::Basic(BasicType::BigDecimal))
        );
        assert_eq!(
            Dialect::Postgres.arithmetic_type(BinaryArithmeticOperator::Divide, Some(&int), Some(&int)),
            Some(int)
        );
    }

    #[test]
    fn test_no_columns_insert() {
        assert_eq!(Dialect::Ansi.no_columns_insert_string(), "values ( )");
        assert_eq!(Dialect::Postgres.no_columns_insert_string(), "default values");
        assert_eq!(Dialect::MySql.no_columns_insert_string(), "() values ()");
    }
}

//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::{ForUpdateOfStyle, SqlDialect};
use crate::sql::lock::{LockMode, LockOptions, LockTimeout};
use crate::sqm::operator::CastType;
use crate::sqm::types::BasicType;
use tracing::warn;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: ANSI, Postgres, Oracle, Sybase, HSQL
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: SQL Server
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with N prefix for Unicode (SQL Server).
pub fn quote_string_unicode(s: &str) -> String {
    format!("N'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Locking
// =============================================================================

/// Compose a lock clause from a dialect's lock capabilities.
pub fn for_update_clause<D: SqlDialect + ?Sized>(
    dialect: &D,
    options: &LockOptions,
    of: Option<&str>,
) -> String {
    if dialect.uses_lock_hints() || !options.requires_lock_clause() {
        return String::new();
    }

    let mut clause = match options.effective_mode() {
        LockMode::PessimisticRead => dialect.read_lock_string(),
        _ => dialect.for_update_string(),
    }
    .to_string();

    if let Some(of) = of.filter(|o| !o.is_empty()) {
        if dialect.for_update_of_style() != ForUpdateOfStyle::Unsupported {
            clause.push_str(" of ");
            clause.push_str(of);
        }
    }

    match options.effective_timeout() {
        LockTimeout::NoWait if dialect.supports_nowait() => clause.push_str(" nowait"),
        LockTimeout::SkipLocked if dialect.supports_skip_locked() => {
            clause.push_str(" skip locked")
        }
        LockTimeout::Millis(ms) if dialect.supports_wait() => {
            clause.push_str(&format!(" wait {}", ms.div_ceil(1000)))
        }
        LockTimeout::WaitForever => {}
        timeout => warn!(
            dialect = dialect.name(),
            ?timeout,
            "lock timeout not supported, waiting indefinitely"
        ),
    }

    clause
}

/// SQL Server table hints.
pub fn lock_hint_sqlserver(mode: LockMode, timeout: LockTimeout, table: &str) -> String {
    if !mode.is_pessimistic() {
        return table.to_string();
    }
    let mut hints = vec![
        if mode == LockMode::PessimisticRead {
            "holdlock"
        } else {
            "updlock"
        },
        "rowlock",
    ];
    match timeout {
        LockTimeout::NoWait => hints.push("nowait"),
        LockTimeout::SkipLocked => hints.push("readpast"),
        _ => {}
    }
    format!("{table} with ({})", hints.join(","))
}

// =============================================================================
// Function Registry
// =============================================================================

/// A SQL function known to a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlFunction {
    pub name: &'static str,
    /// `current_date` style functions are written without parentheses.
    pub has_parens_if_no_args: bool,
    /// Fixed result type; `None` means the type of the first argument.
    pub return_type: Option<BasicType>,
    pub aggregate: bool,
}

impl SqlFunction {
    pub const fn new(name: &'static str, return_type: Option<BasicType>) -> Self {
        Self {
            name,
            has_parens_if_no_args: true,
            return_type,
            aggregate: false,
        }
    }

    pub const fn no_parens(mut self) -> Self {
        self.has_parens_if_no_args = false;
        self
    }

    pub const fn aggregate(mut self) -> Self {
        self.aggregate = true;
        self
    }
}

const STRING: Option<BasicType> = Some(BasicType::String);
const INTEGER: Option<BasicType> = Some(BasicType::Integer);
const LONG: Option<BasicType> = Some(BasicType::Long);
const DOUBLE: Option<BasicType> = Some(BasicType::Double);
const BOOLEAN: Option<BasicType> = Some(BasicType::Boolean);

/// Functions every dialect understands (JPQL plus common HQL extensions).
pub static STANDARD_FUNCTIONS: &[SqlFunction] = &[
    SqlFunction::new("abs", None),
    SqlFunction::new("sqrt", DOUBLE),
    SqlFunction::new("mod", None),
    SqlFunction::new("lower", STRING),
    SqlFunction::new("upper", STRING),
    SqlFunction::new("length", INTEGER),
    SqlFunction::new("locate", INTEGER),
    SqlFunction::new("substring", STRING),
    SqlFunction::new("trim", STRING),
    SqlFunction::new("concat", STRING),
    SqlFunction::new("coalesce", None),
    SqlFunction::new("nullif", None),
    SqlFunction::new("current_date", Some(BasicType::Date)).no_parens(),
    SqlFunction::new("current_time", Some(BasicType::Time)).no_parens(),
    SqlFunction::new("current_timestamp", Some(BasicType::Timestamp)).no_parens(),
    SqlFunction::new("count", LONG).aggregate(),
    SqlFunction::new("sum", None).aggregate(),
    SqlFunction::new("avg", DOUBLE).aggregate(),
    SqlFunction::new("min", None).aggregate(),
    SqlFunction::new("max", None).aggregate(),
    SqlFunction::new("every", BOOLEAN).aggregate(),
    SqlFunction::new("any", BOOLEAN).aggregate(),
    SqlFunction::new("round", None),
    SqlFunction::new("floor", None),
    SqlFunction::new("ceiling", None),
    SqlFunction::new("ln", DOUBLE),
    SqlFunction::new("exp", DOUBLE),
    SqlFunction::new("power", DOUBLE),
    SqlFunction::new("sign", INTEGER),
    SqlFunction::new("left", STRING),
    SqlFunction::new("right", STRING),
    SqlFunction::new("replace", STRING),
    SqlFunction::new("extract", INTEGER),
    SqlFunction::new("bit_length", INTEGER),
    SqlFunction::new("str", STRING),
    SqlFunction::new("row_number", LONG),
    SqlFunction::new("rank", LONG),
    SqlFunction::new("dense_rank", LONG),
    SqlFunction::new("lag", None),
    SqlFunction::new("lead", None),
    SqlFunction::new("first_value", None),
    SqlFunction::new("last_value", None),
];

/// Functions defined by the JPA specification; anything else is an HQL extension.
pub static JPA_FUNCTIONS: &[&str] = &[
    "abs", "sqrt", "mod", "lower", "upper", "length", "locate", "substring", "trim", "concat",
    "coalesce", "nullif", "current_date", "current_time", "current_timestamp", "count", "sum",
    "avg", "min", "max", "size",
];

/// Look a function up in the dialect's extra functions, then the standard set.
pub fn lookup_function(name: &str, extra: &'static [SqlFunction]) -> Option<SqlFunction> {
    let lower = name.to_ascii_lowercase();
    extra
        .iter()
        .chain(STANDARD_FUNCTIONS.iter())
        .find(|f| f.name == lower)
        .copied()
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for Oracle dialects.
pub fn remap_function_oracle(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "substring" => Some("substr"),
        "ceiling" => Some("ceil"),
        _ => None,
    }
}

/// Remap functions for SQL Server.
pub fn remap_function_tsql(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "length" => Some("len"),
        "ln" => Some("log"),
        _ => None,
    }
}

/// Remap functions for Sybase.
pub fn remap_function_sybase(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "length" => Some("char_length"),
        "ln" => Some("log"),
        _ => None,
    }
}

// =============================================================================
// Cast Types
// =============================================================================

/// ANSI names for cast targets.
pub fn cast_type_name_ansi(cast: CastType) -> &'static str {
    match cast {
        CastType::String | CastType::Other => "varchar",
        CastType::Clob => "clob",
        CastType::Boolean => "boolean",
        CastType::IntegerBoolean | CastType::Integer => "integer",
        CastType::YnBoolean | CastType::TfBoolean => "char(1)",
        CastType::Long => "bigint",
        CastType::Float => "float",
        CastType::Double => "double precision",
        CastType::Fixed => "decimal",
        CastType::Date => "date",
        CastType::Time => "time",
        CastType::Timestamp => "timestamp",
        CastType::OffsetTimestamp | CastType::ZoneTimestamp => "timestamp with time zone",
        CastType::Null => "varchar",
    }
}

/// Oracle names for cast targets.
pub fn cast_type_name_oracle(cast: CastType) -> &'static str {
    match cast {
        CastType::String | CastType::Other | CastType::Null => "varchar2(255)",
        CastType::Boolean | CastType::IntegerBoolean => "number(1,0)",
        CastType::Integer => "number(10,0)",
        CastType::Long => "number(19,0)",
        CastType::Float => "binary_float",
        CastType::Double => "binary_double",
        CastType::Fixed => "number",
        CastType::Time => "date",
        other => cast_type_name_ansi(other),
    }
}

/// SQL Server and Sybase names for cast targets.
pub fn cast_type_name_tsql(cast: CastType) -> &'static str {
    match cast {
        CastType::String | CastType::Other | CastType::Null => "varchar(255)",
        CastType::Clob => "text",
        CastType::Boolean | CastType::IntegerBoolean => "bit",
        CastType::Integer => "int",
        CastType::Double => "float",
        CastType::Fixed => "numeric",
        CastType::Timestamp => "datetime",
        CastType::OffsetTimestamp | CastType::ZoneTimestamp => "datetimeoffset",
        other => cast_type_name_ansi(other),
    }
}

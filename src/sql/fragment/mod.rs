//! SQL fragment builders.
//!
//! String-assembly helpers that each produce one clause, or one whole
//! statement, of literal SQL. Builders are plain values: mutate, then call
//! `to_statement_string()` (or the fragment accessors) as many times as
//! needed. Rendering never mutates the builder.
//!
//! - [`select`] - `Select` (multi-table) and `SimpleSelect` (single table)
//! - [`insert`] - `Insert` and `InsertSelect`
//! - [`update`] - `Update` with optimistic version predicates
//! - [`delete`] - `Delete` with optimistic version predicates
//! - [`join`] - `JoinFragment` family (ANSI, Oracle theta, Sybase 11, query)
//! - [`case`] - `CaseFragment` family (ANSI, decode, HSQL)
//! - [`limit`] - pagination per [`LimitStyle`](crate::sql::dialect::LimitStyle)

pub mod case;
pub mod delete;
pub mod insert;
pub mod join;
pub mod limit;
pub mod select;
pub mod update;

use thiserror::Error;

pub use case::{CaseFragment, CaseStyle};
pub use delete::Delete;
pub use insert::{Insert, InsertSelect};
pub use join::{
    AnsiJoinFragment, JoinFragment, JoinFragmentBuilder, JoinStyle, JoinType, OracleJoinFragment,
    QueryJoinFragment, Sybase11JoinFragment,
};
pub use select::{Select, SimpleSelect};
pub use update::Update;

/// Errors raised while assembling fragments.
///
/// Both variants indicate a caller asked for something the builder cannot
/// express. They are never downgraded to different SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    /// Programming error: the caller passed a value the builder never accepts.
    #[error("assertion failure: {0}")]
    AssertionFailure(String),

    /// The dialect variant structurally cannot express the request.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type FragmentResult<T> = Result<T, FragmentError>;

/// Append `text` as a new conjunct: ` and ` is prefixed unless the text
/// already starts with ` and`. Empty text is ignored.
pub(crate) fn append_condition(buffer: &mut String, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if !text.starts_with(" and") {
        buffer.push_str(" and ");
    }
    buffer.push_str(text);
    true
}

/// Render `/* comment */ ` with any closing marker neutralised.
pub(crate) fn comment_prefix(comment: Option<&str>) -> String {
    match comment {
        Some(c) => format!("/* {} */ ", c.replace("*/", "*\\/")),
        None => String::new(),
    }
}

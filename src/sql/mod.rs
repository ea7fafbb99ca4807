//! SQL generation.
//!
//! - [`ast`] - SQL AST produced by translation, and its renderer
//! - [`dialect`] - per-database syntax rules
//! - [`fragment`] - clause and statement builders
//! - [`lock`] - lock modes and options
//! - [`template`] - alias qualification of mapping-author SQL fragments

pub mod ast;
pub mod dialect;
pub mod fragment;
pub mod lock;
pub mod template;

#[cfg(test)]
pub mod test_utils;

pub use ast::{JdbcOperation, JdbcParameterBinding, SqlRenderer, SqlStatement};
pub use dialect::{Dialect, SqlDialect};
pub use lock::{LockMode, LockOptions, LockTimeout};

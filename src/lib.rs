//! # hqlc
//!
//! An HQL/JPQL query compiler that translates object queries to
//! multi-dialect SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        HQL text              Criteria API (NodeBuilder)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [hql: lexer, parser, semantic]
//! ┌─────────────────────────────────────────────────────────┐
//! │              SQM (Semantic Query Model)                  │
//! │     resolved against the domain metamodel                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [translate]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     SQL AST                              │
//! │   table groups, joins, restrictions, locking roots       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::ast renderer + fragment builders]
//! ┌─────────────────────────────────────────────────────────┐
//! │              SQL text + parameter bindings               │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod compile;
pub mod config;
pub mod error;
pub mod hql;
pub mod metamodel;
pub mod sql;
pub mod sqm;
pub mod translate;

pub use sql::dialect;
pub use sql::fragment;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{compile, compile_statement, load_by_id, CompileOptions, CompiledQuery};
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::error::{QueryError, QueryErrorKind, QueryResult};
    pub use crate::metamodel::{DomainModel, EntityBuilder, MappingMetamodel, MetamodelBuilder};
    pub use crate::sql::lock::{LockMode, LockOptions, LockTimeout};
    pub use crate::sqm::{NodeBuilder, SqmQuery, SqmSelection, SqmStatement};
}

// Also export at crate root for convenience
pub use compile::{compile, compile_statement, load_by_id, lock_by_id, CompileOptions, CompiledQuery};
pub use dialect::Dialect;
pub use error::{QueryError, QueryErrorKind};

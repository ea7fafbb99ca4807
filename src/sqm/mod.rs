//! Semantic Query Model.
//!
//! The SQM is the typed tree both the HQL front-end and the criteria
//! builder produce. Nodes reference each other by id ([`FromId`],
//! [`ParamId`]) so a tree can be cloned, copied with fresh identities, and
//! walked without shared ownership:
//!
//! - [`builder`] - criteria API ([`NodeBuilder`])
//! - [`statement`], [`from`], [`path`], [`expression`], [`predicate`] - nodes
//! - [`copy`] - deep copies with identity remapping
//! - [`visit`] - read-only traversal
//! - [`operator`] and [`types`] - operator enums and expressible types

pub mod builder;
pub mod copy;
pub mod error;
pub mod expression;
pub mod from;
pub mod operator;
pub mod path;
pub mod predicate;
pub mod printer;
pub mod statement;
pub mod types;
pub mod visit;

pub use builder::{BooleanOperand, NodeBuilder};
pub use copy::{SqmCopy, SqmCopyContext};
pub use error::{ErrorCode, SqmError, SqmResult, StrictJpaViolation};
pub use expression::{LiteralValue, ParamLabel, SqmExpression, SqmFunction};
pub use from::{FromSource, JoinInfo, SqmFrom};
pub use path::{FromId, NavigablePath, ParamId, PathKind, SqmPath};
pub use predicate::SqmPredicate;
pub use printer::print_tree;
pub use statement::{
    SqmDeleteStatement, SqmInsertStatement, SqmQuery, SqmQuerySource, SqmQuerySpec,
    SqmSelectStatement, SqmSelection, SqmStatement, SqmUpdateStatement,
};
pub use types::{BasicType, SqmExpressible};
pub use visit::{collect_parameters, SqmParameterInfo, SqmVisitor};

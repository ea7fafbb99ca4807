//! Public error boundary.
//!
//! Every layer raises its own `thiserror` enum. At the library boundary they
//! collapse into [`QueryError`], whose variants are the shapes a caller can
//! act on. The mapping from internal [`ErrorCode`] to external
//! [`QueryErrorKind`] lives in [`QueryErrorKind::of`] and nowhere else.

use thiserror::Error;

use crate::metamodel::MetamodelError;
use crate::sqm::error::{ErrorCode, SqmError};

/// External classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// The query or mapping is wrong: bad path, alias, type or fragment.
    IllegalArgument,
    /// The query dereferences something that cannot be dereferenced.
    IllegalState,
    Syntax,
    /// The dialect cannot express the request.
    Unsupported,
    /// A defect in the compiler.
    Internal,
}

impl QueryErrorKind {
    pub fn of(code: ErrorCode) -> Self {
        use ErrorCode::*;
        match code {
            AliasCollision | IllegalPathUsage | UnknownPathElement | UnknownEntity
            | UnknownAlias | StrictJpaViolation | LiteralNumberFormat | TreatMisuse | Semantic
            | Template => QueryErrorKind::IllegalArgument,
            TerminalPathDereference => QueryErrorKind::IllegalState,
            Syntax => QueryErrorKind::Syntax,
            Unsupported => QueryErrorKind::Unsupported,
            NotYetImplemented | Parsing | Interpretation | AssertionFailure => {
                QueryErrorKind::Internal
            }
        }
    }
}

/// Error returned by [`crate::compile`] and friends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{message}")]
    IllegalArgument { code: ErrorCode, message: String },

    #[error("{message}")]
    IllegalState { code: ErrorCode, message: String },

    #[error("{message}")]
    Syntax { message: String, query: String },

    #[error("{message}")]
    Unsupported { message: String },

    #[error("{message}")]
    Internal {
        code: ErrorCode,
        message: String,
        query: Option<String>,
    },

    /// The mapping could not be loaded or is inconsistent.
    #[error("Invalid mapping: {0}")]
    Mapping(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

impl QueryError {
    pub fn kind(&self) -> QueryErrorKind {
        match self {
            QueryError::IllegalArgument { .. } | QueryError::Mapping(_) => {
                QueryErrorKind::IllegalArgument
            }
            QueryError::IllegalState { .. } => QueryErrorKind::IllegalState,
            QueryError::Syntax { .. } => QueryErrorKind::Syntax,
            QueryError::Unsupported { .. } => QueryErrorKind::Unsupported,
            QueryError::Internal { .. } => QueryErrorKind::Internal,
        }
    }

    /// Internal code of the underlying failure, when it came from the
    /// query pipeline.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            QueryError::IllegalArgument { code, .. }
            | QueryError::IllegalState { code, .. }
            | QueryError::Internal { code, .. } => Some(*code),
            QueryError::Syntax { .. } => Some(ErrorCode::Syntax),
            QueryError::Unsupported { .. } => Some(ErrorCode::Unsupported),
            QueryError::Mapping(_) => None,
        }
    }

    /// Adapt a pipeline error, attaching `query` to internal errors.
    pub fn from_sqm(error: SqmError, query: Option<&str>) -> Self {
        let error = match query {
            Some(text) => error.with_query(text),
            None => error,
        };
        let code = error.code();
        match (QueryErrorKind::of(code), error) {
            (QueryErrorKind::Syntax, SqmError::Syntax { message, query }) => {
                QueryError::Syntax { message, query }
            }
            (QueryErrorKind::Syntax, other) => QueryError::Syntax {
                message: other.to_string(),
                query: query.unwrap_or_default().to_string(),
            },
            (QueryErrorKind::IllegalArgument, other) => QueryError::IllegalArgument {
                code,
                message: other.to_string(),
            },
            (QueryErrorKind::IllegalState, other) => QueryError::IllegalState {
                code,
                message: other.to_string(),
            },
            (QueryErrorKind::Unsupported, other) => QueryError::Unsupported {
                message: other.to_string(),
            },
            (QueryErrorKind::Internal, other) => QueryError::Internal {
                code,
                message: other.to_string(),
                query: query.map(str::to_string),
            },
        }
    }
}

impl From<SqmError> for QueryError {
    fn from(error: SqmError) -> Self {
        QueryError::from_sqm(error, None)
    }
}

impl From<MetamodelError> for QueryError {
    fn from(error: MetamodelError) -> Self {
        QueryError::Mapping(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::fragment::FragmentError;
    use crate::sqm::error::StrictJpaViolation;

    #[test]
    fn test_user_errors_are_illegal_arguments() {
        let err = QueryError::from(SqmError::UnknownEntity("Boook".into()));
        assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);
        assert_eq!(err.code(), Some(ErrorCode::UnknownEntity));
        assert_eq!(err.to_string(), "Could not resolve entity 'Boook'");

        let err = QueryError::from(SqmError::StrictJpaViolation(StrictJpaViolation::CrossJoin));
        assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);
    }

    #[test]
    fn test_terminal_dereference_is_illegal_state() {
        let err = QueryError::from(SqmError::TerminalPathDereference {
            path: "p.title".into(),
            attribute: "length".into(),
        });
        assert_eq!(err.kind(), QueryErrorKind::IllegalState);
    }

    #[test]
    fn test_internal_errors_include_query() {
        let err = QueryError::from_sqm(
            SqmError::interpretation("unexpected node"),
            Some("select p from Publication p"),
        );
        assert_eq!(err.kind(), QueryErrorKind::Internal);
        assert!(err.to_string().contains("[select p from Publication p]"));
        assert!(matches!(err, QueryError::Internal { query: Some(_), .. }));
    }

    #[test]
    fn test_fragment_errors() {
        let err = QueryError::from(SqmError::from(FragmentError::Unsupported("full join".into())));
        assert_eq!(err.kind(), QueryErrorKind::Unsupported);
        let err =
            QueryError::from(SqmError::from(FragmentError::AssertionFailure("none".into())));
        assert_eq!(err.kind(), QueryErrorKind::Internal);
    }

    #[test]
    fn test_syntax_keeps_query() {
        let err = QueryError::from(SqmError::Syntax {
            message: "unexpected token".into(),
            query: "select from".into(),
        });
        assert_eq!(
            err,
            QueryError::Syntax {
                message: "unexpected token".into(),
                query: "select from".into()
            }
        );
    }
}

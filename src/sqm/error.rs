//! Errors raised while building, copying and translating SQM trees.
//!
//! User errors (bad aliases, unknown attributes, strict-JPA violations) carry
//! an actionable message. Internal errors mean the front-end or translator
//! met a shape it does not handle; they carry the query text when known.

use thiserror::Error;

use crate::sql::fragment::FragmentError;
use crate::sql::template::TemplateError;

/// Closed classification of every internal error, consumed by the
/// boundary adapter in [`crate::error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AliasCollision,
    IllegalPathUsage,
    TerminalPathDereference,
    UnknownPathElement,
    UnknownEntity,
    UnknownAlias,
    StrictJpaViolation,
    LiteralNumberFormat,
    TreatMisuse,
    Semantic,
    Syntax,
    Unsupported,
    NotYetImplemented,
    Parsing,
    Interpretation,
    AssertionFailure,
    Template,
}

/// HQL features rejected when strict JPA compliance is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrictJpaViolation {
    LimitOffset,
    FunctionCall,
    SetOperations,
    CteQuery,
    FromSubquery,
    ImplicitSelect,
    AliasedFetchJoin,
    ValuesInsert,
    Filter,
    WindowFunction,
    IndexedElementReference,
    NonJpaTreat,
    CrossJoin,
}

impl StrictJpaViolation {
    pub fn description(self) -> &'static str {
        use StrictJpaViolation::*;
        match self {
            LimitOffset => "limit and offset clause",
            FunctionCall => "improper non-standard function call",
            SetOperations => "set operations",
            CteQuery => "common table expressions",
            FromSubquery => "subqueries in from clause",
            ImplicitSelect => "implicit select clause",
            AliasedFetchJoin => "aliased fetch join",
            ValuesInsert => "values clause in insert",
            Filter => "aggregate filter clause",
            WindowFunction => "window functions",
            IndexedElementReference => "indexed element reference",
            NonJpaTreat => "treat in a non-jpa position",
            CrossJoin => "cross join",
        }
    }
}

impl std::fmt::Display for StrictJpaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqmError {
    #[error("Alias [{alias}] is already used in the same query ({context})")]
    AliasCollision { alias: String, context: String },

    #[error("{0}")]
    IllegalPathUsage(String),

    #[error("Terminal path '{path}' has no attribute '{attribute}'")]
    TerminalPathDereference { path: String, attribute: String },

    #[error("Could not resolve attribute '{attribute}' of '{container}'")]
    UnknownPathElement { container: String, attribute: String },

    #[error("Could not resolve entity '{0}'")]
    UnknownEntity(String),

    #[error("Could not resolve alias or path '{0}'")]
    UnknownAlias(String),

    #[error("Strict JPQL compliance was violated: {0}")]
    StrictJpaViolation(StrictJpaViolation),

    #[error("Could not interpret numeric literal '{text}': {reason}")]
    LiteralNumberFormat { text: String, reason: String },

    #[error("{0}")]
    TreatMisuse(String),

    #[error("{0}")]
    Semantic(String),

    #[error("Syntax error in query [{query}]: {message}")]
    Syntax { message: String, query: String },

    #[error("Not yet implemented: {0}")]
    NotYetImplemented(String),

    #[error("Error creating SQM from parse tree{}: {message}", query_suffix(.query))]
    Parsing {
        message: String,
        query: Option<String>,
    },

    #[error("Error interpreting query{}: {message}", query_suffix(.query))]
    Interpretation {
        message: String,
        query: Option<String>,
    },

    #[error(transparent)]
    Fragment(#[from] FragmentError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

fn query_suffix(query: &Option<String>) -> String {
    match query {
        Some(q) => format!(" [{q}]"),
        None => String::new(),
    }
}

pub type SqmResult<T> = Result<T, SqmError>;

impl SqmError {
    pub fn interpretation(message: impl Into<String>) -> Self {
        SqmError::Interpretation {
            message: message.into(),
            query: None,
        }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        SqmError::Parsing {
            message: message.into(),
            query: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SqmError::AliasCollision { .. } => ErrorCode::AliasCollision,
            SqmError::IllegalPathUsage(_) => ErrorCode::IllegalPathUsage,
            SqmError::TerminalPathDereference { .. } => ErrorCode::TerminalPathDereference,
            SqmError::UnknownPathElement { .. } => ErrorCode::UnknownPathElement,
            SqmError::UnknownEntity(_) => ErrorCode::UnknownEntity,
            SqmError::UnknownAlias(_) => ErrorCode::UnknownAlias,
            SqmError::StrictJpaViolation(_) => ErrorCode::StrictJpaViolation,
            SqmError::LiteralNumberFormat { .. } => ErrorCode::LiteralNumberFormat,
            SqmError::TreatMisuse(_) => ErrorCode::TreatMisuse,
            SqmError::Semantic(_) => ErrorCode::Semantic,
            SqmError::Syntax { .. } => ErrorCode::Syntax,
            SqmError::NotYetImplemented(_) => ErrorCode::NotYetImplemented,
            SqmError::Parsing { .. } => ErrorCode::Parsing,
            SqmError::Interpretation { .. } => ErrorCode::Interpretation,
            SqmError::Fragment(FragmentError::AssertionFailure(_)) => ErrorCode::AssertionFailure,
            SqmError::Fragment(FragmentError::Unsupported(_)) => ErrorCode::Unsupported,
            SqmError::Template(_) => ErrorCode::Template,
        }
    }

    /// Whether the error signals a defect in the compiler rather than in
    /// the query.
    pub fn is_internal(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::NotYetImplemented
                | ErrorCode::Parsing
                | ErrorCode::Interpretation
                | ErrorCode::AssertionFailure
        )
    }

    /// Attach the query text to internal errors that lack it.
    pub fn with_query(self, text: &str) -> Self {
        match self {
            SqmError::Parsing { message, query: None } => SqmError::Parsing {
                message,
                query: Some(text.to_string()),
            },
            SqmError::Interpretation { message, query: None } => SqmError::Interpretation {
                message,
                query: Some(text.to_string()),
            },
            other => other,
        }
    }
}

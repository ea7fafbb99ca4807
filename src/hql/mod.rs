//! HQL front-end: lexing, parsing and lowering of query text to SQM.
//!
//! The pipeline has two stages:
//!
//! - [`parse`] lexes and parses the text into a syntax [`Statement`],
//!   reporting problems as [`Diagnostic`]s with byte spans
//! - [`interpret`] resolves the statement against a [`DomainModel`] and
//!   builds the semantic query tree
//!
//! # Example
//!
//! ```ignore
//! use hqlc::hql::{self, InterpretOptions};
//!
//! let statement = hql::interpret(
//!     "select b.title from Book b where b.price > :min",
//!     &model,
//!     InterpretOptions::default(),
//! )?;
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod span;

pub use ast::Statement;
pub use semantic::InterpretOptions;
pub use span::{Span, Spanned};

use tracing::debug;

use crate::metamodel::DomainModel;
use crate::sqm::error::{SqmError, SqmResult};
use crate::sqm::SqmStatement;

/// Result of parsing a query.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed statement, if parsing succeeded.
    pub statement: Option<Statement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// Returns true if parsing succeeded without errors.
    pub fn is_ok(&self) -> bool {
        self.statement.is_some() && !self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub span: Span,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} (at {:?})", level, self.message, self.span)
    }
}

impl std::error::Error for Diagnostic {}

/// Parse query text into a syntax tree.
pub fn parse(source: &str) -> ParseResult {
    use chumsky::span::Span as _;

    let tokens = match lexer::lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let diagnostics = errors
                .into_iter()
                .map(|e| {
                    let span = e.span();
                    Diagnostic::error(span.start()..span.end(), e.to_string())
                })
                .collect();
            return ParseResult {
                statement: None,
                diagnostics,
            };
        }
    };

    let tokens: Vec<(lexer::Token<'_>, Span)> = tokens
        .into_iter()
        .map(|(token, span)| (token, span.start()..span.end()))
        .collect();

    match parser::parse_statement(&tokens, source) {
        Ok(statement) => ParseResult {
            statement: Some(statement),
            diagnostics: Vec::new(),
        },
        Err(diagnostic) => ParseResult {
            statement: None,
            diagnostics: vec![diagnostic],
        },
    }
}

/// Parse and lower query text to SQM.
///
/// Syntax problems surface as [`SqmError::Syntax`] carrying the first
/// diagnostic; semantic problems carry the query text.
pub fn interpret(
    source: &str,
    model: &dyn DomainModel,
    options: InterpretOptions,
) -> SqmResult<SqmStatement> {
    let parsed = parse(source);
    let statement = match parsed.statement {
        Some(statement) => statement,
        None => {
            let message = parsed
                .diagnostics
                .first()
                .map(|d| d.message.clone())
                .unwrap_or_else(|| "Unable to parse query".to_string());
            return Err(SqmError::Syntax {
                message,
                query: source.to_string(),
            });
        }
    };
    let sqm = semantic::build_statement(&statement, model, options)
        .map_err(|e| e.with_query(source))?;
    debug!(query = source, "interpreted HQL statement");
    Ok(sqm)
}

/// Render a diagnostic against its source, with a caret label.
pub fn render_diagnostic(source: &str, diagnostic: &Diagnostic) -> String {
    use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};

    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let span = diagnostic.span.start.min(source.len())..diagnostic.span.end.min(source.len());
    let mut out = Vec::new();
    let written = Report::build(kind, span.clone())
        .with_config(
            Config::default()
                .with_color(false)
                .with_index_type(IndexType::Byte),
        )
        .with_message(&diagnostic.message)
        .with_label(Label::new(span).with_message(&diagnostic.message))
        .finish()
        .write(Source::from(source), &mut out);
    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => diagnostic.to_string(),
    }
}

/// Render every diagnostic of a parse result.
pub fn render_diagnostics(source: &str, result: &ParseResult) -> String {
    result
        .diagnostics
        .iter()
        .map(|d| render_diagnostic(source, d))
        .collect()
}

//! Alias interpolation for mapping-author SQL fragments.
//!
//! Restrictions, order-by fragments and formulas written in a mapping refer
//! to columns without a table alias:
//!
//! ```text
//! status <> 'X' and upper(`Type`) = :type
//! ```
//!
//! [`render_where_string_template`] qualifies every column reference with a
//! placeholder, which [`inject_alias`] later replaces with the real alias:
//!
//! ```text
//! $PlaceHolder$.status <> 'X' and upper($PlaceHolder$."Type") = :type
//! ```
//!
//! The scanner splits the fragment into words and single-character symbols,
//! then walks the tokens with a small amount of state: inside a string
//! literal, inside a quoted identifier, and after `from`/`join` (where the
//! next word names a table and is left alone).

use thiserror::Error;

use super::dialect::{Dialect, SqlDialect};

/// Default placeholder for the table alias.
pub const TEMPLATE: &str = "$PlaceHolder$";

/// Reserved words that are never column references.
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "like", "escape", "is", "in", "between", "null", "select", "distinct",
    "from", "join", "inner", "outer", "left", "right", "on", "where", "having", "group", "order",
    "by", "desc", "asc", "limit", "any", "some", "exists", "all", "union", "minus",
];

/// Keywords after which the next word is a table name.
const BEFORE_TABLE_KEYWORDS: &[&str] = &["from", "join"];

/// Words that appear inside function argument lists.
const FUNCTION_KEYWORDS: &[&str] = &[
    "as", "leading", "trailing", "from", "case", "when", "then", "else", "end",
];

/// Extra words recognised in order-by fragments.
const ORDER_BY_KEYWORDS: &[&str] = &["nulls", "first", "last", "collate"];

const TRIM_SPECS: &[&str] = &["leading", "trailing", "both"];

const SYMBOLS: &str = "=><!+-*/()',|&`";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unexpected number of trim function operands: {0}")]
    TrimOperandCount(usize),

    #[error("Expecting FROM, found: {0}")]
    ExpectingFrom(String),

    #[error("unterminated {0}(...) in template")]
    Unterminated(&'static str),
}

pub type TemplateResult<T> = Result<T, TemplateError>;

/// A scanned piece of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// One symbol character (operator, paren, quote) or one whitespace char.
    Symbol(&'a str),
    /// A maximal run of non-symbol characters.
    Word(&'a str),
}

impl<'a> Token<'a> {
    fn text(self) -> &'a str {
        match self {
            Token::Symbol(s) | Token::Word(s) => s,
        }
    }

    fn is(self, text: &str) -> bool {
        self.text() == text
    }

    fn is_whitespace(self) -> bool {
        matches!(self, Token::Symbol(s) if s.chars().all(char::is_whitespace))
    }
}

fn tokenize(fragment: &str, dialect: Dialect) -> Vec<Token<'_>> {
    let open = dialect.open_quote();
    let close = dialect.close_quote();
    let is_symbol = |c: char| SYMBOLS.contains(c) || c.is_whitespace() || c == open || c == close;

    let mut tokens = Vec::new();
    let mut word_start = None;
    for (i, c) in fragment.char_indices() {
        if is_symbol(c) {
            if let Some(start) = word_start.take() {
                tokens.push(Token::Word(&fragment[start..i]));
            }
            tokens.push(Token::Symbol(&fragment[i..i + c.len_utf8()]));
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(start) = word_start {
        tokens.push(Token::Word(&fragment[start..]));
    }
    tokens
}

struct Scanner<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    /// Concatenate tokens up to (not including) `delimiter`, which is consumed.
    fn until(&mut self, delimiter: &str, function: &'static str) -> TemplateResult<String> {
        let mut value = String::new();
        loop {
            match self.next() {
                Some(t) if t.text().eq_ignore_ascii_case(delimiter) => {
                    return Ok(value.trim().to_string())
                }
                Some(t) => value.push_str(t.text()),
                None => return Err(TemplateError::Unterminated(function)),
            }
        }
    }
}

#[derive(Default)]
struct State {
    quoted: bool,
    quoted_identifier: bool,
    before_table: bool,
    in_from_clause: bool,
    after_from_table: bool,
}

/// Qualify the column references of a where-style fragment with `placeholder`.
///
/// Output that already carries the placeholder is left as it is.
pub fn render_where_string_template(
    fragment: &str,
    placeholder: &str,
    dialect: Dialect,
) -> TemplateResult<String> {
    render(fragment, placeholder, dialect, &[])
}

/// Qualify the column references of an order-by fragment.
///
/// Like [`render_where_string_template`], also treating `nulls first|last`
/// and `collate` as keywords.
pub fn render_order_by_string_template(
    fragment: &str,
    placeholder: &str,
    dialect: Dialect,
) -> TemplateResult<String> {
    render(fragment, placeholder, dialect, ORDER_BY_KEYWORDS)
}

/// Replace the placeholder with a real table alias. An empty alias drops the
/// qualification entirely.
pub fn inject_alias(template: &str, placeholder: &str, alias: &str) -> String {
    if alias.is_empty() {
        template.replace(&format!("{placeholder}."), "")
    } else {
        template.replace(placeholder, alias)
    }
}

fn render(
    fragment: &str,
    placeholder: &str,
    dialect: Dialect,
    extra_keywords: &[&str],
) -> TemplateResult<String> {
    let mut scanner = Scanner {
        tokens: tokenize(fragment, dialect),
        pos: 0,
    };
    let open_quote = dialect.open_quote().to_string();
    let close_quote = dialect.close_quote().to_string();
    let qualifier = format!("{placeholder}.");

    let mut state = State::default();
    let mut result = String::with_capacity(fragment.len() + 16);

    while let Some(token) = scanner.next() {
        let next = scanner.peek();
        let mut text = token.text();
        let mut is_quote_character = false;

        if !state.quoted_identifier && token.is("'") {
            state.quoted = !state.quoted;
            is_quote_character = true;
        }

        if !state.quoted {
            let mut is_open_quote = false;
            if token.is("`") {
                is_open_quote = !state.quoted_identifier;
                text = if is_open_quote { &open_quote } else { &close_quote };
                state.quoted_identifier = is_open_quote;
                is_quote_character = true;
            } else if !state.quoted_identifier && token.is(&open_quote) {
                is_open_quote = true;
                state.quoted_identifier = true;
                is_quote_character = true;
            } else if state.quoted_identifier && token.is(&close_quote) {
                state.quoted_identifier = false;
                is_quote_character = true;
            }

            if is_open_quote && !result.ends_with(&qualifier) {
                result.push_str(&qualifier);
            }
        }

        let lower = text.to_ascii_lowercase();

        if !state.quoted && !state.quoted_identifier && next.is_some_and(|n| n.is("(")) {
            if lower == "extract" {
                scanner.next();
                let field = scanner.until("from", "extract")?;
                let source = scanner.until(")", "extract")?;
                let source = render(&source, placeholder, dialect, extra_keywords)?;
                result.push_str(&format!("extract({field} from {source})"));
                continue;
            }
            if lower == "trim" {
                scanner.next();
                result.push_str(&render_trim(&mut scanner, placeholder, dialect, extra_keywords)?);
                continue;
            }
        }

        if state.quoted || state.quoted_identifier || is_quote_character || token.is_whitespace() {
            result.push_str(text);
        } else if state.before_table {
            result.push_str(text);
            state.before_table = false;
            state.after_from_table = true;
        } else if state.after_from_table {
            if lower != "as" {
                state.after_from_table = false;
            }
            result.push_str(text);
        } else if is_named_parameter(text) {
            result.push_str(text);
        } else if is_identifier(text) && !is_function_or_keyword(&lower, next, dialect, extra_keywords) {
            result.push_str(&qualifier);
            result.push_str(&dialect.quote(text));
        } else {
            if BEFORE_TABLE_KEYWORDS.contains(&lower.as_str()) {
                state.before_table = true;
                state.in_from_clause = true;
            } else if state.in_from_clause && lower == "," {
                state.before_table = true;
            }
            result.push_str(text);
        }

        if state.in_from_clause
            && KEYWORDS.contains(&lower.as_str())
            && !BEFORE_TABLE_KEYWORDS.contains(&lower.as_str())
        {
            state.in_from_clause = false;
        }
    }

    Ok(result)
}

/// `trim([spec] [char] [from] source)`; the opening paren is consumed.
fn render_trim(
    scanner: &mut Scanner<'_>,
    placeholder: &str,
    dialect: Dialect,
    extra_keywords: &[&str],
) -> TemplateResult<String> {
    let mut operands: Vec<String> = Vec::new();
    let mut literal = String::new();
    let mut in_literal = false;

    loop {
        let Some(token) = scanner.next() else {
            return Err(TemplateError::Unterminated("trim"));
        };
        if token.is("'") {
            literal.push('\'');
            if in_literal {
                operands.push(std::mem::take(&mut literal));
            }
            in_literal = !in_literal;
        } else if in_literal {
            literal.push_str(token.text());
        } else if token.is(")") {
            break;
        } else if !token.is_whitespace() {
            operands.push(token.text().to_string());
        }
    }

    let trim = TrimOperands::parse(operands)?;
    let mut out = String::from("trim(");
    if let Some(spec) = &trim.spec {
        out.push_str(spec);
        out.push(' ');
    }
    if let Some(trim_char) = &trim.trim_char {
        if trim_char.starts_with('\'') && trim_char.ends_with('\'') {
            out.push_str(trim_char);
        } else {
            out.push_str(&render(trim_char, placeholder, dialect, extra_keywords)?);
        }
        out.push(' ');
    }
    if trim.has_from || trim.spec.is_some() || trim.trim_char.is_some() {
        out.push_str("from ");
    }
    out.push_str(&render(&trim.source, placeholder, dialect, extra_keywords)?);
    out.push(')');
    Ok(out)
}

struct TrimOperands {
    spec: Option<String>,
    trim_char: Option<String>,
    has_from: bool,
    source: String,
}

impl TrimOperands {
    fn parse(mut operands: Vec<String>) -> TemplateResult<Self> {
        let size = operands.len();
        if !(1..=4).contains(&size) {
            return Err(TemplateError::TrimOperandCount(size));
        }
        let source = operands.pop().unwrap_or_default();
        if size == 1 {
            return Ok(Self {
                spec: None,
                trim_char: None,
                has_from: false,
                source,
            });
        }

        let from = operands.pop().unwrap_or_default();
        if !from.eq_ignore_ascii_case("from") {
            return Err(TemplateError::ExpectingFrom(from));
        }

        let mut rest = operands.into_iter();
        let first = rest.next();
        let (spec, trim_char) = match first {
            Some(f) if TRIM_SPECS.iter().any(|s| s.eq_ignore_ascii_case(&f)) => (Some(f), rest.next()),
            other => (None, other),
        };
        Ok(Self {
            spec,
            trim_char,
            has_from: true,
            source,
        })
    }
}

fn is_named_parameter(token: &str) -> bool {
    token.starts_with(':')
}

/// Backtick-quoted, or starting with a letter and not already qualified.
fn is_identifier(token: &str) -> bool {
    match token.chars().next() {
        Some('`') => true,
        Some(c) => c.is_alphabetic() && !token.contains('.'),
        None => false,
    }
}

fn is_function_or_keyword(
    lower: &str,
    next: Option<Token<'_>>,
    dialect: Dialect,
    extra_keywords: &[&str],
) -> bool {
    next.is_some_and(|n| n.is("("))
        || KEYWORDS.contains(&lower)
        || is_function_without_parens(lower, dialect)
        || dialect.is_keyword(lower)
        || FUNCTION_KEYWORDS.contains(&lower)
        || extra_keywords.contains(&lower)
}

/// A registered function not followed by `(` is only a function if it is
/// written without parentheses (`current_date`).
fn is_function_without_parens(lower: &str, dialect: Dialect) -> bool {
    dialect
        .function(lower)
        .is_some_and(|f| !f.has_parens_if_no_args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(fragment: &str) -> String {
        render_where_string_template(fragment, TEMPLATE, Dialect::Postgres).unwrap()
    }

    #[test]
    fn test_columns_are_qualified() {
        assert_eq!(render("status='X'"), "$PlaceHolder$.status='X'");
        assert_eq!(
            render("a = 1 and b is not null"),
            "$PlaceHolder$.a = 1 and $PlaceHolder$.b is not null"
        );
    }

    #[test]
    fn test_functions_keywords_and_parameters() {
        assert_eq!(
            render("upper(name) like :pattern"),
            "upper($PlaceHolder$.name) like :pattern"
        );
        assert_eq!(render("created < current_date"), "$PlaceHolder$.created < current_date");
        assert_eq!(render("x.y = 2"), "x.y = 2");
    }

    #[test]
    fn test_string_literals_untouched() {
        assert_eq!(render("kind = 'a and b'"), "$PlaceHolder$.kind = 'a and b'");
    }

    #[test]
    fn test_subquery_table_not_qualified() {
        assert_eq!(
            render("id in (select o.ref from orders o where o.total > 10)"),
            "$PlaceHolder$.id in (select o.ref from orders o where o.total > 10)"
        );
    }

    #[test]
    fn test_backticks_become_dialect_quotes() {
        assert_eq!(render("`Type` = 1"), "$PlaceHolder$.\"Type\" = 1");
        let mysql = render_where_string_template("`Type` = 1", TEMPLATE, Dialect::MySql).unwrap();
        assert_eq!(mysql, "$PlaceHolder$.`Type` = 1");
        let tsql = render_where_string_template("`Type` = 1", TEMPLATE, Dialect::TSql).unwrap();
        assert_eq!(tsql, "$PlaceHolder$.[Type] = 1");
    }

    #[test]
    fn test_idempotent() {
        for fragment in ["status='X' and `Type` = 1", "upper(name) like :p", "a between 1 and 2"] {
            let once = render(fragment);
            assert_eq!(render(&once), once, "fragment {fragment}");
        }
    }

    #[test]
    fn test_extract_and_trim() {
        assert_eq!(
            render("extract(year from created) = 2020"),
            "extract(year from $PlaceHolder$.created) = 2020"
        );
        assert_eq!(render("trim(name) = 'x'"), "trim($PlaceHolder$.name) = 'x'");
        assert_eq!(
            render("trim(leading ' ' from name) = 'x'"),
            "trim(leading ' ' from $PlaceHolder$.name) = 'x'"
        );
    }

    #[test]
    fn test_trim_without_from_is_rejected() {
        let err = render_where_string_template("trim(leading name)", TEMPLATE, Dialect::Ansi).unwrap_err();
        assert_eq!(err, TemplateError::ExpectingFrom("leading".into()));
    }

    #[test]
    fn test_dialect_keywords() {
        let oracle = render_where_string_template("created < sysdate and rownum < 5", TEMPLATE, Dialect::Oracle)
            .unwrap();
        assert_eq!(oracle, "$PlaceHolder$.created < sysdate and rownum < 5");
    }

    #[test]
    fn test_order_by_template() {
        let rendered =
            render_order_by_string_template("name desc nulls last, id", TEMPLATE, Dialect::Postgres).unwrap();
        assert_eq!(rendered, "$PlaceHolder$.name desc nulls last, $PlaceHolder$.id");
    }

    #[test]
    fn test_inject_alias() {
        let template = render("status='X'");
        assert_eq!(inject_alias(&template, TEMPLATE, "b1_0"), "b1_0.status='X'");
        assert_eq!(inject_alias(&template, TEMPLATE, ""), "status='X'");
    }
}

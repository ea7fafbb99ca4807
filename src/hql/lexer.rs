//! Lexer for HQL.
//!
//! Keywords are case-insensitive. Most of them are only reserved in the
//! positions where the grammar uses them; the parser accepts the others as
//! identifiers (see [`Keyword::is_reserved`]).

use chumsky::prelude::*;

/// HQL keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    All,
    And,
    Any,
    As,
    Asc,
    Between,
    Both,
    By,
    Case,
    Cast,
    Cross,
    Current,
    Delete,
    Desc,
    Distinct,
    Else,
    Empty,
    End,
    Escape,
    Every,
    Except,
    Exclude,
    Exists,
    False,
    Fetch,
    Filter,
    First,
    Following,
    From,
    Full,
    Group,
    Groups,
    Having,
    Ilike,
    In,
    Inner,
    Insert,
    Intersect,
    Into,
    Is,
    Join,
    Last,
    Lateral,
    Leading,
    Left,
    Like,
    Limit,
    Member,
    New,
    Next,
    No,
    Not,
    Null,
    Nulls,
    Of,
    Offset,
    On,
    Only,
    Or,
    Order,
    Others,
    Outer,
    Over,
    Partition,
    Percent,
    Preceding,
    Range,
    Right,
    Row,
    Rows,
    Select,
    Set,
    Size,
    Some,
    Then,
    Ties,
    Trailing,
    Treat,
    Trim,
    True,
    Type,
    Unbounded,
    Union,
    Update,
    Values,
    Versioned,
    When,
    Where,
    With,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("all", Keyword::All),
    ("and", Keyword::And),
    ("any", Keyword::Any),
    ("as", Keyword::As),
    ("asc", Keyword::Asc),
    ("between", Keyword::Between),
    ("both", Keyword::Both),
    ("by", Keyword::By),
    ("case", Keyword::Case),
    ("cast", Keyword::Cast),
    ("cross", Keyword::Cross),
    ("current", Keyword::Current),
    ("delete", Keyword::Delete),
    ("desc", Keyword::Desc),
    ("distinct", Keyword::Distinct),
    ("else", Keyword::Else),
    ("empty", Keyword::Empty),
    ("end", Keyword::End),
    ("escape", Keyword::Escape),
    ("every", Keyword::Every),
    ("except", Keyword::Except),
    ("exclude", Keyword::Exclude),
    ("exists", Keyword::Exists),
    ("false", Keyword::False),
    ("fetch", Keyword::Fetch),
    ("filter", Keyword::Filter),
    ("first", Keyword::First),
    ("following", Keyword::Following),
    ("from", Keyword::From),
    ("full", Keyword::Full),
    ("group", Keyword::Group),
    ("groups", Keyword::Groups),
    ("having", Keyword::Having),
    ("ilike", Keyword::Ilike),
    ("in", Keyword::In),
    ("inner", Keyword::Inner),
    ("insert", Keyword::Insert),
    ("intersect", Keyword::Intersect),
    ("into", Keyword::Into),
    ("is", Keyword::Is),
    ("join", Keyword::Join),
    ("last", Keyword::Last),
    ("lateral", Keyword::Lateral),
    ("leading", Keyword::Leading),
    ("left", Keyword::Left),
    ("like", Keyword::Like),
    ("limit", Keyword::Limit),
    ("member", Keyword::Member),
    ("new", Keyword::New),
    ("next", Keyword::Next),
    ("no", Keyword::No),
    ("not", Keyword::Not),
    ("null", Keyword::Null),
    ("nulls", Keyword::Nulls),
    ("of", Keyword::Of),
    ("offset", Keyword::Offset),
    ("on", Keyword::On),
    ("only", Keyword::Only),
    ("or", Keyword::Or),
    ("order", Keyword::Order),
    ("others", Keyword::Others),
    ("outer", Keyword::Outer),
    ("over", Keyword::Over),
    ("partition", Keyword::Partition),
    ("percent", Keyword::Percent),
    ("preceding", Keyword::Preceding),
    ("range", Keyword::Range),
    ("right", Keyword::Right),
    ("row", Keyword::Row),
    ("rows", Keyword::Rows),
    ("select", Keyword::Select),
    ("set", Keyword::Set),
    ("size", Keyword::Size),
    ("some", Keyword::Some),
    ("then", Keyword::Then),
    ("ties", Keyword::Ties),
    ("trailing", Keyword::Trailing),
    ("treat", Keyword::Treat),
    ("trim", Keyword::Trim),
    ("true", Keyword::True),
    ("type", Keyword::Type),
    ("unbounded", Keyword::Unbounded),
    ("union", Keyword::Union),
    ("update", Keyword::Update),
    ("values", Keyword::Values),
    ("versioned", Keyword::Versioned),
    ("when", Keyword::When),
    ("where", Keyword::Where),
    ("with", Keyword::With),
];

impl Keyword {
    /// Case-insensitive keyword lookup.
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(word))
            .map(|(_, kw)| *kw)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(text, _)| *text)
            .unwrap_or("?")
    }

    /// Reserved keywords never stand for an identifier. The others (`type`,
    /// `size`, `first`, ...) are accepted wherever an entity, attribute or
    /// alias name may appear.
    pub fn is_reserved(self) -> bool {
        use Keyword::*;
        matches!(
            self,
            All | And
                | Any
                | As
                | Asc
                | Between
                | By
                | Case
                | Cross
                | Delete
                | Desc
                | Distinct
                | Else
                | Empty
                | End
                | Escape
                | Every
                | Except
                | Exists
                | False
                | Fetch
                | Filter
                | From
                | Full
                | Group
                | Having
                | Ilike
                | In
                | Inner
                | Insert
                | Intersect
                | Into
                | Is
                | Join
                | Lateral
                | Left
                | Like
                | Limit
                | Member
                | New
                | Not
                | Null
                | Nulls
                | Of
                | Offset
                | On
                | Or
                | Order
                | Outer
                | Over
                | Right
                | Select
                | Set
                | Some
                | Then
                | True
                | Union
                | Update
                | Values
                | When
                | Where
                | With
        )
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token of HQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    Keyword(Keyword),
    /// An identifier (not a keyword).
    Ident(&'src str),
    /// A backtick-quoted identifier (contents without quotes).
    QuotedIdent(&'src str),
    /// A string literal, with `''` escapes resolved.
    StringLit(String),
    /// A numeric literal as written, including any type suffix.
    Number(&'src str),
    /// `:name`
    NamedParam(&'src str),
    /// `?1` (the digits)
    PositionalParam(&'src str),
    /// `?` without a position
    Question,

    // ========================================================================
    // Operators
    // ========================================================================
    /// `=`
    Eq,
    /// `<>` or `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `||`
    Concat,

    // ========================================================================
    // Punctuation
    // ========================================================================
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
}

impl<'src> std::fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(kw) => write!(f, "{kw}"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::QuotedIdent(s) => write!(f, "`{s}`"),
            Token::StringLit(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::Number(s) => write!(f, "{s}"),
            Token::NamedParam(s) => write!(f, ":{s}"),
            Token::PositionalParam(s) => write!(f, "?{s}"),
            Token::Question => write!(f, "?"),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Concat => write!(f, "||"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
        }
    }
}

fn keyword_or_ident(s: &str) -> Token<'_> {
    match Keyword::lookup(s) {
        Some(kw) => Token::Keyword(kw),
        None => Token::Ident(s),
    }
}

/// Create a lexer for HQL.
///
/// Returns a parser that tokenizes the input string into a sequence of
/// tokens with span information, skipping whitespace and comments.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    let ident = text::ident().map(keyword_or_ident);

    // `name`
    let quoted_ident = just('`')
        .ignore_then(none_of('`').repeated().to_slice())
        .then_ignore(just('`'))
        .map(Token::QuotedIdent);

    // 'it''s'
    let string_lit = just('\'')
        .ignore_then(
            choice((none_of('\'').ignored(), just("''").ignored()))
                .repeated()
                .to_slice(),
        )
        .then_ignore(just('\''))
        .map(|s: &str| Token::StringLit(s.replace("''", "'")));

    // 10, 1.5, .5, 1e10, 10L, 1.5BD, 10BI
    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(text::digits(10));
    let suffix = choice((
        one_of("bB").then(one_of("iIdD")).ignored(),
        one_of("lLfFdD").ignored(),
    ));
    let number = choice((
        text::digits(10)
            .then(just('.').then(text::digits(10).or_not()).or_not())
            .ignored(),
        just('.').then(text::digits(10)).ignored(),
    ))
    .then(exponent.or_not())
    .then(suffix.or_not())
    .to_slice()
    .map(Token::Number);

    let named_param = just(':').ignore_then(text::ident()).map(Token::NamedParam);
    let positional_param = just('?')
        .ignore_then(text::digits(10).to_slice())
        .map(Token::PositionalParam);

    // multi-char operators first
    let symbol = choice((
        just("<>").to(Token::NotEq),
        just("!=").to(Token::NotEq),
        just("<=").to(Token::Le),
        just(">=").to(Token::Ge),
        just("||").to(Token::Concat),
        just('=').to(Token::Eq),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        just('?').to(Token::Question),
    ));

    let single_line_comment = just("--")
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();

    let multi_line_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .ignored();

    let comment = single_line_comment.or(multi_line_comment);

    let token = choice((
        ident,
        quoted_ident,
        string_lit,
        number,
        named_param,
        positional_param,
        symbol,
    ))
    .map_with(|tok, e| (tok, e.span()));

    token
        .padded_by(comment.padded().repeated())
        .padded()
        .repeated()
        .collect()
        .padded_by(comment.padded().repeated())
        .padded()
        .then_ignore(end())
}

/// Lex a query string into tokens.
///
/// Returns Ok with the token list on success, or Err with the lexer errors.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}

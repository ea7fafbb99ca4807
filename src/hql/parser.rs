//! Recursive-descent parser from HQL tokens to the syntax tree.
//!
//! The parser stops at the first error and reports it as a [`Diagnostic`]
//! pointing at the offending token.

use super::ast::*;
use super::lexer::{Keyword, Token};
use super::span::{Span, Spanned};
use super::Diagnostic;
use crate::sqm::operator::{
    ComparisonOperator, FetchClauseType, FrameExclusion, FrameKind, FrameMode, NullPrecedence,
    SetOperator, SortDirection, SqmJoinType, TrimSpec,
};

pub type ParseResult<T> = Result<T, Diagnostic>;

/// Parse a complete statement; trailing tokens are an error.
pub fn parse_statement(tokens: &[(Token<'_>, Span)], source: &str) -> ParseResult<Statement> {
    let mut parser = Parser::new(tokens, source);
    let statement = parser.statement()?;
    if let Some(token) = parser.current() {
        return Err(parser.error_here(format!("Unexpected token '{token}'")));
    }
    Ok(statement)
}

/// Token cursor over a lexed query.
struct Parser<'t, 'src> {
    tokens: &'t [(Token<'src>, Span)],
    source: &'src str,
    pos: usize,
}

impl<'t, 'src> Parser<'t, 'src> {
    fn new(tokens: &'t [(Token<'src>, Span)], source: &'src str) -> Self {
        Self {
            tokens,
            source,
            pos: 0,
        }
    }

    // ========================================================================
    // Cursor
    // ========================================================================

    fn current(&self) -> Option<&'t Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek(&self, offset: usize) -> Option<&'t Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    /// Span of the current token, or an empty span at the end of input.
    fn span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    fn previous_end(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)) {
            Some((_, span)) => span.end,
            None => 0,
        }
    }

    fn span_from(&self, start: usize) -> Span {
        start..self.previous_end().max(start)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, token: &Token<'_>) -> bool {
        self.current() == Some(token)
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        self.current() == Some(&Token::Keyword(kw))
    }

    fn eat(&mut self, token: &Token<'_>) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        self.eat(&Token::Keyword(kw))
    }

    fn expect(&mut self, token: &Token<'_>) -> ParseResult<Span> {
        if self.check(token) {
            let span = self.span();
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(&format!("'{token}'")))
        }
    }

    fn expect_kw(&mut self, kw: Keyword) -> ParseResult<Span> {
        self.expect(&Token::Keyword(kw))
    }

    fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(self.span(), message)
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        match self.current() {
            Some(token) => self.error_here(format!("Expected {expected}, found '{token}'")),
            None => self.error_here(format!("Expected {expected}, found end of query")),
        }
    }

    /// Whether `(` at the cursor opens a subquery.
    fn at_subquery(&self) -> bool {
        self.check(&Token::LParen)
            && matches!(
                self.peek(1),
                Some(Token::Keyword(Keyword::Select | Keyword::From | Keyword::With))
            )
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    /// Identifier where a name is expected; soft keywords qualify.
    fn ident(&mut self) -> ParseResult<Ident> {
        let span = self.span();
        let name = match self.current() {
            Some(Token::Ident(s)) | Some(Token::QuotedIdent(s)) => s.to_string(),
            Some(Token::Keyword(kw)) if !kw.is_reserved() => self.source[span.clone()].to_string(),
            _ => return Err(self.unexpected("an identifier")),
        };
        self.advance();
        Ok(Spanned::new(name, span))
    }

    /// Identifier after a `.`; any keyword qualifies.
    fn attribute_name(&mut self) -> ParseResult<Ident> {
        let span = self.span();
        let name = match self.current() {
            Some(Token::Ident(s)) | Some(Token::QuotedIdent(s)) => s.to_string(),
            Some(Token::Keyword(_)) => self.source[span.clone()].to_string(),
            _ => return Err(self.unexpected("an attribute name")),
        };
        self.advance();
        Ok(Spanned::new(name, span))
    }

    fn at_ident(&self) -> bool {
        match self.current() {
            Some(Token::Ident(_)) | Some(Token::QuotedIdent(_)) => true,
            Some(Token::Keyword(kw)) => !kw.is_reserved(),
            _ => false,
        }
    }

    /// `[as] alias`; without `as` only plain identifiers are taken.
    fn alias(&mut self) -> ParseResult<Option<Ident>> {
        if self.eat_kw(Keyword::As) {
            return self.ident().map(Some);
        }
        match self.current() {
            Some(Token::Ident(_)) | Some(Token::QuotedIdent(_)) => self.ident().map(Some),
            _ => Ok(None),
        }
    }

    /// `a.b.c` as one name (entity names, instantiation targets).
    fn dotted_name(&mut self) -> ParseResult<Ident> {
        let first = self.ident()?;
        let start = first.span.start;
        let mut name = first.value;
        while self.check(&Token::Dot) {
            self.advance();
            let part = self.attribute_name()?;
            name.push('.');
            name.push_str(&part);
        }
        Ok(Spanned::new(name, self.span_from(start)))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> ParseResult<Statement> {
        match self.current() {
            Some(Token::Keyword(Keyword::Update)) => self.update().map(Statement::Update),
            Some(Token::Keyword(Keyword::Delete)) => self.delete().map(Statement::Delete),
            Some(Token::Keyword(Keyword::Insert)) => self.insert().map(Statement::Insert),
            Some(Token::Keyword(Keyword::Select | Keyword::From | Keyword::With))
            | Some(Token::LParen) => self.select_statement().map(Statement::Select),
            _ => Err(self.unexpected("'select', 'from', 'update', 'delete' or 'insert'")),
        }
    }

    fn select_statement(&mut self) -> ParseResult<SelectStatement> {
        let mut ctes = Vec::new();
        if self.eat_kw(Keyword::With) {
            loop {
                ctes.push(self.cte()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        let query = self.query_expression()?;
        Ok(SelectStatement { ctes, query })
    }

    fn cte(&mut self) -> ParseResult<Cte> {
        let name = self.ident()?;
        let mut columns = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                columns.push(self.ident()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
        }
        self.expect_kw(Keyword::As)?;
        self.expect(&Token::LParen)?;
        let query = self.query_expression()?;
        self.expect(&Token::RParen)?;
        Ok(Cte {
            name,
            columns,
            query,
        })
    }

    fn update(&mut self) -> ParseResult<UpdateStatement> {
        self.expect_kw(Keyword::Update)?;
        let versioned = self.eat_kw(Keyword::Versioned);
        let entity = self.dotted_name()?;
        let alias = self.alias()?;
        self.expect_kw(Keyword::Set)?;
        let mut assignments = Vec::new();
        loop {
            let path = self.path()?;
            self.expect(&Token::Eq)?;
            let value = self.expression()?;
            assignments.push(Assignment { path, value });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let where_ = self.where_clause()?;
        Ok(UpdateStatement {
            versioned,
            entity,
            alias,
            assignments,
            where_,
        })
    }

    fn delete(&mut self) -> ParseResult<DeleteStatement> {
        self.expect_kw(Keyword::Delete)?;
        self.eat_kw(Keyword::From);
        let entity = self.dotted_name()?;
        let alias = self.alias()?;
        let where_ = self.where_clause()?;
        Ok(DeleteStatement {
            entity,
            alias,
            where_,
        })
    }

    fn insert(&mut self) -> ParseResult<InsertStatement> {
        self.expect_kw(Keyword::Insert)?;
        self.eat_kw(Keyword::Into);
        let entity = self.dotted_name()?;
        self.expect(&Token::LParen)?;
        let mut paths = Vec::new();
        loop {
            paths.push(self.path()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        let values = if self.eat_kw(Keyword::Values) {
            let mut rows = Vec::new();
            loop {
                self.expect(&Token::LParen)?;
                rows.push(self.expression_list()?);
                self.expect(&Token::RParen)?;
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            InsertValues::Rows(rows)
        } else {
            InsertValues::Query(self.query_expression()?)
        };
        Ok(InsertStatement {
            entity,
            paths,
            values,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn query_expression(&mut self) -> ParseResult<QueryExpression> {
        let start = self.span().start;
        let mut query = self.ordered_query()?;
        while let Some(op) = self.set_operator() {
            let rhs = self.ordered_query()?;
            query = match query {
                QueryExpression {
                    body:
                        QueryBody::SetOperation {
                            op: existing,
                            mut parts,
                        },
                    order_by,
                    limit: None,
                    offset: None,
                    fetch: None,
                    ..
                } if existing == op && order_by.is_empty() => {
                    parts.push(rhs);
                    QueryExpression {
                        body: QueryBody::SetOperation { op, parts },
                        order_by: Vec::new(),
                        limit: None,
                        offset: None,
                        fetch: None,
                        span: self.span_from(start),
                    }
                }
                lhs => QueryExpression {
                    body: QueryBody::SetOperation {
                        op,
                        parts: vec![lhs, rhs],
                    },
                    order_by: Vec::new(),
                    limit: None,
                    offset: None,
                    fetch: None,
                    span: self.span_from(start),
                },
            };
        }
        self.query_order(&mut query)?;
        query.span = self.span_from(start);
        Ok(query)
    }

    fn set_operator(&mut self) -> Option<SetOperator> {
        let op = match self.current()? {
            Token::Keyword(Keyword::Union) => SetOperator::Union,
            Token::Keyword(Keyword::Intersect) => SetOperator::Intersect,
            Token::Keyword(Keyword::Except) => SetOperator::Except,
            _ => return None,
        };
        self.advance();
        let all = self.eat_kw(Keyword::All);
        Some(match (op, all) {
            (SetOperator::Union, true) => SetOperator::UnionAll,
            (SetOperator::Intersect, true) => SetOperator::IntersectAll,
            (SetOperator::Except, true) => SetOperator::ExceptAll,
            (op, _) => op,
        })
    }

    /// A query spec, or a parenthesized query expression with its own
    /// ordering and limits.
    fn ordered_query(&mut self) -> ParseResult<QueryExpression> {
        if self.check(&Token::LParen) {
            self.advance();
            let query = self.query_expression()?;
            self.expect(&Token::RParen)?;
            return Ok(query);
        }
        let spec = self.query_spec()?;
        let span = spec.span.clone();
        Ok(QueryExpression {
            body: QueryBody::Spec(Box::new(spec)),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            fetch: None,
            span,
        })
    }

    fn query_spec(&mut self) -> ParseResult<QuerySpec> {
        let start = self.span().start;
        let select = if self.check_kw(Keyword::Select) {
            Some(self.select_clause()?)
        } else {
            None
        };
        if !self.check_kw(Keyword::From) {
            return Err(self.unexpected(if select.is_some() {
                "'from'"
            } else {
                "'select' or 'from'"
            }));
        }
        self.advance();
        let mut from = Vec::new();
        loop {
            from.push(self.from_root()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let where_ = self.where_clause()?;
        let mut group_by = Vec::new();
        if self.eat_kw(Keyword::Group) {
            self.expect_kw(Keyword::By)?;
            group_by = self.expression_list()?;
        }
        let having = if self.eat_kw(Keyword::Having) {
            Some(self.predicate()?)
        } else {
            None
        };
        Ok(QuerySpec {
            select,
            from,
            where_,
            group_by,
            having,
            span: self.span_from(start),
        })
    }

    fn where_clause(&mut self) -> ParseResult<Option<Predicate>> {
        if self.eat_kw(Keyword::Where) {
            self.predicate().map(Some)
        } else {
            Ok(None)
        }
    }

    fn select_clause(&mut self) -> ParseResult<SelectClause> {
        let start = self.expect_kw(Keyword::Select)?.start;
        let distinct = self.eat_kw(Keyword::Distinct);
        let mut items = Vec::new();
        loop {
            items.push(self.select_item()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(SelectClause {
            distinct,
            items,
            span: self.span_from(start),
        })
    }

    fn select_item(&mut self) -> ParseResult<SelectItem> {
        let start = self.span().start;
        let value = if self.eat_kw(Keyword::New) {
            let target = self.dotted_name()?;
            self.expect(&Token::LParen)?;
            let mut arguments = Vec::new();
            loop {
                arguments.push(self.select_item()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
            Selectable::Instantiation { target, arguments }
        } else {
            Selectable::Expr(self.expression()?)
        };
        let alias = self.alias()?;
        Ok(SelectItem {
            value,
            alias,
            span: self.span_from(start),
        })
    }

    /// `order by`, `limit`, `offset` and `fetch` after a query.
    fn query_order(&mut self, query: &mut QueryExpression) -> ParseResult<()> {
        if self.check_kw(Keyword::Order) {
            if !query.order_by.is_empty() {
                return Err(self.error_here("Query already has an order by clause"));
            }
            self.advance();
            self.expect_kw(Keyword::By)?;
            query.order_by = self.sort_list()?;
        }
        if self.eat_kw(Keyword::Limit) {
            query.limit = Some(self.expression()?);
        }
        if self.eat_kw(Keyword::Offset) {
            query.offset = Some(self.expression()?);
            if !self.eat_kw(Keyword::Rows) {
                self.eat_kw(Keyword::Row);
            }
        }
        if self.check_kw(Keyword::Fetch) {
            if query.limit.is_some() {
                return Err(self.error_here("A query cannot have both limit and fetch"));
            }
            self.advance();
            if !self.eat_kw(Keyword::First) && !self.eat_kw(Keyword::Next) {
                return Err(self.unexpected("'first' or 'next'"));
            }
            let count = self.expression()?;
            let percent = self.eat_kw(Keyword::Percent);
            if !self.eat_kw(Keyword::Rows) && !self.eat_kw(Keyword::Row) {
                return Err(self.unexpected("'rows'"));
            }
            let ties = if self.eat_kw(Keyword::Only) {
                false
            } else if self.eat_kw(Keyword::With) {
                self.expect_kw(Keyword::Ties)?;
                true
            } else {
                return Err(self.unexpected("'only' or 'with ties'"));
            };
            let kind = match (percent, ties) {
                (false, false) => FetchClauseType::RowsOnly,
                (false, true) => FetchClauseType::RowsWithTies,
                (true, false) => FetchClauseType::PercentOnly,
                (true, true) => FetchClauseType::PercentWithTies,
            };
            query.fetch = Some(FetchClause { count, kind });
        }
        Ok(())
    }

    fn sort_list(&mut self) -> ParseResult<Vec<SortItem>> {
        let mut items = Vec::new();
        loop {
            let expr = self.expression()?;
            let direction = if self.eat_kw(Keyword::Desc) {
                SortDirection::Descending
            } else {
                self.eat_kw(Keyword::Asc);
                SortDirection::Ascending
            };
            let nulls = if self.eat_kw(Keyword::Nulls) {
                if self.eat_kw(Keyword::First) {
                    NullPrecedence::First
                } else if self.eat_kw(Keyword::Last) {
                    NullPrecedence::Last
                } else {
                    return Err(self.unexpected("'first' or 'last'"));
                }
            } else {
                NullPrecedence::None
            };
            items.push(SortItem {
                expr,
                direction,
                nulls,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    // ========================================================================
    // From clause
    // ========================================================================

    fn from_root(&mut self) -> ParseResult<FromRoot> {
        let start = self.span().start;
        let lateral = self.eat_kw(Keyword::Lateral);
        let source = if self.check(&Token::LParen) {
            self.advance();
            let query = self.query_expression()?;
            self.expect(&Token::RParen)?;
            RootSource::Subquery {
                query: Box::new(query),
                lateral,
            }
        } else if lateral {
            return Err(self.unexpected("a subquery after 'lateral'"));
        } else {
            RootSource::Entity(self.dotted_name()?)
        };
        let alias = self.alias()?;
        let mut joins = Vec::new();
        while let Some(join) = self.join()? {
            joins.push(join);
        }
        Ok(FromRoot {
            source,
            alias,
            joins,
            span: self.span_from(start),
        })
    }

    fn join(&mut self) -> ParseResult<Option<Join>> {
        let start = self.span().start;
        let join_type = match self.current() {
            Some(Token::Keyword(Keyword::Join)) => SqmJoinType::Inner,
            Some(Token::Keyword(Keyword::Inner)) => {
                self.advance();
                SqmJoinType::Inner
            }
            Some(Token::Keyword(Keyword::Cross)) => {
                self.advance();
                SqmJoinType::Cross
            }
            Some(Token::Keyword(kw @ (Keyword::Left | Keyword::Right | Keyword::Full))) => {
                let join_type = match kw {
                    Keyword::Left => SqmJoinType::Left,
                    Keyword::Right => SqmJoinType::Right,
                    _ => SqmJoinType::Full,
                };
                self.advance();
                self.eat_kw(Keyword::Outer);
                join_type
            }
            _ => return Ok(None),
        };
        self.expect_kw(Keyword::Join)?;
        let fetch = self.eat_kw(Keyword::Fetch);
        let lateral = self.eat_kw(Keyword::Lateral);

        let target = if self.check(&Token::LParen) {
            self.advance();
            let query = self.query_expression()?;
            self.expect(&Token::RParen)?;
            JoinTarget::Subquery {
                query: Box::new(query),
                lateral,
            }
        } else if lateral {
            return Err(self.unexpected("a subquery after 'lateral'"));
        } else if self.check_kw(Keyword::Treat) && self.peek(1) == Some(&Token::LParen) {
            self.advance();
            self.advance();
            let path = self.path()?;
            self.expect_kw(Keyword::As)?;
            let entity = self.dotted_name()?;
            self.expect(&Token::RParen)?;
            JoinTarget::Treat { path, entity }
        } else {
            JoinTarget::Path(self.path()?)
        };

        let alias = self.alias()?;
        let on = if self.eat_kw(Keyword::On) || self.eat_kw(Keyword::With) {
            Some(self.predicate()?)
        } else {
            None
        };
        Ok(Some(Join {
            join_type,
            fetch,
            target,
            alias,
            on,
            span: self.span_from(start),
        }))
    }

    // ========================================================================
    // Paths
    // ========================================================================

    fn path(&mut self) -> ParseResult<PathExpr> {
        let start = self.span().start;
        let root = if self.check_kw(Keyword::Treat) && self.peek(1) == Some(&Token::LParen) {
            self.advance();
            self.advance();
            let path = self.path()?;
            self.expect_kw(Keyword::As)?;
            let entity = self.dotted_name()?;
            self.expect(&Token::RParen)?;
            PathRoot::Treat {
                path: Box::new(path),
                entity,
            }
        } else {
            PathRoot::Ident(self.ident()?)
        };
        self.path_continuation(root, start)
    }

    fn path_continuation(&mut self, root: PathRoot, start: usize) -> ParseResult<PathExpr> {
        let mut segments = Vec::new();
        while self.check(&Token::Dot) {
            self.advance();
            segments.push(self.attribute_name()?);
        }
        Ok(PathExpr {
            root,
            segments,
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    pub(super) fn predicate(&mut self) -> ParseResult<Predicate> {
        let start = self.span().start;
        let mut lhs = self.and_predicate()?;
        while self.eat_kw(Keyword::Or) {
            let rhs = self.and_predicate()?;
            lhs = Predicate::new(
                PredicateKind::Or(Box::new(lhs), Box::new(rhs)),
                self.span_from(start),
            );
        }
        Ok(lhs)
    }

    fn and_predicate(&mut self) -> ParseResult<Predicate> {
        let start = self.span().start;
        let mut lhs = self.not_predicate()?;
        while self.eat_kw(Keyword::And) {
            let rhs = self.not_predicate()?;
            lhs = Predicate::new(
                PredicateKind::And(Box::new(lhs), Box::new(rhs)),
                self.span_from(start),
            );
        }
        Ok(lhs)
    }

    fn not_predicate(&mut self) -> ParseResult<Predicate> {
        let start = self.span().start;
        if self.eat_kw(Keyword::Not) {
            let inner = self.not_predicate()?;
            return Ok(Predicate::new(
                PredicateKind::Not(Box::new(inner)),
                self.span_from(start),
            ));
        }
        self.primary_predicate()
    }

    fn primary_predicate(&mut self) -> ParseResult<Predicate> {
        let start = self.span().start;

        if self.check_kw(Keyword::Exists) {
            self.advance();
            let query = self.parenthesized_query()?;
            return Ok(Predicate::new(
                PredicateKind::Exists {
                    query: Box::new(query),
                    negated: false,
                },
                self.span_from(start),
            ));
        }

        // `(predicate)`, unless the parenthesized part is an operand
        if self.check(&Token::LParen) && !self.at_subquery() {
            let saved = self.pos;
            self.advance();
            if let Ok(inner) = self.predicate() {
                if self.eat(&Token::RParen) && !self.at_predicate_operator() {
                    return Ok(inner);
                }
            }
            self.pos = saved;
        }

        let lhs = self.expression()?;
        self.predicate_tail(lhs, start)
    }

    /// Whether the cursor is at an operator that continues an operand.
    fn at_predicate_operator(&self) -> bool {
        match self.current() {
            Some(
                Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::Le
                | Token::Gt
                | Token::Ge
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::Concat,
            ) => true,
            Some(Token::Keyword(
                Keyword::Is
                | Keyword::Between
                | Keyword::Like
                | Keyword::Ilike
                | Keyword::In
                | Keyword::Member,
            )) => true,
            Some(Token::Keyword(Keyword::Not)) => matches!(
                self.peek(1),
                Some(Token::Keyword(
                    Keyword::Between
                        | Keyword::Like
                        | Keyword::Ilike
                        | Keyword::In
                        | Keyword::Member
                ))
            ),
            _ => false,
        }
    }

    fn predicate_tail(&mut self, lhs: Expr, start: usize) -> ParseResult<Predicate> {
        let comparison = match self.current() {
            Some(Token::Eq) => Some(ComparisonOperator::Equal),
            Some(Token::NotEq) => Some(ComparisonOperator::NotEqual),
            Some(Token::Lt) => Some(ComparisonOperator::LessThan),
            Some(Token::Le) => Some(ComparisonOperator::LessThanOrEqual),
            Some(Token::Gt) => Some(ComparisonOperator::GreaterThan),
            Some(Token::Ge) => Some(ComparisonOperator::GreaterThanOrEqual),
            _ => None,
        };
        if let Some(op) = comparison {
            self.advance();
            let rhs = self.expression()?;
            return Ok(Predicate::new(
                PredicateKind::Comparison { lhs, op, rhs },
                self.span_from(start),
            ));
        }

        if self.eat_kw(Keyword::Is) {
            let negated = self.eat_kw(Keyword::Not);
            let kind = if self.eat_kw(Keyword::Null) {
                PredicateKind::IsNull { expr: lhs, negated }
            } else if self.eat_kw(Keyword::Empty) {
                let ExprKind::Path(path) = lhs.kind else {
                    return Err(Diagnostic::error(
                        lhs.span,
                        "'is empty' requires a collection-valued path",
                    ));
                };
                PredicateKind::IsEmpty { path, negated }
            } else if self.eat_kw(Keyword::Distinct) {
                self.expect_kw(Keyword::From)?;
                let rhs = self.expression()?;
                let op = if negated {
                    ComparisonOperator::NotDistinctFrom
                } else {
                    ComparisonOperator::DistinctFrom
                };
                PredicateKind::Comparison { lhs, op, rhs }
            } else if self.check_kw(Keyword::True) || self.check_kw(Keyword::False) {
                let value = self.check_kw(Keyword::True);
                let span = self.span();
                self.advance();
                let op = if negated {
                    ComparisonOperator::NotEqual
                } else {
                    ComparisonOperator::Equal
                };
                PredicateKind::Comparison {
                    lhs,
                    op,
                    rhs: Expr::new(ExprKind::Literal(Literal::Boolean(value)), span),
                }
            } else {
                return Err(self.unexpected("'null', 'empty', 'true', 'false' or 'distinct from'"));
            };
            return Ok(Predicate::new(kind, self.span_from(start)));
        }

        let negated = if self.check_kw(Keyword::Not) && self.at_predicate_operator() {
            self.advance();
            true
        } else {
            false
        };

        let kind = match self.current() {
            Some(Token::Keyword(Keyword::Between)) => {
                self.advance();
                let lower = self.expression()?;
                self.expect_kw(Keyword::And)?;
                let upper = self.expression()?;
                PredicateKind::Between {
                    expr: lhs,
                    lower,
                    upper,
                    negated,
                }
            }
            Some(Token::Keyword(kw @ (Keyword::Like | Keyword::Ilike))) => {
                let case_sensitive = *kw == Keyword::Like;
                self.advance();
                let pattern = self.expression()?;
                let escape = if self.eat_kw(Keyword::Escape) {
                    Some(self.expression()?)
                } else {
                    None
                };
                PredicateKind::Like {
                    expr: lhs,
                    pattern,
                    escape,
                    negated,
                    case_sensitive,
                }
            }
            Some(Token::Keyword(Keyword::In)) => {
                self.advance();
                if self.at_subquery() {
                    let query = self.parenthesized_query()?;
                    PredicateKind::InSubquery {
                        expr: lhs,
                        query: Box::new(query),
                        negated,
                    }
                } else if self.eat(&Token::LParen) {
                    let list = self.expression_list()?;
                    self.expect(&Token::RParen)?;
                    PredicateKind::InList {
                        expr: lhs,
                        list,
                        negated,
                    }
                } else {
                    // `in :list`
                    let param = self.primary()?;
                    if !matches!(param.kind, ExprKind::Parameter(_)) {
                        return Err(Diagnostic::error(
                            param.span,
                            "Expected a parenthesized list, a subquery or a parameter after 'in'",
                        ));
                    }
                    PredicateKind::InList {
                        expr: lhs,
                        list: vec![param],
                        negated,
                    }
                }
            }
            Some(Token::Keyword(Keyword::Member)) => {
                self.advance();
                self.eat_kw(Keyword::Of);
                let path = self.path()?;
                PredicateKind::MemberOf {
                    expr: lhs,
                    path,
                    negated,
                }
            }
            _ => PredicateKind::Expr(lhs),
        };
        Ok(Predicate::new(kind, self.span_from(start)))
    }

    fn parenthesized_query(&mut self) -> ParseResult<QueryExpression> {
        self.expect(&Token::LParen)?;
        let query = self.query_expression()?;
        self.expect(&Token::RParen)?;
        Ok(query)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            items.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    pub(super) fn expression(&mut self) -> ParseResult<Expr> {
        let start = self.span().start;
        let mut lhs = self.additive()?;
        while self.eat(&Token::Concat) {
            let rhs = self.additive()?;
            lhs = self.binary(BinaryOp::Concat, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn binary(&self, op: BinaryOp, lhs: Expr, rhs: Expr, start: usize) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            self.span_from(start),
        )
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let start = self.span().start;
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.current() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = self.binary(op, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let start = self.span().start;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.current() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let start = self.span().start;
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::new(
                ExprKind::Negate(Box::new(operand)),
                self.span_from(start),
            ));
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let start = self.span().start;
        let Some(token) = self.current() else {
            return Err(self.unexpected("an expression"));
        };
        let literal = match token {
            Token::Number(text) => Some(Literal::Number(text.to_string())),
            Token::StringLit(text) => Some(Literal::String(text.clone())),
            Token::Keyword(Keyword::Null) => Some(Literal::Null),
            Token::Keyword(Keyword::True) => Some(Literal::Boolean(true)),
            Token::Keyword(Keyword::False) => Some(Literal::Boolean(false)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::new(ExprKind::Literal(literal), self.span_from(start)));
        }

        match token {
            Token::NamedParam(name) => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Parameter(Parameter::Named(name.to_string())),
                    self.span_from(start),
                ))
            }
            Token::PositionalParam(digits) => {
                let position = digits.parse::<u32>().map_err(|_| {
                    self.error_here(format!("Invalid parameter position '{digits}'"))
                })?;
                self.advance();
                Ok(Expr::new(
                    ExprKind::Parameter(Parameter::Positional(position)),
                    self.span_from(start),
                ))
            }
            Token::Question => Err(self.error_here(
                "Unlabeled ordinal parameter ('?' rather than '?1')",
            )),
            Token::LParen if self.at_subquery() => {
                let query = self.parenthesized_query()?;
                Ok(Expr::new(
                    ExprKind::Subquery(Box::new(query)),
                    self.span_from(start),
                ))
            }
            Token::LParen => {
                self.advance();
                let mut items = self.expression_list()?;
                self.expect(&Token::RParen)?;
                let kind = if items.len() == 1 {
                    return Ok(items.remove(0));
                } else {
                    ExprKind::Tuple(items)
                };
                Ok(Expr::new(kind, self.span_from(start)))
            }
            Token::Star => {
                self.advance();
                Ok(Expr::new(ExprKind::Star, self.span_from(start)))
            }
            Token::Keyword(Keyword::Case) => self.case_expression(),
            Token::Keyword(
                kw @ (Keyword::All | Keyword::Any | Keyword::Some | Keyword::Every),
            ) if self.peek(1) == Some(&Token::LParen)
                && matches!(
                    self.peek(2),
                    Some(Token::Keyword(Keyword::Select | Keyword::From | Keyword::With))
                ) =>
            {
                let quantifier = match kw {
                    Keyword::All | Keyword::Every => QuantifierKind::All,
                    _ => QuantifierKind::Any,
                };
                self.advance();
                let query = self.parenthesized_query()?;
                Ok(Expr::new(
                    ExprKind::Quantified {
                        quantifier,
                        query: Box::new(query),
                    },
                    self.span_from(start),
                ))
            }
            Token::Keyword(Keyword::Cast) if self.peek(1) == Some(&Token::LParen) => {
                self.advance();
                self.advance();
                let expr = self.expression()?;
                self.expect_kw(Keyword::As)?;
                let target = self.ident()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        expr: Box::new(expr),
                        target,
                    },
                    self.span_from(start),
                ))
            }
            Token::Keyword(Keyword::Trim) if self.peek(1) == Some(&Token::LParen) => {
                self.trim_expression()
            }
            Token::Keyword(kw @ (Keyword::Type | Keyword::Size))
                if self.peek(1) == Some(&Token::LParen) =>
            {
                let is_type = *kw == Keyword::Type;
                self.advance();
                self.advance();
                let path = self.path()?;
                self.expect(&Token::RParen)?;
                let kind = if is_type {
                    ExprKind::Type(path)
                } else {
                    ExprKind::Size(path)
                };
                Ok(Expr::new(kind, self.span_from(start)))
            }
            Token::Keyword(Keyword::Treat) if self.peek(1) == Some(&Token::LParen) => {
                let path = self.path()?;
                Ok(Expr::new(ExprKind::Path(path), self.span_from(start)))
            }
            Token::Ident(name)
                if name.eq_ignore_ascii_case("extract") && self.peek(1) == Some(&Token::LParen) =>
            {
                self.advance();
                self.advance();
                let field = self.ident()?;
                self.expect_kw(Keyword::From)?;
                let source = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::new(
                    ExprKind::Extract {
                        field,
                        source: Box::new(source),
                    },
                    self.span_from(start),
                ))
            }
            // aggregate or string functions named by reserved words
            Token::Keyword(
                Keyword::Every | Keyword::Any | Keyword::Some | Keyword::Left | Keyword::Right,
            ) if self.peek(1) == Some(&Token::LParen) => self.function_call(),
            _ if self.at_ident() => {
                if self.peek(1) == Some(&Token::LParen) {
                    return self.function_call();
                }
                let root = PathRoot::Ident(self.ident()?);
                let path = self.path_continuation(root, start)?;
                Ok(Expr::new(ExprKind::Path(path), self.span_from(start)))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn case_expression(&mut self) -> ParseResult<Expr> {
        let start = self.expect_kw(Keyword::Case)?.start;
        let kind = if self.check_kw(Keyword::When) {
            let mut whens = Vec::new();
            while self.eat_kw(Keyword::When) {
                let when = self.predicate()?;
                self.expect_kw(Keyword::Then)?;
                whens.push((when, self.expression()?));
            }
            let otherwise = self.case_else()?;
            ExprKind::CaseSearched { whens, otherwise }
        } else {
            let operand = Box::new(self.expression()?);
            let mut whens = Vec::new();
            while self.eat_kw(Keyword::When) {
                let when = self.expression()?;
                self.expect_kw(Keyword::Then)?;
                whens.push((when, self.expression()?));
            }
            if whens.is_empty() {
                return Err(self.unexpected("'when'"));
            }
            let otherwise = self.case_else()?;
            ExprKind::CaseSimple {
                operand,
                whens,
                otherwise,
            }
        };
        self.expect_kw(Keyword::End)?;
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn case_else(&mut self) -> ParseResult<Option<Box<Expr>>> {
        if self.eat_kw(Keyword::Else) {
            Ok(Some(Box::new(self.expression()?)))
        } else {
            Ok(None)
        }
    }

    /// `trim([leading|trailing|both] [c] [from] s)`
    fn trim_expression(&mut self) -> ParseResult<Expr> {
        let start = self.span().start;
        self.advance();
        self.expect(&Token::LParen)?;
        let spec = match self.current() {
            Some(Token::Keyword(Keyword::Leading)) => Some(TrimSpec::Leading),
            Some(Token::Keyword(Keyword::Trailing)) => Some(TrimSpec::Trailing),
            Some(Token::Keyword(Keyword::Both)) => Some(TrimSpec::Both),
            _ => None,
        };
        if spec.is_some() {
            self.advance();
        }
        let (character, source) = if self.eat_kw(Keyword::From) {
            (None, self.expression()?)
        } else {
            let first = self.expression()?;
            if self.eat_kw(Keyword::From) {
                (Some(Box::new(first)), self.expression()?)
            } else if spec.is_some() {
                return Err(self.unexpected("'from'"));
            } else {
                (None, first)
            }
        };
        self.expect(&Token::RParen)?;
        Ok(Expr::new(
            ExprKind::Trim {
                spec: spec.unwrap_or(TrimSpec::Both),
                character,
                source: Box::new(source),
            },
            self.span_from(start),
        ))
    }

    fn function_call(&mut self) -> ParseResult<Expr> {
        let start = self.span().start;
        let name = self.attribute_name()?;
        self.expect(&Token::LParen)?;
        let distinct = self.eat_kw(Keyword::Distinct);
        let arguments = if self.check(&Token::RParen) {
            Vec::new()
        } else {
            self.expression_list()?
        };
        self.expect(&Token::RParen)?;

        let filter = if self.check_kw(Keyword::Filter) && self.peek(1) == Some(&Token::LParen) {
            self.advance();
            self.advance();
            self.expect_kw(Keyword::Where)?;
            let predicate = self.predicate()?;
            self.expect(&Token::RParen)?;
            Some(predicate)
        } else {
            None
        };

        let over = if self.eat_kw(Keyword::Over) {
            Some(self.window()?)
        } else {
            None
        };

        Ok(Expr::new(
            ExprKind::Function(Box::new(FunctionCall {
                name,
                distinct,
                arguments,
                filter,
                over,
            })),
            self.span_from(start),
        ))
    }

    fn window(&mut self) -> ParseResult<Window> {
        self.expect(&Token::LParen)?;
        let mut window = Window::default();
        if self.eat_kw(Keyword::Partition) {
            self.expect_kw(Keyword::By)?;
            window.partition_by = self.expression_list()?;
        }
        if self.eat_kw(Keyword::Order) {
            self.expect_kw(Keyword::By)?;
            window.order_by = self.sort_list()?;
        }
        let mode = match self.current() {
            Some(Token::Keyword(Keyword::Rows)) => Some(FrameMode::Rows),
            Some(Token::Keyword(Keyword::Range)) => Some(FrameMode::Range),
            Some(Token::Keyword(Keyword::Groups)) => Some(FrameMode::Groups),
            _ => None,
        };
        if let Some(mode) = mode {
            self.advance();
            let (start, end) = if self.eat_kw(Keyword::Between) {
                let start = self.frame_bound()?;
                self.expect_kw(Keyword::And)?;
                (start, Some(self.frame_bound()?))
            } else {
                (self.frame_bound()?, None)
            };
            let exclusion = if self.eat_kw(Keyword::Exclude) {
                Some(if self.eat_kw(Keyword::Current) {
                    self.expect_kw(Keyword::Row)?;
                    FrameExclusion::CurrentRow
                } else if self.eat_kw(Keyword::Group) {
                    FrameExclusion::Group
                } else if self.eat_kw(Keyword::Ties) {
                    FrameExclusion::Ties
                } else {
                    self.expect_kw(Keyword::No)?;
                    self.expect_kw(Keyword::Others)?;
                    FrameExclusion::NoOthers
                })
            } else {
                None
            };
            window.frame = Some(Frame {
                mode,
                start,
                end,
                exclusion,
            });
        }
        self.expect(&Token::RParen)?;
        Ok(window)
    }

    fn frame_bound(&mut self) -> ParseResult<FrameBound> {
        if self.eat_kw(Keyword::Unbounded) {
            let kind = if self.eat_kw(Keyword::Preceding) {
                FrameKind::UnboundedPreceding
            } else {
                self.expect_kw(Keyword::Following)?;
                FrameKind::UnboundedFollowing
            };
            return Ok(FrameBound { kind, offset: None });
        }
        if self.eat_kw(Keyword::Current) {
            self.expect_kw(Keyword::Row)?;
            return Ok(FrameBound {
                kind: FrameKind::CurrentRow,
                offset: None,
            });
        }
        let offset = self.expression()?;
        let kind = if self.eat_kw(Keyword::Preceding) {
            FrameKind::OffsetPreceding
        } else {
            self.expect_kw(Keyword::Following)?;
            FrameKind::OffsetFollowing
        };
        Ok(FrameBound {
            kind,
            offset: Some(Box::new(offset)),
        })
    }
}

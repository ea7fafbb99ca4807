//! HQL text to syntax tree: statement shapes, precedence and diagnostics.

use hqlc::hql::ast::{
    BinaryOp, ExprKind, InsertValues, JoinTarget, Literal, Parameter, PredicateKind, QueryBody,
    QueryExpression, QuerySpec, RootSource, SelectStatement, Selectable, Statement,
};
use hqlc::hql::lexer::{lex, Keyword, Token};
use hqlc::hql::{self, Severity};
use hqlc::sqm::operator::{
    ComparisonOperator, FetchClauseType, FrameKind, FrameMode, SetOperator, SortDirection,
    SqmJoinType, TrimSpec,
};

fn statement(source: &str) -> Statement {
    let result = hql::parse(source);
    assert!(result.is_ok(), "{source}: {:?}", result.diagnostics);
    result.statement.unwrap()
}

fn select(source: &str) -> SelectStatement {
    match statement(source) {
        Statement::Select(select) => select,
        other => panic!("expected select, got {other:?}"),
    }
}

fn spec(query: &QueryExpression) -> &QuerySpec {
    match &query.body {
        QueryBody::Spec(spec) => spec,
        other => panic!("expected query spec, got {other:?}"),
    }
}

fn restriction(source: &str) -> PredicateKind {
    let select = select(source);
    spec(&select.query).where_.clone().unwrap().kind
}

fn error(source: &str) -> String {
    let result = hql::parse(source);
    assert!(result.statement.is_none(), "{source} should not parse");
    let message = result.errors().next().unwrap().message.clone();
    message
}

#[test]
fn test_select_statement_shape() {
    let select = select(
        "select p.title from Publication p where p.price > :min order by p.title desc limit 10",
    );
    assert!(select.ctes.is_empty());

    let query = &select.query;
    let spec = spec(query);
    let clause = spec.select.as_ref().unwrap();
    assert!(!clause.distinct);
    assert_eq!(clause.items.len(), 1);
    let Selectable::Expr(item) = &clause.items[0].value else {
        panic!("expected expression");
    };
    let ExprKind::Path(path) = &item.kind else {
        panic!("expected path");
    };
    assert_eq!(path.dotted(), "p.title");

    assert_eq!(spec.from.len(), 1);
    let RootSource::Entity(entity) = &spec.from[0].source else {
        panic!("expected entity root");
    };
    assert_eq!(entity.value, "Publication");
    assert_eq!(spec.from[0].alias.as_ref().unwrap().value, "p");

    let Some(PredicateKind::Comparison { op, rhs, .. }) = spec.where_.as_ref().map(|w| &w.kind)
    else {
        panic!("expected comparison");
    };
    assert_eq!(*op, ComparisonOperator::GreaterThan);
    assert_eq!(rhs.kind, ExprKind::Parameter(Parameter::Named("min".into())));

    assert_eq!(query.order_by.len(), 1);
    assert_eq!(query.order_by[0].direction, SortDirection::Descending);
    assert_eq!(
        query.limit.as_ref().map(|l| &l.kind),
        Some(&ExprKind::Literal(Literal::Number("10".into())))
    );
    assert!(query.has_limit());
}

#[test]
fn test_from_only_query() {
    let select = select("from Publication");
    let spec = spec(&select.query);
    assert!(spec.select.is_none());
    assert!(spec.from[0].alias.is_none());
}

#[test]
fn test_and_binds_tighter_than_or() {
    let kind = restriction("from Publication p where p.price = 1 or p.price = 2 and p.title = 'x'");
    let PredicateKind::Or(lhs, rhs) = kind else {
        panic!("expected or");
    };
    assert!(matches!(lhs.kind, PredicateKind::Comparison { .. }));
    assert!(matches!(rhs.kind, PredicateKind::And(..)));
}

#[test]
fn test_parenthesized_predicate_and_operand() {
    let kind = restriction(
        "from Publication p where (p.price > 1 or p.price < 0) and p.title = 'x'",
    );
    let PredicateKind::And(lhs, _) = kind else {
        panic!("expected and");
    };
    assert!(matches!(lhs.kind, PredicateKind::Or(..)));

    let kind = restriction("from Publication p where (p.price + 1) * 2 > 3");
    let PredicateKind::Comparison { lhs, .. } = kind else {
        panic!("expected comparison");
    };
    let ExprKind::Binary { op, lhs, .. } = lhs.kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Multiply);
    assert!(matches!(lhs.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
}

#[test]
fn test_arithmetic_precedence() {
    let select = select("select 1 + 2 * 3 - 4 from Tag t");
    let Selectable::Expr(expr) = &spec(&select.query).select.as_ref().unwrap().items[0].value
    else {
        panic!("expected expression");
    };
    // (1 + (2 * 3)) - 4
    let ExprKind::Binary { op, lhs, .. } = &expr.kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Subtract);
    let ExprKind::Binary { op, rhs, .. } = &lhs.kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Multiply, .. }));
}

#[test]
fn test_predicate_forms() {
    let kind = restriction("from Person a where a.name not ilike 'x%' escape '!'");
    assert!(matches!(
        kind,
        PredicateKind::Like { negated: true, case_sensitive: false, escape: Some(_), .. }
    ));

    let kind = restriction("from Publication p where p.price not between 1 and 2");
    assert!(matches!(kind, PredicateKind::Between { negated: true, .. }));

    let kind = restriction("from Publication p where p.id in :ids");
    let PredicateKind::InList { list, negated, .. } = kind else {
        panic!("expected in list");
    };
    assert!(!negated);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind, ExprKind::Parameter(Parameter::Named("ids".into())));

    let kind = restriction("from Publication p where p.id in (1, 2, 3)");
    assert!(matches!(kind, PredicateKind::InList { ref list, .. } if list.len() == 3));

    let kind = restriction(
        "from Publication p where p.author not in (select a from Person a where a.name = 'x')",
    );
    assert!(matches!(kind, PredicateKind::InSubquery { negated: true, .. }));

    let kind = restriction("from Publication p where p.title is not null");
    assert!(matches!(kind, PredicateKind::IsNull { negated: true, .. }));

    let kind = restriction("from Publication p where p.tags is empty");
    let PredicateKind::IsEmpty { path, negated } = kind else {
        panic!("expected is empty");
    };
    assert!(!negated);
    assert_eq!(path.dotted(), "p.tags");

    let kind = restriction("from Publication p where :tag member of p.tags");
    assert!(matches!(kind, PredicateKind::MemberOf { negated: false, .. }));

    let kind = restriction("from Publication p where p.title is distinct from 'x'");
    assert!(matches!(
        kind,
        PredicateKind::Comparison { op: ComparisonOperator::DistinctFrom, .. }
    ));

    let kind = restriction("from Publication p where exists (select t from Tag t)");
    assert!(matches!(kind, PredicateKind::Exists { negated: false, .. }));
}

#[test]
fn test_is_not_true_becomes_comparison() {
    let kind = restriction("from Tag t where t.active is not true");
    let PredicateKind::Comparison { op, rhs, .. } = kind else {
        panic!("expected comparison");
    };
    assert_eq!(op, ComparisonOperator::NotEqual);
    assert_eq!(rhs.kind, ExprKind::Literal(Literal::Boolean(true)));
}

#[test]
fn test_joins() {
    let select = select(
        "from Publication p left outer join fetch p.author a \
         join treat(p.author as Person) w on w.name = 'x' \
         cross join Tag t",
    );
    let joins = &spec(&select.query).from[0].joins;
    let types: Vec<SqmJoinType> = joins.iter().map(|j| j.join_type).collect();
    assert_eq!(types, vec![SqmJoinType::Left, SqmJoinType::Inner, SqmJoinType::Cross]);
    assert!(joins[0].fetch);
    assert!(!joins[1].fetch);

    let JoinTarget::Treat { path, entity } = &joins[1].target else {
        panic!("expected treat join");
    };
    assert_eq!(path.dotted(), "p.author");
    assert_eq!(entity.value, "Person");
    assert!(joins[1].on.is_some());

    let JoinTarget::Path(path) = &joins[2].target else {
        panic!("expected entity join");
    };
    assert_eq!(path.dotted(), "Tag");
    assert_eq!(joins[2].alias.as_ref().unwrap().value, "t");
}

#[test]
fn test_set_operations_flatten_same_operator() {
    let select = select(
        "select t.name from Tag t union select t.name from Tag t union select t.name from Tag t",
    );
    let QueryBody::SetOperation { op, parts } = &select.query.body else {
        panic!("expected set operation");
    };
    assert_eq!(*op, SetOperator::Union);
    assert_eq!(parts.len(), 3);

    let select = crate::select(
        "select t.name from Tag t union select t.name from Tag t union all select t.name from Tag t",
    );
    let QueryBody::SetOperation { op, parts } = &select.query.body else {
        panic!("expected set operation");
    };
    assert_eq!(*op, SetOperator::UnionAll);
    assert_eq!(parts.len(), 2);
    assert!(matches!(
        parts[0].body,
        QueryBody::SetOperation { op: SetOperator::Union, .. }
    ));
}

#[test]
fn test_offset_and_fetch() {
    let select = select(
        "select p from Publication p order by p.title offset 5 rows fetch next 10 percent rows with ties",
    );
    assert!(select.query.offset.is_some());
    assert_eq!(
        select.query.fetch.as_ref().map(|f| f.kind),
        Some(FetchClauseType::PercentWithTies)
    );
}

#[test]
fn test_cte() {
    let select = select(
        "with cheap (title) as (select p.title from Publication p where p.price < 10) \
         select c.title from cheap c",
    );
    assert_eq!(select.ctes.len(), 1);
    assert_eq!(select.ctes[0].name.value, "cheap");
    let columns: Vec<&str> = select.ctes[0].columns.iter().map(|c| c.value.as_str()).collect();
    assert_eq!(columns, vec!["title"]);
}

#[test]
fn test_case_and_special_functions() {
    let select = select(
        "select case when p.price > 10 then 'high' else 'low' end, \
         case p.title when 'a' then 1 end, \
         cast(p.price as String), \
         trim(leading ' ' from p.title), \
         extract(year from p.publishedOn) \
         from Publication p",
    );
    let items: Vec<&ExprKind> = spec(&select.query)
        .select
        .as_ref()
        .unwrap()
        .items
        .iter()
        .map(|item| match &item.value {
            Selectable::Expr(expr) => &expr.kind,
            other => panic!("expected expression, got {other:?}"),
        })
        .collect();

    assert!(matches!(
        items[0],
        ExprKind::CaseSearched { whens, otherwise: Some(_) } if whens.len() == 1
    ));
    assert!(matches!(items[1], ExprKind::CaseSimple { otherwise: None, .. }));
    assert!(matches!(items[2], ExprKind::Cast { target, .. } if target.value == "String"));
    assert!(matches!(
        items[3],
        ExprKind::Trim { spec: TrimSpec::Leading, character: Some(_), .. }
    ));
    assert!(matches!(items[4], ExprKind::Extract { field, .. } if field.value == "year"));
}

#[test]
fn test_function_calls_and_windows() {
    let select = select(
        "select count(distinct p.id), row_number() over (partition by p.author \
         order by p.price desc rows between unbounded preceding and current row) \
         from Publication p",
    );
    let items = &spec(&select.query).select.as_ref().unwrap().items;

    let Selectable::Expr(count) = &items[0].value else {
        panic!("expected expression");
    };
    let ExprKind::Function(call) = &count.kind else {
        panic!("expected function");
    };
    assert_eq!(call.name.value, "count");
    assert!(call.distinct);
    assert!(call.over.is_none());

    let Selectable::Expr(row_number) = &items[1].value else {
        panic!("expected expression");
    };
    let ExprKind::Function(call) = &row_number.kind else {
        panic!("expected function");
    };
    assert!(call.arguments.is_empty());
    let window = call.over.as_ref().unwrap();
    assert_eq!(window.partition_by.len(), 1);
    assert_eq!(window.order_by[0].direction, SortDirection::Descending);
    let frame = window.frame.as_ref().unwrap();
    assert_eq!(frame.mode, FrameMode::Rows);
    assert_eq!(frame.start.kind, FrameKind::UnboundedPreceding);
    assert_eq!(frame.end.as_ref().map(|b| b.kind), Some(FrameKind::CurrentRow));
}

#[test]
fn test_instantiation() {
    let select = select("select new org.example.Summary(p.title as t, p.price) from Publication p");
    let Selectable::Instantiation { target, arguments } =
        &spec(&select.query).select.as_ref().unwrap().items[0].value
    else {
        panic!("expected instantiation");
    };
    assert_eq!(target.value, "org.example.Summary");
    assert_eq!(arguments.len(), 2);
    assert_eq!(arguments[0].alias.as_ref().unwrap().value, "t");
}

#[test]
fn test_keywords_as_names() {
    let select = select("select p.order, t.name as size from Publication p, Tag t");
    let items = &spec(&select.query).select.as_ref().unwrap().items;
    let Selectable::Expr(expr) = &items[0].value else {
        panic!("expected expression");
    };
    let ExprKind::Path(path) = &expr.kind else {
        panic!("expected path");
    };
    assert_eq!(path.dotted(), "p.order");
    assert_eq!(items[1].alias.as_ref().unwrap().value, "size");
    assert_eq!(spec(&select.query).from.len(), 2);
}

#[test]
fn test_update_statement() {
    let Statement::Update(update) = statement(
        "update versioned Publication p set p.title = :t, p.price = p.price * 2 where p.id = ?1",
    ) else {
        panic!("expected update");
    };
    assert!(update.versioned);
    assert_eq!(update.entity.value, "Publication");
    assert_eq!(update.assignments.len(), 2);
    assert_eq!(update.assignments[0].path.dotted(), "p.title");
    let Some(PredicateKind::Comparison { rhs, .. }) = update.where_.map(|w| w.kind) else {
        panic!("expected comparison");
    };
    assert_eq!(rhs.kind, ExprKind::Parameter(Parameter::Positional(1)));
}

#[test]
fn test_delete_without_from_keyword() {
    let Statement::Delete(delete) = statement("delete Tag where name = 'x'") else {
        panic!("expected delete");
    };
    assert_eq!(delete.entity.value, "Tag");
    assert!(delete.alias.is_none());
    assert!(delete.where_.is_some());
}

#[test]
fn test_insert_statements() {
    let Statement::Insert(insert) =
        statement("insert into Tag (id, name) values (1, 'a'), (2, 'b')")
    else {
        panic!("expected insert");
    };
    assert_eq!(insert.paths.len(), 2);
    assert!(matches!(&insert.values, InsertValues::Rows(rows) if rows.len() == 2));

    let Statement::Insert(insert) =
        statement("insert Tag (id, name) select p.id, p.title from Publication p")
    else {
        panic!("expected insert");
    };
    assert!(matches!(insert.values, InsertValues::Query(_)));
}

#[test]
fn test_syntax_errors() {
    let result = hql::parse("select b from");
    let diagnostic = result.errors().next().unwrap();
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.span, 13..13);
    assert_eq!(diagnostic.message, "Expected an identifier, found end of query");

    let result = hql::parse("select p.title frm Publication p");
    let diagnostic = result.errors().next().unwrap();
    assert_eq!(diagnostic.message, "Expected 'from', found 'Publication'");
    assert_eq!(diagnostic.span, 19..30);

    assert_eq!(
        error("select p from Publication p where p.title = ?"),
        "Unlabeled ordinal parameter ('?' rather than '?1')"
    );
    assert_eq!(error("select p from Publication p p2"), "Unexpected token 'p2'");
    assert_eq!(
        error("select p from Publication p order by p.title limit 5 fetch first 5 rows only"),
        "A query cannot have both limit and fetch"
    );
    assert_eq!(
        error("update Tag t set t.name"),
        "Expected '=', found end of query"
    );
}

#[test]
fn test_lexer_errors_become_diagnostics() {
    let result = hql::parse("select 'abc from Tag t");
    assert!(result.statement.is_none());
    assert!(result.has_errors());
    assert!(!result.has_warnings());
}

#[test]
fn test_render_diagnostics() {
    let source = "select p.title frm Publication p";
    let rendered = hql::render_diagnostics(source, &hql::parse(source));
    assert!(rendered.contains("Expected 'from', found 'Publication'"));
}

#[test]
fn test_lex() {
    let tokens: Vec<Token<'_>> = lex("select p from Publication p where p.title = :t")
        .unwrap()
        .into_iter()
        .map(|(token, _)| token)
        .collect();
    assert_eq!(tokens.len(), 11);
    assert_eq!(tokens[0], Token::Keyword(Keyword::Select));
    assert_eq!(tokens[3], Token::Ident("Publication"));
    assert_eq!(tokens[10], Token::NamedParam("t"));

    assert_eq!(Keyword::lookup("SeLeCt"), Some(Keyword::Select));
    assert!(Keyword::Select.is_reserved());
    assert!(!Keyword::Type.is_reserved());
}

//! Name resolution and validation of interpreted HQL, seen through the
//! public error boundary.

#[path = "../common/mod.rs"]
mod common;

use common::{library, sql};
use hqlc::hql::{self, InterpretOptions};
use hqlc::sqm::{ErrorCode, SqmError, SqmStatement, StrictJpaViolation};
use hqlc::{compile, CompileOptions, QueryError, QueryErrorKind};

fn compile_error(hql: &str, options: &CompileOptions) -> QueryError {
    match compile(hql, &library(), options) {
        Ok(compiled) => panic!("{hql} compiled to {}", compiled.sql),
        Err(err) => err,
    }
}

fn error_kind(hql: &str) -> QueryErrorKind {
    compile_error(hql, &CompileOptions::default()).kind()
}

fn strict() -> CompileOptions {
    CompileOptions::default().with_strict_jpa_compliance(true)
}

#[test]
fn test_resolution_failures_are_illegal_arguments() {
    let cases = [
        "select x from Widget x",
        "select p.isbn from Publication p",
        "select q.title from Publication p",
        "select p from Publication p join p.author p",
        "select p.title as t, p.price as T from Publication p",
        "select p from Publication p where p.title = :t and p.price > ?1",
        "select p from Publication p where p.title = ?2",
        "select p.title, p.price from Publication p union select t.name from Tag t",
    ];
    for hql in cases {
        assert_eq!(error_kind(hql), QueryErrorKind::IllegalArgument, "{hql}");
    }
}

#[test]
fn test_terminal_dereference_is_illegal_state() {
    let err = compile_error(
        "select p.title.length from Publication p",
        &CompileOptions::default(),
    );
    assert_eq!(err.kind(), QueryErrorKind::IllegalState);
    assert_eq!(err.code(), Some(ErrorCode::TerminalPathDereference));
}

#[test]
fn test_operand_types_are_checked() {
    let cases = [
        "select p.title + 1 from Publication p",
        "select p from Publication p where p.publishedOn * 2 > 1",
        "select p from Publication p where p.author = 'x'",
    ];
    for hql in cases {
        let err = compile_error(hql, &CompileOptions::default());
        assert_eq!(err.kind(), QueryErrorKind::IllegalArgument, "{hql}");
        assert_eq!(err.code(), Some(ErrorCode::Semantic), "{hql}");
    }
    assert!(sql("select p.title from Publication p where p.author = 1")
        .ends_with("where p1_0.author_id=1"));
}

#[test]
fn test_syntax_error_carries_query() {
    let source = "select from where";
    match compile_error(source, &CompileOptions::default()) {
        QueryError::Syntax { query, .. } => assert_eq!(query, source),
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_unknown_names_in_messages() {
    let err = compile_error("select x from Widget x", &CompileOptions::default());
    assert_eq!(err.code(), Some(ErrorCode::UnknownEntity));
    assert!(err.to_string().contains("Widget"));

    let err = compile_error("select p.isbn from Publication p", &CompileOptions::default());
    assert_eq!(err.code(), Some(ErrorCode::UnknownPathElement));
    assert!(err.to_string().contains("isbn"));
}

#[test]
fn test_strict_compliance_rejects_extensions() {
    let cases = [
        "select p from Publication p order by p.title limit 10",
        "select p from Publication p cross join Tag t",
        "select left(p.title, 2) from Publication p",
        "select p from Publication p join fetch p.author a",
        "insert into Tag (id, name) values (1, 'x')",
    ];
    for hql in cases {
        let err = compile_error(hql, &strict());
        assert_eq!(err.kind(), QueryErrorKind::IllegalArgument, "{hql}");
        assert_eq!(err.code(), Some(ErrorCode::StrictJpaViolation), "{hql}");
        hql::interpret(hql, &library(), InterpretOptions::default())
            .unwrap_or_else(|e| panic!("{hql}: {e}"));
    }

    let err = compile_error("select p from Publication p order by p.title limit 10", &strict());
    assert!(err.to_string().contains("limit and offset clause"));
}

#[test]
fn test_implicit_select_clause() {
    assert_eq!(sql("from Publication p"), sql("select p from Publication p"));

    let err = hql::interpret(
        "from Publication",
        &library(),
        InterpretOptions {
            strict_jpa_compliance: true,
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SqmError::StrictJpaViolation(StrictJpaViolation::ImplicitSelect)
    ));
}

#[test]
fn test_unqualified_attributes_resolve_to_sole_root() {
    assert_eq!(
        sql("select title from Publication where price > 5"),
        sql("select p.title from Publication p where p.price > 5")
    );
}

#[test]
fn test_named_parameters_share_identity() {
    let compiled = compile(
        "select p.title from Publication p where p.title = :t or p.price > :min or p.title = :t",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap();
    let labels: Vec<String> = compiled.parameters.iter().map(|p| p.label.to_string()).collect();
    assert_eq!(labels, vec![":t", ":min", ":t"]);
    let positions: Vec<usize> = compiled.parameters.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert_eq!(compiled.parameters[0].id, compiled.parameters[2].id);
    assert_ne!(compiled.parameters[0].id, compiled.parameters[1].id);
}

#[test]
fn test_positional_parameters() {
    let compiled = compile(
        "select p.title from Publication p where p.price between ?1 and ?2",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap();
    let labels: Vec<String> = compiled.parameters.iter().map(|p| p.label.to_string()).collect();
    assert_eq!(labels, vec!["?1", "?2"]);
}

#[test]
fn test_join_paths_carry_aliases() {
    let statement = hql::interpret(
        "select a.name from Publication p join p.author a",
        &library(),
        InterpretOptions::default(),
    )
    .unwrap();
    let SqmStatement::Select(select) = &statement else {
        panic!("expected select statement");
    };
    let spec = select.query.first_spec().unwrap();
    assert_eq!(
        spec.from[0].joins[0].navigable_path.full_path(),
        "Publication(p).author(a)"
    );
}

#[test]
fn test_insert_values_arity() {
    let err = compile_error(
        "insert into Tag (id, name) values (1)",
        &CompileOptions::default(),
    );
    assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);
    assert!(err.to_string().contains("Expected 2 values"));
}

#[test]
fn test_cte_is_interpreted() {
    let statement = hql::interpret(
        "with cheap as (select p.title as title from Publication p where p.price < 10) \
         select c.title from cheap c",
        &library(),
        InterpretOptions::default(),
    )
    .unwrap();
    let SqmStatement::Select(select) = statement else {
        panic!("expected select statement");
    };
    assert_eq!(select.ctes.len(), 1);
}

//! Alias qualification of mapping fragments.

#[path = "../common/mod.rs"]
mod common;

use hqlc::sql::template::{inject_alias, render_order_by_string_template, render_where_string_template, TEMPLATE};
use hqlc::sql::Dialect;
use hqlc::CompileOptions;

#[test]
fn test_restriction_round_trip_to_alias() {
    let template = render_where_string_template("active = 1 and name <> 'x and y'", TEMPLATE, Dialect::Ansi).unwrap();
    assert_eq!(
        template,
        "$PlaceHolder$.active = 1 and $PlaceHolder$.name <> 'x and y'"
    );
    assert_eq!(
        inject_alias(&template, TEMPLATE, "t1_0"),
        "t1_0.active = 1 and t1_0.name <> 'x and y'"
    );
}

#[test]
fn test_custom_placeholder() {
    let template = render_where_string_template("lower(name) like :p", "{alias}", Dialect::Postgres).unwrap();
    assert_eq!(template, "lower({alias}.name) like :p");
    assert_eq!(inject_alias(&template, "{alias}", "a"), "lower(a.name) like :p");
}

#[test]
fn test_order_by_fragment() {
    let template = render_order_by_string_template("name asc", TEMPLATE, Dialect::Ansi).unwrap();
    assert_eq!(inject_alias(&template, TEMPLATE, "t1_0"), "t1_0.name asc");
}

#[test]
fn test_quoted_identifier_follows_dialect() {
    let render = |dialect| render_where_string_template("`Kind` = 'N'", TEMPLATE, dialect).unwrap();
    assert_eq!(render(Dialect::Ansi), "$PlaceHolder$.\"Kind\" = 'N'");
    assert_eq!(render(Dialect::MySql), "$PlaceHolder$.`Kind` = 'N'");
    assert_eq!(render(Dialect::TSql), "$PlaceHolder$.[Kind] = 'N'");
}

#[test]
fn test_translation_independent_of_placeholder() {
    let hql = "select t.name from Tag t";
    let custom = CompileOptions::default().with_template_placeholder("{alias}");
    assert_eq!(common::sql_with(hql, &custom), common::sql(hql));
    insta::assert_snapshot!(
        common::sql(hql),
        @"select t1_0.name from tag t1_0 where (t1_0.active = 1)"
    );
}

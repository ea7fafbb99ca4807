//! Select statements from HQL text to SQL.

#[path = "../common/mod.rs"]
mod common;

use common::{library, sql};
use hqlc::{compile, CompileOptions};

// ============================================================================
// Roots and selections
// ============================================================================

#[test]
fn test_basic_attribute_with_parameter() {
    insta::assert_snapshot!(
        sql("select p.title from Publication p where p.price > :min"),
        @"select p1_0.title from publication p1_0 where p1_0.price>?"
    );
}

#[test]
fn test_entity_selection_expands_hierarchy_columns() {
    insta::assert_snapshot!(
        sql("select p from Publication p"),
        @"select p1_0.id,p1_0.kind,p1_0.title,p1_0.price,p1_0.published_on,p1_0.version,p1_0.author_id,p1_0.genre from publication p1_0"
    );
}

#[test]
fn test_subtype_root_restricts_discriminator() {
    insta::assert_snapshot!(
        sql("select n.genre from Novel n"),
        @"select n1_0.genre from publication n1_0 where n1_0.kind='Novel'"
    );
}

#[test]
fn test_entity_restriction_is_applied() {
    insta::assert_snapshot!(
        sql("select t from Tag t"),
        @"select t1_0.id,t1_0.name from tag t1_0 where (t1_0.active = 1)"
    );
}

#[test]
fn test_embedded_component() {
    insta::assert_snapshot!(
        sql("select a.address.city from Person a"),
        @"select p1_0.city from person p1_0"
    );
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_explicit_and_implicit_joins() {
    insta::assert_snapshot!(
        sql("select a.name from Publication p join p.author a"),
        @"select a1_0.name from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id"
    );
    insta::assert_snapshot!(
        sql("select p.author.name from Publication p where p.author.name like 'A%'"),
        @"select a1_0.name from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id where a1_0.name like 'A%'"
    );
}

#[test]
fn test_foreign_key_shortcuts() {
    insta::assert_snapshot!(
        sql("select p.author.id from Publication p"),
        @"select p1_0.author_id from publication p1_0"
    );
    insta::assert_snapshot!(
        sql("select p.title from Publication p where p.author = :author"),
        @"select p1_0.title from publication p1_0 where p1_0.author_id=?"
    );
}

#[test]
fn test_left_join_with_on_condition() {
    insta::assert_snapshot!(
        sql("select p.title from Publication p left join p.author a on a.name = :name"),
        @"select p1_0.title from publication p1_0 left outer join person a1_0 on p1_0.author_id=a1_0.id and a1_0.name=?"
    );
}

#[test]
fn test_collection_joins() {
    insta::assert_snapshot!(
        sql("select t.name from Publication p join p.tags t"),
        @"select t1_1.name from publication p1_0 inner join publication_tags t1_0 on p1_0.id=t1_0.publication_id inner join tag t1_1 on t1_0.tag_id=t1_1.id and (t1_1.active = 1)"
    );
    insta::assert_snapshot!(
        sql("select p.title from Person a join a.publications p"),
        @"select p2_0.title from person p1_0 inner join publication p2_0 on p1_0.id=p2_0.author_id"
    );
}

#[test]
fn test_treated_join() {
    insta::assert_snapshot!(
        sql("select n.genre from Person a join treat(a.publications as Novel) n"),
        @"select p2_0.genre from person p1_0 inner join publication p2_0 on p1_0.id=p2_0.author_id and p2_0.kind='Novel'"
    );
}

#[test]
fn test_second_root_is_cross_joined() {
    insta::assert_snapshot!(
        sql("select p.title from Publication p, Tag t where t.name = p.title"),
        @"select p1_0.title from publication p1_0 cross join tag t1_0 where t1_0.name=p1_0.title and (t1_0.active = 1)"
    );
}

// ============================================================================
// Predicates and subqueries
// ============================================================================

#[test]
fn test_collection_predicates() {
    insta::assert_snapshot!(
        sql("select a.name from Person a where size(a.publications) > 1"),
        @"select p1_0.name from person p1_0 where (select count(1) from publication p2_0 where p1_0.id=p2_0.author_id)>1"
    );
    insta::assert_snapshot!(
        sql("select p.title from Publication p where p.tags is empty"),
        @"select p1_0.title from publication p1_0 where not exists(select 1 from publication_tags t1_0 where p1_0.id=t1_0.publication_id)"
    );
    insta::assert_snapshot!(
        sql("select p.title from Publication p where :tag member of p.tags"),
        @"select p1_0.title from publication p1_0 where ? in (select t1_0.tag_id from publication_tags t1_0 where p1_0.id=t1_0.publication_id)"
    );
}

#[test]
fn test_type_comparison() {
    insta::assert_snapshot!(
        sql("select p.title from Publication p where type(p) = Novel"),
        @"select p1_0.title from publication p1_0 where p1_0.kind='Novel'"
    );
}

#[test]
fn test_subquery_aliases_continue_numbering() {
    insta::assert_snapshot!(
        sql("select p.title from Publication p where exists (select 1 from Publication q where q.price > p.price)"),
        @"select p1_0.title from publication p1_0 where exists(select 1 from publication p2_0 where p2_0.price>p1_0.price)"
    );
}

#[test]
fn test_correlated_implicit_join() {
    insta::assert_snapshot!(
        sql("select p.title from Publication p where exists (select 1 from Tag t where t.name = p.author.name)"),
        @"select p1_0.title from publication p1_0 where exists(select 1 from tag t1_0 cross join person a1_0 where t1_0.name=a1_0.name and (t1_0.active = 1) and p1_0.author_id=a1_0.id)"
    );
}

#[test]
fn test_order_by() {
    insta::assert_snapshot!(
        sql("select p.title from Publication p order by p.title desc"),
        @"select p1_0.title from publication p1_0 order by p1_0.title desc"
    );
}

// ============================================================================
// Bindings
// ============================================================================

#[test]
fn test_parameters_in_text_order() {
    let compiled = compile(
        "select p.title from Publication p left join p.author a on a.name = :name where p.price > :min",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap();
    let labels: Vec<String> = compiled.parameters.iter().map(|p| p.label.to_string()).collect();
    assert_eq!(labels, vec![":name", ":min"]);
    let positions: Vec<usize> = compiled.parameters.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![1, 2]);
    assert_eq!(compiled.affected_tables, vec!["publication", "person"]);
}

//! Update, delete and insert statements.

#[path = "../common/mod.rs"]
mod common;

use common::{library, sql};
use hqlc::{compile, CompileOptions, QueryErrorKind};

#[test]
fn test_update_columns_are_unqualified() {
    insta::assert_snapshot!(
        sql("update Publication p set p.title = :title where p.id = :id"),
        @"update publication set title=? where id=?"
    );
}

#[test]
fn test_versioned_update() {
    insta::assert_snapshot!(
        sql("update versioned Publication set price = price * 2"),
        @"update publication set price=price*2, version=version+1"
    );
}

#[test]
fn test_versioned_update_needs_version_attribute() {
    let err = compile(
        "update versioned Tag set name = :name",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);
}

#[test]
fn test_embedded_assignment_binds_each_component() {
    let compiled = compile(
        "update Person p set p.address = :address where p.id = :id",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap();
    insta::assert_snapshot!(compiled.sql, @"update person set street=?, city=? where id=?");

    let bound: Vec<(String, Option<String>)> = compiled
        .parameters
        .iter()
        .map(|p| (p.label.to_string(), p.component.clone()))
        .collect();
    assert_eq!(
        bound,
        vec![
            (":address".to_string(), Some("street".to_string())),
            (":address".to_string(), Some("city".to_string())),
            (":id".to_string(), None),
        ]
    );
    assert_eq!(compiled.affected_tables, vec!["person"]);
    assert!(compiled.locking_roots.is_empty());
}

#[test]
fn test_delete_restrictions() {
    insta::assert_snapshot!(
        sql("delete from Novel n where n.genre = 'horror'"),
        @"delete from publication where genre='horror' and kind='Novel'"
    );
    insta::assert_snapshot!(sql("delete from Tag"), @"delete from tag where (active = 1)");
}

#[test]
fn test_delete_subquery_references_target_table() {
    insta::assert_snapshot!(
        sql("delete from Person a where a.publications is empty"),
        @"delete from person where not exists(select 1 from publication p1_0 where person.id=p1_0.author_id)"
    );
}

#[test]
fn test_delete_rejects_implicit_join() {
    let err = compile(
        "delete from Publication p where p.author.name = :name",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);
}

#[test]
fn test_insert_values_adds_discriminator() {
    insta::assert_snapshot!(
        sql("insert into Novel (id, title, genre) values (:id, :title, :genre)"),
        @"insert into publication (id, title, genre, kind) values (?, ?, ?, 'Novel')"
    );
}

#[test]
fn test_insert_select() {
    insta::assert_snapshot!(
        sql("insert into Tag (id, name) select p.id, p.title from Publication p"),
        @"insert into tag (id, name) select p1_0.id,p1_0.title from publication p1_0"
    );
}

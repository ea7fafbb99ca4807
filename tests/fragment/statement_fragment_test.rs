//! Whole-statement fragment builders driven through the public API.

use hqlc::fragment::limit::LimitClause;
use hqlc::fragment::{CaseFragment, CaseStyle, Delete, Insert, InsertSelect, Select, SimpleSelect, Update};
use hqlc::sql::{Dialect, LockMode, LockOptions};

// ============================================================================
// Select
// ============================================================================

#[test]
fn test_select_with_pagination_per_dialect() {
    let base = |dialect| {
        Select::new(dialect)
            .set_select_clause("p1_0.id,p1_0.title")
            .set_from_table("publication", "p1_0")
            .set_where_clause("p1_0.price>?")
            .set_order_by_clause("p1_0.title")
    };

    let pg = base(Dialect::Postgres)
        .set_limit(LimitClause::new(Some("?".into()), Some("?".into())))
        .unwrap();
    insta::assert_snapshot!(
        pg.to_statement_string(),
        @"select p1_0.id,p1_0.title from publication p1_0 where p1_0.price>? order by p1_0.title limit ? offset ?"
    );

    let oracle = base(Dialect::Oracle)
        .set_limit(LimitClause::new(None, Some("?".into())))
        .unwrap();
    insta::assert_snapshot!(
        oracle.to_statement_string(),
        @"select p1_0.id,p1_0.title from publication p1_0 where p1_0.price>? order by p1_0.title fetch first ? rows only"
    );

    let legacy = base(Dialect::Oracle8i)
        .set_limit(LimitClause::new(None, Some("?".into())))
        .unwrap();
    insta::assert_snapshot!(
        legacy.to_statement_string(),
        @"select * from ( select p1_0.id,p1_0.title from publication p1_0 where p1_0.price>? order by p1_0.title ) where rownum <= ?"
    );
}

#[test]
fn test_select_pagination_unsupported_on_sybase() {
    let result = Select::new(Dialect::Sybase11)
        .set_select_clause("t.id")
        .set_from_table("tag", "t")
        .set_limit(LimitClause::new(None, Some("10".into())));
    assert!(result.is_err());
}

#[test]
fn test_select_rendering_is_repeatable() {
    let select = Select::new(Dialect::Ansi)
        .set_comment("load tags")
        .set_select_clause("t.name")
        .set_from_table("tag", "t")
        .set_where_clause("t.active=1");
    let first = select.to_statement_string();
    assert_eq!(first, "/* load tags */ select t.name from tag t where t.active=1");
    assert_eq!(first, select.to_statement_string());
}

#[test]
fn test_select_lock_follows_limit() {
    let select = Select::new(Dialect::Postgres)
        .set_select_clause("t1_0.id")
        .set_from_table("tag", "t1_0")
        .set_limit(LimitClause::new(None, Some("?".into())))
        .unwrap()
        .set_lock_options(LockOptions::new(LockMode::PessimisticWrite), Some("t1_0".into()));
    assert_eq!(
        select.to_statement_string(),
        "select t1_0.id from tag t1_0 limit ? for update of t1_0"
    );
}

// ============================================================================
// SimpleSelect
// ============================================================================

#[test]
fn test_simple_select_by_key() {
    let select = SimpleSelect::new(Dialect::Ansi)
        .set_table_name("publication")
        .add_columns(&["id", "title", "version"])
        .add_column_conditions(&["id"], "=?")
        .set_order_by("title");
    insta::assert_snapshot!(
        select.to_statement_string(),
        @"select id, title, version from publication where id=? order by title"
    );
}

#[test]
fn test_simple_select_drops_duplicate_aliases() {
    let select = SimpleSelect::new(Dialect::Ansi)
        .set_table_name("person")
        .add_column_as("name", "n")
        .add_column_as("city", "n")
        .add_column("street");
    assert_eq!(select.to_statement_string(), "select name as n, street from person");
}

// ============================================================================
// Update / Delete
// ============================================================================

#[test]
fn test_versioned_update() {
    let update = Update::new()
        .set_comment("update Publication")
        .set_table_name("publication")
        .add_columns(&["title", "price", "kind"], &[true, true, false])
        .set_primary_key_column_names(["id"])
        .set_version_column_name("version");
    insta::assert_snapshot!(
        update.to_statement_string(),
        @"/* update Publication */ update publication set title=?, price=? where id=? and version=?"
    );
}

#[test]
fn test_update_where_parts_in_order() {
    let update = Update::new()
        .set_table_name("publication")
        .add_column("title")
        .increment_version("version")
        .add_primary_key_column("id", "?")
        .add_where_fragment("kind='Novel'")
        .add_where_column("price", ">?");
    assert_eq!(
        update.to_statement_string(),
        "update publication set title=?, version=version+1 where id=? and kind='Novel' and price>?"
    );
}

#[test]
fn test_delete_by_key_and_version() {
    let delete = Delete::new()
        .set_table_name("publication")
        .set_primary_key_column_names(["id"])
        .add_where_fragment("kind='Novel'")
        .set_version_column_name("version");
    assert_eq!(
        delete.to_statement_string(),
        "delete from publication where id=? and kind='Novel' and version=?"
    );
}

#[test]
fn test_delete_key_columns_replace() {
    let delete = Delete::new()
        .set_table_name("t")
        .set_primary_key_column_names(["a", "b"])
        .set_primary_key_column_names(["c"]);
    assert_eq!(delete.to_statement_string(), "delete from t where c=?");
}

// ============================================================================
// Insert
// ============================================================================

#[test]
fn test_insert_with_literal_and_rows() {
    let insert = Insert::new(Dialect::Ansi)
        .set_table_name("publication")
        .add_columns(&["id", "title", "kind"], &[true, true, true])
        .add_column_with_value("kind", "'Novel'")
        .add_row(["?", "?", "'Novel'"])
        .unwrap();
    insta::assert_snapshot!(
        insert.to_statement_string(),
        @"insert into publication (id, title, kind) values (?, ?, 'Novel'), (?, ?, 'Novel')"
    );
}

#[test]
fn test_insert_without_columns_per_dialect() {
    let render = |dialect| Insert::new(dialect).set_table_name("audit").to_statement_string();
    assert_eq!(render(Dialect::Ansi), "insert into audit values ( )");
    assert_eq!(render(Dialect::Postgres), "insert into audit default values");
    assert_eq!(render(Dialect::MySql), "insert into audit () values ()");
    assert_eq!(render(Dialect::TSql), "insert into audit default values");
}

#[test]
fn test_insert_row_arity_checked() {
    let result = Insert::new(Dialect::Ansi)
        .set_table_name("tag")
        .add_column("id")
        .add_column("name")
        .add_row(["?"]);
    assert!(result.is_err());
}

#[test]
fn test_insert_select_from_select_builder() {
    let select = Select::new(Dialect::Ansi)
        .set_select_clause("p1_0.id,p1_0.title")
        .set_from_table("publication", "p1_0");
    let insert = InsertSelect::new()
        .set_comment("archive")
        .set_table_name("tag")
        .add_column("id")
        .add_column("name")
        .set_select(select);
    insta::assert_snapshot!(
        insert.to_statement_string(),
        @"/* archive */ insert into tag (id, name) select p1_0.id,p1_0.title from publication p1_0"
    );
}

// ============================================================================
// Case
// ============================================================================

#[test]
fn test_case_fragment_styles() {
    let build = |style| {
        CaseFragment::new(style)
            .add_when_column_not_null("n1_1", "id", "1")
            .add_when_column_not_null("m1_2", "id", "2")
    };
    assert_eq!(
        build(CaseStyle::Ansi).set_return_column_name("clazz_").to_fragment_string(),
        "case when n1_1.id is not null then 1 when m1_2.id is not null then 2 end as clazz_"
    );
    assert_eq!(build(CaseStyle::Decode).to_fragment_string(), "decode(m1_2.id, n1_1.id, 1, 2)");
    assert_eq!(
        build(CaseStyle::Hsql).to_fragment_string(),
        " casewhen(n1_1.id is not null, 1,  casewhen(m1_2.id is not null, 2, -1))"
    );
}

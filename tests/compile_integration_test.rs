//! End-to-end compilation: mapping files and settings in, SQL and
//! bindings out.

use hqlc::config::Settings;
use hqlc::prelude::*;
use hqlc::sql::ast::JdbcParameterBinding;
use hqlc::{lock_by_id, QueryError};

const MAPPING: &str = r#"
[[entity]]
name = "Author"
table = "authors"
id = { name = "id", type = "long" }

[[entity.attribute]]
name = "fullName"
type = "string"

[[entity]]
name = "Book"
class = "org.example.Book"
table = "books"
id = { name = "isbn", type = "string", column = "isbn_code" }
version = { name = "version", type = "integer" }
where = "deleted = 0"

[[entity.attribute]]
name = "title"
type = "string"

[[entity.attribute]]
name = "author"
many_to_one = "Author"
"#;

fn catalog() -> MappingMetamodel {
    MappingMetamodel::from_toml(MAPPING).unwrap()
}

fn labels(parameters: &[JdbcParameterBinding]) -> Vec<String> {
    parameters.iter().map(|p| p.label.to_string()).collect()
}

// ============================================================================
// Compilation against a loaded mapping
// ============================================================================

#[test]
fn test_compile_against_mapping_file() {
    let compiled = compile(
        "select b.title from Book b where b.author.fullName = :name",
        &catalog(),
        &CompileOptions::default(),
    )
    .unwrap();

    assert!(compiled.sql.starts_with("select b1_0.title from books b1_0"));
    assert!(compiled
        .sql
        .contains("inner join authors a1_0 on b1_0.author_id=a1_0.id"));
    assert!(compiled.sql.contains("a1_0.full_name=?"));
    assert!(compiled.sql.contains("(b1_0.deleted = 0)"));
    assert_eq!(labels(&compiled.parameters), vec![":name"]);
    assert_eq!(compiled.affected_tables, vec!["books", "authors"]);
    assert_eq!(compiled.dialect, Dialect::Ansi);
}

#[test]
fn test_entity_names_resolve_by_class_name() {
    let model = catalog();
    let options = CompileOptions::default();
    assert_eq!(
        compile("select b.title from org.example.Book b", &model, &options)
            .unwrap()
            .sql,
        compile("select b.title from Book b", &model, &options)
            .unwrap()
            .sql
    );
}

#[test]
fn test_mutation_reports_target_table() {
    let compiled = compile(
        "update Book b set b.title = :title where b.isbn = :isbn",
        &catalog(),
        &CompileOptions::default(),
    )
    .unwrap();
    assert!(compiled.sql.starts_with("update books set title=? where isbn_code=?"));
    assert_eq!(labels(&compiled.parameters), vec![":title", ":isbn"]);
    assert_eq!(compiled.affected_tables, vec!["books"]);
    assert!(compiled.locking_roots.is_empty());
}

#[test]
fn test_load_by_id() {
    let compiled = load_by_id("Book", &catalog(), &CompileOptions::default()).unwrap();
    assert!(compiled.sql.starts_with("select b1_0.isbn_code,"));
    assert!(compiled.sql.contains("from books b1_0 where b1_0.isbn_code=?"));
    assert_eq!(labels(&compiled.parameters), vec![":id"]);

    let locked = lock_by_id(
        "Book",
        &catalog(),
        LockOptions::new(LockMode::PessimisticWrite),
        &CompileOptions::default().with_dialect(Dialect::Postgres),
    )
    .unwrap();
    assert!(locked.sql.ends_with(" for update of b1_0"));
    assert_eq!(locked.locking_roots, vec!["Book"]);
}

#[test]
fn test_load_by_id_of_unknown_entity() {
    let err = load_by_id("Widget", &catalog(), &CompileOptions::default()).unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);
    assert!(err.to_string().contains("Widget"));
}

// ============================================================================
// Error boundary
// ============================================================================

#[test]
fn test_error_kinds() {
    let model = catalog();
    let options = CompileOptions::default();
    let kind = |hql: &str| compile(hql, &model, &options).unwrap_err().kind();

    assert_eq!(kind("select b from Book b where"), QueryErrorKind::Syntax);
    assert_eq!(kind("select b.isbn.code from Book b"), QueryErrorKind::IllegalState);
    assert_eq!(kind("select b.pages from Book b"), QueryErrorKind::IllegalArgument);
    assert_eq!(kind("select m from Magazine m"), QueryErrorKind::IllegalArgument);
}

#[test]
fn test_unsupported_dialect_feature() {
    let options = CompileOptions::default().with_dialect(Dialect::Sybase11);
    let err = compile("select b.title from Book b limit 5", &catalog(), &options).unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::Unsupported);
    assert!(matches!(err, QueryError::Unsupported { .. }));
}

#[test]
fn test_mapping_errors_convert() {
    let err = MappingMetamodel::from_toml(
        r#"
[[entity]]
name = "A"
id = { name = "id", type = "quaternion" }
"#,
    )
    .unwrap_err();
    let err = QueryError::from(err);
    assert!(matches!(err, QueryError::Mapping(_)));
    assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);
    assert!(err.to_string().starts_with("Invalid mapping: "));
}

// ============================================================================
// Settings and output
// ============================================================================

#[test]
fn test_options_from_settings() {
    let settings = Settings::from_toml(
        r#"
[query]
dialect = "postgres"
strict_jpa_compliance = true
"#,
    )
    .unwrap();
    let options = CompileOptions::from_settings(&settings.query);
    assert_eq!(options.dialect, Dialect::Postgres);
    assert!(options.strict_jpa_compliance);

    let err = compile("from Book", &catalog(), &options).unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::IllegalArgument);

    let compiled = compile("select b.title from Book b", &catalog(), &options).unwrap();
    assert_eq!(compiled.dialect, Dialect::Postgres);
}

#[test]
fn test_invalid_settings_rejected() {
    let result = Settings::from_toml(
        r#"
[query]
template_placeholder = "two words"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_compiled_query_serializes_to_json() {
    let compiled = load_by_id(
        "Author",
        &catalog(),
        &CompileOptions::default().with_dialect(Dialect::TSql),
    )
    .unwrap();
    let json = serde_json::to_value(&compiled).unwrap();

    assert_eq!(json["sql"], compiled.sql.as_str());
    assert_eq!(json["dialect"], "tsql");
    assert_eq!(json["affected_tables"][0], "authors");
    assert_eq!(json["parameters"][0]["label"], ":id");
    assert_eq!(json["parameters"][0]["position"], 1);
    assert!(json["parameters"][0].get("component").is_none());
}

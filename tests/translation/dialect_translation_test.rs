//! The same query rendered for different dialects.

#[path = "../common/mod.rs"]
mod common;

use common::{library, sql_for, sql_with};
use hqlc::{compile, CompileOptions, Dialect, QueryErrorKind};

const PAGED: &str = "select p.title from Publication p order by p.title limit :max";

#[test]
fn test_pagination_per_dialect() {
    insta::assert_snapshot!(
        sql_for(PAGED, Dialect::Postgres),
        @"select p1_0.title from publication p1_0 order by p1_0.title limit ?"
    );
    insta::assert_snapshot!(
        sql_for(PAGED, Dialect::Oracle),
        @"select p1_0.title from publication p1_0 order by p1_0.title fetch first ? rows only"
    );
    insta::assert_snapshot!(
        sql_for(PAGED, Dialect::Oracle8i),
        @"select * from ( select p1_0.title from publication p1_0 order by p1_0.title ) where rownum <= ?"
    );
    insta::assert_snapshot!(
        sql_for(PAGED, Dialect::TSql),
        @"select p1_0.title from publication p1_0 order by p1_0.title offset 0 rows fetch next ? rows only"
    );
}

#[test]
fn test_pagination_unsupported_on_sybase() {
    let options = CompileOptions::default().with_dialect(Dialect::Sybase11);
    let err = compile(PAGED, &library(), &options).unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::Unsupported);
}

#[test]
fn test_outer_join_syntax() {
    let hql = "select p.title from Publication p left join p.author a on a.name = :name";
    insta::assert_snapshot!(
        sql_for(hql, Dialect::Postgres),
        @"select p1_0.title from publication p1_0 left outer join person a1_0 on p1_0.author_id=a1_0.id and a1_0.name=?"
    );
    insta::assert_snapshot!(
        sql_for(hql, Dialect::Oracle8i),
        @"select p1_0.title from publication p1_0, person a1_0 where p1_0.author_id=a1_0.id(+) and a1_0.name(+)=?"
    );
    insta::assert_snapshot!(
        sql_for(hql, Dialect::Sybase11),
        @"select p1_0.title from publication p1_0, person a1_0 where p1_0.author_id *= a1_0.id and a1_0.name=?"
    );
}

#[test]
fn test_theta_style_inner_joins() {
    let hql = "select a.name from Publication p join p.author a";
    insta::assert_snapshot!(
        sql_for(hql, Dialect::Oracle8i),
        @"select a1_0.name from publication p1_0, person a1_0 where p1_0.author_id=a1_0.id"
    );
    let theta = CompileOptions::default().with_theta_style_inner_joins(true);
    insta::assert_snapshot!(
        sql_with(hql, &theta),
        @"select a1_0.name from publication p1_0, person a1_0 where p1_0.author_id=a1_0.id"
    );
}

#[test]
fn test_case_insensitive_like() {
    let hql = "select a.name from Person a where a.name ilike :pattern";
    insta::assert_snapshot!(
        sql_for(hql, Dialect::Postgres),
        @"select p1_0.name from person p1_0 where p1_0.name ilike ?"
    );
    insta::assert_snapshot!(
        sql_for(hql, Dialect::Oracle),
        @"select p1_0.name from person p1_0 where lower(p1_0.name) like lower(?)"
    );
}

#[test]
fn test_compiled_query_records_dialect() {
    for dialect in Dialect::ALL {
        let compiled = compile(
            "select t.name from Tag t",
            &library(),
            &CompileOptions::default().with_dialect(dialect),
        )
        .unwrap();
        assert_eq!(compiled.dialect, dialect);
        assert_eq!(compiled.affected_tables, vec!["tag"]);
    }
}

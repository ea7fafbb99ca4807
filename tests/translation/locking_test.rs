//! Pessimistic locking of select statements.

#[path = "../common/mod.rs"]
mod common;

use common::{library, sql_with};
use hqlc::sql::{Dialect, LockMode, LockOptions, LockTimeout};
use hqlc::{compile, lock_by_id, CompileOptions, QueryError, QueryErrorKind};

fn locked(hql: &str, dialect: Dialect, lock: LockOptions) -> String {
    sql_with(hql, &CompileOptions::default().with_dialect(dialect).with_lock(lock))
}

#[test]
fn test_lock_clause_names_selected_group() {
    insta::assert_snapshot!(
        locked(
            "select a from Publication p join p.author a",
            Dialect::Postgres,
            LockOptions::new(LockMode::PessimisticWrite),
        ),
        @"select a1_0.id,a1_0.name,a1_0.street,a1_0.city from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id for update of a1_0"
    );
}

#[test]
fn test_lock_timeout() {
    insta::assert_snapshot!(
        locked(
            "select p.title from Publication p",
            Dialect::Postgres,
            LockOptions::new(LockMode::PessimisticWrite).with_timeout(LockTimeout::NoWait),
        ),
        @"select p1_0.title from publication p1_0 for update of p1_0 nowait"
    );
}

#[test]
fn test_read_lock() {
    insta::assert_snapshot!(
        locked(
            "select p.title from Publication p",
            Dialect::Postgres,
            LockOptions::new(LockMode::PessimisticRead),
        ),
        @"select p1_0.title from publication p1_0 for share of p1_0"
    );
}

#[test]
fn test_alias_lock_mode_narrows_targets() {
    insta::assert_snapshot!(
        locked(
            "select p, a from Publication p join p.author a",
            Dialect::Postgres,
            LockOptions::new(LockMode::None).with_alias_mode("a", LockMode::PessimisticWrite),
        ),
        @"select p1_0.id,p1_0.kind,p1_0.title,p1_0.price,p1_0.published_on,p1_0.version,p1_0.author_id,p1_0.genre,a1_0.id,a1_0.name,a1_0.street,a1_0.city from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id for update of a1_0"
    );
}

#[test]
fn test_optimistic_lock_renders_nothing() {
    insta::assert_snapshot!(
        locked(
            "select p.title from Publication p",
            Dialect::Postgres,
            LockOptions::new(LockMode::Optimistic),
        ),
        @"select p1_0.title from publication p1_0"
    );
}

#[test]
fn test_lock_by_id_per_dialect() {
    let lock = || LockOptions::new(LockMode::PessimisticWrite);
    let render = |dialect| {
        lock_by_id(
            "Person",
            &library(),
            lock(),
            &CompileOptions::default().with_dialect(dialect),
        )
        .unwrap()
        .sql
    };
    insta::assert_snapshot!(
        render(Dialect::Postgres),
        @"select p1_0.id,p1_0.name,p1_0.street,p1_0.city from person p1_0 where p1_0.id=? for update of p1_0"
    );
    insta::assert_snapshot!(
        render(Dialect::Oracle),
        @"select p1_0.id,p1_0.name,p1_0.street,p1_0.city from person p1_0 where p1_0.id=? for update of p1_0.id"
    );
    insta::assert_snapshot!(
        render(Dialect::TSql),
        @"select p1_0.id,p1_0.name,p1_0.street,p1_0.city from person p1_0 with (updlock,rowlock) where p1_0.id=?"
    );
}

#[test]
fn test_locking_roots_reported() {
    let compiled = compile(
        "select a from Publication p join p.author a",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap();
    assert_eq!(compiled.locking_roots, vec!["Publication(p).author(a)"]);
}

#[test]
fn test_selected_association_is_locking_root() {
    let compiled = compile(
        "select p.author from Publication p",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap();
    assert_eq!(compiled.locking_roots, vec!["Publication(p).author"]);
}

#[test]
fn test_instantiation_arguments_lock_in_order_once() {
    let compiled = compile(
        "select new List(p.author, p, p.author) from Publication p",
        &library(),
        &CompileOptions::default(),
    )
    .unwrap();
    assert_eq!(
        compiled.locking_roots,
        vec!["Publication(p).author", "Publication(p)"]
    );
}

fn lock_error(hql: &str, dialect: Dialect) -> QueryError {
    let options = CompileOptions::default()
        .with_dialect(dialect)
        .with_lock(LockOptions::new(LockMode::PessimisticWrite));
    match compile(hql, &library(), &options) {
        Ok(compiled) => panic!("{hql} compiled to {}", compiled.sql),
        Err(err) => err,
    }
}

#[test]
fn test_paginated_lock_rejected_on_oracle() {
    let paged = "select p.title from Publication p order by p.title limit 5";
    for dialect in [Dialect::Oracle8i, Dialect::Oracle] {
        let err = lock_error(paged, dialect);
        assert_eq!(err.kind(), QueryErrorKind::Unsupported, "{dialect:?}");
        assert!(err.to_string().contains("paginated"), "{err}");
    }

    insta::assert_snapshot!(
        locked(paged, Dialect::Postgres, LockOptions::new(LockMode::PessimisticWrite)),
        @"select p1_0.title from publication p1_0 order by p1_0.title limit 5 for update of p1_0"
    );
}

#[test]
fn test_lock_rejected_on_distinct_and_aggregates() {
    let cases = [
        ("select distinct p.title from Publication p", "distinct"),
        ("select count(p) from Publication p", "aggregate"),
        ("select max(p.price) + 1 from Publication p", "aggregate"),
        ("select p.title from Publication p group by p.title", "grouped"),
    ];
    for dialect in [Dialect::Postgres, Dialect::Oracle] {
        for (hql, shape) in cases {
            let err = lock_error(hql, dialect);
            assert_eq!(err.kind(), QueryErrorKind::Unsupported, "{hql}");
            assert!(err.to_string().contains(shape), "{err}");
        }
    }
}

#[test]
fn test_lock_with_aggregates_where_dialect_allows() {
    let lock = || LockOptions::new(LockMode::PessimisticWrite);
    insta::assert_snapshot!(
        locked("select distinct p.title from Publication p", Dialect::MySql, lock()),
        @"select distinct p1_0.title from publication p1_0 for update of p1_0"
    );
    insta::assert_snapshot!(
        locked("select distinct p.title from Publication p", Dialect::TSql, lock()),
        @"select distinct p1_0.title from publication p1_0 with (updlock,rowlock)"
    );
    insta::assert_snapshot!(
        locked(
            "select p.title from Publication p where p.price > (select avg(q.price) from Publication q)",
            Dialect::Postgres,
            lock(),
        ),
        @"select p1_0.title from publication p1_0 where p1_0.price>(select avg(p2_0.price) from publication p2_0) for update of p1_0"
    );
}

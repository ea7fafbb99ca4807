//! Join fragments per dialect, and their use inside a `Select`.

use hqlc::dialect::SqlDialect;
use hqlc::fragment::{JoinFragment, JoinFragmentBuilder, JoinStyle, JoinType, QueryJoinFragment, Select};
use hqlc::sql::Dialect;

fn author_join(dialect: Dialect, join_type: JoinType) -> JoinFragment {
    let mut fragment = dialect.create_outer_join_fragment();
    fragment
        .add_join("person", "a1_0", &["p1_0.author_id"], &["id"], join_type, None)
        .unwrap();
    fragment
}

#[test]
fn test_dialect_picks_join_style() {
    assert_eq!(Dialect::Postgres.join_style(), JoinStyle::Ansi);
    assert_eq!(Dialect::Oracle.join_style(), JoinStyle::Ansi);
    assert_eq!(Dialect::Oracle8i.join_style(), JoinStyle::OracleTheta);
    assert_eq!(Dialect::Sybase11.join_style(), JoinStyle::Sybase);
}

#[test]
fn test_left_join_per_dialect() {
    let ansi = author_join(Dialect::Postgres, JoinType::LeftOuter);
    assert_eq!(
        ansi.to_from_fragment_string(),
        " left outer join person a1_0 on p1_0.author_id=a1_0.id"
    );
    assert_eq!(ansi.to_where_fragment_string(), "");
    assert!(!ansi.has_theta_joins());

    let oracle = author_join(Dialect::Oracle8i, JoinType::LeftOuter);
    assert_eq!(oracle.to_from_fragment_string(), ", person a1_0");
    assert_eq!(oracle.to_where_fragment_string(), " and p1_0.author_id=a1_0.id(+)");
    assert!(oracle.has_theta_joins());

    let sybase = author_join(Dialect::Sybase11, JoinType::LeftOuter);
    assert_eq!(sybase.to_from_fragment_string(), ", person a1_0");
    assert_eq!(sybase.to_where_fragment_string(), " and p1_0.author_id *= a1_0.id");
}

#[test]
fn test_theta_joins_land_in_select_where_clause() {
    let mut joins = Dialect::Oracle8i.create_outer_join_fragment();
    joins
        .add_join(
            "person",
            "a1_0",
            &["p1_0.author_id"],
            &["id"],
            JoinType::LeftOuter,
            Some("a1_0.city='Oslo'"),
        )
        .unwrap();

    let select = Select::new(Dialect::Oracle8i)
        .set_select_clause("p1_0.title,a1_0.name")
        .set_from_table("publication", "p1_0")
        .set_outer_joins(joins.to_from_fragment_string(), &joins.to_where_fragment_string())
        .set_where_clause("p1_0.price>?");
    insta::assert_snapshot!(
        select.to_statement_string(),
        @"select p1_0.title,a1_0.name from publication p1_0, person a1_0 where p1_0.author_id=a1_0.id(+) and a1_0.city(+)='Oslo' and p1_0.price>?"
    );
}

#[test]
fn test_ansi_joins_land_in_select_from_clause() {
    let joins = author_join(Dialect::Ansi, JoinType::Inner);
    let select = Select::new(Dialect::Ansi)
        .set_select_clause("p1_0.title")
        .set_from_table("publication", "p1_0")
        .set_outer_joins(joins.to_from_fragment_string(), &joins.to_where_fragment_string());
    insta::assert_snapshot!(
        select.to_statement_string(),
        @"select p1_0.title from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id"
    );
}

#[test]
fn test_full_join_unsupported_on_theta_dialects() {
    let mut sybase = Dialect::Sybase11.create_outer_join_fragment();
    assert!(sybase
        .add_join("person", "a", &["p.author_id"], &["id"], JoinType::Full, None)
        .is_err());

    let mut oracle = Dialect::Oracle8i.create_outer_join_fragment();
    assert!(oracle
        .add_join("person", "a", &["p.author_id"], &["id"], JoinType::RightOuter, Some("a.x=1"))
        .is_err());
    assert_eq!(oracle.to_from_fragment_string(), "");
}

#[test]
fn test_query_fragment_theta_inner_and_dedup() {
    let mut fragment = QueryJoinFragment::new(Dialect::Ansi, true);
    fragment
        .add_join("person", "a1_0", &["p1_0.author_id"], &["id"], JoinType::Inner, None)
        .unwrap();
    assert!(!fragment.add_condition("p1_0.author_id=a1_0.id"));
    assert!(fragment.add_condition("a1_0.name is not null"));
    assert_eq!(fragment.to_from_fragment_string(), ", person a1_0");
    assert_eq!(
        fragment.to_where_fragment_string(),
        " and p1_0.author_id=a1_0.id and a1_0.name is not null"
    );
}

#[test]
fn test_copy_keeps_original_untouched() {
    let original = author_join(Dialect::Ansi, JoinType::LeftOuter);
    let mut copy = original.copy();
    copy.add_cross_join("tag", "t1_0");
    assert_eq!(
        original.to_from_fragment_string(),
        " left outer join person a1_0 on p1_0.author_id=a1_0.id"
    );
    assert_eq!(
        copy.to_from_fragment_string(),
        " left outer join person a1_0 on p1_0.author_id=a1_0.id, tag t1_0"
    );
}

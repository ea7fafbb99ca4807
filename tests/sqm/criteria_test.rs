//! Statements built with the criteria API compile like their HQL forms.

#[path = "../common/mod.rs"]
mod common;

use common::{library, sql};
use hqlc::sqm::operator::SqmJoinType;
use hqlc::sqm::{
    collect_parameters, print_tree, NodeBuilder, SqmError, SqmQuery, SqmSelection, SqmStatement,
};
use hqlc::{compile_statement, CompileOptions};

fn compiled(statement: &SqmStatement) -> String {
    compile_statement(statement, &library(), &CompileOptions::default())
        .unwrap()
        .sql
}

#[test]
fn test_join_and_restriction() {
    let model = library();
    let nb = NodeBuilder::new(&model);

    let mut p = nb.from("Publication", Some("p")).unwrap();
    let a = nb.join(&p, "author", SqmJoinType::Inner, Some("a")).unwrap();
    let name = nb.get(&a.path(), "name").unwrap();
    p.add_join(a);
    let price = nb.get(&p.path(), "price").unwrap();
    let restriction = nb
        .greater_than(price.into(), nb.parameter("min", None))
        .unwrap();

    let mut spec = nb.create_query();
    spec.add_root(p).unwrap();
    spec.add_selection(SqmSelection::expression(name.into()));
    spec.apply_predicate(restriction);
    let statement = nb.select_statement(SqmQuery::new(spec));

    let expected = sql("select a.name from Publication p join p.author a where p.price > :min");
    assert_eq!(compiled(&statement), expected);
    insta::assert_snapshot!(
        expected,
        @"select a1_0.name from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id where p1_0.price>?"
    );
}

#[test]
fn test_ordering() {
    let model = library();
    let nb = NodeBuilder::new(&model);

    let p = nb.from("Publication", Some("p")).unwrap();
    let title = nb.get(&p.path(), "title").unwrap();
    let mut spec = nb.create_query();
    spec.add_root(p).unwrap();
    spec.add_selection(SqmSelection::expression(title.clone().into()));
    let mut query = SqmQuery::new(spec);
    query.order_by.push(nb.desc(title.into()));
    let statement = nb.select_statement(query);

    assert_eq!(
        compiled(&statement),
        sql("select p.title from Publication p order by p.title desc")
    );
}

#[test]
fn test_update() {
    let model = library();
    let nb = NodeBuilder::new(&model);

    let mut update = nb.create_update("Publication", None).unwrap();
    let target = update.target.path();
    let title = nb.get(&target, "title").unwrap();
    let id = nb.get(&target, "id").unwrap();
    update
        .assignments
        .push(nb.assignment(title, nb.parameter("title", None)).unwrap());
    update.where_ = Some(nb.equal(id.into(), nb.parameter("id", None)).unwrap());
    let statement = SqmStatement::Update(update);

    insta::assert_snapshot!(compiled(&statement), @"update publication set title=? where id=?");
}

#[test]
fn test_delete_with_restriction_applied_later() {
    let model = library();
    let nb = NodeBuilder::new(&model);

    let delete = nb.create_delete("Novel", Some("n")).unwrap();
    let genre = nb.get(&delete.target.path(), "genre").unwrap();
    let mut statement = SqmStatement::Delete(delete);
    statement
        .apply_predicate(nb.equal(genre.into(), nb.literal("horror")).unwrap())
        .unwrap();

    assert_eq!(
        compiled(&statement),
        sql("delete from Novel n where n.genre = 'horror'")
    );
}

#[test]
fn test_parameters_are_collected_in_order() {
    let model = library();
    let nb = NodeBuilder::new(&model);

    let p = nb.from("Publication", Some("p")).unwrap();
    let path = p.path();
    let title = nb.get(&path, "title").unwrap();
    let price = nb.get(&path, "price").unwrap();
    let mut spec = nb.create_query();
    spec.add_root(p).unwrap();
    spec.add_selection(SqmSelection::expression(path.into()));
    spec.apply_predicate(nb.equal(title.into(), nb.parameter("title", None)).unwrap());
    spec.apply_predicate(nb.less_than(price.into(), nb.parameter("max", None)).unwrap());
    let statement = nb.select_statement(SqmQuery::new(spec));

    let labels: Vec<String> = collect_parameters(&statement)
        .iter()
        .map(|p| p.label.to_string())
        .collect();
    assert_eq!(labels, vec![":title", ":max"]);
    assert!(print_tree(&statement).contains("root Publication(p)"));
}

#[test]
fn test_builder_rejections() {
    let model = library();
    let nb = NodeBuilder::new(&model);

    assert!(matches!(nb.from("Boook", None), Err(SqmError::UnknownEntity(_))));

    let p = nb.from("Publication", Some("p")).unwrap();
    assert!(matches!(
        nb.join(&p, "price", SqmJoinType::Inner, None),
        Err(SqmError::IllegalPathUsage(_))
    ));
    assert!(matches!(
        nb.join_treat(&p, "author", "Novel", SqmJoinType::Inner, None),
        Err(SqmError::TreatMisuse(_))
    ));

    let mut spec = nb.create_query();
    spec.add_root(p).unwrap();
    let again = nb.from("Tag", Some("p")).unwrap();
    assert!(matches!(spec.add_root(again), Err(SqmError::AliasCollision { .. })));
}

#[test]
fn test_empty_junctions() {
    let model = library();
    let nb = NodeBuilder::new(&model);
    let restricted = |predicate| {
        let p = nb.from("Publication", Some("p")).unwrap();
        let title = nb.get(&p.path(), "title").unwrap();
        let mut spec = nb.create_query();
        spec.add_root(p).unwrap();
        spec.add_selection(SqmSelection::expression(title.into()));
        spec.apply_predicate(predicate);
        compiled(&nb.select_statement(SqmQuery::new(spec)))
    };

    insta::assert_snapshot!(
        restricted(nb.or(vec![])),
        @"select p1_0.title from publication p1_0 where 1<>1"
    );
    insta::assert_snapshot!(
        restricted(nb.and(vec![])),
        @"select p1_0.title from publication p1_0 where 1=1"
    );
}

#[test]
fn test_treat_of_discriminator_rejected() {
    let model = library();
    let nb = NodeBuilder::new(&model);
    let p = nb.from("Publication", Some("p")).unwrap();
    let discriminator = p.path().discriminator().unwrap();
    assert!(matches!(
        nb.treat(&discriminator, "Novel"),
        Err(SqmError::TreatMisuse(_))
    ));
}

//! Deep copies of interpreted statements.

#[path = "../common/mod.rs"]
mod common;

use common::library;
use hqlc::hql::{self, InterpretOptions};
use hqlc::sqm::{collect_parameters, NodeBuilder, SqmCopy, SqmCopyContext, SqmStatement};
use hqlc::{compile_statement, CompileOptions};

const HQL: &str = "select a.name from Publication p join p.author a where p.price > :min and a.name like :pattern";

fn interpreted() -> SqmStatement {
    hql::interpret(HQL, &library(), InterpretOptions::default()).unwrap()
}

fn sql_of(statement: &SqmStatement) -> String {
    compile_statement(statement, &library(), &CompileOptions::default())
        .unwrap()
        .sql
}

#[test]
fn test_copy_compiles_identically() {
    let original = interpreted();
    let copy = original.copy(&mut SqmCopyContext::new());
    assert_ne!(copy, original);
    assert_eq!(sql_of(&copy), sql_of(&original));
}

#[test]
fn test_copy_allocates_fresh_parameter_ids() {
    let original = interpreted();
    let copy = original.copy(&mut SqmCopyContext::new());

    let before = collect_parameters(&original);
    let after = collect_parameters(&copy);
    assert_eq!(before.len(), 2);
    assert_eq!(after.len(), 2);
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.label, a.label);
        assert_eq!(b.expressible, a.expressible);
        assert_ne!(b.id, a.id);
    }
}

#[test]
fn test_copy_maps_every_from_node() {
    let original = interpreted();
    let mut ctx = SqmCopyContext::new();
    let copy = original.copy(&mut ctx);

    let (SqmStatement::Select(before), SqmStatement::Select(after)) = (&original, &copy) else {
        panic!("expected select statements");
    };
    let before_spec = before.query.first_spec().unwrap();
    let after_spec = after.query.first_spec().unwrap();
    let before_nodes = before_spec.from[0].walk();
    let after_nodes = after_spec.from[0].walk();
    assert_eq!(before_nodes.len(), 2);
    for (b, a) in before_nodes.iter().zip(&after_nodes) {
        assert_eq!(ctx.copied_from(b.id), Some(a.id));
        assert_eq!(b.navigable_path, a.navigable_path);
    }
}

#[test]
fn test_mutating_copy_leaves_original() {
    let model = library();
    let original = interpreted();
    let mut copy = original.copy(&mut SqmCopyContext::new());

    let nb = NodeBuilder::new(&model);
    let SqmStatement::Select(select) = &copy else {
        panic!("expected select statement");
    };
    let root = select.query.first_spec().unwrap().from[0].path();
    let title = nb.get(&root, "title").unwrap();
    copy.apply_predicate(nb.is_not_null(title.into())).unwrap();

    insta::assert_snapshot!(
        sql_of(&original),
        @"select a1_0.name from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id where p1_0.price>? and a1_0.name like ?"
    );
    assert!(sql_of(&copy).ends_with(" and p1_0.title is not null"));
}

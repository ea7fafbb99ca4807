//! Library domain shared by the integration tests.
//!
//! - `Person` (table `person`): `name`, embedded `address` (`street`, `city`),
//!   `publications` mapped by `Publication.author`
//! - `Publication` (table `publication`, discriminator `kind`): `title`,
//!   `price`, `publishedOn`, `version`, `author`, `tags` (ordered by name)
//! - `Novel` extends `Publication`: `genre`
//! - `Tag` (table `tag`, restricted to `active = 1`): `name`

#![allow(dead_code)]

use hqlc::metamodel::{Attribute, EntityBuilder, MappingMetamodel};
use hqlc::sqm::BasicType;
use hqlc::{compile, CompileOptions, Dialect};

pub fn library() -> MappingMetamodel {
    MappingMetamodel::builder()
        .entity(
            EntityBuilder::new("Person")
                .id("id", BasicType::Long)
                .basic("name", BasicType::String)
                .embedded(
                    "address",
                    "Address",
                    vec![
                        Attribute::basic("street", "street", BasicType::String),
                        Attribute::basic("city", "city", BasicType::String),
                    ],
                )
                .one_to_many("publications", "Publication", "author"),
        )
        .entity(
            EntityBuilder::new("Publication")
                .class_name("org.example.Publication")
                .id("id", BasicType::Long)
                .basic("title", BasicType::String)
                .basic("price", BasicType::BigDecimal)
                .basic("publishedOn", BasicType::Date)
                .version("version", BasicType::Integer)
                .many_to_one("author", "Person")
                .many_to_many("tags", "Tag")
                .collection_order_by("tags", "name asc")
                .discriminator("kind", BasicType::String),
        )
        .entity(
            EntityBuilder::new("Novel")
                .extends("Publication")
                .basic("genre", BasicType::String),
        )
        .entity(
            EntityBuilder::new("Tag")
                .id("id", BasicType::Long)
                .basic("name", BasicType::String)
                .where_restriction("active = 1"),
        )
        .build()
        .unwrap()
}

/// Compile `hql` for `dialect` and return the SQL text.
pub fn sql_for(hql: &str, dialect: Dialect) -> String {
    sql_with(hql, &CompileOptions::default().with_dialect(dialect))
}

pub fn sql(hql: &str) -> String {
    sql_for(hql, Dialect::Ansi)
}

pub fn sql_with(hql: &str, options: &CompileOptions) -> String {
    compile(hql, &library(), options)
        .unwrap_or_else(|e| panic!("failed to compile {hql:?}: {e}"))
        .sql
}

//! Small library domain shared by unit tests.

use super::{Attribute, EntityBuilder, MappingMetamodel};
use crate::sqm::types::BasicType;

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
        .expect("library model is valid")
}

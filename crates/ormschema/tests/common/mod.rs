#![allow(dead_code)]

use std::sync::Arc;

use ormschema::prelude::*;

/// Auction site models shared by the integration tests.
pub fn catalog() -> ModelCatalog {
    CatalogBuilder::new()
        .register(
            ModelDef::new("Category")
                .app_label("tests")
                .field(FieldDescriptor::new("name", FieldKind::CharField).max_length(100))
                .field(FieldDescriptor::new("start_date", FieldKind::DateField))
                .field(FieldDescriptor::new("end_date", FieldKind::DateField)),
        )
        .register(
            ModelDef::new("Auction")
                .app_label("tests")
                .field(FieldDescriptor::new("title", FieldKind::CharField).max_length(100))
                .field(FieldDescriptor::one_to_one("category", "Category").null(true).blank(true))
                .field(FieldDescriptor::new("start_date", FieldKind::DateField))
                .field(FieldDescriptor::new("end_date", FieldKind::DateField)),
        )
        .register(
            ModelDef::new("Client")
                .app_label("tests")
                .field(FieldDescriptor::new("key", FieldKind::CharField).max_length(20)),
        )
        .register(
            ModelDef::new("Profile")
                .app_label("tests")
                .field(FieldDescriptor::new("address", FieldKind::TextField))
                .field(FieldDescriptor::new("dob", FieldKind::DateTimeField).null(true).blank(true)),
        )
        .register(
            ModelDef::new("Group")
                .app_label("tests")
                .field(FieldDescriptor::new("name", FieldKind::CharField).max_length(10))
                .field(FieldDescriptor::new("config", FieldKind::JsonField).null(true)),
        )
        .register(
            ModelDef::new("UserType")
                .app_label("tests")
                .field(FieldDescriptor::new("name", FieldKind::CharField).max_length(50)),
        )
        .register(
            ModelDef::new("UserBase")
                .app_label("tests")
                .field(FieldDescriptor::new("full_name", FieldKind::CharField).max_length(50))
                .field(FieldDescriptor::new("age", FieldKind::PositiveIntegerField))
                .abstract_model(),
        )
        .register(
            ModelDef::new("User")
                .app_label("tests")
                .field(FieldDescriptor::new("full_name", FieldKind::CharField).max_length(50))
                .field(FieldDescriptor::new("age", FieldKind::PositiveIntegerField))
                .field(FieldDescriptor::one_to_one("profile", "Profile"))
                .field(FieldDescriptor::foreign_key("tier", "UserType").null(true).related_name("users"))
                .field(FieldDescriptor::many_to_many("groups", "Group")),
        )
        .register(
            ModelDef::new("UserTier")
                .app_label("tests")
                .field(FieldDescriptor::new("name", FieldKind::CharField).max_length(10))
                .field(
                    FieldDescriptor::new("level", FieldKind::CharField)
                        .max_length(10)
                        .choices(vec![Choice::new("level-0", "Level 0"), Choice::new("level-1", "Level 1")])
                        .default_member("LEVEL_0", "level-0"),
                ),
        )
        .build()
        .expect("fixture catalog is valid")
}

pub fn model(catalog: &ModelCatalog, name: &str) -> Model {
    catalog.model(name).unwrap_or_else(|| panic!("fixture model {name} missing"))
}

/// Fresh registry so tests never observe each other's cached schemas.
pub fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::new())
}

pub fn options(catalog: &ModelCatalog, name: &str) -> SchemaOptions {
    SchemaOptions::new(model(catalog, name)).registry(registry())
}

pub fn field_names(schema: &SchemaType) -> Vec<&str> {
    schema.fields().iter().map(|f| f.name.as_str()).collect()
}

//! ORM Schema Rust: validating, serializable schema types derived from ORM
//! model definitions.
//!
//! Describe models once in a [`ModelCatalog`](ormschema_core::ModelCatalog),
//! then either declare schemas with [`SchemaDecl`](ormschema_schema::SchemaDecl)
//! or create them on demand with [`create_schema`](ormschema_schema::create_schema).
//!
//! ```ignore
//! use ormschema::prelude::*;
//!
//! let catalog = CatalogBuilder::new()
//!     .register(ModelDef::new("Category").field(FieldDescriptor::new("name", FieldKind::CharField)))
//!     .build()?;
//! let category = catalog.model("Category").unwrap();
//!
//! let schema = SchemaDecl::new("CategorySchema")
//!     .options(SchemaOptions::new(category))
//!     .build()?;
//! let value = schema.construct([("name", "Books")])?;
//! assert_eq!(value.dump(&DumpOptions::new())["name"], "Books");
//! ```
//!
//! # Crates
//!
//! - `ormschema-core`: model introspection, field types, the typed object
//!   runtime, configuration and the registry.
//! - `ormschema-schema`: the synthesis engine.

pub use ormschema_core as core;
pub use ormschema_schema as schema;

pub use ormschema_core::{
    ALL_FIELDS, Attribute, CatalogBuilder, Choice, ChoiceEnum, DefaultValue, DumpOptions, Error,
    FieldDefault, FieldDescriptor, FieldError, FieldInfo, FieldKind, FieldSelection, FieldType,
    FieldsSet, DynamicInstance, Model, ModelCatalog, ModelDef, ModelInstance, OptionalFields,
    ROOT_KEY, Result, RootValidator, SchemaConfig, SchemaField, SchemaInstance, SchemaOptions,
    SchemaRegistry, SchemaType, SchemaTypeBuilder, ValidationErrorKind, ValidationErrors,
    ValidationInfo, Validator, Value,
};
pub use ormschema_schema::{
    CreateOptions, FieldMapper, SchemaDecl, construct_field_info, create_schema,
    register_field_kind,
};

/// Everything needed to declare and use schemas.
pub mod prelude {
    pub use crate::{
        ALL_FIELDS, Attribute, CatalogBuilder, Choice, CreateOptions, DefaultValue, DumpOptions,
        DynamicInstance, Error, FieldDescriptor, FieldInfo, FieldKind, FieldMapper, FieldType,
        Model, ModelCatalog, ModelDef, ModelInstance, ROOT_KEY, Result, RootValidator,
        SchemaDecl, SchemaInstance, SchemaOptions, SchemaRegistry, SchemaType, Validator, Value,
        create_schema, register_field_kind,
    };
}

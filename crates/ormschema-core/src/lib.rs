//! Core types for ORM Schema Rust.
//!
//! `ormschema-core` is the **foundation layer** of the workspace. It defines the
//! data types that the synthesis engine reads and produces.
//!
//! # Role In The Architecture
//!
//! - **Model introspection**: `ModelCatalog`, `Model` and `FieldDescriptor` describe the
//!   source ORM models, including reverse relations and the implicit primary key.
//! - **Instance adapter**: `ModelInstance` is how generated schemas read attributes from
//!   model rows and write them back.
//! - **Typed object runtime**: `SchemaType` and `SchemaInstance` validate, coerce and
//!   serialize data against a generated field set.
//! - **Configuration and registry**: `SchemaOptions`, `SchemaConfig` and `SchemaRegistry`
//!   are shared by the engine and by the generated types that point back at them.
//!
//! # Who Uses This Crate
//!
//! - `ormschema-schema` maps model fields to `FieldType`/`FieldInfo` pairs and assembles
//!   `SchemaType`s from them.
//! - The `ormschema` facade re-exports everything here through its prelude.
//!
//! Most applications should use the `ormschema` facade.

pub mod config;
pub mod error;
pub mod field;
pub mod fields_set;
pub mod identifiers;
pub mod instance;
pub mod json_schema;
pub mod model;
pub mod registry;
pub mod relationship;
pub mod schema;
pub mod validate;
pub mod value;

pub use config::{ALL_FIELDS, FieldSelection, OptionalFields, SchemaConfig, SchemaOptions};
pub use error::{Error, FieldError, Result, ValidationErrorKind, ValidationErrors};
pub use field::{
    ChoiceEnum, DefaultFactory, DefaultValue, EnumMember, FieldInfo, FieldType, SchemaField,
};
pub use fields_set::FieldsSet;
pub use identifiers::{ROOT_KEY, enum_member_name, enum_type_name, is_valid_field, title_case};
pub use instance::{Attribute, DynamicInstance, ModelInstance};
pub use model::{
    CatalogBuilder, Choice, FieldDefault, FieldDescriptor, FieldKind, Model, ModelCatalog, ModelDef,
};
pub use registry::SchemaRegistry;
pub use relationship::{RelationInfo, RelationshipKind};
pub use schema::{
    DumpOptions, RootValidator, RootValidatorFn, SchemaInstance, SchemaType, SchemaTypeBuilder,
    ValidationInfo, Validator, ValidatorFn,
};
pub use value::Value;

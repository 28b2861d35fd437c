//! Schema synthesis engine for ORM Schema Rust.
//!
//! `ormschema-schema` turns model definitions from `ormschema-core` into
//! generated [`SchemaType`]s.
//!
//! # Role In The Architecture
//!
//! - **Field mapping**: [`mapper`] maps scalar field kinds through an
//!   extensible table keyed by kind name.
//! - **Relation expansion**: [`relation`] maps relations to key references,
//!   or to nested schemas while a depth budget remains.
//! - **Configuration**: [`resolver`] validates declared options into a
//!   `SchemaConfig`.
//! - **Synthesis**: [`synth`] merges model fields, user declarations and
//!   parent schemas into one type.
//! - **Factory**: [`factory`] creates schemas on demand, cached in a
//!   [`SchemaRegistry`].
//!
//! # Who Uses This Crate
//!
//! - The `ormschema` facade re-exports this crate through its prelude.
//! - Applications that only need on-demand schemas can call
//!   [`create_schema`] directly.

pub mod factory;
pub mod mapper;
pub mod relation;
pub mod resolver;
pub mod synth;

pub use factory::{CreateOptions, create_schema};
pub use mapper::{FieldHandler, FieldMapper, construct_field_info, map_field, register_field_kind};
pub use ormschema_core::registry::SchemaRegistry;
pub use ormschema_core::schema::SchemaType;
pub use relation::{RelationContext, map_model_field, map_relation};
pub use resolver::resolve;
pub use synth::SchemaDecl;

//! On-demand schema creation with registry caching.

use std::sync::Arc;

use ormschema_core::config::SchemaOptions;
use ormschema_core::error::{Error, Result};
use ormschema_core::model::Model;
use ormschema_core::registry::SchemaRegistry;
use ormschema_core::schema::SchemaType;

use crate::synth::SchemaDecl;

/// Arguments of [`create_schema`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Schema name; defaults to the model name.
    pub name: Option<String>,
    /// Relation expansion depth.
    pub depth: u32,
    /// Fields to include.
    pub fields: Vec<String>,
    /// Fields to exclude.
    pub exclude: Vec<String>,
    /// Neither read nor write the registry, here or in nested schemas.
    pub skip_registry: bool,
    /// Registry to use instead of the global one.
    pub registry: Option<Arc<SchemaRegistry>>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn skip_registry(mut self, skip: bool) -> Self {
        self.skip_registry = skip;
        self
    }

    pub fn registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Create (or fetch the cached) schema for `model`.
///
/// A schema already cached for `model` is returned as is, whatever the other
/// options say. Otherwise a new schema is synthesized and cached, unless
/// `skip_registry` is set.
///
/// With `skip_registry` the cache is neither read nor written: a fresh schema
/// is built even when one is already cached for `model`.
///
/// # Example
///
/// ```ignore
/// let schema = create_schema(&user, CreateOptions::new().depth(1))?;
/// assert!(Arc::ptr_eq(&schema, &create_schema(&user, CreateOptions::new())?));
/// ```
pub fn create_schema(model: &Model, options: CreateOptions) -> Result<Arc<SchemaType>> {
    if !options.fields.is_empty() && !options.exclude.is_empty() {
        return Err(Error::config(
            "Only one of 'include' or 'exclude' should be set.",
        ));
    }

    let registry = options.registry.unwrap_or_else(SchemaRegistry::global);
    if !options.skip_registry {
        if let Some(schema) = registry.lookup(model) {
            tracing::trace!(model = %model, schema = schema.name(), "Using cached schema");
            return Ok(schema);
        }
    }

    let name = options.name.unwrap_or_else(|| model.name().to_string());
    let mut schema_options = SchemaOptions::new(model.clone())
        .depth(options.depth)
        .registry(Arc::clone(&registry))
        .skip_registry(options.skip_registry);
    if !options.fields.is_empty() {
        schema_options = schema_options.include(options.fields);
    }
    if !options.exclude.is_empty() {
        schema_options = schema_options.exclude(options.exclude);
    }

    let schema = SchemaDecl::new(name).options(schema_options).build()?;
    if !options.skip_registry {
        registry.register(model, Arc::clone(&schema))?;
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormschema_core::model::{CatalogBuilder, FieldDescriptor, FieldKind, ModelCatalog, ModelDef};

    fn catalog() -> ModelCatalog {
        CatalogBuilder::new()
            .register(
                ModelDef::new("Node")
                    .field(FieldDescriptor::new("label", FieldKind::CharField))
                    .field(FieldDescriptor::foreign_key("parent", "self").null(true).related_name("children")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_cached_schema_is_reused() {
        let node = catalog().model("Node").unwrap();
        let registry = Arc::new(SchemaRegistry::new());
        let first = create_schema(&node, CreateOptions::new().registry(Arc::clone(&registry))).unwrap();
        let second = create_schema(
            &node,
            CreateOptions::new().name("Other").registry(Arc::clone(&registry)),
        )
        .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "Node");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_skip_registry() {
        let node = catalog().model("Node").unwrap();
        let registry = Arc::new(SchemaRegistry::new());
        let options = CreateOptions::new().depth(2).skip_registry(true).registry(Arc::clone(&registry));
        let first = create_schema(&node, options.clone()).unwrap();
        let second = create_schema(&node, options).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(registry.is_empty());

        let cached = create_schema(&node, CreateOptions::new().registry(Arc::clone(&registry))).unwrap();
        let fresh = create_schema(&node, CreateOptions::new().skip_registry(true).registry(Arc::clone(&registry))).unwrap();
        assert!(!Arc::ptr_eq(&cached, &fresh));
        assert!(Arc::ptr_eq(&cached, &registry.lookup(&node).unwrap()));
    }

    #[test]
    fn test_self_reference_terminates() {
        let node = catalog().model("Node").unwrap();
        let schema = create_schema(
            &node,
            CreateOptions::new().depth(3).skip_registry(true).registry(Arc::new(SchemaRegistry::new())),
        )
        .unwrap();
        let mut depth = 0;
        let mut current = schema;
        while let Some(nested) = current.field("parent").and_then(|f| f.ty.schema()).cloned() {
            depth += 1;
            current = nested;
        }
        assert_eq!(depth, 3);
    }

    #[test]
    fn test_fields_and_exclude_conflict() {
        let node = catalog().model("Node").unwrap();
        let err = create_schema(&node, CreateOptions::new().fields(["label"]).exclude(["id"])).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_field_selection() {
        let node = catalog().model("Node").unwrap();
        let schema = create_schema(
            &node,
            CreateOptions::new()
                .name("NodeLabel")
                .fields(["label"])
                .registry(Arc::new(SchemaRegistry::new())),
        )
        .unwrap();
        assert_eq!(schema.name(), "NodeLabel");
        assert_eq!(schema.fields().len(), 1);
    }
}

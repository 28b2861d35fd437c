//! Mapping of relation fields.
//!
//! At depth zero a relation becomes the target's primary-key type (a list of
//! key references for to-many relations). Above zero the target model gets
//! its own generated schema, built one level shallower through the factory,
//! so the recursion always terminates even on cyclic model graphs.

use std::sync::Arc;

use ormschema_core::error::{Error, Result};
use ormschema_core::field::{DefaultValue, FieldInfo, FieldType};
use ormschema_core::model::{FieldDescriptor, Model};
use ormschema_core::registry::SchemaRegistry;
use ormschema_core::value::Value;

use crate::factory::{CreateOptions, create_schema};
use crate::mapper::{FieldMapper, describe};

/// Expansion settings threaded through one synthesis.
#[derive(Debug, Clone)]
pub struct RelationContext {
    /// Remaining expansion depth.
    pub depth: u32,
    /// Registry nested schemas are cached in.
    pub registry: Arc<SchemaRegistry>,
    /// Build nested schemas without touching the registry.
    pub skip_registry: bool,
}

impl RelationContext {
    pub fn new(depth: u32, registry: Arc<SchemaRegistry>, skip_registry: bool) -> Self {
        Self {
            depth,
            registry,
            skip_registry,
        }
    }
}

/// Map any field of `model`: relations here, scalars through the global mapper.
pub fn map_model_field(model: &Model, field: &FieldDescriptor, ctx: &RelationContext) -> Result<(FieldType, FieldInfo)> {
    if field.is_relation() {
        map_relation(model, field, ctx)
    } else {
        FieldMapper::global().map_field(field)
    }
}

/// Map a relation field of `model`.
///
/// Reverse descriptors and nullable relations default to null. At depth zero
/// forward keys are aliased to their column name (`category` reads and dumps
/// as `category_id`); many-to-many and reverse relations carry no alias.
pub fn map_relation(model: &Model, field: &FieldDescriptor, ctx: &RelationContext) -> Result<(FieldType, FieldInfo)> {
    let related = model.related_model(field).ok_or_else(|| {
        Error::config(format!(
            "field '{}.{}' is not a relation to a known model",
            model.name(),
            field.name
        ))
    })?;

    let default = if (!field.concrete && field.auto_created) || field.null {
        DefaultValue::Value(Value::Null)
    } else {
        DefaultValue::Required
    };

    if ctx.depth > 0 {
        tracing::trace!(
            field = %field.name,
            related = %related,
            depth = ctx.depth,
            "Expanding relation into nested schema"
        );
        let nested = create_schema(
            &related,
            CreateOptions::new()
                .depth(ctx.depth - 1)
                .registry(Arc::clone(&ctx.registry))
                .skip_registry(ctx.skip_registry),
        )?;
        let mut ty = FieldType::Schema(nested);
        if field.is_to_many() {
            ty = ty.list();
        }
        return Ok((ty, describe(field).with_default(default)));
    }

    let pk = related.pk();
    let (pk_type, _) = if pk.is_relation() {
        // Primary key that is itself a one-to-one parent link.
        let shallow = RelationContext { depth: 0, ..ctx.clone() };
        map_relation(&related, pk, &shallow)?
    } else {
        FieldMapper::global().map_field(pk)?
    };
    let pk_type = pk_type.non_optional().clone();

    let ty = if field.is_to_many() {
        pk_type.pk_ref().list()
    } else {
        pk_type
    };
    let alias = field.kind.has_column().then(|| field.attname());
    let info = describe(field).alias_opt(alias).with_default(default);
    Ok((ty, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormschema_core::model::{CatalogBuilder, FieldKind, ModelCatalog, ModelDef};

    fn catalog() -> ModelCatalog {
        CatalogBuilder::new()
            .register(ModelDef::new("Category").field(FieldDescriptor::new("name", FieldKind::CharField).max_length(50)))
            .register(
                ModelDef::new("Tag")
                    .field(FieldDescriptor::new("slug", FieldKind::SlugField).primary_key(true).max_length(30)),
            )
            .register(
                ModelDef::new("Post")
                    .field(FieldDescriptor::new("title", FieldKind::CharField))
                    .field(FieldDescriptor::foreign_key("category", "Category").null(true).related_name("posts"))
                    .field(FieldDescriptor::many_to_many("tags", "Tag")),
            )
            .build()
            .unwrap()
    }

    fn ctx(depth: u32) -> RelationContext {
        RelationContext::new(depth, Arc::new(SchemaRegistry::new()), false)
    }

    #[test]
    fn test_foreign_key_depth_zero() {
        let post = catalog().model("Post").unwrap();
        let field = post.field("category").unwrap();
        let (ty, info) = map_relation(&post, field, &ctx(0)).unwrap();
        assert_eq!(ty, FieldType::Int);
        assert_eq!(info.alias.as_deref(), Some("category_id"));
        assert_eq!(info.title.as_deref(), Some("Category"));
        assert_eq!(info.default, DefaultValue::Value(Value::Null));
        assert_eq!(info.max_length, None);
    }

    #[test]
    fn test_many_to_many_depth_zero() {
        let post = catalog().model("Post").unwrap();
        let field = post.field("tags").unwrap();
        let (ty, info) = map_relation(&post, field, &ctx(0)).unwrap();
        assert_eq!(ty, FieldType::Str.pk_ref().list());
        assert_eq!(info.alias, None);
        assert!(info.is_required());
    }

    #[test]
    fn test_reverse_relation_defaults_to_none() {
        let category = catalog().model("Category").unwrap();
        let field = category.field("posts").unwrap();
        let (ty, info) = map_relation(&category, field, &ctx(0)).unwrap();
        assert_eq!(ty, FieldType::Int.pk_ref().list());
        assert_eq!(info.alias, None);
        assert_eq!(info.default, DefaultValue::Value(Value::Null));
    }

    #[test]
    fn test_depth_one_builds_nested_schema() {
        let post = catalog().model("Post").unwrap();
        let context = ctx(1);
        let (ty, _) = map_relation(&post, post.field("category").unwrap(), &context).unwrap();
        let nested = ty.schema().unwrap();
        assert_eq!(nested.name(), "Category");
        assert!(context.registry.contains(&post.related_model(post.field("category").unwrap()).unwrap()));

        let (ty, _) = map_relation(&post, post.field("tags").unwrap(), &context).unwrap();
        assert!(matches!(ty, FieldType::List(_)));
        assert_eq!(ty.schema().unwrap().name(), "Tag");
    }

    #[test]
    fn test_scalar_dispatch() {
        let post = catalog().model("Post").unwrap();
        let (ty, _) = map_model_field(&post, post.field("title").unwrap(), &ctx(0)).unwrap();
        assert_eq!(ty, FieldType::Str);
    }
}

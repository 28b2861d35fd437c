//! Cache of generated schemas keyed by source model.
//!
//! A registry guarantees at most one cached schema per model, which is what
//! stops relation expansion from rebuilding the same schema over and over on
//! cyclic model graphs. One process-wide registry is available through
//! [`SchemaRegistry::global`]; callers may create independent registries and
//! pass them in through the schema options instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::model::Model;
use crate::schema::SchemaType;

/// Model-to-schema cache.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<Model, Arc<SchemaType>>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry.
    pub fn global() -> Arc<SchemaRegistry> {
        static GLOBAL: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SchemaRegistry::new())))
    }

    /// Cache `schema` for `model`, replacing any earlier entry.
    ///
    /// Fails with a configuration error if `schema` was not generated from a
    /// model, or if `model` is abstract.
    pub fn register(&self, model: &Model, schema: Arc<SchemaType>) -> Result<()> {
        if schema.config().is_none() {
            return Err(Error::config(format!(
                "only model schemas can be registered, received '{}'",
                schema.name()
            )));
        }
        if model.is_abstract() {
            return Err(Error::config(format!(
                "only concrete models can be registered, received '{}'",
                model.name()
            )));
        }
        tracing::debug!(model = %model, schema = schema.name(), "Registering schema");
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model.clone(), schema);
        Ok(())
    }

    /// The schema cached for `model`, if any.
    pub fn lookup(&self, model: &Model) -> Option<Arc<SchemaType>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .cloned()
    }

    /// True if a schema is cached for `model`.
    pub fn contains(&self, model: &Model) -> bool {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(model)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.schemas.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.len())
            .finish()
    }
}

//! Per-schema configuration.
//!
//! [`SchemaOptions`] is what a caller declares; [`SchemaConfig`] is the
//! validated, immutable result kept on the generated schema type.
//!
//! # Example
//!
//! ```ignore
//! let options = SchemaOptions::new(auction)
//!     .exclude(["id", "category"])
//!     .depth(1)
//!     .skip_registry(true);
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::model::{Model, ModelCatalog};
use crate::registry::SchemaRegistry;

/// Option value selecting every field.
pub const ALL_FIELDS: &str = "__all__";

/// A set of field names, or every field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// Every field of the model.
    All,
    /// The named fields.
    Names(Vec<String>),
}

impl FieldSelection {
    /// Select the named fields.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Names(names.into_iter().map(Into::into).collect())
    }

    /// Select nothing.
    #[must_use]
    pub const fn none() -> Self {
        FieldSelection::Names(Vec::new())
    }

    /// True if no field is named and not every field is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldSelection::Names(names) if names.is_empty())
    }

    fn from_json(key: &str, value: &Json) -> Result<Option<Self>> {
        match value {
            Json::Null => Ok(None),
            Json::String(s) if s == ALL_FIELDS => Ok(Some(FieldSelection::All)),
            Json::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        Error::config(format!("'{key}' must list field names as strings"))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(|names| Some(FieldSelection::Names(names))),
            _ => Err(Error::config(format!(
                "'{key}' must be \"{ALL_FIELDS}\" or a list of field names"
            ))),
        }
    }
}

/// Options declared for one model schema.
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    /// Source model. Required.
    pub model: Option<Model>,
    /// Fields to include; [`FieldSelection::All`] (the default) includes every field.
    pub include: FieldSelection,
    /// Fields to exclude. Mutually exclusive with a non-empty `include`.
    pub exclude: Vec<String>,
    /// Fields forced optional.
    pub optional: FieldSelection,
    /// Levels of relations expanded into nested schemas.
    pub depth: u32,
    /// Registry to use instead of the global one.
    pub registry: Option<Arc<SchemaRegistry>>,
    /// Build nested schemas without reading or writing the registry.
    pub skip_registry: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            model: None,
            include: FieldSelection::All,
            exclude: Vec::new(),
            optional: FieldSelection::none(),
            depth: 0,
            registry: None,
            skip_registry: false,
        }
    }
}

impl SchemaOptions {
    /// Options for `model` with every other setting at its default.
    pub fn new(model: Model) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    /// Set the source model.
    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Include only the named fields.
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = FieldSelection::names(names);
        self
    }

    /// Include every field.
    pub fn include_all(mut self) -> Self {
        self.include = FieldSelection::All;
        self
    }

    /// Exclude the named fields.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Force the named fields optional.
    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional = FieldSelection::names(names);
        self
    }

    /// Force every field optional.
    pub fn optional_all(mut self) -> Self {
        self.optional = FieldSelection::All;
        self
    }

    /// Set the relation expansion depth.
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Use `registry` instead of the global registry.
    pub fn registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the skip-registry flag.
    pub fn skip_registry(mut self, skip: bool) -> Self {
        self.skip_registry = skip;
        self
    }

    /// The registry these options resolve to.
    pub fn effective_registry(&self) -> Arc<SchemaRegistry> {
        self.registry.clone().unwrap_or_else(SchemaRegistry::global)
    }

    /// Parse options from a JSON object.
    ///
    /// Recognized keys are `model` (a model name in `catalog`), `include`,
    /// `exclude`, `optional`, `depth` and `skip_registry`. Other keys are
    /// ignored, so a misspelt `model` surfaces later as a missing model.
    pub fn from_json(value: &Json, catalog: &ModelCatalog) -> Result<Self> {
        let Json::Object(map) = value else {
            return Err(Error::config("schema options must be a JSON object"));
        };
        let mut options = Self::default();

        if let Some(model) = map.get("model") {
            let name = model
                .as_str()
                .ok_or_else(|| Error::config("'model' must be a model name"))?;
            let model = catalog.model(name).ok_or_else(|| {
                Error::config(format!(
                    "'{name}' is not a registered model (is `model` a valid model?)"
                ))
            })?;
            options.model = Some(model);
        }
        if let Some(include) = map.get("include") {
            options.include = FieldSelection::from_json("include", include)?.unwrap_or(FieldSelection::All);
        }
        if let Some(exclude) = map.get("exclude") {
            options.exclude = match FieldSelection::from_json("exclude", exclude)? {
                None => Vec::new(),
                Some(FieldSelection::Names(names)) => names,
                Some(FieldSelection::All) => {
                    return Err(Error::config("'exclude' must be a list of field names"));
                }
            };
        }
        if let Some(optional) = map.get("optional") {
            options.optional = FieldSelection::from_json("optional", optional)?.unwrap_or_else(FieldSelection::none);
        }
        if let Some(depth) = map.get("depth") {
            options.depth = depth
                .as_u64()
                .and_then(|d| u32::try_from(d).ok())
                .ok_or_else(|| Error::config("'depth' must be a non-negative integer"))?;
        }
        if let Some(skip) = map.get("skip_registry") {
            options.skip_registry = skip
                .as_bool()
                .ok_or_else(|| Error::config("'skip_registry' must be a boolean"))?;
        }
        Ok(options)
    }
}

/// Fields forced optional by a resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionalFields {
    /// Every field.
    All,
    /// The named fields.
    Names(BTreeSet<String>),
}

/// Resolved configuration of one generated model schema.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    /// Name of the generated schema.
    pub schema_name: String,
    /// Source model.
    pub model: Model,
    /// Included fields; empty means every field.
    pub include: BTreeSet<String>,
    /// Excluded fields.
    pub exclude: BTreeSet<String>,
    /// Fields forced optional.
    pub optional: OptionalFields,
    /// Relation expansion depth.
    pub depth: u32,
    /// Whether nested schemas bypass the registry.
    pub skip_registry: bool,
    registry: Weak<SchemaRegistry>,
}

impl SchemaConfig {
    /// A configuration including every field of `model`, nothing optional.
    pub fn new(schema_name: impl Into<String>, model: Model, registry: &Arc<SchemaRegistry>) -> Self {
        Self {
            schema_name: schema_name.into(),
            model,
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
            optional: OptionalFields::Names(BTreeSet::new()),
            depth: 0,
            skip_registry: false,
            registry: Arc::downgrade(registry),
        }
    }

    /// The registry this schema was configured with, while it is alive.
    pub fn registry(&self) -> Option<Arc<SchemaRegistry>> {
        self.registry.upgrade()
    }

    /// True if `name` passes the include and exclude sets.
    #[must_use]
    pub fn is_included(&self, name: &str) -> bool {
        (self.include.is_empty() || self.include.contains(name)) && !self.exclude.contains(name)
    }

    /// True if `name` is forced optional.
    #[must_use]
    pub fn is_optional(&self, name: &str) -> bool {
        match &self.optional {
            OptionalFields::All => true,
            OptionalFields::Names(names) => names.contains(name),
        }
    }
}

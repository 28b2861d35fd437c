//! Validation of declared schema options.

use std::collections::{BTreeSet, HashSet};

use ormschema_core::config::{FieldSelection, OptionalFields, SchemaConfig, SchemaOptions};
use ormschema_core::error::{Error, Result};
use ormschema_core::model::{FieldDescriptor, Model};

/// Fields of `model` a schema may select: everything except reverse relations.
pub fn candidate_fields(model: &Model) -> impl Iterator<Item = &FieldDescriptor> {
    model.fields(false)
}

/// Turn declared options into a resolved [`SchemaConfig`].
///
/// # Errors
///
/// Returns [`Error::Config`] when the model is missing or abstract, when both
/// `include` and `exclude` name fields, or when any of `include`, `exclude`
/// or `optional` names a field the model does not have.
///
/// Unless excluded, explicitly included, or covered by an all-optional
/// setting, the primary key is forced optional so that schemas can describe
/// rows that have not been saved yet.
pub fn resolve(schema_name: &str, options: &SchemaOptions) -> Result<SchemaConfig> {
    let model = options
        .model
        .clone()
        .ok_or_else(|| Error::config("Invalid Configuration. 'model' is required"))?;
    if model.is_abstract() {
        return Err(Error::config(format!(
            "'{}' is an abstract model and cannot back a schema (is `model` a valid model?)",
            model.name()
        )));
    }

    let include: BTreeSet<String> = match &options.include {
        FieldSelection::All => BTreeSet::new(),
        FieldSelection::Names(names) => names.iter().cloned().collect(),
    };
    let exclude: BTreeSet<String> = options.exclude.iter().cloned().collect();
    if !include.is_empty() && !exclude.is_empty() {
        return Err(Error::config(
            "Only one of 'include' or 'exclude' should be set in configuration.",
        ));
    }

    let known: HashSet<&str> = candidate_fields(&model).map(|f| f.name.as_str()).collect();
    let mut optional = match &options.optional {
        FieldSelection::All => OptionalFields::All,
        FieldSelection::Names(names) => OptionalFields::Names(names.iter().cloned().collect()),
    };
    let optional_names: Vec<&String> = match &optional {
        OptionalFields::Names(names) => names.iter().collect(),
        OptionalFields::All => Vec::new(),
    };
    let invalid: BTreeSet<&str> = include
        .iter()
        .chain(&exclude)
        .chain(optional_names)
        .map(String::as_str)
        .filter(|name| !known.contains(name))
        .collect();
    if !invalid.is_empty() {
        let listed: Vec<String> = invalid.iter().map(|name| format!("'{name}'")).collect();
        return Err(Error::config(format!(
            "Field(s) {{{}}} are not in model.",
            listed.join(", ")
        )));
    }

    let pk = model.pk().name.clone();
    if let OptionalFields::Names(names) = &mut optional {
        if !include.contains(&pk) && !exclude.contains(&pk) {
            names.insert(pk);
        }
    }

    let registry = options.effective_registry();
    let mut config = SchemaConfig::new(schema_name, model, &registry);
    config.include = include;
    config.exclude = exclude;
    config.optional = optional;
    config.depth = options.depth;
    config.skip_registry = options.skip_registry;
    tracing::debug!(
        schema = schema_name,
        model = %config.model,
        depth = config.depth,
        "Resolved schema configuration"
    );
    Ok(config)
}

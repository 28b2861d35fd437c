//! Schema declarations and their synthesis into [`SchemaType`]s.
//!
//! A [`SchemaDecl`] is what a user writes: a name, optional parent schemas,
//! optional model options, explicit field annotations, bare default values,
//! validators and class variables. [`SchemaDecl::build`] merges all of that
//! with the fields derived from the source model.
//!
//! Precedence for one field name, highest first:
//!
//! 1. an explicit annotation (with or without a default) on this declaration
//! 2. the field derived from the model, forced optional if configured
//! 3. a field inherited from a parent schema
//!
//! A bare value without annotation only replaces the default of an existing
//! field, and fails with [`Error::TypeConflict`] if it would change the type.
//!
//! # Example
//!
//! ```ignore
//! let schema = SchemaDecl::new("AuctionSchema")
//!     .options(SchemaOptions::new(auction).exclude(["category"]))
//!     .annotate("notes", FieldType::Str.optional())
//!     .build()?;
//! ```

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use ormschema_core::config::{SchemaConfig, SchemaOptions};
use ormschema_core::error::{Error, Result};
use ormschema_core::field::{DefaultValue, FieldInfo, FieldType, SchemaField};
use ormschema_core::identifiers::{ROOT_KEY, is_valid_field};
use ormschema_core::schema::{ALL_FIELDS_VALIDATOR, RootValidator, SchemaType, SchemaTypeBuilder, Validator};
use ormschema_core::value::Value;

use crate::relation::{RelationContext, map_model_field};
use crate::resolver::{candidate_fields, resolve};

#[derive(Debug, Clone)]
struct Annotation {
    name: String,
    ty: FieldType,
    info: Option<FieldInfo>,
}

impl Annotation {
    fn into_field(self) -> SchemaField {
        let info = match self.info {
            Some(info) => info,
            None if self.ty.allows_none() => FieldInfo::new().default_value(Value::Null),
            None => FieldInfo::new(),
        };
        SchemaField::new(self.name, self.ty, info)
    }
}

/// Declaration of one schema, turned into a [`SchemaType`] by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct SchemaDecl {
    name: String,
    bases: Vec<Arc<SchemaType>>,
    options: Option<SchemaOptions>,
    annotations: Vec<Annotation>,
    values: Vec<(String, Value)>,
    validators: Vec<Validator>,
    root_validators: Vec<RootValidator>,
    class_vars: Vec<(String, Value)>,
}

impl SchemaDecl {
    /// Start a declaration named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            options: None,
            annotations: Vec::new(),
            values: Vec::new(),
            validators: Vec::new(),
            root_validators: Vec::new(),
            class_vars: Vec::new(),
        }
    }

    /// Inherit fields, validators and class variables from `base`.
    ///
    /// With several bases, earlier ones take precedence over later ones.
    #[must_use]
    pub fn base(mut self, base: Arc<SchemaType>) -> Self {
        self.bases.push(base);
        self
    }

    /// Derive fields from a model. Without options the schema is a plain one.
    #[must_use]
    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Annotate a field with a type only.
    ///
    /// The field is required unless the type accepts null.
    #[must_use]
    pub fn annotate(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.annotations.push(Annotation {
            name: name.into(),
            ty,
            info: None,
        });
        self
    }

    /// Annotate a field with a type and a literal default.
    #[must_use]
    pub fn annotate_default(self, name: impl Into<String>, ty: FieldType, value: impl Into<Value>) -> Self {
        self.declare(name, ty, FieldInfo::new().default_value(value))
    }

    /// Annotate a field with a type and full metadata.
    #[must_use]
    pub fn declare(mut self, name: impl Into<String>, ty: FieldType, info: FieldInfo) -> Self {
        self.annotations.push(Annotation {
            name: name.into(),
            ty,
            info: Some(info),
        });
        self
    }

    /// Give a field a new default without annotating its type.
    ///
    /// The type is inferred from the value. An existing field keeps its type
    /// as long as the value agrees with it.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    /// Attach a field validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Attach a root validator.
    #[must_use]
    pub fn root_validator(mut self, validator: RootValidator) -> Self {
        self.root_validators.push(validator);
        self
    }

    /// Declare a class variable: readable on the type, never a field.
    #[must_use]
    pub fn class_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.class_vars.push((name.into(), value.into()));
        self
    }

    /// Synthesize the schema type.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for invalid options, or validators naming fields the
    ///   schema does not have (unless they opt out with `check_fields`)
    /// - [`Error::TypeConflict`] when a bare value changes a field's type
    /// - [`Error::InvalidRoot`] when `__root__` is combined with other fields
    /// - [`Error::UnsupportedFieldKind`] when a model field has no mapping
    pub fn build(self) -> Result<Arc<SchemaType>> {
        let mut state = Inherited::from_bases(&self.bases);
        let class_var_names: HashSet<String> = state
            .class_vars
            .iter()
            .chain(&self.class_vars)
            .map(|(name, _)| name.clone())
            .collect();

        let config = match &self.options {
            Some(options) => Some(resolve(&self.name, options)?),
            None => state.config.take(),
        };

        let annotated: HashSet<&str> = self.annotations.iter().map(|a| a.name.as_str()).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut declared: Vec<SchemaField> = Vec::new();

        if let (Some(options), Some(config)) = (&self.options, &config) {
            let ctx = RelationContext::new(config.depth, options.effective_registry(), config.skip_registry);
            for field in candidate_fields(&config.model) {
                if !is_valid_field(&field.name) {
                    tracing::debug!(
                        schema = %self.name,
                        field = %field.name,
                        "Fields may not start with an underscore, ignoring"
                    );
                    continue;
                }
                if seen.contains(&field.name) || !(config.is_included(&field.name) || annotated.contains(field.name.as_str())) {
                    continue;
                }
                seen.insert(field.name.clone());

                if let Some(annotation) = self.annotations.iter().find(|a| a.name == field.name) {
                    declared.push(annotation.clone().into_field());
                    continue;
                }
                let (ty, mut info) = map_model_field(&config.model, field, &ctx)?;
                if config.is_optional(&field.name) {
                    info = info.with_default(DefaultValue::Value(Value::Null));
                }
                declared.push(SchemaField::new(field.name.clone(), ty, info));
            }
        }

        for annotation in &self.annotations {
            if seen.contains(&annotation.name) || class_var_names.contains(&annotation.name) {
                continue;
            }
            if !is_valid_field(&annotation.name) {
                tracing::debug!(
                    schema = %self.name,
                    field = %annotation.name,
                    "Fields may not start with an underscore, ignoring"
                );
                continue;
            }
            seen.insert(annotation.name.clone());
            declared.push(annotation.clone().into_field());
        }

        let mut fields = state.fields;
        for field in declared {
            upsert(&mut fields, field);
        }

        for (name, value) in &self.values {
            if !is_valid_field(name) || class_var_names.contains(name) {
                continue;
            }
            let field = match fields.iter().find(|f| &f.name == name) {
                Some(existing) => {
                    if !value.is_null() && FieldType::infer(value) != *existing.ty.non_optional() {
                        return Err(Error::TypeConflict {
                            schema: self.name.clone(),
                            field: name.clone(),
                        });
                    }
                    SchemaField::new(
                        name.clone(),
                        existing.ty.clone(),
                        existing.info.clone().with_default(DefaultValue::Value(value.clone())),
                    )
                }
                None => SchemaField::new(
                    name.clone(),
                    FieldType::infer(value),
                    FieldInfo::new().default_value(value.clone()),
                ),
            };
            upsert(&mut fields, field);
        }

        let mut validators = state.validators;
        for validator in self.validators {
            match validators.iter().position(|v| v.name() == validator.name()) {
                Some(index) => validators[index] = validator,
                None => validators.push(validator),
            }
        }
        check_validators(&validators, &fields)?;

        let mut root_validators = state.root_validators;
        for validator in self.root_validators {
            match root_validators.iter().position(|v| v.name() == validator.name()) {
                Some(index) => root_validators[index] = validator,
                None => root_validators.push(validator),
            }
        }

        if fields.len() > 1 && fields.iter().any(|f| f.name == ROOT_KEY) {
            return Err(Error::InvalidRoot(format!(
                "{ROOT_KEY} cannot be mixed with other fields"
            )));
        }

        let mut class_vars = state.class_vars;
        for (name, value) in self.class_vars {
            match class_vars.iter().position(|(n, _)| *n == name) {
                Some(index) => class_vars[index].1 = value,
                None => class_vars.push((name, value)),
            }
        }

        let mut builder = SchemaTypeBuilder::new(&self.name)
            .fields(fields)
            .validators(validators)
            .root_validators(root_validators);
        for (name, value) in class_vars {
            builder = builder.class_var(name, value);
        }
        if let Some(config) = config {
            builder = builder.config(config);
        }
        let schema = builder.build();
        tracing::debug!(
            schema = schema.name(),
            model = ?schema.model().map(|m| m.name().to_string()),
            fields = schema.fields().len(),
            "Synthesized schema"
        );
        Ok(schema)
    }
}

/// State merged from parent schemas.
#[derive(Default)]
struct Inherited {
    fields: Vec<SchemaField>,
    validators: Vec<Validator>,
    root_validators: Vec<RootValidator>,
    class_vars: Vec<(String, Value)>,
    config: Option<SchemaConfig>,
}

impl Inherited {
    fn from_bases(bases: &[Arc<SchemaType>]) -> Self {
        let mut state = Self::default();
        // Later bases first so earlier ones overwrite them.
        for base in bases.iter().rev() {
            for field in base.fields() {
                upsert(&mut state.fields, field.clone());
            }
            for validator in base.validators() {
                match state.validators.iter().position(|v| v.name() == validator.name()) {
                    Some(index) => state.validators[index] = validator.clone(),
                    None => state.validators.push(validator.clone()),
                }
            }
            for validator in base.pre_root_validators().iter().chain(base.post_root_validators()) {
                match state.root_validators.iter().position(|v| v.name() == validator.name()) {
                    Some(index) => state.root_validators[index] = validator.clone(),
                    None => state.root_validators.push(validator.clone()),
                }
            }
            for (name, value) in base.class_vars() {
                match state.class_vars.iter().position(|(n, _)| n == name) {
                    Some(index) => state.class_vars[index].1 = value.clone(),
                    None => state.class_vars.push((name.clone(), value.clone())),
                }
            }
            if let Some(config) = base.config() {
                state.config = Some(config.clone());
            }
        }
        state
    }
}

fn upsert(fields: &mut Vec<SchemaField>, field: SchemaField) {
    match fields.iter().position(|f| f.name == field.name) {
        Some(index) => fields[index] = field,
        None => fields.push(field),
    }
}

fn check_validators(validators: &[Validator], fields: &[SchemaField]) -> Result<()> {
    let names: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    let unused: BTreeSet<&str> = validators
        .iter()
        .filter(|v| v.check_fields)
        .filter(|v| {
            v.fields()
                .iter()
                .any(|f| f != ALL_FIELDS_VALIDATOR && !names.contains(f.as_str()))
        })
        .map(Validator::name)
        .collect();
    if unused.is_empty() {
        return Ok(());
    }
    let listed: Vec<&str> = unused.into_iter().collect();
    Err(Error::config(format!(
        "Validators defined with incorrect fields: {} \
         (use check_fields=false if you're inheriting from the model and intended this)",
        listed.join(", ")
    )))
}

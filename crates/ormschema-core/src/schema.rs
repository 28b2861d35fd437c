//! Generated schema types and their instances.
//!
//! A [`SchemaType`] is the output of synthesis: an ordered set of typed
//! fields plus the validators bound to them. It is immutable once built and
//! shared behind an `Arc`, so instances can be validated from any thread.
//!
//! Validation of one input follows these steps:
//!
//! 1. pre root validators see the raw input map
//! 2. each field reads its value by alias, then by name
//! 3. a missing value takes the default, or records a `field required` error
//! 4. pre validators, null handling, type coercion, `max_length`, post validators
//! 5. post root validators see the validated values
//!
//! Every failure is collected; the input is rejected with all of them at once.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::config::SchemaConfig;
use crate::error::{Error, FieldError, Result, ValidationErrorKind, ValidationErrors};
use crate::field::{DefaultValue, FieldType, SchemaField};
use crate::fields_set::FieldsSet;
use crate::identifiers::ROOT_KEY;
use crate::instance::{Attribute, ModelInstance};
use crate::model::Model;
use crate::validate::{CoerceResult, check_max_length, coerce};
use crate::value::Value;

/// Values already validated, handed to field validators.
#[derive(Debug)]
pub struct ValidationInfo<'a> {
    /// Field being validated.
    pub field: &'a str,
    /// Fields validated before this one, by name.
    pub values: &'a BTreeMap<String, Value>,
}

/// Field validator callback.
pub type ValidatorFn =
    Arc<dyn Fn(Value, &ValidationInfo<'_>) -> std::result::Result<Value, String> + Send + Sync>;

/// Root validator callback.
pub type RootValidatorFn = Arc<
    dyn Fn(BTreeMap<String, Value>) -> std::result::Result<BTreeMap<String, Value>, String>
        + Send
        + Sync,
>;

/// Field name that binds a validator to every field.
pub const ALL_FIELDS_VALIDATOR: &str = "*";

/// A validator bound to one or more fields.
#[derive(Clone)]
pub struct Validator {
    name: String,
    fields: Vec<String>,
    func: ValidatorFn,
    /// Run before type coercion.
    pub pre: bool,
    /// Run on each element of a list instead of the list.
    pub each_item: bool,
    /// Also run when the value falls back to the default.
    pub always: bool,
    /// Fail synthesis if a target field does not exist.
    pub check_fields: bool,
}

impl Validator {
    /// Create a validator named `name` for `fields`.
    ///
    /// Fails with a configuration error when no field is given.
    pub fn new<I, S, F>(name: impl Into<String>, fields: I, func: F) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Value, &ValidationInfo<'_>) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(Error::config("validator with no fields specified"));
        }
        Ok(Self {
            name: name.into(),
            fields,
            func: Arc::new(func),
            pre: false,
            each_item: false,
            always: false,
            check_fields: true,
        })
    }

    /// Set the `pre` flag.
    pub fn pre(mut self, pre: bool) -> Self {
        self.pre = pre;
        self
    }

    /// Set the `each_item` flag.
    pub fn each_item(mut self, each_item: bool) -> Self {
        self.each_item = each_item;
        self
    }

    /// Set the `always` flag.
    pub fn always(mut self, always: bool) -> Self {
        self.always = always;
        self
    }

    /// Set the `check_fields` flag.
    pub fn check_fields(mut self, check: bool) -> Self {
        self.check_fields = check;
        self
    }

    /// Validator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target field names.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// True if the validator runs for `field`.
    #[must_use]
    pub fn applies_to(&self, field: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f == ALL_FIELDS_VALIDATOR || f == field)
    }

    fn call(&self, value: Value, info: &ValidationInfo<'_>) -> CoerceResult {
        (self.func)(value, info).map_err(|message| vec![FieldError::bare(ValidationErrorKind::Custom, message)])
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("pre", &self.pre)
            .field("each_item", &self.each_item)
            .field("always", &self.always)
            .field("check_fields", &self.check_fields)
            .finish_non_exhaustive()
    }
}

/// A validator over the whole value map.
#[derive(Clone)]
pub struct RootValidator {
    name: String,
    func: RootValidatorFn,
    /// Run on the raw input instead of the validated values.
    pub pre: bool,
    /// Skip when field validation already failed.
    pub skip_on_failure: bool,
}

impl RootValidator {
    /// Create a post root validator.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(BTreeMap<String, Value>) -> std::result::Result<BTreeMap<String, Value>, String>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            pre: false,
            skip_on_failure: false,
        }
    }

    /// Set the `pre` flag.
    pub fn pre(mut self, pre: bool) -> Self {
        self.pre = pre;
        self
    }

    /// Set the `skip_on_failure` flag.
    pub fn skip_on_failure(mut self, skip: bool) -> Self {
        self.skip_on_failure = skip;
        self
    }

    /// Validator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, values: BTreeMap<String, Value>) -> std::result::Result<BTreeMap<String, Value>, String> {
        (self.func)(values)
    }
}

impl fmt::Debug for RootValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootValidator")
            .field("name", &self.name)
            .field("pre", &self.pre)
            .field("skip_on_failure", &self.skip_on_failure)
            .finish_non_exhaustive()
    }
}

/// A generated schema type.
pub struct SchemaType {
    name: String,
    fields: Vec<SchemaField>,
    validators: Vec<Validator>,
    pre_root_validators: Vec<RootValidator>,
    post_root_validators: Vec<RootValidator>,
    class_vars: Vec<(String, Value)>,
    config: Option<SchemaConfig>,
    signature: String,
}

impl SchemaType {
    /// Schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in order.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Names of the fields the input must provide.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.name.as_str())
    }

    /// Field validators, inherited ones first.
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Validators that run for `field`, in order.
    ///
    /// When several validators share a name, the last one declared takes the
    /// position of the first.
    pub fn validators_for(&self, field: &str) -> Vec<&Validator> {
        let mut out: Vec<&Validator> = Vec::new();
        for validator in self.validators.iter().filter(|v| v.applies_to(field)) {
            match out.iter_mut().find(|v| v.name == validator.name) {
                Some(slot) => *slot = validator,
                None => out.push(validator),
            }
        }
        out
    }

    /// Root validators run before field validation.
    #[must_use]
    pub fn pre_root_validators(&self) -> &[RootValidator] {
        &self.pre_root_validators
    }

    /// Root validators run after field validation.
    #[must_use]
    pub fn post_root_validators(&self) -> &[RootValidator] {
        &self.post_root_validators
    }

    /// Class variables; never fields.
    #[must_use]
    pub fn class_vars(&self) -> &[(String, Value)] {
        &self.class_vars
    }

    /// Look up a class variable.
    #[must_use]
    pub fn class_var(&self, name: &str) -> Option<&Value> {
        self.class_vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Configuration this schema was generated from; `None` for plain schemas.
    #[must_use]
    pub fn config(&self) -> Option<&SchemaConfig> {
        self.config.as_ref()
    }

    /// Source model of a model schema.
    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        self.config.as_ref().map(|c| &c.model)
    }

    /// Rendered keyword-only constructor signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// True if the schema wraps a single root value.
    #[must_use]
    pub fn is_custom_root(&self) -> bool {
        self.fields.iter().any(|f| f.name == ROOT_KEY)
    }

    /// Validate keyword-style values into an instance.
    ///
    /// Keys may be field names or aliases.
    pub fn construct<I, K, V>(self: &Arc<Self>, values: I) -> Result<SchemaInstance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let entries = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Ok(self.validate_entries(entries)?)
    }

    /// Validate a mapping value (or a root value for custom-root schemas).
    pub fn validate_value(self: &Arc<Self>, value: Value) -> Result<SchemaInstance> {
        let entries = match value {
            Value::Map(map) if !self.is_custom_root() || map.contains_key(ROOT_KEY) => {
                map.into_iter().collect()
            }
            Value::Record(record) if !self.is_custom_root() => record.entries(),
            value if self.is_custom_root() => vec![(ROOT_KEY.to_string(), value)],
            _ => {
                let mut errors = ValidationErrors::new(&self.name);
                errors.push(FieldError::new(
                    ROOT_KEY,
                    ValidationErrorKind::Type,
                    "value is not a valid dict",
                ));
                return Err(Error::Validation(errors));
            }
        };
        Ok(self.validate_entries(entries)?)
    }

    /// Parse and validate a JSON document.
    pub fn validate_json(self: &Arc<Self>, text: &str) -> Result<SchemaInstance> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        self.validate_value(Value::from_json(&json))
    }

    /// Build an instance from a model instance's attributes.
    ///
    /// Each field reads the attribute named by its alias, then by its name.
    /// Methods are invoked, related objects become nested instances (or their
    /// primary key when the field is not a nested schema), managers are read
    /// in full and files become their URL.
    pub fn from_object(self: &Arc<Self>, object: &dyn ModelInstance) -> Result<SchemaInstance> {
        Ok(self.validate_object(object)?)
    }

    fn validate_object(self: &Arc<Self>, object: &dyn ModelInstance) -> std::result::Result<SchemaInstance, ValidationErrors> {
        let mut entries = Vec::with_capacity(self.fields.len());
        let mut errors = ValidationErrors::new(&self.name);
        for field in &self.fields {
            let attr = field
                .info
                .alias
                .as_deref()
                .and_then(|alias| object.attr(alias))
                .or_else(|| object.attr(&field.name));
            let Some(attr) = attr else {
                continue;
            };
            match attribute_value(attr, &field.ty) {
                Ok(value) => entries.push((field.name.clone(), value)),
                Err(errs) => {
                    let loc = field.output_name(true);
                    for e in errs {
                        errors.push(e.within(loc));
                    }
                }
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        self.validate_entries(entries)
    }

    /// Validate name/alias keyed entries into an instance.
    ///
    /// Keys that match no field are ignored.
    pub fn validate_entries(
        self: &Arc<Self>,
        entries: Vec<(String, Value)>,
    ) -> std::result::Result<SchemaInstance, ValidationErrors> {
        let mut input: BTreeMap<String, Value> = entries.into_iter().collect();
        let mut errors = ValidationErrors::new(&self.name);

        for root in &self.pre_root_validators {
            match root.call(input.clone()) {
                Ok(next) => input = next,
                Err(message) => {
                    errors.push(FieldError::new(ROOT_KEY, ValidationErrorKind::Custom, message));
                    return Err(errors);
                }
            }
        }

        let mut values: BTreeMap<String, Value> = BTreeMap::new();
        let mut fields_set = FieldsSet::empty(self.fields.len());

        for (idx, field) in self.fields.iter().enumerate() {
            let loc = field.output_name(true);
            let validators = self.validators_for(&field.name);
            let raw = field
                .info
                .alias
                .as_ref()
                .and_then(|alias| input.remove(alias))
                .or_else(|| input.remove(&field.name));

            let value = match raw {
                Some(value) => {
                    fields_set.insert(idx);
                    value
                }
                None => match field.info.default.get() {
                    None => {
                        errors.push(FieldError::new(loc, ValidationErrorKind::Missing, "field required"));
                        continue;
                    }
                    Some(default) if !validators.iter().any(|v| v.always) => {
                        values.insert(field.name.clone(), default);
                        continue;
                    }
                    Some(default) => default,
                },
            };

            match validate_field(field, value, &validators, &values) {
                Ok(value) => {
                    values.insert(field.name.clone(), value);
                }
                Err(errs) => {
                    for e in errs {
                        errors.push(e.within(loc));
                    }
                }
            }
        }

        for root in &self.post_root_validators {
            if root.skip_on_failure && !errors.is_empty() {
                continue;
            }
            match root.call(values.clone()) {
                Ok(next) => values = next,
                Err(message) => {
                    errors.push(FieldError::new(ROOT_KEY, ValidationErrorKind::Custom, message));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        let values = self
            .fields
            .iter()
            .map(|f| values.remove(&f.name).unwrap_or_default())
            .collect();
        Ok(SchemaInstance {
            schema: Arc::clone(self),
            values,
            fields_set,
        })
    }
}

fn validate_field(
    field: &SchemaField,
    value: Value,
    validators: &[&Validator],
    values: &BTreeMap<String, Value>,
) -> CoerceResult {
    let info = ValidationInfo {
        field: &field.name,
        values,
    };
    let mut value = value;
    for validator in validators.iter().filter(|v| v.pre) {
        value = validator.call(value, &info)?;
    }

    if value.is_null() {
        if field.allows_none() {
            return Ok(Value::Null);
        }
        return Err(vec![FieldError::bare(
            ValidationErrorKind::NoneNotAllowed,
            "none is not an allowed value",
        )]);
    }

    value = coerce(&field.ty, value)?;
    if let Some(max_length) = field.info.max_length {
        check_max_length(&value, max_length).map_err(|e| vec![e])?;
    }

    for validator in validators.iter().filter(|v| !v.pre) {
        value = match value {
            Value::List(items) if validator.each_item => {
                let mut out = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (idx, item) in items.into_iter().enumerate() {
                    match validator.call(item, &info) {
                        Ok(v) => out.push(v),
                        Err(errs) => errors.extend(errs.into_iter().map(|e| e.within(idx.to_string()))),
                    }
                }
                if !errors.is_empty() {
                    return Err(errors);
                }
                Value::List(out)
            }
            value => validator.call(value, &info)?,
        };
    }
    Ok(value)
}

fn attribute_value(attr: Attribute<'_>, ty: &FieldType) -> CoerceResult {
    match attr {
        Attribute::Value(value) => Ok(value),
        Attribute::File(url) => Ok(url.map_or(Value::Null, Value::Text)),
        Attribute::Callable(method) => Ok(method()),
        Attribute::Object(object) => object_value(object, ty),
        Attribute::Manager(objects) => {
            let item_ty = match ty.non_optional() {
                FieldType::List(inner) => inner.as_ref(),
                other => other,
            };
            let mut items = Vec::with_capacity(objects.len());
            let mut errors = Vec::new();
            for (idx, object) in objects.into_iter().enumerate() {
                match object_value(object, item_ty) {
                    Ok(v) => items.push(v),
                    Err(errs) => errors.extend(errs.into_iter().map(|e| e.within(idx.to_string()))),
                }
            }
            if errors.is_empty() {
                Ok(Value::List(items))
            } else {
                Err(errors)
            }
        }
    }
}

fn object_value(object: &dyn ModelInstance, ty: &FieldType) -> CoerceResult {
    match ty.non_optional() {
        FieldType::Schema(schema) => schema
            .validate_object(object)
            .map(|instance| Value::Record(Box::new(instance)))
            .map_err(|e| e.errors),
        _ => Ok(object.pk()),
    }
}

impl fmt::Debug for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("validators", &self.validators)
            .field("model", &self.model())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.signature)
    }
}

/// Builder for [`SchemaType`].
#[derive(Debug, Default)]
pub struct SchemaTypeBuilder {
    name: String,
    fields: Vec<SchemaField>,
    validators: Vec<Validator>,
    pre_root_validators: Vec<RootValidator>,
    post_root_validators: Vec<RootValidator>,
    class_vars: Vec<(String, Value)>,
    config: Option<SchemaConfig>,
}

impl SchemaTypeBuilder {
    /// Start a schema named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a field.
    pub fn field(mut self, field: SchemaField) -> Self {
        self.fields.push(field);
        self
    }

    /// Append fields.
    pub fn fields(mut self, fields: impl IntoIterator<Item = SchemaField>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Append a field validator.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Append field validators.
    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }

    /// Append a root validator; its `pre` flag picks the phase.
    pub fn root_validator(mut self, validator: RootValidator) -> Self {
        if validator.pre {
            self.pre_root_validators.push(validator);
        } else {
            self.post_root_validators.push(validator);
        }
        self
    }

    /// Append root validators.
    pub fn root_validators(self, validators: impl IntoIterator<Item = RootValidator>) -> Self {
        validators.into_iter().fold(self, Self::root_validator)
    }

    /// Add a class variable.
    pub fn class_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.class_vars.push((name.into(), value.into()));
        self
    }

    /// Attach the model configuration.
    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Finish the schema.
    pub fn build(self) -> Arc<SchemaType> {
        let signature = render_signature(&self.fields);
        Arc::new(SchemaType {
            name: self.name,
            fields: self.fields,
            validators: self.validators,
            pre_root_validators: self.pre_root_validators,
            post_root_validators: self.post_root_validators,
            class_vars: self.class_vars,
            config: self.config,
            signature,
        })
    }
}

fn render_signature(fields: &[SchemaField]) -> String {
    let mut seen = HashSet::new();
    let params: Vec<String> = fields
        .iter()
        .filter_map(|field| {
            let name = field.output_name(true);
            if !seen.insert(name.to_string()) {
                return None;
            }
            Some(match &field.info.default {
                DefaultValue::Required => format!("{name}: {}", field.ty),
                DefaultValue::Value(v) => format!("{name}: {} = {}", field.ty, v.repr()),
                DefaultValue::Factory(_) => format!("{name}: {} = <factory>", field.ty),
            })
        })
        .collect();
    if params.is_empty() {
        "()".to_string()
    } else {
        format!("(*, {})", params.join(", "))
    }
}

/// Options controlling [`SchemaInstance::dump`].
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Key fields by alias where one exists.
    pub by_alias: bool,
    /// Drop fields that were not explicitly provided.
    pub exclude_unset: bool,
    /// Drop fields equal to their literal default.
    pub exclude_defaults: bool,
    /// Drop null fields.
    pub exclude_none: bool,
    /// Keep only these fields (by name).
    pub include: Option<HashSet<String>>,
    /// Drop these fields (by name).
    pub exclude: HashSet<String>,
}

impl DumpOptions {
    /// Default options: every field, keyed by name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key fields by alias.
    pub fn by_alias(mut self) -> Self {
        self.by_alias = true;
        self
    }

    /// Drop unset fields.
    pub fn exclude_unset(mut self) -> Self {
        self.exclude_unset = true;
        self
    }

    /// Drop fields equal to their default.
    pub fn exclude_defaults(mut self) -> Self {
        self.exclude_defaults = true;
        self
    }

    /// Drop null fields.
    pub fn exclude_none(mut self) -> Self {
        self.exclude_none = true;
        self
    }

    /// Keep only the named fields.
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Drop the named fields.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Options passed down to nested instances: field selections do not apply there.
    fn nested(&self) -> Self {
        Self {
            include: None,
            exclude: HashSet::new(),
            ..self.clone()
        }
    }
}

/// A validated instance of a [`SchemaType`].
#[derive(Clone)]
pub struct SchemaInstance {
    schema: Arc<SchemaType>,
    values: Vec<Value>,
    fields_set: FieldsSet,
}

impl SchemaInstance {
    /// The instance's schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaType> {
        &self.schema
    }

    /// Read a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.field_index(name).map(|idx| &self.values[idx])
    }

    /// Assign a field, validating the new value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let Some(idx) = self.schema.field_index(name) else {
            return Err(Error::Attribute {
                model: self.schema.name.clone(),
                name: name.to_string(),
            });
        };
        let field = &self.schema.fields[idx];
        let validators = self.schema.validators_for(name);
        let values = self.values_map();
        match validate_field(field, value.into(), &validators, &values) {
            Ok(value) => {
                self.values[idx] = value;
                self.fields_set.insert(idx);
                Ok(())
            }
            Err(errs) => {
                let mut errors = ValidationErrors::new(&self.schema.name);
                for e in errs {
                    errors.push(e.within(name));
                }
                Err(Error::Validation(errors))
            }
        }
    }

    /// Field values keyed by name, in field order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.schema
            .fields
            .iter()
            .zip(&self.values)
            .map(|(f, v)| (f.name.clone(), v.clone()))
            .collect()
    }

    /// Field values keyed by name.
    #[must_use]
    pub fn values_map(&self) -> BTreeMap<String, Value> {
        self.entries().into_iter().collect()
    }

    /// Fields explicitly provided on construction or assigned since.
    #[must_use]
    pub fn fields_set(&self) -> &FieldsSet {
        &self.fields_set
    }

    /// Names of the fields explicitly provided.
    pub fn fields_set_names(&self) -> impl Iterator<Item = &str> {
        self.fields_set
            .iter()
            .map(|idx| self.schema.fields[idx].name.as_str())
    }

    /// Primary key value, when the schema exposes one.
    ///
    /// Model schemas read their model's primary key field; plain schemas
    /// read an `id` or `pk` field.
    #[must_use]
    pub fn pk_value(&self) -> Option<Value> {
        let pk_name = self.schema.model().map(|m| m.pk().name.clone());
        pk_name
            .as_deref()
            .and_then(|name| self.get(name))
            .or_else(|| self.get("id"))
            .or_else(|| self.get("pk"))
            .cloned()
    }

    /// Selected field values as (key, value) pairs.
    #[must_use]
    pub fn dump_values(&self, options: &DumpOptions) -> Vec<(String, Value)> {
        self.schema
            .fields
            .iter()
            .zip(&self.values)
            .enumerate()
            .filter(|(idx, (field, value))| {
                if options
                    .include
                    .as_ref()
                    .is_some_and(|include| !include.contains(&field.name))
                    || options.exclude.contains(&field.name)
                {
                    return false;
                }
                if options.exclude_unset && !self.fields_set.contains(*idx) {
                    return false;
                }
                if options.exclude_none && value.is_null() {
                    return false;
                }
                !(options.exclude_defaults && field.info.default.literal() == Some(*value))
            })
            .map(|(_, (field, value))| (field.output_name(options.by_alias).to_string(), value.clone()))
            .collect()
    }

    /// Dump to a JSON object.
    #[must_use]
    pub fn dump(&self, options: &DumpOptions) -> serde_json::Value {
        let nested = options.nested();
        serde_json::Value::Object(
            self.dump_values(options)
                .into_iter()
                .map(|(key, value)| (key, dump_value(&value, &nested)))
                .collect(),
        )
    }

    /// Encode as JSON text. Custom-root schemas encode their root value.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Copy every field value onto `target`, keyed by field name.
    pub fn apply_to_model<'m, M>(&self, target: &'m mut M) -> Result<&'m mut M>
    where
        M: ModelInstance + ?Sized,
    {
        self.apply_to_model_with(target, &DumpOptions::default())
    }

    /// Copy the fields selected by `options` onto `target`.
    pub fn apply_to_model_with<'m, M>(&self, target: &'m mut M, options: &DumpOptions) -> Result<&'m mut M>
    where
        M: ModelInstance + ?Sized,
    {
        for (name, value) in self.dump_values(options) {
            target.set_attr(&name, value)?;
        }
        tracing::trace!(
            schema = self.schema.name(),
            model = target.model_name(),
            "Applied schema values to model"
        );
        Ok(target)
    }
}

fn dump_value(value: &Value, options: &DumpOptions) -> serde_json::Value {
    match value {
        Value::Record(record) => record.dump(options),
        Value::List(items) => serde_json::Value::Array(items.iter().map(|v| dump_value(v, options)).collect()),
        other => other.to_json(),
    }
}

impl PartialEq for SchemaInstance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

impl fmt::Debug for SchemaInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.schema.name());
        for (field, value) in self.schema.fields.iter().zip(&self.values) {
            out.field(&field.name, value);
        }
        out.finish()
    }
}

impl Serialize for SchemaInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.schema.is_custom_root() {
            let root = self.get(ROOT_KEY).cloned().unwrap_or_default();
            return dump_value(&root, &DumpOptions::default()).serialize(serializer);
        }
        self.dump(&DumpOptions::default()).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldInfo;
    use crate::instance::DynamicInstance;

    fn auction_schema() -> Arc<SchemaType> {
        SchemaTypeBuilder::new("AuctionSchema")
            .field(SchemaField::new(
                "id",
                FieldType::Int,
                FieldInfo::new().default_value(Value::Null),
            ))
            .field(SchemaField::new("title", FieldType::Str, FieldInfo::new().max_length(20)))
            .field(SchemaField::new(
                "category",
                FieldType::Int,
                FieldInfo::new().alias("category_id").default_value(Value::Null),
            ))
            .build()
    }

    #[test]
    fn test_construct_collects_all_errors() {
        let schema = auction_schema();
        let err = schema
            .construct([("id", Value::from("x"))])
            .unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors[0].path(), "id");
        assert_eq!(errors.errors[1].kind, ValidationErrorKind::Missing);
    }

    #[test]
    fn test_alias_and_name_both_accepted() {
        let schema = auction_schema();
        let by_alias = schema.construct([("title", "Lamp"), ("category_id", "3")]).unwrap();
        let by_name = schema
            .construct([("title", Value::from("Lamp")), ("category", Value::Int(3))])
            .unwrap();
        assert_eq!(by_alias, by_name);
        assert_eq!(by_alias.get("category"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_max_length() {
        let schema = auction_schema();
        let err = schema.construct([("title", "a title well past twenty characters")]).unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().errors[0].kind,
            ValidationErrorKind::MaxLength
        );
        assert!(schema.construct([("title", "twenty chars exactly")]).is_ok());
    }

    #[test]
    fn test_dump_options() {
        let schema = auction_schema();
        let instance = schema.construct([("title", "Lamp")]).unwrap();

        assert_eq!(
            instance.dump(&DumpOptions::new()),
            serde_json::json!({"id": null, "title": "Lamp", "category": null})
        );
        assert_eq!(
            instance.dump(&DumpOptions::new().by_alias().exclude_none()),
            serde_json::json!({"title": "Lamp"})
        );
        assert_eq!(
            instance.dump(&DumpOptions::new().exclude_unset()),
            serde_json::json!({"title": "Lamp"})
        );
        assert_eq!(
            instance.dump(&DumpOptions::new().exclude(["id"]).exclude_defaults()),
            serde_json::json!({"title": "Lamp"})
        );
        assert_eq!(instance.fields_set_names().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn test_set_is_validated() {
        let schema = auction_schema();
        let mut instance = schema.construct([("title", "Lamp")]).unwrap();
        instance.set("title", "Desk").unwrap();
        assert_eq!(instance.get("title"), Some(&Value::from("Desk")));
        assert!(instance.set("title", Value::Null).unwrap_err().is_validation());
        assert!(matches!(
            instance.set("colour", "red").unwrap_err(),
            Error::Attribute { .. }
        ));
    }

    #[test]
    fn test_validators_run_in_order() {
        let schema = SchemaTypeBuilder::new("S")
            .field(SchemaField::new("title", FieldType::Str, FieldInfo::new()))
            .field(SchemaField::new("tags", FieldType::Str.list(), FieldInfo::new()))
            .validator(
                Validator::new("strip", ["title"], |v, _| Ok(Value::from(v.to_string().trim().to_string())))
                    .unwrap()
                    .pre(true),
            )
            .validator(
                Validator::new("clean", ["*"], |v, _| match v {
                    Value::Text(s) => Ok(Value::from(format!("{s} - value cleaned"))),
                    other => Ok(other),
                })
                .unwrap()
                .each_item(true),
            )
            .build();

        let instance = schema
            .construct([
                ("title", Value::from("  Lamp ")),
                ("tags", Value::List(vec![Value::from("a")])),
            ])
            .unwrap();
        assert_eq!(instance.get("title"), Some(&Value::from("Lamp - value cleaned")));
        assert_eq!(
            instance.get("tags"),
            Some(&Value::List(vec![Value::from("a - value cleaned")]))
        );
    }

    #[test]
    fn test_validator_requires_fields() {
        let err = Validator::new("v", Vec::<String>::new(), |v, _| Ok(v)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_later_validator_with_same_name_wins() {
        let schema = SchemaTypeBuilder::new("S")
            .field(SchemaField::new("n", FieldType::Int, FieldInfo::new()))
            .validator(Validator::new("check", ["n"], |_, _| Err("base".to_string())).unwrap())
            .validator(Validator::new("check", ["n"], |v, _| Ok(v)).unwrap())
            .build();
        assert_eq!(schema.validators_for("n").len(), 1);
        assert!(schema.construct([("n", 1)]).is_ok());
    }

    #[test]
    fn test_root_validators() {
        let schema = SchemaTypeBuilder::new("Range")
            .field(SchemaField::new("low", FieldType::Int, FieldInfo::new()))
            .field(SchemaField::new("high", FieldType::Int, FieldInfo::new()))
            .root_validator(RootValidator::new("ordered", |values| {
                if values.get("low").and_then(Value::as_i64) > values.get("high").and_then(Value::as_i64) {
                    Err("low must not exceed high".to_string())
                } else {
                    Ok(values)
                }
            }))
            .build();

        assert!(schema.construct([("low", 1), ("high", 2)]).is_ok());
        let err = schema.construct([("low", 3), ("high", 2)]).unwrap_err();
        assert_eq!(err.validation_errors().unwrap().errors[0].path(), ROOT_KEY);
    }

    #[test]
    fn test_from_object_reads_alias_first() {
        let schema = auction_schema();
        let mut auction = DynamicInstance::new("Auction");
        auction.set("id", 1).set("title", "MacBook Pro").set("category_id", Value::Null);

        let instance = schema.from_object(&auction).unwrap();
        assert_eq!(
            instance.dump(&DumpOptions::new()),
            serde_json::json!({"id": 1, "title": "MacBook Pro", "category": null})
        );
    }

    #[test]
    fn test_apply_to_model() {
        let schema = auction_schema();
        let mut instance = schema.construct([("title", "Lamp")]).unwrap();
        instance.set("title", "Auction ended").unwrap();

        let mut auction = DynamicInstance::new("Auction");
        instance.apply_to_model(&mut auction).unwrap();
        assert_eq!(auction.get("title"), Some(&Value::from("Auction ended")));
    }

    #[test]
    fn test_custom_root_serializes_root_value() {
        let schema = SchemaTypeBuilder::new("Ids")
            .field(SchemaField::new(ROOT_KEY, FieldType::Int.list(), FieldInfo::new()))
            .build();
        let instance = schema
            .validate_value(Value::List(vec![Value::Int(1), Value::from("2")]))
            .unwrap();
        assert_eq!(instance.to_json().unwrap(), "[1,2]");
    }

    #[test]
    fn test_signature() {
        let schema = auction_schema();
        assert_eq!(
            schema.signature(),
            "(*, id: int = None, title: str, category_id: int = None)"
        );
        assert_eq!(SchemaTypeBuilder::new("Empty").build().signature(), "()");
    }

    #[test]
    fn test_validate_json() {
        let schema = auction_schema();
        let instance = schema.validate_json(r#"{"title": "Lamp", "category_id": 2}"#).unwrap();
        assert_eq!(instance.get("category"), Some(&Value::Int(2)));
        assert!(schema.validate_json("[1]").unwrap_err().is_validation());
        assert!(matches!(schema.validate_json("{").unwrap_err(), Error::Json(_)));
    }
}

//! Source model introspection.
//!
//! A [`ModelDef`] describes one ORM model: its name and an ordered list of
//! [`FieldDescriptor`]s. Definitions are collected in a [`CatalogBuilder`] and
//! frozen into a [`ModelCatalog`], which resolves relation targets, adds the
//! implicit `id` primary key where none is declared, and installs reverse
//! relation descriptors on target models.
//!
//! Everything downstream reads models only through [`Model`], a cheap handle
//! into the catalog.
//!
//! # Example
//!
//! ```
//! use ormschema_core::model::{CatalogBuilder, FieldDescriptor, FieldKind, ModelDef};
//!
//! let catalog = CatalogBuilder::new()
//!     .register(ModelDef::new("Category").field(FieldDescriptor::new("name", FieldKind::CharField).max_length(100)))
//!     .register(
//!         ModelDef::new("Auction")
//!             .field(FieldDescriptor::new("title", FieldKind::CharField).max_length(100))
//!             .field(FieldDescriptor::foreign_key("category", "Category").null(true)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let auction = catalog.model("Auction").unwrap();
//! assert_eq!(auction.pk().name, "id");
//! assert!(catalog.model("Category").unwrap().field("auction_set").is_some());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::field::DefaultFactory;
use crate::identifiers::label_from_name;
use crate::relationship::{RelationInfo, RelationshipKind};
use crate::value::Value;

/// Kind of a source model field.
///
/// The set is closed; kinds outside it are expressed as [`FieldKind::Custom`]
/// and need a handler registered with the field mapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    AutoField,
    BigAutoField,
    SmallAutoField,
    CharField,
    TextField,
    SlugField,
    CommaSeparatedIntegerField,
    FileField,
    FilePathField,
    ImageField,
    EmailField,
    UrlField,
    GenericIpAddressField,
    IpAddressField,
    UuidField,
    IntegerField,
    BigIntegerField,
    SmallIntegerField,
    PositiveIntegerField,
    PositiveSmallIntegerField,
    PositiveBigIntegerField,
    FloatField,
    DecimalField,
    BooleanField,
    NullBooleanField,
    BinaryField,
    DateField,
    DateTimeField,
    TimeField,
    DurationField,
    JsonField,
    ForeignKey,
    OneToOneField,
    ManyToManyField,
    /// Reverse side of a foreign key.
    ManyToOneRel,
    /// Reverse side of a one-to-one field.
    OneToOneRel,
    /// Reverse side of a many-to-many field.
    ManyToManyRel,
    /// Caller-defined kind, dispatched by name.
    Custom(String),
}

impl FieldKind {
    /// Kind name used as the field mapper's lookup key.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            FieldKind::AutoField => "AutoField",
            FieldKind::BigAutoField => "BigAutoField",
            FieldKind::SmallAutoField => "SmallAutoField",
            FieldKind::CharField => "CharField",
            FieldKind::TextField => "TextField",
            FieldKind::SlugField => "SlugField",
            FieldKind::CommaSeparatedIntegerField => "CommaSeparatedIntegerField",
            FieldKind::FileField => "FileField",
            FieldKind::FilePathField => "FilePathField",
            FieldKind::ImageField => "ImageField",
            FieldKind::EmailField => "EmailField",
            FieldKind::UrlField => "URLField",
            FieldKind::GenericIpAddressField => "GenericIPAddressField",
            FieldKind::IpAddressField => "IPAddressField",
            FieldKind::UuidField => "UUIDField",
            FieldKind::IntegerField => "IntegerField",
            FieldKind::BigIntegerField => "BigIntegerField",
            FieldKind::SmallIntegerField => "SmallIntegerField",
            FieldKind::PositiveIntegerField => "PositiveIntegerField",
            FieldKind::PositiveSmallIntegerField => "PositiveSmallIntegerField",
            FieldKind::PositiveBigIntegerField => "PositiveBigIntegerField",
            FieldKind::FloatField => "FloatField",
            FieldKind::DecimalField => "DecimalField",
            FieldKind::BooleanField => "BooleanField",
            FieldKind::NullBooleanField => "NullBooleanField",
            FieldKind::BinaryField => "BinaryField",
            FieldKind::DateField => "DateField",
            FieldKind::DateTimeField => "DateTimeField",
            FieldKind::TimeField => "TimeField",
            FieldKind::DurationField => "DurationField",
            FieldKind::JsonField => "JSONField",
            FieldKind::ForeignKey => "ForeignKey",
            FieldKind::OneToOneField => "OneToOneField",
            FieldKind::ManyToManyField => "ManyToManyField",
            FieldKind::ManyToOneRel => "ManyToOneRel",
            FieldKind::OneToOneRel => "OneToOneRel",
            FieldKind::ManyToManyRel => "ManyToManyRel",
            FieldKind::Custom(name) => name,
        }
    }

    /// Relation multiplicity, or `None` for scalar kinds.
    #[must_use]
    pub const fn relationship(&self) -> Option<RelationshipKind> {
        match self {
            FieldKind::ForeignKey => Some(RelationshipKind::ManyToOne),
            FieldKind::OneToOneField | FieldKind::OneToOneRel => Some(RelationshipKind::OneToOne),
            FieldKind::ManyToManyField | FieldKind::ManyToManyRel => {
                Some(RelationshipKind::ManyToMany)
            }
            FieldKind::ManyToOneRel => Some(RelationshipKind::OneToMany),
            _ => None,
        }
    }

    /// True for relation kinds.
    #[must_use]
    pub const fn is_relation(&self) -> bool {
        self.relationship().is_some()
    }

    /// True for reverse relation descriptors.
    #[must_use]
    pub const fn is_reverse(&self) -> bool {
        matches!(
            self,
            FieldKind::ManyToOneRel | FieldKind::OneToOneRel | FieldKind::ManyToManyRel
        )
    }

    /// True for forward relations that store the related key in a column.
    #[must_use]
    pub const fn has_column(&self) -> bool {
        matches!(self, FieldKind::ForeignKey | FieldKind::OneToOneField)
    }

    /// The reverse descriptor kind installed on the target of a forward relation.
    #[must_use]
    pub const fn reverse_kind(&self) -> Option<FieldKind> {
        match self {
            FieldKind::ForeignKey => Some(FieldKind::ManyToOneRel),
            FieldKind::OneToOneField => Some(FieldKind::OneToOneRel),
            FieldKind::ManyToManyField => Some(FieldKind::ManyToManyRel),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a field's declared choices.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    /// A selectable value with its human label.
    Option {
        /// Stored value.
        value: Value,
        /// Human-readable label.
        label: String,
    },
    /// A named group of options.
    Group {
        /// Group label.
        label: String,
        /// Options (or nested groups) in the group.
        options: Vec<Choice>,
    },
}

impl Choice {
    /// Create a selectable option.
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Choice::Option {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Create a group of options.
    pub fn group(label: impl Into<String>, options: Vec<Choice>) -> Self {
        Choice::Group {
            label: label.into(),
            options,
        }
    }
}

/// Default declared on a source field.
#[derive(Debug, Clone)]
pub enum FieldDefault {
    /// A literal value.
    Value(Value),
    /// A member of an enumeration; only its underlying value is used.
    Member {
        /// Member name.
        name: String,
        /// Underlying value.
        value: Value,
    },
    /// A callable invoked each time a default is needed.
    Factory(DefaultFactory),
}

/// Read-only description of one source model field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name on the model.
    pub name: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Human label; derived from the name when unset.
    pub verbose_name: Option<String>,
    /// Help text.
    pub help_text: Option<String>,
    /// Whether the column accepts NULL.
    pub null: bool,
    /// Whether forms accept an empty value.
    pub blank: bool,
    /// Maximum length for string kinds.
    pub max_length: Option<usize>,
    /// Declared default.
    pub default: Option<FieldDefault>,
    /// Declared choices in declaration order.
    pub choices: Vec<Choice>,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Relation target for relation kinds.
    pub relation: Option<RelationInfo>,
    /// Whether the field is backed by a column or link table on this model.
    pub concrete: bool,
    /// Whether the field was created implicitly (auto pk, reverse relations).
    pub auto_created: bool,
}

impl FieldDescriptor {
    /// Create a descriptor for a scalar kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let concrete = !kind.is_reverse();
        Self {
            name: name.into(),
            kind,
            verbose_name: None,
            help_text: None,
            null: false,
            blank: false,
            max_length: None,
            default: None,
            choices: Vec::new(),
            primary_key: false,
            relation: None,
            concrete,
            auto_created: false,
        }
    }

    /// Create a relation descriptor of `kind` targeting `model`.
    pub fn relation(name: impl Into<String>, kind: FieldKind, model: impl Into<String>) -> Self {
        let mut field = Self::new(name, kind);
        field.relation = Some(RelationInfo::new(model));
        field
    }

    /// Create a foreign key to `model`.
    pub fn foreign_key(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, FieldKind::ForeignKey, model)
    }

    /// Create a one-to-one field to `model`.
    pub fn one_to_one(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, FieldKind::OneToOneField, model)
    }

    /// Create a many-to-many field to `model`.
    pub fn many_to_many(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, FieldKind::ManyToManyField, model)
    }

    /// Set the human label.
    #[must_use]
    pub fn verbose_name(mut self, label: impl Into<String>) -> Self {
        self.verbose_name = Some(label.into());
        self
    }

    /// Set help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Set the nullable flag.
    #[must_use]
    pub fn null(mut self, value: bool) -> Self {
        self.null = value;
        self
    }

    /// Set the blank flag.
    #[must_use]
    pub fn blank(mut self, value: bool) -> Self {
        self.blank = value;
        self
    }

    /// Set the maximum length.
    #[must_use]
    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    /// Set a literal default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Set an enumeration member as default.
    #[must_use]
    pub fn default_member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Member {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Set a default factory.
    #[must_use]
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Factory(DefaultFactory::new(factory)));
        self
    }

    /// Set the declared choices.
    #[must_use]
    pub fn choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    /// Mark as primary key.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set the reverse accessor name of a relation.
    #[must_use]
    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        if let Some(relation) = self.relation.take() {
            self.relation = Some(relation.related_name(name));
        }
        self
    }

    /// Human label: the verbose name, or the field name with underscores as spaces.
    #[must_use]
    pub fn label(&self) -> String {
        self.verbose_name
            .clone()
            .unwrap_or_else(|| label_from_name(&self.name))
    }

    /// Attribute name holding the stored value (`<name>_id` for forward keys).
    #[must_use]
    pub fn attname(&self) -> String {
        if self.kind.has_column() {
            format!("{}_id", self.name)
        } else {
            self.name.clone()
        }
    }

    /// True if a default is declared.
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// True for relation kinds.
    #[must_use]
    pub const fn is_relation(&self) -> bool {
        self.kind.is_relation()
    }

    /// True if the relation yields a collection on this side.
    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.kind.relationship().is_some_and(|k| k.is_to_many())
    }

    /// True for one-to-many relations (reverse foreign keys).
    #[must_use]
    pub fn is_one_to_many(&self) -> bool {
        self.kind.relationship() == Some(RelationshipKind::OneToMany)
    }

    /// True for many-to-many relations in either direction.
    #[must_use]
    pub fn is_many_to_many(&self) -> bool {
        self.kind.relationship() == Some(RelationshipKind::ManyToMany)
    }

    /// Name of the related model, for relation kinds.
    #[must_use]
    pub fn related_model_name(&self) -> Option<&str> {
        self.relation.as_ref().map(|r| r.model.as_str())
    }
}

/// Definition of one source model.
#[derive(Debug, Clone, Default)]
pub struct ModelDef {
    /// Model name, unique within a catalog.
    pub name: String,
    /// Optional application label used to qualify the name.
    pub app_label: Option<String>,
    /// Declared fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Abstract models describe shared fields and cannot back a schema.
    pub is_abstract: bool,
}

impl ModelDef {
    /// Start a model definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the application label.
    #[must_use]
    pub fn app_label(mut self, label: impl Into<String>) -> Self {
        self.app_label = Some(label.into());
        self
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark as abstract.
    #[must_use]
    pub fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

#[derive(Debug)]
struct ModelEntry {
    def: ModelDef,
    pk: usize,
}

#[derive(Debug)]
struct CatalogInner {
    models: Vec<ModelEntry>,
}

/// Collects model definitions before they are resolved into a catalog.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    models: Vec<ModelDef>,
}

impl CatalogBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model definition.
    #[must_use]
    pub fn register(mut self, model: ModelDef) -> Self {
        self.models.push(model);
        self
    }

    /// Resolve relations and freeze the catalog.
    ///
    /// Fails with a configuration error on duplicate model names, duplicate
    /// field names, more than one primary key, or relations to unknown models.
    pub fn build(self) -> Result<ModelCatalog> {
        let mut models = self.models;

        let mut seen = HashSet::new();
        for model in &models {
            if !seen.insert(model.name.clone()) {
                return Err(Error::config(format!(
                    "model '{}' is registered more than once",
                    model.name
                )));
            }
        }

        for model in &mut models {
            for field in &mut model.fields {
                if let Some(relation) = field.relation.as_mut() {
                    if relation.model == "self" {
                        relation.model.clone_from(&model.name);
                    }
                }
            }
        }

        let mut reverse: Vec<(usize, FieldDescriptor)> = Vec::new();
        for model in &models {
            for field in &model.fields {
                let Some(relation) = &field.relation else {
                    continue;
                };
                let Some(target) = models.iter().position(|m| m.name == relation.model) else {
                    return Err(Error::config(format!(
                        "field '{}.{}' references unknown model '{}'",
                        model.name, field.name, relation.model
                    )));
                };
                if field.kind.is_reverse() || relation.is_hidden() {
                    continue;
                }
                let Some(kind) = field.kind.reverse_kind() else {
                    continue;
                };
                let name = relation.related_name.clone().unwrap_or_else(|| {
                    let lower = model.name.to_lowercase();
                    if kind == FieldKind::OneToOneRel {
                        lower
                    } else {
                        format!("{lower}_set")
                    }
                });
                let mut rel = FieldDescriptor::relation(name, kind, model.name.clone());
                rel.auto_created = true;
                rel.null = true;
                if let Some(info) = rel.relation.as_mut() {
                    info.remote_field = Some(field.name.clone());
                }
                reverse.push((target, rel));
            }
        }
        for (target, rel) in reverse {
            models[target].fields.push(rel);
        }

        let mut entries = Vec::with_capacity(models.len());
        for mut def in models {
            let pk_count = def.fields.iter().filter(|f| f.primary_key).count();
            if pk_count > 1 {
                return Err(Error::config(format!(
                    "model '{}' declares more than one primary key",
                    def.name
                )));
            }
            if pk_count == 0 {
                let mut id = FieldDescriptor::new("id", FieldKind::AutoField)
                    .primary_key(true)
                    .verbose_name("ID");
                id.auto_created = true;
                def.fields.insert(0, id);
            }

            // pk first, then columns, then many-to-many, then reverse descriptors
            def.fields.sort_by_key(|f| {
                if f.primary_key {
                    0
                } else if f.kind.is_reverse() {
                    3
                } else if f.kind == FieldKind::ManyToManyField {
                    2
                } else {
                    1
                }
            });

            let mut names: HashSet<String> = HashSet::new();
            let mut fields = Vec::with_capacity(def.fields.len());
            for field in std::mem::take(&mut def.fields) {
                if names.insert(field.name.clone()) {
                    fields.push(field);
                } else if field.kind.is_reverse() {
                    // Reverse accessors are never schema candidates.
                    tracing::warn!(
                        model = %def.name,
                        field = %field.name,
                        related = field.related_model_name().unwrap_or_default(),
                        "Reverse accessor clashes with another field, skipping"
                    );
                } else {
                    return Err(Error::config(format!(
                        "field '{}' clashes with another field on model '{}'",
                        field.name, def.name
                    )));
                }
            }
            def.fields = fields;

            let pk = def.fields.iter().position(|f| f.primary_key).unwrap_or(0);
            entries.push(ModelEntry { def, pk });
        }

        tracing::debug!(models = entries.len(), "Model catalog built");
        Ok(ModelCatalog {
            inner: Arc::new(CatalogInner { models: entries }),
        })
    }
}

/// Frozen, shareable set of models with resolved relations.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    inner: Arc<CatalogInner>,
}

impl ModelCatalog {
    /// Look up a model by name.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<Model> {
        self.inner
            .models
            .iter()
            .position(|m| m.def.name == name)
            .map(|index| Model {
                inner: Arc::clone(&self.inner),
                index,
            })
    }

    /// All models in registration order.
    pub fn models(&self) -> impl Iterator<Item = Model> + '_ {
        (0..self.inner.models.len()).map(|index| Model {
            inner: Arc::clone(&self.inner),
            index,
        })
    }
}

/// Handle to one model inside a [`ModelCatalog`].
///
/// Two handles are equal when they point at the same model of the same
/// catalog; this is the identity the schema registry is keyed by.
#[derive(Clone)]
pub struct Model {
    inner: Arc<CatalogInner>,
    index: usize,
}

impl Model {
    fn entry(&self) -> &ModelEntry {
        &self.inner.models[self.index]
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.entry().def.name
    }

    /// Name qualified with the application label, if any.
    #[must_use]
    pub fn label(&self) -> String {
        let def = &self.entry().def;
        match &def.app_label {
            Some(app) => format!("{app}.{}", def.name),
            None => def.name.clone(),
        }
    }

    /// True for abstract models.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.entry().def.is_abstract
    }

    /// Field descriptors, optionally including reverse relation descriptors.
    pub fn fields(&self, include_reverse: bool) -> impl Iterator<Item = &FieldDescriptor> {
        self.entry()
            .def
            .fields
            .iter()
            .filter(move |f| include_reverse || !f.kind.is_reverse())
    }

    /// Look up a field (forward or reverse) by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.entry().def.fields.iter().find(|f| f.name == name)
    }

    /// Primary key descriptor.
    #[must_use]
    pub fn pk(&self) -> &FieldDescriptor {
        let entry = self.entry();
        &entry.def.fields[entry.pk]
    }

    /// Resolve the target model of a relation descriptor.
    #[must_use]
    pub fn related_model(&self, field: &FieldDescriptor) -> Option<Model> {
        let target = field.related_model_name()?;
        self.catalog().model(target)
    }

    /// The catalog this model belongs to.
    #[must_use]
    pub fn catalog(&self) -> ModelCatalog {
        ModelCatalog {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) && self.index == other.index
    }
}

impl Eq for Model {}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
        self.index.hash(state);
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Model").field(&self.label()).finish()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
        CatalogBuilder::new()
            .register(ModelDef::new("Group").field(FieldDescriptor::new("name", FieldKind::CharField)))
            .register(
                ModelDef::new("User")
                    .field(FieldDescriptor::many_to_many("groups", "Group"))
                    .field(FieldDescriptor::new("full_name", FieldKind::CharField))
                    .field(FieldDescriptor::foreign_key("manager", "self").null(true).related_name("reports")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_auto_primary_key_is_first() {
        let catalog = catalog();
        let user = catalog.model("User").unwrap();
        let names: Vec<&str> = user.fields(false).map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "full_name", "manager", "groups"]);
        assert_eq!(user.pk().name, "id");
        assert!(user.pk().auto_created);
    }

    #[test]
    fn test_reverse_descriptors_installed() {
        let catalog = catalog();
        let group = catalog.model("Group").unwrap();
        let rel = group.field("user_set").unwrap();
        assert_eq!(rel.kind, FieldKind::ManyToManyRel);
        assert!(!rel.concrete);
        assert!(rel.auto_created);
        assert_eq!(rel.related_model_name(), Some("User"));
        assert!(group.fields(false).all(|f| f.name != "user_set"));

        let user = catalog.model("User").unwrap();
        assert_eq!(user.field("reports").unwrap().kind, FieldKind::ManyToOneRel);
        assert_eq!(user.field("manager").unwrap().related_model_name(), Some("User"));
    }

    #[test]
    fn test_unknown_relation_target_fails() {
        let err = CatalogBuilder::new()
            .register(ModelDef::new("A").field(FieldDescriptor::foreign_key("b", "Missing")))
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_clashing_reverse_accessors_are_skipped() {
        let catalog = CatalogBuilder::new()
            .register(ModelDef::new("Related").field(FieldDescriptor::new("charfield", FieldKind::CharField)))
            .register(
                ModelDef::new("TestModel")
                    .field(FieldDescriptor::many_to_many("manytomanyfield", "Related"))
                    .field(FieldDescriptor::one_to_one("onetoonefield", "Related"))
                    .field(FieldDescriptor::foreign_key("foreignkey", "Related")),
            )
            .build()
            .unwrap();

        let related = catalog.model("Related").unwrap();
        let reverse: Vec<(&str, &FieldKind)> = related
            .fields(true)
            .filter(|f| f.kind.is_reverse())
            .map(|f| (f.name.as_str(), &f.kind))
            .collect();
        assert_eq!(
            reverse,
            vec![
                ("testmodel_set", &FieldKind::ManyToManyRel),
                ("testmodel", &FieldKind::OneToOneRel),
            ]
        );
        assert_eq!(catalog.model("TestModel").unwrap().fields(false).count(), 4);
    }

    #[test]
    fn test_clashing_forward_fields_fail() {
        let err = CatalogBuilder::new()
            .register(
                ModelDef::new("A")
                    .field(FieldDescriptor::new("name", FieldKind::CharField))
                    .field(FieldDescriptor::new("name", FieldKind::TextField)),
            )
            .build()
            .unwrap_err();
        assert!(err.is_config());

        let catalog = CatalogBuilder::new()
            .register(ModelDef::new("B").field(FieldDescriptor::new("name", FieldKind::CharField)))
            .register(
                ModelDef::new("C").field(FieldDescriptor::foreign_key("b", "B").related_name("name")),
            )
            .build()
            .unwrap();
        assert_eq!(catalog.model("B").unwrap().field("name").unwrap().kind, FieldKind::CharField);
    }

    #[test]
    fn test_relation_predicates() {
        let catalog = catalog();
        let group = catalog.model("Group").unwrap();
        assert!(group.field("user_set").unwrap().is_many_to_many());
        let user = catalog.model("User").unwrap();
        assert!(user.field("reports").unwrap().is_one_to_many());
        assert!(!user.field("manager").unwrap().is_many_to_many());
    }

    #[test]
    fn test_model_identity() {
        let catalog = catalog();
        assert_eq!(catalog.model("User"), catalog.model("User"));
        assert_ne!(catalog.model("User"), catalog.model("Group"));

        let other = self::catalog();
        assert_ne!(catalog.model("User"), other.model("User"));
    }

    #[test]
    fn test_attname_and_label() {
        let fk = FieldDescriptor::foreign_key("category", "Category");
        assert_eq!(fk.attname(), "category_id");
        assert_eq!(fk.label(), "category");

        let m2m = FieldDescriptor::many_to_many("groups", "Group");
        assert_eq!(m2m.attname(), "groups");

        let field = FieldDescriptor::new("start_date", FieldKind::DateField);
        assert_eq!(field.label(), "start date");
    }
}

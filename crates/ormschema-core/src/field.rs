//! Target field types and per-field metadata of generated schemas.

use std::fmt;
use std::sync::Arc;

use crate::identifiers::title_from_name;
use crate::schema::SchemaType;
use crate::validate::loose_eq;
use crate::value::Value;

/// Callable producing a fresh default value each time a schema instance is
/// built without the field.
#[derive(Clone)]
pub struct DefaultFactory(Arc<dyn Fn() -> Value + Send + Sync>);

impl DefaultFactory {
    /// Wrap a closure.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    /// Produce a value.
    #[must_use]
    pub fn call(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultFactory(..)")
    }
}

impl PartialEq for DefaultFactory {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One member of a synthesized choice enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    /// Identifier-shaped member name.
    pub name: String,
    /// Underlying value stored on the source model.
    pub value: Value,
    /// Human label the member was declared with.
    pub label: String,
}

/// Enumeration type derived from a field's declared choices.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceEnum {
    name: String,
    members: Vec<EnumMember>,
}

impl ChoiceEnum {
    /// Create an empty enumeration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Append a member.
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>, label: impl Into<String>) -> Self {
        self.members.push(EnumMember {
            name: name.into(),
            value: value.into(),
            label: label.into(),
        });
        self
    }

    /// Enumeration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    /// Member values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.members.iter().map(|m| &m.value)
    }

    /// Find the member holding `value`.
    #[must_use]
    pub fn find_by_value(&self, value: &Value) -> Option<&EnumMember> {
        self.members.iter().find(|m| loose_eq(&m.value, value))
    }

    /// Find a member by name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Declared type of a schema field.
#[derive(Clone)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Decimal,
    Bool,
    Bytes,
    Date,
    DateTime,
    Time,
    Duration,
    Uuid,
    /// String validated as an email address.
    Email,
    /// String validated as an absolute URL.
    Url,
    /// String validated as an IPv4 or IPv6 address.
    IpAddr,
    /// JSON document supplied as a string and stored parsed.
    Json,
    /// One of a synthesized enumeration's member values.
    Enum(Arc<ChoiceEnum>),
    /// A nested generated schema.
    Schema(Arc<SchemaType>),
    /// Primary key of a related object, accepted raw or read from the object.
    PkRef(Box<FieldType>),
    List(Box<FieldType>),
    /// Also accepts null.
    Optional(Box<FieldType>),
    /// Accepts anything unchanged.
    Any,
}

impl FieldType {
    /// Wrap as optional. Already-optional types are returned unchanged.
    #[must_use]
    pub fn optional(self) -> Self {
        match self {
            FieldType::Optional(_) | FieldType::Any => self,
            other => FieldType::Optional(Box::new(other)),
        }
    }

    /// Wrap as a list.
    #[must_use]
    pub fn list(self) -> Self {
        FieldType::List(Box::new(self))
    }

    /// Wrap as a primary-key reference.
    #[must_use]
    pub fn pk_ref(self) -> Self {
        FieldType::PkRef(Box::new(self))
    }

    /// True if null is a valid value of this type.
    #[must_use]
    pub const fn allows_none(&self) -> bool {
        matches!(self, FieldType::Optional(_) | FieldType::Any)
    }

    /// The type with any optional wrapper removed.
    #[must_use]
    pub fn non_optional(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner.non_optional(),
            other => other,
        }
    }

    /// True for string types that carry their own format validation.
    #[must_use]
    pub const fn is_semantic_string(&self) -> bool {
        matches!(self, FieldType::Email | FieldType::Url | FieldType::IpAddr)
    }

    /// The nested schema, if this is a schema or a list of schemas.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<SchemaType>> {
        match self.non_optional() {
            FieldType::Schema(schema) => Some(schema),
            FieldType::List(inner) => inner.schema(),
            _ => None,
        }
    }

    /// Infer a type from a value given without an annotation.
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null | Value::Map(_) => FieldType::Any,
            Value::Bool(_) => FieldType::Bool,
            Value::Int(_) => FieldType::Int,
            Value::Float(_) => FieldType::Float,
            Value::Decimal(_) => FieldType::Decimal,
            Value::Text(_) => FieldType::Str,
            Value::Bytes(_) => FieldType::Bytes,
            Value::Date(_) => FieldType::Date,
            Value::DateTime(_) => FieldType::DateTime,
            Value::Time(_) => FieldType::Time,
            Value::Duration(_) => FieldType::Duration,
            Value::Uuid(_) => FieldType::Uuid,
            Value::Json(_) => FieldType::Json,
            Value::List(_) => FieldType::Any.list(),
            Value::Record(record) => FieldType::Schema(Arc::clone(record.schema())),
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldType::Enum(a), FieldType::Enum(b)) => Arc::ptr_eq(a, b) || a == b,
            (FieldType::Schema(a), FieldType::Schema(b)) => Arc::ptr_eq(a, b),
            (FieldType::PkRef(a), FieldType::PkRef(b))
            | (FieldType::List(a), FieldType::List(b))
            | (FieldType::Optional(a), FieldType::Optional(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other)
                && !matches!(
                    self,
                    FieldType::Enum(_)
                        | FieldType::Schema(_)
                        | FieldType::PkRef(_)
                        | FieldType::List(_)
                        | FieldType::Optional(_)
                ),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Str => f.write_str("str"),
            FieldType::Int => f.write_str("int"),
            FieldType::Float => f.write_str("float"),
            FieldType::Decimal => f.write_str("Decimal"),
            FieldType::Bool => f.write_str("bool"),
            FieldType::Bytes => f.write_str("bytes"),
            FieldType::Date => f.write_str("date"),
            FieldType::DateTime => f.write_str("datetime"),
            FieldType::Time => f.write_str("time"),
            FieldType::Duration => f.write_str("timedelta"),
            FieldType::Uuid => f.write_str("UUID"),
            FieldType::Email => f.write_str("EmailStr"),
            FieldType::Url => f.write_str("AnyUrl"),
            FieldType::IpAddr => f.write_str("IPvAnyAddress"),
            FieldType::Json => f.write_str("Json"),
            FieldType::Enum(choices) => f.write_str(choices.name()),
            FieldType::Schema(schema) => f.write_str(schema.name()),
            FieldType::PkRef(inner) => write!(f, "{inner}"),
            FieldType::List(inner) => write!(f, "List[{inner}]"),
            FieldType::Optional(inner) => write!(f, "Optional[{inner}]"),
            FieldType::Any => f.write_str("Any"),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldType({self})")
    }
}

/// How a field obtains a value when the input omits it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DefaultValue {
    /// The input must provide the field.
    #[default]
    Required,
    /// A literal default.
    Value(Value),
    /// Computed on each construction.
    Factory(DefaultFactory),
}

impl DefaultValue {
    /// True when the input must provide the field.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self, DefaultValue::Required)
    }

    /// Materialize the default, calling the factory if there is one.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        match self {
            DefaultValue::Required => None,
            DefaultValue::Value(v) => Some(v.clone()),
            DefaultValue::Factory(factory) => Some(factory.call()),
        }
    }

    /// The literal default, if any. Factories have none.
    #[must_use]
    pub const fn literal(&self) -> Option<&Value> {
        match self {
            DefaultValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Metadata attached to one field of a generated schema.
///
/// Created once per field during synthesis and immutable afterward; overrides
/// such as forced optionality produce a modified clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldInfo {
    /// Name used for input and for output when dumping by alias
    /// (for forward relations, the underlying column name).
    pub alias: Option<String>,
    /// Title for JSON Schema output.
    pub title: Option<String>,
    /// Description for JSON Schema output.
    pub description: Option<String>,
    /// Maximum length for string values.
    pub max_length: Option<usize>,
    /// Default value or factory.
    pub default: DefaultValue,
}

impl FieldInfo {
    /// Metadata for a required field with nothing else set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set alias from optional.
    pub fn alias_opt(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description. Blank descriptions are dropped.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        let trimmed = description.trim();
        self.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Set the maximum length.
    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    /// Set max length from optional.
    pub fn max_length_opt(mut self, value: Option<usize>) -> Self {
        self.max_length = value;
        self
    }

    /// Set a literal default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    /// Set a default factory.
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Factory(DefaultFactory::new(factory));
        self
    }

    /// Replace the default.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    /// True when the input must provide the field.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_required()
    }
}

/// A named, typed field of a generated schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    /// Field name (attribute name on schema instances).
    pub name: String,
    /// Declared type.
    pub ty: FieldType,
    /// Metadata.
    pub info: FieldInfo,
}

impl SchemaField {
    /// Create a field.
    pub fn new(name: impl Into<String>, ty: FieldType, info: FieldInfo) -> Self {
        Self {
            name: name.into(),
            ty,
            info,
        }
    }

    /// True when the input must provide the field.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.info.is_required()
    }

    /// True if null is accepted: the type is optional or the default is null.
    #[must_use]
    pub fn allows_none(&self) -> bool {
        self.ty.allows_none() || matches!(self.info.default, DefaultValue::Value(Value::Null))
    }

    /// Name used in output: the alias when `by_alias` is set and an alias exists.
    #[must_use]
    pub fn output_name(&self, by_alias: bool) -> &str {
        match (&self.info.alias, by_alias) {
            (Some(alias), true) => alias,
            _ => &self.name,
        }
    }

    /// Check if an input key addresses this field (by name or alias).
    #[must_use]
    pub fn matches_input_name(&self, input: &str) -> bool {
        input == self.name || self.info.alias.as_deref() == Some(input)
    }

    /// Explicit title, or one derived from the name.
    #[must_use]
    pub fn title(&self) -> String {
        self.info
            .title
            .clone()
            .unwrap_or_else(|| title_from_name(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::Int.list().to_string(), "List[int]");
        assert_eq!(FieldType::Json.optional().to_string(), "Optional[Json]");
        assert_eq!(FieldType::Int.pk_ref().list().to_string(), "List[int]");
    }

    #[test]
    fn test_field_type_equality() {
        assert_eq!(FieldType::Str, FieldType::Str);
        assert_ne!(FieldType::Str, FieldType::Int);
        assert_ne!(FieldType::Int, FieldType::Int.optional());
        assert_eq!(FieldType::Int.list(), FieldType::Int.list());
    }

    #[test]
    fn test_optional_is_idempotent() {
        let ty = FieldType::Int.optional().optional();
        assert_eq!(ty, FieldType::Int.optional());
        assert!(ty.allows_none());
        assert_eq!(ty.non_optional(), &FieldType::Int);
    }

    #[test]
    fn test_infer() {
        assert_eq!(FieldType::infer(&Value::from("")), FieldType::Str);
        assert_eq!(FieldType::infer(&Value::Int(1)), FieldType::Int);
        assert_eq!(FieldType::infer(&Value::Null), FieldType::Any);
    }

    #[test]
    fn test_choice_enum_lookup() {
        let choices = ChoiceEnum::new("LevelEnum")
            .member("A_level_0", "level-0", "level-0")
            .member("A_level_1", "level-1", "level-1");
        assert_eq!(choices.find_by_value(&Value::from("level-1")).unwrap().name, "A_level_1");
        assert!(choices.find_by_value(&Value::from("level-2")).is_none());
        assert_eq!(choices.values().count(), 2);
    }

    #[test]
    fn test_default_factory_called_each_time() {
        use std::sync::atomic::{AtomicI64, Ordering};
        let counter = Arc::new(AtomicI64::new(0));
        let c = Arc::clone(&counter);
        let info = FieldInfo::new().default_factory(move || Value::Int(c.fetch_add(1, Ordering::SeqCst)));
        assert_eq!(info.default.get(), Some(Value::Int(0)));
        assert_eq!(info.default.get(), Some(Value::Int(1)));
        assert!(info.default.literal().is_none());
        assert!(!info.is_required());
    }

    #[test]
    fn test_schema_field_names() {
        let field = SchemaField::new(
            "category",
            FieldType::Int,
            FieldInfo::new().alias("category_id").default_value(Value::Null),
        );
        assert_eq!(field.output_name(true), "category_id");
        assert_eq!(field.output_name(false), "category");
        assert!(field.matches_input_name("category_id"));
        assert!(field.matches_input_name("category"));
        assert!(field.allows_none());
        assert_eq!(field.title(), "Category");
    }

    #[test]
    fn test_blank_description_dropped() {
        assert_eq!(FieldInfo::new().description("  ").description, None);
        assert_eq!(
            FieldInfo::new().description(" help ").description.as_deref(),
            Some("help")
        );
    }
}

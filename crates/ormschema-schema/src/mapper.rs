//! Mapping of scalar model fields to schema field types.
//!
//! The [`FieldMapper`] holds a lookup table keyed by field kind name. The
//! table starts with a handler for every built-in scalar kind; handlers for
//! [`FieldKind::Custom`] kinds (or replacements for built-in ones) are added
//! with [`FieldMapper::register`]. Relation kinds are not in the table: they
//! need the owning model and go through [`crate::relation`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use ormschema_core::error::{Error, Result};
use ormschema_core::field::{ChoiceEnum, DefaultValue, FieldInfo, FieldType};
use ormschema_core::identifiers::{enum_member_name, enum_type_name, title_case};
use ormschema_core::model::{Choice, FieldDefault, FieldDescriptor, FieldKind};
use ormschema_core::value::Value;

/// Handler mapping one field descriptor to its type and metadata.
pub type FieldHandler = Arc<dyn Fn(&FieldDescriptor) -> Result<(FieldType, FieldInfo)> + Send + Sync>;

fn builtin_kinds() -> Vec<(FieldKind, FieldType)> {
    use FieldKind as K;
    vec![
        (K::AutoField, FieldType::Int),
        (K::BigAutoField, FieldType::Int),
        (K::SmallAutoField, FieldType::Int),
        (K::CharField, FieldType::Str),
        (K::TextField, FieldType::Str),
        (K::SlugField, FieldType::Str),
        (K::CommaSeparatedIntegerField, FieldType::Str),
        (K::FileField, FieldType::Str),
        (K::FilePathField, FieldType::Str),
        (K::ImageField, FieldType::Str),
        (K::EmailField, FieldType::Email),
        (K::UrlField, FieldType::Url),
        (K::GenericIpAddressField, FieldType::IpAddr),
        (K::IpAddressField, FieldType::IpAddr),
        (K::UuidField, FieldType::Uuid),
        (K::IntegerField, FieldType::Int),
        (K::BigIntegerField, FieldType::Int),
        (K::SmallIntegerField, FieldType::Int),
        (K::PositiveIntegerField, FieldType::Int),
        (K::PositiveSmallIntegerField, FieldType::Int),
        (K::PositiveBigIntegerField, FieldType::Int),
        (K::FloatField, FieldType::Float),
        (K::DecimalField, FieldType::Decimal),
        (K::BooleanField, FieldType::Bool),
        (K::NullBooleanField, FieldType::Bool),
        (K::BinaryField, FieldType::Bytes),
        (K::DateField, FieldType::Date),
        (K::DateTimeField, FieldType::DateTime),
        (K::TimeField, FieldType::Time),
        (K::DurationField, FieldType::Duration),
    ]
}

/// Lookup table from field kind name to mapping handler.
pub struct FieldMapper {
    table: RwLock<HashMap<String, FieldHandler>>,
}

impl Default for FieldMapper {
    fn default() -> Self {
        let mut table: HashMap<String, FieldHandler> = builtin_kinds()
            .into_iter()
            .map(|(kind, ty)| {
                let handler: FieldHandler = Arc::new(move |field: &FieldDescriptor| -> Result<(FieldType, FieldInfo)> {
                    Ok(construct_field_info(ty.clone(), field, ty.is_semantic_string()))
                });
                (kind.name().to_string(), handler)
            })
            .collect();
        table.insert(
            FieldKind::JsonField.name().to_string(),
            Arc::new(|field: &FieldDescriptor| -> Result<(FieldType, FieldInfo)> {
                let ty = if field.null {
                    FieldType::Json.optional()
                } else {
                    FieldType::Json
                };
                Ok(construct_field_info(ty, field, false))
            }),
        );
        Self {
            table: RwLock::new(table),
        }
    }
}

impl FieldMapper {
    /// A mapper with the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide mapper used during synthesis.
    pub fn global() -> &'static FieldMapper {
        static GLOBAL: OnceLock<FieldMapper> = OnceLock::new();
        GLOBAL.get_or_init(FieldMapper::new)
    }

    /// Register a handler for `kind`, replacing any existing one.
    pub fn register<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&FieldDescriptor) -> Result<(FieldType, FieldInfo)> + Send + Sync + 'static,
    {
        let kind = kind.into();
        tracing::debug!(kind = %kind, "Registering field kind handler");
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, Arc::new(handler));
    }

    /// True if a handler exists for the kind name.
    pub fn handles(&self, kind: &str) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(kind)
    }

    /// Map a scalar field descriptor.
    ///
    /// Fails with [`Error::UnsupportedFieldKind`] when no handler exists for
    /// the field's kind, which includes every relation kind.
    pub fn map_field(&self, field: &FieldDescriptor) -> Result<(FieldType, FieldInfo)> {
        let handler = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(field.kind.name())
            .cloned();
        let Some(handler) = handler else {
            return Err(Error::UnsupportedFieldKind {
                field: field.name.clone(),
                kind: field.kind.name().to_string(),
            });
        };
        let (ty, info) = handler(field)?;
        tracing::trace!(field = %field.name, kind = %field.kind, ty = %ty, "Mapped field");
        Ok((ty, info))
    }
}

impl fmt::Debug for FieldMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let mut kinds: Vec<&String> = table.keys().collect();
        kinds.sort();
        f.debug_struct("FieldMapper").field("kinds", &kinds).finish()
    }
}

/// Map a scalar field with the global mapper.
pub fn map_field(field: &FieldDescriptor) -> Result<(FieldType, FieldInfo)> {
    FieldMapper::global().map_field(field)
}

/// Register a handler on the global mapper.
pub fn register_field_kind<F>(kind: impl Into<String>, handler: F)
where
    F: Fn(&FieldDescriptor) -> Result<(FieldType, FieldInfo)> + Send + Sync + 'static,
{
    FieldMapper::global().register(kind, handler);
}

/// Title and description shared by every mapped field.
pub(crate) fn describe(field: &FieldDescriptor) -> FieldInfo {
    let description = field
        .help_text
        .clone()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| field.label());
    FieldInfo::new()
        .title(title_case(&field.label()))
        .description(description)
}

/// Build the metadata for a scalar field mapped to `ty`.
///
/// Declared choices replace `ty` with a synthesized enumeration. The max
/// length is dropped for enumerations and when `custom_type` is set, since
/// those types validate their own format. Exposed so custom handlers get the
/// same default and choice handling as built-in kinds.
pub fn construct_field_info(ty: FieldType, field: &FieldDescriptor, custom_type: bool) -> (FieldType, FieldInfo) {
    let (ty, custom_type) = if field.choices.is_empty() {
        (ty, custom_type)
    } else {
        (FieldType::Enum(Arc::new(choice_enum(field))), true)
    };

    let default = match &field.default {
        Some(FieldDefault::Factory(factory)) => DefaultValue::Factory(factory.clone()),
        Some(FieldDefault::Member { value, .. } | FieldDefault::Value(value)) => DefaultValue::Value(value.clone()),
        None if field.blank || field.null => DefaultValue::Value(Value::Null),
        None => DefaultValue::Required,
    };

    let info = describe(field)
        .max_length_opt(if custom_type { None } else { field.max_length })
        .with_default(default);
    (ty, info)
}

/// Enumeration of a field's choices, groups flattened depth-first.
///
/// Labels that clean to the same member name get `_2`, `_3`, ... suffixes.
pub fn choice_enum(field: &FieldDescriptor) -> ChoiceEnum {
    fn unique_name(out: &ChoiceEnum, label: &str) -> String {
        let base = enum_member_name(label);
        let mut name = base.clone();
        let mut n = 2;
        while out.find_by_name(&name).is_some() {
            name = format!("{base}_{n}");
            n += 1;
        }
        name
    }

    fn flatten(choices: &[Choice], out: ChoiceEnum) -> ChoiceEnum {
        choices.iter().fold(out, |out, choice| match choice {
            Choice::Option { value, label } => {
                let name = unique_name(&out, label);
                out.member(name, value.clone(), label.clone())
            }
            Choice::Group { options, .. } => flatten(options, out),
        })
    }
    flatten(&field.choices, ChoiceEnum::new(enum_type_name(&field.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_field() {
        let field = FieldDescriptor::new("title", FieldKind::CharField).max_length(100);
        let (ty, info) = map_field(&field).unwrap();
        assert_eq!(ty, FieldType::Str);
        assert_eq!(info.max_length, Some(100));
        assert_eq!(info.title.as_deref(), Some("Title"));
        assert_eq!(info.description.as_deref(), Some("title"));
        assert!(info.is_required());
    }

    #[test]
    fn test_semantic_strings_drop_max_length() {
        for (kind, expected) in [
            (FieldKind::EmailField, FieldType::Email),
            (FieldKind::UrlField, FieldType::Url),
            (FieldKind::GenericIpAddressField, FieldType::IpAddr),
        ] {
            let field = FieldDescriptor::new("f", kind).max_length(200);
            let (ty, info) = map_field(&field).unwrap();
            assert_eq!(ty, expected);
            assert_eq!(info.max_length, None);
        }
    }

    #[test]
    fn test_null_or_blank_defaults_to_none() {
        let field = FieldDescriptor::new("dob", FieldKind::DateTimeField).null(true).blank(true);
        let (ty, info) = map_field(&field).unwrap();
        assert_eq!(ty, FieldType::DateTime);
        assert_eq!(info.default, DefaultValue::Value(Value::Null));

        let field = FieldDescriptor::new("nick", FieldKind::CharField).blank(true);
        assert_eq!(map_field(&field).unwrap().1.default, DefaultValue::Value(Value::Null));
    }

    #[test]
    fn test_factory_default_wins() {
        let field = FieldDescriptor::new("code", FieldKind::CharField)
            .null(true)
            .default_factory(|| Value::from("generated"));
        let (_, info) = map_field(&field).unwrap();
        assert!(info.default.literal().is_none());
        assert_eq!(info.default.get(), Some(Value::from("generated")));
    }

    #[test]
    fn test_choices_become_enum() {
        let field = FieldDescriptor::new("level", FieldKind::CharField)
            .max_length(10)
            .choices(vec![
                Choice::new("level-0", "level-0"),
                Choice::group("Upper", vec![Choice::new("level-1", "Level 1")]),
            ])
            .default_member("LEVEL_0", "level-0");
        let (ty, info) = map_field(&field).unwrap();

        let FieldType::Enum(choices) = ty else {
            panic!("expected enum type");
        };
        assert_eq!(choices.name(), "LevelEnum");
        let values: Vec<_> = choices.values().cloned().collect();
        assert_eq!(values, vec![Value::from("level-0"), Value::from("level-1")]);
        assert_eq!(choices.members()[1].name, "A_Level_1");
        assert_eq!(info.max_length, None);
        assert_eq!(info.default, DefaultValue::Value(Value::from("level-0")));
    }

    #[test]
    fn test_colliding_member_names_get_suffix() {
        let field = FieldDescriptor::new("size", FieldKind::CharField).choices(vec![
            Choice::new("s", "a b"),
            Choice::new("m", "a-b"),
            Choice::new("l", "a.b"),
        ]);
        let choices = choice_enum(&field);
        let names: Vec<_> = choices.members().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A_a_b", "A_a_b_2", "A_a_b_3"]);
        assert_eq!(choices.find_by_name("A_a_b_2").map(|m| &m.value), Some(&Value::from("m")));
    }

    #[test]
    fn test_nullable_json_is_optional() {
        let field = FieldDescriptor::new("config", FieldKind::JsonField).null(true);
        assert_eq!(map_field(&field).unwrap().0, FieldType::Json.optional());
        let field = FieldDescriptor::new("config", FieldKind::JsonField);
        assert_eq!(map_field(&field).unwrap().0, FieldType::Json);
    }

    #[test]
    fn test_help_text_is_description() {
        let field = FieldDescriptor::new("key", FieldKind::CharField)
            .verbose_name("client key")
            .help_text("  Public API key.  ");
        let (_, info) = map_field(&field).unwrap();
        assert_eq!(info.title.as_deref(), Some("Client Key"));
        assert_eq!(info.description.as_deref(), Some("Public API key."));
    }

    #[test]
    fn test_unsupported_and_custom_kinds() {
        let mapper = FieldMapper::new();
        let field = FieldDescriptor::new("price", FieldKind::Custom("MoneyField".to_string()));
        let err = mapper.map_field(&field).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFieldKind { ref kind, .. } if kind == "MoneyField"));

        mapper.register("MoneyField", |field| Ok(construct_field_info(FieldType::Decimal, field, false)));
        assert!(mapper.handles("MoneyField"));
        assert_eq!(mapper.map_field(&field).unwrap().0, FieldType::Decimal);
    }

    #[test]
    fn test_relation_kinds_are_not_scalar() {
        let field = FieldDescriptor::foreign_key("tier", "UserType");
        assert!(matches!(
            FieldMapper::new().map_field(&field),
            Err(Error::UnsupportedFieldKind { .. })
        ));
    }
}

//! Error types for ORM Schema Rust.
//!
//! Schema definition and runtime validation fail through one [`Error`] type.
//! Definition-time problems are reported as [`Error::Config`] or
//! [`Error::TypeConflict`]; data problems found after a schema exists are
//! reported as [`Error::Validation`].

use std::fmt;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A schema definition violates its configuration contract.
    #[error("configuration error: {0}")]
    Config(String),

    /// A value-only override changes the type of an existing field.
    #[error(
        "the type of {schema}.{field} differs from the new default value; \
         if you wish to change the type of this field, please use a type annotation"
    )]
    TypeConflict {
        /// Schema being defined.
        schema: String,
        /// Field whose type would change.
        field: String,
    },

    /// A root field was combined with other fields.
    #[error("invalid root type: {0}")]
    InvalidRoot(String),

    /// No mapping exists for a source field kind.
    #[error("unsupported field kind `{kind}` for field `{field}`")]
    UnsupportedFieldKind {
        /// Field name on the source model.
        field: String,
        /// Kind name that has no mapping.
        kind: String,
    },

    /// Data assigned to a generated schema failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A model instance does not expose a settable attribute.
    #[error("model `{model}` has no attribute `{name}`")]
    Attribute {
        /// Model name of the target instance.
        model: String,
        /// Attribute that could not be set.
        name: String,
    },

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a configuration error from any displayable message.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// True if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// True if this is a type conflict error.
    #[must_use]
    pub const fn is_type_conflict(&self) -> bool {
        matches!(self, Error::TypeConflict { .. })
    }

    /// True if this is a runtime validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Access the validation errors, if any.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Category of a single field validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field was not provided.
    Missing,
    /// Value could not be coerced to the declared type.
    Type,
    /// Null given for a field that does not permit it.
    NoneNotAllowed,
    /// String longer than the declared maximum length.
    MaxLength,
    /// Value is not one of the enumeration members.
    Enum,
    /// String does not match a semantic format (email, url, ip, uuid, dates).
    Format,
    /// A user validator rejected the value.
    Custom,
}

impl ValidationErrorKind {
    /// Short machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            ValidationErrorKind::Missing => "value_error.missing",
            ValidationErrorKind::Type => "type_error",
            ValidationErrorKind::NoneNotAllowed => "type_error.none.not_allowed",
            ValidationErrorKind::MaxLength => "value_error.any_str.max_length",
            ValidationErrorKind::Enum => "type_error.enum",
            ValidationErrorKind::Format => "value_error.format",
            ValidationErrorKind::Custom => "value_error.custom",
        }
    }
}

/// A single validation failure located at a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path to the failing value, outermost first (field names and list indices).
    pub loc: Vec<String>,
    /// Human-readable message.
    pub message: String,
    /// Failure category.
    pub kind: ValidationErrorKind,
}

impl FieldError {
    /// Create an error for a single field.
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            loc: vec![field.into()],
            message: message.into(),
            kind,
        }
    }

    /// Create an error with an empty location, to be placed with [`FieldError::within`].
    pub fn bare(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            loc: Vec::new(),
            message: message.into(),
            kind,
        }
    }

    /// Prefix the location with an outer path segment.
    #[must_use]
    pub fn within(mut self, segment: impl Into<String>) -> Self {
        self.loc.insert(0, segment.into());
        self
    }

    /// Dotted location, e.g. `groups.0.name`.
    #[must_use]
    pub fn path(&self) -> String {
        self.loc.join(".")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  {} ({})", self.path(), self.message, self.kind.code())
    }
}

/// All failures collected while validating one input against one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Schema that rejected the input.
    pub schema: String,
    /// Individual failures in field order.
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error set for a schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            errors: Vec::new(),
        }
    }

    /// Record a failure.
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// True if no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Failures recorded for a top-level field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.loc.first().is_some_and(|f| f == field))
    }

    /// Convert into `Ok(())` when empty, otherwise into an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.errors.len();
        write!(
            f,
            "{} validation error{} for {}",
            n,
            if n == 1 { "" } else { "s" },
            self.schema
        )?;
        for error in &self.errors {
            write!(f, "\n{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

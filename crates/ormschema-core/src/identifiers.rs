//! Naming rules shared by the mapper and the runtime.
//!
//! Titles follow word-wise capitalization (`start_date` becomes `Start Date`),
//! enumeration names are derived from field names, and enumeration member
//! names are forced into identifier shape.

use crate::validate::matches_pattern;

/// Key of the catch-all root field.
pub const ROOT_KEY: &str = "__root__";

/// Pattern a generated identifier must match.
pub const NAME_PATTERN: &str = r"^[_a-zA-Z][_a-zA-Z0-9]*$";

/// Capitalize the first letter of every alphabetic run and lowercase the rest.
///
/// ```
/// use ormschema_core::identifiers::title_case;
///
/// assert_eq!(title_case("start date"), "Start Date");
/// assert_eq!(title_case("ID"), "Id");
/// assert_eq!(title_case("level_2name"), "Level_2Name");
/// ```
#[must_use]
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Default human label for a field name.
#[must_use]
pub fn label_from_name(name: &str) -> String {
    name.replace('_', " ")
}

/// Default title for a field without explicit metadata.
#[must_use]
pub fn title_from_name(name: &str) -> String {
    title_case(&label_from_name(name))
}

/// Name of the enumeration synthesized for a field with choices.
///
/// ```
/// use ormschema_core::identifiers::enum_type_name;
///
/// assert_eq!(enum_type_name("level"), "LevelEnum");
/// assert_eq!(enum_type_name("payment_status"), "PaymentStatusEnum");
/// ```
#[must_use]
pub fn enum_type_name(field_name: &str) -> String {
    format!("{}Enum", title_case(field_name).replace('_', ""))
}

/// True if `name` can be used as an identifier.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    matches_pattern(name, NAME_PATTERN)
}

/// Turn a choice label into an enumeration member name.
///
/// Valid identifiers are kept. Anything else gets an `A_` prefix with every
/// character outside `[_a-zA-Z0-9]` replaced by `_`.
#[must_use]
pub fn enum_member_name(label: &str) -> String {
    if is_valid_identifier(label) {
        return label.to_string();
    }
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("A_{cleaned}")
}

/// True if `name` may become a schema field.
///
/// Names with a leading underscore are private, except the root key.
#[must_use]
pub fn is_valid_field(name: &str) -> bool {
    !name.starts_with('_') || name == ROOT_KEY
}

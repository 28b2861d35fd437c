//! Model instances as seen by the schema runtime.
//!
//! Building a schema instance from an object reads attributes through
//! [`ModelInstance`]; applying a schema instance back writes through
//! [`ModelInstance::set_attr`]. [`DynamicInstance`] is a map-backed
//! implementation for models whose rows are not Rust structs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::value::Value;

/// One attribute read from a model instance.
pub enum Attribute<'a> {
    /// A plain stored value.
    Value(Value),
    /// A single related object.
    Object(&'a dyn ModelInstance),
    /// A related-object manager; holds the result of reading all of it.
    Manager(Vec<&'a dyn ModelInstance>),
    /// A stored file, read as its URL (`None` when empty).
    File(Option<String>),
    /// A method or property; invoked to get the value.
    Callable(&'a (dyn Fn() -> Value + Send + Sync)),
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Attribute::Object(obj) => f.debug_tuple("Object").field(&obj.model_name()).finish(),
            Attribute::Manager(items) => f.debug_tuple("Manager").field(&items.len()).finish(),
            Attribute::File(url) => f.debug_tuple("File").field(url).finish(),
            Attribute::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// Attribute access to a source model instance.
pub trait ModelInstance {
    /// Name of the instance's model.
    fn model_name(&self) -> &str;

    /// Primary key value, null for unsaved instances.
    fn pk(&self) -> Value;

    /// Read an attribute.
    fn attr(&self, name: &str) -> Option<Attribute<'_>>;

    /// Write an attribute.
    fn set_attr(&mut self, name: &str, value: Value) -> Result<()>;
}

type Method = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
enum Slot {
    Value(Value),
    Object(Box<DynamicInstance>),
    Many(Vec<DynamicInstance>),
    File(Option<String>),
    Method(Method),
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Value(v) => v.fmt(f),
            Slot::Object(obj) => obj.fmt(f),
            Slot::Many(items) => f.debug_list().entries(items).finish(),
            Slot::File(url) => f.debug_tuple("File").field(url).finish(),
            Slot::Method(_) => f.write_str("<method>"),
        }
    }
}

/// A model instance whose attributes are held in a map.
///
/// # Example
///
/// ```
/// use ormschema_core::instance::{DynamicInstance, ModelInstance};
/// use ormschema_core::value::Value;
///
/// let mut auction = DynamicInstance::new("Auction");
/// auction.set("id", 1);
/// auction.set("title", "MacBook Pro");
///
/// assert_eq!(auction.pk(), Value::Int(1));
/// assert_eq!(auction.get("title").unwrap().as_str(), Some("MacBook Pro"));
/// ```
#[derive(Debug, Clone)]
pub struct DynamicInstance {
    model: String,
    pk_name: String,
    /// When set, only these attributes may be written.
    settable: Option<HashSet<String>>,
    slots: HashMap<String, Slot>,
}

impl DynamicInstance {
    /// Create an instance of the named model with primary key attribute `id`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            pk_name: "id".to_string(),
            settable: None,
            slots: HashMap::new(),
        }
    }

    /// Create an instance shaped after a catalog model.
    ///
    /// The primary key attribute follows the model, and only the model's
    /// field names and column attribute names can be written.
    pub fn for_model(model: &Model) -> Self {
        let settable = model
            .fields(true)
            .flat_map(|f| [f.name.clone(), f.attname()])
            .collect();
        Self {
            model: model.name().to_string(),
            pk_name: model.pk().attname(),
            settable: Some(settable),
            slots: HashMap::new(),
        }
    }

    /// Set a plain value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.slots.insert(name.into(), Slot::Value(value.into()));
        self
    }

    /// Set a single related object.
    pub fn set_object(&mut self, name: impl Into<String>, object: DynamicInstance) -> &mut Self {
        self.slots.insert(name.into(), Slot::Object(Box::new(object)));
        self
    }

    /// Set a related-object manager.
    pub fn set_many(&mut self, name: impl Into<String>, objects: Vec<DynamicInstance>) -> &mut Self {
        self.slots.insert(name.into(), Slot::Many(objects));
        self
    }

    /// Set a file attribute by its URL.
    pub fn set_file(&mut self, name: impl Into<String>, url: Option<String>) -> &mut Self {
        self.slots.insert(name.into(), Slot::File(url));
        self
    }

    /// Set a method attribute, invoked on read.
    pub fn set_method<F>(&mut self, name: impl Into<String>, method: F) -> &mut Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.slots.insert(name.into(), Slot::Method(Arc::new(method)));
        self
    }

    /// Read a plain value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.slots.get(name) {
            Some(Slot::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Read a related object.
    pub fn get_object(&self, name: &str) -> Option<&DynamicInstance> {
        match self.slots.get(name) {
            Some(Slot::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> bool {
        self.slots.remove(name).is_some()
    }

    /// True if the attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }
}

impl ModelInstance for DynamicInstance {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn pk(&self) -> Value {
        self.get(&self.pk_name)
            .or_else(|| self.get("pk"))
            .cloned()
            .unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<Attribute<'_>> {
        if name == "pk" && !self.slots.contains_key("pk") {
            return Some(Attribute::Value(self.pk()));
        }
        Some(match self.slots.get(name)? {
            Slot::Value(v) => Attribute::Value(v.clone()),
            Slot::Object(obj) => Attribute::Object(obj.as_ref()),
            Slot::Many(items) => {
                Attribute::Manager(items.iter().map(|i| i as &dyn ModelInstance).collect())
            }
            Slot::File(url) => Attribute::File(url.clone()),
            Slot::Method(method) => Attribute::Callable(method.as_ref()),
        })
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<()> {
        if let Some(settable) = &self.settable {
            if !settable.contains(name) {
                return Err(Error::Attribute {
                    model: self.model.clone(),
                    name: name.to_string(),
                });
            }
        }
        self.slots.insert(name.to_string(), Slot::Value(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CatalogBuilder, FieldDescriptor, FieldKind, ModelDef};

    #[test]
    fn test_dynamic_instance_basic() {
        let mut user = DynamicInstance::new("User");
        user.set("id", 7).set("full_name", "Alice");

        assert_eq!(user.model_name(), "User");
        assert_eq!(user.pk(), Value::Int(7));
        assert!(matches!(user.attr("pk"), Some(Attribute::Value(Value::Int(7)))));
        assert!(user.has("full_name"));
        assert!(!user.has("age"));
        assert!(user.attr("age").is_none());
    }

    #[test]
    fn test_attribute_kinds() {
        let mut group = DynamicInstance::new("Group");
        group.set("id", 1);

        let mut user = DynamicInstance::new("User");
        user.set_many("groups", vec![group.clone()])
            .set_object("main_group", group)
            .set_file("avatar", None)
            .set_method("display", || Value::from("Alice (1)"));

        assert!(matches!(user.attr("groups"), Some(Attribute::Manager(items)) if items.len() == 1));
        assert!(matches!(user.attr("main_group"), Some(Attribute::Object(g)) if g.pk() == Value::Int(1)));
        assert!(matches!(user.attr("avatar"), Some(Attribute::File(None))));
        let Some(Attribute::Callable(display)) = user.attr("display") else {
            panic!("expected callable");
        };
        assert_eq!(display(), Value::from("Alice (1)"));
    }

    #[test]
    fn test_for_model_restricts_writes() {
        let catalog = CatalogBuilder::new()
            .register(ModelDef::new("Category").field(FieldDescriptor::new("name", FieldKind::CharField)))
            .register(
                ModelDef::new("Auction")
                    .field(FieldDescriptor::new("title", FieldKind::CharField))
                    .field(FieldDescriptor::one_to_one("category", "Category").null(true)),
            )
            .build()
            .unwrap();
        let mut auction = DynamicInstance::for_model(&catalog.model("Auction").unwrap());

        auction.set_attr("title", Value::from("Lamp")).unwrap();
        auction.set_attr("category_id", Value::Int(3)).unwrap();
        let err = auction.set_attr("colour", Value::from("red")).unwrap_err();
        assert!(matches!(err, Error::Attribute { ref name, .. } if name == "colour"));
    }
}

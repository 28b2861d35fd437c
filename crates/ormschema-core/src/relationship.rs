//! Relationship metadata for source models.
//!
//! Relations are described on a [`FieldDescriptor`](crate::model::FieldDescriptor)
//! by naming the target model; the [`ModelCatalog`](crate::model::ModelCatalog)
//! resolves the name when the catalog is built and adds the reverse side to
//! the target model.

/// The multiplicity of a relation as seen from the model that declares it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// One-to-one: `User` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `User`s belong to one `UserType`.
    #[default]
    ManyToOne,
    /// One-to-many: one `UserType` has many `User`s (reverse of a foreign key).
    OneToMany,
    /// Many-to-many: `User`s have many `Group`s.
    ManyToMany,
}

impl RelationshipKind {
    /// True if the relation yields a collection of related objects.
    #[must_use]
    pub const fn is_to_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// The kind seen from the other side of the relation.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        match self {
            Self::OneToOne => Self::OneToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToMany => Self::ManyToMany,
        }
    }
}

/// Target of a relational field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationInfo {
    /// Name of the related model. `"self"` refers to the declaring model
    /// until the catalog resolves it.
    pub model: String,

    /// Name of the reverse accessor on the related model.
    ///
    /// `None` derives a name (`<model>_set`, or `<model>` for one-to-one);
    /// `"+"` suppresses the reverse accessor.
    pub related_name: Option<String>,

    /// For reverse descriptors, the forward field on the related model.
    pub remote_field: Option<String>,
}

impl RelationInfo {
    /// Create relation info targeting a model by name.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            related_name: None,
            remote_field: None,
        }
    }

    /// Set the reverse accessor name.
    #[must_use]
    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        self.related_name = Some(name.into());
        self
    }

    /// True if no reverse accessor should be created.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.related_name.as_deref().is_some_and(|n| n.ends_with('+'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_kind_default() {
        assert_eq!(RelationshipKind::default(), RelationshipKind::ManyToOne);
    }

    #[test]
    fn test_reversed_kinds() {
        assert_eq!(RelationshipKind::ManyToOne.reversed(), RelationshipKind::OneToMany);
        assert_eq!(RelationshipKind::ManyToMany.reversed(), RelationshipKind::ManyToMany);
        assert!(RelationshipKind::OneToMany.is_to_many());
        assert!(!RelationshipKind::OneToOne.is_to_many());
    }

    #[test]
    fn test_relation_info_hidden() {
        assert!(RelationInfo::new("Group").related_name("+").is_hidden());
        assert!(!RelationInfo::new("Group").related_name("members").is_hidden());
        assert!(!RelationInfo::new("Group").is_hidden());
    }
}

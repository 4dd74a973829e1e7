//! Relationship metadata.
//!
//! Relationships are inferred from field types and annotations during model
//! resolution and attached to the field that represents the association.
//! Query builders use them to generate association loading and writes.

use std::fmt;

use serde::Serialize;

use crate::join_table::JoinTableHandler;

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// `User` has one `Profile`; the foreign key lives on `Profile`.
    HasOne,
    /// `User` has many `Email`s; the foreign key lives on `Email`.
    HasMany,
    /// `Email` belongs to `User`; the foreign key lives on `Email` itself.
    BelongsTo,
    /// `User`s have many `Language`s through a join table.
    ManyToMany,
}

impl RelationshipKind {
    /// Name used in query generation and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationshipKind::HasOne => "has_one",
            RelationshipKind::HasMany => "has_many",
            RelationshipKind::BelongsTo => "belongs_to",
            RelationshipKind::ManyToMany => "many_to_many",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about an association between models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipMetadata {
    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Field holding the reference, on the owned side (or on the join table
    /// for many-to-many), e.g. `UserId`.
    pub foreign_field_name: String,

    /// Column of [`foreign_field_name`](Self::foreign_field_name), e.g. `user_id`.
    pub foreign_column_name: String,

    /// Join-table field referencing the associated model (many-to-many only).
    pub association_foreign_field_name: Option<String>,

    /// Column of the association foreign field (many-to-many only).
    pub association_foreign_column_name: Option<String>,

    /// Field storing the owner's type for polymorphic associations.
    pub polymorphic_type_field_name: Option<String>,

    /// Column of the polymorphic type field.
    pub polymorphic_type_column_name: Option<String>,

    /// Join table for many-to-many relationships.
    pub join_table: Option<JoinTableHandler>,
}

impl RelationshipMetadata {
    /// Create a relationship with no keys set yet.
    pub fn new(kind: RelationshipKind) -> Self {
        Self {
            kind,
            foreign_field_name: String::new(),
            foreign_column_name: String::new(),
            association_foreign_field_name: None,
            association_foreign_column_name: None,
            polymorphic_type_field_name: None,
            polymorphic_type_column_name: None,
            join_table: None,
        }
    }

    /// Set the foreign field and column.
    #[must_use]
    pub fn foreign_key(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_field_name = field.into();
        self.foreign_column_name = column.into();
        self
    }

    /// Set the association foreign field and column (many-to-many).
    #[must_use]
    pub fn association_foreign_key(
        mut self,
        field: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.association_foreign_field_name = Some(field.into());
        self.association_foreign_column_name = Some(column.into());
        self
    }

    /// Set the polymorphic type field and column.
    #[must_use]
    pub fn polymorphic_type(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.polymorphic_type_field_name = Some(field.into());
        self.polymorphic_type_column_name = Some(column.into());
        self
    }

    /// Set the join table.
    #[must_use]
    pub fn join_table(mut self, handler: JoinTableHandler) -> Self {
        self.join_table = Some(handler);
        self
    }

    /// True if the associated side stores a type discriminator.
    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic_type_field_name.is_some()
    }

    /// True once a foreign field has been located.
    pub fn has_foreign_key(&self) -> bool {
        !self.foreign_field_name.is_empty()
    }
}

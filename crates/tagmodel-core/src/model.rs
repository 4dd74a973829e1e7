//! Resolved model metadata.

use std::any::TypeId;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::field::FieldMetadata;
use crate::reflect::{ModelDescriptor, ModelRef};
use crate::relationship::RelationshipMetadata;

/// Identity of a model type.
#[derive(Clone, Copy)]
pub struct ModelType {
    id: TypeId,
    name: &'static str,
}

impl ModelType {
    /// Identity of `T`, declared as `name`.
    pub fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
        }
    }

    /// Type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Declared type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl From<&ModelRef> for ModelType {
    fn from(model: &ModelRef) -> Self {
        Self {
            id: model.id(),
            name: model.name(),
        }
    }
}

impl From<&ModelDescriptor> for ModelType {
    fn from(descriptor: &ModelDescriptor) -> Self {
        Self {
            id: descriptor.id,
            name: descriptor.name,
        }
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModelType {}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelType").field(&self.name).finish()
    }
}

impl Serialize for ModelType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// A relationship candidate whose foreign key could not be found on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRelationship {
    /// Declared field name.
    pub field: String,
    /// Foreign key that was searched for.
    pub foreign_key: String,
}

/// Fully resolved metadata for one model type.
///
/// Immutable once published to a [`ModelCache`](crate::ModelCache), apart from
/// foreign-key marks added when another model's relationship points at one of
/// its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    /// The described type.
    pub model_type: ModelType,
    /// Table name before the configured naming hook runs.
    pub default_table_name: String,
    /// Fields in declaration order, embedded fields expanded in place.
    pub fields: Vec<FieldMetadata>,
    /// Indices into [`fields`](Self::fields) forming the primary key.
    pub primary_field_indices: Vec<usize>,
    /// Relationship candidates left without a relationship.
    pub unresolved: Vec<UnresolvedRelationship>,
    #[serde(skip)]
    is_struct: bool,
}

impl ModelMetadata {
    pub(crate) fn new(
        model_type: ModelType,
        default_table_name: String,
        fields: Vec<FieldMetadata>,
        primary_field_indices: Vec<usize>,
        unresolved: Vec<UnresolvedRelationship>,
    ) -> Self {
        Self {
            model_type,
            default_table_name,
            fields,
            primary_field_indices,
            unresolved,
            is_struct: true,
        }
    }

    /// Metadata for a type that is not a struct: no table, no fields.
    pub(crate) fn empty(model_type: ModelType) -> Self {
        Self {
            model_type,
            default_table_name: String::new(),
            fields: Vec::new(),
            primary_field_indices: Vec::new(),
            unresolved: Vec::new(),
            is_struct: false,
        }
    }

    /// False when the described type was not a struct.
    pub fn is_struct(&self) -> bool {
        self.is_struct
    }

    /// Table name after the configured naming hook.
    pub fn table_name(&self, config: &Config) -> String {
        config.apply_table_name(&self.default_table_name)
    }

    /// Primary key fields, in the order they were found.
    pub fn primary_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.primary_field_indices
            .iter()
            .filter_map(|&idx| self.fields.get(idx))
    }

    /// The single primary key field, if the key is not composite.
    pub fn primary_field(&self) -> Option<&FieldMetadata> {
        match self.primary_field_indices.as_slice() {
            [idx] => self.fields.get(*idx),
            _ => None,
        }
    }

    /// First field with this declared name.
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First field stored in this column.
    pub fn field_by_column(&self, column: &str) -> Option<&FieldMetadata> {
        self.fields
            .iter()
            .find(|f| !f.is_ignored && f.column_name == column)
    }

    /// First field matching `key` by name or by column, as foreign-key lookup does.
    pub fn find_field(&self, key: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.matches(key))
    }

    /// Fields written as literal columns.
    pub fn columns(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.is_column())
    }

    /// Fields carrying an association, with their relationship.
    pub fn relationships(&self) -> impl Iterator<Item = (&FieldMetadata, &RelationshipMetadata)> {
        self.fields
            .iter()
            .filter_map(|f| f.relationship.as_ref().map(|rel| (f, rel)))
    }

    /// Fail if any relationship candidate was left unresolved.
    pub fn check_relationships(&self) -> Result<()> {
        if !self.is_struct {
            return Err(Error::NotAStruct {
                model: self.model_type.name().to_string(),
            });
        }
        match self.unresolved.first() {
            Some(unresolved) => Err(Error::UnresolvedRelationship {
                model: self.model_type.name().to_string(),
                field: unresolved.field.clone(),
                foreign_key: unresolved.foreign_key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Render this metadata as pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            tracing::warn!(model = self.model_type.name(), error = %e, "Failed to render metadata");
            String::new()
        })
    }
}

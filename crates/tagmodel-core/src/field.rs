//! Field metadata and per-field classification.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Serialize, Serializer};

use crate::naming::to_db_name;
use crate::reflect::{FieldDescriptor, FieldType, ModelRef};
use crate::relationship::RelationshipMetadata;
use crate::tag::{StructTag, TagSettings};

/// Column size used when a field has no `SIZE` setting.
pub const DEFAULT_SIZE: usize = 255;

/// Resolved metadata for one field, including fields flattened in from
/// embedded structs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetadata {
    /// Declared field identifier.
    pub name: String,
    /// Path through embedded structs to this field; `[name]` for direct fields.
    pub name_chain: Vec<String>,
    /// Database column name. Empty for ignored fields.
    pub column_name: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Raw annotations.
    pub tag: StructTag,
    /// Parsed annotations. Empty for ignored fields.
    pub settings: TagSettings,
    /// Part of the primary key.
    pub is_primary_key: bool,
    /// Excluded from persistence.
    pub is_ignored: bool,
    /// Stored directly as a column.
    pub is_normal: bool,
    /// Has custom column decoding.
    pub is_scanner: bool,
    /// Has a database-side default.
    pub has_default_value: bool,
    /// Auto-incrementing.
    pub is_auto_increment: bool,
    /// Referenced by a relationship on this or another model. Can be set after
    /// publication, when a later model points at this field.
    #[serde(rename = "is_foreign_key")]
    foreign_key: ForeignKeyFlag,
    /// Association this field represents, if any.
    pub relationship: Option<RelationshipMetadata>,
}

/// Foreign-key mark shared by every holder of a published model.
///
/// The mark only ever goes from unset to set.
#[derive(Default)]
struct ForeignKeyFlag(AtomicBool);

impl ForeignKeyFlag {
    fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Clone for ForeignKeyFlag {
    fn clone(&self) -> Self {
        Self(AtomicBool::new(self.get()))
    }
}

impl PartialEq for ForeignKeyFlag {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl fmt::Debug for ForeignKeyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.get(), f)
    }
}

impl Serialize for ForeignKeyFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.get())
    }
}

/// How the declared type of a field takes part in persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeClass {
    /// Stored as a column; `scanner` when it has custom decoding.
    Column {
        /// Custom decoding present.
        scanner: bool,
    },
    /// A nested struct: embedded, belongs_to or has_one.
    Struct(ModelRef),
    /// A sequence of structs: has_many or many_to_many.
    StructSequence(ModelRef),
}

impl FieldMetadata {
    /// Build a field skeleton from its declaration.
    ///
    /// Ignored fields get no settings and no column. Otherwise the primary
    /// key, default and auto increment markers are read and the column name is
    /// taken from `COLUMN` or derived from the field name.
    pub fn from_descriptor(descriptor: &FieldDescriptor) -> Self {
        let mut field = Self {
            name: descriptor.name.to_string(),
            name_chain: vec![descriptor.name.to_string()],
            column_name: String::new(),
            field_type: descriptor.field_type.clone(),
            tag: descriptor.tag,
            settings: TagSettings::default(),
            is_primary_key: false,
            is_ignored: false,
            is_normal: false,
            is_scanner: false,
            has_default_value: false,
            is_auto_increment: false,
            foreign_key: ForeignKeyFlag::default(),
            relationship: None,
        };

        if descriptor.tag.is_ignored() {
            field.is_ignored = true;
            return field;
        }

        let settings = descriptor.tag.settings();
        field.is_primary_key = settings.contains("PRIMARY_KEY");
        field.has_default_value = settings.contains("DEFAULT");
        field.is_auto_increment = settings.contains("AUTO_INCREMENT");
        field.column_name = match settings.get("COLUMN") {
            Some(column) => column.to_string(),
            None => to_db_name(descriptor.name),
        };
        field.settings = settings;
        field
    }

    /// Classify the declared type, looking through one optional level.
    pub fn type_class(&self) -> TypeClass {
        let indirect = self.field_type.indirect();
        if indirect.is_scanner() {
            return TypeClass::Column { scanner: true };
        }
        match indirect {
            FieldType::Model(model) => TypeClass::Struct(*model),
            FieldType::Sequence(elem) => match elem.indirect() {
                FieldType::Model(model) => TypeClass::StructSequence(*model),
                _ => TypeClass::Column { scanner: false },
            },
            _ => TypeClass::Column { scanner: false },
        }
    }

    /// True if `key` names this field, either as declared or as a column.
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.column_name == to_db_name(key)
    }

    /// Referenced by a relationship on this or another model.
    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.get()
    }

    /// Mark this field as a foreign key. Visible to every holder of the model.
    pub(crate) fn mark_foreign_key(&self) {
        self.foreign_key.set();
    }

    /// True if this field is written as a literal column.
    pub fn is_column(&self) -> bool {
        !self.is_ignored && self.is_normal
    }

    /// True if this field carries an association.
    pub fn has_relationship(&self) -> bool {
        self.relationship.is_some()
    }

    /// Explicit `TYPE` setting.
    pub fn sql_type(&self) -> Option<&str> {
        self.settings.get_non_empty("TYPE")
    }

    /// `SIZE` setting, or [`DEFAULT_SIZE`] when absent or unparsable.
    pub fn size(&self) -> usize {
        // An unparsable size keeps the default rather than producing size 0.
        self.settings
            .get("SIZE")
            .and_then(|size| size.trim().parse().ok())
            .unwrap_or(DEFAULT_SIZE)
    }

    /// `NOT NULL` setting.
    pub fn is_not_null(&self) -> bool {
        self.settings.contains("NOT NULL")
    }

    /// `UNIQUE` setting.
    pub fn is_unique(&self) -> bool {
        self.settings.contains("UNIQUE")
    }

    /// Default value expression. A bare `default` marker has none.
    pub fn default_value(&self) -> Option<&str> {
        self.settings
            .get_non_empty("DEFAULT")
            .filter(|value| *value != "DEFAULT")
    }

    /// Unique index groups this field belongs to.
    pub fn unique_index_groups(&self) -> Vec<&str> {
        match self.settings.get("UNIQUE_INDEX") {
            Some(groups) => groups.split(':').filter(|g| !g.is_empty()).collect(),
            None => Vec::new(),
        }
    }

    /// `IGNORE_MIGRATE` setting.
    pub fn ignore_migrate(&self) -> bool {
        self.settings.contains("IGNORE_MIGRATE")
    }

    /// Copy of this field reached through an embedding field named `prefix`.
    pub(crate) fn embedded_in(&self, prefix: &str) -> Self {
        let mut field = self.clone();
        field.name_chain.insert(0, prefix.to_string());
        field
    }
}

//! Static type descriptions.
//!
//! Models describe their own fields through [`Model::describe`], usually
//! generated by `#[derive(Model)]`. Field types are described by [`Reflect`],
//! which distinguishes plain columns, timestamps, custom scanners, nested
//! models, optional indirection and sequences. Capabilities that a reflective
//! runtime would discover by interface checks are traits here:
//! [`TableName`], [`Scanner`] and [`Timestamp`].

use std::any::{TypeId, type_name};
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::tag::StructTag;
use crate::value::Value;

/// A structured record type that can be mapped to a table.
pub trait Model: 'static {
    /// Declared type name, used for table names and foreign-key inference.
    const NAME: &'static str;

    /// Describe the declared fields of this type.
    fn describe() -> ModelDescriptor;

    /// Table name chosen by this particular value, if it has one.
    fn table_name(&self) -> Option<String> {
        None
    }
}

/// Types that can appear as a model field.
pub trait Reflect {
    /// Describe this type as a field type.
    fn field_type() -> FieldType;
}

/// Table-naming capability.
///
/// Implement this and mark the model `#[tagmodel(table_name)]` to let the
/// derive route both instance and type-level names through it.
pub trait TableName {
    /// The table this value is stored in.
    fn table_name(&self) -> String;
}

/// Custom column decoding and encoding.
///
/// Scanner fields are stored as a single column even if the Rust type is
/// itself a struct.
pub trait Scanner {
    /// Replace `self` with the decoded column value.
    fn scan(&mut self, src: Value) -> Result<()>;

    /// Encode `self` as a column value.
    fn value(&self) -> Value;
}

/// Marker for timestamp types, which are stored directly.
pub trait Timestamp {}

/// Identity of a model type plus a way to describe it.
#[derive(Clone, Copy)]
pub struct ModelRef {
    id: TypeId,
    name: &'static str,
    describe: fn() -> ModelDescriptor,
}

impl ModelRef {
    /// Reference the model `M`.
    pub fn of<M: Model>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: M::NAME,
            describe: M::describe,
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

    /// Build the descriptor of the referenced type.
    pub fn describe(&self) -> ModelDescriptor {
        (self.describe)()
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModelRef {}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.name).finish()
    }
}

impl Serialize for ModelRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// Shape of a field's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum FieldType {
    /// A plain column value.
    Scalar(&'static str),
    /// A timestamp, stored directly.
    Time(&'static str),
    /// A type with custom column decoding.
    Scanner(&'static str),
    /// A nested model.
    Model(ModelRef),
    /// One level of optional indirection (`Option<T>`). `Box<T>` describes as `T`.
    Indirect(Box<FieldType>),
    /// A sequence (`Vec<T>`).
    Sequence(Box<FieldType>),
}

impl FieldType {
    /// A plain column of type `T`.
    pub fn scalar<T: ?Sized>() -> Self {
        FieldType::Scalar(type_name::<T>())
    }

    /// A timestamp column of type `T`.
    pub fn time<T: Timestamp>() -> Self {
        FieldType::Time(type_name::<T>())
    }

    /// A scanner column of type `T`.
    pub fn scanner<T: Scanner>() -> Self {
        FieldType::Scanner(type_name::<T>())
    }

    /// A nested model `M`.
    pub fn model<M: Model>() -> Self {
        FieldType::Model(ModelRef::of::<M>())
    }

    /// Remove one level of [`FieldType::Indirect`], if present.
    pub fn indirect(&self) -> &FieldType {
        match self {
            FieldType::Indirect(inner) => inner.as_ref(),
            other => other,
        }
    }

    /// True for timestamp types.
    pub fn is_time(&self) -> bool {
        matches!(self, FieldType::Time(_))
    }

    /// True for scanner types.
    pub fn is_scanner(&self) -> bool {
        matches!(self, FieldType::Scanner(_))
    }

    /// The model a struct or sequence-of-struct field refers to, looking
    /// through one level of indirection on the field and on the element.
    pub fn associated_model(&self) -> Option<&ModelRef> {
        match self.indirect() {
            FieldType::Model(model) => Some(model),
            FieldType::Sequence(elem) => match elem.indirect() {
                FieldType::Model(model) => Some(model),
                _ => None,
            },
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Scalar(name) | FieldType::Time(name) | FieldType::Scanner(name) => name,
            FieldType::Model(model) => model.name(),
            FieldType::Indirect(inner) | FieldType::Sequence(inner) => inner.type_name(),
        }
    }
}

/// Whether a described type is a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// A struct with (possibly zero) named fields.
    Struct,
    /// Anything else; resolves to empty metadata.
    Other,
}

/// Declared shape of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Declared field identifier.
    pub name: &'static str,
    /// Declared type.
    pub field_type: FieldType,
    /// Raw annotations.
    pub tag: StructTag,
    /// Only exported fields take part in mapping.
    pub exported: bool,
    /// Anonymous embedding: always flattened into the enclosing model.
    pub anonymous: bool,
}

impl FieldDescriptor {
    /// An exported, untagged field.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            tag: StructTag::default(),
            exported: true,
            anonymous: false,
        }
    }

    /// Set the `sql` annotation namespace.
    pub fn sql(mut self, tag: &'static str) -> Self {
        self.tag.sql = tag;
        self
    }

    /// Set the `tagmodel` annotation namespace.
    pub fn tagmodel(mut self, tag: &'static str) -> Self {
        self.tag.tagmodel = tag;
        self
    }

    /// Set whether the field is exported.
    pub fn exported(mut self, value: bool) -> Self {
        self.exported = value;
        self
    }

    /// Mark the field as an anonymous embedding.
    pub fn anonymous(mut self, value: bool) -> Self {
        self.anonymous = value;
        self
    }
}

/// Declared shape of a model type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Type identity.
    pub id: TypeId,
    /// Declared type name.
    pub name: &'static str,
    /// Struct or not.
    pub kind: TypeKind,
    /// Declared fields in order.
    pub fields: Vec<FieldDescriptor>,
    /// Type-level table name, as a freshly constructed value would report it.
    pub table_name: Option<String>,
}

impl ModelDescriptor {
    /// Start describing the struct `M`.
    pub fn new<M: Model>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: M::NAME,
            kind: TypeKind::Struct,
            fields: Vec::new(),
            table_name: None,
        }
    }

    /// Describe `M` as a non-struct type.
    pub fn non_struct<M: Model>() -> Self {
        Self {
            kind: TypeKind::Other,
            ..Self::new::<M>()
        }
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the type-level table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Set the type-level table name from optional.
    pub fn table_name_opt(mut self, name: Option<String>) -> Self {
        self.table_name = name;
        self
    }

    /// True for struct types.
    pub fn is_struct(&self) -> bool {
        self.kind == TypeKind::Struct
    }
}

macro_rules! impl_reflect_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn field_type() -> FieldType {
                    FieldType::scalar::<$ty>()
                }
            }
        )*
    };
}

impl_reflect_scalar!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    Value,
    serde_json::Value,
);

macro_rules! impl_timestamp {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {
        $(
            impl<$($generics)*> Timestamp for $ty {}

            impl<$($generics)*> Reflect for $ty {
                fn field_type() -> FieldType {
                    FieldType::time::<$ty>()
                }
            }
        )*
    };
}

impl_timestamp!(
    [] std::time::SystemTime,
    [Tz: chrono::TimeZone] chrono::DateTime<Tz>,
    [] chrono::NaiveDateTime,
    [] chrono::NaiveDate,
    [] chrono::NaiveTime,
);

impl<T: Reflect> Reflect for Option<T> {
    fn field_type() -> FieldType {
        FieldType::Indirect(Box::new(T::field_type()))
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn field_type() -> FieldType {
        T::field_type()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::Sequence(Box::new(T::field_type()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Owner;

    impl Model for Owner {
        const NAME: &'static str = "Owner";

        fn describe() -> ModelDescriptor {
            ModelDescriptor::new::<Self>()
        }
    }

    impl Reflect for Owner {
        fn field_type() -> FieldType {
            FieldType::model::<Self>()
        }
    }

    #[test]
    fn test_scalar_and_time_types() {
        assert!(matches!(i64::field_type(), FieldType::Scalar(_)));
        assert!(<Vec<u8>>::field_type().associated_model().is_none());
        assert!(std::time::SystemTime::field_type().is_time());
        assert!(<chrono::DateTime<chrono::Utc>>::field_type().is_time());
        assert!(<Option<chrono::NaiveDate>>::field_type().indirect().is_time());
    }

    #[test]
    fn test_box_is_transparent() {
        assert_eq!(<Box<Owner>>::field_type(), Owner::field_type());
        assert_eq!(
            <Option<Box<Owner>>>::field_type().indirect(),
            &Owner::field_type()
        );
    }

    #[test]
    fn test_indirect_unwraps_one_level_only() {
        let nested = <Option<Option<i32>>>::field_type();
        assert!(matches!(nested.indirect(), FieldType::Indirect(_)));
    }

    #[test]
    fn test_associated_model_through_indirection() {
        let owner = ModelRef::of::<Owner>();
        assert_eq!(Owner::field_type().associated_model(), Some(&owner));
        assert_eq!(<Option<Owner>>::field_type().associated_model(), Some(&owner));
        assert_eq!(<Vec<Owner>>::field_type().associated_model(), Some(&owner));
        assert_eq!(
            <Vec<Box<Owner>>>::field_type().associated_model(),
            Some(&owner)
        );
        assert_eq!(<Vec<Vec<Owner>>>::field_type().associated_model(), None);
        assert_eq!(owner.name(), "Owner");
        assert_eq!(owner.describe().id, TypeId::of::<Owner>());
    }

    #[test]
    fn test_field_descriptor_builder() {
        let field = FieldDescriptor::new("Name", String::field_type())
            .sql("type:varchar(100)")
            .tagmodel("column:full_name")
            .exported(false)
            .anonymous(true);
        assert_eq!(field.tag.sql, "type:varchar(100)");
        assert_eq!(field.tag.tagmodel, "column:full_name");
        assert!(!field.exported);
        assert!(field.anonymous);
    }

    #[test]
    fn test_descriptor_kinds() {
        assert!(ModelDescriptor::new::<Owner>().is_struct());
        assert!(!ModelDescriptor::non_struct::<Owner>().is_struct());
        let named = ModelDescriptor::new::<Owner>().table_name("people");
        assert_eq!(named.table_name.as_deref(), Some("people"));
    }
}

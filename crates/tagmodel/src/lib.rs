//! Tag-driven model metadata for relational mapping.
//!
//! `tagmodel` inspects record types once and caches what an ORM needs to map
//! them to tables: table and column names, primary keys, defaults, and the
//! relationships between models (has one, has many, belongs to, many to many,
//! polymorphic). Metadata is driven by field annotations in two namespaces:
//!
//! ```ignore
//! use tagmodel::prelude::*;
//!
//! #[derive(Model, Default)]
//! pub struct User {
//!     pub id: i64,
//!     #[sql = "type:varchar(100);not null"]
//!     pub name: String,
//!     pub emails: Vec<Email>,
//!     #[tagmodel = "many2many:user_languages"]
//!     pub languages: Vec<Language>,
//! }
//!
//! let cache = ModelCache::new(Config::default());
//! let users = cache.get::<User>();
//! assert_eq!(users.table_name(cache.config()), "users");
//! ```
//!
//! The derive emits paths into `tagmodel_core`; depend on both crates.

pub use tagmodel_core::*;
pub use tagmodel_macros::Model;

/// Commonly used items.
pub mod prelude {
    pub use tagmodel_core::{
        Config, Dialect, Error, FieldMetadata, FieldType, Model, ModelCache, ModelMetadata,
        Reflect, RelationshipKind, RelationshipMetadata, Result, Scanner, TableName, Timestamp,
        Value,
    };
    pub use tagmodel_macros::Model;
}

//! Core types for tagmodel.
//!
//! `tagmodel-core` turns static descriptions of record types into the metadata
//! an ORM needs: table names, column names, primary keys and the relationships
//! between models.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`Model`] and [`Reflect`] describe types; usually they
//!   are generated by `#[derive(Model)]` from `tagmodel-macros`. [`TableName`],
//!   [`Scanner`] and [`Timestamp`] are capabilities a type may opt into.
//! - **Annotations**: [`StructTag`] and [`TagSettings`] parse the `sql` and
//!   `tagmodel` field annotations.
//! - **Resolution**: [`ModelCache`] resolves a type, and every type it reaches,
//!   into shared, immutable [`ModelMetadata`].
//! - **Schema helpers**: [`column_definition`] and [`matches_column`] render and
//!   compare column definitions through a [`Dialect`].
//!
//! Most applications should use the `tagmodel` facade.

pub mod cache;
pub mod column;
pub mod config;
pub mod error;
pub mod field;
pub mod join_table;
pub mod model;
pub mod naming;
pub mod reflect;
pub mod relationship;
mod resolve;
pub mod tag;
pub mod value;

pub use cache::{CacheStats, ModelCache};
pub use column::{Dialect, column_definition, matches_column};
pub use config::{Config, TableNameHandler};
pub use error::{Error, Result};
pub use field::{DEFAULT_SIZE, FieldMetadata, TypeClass};
pub use join_table::{JoinTableForeignKey, JoinTableHandler, JoinTableSource};
pub use model::{ModelMetadata, ModelType, UnresolvedRelationship};
pub use naming::{default_table_name, pluralize, to_db_name};
pub use reflect::{
    FieldDescriptor, FieldType, Model, ModelDescriptor, ModelRef, Reflect, Scanner, TableName,
    Timestamp, TypeKind,
};
pub use relationship::{RelationshipKind, RelationshipMetadata};
pub use resolve::FieldPatch;
pub use tag::{StructTag, TagSettings, parse_tag_settings};
pub use value::Value;

//! Procedural macros for tagmodel.
//!
//! `#[derive(Model)]` implements `tagmodel_core::Model` and
//! `tagmodel_core::Reflect` for a struct with named fields. Generated code
//! refers to `::tagmodel_core`, so the crate using the derive must depend on
//! `tagmodel-core` directly.
//!
//! ```ignore
//! #[derive(Model)]
//! #[tagmodel(table = "people")]
//! pub struct Person {
//!     #[tagmodel = "primary_key"]
//!     pub id: i64,
//!     #[sql = "type:varchar(100);not null"]
//!     pub name: String,
//!     #[tagmodel(embed)]
//!     pub audit: Audit,
//!     #[tagmodel = "-"]
//!     pub cached_score: f64,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod model_derive;

/// Derive `Model` and `Reflect`.
///
/// Field attributes: `#[sql = "..."]` and `#[tagmodel = "..."]` carry raw
/// annotation text; `#[tagmodel(embed)]` flattens the field's struct into the
/// model. Struct attributes: `#[tagmodel(table = "...")]` fixes the table name;
/// `#[tagmodel(table_name)]` takes it from the type's `TableName` impl.
#[proc_macro_derive(Model, attributes(sql, tagmodel))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match model_derive::parse_model(&input) {
        Ok(def) => model_derive::generate_model_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}

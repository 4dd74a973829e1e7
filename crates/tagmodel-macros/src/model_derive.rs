//! Implementation of the Model derive macro.
//!
//! The derive records each named field's identifier, declared type,
//! visibility and raw annotation text. All interpretation of the annotations
//! happens at resolution time in `tagmodel-core`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprLit, Field, Fields, Ident, Lit, LitStr, Meta,
    Result, Type, Visibility,
};

/// Parsed definition of a struct with `#[derive(Model)]`.
#[derive(Debug)]
pub struct ModelDef {
    /// The struct name.
    pub name: Ident,
    /// Where the type-level table name comes from.
    pub table: TableSource,
    /// Declared fields in order.
    pub fields: Vec<ModelFieldDef>,
}

/// Source of a model's type-level table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// Derived from the type name at resolution time.
    Derived,
    /// `#[tagmodel(table = "...")]`.
    Literal(String),
    /// `#[tagmodel(table_name)]`: the type implements `TableName` and `Default`.
    Capability,
}

/// One declared field.
#[derive(Debug)]
pub struct ModelFieldDef {
    /// Field identifier without any raw prefix.
    pub name: String,
    /// Declared type.
    pub ty: Type,
    /// `#[sql = "..."]` text, multiple attributes joined by `;`.
    pub sql: String,
    /// `#[tagmodel = "..."]` text, multiple attributes joined by `;`.
    pub tagmodel: String,
    /// Field visibility is not private.
    pub exported: bool,
    /// `#[tagmodel(embed)]`.
    pub anonymous: bool,
}

/// Parse a `DeriveInput` into a `ModelDef`.
pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not unions",
            ));
        }
    };

    Ok(ModelDef {
        name: input.ident.clone(),
        table: parse_table_source(&input.attrs)?,
        fields,
    })
}

fn parse_table_source(attrs: &[Attribute]) -> Result<TableSource> {
    let mut table = TableSource::Derived;
    for attr in attrs {
        if !attr.path().is_ident("tagmodel") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = TableSource::Literal(value.value());
            } else if meta.path.is_ident("table_name") {
                table = TableSource::Capability;
            } else {
                return Err(meta.error(
                    "unknown tagmodel attribute. Valid attributes are: table, table_name",
                ));
            }
            Ok(())
        })?;
    }
    Ok(table)
}

fn parse_fields(fields: &Fields) -> Result<Vec<ModelFieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new_spanned(
            fields,
            "Model requires a struct with named fields",
        )),
        Fields::Unit => Ok(Vec::new()),
    }
}

fn parse_field(field: &Field) -> Result<ModelFieldDef> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut sql = Vec::new();
    let mut tagmodel = Vec::new();
    let mut anonymous = false;

    for attr in &field.attrs {
        if attr.path().is_ident("sql") {
            sql.push(tag_text(attr)?);
        } else if attr.path().is_ident("tagmodel") {
            match &attr.meta {
                Meta::NameValue(_) => tagmodel.push(tag_text(attr)?),
                Meta::List(_) => attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("embed") {
                        anonymous = true;
                        Ok(())
                    } else {
                        Err(meta.error("unknown tagmodel field attribute. Expected `embed`"))
                    }
                })?,
                Meta::Path(_) => {
                    return Err(Error::new_spanned(
                        attr,
                        "expected #[tagmodel = \"...\"] or #[tagmodel(embed)]",
                    ));
                }
            }
        }
    }

    Ok(ModelFieldDef {
        name: ident.unraw().to_string(),
        ty: field.ty.clone(),
        sql: sql.join(";"),
        tagmodel: tagmodel.join(";"),
        exported: !matches!(field.vis, Visibility::Inherited),
        anonymous,
    })
}

/// Text of `#[name = "..."]`.
fn tag_text(attr: &Attribute) -> Result<String> {
    let value = &attr.meta.require_name_value()?.value;
    match value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(text),
            ..
        }) => Ok(text.value()),
        other => Err(Error::new_spanned(other, "expected a string literal")),
    }
}

/// Generate the `Model` and `Reflect` implementations.
pub fn generate_model_impl(def: &ModelDef) -> TokenStream {
    let name = &def.name;
    let name_str = name.unraw().to_string();

    let table = match &def.table {
        TableSource::Derived => quote! {},
        TableSource::Literal(table) => quote! { .table_name(#table) },
        TableSource::Capability => quote! {
            .table_name(::tagmodel_core::TableName::table_name(
                &<Self as ::core::default::Default>::default(),
            ))
        },
    };

    let instance_table_name = match &def.table {
        TableSource::Capability => quote! {
            fn table_name(&self) -> ::core::option::Option<::std::string::String> {
                ::core::option::Option::Some(::tagmodel_core::TableName::table_name(self))
            }
        },
        _ => quote! {},
    };

    let fields = def.fields.iter().map(generate_field_descriptor);

    quote! {
        impl ::tagmodel_core::Model for #name {
            const NAME: &'static str = #name_str;

            fn describe() -> ::tagmodel_core::ModelDescriptor {
                ::tagmodel_core::ModelDescriptor::new::<Self>()
                    #table
                    #(.field(#fields))*
            }

            #instance_table_name
        }

        impl ::tagmodel_core::Reflect for #name {
            fn field_type() -> ::tagmodel_core::FieldType {
                ::tagmodel_core::FieldType::model::<Self>()
            }
        }
    }
}

fn generate_field_descriptor(field: &ModelFieldDef) -> TokenStream {
    let ModelFieldDef {
        name,
        ty,
        sql,
        tagmodel,
        exported,
        anonymous,
    } = field;

    quote! {
        ::tagmodel_core::FieldDescriptor::new(
            #name,
            <#ty as ::tagmodel_core::Reflect>::field_type(),
        )
        .sql(#sql)
        .tagmodel(#tagmodel)
        .exported(#exported)
        .anonymous(#anonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_fields_and_annotations() {
        let input: DeriveInput = parse_quote! {
            struct Account {
                #[tagmodel = "primary_key"]
                pub id: i64,
                #[sql = "type:varchar(20)"]
                #[sql = "not null"]
                #[tagmodel = "column:acct_no"]
                pub number: String,
                #[tagmodel(embed)]
                pub audit: Audit,
                secret: String,
                pub r#type: String,
            }
        };
        let def = parse_model(&input).unwrap();
        assert_eq!(def.name, "Account");
        assert_eq!(def.table, TableSource::Derived);
        assert_eq!(def.fields.len(), 5);

        assert_eq!(def.fields[0].tagmodel, "primary_key");
        assert_eq!(def.fields[1].sql, "type:varchar(20);not null");
        assert_eq!(def.fields[1].tagmodel, "column:acct_no");
        assert!(def.fields[2].anonymous);
        assert!(!def.fields[3].exported);
        assert!(def.fields[0].exported);
        assert_eq!(def.fields[4].name, "type");
    }

    #[test]
    fn test_parse_table_sources() {
        let input: DeriveInput = parse_quote! {
            #[tagmodel(table = "people")]
            struct Person { pub id: i64 }
        };
        assert_eq!(
            parse_model(&input).unwrap().table,
            TableSource::Literal("people".to_string())
        );

        let input: DeriveInput = parse_quote! {
            #[tagmodel(table_name)]
            struct Person { pub id: i64 }
        };
        assert_eq!(parse_model(&input).unwrap().table, TableSource::Capability);
    }

    #[test]
    fn test_unit_struct_has_no_fields() {
        let input: DeriveInput = parse_quote!(struct Marker;);
        assert!(parse_model(&input).unwrap().fields.is_empty());
    }

    #[test]
    fn test_rejected_shapes() {
        let input: DeriveInput = parse_quote!(enum Status { Active });
        assert!(parse_model(&input).is_err());

        let input: DeriveInput = parse_quote!(struct Pair(i64, i64););
        assert!(parse_model(&input).is_err());

        let input: DeriveInput = parse_quote!(struct Wrapper<T> { pub inner: T });
        assert!(parse_model(&input).is_err());

        let input: DeriveInput = parse_quote! {
            #[tagmodel(schema = "x")]
            struct Person { pub id: i64 }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_non_string_annotation_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Person {
                #[sql = 42]
                pub id: i64,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_generated_impl() {
        let input: DeriveInput = parse_quote! {
            #[tagmodel(table_name)]
            struct User {
                #[tagmodel = "primary_key"]
                pub id: i64,
            }
        };
        let tokens = generate_model_impl(&parse_model(&input).unwrap()).to_string();
        assert!(tokens.contains("impl :: tagmodel_core :: Model for User"));
        assert!(tokens.contains("impl :: tagmodel_core :: Reflect for User"));
        assert!(tokens.contains("\"primary_key\""));
        assert!(tokens.contains("fn table_name"));
    }
}

use csvorm::schema::ModelDefinition;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::type_utils::{
    field_enum_name, field_to_rust_type, field_variant_ident, safe_field_ident, where_struct_name,
};

/// Generate the `<Model>Where` filter struct: one optional value per field,
/// set fields are AND-ed together.
pub fn generate_where_struct(model: &ModelDefinition) -> TokenStream {
    let where_ident = format_ident!("{}", where_struct_name(&model.name));

    let field_tokens: Vec<_> = model
        .fields
        .iter()
        .map(|field| {
            let ident = safe_field_ident(&field.name);
            let ty = field_to_rust_type(field.field_type);
            quote! { pub #ident: Option<#ty>, }
        })
        .collect();

    let pushes: Vec<_> = model
        .fields
        .iter()
        .map(|field| {
            let name = &field.name;
            let ident = safe_field_ident(name);
            quote! {
                if let Some(value) = self.#ident {
                    conditions.push((#name, csvorm::Value::from(value)));
                }
            }
        })
        .collect();

    quote! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #where_ident {
            #(#field_tokens)*
        }

        impl csvorm::Filter for #where_ident {
            fn into_conditions(self) -> Vec<(&'static str, csvorm::Value)> {
                let mut conditions = Vec::new();
                #(#pushes)*
                conditions
            }
        }
    }
}

/// Generate the `<Model>Field` enum naming each field, usable with `order_by`.
pub fn generate_field_enum(model: &ModelDefinition) -> TokenStream {
    let enum_ident = format_ident!("{}", field_enum_name(&model.name));
    let count = model.fields.len();

    let variants: Vec<_> = model
        .fields
        .iter()
        .map(|field| field_variant_ident(&field.name))
        .collect();
    let names: Vec<_> = model.fields.iter().map(|field| field.name.as_str()).collect();

    quote! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum #enum_ident {
            #(#variants),*
        }

        impl #enum_ident {
            pub const ALL: [#enum_ident; #count] = [#(#enum_ident::#variants),*];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    #(#enum_ident::#variants => #names),*
                }
            }
        }

        impl AsRef<str> for #enum_ident {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }
    }
}

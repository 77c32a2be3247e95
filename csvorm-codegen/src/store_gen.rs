use csvorm::schema::ModelDefinition;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::type_utils::{model_struct_name, safe_field_ident};

/// Generate the StoreExt trait with one typed table accessor per model.
pub fn generate_store_ext(models: &[&ModelDefinition]) -> TokenStream {
    let mut trait_methods = Vec::new();
    let mut impl_methods = Vec::new();

    for model in models {
        let method_ident = safe_field_ident(&model.name);
        let struct_ident = format_ident!("{}", model_struct_name(&model.name));

        trait_methods.push(quote! {
            fn #method_ident(&self) -> csvorm::Result<csvorm::Table<'_>>;
        });

        impl_methods.push(quote! {
            fn #method_ident(&self) -> csvorm::Result<csvorm::Table<'_>> {
                self.table_for::<#struct_ident>()
            }
        });
    }

    quote! {
        /// Typed table accessors for every model of this project.
        pub trait StoreExt {
            #(#trait_methods)*
        }

        impl StoreExt for csvorm::Store {
            #(#impl_methods)*
        }
    }
}

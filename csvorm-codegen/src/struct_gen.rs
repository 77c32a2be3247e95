use csvorm::schema::ModelDefinition;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::type_utils::{field_to_rust_type, field_type_path, model_struct_name, safe_field_ident};

/// Generate the data struct for a model and its `csvorm::Model` impl.
pub fn generate_model(model: &ModelDefinition) -> TokenStream {
    let struct_ident = format_ident!("{}", model_struct_name(&model.name));
    let model_name = &model.name;

    let doc_comment = if model.unique.is_empty() {
        format!(" A `{model_name}` record.")
    } else {
        format!(
            " A `{model_name}` record.\n Unique: {}",
            model.unique.join(", ")
        )
    };

    let field_tokens: Vec<_> = model
        .fields
        .iter()
        .map(|field| {
            let ident = safe_field_ident(&field.name);
            let ty = field_to_rust_type(field.field_type);
            quote! { pub #ident: #ty, }
        })
        .collect();

    let definition_fields: Vec<_> = model
        .fields
        .iter()
        .map(|field| {
            let name = &field.name;
            let ty = field_type_path(field.field_type);
            quote! { csvorm::FieldDefinition::new(#name, #ty) }
        })
        .collect();
    let unique = &model.unique;

    let to_values: Vec<_> = model
        .fields
        .iter()
        .map(|field| {
            let name = &field.name;
            let ident = safe_field_ident(name);
            quote! { (#name, csvorm::Value::from(self.#ident.clone())) }
        })
        .collect();

    let from_record: Vec<_> = model
        .fields
        .iter()
        .map(|field| {
            let name = &field.name;
            let ident = safe_field_ident(name);
            quote! { #ident: record.get_as(schema, #name)?, }
        })
        .collect();

    quote! {
        #[doc = #doc_comment]
        #[derive(Debug, Clone, PartialEq)]
        pub struct #struct_ident {
            #(#field_tokens)*
        }

        impl csvorm::Model for #struct_ident {
            fn definition() -> csvorm::ModelDefinition {
                csvorm::ModelDefinition {
                    name: #model_name.to_string(),
                    fields: vec![#(#definition_fields),*],
                    unique: vec![#(#unique.to_string()),*],
                }
            }

            fn to_values(&self) -> Vec<(&'static str, csvorm::Value)> {
                vec![#(#to_values),*]
            }

            fn from_record(
                schema: &csvorm::ModelSchema,
                record: &csvorm::Record,
            ) -> csvorm::Result<Self> {
                Ok(Self {
                    #(#from_record)*
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvorm::schema::parse_model_str;

    #[test]
    fn test_generate_model_struct() {
        let model = parse_model_str(
            "name: Car\nfields:\n  - { name: brand, type: string }\n  - { name: type, type: string }\n  - { name: doors, type: integer }\nunique: [brand]\n",
        )
        .unwrap();
        let code = generate_model(&model).to_string();

        assert!(code.contains("pub struct Car"));
        assert!(code.contains("pub r#type : String"));
        assert!(code.contains("pub doors : i64"));
        assert!(code.contains("impl csvorm :: Model for Car"));
        assert!(code.contains("Unique: brand"));
    }
}

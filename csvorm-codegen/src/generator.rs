use csvorm::schema::ModelDefinition;
use proc_macro2::TokenStream;

use crate::{filter_gen, store_gen, struct_gen};

/// Banner placed above generated code.
pub const HEADER: &str = "// @generated by csvorm-codegen from the project's model files. Do not edit.\n\n";

/// Generate every declaration for the given models, in model-name order.
pub fn generate_all(models: &[ModelDefinition]) -> TokenStream {
    let mut sorted: Vec<&ModelDefinition> = models.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut tokens = TokenStream::new();
    for model in &sorted {
        tokens.extend(struct_gen::generate_model(model));
        tokens.extend(filter_gen::generate_where_struct(model));
        tokens.extend(filter_gen::generate_field_enum(model));
    }

    tokens.extend(store_gen::generate_store_ext(&sorted));
    tokens
}

/// Pretty-print a token stream as a Rust source file.
pub fn format_token_stream(tokens: &TokenStream) -> Result<String, syn::Error> {
    let file: syn::File = syn::parse2(tokens.clone())?;
    Ok(format!("{HEADER}{}", prettyplease::unparse(&file)))
}

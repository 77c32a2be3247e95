use csvorm::schema::{FieldType, ModelDefinition};
use std::collections::HashMap;
use heck::{ToPascalCase, ToSnakeCase};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Convert a model name to its PascalCase struct name.
/// e.g. "Car" -> "Car", "line_item" -> "LineItem"
pub fn model_struct_name(model_name: &str) -> String {
    model_name.to_pascal_case()
}

/// Generate a filter struct name.
/// e.g. "Car" -> "CarWhere"
pub fn where_struct_name(model_name: &str) -> String {
    format!("{}Where", model_struct_name(model_name))
}

/// Generate a field enum name.
/// e.g. "Car" -> "CarField"
pub fn field_enum_name(model_name: &str) -> String {
    format!("{}Field", model_struct_name(model_name))
}

/// Convert a model name to a snake_case accessor method name.
/// e.g. "Car" -> "car", "LineItem" -> "line_item"
pub fn table_method_name(model_name: &str) -> String {
    model_name.to_snake_case()
}

/// Map a field type to its Rust type as a TokenStream.
pub fn field_to_rust_type(field_type: FieldType) -> TokenStream {
    match field_type {
        FieldType::String => quote! { String },
        FieldType::Integer => quote! { i64 },
        FieldType::Float => quote! { f64 },
        FieldType::Boolean => quote! { bool },
        FieldType::Date => quote! { csvorm::chrono::NaiveDate },
        FieldType::Datetime => quote! { csvorm::chrono::DateTime<csvorm::chrono::Utc> },
    }
}

/// Map a field type to the matching `csvorm::FieldType` variant path.
pub fn field_type_path(field_type: FieldType) -> TokenStream {
    let variant = format_ident!("{}", field_type.as_str().to_pascal_case());
    quote! { csvorm::FieldType::#variant }
}

/// Field identifier for a struct field. Keywords use raw identifier syntax,
/// except those that cannot be raw identifiers, which get a trailing underscore.
pub fn safe_field_ident(name: &str) -> proc_macro2::Ident {
    let snake = name.to_snake_case();
    match snake.as_str() {
        "self" | "super" | "crate" => format_ident!("{}_", snake),
        "type" | "struct" | "enum" | "fn" | "let" | "mut" | "ref" | "mod" | "use" | "pub"
        | "impl" | "trait" | "for" | "loop" | "while" | "if" | "else" | "match" | "return"
        | "break" | "continue" | "as" | "in" | "where" | "async" | "await" | "dyn" | "move"
        | "static" | "const" | "unsafe" | "extern" | "true" | "false" | "abstract"
        | "become" | "box" | "do" | "final" | "macro" | "override" | "priv" | "typeof"
        | "unsized" | "virtual" | "yield" | "try" | "gen" => format_ident!("r#{}", snake),
        _ => format_ident!("{}", snake),
    }
}

/// Enum variant for a field name.
pub fn field_variant_ident(name: &str) -> proc_macro2::Ident {
    match name.to_pascal_case().as_str() {
        "Self" => format_ident!("Self_"),
        pascal => format_ident!("{}", pascal),
    }
}

/// Whether `name` can be emitted as a Rust identifier once keywords have been
/// escaped. Rejects the empty string, `_`, and names starting with a digit.
fn is_ident_text(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => true,
        Some('_') => name.len() > 1,
        _ => false,
    };
    valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Record the identifier `convert` produces for `source` in `seen`, failing
/// when the converted text is not a usable identifier or when another source
/// name already produced the same identifier.
fn claim(
    seen: &mut HashMap<String, String>,
    kind: &str,
    source: &str,
    converted: String,
    emit: fn(&str) -> proc_macro2::Ident,
) -> Result<(), String> {
    if !is_ident_text(&converted) {
        return Err(format!(
            "{kind} '{source}' converts to '{converted}', which is not a valid Rust identifier"
        ));
    }
    let ident = emit(source).to_string();
    if let Some(previous) = seen.insert(ident.clone(), source.to_string()) {
        return Err(format!(
            "{kind}s '{previous}' and '{source}' both convert to '{ident}'"
        ));
    }
    Ok(())
}

fn struct_ident(model_name: &str) -> proc_macro2::Ident {
    format_ident!("{}", model_struct_name(model_name))
}

/// Check that every name in `models` converts to a distinct, valid Rust
/// identifier in each place the generator uses it.
pub fn check_identifiers(models: &[ModelDefinition]) -> Result<(), String> {
    let mut structs = HashMap::new();
    let mut methods = HashMap::new();

    for model in models {
        let struct_name = model_struct_name(&model.name);
        if struct_name == "Self" {
            return Err(format!("Model name '{}' cannot be used as a type name", model.name));
        }
        claim(&mut structs, "Model name", &model.name, struct_name, struct_ident)?;
        claim(
            &mut methods,
            "Model name",
            &model.name,
            table_method_name(&model.name),
            safe_field_ident,
        )?;

        let mut fields = HashMap::new();
        let mut variants = HashMap::new();
        for field in &model.fields {
            claim(
                &mut fields,
                "Field name",
                &field.name,
                field.name.to_snake_case(),
                safe_field_ident,
            )?;
            claim(
                &mut variants,
                "Field name",
                &field.name,
                field.name.to_pascal_case(),
                field_variant_ident,
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(model_struct_name("Car"), "Car");
        assert_eq!(model_struct_name("line_item"), "LineItem");
        assert_eq!(where_struct_name("Car"), "CarWhere");
        assert_eq!(field_enum_name("User"), "UserField");
        assert_eq!(table_method_name("LineItem"), "line_item");
    }

    #[test]
    fn test_field_types() {
        assert_eq!(field_to_rust_type(FieldType::Integer).to_string(), "i64");
        assert_eq!(
            field_type_path(FieldType::Datetime).to_string(),
            quote! { csvorm::FieldType::Datetime }.to_string()
        );
    }

    #[test]
    fn test_safe_field_ident() {
        assert_eq!(safe_field_ident("type").to_string(), "r#type");
        assert_eq!(safe_field_ident("self").to_string(), "self_");
        assert_eq!(safe_field_ident("name").to_string(), "name");
        assert_eq!(safe_field_ident("nationalId").to_string(), "national_id");
    }

    #[test]
    fn test_field_variant_ident() {
        assert_eq!(field_variant_ident("national_id").to_string(), "NationalId");
        assert_eq!(field_variant_ident("self").to_string(), "Self_");
    }

    fn model(name: &str, fields: &[&str]) -> ModelDefinition {
        ModelDefinition {
            name: name.into(),
            fields: fields
                .iter()
                .map(|f| csvorm::FieldDefinition::new(*f, FieldType::String))
                .collect(),
            unique: vec![],
        }
    }

    #[test]
    fn test_check_identifiers_accepts_keywords_and_plain_names() {
        assert!(check_identifiers(&[model("Car", &["type", "self", "brand_name"])]).is_ok());
    }

    #[test]
    fn test_check_identifiers_rejects_names_that_vanish() {
        assert!(check_identifiers(&[model("Car", &["_1"])]).is_err());
        assert!(check_identifiers(&[model("Car", &["_"])]).is_err());
        assert!(check_identifiers(&[model("_", &["brand"])]).is_err());
    }

    #[test]
    fn test_check_identifiers_rejects_collisions() {
        let err = check_identifiers(&[model("Car", &["fooBar", "foo_bar"])]).unwrap_err();
        assert!(err.contains("foo_bar"));
        assert!(check_identifiers(&[model("line_item", &["a"]), model("LineItem", &["a"])]).is_err());
        assert!(check_identifiers(&[model("Car", &["self", "self_"])]).is_err());
    }
}

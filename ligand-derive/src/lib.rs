use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod describe;

/// Derive macro for the `Describe` trait.
///
/// Generates `type_name()`, `describe()`, `allocate()` and `assign()` from the
/// struct's named fields, plus a `Validate` impl.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use ligand_core::{Backref, Describe};
///
/// #[derive(Debug, Describe)]
/// struct Author {
///     name: String,
///     #[ligand(elements = Arc<Book>)]
///     books: Vec<Arc<Book>>,
/// }
///
/// #[derive(Debug, Describe)]
/// struct Book {
///     title: String,
///     author: Backref<Author>,
/// }
/// ```
///
/// # Struct attributes
///
/// - `#[ligand(default)]` - Allocate through `Default`; every field becomes optional
/// - `#[ligand(rename = "Name")]` - Type name used for inverse-relation keys
/// - `#[ligand(cast_with = Path)]` - Caster applied to fields declared with this type
/// - `#[ligand(injected)]` - The type-level caster has no `Default` and must be registered
/// - `#[ligand(validate = path)]` - `fn(&Self) -> Vec<Violation>` run after mapping
///
/// # Field attributes
///
/// - `#[ligand(default)]` / `#[ligand(default = expr)]` - Field may be absent from the source
/// - `#[ligand(rename = "key")]` - Source key to read
/// - `#[ligand(cast_with = Path)]` - Field-level caster, wins over the type-level one
/// - `#[ligand(injected)]` - The field-level caster must be registered in the injector
/// - `#[ligand(elements = Type)]` - Element type of a list of nested objects
/// - `#[ligand(date_format = "...")]` - Format description for the date/time caster
/// - `#[ligand(skip)]` - Not mapped; initialised with `Default::default()`
#[proc_macro_derive(Describe, attributes(ligand))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match describe::derive_describe_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
pub(crate) struct TypeAttrs {
    pub default: bool,
    pub rename: Option<String>,
    pub cast_with: Option<syn::Path>,
    pub injected: bool,
    pub validate: Option<syn::Path>,
}

pub(crate) fn parse_type_attrs(attrs: &[syn::Attribute]) -> syn::Result<TypeAttrs> {
    let mut result = TypeAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("ligand") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                result.default = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("cast_with") {
                result.cast_with = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("injected") {
                result.injected = true;
            } else if meta.path.is_ident("validate") {
                result.validate = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unknown ligand type attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

pub(crate) enum FieldDefault {
    None,
    Default,
    Expr(syn::Expr),
}

pub(crate) struct FieldAttrs {
    pub skip: bool,
    pub rename: Option<String>,
    pub default: FieldDefault,
    pub cast_with: Option<syn::Path>,
    pub injected: bool,
    pub elements: Option<syn::Type>,
    pub date_format: Option<syn::LitStr>,
}

impl Default for FieldAttrs {
    fn default() -> Self {
        FieldAttrs {
            skip: false,
            rename: None,
            default: FieldDefault::None,
            cast_with: None,
            injected: false,
            elements: None,
            date_format: None,
        }
    }
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("ligand") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("default") {
                result.default = if meta.input.peek(syn::Token![=]) {
                    FieldDefault::Expr(meta.value()?.parse()?)
                } else {
                    FieldDefault::Default
                };
            } else if meta.path.is_ident("cast_with") {
                result.cast_with = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("injected") {
                result.injected = true;
            } else if meta.path.is_ident("elements") {
                result.elements = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("date_format") {
                result.date_format = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unknown ligand field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

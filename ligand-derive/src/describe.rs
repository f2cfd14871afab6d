use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::{parse_field_attrs, parse_type_attrs, FieldAttrs, FieldDefault, TypeAttrs};

struct MappedField<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    key: String,
    attrs: FieldAttrs,
}

pub fn derive_describe_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Describe cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            syn::Fields::Unit => Vec::new(),
            syn::Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Describe requires named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Describe can only be derived for structs",
            ));
        }
    };

    let type_attrs = parse_type_attrs(&input.attrs)?;
    if type_attrs.injected && type_attrs.cast_with.is_none() {
        return Err(syn::Error::new_spanned(
            name,
            "`injected` requires `cast_with`",
        ));
    }

    let mut mapped = Vec::new();
    let mut skipped = Vec::new();
    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if attrs.injected && attrs.cast_with.is_none() {
            return Err(syn::Error::new_spanned(
                ident,
                "`injected` requires `cast_with`",
            ));
        }
        if attrs.skip {
            skipped.push(ident);
            continue;
        }
        let key = attrs.rename.clone().unwrap_or_else(|| ident.to_string());
        mapped.push(MappedField {
            ident,
            ty: &field.ty,
            key,
            attrs,
        });
    }

    let type_name = type_attrs.rename.clone().unwrap_or_else(|| name.to_string());
    let describe_impl = generate_describe(&type_name, &type_attrs, &mapped);
    let allocate_impl = generate_allocate(name, &type_attrs, &mapped, &skipped);
    let assign_impl = generate_assign(&mapped);
    let validate_impl = generate_validate(name, &type_attrs);

    Ok(quote! {
        impl ::ligand_core::Describe for #name {
            fn type_name() -> &'static str {
                #type_name
            }

            #describe_impl
            #allocate_impl
            #assign_impl
        }

        #validate_impl
    })
}

fn binding(cast_with: &syn::Path, injected: bool) -> TokenStream {
    if injected {
        quote! { ::ligand_core::CasterBinding::injected::<#cast_with>() }
    } else {
        quote! { ::ligand_core::CasterBinding::of::<#cast_with>() }
    }
}

fn generate_describe(type_name: &str, type_attrs: &TypeAttrs, fields: &[MappedField]) -> TokenStream {
    let type_caster = type_attrs.cast_with.as_ref().map(|path| {
        let binding = binding(path, type_attrs.injected);
        quote! { .with_caster(#binding) }
    });

    let field_descriptors = fields.iter().map(|field| {
        let key = &field.key;
        let declared = match &field.attrs.elements {
            Some(element) => quote! {
                ::ligand_core::DeclaredType::list_of(<#element as ::ligand_core::Slot>::declared())
            },
            None => {
                let ty = field.ty;
                quote! { <#ty as ::ligand_core::Slot>::declared() }
            }
        };

        let caster = field.attrs.cast_with.as_ref().map(|path| {
            let binding = binding(path, field.attrs.injected);
            quote! { .with_caster(#binding) }
        });

        // A declared default is more specific than the constructor one.
        let default = match (&field.attrs.default, type_attrs.default) {
            (FieldDefault::None, false) => None,
            (FieldDefault::None, true) => {
                Some(quote! { .with_default(::ligand_core::DefaultSource::Constructor) })
            }
            _ => Some(quote! { .with_default(::ligand_core::DefaultSource::Declared) }),
        };

        let date_format = field
            .attrs
            .date_format
            .as_ref()
            .map(|format| quote! { .with_date_format(#format) });

        quote! {
            .field(
                ::ligand_core::FieldDescriptor::new(#key, #declared)
                    #caster
                    #default
                    #date_format
            )
        }
    });

    quote! {
        fn describe() -> ::ligand_core::TypeDescriptor {
            ::ligand_core::TypeDescriptor::new(#type_name)
                #type_caster
                #(#field_descriptors)*
        }
    }
}

fn generate_allocate(
    name: &syn::Ident,
    type_attrs: &TypeAttrs,
    fields: &[MappedField],
    skipped: &[&syn::Ident],
) -> TokenStream {
    if type_attrs.default {
        // Declared field defaults still apply on top of the constructor.
        let overrides = fields.iter().filter_map(|field| {
            let ident = field.ident;
            match &field.attrs.default {
                FieldDefault::Expr(expr) => Some(quote! { instance.#ident = #expr; }),
                FieldDefault::Default | FieldDefault::None => None,
            }
        });
        return quote! {
            fn allocate() -> Self {
                #[allow(unused_mut)]
                let mut instance = <Self as ::std::default::Default>::default();
                #(#overrides)*
                instance
            }
        };
    }

    let initialisers = fields.iter().map(|field| {
        let ident = field.ident;
        let ty = field.ty;
        let value = match &field.attrs.default {
            FieldDefault::Expr(expr) => quote! { #expr },
            FieldDefault::Default => quote! { ::std::default::Default::default() },
            FieldDefault::None => quote! { <#ty as ::ligand_core::Slot>::vacant() },
        };
        quote! { #ident: #value }
    });
    let skipped = skipped
        .iter()
        .map(|ident| quote! { #ident: ::std::default::Default::default() });

    quote! {
        fn allocate() -> Self {
            #name {
                #(#initialisers,)*
                #(#skipped,)*
            }
        }
    }
}

fn generate_assign(fields: &[MappedField]) -> TokenStream {
    if fields.is_empty() {
        return quote! {
            fn assign(
                &mut self,
                field: &str,
                _value: ::ligand_core::Value,
            ) -> ::std::result::Result<(), ::ligand_core::CastError> {
                ::std::result::Result::Err(::ligand_core::CastError::UnknownField(field.to_string()))
            }
        };
    }

    let arms = fields.iter().map(|field| {
        let ident = field.ident;
        let ty = field.ty;
        let key = &field.key;
        quote! {
            #key => self.#ident = <#ty as ::ligand_core::Slot>::from_value(value)?,
        }
    });

    quote! {
        fn assign(
            &mut self,
            field: &str,
            value: ::ligand_core::Value,
        ) -> ::std::result::Result<(), ::ligand_core::CastError> {
            match field {
                #(#arms)*
                _ => {
                    return ::std::result::Result::Err(
                        ::ligand_core::CastError::UnknownField(field.to_string()),
                    );
                }
            }
            ::std::result::Result::Ok(())
        }
    }
}

fn generate_validate(name: &syn::Ident, type_attrs: &TypeAttrs) -> TokenStream {
    match &type_attrs.validate {
        Some(path) => quote! {
            impl ::ligand_core::Validate for #name {
                fn violations(&self) -> ::std::vec::Vec<::ligand_core::Violation> {
                    #path(self)
                }
            }
        },
        None => quote! {
            impl ::ligand_core::Validate for #name {}
        },
    }
}

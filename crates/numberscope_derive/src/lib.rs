extern crate quote;
extern crate syn;

extern crate proc_macro;

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Attribute, LitStr, Token, parse::Parser, punctuated::Punctuated};
use syn::{Data, DeriveInput, Fields, Path};

fn unwrap_attr(attrs: &[Attribute], ident: &str) -> Option<TokenStream2> {
    attrs
        .iter()
        .find(|attr| attr.path().is_ident(ident))
        .and_then(|attr| {
            if let syn::Meta::List(list) = &attr.meta {
                Some(list.tokens.clone())
            } else {
                None
            }
        })
}

fn unwrap_name_description(
    attrs: &[Attribute],
    ident: &str,
) -> syn::Result<(Option<LitStr>, Option<LitStr>)> {
    let attr = match unwrap_attr(attrs, ident) {
        Some(tokens) => Punctuated::<LitStr, Token![,]>::parse_terminated.parse2(tokens)?,
        None => Punctuated::new(),
    };
    let mut iter = attr.iter();
    let name = iter.next().cloned();
    let description = iter.next().cloned();
    Ok((name, description))
}

/// Implements `KindInfo` from `#[kind("Display Name", "description")]`.
#[proc_macro_derive(Kind, attributes(kind))]
pub fn kind_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(e) => return e.to_compile_error().into(),
    };
    impl_kind_macro(&ast)
}

fn impl_kind_macro(ast: &DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let (display, description) = match unwrap_name_description(&ast.attrs, "kind") {
        Ok(parsed) => parsed,
        Err(e) => return e.to_compile_error().into(),
    };
    let Some(display) = display else {
        return syn::Error::new(Span::call_site(), "Missing #[kind(\"name\", ...)] attribute")
            .to_compile_error()
            .into();
    };
    let description = description.map(|d| d.value()).unwrap_or_default();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let generated = quote! {
        impl #impl_generics crate::types::KindInfo for #name #ty_generics #where_clause {
            const NAME: &'static str = #display;
            const DESCRIPTION: &'static str = #description;
        }
    };
    generated.into()
}

/// Implements `ParamField` for a fieldless enum so it can be used as an
/// enumerated parameter. Options are the variant names in declaration order.
#[proc_macro_derive(ParamEnum)]
pub fn param_enum_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(e) => return e.to_compile_error().into(),
    };
    impl_param_enum_macro(&ast)
}

fn impl_param_enum_macro(ast: &DeriveInput) -> TokenStream {
    let name = &ast.ident;

    let data_enum = match &ast.data {
        Data::Enum(e) => e,
        Data::Struct(_) | Data::Union(_) => {
            return syn::Error::new(Span::call_site(), "ParamEnum can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let mut options: Vec<String> = Vec::new();
    let mut from_arms: Vec<TokenStream2> = Vec::new();
    let mut name_arms: Vec<TokenStream2> = Vec::new();
    for v in &data_enum.variants {
        if !matches!(v.fields, Fields::Unit) {
            return syn::Error::new_spanned(v, "ParamEnum variants cannot carry data")
                .to_compile_error()
                .into();
        }
        let v_ident = &v.ident;
        let option = v_ident.to_string();
        from_arms.push(quote!(#option => Some(Self::#v_ident)));
        name_arms.push(quote!(Self::#v_ident => #option));
        options.push(option);
    }

    let generated = quote! {
        impl crate::params::ParamField for #name {
            const KIND: crate::params::ParamKind = crate::params::ParamKind::Enum;
            const OPTIONS: &'static [&'static str] = &[#(#options),*];

            fn from_value(value: &crate::params::ParamValue) -> Option<Self> {
                match value {
                    crate::params::ParamValue::Enum(option) => match option.as_str() {
                        #( #from_arms, )*
                        _ => None,
                    },
                    _ => None,
                }
            }
        }

        impl #name {
            pub fn option_name(&self) -> &'static str {
                match self {
                    #( #name_arms, )*
                }
            }
        }
    };
    generated.into()
}

#[derive(Default)]
struct ParamAttr {
    rename: Option<LitStr>,
    display: Option<LitStr>,
    description: Option<LitStr>,
    default: Option<LitStr>,
    required: bool,
    validate: Option<Path>,
    symbols: Option<Path>,
    visible_if: Option<LitStr>,
    visible_value: Option<LitStr>,
    visible_predicate: Option<Path>,
}

/// Parse field attributes of the form
/// `#[param(display = "..", default = "..", required, validate = path, ...)]`
fn parse_param_attr(attrs: &[Attribute]) -> syn::Result<ParamAttr> {
    let mut parsed = ParamAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("required") {
                parsed.required = true;
                return Ok(());
            }
            let key = meta
                .path
                .get_ident()
                .map(|ident| ident.to_string())
                .unwrap_or_default();
            match key.as_str() {
                "rename" => parsed.rename = Some(meta.value()?.parse()?),
                "display" => parsed.display = Some(meta.value()?.parse()?),
                "description" => parsed.description = Some(meta.value()?.parse()?),
                "default" => parsed.default = Some(meta.value()?.parse()?),
                "validate" => parsed.validate = Some(meta.value()?.parse()?),
                "symbols" => parsed.symbols = Some(meta.value()?.parse()?),
                "visible_if" => parsed.visible_if = Some(meta.value()?.parse()?),
                "visible_value" => parsed.visible_value = Some(meta.value()?.parse()?),
                "visible_predicate" => parsed.visible_predicate = Some(meta.value()?.parse()?),
                _ => return Err(meta.error("unsupported param attribute")),
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

/// Derives `ParamSet`: the parameter schema of a settings struct plus the
/// constructor that reads the typed fields back out of resolved settings.
#[proc_macro_derive(Params, attributes(param))]
pub fn params_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(e) => return e.to_compile_error().into(),
    };
    match impl_params_macro(&ast) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn impl_params_macro(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &ast.ident;
    let fields = match &ast.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => &named.named,
            Fields::Unit => {
                return Ok(quote! {
                    impl crate::params::ParamSet for #name {
                        fn schema() -> Vec<crate::params::ParamSchema> {
                            Vec::new()
                        }

                        fn from_settings(
                            _settings: &crate::params::Settings,
                        ) -> Result<Self, crate::params::ParamError> {
                            Ok(#name)
                        }
                    }
                });
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "Params requires named fields",
                ));
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new(
                Span::call_site(),
                "Params can only be derived for structs",
            ));
        }
    };

    let mut schema_entries: Vec<TokenStream2> = Vec::new();
    let mut field_inits: Vec<TokenStream2> = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let attr = parse_param_attr(&field.attrs)?;

        let param_name = attr
            .rename
            .map(|lit| lit.value())
            .unwrap_or_else(|| ident.to_string().to_case(Case::Camel));
        let display = attr
            .display
            .map(|lit| lit.value())
            .unwrap_or_else(|| ident.to_string().to_case(Case::Title));
        let description = attr.description.map(|lit| lit.value()).unwrap_or_default();
        let default = attr.default.map(|lit| lit.value()).unwrap_or_default();
        let required = attr.required;

        let validate = match attr.validate {
            Some(path) => quote!(Some(#path)),
            None => quote!(None),
        };
        let symbols = match attr.symbols {
            Some(path) => quote!(#path),
            None => quote!(&[]),
        };
        let visibility = match (attr.visible_if, attr.visible_value, attr.visible_predicate) {
            (Some(dependency), Some(value), None) => quote! {
                Some(crate::params::Visibility {
                    dependency: #dependency,
                    when: crate::params::VisibleWhen::Equals(#value),
                })
            },
            (Some(dependency), None, Some(predicate)) => quote! {
                Some(crate::params::Visibility {
                    dependency: #dependency,
                    when: crate::params::VisibleWhen::Predicate(#predicate),
                })
            },
            (None, None, None) => quote!(None),
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "visible_if needs exactly one of visible_value or visible_predicate",
                ));
            }
        };

        schema_entries.push(quote! {
            crate::params::ParamSchema {
                name: #param_name,
                kind: <#ty as crate::params::ParamField>::KIND,
                display_name: #display,
                description: #description,
                default: #default,
                required: #required,
                validate: #validate,
                visibility: #visibility,
                options: <#ty as crate::params::ParamField>::OPTIONS,
                symbols: #symbols,
            }
        });
        field_inits.push(quote! {
            #ident: settings.field::<#ty>(#param_name)?
        });
    }

    Ok(quote! {
        impl crate::params::ParamSet for #name {
            fn schema() -> Vec<crate::params::ParamSchema> {
                vec![ #( #schema_entries, )* ]
            }

            fn from_settings(
                settings: &crate::params::Settings,
            ) -> Result<Self, crate::params::ParamError> {
                Ok(Self {
                    #( #field_inits, )*
                })
            }
        }
    })
}

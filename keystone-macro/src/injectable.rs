use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, GenericArgument, PathArguments, Type, parse_macro_input};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable))]
struct InjectableArgs {
    #[darling(default)]
    scope: Option<String>,
}

#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectArgs {
    #[darling(default)]
    token: Option<String>,
    #[darling(default)]
    optional: bool,
}

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate_injectable_impl(&input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.write_errors().into(),
    }
}

enum Injection {
    Required,
    Optional,
    Default,
}

fn generate_injectable_impl(input: &DeriveInput) -> darling::Result<TokenStream2> {
    let args = InjectableArgs::from_derive_input(input)?;
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let scope = match args.scope.as_deref() {
        None => None,
        Some("default" | "singleton") => Some(quote!(::keystone::Scope::Default)),
        Some("request") => Some(quote!(::keystone::Scope::Request)),
        Some("transient") => Some(quote!(::keystone::Scope::Transient)),
        Some(other) => {
            return Err(darling::Error::custom(format!(
                "unknown scope `{other}`, expected default, request or transient"
            ))
            .with_span(&input.ident));
        }
    };
    let scope_fn = scope.map(|scope| {
        quote! {
            fn scope() -> ::keystone::Scope {
                #scope
            }
        }
    });

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(
                darling::Error::custom("#[derive(Injectable)] can only be applied to structs")
                    .with_span(&input.ident),
            );
        }
    };

    let named = match fields {
        Fields::Named(fields) => &fields.named,
        Fields::Unit => {
            return Ok(quote! {
                impl #impl_generics ::keystone::Injectable for #struct_name #ty_generics #where_clause {
                    #scope_fn

                    fn construct(_: &::keystone::Dependencies) -> ::keystone::Result<Self> {
                        Ok(Self)
                    }
                }
            });
        }
        Fields::Unnamed(_) => {
            return Err(darling::Error::custom(
                "#[derive(Injectable)] only supports structs with named fields",
            )
            .with_span(&input.ident));
        }
    };

    let mut dependencies = Vec::new();
    let mut initializers = Vec::new();
    for field in named {
        let inject = InjectArgs::from_field(field)?;
        let field_name = &field.ident;

        let (injection, inner) = match (option_inner(&field.ty).and_then(arc_inner), arc_inner(&field.ty)) {
            (Some(inner), _) => (Injection::Optional, Some(inner)),
            (None, Some(_)) if inject.optional => {
                return Err(darling::Error::custom("optional dependencies must be `Option<Arc<..>>`")
                    .with_span(&field.ty));
            }
            (None, Some(inner)) => (Injection::Required, Some(inner)),
            (None, None) => (Injection::Default, None),
        };

        let Some(inner) = inner else {
            initializers.push(quote!(#field_name: ::std::default::Default::default()));
            continue;
        };

        let index = dependencies.len();
        let token = match &inject.token {
            Some(token) => quote!(::keystone::Dependency::token(#token)),
            None => quote!(::keystone::Dependency::of::<#inner>()),
        };
        let is_dyn = matches!(inner, Type::TraitObject(_));
        let (dependency, accessor) = match (injection, is_dyn) {
            (Injection::Optional, false) => (quote!(#token.optional()), quote!(optional::<#inner>)),
            (Injection::Optional, true) => (quote!(#token.optional()), quote!(optional_dyn::<#inner>)),
            (_, false) => (token, quote!(get::<#inner>)),
            (_, true) => (token, quote!(get_dyn::<#inner>)),
        };
        dependencies.push(dependency);
        initializers.push(quote!(#field_name: dependencies.#accessor(#index)?));
    }

    Ok(quote! {
        impl #impl_generics ::keystone::Injectable for #struct_name #ty_generics #where_clause {
            #scope_fn

            fn dependencies() -> ::std::vec::Vec<::keystone::Dependency> {
                ::std::vec![#(#dependencies),*]
            }

            fn construct(dependencies: &::keystone::Dependencies) -> ::keystone::Result<Self> {
                Ok(Self {
                    #(#initializers),*
                })
            }
        }
    })
}

/// `T` from `Wrapper<T>` when the last path segment is `wrapper`.
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn arc_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Arc")
}

fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

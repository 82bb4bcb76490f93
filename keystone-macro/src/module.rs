use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Ident, ItemStruct, LitBool, LitStr, Path, Token, Type, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

struct ModuleItem {
    attrs: Vec<Attribute>,
    path: Path,
}

impl Parse for ModuleItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let path = input.parse()?;
        Ok(ModuleItem { attrs, path })
    }
}

/// `Module` or `forward(Module)`
struct ImportItem {
    attrs: Vec<Attribute>,
    path: Path,
    forward: bool,
}

impl Parse for ImportItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let path: Path = input.parse()?;
        if path.is_ident("forward") && input.peek(syn::token::Paren) {
            let content;
            syn::parenthesized!(content in input);
            return Ok(ImportItem {
                attrs,
                path: content.parse()?,
                forward: true,
            });
        }
        Ok(ImportItem {
            attrs,
            path,
            forward: false,
        })
    }
}

/// Represents a trait binding: (dyn Trait => Impl)
struct BindingItem {
    trait_type: Type,
    impl_type: Path,
}

impl Parse for BindingItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let content;
        syn::parenthesized!(content in input);

        let trait_type: Type = content.parse()?;
        content.parse::<Token![=>]>()?;
        let impl_type: Path = content.parse()?;

        Ok(BindingItem {
            trait_type,
            impl_type,
        })
    }
}

/// A provider or module type, or a string token.
enum ExportItem {
    Type(Path),
    Named(LitStr),
}

impl Parse for ExportItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            Ok(ExportItem::Named(input.parse()?))
        } else {
            Ok(ExportItem::Type(input.parse()?))
        }
    }
}

#[derive(Default)]
struct ModuleArgs {
    imports: Vec<ImportItem>,
    controllers: Vec<ModuleItem>,
    providers: Vec<ModuleItem>,
    bindings: Vec<BindingItem>,
    exports: Vec<ExportItem>,
    global: bool,
    configure: Option<Path>,
}

impl Parse for ModuleArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ModuleArgs::default();

        while !input.is_empty() {
            let name: Ident = input.parse()?;

            if name == "global" && !input.peek(Token![=]) {
                args.global = true;
            } else {
                input.parse::<Token![=]>()?;
                match name.to_string().as_str() {
                    "global" => args.global = input.parse::<LitBool>()?.value,
                    "configure" => args.configure = Some(input.parse()?),
                    list => {
                        let content;
                        syn::bracketed!(content in input);
                        match list {
                            "imports" => {
                                args.imports = content
                                    .parse_terminated(ImportItem::parse, Token![,])?
                                    .into_iter()
                                    .collect()
                            }
                            "controllers" => {
                                args.controllers = content
                                    .parse_terminated(ModuleItem::parse, Token![,])?
                                    .into_iter()
                                    .collect()
                            }
                            "providers" => {
                                args.providers = content
                                    .parse_terminated(ModuleItem::parse, Token![,])?
                                    .into_iter()
                                    .collect()
                            }
                            "bindings" => {
                                args.bindings = content
                                    .parse_terminated(BindingItem::parse, Token![,])?
                                    .into_iter()
                                    .collect()
                            }
                            "exports" => {
                                args.exports = content
                                    .parse_terminated(ExportItem::parse, Token![,])?
                                    .into_iter()
                                    .collect()
                            }
                            _ => {
                                return Err(syn::Error::new(
                                    name.span(),
                                    format!("unknown module option `{name}`"),
                                ));
                            }
                        }
                    }
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

pub fn module_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ModuleArgs);
    let input = parse_macro_input!(item as ItemStruct);
    let expanded = generate_module_impl(&args, &input);

    TokenStream::from(expanded)
}

fn generate_module_impl(args: &ModuleArgs, input: &ItemStruct) -> TokenStream2 {
    let module_name = &input.ident;
    let display_name = module_name.to_string();

    let imports = args.imports.iter().map(|item| {
        let path = &item.path;
        let attrs = &item.attrs;
        if item.forward {
            quote! {
                #(#attrs)*
                let def = def.import(::keystone::ModuleImport::forward(|| {
                    ::std::option::Option::Some(<#path as ::keystone::Module>::module())
                }));
            }
        } else {
            quote! {
                #(#attrs)*
                let def = def.import(<#path as ::keystone::Module>::module());
            }
        }
    });

    let bindings = args.bindings.iter().map(|binding| {
        let trait_type = &binding.trait_type;
        let impl_type = &binding.impl_type;
        quote! {
            let def = def.provider(::keystone::ProviderDef::bind::<#trait_type, #impl_type>(
                |inner: ::std::sync::Arc<#impl_type>| -> ::std::sync::Arc<#trait_type> { inner },
            ));
        }
    });

    let providers = args.providers.iter().map(|item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            let def = def.provider(::keystone::ProviderDef::class::<#path>());
        }
    });

    let controllers = args.controllers.iter().map(|item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            let def = def.controller(<#path as ::keystone::Controller>::controller());
        }
    });

    let exports = args.exports.iter().map(|item| match item {
        ExportItem::Type(path) => quote! {
            let def = def.export(::keystone::Token::of::<#path>());
        },
        ExportItem::Named(token) => quote! {
            let def = def.export(::keystone::Token::named(#token));
        },
    });

    let global = args.global.then(|| quote!(let def = def.global();));
    let configure = args.configure.as_ref().map(|path| {
        quote!(let def = def.configure(#path);)
    });

    quote! {
        #input

        impl ::keystone::Module for #module_name {
            fn module() -> ::keystone::ModuleRef {
                static MODULE: ::std::sync::OnceLock<::keystone::ModuleRef> = ::std::sync::OnceLock::new();
                MODULE
                    .get_or_init(|| {
                        let def = ::keystone::ModuleDef::with_key(
                            ::std::any::type_name::<#module_name>(),
                            #display_name,
                        );
                        #(#imports)*
                        #(#bindings)*
                        #(#providers)*
                        #(#controllers)*
                        #(#exports)*
                        #global
                        #configure
                        def.build()
                    })
                    .clone()
            }
        }
    }
}

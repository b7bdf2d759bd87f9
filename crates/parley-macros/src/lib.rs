//! `#[remote_pair]`: declares a remote interface pair.
//!
//! ```ignore
//! #[parley::remote_pair(Worker)]
//! mod split_rpc {
//!     use parley::Callback;
//!
//!     #[route("split_worker")]
//!     pub trait Worker {
//!         fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>);
//!     }
//!
//!     pub trait Host {
//!         fn split_done(&self, callback: Callback<Vec<String>>, parts: Vec<String>);
//!     }
//! }
//! ```
//!
//! Every trait named in the attribute is proxied; the other trait of the
//! module is its peer. Listing both traits generates a unit for each side.

use parley_codegen::{
    generate, strip_helper_attributes, CodegenOptions, CompilerCapabilities, RemoteInterfacePair,
    SerdeSynthesis, SyntacticIntrospection, TokenEmitter,
};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{quote, ToTokens};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Ident, Item, ItemMod, ItemTrait, Token};

#[proc_macro_attribute]
pub fn remote_pair(attr: TokenStream, item: TokenStream) -> TokenStream {
    let selves = match Punctuated::<Ident, Token![,]>::parse_terminated.parse(attr) {
        Ok(selves) => selves.into_iter().collect::<Vec<_>>(),
        Err(err) => {
            let err = err.to_compile_error();
            let item = TokenStream2::from(item);
            return quote!(#err #item).into();
        }
    };
    let module = syn::parse_macro_input!(item as ItemMod);
    expand(&selves, module).into()
}

/// Expands the annotated module. On failure the module is still emitted,
/// stripped of helper attributes, next to the error.
fn expand(selves: &[Ident], mut module: ItemMod) -> TokenStream2 {
    let generated = generate_units(selves, &module);
    strip_module(&mut module);
    match generated {
        Ok(tokens) => {
            if let Some((_, items)) = &mut module.content {
                items.push(Item::Verbatim(tokens));
            }
            module.into_token_stream()
        }
        Err(err) => {
            let err = err.to_compile_error();
            quote!(#err #module)
        }
    }
}

fn generate_units(selves: &[Ident], module: &ItemMod) -> syn::Result<TokenStream2> {
    let Some((_, items)) = &module.content else {
        return Err(syn::Error::new(
            module.span(),
            "#[remote_pair] needs an inline module: `mod name { ... }`",
        ));
    };

    let traits: Vec<&ItemTrait> = items
        .iter()
        .filter_map(|item| match item {
            Item::Trait(item) => Some(item),
            _ => None,
        })
        .collect();
    let [first, second] = traits.as_slice() else {
        return Err(syn::Error::new(
            module.ident.span(),
            format!(
                "#[remote_pair] module `{}` must declare exactly two traits, found {}",
                module.ident,
                traits.len()
            ),
        ));
    };

    if selves.is_empty() {
        return Err(syn::Error::new(
            Span::call_site(),
            "#[remote_pair] expects the proxied interface, e.g. `#[remote_pair(Worker)]`",
        ));
    }

    let introspection = SyntacticIntrospection::from_items(items);
    let options = CodegenOptions::default();
    let mut emitter = TokenEmitter::new();

    for (position, name) in selves.iter().enumerate() {
        if selves[..position].contains(name) {
            return Err(syn::Error::new(
                name.span(),
                format!("`{name}` is listed twice"),
            ));
        }
        let (self_interface, peer_interface) = if first.ident == *name {
            (*first, *second)
        } else if second.ident == *name {
            (*second, *first)
        } else {
            return Err(syn::Error::new(
                name.span(),
                format!("`{name}` is not a trait of module `{}`", module.ident),
            ));
        };

        let pair = RemoteInterfacePair {
            module: module.ident.clone(),
            self_interface: self_interface.clone(),
            peer_interface: peer_interface.clone(),
        };
        let mut caps = CompilerCapabilities {
            introspection: &introspection,
            synthesis: &SerdeSynthesis,
            emission: &mut emitter,
            options: &options,
        };
        generate(&pair, &mut caps)?;
    }

    Ok(emitter.into_tokens())
}

fn strip_module(module: &mut ItemMod) {
    if let Some((_, items)) = &mut module.content {
        for item in items {
            if let Item::Trait(item) = item {
                strip_helper_attributes(item);
            }
        }
    }
}

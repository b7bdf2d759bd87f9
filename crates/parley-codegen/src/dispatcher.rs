//! Dispatcher Generator.
//!
//! One `Dispatcher` impl per unit. The runtime resolves `(name, arity)`
//! against `GeneratedUnit::INBOUND` and hands the row index here; each arm
//! decodes all arguments before invoking so a bad argument never leads to a
//! partial call.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Path;

use crate::analyzer::{AnalyzedPair, RemoteMethod};
use crate::naming::UnitNames;

pub fn generate_dispatcher(pair: &AnalyzedPair, names: &UnitNames, runtime: &Path) -> TokenStream {
    let unit = &names.unit;
    let peer = &pair.peer.ident;
    let serializer = &names.inbound_serializer;

    let arms = pair
        .peer
        .methods
        .iter()
        .enumerate()
        .map(|(index, method)| arm(index, method, serializer));

    let body = if pair.peer.methods.is_empty() {
        quote! {
            let _ = (local, index, call);
            Ok(())
        }
    } else {
        quote! {
            match index {
                #(#arms)*
                _ => Ok(()),
            }
        }
    };

    quote! {
        impl<L: #peer + ?Sized> #runtime::Dispatcher<L> for #unit {
            fn invoke(
                local: &L,
                index: usize,
                call: &#runtime::Inbound<'_>,
            ) -> #runtime::Result<()> {
                #body
            }
        }
    }
}

fn arm(index: usize, method: &RemoteMethod, serializer: &syn::Ident) -> TokenStream {
    let ident = &method.ident;
    let decoded = method.params.iter().enumerate().map(|(position, param)| {
        let (name, ty) = (&param.ident, &param.ty);
        quote!(let #name = call.arg::<#serializer, #ty>(#position)?;)
    });
    let args = method.params.iter().map(|param| &param.ident);

    quote! {
        #index => {
            #(#decoded)*
            local.#ident(#(#args),*);
            Ok(())
        }
    }
}

//! Serializer Generator.

use proc_macro2::TokenStream;
use quote::quote;

use crate::capabilities::{SerializerSpec, SerializerSynthesis};
use crate::error::Result;

/// Synthesizes serde-backed serializers.
///
/// The artifact is a unit struct implementing `WireSerializer` and one
/// `Supports<T>` per closure member. `Supports` requires
/// `T: Serialize + DeserializeOwned`, so any reachable type rustc cannot
/// serialize fails the build at its impl.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeSynthesis;

impl SerializerSynthesis for SerdeSynthesis {
    fn synthesize(&self, spec: &SerializerSpec<'_>) -> Result<TokenStream> {
        let SerializerSpec {
            ident,
            artifact,
            closure,
            runtime,
        } = *spec;

        let types = closure.types();
        let keys = closure.keys();
        let doc = format!("Serializer for the {} types of `{artifact}`.", types.len());

        Ok(quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, Copy, Default)]
            pub struct #ident;

            impl #runtime::WireSerializer for #ident {
                const NAME: &'static str = concat!(module_path!(), "::", #artifact);
                const TYPES: &'static [&'static str] = &[#(#keys),*];
            }

            #(impl #runtime::Supports<#types> for #ident {})*
        })
    }
}

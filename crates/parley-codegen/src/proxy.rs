//! Proxy Generator.
//!
//! Emits the unit struct, its `GeneratedUnit` impl and one forwarding stub per
//! outbound method. Every stub builds exactly one envelope and returns `()`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Path;

use crate::analyzer::{AnalyzedPair, RemoteMethod};
use crate::naming::UnitNames;

pub fn generate_proxy(pair: &AnalyzedPair, names: &UnitNames, runtime: &Path) -> TokenStream {
    let UnitNames {
        unit,
        outbound_serializer,
        inbound_serializer,
        ..
    } = names;
    let interface = &pair.proxied.ident;
    let artifact = names.artifact();
    let route = &pair.route;
    let doc = format!(
        "Forwarding proxy for `{interface}`; inbound calls are dispatched to a local `{}`.",
        pair.peer.ident
    );

    let outbound_table = table(&pair.proxied.methods, runtime);
    let inbound_table = table(&pair.peer.methods, runtime);
    let stubs = pair
        .proxied
        .methods
        .iter()
        .map(|method| stub(method, outbound_serializer));

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone)]
        pub struct #unit {
            link: #runtime::Link,
        }

        impl #runtime::GeneratedUnit for #unit {
            const NAME: &'static str = concat!(module_path!(), "::", #artifact);
            const ROUTE: &'static str = #route;
            const OUTBOUND: #runtime::DispatchTable = #outbound_table;
            const INBOUND: #runtime::DispatchTable = #inbound_table;

            type OutboundSerializer = #outbound_serializer;
            type InboundSerializer = #inbound_serializer;

            fn attach(link: #runtime::Link) -> Self {
                Self { link }
            }

            fn link(&self) -> &#runtime::Link {
                &self.link
            }
        }

        impl #interface for #unit {
            #(#stubs)*
        }
    }
}

/// `DispatchTable` literal for `methods`, in declaration order.
pub(crate) fn table(methods: &[RemoteMethod], runtime: &Path) -> TokenStream {
    let rows = methods.iter().map(|method| {
        let name = &method.name;
        let arity = method.arity();
        quote!(#runtime::MethodDescriptor::new(#name, #arity))
    });
    quote!(#runtime::DispatchTable::new(&[#(#rows),*]))
}

fn stub(method: &RemoteMethod, serializer: &syn::Ident) -> TokenStream {
    let ident = &method.ident;
    let name = &method.name;
    let params = method.params.iter().map(|param| {
        let (ident, ty) = (&param.ident, &param.ty);
        quote!(#ident: #ty)
    });
    let args = method.params.iter().map(|param| {
        let ident = &param.ident;
        quote!(.arg::<#serializer, _>(&#ident))
    });

    quote! {
        fn #ident(&self, #(#params),*) {
            self.link.call(#name)#(#args)*.send();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{analyze_pair, RemoteInterfacePair};
    use syn::parse_quote;

    fn pair() -> AnalyzedPair {
        analyze_pair(&RemoteInterfacePair {
            module: parse_quote!(split_rpc),
            self_interface: parse_quote! {
                #[route("worker.js")]
                pub trait Worker {
                    fn pong(&self);
                    fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>);
                }
            },
            peer_interface: parse_quote! {
                pub trait Host {
                    fn ping(&self);
                }
            },
        })
        .unwrap()
    }

    #[test]
    fn test_one_stub_per_outbound_method() {
        let pair = pair();
        let names = UnitNames::new(&pair.module, &pair.proxied.ident);
        let tokens = generate_proxy(&pair, &names, &parse_quote!(::parley::__private)).to_string();

        assert_eq!(tokens.matches(". send ()").count(), 2);
        assert!(tokens.contains("impl Worker for WorkerProxyImpl"));
        assert!(tokens.contains(
            "self . link . call (\"split\") . arg :: < WorkerProxyImplOutboundSerializer , _ > (& arg0) \
             . arg :: < WorkerProxyImplOutboundSerializer , _ > (& arg1) \
             . arg :: < WorkerProxyImplOutboundSerializer , _ > (& arg2) . send ()"
        ));
        assert!(tokens.contains("const ROUTE : & 'static str = \"worker.js\""));
    }

    #[test]
    fn test_tables_follow_declaration_order() {
        let pair = pair();
        let tokens = table(&pair.proxied.methods, &parse_quote!(rt)).to_string();
        assert_eq!(
            tokens,
            "rt :: DispatchTable :: new (& [rt :: MethodDescriptor :: new (\"pong\" , 0usize) , \
             rt :: MethodDescriptor :: new (\"split\" , 3usize)])"
        );
    }
}

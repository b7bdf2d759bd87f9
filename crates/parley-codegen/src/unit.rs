use proc_macro2::TokenStream;
use quote::quote;
use syn::Type;

use crate::analyzer::{analyze_pair, RemoteInterfacePair, RemoteMethod};
use crate::capabilities::{CompilerCapabilities, SerializerSpec};
use crate::closure::{build_closure, TypeClosure};
use crate::dispatcher::generate_dispatcher;
use crate::error::Result;
use crate::naming::UnitNames;
use crate::proxy::generate_proxy;

/// The build artifact for one interface pair.
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub names: UnitNames,
    pub route: String,
    pub outbound: Vec<RemoteMethod>,
    pub inbound: Vec<RemoteMethod>,
    pub outbound_closure: TypeClosure,
    pub inbound_closure: TypeClosure,
    pub tokens: TokenStream,
}

impl GeneratedUnit {
    pub fn outbound_table(&self) -> Vec<(String, usize)> {
        rows(&self.outbound)
    }

    pub fn inbound_table(&self) -> Vec<(String, usize)> {
        rows(&self.inbound)
    }
}

fn rows(methods: &[RemoteMethod]) -> Vec<(String, usize)> {
    methods
        .iter()
        .map(|method| (method.name.clone(), method.arity()))
        .collect()
}

/// Runs every stage for `pair` and emits the result.
///
/// Stages run to completion in order; emission happens only after all of
/// them succeeded, so a failed generation commits nothing.
pub fn generate(
    pair: &RemoteInterfacePair,
    caps: &mut CompilerCapabilities<'_>,
) -> Result<GeneratedUnit> {
    let runtime = &caps.options.runtime;
    let analyzed = analyze_pair(pair)?;
    let names = UnitNames::new(&analyzed.module, &analyzed.proxied.ident);
    let carrier: Type = syn::parse_quote!(#runtime::Envelope);

    let outbound_closure = build_closure(
        analyzed.proxied.methods.iter().flat_map(|m| m.params.iter().map(|p| &p.ty)),
        &carrier,
        caps.introspection,
    )?;
    let inbound_closure = build_closure(
        analyzed.peer.methods.iter().flat_map(|m| m.params.iter().map(|p| &p.ty)),
        &carrier,
        caps.introspection,
    )?;

    let outbound_serializer = caps.synthesis.synthesize(&SerializerSpec {
        ident: &names.outbound_serializer,
        artifact: &names.outbound_artifact(),
        closure: &outbound_closure,
        runtime,
    })?;
    let inbound_serializer = caps.synthesis.synthesize(&SerializerSpec {
        ident: &names.inbound_serializer,
        artifact: &names.inbound_artifact(),
        closure: &inbound_closure,
        runtime,
    })?;

    let proxy = generate_proxy(&analyzed, &names, runtime);
    let dispatcher = generate_dispatcher(&analyzed, &names, runtime);

    let tokens = quote! {
        #outbound_serializer
        #inbound_serializer
        #proxy
        #dispatcher
    };

    caps.emission.emit(&names.qualified, tokens.clone());

    Ok(GeneratedUnit {
        names,
        route: analyzed.route,
        outbound: analyzed.proxied.methods,
        inbound: analyzed.peer.methods,
        outbound_closure,
        inbound_closure,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CodegenOptions, SyntacticIntrospection, TokenEmitter};
    use crate::error::ErrorKind;
    use crate::serializer::SerdeSynthesis;
    use syn::{parse_quote, Item};

    fn items() -> Vec<Item> {
        vec![
            parse_quote! {
                #[route("split_worker")]
                pub trait Worker {
                    fn pong(&self);
                    fn split(&self, input: String, pattern: String, callback: Callback<Vec<String>>);
                }
            },
            parse_quote! {
                pub trait Host {
                    fn ping(&self);
                    fn split_done(&self, callback: Callback<Vec<String>>, parts: Vec<String>);
                    fn status(&self, report: Report);
                }
            },
            parse_quote! {
                #[derive(Serialize, Deserialize)]
                pub struct Report { worker: String, load: u8 }
            },
        ]
    }

    fn pair(items: &[Item]) -> RemoteInterfacePair {
        let traits: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                Item::Trait(item) => Some(item.clone()),
                _ => None,
            })
            .collect();
        RemoteInterfacePair {
            module: parse_quote!(split_rpc),
            self_interface: traits[0].clone(),
            peer_interface: traits[1].clone(),
        }
    }

    fn run(emitter: &mut TokenEmitter) -> Result<GeneratedUnit> {
        let items = items();
        let introspection = SyntacticIntrospection::from_items(&items);
        let options = CodegenOptions::default();
        let mut caps = CompilerCapabilities {
            introspection: &introspection,
            synthesis: &SerdeSynthesis,
            emission: emitter,
            options: &options,
        };
        generate(&pair(&items), &mut caps)
    }

    #[test]
    fn test_generation_is_idempotent() {
        let first = run(&mut TokenEmitter::new()).unwrap();
        let second = run(&mut TokenEmitter::new()).unwrap();

        assert_eq!(first.names, second.names);
        assert_eq!(first.outbound_table(), second.outbound_table());
        assert_eq!(first.inbound_table(), second.inbound_table());
        assert_eq!(first.tokens.to_string(), second.tokens.to_string());
    }

    #[test]
    fn test_emits_once_per_unit() {
        let mut emitter = TokenEmitter::new();
        run(&mut emitter).unwrap();
        run(&mut emitter).unwrap();
        assert_eq!(emitter.names().collect::<Vec<_>>(), vec!["split_rpc::Worker_ProxyImpl"]);
    }

    #[test]
    fn test_closures_are_per_direction() {
        let unit = run(&mut TokenEmitter::new()).unwrap();

        assert!(unit.outbound_closure.contains("Callback < Vec < String > >"));
        assert!(!unit.outbound_closure.contains("Report"));
        assert!(unit.inbound_closure.contains("Report"));
        assert!(unit.inbound_closure.contains("u8"));
        assert!(unit.inbound_closure.contains(":: parley :: __private :: Envelope"));
        assert!(unit.outbound_closure.contains(":: parley :: __private :: Envelope"));
    }

    #[test]
    fn test_tables() {
        let unit = run(&mut TokenEmitter::new()).unwrap();
        assert_eq!(
            unit.outbound_table(),
            vec![("pong".to_string(), 0), ("split".to_string(), 3)]
        );
        assert_eq!(
            unit.inbound_table(),
            vec![
                ("ping".to_string(), 0),
                ("split_done".to_string(), 2),
                ("status".to_string(), 1)
            ]
        );
        assert_eq!(unit.route, "split_worker");
    }

    #[test]
    fn test_failure_commits_nothing() {
        let mut items = items();
        items.push(parse_quote! {
            pub struct Report { worker: String }
        });
        items.remove(2);
        let introspection = SyntacticIntrospection::from_items(&items);
        let options = CodegenOptions::default();
        let mut emitter = TokenEmitter::new();
        let mut caps = CompilerCapabilities {
            introspection: &introspection,
            synthesis: &SerdeSynthesis,
            emission: &mut emitter,
            options: &options,
        };

        let err = generate(&pair(&items), &mut caps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSerializable);
        assert_eq!(emitter.names().count(), 0);
        assert!(emitter.into_tokens().is_empty());
    }
}

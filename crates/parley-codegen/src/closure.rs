//! Type-Closure Builder.

use std::collections::{BTreeSet, VecDeque};

use quote::ToTokens;
use syn::Type;

use crate::capabilities::TypeIntrospection;
use crate::error::Result;

/// Normalized spelling used as a type's identity inside a closure.
pub fn type_key(ty: &Type) -> String {
    ty.to_token_stream().to_string()
}

/// Every concrete type one direction needs to move, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct TypeClosure {
    types: Vec<Type>,
    keys: BTreeSet<String>,
}

impl TypeClosure {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn types(&self) -> &[Type] {
        &self.types
    }

    pub fn keys(&self) -> Vec<String> {
        self.types.iter().map(type_key).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn insert(&mut self, key: String, ty: Type) {
        if self.keys.insert(key) {
            self.types.push(ty);
        }
    }
}

/// Walks from `roots` and the direction's envelope `carrier` to a fixpoint.
///
/// Every visited type is checked for representability first, so the closure
/// never contains a type the serializer could not handle.
pub fn build_closure<'a>(
    roots: impl IntoIterator<Item = &'a Type>,
    carrier: &Type,
    introspection: &dyn TypeIntrospection,
) -> Result<TypeClosure> {
    let mut closure = TypeClosure::default();
    let mut queue: VecDeque<Type> = roots.into_iter().cloned().collect();
    queue.push_back(carrier.clone());

    while let Some(ty) = queue.pop_front() {
        let ty = introspection.normalize(&ungroup(ty));
        let key = type_key(&ty);
        if closure.contains(&key) {
            continue;
        }
        introspection.check_representable(&ty)?;
        queue.extend(introspection.components(&ty)?);
        closure.insert(key, ty);
    }

    Ok(closure)
}

fn ungroup(ty: Type) -> Type {
    match ty {
        Type::Paren(paren) => ungroup(*paren.elem),
        Type::Group(group) => ungroup(*group.elem),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::SyntacticIntrospection;
    use crate::error::ErrorKind;
    use syn::{parse_quote, Item};

    fn introspection() -> SyntacticIntrospection {
        let items: Vec<Item> = vec![
            parse_quote! {
                #[derive(Serialize, Deserialize)]
                pub struct ChatMessage { author: User, sent_at: u64 }
            },
            parse_quote! {
                #[derive(Serialize, Deserialize)]
                pub struct User { name: String, friends: Vec<User> }
            },
            parse_quote! {
                pub struct Secret { key: [u8; 32] }
            },
        ];
        SyntacticIntrospection::from_items(&items)
    }

    #[test]
    fn test_transitive_closure() {
        let roots: Vec<Type> = vec![parse_quote!(ChatMessage), parse_quote!(Callback<Vec<String>>)];
        let carrier: Type = parse_quote!(::parley::__private::Envelope);
        let closure = build_closure(&roots, &carrier, &introspection()).unwrap();

        assert_eq!(
            closure.keys(),
            vec![
                "ChatMessage",
                "Callback < Vec < String > >",
                ":: parley :: __private :: Envelope",
                "User",
                "u64",
                "Vec < String >",
                "String",
                "Vec < User >",
            ]
        );
    }

    #[test]
    fn test_directions_are_independent() {
        let introspection = introspection();
        let carrier: Type = parse_quote!(Envelope);
        let outbound_roots: [Type; 1] = [parse_quote!(String)];
        let inbound_roots: [Type; 1] = [parse_quote!(User)];
        let outbound = build_closure(&outbound_roots, &carrier, &introspection).unwrap();
        let inbound = build_closure(&inbound_roots, &carrier, &introspection).unwrap();

        assert!(!outbound.contains("User"));
        assert!(inbound.contains("User"));
        assert!(inbound.contains("String"));
    }

    #[test]
    fn test_unserializable_reachable_type_is_fatal() {
        let roots: Vec<Type> = vec![parse_quote!(Option<Secret>)];
        let err = build_closure(&roots, &parse_quote!(Envelope), &introspection()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSerializable);
    }

    #[test]
    fn test_alias_and_target_share_one_entry() {
        let items: Vec<Item> = vec![parse_quote!(pub type Parts = Vec<String>;)];
        let introspection = SyntacticIntrospection::from_items(&items);
        let roots: Vec<Type> = vec![parse_quote!(Parts), parse_quote!(Vec<String>)];
        let closure = build_closure(&roots, &parse_quote!(Envelope), &introspection).unwrap();
        assert_eq!(closure.keys(), vec!["Vec < String >", "Envelope", "String"]);
    }

    #[test]
    fn test_skipped_fields_stay_out_of_closure() {
        let items: Vec<Item> = vec![parse_quote! {
            #[derive(Serialize, Deserialize)]
            pub struct Job {
                name: String,
                #[serde(skip)]
                started: std::time::Instant,
            }
        }];
        let introspection = SyntacticIntrospection::from_items(&items);
        let roots: Vec<Type> = vec![parse_quote!(Job)];
        let closure = build_closure(&roots, &parse_quote!(Envelope), &introspection).unwrap();
        assert_eq!(closure.keys(), vec!["Job", "Envelope", "String"]);
    }

    #[test]
    fn test_self_qualified_local_shares_one_entry() {
        let roots: Vec<Type> = vec![parse_quote!(User), parse_quote!(self::User)];
        let closure = build_closure(&roots, &parse_quote!(Envelope), &introspection()).unwrap();
        assert_eq!(
            closure.keys(),
            vec!["User", "Envelope", "String", "Vec < User >"]
        );
    }

    #[test]
    fn test_duplicate_roots_collapse() {
        let roots: Vec<Type> = vec![parse_quote!(String), parse_quote!((String)), parse_quote!(String)];
        let closure = build_closure(&roots, &parse_quote!(Envelope), &introspection()).unwrap();
        assert_eq!(closure.keys(), vec!["String", "Envelope"]);
    }
}

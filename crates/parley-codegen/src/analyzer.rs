//! Interface Analyzer.
//!
//! Turns the two trait declarations of a pair into ordered method lists. Order
//! is declaration order and is the order of the generated dispatch table.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{
    Attribute, FnArg, Ident, ItemTrait, LitStr, ReturnType, TraitItem, TraitItemFn, Type,
    TypeParamBound,
};

use crate::error::{ErrorKind, GenerationError, Result};

/// Accessors every endpoint has; never part of dispatch.
pub const INFRASTRUCTURE_ACCESSORS: [&str; 2] = ["set_remote", "get_remote"];

const ROUTE_ATTR: &str = "route";
const REMOTE_ATTR: &str = "remote";

/// Which way a method's calls travel, seen from the side that owns the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Called locally through the proxy, executed by the peer.
    Outbound,
    /// Called by the peer, executed by the local implementation.
    Inbound,
}

/// The declared pair, as handed over by the macro front end.
#[derive(Debug, Clone)]
pub struct RemoteInterfacePair {
    pub module: Ident,
    pub self_interface: ItemTrait,
    pub peer_interface: ItemTrait,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ident: Ident,
    pub ty: Type,
}

/// One remotely callable method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMethod {
    /// Rust identifier of the trait method.
    pub ident: Ident,
    /// Name on the wire; the identifier unless overridden.
    pub name: String,
    pub params: Vec<Param>,
    pub direction: Direction,
}

impl RemoteMethod {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceModel {
    pub ident: Ident,
    pub route: Option<String>,
    pub methods: Vec<RemoteMethod>,
}

/// Both sides of a pair after analysis.
#[derive(Debug, Clone)]
pub struct AnalyzedPair {
    pub module: Ident,
    pub route: String,
    pub proxied: InterfaceModel,
    pub peer: InterfaceModel,
}

pub fn analyze_pair(pair: &RemoteInterfacePair) -> Result<AnalyzedPair> {
    let proxied = analyze_interface(&pair.self_interface, Direction::Outbound)?;
    let peer = analyze_interface(&pair.peer_interface, Direction::Inbound)?;

    let route = proxied.route.clone().ok_or_else(|| {
        GenerationError::new(
            ErrorKind::MissingRoute,
            pair.self_interface.ident.span(),
            format!(
                "`#[route(\"...\")]` is required on `{}` to address its peer when no explicit address is configured",
                pair.self_interface.ident
            ),
        )
    })?;

    Ok(AnalyzedPair {
        module: pair.module.clone(),
        route,
        proxied,
        peer,
    })
}

pub fn analyze_interface(item: &ItemTrait, direction: Direction) -> Result<InterfaceModel> {
    check_trait_shape(item)?;

    let route = parse_route(&item.attrs)?;
    let mut methods = Vec::new();

    for trait_item in &item.items {
        let TraitItem::Fn(method) = trait_item else {
            return Err(GenerationError::new(
                ErrorKind::InvalidInterface,
                trait_item.span(),
                format!("remote interface `{}` may only declare methods", item.ident),
            ));
        };

        if is_infrastructure(method) {
            if method.default.is_none() {
                return Err(GenerationError::new(
                    ErrorKind::InvalidMethod,
                    method.sig.ident.span(),
                    format!(
                        "`{}` is an infrastructure accessor; implement `RemoteAware` instead of declaring it on a remote interface",
                        method.sig.ident
                    ),
                ));
            }
            continue;
        }

        methods.push(analyze_method(method, direction)?);
    }

    Ok(InterfaceModel {
        ident: item.ident.clone(),
        route,
        methods,
    })
}

/// Removes the helper attributes rustc would reject.
pub fn strip_helper_attributes(item: &mut ItemTrait) {
    item.attrs.retain(|attr| !attr.path().is_ident(ROUTE_ATTR));
    for trait_item in &mut item.items {
        if let TraitItem::Fn(method) = trait_item {
            method.attrs.retain(|attr| !attr.path().is_ident(REMOTE_ATTR));
        }
    }
}

fn is_infrastructure(method: &TraitItemFn) -> bool {
    let name = method.sig.ident.to_string();
    INFRASTRUCTURE_ACCESSORS.contains(&name.as_str())
}

fn check_trait_shape(item: &ItemTrait) -> Result<()> {
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(invalid_interface(
            item.generics.span(),
            format!("remote interface `{}` cannot be generic", item.ident),
        ));
    }
    if item.unsafety.is_some() || item.auto_token.is_some() {
        return Err(invalid_interface(
            item.ident.span(),
            format!("remote interface `{}` must be a plain trait", item.ident),
        ));
    }
    for bound in &item.supertraits {
        let allowed = match bound {
            TypeParamBound::Lifetime(lifetime) => lifetime.ident == "static",
            TypeParamBound::Trait(bound) => {
                bound.path.is_ident("Send") || bound.path.is_ident("Sync")
            }
            _ => false,
        };
        if !allowed {
            return Err(invalid_interface(
                bound.span(),
                "remote interfaces may only require `Send`, `Sync` or `'static`",
            ));
        }
    }
    Ok(())
}

fn analyze_method(method: &TraitItemFn, direction: Direction) -> Result<RemoteMethod> {
    let sig = &method.sig;
    let ident = sig.ident.clone();

    if sig.asyncness.is_some()
        || sig.constness.is_some()
        || sig.unsafety.is_some()
        || sig.abi.is_some()
        || sig.variadic.is_some()
    {
        return Err(invalid_method(
            sig.span(),
            format!("remote method `{ident}` must be a plain synchronous method"),
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(invalid_method(
            sig.generics.span(),
            format!("remote method `{ident}` cannot be generic"),
        ));
    }
    match &sig.output {
        ReturnType::Default => {}
        ReturnType::Type(_, ty) if is_unit(ty) => {}
        ReturnType::Type(_, ty) => {
            return Err(invalid_method(
                ty.span(),
                format!(
                    "remote method `{ident}` must return `()`; send results back through a callback argument"
                ),
            ));
        }
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some()
                && receiver.mutability.is_none()
                && receiver.colon_token.is_none() => {}
        _ => {
            return Err(invalid_method(
                sig.span(),
                format!("remote method `{ident}` must take `&self`"),
            ));
        }
    }

    let params = inputs
        .enumerate()
        .map(|(index, input)| match input {
            FnArg::Typed(typed) => Ok(Param {
                ident: quote::format_ident!("arg{}", index),
                ty: (*typed.ty).clone(),
            }),
            FnArg::Receiver(receiver) => Err(invalid_method(
                receiver.span(),
                "unexpected second receiver",
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    let name = parse_wire_name(&method.attrs)?.unwrap_or_else(|| ident.to_string());

    Ok(RemoteMethod {
        ident,
        name,
        params,
        direction,
    })
}

fn parse_route(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut route = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident(ROUTE_ATTR)) {
        if route.is_some() {
            return Err(invalid_interface(attr.span(), "duplicate `#[route]` attribute"));
        }
        let lit: LitStr = attr.parse_args()?;
        route = Some(lit.value());
    }
    Ok(route)
}

fn parse_wire_name(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut name = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident(REMOTE_ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("wire name must not be empty"));
                }
                name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported `remote` option, expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}

fn invalid_interface(span: Span, message: impl Into<String>) -> GenerationError {
    GenerationError::new(ErrorKind::InvalidInterface, span, message)
}

fn invalid_method(span: Span, message: impl Into<String>) -> GenerationError {
    GenerationError::new(ErrorKind::InvalidMethod, span, message)
}

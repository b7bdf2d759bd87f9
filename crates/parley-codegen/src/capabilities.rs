//! Services the host compiler lends the generator.
//!
//! Rust macros see tokens only, so "type introspection" is whatever can be
//! learned from the annotated module's items; everything else is left to rustc
//! through the trait bounds the generated code carries.

use std::collections::{BTreeSet, HashMap};

use proc_macro2::TokenStream;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit_mut::{self, VisitMut};
use syn::{
    Attribute, Fields, GenericArgument, Ident, Item, Meta, Path, PathArguments, Token, Type,
    TypePath,
};

use crate::closure::{type_key, TypeClosure};
use crate::error::{ErrorKind, GenerationError, Result};

/// Structural knowledge about types.
pub trait TypeIntrospection {
    /// Types that must be serializable for `ty` to be.
    fn components(&self, ty: &Type) -> Result<Vec<Type>>;

    /// Fails if `ty` cannot have a wire form.
    fn check_representable(&self, ty: &Type) -> Result<()>;

    /// The spelling a closure records for `ty`. Aliases resolve to their
    /// target so one type never gets two serializer entries.
    fn normalize(&self, ty: &Type) -> Type {
        ty.clone()
    }
}

/// Input to [`SerializerSynthesis`].
#[derive(Debug, Clone, Copy)]
pub struct SerializerSpec<'a> {
    pub ident: &'a Ident,
    pub artifact: &'a str,
    pub closure: &'a TypeClosure,
    pub runtime: &'a Path,
}

/// Produces the serializer artifact for one closure.
pub trait SerializerSynthesis {
    fn synthesize(&self, spec: &SerializerSpec<'_>) -> Result<TokenStream>;
}

/// Commits generated items.
pub trait SourceEmission {
    /// Returns `false` if an artifact with this name was already emitted.
    fn emit(&mut self, name: &str, tokens: TokenStream) -> bool;
}

/// Knobs that are not capabilities.
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Path generated code uses to reach the runtime contract.
    pub runtime: Path,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime: syn::parse_quote!(::parley::__private),
        }
    }
}

/// Everything `generate` needs from its host.
pub struct CompilerCapabilities<'a> {
    pub introspection: &'a dyn TypeIntrospection,
    pub synthesis: &'a dyn SerializerSynthesis,
    pub emission: &'a mut dyn SourceEmission,
    pub options: &'a CodegenOptions,
}

#[derive(Debug, Clone)]
struct LocalType {
    params: Vec<Ident>,
    fields: Vec<Type>,
    serializable: bool,
    alias: bool,
}

/// Introspection over the items of the annotated module.
///
/// Structs, enums and aliases declared there are expanded into their field
/// types; anything else is a leaf whose serializability rustc checks.
#[derive(Debug, Clone, Default)]
pub struct SyntacticIntrospection {
    locals: HashMap<String, LocalType>,
}

impl SyntacticIntrospection {
    pub fn from_items(items: &[Item]) -> Self {
        let mut locals = HashMap::new();
        let mut manual_serialize = BTreeSet::new();
        let mut manual_deserialize = BTreeSet::new();

        for item in items {
            match item {
                Item::Struct(item) => {
                    locals.insert(
                        item.ident.to_string(),
                        LocalType {
                            params: type_params(&item.generics),
                            fields: field_types(&item.fields),
                            serializable: derives_serde(&item.attrs),
                            alias: false,
                        },
                    );
                }
                Item::Enum(item) => {
                    let fields = item
                        .variants
                        .iter()
                        .filter(|variant| crosses_wire(&variant.attrs))
                        .flat_map(|variant| field_types(&variant.fields))
                        .collect();
                    locals.insert(
                        item.ident.to_string(),
                        LocalType {
                            params: type_params(&item.generics),
                            fields,
                            serializable: derives_serde(&item.attrs),
                            alias: false,
                        },
                    );
                }
                Item::Type(item) => {
                    locals.insert(
                        item.ident.to_string(),
                        LocalType {
                            params: type_params(&item.generics),
                            fields: vec![(*item.ty).clone()],
                            serializable: true,
                            alias: true,
                        },
                    );
                }
                Item::Impl(item) => {
                    let (Some((_, trait_path, _)), Type::Path(self_ty)) =
                        (&item.trait_, &*item.self_ty)
                    else {
                        continue;
                    };
                    let Some(target) = self_ty.path.segments.last() else {
                        continue;
                    };
                    match trait_path.segments.last() {
                        Some(seg) if seg.ident == "Serialize" => {
                            manual_serialize.insert(target.ident.to_string());
                        }
                        Some(seg) if seg.ident == "Deserialize" => {
                            manual_deserialize.insert(target.ident.to_string());
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        for (name, local) in &mut locals {
            if manual_serialize.contains(name) && manual_deserialize.contains(name) {
                local.serializable = true;
            }
        }

        Self { locals }
    }

    fn local(&self, path: &TypePath) -> Option<(&str, &LocalType)> {
        if path.qself.is_some() {
            return None;
        }
        let segments: Vec<_> = path.path.segments.iter().collect();
        let last = match segments.as_slice() {
            [only] if path.path.leading_colon.is_none() => *only,
            [first, last] if first.ident == "self" => *last,
            _ => return None,
        };
        self.locals
            .get_key_value(&last.ident.to_string())
            .map(|(name, local)| (name.as_str(), local))
    }
}

impl TypeIntrospection for SyntacticIntrospection {
    fn components(&self, ty: &Type) -> Result<Vec<Type>> {
        let components = match ty {
            Type::Path(path) => match self.local(path) {
                Some((_, local)) => substituted_fields(path, local),
                None => generic_types(path),
            },
            Type::Tuple(tuple) => tuple.elems.iter().cloned().collect(),
            Type::Array(array) => vec![(*array.elem).clone()],
            Type::Paren(paren) => vec![(*paren.elem).clone()],
            Type::Group(group) => vec![(*group.elem).clone()],
            _ => Vec::new(),
        };
        Ok(components.into_iter().map(flatten).collect())
    }

    fn check_representable(&self, ty: &Type) -> Result<()> {
        let reason = match ty {
            Type::Reference(_) => Some("borrowed references cannot be decoded from the wire"),
            Type::Ptr(_) => Some("raw pointers have no wire form"),
            Type::TraitObject(_) | Type::ImplTrait(_) => {
                Some("trait objects have no concrete wire form")
            }
            Type::BareFn(_) => Some("function pointers have no wire form"),
            Type::Never(_) => Some("`!` has no values to send"),
            Type::Macro(_) => Some("macros in type position cannot be inspected"),
            Type::Infer(_) => Some("remote parameter types must be spelled out"),
            Type::Slice(_) => Some("unsized slices must be boxed or collected into a `Vec`"),
            Type::Path(path) => return self.check_path(ty, path),
            _ => None,
        };
        match reason {
            Some(reason) => Err(unrepresentable(ty, reason)),
            None => Ok(()),
        }
    }

    fn normalize(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        StripSelf.visit_type_mut(&mut current);
        // Bounded so a cyclic alias, which rustc rejects anyway, cannot hang expansion.
        for _ in 0..self.locals.len() {
            let Type::Path(path) = &current else { break };
            let Some((_, local)) = self.local(path) else { break };
            if !local.alias {
                break;
            }
            let Some(target) = substituted_fields(path, local).pop() else {
                break;
            };
            current = flatten(target);
            StripSelf.visit_type_mut(&mut current);
        }
        current
    }
}

impl SyntacticIntrospection {
    fn check_path(&self, ty: &Type, path: &TypePath) -> Result<()> {
        if path.qself.is_some() {
            return Err(unrepresentable(ty, "associated type projections cannot be resolved"));
        }
        if path.path.is_ident("Self") {
            return Err(unrepresentable(ty, "`Self` is not a concrete type"));
        }
        if path.path.is_ident("str") {
            return Err(unrepresentable(ty, "`str` is unsized, use `String`"));
        }
        for segment in &path.path.segments {
            match &segment.arguments {
                PathArguments::None => {}
                PathArguments::Parenthesized(_) => {
                    return Err(unrepresentable(ty, "closures have no wire form, pass a `Callback` instead"));
                }
                PathArguments::AngleBracketed(args) => {
                    for arg in &args.args {
                        if let GenericArgument::Lifetime(lifetime) = arg {
                            if lifetime.ident != "static" {
                                return Err(unrepresentable(
                                    ty,
                                    "borrowed types cannot be decoded from the wire",
                                ));
                            }
                        }
                    }
                }
            }
        }
        if let Some((name, local)) = self.local(path) {
            if !local.alias && !local.serializable {
                return Err(GenerationError::new(
                    ErrorKind::NotSerializable,
                    ty.span(),
                    format!(
                        "`{name}` crosses the wire but has no serializable form; derive `Serialize` and `Deserialize`"
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Collects emitted artifacts, once per name.
#[derive(Debug, Default)]
pub struct TokenEmitter {
    emitted: BTreeSet<String>,
    output: TokenStream,
}

impl TokenEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.emitted.iter().map(String::as_str)
    }

    pub fn into_tokens(self) -> TokenStream {
        self.output
    }
}

impl SourceEmission for TokenEmitter {
    fn emit(&mut self, name: &str, tokens: TokenStream) -> bool {
        if !self.emitted.insert(name.to_string()) {
            return false;
        }
        self.output.extend(tokens);
        true
    }
}

struct Substitute<'a>(&'a HashMap<String, Type>);

impl VisitMut for Substitute<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        if let Type::Path(path) = ty {
            if path.qself.is_none() {
                if let Some(ident) = path.path.get_ident() {
                    if let Some(replacement) = self.0.get(&ident.to_string()) {
                        *ty = replacement.clone();
                        return;
                    }
                }
            }
        }
        visit_mut::visit_type_mut(self, ty);
    }
}

/// Rewrites `self::X` to `X`, the spelling the rest of the module uses.
struct StripSelf;

impl VisitMut for StripSelf {
    fn visit_path_mut(&mut self, path: &mut Path) {
        let local = path.leading_colon.is_none()
            && path.segments.len() > 1
            && path.segments.first().is_some_and(|first| first.ident == "self");
        if local {
            path.segments = path.segments.iter().skip(1).cloned().collect();
        }
        visit_mut::visit_path_mut(self, path);
    }
}

fn unrepresentable(ty: &Type, reason: &str) -> GenerationError {
    GenerationError::new(
        ErrorKind::Unrepresentable,
        ty.span(),
        format!("`{}` cannot cross the wire: {reason}", type_key(ty)),
    )
}

fn type_params(generics: &syn::Generics) -> Vec<Ident> {
    generics.type_params().map(|param| param.ident.clone()).collect()
}

/// Types of the fields serde actually encodes.
fn field_types(fields: &Fields) -> Vec<Type> {
    fields
        .iter()
        .filter(|field| crosses_wire(&field.attrs))
        .map(|field| field.ty.clone())
        .collect()
}

/// `false` for fields and variants serde skips or hands to a custom codec.
///
/// A `with` module decides the wire form itself, so the declared type never
/// needs a serde impl of its own.
fn crosses_wire(attrs: &[Attribute]) -> bool {
    const OPAQUE: [&str; 6] = [
        "skip",
        "skip_serializing",
        "skip_deserializing",
        "with",
        "serialize_with",
        "deserialize_with",
    ];
    !attrs
        .iter()
        .filter(|attr| attr.path().is_ident("serde"))
        .filter_map(|attr| {
            attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
                .ok()
        })
        .flatten()
        .any(|meta| OPAQUE.iter().any(|name| meta.path().is_ident(name)))
}

/// Field types of a local item with the use site's generic arguments applied.
fn substituted_fields(path: &TypePath, local: &LocalType) -> Vec<Type> {
    let substitutions: HashMap<String, Type> = local
        .params
        .iter()
        .map(Ident::to_string)
        .zip(generic_types(path))
        .collect();
    local
        .fields
        .iter()
        .cloned()
        .map(|mut field| {
            Substitute(&substitutions).visit_type_mut(&mut field);
            field
        })
        .collect()
}

fn generic_types(path: &TypePath) -> Vec<Type> {
    path.path
        .segments
        .iter()
        .filter_map(|segment| match &segment.arguments {
            PathArguments::AngleBracketed(args) => Some(args.args.iter()),
            _ => None,
        })
        .flatten()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        })
        .collect()
}

/// `Box<[T]>` contributes `T`; grouping tokens are dropped.
fn flatten(ty: Type) -> Type {
    match ty {
        Type::Slice(slice) => flatten(*slice.elem),
        Type::Paren(paren) => flatten(*paren.elem),
        Type::Group(group) => flatten(*group.elem),
        other => other,
    }
}

fn derives_serde(attrs: &[Attribute]) -> bool {
    let mut serialize = false;
    let mut deserialize = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let Ok(paths) = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)
        else {
            continue;
        };
        for path in paths {
            match path.segments.last() {
                Some(seg) if seg.ident == "Serialize" => serialize = true,
                Some(seg) if seg.ident == "Deserialize" => deserialize = true,
                _ => {}
            }
        }
    }
    serialize && deserialize
}

use proc_macro2::Span;
use thiserror::Error;

/// What went wrong during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The proxied interface has no `#[route("...")]`.
    MissingRoute,
    /// The annotated module or trait does not have the expected shape.
    InvalidInterface,
    /// A remote method cannot be proxied.
    InvalidMethod,
    /// A reachable type has no wire form at all.
    Unrepresentable,
    /// A reachable module-local type lacks `Serialize`/`Deserialize`.
    NotSerializable,
}

/// A fatal generation failure. Nothing is emitted once one is raised.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct GenerationError {
    kind: ErrorKind,
    message: String,
    span: Span,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

impl From<syn::Error> for GenerationError {
    fn from(err: syn::Error) -> Self {
        Self::new(ErrorKind::InvalidInterface, err.span(), err.to_string())
    }
}

impl From<GenerationError> for syn::Error {
    fn from(err: GenerationError) -> Self {
        syn::Error::new(err.span, err.message)
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

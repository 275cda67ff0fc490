use crate::core::DependencyKey;
use thiserror::Error;

/// A boxed error for failures raised by user code (constructors and hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the `fibre_inject` library.
#[derive(Debug, Error)]
pub enum Error {
  /// No provider is registered under the requested key.
  #[error("no provider registered for {key}")]
  NotRegistered { key: DependencyKey },

  #[error("circular dependency detected while resolving {key}")]
  CircularDependency { key: DependencyKey },

  /// A provider exists for the key, but its stored value is not of the requested type.
  #[error("value registered for {key} is not a {expected}")]
  TypeMismatch {
    key: DependencyKey,
    expected: &'static str,
  },

  #[error("no constructor registered for {target}")]
  NoConstructor { target: &'static str },

  /// Raised by a component constructor. The pipeline passes it through untouched.
  #[error("constructor injection failed for {target}: {source}")]
  Constructor {
    target: &'static str,
    #[source]
    source: BoxError,
  },

  #[error("failed to resolve property '{property}' from {key}: {source}")]
  PropertyResolution {
    property: String,
    key: DependencyKey,
    #[source]
    source: Box<Error>,
  },

  #[error("post-construction hook failed for {target}: {source}")]
  PostConstruction {
    target: &'static str,
    #[source]
    source: BoxError,
  },

  #[error("cannot infer a dependency key for property '{property}' of {target}: its declared type carries no type metadata")]
  MissingTypeMetadata {
    target: &'static str,
    property: String,
  },

  #[error("property dependencies for {target} are already defined")]
  AlreadyDefined { target: &'static str },
}

impl Error {
  /// Wraps a failure raised inside a component constructor.
  pub fn constructor<T: ?Sized>(source: impl Into<BoxError>) -> Self {
    Error::Constructor {
      target: std::any::type_name::<T>(),
      source: source.into(),
    }
  }

  /// The key that failed to resolve, for resolution-class errors.
  pub fn key(&self) -> Option<&DependencyKey> {
    match self {
      Error::NotRegistered { key }
      | Error::CircularDependency { key }
      | Error::TypeMismatch { key, .. }
      | Error::PropertyResolution { key, .. } => Some(key),
      _ => None,
    }
  }
}

/// A specialized `Result` type for `fibre_inject` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

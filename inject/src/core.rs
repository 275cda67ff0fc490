//! Keys, provider storage and the circular-resolution guard.

use crate::container::Container;
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
  // Keys currently being resolved on this thread. A key showing up twice
  // means a dependency cycle.
  static RESOLVING_STACK: RefCell<HashSet<DependencyKey>> = RefCell::new(HashSet::new());
}

/// An RAII guard that tracks a key on the thread-local resolution stack.
///
/// Entering a key that is already on the stack fails with
/// [`Error::CircularDependency`]. Dropping the guard pops the key again.
pub(crate) struct ResolutionGuard {
  key: DependencyKey,
}

impl ResolutionGuard {
  pub(crate) fn enter(key: &DependencyKey) -> Result<Self> {
    let inserted = RESOLVING_STACK.with(|stack| stack.borrow_mut().insert(key.clone()));
    if !inserted {
      return Err(Error::CircularDependency { key: key.clone() });
    }
    Ok(Self { key: key.clone() })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      stack.borrow_mut().remove(&self.key);
    });
  }
}

/// An opaque token identifying a dependency in a [`Container`].
///
/// A key is a type plus an optional name. The type may be a concrete
/// struct (a class reference), a trait object (an interface token), or any
/// type paired with a name (a string identifier). Equality compares the
/// `TypeId` and the name only.
#[derive(Clone)]
pub struct DependencyKey {
  type_id: TypeId,
  type_name: &'static str,
  name: Option<Arc<str>>,
}

impl DependencyKey {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      name: None,
    }
  }

  pub fn named<T: ?Sized + Any>(name: &str) -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      name: Some(Arc::from(name)),
    }
  }

  pub(crate) fn from_parts<T: ?Sized + Any>(name: Option<&str>) -> Self {
    match name {
      Some(n) => Self::named::<T>(n),
      None => Self::of::<T>(),
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

impl PartialEq for DependencyKey {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id && self.name == other.name
  }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.type_id.hash(state);
    self.name.hash(state);
  }
}

impl fmt::Debug for DependencyKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Key({}, Name({}))", self.type_name, name),
      None => write!(f, "Key({})", self.type_name),
    }
  }
}

impl fmt::Display for DependencyKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "`{}` named '{}'", self.type_name, name),
      None => write!(f, "`{}`", self.type_name),
    }
  }
}

/// A [`DependencyKey`] that remembers the type it resolves to.
///
/// Declarations take a `Token<V>` so a property of type `Arc<V>` can only be
/// bound to a key that yields an `Arc<V>`.
pub struct Token<V: ?Sized> {
  key: DependencyKey,
  _marker: PhantomData<fn() -> Arc<V>>,
}

impl<V: ?Sized + Any> Token<V> {
  pub fn new() -> Self {
    Self {
      key: DependencyKey::of::<V>(),
      _marker: PhantomData,
    }
  }

  pub fn named(name: &str) -> Self {
    Self {
      key: DependencyKey::named::<V>(name),
      _marker: PhantomData,
    }
  }
}

impl<V: ?Sized> Token<V> {
  pub fn key(&self) -> &DependencyKey {
    &self.key
  }

  pub fn into_key(self) -> DependencyKey {
    self.key
  }
}

impl<V: ?Sized + Any> Default for Token<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V: ?Sized> Clone for Token<V> {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      _marker: PhantomData,
    }
  }
}

impl<V: ?Sized> fmt::Debug for Token<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Token").field(&self.key).finish()
  }
}

pub(crate) type Erased = Box<dyn Any + Send + Sync>;
pub(crate) type Factory = Box<dyn Fn(&Container) -> Result<Erased> + Send + Sync>;

/// Every stored value is an `Arc<T>` boxed as `dyn Any`, so trait objects
/// and concrete types share one downcast path.
pub(crate) enum Provider {
  Instance { value: Erased },
  Singleton { cell: OnceCell<Erased>, factory: Factory },
  Transient { factory: Factory },
}

impl Provider {
  pub(crate) fn resolve<T: ?Sized + Any + Send + Sync>(
    &self,
    container: &Container,
    key: &DependencyKey,
  ) -> Result<Arc<T>> {
    let mismatch = || Error::TypeMismatch {
      key: key.clone(),
      expected: std::any::type_name::<T>(),
    };

    match self {
      Provider::Instance { value } => value.downcast_ref::<Arc<T>>().cloned().ok_or_else(mismatch),
      Provider::Singleton { cell, factory } => cell
        .get_or_try_init(|| factory(container))?
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(mismatch),
      Provider::Transient { factory } => factory(container)?
        .downcast::<Arc<T>>()
        .map(|arc_in_a_box| *arc_in_a_box)
        .map_err(|_| mismatch()),
    }
  }
}

//! Declaration sugar: builder-style registration of injectable properties
//! and the post-construction hook of a type.

use crate::core::Token;
use crate::error::{BoxError, Error, Result};
use crate::registry::{Hook, PropertyBinding, PropertyMap, PropertyRegistry, TargetDescriptor};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// A lifecycle callback run once all declared properties are injected.
///
/// Register it with [`ClassDefinition::lifecycle`].
pub trait PostConstruct {
  fn post_construct(&mut self) -> Result<(), BoxError>;
}

/// Accumulates the declarations of `T` until [`finish`](ClassDefinition::finish)
/// seals them into the registry.
///
/// ```
/// use fibre_inject::{PropertyRegistry, Token};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {}
///
/// struct Scheduler {
///   clock: Option<Arc<dyn Clock>>,
///   tick_ms: Option<Arc<u64>>,
/// }
///
/// let registry = PropertyRegistry::new();
/// registry
///   .define::<Scheduler>()
///   .declare_property("tick_ms", Token::<u64>::named("tick"), |s, v| s.tick_ms = Some(v))
///   .declare_property_auto::<dyn Clock>("clock", |s, v| s.clock = Some(v))
///   .unwrap()
///   .finish()
///   .unwrap();
///
/// assert!(registry.is_defined::<Scheduler>());
/// ```
#[must_use = "declarations are only registered by `finish`"]
pub struct ClassDefinition<'r, T> {
  registry: &'r PropertyRegistry,
  convention: PropertyMap<T>,
  declared: PropertyMap<T>,
  post_construct: Option<Hook>,
}

impl<'r, T: Any + Send + Sync> ClassDefinition<'r, T> {
  pub(crate) fn new(registry: &'r PropertyRegistry) -> Self {
    Self {
      registry,
      convention: PropertyMap::new(),
      declared: PropertyMap::new(),
      post_construct: None,
    }
  }

  /// Attaches an explicit convention map. Declarations made through this
  /// builder take precedence over it for the same property name.
  pub fn with_convention(mut self, convention: PropertyMap<T>) -> Self {
    self.convention = self.convention.merge(convention);
    self
  }

  /// Marks `name` for injection from `token`. Redeclaring a name replaces
  /// the earlier declaration.
  pub fn declare_property<V>(
    mut self,
    name: &str,
    token: Token<V>,
    setter: impl Fn(&mut T, Arc<V>) + Send + Sync + 'static,
  ) -> Self
  where
    V: ?Sized + Any + Send + Sync,
  {
    self
      .declared
      .insert_binding(PropertyBinding::new::<T, V>(name, token, setter));
    self
  }

  /// Marks `name` for injection, keyed by its declared value type `V`.
  ///
  /// Fails with [`Error::MissingTypeMetadata`] when `V` is an opaque
  /// `dyn Any` object, since that names no concrete dependency.
  pub fn declare_property_auto<V>(
    self,
    name: &str,
    setter: impl Fn(&mut T, Arc<V>) + Send + Sync + 'static,
  ) -> Result<Self>
  where
    V: ?Sized + Any + Send + Sync,
  {
    if is_opaque::<V>() {
      return Err(Error::MissingTypeMetadata {
        target: std::any::type_name::<T>(),
        property: name.to_owned(),
      });
    }
    Ok(self.declare_property(name, Token::<V>::new(), setter))
  }

  /// Sets the hook run after property injection. A later call replaces it.
  pub fn post_construct(
    mut self,
    hook: impl Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
  ) -> Self {
    self.post_construct = Some(Box::new(
      move |instance: &mut (dyn Any + Send + Sync)| match instance.downcast_mut::<T>() {
        Some(instance) => hook(instance),
        None => Err(
          format!(
            "post-construction hook bound to a value that is not a {}",
            std::any::type_name::<T>()
          )
          .into(),
        ),
      },
    ));
    self
  }

  /// Merges the declarations and registers the sealed descriptor.
  pub fn finish(self) -> Result<Arc<TargetDescriptor>> {
    let merged = self.convention.merge(self.declared);
    let descriptor = TargetDescriptor::new(
      std::any::type_name::<T>(),
      merged.into_bindings(),
      self.post_construct,
    );
    self.registry.seal::<T>(descriptor)
  }
}

impl<'r, T: PostConstruct + Any + Send + Sync> ClassDefinition<'r, T> {
  /// Uses `T`'s [`PostConstruct`] impl as the post-construction hook.
  pub fn lifecycle(self) -> Self {
    self.post_construct(T::post_construct)
  }
}

fn is_opaque<V: ?Sized + Any>() -> bool {
  let id = TypeId::of::<V>();
  id == TypeId::of::<dyn Any>()
    || id == TypeId::of::<dyn Any + Send>()
    || id == TypeId::of::<dyn Any + Send + Sync>()
}

//! Invocation handlers: the objects that actually construct component instances.
//!
//! The container builds one [`ConstructorHandler`] per component type. A
//! handler-created callback (see [`Container::set_handler_created_callback`])
//! may replace it with any other [`InvocationHandler`]. [`HandlerWrapper`] is
//! the replacement installed by this crate. It runs the base handler, then
//! injects declared properties and calls the post-construction hook.

use crate::container::Container;
use crate::error::{Error, Result};
use crate::registry::PropertyRegistry;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// An instance moving through the creation pipeline.
pub type Instance = Box<dyn Any + Send + Sync>;

/// An extra argument passed verbatim to a component constructor.
pub type DynamicDependency = Arc<dyn Any + Send + Sync>;

pub(crate) type Constructor =
  Arc<dyn Fn(&Container, &[DynamicDependency]) -> Result<Instance> + Send + Sync>;

/// Identifies the type an invocation handler constructs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
  type_id: TypeId,
  type_name: &'static str,
}

impl Target {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

impl fmt::Debug for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Target({})", self.type_name)
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.type_name)
  }
}

/// Creates instances of one target type.
pub trait InvocationHandler: Send + Sync {
  /// The type produced by [`invoke`](InvocationHandler::invoke).
  fn target(&self) -> Target;

  /// Builds a new instance. `dynamic` holds extra constructor arguments.
  fn invoke(&self, container: &Container, dynamic: &[DynamicDependency]) -> Result<Instance>;
}

/// The container's default handler: runs the registered constructor and
/// nothing else.
pub struct ConstructorHandler {
  target: Target,
  constructor: Constructor,
}

impl ConstructorHandler {
  pub(crate) fn new(target: Target, constructor: Constructor) -> Self {
    Self { target, constructor }
  }
}

impl InvocationHandler for ConstructorHandler {
  fn target(&self) -> Target {
    self.target
  }

  fn invoke(&self, container: &Container, dynamic: &[DynamicDependency]) -> Result<Instance> {
    (self.constructor)(container, dynamic)
  }
}

/// Decorates a base handler with property injection and the post-construction hook.
///
/// The wrapper keeps no per-instance state. Concurrent `invoke` calls only
/// share the base handler and the registry, both read-only here.
pub struct HandlerWrapper {
  inner: Arc<dyn InvocationHandler>,
  registry: Arc<PropertyRegistry>,
}

impl HandlerWrapper {
  pub fn new(inner: Arc<dyn InvocationHandler>, registry: Arc<PropertyRegistry>) -> Self {
    Self { inner, registry }
  }

  /// The handler this wrapper delegates construction to.
  pub fn inner(&self) -> &Arc<dyn InvocationHandler> {
    &self.inner
  }
}

impl InvocationHandler for HandlerWrapper {
  fn target(&self) -> Target {
    self.inner.target()
  }

  fn invoke(&self, container: &Container, dynamic: &[DynamicDependency]) -> Result<Instance> {
    // Constructor failures are returned exactly as the base handler produced them.
    let mut instance = self.inner.invoke(container, dynamic)?;

    let target = self.inner.target();
    let Some(descriptor) = self.registry.descriptor(target.type_id()) else {
      return Ok(instance);
    };

    for binding in descriptor.bindings() {
      let value = binding
        .resolve(container)
        .map_err(|source| Error::PropertyResolution {
          property: binding.name().to_owned(),
          key: binding.key().clone(),
          source: Box::new(source),
        })?;
      binding.assign(&mut *instance, value)?;
      tracing::trace!(
        target_type = target.type_name(),
        property = binding.name(),
        key = %binding.key(),
        "injected property"
      );
    }

    if let Some(hook) = descriptor.post_construct() {
      tracing::trace!(target_type = target.type_name(), "running post-construction hook");
      hook(&mut *instance).map_err(|source| Error::PostConstruction {
        target: target.type_name(),
        source,
      })?;
    }

    Ok(instance)
  }
}

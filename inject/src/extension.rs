//! Installing property injection into a [`Container`].

use crate::container::Container;
use crate::handler::{HandlerWrapper, InvocationHandler};
use crate::registry::PropertyRegistry;
use std::sync::Arc;

/// Configures and installs the handler-created callback that wraps every
/// component handler in a [`HandlerWrapper`].
///
/// ```
/// use fibre_inject::{Container, PropertyInjection, PropertyRegistry};
/// use std::sync::Arc;
///
/// let container = Container::new();
/// let registry = Arc::new(PropertyRegistry::new());
/// PropertyInjection::new()
///   .registry(Arc::clone(&registry))
///   .install(&container);
/// ```
#[derive(Clone)]
pub struct PropertyInjection {
  registry: Arc<PropertyRegistry>,
}

impl PropertyInjection {
  /// Uses the process-wide registry.
  #[cfg(feature = "global")]
  pub fn new() -> Self {
    Self {
      registry: crate::global::global_registry_arc(),
    }
  }

  /// Uses an empty private registry.
  #[cfg(not(feature = "global"))]
  pub fn new() -> Self {
    Self {
      registry: Arc::new(PropertyRegistry::new()),
    }
  }

  /// Reads declarations from `registry` instead.
  pub fn registry(mut self, registry: Arc<PropertyRegistry>) -> Self {
    self.registry = registry;
    self
  }

  pub fn install(self, container: &Container) {
    let registry = self.registry;
    container.set_handler_created_callback(move |base: Arc<dyn InvocationHandler>| {
      tracing::debug!(target_type = base.target().type_name(), "wrapping invocation handler");
      Arc::new(HandlerWrapper::new(base, Arc::clone(&registry))) as Arc<dyn InvocationHandler>
    });
  }
}

impl Default for PropertyInjection {
  fn default() -> Self {
    Self::new()
  }
}

/// Installs property injection backed by the global registry.
#[cfg(feature = "global")]
pub fn install(container: &Container) {
  PropertyInjection::new().install(container);
}

/// Installs property injection backed by `registry`.
pub fn install_with(container: &Container, registry: Arc<PropertyRegistry>) {
  PropertyInjection::new().registry(registry).install(container);
}

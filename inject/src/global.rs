//! The global container and property registry, and access functions.

use crate::container::Container;
use crate::declare::ClassDefinition;
use crate::registry::{PropertyConvention, PropertyRegistry};
use once_cell::sync::Lazy;
use std::any::Any;
use std::sync::Arc;

// Both are created on first access in a thread-safe manner.
static GLOBAL_CONTAINER: Lazy<Container> = Lazy::new(Container::default);
static GLOBAL_REGISTRY: Lazy<Arc<PropertyRegistry>> = Lazy::new(Default::default);

/// Provides a reference to the global container instance.
///
/// # Examples
///
/// ```
/// use fibre_inject::global;
///
/// fn register_services() {
///   // Get the global container and register a service.
///   global().add_instance(String::from("Hello from global!"));
/// }
/// ```
pub fn global() -> &'static Container {
  &GLOBAL_CONTAINER
}

/// The process-wide property registry. Descriptors defined here live for the
/// rest of the process.
pub fn global_registry() -> &'static PropertyRegistry {
  &GLOBAL_REGISTRY
}

pub(crate) fn global_registry_arc() -> Arc<PropertyRegistry> {
  Arc::clone(&GLOBAL_REGISTRY)
}

/// Starts declaring `T`'s property dependencies in the global registry.
pub fn define<T: Any + Send + Sync>() -> ClassDefinition<'static, T> {
  global_registry().define::<T>()
}

/// Like [`define`], seeded with `T`'s convention map.
pub fn define_conventional<T: PropertyConvention>() -> ClassDefinition<'static, T> {
  global_registry().define_conventional::<T>()
}

//! The main `Container` struct and its associated methods.

use crate::core::{DependencyKey, Erased, Factory, Provider, ResolutionGuard, Token};
use crate::error::{Error, Result};
use crate::handler::{
  Constructor, ConstructorHandler, DynamicDependency, Instance, InvocationHandler, Target,
};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Builds the handler used for a component from the container's default one.
pub type HandlerCreatedCallback =
  dyn Fn(Arc<dyn InvocationHandler>) -> Arc<dyn InvocationHandler> + Send + Sync;

// A constructible type. `handler` is built on first instantiation and
// then reused, so the handler-created callback runs once per component.
struct Component {
  target: Target,
  constructor: Constructor,
  handler: OnceCell<Arc<dyn InvocationHandler>>,
}

/// The Inversion of Control (IoC) container.
///
/// This struct holds the registrations for all services and components. It
/// is thread-safe and allows for dynamic registration and resolution.
#[derive(Default)]
pub struct Container {
  providers: DashMap<DependencyKey, Arc<Provider>>,
  components: DashMap<TypeId, Arc<Component>>,
  on_handler_created: RwLock<Option<Arc<HandlerCreatedCallback>>>,
}

impl Container {
  /// Creates a new, empty `Container`.
  pub fn new() -> Self {
    Self::default()
  }

  // --- PRIVATE HELPERS ---

  fn insert_provider(&self, key: DependencyKey, provider: Provider) {
    self.providers.insert(key, Arc::new(provider));
  }

  fn add_instance_internal<T: Any + Send + Sync>(&self, name: Option<&str>, instance: T) {
    let provider = Provider::Instance {
      value: Box::new(Arc::new(instance)),
    };
    self.insert_provider(DependencyKey::from_parts::<T>(name), provider);
  }

  fn add_singleton_internal<T: Any + Send + Sync>(
    &self,
    name: Option<&str>,
    factory: impl Fn() -> T + Send + Sync + 'static,
  ) {
    let provider = Provider::Singleton {
      cell: OnceCell::new(),
      factory: Box::new(move |_: &Container| Ok(Box::new(Arc::new(factory())) as Erased)),
    };
    self.insert_provider(DependencyKey::from_parts::<T>(name), provider);
  }

  fn add_transient_internal<T: Any + Send + Sync>(
    &self,
    name: Option<&str>,
    factory: impl Fn() -> T + Send + Sync + 'static,
  ) {
    let provider = Provider::Transient {
      factory: Box::new(move |_: &Container| Ok(Box::new(Arc::new(factory())) as Erased)),
    };
    self.insert_provider(DependencyKey::from_parts::<T>(name), provider);
  }

  fn add_singleton_trait_internal<I: ?Sized + Any + Send + Sync>(
    &self,
    name: Option<&str>,
    factory: impl Fn() -> Arc<I> + Send + Sync + 'static,
  ) {
    let provider = Provider::Singleton {
      cell: OnceCell::new(),
      factory: Box::new(move |_: &Container| Ok(Box::new(factory()) as Erased)),
    };
    self.insert_provider(DependencyKey::from_parts::<I>(name), provider);
  }

  fn add_component_internal<T: Any + Send + Sync>(
    &self,
    singleton: bool,
    constructor: impl Fn(&Container, &[DynamicDependency]) -> Result<T> + Send + Sync + 'static,
  ) {
    let constructor: Constructor = Arc::new(
      move |container: &Container, dynamic: &[DynamicDependency]| {
        constructor(container, dynamic).map(|instance| Box::new(instance) as Instance)
      },
    );
    let component = Component {
      target: Target::of::<T>(),
      constructor,
      handler: OnceCell::new(),
    };
    self.components.insert(TypeId::of::<T>(), Arc::new(component));

    // `get::<T>()` on a component goes through the same handler pipeline.
    let factory: Factory = Box::new(|container: &Container| {
      Ok(Box::new(Arc::new(container.instantiate::<T>(&[])?)) as Erased)
    });
    let provider = if singleton {
      Provider::Singleton {
        cell: OnceCell::new(),
        factory,
      }
    } else {
      Provider::Transient { factory }
    };
    self.insert_provider(DependencyKey::of::<T>(), provider);
  }

  fn handler_for(&self, target: Target) -> Result<Arc<dyn InvocationHandler>> {
    let component = self
      .components
      .get(&target.type_id())
      .map(|entry| Arc::clone(entry.value()))
      .ok_or(Error::NoConstructor {
        target: target.type_name(),
      })?;

    let handler = component.handler.get_or_init(|| {
      let base: Arc<dyn InvocationHandler> = Arc::new(ConstructorHandler::new(
        component.target,
        Arc::clone(&component.constructor),
      ));
      let callback = self.on_handler_created.read().clone();
      match callback {
        Some(callback) => callback(base),
        None => base,
      }
    });
    Ok(Arc::clone(handler))
  }

  // --- PUBLIC API ---

  // --- Instance Registration ---
  pub fn add_instance<T: Any + Send + Sync>(&self, instance: T) {
    self.add_instance_internal(None, instance);
  }
  pub fn add_instance_with_name<T: Any + Send + Sync>(&self, name: &str, instance: T) {
    self.add_instance_internal(Some(name), instance);
  }

  // --- Singleton Registration ---
  pub fn add_singleton<T: Any + Send + Sync>(
    &self,
    factory: impl Fn() -> T + Send + Sync + 'static,
  ) {
    self.add_singleton_internal(None, factory);
  }
  pub fn add_singleton_with_name<T: Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn() -> T + Send + Sync + 'static,
  ) {
    self.add_singleton_internal(Some(name), factory);
  }

  // --- Transient Registration ---
  pub fn add_transient<T: Any + Send + Sync>(
    &self,
    factory: impl Fn() -> T + Send + Sync + 'static,
  ) {
    self.add_transient_internal(None, factory);
  }
  pub fn add_transient_with_name<T: Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn() -> T + Send + Sync + 'static,
  ) {
    self.add_transient_internal(Some(name), factory);
  }

  // --- Trait Registration ---
  pub fn add_singleton_trait<I: ?Sized + Any + Send + Sync>(
    &self,
    factory: impl Fn() -> Arc<I> + Send + Sync + 'static,
  ) {
    self.add_singleton_trait_internal(None, factory);
  }
  pub fn add_singleton_trait_with_name<I: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn() -> Arc<I> + Send + Sync + 'static,
  ) {
    self.add_singleton_trait_internal(Some(name), factory);
  }

  // --- Component Registration ---

  /// Registers a constructible component.
  ///
  /// `constructor` performs constructor injection by resolving its own
  /// dependencies from the container it is handed. Instances are created
  /// through [`instantiate`](Container::instantiate), and `get::<T>()`
  /// yields a fresh instance on every call.
  pub fn add_component<T: Any + Send + Sync>(
    &self,
    constructor: impl Fn(&Container, &[DynamicDependency]) -> Result<T> + Send + Sync + 'static,
  ) {
    self.add_component_internal(false, constructor);
  }

  /// Like [`add_component`](Container::add_component), but `get::<T>()`
  /// caches the first instance.
  pub fn add_singleton_component<T: Any + Send + Sync>(
    &self,
    constructor: impl Fn(&Container, &[DynamicDependency]) -> Result<T> + Send + Sync + 'static,
  ) {
    self.add_component_internal(true, constructor);
  }

  /// Registers the callback used to build each component's invocation handler.
  ///
  /// The callback receives the default handler and returns the one the
  /// container will use for every later instantiation of that type.
  /// Handlers built before this call are kept as they are.
  pub fn set_handler_created_callback<F>(&self, callback: F)
  where
    F: Fn(Arc<dyn InvocationHandler>) -> Arc<dyn InvocationHandler> + Send + Sync + 'static,
  {
    let previous = self.on_handler_created.write().replace(Arc::new(callback));
    if previous.is_some() {
      tracing::warn!("replaced an existing handler-created callback");
    }
  }

  // --- Instantiation ---

  /// Creates a new instance of a registered component.
  ///
  /// `dynamic` is passed verbatim to the component's constructor.
  pub fn instantiate<T: Any + Send + Sync>(&self, dynamic: &[DynamicDependency]) -> Result<T> {
    let target = Target::of::<T>();
    let handler = self.handler_for(target)?;
    let instance = handler.invoke(self, dynamic)?;
    instance
      .downcast::<T>()
      .map(|boxed| *boxed)
      .map_err(|_| Error::TypeMismatch {
        key: DependencyKey::of::<T>(),
        expected: target.type_name(),
      })
  }

  /// The invocation handler in use for component `T`, building it if needed.
  pub fn handler<T: Any + Send + Sync>(&self) -> Result<Arc<dyn InvocationHandler>> {
    self.handler_for(Target::of::<T>())
  }

  // --- Resolution ---

  /// Resolves a service from the container.
  pub fn get<T: ?Sized + Any + Send + Sync>(&self, name: Option<&str>) -> Result<Arc<T>> {
    self.get_by_key(&DependencyKey::from_parts::<T>(name))
  }

  /// Resolves the service a typed token points to.
  pub fn get_token<V: ?Sized + Any + Send + Sync>(&self, token: &Token<V>) -> Result<Arc<V>> {
    self.get_by_key(token.key())
  }

  /// Returns `true` if a provider is registered under `key`.
  pub fn contains(&self, key: &DependencyKey) -> bool {
    self.providers.contains_key(key)
  }

  fn get_by_key<T: ?Sized + Any + Send + Sync>(&self, key: &DependencyKey) -> Result<Arc<T>> {
    // Tracks the key for the duration of this call. Re-entering it from a
    // factory further down the stack is a cycle.
    let _guard = ResolutionGuard::enter(key)?;

    // Clone the provider out so no map lock is held while factories run.
    let provider = self
      .providers
      .get(key)
      .map(|entry| Arc::clone(entry.value()))
      .ok_or_else(|| Error::NotRegistered { key: key.clone() })?;

    provider.resolve::<T>(self, key)
  }
}

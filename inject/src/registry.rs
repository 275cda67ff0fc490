//! Per-type property dependency metadata.
//!
//! A [`PropertyRegistry`] maps a target type to its sealed [`TargetDescriptor`]:
//! the ordered property bindings plus an optional post-construction hook.
//! Descriptors are written once, when a type is defined, and only read
//! afterwards.

use crate::container::Container;
use crate::core::{DependencyKey, Erased, Token};
use crate::declare::ClassDefinition;
use crate::error::{BoxError, Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type Resolver = Box<dyn Fn(&Container) -> Result<Erased> + Send + Sync>;
type Assigner = Box<dyn Fn(&mut (dyn Any + Send + Sync), Erased) -> Result<()> + Send + Sync>;
pub(crate) type Hook =
  Box<dyn Fn(&mut (dyn Any + Send + Sync)) -> Result<(), BoxError> + Send + Sync>;

/// One injectable property: its name, the key it resolves, and a typed
/// setter hidden behind an erased signature.
pub struct PropertyBinding {
  name: String,
  key: DependencyKey,
  resolver: Resolver,
  assigner: Assigner,
}

impl PropertyBinding {
  pub(crate) fn new<T, V>(
    name: &str,
    token: Token<V>,
    setter: impl Fn(&mut T, Arc<V>) + Send + Sync + 'static,
  ) -> Self
  where
    T: Any + Send + Sync,
    V: ?Sized + Any + Send + Sync,
  {
    let resolve_token = token.clone();
    let key = token.into_key();
    let assign_key = key.clone();

    let resolver: Resolver = Box::new(move |container: &Container| {
      let value = container.get_token(&resolve_token)?;
      Ok(Box::new(value) as Erased)
    });

    let assigner: Assigner = Box::new(move |instance: &mut (dyn Any + Send + Sync), value: Erased| {
      let value = value
        .downcast::<Arc<V>>()
        .map_err(|_| Error::TypeMismatch {
          key: assign_key.clone(),
          expected: std::any::type_name::<V>(),
        })?;
      let instance = instance
        .downcast_mut::<T>()
        .ok_or_else(|| Error::TypeMismatch {
          key: DependencyKey::of::<T>(),
          expected: std::any::type_name::<T>(),
        })?;
      setter(instance, *value);
      Ok(())
    });

    Self {
      name: name.to_owned(),
      key,
      resolver,
      assigner,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn key(&self) -> &DependencyKey {
    &self.key
  }

  pub(crate) fn resolve(&self, container: &Container) -> Result<Erased> {
    (self.resolver)(container)
  }

  pub(crate) fn assign(&self, instance: &mut (dyn Any + Send + Sync), value: Erased) -> Result<()> {
    (self.assigner)(instance, value)
  }
}

impl fmt::Debug for PropertyBinding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PropertyBinding")
      .field("name", &self.name)
      .field("key", &self.key)
      .finish()
  }
}

/// An ordered property-name to binding map for one target type.
///
/// This is the shape of both sources the registry merges: the explicit
/// convention map a type hands over through [`PropertyConvention`], and the
/// entries collected by [`ClassDefinition`].
pub struct PropertyMap<T> {
  entries: IndexMap<String, PropertyBinding>,
  _marker: PhantomData<fn(&mut T)>,
}

impl<T: Any + Send + Sync> PropertyMap<T> {
  pub fn new() -> Self {
    Self {
      entries: IndexMap::new(),
      _marker: PhantomData,
    }
  }

  /// Maps `name` to `token`. Inserting an existing name replaces its binding
  /// and keeps its position.
  pub fn insert<V>(
    &mut self,
    name: &str,
    token: Token<V>,
    setter: impl Fn(&mut T, Arc<V>) + Send + Sync + 'static,
  ) -> &mut Self
  where
    V: ?Sized + Any + Send + Sync,
  {
    self.insert_binding(PropertyBinding::new::<T, V>(name, token, setter));
    self
  }

  /// Builder form of [`insert`](PropertyMap::insert).
  pub fn with<V>(
    mut self,
    name: &str,
    token: Token<V>,
    setter: impl Fn(&mut T, Arc<V>) + Send + Sync + 'static,
  ) -> Self
  where
    V: ?Sized + Any + Send + Sync,
  {
    self.insert(name, token, setter);
    self
  }

  pub(crate) fn insert_binding(&mut self, binding: PropertyBinding) {
    self.entries.insert(binding.name.clone(), binding);
  }

  pub fn key_of(&self, name: &str) -> Option<&DependencyKey> {
    self.entries.get(name).map(PropertyBinding::key)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Folds `overrides` into `self`. Names already present take the
  /// override's binding in place; new names are appended.
  pub(crate) fn merge(mut self, overrides: PropertyMap<T>) -> Self {
    for (_, binding) in overrides.entries {
      self.insert_binding(binding);
    }
    self
  }

  pub(crate) fn into_bindings(self) -> Vec<PropertyBinding> {
    self.entries.into_values().collect()
  }
}

impl<T: Any + Send + Sync> Default for PropertyMap<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for PropertyMap<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map()
      .entries(self.entries.iter().map(|(name, binding)| (name, &binding.key)))
      .finish()
  }
}

/// Convention-based property declarations attached to a type.
///
/// Implementing this trait is the static counterpart of declaring each
/// property through [`ClassDefinition`]. The two sources are merged by
/// [`PropertyRegistry::define_conventional`].
pub trait PropertyConvention: Any + Send + Sync + Sized {
  fn property_dependencies(map: &mut PropertyMap<Self>);
}

/// The sealed, merged injection metadata of one target type.
pub struct TargetDescriptor {
  type_name: &'static str,
  bindings: Vec<PropertyBinding>,
  post_construct: Option<Hook>,
}

impl TargetDescriptor {
  pub(crate) fn new(
    type_name: &'static str,
    bindings: Vec<PropertyBinding>,
    post_construct: Option<Hook>,
  ) -> Self {
    Self {
      type_name,
      bindings,
      post_construct,
    }
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// Bindings in resolution order.
  pub fn bindings(&self) -> &[PropertyBinding] {
    &self.bindings
  }

  pub fn property_names(&self) -> impl Iterator<Item = &str> {
    self.bindings.iter().map(PropertyBinding::name)
  }

  pub fn key_of(&self, property: &str) -> Option<&DependencyKey> {
    self
      .bindings
      .iter()
      .find(|binding| binding.name == property)
      .map(PropertyBinding::key)
  }

  pub fn has_post_construct(&self) -> bool {
    self.post_construct.is_some()
  }

  pub(crate) fn post_construct(&self) -> Option<&Hook> {
    self.post_construct.as_ref()
  }
}

impl fmt::Debug for TargetDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TargetDescriptor")
      .field("type_name", &self.type_name)
      .field("bindings", &self.bindings)
      .field("post_construct", &self.post_construct.is_some())
      .finish()
  }
}

/// The per-type cache of [`TargetDescriptor`]s.
///
/// Reads are lock-free for distinct shards. Each type can be defined once;
/// concurrent definitions of the same type are serialized by the map's
/// entry lock and all but the first fail with [`Error::AlreadyDefined`].
#[derive(Default)]
pub struct PropertyRegistry {
  descriptors: DashMap<TypeId, Arc<TargetDescriptor>>,
}

impl PropertyRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts declaring the injection metadata of `T`.
  pub fn define<T: Any + Send + Sync>(&self) -> ClassDefinition<'_, T> {
    ClassDefinition::new(self)
  }

  /// Like [`define`](PropertyRegistry::define), seeded with `T`'s convention map.
  pub fn define_conventional<T: PropertyConvention>(&self) -> ClassDefinition<'_, T> {
    let mut convention = PropertyMap::new();
    T::property_dependencies(&mut convention);
    ClassDefinition::new(self).with_convention(convention)
  }

  pub fn descriptor(&self, type_id: TypeId) -> Option<Arc<TargetDescriptor>> {
    self.descriptors.get(&type_id).map(|entry| Arc::clone(entry.value()))
  }

  pub fn descriptor_of<T: Any>(&self) -> Option<Arc<TargetDescriptor>> {
    self.descriptor(TypeId::of::<T>())
  }

  pub fn is_defined<T: Any>(&self) -> bool {
    self.descriptors.contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.descriptors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.descriptors.is_empty()
  }

  pub(crate) fn seal<T: Any>(&self, descriptor: TargetDescriptor) -> Result<Arc<TargetDescriptor>> {
    match self.descriptors.entry(TypeId::of::<T>()) {
      Entry::Occupied(_) => Err(Error::AlreadyDefined {
        target: std::any::type_name::<T>(),
      }),
      Entry::Vacant(slot) => {
        let descriptor = Arc::new(descriptor);
        slot.insert(Arc::clone(&descriptor));
        tracing::debug!(
          target_type = descriptor.type_name(),
          properties = descriptor.bindings().len(),
          post_construct = descriptor.has_post_construct(),
          "defined property dependencies"
        );
        Ok(descriptor)
      }
    }
  }
}

impl fmt::Debug for PropertyRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PropertyRegistry")
      .field("defined", &self.descriptors.len())
      .finish()
  }
}

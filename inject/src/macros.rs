//! Public macros for service resolution and property declarations.

/// Resolves a service from the global container.
///
/// # Panics
///
/// Panics if the service cannot be resolved. For a non-panicking version,
/// use `global().get(...)` directly.
///
/// # Examples
///
/// ```
/// use fibre_inject::{global, resolve};
///
/// global().add_singleton(|| String::from("hello"));
///
/// let message = resolve!(String);
/// assert_eq!(*message, "hello");
/// ```
#[cfg(feature = "global")]
#[macro_export]
macro_rules! resolve {
  ($($args:tt)+) => {
    $crate::resolve_from!($crate::global(), $($args)+)
  };
}

/// Resolves a service from the given container, panicking on failure.
///
/// ```
/// use fibre_inject::{resolve_from, Container};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct English;
/// impl Greeter for English { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// let container = Container::new();
/// container.add_singleton_trait::<dyn Greeter>(|| Arc::new(English));
///
/// let greeter = resolve_from!(&container, trait Greeter);
/// assert_eq!(greeter.greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve_from {
  // Arm for resolving a trait object: resolve_from!(c, trait MyTrait)
  ($container:expr, trait $trait_ident:ident) => {
    $container
      .get::<dyn $trait_ident>(None)
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service {}: {}",
          std::any::type_name::<dyn $trait_ident>(),
          err
        )
      })
  };

  // Arm for resolving a named trait object: resolve_from!(c, trait MyTrait, "name")
  ($container:expr, trait $trait_ident:ident, $name:expr) => {
    $container
      .get::<dyn $trait_ident>(Some($name))
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service {} with name '{}': {}",
          std::any::type_name::<dyn $trait_ident>(),
          $name,
          err
        )
      })
  };

  ($container:expr, $type:ty) => {
    $container.get::<$type>(None).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service {}: {}",
        std::any::type_name::<$type>(),
        err
      )
    })
  };

  ($container:expr, $type:ty, $name:expr) => {
    $container.get::<$type>(Some($name)).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service {} with name '{}': {}",
        std::any::type_name::<$type>(),
        $name,
        err
      )
    })
  };
}

/// Declares an `Option<Arc<_>>` field as an injectable property.
///
/// The property name is the field name. With `=> token`, the field is bound
/// to that token and the macro yields the definition. Without one, the key
/// is inferred from the value type and the macro yields a `Result`.
///
/// ```
/// use fibre_inject::{declare_property, PropertyRegistry, Token};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
///
/// struct Widget {
///   logger: Option<Arc<dyn Logger>>,
///   title: Option<Arc<String>>,
/// }
///
/// let registry = PropertyRegistry::new();
/// let definition = declare_property!(registry.define::<Widget>(), logger: dyn Logger).unwrap();
/// let definition = declare_property!(definition, title: String => Token::named("title"));
/// definition.finish().unwrap();
/// ```
#[macro_export]
macro_rules! declare_property {
  ($definition:expr, $field:ident : $value:ty => $token:expr) => {
    $definition.declare_property::<$value>(stringify!($field), $token, |target, value| {
      target.$field = ::std::option::Option::Some(value)
    })
  };

  ($definition:expr, $field:ident : $value:ty) => {
    $definition.declare_property_auto::<$value>(stringify!($field), |target, value| {
      target.$field = ::std::option::Option::Some(value)
    })
  };
}

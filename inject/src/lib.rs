//! # Fibre Inject
//!
//! Property injection and post-construction hooks for a thread-safe IoC
//! container, added without touching how the container resolves
//! constructor dependencies.
//!
//! The container builds one [`InvocationHandler`] per component type and
//! offers a handler-created callback that may replace it. [`install`] uses
//! that callback to wrap every handler in a [`HandlerWrapper`]. After the
//! component's constructor has run, the wrapper resolves the declared
//! properties and runs the post-construction hook. Types with no
//! declarations come out exactly as the constructor built them.
//!
//! ## Core Concepts
//!
//! - **Container**: registry of services and constructible components.
//! - **PropertyRegistry**: per-type, write-once injection metadata.
//! - **ClassDefinition**: the builder used to declare injectable properties,
//!   either with an explicit [`Token`] or keyed by the property's value type.
//! - **PropertyConvention**: a trait carrying a type's declarations, merged
//!   with (and overridden by) builder declarations.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_inject::{install_with, Container, PostConstruct, PropertyRegistry, BoxError};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!   fn log(&self, line: &str);
//! }
//!
//! struct StdoutLogger;
//! impl Logger for StdoutLogger {
//!   fn log(&self, line: &str) {
//!     println!("{line}");
//!   }
//! }
//!
//! struct Widget {
//!   name: String,
//!   logger: Option<Arc<dyn Logger>>,
//!   ready: bool,
//! }
//!
//! impl PostConstruct for Widget {
//!   fn post_construct(&mut self) -> Result<(), BoxError> {
//!     let logger = self.logger.as_ref().ok_or("logger was not injected")?;
//!     logger.log(&format!("{} ready", self.name));
//!     self.ready = true;
//!     Ok(())
//!   }
//! }
//!
//! let registry = Arc::new(PropertyRegistry::new());
//! registry
//!   .define::<Widget>()
//!   .declare_property_auto::<dyn Logger>("logger", |w, logger| w.logger = Some(logger))
//!   .unwrap()
//!   .lifecycle()
//!   .finish()
//!   .unwrap();
//!
//! let container = Container::new();
//! install_with(&container, Arc::clone(&registry));
//! container.add_singleton_trait::<dyn Logger>(|| Arc::new(StdoutLogger));
//! container.add_component(|_, _| {
//!   Ok(Widget { name: "widget".into(), logger: None, ready: false })
//! });
//!
//! let widget = container.instantiate::<Widget>(&[]).unwrap();
//! assert!(widget.logger.is_some());
//! assert!(widget.ready);
//! ```

mod container;
mod core;
mod declare;
mod error;
mod extension;
#[cfg(feature = "global")]
mod global;
mod handler;
mod macros;
mod registry;

pub use crate::core::{DependencyKey, Token};
pub use container::{Container, HandlerCreatedCallback};
pub use declare::{ClassDefinition, PostConstruct};
pub use error::{BoxError, Error, Result};
#[cfg(feature = "global")]
pub use extension::install;
pub use extension::{install_with, PropertyInjection};
#[cfg(feature = "global")]
pub use global::{define, define_conventional, global, global_registry};
pub use handler::{
  ConstructorHandler, DynamicDependency, HandlerWrapper, Instance, InvocationHandler, Target,
};
pub use registry::{
  PropertyBinding, PropertyConvention, PropertyMap, PropertyRegistry, TargetDescriptor,
};

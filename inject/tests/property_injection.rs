//! End-to-end behaviour of the wrapped creation pipeline.

use fibre_inject::{
  install_with, BoxError, Container, DependencyKey, Error, HandlerWrapper, InvocationHandler,
  PostConstruct, PropertyRegistry, Token,
};
use pretty_assertions::assert_eq;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc, Mutex,
};
use std::thread;

// --- Test Fixtures ---

trait Logger: Send + Sync {
  fn name(&self) -> &str;
}

struct StubLogger(&'static str);
impl Logger for StubLogger {
  fn name(&self) -> &str {
    self.0
  }
}

struct Clock {
  now: u64,
}

/// Records every step of its own creation in `events`.
struct Widget {
  events: Vec<String>,
  logger: Option<Arc<dyn Logger>>,
  clock: Option<Arc<Clock>>,
  hook_runs: usize,
}

impl Widget {
  fn new() -> Self {
    Self {
      events: vec!["constructed".to_string()],
      logger: None,
      clock: None,
      hook_runs: 0,
    }
  }
}

impl PostConstruct for Widget {
  fn post_construct(&mut self) -> Result<(), BoxError> {
    self.hook_runs += 1;
    self.events.push("post_construct".to_string());
    Ok(())
  }
}

fn define_widget(registry: &PropertyRegistry) {
  registry
    .define::<Widget>()
    .declare_property("logger", Token::<dyn Logger>::new(), |w, v| {
      w.events.push("logger".to_string());
      w.logger = Some(v);
    })
    .declare_property_auto::<Clock>("clock", |w, v| {
      w.events.push("clock".to_string());
      w.clock = Some(v);
    })
    .unwrap()
    .lifecycle()
    .finish()
    .unwrap();
}

fn wired_container(registry: &Arc<PropertyRegistry>) -> Container {
  let container = Container::new();
  install_with(&container, Arc::clone(registry));
  container.add_component(|_, _| Ok(Widget::new()));
  container
}

// --- Tests ---

#[test]
fn test_logger_is_injected_after_construction() {
  // Arrange
  let registry = Arc::new(PropertyRegistry::new());
  define_widget(&registry);
  let container = wired_container(&registry);

  let logger: Arc<dyn Logger> = Arc::new(StubLogger("stub"));
  let registered = Arc::clone(&logger);
  container.add_singleton_trait::<dyn Logger>(move || Arc::clone(&registered));
  container.add_instance(Clock { now: 42 });

  // Act
  let widget = container.instantiate::<Widget>(&[]).unwrap();

  // Assert
  assert!(Arc::ptr_eq(widget.logger.as_ref().unwrap(), &logger));
  assert_eq!(widget.clock.as_ref().unwrap().now, 42);
  assert_eq!(
    widget.events,
    vec!["constructed", "logger", "clock", "post_construct"]
  );
  assert_eq!(widget.hook_runs, 1);
}

#[test]
fn test_unresolvable_property_aborts_instantiation() {
  // Arrange: the clock resolves, the logger does not.
  static CLOCKS_BUILT: AtomicUsize = AtomicUsize::new(0);

  let registry = Arc::new(PropertyRegistry::new());
  define_widget(&registry);
  let container = wired_container(&registry);
  container.add_transient(|| {
    CLOCKS_BUILT.fetch_add(1, Ordering::SeqCst);
    Clock { now: 0 }
  });

  // Act
  let err = container.instantiate::<Widget>(&[]).err().unwrap();

  // Assert
  assert_eq!(err.key(), Some(&DependencyKey::of::<dyn Logger>()));
  match err {
    Error::PropertyResolution {
      property,
      key,
      source,
    } => {
      assert_eq!(property, "logger");
      assert_eq!(key, DependencyKey::of::<dyn Logger>());
      assert!(matches!(*source, Error::NotRegistered { .. }));
    }
    other => panic!("unexpected error: {other}"),
  }
  // Properties after the failing one are never resolved.
  assert_eq!(CLOCKS_BUILT.load(Ordering::SeqCst), 0);
}

#[test]
fn test_types_without_declarations_pass_through() {
  #[derive(Debug, PartialEq)]
  struct Plain {
    id: u32,
  }

  let registry = Arc::new(PropertyRegistry::new());
  let wrapped = wired_container(&registry);
  let unwrapped = Container::new();
  for container in [&wrapped, &unwrapped] {
    container.add_component(|_, _| Ok(Plain { id: 7 }));
  }

  assert_eq!(
    wrapped.instantiate::<Plain>(&[]).unwrap(),
    unwrapped.instantiate::<Plain>(&[]).unwrap()
  );
}

#[test]
fn test_hook_only_definition_runs_hook() {
  struct Service {
    started: bool,
  }

  let registry = Arc::new(PropertyRegistry::new());
  registry
    .define::<Service>()
    .post_construct(|s| {
      s.started = true;
      Ok(())
    })
    .finish()
    .unwrap();
  let container = Container::new();
  install_with(&container, Arc::clone(&registry));
  container.add_component(|_, _| Ok(Service { started: false }));

  assert!(container.instantiate::<Service>(&[]).unwrap().started);
}

#[test]
fn test_failing_hook_is_reported_and_instance_withheld() {
  struct Fragile {
    clock: Option<Arc<Clock>>,
  }

  let registry = Arc::new(PropertyRegistry::new());
  let seen_clock = Arc::new(Mutex::new(None));
  let seen = Arc::clone(&seen_clock);
  registry
    .define::<Fragile>()
    .declare_property_auto::<Clock>("clock", |f, v| f.clock = Some(v))
    .unwrap()
    .post_construct(move |f| {
      // Properties are already in place when the hook runs.
      *seen.lock().unwrap() = f.clock.as_ref().map(|c| c.now);
      Err("warm-up failed".into())
    })
    .finish()
    .unwrap();
  let container = Container::new();
  install_with(&container, Arc::clone(&registry));
  container.add_instance(Clock { now: 9 });
  container.add_component(|_, _| Ok(Fragile { clock: None }));

  let err = container.instantiate::<Fragile>(&[]).err().unwrap();

  match err {
    Error::PostConstruction { target, source } => {
      assert!(target.ends_with("Fragile"));
      assert_eq!(source.to_string(), "warm-up failed");
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(*seen_clock.lock().unwrap(), Some(9));
}

#[test]
fn test_independent_containers_do_not_interfere() {
  // Arrange: one registry, two containers with different clocks.
  let registry = Arc::new(PropertyRegistry::new());
  define_widget(&registry);
  let first = wired_container(&registry);
  let second = wired_container(&registry);
  for (container, now) in [(&first, 1), (&second, 2)] {
    container.add_singleton_trait::<dyn Logger>(|| Arc::new(StubLogger("shared")));
    container.add_instance(Clock { now });
  }

  // Act
  let (a, b) = thread::scope(|s| {
    let a = s.spawn(|| first.instantiate::<Widget>(&[]).unwrap());
    let b = s.spawn(|| second.instantiate::<Widget>(&[]).unwrap());
    (a.join().unwrap(), b.join().unwrap())
  });

  // Assert
  assert_eq!(a.clock.as_ref().unwrap().now, 1);
  assert_eq!(b.clock.as_ref().unwrap().now, 2);
}

#[test]
fn test_hook_runs_once_per_instantiation_under_concurrency() {
  static HOOKS: AtomicUsize = AtomicUsize::new(0);

  struct Counted;

  let registry = Arc::new(PropertyRegistry::new());
  registry
    .define::<Counted>()
    .post_construct(|_| {
      HOOKS.fetch_add(1, Ordering::SeqCst);
      Ok(())
    })
    .finish()
    .unwrap();
  let container = Container::new();
  install_with(&container, Arc::clone(&registry));
  container.add_component(|_, _| Ok(Counted));

  thread::scope(|s| {
    for _ in 0..8 {
      s.spawn(|| {
        for _ in 0..25 {
          container.instantiate::<Counted>(&[]).unwrap();
        }
      });
    }
  });

  assert_eq!(HOOKS.load(Ordering::SeqCst), 200);
}

#[test]
fn test_property_injected_component_as_dependency() {
  struct Report {
    widget: Option<Arc<Widget>>,
  }

  let registry = Arc::new(PropertyRegistry::new());
  define_widget(&registry);
  registry
    .define::<Report>()
    .declare_property_auto::<Widget>("widget", |r, v| r.widget = Some(v))
    .unwrap()
    .finish()
    .unwrap();
  let container = wired_container(&registry);
  container.add_singleton_trait::<dyn Logger>(|| Arc::new(StubLogger("nested")));
  container.add_instance(Clock { now: 5 });
  container.add_component(|_, _| Ok(Report { widget: None }));

  let report = container.instantiate::<Report>(&[]).unwrap();

  let widget = report.widget.as_ref().unwrap();
  assert_eq!(widget.logger.as_ref().unwrap().name(), "nested");
  assert_eq!(widget.hook_runs, 1);
}

#[test]
fn test_self_referencing_property_is_a_cycle() {
  struct Node {
    next: Option<Arc<Node>>,
  }

  let registry = Arc::new(PropertyRegistry::new());
  registry
    .define::<Node>()
    .declare_property_auto::<Node>("next", |n, v| n.next = Some(v))
    .unwrap()
    .finish()
    .unwrap();
  let container = Container::new();
  install_with(&container, Arc::clone(&registry));
  container.add_component(|_, _| Ok(Node { next: None }));

  let err = container.instantiate::<Node>(&[]).err().unwrap();

  // Walk the chain of property failures down to the root cause.
  let mut current = &err;
  while let Error::PropertyResolution { property, source, .. } = current {
    assert_eq!(property, "next");
    current = &**source;
  }
  assert!(matches!(current, Error::CircularDependency { .. }), "got {current}");
}

#[test]
fn test_named_token_selects_registration() {
  struct Auditor {
    logger: Option<Arc<dyn Logger>>,
  }

  let registry = Arc::new(PropertyRegistry::new());
  registry
    .define::<Auditor>()
    .declare_property("logger", Token::<dyn Logger>::named("audit"), |a, v| {
      a.logger = Some(v)
    })
    .finish()
    .unwrap();
  let container = Container::new();
  install_with(&container, Arc::clone(&registry));
  container.add_singleton_trait::<dyn Logger>(|| Arc::new(StubLogger("default")));
  container.add_singleton_trait_with_name::<dyn Logger>("audit", || Arc::new(StubLogger("audit")));
  container.add_component(|_, _| Ok(Auditor { logger: None }));

  let auditor = container.instantiate::<Auditor>(&[]).unwrap();

  assert_eq!(auditor.logger.as_ref().unwrap().name(), "audit");
}

#[test]
fn test_constructor_error_skips_properties_and_hook() {
  // Arrange
  static CLOCKS_BUILT: AtomicUsize = AtomicUsize::new(0);
  static HOOKS: AtomicUsize = AtomicUsize::new(0);

  struct Broken {
    clock: Option<Arc<Clock>>,
  }

  let registry = Arc::new(PropertyRegistry::new());
  registry
    .define::<Broken>()
    .declare_property_auto::<Clock>("clock", |b, v| b.clock = Some(v))
    .unwrap()
    .post_construct(|_| {
      HOOKS.fetch_add(1, Ordering::SeqCst);
      Ok(())
    })
    .finish()
    .unwrap();
  let container = Container::new();
  install_with(&container, Arc::clone(&registry));
  container.add_transient(|| {
    CLOCKS_BUILT.fetch_add(1, Ordering::SeqCst);
    Clock { now: 3 }
  });
  container.add_component::<Broken>(|_, _| Err(Error::constructor::<Broken>("no disk")));

  // Act
  let err = container.instantiate::<Broken>(&[]).err().unwrap();

  // Assert: the constructor's own error comes back as it was raised.
  match err {
    Error::Constructor { target, source } => {
      assert!(target.ends_with("Broken"));
      assert_eq!(source.to_string(), "no disk");
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(CLOCKS_BUILT.load(Ordering::SeqCst), 0);
  assert_eq!(HOOKS.load(Ordering::SeqCst), 0);
}

#[test]
fn test_singleton_component_is_injected_once() {
  // Arrange
  static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

  let registry = Arc::new(PropertyRegistry::new());
  define_widget(&registry);
  let container = Container::new();
  install_with(&container, Arc::clone(&registry));
  container.add_singleton_trait::<dyn Logger>(|| Arc::new(StubLogger("shared")));
  container.add_instance(Clock { now: 11 });
  container.add_singleton_component(|_, _| {
    CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
    Ok(Widget::new())
  });

  // Act
  let first = container.get::<Widget>(None).unwrap();
  let second = container.get::<Widget>(None).unwrap();

  // Assert
  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
  assert_eq!(first.logger.as_ref().unwrap().name(), "shared");
  assert_eq!(first.clock.as_ref().unwrap().now, 11);
  assert_eq!(first.hook_runs, 1);
}

#[test]
fn test_wrapper_delegates_to_base_handler() {
  let registry = Arc::new(PropertyRegistry::new());
  define_widget(&registry);
  let container = Container::new();
  container.add_singleton_trait::<dyn Logger>(|| Arc::new(StubLogger("direct")));
  container.add_instance(Clock { now: 4 });
  container.add_component(|_, _| Ok(Widget::new()));

  // No callback installed, so this is the container's own handler.
  let base = container.handler::<Widget>().unwrap();
  let wrapper = HandlerWrapper::new(Arc::clone(&base), Arc::clone(&registry));

  assert_eq!(wrapper.inner().target(), base.target());
  assert_eq!(wrapper.target(), base.target());

  let instance = wrapper.invoke(&container, &[]).unwrap();
  let widget = instance.downcast::<Widget>().unwrap();
  assert_eq!(
    widget.events,
    vec!["constructed", "logger", "clock", "post_construct"]
  );
  let untouched = base.invoke(&container, &[]).unwrap().downcast::<Widget>().unwrap();
  assert!(untouched.logger.is_none());
}

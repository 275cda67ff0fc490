use fibre_inject::{define, global, install, resolve, BoxError, PostConstruct};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// 1. The abstraction the report depends on.
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE LOG]: {}", message);
  }
}

struct ReportConfig {
  title: String,
}

// 2. A component: the title comes in through its constructor, the logger
//    is assigned afterwards as a property.
struct ReportService {
  title: String,
  logger: Option<Arc<dyn Logger>>,
}

impl ReportService {
  fn generate_report(&self) -> Result<(), BoxError> {
    let logger = self.logger.as_ref().ok_or("logger missing")?;
    logger.log(&format!("Generating '{}'.", self.title));
    logger.log("Finished report generation.");
    Ok(())
  }
}

impl PostConstruct for ReportService {
  fn post_construct(&mut self) -> Result<(), BoxError> {
    let logger = self.logger.as_ref().ok_or("logger missing")?;
    logger.log("ReportService is ready.");
    Ok(())
  }
}

fn main() -> Result<(), BoxError> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  // --- Declarations ---
  define::<ReportService>()
    .declare_property_auto::<dyn Logger>("logger", |report, logger| report.logger = Some(logger))?
    .lifecycle()
    .finish()?;

  // --- Registration ---
  install(global());
  global().add_singleton_trait::<dyn Logger>(|| Arc::new(ConsoleLogger));
  global().add_instance(ReportConfig {
    title: "Quarterly numbers".to_string(),
  });
  global().add_component(|container, _| {
    let config = container.get::<ReportConfig>(None)?;
    Ok(ReportService {
      title: config.title.clone(),
      logger: None,
    })
  });

  // --- Resolution and Usage ---
  println!("Resolving the report service...");
  let report_service = resolve!(ReportService);
  report_service.generate_report()
}

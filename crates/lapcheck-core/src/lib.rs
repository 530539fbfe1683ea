pub mod config;
pub mod error;
pub mod models;
pub mod reporter;
pub mod runner;
pub mod scenario;
pub mod testutil;
pub mod traits;
pub mod util;

pub use config::RunConfig;
pub use error::AppError;
pub use models::{Artifact, CheckResult, Point, RunReport, compute_hash};
pub use reporter::{ConsoleRunReporter, RunEvent, RunReporter, TracingRunReporter};
pub use runner::ScenarioRunner;
pub use scenario::{Scenario, ScenarioResolver, Step};
pub use traits::PageDriver;

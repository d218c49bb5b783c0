//! Test harness utilities shared by the daemon suites.

mod config_loader;
mod evaluator;
mod reporter;
mod responses;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use evaluator::MockRuntime;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use responses::{has_status, request, statuses, text};
pub use world::{TestWorld, world};

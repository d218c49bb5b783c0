//! Scenario world for daemon bootstrap: which loader runs and what came out.

use std::cell::RefCell;
use std::sync::Arc;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::evaluator::reference::ReferenceEvaluator;

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

type Outcome = Result<Daemon<ReferenceEvaluator>, BootstrapError>;

/// Loader, reporter and bootstrap outcome for one scenario.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Outcome>,
}

impl TestWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
        }
    }

    /// Swaps in `loader` and forgets any earlier outcome.
    pub fn load_with(&mut self, loader: impl ConfigLoader + 'static) {
        self.loader = Box::new(loader);
        self.outcome = None;
    }

    /// Loopback TCP on an ephemeral port.
    pub fn load_loopback(&mut self) {
        self.load_with(TestConfigLoader::new());
    }

    /// A command line naming an endpoint that does not parse.
    pub fn load_bad_listen_flag(&mut self) {
        self.load_with(FailingConfigLoader);
    }

    /// Runs bootstrap unless it already ran.
    pub fn bootstrap(&mut self) {
        if self.outcome.is_none() {
            let outcome = bootstrap_with(&*self.loader, &*self.reporter, ReferenceEvaluator::new());
            self.outcome = Some(outcome);
        }
    }

    /// The daemon, or why there is none.
    ///
    /// # Errors
    ///
    /// Describes the bootstrap error, or that bootstrap never ran.
    pub fn daemon(&self) -> Result<&Daemon<ReferenceEvaluator>, String> {
        match &self.outcome {
            Some(Ok(daemon)) => Ok(daemon),
            Some(Err(error)) => Err(format!("bootstrap failed: {error}")),
            None => Err("bootstrap never ran".to_owned()),
        }
    }

    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().err())
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

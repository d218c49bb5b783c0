//! Turns layered configuration into an engine ready to serve.
//!
//! Bootstrap resolves the configuration, installs the log subscriber,
//! prepares the Unix socket directory when one is configured and wraps the
//! evaluator in a [`SharedEngine`]. Whichever step fails is reported through
//! the [`HealthReporter`] before the error is returned.

use std::sync::Arc;

use ortho_config::{OrthoConfig as _, OrthoError};
use thiserror::Error;

use lantern_config::{Config, SocketPreparationError};

use crate::dispatch::{Engine, SharedEngine};
use crate::evaluator::Evaluator;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the daemon configuration.
pub trait ConfigLoader: Send + Sync {
    /// Resolves the configuration from its layers.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when any layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Reads the process's command line, `LANTERN_*` environment and
/// configuration file through [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Hands out a configuration resolved elsewhere, such as by an embedding
/// application.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Why the daemon could not get ready.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A configuration layer was invalid.
    #[error("configuration is invalid: {source}")]
    Configuration {
        /// Loader failure.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Logging could not start.
    #[error("logging cannot start: {source}")]
    Telemetry {
        /// Subscriber failure.
        #[source]
        source: TelemetryError,
    },
    /// The directory holding the Unix socket could not be prepared.
    #[error("socket directory cannot be prepared: {source}")]
    Socket {
        /// Filesystem failure.
        #[source]
        source: SocketPreparationError,
    },
}

/// A configured daemon whose engine is ready for clients.
pub struct Daemon<E> {
    config: Config,
    engine: SharedEngine<E>,
    telemetry: TelemetryHandle,
}

impl<E: Evaluator> Daemon<E> {
    /// The resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The engine every connection dispatches into.
    #[must_use]
    pub const fn engine(&self) -> &SharedEngine<E> {
        &self.engine
    }

    /// The installed log subscriber.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the daemon around `evaluator`.
///
/// # Errors
///
/// Fails when configuration cannot be loaded, logging cannot start or the
/// Unix socket directory cannot be prepared.
pub fn bootstrap_with<E>(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
    evaluator: E,
) -> Result<Daemon<E>, BootstrapError>
where
    E: Evaluator,
{
    reporter.bootstrap_starting();
    let (config, telemetry) =
        prepare(loader).inspect_err(|error| reporter.bootstrap_failed(error))?;
    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        engine: SharedEngine::new(Engine::new(evaluator)),
        telemetry,
    })
}

fn prepare(loader: &dyn ConfigLoader) -> Result<(Config, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .listen()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;
    Ok((config, telemetry))
}

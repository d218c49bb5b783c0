//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::NreplConnectionHandler;
use crate::evaluator::Evaluator;
use crate::evaluator::reference::ReferenceEvaluator;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::port_file::PortFile;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// How long connected clients may keep talking after shutdown is requested.
const CLIENT_GRACE: Duration = Duration::from_secs(2);

/// Runs the daemon using the production collaborators and the reference
/// evaluator.
///
/// # Errors
///
/// See [`run_daemon_with`].
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        ReferenceEvaluator::new(),
        &SystemShutdownSignal::new(),
    )
}

/// Runs the daemon with injected collaborators.
///
/// Bootstraps, binds the configured endpoint, advertises a bound TCP port
/// through the port file and serves clients until `shutdown` returns.
///
/// # Errors
///
/// Fails when bootstrap, binding, the port file or the shutdown listener
/// fails. Once shutdown is requested, connected clients get a short grace
/// period to hang up before the run returns.
pub fn run_daemon_with<E, S>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    evaluator: E,
    shutdown: &S,
) -> Result<(), LaunchError>
where
    E: Evaluator + 'static,
    S: ShutdownSignal + ?Sized,
{
    info!(target: PROCESS_TARGET, "starting daemon runtime");
    let daemon = bootstrap_with(loader, reporter.as_ref(), evaluator)?;
    let config = daemon.config();

    let listener = SocketListener::bind(config.listen())?;
    let bound = listener.local_addr();
    let address = bound.map_or_else(|| listener.endpoint().to_string(), |addr| addr.to_string());
    let port_file = match (config.port_file(), bound) {
        (Some(path), Some(addr)) => Some(PortFile::write(path, addr.port())?),
        _ => None,
    };

    let handler = Arc::new(NreplConnectionHandler::new(daemon.engine().clone()));
    let listener_handle = listener.start(handler, Arc::clone(&reporter))?;
    reporter.listening(&address, port_file.as_ref().map(PortFile::path));

    let waited = shutdown.wait();
    let summary = listener_handle.finish(CLIENT_GRACE)?;
    drop(port_file);
    waited?;

    reporter.shutdown_complete(summary);
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

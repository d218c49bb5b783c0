//! The Lantern nREPL server.
//!
//! `lanternd` accepts nREPL clients (CIDER, Calva, `rep`) over TCP or Unix
//! sockets and answers their Bencode requests against a language runtime
//! behind the [`evaluator::Evaluator`] trait. The crate is layered:
//!
//! - [`transport`] binds the endpoint and hands each accepted connection to a
//!   handler on its own thread.
//! - [`dispatch`] decodes messages, routes every `op` through the
//!   [`Engine`](dispatch::Engine) and writes the responses back in order.
//! - [`session`] and [`middleware`] hold the per-client state the ops read
//!   and mutate.
//! - [`evaluator`] defines the runtime contract and ships
//!   [`ReferenceEvaluator`](evaluator::reference::ReferenceEvaluator), a
//!   small interpreter good enough to drive the server end to end.
//!
//! The daemon shell around them follows the usual sequence: load layered
//! configuration, install telemetry, report health events, bind, write the
//! `.nrepl-port` file, then wait for a termination signal.

mod bootstrap;
pub mod dispatch;
pub mod evaluator;
mod health;
pub mod middleware;
mod process;
pub mod session;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon, run_daemon_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;

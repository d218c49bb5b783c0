//! Test suites for the Lantern daemon.

mod session_behaviour;
pub(crate) mod support;
mod unit;

//! Unit tests for the daemon bootstrap utilities.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::rstest;

use lantern_config::{Config, SocketEndpoint};

use crate::evaluator::reference::ReferenceEvaluator;
use crate::{BootstrapError, StaticConfigLoader, bootstrap_with};

use super::support::{
    FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader, request, text,
};

#[rstest]
fn bootstrap_reports_start_and_success() {
    let loader = TestConfigLoader::new();
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, &*reporter, ReferenceEvaluator::new())
        .expect("bootstrap should succeed");

    assert_eq!(
        reporter.events(),
        [HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
    assert_eq!(daemon.config().listen(), &SocketEndpoint::tcp("127.0.0.1", 0));
}

#[rstest]
fn bootstrapped_engine_answers_requests() {
    let loader = TestConfigLoader::new();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let daemon = bootstrap_with(&loader, &*reporter, ReferenceEvaluator::new())
        .expect("bootstrap should succeed");

    let responses = daemon
        .engine()
        .handle(&request(&[("op", "eval"), ("code", "(* 6 7)"), ("id", "1")]));

    assert_eq!(text(&responses[0], "value"), Some("42"));
}

#[rstest]
fn configuration_failures_are_reported() {
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = bootstrap_with(&FailingConfigLoader, &*reporter, ReferenceEvaluator::new())
        .err()
        .expect("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Configuration { .. }));
    let events = reporter.events();
    assert_eq!(events.first(), Some(&HealthEvent::BootstrapStarting));
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::BootstrapFailed(_))),
        "bootstrap failure event missing: {events:?}"
    );
    assert!(!events.contains(&HealthEvent::BootstrapSucceeded));
}

#[rstest]
fn unusable_socket_directories_fail_bootstrap() {
    let dir = tempfile::tempdir().expect("temp dir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").expect("write blocker");
    let socket = Utf8PathBuf::from_path_buf(blocker.join("run/nrepl.sock")).expect("utf8 path");
    let loader = StaticConfigLoader::new(Config {
        listen: SocketEndpoint::unix(socket),
        ..Config::default()
    });
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = bootstrap_with(&loader, &*reporter, ReferenceEvaluator::new())
        .err()
        .expect("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Socket { .. }));
}

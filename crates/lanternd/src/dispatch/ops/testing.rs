//! `test` and `test-var-query`.
//!
//! Both ops ask the evaluator to run test vars and reshape its pass, fail
//! and error records into the result tree CIDER expects:
//! `results[ns][var] = [record...]` plus a `summary` of totals.

use std::time::{Duration, Instant};

use lantern_bencode::{Dict, Value};
use tracing::debug;

use crate::dispatch::engine::{ENGINE_TARGET, Engine};
use crate::dispatch::errors::Rejection;
use crate::dispatch::message::Message;
use crate::dispatch::response::{Response, integer};
use crate::evaluator::{Evaluator, Namespace, TestCounts, TestKind, TestRecord};

/// File reported for records that carry no location.
const NO_SOURCE_FILE: &str = "NO_SOURCE_FILE";

fn elapsed_dict(elapsed: Duration) -> Value {
    let ms = elapsed.as_millis();
    let mut dict = Dict::new();
    dict.insert("ms".to_owned(), integer(ms));
    dict.insert("humanized".to_owned(), Value::from(format!("Completed in {ms} ms")));
    Value::Dict(dict)
}

/// Totals reported in `summary`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Summary {
    ns: u64,
    var: u64,
    counts: TestCounts,
}

impl Summary {
    fn to_value(self) -> Value {
        let mut dict = Dict::new();
        for (key, count) in [
            ("ns", self.ns),
            ("var", self.var),
            ("test", self.counts.test),
            ("pass", self.counts.pass),
            ("fail", self.counts.fail),
            ("error", self.counts.error),
        ] {
            dict.insert(key.to_owned(), integer(count));
        }
        Value::Dict(dict)
    }
}

/// Accumulates records and totals across one request.
struct TestRun {
    fail_fast: bool,
    started: Instant,
    results: Dict,
    summary: Summary,
}

impl TestRun {
    fn new(message: &Message) -> Self {
        Self {
            fail_fast: message.text("fail-fast") == "true",
            started: Instant::now(),
            results: Dict::new(),
            summary: Summary::default(),
        }
    }

    fn should_stop(&self) -> bool {
        self.fail_fast && (self.summary.counts.fail > 0 || self.summary.counts.error > 0)
    }

    fn base_record(kind: TestKind, ns: &str, var: &str, index: usize) -> Dict {
        let mut dict = Dict::new();
        dict.insert("type".to_owned(), Value::from(kind.as_str()));
        dict.insert("ns".to_owned(), Value::from(ns));
        dict.insert("var".to_owned(), Value::from(var));
        dict.insert("index".to_owned(), integer(index));
        dict.insert("context".to_owned(), Value::from("nil"));
        dict
    }

    fn record(ns: &str, var: &str, index: usize, record: &TestRecord, elapsed: Duration) -> Value {
        let mut dict = Self::base_record(record.kind, ns, var, index);
        dict.insert(
            "message".to_owned(),
            Value::from(record.message.clone().unwrap_or_default()),
        );
        if record.kind != TestKind::Pass {
            if let Some(expected) = &record.expected {
                dict.insert("expected".to_owned(), Value::from(expected.as_str()));
            }
            if let Some(actual) = &record.actual {
                dict.insert("actual".to_owned(), Value::from(actual.as_str()));
            }
        }
        dict.insert(
            "file".to_owned(),
            Value::from(record.file.as_deref().unwrap_or(NO_SOURCE_FILE)),
        );
        dict.insert("line".to_owned(), integer(record.line.unwrap_or(1)));
        dict.insert("elapsed-time".to_owned(), elapsed_dict(elapsed));
        Value::Dict(dict)
    }

    /// A lone error record standing in for a var that could not run.
    fn failed_var(&mut self, ns: &str, var: &str, message: String) -> Value {
        let mut dict = Self::base_record(TestKind::Error, ns, var, 0);
        dict.insert("message".to_owned(), Value::from(message));
        self.summary.counts.tally(TestKind::Error);
        self.summary.var += 1;
        Value::List(vec![Value::Dict(dict)])
    }

    fn run_var<E: Evaluator>(
        &mut self,
        evaluator: &mut E,
        namespace: &Namespace,
        ns: &str,
        var: &str,
    ) -> Value {
        let started = Instant::now();
        let outcome = match evaluator.run_test(namespace, var) {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!(target: ENGINE_TARGET, ns, var, %error, "test var failed to run");
                return self.failed_var(ns, var, error.message());
            }
        };
        let elapsed = started.elapsed();

        let mut records: Vec<Value> = outcome
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| Self::record(ns, var, index, record, elapsed))
            .collect();
        // A var that passed silently still shows one record; the totals
        // come from the runner's counters alone.
        if records.is_empty() && outcome.counts.test > 0 {
            let synthetic = TestRecord::new(TestKind::Pass);
            records.push(Self::record(ns, var, 0, &synthetic, elapsed));
        }
        self.summary.counts.absorb(outcome.counts);
        self.summary.var += 1;
        Value::List(records)
    }

    fn finish(self, response: Response) -> Dict {
        response
            .field("results", self.results)
            .field("summary", self.summary.to_value())
            .field("elapsed-time", elapsed_dict(self.started.elapsed()))
            .field("ns-elapsed-time", Dict::new())
            .field("var-elapsed-time", Dict::new())
            .done()
    }
}

/// Names under `var-query.ns-query.exactly`.
fn queried_namespaces(message: &Message) -> Vec<String> {
    message
        .get("var-query")
        .and_then(Value::as_dict)
        .and_then(|query| query.get("ns-query")?.as_dict())
        .and_then(|ns_query| ns_query.get("exactly")?.as_list())
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

impl<E: Evaluator> Engine<E> {
    pub(crate) fn test_var_query(&mut self, message: &Message) -> Vec<Dict> {
        let session = self.session_for(message).id().to_owned();
        let response = Response::to(message, Some(&session));
        let namespaces = queried_namespaces(message);
        if namespaces.is_empty() {
            return vec![
                response
                    .field("err", "No namespaces specified in var-query")
                    .status(&["done", "error"])
                    .build(),
            ];
        }

        let mut run = TestRun::new(message);
        for ns in &namespaces {
            let namespace = match self.evaluator.load_namespace(ns) {
                Ok(namespace) => namespace,
                Err(error) => {
                    debug!(target: ENGINE_TARGET, ns = ns.as_str(), %error, "skipping namespace that failed to load");
                    continue;
                }
            };
            let vars = self.evaluator.test_vars(&namespace);
            if vars.is_empty() {
                continue;
            }
            run.summary.ns += 1;

            let mut var_results = Dict::new();
            for var in &vars {
                let records = run.run_var(&mut self.evaluator, &namespace, ns, var);
                var_results.insert(var.clone(), records);
                if run.should_stop() {
                    break;
                }
            }
            run.results.insert(ns.clone(), Value::Dict(var_results));
            if run.should_stop() {
                break;
            }
        }
        vec![run.finish(response)]
    }

    pub(crate) fn test(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let ns = message.text("ns");
        if ns.is_empty() {
            return Err(Rejection::MissingNs);
        }
        let session = self.session_for(message).id().to_owned();
        let response = Response::to(message, Some(&session));

        let load = matches!(message.text("load?"), "" | "true");
        let namespace = if load {
            match self.evaluator.load_namespace(ns) {
                Ok(namespace) => namespace,
                Err(error) => {
                    return Ok(vec![
                        response
                            .field("err", format!("Failed to load namespace: {}", error.message()))
                            .status(&["done", "error"])
                            .build(),
                    ]);
                }
            }
        } else {
            self.evaluator
                .find_namespace(ns)
                .unwrap_or_else(|| Namespace::new(ns))
        };

        let available = self.evaluator.test_vars(&namespace);
        let selected = message
            .text_list("tests")
            .filter(|tests| !tests.is_empty())
            .unwrap_or_else(|| available.clone());

        let mut run = TestRun::new(message);
        run.summary.ns = 1;
        let mut var_results = Dict::new();
        for var in &selected {
            let records = if available.contains(var) {
                run.run_var(&mut self.evaluator, &namespace, ns, var)
            } else {
                run.failed_var(ns, var, format!("Test var not found: {ns}/{var}"))
            };
            var_results.insert(var.clone(), records);
            if run.should_stop() {
                break;
            }
        }
        run.results.insert(ns.to_owned(), Value::Dict(var_results));
        Ok(vec![run.finish(response.field("testing-ns", ns))])
    }
}

//! Behavioural tests for session isolation through the engine.

use std::cell::RefCell;
use std::collections::HashMap;

use lantern_bencode::Dict;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::dispatch::Engine;
use crate::evaluator::reference::ReferenceEvaluator;

use super::support::{has_status, request, statuses, text};

type StepResult = Result<(), String>;

struct SessionWorld {
    engine: Engine<ReferenceEvaluator>,
    sessions: HashMap<String, String>,
    last: Vec<Dict>,
}

impl SessionWorld {
    fn new() -> Self {
        Self {
            engine: Engine::new(ReferenceEvaluator::new()),
            sessions: HashMap::new(),
            last: Vec::new(),
        }
    }

    fn session(&self, alias: &str) -> Result<String, String> {
        self.sessions
            .get(alias)
            .cloned()
            .ok_or_else(|| format!("no session called {alias}"))
    }

    fn send(&mut self, pairs: &[(&str, &str)]) -> &[Dict] {
        self.last = self.engine.handle(&request(pairs));
        &self.last
    }
}

#[fixture]
fn world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::new())
}

#[given("a fresh engine")]
fn given_fresh_engine(world: &RefCell<SessionWorld>) {
    let _ = world;
}

#[when("session \"{alias}\" is cloned")]
fn when_cloned(world: &RefCell<SessionWorld>, alias: String) -> StepResult {
    let mut world = world.borrow_mut();
    let id = world
        .send(&[("op", "clone")])
        .first()
        .and_then(|response| text(response, "new-session"))
        .map(str::to_owned)
        .ok_or("clone returned no new-session")?;
    world.sessions.insert(alias, id);
    Ok(())
}

#[when("session \"{alias}\" evaluates \"{code}\"")]
fn when_evaluates(world: &RefCell<SessionWorld>, alias: String, code: String) -> StepResult {
    let mut world = world.borrow_mut();
    let id = world.session(&alias)?;
    world.send(&[("op", "eval"), ("code", code.as_str()), ("session", id.as_str())]);
    Ok(())
}

#[when("session \"{alias}\" is closed")]
fn when_closed(world: &RefCell<SessionWorld>, alias: String) -> StepResult {
    let mut world = world.borrow_mut();
    let id = world.session(&alias)?;
    world.send(&[("op", "close"), ("session", id.as_str())]);
    Ok(())
}

#[then("the last value is \"{value}\" in namespace \"{ns}\"")]
fn then_last_value(world: &RefCell<SessionWorld>, value: String, ns: String) -> StepResult {
    let world = world.borrow();
    let response = world
        .last
        .iter()
        .find(|response| text(response, "value").is_some())
        .ok_or_else(|| format!("no value in {:?}", world.last))?;
    if text(response, "value") == Some(value.as_str()) && text(response, "ns") == Some(ns.as_str())
    {
        Ok(())
    } else {
        Err(format!("expected {value} in {ns}, got {response:?}"))
    }
}

#[then("session \"{alias}\" is no longer listed")]
fn then_not_listed(world: &RefCell<SessionWorld>, alias: String) -> StepResult {
    let mut world = world.borrow_mut();
    let id = world.session(&alias)?;
    let listed = world
        .send(&[("op", "ls-sessions")])
        .first()
        .cloned()
        .ok_or("ls-sessions returned nothing")?;
    let ids = listed
        .get("sessions")
        .and_then(lantern_bencode::Value::as_list)
        .ok_or("sessions missing")?;
    if ids.iter().any(|entry| entry.as_str() == Some(id.as_str())) {
        Err(format!("{id} still listed"))
    } else {
        Ok(())
    }
}

#[then("closing session \"{alias}\" again is refused with \"{reason}\"")]
fn then_close_refused(world: &RefCell<SessionWorld>, alias: String, reason: String) -> StepResult {
    let mut world = world.borrow_mut();
    let id = world.session(&alias)?;
    let response = world
        .send(&[("op", "close"), ("session", id.as_str())])
        .first()
        .cloned()
        .ok_or("close returned nothing")?;
    if statuses(&response) == ["unsupported", "done"] && text(&response, "err") == Some(reason.as_str())
    {
        Ok(())
    } else {
        Err(format!("unexpected close response {response:?}"))
    }
}

#[then("session \"{alias}\" caught \"{type_name}\"")]
fn then_caught(world: &RefCell<SessionWorld>, alias: String, type_name: String) -> StepResult {
    let mut world = world.borrow_mut();
    let id = world.session(&alias)?;
    let response = world
        .send(&[("op", "caught"), ("session", id.as_str())])
        .first()
        .cloned()
        .ok_or("caught returned nothing")?;
    if text(&response, "exception-type") == Some(type_name.as_str()) {
        Ok(())
    } else {
        Err(format!("unexpected caught response {response:?}"))
    }
}

#[then("session \"{alias}\" has no caught error")]
fn then_no_caught(world: &RefCell<SessionWorld>, alias: String) -> StepResult {
    let mut world = world.borrow_mut();
    let id = world.session(&alias)?;
    let clean = world
        .send(&[("op", "caught"), ("session", id.as_str())])
        .first()
        .is_some_and(|response| has_status(response, "no-error"));
    if clean {
        Ok(())
    } else {
        Err(format!("session {alias} unexpectedly caught an error"))
    }
}

#[scenario(
    path = "tests/features/nrepl_sessions.feature",
    name = "Namespaces persist per session"
)]
fn namespaces_persist_per_session(world: RefCell<SessionWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}

#[scenario(
    path = "tests/features/nrepl_sessions.feature",
    name = "Closing a session"
)]
fn closing_a_session(world: RefCell<SessionWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}

#[scenario(
    path = "tests/features/nrepl_sessions.feature",
    name = "Errors are remembered per session"
)]
fn errors_are_remembered_per_session(world: RefCell<SessionWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}

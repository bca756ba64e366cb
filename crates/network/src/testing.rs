//! In-memory compute backend for reconciler tests.
//!
//! Mutations are applied when the call is accepted and return a `RUNNING`
//! operation that reports `DONE` on the first poll. Every call is recorded.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::key::{Key, ResourceKind};
use crate::providers::gcp::models::{
    Operation, OperationErrorItem, OperationErrors, OperationStatus, Router,
};
use crate::providers::{
    Compute, ComputeResource, ListClient, OperationClient, ResourceClient, RouterClient,
};
use crate::wait::WaitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Verb {
    Get,
    Insert,
    Delete,
    Patch,
    List,
}

impl Verb {
    fn is_mutation(self) -> bool {
        matches!(self, Self::Insert | Self::Delete | Self::Patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub verb: Verb,
    pub kind: ResourceKind,
    pub name: String,
}

#[derive(Default)]
struct State {
    resources: BTreeMap<(ResourceKind, Key), Value>,
    calls: Vec<Call>,
    /// Operation name to embedded error code, `None` for success.
    operations: BTreeMap<String, Option<String>>,
    failing_operations: BTreeMap<(ResourceKind, String), String>,
    failing_calls: BTreeMap<(Verb, ResourceKind, String), u16>,
    next_operation: u64,
}

pub(crate) struct FakeCompute {
    project: String,
    state: Mutex<State>,
}

impl FakeCompute {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_project("test-project")
    }

    pub(crate) fn with_project(project: &str) -> Arc<Self> {
        Arc::new(Self {
            project: project.to_string(),
            state: Mutex::new(State::default()),
        })
    }

    pub(crate) fn compute(self: &Arc<Self>) -> Compute {
        Compute::from_api(self.clone())
    }

    pub(crate) fn wait_config() -> WaitConfig {
        WaitConfig {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    fn self_link(&self, kind: ResourceKind, key: &Key) -> String {
        format!(
            "https://www.googleapis.com/compute/v1/projects/{}/{}/{}/{}",
            self.project,
            key.scope_path(),
            kind.collection(),
            key.name()
        )
    }

    fn materialize<R: ComputeResource>(&self, key: &Key, resource: &R) -> Value {
        let mut value = serde_json::to_value(resource).unwrap();
        let object = value.as_object_mut().unwrap();
        object
            .entry("selfLink")
            .or_insert_with(|| Value::String(self.self_link(R::KIND, key)));
        if R::KIND == ResourceKind::Instance {
            object
                .entry("status")
                .or_insert_with(|| Value::String("RUNNING".into()));
        }
        value
    }

    /// Store a resource without recording a call.
    pub(crate) fn seed<R: ComputeResource>(&self, key: &Key, resource: &R) {
        let value = self.materialize(key, resource);
        self.state
            .lock()
            .unwrap()
            .resources
            .insert((R::KIND, key.clone()), value);
    }

    pub(crate) fn stored<R: ComputeResource>(&self, key: &Key) -> Option<R> {
        self.state
            .lock()
            .unwrap()
            .resources
            .get(&(R::KIND, key.clone()))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.verb.is_mutation())
            .collect()
    }

    pub(crate) fn count(&self, verb: Verb, kind: ResourceKind) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.verb == verb && c.kind == kind)
            .count()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make the next mutation of `name` finish with an operation error.
    pub(crate) fn fail_operation(&self, kind: ResourceKind, name: &str, code: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_operations
            .insert((kind, name.to_string()), code.to_string());
    }

    /// Make a call on `name` fail synchronously with an API error.
    pub(crate) fn fail_call(&self, verb: Verb, kind: ResourceKind, name: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failing_calls
            .insert((verb, kind, name.to_string()), status);
    }

    /// Record a call and return the injected error, if any.
    fn record(&self, state: &mut State, verb: Verb, kind: ResourceKind, name: &str) -> Result<()> {
        state.calls.push(Call {
            verb,
            kind,
            name: name.to_string(),
        });
        match state.failing_calls.get(&(verb, kind, name.to_string())) {
            Some(&status) => Err(Error::Api {
                status,
                message: format!("injected failure for {kind} {name}"),
            }),
            None => Ok(()),
        }
    }

    /// Start an operation; returns the handle and whether the mutation should apply.
    fn start_operation(state: &mut State, kind: ResourceKind, key: &Key) -> (Operation, bool) {
        state.next_operation += 1;
        let name = format!("operation-{}", state.next_operation);
        let failure = state
            .failing_operations
            .remove(&(kind, key.name().to_string()));
        let applies = failure.is_none();
        state.operations.insert(name.clone(), failure);

        let mut operation = Operation {
            name,
            status: OperationStatus::Running,
            ..Default::default()
        };
        match key {
            Key::Global { .. } => {}
            Key::Regional { region, .. } => operation.region = Some(region.clone()),
            Key::Zonal { zone, .. } => operation.zone = Some(zone.clone()),
        }
        (operation, applies)
    }
}

#[async_trait]
impl<R: ComputeResource> ResourceClient<R> for FakeCompute {
    async fn get(&self, key: &Key) -> Result<R> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Verb::Get, R::KIND, key.name())?;
        let value = state
            .resources
            .get(&(R::KIND, key.clone()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} {key}", R::KIND)))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn insert(&self, key: &Key, resource: &R) -> Result<Operation> {
        let value = self.materialize(key, resource);
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Verb::Insert, R::KIND, key.name())?;
        if state.resources.contains_key(&(R::KIND, key.clone())) {
            return Err(Error::Api {
                status: 409,
                message: format!("{} {key} already exists", R::KIND),
            });
        }
        let (operation, applies) = Self::start_operation(&mut state, R::KIND, key);
        if applies {
            state.resources.insert((R::KIND, key.clone()), value);
        }
        Ok(operation)
    }

    async fn delete(&self, key: &Key) -> Result<Operation> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Verb::Delete, R::KIND, key.name())?;
        if !state.resources.contains_key(&(R::KIND, key.clone())) {
            return Err(Error::NotFound(format!("{} {key}", R::KIND)));
        }
        let (operation, applies) = Self::start_operation(&mut state, R::KIND, key);
        if applies {
            state.resources.remove(&(R::KIND, key.clone()));
        }
        Ok(operation)
    }
}

#[async_trait]
impl<R: ComputeResource> ListClient<R> for FakeCompute {
    async fn list(&self, filter: &Filter) -> Result<Vec<R>> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Verb::List, R::KIND, "")?;
        let mut items = Vec::new();
        for ((kind, _), value) in &state.resources {
            if *kind != R::KIND || !filter.matches(value) {
                continue;
            }
            items.push(serde_json::from_value(value.clone())?);
        }
        Ok(items)
    }
}

#[async_trait]
impl RouterClient for FakeCompute {
    async fn patch(&self, key: &Key, router: &Router) -> Result<Operation> {
        let value = self.materialize(key, router);
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Verb::Patch, ResourceKind::Router, key.name())?;
        if !state.resources.contains_key(&(ResourceKind::Router, key.clone())) {
            return Err(Error::NotFound(format!("router {key}")));
        }
        let (operation, applies) = Self::start_operation(&mut state, ResourceKind::Router, key);
        if applies {
            state
                .resources
                .insert((ResourceKind::Router, key.clone()), value);
        }
        Ok(operation)
    }
}

#[async_trait]
impl OperationClient for FakeCompute {
    async fn get_operation(&self, operation: &Operation) -> Result<Operation> {
        let state = self.state.lock().unwrap();
        let failure = state
            .operations
            .get(&operation.name)
            .ok_or_else(|| Error::NotFound(format!("operation {}", operation.name)))?;

        let mut done = operation.clone();
        done.status = OperationStatus::Done;
        done.error = failure.as_ref().map(|code| OperationErrors {
            errors: vec![OperationErrorItem {
                code: code.clone(),
                message: format!("operation {} failed", operation.name),
            }],
        });
        Ok(done)
    }
}

//! Reactor chain: ordered interceptors in front of the object tracker
//!
//! Reactors let tests short-circuit or rewrite the outcome of an action
//! before it reaches the tracker. A reactor returns `Ok(None)` to decline,
//! `Ok(Some(result))` to handle the action, or `Err(e)` to inject an error.
//! If no reactor handles the action, the built-in default reactors forward
//! it to the tracker, so the tracker is always reachable unless a test
//! explicitly intercepts a verb.

use crate::action::{Action, Patch, Verb};
use crate::tracker::ObjectTracker;
use crate::utils::extract_gvk;
use crate::watch::FakeWatcher;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Outcome of a handled action.
#[derive(Debug)]
pub enum ReactionResult {
    /// Single-object verbs: get/create/update/patch/delete.
    Object(Value),
    /// The list verb.
    List(Vec<Value>),
    /// The watch verb.
    Watcher(FakeWatcher),
}

impl ReactionResult {
    pub fn into_object(self) -> Result<Value> {
        match self {
            ReactionResult::Object(value) => Ok(value),
            other => Err(Error::Internal(format!(
                "expected object reaction, got {:?}",
                other
            ))),
        }
    }

    pub fn into_list(self) -> Result<Vec<Value>> {
        match self {
            ReactionResult::List(values) => Ok(values),
            other => Err(Error::Internal(format!(
                "expected list reaction, got {:?}",
                other
            ))),
        }
    }

    pub fn into_watcher(self) -> Result<FakeWatcher> {
        match self {
            ReactionResult::Watcher(watcher) => Ok(watcher),
            other => Err(Error::Internal(format!(
                "expected watch reaction, got {:?}",
                other
            ))),
        }
    }
}

/// A reactor handler. Must be callable repeatedly and concurrently; any
/// private state it closes over is its own responsibility to synchronize.
pub type ReactionFunc = Arc<dyn Fn(&Action) -> Result<Option<ReactionResult>> + Send + Sync>;

#[derive(Clone)]
struct Reactor {
    verb: String,
    resource: String,
    reaction: ReactionFunc,
}

/// Ordered, first-match-wins interceptor chain shared by all fake clients
/// derived from the same clientset.
pub struct ReactorChain {
    tracker: Arc<ObjectTracker>,
    reactors: RwLock<Vec<Reactor>>,
}

impl ReactorChain {
    pub fn new(tracker: Arc<ObjectTracker>) -> Self {
        Self {
            tracker,
            reactors: RwLock::new(Vec::new()),
        }
    }

    pub fn tracker(&self) -> &Arc<ObjectTracker> {
        &self.tracker
    }

    /// Append a reactor. `verb` and `resource` are exact matches or `"*"`.
    pub fn add_reactor<F>(&self, verb: &str, resource: &str, reaction: F)
    where
        F: Fn(&Action) -> Result<Option<ReactionResult>> + Send + Sync + 'static,
    {
        let mut reactors = self.reactors.write().unwrap();
        reactors.push(Reactor {
            verb: verb.to_string(),
            resource: resource.to_string(),
            reaction: Arc::new(reaction),
        });
    }

    /// Insert a reactor ahead of all previously registered ones.
    pub fn prepend_reactor<F>(&self, verb: &str, resource: &str, reaction: F)
    where
        F: Fn(&Action) -> Result<Option<ReactionResult>> + Send + Sync + 'static,
    {
        let mut reactors = self.reactors.write().unwrap();
        reactors.insert(
            0,
            Reactor {
                verb: verb.to_string(),
                resource: resource.to_string(),
                reaction: Arc::new(reaction),
            },
        );
    }

    /// Dispatch an action: registered reactors in order, then the default
    /// tracker reactors.
    pub fn dispatch(&self, action: &Action) -> Result<ReactionResult> {
        trace!("dispatching action: {} {:?}", action.verb, action.gvr);

        // Snapshot under the lock so handlers can register further reactors
        // without deadlocking; additions race the in-flight dispatch.
        let snapshot: Vec<Reactor> = self.reactors.read().unwrap().clone();

        for reactor in &snapshot {
            if !action.matches(&reactor.verb, &reactor.resource) {
                continue;
            }
            if let Some(result) = (reactor.reaction)(action)? {
                return Ok(result);
            }
        }

        self.default_reaction(action)
    }

    /// The built-in per-verb reactors forwarding to the object tracker.
    fn default_reaction(&self, action: &Action) -> Result<ReactionResult> {
        let gvr = &action.gvr;
        let namespace = action.namespace.as_deref().unwrap_or("");

        match action.verb {
            Verb::Get => {
                let name = require_name(action)?;
                let value = self.tracker.get(gvr, namespace, name)?;
                Ok(ReactionResult::Object(value))
            }
            Verb::List => {
                let values =
                    self.tracker
                        .list(gvr, action.namespace.as_deref(), action.selector.as_deref())?;
                Ok(ReactionResult::List(values))
            }
            Verb::Create => {
                let object = require_object(action)?;
                let gvk = extract_gvk(&object)?;
                let value = self.tracker.create(gvr, &gvk, object, namespace)?;
                Ok(ReactionResult::Object(value))
            }
            Verb::Update => {
                let object = require_object(action)?;
                let is_status = action.subresource.as_deref() == Some("status");
                let value = self.tracker.update(gvr, object, namespace, is_status)?;
                Ok(ReactionResult::Object(value))
            }
            Verb::Patch => {
                let name = require_name(action)?;
                let patch = require_patch(action)?;
                let value = self.tracker.patch(gvr, namespace, name, patch)?;
                Ok(ReactionResult::Object(value))
            }
            Verb::Delete => {
                let name = require_name(action)?;
                let value = self.tracker.delete(gvr, namespace, name)?;
                Ok(ReactionResult::Object(value))
            }
            Verb::Watch => {
                let watcher = self.tracker.watch(
                    gvr,
                    action.namespace.as_deref(),
                    action.selector.as_deref(),
                )?;
                Ok(ReactionResult::Watcher(watcher))
            }
        }
    }
}

fn require_name(action: &Action) -> Result<&str> {
    action
        .name
        .as_deref()
        .ok_or_else(|| Error::Invalid(format!("{} action requires a name", action.verb)))
}

fn require_object(action: &Action) -> Result<Value> {
    action
        .object
        .clone()
        .ok_or_else(|| Error::Invalid(format!("{} action requires an object", action.verb)))
}

fn require_patch(action: &Action) -> Result<&Patch> {
    action
        .patch
        .as_ref()
        .ok_or_else(|| Error::Invalid("patch action requires a patch body".to_string()))
}

//! The in-memory object tracker: storage, versioning, and event fan-out

use crate::action::Patch;
use crate::meta::ObjectMeta;
use crate::selector::{parse_selector, Selector};
use crate::utils::{ensure_metadata, extract_metadata};
use crate::watch::{self, Event, FakeWatcher, WatchEntry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, trace};

/// Group/version/resource: addresses a resource collection (plural form).
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GVR {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GVR {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }
}

/// Group/version/kind: addresses a structural type.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GVK {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GVK {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Value,
    gvk: GVK,
    metadata: ObjectMeta,
}

/// Everything the tracker owns, guarded by one mutex so that the
/// read-compare-write sequence of update/patch is atomic with respect to
/// every other mutator, and so that events are queued in commit order.
struct TrackerState {
    /// Objects per collection, in insertion order within each collection.
    objects: HashMap<GVR, Vec<StoredObject>>,
    watchers: Vec<WatchEntry>,
    status_subresources: HashSet<GVK>,
    /// Tracker-global resource version counter; strictly increases across
    /// all mutations, never per-object.
    next_resource_version: u64,
}

impl TrackerState {
    fn next_version(&mut self) -> String {
        let version = self.next_resource_version;
        self.next_resource_version += 1;
        version.to_string()
    }

    fn position(&self, gvr: &GVR, namespace: &str, name: &str) -> Option<usize> {
        self.objects.get(gvr)?.iter().position(|stored| {
            stored.metadata.namespace.as_deref().unwrap_or("") == namespace
                && stored.metadata.name.as_deref() == Some(name)
        })
    }

    fn find(&self, gvr: &GVR, namespace: &str, name: &str) -> Option<&StoredObject> {
        let index = self.position(gvr, namespace, name)?;
        Some(&self.objects[gvr][index])
    }

    /// Fan an event out to every open registration whose filter matches,
    /// pruning registrations whose consumers have gone away.
    fn notify(&mut self, gvr: &GVR, meta: &ObjectMeta, event: Event) {
        let namespace = meta.namespace.clone().unwrap_or_default();
        let labels = meta.labels_or_empty();

        self.watchers.retain(|entry| {
            if entry.is_closed() {
                return false;
            }
            if entry.wants(gvr, &namespace, &labels) {
                entry.deliver(event.clone())
            } else {
                true
            }
        });
    }
}

/// In-memory object store with server-like semantics: resource version
/// assignment, optimistic concurrency, and watch event emission.
///
/// Each test constructs its own tracker; there is no process-wide state.
/// Every value crossing the tracker boundary is deep-copied, so the stored
/// objects are owned exclusively by the tracker.
pub struct ObjectTracker {
    state: Mutex<TrackerState>,
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                objects: HashMap::new(),
                watchers: Vec::new(),
                status_subresources: HashSet::new(),
                next_resource_version: 1,
            }),
        }
    }

    /// Register a kind whose `status` is managed as a subresource: regular
    /// updates then preserve the stored status and status updates preserve
    /// the stored spec.
    pub fn add_status_subresource(&self, gvk: GVK) {
        let mut state = self.state.lock().unwrap();
        state.status_subresources.insert(gvk);
    }

    pub fn has_status_subresource(&self, gvk: &GVK) -> bool {
        let state = self.state.lock().unwrap();
        state.status_subresources.contains(gvk)
    }

    /// Pre-seed an object before a test runs, bypassing create-time checks.
    ///
    /// Replaces any existing object with the same identity. Missing
    /// server-assigned metadata is filled in; a caller-supplied
    /// resourceVersion is preserved.
    pub fn add(&self, gvr: &GVR, gvk: &GVK, mut object: Value, namespace: &str) -> Result<Value> {
        trace!("adding object: {:?} in namespace: {}", gvr, namespace);

        let mut state = self.state.lock().unwrap();

        let mut meta = extract_metadata(&object)?;
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::Invalid("object name is required".to_string()))?;

        if meta
            .resource_version
            .as_ref()
            .is_none_or(|rv| rv.is_empty())
        {
            meta.resource_version = Some(state.next_version());
        }
        ensure_metadata(&mut meta, namespace);
        if meta.generation.is_none() {
            meta.generation = Some(1);
        }

        object["metadata"] = serde_json::to_value(&meta)?;

        if object.get("status").is_some() {
            state.status_subresources.insert(gvk.clone());
        }

        let stored = StoredObject {
            data: object.clone(),
            gvk: gvk.clone(),
            metadata: meta.clone(),
        };

        let replaced = match state.position(gvr, namespace, &name) {
            Some(index) => {
                state.objects.get_mut(gvr).unwrap()[index] = stored;
                true
            }
            None => {
                state.objects.entry(gvr.clone()).or_default().push(stored);
                false
            }
        };

        let event = if replaced {
            Event::Modified(object.clone())
        } else {
            Event::Added(object.clone())
        };
        state.notify(gvr, &meta, event);

        debug!("added object: {}/{}", namespace, name);
        Ok(object)
    }

    /// Create a new object, assigning uid and resource version.
    pub fn create(
        &self,
        gvr: &GVR,
        gvk: &GVK,
        mut object: Value,
        namespace: &str,
    ) -> Result<Value> {
        trace!("creating object: {:?} in namespace: {}", gvr, namespace);

        let mut state = self.state.lock().unwrap();

        let mut meta = extract_metadata(&object)?;
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::Invalid("object name is required".to_string()))?;

        if meta
            .resource_version
            .as_ref()
            .is_some_and(|rv| !rv.is_empty())
        {
            return Err(Error::Invalid(
                "resourceVersion can not be set for create requests".to_string(),
            ));
        }

        if state.find(gvr, namespace, &name).is_some() {
            return Err(Error::AlreadyExists {
                kind: gvk.kind.clone(),
                name,
                namespace: namespace.to_string(),
            });
        }

        meta.resource_version = Some(state.next_version());
        meta.generation = Some(1);
        ensure_metadata(&mut meta, namespace);

        object["metadata"] = serde_json::to_value(&meta)?;

        if object.get("status").is_some() {
            state.status_subresources.insert(gvk.clone());
        }

        let stored = StoredObject {
            data: object.clone(),
            gvk: gvk.clone(),
            metadata: meta.clone(),
        };
        state.objects.entry(gvr.clone()).or_default().push(stored);
        state.notify(gvr, &meta, Event::Added(object.clone()));

        debug!("created object: {}/{}", namespace, name);
        Ok(object)
    }

    /// Get a deep copy of one object.
    pub fn get(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("getting object: {:?} {}/{}", gvr, namespace, name);

        let state = self.state.lock().unwrap();
        let stored = state
            .find(gvr, namespace, name)
            .ok_or_else(|| not_found(gvr, namespace, name))?;

        Ok(stored.data.clone())
    }

    /// List a deep-copied snapshot, in insertion order within the collection.
    ///
    /// `namespace: None` lists across all namespaces. An unknown collection
    /// yields an empty list, not an error.
    pub fn list(
        &self,
        gvr: &GVR,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<Value>> {
        trace!("listing objects: {:?} in namespace: {:?}", gvr, namespace);

        let selector = label_selector.map(parse_selector).transpose()?;

        let state = self.state.lock().unwrap();
        let Some(collection) = state.objects.get(gvr) else {
            return Ok(Vec::new());
        };

        let result = collection
            .iter()
            .filter(|stored| match namespace {
                Some(ns) => stored.metadata.namespace.as_deref().unwrap_or("") == ns,
                None => true,
            })
            .filter(|stored| matches_labels(&selector, &stored.metadata))
            .map(|stored| stored.data.clone())
            .collect();

        Ok(result)
    }

    /// Replace an existing object, enforcing the optimistic concurrency
    /// check against a caller-supplied resourceVersion.
    pub fn update(
        &self,
        gvr: &GVR,
        object: Value,
        namespace: &str,
        is_status: bool,
    ) -> Result<Value> {
        trace!("updating object: {:?} in namespace: {}", gvr, namespace);

        let mut state = self.state.lock().unwrap();
        self.update_locked(&mut state, gvr, object, namespace, is_status)
    }

    /// Apply a patch to the current stored value, then follow update
    /// semantics. A malformed patch body surfaces as `Invalid`.
    pub fn patch(&self, gvr: &GVR, namespace: &str, name: &str, patch: &Patch) -> Result<Value> {
        trace!("patching object: {:?} {}/{}", gvr, namespace, name);

        let mut state = self.state.lock().unwrap();
        let stored = state
            .find(gvr, namespace, name)
            .ok_or_else(|| not_found(gvr, namespace, name))?;

        let mut patched = stored.data.clone();
        match patch {
            Patch::Merge(body) => {
                if !body.is_object() {
                    return Err(Error::Invalid(
                        "merge patch body must be a JSON object".to_string(),
                    ));
                }
                json_patch::merge(&mut patched, body);
            }
            Patch::Json(body) => {
                let operations: json_patch::Patch = serde_json::from_value(body.clone())
                    .map_err(|e| Error::Invalid(format!("malformed json patch: {}", e)))?;
                json_patch::patch(&mut patched, &operations)?;
            }
        }

        self.update_locked(&mut state, gvr, patched, namespace, false)
    }

    fn update_locked(
        &self,
        state: &mut TrackerState,
        gvr: &GVR,
        mut object: Value,
        namespace: &str,
        is_status: bool,
    ) -> Result<Value> {
        let meta = extract_metadata(&object)?;
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::Invalid("object name is required".to_string()))?;

        let index = state
            .position(gvr, namespace, &name)
            .ok_or_else(|| not_found(gvr, namespace, &name))?;
        let existing = &state.objects[gvr][index];
        let gvk = existing.gvk.clone();
        let existing_meta = existing.metadata.clone();
        let existing_data = existing.data.clone();

        if let (Some(provided), Some(current)) =
            (&meta.resource_version, &existing_meta.resource_version)
        {
            if !provided.is_empty() && provided != current {
                return Err(Error::Conflict(format!(
                    "resource version mismatch: expected {}, got {}",
                    current, provided
                )));
            }
        }

        if state.status_subresources.contains(&gvk) {
            if is_status {
                // Status update: everything but status comes from the store.
                if let Some(spec) = existing_data.get("spec") {
                    object["spec"] = spec.clone();
                }
            } else if let Some(status) = existing_data.get("status") {
                object["status"] = status.clone();
            }
        }

        let spec_changed = object.get("spec") != existing_data.get("spec");

        let mut new_meta = extract_metadata(&object)?;
        // The namespace is part of the identity and cannot change; payloads
        // may omit it and stay addressable under the request namespace.
        new_meta.namespace = existing_meta.namespace.clone();
        new_meta.resource_version = Some(state.next_version());
        new_meta.uid = existing_meta.uid.clone();
        new_meta.creation_timestamp = existing_meta.creation_timestamp;
        new_meta.generation = existing_meta.generation;
        if spec_changed && !is_status {
            new_meta.generation = Some(existing_meta.generation.unwrap_or(1) + 1);
        }

        object["metadata"] = serde_json::to_value(&new_meta)?;

        let stored = StoredObject {
            data: object.clone(),
            gvk: gvk.clone(),
            metadata: new_meta.clone(),
        };
        state.objects.get_mut(gvr).unwrap()[index] = stored;
        state.notify(gvr, &new_meta, Event::Modified(object.clone()));

        debug!("updated object: {}/{}", namespace, name);
        Ok(object)
    }

    /// Remove an object, returning (and emitting) its last known state.
    pub fn delete(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("deleting object: {:?} {}/{}", gvr, namespace, name);

        let mut state = self.state.lock().unwrap();
        let index = state
            .position(gvr, namespace, name)
            .ok_or_else(|| not_found(gvr, namespace, name))?;

        let stored = state.objects.get_mut(gvr).unwrap().remove(index);
        state.notify(gvr, &stored.metadata, Event::Deleted(stored.data.clone()));

        debug!("deleted object: {}/{}", namespace, name);
        Ok(stored.data)
    }

    /// Register a watch. Watches start empty: no backlog is delivered, only
    /// mutations committed after registration.
    ///
    /// `namespace: None` watches across all namespaces.
    pub fn watch(
        &self,
        gvr: &GVR,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<FakeWatcher> {
        trace!("watching objects: {:?} in namespace: {:?}", gvr, namespace);

        let selector = label_selector.map(parse_selector).transpose()?;

        let mut state = self.state.lock().unwrap();
        let (entry, watcher) =
            watch::channel(gvr.clone(), namespace.map(String::from), selector);
        state.watchers.push(entry);

        Ok(watcher)
    }

    /// Number of currently-open watch registrations, for test assertions.
    pub fn watcher_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.watchers.iter().filter(|w| !w.is_closed()).count()
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(gvr: &GVR, namespace: &str, name: &str) -> Error {
    Error::NotFound {
        kind: gvr.resource.clone(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    }
}

fn matches_labels(selector: &Option<Selector>, meta: &ObjectMeta) -> bool {
    match selector {
        Some(selector) => selector.matches(&meta.labels_or_empty()),
        None => true,
    }
}

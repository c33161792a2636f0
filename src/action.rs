//! Action records dispatched from typed clients through the reactor chain

use crate::tracker::GVR;
use serde_json::Value;

/// The operation an action represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Create,
    Update,
    Patch,
    Delete,
    Watch,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
            Verb::Watch => "watch",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patch body together with its application strategy.
#[derive(Debug, Clone)]
pub enum Patch {
    /// RFC 7386 merge patch: the body is merged into the current object.
    Merge(Value),
    /// RFC 6902 JSON patch: the body is an array of operations.
    Json(Value),
}

/// Options applied by list and watch verbs.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub label_selector: Option<String>,
}

impl ListOptions {
    pub fn labels(selector: impl Into<String>) -> Self {
        Self {
            label_selector: Some(selector.into()),
        }
    }
}

/// An immutable record of one attempted operation.
///
/// Built by the typed client, inspected by reactors, and consumed by the
/// default tracker reactors. Exists only for the duration of a dispatch.
#[derive(Debug, Clone)]
pub struct Action {
    pub verb: Verb,
    pub gvr: GVR,
    /// `None` for cluster-scoped or all-namespace list/watch actions.
    pub namespace: Option<String>,
    /// Absent for list/watch and for create (where the name rides in the object).
    pub name: Option<String>,
    /// Object payload for create/update.
    pub object: Option<Value>,
    /// Patch payload for patch.
    pub patch: Option<Patch>,
    /// Label selector for list/watch.
    pub selector: Option<String>,
    /// Subresource qualifier, e.g. `status`.
    pub subresource: Option<String>,
}

impl Action {
    fn new(verb: Verb, gvr: GVR, namespace: Option<String>) -> Self {
        Self {
            verb,
            gvr,
            namespace,
            name: None,
            object: None,
            patch: None,
            selector: None,
            subresource: None,
        }
    }

    pub fn get(gvr: GVR, namespace: Option<String>, name: impl Into<String>) -> Self {
        let mut action = Self::new(Verb::Get, gvr, namespace);
        action.name = Some(name.into());
        action
    }

    pub fn list(gvr: GVR, namespace: Option<String>, opts: &ListOptions) -> Self {
        let mut action = Self::new(Verb::List, gvr, namespace);
        action.selector = opts.label_selector.clone();
        action
    }

    pub fn create(gvr: GVR, namespace: Option<String>, object: Value) -> Self {
        let mut action = Self::new(Verb::Create, gvr, namespace);
        action.object = Some(object);
        action
    }

    pub fn update(gvr: GVR, namespace: Option<String>, object: Value) -> Self {
        let mut action = Self::new(Verb::Update, gvr, namespace);
        action.object = Some(object);
        action
    }

    pub fn update_subresource(
        gvr: GVR,
        namespace: Option<String>,
        subresource: impl Into<String>,
        object: Value,
    ) -> Self {
        let mut action = Self::update(gvr, namespace, object);
        action.subresource = Some(subresource.into());
        action
    }

    pub fn patch(
        gvr: GVR,
        namespace: Option<String>,
        name: impl Into<String>,
        patch: Patch,
    ) -> Self {
        let mut action = Self::new(Verb::Patch, gvr, namespace);
        action.name = Some(name.into());
        action.patch = Some(patch);
        action
    }

    pub fn delete(gvr: GVR, namespace: Option<String>, name: impl Into<String>) -> Self {
        let mut action = Self::new(Verb::Delete, gvr, namespace);
        action.name = Some(name.into());
        action
    }

    pub fn watch(gvr: GVR, namespace: Option<String>, opts: &ListOptions) -> Self {
        let mut action = Self::new(Verb::Watch, gvr, namespace);
        action.selector = opts.label_selector.clone();
        action
    }

    /// Verb and resource match against `"*"`-capable patterns, the predicate
    /// reactors register with.
    pub fn matches(&self, verb: &str, resource: &str) -> bool {
        (verb == "*" || verb == self.verb.as_str())
            && (resource == "*" || resource == self.gvr.resource)
    }
}

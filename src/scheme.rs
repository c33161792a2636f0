//! Scheme registry mapping resource kinds to their structural types
//!
//! Resource types must be registered before raw (untyped) objects referring
//! to them can be resolved, mirroring how a real control plane requires a
//! type to be installed before it can be served. Typed clients carry their
//! type statically and work without prior registration.

use crate::meta::ObjectMeta;
use crate::tracker::{GVK, GVR};
use crate::utils::pluralize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// A resource type the fake client layer can serve.
///
/// Implementations supply the identity of the kind and access to the
/// metadata block every tracked object carries.
pub trait ResourceType: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn kind() -> &'static str;

    fn group() -> &'static str {
        ""
    }

    fn version() -> &'static str;

    /// Lowercase plural resource name; defaults to English pluralization of
    /// the kind.
    fn plural() -> String {
        pluralize(Self::kind())
    }

    /// Whether objects of this kind live in a namespace.
    fn namespaced() -> bool {
        true
    }

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn gvk() -> GVK {
        GVK::new(Self::group(), Self::version(), Self::kind())
    }

    fn gvr() -> GVR {
        GVR::new(Self::group(), Self::version(), Self::plural())
    }

    fn api_version() -> String {
        if Self::group().is_empty() {
            Self::version().to_string()
        } else {
            format!("{}/{}", Self::group(), Self::version())
        }
    }
}

/// Metadata for a registered resource type
#[derive(Debug, Clone)]
pub struct ResourceMetadata {
    pub kind: String,
    pub group: String,
    pub version: String,
    pub plural: String,
    pub namespaced: bool,
}

/// Registry of known resource types.
#[derive(Debug, Default)]
pub struct Scheme {
    resources: RwLock<HashMap<GVK, ResourceMetadata>>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type from its `ResourceType` implementation.
    pub fn register<K: ResourceType>(&self) {
        let metadata = ResourceMetadata {
            kind: K::kind().to_string(),
            group: K::group().to_string(),
            version: K::version().to_string(),
            plural: K::plural(),
            namespaced: K::namespaced(),
        };
        self.resources
            .write()
            .expect("Scheme lock poisoned")
            .insert(K::gvk(), metadata);
    }

    /// Look up the structural type descriptor for a kind.
    pub fn type_for(&self, gvk: &GVK) -> Option<ResourceMetadata> {
        self.resources
            .read()
            .expect("Scheme lock poisoned")
            .get(gvk)
            .cloned()
    }

    /// Resolve the collection (plural) address for a kind. Unregistered
    /// kinds fall back to default pluralization.
    pub fn gvr_for(&self, gvk: &GVK) -> GVR {
        let resource = self
            .type_for(gvk)
            .map(|m| m.plural)
            .unwrap_or_else(|| pluralize(&gvk.kind));
        GVR::new(gvk.group.clone(), gvk.version.clone(), resource)
    }

    pub fn is_namespaced(&self, gvk: &GVK) -> Option<bool> {
        self.type_for(gvk).map(|m| m.namespaced)
    }

    /// Deep-copy an object value. Tracked state never aliases values held
    /// by callers.
    pub fn deep_copy(&self, object: &Value) -> Value {
        object.clone()
    }
}

//! The fake clientset: one tracker, one reactor chain, many typed clients

use crate::action::Action;
use crate::client::FakeResourceClient;
use crate::reactor::{ReactionResult, ReactorChain};
use crate::scheme::{ResourceType, Scheme};
use crate::tracker::ObjectTracker;
use crate::utils::{extract_gvk, extract_metadata};
use crate::{builder::ClientsetBuilder, Result};
use serde_json::Value;
use std::sync::Arc;

/// Shared fake backend handed to every typed client derived from it.
///
/// Holds the object tracker, the reactor chain, and the scheme. Construct
/// one per test (directly or via [`ClientsetBuilder`]) and discard it at
/// teardown; there is no global state.
pub struct FakeClientset {
    tracker: Arc<ObjectTracker>,
    chain: Arc<ReactorChain>,
    scheme: Arc<Scheme>,
}

impl FakeClientset {
    pub fn new() -> Self {
        Self::with_scheme(Scheme::new())
    }

    pub fn with_scheme(scheme: Scheme) -> Self {
        let tracker = Arc::new(ObjectTracker::new());
        let chain = Arc::new(ReactorChain::new(Arc::clone(&tracker)));
        Self {
            tracker,
            chain,
            scheme: Arc::new(scheme),
        }
    }

    pub fn builder() -> ClientsetBuilder {
        ClientsetBuilder::new()
    }

    /// Typed client over all namespaces, or for a cluster-scoped kind.
    pub fn resource<K: ResourceType>(&self) -> FakeResourceClient<K> {
        FakeResourceClient::all(Arc::clone(&self.chain))
    }

    /// Typed client bound to one namespace.
    pub fn namespaced<K: ResourceType>(
        &self,
        namespace: impl Into<String>,
    ) -> FakeResourceClient<K> {
        FakeResourceClient::namespaced(Arc::clone(&self.chain), namespace.into())
    }

    pub fn tracker(&self) -> &Arc<ObjectTracker> {
        &self.tracker
    }

    pub fn scheme(&self) -> &Arc<Scheme> {
        &self.scheme
    }

    /// Append a reactor to the chain. See [`ReactorChain::add_reactor`].
    pub fn add_reactor<F>(&self, verb: &str, resource: &str, reaction: F)
    where
        F: Fn(&Action) -> Result<Option<ReactionResult>> + Send + Sync + 'static,
    {
        self.chain.add_reactor(verb, resource, reaction);
    }

    /// Insert a reactor ahead of all previously registered ones.
    pub fn prepend_reactor<F>(&self, verb: &str, resource: &str, reaction: F)
    where
        F: Fn(&Action) -> Result<Option<ReactionResult>> + Send + Sync + 'static,
    {
        self.chain.prepend_reactor(verb, resource, reaction);
    }

    /// Pre-seed raw objects into the tracker. Objects must carry
    /// `apiVersion`, `kind`, and `metadata.name`; the collection address is
    /// resolved through the scheme.
    pub fn inject_objects(&self, objects: impl IntoIterator<Item = Value>) -> Result<()> {
        for object in objects {
            let gvk = extract_gvk(&object)?;
            let gvr = self.scheme.gvr_for(&gvk);
            let namespace = extract_metadata(&object)?
                .namespace
                .unwrap_or_default();
            self.tracker.add(&gvr, &gvk, object, &namespace)?;
        }
        Ok(())
    }

    /// Pre-seed typed objects into the tracker.
    pub fn inject<K: ResourceType>(&self, objects: impl IntoIterator<Item = K>) -> Result<()> {
        for obj in objects {
            let mut value = serde_json::to_value(&obj)?;
            value["apiVersion"] = Value::String(K::api_version());
            value["kind"] = Value::String(K::kind().to_string());
            let namespace = obj.metadata().namespace.clone().unwrap_or_default();
            self.tracker.add(&K::gvr(), &K::gvk(), value, &namespace)?;
        }
        Ok(())
    }

    pub(crate) fn chain(&self) -> &Arc<ReactorChain> {
        &self.chain
    }
}

impl Default for FakeClientset {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FakeClientset {
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            chain: Arc::clone(&self.chain),
            scheme: Arc::clone(&self.scheme),
        }
    }
}

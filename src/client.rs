//! Typed resource clients backed by the reactor chain
//!
//! `FakeResourceClient<K>` presents the same narrow per-resource interface a
//! real transport-backed client would. Each call is recorded as an
//! [`Action`], run through the reactor chain, and falls through to the
//! object tracker by default. Returned objects are deserialized from the
//! chain's result, so callers never alias tracker-internal state.

use crate::action::{Action, ListOptions, Patch};
use crate::reactor::ReactorChain;
use crate::scheme::ResourceType;
use crate::watch::FakeWatcher;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// The per-resource client interface. The real transport client implements
/// the same trait, so tests can swap fake for real without code changes.
#[async_trait]
pub trait ResourceClient<K: ResourceType>: Send + Sync {
    async fn create(&self, obj: &K) -> Result<K>;
    async fn get(&self, name: &str) -> Result<K>;
    async fn list(&self, opts: &ListOptions) -> Result<Vec<K>>;
    async fn update(&self, obj: &K) -> Result<K>;
    async fn update_status(&self, obj: &K) -> Result<K>;
    async fn patch(&self, name: &str, patch: &Patch) -> Result<K>;
    async fn delete(&self, name: &str) -> Result<K>;
    async fn watch(&self, opts: &ListOptions) -> Result<FakeWatcher>;
}

/// Fake typed client for one resource type, optionally bound to a namespace.
pub struct FakeResourceClient<K> {
    chain: Arc<ReactorChain>,
    namespace: Option<String>,
    _marker: PhantomData<fn() -> K>,
}

impl<K: ResourceType> FakeResourceClient<K> {
    /// Client over all namespaces (or for a cluster-scoped kind).
    pub(crate) fn all(chain: Arc<ReactorChain>) -> Self {
        Self {
            chain,
            namespace: None,
            _marker: PhantomData,
        }
    }

    /// Client bound to one namespace.
    pub(crate) fn namespaced(chain: Arc<ReactorChain>, namespace: impl Into<String>) -> Self {
        Self {
            chain,
            namespace: Some(namespace.into()),
            _marker: PhantomData,
        }
    }

    fn namespace(&self) -> Option<String> {
        self.namespace.clone()
    }

    /// Serialize and stamp the type identity so stored objects are
    /// self-describing.
    fn to_value(&self, obj: &K) -> Result<Value> {
        let mut value = serde_json::to_value(obj)?;
        if !value.is_object() {
            return Err(Error::Invalid(
                "resource object must serialize to a JSON object".to_string(),
            ));
        }
        value["apiVersion"] = Value::String(K::api_version());
        value["kind"] = Value::String(K::kind().to_string());
        Ok(value)
    }

    fn from_value(&self, value: Value) -> Result<K> {
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl<K: ResourceType + 'static> ResourceClient<K> for FakeResourceClient<K> {
    async fn create(&self, obj: &K) -> Result<K> {
        let value = self.to_value(obj)?;
        let action = Action::create(K::gvr(), self.namespace(), value);
        let result = self.chain.dispatch(&action)?.into_object()?;
        self.from_value(result)
    }

    async fn get(&self, name: &str) -> Result<K> {
        let action = Action::get(K::gvr(), self.namespace(), name);
        let result = self.chain.dispatch(&action)?.into_object()?;
        self.from_value(result)
    }

    async fn list(&self, opts: &ListOptions) -> Result<Vec<K>> {
        let action = Action::list(K::gvr(), self.namespace(), opts);
        let result = self.chain.dispatch(&action)?.into_list()?;
        result.into_iter().map(|v| self.from_value(v)).collect()
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let value = self.to_value(obj)?;
        let action = Action::update(K::gvr(), self.namespace(), value);
        let result = self.chain.dispatch(&action)?.into_object()?;
        self.from_value(result)
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let value = self.to_value(obj)?;
        let action = Action::update_subresource(K::gvr(), self.namespace(), "status", value);
        let result = self.chain.dispatch(&action)?.into_object()?;
        self.from_value(result)
    }

    async fn patch(&self, name: &str, patch: &Patch) -> Result<K> {
        let action = Action::patch(K::gvr(), self.namespace(), name, patch.clone());
        let result = self.chain.dispatch(&action)?.into_object()?;
        self.from_value(result)
    }

    async fn delete(&self, name: &str) -> Result<K> {
        let action = Action::delete(K::gvr(), self.namespace(), name);
        let result = self.chain.dispatch(&action)?.into_object()?;
        self.from_value(result)
    }

    async fn watch(&self, opts: &ListOptions) -> Result<FakeWatcher> {
        let action = Action::watch(K::gvr(), self.namespace(), opts);
        self.chain.dispatch(&action)?.into_watcher()
    }
}

impl<K> Clone for FakeResourceClient<K> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            namespace: self.namespace.clone(),
            _marker: PhantomData,
        }
    }
}

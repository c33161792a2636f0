//! Builder for constructing fake clientsets with various options

use crate::action::Action;
use crate::clientset::FakeClientset;
use crate::reactor::{ReactionFunc, ReactionResult};
use crate::scheme::{ResourceType, Scheme};
use crate::tracker::GVK;
use crate::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fluent construction of a [`FakeClientset`]:
/// - initial objects (typed, raw, or YAML fixtures)
/// - registered resource types
/// - status subresources
/// - reactors
///
/// # Example
///
/// ```rust,ignore
/// let clientset = FakeClientset::builder()
///     .register::<Widget>()
///     .with_object(widget)
///     .build()?;
/// ```
pub struct ClientsetBuilder {
    initial_objects: Vec<Value>,
    status_subresources: Vec<GVK>,
    reactors: Vec<(String, String, ReactionFunc)>,
    scheme: Scheme,
    fixture_dir: Option<PathBuf>,
}

impl ClientsetBuilder {
    pub fn new() -> Self {
        Self {
            initial_objects: Vec::new(),
            status_subresources: Vec::new(),
            reactors: Vec::new(),
            scheme: Scheme::new(),
            fixture_dir: None,
        }
    }

    /// Register a resource type in the scheme so raw objects of its kind
    /// can be resolved.
    pub fn register<K: ResourceType>(mut self) -> Self {
        self.scheme.register::<K>();
        self
    }

    /// Add an initial typed object, created when the clientset is built.
    pub fn with_object<K: ResourceType>(mut self, obj: K) -> Self {
        self.scheme.register::<K>();
        if let Ok(mut value) = serde_json::to_value(&obj) {
            value["apiVersion"] = Value::String(K::api_version());
            value["kind"] = Value::String(K::kind().to_string());
            self.initial_objects.push(value);
        }
        self
    }

    /// Add multiple initial typed objects.
    pub fn with_objects<K: ResourceType>(mut self, objects: Vec<K>) -> Self {
        for obj in objects {
            self = self.with_object(obj);
        }
        self
    }

    /// Add initial objects from raw JSON values. Each must carry
    /// `apiVersion` and `kind`.
    pub fn with_runtime_objects(mut self, objects: Vec<Value>) -> Self {
        self.initial_objects.extend(objects);
        self
    }

    /// Enable the status subresource for a resource type: regular updates
    /// will not modify `status`, status updates will not modify anything
    /// else.
    pub fn with_status_subresource<K: ResourceType>(mut self) -> Self {
        self.status_subresources.push(K::gvk());
        self
    }

    /// Register a reactor, appended in call order. `verb` and `resource`
    /// are exact matches or `"*"`.
    pub fn with_reactor<F>(mut self, verb: &str, resource: &str, reaction: F) -> Self
    where
        F: Fn(&Action) -> Result<Option<ReactionResult>> + Send + Sync + 'static,
    {
        self.reactors
            .push((verb.to_string(), resource.to_string(), Arc::new(reaction)));
        self
    }

    /// Set the base directory for `load_fixture` calls.
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = Some(dir.into());
        self
    }

    /// Load initial objects from a YAML fixture file.
    ///
    /// Supports multi-document files separated by `---`. If a fixture
    /// directory was set, the path is relative to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the YAML parsed.
    pub fn load_fixture(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let fixture_path = match &self.fixture_dir {
            Some(dir) => dir.join(path),
            None => path.as_ref().to_path_buf(),
        };

        let content = std::fs::read_to_string(&fixture_path).map_err(|e| {
            Error::Internal(format!(
                "failed to read fixture file {:?}: {}",
                fixture_path, e
            ))
        })?;

        use serde::Deserialize;
        for document in serde_yaml::Deserializer::from_str(&content) {
            let value = Value::deserialize(document).map_err(|e| {
                Error::Internal(format!("failed to parse YAML in {:?}: {}", fixture_path, e))
            })?;
            self.initial_objects.push(value);
        }

        Ok(self)
    }

    /// Load initial objects from multiple YAML fixture files, in order.
    pub fn load_fixtures<P>(mut self, paths: impl IntoIterator<Item = P>) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.load_fixture(path)?;
        }
        Ok(self)
    }

    /// Build the clientset, injecting all initial objects.
    ///
    /// # Errors
    ///
    /// Returns an error if any initial object is malformed.
    pub fn build(self) -> Result<FakeClientset> {
        let clientset = FakeClientset::with_scheme(self.scheme);

        for gvk in self.status_subresources {
            clientset.tracker().add_status_subresource(gvk);
        }

        for (verb, resource, reaction) in self.reactors {
            clientset
                .chain()
                .add_reactor(&verb, &resource, move |action| reaction(action));
        }

        clientset.inject_objects(self.initial_objects)?;

        Ok(clientset)
    }
}

impl Default for ClientsetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

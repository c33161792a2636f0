//! In-memory fake resource clients for testing declarative-API controllers.
//!
//! Application code depends only on the narrow [`client::ResourceClient`]
//! interface; tests back it with a fake implementation that behaves like a
//! real server (assigning resource versions, enforcing optimistic
//! concurrency, emitting watch events) without any network I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use fake_clientset::{FakeClientset, ListOptions};
//!
//! let clientset = FakeClientset::new();
//! let widgets = clientset.namespaced::<Widget>("default");
//!
//! let created = widgets.create(&widget).await?;
//! let fetched = widgets.get("my-widget").await?;
//! ```
//!
//! Tests can intercept any verb before it reaches the tracker:
//!
//! ```rust,ignore
//! clientset.add_reactor("create", "widgets", |_action| {
//!     Err(fake_clientset::Error::Reactor("injected failure".into()))
//! });
//! ```

pub mod action;
mod builder;
pub mod client;
mod clientset;
mod error;
mod meta;
pub mod reactor;
pub mod scheme;
pub mod selector;
pub mod tracker;
mod utils;
pub mod watch;

#[cfg(test)]
mod reactor_test;

pub use action::{Action, ListOptions, Patch, Verb};
pub use builder::ClientsetBuilder;
pub use client::{FakeResourceClient, ResourceClient};
pub use clientset::FakeClientset;
pub use error::{Error, Result};
pub use meta::ObjectMeta;
pub use reactor::{ReactionResult, ReactorChain};
pub use scheme::{ResourceType, Scheme};
pub use tracker::{ObjectTracker, GVK, GVR};
pub use watch::{Event, FakeWatcher};

//! Watch channels bridging tracker-side events to consumer-facing streams

use crate::selector::Selector;
use crate::tracker::GVR;
use futures::Stream;
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A change event emitted by the tracker, carrying the object state at the
/// time the mutation was committed.
#[derive(Debug, Clone)]
pub enum Event {
    Added(Value),
    Modified(Value),
    Deleted(Value),
}

impl Event {
    pub fn object(&self) -> &Value {
        match self {
            Event::Added(obj) | Event::Modified(obj) | Event::Deleted(obj) => obj,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Event::Added(_))
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, Event::Modified(_))
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Event::Deleted(_))
    }
}

/// Tracker-side half of a watch registration.
///
/// Holds the filter and the sending end of the delivery queue. The queue is
/// unbounded so delivery never blocks the tracker's critical section; a slow
/// consumer only delays itself.
pub(crate) struct WatchEntry {
    gvr: GVR,
    namespace: Option<String>,
    selector: Option<Selector>,
    tx: mpsc::UnboundedSender<Event>,
    closed: Arc<AtomicBool>,
}

impl WatchEntry {
    pub(crate) fn wants(
        &self,
        gvr: &GVR,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> bool {
        if self.gvr != *gvr {
            return false;
        }
        if let Some(ns) = &self.namespace {
            if ns != namespace {
                return false;
            }
        }
        if let Some(selector) = &self.selector {
            if !selector.matches(labels) {
                return false;
            }
        }
        true
    }

    /// Push an event; returns false once the consumer side is gone so the
    /// tracker can prune the registration.
    pub(crate) fn deliver(&self, event: Event) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Consumer-facing side of a watch registration.
///
/// Yields events in the order the corresponding mutations were committed.
/// Watches start empty: only mutations after registration appear. Dropping
/// the watcher or calling [`FakeWatcher::stop`] closes the registration.
pub struct FakeWatcher {
    rx: mpsc::UnboundedReceiver<Event>,
    closed: Arc<AtomicBool>,
}

impl FakeWatcher {
    /// Receive the next event, or `None` once the watch is stopped.
    pub async fn recv(&mut self) -> Option<Event> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        self.rx.recv().await
    }

    /// Receive an already-queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop the watch. Idempotent; queued but unconsumed events are dropped
    /// and no event is observable after this returns.
    pub fn stop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.rx.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for FakeWatcher {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Stream for FakeWatcher {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        if self.closed.load(Ordering::SeqCst) {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for FakeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeWatcher")
            .field("closed", &self.is_stopped())
            .finish()
    }
}

/// Build a connected (tracker entry, consumer watcher) pair.
pub(crate) fn channel(
    gvr: GVR,
    namespace: Option<String>,
    selector: Option<Selector>,
) -> (WatchEntry, FakeWatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    let entry = WatchEntry {
        gvr,
        namespace,
        selector,
        tx,
        closed: Arc::clone(&closed),
    };
    let watcher = FakeWatcher { rx, closed };

    (entry, watcher)
}

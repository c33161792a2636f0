#[cfg(test)]
mod tests {
    use crate::action::{Action, ListOptions};
    use crate::reactor::{ReactionResult, ReactorChain};
    use crate::tracker::{ObjectTracker, GVK, GVR};
    use crate::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn widget_gvr() -> GVR {
        GVR::new("example.com", "v1", "widgets")
    }

    fn widget_gvk() -> GVK {
        GVK::new("example.com", "v1", "Widget")
    }

    fn test_object(name: &str) -> serde_json::Value {
        json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": name, "namespace": "default"},
            "spec": {"size": 1}
        })
    }

    fn new_chain() -> ReactorChain {
        ReactorChain::new(Arc::new(ObjectTracker::new()))
    }

    #[test]
    fn test_default_reactors_reach_the_tracker() {
        let chain = new_chain();

        let create = Action::create(widget_gvr(), Some("default".into()), test_object("w1"));
        chain.dispatch(&create).unwrap();

        let get = Action::get(widget_gvr(), Some("default".into()), "w1");
        let fetched = chain.dispatch(&get).unwrap().into_object().unwrap();
        assert_eq!(fetched["metadata"]["name"], "w1");

        let list = Action::list(widget_gvr(), Some("default".into()), &ListOptions::default());
        let listed = chain.dispatch(&list).unwrap().into_list().unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn test_error_reactor_short_circuits_before_the_tracker() {
        let chain = new_chain();
        chain.add_reactor("create", "widgets", |_action| {
            Err(Error::Invalid("rejected by reactor".to_string()))
        });

        let create = Action::create(widget_gvr(), Some("default".into()), test_object("w1"));
        let result = chain.dispatch(&create);
        assert!(matches!(result, Err(Error::Invalid(_))));

        // The action never reached the tracker; the store stays empty.
        let listed = chain
            .tracker()
            .list(&widget_gvr(), Some("default"), None)
            .unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_declining_reactor_falls_through() {
        let chain = new_chain();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        chain.add_reactor("create", "widgets", move |_action| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });

        let create = Action::create(widget_gvr(), Some("default".into()), test_object("w1"));
        chain.dispatch(&create).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(chain.tracker().get(&widget_gvr(), "default", "w1").is_ok());
    }

    #[test]
    fn test_first_matching_reactor_wins() {
        let chain = new_chain();
        chain.add_reactor("get", "widgets", |_action| {
            Ok(Some(ReactionResult::Object(json!({"winner": "first"}))))
        });
        chain.add_reactor("get", "widgets", |_action| {
            Ok(Some(ReactionResult::Object(json!({"winner": "second"}))))
        });

        let get = Action::get(widget_gvr(), Some("default".into()), "w1");
        let result = chain.dispatch(&get).unwrap().into_object().unwrap();
        assert_eq!(result["winner"], "first");
    }

    #[test]
    fn test_prepended_reactor_runs_before_appended_ones() {
        let chain = new_chain();
        chain.add_reactor("get", "widgets", |_action| {
            Ok(Some(ReactionResult::Object(json!({"winner": "appended"}))))
        });
        chain.prepend_reactor("get", "widgets", |_action| {
            Ok(Some(ReactionResult::Object(json!({"winner": "prepended"}))))
        });

        let get = Action::get(widget_gvr(), Some("default".into()), "w1");
        let result = chain.dispatch(&get).unwrap().into_object().unwrap();
        assert_eq!(result["winner"], "prepended");
    }

    #[test]
    fn test_wildcard_patterns_match_any_verb_and_resource() {
        let chain = new_chain();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        chain.add_reactor("*", "*", move |_action| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });

        let create = Action::create(widget_gvr(), Some("default".into()), test_object("w1"));
        chain.dispatch(&create).unwrap();
        let get = Action::get(widget_gvr(), Some("default".into()), "w1");
        chain.dispatch(&get).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_non_matching_reactor_is_skipped() {
        let chain = new_chain();
        chain.add_reactor("delete", "widgets", |_action| {
            Err(Error::Invalid("should not fire on create".to_string()))
        });
        chain.add_reactor("create", "gadgets", |_action| {
            Err(Error::Invalid("should not fire on widgets".to_string()))
        });

        let create = Action::create(widget_gvr(), Some("default".into()), test_object("w1"));
        assert!(chain.dispatch(&create).is_ok());
    }

    #[test]
    fn test_reactor_with_private_state_fails_first_n_calls() {
        let chain = new_chain();
        let remaining = Arc::new(AtomicUsize::new(2));
        let counter = Arc::clone(&remaining);
        chain.add_reactor("create", "widgets", move |_action| {
            if counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                Err(Error::Reactor("transient failure".to_string()))
            } else {
                Ok(None)
            }
        });

        let create = |name: &str| Action::create(widget_gvr(), Some("default".into()), test_object(name));
        assert!(matches!(chain.dispatch(&create("w1")), Err(Error::Reactor(_))));
        assert!(matches!(chain.dispatch(&create("w1")), Err(Error::Reactor(_))));
        assert!(chain.dispatch(&create("w1")).is_ok());
    }

    #[test]
    fn test_reactor_override_never_touches_the_store() {
        let chain = new_chain();
        chain
            .tracker()
            .create(&widget_gvr(), &widget_gvk(), test_object("w1"), "default")
            .unwrap();

        chain.add_reactor("delete", "widgets", |_action| {
            Ok(Some(ReactionResult::Object(json!({"intercepted": true}))))
        });

        let delete = Action::delete(widget_gvr(), Some("default".into()), "w1");
        let result = chain.dispatch(&delete).unwrap().into_object().unwrap();
        assert_eq!(result["intercepted"], true);

        // The object survives: the default delete reactor never ran.
        assert!(chain.tracker().get(&widget_gvr(), "default", "w1").is_ok());
    }

    #[test]
    fn test_watch_dispatch_returns_a_watcher() {
        let chain = new_chain();
        let watch = Action::watch(widget_gvr(), Some("default".into()), &ListOptions::default());
        let watcher = chain.dispatch(&watch).unwrap().into_watcher().unwrap();
        assert!(!watcher.is_stopped());
        assert_eq!(chain.tracker().watcher_count(), 1);
    }
}

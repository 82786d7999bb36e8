//! Controller trees driven by registry transitions.

use std::sync::{Arc, Mutex};

use statenav::controller::{ControllerError, HandlerTable, Scope};
use statenav::{Controller, ControllerTree, Params, StateTarget, TransitionOptions};

mod common;

type Log = Arc<Mutex<Vec<String>>>;

fn handlers(log: &Log) -> HandlerTable {
    let mut table = HandlerTable::new();
    let entered = log.clone();
    table.insert("record", move |scope: &mut Scope<'_>| {
        let params = scope.params();
        let entry = match params.get_str("id").or_else(|| params.get_str("query")) {
            Some(value) => format!("{}:{}", scope.local_name(), value),
            None => scope.local_name().to_string(),
        };
        entered.lock().unwrap().push(entry);
    });

    let shop_log = log.clone();
    table.insert("open_shop", move |scope: &mut Scope<'_>| {
        shop_log.lock().unwrap().push("shop".to_string());
        let me = scope.controller();
        if !scope.tree().child_controllers(me).is_empty() {
            return;
        }
        let shop = Controller::builder("shop")
            .state_named("index", "record")
            .state_named("show(id)", "record")
            .state_named("search(query)", "record")
            .default_state("index")
            .build(&handlers(&shop_log))
            .unwrap();
        let view = scope.add_view("shop-layout").unwrap();
        scope.tree().insert(view, shop).unwrap();
    });

    let about_log = log.clone();
    table.insert("close_all", move |scope: &mut Scope<'_>| {
        about_log.lock().unwrap().push(scope.local_name().to_string());
        scope.clear_children();
    });
    table
}

fn shell(log: &Log) -> Controller {
    Controller::builder("shell")
        .state_named("home", "close_all")
        .state_named("shop", "open_shop")
        .state_named("about", "close_all")
        .default_state("home")
        .build(&handlers(log))
        .unwrap()
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_default_state_scoped_under_parent() {
    let registry = common::shop_registry();
    let mut tree = ControllerTree::new(registry.clone());
    let log = Log::default();
    let root = tree.set_root(shell(&log)).unwrap();

    tree.set_state(root, "shop", TransitionOptions::new()).await.unwrap();
    let shop = tree.child_controllers(root)[0];

    assert!(tree
        .set_state(shop, StateTarget::Default, TransitionOptions::new())
        .await
        .unwrap());
    assert_eq!(registry.get_current().unwrap().full_name(), "shop.index");
    assert_eq!(entries(&log), vec!["shop", "index"]);
}

#[tokio::test]
async fn test_tree_follows_address_changes() {
    let (registry, address) = common::shop_registry_with_address();
    let mut events = registry.subscribe();
    let mut tree = ControllerTree::new(registry.clone());
    let log = Log::default();
    let root = tree.set_root(shell(&log)).unwrap();

    address.navigate("/shop/42");
    let event = common::next_event(&mut events).await;
    assert!(tree.handle_event(&event));

    address.navigate("/shop/43");
    let event = common::next_event(&mut events).await;
    assert!(tree.handle_event(&event));

    // `shop` compares all params, so it re-enters; the existing child is
    // still the one that handled `shop.show` before.
    assert_eq!(entries(&log), vec!["shop", "show:42", "shop", "show:43"]);
    let path: Vec<_> = tree.active_path().into_iter().map(|(_, name)| name).collect();
    assert_eq!(path, vec!["shop", "show"]);

    address.navigate("/");
    let event = common::next_event(&mut events).await;
    tree.handle_event(&event);
    assert!(tree.child_controllers(root).is_empty());
    assert_eq!(entries(&log).last().map(String::as_str), Some("home"));
    assert_eq!(tree.describe(), "shell [home]\n");
}

#[tokio::test]
async fn test_relative_target_from_child() {
    let registry = common::shop_registry();
    let mut tree = ControllerTree::new(registry.clone());
    let log = Log::default();
    let root = tree.set_root(shell(&log)).unwrap();
    registry
        .navigate("shop.search", Params::new().with("query", "hats"), TransitionOptions::new())
        .await
        .unwrap();
    tree.sync();
    let shop = tree.child_controllers(root)[0];

    tree.set_state(shop, "../about", TransitionOptions::new()).await.unwrap();
    assert_eq!(registry.get_current().unwrap().full_name(), "about");
    assert!(!tree.is_alive(shop));

    let err = tree
        .set_state(root, "../about", TransitionOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err, ControllerError::WalkPastRoot("../about".into()));
}

#[tokio::test]
async fn test_unknown_handler_name_fails_at_build() {
    let err = Controller::builder("broken")
        .state_named("index", "does_not_exist")
        .build(&HandlerTable::new())
        .unwrap_err();
    assert_eq!(
        err,
        ControllerError::UnknownHandler {
            controller: "broken".into(),
            handler: "does_not_exist".into(),
        }
    );
}

// End-to-end browsing scenarios

use refscope::config::Config;
use refscope::demo::{self, Demo};
use refscope::explorer::GraphExplorer;
use refscope::heap::{Heap, ObjRef, Value};
use refscope::registry::IdentityRegistry;
use refscope::session::Session;
use refscope::tree::{object_key, NodeId, NodeTree};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn tree_for(heap: &Arc<Heap>, root: &ObjRef) -> NodeTree {
    let registry = IdentityRegistry::capture(heap).expect("registry capture failed");
    NodeTree::new(root.clone(), GraphExplorer::new(Arc::new(registry)))
}

/// Tick the session until every representation node has its text
fn settle(session: &mut Session) {
    let deadline = Instant::now() + Duration::from_secs(10);
    session.flush();
    while session.tree().pending_reprs() > 0 {
        assert!(Instant::now() < deadline, "representations never arrived");
        session.tick();
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn texts(tree: &mut NodeTree, ids: &[NodeId]) -> Vec<String> {
    ids.iter().map(|&id| tree.display_text(id)).collect()
}

#[test]
fn test_self_containing_list() {
    let heap = Heap::new();
    let list = heap.alloc(Value::List(Vec::new())).unwrap();
    list.set(Value::List(vec![list.id()])).unwrap();
    let mut tree = tree_for(&heap, &list);

    let key = object_key(list.id());
    let top = tree.child(tree.root(), &key);
    assert_eq!(
        tree.child_keys(top),
        ["type", "len", "repr", "referents", "referrers"]
    );

    let len = tree.child(top, "len");
    assert_eq!(tree.display_text(len), "len: 1");

    let referents = tree.child(top, "referents");
    assert_eq!(tree.display_text(referents), "referents: 1");
    assert_eq!(tree.child_keys(referents), [key.clone()]);

    let again = tree.child(referents, &key);
    assert_eq!(tree.key(again), tree.key(top));
    assert_eq!(tree.child_keys(again), ["cycle"]);
    let cycle = tree.child(again, "cycle");
    assert_eq!(tree.display_text(cycle), "cycle: see 1 levels above");

    let referrers = tree.child(top, "referrers");
    assert_eq!(tree.display_text(referrers), "referrers: 1");
}

#[test]
fn test_integer_has_no_length_and_no_edges() {
    let (heap, root) = demo::build(Demo::Int).unwrap();
    let mut tree = tree_for(&heap, &root);
    let top = tree.child(tree.root(), &object_key(root.id()));

    assert_eq!(tree.child_keys(top), ["type", "repr", "referents", "referrers"]);
    let children = tree.children(top);
    let shown = texts(&mut tree, &children);
    assert_eq!(shown[0], "type: int");
    assert_eq!(shown[1], "repr: loading...");
    assert_eq!(shown[2], "referents: 0");
    assert_eq!(shown[3], "referrers: 0");
}

#[test]
fn test_two_object_cycle() {
    let heap = Heap::new();
    let a = heap.alloc(Value::List(Vec::new())).unwrap();
    let b = heap.alloc(Value::List(vec![a.id()])).unwrap();
    a.set(Value::List(vec![b.id()])).unwrap();
    let mut tree = tree_for(&heap, &a);

    let a_key = object_key(a.id());
    let b_key = object_key(b.id());
    let a_again = tree.walk(
        tree.root(),
        &[a_key.as_str(), "referents", b_key.as_str(), "referents", a_key.as_str()],
    );

    assert_eq!(tree.cycle_depth(a_again), Some(2));
    let cycle = tree.child(a_again, "cycle");
    assert_eq!(tree.display_text(cycle), "cycle: see 2 levels above");
}

#[test]
fn test_objects_created_after_capture_are_hidden() {
    let heap = Heap::new();
    let root = heap.alloc(Value::List(Vec::new())).unwrap();
    let mut tree = tree_for(&heap, &root);

    let late = heap.alloc(Value::Int(5)).unwrap();
    heap.alloc(Value::Tuple(vec![root.id()])).unwrap();
    root.set(Value::List(vec![late.id()])).unwrap();

    let top = tree.child(tree.root(), &object_key(root.id()));
    let referents = tree.child(top, "referents");
    let referrers = tree.child(top, "referrers");
    assert!(tree.child_keys(referents).is_empty());
    assert!(tree.child_keys(referrers).is_empty());

    // The length is read live, only membership is frozen
    let len = tree.child(top, "len");
    assert_eq!(tree.display_text(len), "len: 1");
}

#[test]
fn test_members_are_ordered_by_identity() {
    let heap = Heap::new();
    let first = heap.alloc(Value::Int(1)).unwrap();
    let second = heap.alloc(Value::Int(2)).unwrap();
    let third = heap.alloc(Value::Int(3)).unwrap();
    let root = heap
        .alloc(Value::List(vec![third.id(), first.id(), second.id(), first.id()]))
        .unwrap();
    let mut tree = tree_for(&heap, &root);

    let referents = tree.walk(tree.root(), &[object_key(root.id()).as_str(), "referents"]);
    assert_eq!(
        tree.child_keys(referents),
        [
            object_key(first.id()),
            object_key(second.id()),
            object_key(third.id())
        ]
    );
}

#[test]
fn test_long_repr_is_truncated() {
    let heap = Heap::new();
    let text = heap.alloc(Value::Str("z".repeat(500))).unwrap();
    let registry = IdentityRegistry::capture(&heap).unwrap();
    let mut session = Session::new(text.clone(), registry, Config::default()).unwrap();

    let tree = session.tree_mut();
    let repr = tree.walk(tree.root(), &[object_key(text.id()).as_str(), "repr"]);
    settle(&mut session);

    let shown = session.tree_mut().display_text(repr);
    let value = shown.strip_prefix("repr: ").unwrap();
    assert_eq!(value.chars().count(), 83);
    assert!(value.starts_with("'zzz"));
    assert!(value.ends_with("..."));
}

#[test]
fn test_failing_representations_are_reported() {
    let (heap, app) = demo::build(Demo::Web).unwrap();
    let fields = heap.referents_of(app.id()).unwrap();
    let (socket, probe, deep) = (fields[4], fields[5], fields[6]);
    let registry = IdentityRegistry::capture(&heap).unwrap();
    let mut session = Session::new(app.clone(), registry, Config::default()).unwrap();

    let app_key = object_key(app.id());
    let tree = session.tree_mut();
    let mut reprs = Vec::new();
    for member in [socket, probe, deep] {
        reprs.push(tree.walk(
            tree.root(),
            &[app_key.as_str(), "referents", object_key(member).as_str(), "repr"],
        ));
    }
    settle(&mut session);

    let shown = texts(session.tree_mut(), &reprs);
    assert_eq!(shown[0], "repr: repr error: ConnectionError");
    assert_eq!(shown[1], "repr: repr error: Panic");
    assert_eq!(shown[2], "repr: repr error: RecursionLimit");
    assert!(session.is_running());
}

#[test]
fn test_collected_member_keeps_its_node() {
    let heap = Heap::new();
    let item = heap.alloc(Value::Str("temp".to_string())).unwrap();
    let root = heap.alloc(Value::List(vec![item.id()])).unwrap();
    let mut tree = tree_for(&heap, &root);

    let member = tree.walk(
        tree.root(),
        &[object_key(root.id()).as_str(), "referents", object_key(item.id()).as_str()],
    );
    let type_node = tree.child(member, "type");
    heap.free(item.id()).unwrap();

    assert_eq!(tree.display_text(type_node), "type: <collected>");
    let len = tree.child(member, "len");
    assert_eq!(tree.display_text(len), "len: <collected>");
}

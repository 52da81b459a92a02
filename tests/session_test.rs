// Session teardown on unwinding

use crossbeam_channel::Sender;
use refscope::bridge::{BridgeConfig, Callback, PresentationBridge, HANDOFF_CAPACITY};
use refscope::config::Config;
use refscope::error::ReprError;
use refscope::heap::{Heap, NativeObject, Value};
use refscope::registry::IdentityRegistry;
use refscope::session::Session;
use refscope::tree::object_key;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Announces that its representation started, then takes a while
struct Slow {
    started: Sender<()>,
    delay: Duration,
}

impl NativeObject for Slow {
    fn type_name(&self) -> &str {
        "Slow"
    }

    fn repr(&self) -> Result<String, ReprError> {
        let _ = self.started.send(());
        thread::sleep(self.delay);
        Ok("slow".to_string())
    }
}

#[test]
fn test_unwinding_joins_busy_workers() {
    let heap = Heap::new();
    let (started_tx, started_rx) = crossbeam_channel::unbounded();
    let slow = heap
        .alloc(Value::Native(Arc::new(Slow {
            started: started_tx,
            delay: Duration::from_millis(300),
        })))
        .unwrap();
    let registry = IdentityRegistry::capture(&heap).unwrap();
    let mut session = Session::new(slow.clone(), registry, Config::default()).unwrap();

    let tree = session.tree_mut();
    tree.walk(tree.root(), &[object_key(slow.id()).as_str(), "repr"]);
    assert_eq!(session.flush(), 1);
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("representation never started");
    drop(slow);

    let unwound = panic::catch_unwind(AssertUnwindSafe(move || {
        let _session = session;
        panic!("render loop failed");
    }));
    assert!(unwound.is_err());

    // The running job holds a reference to the heap until its worker is joined
    assert_eq!(Arc::strong_count(&heap), 1);
}

#[test]
fn test_unwinding_releases_workers_behind_full_queue() {
    let heap = Heap::new();
    let ids: Vec<_> = (0..HANDOFF_CAPACITY as i64 + 200)
        .map(|n| heap.alloc(Value::Int(n)).unwrap().id())
        .collect();
    let root = heap.alloc(Value::List(ids.clone())).unwrap();
    let registry = IdentityRegistry::capture(&heap).unwrap();
    let mut session = Session::new(root.clone(), registry, Config::default()).unwrap();

    let tree = session.tree_mut();
    let referents = tree.walk(tree.root(), &[object_key(root.id()).as_str(), "referents"]);
    for id in &ids {
        tree.walk(referents, &[object_key(*id).as_str(), "repr"]);
    }
    drop(root);
    assert_eq!(session.flush(), ids.len());

    // Never drained, so the workers fill the queue and park on it
    thread::sleep(Duration::from_millis(200));
    assert_eq!(session.tree().pending_reprs(), ids.len());

    let unwound = panic::catch_unwind(AssertUnwindSafe(move || {
        let _session = session;
        panic!("render loop failed");
    }));
    assert!(unwound.is_err());
    assert_eq!(Arc::strong_count(&heap), 1);
}

#[test]
fn test_unwinding_bridge_discards_results() {
    let applied = Arc::new(AtomicUsize::new(0));
    let bridge: PresentationBridge<Vec<usize>> = PresentationBridge::start(&BridgeConfig {
        handoff_capacity: 2,
        ..BridgeConfig::default()
    })
    .expect("bridge failed to start");

    for i in 0..16 {
        let applied = Arc::clone(&applied);
        bridge.spawn(move |_| {
            let callback: Callback<Vec<usize>> = Box::new(move |seen: &mut Vec<usize>| {
                applied.fetch_add(1, Ordering::SeqCst);
                seen.push(i);
            });
            callback
        });
    }
    let deadline = Instant::now() + Duration::from_secs(5);
    while bridge.ready() < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(bridge.ready(), 2);

    let unwound = panic::catch_unwind(AssertUnwindSafe(move || {
        let _bridge = bridge;
        panic!("render loop failed");
    }));
    assert!(unwound.is_err());

    // Every callback was dropped unapplied, queued or not
    assert_eq!(applied.load(Ordering::SeqCst), 0);
    assert_eq!(Arc::strong_count(&applied), 1);
}

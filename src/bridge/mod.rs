//! Asynchronous presentation bridge
//!
//! Producing the text of an object can run arbitrary code
//! ([`NativeObject::repr`](crate::heap::NativeObject::repr)), so it never runs
//! on the render thread. The bridge has three parts:
//!
//! - [`pool`]: a fixed-size [`WorkerPool`] that computes representations
//! - [`handoff`]: the bounded [`Handoff`] queue carrying results back
//! - [`PresentationBridge`]: glue that submits a job and arranges for its
//!   result to be applied to render state of type `T` on the next drain
//!
//! ```text
//! render thread ── set_repr_later ──▶ pool ── safe_repr ──▶ handoff ──▶ drain ──▶ T
//! ```

pub mod handoff;
pub mod pool;

pub use handoff::{Callback, Cancelled, Handoff, HandoffSender};
pub use pool::{CancelSource, CancelToken, Job, WorkerPool};

use crate::error::ReprError;
use crate::heap::ObjRef;
use std::io;
use std::panic::{self, AssertUnwindSafe};

/// Longest representation shown before truncation
pub const REPR_MAX_CHARS: usize = 80;

/// Appended to a truncated representation
pub const REPR_ELLIPSIS: &str = "...";

/// Capacity of the handoff queue
pub const HANDOFF_CAPACITY: usize = 1000;

/// Longest failure kind shown in a diagnostic
pub const DIAGNOSTIC_MAX_CHARS: usize = 40;

/// Prefix of worker thread names
pub const WORKER_NAME_PREFIX: &str = "refscope-worker-";

/// Sizing for a [`PresentationBridge`]
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub worker_threads: usize,
    pub handoff_capacity: usize,
    pub repr_max_chars: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            handoff_capacity: HANDOFF_CAPACITY,
            repr_max_chars: REPR_MAX_CHARS,
        }
    }
}

/// Cap `text` at `max_chars` characters, marking truncation with an ellipsis
pub fn truncate_repr(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = text;
            out.truncate(cut);
            out.push_str(REPR_ELLIPSIS);
            out
        }
        None => text,
    }
}

/// Drop control characters, so object-supplied text cannot drive the terminal
pub fn strip_control(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Bounded representation of `obj`; a panic in the conversion becomes
/// [`ReprError::Panicked`]
pub fn safe_repr(obj: &ObjRef, max_chars: usize) -> Result<String, ReprError> {
    let text = panic::catch_unwind(AssertUnwindSafe(|| obj.repr()))
        .map_err(|_| ReprError::Panicked)??;
    Ok(truncate_repr(strip_control(&text), max_chars))
}

/// Short diagnostic naming only the failure kind
pub fn failure_diagnostic(err: &ReprError) -> String {
    let kind = truncate_repr(strip_control(err.kind()), DIAGNOSTIC_MAX_CHARS);
    format!("repr error: {}", kind)
}

/// Outcome of a finished job: the representation, or the diagnostic that
/// replaces it
pub fn repr_outcome(obj: &ObjRef, max_chars: usize) -> Result<String, String> {
    safe_repr(obj, max_chars).map_err(|e| {
        log::debug!("Representation of {} failed: {}", obj.id(), e);
        failure_diagnostic(&e)
    })
}

/// [`repr_outcome`] flattened to display text
pub fn repr_text(obj: &ObjRef, max_chars: usize) -> String {
    repr_outcome(obj, max_chars).unwrap_or_else(|diagnostic| diagnostic)
}

/// Worker pool plus handoff queue delivering results to render state `T`
pub struct PresentationBridge<T> {
    pool: WorkerPool,
    handoff: Handoff<T>,
    repr_max_chars: usize,
}

impl<T: 'static> PresentationBridge<T> {
    /// Start the workers
    pub fn start(config: &BridgeConfig) -> io::Result<Self> {
        Ok(PresentationBridge {
            pool: WorkerPool::new(config.worker_threads, WORKER_NAME_PREFIX)?,
            handoff: Handoff::bounded(config.handoff_capacity),
            repr_max_chars: config.repr_max_chars,
        })
    }

    /// Compute the representation of `obj` in the background. Once done,
    /// `apply` runs on the render thread during a later [`drain`] with the
    /// text, or with the failure diagnostic as the error.
    ///
    /// Returns `false` if the bridge has shut down.
    ///
    /// [`drain`]: PresentationBridge::drain
    pub fn set_repr_later<F>(&self, obj: ObjRef, apply: F) -> bool
    where
        F: FnOnce(&mut T, Result<String, String>) + Send + 'static,
    {
        let max_chars = self.repr_max_chars;
        self.spawn(move |_| {
            let outcome = repr_outcome(&obj, max_chars);
            let callback: Callback<T> = Box::new(move |target: &mut T| apply(target, outcome));
            callback
        })
    }

    /// Run `work` on a worker and queue the callback it returns
    pub fn spawn<W>(&self, work: W) -> bool
    where
        W: FnOnce(&CancelToken) -> Callback<T> + Send + 'static,
    {
        let sender = self.handoff.sender();
        self.pool.submit(Box::new(move |cancel| {
            if cancel.is_cancelled() {
                return;
            }
            let callback = work(cancel);
            if sender.put(callback, cancel).is_err() {
                log::debug!("Discarded a result computed during shutdown");
            }
        }))
    }

    /// Apply every result queued so far to `target`. Never blocks.
    pub fn drain(&self, target: &mut T) -> usize {
        self.handoff.drain(target)
    }

    /// Results waiting in the handoff queue
    pub fn ready(&self) -> usize {
        self.handoff.len()
    }

    /// Jobs not yet picked up by a worker
    pub fn queued(&self) -> usize {
        self.pool.queued()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    /// Cancel outstanding work, join the workers and throw away any result
    /// that has not been applied. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.pool.is_running() {
            return;
        }
        self.pool.shutdown();
        let discarded = self.handoff.discard();
        if discarded > 0 {
            log::info!("Discarded {} undelivered results", discarded);
        }
    }
}

impl<T> Drop for PresentationBridge<T> {
    fn drop(&mut self) {
        self.pool.shutdown();
        self.handoff.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{Heap, NativeObject, Value};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    struct Exploding;

    impl NativeObject for Exploding {
        fn type_name(&self) -> &str {
            "Exploding"
        }

        fn repr(&self) -> Result<String, ReprError> {
            panic!("repr exploded")
        }
    }

    struct Refusing;

    impl NativeObject for Refusing {
        fn type_name(&self) -> &str {
            "Refusing"
        }

        fn repr(&self) -> Result<String, ReprError> {
            Err(ReprError::Failed {
                kind: "PermissionError".to_string(),
                message: "not today".to_string(),
            })
        }
    }

    struct Hostile;

    impl NativeObject for Hostile {
        fn type_name(&self) -> &str {
            "Hostile"
        }

        fn repr(&self) -> Result<String, ReprError> {
            Err(ReprError::Failed {
                kind: format!("\x1b[2J{}", "E".repeat(5000)),
                message: String::new(),
            })
        }
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "x".repeat(200);
        let out = truncate_repr(long, 80);
        assert_eq!(out.len(), 83);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..80], "x".repeat(80));
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_repr("y".repeat(80), 80), "y".repeat(80));
        assert_eq!(truncate_repr("short".to_string(), 80), "short");
    }

    #[test]
    fn test_truncate_counts_characters() {
        let out = truncate_repr("é".repeat(81), 80);
        assert_eq!(out.chars().count(), 83);
    }

    #[test]
    fn test_failures_report_kind_only() {
        let heap = Heap::new();
        let exploding = heap.alloc(Value::Native(Arc::new(Exploding))).unwrap();
        let refusing = heap.alloc(Value::Native(Arc::new(Refusing))).unwrap();

        assert_eq!(repr_text(&exploding, 80), "repr error: Panic");
        assert_eq!(repr_text(&refusing, 80), "repr error: PermissionError");
        assert_eq!(
            repr_outcome(&refusing, 80),
            Err("repr error: PermissionError".to_string())
        );
    }

    #[test]
    fn test_failure_kind_is_bounded_and_printable() {
        let heap = Heap::new();
        let hostile = heap.alloc(Value::Native(Arc::new(Hostile))).unwrap();

        let text = repr_text(&hostile, 80);
        assert!(!text.chars().any(char::is_control));
        assert!(text.starts_with("repr error: [2JEEE"));
        assert!(text.ends_with("..."));
        assert_eq!(
            text.chars().count(),
            "repr error: ".len() + DIAGNOSTIC_MAX_CHARS + REPR_ELLIPSIS.len()
        );
    }

    #[test]
    fn test_results_arrive_through_drain() {
        let heap = Heap::new();
        let obj = heap.alloc(Value::Int(42)).unwrap();
        let bridge: PresentationBridge<Vec<Result<String, String>>> =
            PresentationBridge::start(&BridgeConfig::default()).unwrap();
        assert!(bridge.set_repr_later(obj, |out, outcome| out.push(outcome)));

        let mut applied = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while applied.is_empty() && Instant::now() < deadline {
            bridge.drain(&mut applied);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(applied, vec![Ok("42".to_string())]);
    }

    #[test]
    fn test_nothing_applied_after_shutdown() {
        let heap = Heap::new();
        let obj = heap.alloc(Value::Str("late".to_string())).unwrap();
        let mut bridge: PresentationBridge<Vec<Result<String, String>>> =
            PresentationBridge::start(&BridgeConfig::default()).unwrap();
        bridge.set_repr_later(obj.clone(), |out, outcome| out.push(outcome));
        bridge.shutdown();

        let mut applied = Vec::new();
        assert_eq!(bridge.drain(&mut applied), 0);
        assert!(!bridge.set_repr_later(obj, |out, outcome| out.push(outcome)));
        assert!(applied.is_empty());
    }
}

//! Bounded handoff queue between the workers and the render thread
//!
//! Workers never touch render state. They enqueue a callback instead, and the
//! render thread runs the callbacks during [`Handoff::drain`].
//!
//! # Backpressure
//!
//! The queue is bounded. A worker that finds it full blocks in
//! [`HandoffSender::put`] until the render thread drains, or until the pool is
//! cancelled. Results are never dropped while the session is alive.

use super::pool::CancelToken;
use crossbeam_channel::{select, Receiver, Sender};

/// Deferred mutation of render state `T`
pub type Callback<T> = Box<dyn FnOnce(&mut T) + Send>;

/// The handoff was abandoned because the pool is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Consumer side, owned by the render thread
pub struct Handoff<T> {
    tx: Sender<Callback<T>>,
    rx: Receiver<Callback<T>>,
}

impl<T> Handoff<T> {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Handoff { tx, rx }
    }

    /// Producer handle for a worker
    pub fn sender(&self) -> HandoffSender<T> {
        HandoffSender {
            tx: self.tx.clone(),
        }
    }

    /// Run every callback queued at the moment of the call, in queue order.
    ///
    /// Callbacks enqueued while draining wait for the next call, so a busy
    /// pool cannot keep the render thread here indefinitely. Never blocks.
    pub fn drain(&self, target: &mut T) -> usize {
        let ready = self.rx.len();
        let mut applied = 0;
        for _ in 0..ready {
            match self.rx.try_recv() {
                Ok(callback) => {
                    callback(target);
                    applied += 1;
                }
                Err(_) => break,
            }
        }
        applied
    }

    /// Drop everything queued without applying it
    pub fn discard(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.rx.capacity()
    }
}

/// Producer side, cloned into each job
pub struct HandoffSender<T> {
    tx: Sender<Callback<T>>,
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        HandoffSender {
            tx: self.tx.clone(),
        }
    }
}

impl<T> HandoffSender<T> {
    /// Enqueue `callback`, blocking while the queue is full.
    ///
    /// Gives up only when `cancel` fires, in which case the callback is
    /// dropped unapplied.
    pub fn put(&self, callback: Callback<T>, cancel: &CancelToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        select! {
            send(self.tx, callback) -> res => res.map_err(|_| Cancelled),
            recv(cancel.receiver()) -> _ => Err(Cancelled),
        }
    }
}

//! DeferredQueue: host callbacks queued to run after the current UI pass.
//!
//! # Why defer? (for beginners)
//!
//! A host reports geometry while it is still laying itself out.  Applying
//! those values inline would let the keyboard observe a half-finished frame,
//! so every inbound signal is turned into a *task* and queued.  The session
//! drains the queue on its owner thread once the host pass has settled.
//!
//! # Generations and staleness
//!
//! Each call to [`DeferredQueue::schedule`] bumps a monotonically increasing
//! generation counter and stamps the task with it.  The queue also remembers
//! the newest generation scheduled per *slot* (one slot per kind of pass).
//! When a task is popped, [`DeferredQueue::is_stale`] compares its stamp
//! with the newest generation for its slot:
//!
//! ```text
//! schedule(Host, a)   -> gen 1
//! schedule(Frame, f)  -> gen 2
//! schedule(Host, b)   -> gen 3
//!
//! pop -> Host  gen 1  stale  (gen 3 superseded it)
//! pop -> Frame gen 2  fresh
//! pop -> Host  gen 3  fresh
//! ```
//!
//! A stale task must be dropped without applying its data.  Tasks for
//! different slots never supersede each other, so a frame report is not lost
//! because a host snapshot arrived after it.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A queued task stamped with the generation it was scheduled under.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred<K, T> {
    pub slot: K,
    pub generation: u64,
    pub task: T,
}

/// FIFO of deferred tasks with per-slot staleness detection.
#[derive(Debug)]
pub struct DeferredQueue<K, T> {
    generation: u64,
    latest: HashMap<K, u64>,
    pending: VecDeque<Deferred<K, T>>,
}

impl<K, T> Default for DeferredQueue<K, T> {
    fn default() -> Self {
        Self {
            generation: 0,
            latest: HashMap::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<K: Copy + Eq + Hash, T> DeferredQueue<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The generation stamped on the most recently scheduled task (0 if none).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queues `task` in `slot` and returns the generation it was stamped with.
    ///
    /// Wraps around at `u64::MAX` without panicking.
    pub fn schedule(&mut self, slot: K, task: T) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.latest.insert(slot, self.generation);
        self.pending.push_back(Deferred {
            slot,
            generation: self.generation,
            task,
        });
        self.generation
    }

    /// Removes the oldest task, stale or not.
    pub fn pop(&mut self) -> Option<Deferred<K, T>> {
        self.pending.pop_front()
    }

    /// Returns `true` if a newer task has been scheduled for the same slot.
    pub fn is_stale(&self, deferred: &Deferred<K, T>) -> bool {
        self.latest
            .get(&deferred.slot)
            .is_some_and(|latest| *latest != deferred.generation)
    }

    /// The newest task for `slot` that is still queued.
    pub fn latest_pending(&self, slot: &K) -> Option<&T> {
        let latest = *self.latest.get(slot)?;
        self.pending
            .iter()
            .rev()
            .find(|deferred| deferred.generation == latest)
            .map(|deferred| &deferred.task)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

//! Deferred, non-cancelable tasks.
//!
//! Tasks are never removed when their target goes away. Instead every task
//! carries what it needs to re-check its target when it fires, and the engine
//! turns a stale task into a no-op.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    /// Return a highlighted list entry to its normal color
    ResetHighlight { workout_id: String },
    /// Hide the validation message shown at `generation`
    HideValidationMessage { generation: u64 },
}

#[derive(Debug, Clone)]
struct Scheduled {
    due: DateTime<Utc>,
    seq: u64,
    task: DeferredTask,
}

/// Pending tasks ordered by due time, then by scheduling order.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Vec<Scheduled>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: DateTime<Utc>, task: DeferredTask) {
        self.next_seq += 1;
        self.pending.push(Scheduled {
            due,
            seq: self.next_seq,
            task,
        });
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<DeferredTask> {
        let (mut due, later): (Vec<Scheduled>, Vec<Scheduled>) =
            self.pending.drain(..).partition(|s| s.due <= now);
        self.pending = later;
        due.sort_by_key(|s| (s.due, s.seq));
        due.into_iter().map(|s| s.task).collect()
    }

    /// Earliest due time, if anything is pending.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.pending.iter().map(|s| s.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

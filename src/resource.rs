//! # Priority-ordered resource gate
//!
//! [`ResourceManager`] hands out at most `capacity` [`Permit`]s at a time.
//! Waiting requests are granted strictly by [`Priority`], then by job id, then
//! by arrival at the manager.
//!
//! ## Control loop
//! ```text
//! acquire(job) ──► Request{job, reply} ──┐
//! Permit::drop ──► Release ──────────────┼──► control loop (owns free count + heap)
//! snapshot()   ──► Snapshot{reply} ──────┘        │
//!                                                 ├─ while free > 0 and heap non-empty:
//!                                                 │      pop best waiter, free -= 1, reply Permit
//!                                                 └─ else await next message
//! ```
//! The queue and the free-slot count are touched only by the loop; callers
//! never hold a lock while they wait for a grant.
//!
//! ## Invariants
//! - `free + outstanding permits == capacity`.
//! - A waiter is granted only while `free > 0`.
//! - A grant whose waiter has gone away is dropped, which returns the slot.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tokio::sync::{mpsc, oneshot};

use crate::error::WorkshopError;
use crate::state_machine::{Job, Priority};

/// Point-in-time view of a manager's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub capacity: usize,
    pub free: usize,
    pub waiting: usize,
    /// Total grants issued since construction.
    pub granted: u64,
}

enum Message {
    Request {
        priority: Priority,
        job_id: u32,
        reply: oneshot::Sender<Permit>,
    },
    Release,
    Snapshot(oneshot::Sender<Snapshot>),
}

struct Waiter {
    priority: Priority,
    job_id: u32,
    seq: u64,
    reply: oneshot::Sender<Permit>,
}

impl Waiter {
    fn key(&self) -> (Priority, u32, u64) {
        (self.priority, self.job_id, self.seq)
    }
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Handle to a bounded, priority-ordered resource.
///
/// Cloning the handle shares the same control loop.
#[derive(Clone, Debug)]
pub struct ResourceManager {
    name: &'static str,
    tx: mpsc::UnboundedSender<Message>,
}

impl ResourceManager {
    /// Creates the manager and spawns its control loop on the current runtime.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = ControlLoop {
            name,
            capacity,
            free: capacity,
            queue: BinaryHeap::new(),
            next_seq: 0,
            granted: 0,
            permits: tx.downgrade(),
        };
        tokio::spawn(control.run(rx));

        Self { name, tx }
    }

    /// Waits until one slot is granted to `job`.
    ///
    /// Only fails if the control loop is gone, which does not happen while
    /// this handle is alive.
    pub async fn acquire(&self, job: &Job) -> Result<Permit, WorkshopError> {
        let (reply, granted) = oneshot::channel();
        self.tx
            .send(Message::Request {
                priority: job.priority(),
                job_id: job.id,
                reply,
            })
            .map_err(|_| WorkshopError::ResourceClosed(self.name))?;

        granted
            .await
            .map_err(|_| WorkshopError::ResourceClosed(self.name))
    }

    /// Asks the control loop for its current accounting.
    pub async fn snapshot(&self) -> Result<Snapshot, WorkshopError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Snapshot(reply))
            .map_err(|_| WorkshopError::ResourceClosed(self.name))?;
        rx.await.map_err(|_| WorkshopError::ResourceClosed(self.name))
    }
}

/// One granted slot. Releasing (or dropping) it returns the slot exactly once.
#[derive(Debug)]
pub struct Permit {
    manager: &'static str,
    job_id: u32,
    tx: mpsc::UnboundedSender<Message>,
}

impl Permit {
    pub fn job_id(&self) -> u32 {
        self.job_id
    }

    /// Returns the slot to the manager.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        tracing::trace!(manager = self.manager, job = self.job_id, "releasing slot");
        // A closed channel means the manager is gone and nobody is left to wait.
        let _ = self.tx.send(Message::Release);
    }
}

struct ControlLoop {
    name: &'static str,
    capacity: usize,
    free: usize,
    queue: BinaryHeap<Reverse<Waiter>>,
    next_seq: u64,
    granted: u64,
    // Weak so that the loop ends once every handle and permit is gone.
    permits: mpsc::WeakUnboundedSender<Message>,
}

impl ControlLoop {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        loop {
            self.grant_available();

            let Some(message) = rx.recv().await else {
                break;
            };
            match message {
                Message::Request {
                    priority,
                    job_id,
                    reply,
                } => {
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    self.queue.push(Reverse(Waiter {
                        priority,
                        job_id,
                        seq,
                        reply,
                    }));
                }
                Message::Release => self.release(),
                Message::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }
        tracing::debug!(manager = self.name, "control loop stopped");
    }

    /// Grants as many waiters as there are free slots.
    ///
    /// Bounded by `capacity` iterations, so incoming messages are never starved.
    fn grant_available(&mut self) {
        while self.free > 0 {
            let Some(Reverse(waiter)) = self.queue.pop() else {
                return;
            };
            let Some(tx) = self.permits.upgrade() else {
                return;
            };

            self.free -= 1;
            self.granted += 1;
            tracing::debug!(
                manager = self.name,
                job = waiter.job_id,
                priority = %waiter.priority,
                free = self.free,
                waiting = self.queue.len(),
                "slot granted"
            );

            let permit = Permit {
                manager: self.name,
                job_id: waiter.job_id,
                tx,
            };
            if let Err(permit) = waiter.reply.send(permit) {
                // Waiter went away; dropping the permit queues its release.
                tracing::debug!(manager = self.name, job = waiter.job_id, "waiter gone");
                drop(permit);
            }
        }
    }

    fn release(&mut self) {
        if self.free == self.capacity {
            tracing::warn!(manager = self.name, "release without outstanding permit ignored");
            return;
        }
        self.free += 1;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            capacity: self.capacity,
            free: self.free,
            waiting: self.queue.len(),
            granted: self.granted,
        }
    }
}

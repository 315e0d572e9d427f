//! Two-lane cooperative job dispatcher
//!
//! Input-echo work runs on the immediate lane, result application on the
//! deferred lane. The loop drains the immediate lane first, so applying a
//! large result batch never delays a pending keystroke.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A unit of work submitted to the dispatcher
pub type Job = Box<dyn FnOnce() + Send>;

/// Scheduling class for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Input echo and listener forwarding
    Immediate,
    /// Result application
    Deferred,
}

/// Priority job queue backed by one tokio task
#[derive(Clone)]
pub struct Dispatcher {
    immediate: mpsc::UnboundedSender<Job>,
    deferred: mpsc::UnboundedSender<Job>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Dispatcher {
    /// Create a dispatcher and start its drain loop
    pub fn new() -> Self {
        let (immediate, mut immediate_rx) = mpsc::unbounded_channel::<Job>();
        let (deferred, mut deferred_rx) = mpsc::unbounded_channel::<Job>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    job = immediate_rx.recv() => match job {
                        Some(job) => job(),
                        None => break,
                    },
                    job = deferred_rx.recv() => match job {
                        Some(job) => job(),
                        None => break,
                    },
                }
            }
        });

        Self {
            immediate,
            deferred,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Submit a job on a lane.
    ///
    /// Returns false after shutdown; the job is dropped in that case.
    pub fn dispatch(&self, lane: Lane, job: impl FnOnce() + Send + 'static) -> bool {
        let sender = match lane {
            Lane::Immediate => &self.immediate,
            Lane::Deferred => &self.deferred,
        };
        sender.send(Box::new(job)).is_ok()
    }

    /// Stop the drain loop. Queued jobs are dropped; calling this more than
    /// once is a no-op.
    pub fn shutdown(&self) {
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Whether shutdown has been called
    pub fn is_shut_down(&self) -> bool {
        self.task.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

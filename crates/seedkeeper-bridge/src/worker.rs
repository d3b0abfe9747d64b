//! Fixed-size pool of dedicated threads running blocking backend calls.
//!
//! # Design
//! - Work is queued on an unbounded channel and pulled by `size` OS threads.
//! - Each submission resolves through a oneshot channel, so callers await instead of block.
//! - A panicking task drops its result sender; the caller observes `TaskDropped` and the
//!   thread keeps serving the queue.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};

use seedkeeper_torrent_core::{BridgeError, BridgeResult, DispatchFailure};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;
type JobQueue = Arc<Mutex<mpsc::UnboundedReceiver<Job>>>;

/// Bounded set of worker threads dedicated to one backend connection.
pub struct WorkerPool {
    label: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start `size` worker threads named after `label`.
    ///
    /// A `size` of zero is raised to one.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WorkerSpawn`] if the OS refuses to start a thread.
    pub fn new(label: impl Into<String>, size: usize) -> BridgeResult<Self> {
        let label = label.into();
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let queue: JobQueue = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size.max(1));
        for index in 0..size.max(1) {
            let queue = Arc::clone(&queue);
            let pool = label.clone();
            let handle = thread::Builder::new()
                .name(format!("{label}#{index}"))
                .spawn(move || run_worker(&pool, &queue))
                .map_err(|source| BridgeError::WorkerSpawn {
                    pool: label.clone(),
                    source,
                })?;
            workers.push(handle);
        }
        debug!(pool = %label, threads = workers.len(), "worker pool started");

        Ok(Self {
            label,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Label the pool was started with.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue `work` and return a future resolving with its output.
    ///
    /// The work is queued before this returns; dropping the returned future abandons the
    /// result but does not cancel the work.
    pub fn submit<F, T>(&self, operation: &'static str, work: F) -> Pending<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (respond_to, receiver) = oneshot::channel();
        let job: Job = Box::new(move || {
            let _ = respond_to.send(work());
        });

        let queued = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|sender| sender.send(job).is_ok());

        Pending {
            operation,
            receiver: queued.then_some(receiver),
        }
    }

    /// Stop accepting work. Queued work still drains before the threads exit.
    pub fn close(&self) {
        if self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!(pool = %self.label, "worker pool closed");
        }
    }

    /// Whether the pool still accepts work.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Close the pool and wait for every worker thread to finish.
    ///
    /// Blocks the calling thread until queued work has drained.
    pub fn shutdown(&self) {
        self.close();
        let workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in workers {
            if handle.join().is_err() {
                warn!(pool = %self.label, "worker thread exited abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(pool: &str, queue: &JobQueue) {
    loop {
        let job = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .blocking_recv();
        let Some(job) = job else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!(pool = %pool, "worker task panicked");
        }
    }
    debug!(pool = %pool, "worker thread exiting");
}

/// Result of a submitted task, resolved once a worker has run it.
#[must_use = "pending results do nothing unless awaited"]
pub struct Pending<T> {
    operation: &'static str,
    receiver: Option<oneshot::Receiver<T>>,
}

impl<T> Future for Pending<T> {
    type Output = BridgeResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let operation = this.operation;
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(Err(BridgeError::Dispatch {
                operation,
                reason: DispatchFailure::PoolClosed,
            }));
        };
        Pin::new(receiver).poll(cx).map(|outcome| {
            outcome.map_err(|_| BridgeError::Dispatch {
                operation,
                reason: DispatchFailure::TaskDropped,
            })
        })
    }
}

//! Fixed-size worker pool.
//!
//! Workers pull boxed jobs from one shared FIFO queue. Each submission returns a
//! [`TaskHandle`] that yields the job's result, or the panic message if the job
//! panicked. Shutdown stops accepting work, lets the workers drain the queue, and
//! joins them.

use crate::error::{PoolError, TaskError};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// State shared between the pool handle and its workers.
struct Shared {
    queue: Mutex<VecDeque<Job>>,
    available: Condvar,
    stop_flag: AtomicBool,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Job>> {
        // Jobs never run while the lock is held, so a poisoned queue is still consistent.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the result of a submitted job.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the job finished.
    pub fn join(self) -> Result<T, TaskError> {
        match self.receiver.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(TaskError::Abandoned),
        }
    }
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers. A size of zero is treated as one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            stop_flag: AtomicBool::new(false),
        });

        let workers = (0..size)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("skin-worker-{}", id))
                    .spawn(move || worker_loop(id, shared))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!("Failed to spawn worker thread: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!("Started worker pool with {} threads", workers.len());
        Self {
            shared,
            size: workers.len(),
            workers: Mutex::new(workers),
        }
    }

    /// Queue `job` for execution.
    pub fn submit<F, T>(&self, job: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            // The handle may have been dropped; nobody is waiting then.
            let _ = sender.send(result);
        });

        {
            let mut queue = self.shared.queue();
            // Checked under the lock so no job slips in after the workers drained.
            if self.size == 0 || self.shared.stop_flag.load(Ordering::Acquire) {
                return Err(PoolError::ShuttingDown);
            }
            queue.push_back(job);
        }
        self.shared.available.notify_one();
        Ok(TaskHandle { receiver })
    }

    /// Number of jobs waiting for a worker. Advisory only.
    pub fn pending_count(&self) -> usize {
        self.shared.queue().len()
    }

    pub fn worker_count(&self) -> usize {
        self.size
    }

    /// Stop accepting jobs, run everything already queued, and join the workers.
    ///
    /// Calling it more than once is a no-op.
    pub fn shutdown(&self) {
        {
            let _queue = self.shared.queue();
            self.shared.stop_flag.store(true, Ordering::Release);
        }
        self.shared.available.notify_all();

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if workers.is_empty() {
            return;
        }

        for handle in workers {
            if handle.join().is_err() {
                tracing::warn!("Worker thread panicked outside of a job");
            }
        }
        debug!("Worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("pending", &self.pending_count())
            .field("stopping", &self.shared.stop_flag.load(Ordering::Relaxed))
            .finish()
    }
}

/// Number of hardware threads, or one when it cannot be determined.
pub fn available_parallelism() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn worker_loop(id: usize, shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if shared.stop_flag.load(Ordering::Acquire) {
                    break None;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        match job {
            Some(job) => {
                trace!("Worker {} picked up a job", id);
                job();
            }
            None => break,
        }
    }
    trace!("Worker {} exiting", id);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

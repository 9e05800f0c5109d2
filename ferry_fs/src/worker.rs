//! Cancellable, progress-tracked background work.
//!
//! A worker moves from running to completed, possibly passing through
//! cancelling when the owner asks it to stop. The running thread is the only
//! writer of everything except the cancel flag; the owner reads progress at
//! any time through a [`WorkerHandle`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use tracing::{debug, debug_span, error};

use crate::listener::WorkerListener;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(1);

/// Allocate an id unique within this process
pub fn next_worker_id() -> usize {
    NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed)
}

/// State shared between a worker thread and its owner.
#[derive(Debug, Default)]
pub struct WorkerState {
    completed: AtomicBool,
    cancelling: AtomicBool,
    job_size: AtomicU64,
    job_progress: AtomicU64,
    /// Held only while checking or announcing completion.
    done_lock: Mutex<()>,
    done: Condvar,
    thread: OnceLock<ThreadId>,
}

impl WorkerState {
    pub fn new(job_size: u64) -> Self {
        Self {
            job_size: AtomicU64::new(job_size),
            ..Self::default()
        }
    }

    pub fn finished_job(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Mark the job complete and wake any thread blocked in [`cancel`](Self::cancel).
    pub fn set_completed(&self) {
        self.completed.store(true, Ordering::Release);
        let _guard = self.done_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.done.notify_all();
    }

    pub fn cancelling(&self) -> bool {
        self.cancelling.load(Ordering::Acquire)
    }

    pub fn size_job(&self) -> u64 {
        self.job_size.load(Ordering::Acquire)
    }

    pub fn set_size_job(&self, size: u64) {
        self.job_size.store(size, Ordering::Release);
        self.job_progress.fetch_min(size, Ordering::AcqRel);
    }

    pub fn progress_made(&self) -> u64 {
        self.job_progress.load(Ordering::Acquire)
    }

    /// Add `amount` to the progress, saturating at the job size.
    pub fn increment_progress(&self, amount: u64) {
        let size = self.size_job();
        // The closure always returns Some, so the update cannot fail.
        let _ = self
            .job_progress
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |made| {
                Some(made.saturating_add(amount).min(size).max(made))
            });
    }

    /// Record the current thread as the one running the job.
    pub(crate) fn attach_current_thread(&self) {
        let _ = self.thread.set(thread::current().id());
    }

    /// Ask the job to stop and block until it has.
    ///
    /// Returns `false` without waiting when called from the thread running
    /// the job, which could never observe its own completion.
    pub fn cancel(&self) -> bool {
        if self.thread.get() == Some(&thread::current().id()) && !self.finished_job() {
            error!("cancel requested from the worker's own thread; ignoring");
            return false;
        }
        self.cancelling.store(true, Ordering::Release);

        let mut guard = self.done_lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.finished_job() {
            guard = self.done.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
        true
    }
}

/// Direction of a file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Loading,
    Storing,
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Loading => write!(f, "load"),
            WorkerKind::Storing => write!(f, "store"),
        }
    }
}

/// Owner-side view of a worker.
///
/// Cheap to clone; every clone observes the same shared state.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: usize,
    path: Arc<Path>,
    kind: WorkerKind,
    visible_progress: bool,
    state: Arc<WorkerState>,
}

impl WorkerHandle {
    pub fn new(kind: WorkerKind, path: &Path, job_size: u64, visible_progress: bool) -> Self {
        Self {
            id: next_worker_id(),
            path: Arc::from(path),
            kind,
            visible_progress,
            state: Arc::new(WorkerState::new(job_size)),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_buf(&self) -> PathBuf {
        self.path.to_path_buf()
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn is_loading(&self) -> bool {
        self.kind == WorkerKind::Loading
    }

    /// Whether the user should see this transfer; silent saves return `false`
    pub fn visible_progress(&self) -> bool {
        self.visible_progress
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    pub fn finished_job(&self) -> bool {
        self.state.finished_job()
    }

    pub fn size_job(&self) -> u64 {
        self.state.size_job()
    }

    pub fn progress_made(&self) -> u64 {
        self.state.progress_made()
    }

    /// See [`WorkerState::cancel`]
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }
}

/// A unit of background work reporting to a listener.
pub trait Worker<D>: Send + 'static {
    fn handle(&self) -> WorkerHandle;

    /// `true` for a load, `false` for a store
    fn is_loading(&self) -> bool;

    /// Run the job to completion on the current thread.
    ///
    /// Posts exactly one completion event to `listener`.
    fn execute(self, listener: &dyn WorkerListener<D>)
    where
        Self: Sized;
}

/// Run `worker` on a new detached thread and return its handle.
///
/// The thread is never joined; the owner learns of completion through
/// `listener` or by polling the handle.
pub fn perform_on_new_thread<D, T, L>(worker: T, listener: L) -> io::Result<WorkerHandle>
where
    D: 'static,
    T: Worker<D>,
    L: WorkerListener<D> + 'static,
{
    let handle = worker.handle();
    let name = format!("ferry-{}-{}", handle.kind(), handle.id());
    let id = handle.id();
    let loading = worker.is_loading();

    thread::Builder::new().name(name).spawn(move || {
        let span = debug_span!("worker", id, loading);
        let _enter = span.enter();
        worker.execute(&listener);
        debug!("worker thread exiting");
    })?;
    Ok(handle)
}

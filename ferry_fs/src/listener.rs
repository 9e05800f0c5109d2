//! Events sent from workers back to the thread that owns them.

use std::fmt;
use std::sync::mpsc::Sender;

use tracing::debug;

use crate::file::load::LoadCompletion;
use crate::file::save::StoreCompletion;

/// Kind of a [`WorkerEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    FileRead,
    FileWritten,
    FileProgress,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::FileRead => write!(f, "file read"),
            EventKind::FileWritten => write!(f, "file written"),
            EventKind::FileProgress => write!(f, "file progress"),
        }
    }
}

/// Message from a worker to its owner.
///
/// Completion events move the worker's results (the document builder for
/// loads) to the receiving thread. For any one worker, no progress event
/// follows its completion event.
#[derive(Debug)]
pub enum WorkerEvent<D> {
    FileProgress { id: usize, progress: u64, size: u64 },
    FileRead(LoadCompletion<D>),
    FileWritten(StoreCompletion),
}

impl<D> WorkerEvent<D> {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::FileProgress { .. } => EventKind::FileProgress,
            WorkerEvent::FileRead(_) => EventKind::FileRead,
            WorkerEvent::FileWritten(_) => EventKind::FileWritten,
        }
    }

    /// Id of the worker that sent the event
    pub fn worker_id(&self) -> usize {
        match self {
            WorkerEvent::FileProgress { id, .. } => *id,
            WorkerEvent::FileRead(done) => done.id,
            WorkerEvent::FileWritten(done) => done.id,
        }
    }

    pub fn is_completion(&self) -> bool {
        !matches!(self, WorkerEvent::FileProgress { .. })
    }
}

/// Receiver of worker events.
pub trait WorkerListener<D>: Send {
    fn post_on_owning_thread(&self, event: WorkerEvent<D>);
}

impl<D: Send> WorkerListener<D> for Sender<WorkerEvent<D>> {
    fn post_on_owning_thread(&self, event: WorkerEvent<D>) {
        let kind = event.kind();
        if self.send(event).is_err() {
            debug!(%kind, "owner stopped listening, event dropped");
        }
    }
}

/// Discards every event; used when a transfer runs on the calling thread.
impl<D> WorkerListener<D> for () {
    fn post_on_owning_thread(&self, _event: WorkerEvent<D>) {}
}

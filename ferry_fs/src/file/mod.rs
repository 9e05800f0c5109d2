//! Workers that stream files into and out of documents.
//!
//! This module provides:
//! - `load` for reading a file block by block into a document builder
//! - `save` for writing document bytes block by block in a chosen encoding
//! - the pacing shared by both: progress accounting, rate-limited progress
//!   events and an optional sleep between blocks

pub mod load;
pub mod save;

pub use load::{FileLoader, LoadCompletion, load_file};
pub use save::{FileStorer, StoreCompletion, save_file};

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use ferry_config::TransferSettings;

use crate::listener::{WorkerEvent, WorkerListener};
use crate::worker::{WorkerHandle, WorkerKind, WorkerState};

/// Destination of a store.
///
/// Closing is explicit so that a failure to flush or sync can be reported
/// instead of being lost in `Drop`.
pub trait StoreTarget: Write + Send + 'static {
    fn close(self) -> io::Result<()>;
}

impl StoreTarget for File {
    fn close(mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl StoreTarget for BufWriter<File> {
    fn close(self) -> io::Result<()> {
        self.into_inner().map_err(|err| err.into_error())?.close()
    }
}

impl StoreTarget for Vec<u8> {
    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

/// Part of a loader or storer that paces the transfer.
#[derive(Debug)]
pub(crate) struct FileWorker {
    handle: WorkerHandle,
    start: Instant,
    throttle: Duration,
    progress_interval: Option<Duration>,
    next_progress: Instant,
}

impl FileWorker {
    pub(crate) fn new(
        kind: WorkerKind,
        path: &Path,
        size: u64,
        visible_progress: bool,
        settings: &TransferSettings,
    ) -> Self {
        let start = Instant::now();
        Self {
            handle: WorkerHandle::new(kind, path, size, visible_progress),
            start,
            throttle: settings.throttle(),
            progress_interval: settings.progress_interval(),
            next_progress: start,
        }
    }

    pub(crate) fn handle(&self) -> &WorkerHandle {
        &self.handle
    }

    pub(crate) fn state(&self) -> &WorkerState {
        self.handle.state()
    }

    /// Bind to the running thread and restart the clock.
    pub(crate) fn begin(&mut self) {
        self.state().attach_current_thread();
        self.start = Instant::now();
        if let Some(interval) = self.progress_interval {
            self.next_progress = self.start + interval;
        }
    }

    pub(crate) fn cancelling(&self) -> bool {
        self.state().cancelling()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Count `amount` units as done and post a progress event when due.
    pub(crate) fn advance<D>(&mut self, amount: usize, listener: &dyn WorkerListener<D>) {
        let state = self.handle.state();
        state.increment_progress(amount as u64);

        let Some(interval) = self.progress_interval else {
            return;
        };
        let now = Instant::now();
        if now > self.next_progress {
            self.next_progress = now + interval;
            listener.post_on_owning_thread(WorkerEvent::FileProgress {
                id: self.handle.id(),
                progress: state.progress_made(),
                size: state.size_job(),
            });
        }
    }

    /// Sleep between blocks when throttled
    pub(crate) fn pause(&self) {
        if !self.throttle.is_zero() {
            thread::sleep(self.throttle);
        }
    }
}

/// Read until `block` is full or the source is exhausted.
pub(crate) fn fill_block<R: Read>(source: &mut R, block: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < block.len() {
        match source.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    /// Hands out at most three bytes per call
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3).min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_fill_block_gathers_short_reads() {
        let mut source = Trickle(b"0123456789");
        let mut block = [0u8; 8];
        assert_eq!(fill_block(&mut source, &mut block).unwrap(), 8);
        assert_eq!(&block, b"01234567");
        assert_eq!(fill_block(&mut source, &mut block).unwrap(), 2);
        assert_eq!(fill_block(&mut source, &mut block).unwrap(), 0);
    }

    #[test]
    fn test_progress_events_disabled_with_zero_interval() {
        let settings = TransferSettings {
            progress_interval_ms: 0,
            ..TransferSettings::default()
        };
        let mut worker = FileWorker::new(WorkerKind::Loading, Path::new("x"), 10, true, &settings);
        worker.begin();
        let (tx, rx) = mpsc::channel::<WorkerEvent<()>>();
        worker.advance::<()>(4, &tx);
        worker.advance::<()>(40, &tx);
        assert_eq!(worker.state().progress_made(), 10);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_progress_event_after_interval() {
        let settings = TransferSettings {
            progress_interval_ms: 1,
            ..TransferSettings::default()
        };
        let mut worker = FileWorker::new(WorkerKind::Storing, Path::new("x"), 10, true, &settings);
        worker.begin();
        let (tx, rx) = mpsc::channel::<WorkerEvent<()>>();
        thread::sleep(Duration::from_millis(5));
        worker.advance::<()>(6, &tx);
        worker.advance::<()>(1, &tx);

        let event = rx.try_recv().unwrap();
        assert!(matches!(event, WorkerEvent::FileProgress { progress: 6, size: 10, .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_vec_target_closes() {
        let mut target = Vec::new();
        target.write_all(b"abc").unwrap();
        assert!(StoreTarget::close(target).is_ok());
    }
}

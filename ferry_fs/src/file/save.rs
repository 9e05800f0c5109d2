//! Block-wise storing of document bytes in a chosen encoding.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use ferry_config::TransferSettings;
use tracing::{debug, trace, warn};

use super::{FileWorker, StoreTarget};
use crate::encoding::UnicodeMode;
use crate::encoding::utf8::realign_block;
use crate::error::{Completion, TransferError, TransferResult};
use crate::listener::{WorkerEvent, WorkerListener};
use crate::transcode::Writer;
use crate::worker::{Worker, WorkerHandle, WorkerKind};

/// Outcome of a store
#[derive(Debug)]
pub struct StoreCompletion {
    pub id: usize,
    pub path: PathBuf,
    pub status: Completion,
    pub unicode_mode: UnicodeMode,
    pub visible_progress: bool,
    /// Document bytes handed to the encoder
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Writes a document to a target.
///
/// The document is shared, immutable [`Bytes`]; the owner may keep its own
/// handle to the same buffer while the store runs.
pub struct FileStorer<W = BufWriter<File>> {
    worker: FileWorker,
    document: Bytes,
    unicode_mode: UnicodeMode,
    target: W,
    block_size: usize,
}

impl FileStorer<BufWriter<File>> {
    /// Create (or truncate) `path` for storing.
    ///
    /// A failure to create the file is returned here, before any worker exists.
    pub fn create(
        path: &Path,
        document: Bytes,
        unicode_mode: UnicodeMode,
        visible_progress: bool,
        settings: &TransferSettings,
    ) -> TransferResult<Self> {
        let file = File::create(path).map_err(|source| TransferError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let target = BufWriter::with_capacity(settings.block_size * 2 + 4, file);
        Ok(Self::with_target(
            path,
            target,
            document,
            unicode_mode,
            visible_progress,
            settings,
        ))
    }
}

impl<W: StoreTarget> FileStorer<W> {
    pub fn with_target(
        path: &Path,
        target: W,
        document: Bytes,
        unicode_mode: UnicodeMode,
        visible_progress: bool,
        settings: &TransferSettings,
    ) -> Self {
        let size = document.len() as u64;
        Self {
            worker: FileWorker::new(WorkerKind::Storing, path, size, visible_progress, settings),
            document,
            unicode_mode,
            target,
            block_size: settings.block_size.max(ferry_config::MIN_BLOCK_SIZE),
        }
    }

    pub fn handle(&self) -> WorkerHandle {
        self.worker.handle().clone()
    }

    /// Run the whole store on the current thread and close the target.
    pub fn run<D>(mut self, listener: &dyn WorkerListener<D>) -> StoreCompletion {
        self.worker.begin();
        debug!(
            path = %self.worker.handle().path().display(),
            size = self.document.len(),
            mode = %self.unicode_mode,
            "store started"
        );

        let Self {
            mut worker,
            document,
            unicode_mode,
            target,
            block_size,
        } = self;
        let mut writer = Writer::new(target, unicode_mode);
        let mut bytes_written = 0;
        let mut status = write_blocks(
            &mut worker,
            &document,
            &mut writer,
            block_size,
            &mut bytes_written,
            listener,
        );

        if let Err(err) = writer.close() {
            warn!(error = %err, "closing target failed");
            if !matches!(status, Completion::Failed(_)) {
                status = Completion::Failed(TransferError::Close(err));
            }
        }

        let elapsed = worker.elapsed();
        debug!(
            path = %worker.handle().path().display(),
            %status,
            bytes_written,
            ?elapsed,
            "store ended"
        );
        worker.state().set_completed();

        StoreCompletion {
            id: worker.handle().id(),
            path: worker.handle().path_buf(),
            status,
            unicode_mode,
            visible_progress: worker.handle().visible_progress(),
            bytes_written,
            elapsed,
        }
    }
}

/// Feed `document` to `writer` in blocks that never split a UTF-8 character.
fn write_blocks<W: StoreTarget, D>(
    worker: &mut FileWorker,
    document: &[u8],
    writer: &mut Writer<W>,
    block_size: usize,
    bytes_written: &mut u64,
    listener: &dyn WorkerListener<D>,
) -> Completion {
    let mut start = 0;
    while start < document.len() {
        if worker.cancelling() {
            return Completion::Cancelled;
        }
        let grab = block_size.min(document.len() - start);
        let grab = realign_block(document, start, grab);
        let block = &document[start..start + grab];

        match writer.emit(block) {
            Ok(written) if written == grab => {}
            Ok(written) => {
                warn!(expected = grab, written, "short write");
                return Completion::Failed(TransferError::ShortWrite { expected: grab, written });
            }
            Err(err) if err.kind() == io::ErrorKind::WriteZero => {
                warn!(expected = grab, "target accepted no data");
                return Completion::Failed(TransferError::ShortWrite { expected: grab, written: 0 });
            }
            Err(err) => {
                warn!(error = %err, "write failed");
                return Completion::Failed(TransferError::Write(err));
            }
        }
        trace!(offset = start, len = grab, "block written");

        start += grab;
        *bytes_written += grab as u64;
        worker.advance(grab, listener);
        worker.pause();
    }
    Completion::Finished
}

impl<D, W: StoreTarget> Worker<D> for FileStorer<W> {
    fn handle(&self) -> WorkerHandle {
        FileStorer::handle(self)
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn execute(self, listener: &dyn WorkerListener<D>) {
        let completion = self.run(listener);
        listener.post_on_owning_thread(WorkerEvent::FileWritten(completion));
    }
}

/// Store `document` to `path` on the calling thread.
pub fn save_file(
    path: &Path,
    document: Bytes,
    unicode_mode: UnicodeMode,
    settings: &TransferSettings,
) -> TransferResult<StoreCompletion> {
    let storer = FileStorer::create(path, document, unicode_mode, false, settings)?;
    Ok(storer.run::<()>(&()))
}

//! Block-wise file loading with BOM and coding cookie detection.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ferry_config::TransferSettings;
use tracing::{debug, trace, warn};

use super::{FileWorker, fill_block};
use crate::cookie::coding_cookie_value;
use crate::document::DocumentBuilder;
use crate::encoding::UnicodeMode;
use crate::error::{Completion, TransferError, TransferResult};
use crate::listener::{WorkerEvent, WorkerListener};
use crate::transcode::Reader;
use crate::worker::{Worker, WorkerHandle, WorkerKind};

/// Outcome of a load, handed to the owning thread with the builder.
#[derive(Debug)]
pub struct LoadCompletion<D> {
    pub id: usize,
    pub path: PathBuf,
    pub status: Completion,
    /// Encoding found in the file; meaningful even when cancelled
    pub unicode_mode: UnicodeMode,
    pub builder: D,
    /// Raw bytes read from disk, before decoding
    pub bytes_read: u64,
    pub blocks: usize,
    pub elapsed: Duration,
}

impl<D: DocumentBuilder> LoadCompletion<D> {
    /// The finished document, or the reason there is none.
    ///
    /// A failed or cancelled load releases its builder.
    pub fn into_document(self) -> Result<D::Document, Completion> {
        match self.status {
            Completion::Finished => Ok(self.builder.into_document()),
            status => {
                self.builder.release();
                Err(status)
            }
        }
    }
}

/// Reads a file into a document builder.
pub struct FileLoader<D, R = File> {
    worker: FileWorker,
    source: R,
    builder: D,
    block_size: usize,
    bytes_read: u64,
    blocks: usize,
}

impl<D: DocumentBuilder> FileLoader<D, File> {
    /// Open `path` for loading.
    ///
    /// An open failure is returned here, before any worker exists.
    pub fn open(path: &Path, builder: D, settings: &TransferSettings) -> TransferResult<Self> {
        let file = File::open(path).map_err(|source| TransferError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let size = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        Ok(Self::from_reader(path, file, size, builder, settings))
    }
}

impl<D: DocumentBuilder, R: Read + Send + 'static> FileLoader<D, R> {
    /// Load from an already opened source of `size` bytes.
    pub fn from_reader(
        path: &Path,
        source: R,
        size: u64,
        builder: D,
        settings: &TransferSettings,
    ) -> Self {
        Self {
            worker: FileWorker::new(WorkerKind::Loading, path, size, true, settings),
            source,
            builder,
            block_size: settings.block_size.max(ferry_config::MIN_BLOCK_SIZE),
            bytes_read: 0,
            blocks: 0,
        }
    }

    pub fn handle(&self) -> WorkerHandle {
        self.worker.handle().clone()
    }

    /// Run the whole load on the current thread.
    ///
    /// Progress events go to `listener`; the completion is returned rather
    /// than posted. The job is marked completed before returning.
    pub fn run(mut self, listener: &dyn WorkerListener<D>) -> LoadCompletion<D> {
        self.worker.begin();
        debug!(
            path = %self.worker.handle().path().display(),
            size = self.worker.state().size_job(),
            block_size = self.block_size,
            "load started"
        );

        let mut reader = Reader::new();
        let mut cookie_mode = UnicodeMode::Binary8Bit;
        let status = self.read_blocks(&mut reader, &mut cookie_mode, listener);
        // Decided by the first block, whatever became of it
        let unicode_mode = reader.encoding().map_or(cookie_mode, UnicodeMode::from);
        let elapsed = self.worker.elapsed();
        let Self {
            worker,
            source,
            builder,
            bytes_read,
            blocks,
            ..
        } = self;
        drop(source);

        debug!(
            path = %worker.handle().path().display(),
            %status,
            mode = %unicode_mode,
            bytes_read,
            blocks,
            ?elapsed,
            "load ended"
        );
        worker.state().set_completed();

        LoadCompletion {
            id: worker.handle().id(),
            path: worker.handle().path_buf(),
            status,
            unicode_mode,
            builder,
            bytes_read,
            blocks,
            elapsed,
        }
    }

    fn read_blocks(
        &mut self,
        reader: &mut Reader,
        cookie_mode: &mut UnicodeMode,
        listener: &dyn WorkerListener<D>,
    ) -> Completion {
        let mut block = vec![0u8; self.block_size];

        loop {
            if self.worker.cancelling() {
                return Completion::Cancelled;
            }
            let len = match fill_block(&mut self.source, &mut block) {
                Ok(0) => break,
                Ok(len) => len,
                Err(err) => {
                    warn!(error = %err, "read failed");
                    return Completion::Failed(TransferError::Read(err));
                }
            };
            let data = &block[..len];
            if self.blocks == 0 {
                *cookie_mode = coding_cookie_value(data);
            }
            self.blocks += 1;
            self.bytes_read += len as u64;

            let decoded = reader.convert(data);
            trace!(block = self.blocks, raw = len, decoded = decoded.len(), "block read");
            if let Err(err) = self.builder.add_data(decoded) {
                warn!(error = %err, "document builder rejected block");
                return Completion::Failed(err.into());
            }

            self.worker.advance(len, listener);
            self.worker.pause();
        }

        let tail = reader.convert(&[]);
        if let Err(err) = self.builder.add_data(tail) {
            warn!(error = %err, "document builder rejected final block");
            return Completion::Failed(err.into());
        }
        Completion::Finished
    }
}

impl<D: DocumentBuilder, R: Read + Send + 'static> Worker<D> for FileLoader<D, R> {
    fn handle(&self) -> WorkerHandle {
        FileLoader::handle(self)
    }

    fn is_loading(&self) -> bool {
        true
    }

    fn execute(self, listener: &dyn WorkerListener<D>) {
        let completion = self.run(listener);
        listener.post_on_owning_thread(WorkerEvent::FileRead(completion));
    }
}

/// Load `path` on the calling thread.
///
/// Used for files small enough that a worker thread is not worth it.
pub fn load_file<D: DocumentBuilder>(
    path: &Path,
    builder: D,
    settings: &TransferSettings,
) -> TransferResult<LoadCompletion<D>> {
    Ok(FileLoader::open(path, builder, settings)?.run(&()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextBuilder;
    use crate::error::DocumentError;
    use std::io::{self, Cursor};
    use tempfile::NamedTempFile;

    fn settings(block_size: usize) -> TransferSettings {
        TransferSettings {
            block_size,
            progress_interval_ms: 0,
            ..TransferSettings::default()
        }
    }

    fn loader_for(bytes: &[u8], block_size: usize) -> FileLoader<TextBuilder, Cursor<Vec<u8>>> {
        FileLoader::from_reader(
            Path::new("mem.txt"),
            Cursor::new(bytes.to_vec()),
            bytes.len() as u64,
            TextBuilder::new(),
            &settings(block_size),
        )
    }

    fn load_bytes(bytes: &[u8], block_size: usize) -> LoadCompletion<TextBuilder> {
        loader_for(bytes, block_size).run(&())
    }

    #[test]
    fn test_load_plain_text() {
        let done = load_bytes(b"just some text\n", 8);
        assert!(done.status.is_finished());
        assert_eq!(done.unicode_mode, UnicodeMode::Binary8Bit);
        assert_eq!(done.blocks, 2);
        assert_eq!(done.bytes_read, 15);
        assert_eq!(done.into_document().unwrap().text(), "just some text\n");
    }

    #[test]
    fn test_cookie_used_without_bom() {
        let done = load_bytes(b"#!/usr/bin/env python\n# coding: utf-8\nprint()\n", 64);
        assert_eq!(done.unicode_mode, UnicodeMode::Utf8CookieDeclared);
    }

    #[test]
    fn test_bom_wins_over_cookie() {
        let done = load_bytes(b"\xEF\xBB\xBF# coding: latin-1\n", 64);
        assert_eq!(done.unicode_mode, UnicodeMode::Utf8WithBom);
        assert_eq!(done.into_document().unwrap().text(), "# coding: latin-1\n");
    }

    #[test]
    fn test_utf16_split_across_small_blocks() {
        let text = "a😀b€";
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        // Blocks of 9 split both a code unit and the surrogate pair
        let done = load_bytes(&bytes, 9);
        assert_eq!(done.unicode_mode, UnicodeMode::Utf16BigEndian);
        assert_eq!(done.into_document().unwrap().text(), text);
    }

    #[test]
    fn test_builder_rejection_fails_load() {
        let loader = FileLoader::from_reader(
            Path::new("mem.txt"),
            Cursor::new(vec![b'x'; 64]),
            64,
            TextBuilder::new().with_limit(20),
            &settings(16),
        );
        let handle = loader.handle();
        let done = loader.run(&());
        assert!(matches!(
            done.status,
            Completion::Failed(TransferError::Document(DocumentError::OUT_OF_MEMORY))
        ));
        assert_eq!(done.blocks, 2);
        assert!(handle.finished_job());
        assert!(done.into_document().is_err());
    }

    #[test]
    fn test_mode_reported_when_first_block_rejected() {
        let loader = FileLoader::from_reader(
            Path::new("mem.txt"),
            Cursor::new(b"\xFF\xFEh\x00i\x00".to_vec()),
            6,
            TextBuilder::new().with_limit(1),
            &settings(64),
        );
        let done = loader.run(&());
        assert!(matches!(
            done.status,
            Completion::Failed(TransferError::Document(DocumentError::OUT_OF_MEMORY))
        ));
        assert_eq!(done.blocks, 1);
        assert_eq!(done.unicode_mode, UnicodeMode::Utf16LittleEndian);

        let loader = FileLoader::from_reader(
            Path::new("mem.py"),
            Cursor::new(b"# coding: utf-8\nprint()\n".to_vec()),
            24,
            TextBuilder::new().with_limit(1),
            &settings(64),
        );
        let done = loader.run(&());
        assert!(done.status.error().is_some());
        assert_eq!(done.unicode_mode, UnicodeMode::Utf8CookieDeclared);
    }

    #[test]
    fn test_loader_reports_loading() {
        let loader = loader_for(b"x", 8);
        assert!(Worker::<TextBuilder>::is_loading(&loader));
        assert!(loader.handle().is_loading());
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    #[test]
    fn test_read_error_fails_load() {
        let loader = FileLoader::from_reader(Path::new("dev"), Broken, 10, TextBuilder::new(), &settings(8));
        let done = loader.run(&());
        assert!(matches!(done.status, Completion::Failed(TransferError::Read(_))));
    }

    #[test]
    fn test_open_failure_is_immediate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let result = FileLoader::open(&missing, TextBuilder::new(), &settings(8));
        assert!(matches!(result, Err(TransferError::Open { path, .. }) if path == missing));
    }

    #[test]
    fn test_load_file_from_disk() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"\xFF\xFEh\x00i\x00").unwrap();
        let done = load_file(file.path(), TextBuilder::new(), &settings(1024)).unwrap();
        assert_eq!(done.unicode_mode, UnicodeMode::Utf16LittleEndian);
        assert_eq!(done.path, file.path());
        assert_eq!(done.into_document().unwrap().text(), "hi");
    }
}

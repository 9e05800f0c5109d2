//! # ferry_fs - background file transfer for ferry
//!
//! Loads and stores files on worker threads, converting between the on-disk
//! encoding and UTF-8 block by block.
//!
//! Modules:
//! - `cookie` for `coding: utf-8` declarations in the first two lines
//! - `bom` and `encoding` for byte order marks and the modes they select
//! - `transcode` for the block-wise reader and writer
//! - `worker` and `listener` for cancellable jobs and their events
//! - `file` for the loader and storer workers
//! - `activity` for summarising what is still running

pub mod activity;
pub mod bom;
pub mod cookie;
pub mod document;
pub mod encoding;
pub mod error;
pub mod file;
pub mod listener;
pub mod transcode;
pub mod worker;

pub use activity::{BackgroundActivities, count_background_activities, saving_in_background};
pub use bom::ByteOrderMark;
pub use cookie::{coding_cookie_value, extract_line};
pub use document::{DocumentBuilder, TextBuilder, TextDocument};
pub use encoding::UnicodeMode;
pub use error::{Completion, DocumentError, TransferError, TransferResult};
pub use file::{
    FileLoader, FileStorer, LoadCompletion, StoreCompletion, StoreTarget, load_file, save_file,
};
pub use listener::{EventKind, WorkerEvent, WorkerListener};
pub use transcode::{Reader, Writer};
pub use worker::{Worker, WorkerHandle, WorkerKind, WorkerState, perform_on_new_thread};

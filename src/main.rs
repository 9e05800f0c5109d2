use std::env;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use ferry_config::TransferSettings;
use ferry_fs::{
    FileLoader, FileStorer, LoadCompletion, StoreCompletion, TextBuilder, TextDocument,
    UnicodeMode, WorkerEvent, load_file, perform_on_new_thread, save_file,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: ferry <file> [--save <path>] [--mode <8bit|utf16be|utf16le|utf8bom|utf8>] [--config <path>]";

#[derive(Debug, Default)]
struct Args {
    input: PathBuf,
    save: Option<PathBuf>,
    mode: Option<UnicodeMode>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut parsed = Args::default();
    let mut input = None;

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| format!("{} needs a value", flag));
        match arg.as_str() {
            "--save" => parsed.save = Some(PathBuf::from(value("--save")?)),
            "--mode" => parsed.mode = Some(value("--mode")?.parse()?),
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if input.is_none() => input = Some(PathBuf::from(&arg)),
            _ => return Err(format!("unexpected argument `{}`\n{}", arg, USAGE)),
        }
    }
    parsed.input = input.ok_or_else(|| USAGE.to_string())?;
    Ok(parsed)
}

fn load(
    path: &Path,
    settings: &TransferSettings,
) -> Result<LoadCompletion<TextBuilder>, Box<dyn std::error::Error>> {
    let size = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    let capacity = usize::try_from(size).unwrap_or(0);
    if !settings.load_in_background(size) {
        return Ok(load_file(path, TextBuilder::with_capacity(capacity), settings)?);
    }

    let loader = FileLoader::open(path, TextBuilder::with_capacity(capacity), settings)?;
    let (tx, rx) = mpsc::channel();
    perform_on_new_thread(loader, tx)?;
    for event in rx {
        match event {
            WorkerEvent::FileProgress { progress, size, .. } => {
                info!("loading {}: {}/{} bytes", path.display(), progress, size);
            }
            WorkerEvent::FileRead(done) => return Ok(done),
            WorkerEvent::FileWritten(_) => {}
        }
    }
    Err("loader stopped without reporting".into())
}

fn store(
    path: &Path,
    document: &TextDocument,
    mode: UnicodeMode,
    settings: &TransferSettings,
) -> Result<StoreCompletion, Box<dyn std::error::Error>> {
    if !settings.save_in_background(document.len() as u64) {
        return Ok(save_file(path, document.to_bytes(), mode, settings)?);
    }

    let storer = FileStorer::create(
        path,
        document.to_bytes(),
        mode,
        settings.visible_progress,
        settings,
    )?;
    let (tx, rx) = mpsc::channel::<WorkerEvent<()>>();
    perform_on_new_thread(storer, tx)?;
    for event in rx {
        match event {
            WorkerEvent::FileProgress { progress, size, .. } => {
                if settings.visible_progress {
                    info!("saving {}: {}/{} bytes", path.display(), progress, size);
                }
            }
            WorkerEvent::FileWritten(done) => return Ok(done),
            WorkerEvent::FileRead(_) => {}
        }
    }
    Err("storer stopped without reporting".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    let settings = match &args.config {
        Some(path) => TransferSettings::from_file(path)?,
        None => TransferSettings::default(),
    };

    let loaded = load(&args.input, &settings)?;
    let mode = loaded.unicode_mode;
    info!(
        "read {} ({}, {} bytes in {} blocks, {:?})",
        loaded.path.display(),
        mode,
        loaded.bytes_read,
        loaded.blocks,
        loaded.elapsed
    );
    let document = match loaded.into_document() {
        Ok(document) => document,
        Err(status) => {
            eprintln!("Failed to load '{}': {}", args.input.display(), status);
            std::process::exit(1);
        }
    };
    println!("{}: {} bytes of text, {}", args.input.display(), document.len(), mode);

    if let Some(out) = &args.save {
        let target_mode = args.mode.unwrap_or(mode);
        let stored = store(out, &document, target_mode, &settings)?;
        if let Some(err) = stored.status.error() {
            eprintln!("Could not save '{}': {}", out.display(), err);
            std::process::exit(1);
        }
        println!("Saved {} as {} in {:?}", out.display(), target_mode, stored.elapsed);
    }

    Ok(())
}

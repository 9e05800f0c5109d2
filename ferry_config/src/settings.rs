use crate::error::{ConfigError, ConfigResult};
use crate::parser::{SettingValue, SettingsParser};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Base size of file I/O operations.
pub const BLOCK_SIZE: usize = 128 * 1024;

/// Default spacing between progress reports.
pub const PROGRESS_INTERVAL_MS: u64 = 400;

/// Smallest block a worker may be configured with. A block must hold at
/// least one UTF-16 surrogate pair plus the realignment window.
pub const MIN_BLOCK_SIZE: usize = 8;

const KNOWN_KEYS: &[&str] = &[
    "transfer.block_size",
    "transfer.asynchronous_sleep_ms",
    "transfer.progress_interval_ms",
    "transfer.background_open_size",
    "transfer.background_save_size",
    "transfer.visible_progress",
];

/// Tuning for background file loads and stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    /// Bytes read from or written to disk per iteration
    pub block_size: usize,
    /// Sleep between blocks, used to simulate slow I/O
    pub asynchronous_sleep_ms: u64,
    /// Minimum wall time between progress reports; 0 turns them off
    pub progress_interval_ms: u64,
    /// Files larger than this are loaded on a worker thread (-1: always)
    pub background_open_size: i64,
    /// Documents up to this size are saved synchronously (-1: never)
    pub background_save_size: i64,
    /// Whether background saves surface progress to the user
    pub visible_progress: bool,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            asynchronous_sleep_ms: 0,
            progress_interval_ms: PROGRESS_INTERVAL_MS,
            background_open_size: -1,
            background_save_size: -1,
            visible_progress: true,
        }
    }
}

impl TransferSettings {
    /// Load settings from a file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), ?settings, "loaded transfer settings");
        Ok(settings)
    }

    /// Load settings from TOML text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let values = SettingsParser::parse(content)?;
        Self::from_toml(&values)
    }

    /// Load settings from parsed values, rejecting unknown `transfer.*` keys
    pub fn from_toml(values: &HashMap<String, SettingValue>) -> ConfigResult<Self> {
        if let Some(unknown) = values
            .keys()
            .find(|k| k.starts_with("transfer.") && !KNOWN_KEYS.contains(&k.as_str()))
        {
            return Err(ConfigError::Validation(format!("unknown setting `{}`", unknown)));
        }

        let mut settings = Self::default();

        macro_rules! load_int {
            ($field:ident, $key:expr, $ty:ty) => {
                if let Some(value) = values.get($key) {
                    let raw = value.as_integer($key)?;
                    settings.$field = <$ty>::try_from(raw).map_err(|_| {
                        ConfigError::Validation(format!("`{}` is out of range: {}", $key, raw))
                    })?;
                }
            };
        }

        load_int!(block_size, "transfer.block_size", usize);
        load_int!(asynchronous_sleep_ms, "transfer.asynchronous_sleep_ms", u64);
        load_int!(progress_interval_ms, "transfer.progress_interval_ms", u64);
        load_int!(background_open_size, "transfer.background_open_size", i64);
        load_int!(background_save_size, "transfer.background_save_size", i64);

        if let Some(value) = values.get("transfer.visible_progress") {
            settings.visible_progress = value.as_bool("transfer.visible_progress")?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Export settings as TOML text
    pub fn to_toml_string(&self) -> String {
        format!(
            "[transfer]\nblock_size = {}\nasynchronous_sleep_ms = {}\nprogress_interval_ms = {}\nbackground_open_size = {}\nbackground_save_size = {}\nvisible_progress = {}\n",
            self.block_size,
            self.asynchronous_sleep_ms,
            self.progress_interval_ms,
            self.background_open_size,
            self.background_save_size,
            self.visible_progress,
        )
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(ConfigError::Validation(format!(
                "`transfer.block_size` must be at least {} bytes, got {}",
                MIN_BLOCK_SIZE, self.block_size
            )));
        }
        Ok(())
    }

    /// Sleep inserted after each block
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.asynchronous_sleep_ms)
    }

    /// Spacing of progress reports, `None` when they are disabled
    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval_ms > 0).then(|| Duration::from_millis(self.progress_interval_ms))
    }

    /// Whether a file of `file_size` bytes should be read on a worker thread
    pub fn load_in_background(&self, file_size: u64) -> bool {
        i128::from(file_size) > i128::from(self.background_open_size)
    }

    /// Whether a document of `document_size` bytes should be written on a worker thread
    pub fn save_in_background(&self, document_size: u64) -> bool {
        i128::from(document_size) > i128::from(self.background_save_size)
    }
}

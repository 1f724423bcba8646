//! Session logger: a `log` backend that writes to a single file.
//!
//! The file is **truncated at each init**, so it only ever holds output from
//! the most recent session. Library code logs through the `log` macros; until
//! [`init`] runs those calls go nowhere.
//!
//! Lines look like `[HH:MM:SS] [LEVEL] target: message`. Panics are mirrored
//! into the file before the default hook runs.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("could not open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a logger is already installed")]
    AlreadyInitialized,
}

/// The `log::Log` implementation behind [`init`].
pub struct SessionLogger {
    file: OnceLock<Mutex<File>>,
    path: OnceLock<PathBuf>,
}

static LOGGER: SessionLogger = SessionLogger {
    file: OnceLock::new(),
    path: OnceLock::new(),
};

impl SessionLogger {
    /// Write a raw line. I/O errors are ignored so logging never takes the
    /// editor down.
    fn write_line(&self, line: &str) {
        if let Some(mutex) = self.file.get()
            && let Ok(mut file) = mutex.lock()
        {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write_line(&format_line(
            &timestamp(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        ));
    }

    fn flush(&self) {
        if let Some(mutex) = self.file.get()
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Returns the path of the current session log, once [`init`] succeeded.
pub fn log_path() -> Option<&'static Path> {
    LOGGER.path.get().map(PathBuf::as_path)
}

/// Install the session logger, writing everything at `level` or above to
/// `path`.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the previous handler.
pub fn init(path: &Path, level: LevelFilter) -> Result<(), LoggerError> {
    if LOGGER.file.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| LoggerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    log::set_logger(&LOGGER).map_err(|_| LoggerError::AlreadyInitialized)?;
    let _ = LOGGER.file.set(Mutex::new(file));
    let _ = LOGGER.path.set(path.to_path_buf());
    log::set_max_level(level);

    LOGGER.write_line(&format!("=== MaskPaint session started {} ===", human_timestamp()));
    LOGGER.write_line(&format!("Log file: {}", path.display()));
    LOGGER.write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        LOGGER.write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
    Ok(())
}

fn format_line(timestamp: &str, level: log::Level, target: &str, message: &str) -> String {
    format!("[{}] [{}] {}: {}", timestamp, level, target, message)
}

/// Simple seconds-since-epoch timestamp string.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            // HH:MM:SS within the current day (UTC)
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}

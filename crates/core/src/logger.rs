use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();
static VERBOSE: AtomicBool = AtomicBool::new(false);

struct Logger {
    file: Option<File>,
    echo: bool,
}

/// Initialize the global logger. Truncates `app.log` under `log_dir` and
/// echoes every line to stderr. If the file can't be opened, logs go to
/// stderr only.
pub fn init(log_dir: &Path) {
    fs::create_dir_all(log_dir).ok();
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path);

    let file = match file {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("cannot open {}: {}", log_path.display(), e);
            None
        }
    };

    LOGGER.set(Mutex::new(Logger { file, echo: true })).ok();
}

/// Enable debug lines (device command tracing).
pub fn set_verbose(on: bool) {
    VERBOSE.store(on, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

fn write_log(level: &str, prefix: &str, msg: &str) {
    let ts = Local::now().format("%H:%M:%S%.3f").to_string();

    let line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };

    if let Some(logger) = LOGGER.get() {
        let Ok(mut l) = logger.lock() else { return };
        if let Some(file) = l.file.as_mut() {
            writeln!(file, "{}", line).ok();
        }
        if l.echo {
            eprintln!("{}", line);
        }
    }
}

pub fn info(msg: &str) {
    write_log("INFO", "", msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", msg);
}

/// Log with a component prefix, e.g. `[adb]` or `[flow]`.
pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, msg);
}

/// Only written when verbose logging is on (`--log`).
pub fn debug_p(prefix: &str, msg: &str) {
    if is_verbose() {
        write_log("DEBUG", prefix, msg);
    }
}

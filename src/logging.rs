//! Centralized timestamped logging
//!
//! All logs should go through `logi!`, `logw!`, or `loge!` so they include:
//!   <timestamp> [TAG][thread] message
//!
//! Info goes to stdout, warnings and errors to stderr. An optional file sink receives
//! every line (`--log-file <path>` or `FEEDBACKCAM_LOG_FILE`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<Option<std::fs::File>>> = OnceLock::new();
static RUN_ID: OnceLock<String> = OnceLock::new();

const TS_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Initialize logging. Call once at startup; returns the generated run id.
pub fn init(log_file: Option<PathBuf>) -> String {
    let rid = RUN_ID
        .get_or_init(|| {
            // Short correlation id: time xor pid
            let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
            format!("{:08x}", (now.as_nanos() as u64) ^ (std::process::id() as u64))
        })
        .clone();

    let sink = LOG_FILE.get_or_init(|| Mutex::new(None));

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => {
                if let Ok(mut guard) = sink.lock() {
                    *guard = Some(f);
                }
            }
            Err(e) => {
                // The macros would try the sink we just failed to open.
                eprintln!(
                    "{} [WARN][{}] failed to open log file {}: {e}",
                    log_timestamp(),
                    log_thread_name(),
                    path.display()
                );
            }
        }
    }

    rid
}

// Local time is used when available; it falls back to UTC.
pub(crate) fn log_timestamp() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let Ok(fmt) = time::format_description::parse(TS_FORMAT) else {
        return "<time-format-error>".to_string();
    };
    now.format(&fmt).unwrap_or_else(|_| "<time-format-error>".to_string())
}

pub(crate) fn log_thread_name() -> String {
    std::thread::current().name().unwrap_or("thread").to_string()
}

pub(crate) fn format_line(tag: &str, msg: &str) -> String {
    format!("{} [{}][{}] {}", log_timestamp(), tag, log_thread_name(), msg)
}

/// Write one formatted line to the console and the optional file sink.
pub(crate) fn log_line(level: Level, tag: &str, msg: &str) {
    let line = format_line(tag, msg);

    match level {
        Level::Info => println!("{line}"),
        Level::Warn | Level::Error => eprintln!("{line}"),
    }

    if let Some(m) = LOG_FILE.get() {
        if let Ok(mut guard) = m.lock() {
            if let Some(f) = guard.as_mut() {
                let _ = writeln!(f, "{line}");
                let _ = f.flush();
            }
        }
    }
}

#[macro_export]
macro_rules! logi {
    ($tag:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::logging::log_line($crate::logging::Level::Info, $tag, &msg);
    }};
}

#[macro_export]
macro_rules! logw {
    ($tag:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::logging::log_line($crate::logging::Level::Warn, $tag, &msg);
    }};
}

#[macro_export]
macro_rules! loge {
    ($tag:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::logging::log_line($crate::logging::Level::Error, $tag, &msg);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_has_tag_thread_and_message() {
        let line = std::thread::Builder::new()
            .name("midi-test".into())
            .spawn(|| format_line("MIDI", "cc=16 val=127"))
            .unwrap()
            .join()
            .unwrap();
        assert!(line.ends_with("[MIDI][midi-test] cc=16 val=127"), "{line}");
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let ts = log_timestamp();
        // YYYY-MM-DD HH:MM:SS.mmm
        assert_eq!(ts.len(), 23, "{ts}");
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[19..20], ".");
    }

    #[test]
    fn file_sink_receives_lines() {
        let path = std::env::temp_dir().join(format!("feedbackcam-log-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let rid = init(Some(path.clone()));
        assert_eq!(rid.len(), 8);
        crate::logw!("TEST", "written to {}", "file");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[TEST]"));
        assert!(contents.contains("written to file"));
    }
}

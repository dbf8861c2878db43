//! Structured CSV telemetry sink and rate-limited logging (spec.md §4.7).
//!
//! Grounded in `original_source/sysmodule/src/file_utils.cpp`: `LogLine`'s
//! flag-file debounce (`RefreshFlags`, 5s spacing) and `WriteContextToCsv`'s
//! header-on-first-write behaviour are carried over verbatim in shape. The
//! teacher (`thermal-governor`) hand-rolls its own `log()` free function
//! instead of pulling in the `log`/`tracing` facades — we keep that shape
//! (one logging path, no dependency injection) but make it a `Logger`
//! value so tests can point it at a temp directory.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::types::{Context, Module, PowerSensor, RamLoad, ThermalSensor};

const FLAG_CHECK_INTERVAL_MS: u64 = 5_000;

pub struct Logger {
    log_path: PathBuf,
    flag_path: PathBuf,
    csv_path: PathBuf,
    log_mutex: Mutex<()>,
    csv_mutex: Mutex<()>,
    log_enabled: AtomicBool,
    last_flag_check_ms: AtomicU64,
    start: Instant,
}

impl Logger {
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        let dir = config_dir.as_ref();
        Logger {
            log_path: dir.join("log.txt"),
            flag_path: dir.join("log.flag"),
            csv_path: dir.join("context.csv"),
            log_mutex: Mutex::new(()),
            csv_mutex: Mutex::new(()),
            log_enabled: AtomicBool::new(false),
            last_flag_check_ms: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    fn refresh_flag(&self, force: bool) {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let last = self.last_flag_check_ms.load(Ordering::Relaxed);
        if !force && now_ms.saturating_sub(last) < FLAG_CHECK_INTERVAL_MS {
            return;
        }
        self.log_enabled
            .store(self.flag_path.is_file(), Ordering::Relaxed);
        self.last_flag_check_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Appends one timestamped line to the log file, gated by the
    /// existence of `log.flag`. No-op (and cheap) when the flag is absent.
    pub fn log_line(&self, msg: &str) {
        let _guard = self.log_mutex.lock().unwrap();
        self.refresh_flag(false);
        if !self.log_enabled.load(Ordering::Relaxed) {
            return;
        }

        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.log_path) else {
            return;
        };
        let now = chrono::Local::now();
        let _ = writeln!(file, "[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), msg);
    }

    /// Appends one context row to the CSV sink, emitting the header first
    /// if the file is empty (spec.md §4.7, §8 "CSV header is emitted only
    /// on the first write of a session").
    pub fn write_context_csv(&self, ctx: &Context) {
        let _guard = self.csv_mutex.lock().unwrap();
        let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.csv_path)
        else {
            return;
        };

        if is_empty(&file) {
            let _ = writeln!(file, "{}", csv_header());
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let ts_ms = now.as_millis();

        let mut row = format!(
            "{ts_ms},{},{:016x}",
            ctx.profile.code(),
            ctx.application_id
        );
        for m in Module::ALL {
            row.push_str(&format!(",{}", ctx.freq(m)));
        }
        for s in ThermalSensor::ALL {
            row.push_str(&format!(",{}", ctx.temp(s)));
        }
        for m in Module::ALL {
            row.push_str(&format!(",{}", ctx.real_freq(m)));
        }
        for s in PowerSensor::ALL {
            row.push_str(&format!(",{}", ctx.power(s)));
        }
        for r in RamLoad::ALL {
            row.push_str(&format!(",{}", ctx.ram_load(r)));
        }
        let _ = writeln!(file, "{row}");
    }
}

fn is_empty(file: &File) -> bool {
    file.metadata().map(|m| m.len() == 0).unwrap_or(true)
}

fn csv_header() -> String {
    let mut cols = vec!["timestamp".to_string(), "profile".to_string(), "app_tid".to_string()];
    for m in Module::ALL {
        cols.push(format!("{}_hz", m.code()));
    }
    for s in ThermalSensor::ALL {
        cols.push(format!("{}_milliC", s.code()));
    }
    for m in Module::ALL {
        cols.push(format!("{}_real_hz", m.code()));
    }
    for s in PowerSensor::ALL {
        cols.push(format!("{}_mw", s.code()));
    }
    for r in RamLoad::ALL {
        cols.push(format!("{}_pct", r.code()));
    }
    cols.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Profile;

    #[test]
    fn csv_header_only_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(dir.path());
        let mut ctx = Context::default();
        ctx.profile = Profile::Docked;
        ctx.application_id = 0x0100000000abcdef;

        logger.write_context_csv(&ctx);
        logger.write_context_csv(&ctx);

        let contents = std::fs::read_to_string(dir.path().join("context.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,profile,app_tid"));
        assert!(lines[1].contains("docked"));
        assert!(lines[1].contains("0100000000abcdef"));
    }

    #[test]
    fn log_line_noop_without_flag_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(dir.path());
        logger.log_line("hello");
        assert!(!dir.path().join("log.txt").exists());
    }

    #[test]
    fn log_line_writes_when_flagged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("log.flag"), "").unwrap();
        let logger = Logger::new(dir.path());
        logger.log_line("hello");
        let contents = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert!(contents.contains("hello"));
        assert!(contents.starts_with('['));
    }
}

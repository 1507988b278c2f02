//! padgestr – touchpad gesture bridge for Linux.
//!
//! CLI entry point.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::SystemTime;

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use padgestr::manager::{TouchpadManager, list_touch_devices};

const DEVICE_HINT: &str = "To find available touchpads, run:\n  padgestr --list-devices";

#[derive(Parser)]
#[command(
    name = "padgestr",
    about = "Turn touchpad gestures into pointer and touch events"
)]
struct Cli {
    /// Path to configuration file
    #[arg(default_value = "/etc/padgestr/padgestr.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List available touchpads and exit
    #[arg(short, long)]
    list_devices: bool,
}

/// Logger for the crate's own targets: stderr, plus an optional log file.
///
/// Lines carry the emitting thread when it is not the main one, since the
/// tap fallback logs from its own thread.
struct PadgestrLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl PadgestrLogger {
    fn format(record: &Record) -> String {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let module = record
            .module_path()
            .and_then(|m| m.strip_prefix("padgestr::"))
            .unwrap_or("padgestr");
        let (level, args) = (record.level(), record.args());
        match thread::current().name() {
            Some(name) if name != "main" => {
                format!("[{secs} {level:<5} {module} @{name}] {args}\n")
            }
            _ => format!("[{secs} {level:<5} {module}] {args}\n"),
        }
    }
}

impl Log for PadgestrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("padgestr")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);

        // stderr ends up in the journal under systemd.
        eprint!("{line}");

        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

fn open_log_file(path: &str) -> Option<Mutex<File>> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(Mutex::new(file)),
        Err(e) => {
            eprintln!("Warning: cannot open log file '{path}': {e}");
            None
        }
    }
}

fn init_logging(level: LevelFilter, log_file: Option<&str>) {
    let file = log_file.and_then(open_log_file);
    let logger = PadgestrLogger { level, file };
    log::set_boxed_logger(Box::new(logger)).expect("Failed to set logger");
    log::set_max_level(level);
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_touch_devices();
    }

    // The logger needs the configured level, so the config comes first.
    let mut manager = match TouchpadManager::new(&cli.config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}\n\n{DEVICE_HINT}");
            return ExitCode::FAILURE;
        }
    };

    // CLI --verbose overrides the config file setting.
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        manager
            .config_log_level()
            .parse()
            .unwrap_or(LevelFilter::Info)
    };
    init_logging(level, manager.config_log_file());

    let running = manager.running_flag();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    log::info!("Loaded configuration from: {}", cli.config.display());
    if let Err(e) = manager.start() {
        log::error!("{e}");
        eprintln!("\n{DEVICE_HINT}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

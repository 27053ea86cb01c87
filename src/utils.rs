use anyhow::Result;
use chrono::{DateTime, Local};
use log::{LevelFilter, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

// Logging plumbing shared by the library and its embedders.

pub struct SimpleLogger {
    log_file: Option<std::fs::File>,
}

impl SimpleLogger {
    pub fn new(log_file_path: Option<&PathBuf>) -> Result<Self> {
        let log_file = if let Some(path) = log_file_path {
            Some(OpenOptions::new().create(true).append(true).open(path)?)
        } else {
            None
        };

        Ok(SimpleLogger { log_file })
    }
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now: DateTime<Local> = Local::now();
            let line = format!(
                "[{}] {} [{}:{}] {}\n",
                now.format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            );

            if let Some(file) = &self.log_file {
                let mut file = file.try_clone().unwrap();
                let _ = file.write_all(line.as_bytes());
            } else {
                print!("{}", line);
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.log_file {
            let mut file = file.try_clone().unwrap();
            let _ = file.flush();
        } else {
            let _: Result<(), std::io::Error> = std::io::stdout().flush();
        }
    }
}

/// Install the logger. With `to_file` set, records go to `parlor.log` under
/// the platform config directory; otherwise to stdout.
pub fn setup_logging(to_file: bool, level: LevelFilter) -> Result<()> {
    let log_path = if to_file {
        Some(crate::config::get_config_dir()?.join("parlor.log"))
    } else {
        None
    };

    let logger = SimpleLogger::new(log_path.as_ref())?;
    log::set_boxed_logger(Box::new(logger)).map(|()| log::set_max_level(level))?;

    log::info!("Logging initialized at level: {}", level);
    if let Some(path) = &log_path {
        log::info!("Log file: {}", path.display());
    }

    Ok(())
}

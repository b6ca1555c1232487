use std::{fmt::Write as _, thread};

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;
use strum::Display;

pub mod rotate;

use rotate::Rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("relay"));

#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

/// File logger with one background writer thread per level.
///
/// Callers never block on disk I/O: lines go through an unbounded channel and
/// the writer thread batches them into `log/<date>_<name>_<level>.log`.
pub struct Logger {
    info_writer: Sender<String>,
    warn_writer: Sender<String>,
    error_writer: Sender<String>,
    debug_writer: Sender<String>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        Logger {
            info_writer: Self::create_writer(log_name, Level::Info),
            warn_writer: Self::create_writer(log_name, Level::Warn),
            error_writer: Self::create_writer(log_name, Level::Error),
            debug_writer: Self::create_writer(log_name, Level::Debug),
        }
    }

    pub fn info(&self, log: String) {
        self.send(log, &self.info_writer);
    }

    pub fn warn(&self, log: String) {
        self.send(log, &self.warn_writer);
    }

    pub fn error(&self, log: String) {
        self.send(log, &self.error_writer);
    }

    pub fn debug(&self, log: String) {
        self.send(log, &self.debug_writer);
    }

    fn send(&self, msg: String, writer: &Sender<String>) {
        if let Err(why) = writer.send(msg) {
            error_console(why.to_string());
        }
    }

    fn create_writer(log_name: &str, level: Level) -> Sender<String> {
        let (tx, rx) = unbounded::<String>();
        let pattern = format!("log/%Y-%m-%d_{}_{}.log", log_name, level);

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(pattern);
            let mut line = String::with_capacity(2048);

            for received in &rx {
                if writeln!(
                    &mut line,
                    "{} {}",
                    Local::now().format("%F %X%.6f"),
                    received
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= 2048 {
                    if let Err(why) = rotate.write_msg(Local::now(), line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    rotate.flush();
                    line.clear();
                }
            }
        });

        tx
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(Level::Info.to_string(), "info");
        assert_eq!(Level::Warn.to_string(), "warn");
        assert_eq!(Level::Error.to_string(), "error");
        assert_eq!(Level::Debug.to_string(), "debug");
    }

    #[tokio::test]
    #[ignore]
    async fn test_file_async() {
        info_file_async("info line".to_string());
        warn_file_async("warn line".to_string());
        error_file_async("error line".to_string());
        debug_file_async("debug line".to_string());
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}

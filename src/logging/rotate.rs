use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeDelta};
use rayon::prelude::*;

use crate::logging;

/// 單檔最大大小：10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// 保留天數
const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// A log file writer that switches files when the date changes and
/// opens a new generation when the current file grows past `max_size`.
///
/// File names come from a `chrono` pattern such as `log/%Y-%m-%d_relay_info.log`.
/// Generation 0 uses the pattern as is, later generations insert the number
/// before the extension (`..._info.1.log`, `..._info.2.log`).
pub struct Rotate {
    pattern: String,
    /// 目前日期對應的基礎檔名（不含 generation）
    base_fn: String,
    out: Option<BufWriter<File>>,
    generation: u32,
    max_size: u64,
    current_size: u64,
    max_age: TimeDelta,
}

impl Rotate {
    pub fn new(pattern: String) -> Self {
        Self::with_options(pattern, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn with_options(pattern: String, max_size: u64, max_age_days: i64) -> Self {
        Rotate {
            pattern,
            base_fn: String::new(),
            out: None,
            generation: 0,
            max_size,
            current_size: 0,
            max_age: TimeDelta::try_days(max_age_days).unwrap_or(TimeDelta::days(7)),
        }
    }

    /// Appends `msg` to the current file, switching files first when the
    /// date changed or the size limit would be exceeded.
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.pattern).to_string();
        if base_fn != self.base_fn || self.out.is_none() {
            self.base_fn = base_fn;
            self.generation = 0;
            self.open_current()?;
            self.cleanup_old_files(now);
        }

        if self.current_size > 0 && self.current_size + msg.len() as u64 > self.max_size {
            self.generation += 1;
            self.open_current()?;
        }

        let out = self
            .out
            .as_mut()
            .ok_or_else(|| anyhow!("log file {} is not open", self.base_fn))?;
        out.write_all(msg)?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(out) = self.out.as_mut() {
            let _ = out.flush();
        }
    }

    fn full_fn(&self, generation: u32) -> PathBuf {
        let base = Path::new(&self.base_fn);
        if generation == 0 {
            return base.to_path_buf();
        }

        let parent = base.parent().unwrap_or(Path::new(""));
        let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("log");

        parent.join(format!("{}.{}.{}", stem, generation, ext))
    }

    fn open_current(&mut self) -> Result<()> {
        self.flush();

        // 已存在且寫滿的世代直接跳過，不覆蓋舊檔
        loop {
            let filename = self.full_fn(self.generation);
            if let Some(parent) = filename.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&filename)?;
            let size = file.metadata().map(|m| m.len()).unwrap_or(0);

            if size >= self.max_size {
                self.generation += 1;
                continue;
            }

            self.current_size = size;
            self.out = Some(BufWriter::with_capacity(4096, file));

            return Ok(());
        }
    }

    /// 刪除超過保留天數的 .log 檔
    fn cleanup_old_files(&self, now: DateTime<Local>) {
        let dir = match Path::new(&self.base_fn).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let files = match log_files_in(&dir) {
            Ok(files) => files,
            Err(why) => {
                logging::error_console(format!(
                    "Failed to list log files in {} because {:?}",
                    dir.display(),
                    why
                ));
                return;
            }
        };

        let cut_off = (now - self.max_age).timestamp().max(0) as u64;
        files
            .par_iter()
            .filter(|file| {
                fs::metadata(file)
                    .and_then(|metadata| metadata.modified())
                    .ok()
                    .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                    .is_some_and(|age| age.as_secs() <= cut_off)
            })
            .for_each(|file| {
                if let Err(why) = fs::remove_file(file) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        file.display(),
                        why
                    ));
                }
            });
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}

fn log_files_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
            files.push(path);
        }
    }

    Ok(files)
}

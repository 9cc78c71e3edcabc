use std::{
    fs::{create_dir_all, File},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

/// Send `log` output to `<log_dir>/<name>_<timestamp>.log`. Returns the log path.
pub fn init_file_logger(log_dir: &Path, name: &str) -> Result<PathBuf> {
    create_dir_all(log_dir)
        .with_context(|| format!("could not create {}/ directory", log_dir.display()))?;
    let ts = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let log_path = log_dir.join(format!("{name}_{ts}.log"));

    WriteLogger::init(
        LevelFilter::Info,
        ConfigBuilder::new().build(),
        File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?,
    )?;
    Ok(log_path)
}

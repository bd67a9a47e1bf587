use crate::config::Config;
use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing_subscriber::{
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    EnvFilter,
};

/// Installs the global subscriber and returns the log file records are copied to, if any.
pub fn init_logging(config: &Config) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(config.debug)));

    let log_file = match open_log_file(Path::new(&config.log_dir), &config.addr) {
        Ok(log_file) => log_file,
        Err(err) => {
            eprintln!("log_file_error: {err}");
            None
        }
    };
    let writer = match &log_file {
        Some((_, file)) => BoxMakeWriter::new(io::stdout.and(file.clone())),
        None => BoxMakeWriter::new(io::stdout),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok()?;
    log_file.map(|(path, _)| path)
}

fn default_level(debug: bool) -> String {
    if debug {
        return "debug".to_string();
    }
    std::env::var("PAGEWATCH_LOG_LEVEL")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// An empty directory disables file output.
fn open_log_file(log_dir: &Path, addr: &str) -> io::Result<Option<(PathBuf, Arc<File>)>> {
    if log_dir.to_string_lossy().trim().is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file_name(addr));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(Some((path, Arc::new(file))))
}

fn log_file_name(addr: &str) -> String {
    let port = addr
        .rsplit_once(':')
        .map(|(_, port)| port)
        .filter(|port| !port.is_empty())
        .unwrap_or("default");
    format!("pagewatch-hub-{port}.log")
}

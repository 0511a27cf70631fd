use std::{
    fs::{create_dir_all, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
    str::FromStr,
    sync::Mutex,
};

use env_logger::Builder;
use log::LevelFilter;

use crate::{config, config_error, core::error::DispatchResult};

/// Append-mode log file shared by every logging thread
pub struct FileWriter {
    inner: Mutex<BufWriter<std::fs::File>>,
}

impl FileWriter {
    pub fn open(path: &str) -> io::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().append(true).create(true).open(path)?;
        Ok(Self {
            inner: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .inner
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        let written = file.write(buf)?;
        // Lines must hit the file even if the process exits right after
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?
            .flush()
    }
}

fn level_filter(level: &str) -> DispatchResult<LevelFilter> {
    LevelFilter::from_str(level).map_err(|_| config_error!("Invalid log level '{}'", level))
}

/// Build the env_logger builder for `config`. `RUST_LOG` still wins over
/// the configured level for the modules it names.
pub fn builder(config: &config::Log) -> DispatchResult<Builder> {
    let mut builder = Builder::new();
    builder.filter_level(level_filter(&config.level)?);
    builder.parse_env(env_logger::Env::default());

    if let Some(path) = &config.path {
        let writer = FileWriter::open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(writer)));
    }

    Ok(builder)
}

/// Install the global logger. Calling it twice is not an error.
pub fn init_logger(config: &config::Log) -> DispatchResult<()> {
    if let Err(e) = builder(config)?.try_init() {
        log::debug!("Logger already initialised: {e}");
    }
    Ok(())
}

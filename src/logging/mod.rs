use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Installs the global subscriber described by `cfg`.
///
/// `RUST_LOG` takes precedence; otherwise `sizefit=<level>` is used.
pub fn try_init(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("warn,sizefit={}", cfg.level))
            .with_context(|| format!("invalid log level '{}'", cfg.level))
    })?;

    let stderr = if cfg.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = match &cfg.file {
        Some(path) => {
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file '{}'", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(handle)).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(())
}

//! Console and file logging setup.

use std::path::Path;
use std::sync::OnceLock;

use eyre::WrapErr;
use linebot_config::Logging;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Keeps the non-blocking file writer flushing until process exit.
pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn rolling(
    rotation: Option<&str>,
    dir: &Path,
    name: &Path,
) -> eyre::Result<tracing_appender::rolling::RollingFileAppender> {
    Ok(match rotation.unwrap_or("never") {
        "never" => tracing_appender::rolling::never(dir, name),
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        other => eyre::bail!("logging.rotation must be never, daily or hourly (got {other:?})"),
    })
}

/// Install the global subscriber. Console output goes to stderr so stdout
/// carries only the command's result. `RUST_LOG` wins over `level`.
pub fn init(level: &str, json: bool, file_cfg: &Logging) -> eyre::Result<()> {
    let filter = || EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level));

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter().wrap_err("invalid log level")?)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter().wrap_err("invalid log level")?)
            .boxed()
    };

    let file = match &file_cfg.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = rolling(file_cfg.rotation.as_deref(), dir, Path::new(name))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(filter().wrap_err("invalid log level")?),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("installing tracing subscriber")?;
    Ok(())
}

use std::io::IsTerminal as _;

use anyhow::Context as _;

/// Our own events at `info`, dependencies (reqwest, html5ever) only at `warn`.
const DEFAULT_DIRECTIVES: &str = "warn,wiki2md=info";

/// Logs go to stderr so stdout only carries the written file path.
/// `RUST_LOG` replaces the default directives.
pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_DIRECTIVES))
        .context("build log filter")?;

    let stderr = std::io::stderr();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(stderr.is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    tracing::debug!(directives = DEFAULT_DIRECTIVES, "logging initialized");
    Ok(())
}

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use wiki2md::config::{Config, EnvSnapshot};
use wiki2md::credentials::TerminalPrompt;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    wiki2md::logging::init().context("init logging")?;

    let cli = wiki2md::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let env = EnvSnapshot::from_process();
    let credentials = wiki2md::credentials::resolve(cli.manual, &env, &mut TerminalPrompt)
        .context("resolve credentials")?;
    let config = Config::new(credentials, &env).context("build config")?;

    let artifact = wiki2md::pipeline::run(&config).context("convert page")?;
    tracing::info!(
        images = artifact.images.len(),
        unresolved_images = artifact.unresolved_images.len(),
        diagrams = artifact.diagrams.resolved,
        images_dir = %artifact.images_dir.display(),
        "done"
    );
    println!("{}", artifact.markdown_path.display());

    Ok(())
}

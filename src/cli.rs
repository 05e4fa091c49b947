use clap::Parser;

/// Convert a wiki page to Markdown, downloading its images and diagrams.
///
/// The page URL and API token are read from `PAGE_URL` and `BEARER_TOKEN`,
/// with an interactive prompt for whichever is missing.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Prompt for the page URL and token even when they are set in the environment.
    #[arg(long)]
    pub manual: bool,
}

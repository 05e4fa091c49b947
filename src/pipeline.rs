use std::path::PathBuf;

use crate::client::{WikiApi, WikiClient};
use crate::config::Config;
use crate::convert::ConvertOptions;
use crate::diagrams::DiagramReport;
use crate::document::Document;
use crate::error::Error;
use crate::images::ImageReference;

/// What a run produced.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub markdown_path: PathBuf,
    pub images_dir: PathBuf,
    pub images: Vec<ImageReference>,
    /// Image sources left pointing at the wiki because the download failed.
    pub unresolved_images: Vec<String>,
    pub diagrams: DiagramReport,
}

/// Fetch, resolve diagrams, download images, convert, write.
pub fn run(config: &Config) -> Result<OutputArtifact, Error> {
    let client = WikiClient::new(config)?;
    run_with(config, &client)
}

pub fn run_with(config: &Config, api: &impl WikiApi) -> Result<OutputArtifact, Error> {
    tracing::info!(base_url = %config.page.base_url, target = ?config.page.target, "convert: fetch page");
    let page = crate::fetch::fetch_page(api, &config.page)?;
    let document = Document::parse(&page.body_html);

    tracing::info!("convert: resolve diagrams");
    let (document, diagrams) = crate::diagrams::resolve(document, api, &page.id);

    tracing::info!("convert: materialize images");
    let images_dir = config.images_dir();
    let (document, materialized) = crate::images::materialize(document, api, &images_dir);

    tracing::info!("convert: render markdown");
    let markdown = crate::convert::to_markdown(
        &page.title,
        document,
        &materialized.images,
        api.base_url(),
        ConvertOptions {
            preserve_sizing: config.preserve_sizing,
        },
    );

    let markdown_path = crate::writer::write_markdown(&config.output_dir, &page.title, &markdown)?;

    if diagrams.failed > 0 || !materialized.unresolved.is_empty() {
        tracing::warn!(
            failed_diagrams = diagrams.failed,
            unresolved_images = materialized.unresolved.len(),
            "converted with missing images"
        );
    }

    Ok(OutputArtifact {
        markdown_path,
        images_dir,
        images: materialized.images,
        unresolved_images: materialized.unresolved,
        diagrams,
    })
}

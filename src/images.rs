//! Downloads every `<img>` of the page into the images directory and points
//! the element at the local copy.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context as _;
use percent_encoding::percent_decode_str;
use sha2::{Digest as _, Sha256};
use url::Url;

use crate::client::WikiApi;
use crate::config::IMAGES_DIR_NAME;
use crate::document::{Document, parse_pixels};
use crate::error::ItemError;

/// Confluence renders `{status}` macros as images of this placeholder service.
const STATUS_PLACEHOLDER_PATH: &str = "/status-macro/placeholder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub original_source: String,
    /// `images/<filename>`, relative to the Markdown file.
    pub local_path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// One entry per rewritten `<img>`, in document order.
    pub images: Vec<ImageReference>,
    /// Absolute sources that could not be downloaded.
    pub unresolved: Vec<String>,
}

/// Filenames handed out during one run.
#[derive(Debug, Default)]
struct NameRegistry {
    by_source: HashMap<String, String>,
    /// Lowercased, so names differing only in case never share a file on
    /// case-insensitive filesystems.
    taken: HashSet<String>,
}

impl NameRegistry {
    /// Name already used for this exact source, if any.
    fn existing(&self, source: &str) -> Option<&str> {
        self.by_source.get(source).map(String::as_str)
    }

    /// A filename no other source uses: the derived name, else the derived
    /// name with a source hash suffix, else a numbered variant of that.
    fn claim(&self, source: &str, derived: &str) -> String {
        if !self.is_taken(derived) {
            return derived.to_owned();
        }
        let hashed = with_suffix(derived, &short_hash(source, 8));
        if !self.is_taken(&hashed) {
            return hashed;
        }
        let mut counter = 2_usize;
        loop {
            let candidate = with_suffix(&hashed, &counter.to_string());
            if !self.is_taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&name.to_lowercase())
    }

    fn register(&mut self, source: &str, name: &str) {
        self.taken.insert(name.to_lowercase());
        self.by_source.insert(source.to_owned(), name.to_owned());
    }
}

pub fn materialize(
    mut document: Document,
    api: &impl WikiApi,
    images_dir: &Path,
) -> (Document, MaterializeReport) {
    let mut report = MaterializeReport::default();
    let mut names = NameRegistry::default();

    for id in document.select(|element| element.name() == "img") {
        let raw_source = document
            .attr(id, "data-image-src")
            .or_else(|| document.attr(id, "src"))
            .map(str::trim)
            .unwrap_or_default()
            .to_owned();
        if raw_source.is_empty() || raw_source.starts_with("data:") {
            continue;
        }

        let source = match api.base_url().join(&raw_source) {
            Ok(url) => url,
            Err(err) => {
                let err = ItemError::ImageDownload {
                    url: raw_source.clone(),
                    reason: anyhow::anyhow!("resolve image URL: {err}"),
                };
                tracing::warn!(error = %err, "leaving image unresolved");
                report.unresolved.push(raw_source);
                continue;
            }
        };
        if source.path().contains(STATUS_PLACEHOLDER_PATH) {
            tracing::debug!(%source, "skipping status placeholder image");
            continue;
        }

        let width = document.remove_attr(id, "width").as_deref().and_then(parse_pixels);
        let height = document.remove_attr(id, "height").as_deref().and_then(parse_pixels);
        // html2md keeps sized or aligned images as raw HTML.
        document.remove_attr(id, "align");
        document.remove_attr(id, "data-image-src");

        let key = source.to_string();
        let filename = match names.existing(&key) {
            Some(name) => {
                tracing::debug!(%source, filename = name, "image already downloaded");
                name.to_owned()
            }
            None => {
                let filename = names.claim(&key, &derive_filename(&source));
                if let Err(reason) = download_to(api, &source, images_dir, &filename) {
                    let err = ItemError::ImageDownload {
                        url: key.clone(),
                        reason,
                    };
                    tracing::warn!(error = %err, "leaving image unresolved");
                    document.set_attr(id, "src", &key);
                    report.unresolved.push(key);
                    continue;
                }
                tracing::info!(%source, %filename, "downloaded image");
                names.register(&key, &filename);
                filename
            }
        };

        let local_path = format!("{IMAGES_DIR_NAME}/{filename}");
        document.set_attr(id, "src", &local_path);
        report.images.push(ImageReference {
            original_source: key,
            local_path,
            width,
            height,
        });
    }

    (document, report)
}

fn download_to(
    api: &impl WikiApi,
    source: &Url,
    images_dir: &Path,
    filename: &str,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(images_dir)
        .with_context(|| format!("create images dir: {}", images_dir.display()))?;
    let bytes = api.download(source).context("download")?;
    let path = images_dir.join(filename);
    std::fs::write(&path, bytes).with_context(|| format!("write image: {}", path.display()))?;
    Ok(())
}

/// Last path segment, percent-decoded and reduced to `[A-Za-z0-9._-]`;
/// a hash-based name when nothing usable remains.
pub fn derive_filename(source: &Url) -> String {
    let segment = source
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let sanitized: String = decoded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches(|c| c == '.' || c == '_');

    if sanitized.is_empty() {
        return format!("image-{}.png", short_hash(source.as_str(), 12));
    }
    sanitized.to_owned()
}

fn short_hash(value: &str, len: usize) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(len);
    hex
}

/// `diagram.png` + `ab12` -> `diagram-ab12.png`.
fn with_suffix(filename: &str, suffix: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem}-{suffix}.{extension}"),
        _ => format!("{filename}-{suffix}"),
    }
}

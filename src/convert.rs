use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::diagrams::is_diagram_macro;
use crate::document::Document;
use crate::images::ImageReference;
use crate::toc;

/// The `](images/...)` tail of a Markdown image, optionally titled. Alt text
/// is left out of the match because html2md copies it unescaped.
static LOCAL_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\]\((images/[^)\s]+)(?:\s+"[^\n]*?")?\)"#).expect("valid regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Append `{: style="width:..px; height:..px;"}` after sized images.
    pub preserve_sizing: bool,
}

/// Renders the localized page as Markdown, headed by `# <title>`.
pub fn to_markdown(
    title: &str,
    mut document: Document,
    images: &[ImageReference],
    base_url: &Url,
    options: ConvertOptions,
) -> String {
    for id in document.select(is_diagram_macro) {
        document.remove(id);
    }
    absolutize_links(&mut document, base_url);
    toc::normalize_headings(&mut document);

    let headings = toc::collect_headings(&document);
    let placeholders = toc::insert_placeholders(&mut document);

    let body = html2md::parse_html(&document.to_html());
    let mut body = toc::fill(&body, &placeholders, &headings);
    if options.preserve_sizing {
        body = annotate_sizes(&body, images);
    }

    let body = body.trim();
    if body.is_empty() {
        return format!("# {title}\n");
    }
    format!("# {title}\n\n{body}\n")
}

/// Links relative to the wiki (`/display/...`, `../x`) become absolute so
/// they still work outside the wiki.
fn absolutize_links(document: &mut Document, base_url: &Url) {
    for id in document.select(|element| element.name() == "a") {
        let Some(href) = document.attr(id, "href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') || Url::parse(href).is_ok() {
            continue;
        }
        if let Ok(absolute) = base_url.join(href) {
            document.set_attr(id, "href", absolute.as_str());
        }
    }
}

/// Appends the sizing annotation to each local image reference, matching
/// references to images by path in document order.
pub fn annotate_sizes(markdown: &str, images: &[ImageReference]) -> String {
    let mut sized: HashMap<&str, VecDeque<&ImageReference>> = HashMap::new();
    for image in images {
        sized
            .entry(image.local_path.as_str())
            .or_default()
            .push_back(image);
    }

    LOCAL_IMAGE
        .replace_all(markdown, |captures: &Captures<'_>| {
            let reference = &captures[0];
            let path = captures[1].replace('\\', "");
            let annotation = sized
                .get_mut(path.as_str())
                .and_then(VecDeque::pop_front)
                .and_then(|image| size_annotation(image.width, image.height));
            match annotation {
                Some(annotation) => format!("{reference}{annotation}"),
                None => reference.to_owned(),
            }
        })
        .into_owned()
}

/// `{: style="width:400px; height:300px;"}`; `None` when neither is known.
pub fn size_annotation(width: Option<u32>, height: Option<u32>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(width) = width {
        parts.push(format!("width:{width}px;"));
    }
    if let Some(height) = height {
        parts.push(format!("height:{height}px;"));
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!("{{: style=\"{}\"}}", parts.join(" ")))
}

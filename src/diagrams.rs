//! Resolution of embedded draw.io diagram macros into plain `<img>` elements.
//!
//! A macro is a `data-macro-name="drawio"` element. Its diagram name comes
//! from `data-diagram-name`, or from the base64 JSON payload kept in a hidden
//! `drawio-macro-data-*` child. The rendered PNG is a page attachment named
//! `<diagram>.png` or `<diagram>.drawio.png`.
//!
//! A macro whose export cannot be found is left in place and logged; the
//! converter drops leftover macros.

use std::sync::LazyLock;

use base64::Engine as _;
use ego_tree::NodeId;
use regex::Regex;
use scraper::ElementRef;
use scraper::node::Element;
use url::Url;

use crate::client::WikiApi;
use crate::document::{Document, parse_pixels};
use crate::error::ItemError;
use crate::formats::{Attachment, DrawioMacroData};

const MACRO_NAME_ATTR: &str = "data-macro-name";
const DRAWIO_MACRO: &str = "drawio";
const MACRO_DATA_ID_PREFIX: &str = "drawio-macro-data-";
const MACRO_CONTENT_CLASS: &str = "drawio-macro";

static STYLE_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[;\s])width\s*:\s*(\d+)px").expect("valid regex"));
static STYLE_HEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[;\s])height\s*:\s*(\d+)px").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramMacro {
    pub node: NodeId,
    pub diagram_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagramReport {
    pub resolved: usize,
    pub failed: usize,
}

pub fn is_diagram_macro(element: &Element) -> bool {
    element
        .attr(MACRO_NAME_ATTR)
        .is_some_and(|name| name.trim().eq_ignore_ascii_case(DRAWIO_MACRO))
}

/// All diagram macros in document order. Macros whose name cannot be
/// determined come back as errors.
pub fn find_macros(document: &Document) -> Vec<Result<DiagramMacro, ItemError>> {
    document
        .select(is_diagram_macro)
        .into_iter()
        .filter_map(|id| document.element(id))
        .map(read_macro)
        .collect()
}

pub fn resolve(
    mut document: Document,
    api: &impl WikiApi,
    page_id: &str,
) -> (Document, DiagramReport) {
    let mut report = DiagramReport::default();
    let macros = find_macros(&document);
    if macros.is_empty() {
        return (document, report);
    }

    // One listing serves every macro on the page.
    let listing = api.attachments(page_id).map_err(|err| format!("{err:#}"));

    for found in macros {
        let exported = found.and_then(|diagram| {
            locate_export(&diagram, &listing, api.base_url()).map(|export| (diagram, export))
        });

        match exported {
            Ok((diagram, (url, title))) => {
                tracing::info!(diagram = %diagram.diagram_name, %url, "resolved diagram export");
                let mut attrs = vec![("src", url.to_string()), ("alt", title)];
                if let Some(width) = diagram.width {
                    attrs.push(("width", width.to_string()));
                }
                if let Some(height) = diagram.height {
                    attrs.push(("height", height.to_string()));
                }
                document.replace_element(diagram.node, "img", &attrs);
                report.resolved += 1;
            }
            Err(err) => {
                tracing::warn!(error = %err, "leaving diagram macro unresolved");
                report.failed += 1;
            }
        }
    }

    (document, report)
}

fn read_macro(element: ElementRef<'_>) -> Result<DiagramMacro, ItemError> {
    let failed = |reason: String| ItemError::DiagramExport {
        diagram: "<unnamed>".to_owned(),
        reason,
    };

    let descendants: Vec<ElementRef<'_>> = element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .collect();

    let diagram_name = match non_empty_attr(element.value(), "data-diagram-name") {
        Some(name) => name.to_owned(),
        None => {
            let data = descendants
                .iter()
                .find(|child| {
                    child
                        .value()
                        .attr("id")
                        .is_some_and(|id| id.starts_with(MACRO_DATA_ID_PREFIX))
                })
                .ok_or_else(|| failed("no diagram name and no macro data element".to_owned()))?;
            let payload = decode_macro_data(&data.text().collect::<String>()).map_err(failed)?;
            [payload.diagram_name, payload.preview_name]
                .into_iter()
                .map(|name| name.trim().to_owned())
                .find(|name| !name.is_empty())
                .ok_or_else(|| failed("macro data carries no diagram name".to_owned()))?
        }
    };

    let style = descendants
        .iter()
        .find(|child| child.value().classes().any(|class| class == MACRO_CONTENT_CLASS))
        .and_then(|content| content.value().attr("style"))
        .unwrap_or_default();
    let from_style = |pattern: &Regex| {
        pattern
            .captures(style)
            .and_then(|captures| captures.get(1))
            .and_then(|value| value.as_str().parse().ok())
    };

    let width = non_empty_attr(element.value(), "data-width")
        .and_then(parse_pixels)
        .or_else(|| from_style(&STYLE_WIDTH));
    let height = non_empty_attr(element.value(), "data-height")
        .and_then(parse_pixels)
        .or_else(|| from_style(&STYLE_HEIGHT));

    Ok(DiagramMacro {
        node: element.id(),
        diagram_name,
        width,
        height,
    })
}

fn decode_macro_data(raw: &str) -> Result<DrawioMacroData, String> {
    let compact: String = raw.split_whitespace().collect();
    if compact.is_empty() {
        return Err("macro data element is empty".to_owned());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| format!("decode macro data: {err}"))?;
    serde_json::from_slice(&bytes).map_err(|err| format!("parse macro data: {err}"))
}

/// Download URL and title of the PNG export for `diagram`.
fn locate_export(
    diagram: &DiagramMacro,
    listing: &Result<Vec<Attachment>, String>,
    base_url: &Url,
) -> Result<(Url, String), ItemError> {
    let failed = |reason: String| ItemError::DiagramExport {
        diagram: diagram.diagram_name.clone(),
        reason,
    };

    let attachments = listing
        .as_ref()
        .map_err(|err| failed(format!("list attachments: {err}")))?;
    let candidates = export_titles(&diagram.diagram_name);
    let attachment = candidates
        .iter()
        .find_map(|title| attachments.iter().find(|att| &att.title == title))
        .ok_or_else(|| failed(format!("no attachment named {}", candidates.join(" or "))))?;

    let download = attachment
        .links
        .download
        .as_deref()
        .ok_or_else(|| failed(format!("attachment {} has no download link", attachment.title)))?;
    let url = attachment_url(base_url, download)
        .map_err(|err| failed(format!("invalid download link {download:?}: {err}")))?;

    Ok((url, attachment.title.clone()))
}

fn export_titles(diagram_name: &str) -> Vec<String> {
    if diagram_name.to_ascii_lowercase().ends_with(".png") {
        return vec![diagram_name.to_owned()];
    }
    vec![
        format!("{diagram_name}.png"),
        format!("{diagram_name}.drawio.png"),
    ]
}

/// Download links are relative to the wiki root, context path included.
fn attachment_url(base_url: &Url, download: &str) -> Result<Url, url::ParseError> {
    if download.starts_with("http://") || download.starts_with("https://") {
        return Url::parse(download);
    }
    let base = base_url.as_str().trim_end_matches('/');
    let path = download.trim_start_matches('/');
    Url::parse(&format!("{base}/{path}"))
}

fn non_empty_attr<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;
    use crate::client::fake::FakeWiki;

    fn drawio_macro(payload_json: &str, style: &str) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(payload_json);
        format!(
            r#"<div class="conf-macro output-block" data-macro-name="drawio" data-macro-id="m1">
                 <div id="drawio-macro-content-m1" class="drawio-macro" style="{style}"></div>
                 <div id="drawio-macro-data-m1" style="display:none">{payload}</div>
               </div>"#
        )
    }

    #[test]
    fn reads_name_and_size_from_macro_payload() {
        let doc = Document::parse(&drawio_macro(
            r#"{"diagramName":"Architecture","previewName":"Architecture.png"}"#,
            "width:400px;height:300px;",
        ));
        let found = find_macros(&doc);
        assert_eq!(found.len(), 1);
        let diagram = found.into_iter().next().and_then(Result::ok).expect("macro");
        assert_eq!(diagram.diagram_name, "Architecture");
        assert_eq!(diagram.width, Some(400));
        assert_eq!(diagram.height, Some(300));
    }

    #[test]
    fn attribute_name_and_dimensions_take_precedence() {
        let doc = Document::parse(
            r#"<div data-macro-name="DrawIO" data-diagram-name="Flow" data-width="640" data-height="480px"></div>"#,
        );
        let diagram = find_macros(&doc)
            .into_iter()
            .next()
            .and_then(Result::ok)
            .expect("macro");
        assert_eq!(diagram.diagram_name, "Flow");
        assert_eq!((diagram.width, diagram.height), (Some(640), Some(480)));
    }

    #[test]
    fn undecodable_payload_is_reported() {
        let doc = Document::parse(
            r#"<div data-macro-name="drawio"><div id="drawio-macro-data-x">!!not base64!!</div></div>"#,
        );
        let found = find_macros(&doc);
        assert!(matches!(
            found.as_slice(),
            [Err(ItemError::DiagramExport { .. })]
        ));
    }

    #[test]
    fn resolved_macro_becomes_sized_image() {
        let wiki = FakeWiki::new()
            .with_attachment("notes.png", "/download/attachments/42/notes.png")
            .with_attachment(
                "Architecture.drawio.png",
                "/download/attachments/42/Architecture.drawio.png?version=2",
            );
        let doc = Document::parse(&format!(
            "<h1>Intro</h1>{}<p>after</p>",
            drawio_macro(r#"{"diagramName":"Architecture"}"#, "width:400px;height:300px;")
        ));

        let (doc, report) = resolve(doc, &wiki, "42");

        assert_eq!(report, DiagramReport { resolved: 1, failed: 0 });
        assert!(find_macros(&doc).is_empty());
        let img = doc.select(|element| element.name() == "img")[0];
        assert_eq!(
            doc.attr(img, "src"),
            Some("https://wiki.example.com/wiki/download/attachments/42/Architecture.drawio.png?version=2")
        );
        assert_eq!(doc.attr(img, "alt"), Some("Architecture.drawio.png"));
        assert_eq!(doc.attr(img, "width"), Some("400"));
        assert_eq!(doc.attr(img, "height"), Some("300"));
        assert!(doc.to_html().contains("<p>after</p>"));
        assert_eq!(wiki.calls(), vec!["attachments 42"]);
    }

    #[test]
    fn missing_export_leaves_macro_untouched() {
        let wiki = FakeWiki::new().with_attachment("other.png", "/download/other.png");
        let doc = Document::parse(&format!(
            "{}<p>kept</p>",
            drawio_macro(r#"{"diagramName":"Missing"}"#, "")
        ));

        let (doc, report) = resolve(doc, &wiki, "42");

        assert_eq!(report, DiagramReport { resolved: 0, failed: 1 });
        assert_eq!(find_macros(&doc).len(), 1);
        assert!(doc.select(|element| element.name() == "img").is_empty());
        assert!(doc.to_html().contains("<p>kept</p>"));
    }

    #[test]
    fn listing_failure_fails_every_macro_with_one_request() {
        let wiki = FakeWiki::new();
        let doc = Document::parse(
            r#"<div data-macro-name="drawio" data-diagram-name="A"></div>
               <div data-macro-name="drawio" data-diagram-name="B"></div>"#,
        );

        let (_, report) = resolve(doc, &wiki, "42");

        assert_eq!(report, DiagramReport { resolved: 0, failed: 2 });
        assert_eq!(wiki.calls(), vec!["attachments 42"]);
    }

    #[test]
    fn page_without_macros_makes_no_requests() {
        let wiki = FakeWiki::new();
        let (_, report) = resolve(Document::parse("<p>plain</p>"), &wiki, "42");
        assert_eq!(report, DiagramReport::default());
        assert!(wiki.calls().is_empty());
    }

    #[test]
    fn export_title_candidates() {
        assert_eq!(export_titles("Flow"), vec!["Flow.png", "Flow.drawio.png"]);
        assert_eq!(export_titles("Flow.png"), vec!["Flow.png"]);
    }
}

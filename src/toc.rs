//! Heading normalization and table-of-contents macro expansion.
//!
//! Headings are first normalized: heading-numbering prefixes are merged into
//! the text, and levels never jump more than one below the previous heading.
//! `data-macro-name="toc"` elements are then swapped for a plain-text
//! placeholder, which is later replaced by a Markdown list of the page's
//! headings linking to GitHub-style anchors.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use crate::document::Document;

const TOC_MACRO: &str = "toc";
const PLACEHOLDER_PREFIX: &str = "WIKITOMDTOCPLACEHOLDER";
const NUMBERING_ATTR: &str = "data-nh-numbering";
const NUMBERING_CLASS: &str = "nh-number";

static NUMBERED_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)*").expect("valid regex"));

static SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SLUG_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static SLUG_DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub text: String,
    pub anchor: String,
}

/// Merges numbering prefixes into heading text and clamps heading levels so
/// that no heading is more than one level below the one before it.
pub fn normalize_headings(document: &mut Document) {
    let mut last_level = 0;
    for id in document.select(|element| heading_level(element.name()).is_some()) {
        let Some(element) = document.element(id) else {
            continue;
        };
        let Some(tag_level) = heading_level(element.value().name()) else {
            continue;
        };
        let text = heading_text(element);
        let prefix = numbering_prefix(element);

        let level = match last_level {
            0 => tag_level,
            last => tag_level.min(last + 1),
        };
        last_level = level;

        if level != tag_level {
            document.rename(id, &format!("h{level}"));
        }
        if !prefix.is_empty() && !NUMBERED_TEXT.is_match(&text) {
            document.set_text(id, format!("{prefix}{text}").trim());
        }
    }
}

/// `data-nh-numbering` followed by the `<span class="nh-number">` text when
/// the attribute does not already contain it.
fn numbering_prefix(heading: ElementRef<'_>) -> String {
    let mut prefix = heading
        .value()
        .attr(NUMBERING_ATTR)
        .unwrap_or_default()
        .to_owned();

    let span = heading
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| {
            element.value().name() == "span"
                && element.value().classes().any(|class| class == NUMBERING_CLASS)
        });
    if let Some(span) = span {
        let number = span.text().collect::<String>();
        let number = number.trim();
        if !number.is_empty() && !prefix.contains(number) {
            prefix.push_str(number);
        }
    }
    prefix
}

fn heading_text(heading: ElementRef<'_>) -> String {
    heading
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `h1`..`h6` in document order, with unique anchors.
pub fn collect_headings(document: &Document) -> Vec<Heading> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    document
        .select(|element| heading_level(element.name()).is_some())
        .into_iter()
        .filter_map(|id| document.element(id))
        .filter_map(|element| {
            let level = heading_level(element.value().name())?;
            let text = heading_text(element);
            if text.is_empty() {
                return None;
            }

            let slug = slugify(&text);
            let count = seen.entry(slug.clone()).or_insert(0);
            let anchor = match *count {
                0 => slug,
                n => format!("{slug}-{n}"),
            };
            *count += 1;

            Some(Heading {
                level,
                text,
                anchor,
            })
        })
        .collect()
}

/// Replaces every TOC macro with a placeholder paragraph; returns the
/// placeholders in document order.
pub fn insert_placeholders(document: &mut Document) -> Vec<String> {
    let macros = document.select(|element| {
        element
            .attr("data-macro-name")
            .is_some_and(|name| name.trim().eq_ignore_ascii_case(TOC_MACRO))
    });

    macros
        .into_iter()
        .enumerate()
        .map(|(index, id)| {
            let placeholder = format!("{PLACEHOLDER_PREFIX}{index}");
            document.replace_with_paragraph(id, &placeholder);
            placeholder
        })
        .collect()
}

pub fn render(headings: &[Heading]) -> String {
    headings
        .iter()
        .map(|heading| {
            let indent = "  ".repeat(heading.level.saturating_sub(1));
            format!("{indent}- [{}](#{})", heading.text, heading.anchor)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitutes the rendered list for each placeholder.
pub fn fill(markdown: &str, placeholders: &[String], headings: &[Heading]) -> String {
    if placeholders.is_empty() {
        return markdown.to_owned();
    }
    let toc = render(headings);
    // Highest index first so `..1` never matches inside `..10`.
    placeholders
        .iter()
        .rev()
        .fold(markdown.to_owned(), |acc, placeholder| {
            acc.replace(placeholder.as_str(), &toc)
        })
}

/// GitHub-like anchor: "Background Info" -> "background-info".
pub fn slugify(text: &str) -> String {
    let slug = text.trim().to_lowercase();
    let slug = SLUG_STRIP.replace_all(&slug, "");
    let slug = SLUG_SPACES.replace_all(&slug, "-");
    SLUG_DASHES.replace_all(&slug, "-").into_owned()
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

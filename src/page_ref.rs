use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::Error;

/// Path segments that mark the start of a page path; anything before them is
/// the wiki's context path (`/wiki` on Cloud, `/confluence` on some servers).
const PAGE_PATH_MARKERS: [&str; 3] = ["pages", "display", "spaces"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    Id(String),
    SpaceTitle { space_key: String, title: String },
}

/// Where a page lives: the API root plus how to address the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReference {
    /// Origin plus context path, without a trailing slash.
    pub base_url: Url,
    pub target: PageTarget,
}

impl PageReference {
    /// Recognized layouts:
    ///
    /// - `.../pages/viewpage.action?pageId=123`
    /// - `.../pages/viewpage.action?spaceKey=KEY&title=Some+Title`
    /// - `.../spaces/KEY/pages/123/Some+Title`
    /// - `.../display/KEY/Some+Title`
    pub fn parse(page_url: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidPageUrl {
            url: page_url.to_owned(),
            reason: reason.to_owned(),
        };

        let url = Url::parse(page_url.trim()).map_err(|err| invalid(&err.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let marker = segments
            .iter()
            .position(|segment| PAGE_PATH_MARKERS.contains(segment))
            .ok_or_else(|| invalid("no pages/, display/ or spaces/ path segment"))?;

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);
        base_url.set_path(&segments[..marker].join("/"));
        let base_url = Url::parse(base_url.as_str().trim_end_matches('/'))
            .map_err(|err| invalid(&err.to_string()))?;

        let query_value = |key: &str| {
            url.query_pairs()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(page_id) = query_value("pageId") {
            return Ok(Self {
                base_url,
                target: PageTarget::Id(page_id),
            });
        }

        let rest = &segments[marker..];
        let target = match rest {
            ["pages", "viewpage.action", ..] => {
                match (query_value("spaceKey"), query_value("title")) {
                    (Some(space_key), Some(title)) => PageTarget::SpaceTitle { space_key, title },
                    _ => {
                        return Err(invalid(
                            "neither pageId nor spaceKey + title found in the query",
                        ));
                    }
                }
            }
            ["spaces", _, "pages", id, ..] if is_page_id(id) => PageTarget::Id((*id).to_owned()),
            ["spaces", space_key, "pages", title, ..] | ["display", space_key, title, ..] => {
                PageTarget::SpaceTitle {
                    space_key: decode_segment(space_key),
                    title: decode_segment(title),
                }
            }
            ["pages", id, ..] if is_page_id(id) => PageTarget::Id((*id).to_owned()),
            _ => return Err(invalid("not enough path segments to locate a page")),
        };

        Ok(Self { base_url, target })
    }

    /// URL of a REST API resource, e.g. `api_url("content/123")`.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/rest/api/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn is_page_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Path segments encode spaces as `+` in display URLs.
fn decode_segment(segment: &str) -> String {
    let plus_decoded = segment.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

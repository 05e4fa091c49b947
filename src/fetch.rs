use crate::client::WikiApi;
use crate::error::Error;
use crate::formats::Page;
use crate::page_ref::{PageReference, PageTarget};

/// Title and HTML body of the page being converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub id: String,
    pub title: String,
    pub body_html: String,
}

impl From<Page> for PageContent {
    fn from(page: Page) -> Self {
        let body = page.body.unwrap_or_default();
        let body_html = body
            .view
            .filter(|view| !view.value.trim().is_empty())
            .or(body.storage)
            .map(|body| body.value)
            .unwrap_or_default();

        let title = match page.title.trim() {
            "" => page.id.clone(),
            title => title.to_owned(),
        };

        Self {
            id: page.id,
            title,
            body_html,
        }
    }
}

pub fn fetch_page(api: &impl WikiApi, page: &PageReference) -> Result<PageContent, Error> {
    let fetched = match &page.target {
        PageTarget::Id(page_id) => api.page_by_id(page_id)?,
        PageTarget::SpaceTitle { space_key, title } => api
            .find_page(space_key, title)?
            .ok_or_else(|| Error::PageNotFound {
                what: format!("page {title:?} in space {space_key}"),
            })?,
    };

    let content = PageContent::from(fetched);
    tracing::info!(
        page_id = %content.id,
        title = %content.title,
        body_bytes = content.body_html.len(),
        "fetched page"
    );
    Ok(content)
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::client::fake::FakeWiki;
    use crate::formats::{Body, BodyValue};

    fn page(id: &str, title: &str, storage: Option<&str>, view: Option<&str>) -> Page {
        Page {
            id: id.to_owned(),
            title: title.to_owned(),
            body: Some(Body {
                storage: storage.map(|value| BodyValue {
                    value: value.to_owned(),
                }),
                view: view.map(|value| BodyValue {
                    value: value.to_owned(),
                }),
            }),
        }
    }

    fn reference(target: PageTarget) -> PageReference {
        PageReference {
            base_url: Url::parse("https://wiki.example.com/wiki").expect("url"),
            target,
        }
    }

    #[test]
    fn fetch_by_id_prefers_rendered_body() -> anyhow::Result<()> {
        let mut wiki = FakeWiki::new();
        wiki.pages.push(page(
            "42",
            "Onboarding Guide",
            Some("<ac:image/>"),
            Some("<p><img src=\"/a.png\"></p>"),
        ));

        let content = fetch_page(&wiki, &reference(PageTarget::Id("42".to_owned())))?;
        assert_eq!(content.title, "Onboarding Guide");
        assert_eq!(content.body_html, "<p><img src=\"/a.png\"></p>");
        assert_eq!(wiki.calls(), vec!["page 42"]);
        Ok(())
    }

    #[test]
    fn storage_body_is_used_when_view_is_missing() {
        let content = PageContent::from(page("1", "T", Some("<p>raw</p>"), None));
        assert_eq!(content.body_html, "<p>raw</p>");
    }

    #[test]
    fn empty_title_falls_back_to_page_id() {
        let content = PageContent::from(page("77", "  ", None, None));
        assert_eq!(content.title, "77");
        assert_eq!(content.body_html, "");
    }

    #[test]
    fn title_lookup_without_match_is_not_found() {
        let wiki = FakeWiki::new();
        let err = fetch_page(
            &wiki,
            &reference(PageTarget::SpaceTitle {
                space_key: "ENG".to_owned(),
                title: "Missing".to_owned(),
            }),
        )
        .expect_err("no page");
        assert!(matches!(err, Error::PageNotFound { .. }));
        assert_eq!(wiki.calls(), vec!["search ENG/Missing"]);
    }
}

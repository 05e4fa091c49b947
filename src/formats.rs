//! Wire types of the wiki REST API (only the fields this tool reads).

use serde::Deserialize;

/// `GET /rest/api/content/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Body {
    /// Raw storage format.
    #[serde(default)]
    pub storage: Option<BodyValue>,
    /// Rendered HTML; carries `<img>` elements and macro `<div>`s.
    #[serde(default)]
    pub view: Option<BodyValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BodyValue {
    pub value: String,
}

/// `GET /rest/api/content?spaceKey=..&title=..`.
#[derive(Debug, Clone, Deserialize)]
pub struct PageSearchResponse {
    #[serde(default)]
    pub results: Vec<Page>,
}

/// `GET /rest/api/content/{id}/child/attachment`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsResponse {
    #[serde(default)]
    pub results: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: String,
    /// File name of the attachment.
    pub title: String,
    #[serde(default)]
    pub metadata: AttachmentMetadata,
    #[serde(rename = "_links", default)]
    pub links: AttachmentLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentMetadata {
    #[serde(rename = "mediaType", default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentLinks {
    /// Download path relative to the wiki base URL.
    #[serde(default)]
    pub download: Option<String>,
}

/// Base64-encoded JSON stored in a drawio macro's hidden data element.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawioMacroData {
    #[serde(default)]
    pub diagram_name: String,
    #[serde(default)]
    pub preview_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_with_both_body_representations() -> anyhow::Result<()> {
        let page: Page = serde_json::from_str(
            r#"{
                "id": "42",
                "type": "page",
                "title": "Onboarding Guide",
                "body": {
                    "storage": { "value": "<p>raw</p>", "representation": "storage" },
                    "view": { "value": "<p>rendered</p>", "representation": "view" }
                },
                "version": { "number": 3 }
            }"#,
        )?;
        let body = page.body.unwrap_or_default();
        assert_eq!(page.title, "Onboarding Guide");
        assert_eq!(body.storage.map(|b| b.value).as_deref(), Some("<p>raw</p>"));
        assert_eq!(body.view.map(|b| b.value).as_deref(), Some("<p>rendered</p>"));
        Ok(())
    }

    #[test]
    fn attachment_links_and_media_type() -> anyhow::Result<()> {
        let response: AttachmentsResponse = serde_json::from_str(
            r#"{
                "results": [{
                    "id": "att1",
                    "title": "arch.drawio.png",
                    "metadata": { "mediaType": "image/png" },
                    "_links": { "download": "/download/attachments/42/arch.drawio.png?version=2" }
                }, {
                    "id": "att2",
                    "title": "notes.txt"
                }],
                "size": 2
            }"#,
        )?;
        assert_eq!(response.results.len(), 2);
        let first = &response.results[0];
        assert_eq!(first.metadata.media_type.as_deref(), Some("image/png"));
        assert_eq!(
            first.links.download.as_deref(),
            Some("/download/attachments/42/arch.drawio.png?version=2")
        );
        assert!(response.results[1].links.download.is_none());
        Ok(())
    }
}

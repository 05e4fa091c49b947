//! Blocking wiki REST API client with bearer authentication.

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::config::Config;
use crate::error::Error;
use crate::formats::{Attachment, AttachmentsResponse, Page, PageSearchResponse};
use crate::page_ref::PageReference;

const PAGE_EXPAND: &str = "body.storage,body.view,version,space";
const ATTACHMENT_PAGE_SIZE: &str = "200";

/// The API operations the pipeline stages depend on.
pub trait WikiApi {
    /// Wiki root (origin plus context path) used to resolve relative links.
    fn base_url(&self) -> &Url;

    fn page_by_id(&self, page_id: &str) -> Result<Page, Error>;

    /// First page with exactly this title in the space, if any.
    fn find_page(&self, space_key: &str, title: &str) -> Result<Option<Page>, Error>;

    /// Attachments of a page; rendered diagram exports live here.
    fn attachments(&self, page_id: &str) -> Result<Vec<Attachment>, Error>;

    /// Authenticated binary download.
    fn download(&self, url: &Url) -> Result<Vec<u8>, Error>;
}

pub struct WikiClient {
    http: Client,
    page: PageReference,
    token: String,
}

impl WikiClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            page: config.page.clone(),
            token: config.bearer_token.clone(),
        })
    }

    /// The token only goes to the wiki's own origin, never to image hosts
    /// referenced from the page.
    fn sends_token_to(&self, url: &str) -> bool {
        is_same_origin(&self.page.base_url, url)
    }

    fn get(&self, url: &str, query: &[(&str, &str)], accept: &str) -> Result<Response, Error> {
        let authenticated = self.sends_token_to(url);
        tracing::debug!(%url, authenticated, "GET");
        let mut request = self.http.get(url).query(query);
        if authenticated {
            request = request.bearer_auth(&self.token);
        }
        let response = request
            .header(ACCEPT, accept)
            .header(USER_AGENT, concat!("wiki2md/", env!("CARGO_PKG_VERSION")))
            .send()?;
        check_status(response)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let raw = self.get(url, query, "application/json")?.text()?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl WikiApi for WikiClient {
    fn base_url(&self) -> &Url {
        &self.page.base_url
    }

    fn page_by_id(&self, page_id: &str) -> Result<Page, Error> {
        let url = self.page.api_url(&format!("content/{page_id}"));
        self.get_json(&url, &[("expand", PAGE_EXPAND)])
    }

    fn find_page(&self, space_key: &str, title: &str) -> Result<Option<Page>, Error> {
        let url = self.page.api_url("content");
        let response: PageSearchResponse = self.get_json(
            &url,
            &[
                ("spaceKey", space_key),
                ("title", title),
                ("expand", PAGE_EXPAND),
            ],
        )?;
        Ok(response.results.into_iter().next())
    }

    fn attachments(&self, page_id: &str) -> Result<Vec<Attachment>, Error> {
        let url = self.page.api_url(&format!("content/{page_id}/child/attachment"));
        let response: AttachmentsResponse = self.get_json(
            &url,
            &[("expand", "version"), ("limit", ATTACHMENT_PAGE_SIZE)],
        )?;
        Ok(response.results)
    }

    fn download(&self, url: &Url) -> Result<Vec<u8>, Error> {
        let bytes = self.get(url.as_str(), &[], "*/*")?.bytes()?;
        Ok(bytes.to_vec())
    }
}

fn is_same_origin(base_url: &Url, url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| url.origin() == base_url.origin())
}

fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Authentication {
            status: status.as_u16(),
        }),
        StatusCode::NOT_FOUND => Err(Error::PageNotFound { what: url }),
        _ => {
            let body = response
                .text()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            Err(Error::ApiRequest {
                status: status.as_u16(),
                body,
            })
        }
    }
}

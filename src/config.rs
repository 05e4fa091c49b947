use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::Error;
use crate::page_ref::PageReference;

pub const BEARER_TOKEN_VAR: &str = "BEARER_TOKEN";
pub const PAGE_URL_VAR: &str = "PAGE_URL";
pub const OUTPUT_DIR_VAR: &str = "OUTPUT_DIR";
pub const PRESERVE_SIZING_VAR: &str = "PRESERVE_SIZING";

/// Per-request timeout for every API call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Subdirectory of the output directory that receives downloaded images.
pub const IMAGES_DIR_NAME: &str = "images";

/// Values read from the process environment, captured once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub bearer_token: Option<String>,
    pub page_url: Option<String>,
    pub output_dir: Option<String>,
    pub preserve_sizing: Option<String>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self {
            bearer_token: std::env::var(BEARER_TOKEN_VAR).ok(),
            page_url: std::env::var(PAGE_URL_VAR).ok(),
            output_dir: std::env::var(OUTPUT_DIR_VAR).ok(),
            preserve_sizing: std::env::var(PRESERVE_SIZING_VAR).ok(),
        }
    }
}

/// Everything a run needs, built once and passed by reference to each stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub page: PageReference,
    pub bearer_token: String,
    pub output_dir: PathBuf,
    /// Append `{: style="width:..px; height:..px;"}` to sized images.
    pub preserve_sizing: bool,
    pub request_timeout: Duration,
}

impl Config {
    pub fn new(credentials: Credentials, env: &EnvSnapshot) -> Result<Self, Error> {
        let page = PageReference::parse(&credentials.page_url)?;

        let output_dir = env
            .output_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let preserve_sizing = env
            .preserve_sizing
            .as_deref()
            .map(parse_switch)
            .unwrap_or(true);

        Ok(Self {
            page,
            bearer_token: credentials.bearer_token,
            output_dir,
            preserve_sizing,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIR_NAME)
    }
}

/// Anything other than an explicit "off" value keeps the switch on.
fn parse_switch(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

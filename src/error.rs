//! Error types for page conversion.

use std::path::PathBuf;

/// Fatal error: aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A prompt for a required value returned an empty string.
    #[error("missing {field}: prompt returned an empty value")]
    MissingCredential {
        /// Name of the value that was prompted for.
        field: &'static str,
    },

    /// Reading from the terminal failed.
    #[error("read {field} from terminal")]
    Prompt {
        field: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The page URL does not follow a recognized wiki URL layout.
    #[error("unrecognized page URL {url}: {reason}")]
    InvalidPageUrl { url: String, reason: String },

    /// The API rejected the bearer token (401/403).
    #[error("authentication rejected by wiki API (HTTP {status})")]
    Authentication {
        /// HTTP status code.
        status: u16,
    },

    /// The API reported a missing resource (404), or a title lookup matched nothing.
    #[error("not found: {what}")]
    PageNotFound { what: String },

    /// Any other non-success response.
    #[error("wiki API request failed: HTTP {status} - {body}")]
    ApiRequest {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// Network-level failure (timeout, DNS, connection refused).
    #[error("HTTP transport failure")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a payload that could not be decoded.
    #[error("invalid wiki API response")]
    InvalidResponse(#[from] serde_json::Error),

    /// Filesystem error while writing output.
    #[error("write {}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal error affecting a single diagram or image.
///
/// These are logged and counted by the stage that hits them; they never
/// abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("diagram export failed for {diagram:?}: {reason}")]
    DiagramExport { diagram: String, reason: String },

    #[error("image download failed for {url}: {reason:#}")]
    ImageDownload { url: String, reason: anyhow::Error },
}

#![forbid(unsafe_code)]

pub mod cli;
pub mod client;
pub mod config;
pub mod convert;
pub mod credentials;
pub mod diagrams;
pub mod document;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod images;
pub mod logging;
pub mod page_ref;
pub mod pipeline;
pub mod toc;
pub mod writer;

pub use error::{Error, ItemError};

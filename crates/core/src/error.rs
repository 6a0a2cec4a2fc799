//! Error types for vaultclip operations.
//!
//! Two error types mirror the two failure modes of a clip:
//!
//! * [`VaultclipError`] is fatal. The page could not be fetched, no article
//!   was found, the body serialized to nothing, or the attachment directory
//!   could not be created. It is returned from the top-level pipeline.
//! * [`ImageError`] is per image. The localizer logs it and moves on to the
//!   next image, so it never reaches the caller.
//!
//! # Example
//!
//! ```rust
//! use vaultclip_core::{VaultclipError, Result};
//!
//! fn body(markdown: &str) -> Result<&str> {
//!     let trimmed = markdown.trim();
//!     if trimmed.is_empty() {
//!         return Err(VaultclipError::EmptyBody);
//!     }
//!     Ok(trimmed)
//! }
//! # assert!(body("  ").is_err());
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for clipping operations.
#[derive(Error, Debug)]
pub enum VaultclipError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues,
    /// and non-success status codes.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// A fetch collaborator failed for a reason other than HTTP.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Invalid URL provided.
    ///
    /// Returned when a URL cannot be parsed or cannot be joined against the
    /// page URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing or rewriting errors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The extractor found no article content on the page.
    #[error("No content could be extracted from the page")]
    NoContent,

    /// The article was extracted but converted to an empty Markdown body.
    #[error("Extraction succeeded but produced an empty markdown body")]
    EmptyBody,

    /// The attachment directory could not be created.
    ///
    /// "Already exists" never produces this variant.
    #[error("Failed to create attachment directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: io::Error,
    },

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Other I/O errors (reading input files, stdin).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Failure localizing a single image.
///
/// These are recoverable: the image keeps its original attributes and the
/// batch continues.
#[derive(Error, Debug)]
pub enum ImageError {
    /// The image URL uses a scheme the fetcher cannot download.
    #[error("Unsupported image URL scheme: {url}")]
    UnsupportedScheme { url: String },

    /// Downloading the image failed.
    #[error("Image fetch failed: {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: VaultclipError,
    },

    /// Writing the image into the attachment directory failed.
    #[error("Image write failed: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Result type alias for VaultclipError.
pub type Result<T> = std::result::Result<T, VaultclipError>;

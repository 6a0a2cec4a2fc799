//! Clip web pages into Markdown notes with locally stored images.
//!
//! A clip extracts the readable article from a page, downloads its images
//! into the vault's attachment folder, and serializes the result to Markdown
//! with dedicated handling for tables (pipe tables, cleaned HTML, or TeX math).
//!
//! Most callers only need [`Clipper`]; the building blocks are public for
//! callers that bring their own pipeline.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod filename;
pub mod formatters;
pub mod fragment;
pub mod images;
pub mod parse;
pub mod pipeline;
pub mod resolve;
pub mod storage;
pub mod table;

pub use config::{ClipperConfig, ClipperConfigBuilder};
pub use error::{ImageError, Result, VaultclipError};
pub use extract::{ExtractedArticle, Extractor, SemanticExtractor};
#[cfg(feature = "fetch")]
pub use fetch::ReqwestFetcher;
pub use fetch::{FetchConfig, FetchedResource, Fetcher, fetch_file, fetch_stdin};
pub use filename::{normalize_path, sanitize_filename};
pub use formatters::{JsonConfig, JsonFormatter, MarkdownConfig, MarkdownNote, convert_to_json};
pub use formatters::{convert_html, serialize_body};
pub use fragment::ContentFragment;
pub use images::{ImageLocalizer, ImageReference, attachment_directory, ensure_directory};
pub use parse::Document;
pub use pipeline::Clipper;
pub use resolve::{absolutize_fragment_hrefs, normalize_virtual_urls, resolve_image_url, resolve_virtual};
pub use storage::{FsStorage, Storage};
pub use table::{TableKind, render_table};

//! The clip pipeline: page HTML in, vault note out.
//!
//! # Example
//!
//! ```rust,no_run
//! use vaultclip_core::{Clipper, ClipperConfig, FsStorage, ReqwestFetcher};
//!
//! # async fn run() -> vaultclip_core::Result<()> {
//! let config = ClipperConfig::default();
//! let fetcher = ReqwestFetcher::new(config.fetch.clone())?;
//! let clipper = Clipper::new(fetcher, FsStorage::new("/path/to/vault"), config);
//!
//! let note = clipper.clip("https://example.com/article", "Clippings/Article.md").await?;
//! println!("{}", note.render());
//! # Ok(())
//! # }
//! ```

use tracing::{debug, info};
use url::Url;

use crate::config::ClipperConfig;
use crate::extract::{Extractor, SemanticExtractor};
use crate::fetch::Fetcher;
use crate::formatters::markdown::{MarkdownConfig, MarkdownNote, serialize_body};
use crate::fragment::ContentFragment;
use crate::images::ImageLocalizer;
use crate::resolve::{absolutize_fragment_hrefs, normalize_virtual_urls};
use crate::storage::Storage;
use crate::{Result, VaultclipError};

/// Turns pages into notes with one fetcher, storage and extractor.
pub struct Clipper<F, S, E = SemanticExtractor> {
    fetcher: F,
    storage: S,
    extractor: E,
    config: ClipperConfig,
}

impl<F: Fetcher, S: Storage> Clipper<F, S> {
    /// Creates a clipper with the default [`SemanticExtractor`].
    pub fn new(fetcher: F, storage: S, config: ClipperConfig) -> Self {
        Self::with_extractor(fetcher, storage, SemanticExtractor, config)
    }
}

impl<F: Fetcher, S: Storage, E: Extractor> Clipper<F, S, E> {
    pub fn with_extractor(fetcher: F, storage: S, extractor: E, config: ClipperConfig) -> Self {
        Self { fetcher, storage, extractor, config }
    }

    pub fn config(&self) -> &ClipperConfig {
        &self.config
    }

    /// Fetches a page and clips it.
    pub async fn clip(&self, url: &str, note_path: &str) -> Result<MarkdownNote> {
        let page_url = parse_page_url(url)?;

        info!(target: "clip", url = %page_url, "Fetching page");
        let resource = self.fetcher.fetch(page_url.as_str()).await?;

        self.clip_html(&resource.text(), url, note_path).await
    }

    /// Clips already-fetched page HTML.
    ///
    /// `url` is the page's address; relative links and images resolve
    /// against it. `note_path` is the vault-relative path of the note the
    /// result will be written to.
    pub async fn clip_html(&self, html: &str, url: &str, note_path: &str) -> Result<MarkdownNote> {
        let page_url = parse_page_url(url)?;

        let html = absolutize_fragment_hrefs(html, &page_url)?;
        let article = self.extractor.extract(&html, &page_url).ok_or(VaultclipError::NoContent)?;
        debug!(target: "clip", title = %article.title, "Extracted article");

        let mut fragment = ContentFragment::parse(&article.content);
        normalize_virtual_urls(&mut fragment, &page_url)?;

        if self.config.fetch_images {
            ImageLocalizer::new(&self.fetcher, &self.storage, &self.config)
                .localize(&mut fragment, &page_url, note_path)
                .await?;
        }

        let body = serialize_body(&fragment, &MarkdownConfig { render_images: self.config.fetch_images })?;
        info!(target: "clip", title = %article.title, "Clipped page");

        Ok(MarkdownNote::new(article.title, &page_url, body))
    }
}

fn parse_page_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| VaultclipError::InvalidUrl(format!("{url}: {e}")))?;
    if parsed.host_str().is_none() {
        return Err(VaultclipError::InvalidUrl(format!("{url}: page URL has no host")));
    }
    Ok(parsed)
}

//! Image localization.
//!
//! Downloads every image of a content fragment into the vault's attachment
//! directory and rewrites the fragment to point at the local copies.
//! Images are processed one at a time from a task queue; a failed image is
//! logged and left as it was, it never aborts the batch.
//!
//! The fragment is read with `scraper` and rewritten with `lol_html`. To tie
//! the two together, every `img` and `a` is first tagged with a transient
//! index attribute; the final rewrite applies the edits by index and strips
//! the tags again.

use std::collections::{HashMap, VecDeque};
use std::io;

use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClipperConfig;
use crate::error::ImageError;
use crate::fetch::Fetcher;
use crate::filename::{normalize_path, sanitize_filename};
use crate::fragment::ContentFragment;
use crate::resolve::{is_remote, resolve_image_url};
use crate::storage::Storage;
use crate::{Result, VaultclipError};

const IMAGE_INDEX_ATTR: &str = "data-vaultclip-image";
const LINK_INDEX_ATTR: &str = "data-vaultclip-link";

/// Computes the vault-relative attachment directory for a note.
///
/// A non-empty `attachment_folder` wins. Otherwise the default folder is
/// placed next to the note, or at the vault root for a note without a parent.
///
/// ```rust
/// use vaultclip_core::{ClipperConfig, images::attachment_directory};
///
/// let config = ClipperConfig::default();
/// assert_eq!(attachment_directory(&config, "Notes/Test.md"), "Notes/Attachments");
/// assert_eq!(attachment_directory(&config, "Test.md"), "Attachments");
/// ```
pub fn attachment_directory(config: &ClipperConfig, note_path: &str) -> String {
    let override_folder = config.attachment_folder.trim().trim_start_matches('/');
    let default_folder = config.default_attachment_folder.trim().trim_start_matches('/');
    let note_parent = note_path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or_default();

    let directory = if !override_folder.is_empty() {
        override_folder.to_string()
    } else if !note_parent.is_empty() {
        format!("{note_parent}/{default_folder}")
    } else {
        default_folder.to_string()
    };

    normalize_path(&directory)
}

/// Creates the attachment directory, treating "already exists" as success.
pub async fn ensure_directory<S: Storage>(storage: &S, path: &str) -> Result<()> {
    match storage.create_dir(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(target: "image", "{path} already exists");
            Ok(())
        }
        Err(source) => Err(VaultclipError::Directory { path: path.to_string(), source }),
    }
}

/// One successfully localized image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// The `src` value as found in the fragment.
    pub source_attribute: String,
    pub resolved_url: Url,
    /// Vault-relative path the bytes were written to.
    pub local_path: String,
}

#[derive(Debug)]
struct ImageTask {
    index: usize,
    src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkAction {
    RemoveHref,
    SetHref(String),
}

/// Rewrites a fragment's images to local attachments.
pub struct ImageLocalizer<'a, F, S> {
    fetcher: &'a F,
    storage: &'a S,
    config: &'a ClipperConfig,
}

impl<'a, F: Fetcher, S: Storage> ImageLocalizer<'a, F, S> {
    pub fn new(fetcher: &'a F, storage: &'a S, config: &'a ClipperConfig) -> Self {
        Self { fetcher, storage, config }
    }

    /// Localizes every image in the fragment.
    ///
    /// Only directory creation failures are returned; per-image failures are
    /// logged under the `image` target.
    pub async fn localize(&self, fragment: &mut ContentFragment, page_url: &Url, note_path: &str) -> Result<()> {
        let directory = attachment_directory(self.config, note_path);
        ensure_directory(self.storage, &directory).await?;

        tag_elements(fragment)?;
        let (mut queue, anchors) = scan_fragment(fragment)?;
        let original_sources: HashMap<usize, String> = queue.iter().map(|t| (t.index, t.src.clone())).collect();

        info!(target: "image", count = queue.len(), directory = %directory, "Localizing images");

        let mut localized: HashMap<usize, String> = HashMap::new();
        while let Some(task) = queue.pop_front() {
            if is_inside_directory(&task.src, &directory) {
                debug!(target: "image", src = %task.src, "Already local, skipping");
                continue;
            }

            let resolved = match resolve_image_url(&task.src, page_url) {
                Ok(url) => url,
                Err(e) => {
                    debug!(target: "image", "Skipping image: {e}");
                    continue;
                }
            };

            match self.download(&task.src, resolved, &directory).await {
                Ok(reference) => {
                    debug!(target: "image", src = %reference.source_attribute, path = %reference.local_path, "Localized image");
                    localized.insert(task.index, reference.local_path);
                }
                Err(e) => warn!(target: "image", src = %task.src, "{e}"),
            }
        }

        let links: HashMap<usize, LinkAction> = anchors
            .into_iter()
            .filter_map(|(link, image)| {
                // Only a vault-local image may replace the link target.
                let action = match localized.get(&image) {
                    Some(local) => LinkAction::SetHref(local.clone()),
                    None => {
                        let src = original_sources.get(&image)?;
                        if is_inside_directory(src, &directory) {
                            LinkAction::SetHref(src.clone())
                        } else {
                            LinkAction::RemoveHref
                        }
                    }
                };
                Some((link, action))
            })
            .collect();

        apply_edits(fragment, &localized, &links)
    }

    async fn download(&self, src: &str, resolved_url: Url, directory: &str) -> std::result::Result<ImageReference, ImageError> {
        if !matches!(resolved_url.scheme(), "http" | "https") {
            return Err(ImageError::UnsupportedScheme { url: resolved_url.to_string() });
        }

        let resource = self
            .fetcher
            .fetch(resolved_url.as_str())
            .await
            .map_err(|source| ImageError::Fetch { url: src.to_string(), source })?;

        let name = sanitize_filename(&file_name_for(&resolved_url));
        let local_path = normalize_path(&format!("{directory}/{name}"));

        self.storage
            .write_bytes(&local_path, &resource.bytes)
            .await
            .map_err(|source| ImageError::Write { path: local_path.clone(), source })?;

        Ok(ImageReference { source_attribute: src.to_string(), resolved_url, local_path })
    }
}

/// Last path segment of the URL, with `.img` appended when it has no extension.
fn file_name_for(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");

    if segment.contains('.') { segment.to_string() } else { format!("{segment}.img") }
}

fn is_inside_directory(src: &str, directory: &str) -> bool {
    !is_remote(src) && normalize_path(src).starts_with(&format!("{directory}/"))
}

fn tag_elements(fragment: &mut ContentFragment) -> Result<()> {
    let mut images = 0usize;
    let mut links = 0usize;

    fragment.rewrite(lol_html::Settings {
        element_content_handlers: vec![
            lol_html::element!("img", |el| {
                el.set_attribute(IMAGE_INDEX_ATTR, &images.to_string()).ok();
                images += 1;
                Ok(())
            }),
            lol_html::element!("a", |el| {
                el.set_attribute(LINK_INDEX_ATTR, &links.to_string()).ok();
                links += 1;
                Ok(())
            }),
        ],
        ..Default::default()
    })
}

/// Image tasks in document order, plus `(link index, image index)` for every
/// anchor whose first element child is an image.
fn scan_fragment(fragment: &ContentFragment) -> Result<(VecDeque<ImageTask>, Vec<(usize, usize)>)> {
    let doc = fragment.document();

    let tasks: VecDeque<ImageTask> = doc
        .select(&format!("img[{IMAGE_INDEX_ATTR}]"))?
        .iter()
        .filter_map(|img| {
            let index = img.attr(IMAGE_INDEX_ATTR)?.parse().ok()?;
            let src = img.attr("src").filter(|s| !s.trim().is_empty())?;
            Some(ImageTask { index, src: src.to_string() })
        })
        .collect();

    let anchors: Vec<(usize, usize)> = doc
        .select(&format!("a[{LINK_INDEX_ATTR}]"))?
        .iter()
        .filter_map(|a| {
            let link = a.attr(LINK_INDEX_ATTR)?.parse().ok()?;
            let first = a.children().into_iter().next()?;
            if first.tag_name() != "img" {
                return None;
            }
            let image = first.attr(IMAGE_INDEX_ATTR)?.parse().ok()?;
            Some((link, image))
        })
        .collect();

    Ok((tasks, anchors))
}

fn apply_edits(
    fragment: &mut ContentFragment, localized: &HashMap<usize, String>, links: &HashMap<usize, LinkAction>,
) -> Result<()> {
    fragment.rewrite(lol_html::Settings {
        element_content_handlers: vec![
            lol_html::element!("img", |el| {
                let index = el.get_attribute(IMAGE_INDEX_ATTR).and_then(|i| i.parse::<usize>().ok());
                el.remove_attribute(IMAGE_INDEX_ATTR);

                if let Some(path) = index.and_then(|i| localized.get(&i)) {
                    el.set_attribute("src", path).ok();
                    el.remove_attribute("srcset");
                }
                Ok(())
            }),
            lol_html::element!("a", |el| {
                let index = el.get_attribute(LINK_INDEX_ATTR).and_then(|i| i.parse::<usize>().ok());
                el.remove_attribute(LINK_INDEX_ATTR);

                match index.and_then(|i| links.get(&i)) {
                    Some(LinkAction::RemoveHref) => el.remove_attribute("href"),
                    Some(LinkAction::SetHref(path)) => {
                        el.set_attribute("href", path).ok();
                    }
                    None => {}
                }
                Ok(())
            }),
        ],
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedResource;
    use std::sync::Mutex;

    const IMAGE_HEAVY_HTML: &str = r#"
        <h1>Images Fixture</h1>
        <p>Image handling branch fixture.</p>
        <a href="src"><img src="/assets/first.jpg" alt="First"></a>
        <img src="https://mock.separate.foo/assets/second" alt="Second" title="No extension">
        <img src="third-250.png" srcset="third-250.png 1x, third-500.png 2x">
        <img src="bad::url" alt="Invalid">
    "#;

    #[derive(Default)]
    struct MockFetcher {
        requests: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl MockFetcher {
        fn failing(urls: &[&str]) -> Self {
            Self { requests: Mutex::default(), failing: urls.iter().map(|u| u.to_string()).collect() }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedResource> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.failing.iter().any(|f| f == url) {
                return Err(VaultclipError::Fetch { url: url.to_string(), reason: "Network Error".to_string() });
            }
            Ok(FetchedResource { url: url.to_string(), bytes: b"bytes".to_vec() })
        }
    }

    #[derive(Default)]
    struct MockStorage {
        dirs: Mutex<Vec<String>>,
        writes: Mutex<Vec<String>>,
        create_error: Option<io::ErrorKind>,
        failing_writes: Vec<String>,
    }

    impl MockStorage {
        fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl Storage for MockStorage {
        async fn create_dir(&self, path: &str) -> io::Result<()> {
            self.dirs.lock().unwrap().push(path.to_string());
            match self.create_error {
                Some(kind) => Err(io::Error::new(kind, "create_dir failed")),
                None => Ok(()),
            }
        }

        async fn write_bytes(&self, path: &str, _bytes: &[u8]) -> io::Result<()> {
            if self.failing_writes.iter().any(|p| p == path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.writes.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    fn page() -> Url {
        Url::parse("https://mock.sample.foo/").unwrap()
    }

    async fn run(
        html: &str, fetcher: &MockFetcher, storage: &MockStorage, config: &ClipperConfig, note: &str,
    ) -> Result<ContentFragment> {
        let mut fragment = ContentFragment::parse(html);
        ImageLocalizer::new(fetcher, storage, config).localize(&mut fragment, &page(), note).await?;
        Ok(fragment)
    }

    fn sources(fragment: &ContentFragment) -> Vec<Option<String>> {
        let doc = fragment.document();
        doc.select("img").unwrap().iter().map(|img| img.attr("src").map(str::to_string)).collect()
    }

    #[test]
    fn test_attachment_directory() {
        let config = ClipperConfig::default();
        assert_eq!(attachment_directory(&config, "Notes/Test.md"), "Notes/Attachments");
        assert_eq!(attachment_directory(&config, "Deep/Nested/Test.md"), "Deep/Nested/Attachments");
        assert_eq!(attachment_directory(&config, "Test.md"), "Attachments");

        let config = ClipperConfig::builder().attachment_folder("  /MyResources/Images ").build();
        assert_eq!(attachment_directory(&config, "Notes/Test.md"), "MyResources/Images");
    }

    #[test]
    fn test_file_name_for() {
        let name = |u: &str| file_name_for(&Url::parse(u).unwrap());
        assert_eq!(name("https://host/assets/second"), "second.img");
        assert_eq!(name("https://host/assets/first.jpg?w=200"), "first.jpg");
        assert_eq!(name("https://host/"), "image.img");
        assert_eq!(name("https://host/dir/"), "image.img");
    }

    #[tokio::test]
    async fn test_requests_each_image_by_absolute_url() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let config = ClipperConfig::default();

        run(IMAGE_HEAVY_HTML, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert_eq!(
            fetcher.requests(),
            vec![
                "https://mock.sample.foo/assets/first.jpg",
                "https://mock.separate.foo/assets/second",
                "https://mock.sample.foo/third-250.png",
            ]
        );
        assert_eq!(storage.dirs.lock().unwrap().as_slice(), ["Notes/Attachments"]);
    }

    #[tokio::test]
    async fn test_rewrites_sources_and_drops_srcset() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let config = ClipperConfig::default();

        let fragment = run(IMAGE_HEAVY_HTML, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert_eq!(
            storage.writes(),
            vec!["Notes/Attachments/first.jpg", "Notes/Attachments/second.img", "Notes/Attachments/third-250.png"]
        );
        assert_eq!(
            sources(&fragment),
            vec![
                Some("Notes/Attachments/first.jpg".to_string()),
                Some("Notes/Attachments/second.img".to_string()),
                Some("Notes/Attachments/third-250.png".to_string()),
                Some("bad::url".to_string()),
            ]
        );

        let html = fragment.as_html();
        assert!(!html.contains("srcset"));
        assert!(!html.contains(IMAGE_INDEX_ATTR));
        assert!(!html.contains(LINK_INDEX_ATTR));
    }

    #[tokio::test]
    async fn test_sanitizes_filename_before_writing() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let config = ClipperConfig::default();
        let html = r#"<img src="https://mock.sample.foo/assets/unsafe%3Cname%3E:bad.img">"#;

        run(html, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert_eq!(storage.writes(), vec!["Notes/Attachments/unsafe<name>_bad.img"]);
    }

    #[tokio::test]
    async fn test_skips_images_without_src() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let config = ClipperConfig::default();
        let html = r#"<img alt="none"><img src="" alt="empty"><img src="app://mock.sample.com/media/real.png">"#;

        let fragment = run(html, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert_eq!(fetcher.requests(), vec!["https://mock.sample.com/media/real.png"]);
        assert_eq!(sources(&fragment)[0], None);
        assert_eq!(sources(&fragment)[1], Some(String::new()));
    }

    #[tokio::test]
    async fn test_override_folder() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let config = ClipperConfig::builder().attachment_folder("MyResources/Images").build();
        let html = r#"<img src="https://mock.sample.com/media/photo.png">"#;

        run(html, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert_eq!(storage.writes(), vec!["MyResources/Images/photo.png"]);
    }

    #[tokio::test]
    async fn test_note_without_parent_uses_root_folder() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let config = ClipperConfig::default();
        let html = r#"<img src="https://mock.sample.com/media/photo.png">"#;

        run(html, &fetcher, &storage, &config, "Test.md").await.unwrap();

        assert_eq!(storage.writes(), vec!["Attachments/photo.png"]);
    }

    #[tokio::test]
    async fn test_existing_directory_is_not_an_error() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage { create_error: Some(io::ErrorKind::AlreadyExists), ..Default::default() };
        let config = ClipperConfig::default();

        run(IMAGE_HEAVY_HTML, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert_eq!(fetcher.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_directory_failure_is_fatal() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage { create_error: Some(io::ErrorKind::PermissionDenied), ..Default::default() };
        let config = ClipperConfig::default();

        let result = run(IMAGE_HEAVY_HTML, &fetcher, &storage, &config, "Notes/Test.md").await;

        assert!(matches!(result, Err(VaultclipError::Directory { .. })));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_continues_with_remaining_images() {
        let fetcher = MockFetcher::failing(&["https://mock.sample.foo/assets/first.jpg"]);
        let storage = MockStorage::default();
        let config = ClipperConfig::default();

        let fragment = run(IMAGE_HEAVY_HTML, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert_eq!(fetcher.requests().len(), 3);
        let srcs = sources(&fragment);
        assert_eq!(srcs[0], Some("/assets/first.jpg".to_string()));
        assert_eq!(srcs[1], Some("Notes/Attachments/second.img".to_string()));
    }

    #[tokio::test]
    async fn test_write_failure_leaves_image_unmodified() {
        let fetcher = MockFetcher::default();
        let storage =
            MockStorage { failing_writes: vec!["Notes/Attachments/second.img".to_string()], ..Default::default() };
        let config = ClipperConfig::default();

        let fragment = run(IMAGE_HEAVY_HTML, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        let srcs = sources(&fragment);
        assert_eq!(srcs[1], Some("https://mock.separate.foo/assets/second".to_string()));
        assert_eq!(srcs[2], Some("Notes/Attachments/third-250.png".to_string()));
    }

    #[tokio::test]
    async fn test_rerun_performs_no_fetches() {
        let config = ClipperConfig::default();
        let first = run(IMAGE_HEAVY_HTML, &MockFetcher::default(), &MockStorage::default(), &config, "Notes/Test.md")
            .await
            .unwrap();

        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let second = run(first.as_html(), &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        assert!(fetcher.requests().is_empty());
        assert!(storage.writes().is_empty());
        assert_eq!(sources(&second), sources(&first));
    }

    #[tokio::test]
    async fn test_link_wrapping_local_image_points_at_it() {
        let fetcher = MockFetcher::default();
        let storage = MockStorage::default();
        let config = ClipperConfig::default();

        let fragment = run(IMAGE_HEAVY_HTML, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        let doc = fragment.document();
        let links = doc.select("a").unwrap();
        assert_eq!(links[0].attr("href"), Some("Notes/Attachments/first.jpg"));
    }

    #[tokio::test]
    async fn test_link_wrapping_remote_image_loses_href() {
        let fetcher = MockFetcher::failing(&["https://mock.sample.foo/big.png"]);
        let storage = MockStorage::default();
        let config = ClipperConfig::default();
        let html = r#"<a href="https://mock.sample.foo/gallery"><img src="https://mock.sample.foo/big.png"></a><a href="https://x.foo"><span>text</span><img src="y.png"></a><a href="/keep"><img alt="no src"></a>"#;

        let fragment = run(html, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        let doc = fragment.document();
        let links = doc.select("a").unwrap();
        assert_eq!(links[0].attr("href"), None);
        assert_eq!(links[1].attr("href"), Some("https://x.foo"));
        assert_eq!(links[2].attr("href"), Some("/keep"));
    }

    #[tokio::test]
    async fn test_link_wrapping_unlocalized_image_loses_href() {
        let fetcher = MockFetcher::failing(&["https://mock.sample.foo/thumbs/small.jpg"]);
        let storage = MockStorage::default();
        let config = ClipperConfig::default();
        let html = r#"<a href="https://mock.sample.foo/gallery/full.jpg"><img src="/thumbs/small.jpg"></a><a href="https://mock.sample.foo/big.png"><img src="data:image/png;base64,AAAA"></a>"#;

        let fragment = run(html, &fetcher, &storage, &config, "Notes/Test.md").await.unwrap();

        let doc = fragment.document();
        let links = doc.select("a").unwrap();
        assert_eq!(links[0].attr("href"), None);
        assert_eq!(links[1].attr("href"), None);
        assert_eq!(
            sources(&fragment),
            [Some("/thumbs/small.jpg".to_string()), Some("data:image/png;base64,AAAA".to_string())]
        );
        assert!(storage.writes().is_empty());
    }
}

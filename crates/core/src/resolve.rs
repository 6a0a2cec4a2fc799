//! URL resolution for page-relative and virtual-scheme references.
//!
//! Pages clipped from inside the app carry `app://` URLs that mirror real
//! HTTP(S) resources. The reserved host maps to the page's own origin, any
//! other host maps to `https://{host}`.

use url::Url;

use crate::fragment::{ContentFragment, rewrite_html};
use crate::{Result, VaultclipError};

/// The in-app URI scheme prefix.
pub const VIRTUAL_SCHEME: &str = "app://";

/// Host under [`VIRTUAL_SCHEME`] that stands for the page's own origin.
pub const APP_HOST: &str = "obsidian.md";

/// Translates a virtual-scheme URL to an externally reachable one.
///
/// Values outside the virtual scheme are returned unchanged, as are
/// reserved-host values when the page URL cannot be parsed.
///
/// ```rust
/// use vaultclip_core::resolve::resolve_virtual;
///
/// assert_eq!(
///     resolve_virtual("app://obsidian.md/docs/x", "https://example.com/post"),
///     "https://example.com/docs/x"
/// );
/// assert_eq!(
///     resolve_virtual("app://cdn.example.org/a.png", "https://example.com/post"),
///     "https://cdn.example.org/a.png"
/// );
/// ```
pub fn resolve_virtual(value: &str, page_url: &str) -> String {
    let Some(rest) = value.strip_prefix(VIRTUAL_SCHEME) else {
        return value.to_string();
    };

    if let Some(path) = rest.strip_prefix(APP_HOST)
        && path.starts_with('/')
    {
        return match Url::parse(page_url) {
            Ok(page) => format!("{}{}", page.origin().ascii_serialization(), path),
            Err(_) => value.to_string(),
        };
    }

    format!("https://{rest}")
}

/// Whether a `src`/`href` value still points at a remote resource.
pub fn is_remote(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with(VIRTUAL_SCHEME)
}

/// Resolves an image `src` to an absolute URL against the page URL.
pub fn resolve_image_url(src: &str, page_url: &Url) -> Result<Url> {
    let translated = resolve_virtual(src.trim(), page_url.as_str());
    page_url
        .join(&translated)
        .map_err(|e| VaultclipError::InvalidUrl(format!("{src}: {e}")))
}

/// Joins every fragment-only `href` (`#section`) against the page URL.
///
/// Runs over the whole page before extraction, so in-page links survive
/// being lifted out of their document.
pub fn absolutize_fragment_hrefs(html: &str, page_url: &Url) -> Result<String> {
    rewrite_html(
        html,
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("a[href]", |el| {
                if let Some(href) = el.get_attribute("href")
                    && href.starts_with('#')
                    && let Ok(absolute) = page_url.join(&href)
                {
                    el.set_attribute("href", absolute.as_str()).ok();
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

/// Translates virtual-scheme `a[href]` and `img[src]` values in the fragment.
pub fn normalize_virtual_urls(fragment: &mut ContentFragment, page_url: &Url) -> Result<()> {
    let page = page_url.as_str();
    fragment.rewrite(lol_html::Settings {
        element_content_handlers: vec![
            lol_html::element!("a[href]", |el| {
                if let Some(href) = el.get_attribute("href")
                    && href.starts_with(VIRTUAL_SCHEME)
                {
                    el.set_attribute("href", &resolve_virtual(&href, page)).ok();
                }
                Ok(())
            }),
            lol_html::element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src")
                    && src.starts_with(VIRTUAL_SCHEME)
                {
                    el.set_attribute("src", &resolve_virtual(&src, page)).ok();
                }
                Ok(())
            }),
        ],
        ..Default::default()
    })
}

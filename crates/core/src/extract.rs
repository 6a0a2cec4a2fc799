//! Article extraction.
//!
//! The pipeline only needs a title and the article's markup, so extraction
//! sits behind the [`Extractor`] trait. [`SemanticExtractor`] is the shipped
//! default: it strips non-content tags and picks the first semantic landmark
//! that holds anything readable.

use url::Url;

use crate::fragment::rewrite_html;
use crate::parse::{Document, Element};

/// Non-content elements removed before a container is chosen.
const STRIPPED_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "canvas", "nav", "footer", "form"];

/// Content containers, in order of preference.
const CONTAINER_SELECTORS: &[&str] = &["article", "main", r#"[role="main"]"#, "body"];

/// The readable part of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    /// Inner HTML of the chosen container.
    pub content: String,
}

/// Reduces a full page to its article.
pub trait Extractor {
    /// Returns `None` when the page has no readable content.
    fn extract(&self, html: &str, page_url: &Url) -> Option<ExtractedArticle>;
}

/// Landmark-based extractor.
///
/// # Example
///
/// ```rust
/// use url::Url;
/// use vaultclip_core::extract::{Extractor, SemanticExtractor};
///
/// let html = r#"<html><head><title>Post</title></head>
///     <body><nav>Menu</nav><article><p>Hello</p></article></body></html>"#;
/// let url = Url::parse("https://example.com/post").unwrap();
///
/// let article = SemanticExtractor.extract(html, &url).unwrap();
/// assert_eq!(article.title, "Post");
/// assert_eq!(article.content, "<p>Hello</p>");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticExtractor;

impl Extractor for SemanticExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Option<ExtractedArticle> {
        let stripped = strip_non_content(html);
        let doc = Document::parse(&stripped).ok()?;

        let title = extract_title(&doc, page_url);
        let container = find_container(&doc)?;
        let content = remove_title_heading(&container, &title);

        Some(ExtractedArticle { title, content })
    }
}

/// Removes [`STRIPPED_TAGS`] and comments. Markup that fails to rewrite is
/// returned unchanged.
fn strip_non_content(html: &str) -> String {
    let handlers = STRIPPED_TAGS
        .iter()
        .map(|tag| {
            lol_html::element!(*tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    rewrite_html(
        html,
        lol_html::Settings {
            element_content_handlers: handlers,
            document_content_handlers: vec![lol_html::doc_comments!(|c| {
                c.remove();
                Ok(())
            })],
            ..Default::default()
        },
    )
    .unwrap_or_else(|_| html.to_string())
}

fn find_container(doc: &Document) -> Option<Element<'_>> {
    CONTAINER_SELECTORS.iter().find_map(|selector| {
        doc.select(selector)
            .ok()?
            .into_iter()
            .find(|el| !el.text().trim().is_empty() || el.select("img").is_ok_and(|imgs| !imgs.is_empty()))
    })
}

/// Title priority: Open Graph, Twitter card, `<title>`, first `<h1>`, page host.
fn extract_title(doc: &Document, page_url: &Url) -> String {
    doc.meta_content("og:title")
        .or_else(|| doc.meta_content("twitter:title"))
        .or_else(|| doc.title())
        .or_else(|| {
            doc.select("h1")
                .ok()?
                .first()
                .map(|h1| h1.text().trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| page_url.host_str().unwrap_or("Untitled").to_string())
}

/// Drops the container's first `<h1>` when it repeats the title, since the
/// note carries the title as its own heading.
fn remove_title_heading(container: &Element<'_>, title: &str) -> String {
    let content = container.inner_html();

    let heading = container.select("h1").ok().and_then(|h| h.into_iter().next());
    match heading {
        Some(h1) if normalize_space(&h1.text()).eq_ignore_ascii_case(&normalize_space(title)) => {
            content.replacen(&h1.outer_html(), "", 1)
        }
        _ => content,
    }
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

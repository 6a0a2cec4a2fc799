use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use htmd::options::{BulletListMarker, CodeBlockFence, CodeBlockStyle, HeadingStyle, HrStyle, Options};
use htmd::{
    Element as HtmdElement, HtmlToMarkdown,
    element_handler::{HandlerResult, Handlers},
};
use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::fragment::{ContentFragment, rewrite_html};
use crate::parse::Document;
use crate::table::render_table;
use crate::{Result, VaultclipError};

/// Transient attribute carrying a table's index between the render and convert passes.
pub const TABLE_INDEX_ATTR: &str = "data-vaultclip-table";

/// Pre-rendered tables by index. `None` falls back to the table's children.
type RenderedTables = Arc<RwLock<HashMap<usize, Option<String>>>>;

/// Configuration for Markdown conversion
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Register the image rule (`![alt](src "title")`, dropped when `src` is empty)
    pub render_images: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { render_images: true }
    }
}

/// A finished note: title heading, source link, rule, body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkdownNote {
    pub title: String,
    /// Host of the page URL, with the port when it is not the scheme default.
    pub source_host: String,
    pub source_url: String,
    pub body: String,
}

impl MarkdownNote {
    pub fn new(title: impl Into<String>, page_url: &Url, body: impl Into<String>) -> Self {
        let host = page_url.host_str().unwrap_or_default();
        let source_host = match page_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Self { title: title.into(), source_host, source_url: page_url.to_string(), body: body.into() }
    }

    /// Renders the note text.
    ///
    /// ```rust
    /// use url::Url;
    /// use vaultclip_core::MarkdownNote;
    ///
    /// let url = Url::parse("https://example.com/post").unwrap();
    /// let note = MarkdownNote::new("Title", &url, "Body text.");
    /// assert_eq!(note.render(), "# Title\n\n[example.com](https://example.com/post)\n\n---\n\nBody text.\n");
    /// ```
    pub fn render(&self) -> String {
        format!("# {}\n\n[{}]({})\n\n---\n\n{}\n", self.title, self.source_host, self.source_url, self.body)
    }
}

/// Serializes a content fragment to a trimmed Markdown body.
///
/// # Errors
///
/// Returns [`VaultclipError::EmptyBody`] when nothing but whitespace is left.
pub fn serialize_body(fragment: &ContentFragment, config: &MarkdownConfig) -> Result<String> {
    let body = convert_html(fragment.as_html(), config)?;
    let body = body.trim();

    if body.is_empty() { Err(VaultclipError::EmptyBody) } else { Ok(body.to_string()) }
}

/// Converts HTML to Markdown with the table and image rules.
///
/// Tables are rendered innermost-first before the main conversion, so a
/// nested table is already Markdown when its enclosing cell is converted.
pub fn convert_html(html: &str, config: &MarkdownConfig) -> Result<String> {
    let tagged = tag_tables(html)?;
    let rendered: RenderedTables = Arc::default();
    let converter = build_converter(config, Arc::clone(&rendered));
    let convert_cell = |cell: &str| converter.convert(cell).unwrap_or_default();

    let doc = Document::parse_fragment(&tagged);
    for table in doc.select(&format!("table[{TABLE_INDEX_ATTR}]"))?.iter().rev() {
        let Some(index) = table.attr(TABLE_INDEX_ATTR).and_then(|i| i.parse::<usize>().ok()) else {
            continue;
        };

        let markdown = rendered_or_fallback(index, render_table(table, &convert_cell));
        if let Ok(mut tables) = rendered.write() {
            tables.insert(index, markdown);
        }
    }

    converter.convert(&tagged).map_err(|e| VaultclipError::HtmlParseError(e.to_string()))
}

/// A table that failed to render falls back to its children, like an empty one.
fn rendered_or_fallback(index: usize, result: Result<Option<String>>) -> Option<String> {
    result.unwrap_or_else(|e| {
        warn!(target: "table", index, "Rendering table failed, falling back to its children: {e}");
        None
    })
}

fn tag_tables(html: &str) -> Result<String> {
    let mut count = 0usize;
    rewrite_html(
        html,
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("table", |el| {
                el.set_attribute(TABLE_INDEX_ATTR, &count.to_string()).ok();
                count += 1;
                Ok(())
            })],
            ..Default::default()
        },
    )
}

fn build_converter(config: &MarkdownConfig, rendered: RenderedTables) -> HtmlToMarkdown {
    let builder = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .options(Options {
            heading_style: HeadingStyle::Atx,
            hr_style: HrStyle::Dashes,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            code_block_fence: CodeBlockFence::Backticks,
            ..Default::default()
        })
        .add_handler(vec!["table"], move |handlers: &dyn Handlers, element: HtmdElement| {
            let entry = attribute(&element, TABLE_INDEX_ATTR)
                .and_then(|i| i.parse::<usize>().ok())
                .and_then(|index| rendered.read().ok()?.get(&index).cloned());

            match entry {
                Some(Some(content)) => Some(HandlerResult { content, markdown_translated: true }),
                Some(None) => {
                    let content = handlers.walk_children(element.node).content;
                    Some(HandlerResult { content, markdown_translated: true })
                }
                None => handlers.fallback(element),
            }
        });

    let builder = if config.render_images {
        builder.add_handler(vec!["img"], |_: &dyn Handlers, element: HtmdElement| {
            Some(HandlerResult { content: image_markdown(&element), markdown_translated: true })
        })
    } else {
        builder
    };

    builder.build()
}

fn attribute(element: &HtmdElement, name: &str) -> Option<String> {
    element.attrs.iter().find(|a| &*a.name.local == name).map(|a| a.value.to_string())
}

fn image_markdown(element: &HtmdElement) -> String {
    let src = attribute(element, "src").unwrap_or_default();
    if src.is_empty() {
        return String::new();
    }

    let alt = attribute(element, "alt").unwrap_or_default();
    let title = attribute(element, "title")
        .filter(|t| !t.is_empty())
        .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
        .unwrap_or_default();

    format!("![{alt}]({src}{title})")
}

//! HTML parsing and read-only DOM queries.
//!
//! [`Document`] wraps a parsed page or fragment, [`Element`] wraps a single
//! element of it. Both are read-only: rewriting happens on markup strings
//! through `lol_html` (see [`crate::fragment`]).
//!
//! # Example
//!
//! ```rust
//! use vaultclip_core::parse::Document;
//!
//! let doc = Document::parse_fragment(r#"<table class="ltx_equation"><tr><td>1</td></tr></table>"#);
//! let tables = doc.select("table").unwrap();
//! assert!(tables[0].has_class("ltx_equation"));
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::{Result, VaultclipError};

/// Represents a parsed HTML document or fragment.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html) })
    }

    /// Parses an HTML fragment in a `<body>` context.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html) }
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the children of the root element.
    ///
    /// For a fragment this is the fragment's own markup, normalized by the
    /// HTML5 tree builder.
    pub fn inner_html(&self) -> String {
        self.html.root_element().inner_html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`VaultclipError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Gets the content of the `<title>` element, trimmed.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Gets the `content` of a `<meta>` tag matched by `property` or `name`.
    pub fn meta_content(&self, key: &str) -> Option<String> {
        let selector = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
        self.select(&selector)
            .ok()?
            .into_iter()
            .find_map(|el| el.attr("content").map(|c| c.trim().to_string()))
            .filter(|c| !c.is_empty())
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use vaultclip_core::parse::Document;
///
/// let doc = Document::parse_fragment(r#"<a href="https://example.com"><img src="a.png"></a>"#);
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// assert_eq!(link.children()[0].tag_name(), "img");
/// ```
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Checks the `class` attribute for an exact class name.
    pub fn has_class(&self, class: &str) -> bool {
        self.element.value().classes().any(|c| c == class)
    }

    /// Gets the lowercase tag name (e.g., "div", "a", "span").
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Direct element children, in document order.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|el| Element { element: el })
            .collect()
    }

    /// Element ancestors, nearest first. Does not include this element.
    pub fn ancestors(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .map(|el| Element { element: el })
    }

    /// Nearest ancestor with the given tag name.
    pub fn closest(&self, tag: &str) -> Option<Element<'a>> {
        self.ancestors().find(|el| el.tag_name() == tag)
    }

    /// Whether both wrappers point at the same node of the same tree.
    pub fn same_node(&self, other: &Element<'_>) -> bool {
        self.element.id() == other.element.id()
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`VaultclipError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| VaultclipError::HtmlParseError(format!("Invalid selector: {}", e)))
}

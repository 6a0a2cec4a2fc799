//! The content fragment: extracted article markup owned by one clip.
//!
//! A [`ContentFragment`] is normalized on construction by running it through
//! the HTML5 tree builder and serializing it back, so the read passes
//! (`scraper`) and the rewrite passes (`lol_html`) agree on structure.
//! Rewrites take `&mut self`; a fragment is never shared between clips.

use crate::parse::Document;
use crate::{Result, VaultclipError};

/// Extracted article body, mutated in place by the resolver and localizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFragment {
    html: String,
}

impl ContentFragment {
    /// Parses and normalizes fragment markup.
    pub fn parse(html: &str) -> Self {
        Self { html: Document::parse_fragment(html).inner_html() }
    }

    /// The fragment's markup.
    pub fn as_html(&self) -> &str {
        &self.html
    }

    /// Parses the current markup for read-only queries.
    pub fn document(&self) -> Document {
        Document::parse_fragment(&self.html)
    }

    /// Rewrites the fragment in place with the given `lol_html` settings.
    ///
    /// On error the fragment is left unchanged.
    pub fn rewrite(&mut self, settings: lol_html::Settings<'_, '_>) -> Result<()> {
        self.html = rewrite_html(&self.html, settings)?;
        Ok(())
    }
}

/// Runs markup through a `lol_html` rewriter and collects the output.
pub fn rewrite_html(html: &str, settings: lol_html::Settings<'_, '_>) -> Result<String> {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(settings, |c: &[u8]| output.extend_from_slice(c));

    rewriter
        .write(html.as_bytes())
        .map_err(|e| VaultclipError::HtmlParseError(e.to_string()))?;
    rewriter.end().map_err(|e| VaultclipError::HtmlParseError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| VaultclipError::HtmlParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_markup() {
        let fragment = ContentFragment::parse("<p>Unclosed <b>bold");
        assert_eq!(fragment.as_html(), "<p>Unclosed <b>bold</b></p>");
    }

    #[test]
    fn test_rewrite_in_place() {
        let mut fragment = ContentFragment::parse(r#"<p class="x">Text</p>"#);
        fragment
            .rewrite(lol_html::Settings {
                element_content_handlers: vec![lol_html::element!("p", |el| {
                    el.remove_attribute("class");
                    Ok(())
                })],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(fragment.as_html(), "<p>Text</p>");
    }

    #[test]
    fn test_document_reads_current_markup() {
        let fragment = ContentFragment::parse(r#"<img src="a.png"><img src="b.png">"#);
        let doc = fragment.document();
        let images = doc.select("img").unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1].attr("src"), Some("b.png"));
    }
}

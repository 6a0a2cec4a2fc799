//! Table classification and rendering.
//!
//! Every table renders through exactly one of three strategies:
//!
//! * equation tables (LaTeXML output) become TeX math from `alttext`,
//! * tables with a spanning cell are kept as HTML with a reduced attribute set,
//! * everything else becomes a GitHub-style pipe table.

use crate::Result;
use crate::fragment::rewrite_html;
use crate::parse::Element;

/// Attributes kept on elements of a complex-span table.
pub const ALLOWED_TABLE_ATTRIBUTES: &[&str] = &[
    "src", "href", "style", "align", "width", "height", "rowspan", "colspan", "bgcolor", "scope", "valign", "headers",
];

const EQUATION_CLASSES: &[&str] = &["ltx_equation", "ltx_eqn_table"];
const INLINE_EQUATION_CLASS: &str = "ltx_eqn_inline";
const SPANNING_CELL_SELECTOR: &str = "td[colspan], td[rowspan], th[colspan], th[rowspan]";

/// How a table will be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Simple,
    ComplexSpan,
    Equation,
}

impl TableKind {
    /// Classifies a table. The first matching kind wins, in the order
    /// equation, complex-span, simple.
    pub fn classify(table: &Element<'_>) -> Self {
        if EQUATION_CLASSES.iter().any(|class| table.has_class(class)) {
            TableKind::Equation
        } else if table.select(SPANNING_CELL_SELECTOR).is_ok_and(|cells| !cells.is_empty()) {
            TableKind::ComplexSpan
        } else {
            TableKind::Simple
        }
    }
}

/// Renders a table to Markdown.
///
/// `convert_cell` turns a cell's inner HTML into Markdown. `None` means the
/// table has nothing to render as a pipe table and the caller should fall
/// back to its default handling of the table's children.
pub fn render_table(table: &Element<'_>, convert_cell: &dyn Fn(&str) -> String) -> Result<Option<String>> {
    match TableKind::classify(table) {
        TableKind::Equation => render_equations(table).map(Some),
        TableKind::ComplexSpan => Ok(Some(format!("\n\n{}\n\n", clean_table(&table.outer_html())?))),
        TableKind::Simple => render_pipe_table(table, convert_cell),
    }
}

fn render_equations(table: &Element<'_>) -> Result<String> {
    let expressions: Vec<String> = table
        .select("math[alttext]")?
        .iter()
        .filter_map(|math| {
            let expression = math.attr("alttext")?.trim();
            if expression.is_empty() {
                return None;
            }

            let inline = math.has_class(INLINE_EQUATION_CLASS)
                || math.ancestors().any(|el| el.has_class(INLINE_EQUATION_CLASS));

            Some(if inline { format!("${expression}$") } else { format!("\n$$\n{expression}\n$$") })
        })
        .collect();

    Ok(expressions.join("\n\n"))
}

/// Strips every attribute outside [`ALLOWED_TABLE_ATTRIBUTES`] from the
/// table element and all of its descendants.
pub fn clean_table(html: &str) -> Result<String> {
    rewrite_html(
        html,
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("*", |el| {
                let disallowed: Vec<String> = el
                    .attributes()
                    .iter()
                    .map(|attr| attr.name())
                    .filter(|name| !ALLOWED_TABLE_ATTRIBUTES.contains(&name.as_str()))
                    .collect();

                for name in disallowed {
                    el.remove_attribute(&name);
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

fn render_pipe_table(table: &Element<'_>, convert_cell: &dyn Fn(&str) -> String) -> Result<Option<String>> {
    let rows: Vec<Vec<String>> = table
        .select("tr")?
        .iter()
        .filter(|row| row.closest("table").is_some_and(|owner| owner.same_node(table)))
        .map(|row| {
            row.children()
                .iter()
                .filter(|cell| matches!(cell.tag_name().as_str(), "th" | "td"))
                .map(|cell| render_cell(&cell.inner_html(), convert_cell))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let Some((header, body)) = rows.split_first() else {
        return Ok(None);
    };

    let separator = vec!["---".to_string(); header.len()];
    let lines: Vec<String> = [header.as_slice(), separator.as_slice()]
        .into_iter()
        .chain(body.iter().map(Vec::as_slice))
        .map(pipe_row)
        .collect();

    Ok(Some(format!("\n\n{}\n\n", lines.join("\n"))))
}

fn render_cell(inner_html: &str, convert_cell: &dyn Fn(&str) -> String) -> String {
    convert_cell(inner_html).replace('\n', " ").trim().replace('|', "\\|")
}

fn pipe_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

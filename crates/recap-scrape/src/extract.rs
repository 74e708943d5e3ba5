//! Pure extraction logic over parsed HTML.
//!
//! These functions take a rendered document snapshot and pull structure out
//! of it; no I/O, so they are exercised directly in tests without a browser.

use scraper::{ElementRef, Html, Selector};

/// Case-insensitive marker for the heading that opens the plot-summary area.
const SUMMARY_MARKER: &str = "plot summary";
/// Case-insensitive marker that ends the plot-summary area.
const END_MARKER: &str = "credits";

/// Find the episode-page link for `query` in the index document.
///
/// The match is exact: the first table row whose first cell's trimmed text
/// equals the query. The link is taken from the row's third cell. Any
/// structural mismatch (no table, no row, no link) is `None`, which callers
/// treat as "not found" rather than an error.
pub fn episode_href(html: &str, query: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let row_sel = Selector::parse("table tr").ok()?;
    let cell_sel = Selector::parse("td, th").ok()?;
    let link_sel = Selector::parse("a[href]").ok()?;

    for row in doc.select(&row_sel) {
        let mut cells = row.select(&cell_sel);
        let Some(first) = cells.next() else {
            continue;
        };
        if element_text(&first) != query {
            continue;
        }
        // Third cell holds the title link; `cells` already consumed the first.
        return cells
            .nth(1)
            .and_then(|cell| cell.select(&link_sel).next())
            .and_then(|link| link.value().attr("href"))
            .map(str::to_string);
    }
    None
}

/// Extract the plot-summary text from an episode document.
///
/// Walks the siblings following the first heading containing "plot summary":
/// each subsequent heading opens a subsection, each `p` contributes its
/// trimmed text to the open subsection, and any sibling mentioning "credits"
/// ends the walk. Subsections with no content are dropped; the rest are
/// rendered as `title\ncontent` blocks separated by blank lines. `None` when
/// the heading is missing or nothing was retained.
pub fn plot_summary(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let heading_sel = Selector::parse("h1, h2, h3, h4, h5, h6").ok()?;

    let heading = doc
        .select(&heading_sel)
        .find(|h| element_text(h).to_lowercase().contains(SUMMARY_MARKER))?;

    let mut sections: Vec<(String, Vec<String>)> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    let mut node = heading.next_sibling();
    while let Some(sibling) = node {
        node = sibling.next_sibling();
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        let text = element_text(&element);
        if text.to_lowercase().contains(END_MARKER) {
            break;
        }
        if is_heading(element.value().name()) {
            close_section(&mut sections, current.take());
            current = Some((text, Vec::new()));
        } else if element.value().name() == "p" {
            if let Some((_, paragraphs)) = current.as_mut() {
                if !text.is_empty() {
                    paragraphs.push(text);
                }
            }
        }
    }
    close_section(&mut sections, current.take());

    if sections.is_empty() {
        return None;
    }
    Some(
        sections
            .iter()
            .map(|(title, paragraphs)| format!("{}\n{}", title, paragraphs.join("\n")))
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

fn close_section(sections: &mut Vec<(String, Vec<String>)>, section: Option<(String, Vec<String>)>) {
    if let Some((title, paragraphs)) = section {
        if !paragraphs.is_empty() {
            sections.push((title, paragraphs));
        }
    }
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

//! Reference article model
//!
//! A fetched article is parsed once with `scraper` into an owned, read-only
//! [`ReferenceDocument`]: title, infobox rows, body paragraphs, every outbound
//! link and the plain-text body. Nothing downstream touches HTML again.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;

// Safety: the selector and regex literals below are compile-time constants.
static FIRST_HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1#firstHeading").unwrap());
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static TR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static TH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("th").unwrap());
static TD_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static CITATION_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(?:\d+|[a-z]|note \d+|citation needed)\]").unwrap());

/// Hyperlink as it appears in the article
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Visible anchor text, whitespace-collapsed
    pub text: String,
    /// Raw `href` attribute
    pub href: String,
}

/// One infobox row: header label plus the data cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoboxField {
    pub label: String,
    pub text: String,
    pub links: Vec<Link>,
}

/// Parsed reference article
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceDocument {
    /// URL the article was fetched from
    pub url: String,
    pub title: String,
    pub fields: Vec<InfoboxField>,
    pub paragraphs: Vec<String>,
    pub links: Vec<Link>,
    pub body_text: String,
}

impl ReferenceDocument {
    /// Parse with the default infobox selector (`table.infobox`).
    pub fn parse(url: &str, html: &str) -> Self {
        DocumentParser::default().parse(url, html)
    }

    /// Up to `n` leading non-empty body paragraphs.
    pub fn leading_paragraphs(&self, n: usize) -> &[String] {
        &self.paragraphs[..self.paragraphs.len().min(n)]
    }

    /// Links anywhere in the article whose anchor text equals `text`, ignoring case.
    pub fn links_with_text<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a Link> + 'a {
        let wanted = text.trim().to_lowercase();
        self.links
            .iter()
            .filter(move |link| !wanted.is_empty() && link.text.to_lowercase() == wanted)
    }
}

/// Parses article HTML into [`ReferenceDocument`]s.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    infobox: Selector,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self {
            infobox: Selector::parse("table.infobox").unwrap(),
        }
    }
}

impl DocumentParser {
    pub fn new(infobox_selector: &str) -> Result<Self> {
        let infobox = Selector::parse(infobox_selector)
            .map_err(|e| anyhow!("Invalid infobox selector '{}': {:?}", infobox_selector, e))?;
        Ok(Self { infobox })
    }

    pub fn parse(&self, url: &str, html: &str) -> ReferenceDocument {
        let document = Html::parse_document(html);

        ReferenceDocument {
            url: url.to_string(),
            title: extract_title(&document),
            fields: self.extract_fields(&document),
            paragraphs: extract_paragraphs(&document),
            links: document.select(&LINK_SELECTOR).filter_map(to_link).collect(),
            body_text: document
                .select(&BODY_SELECTOR)
                .next()
                .map(visible_text)
                .unwrap_or_else(|| visible_text(document.root_element())),
        }
    }

    fn extract_fields(&self, document: &Html) -> Vec<InfoboxField> {
        let mut fields = Vec::new();

        for table in document.select(&self.infobox) {
            for row in table.select(&TR_SELECTOR) {
                let Some(header) = row.select(&TH_SELECTOR).next() else {
                    continue;
                };
                let Some(cell) = row.select(&TD_SELECTOR).next() else {
                    continue;
                };

                let label = visible_text(header);
                if label.is_empty() {
                    continue;
                }

                fields.push(InfoboxField {
                    label,
                    text: visible_text(cell),
                    links: cell.select(&LINK_SELECTOR).filter_map(to_link).collect(),
                });
            }
        }

        fields
    }
}

fn extract_title(document: &Html) -> String {
    for selector in [&*FIRST_HEADING_SELECTOR, &*HEADING_SELECTOR] {
        if let Some(heading) = document.select(selector).next() {
            let text = visible_text(heading);
            if !text.is_empty() {
                return text;
            }
        }
    }

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>())
        .unwrap_or_default();
    let title = collapse_whitespace(&title);

    // "Nvidia - Wikipedia"
    match title.rsplit_once(" - ") {
        Some((article, _site)) if !article.trim().is_empty() => article.trim().to_string(),
        _ => title,
    }
}

fn extract_paragraphs(document: &Html) -> Vec<String> {
    document
        .select(&PARAGRAPH_SELECTOR)
        .map(visible_text)
        .filter(|p| !p.is_empty())
        .collect()
}

fn to_link(element: ElementRef<'_>) -> Option<Link> {
    let href = element.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    Some(Link {
        text: visible_text(element),
        href: href.to_string(),
    })
}

/// Text a reader would see: skips `<style>`, `<script>` and citation
/// superscripts, treats `<br>` as a break, collapses whitespace.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => {
                if !node.ancestors().any(|a| is_hidden(a.value())) {
                    out.push_str(text);
                }
            }
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    collapse_whitespace(&CITATION_MARKER.replace_all(&out, ""))
}

fn is_hidden(node: &Node) -> bool {
    match node {
        Node::Element(e) => {
            matches!(e.name(), "style" | "script")
                || (e.name() == "sup" && e.classes().any(|c| c == "reference"))
        }
        _ => false,
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

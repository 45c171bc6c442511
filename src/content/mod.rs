// src/content/mod.rs
//! Recovers structured listing fields from the free-text notification payload.
//!
//! Two encodings reach us from upstream and both must be handled:
//!
//! * **tagged**: one `<marker> Label : value` line per field
//!   (`🆕 Title`, `💶 Price`, `🛍️ Brand`);
//! * **positional**: no markers, fields sit on fixed lines
//!   (0 → title, 1 → price, 2 → brand).
//!
//! The image URL is taken from the first `<a href="...">` fragment in either
//! encoding. Parsing never fails; missing fields are left empty.

pub mod price;

pub use price::format_price;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

pub const TITLE_MARKER: char = '\u{1F195}'; // 🆕
pub const PRICE_MARKER: char = '\u{1F4B6}'; // 💶
pub const BRAND_MARKER: char = '\u{1F6CD}'; // 🛍 (usually followed by U+FE0F)

const MARKERS: [char; 3] = [TITLE_MARKER, PRICE_MARKER, BRAND_MARKER];

static RE_TITLE: Lazy<Regex> = Lazy::new(|| tagged_line_regex(TITLE_MARKER, "Title"));
static RE_PRICE: Lazy<Regex> = Lazy::new(|| tagged_line_regex(PRICE_MARKER, "Price"));
static RE_BRAND: Lazy<Regex> = Lazy::new(|| tagged_line_regex(BRAND_MARKER, "Brand"));

static RE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<a\s+href\s*=\s*["']([^"']+)["']"#).expect("anchor regex"));

static RE_IMAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<a\s+href\s*=").expect("image line regex"));

// Value stops at end of line; `[ \t]` keeps an empty value from swallowing the next line.
fn tagged_line_regex(marker: char, label: &str) -> Regex {
    let pat = format!(
        r"(?m){}\x{{FE0F}}?[ \t]*{}[ \t]*:[ \t]*([^\r\n]*)",
        regex::escape(&marker.to_string()),
        label
    );
    Regex::new(&pat).expect("tagged line regex")
}

/// Fields recovered from one payload. Every field defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub title: String,
    pub brand: String,
    pub price: String,
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Tagged,
    Positional,
}

impl ContentFormat {
    /// Tagged iff any known marker glyph appears anywhere in the content.
    pub fn detect(content: &str) -> Self {
        if content.chars().any(|c| MARKERS.contains(&c)) {
            ContentFormat::Tagged
        } else {
            ContentFormat::Positional
        }
    }
}

/// Parse `content` into [`ParsedFields`], auto-detecting the encoding.
pub fn parse_content(content: &str) -> ParsedFields {
    let mut fields = match ContentFormat::detect(content) {
        ContentFormat::Tagged => parse_tagged(content),
        ContentFormat::Positional => parse_positional(content),
    };
    fields.image = extract_image(content).unwrap_or_default();
    fields
}

fn parse_tagged(content: &str) -> ParsedFields {
    let mut out = ParsedFields {
        title: capture_value(&RE_TITLE, content),
        brand: capture_value(&RE_BRAND, content),
        price: capture_value(&RE_PRICE, content),
        image: String::new(),
    };

    if out.title.is_empty() {
        let first = first_line(content);
        let starts_with_marker = first.chars().next().is_some_and(|c| MARKERS.contains(&c));
        if !first.is_empty() && !starts_with_marker && !is_image_line(first) {
            out.title = first.to_string();
        } else {
            debug!(target: "content", "tagged content without a title line");
        }
    }
    out
}

fn parse_positional(content: &str) -> ParsedFields {
    let lines: Vec<&str> = content
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_image_line(l))
        .collect();

    if lines.len() < 3 {
        debug!(target: "content", lines = lines.len(), "positional content shorter than expected");
    }

    let at = |i: usize| lines.get(i).map(|s| s.to_string()).unwrap_or_default();
    ParsedFields {
        title: at(0),
        price: at(1),
        brand: at(2),
        image: String::new(),
    }
}

/// URL of the first `<a href="...">` fragment, if any.
pub fn extract_image(content: &str) -> Option<String> {
    RE_ANCHOR
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn capture_value(re: &Regex, content: &str) -> String {
    re.captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn first_line(content: &str) -> &str {
    content.split('\n').next().unwrap_or_default().trim()
}

fn is_image_line(line: &str) -> bool {
    RE_IMAGE_LINE.is_match(line.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_tagged_by_any_marker() {
        assert_eq!(ContentFormat::detect("💶 Price : 3 EUR"), ContentFormat::Tagged);
        assert_eq!(ContentFormat::detect("plain\nlines"), ContentFormat::Positional);
    }

    #[test]
    fn tagged_brand_marker_with_and_without_variation_selector() {
        let with_vs = parse_content("🛍\u{FE0F} Brand : Nike");
        let without = parse_content("🛍 Brand : Nike");
        assert_eq!(with_vs.brand, "Nike");
        assert_eq!(without.brand, "Nike");
    }

    #[test]
    fn empty_tagged_value_does_not_swallow_next_line() {
        let p = parse_content("🆕 Title :\n💶 Price : 5 GBP");
        assert_eq!(p.price, "5 GBP");
        // first line starts with the title marker, so no fallback either
        assert_eq!(p.title, "");
    }

    #[test]
    fn tagged_fallback_title_from_first_line() {
        let p = parse_content("Vintage Denim Jacket\n💶 Price : 12.5 EUR");
        assert_eq!(p.title, "Vintage Denim Jacket");
        assert_eq!(p.price, "12.5 EUR");
        assert_eq!(p.brand, "");
    }

    #[test]
    fn positional_skips_image_lines_and_crlf() {
        let p = parse_content("<a href=\"http://img/1.jpg\">\r\nShirt\r\n\r\n9 GBP\r\nZara\r\n");
        assert_eq!(p.title, "Shirt");
        assert_eq!(p.price, "9 GBP");
        assert_eq!(p.brand, "Zara");
        assert_eq!(p.image, "http://img/1.jpg");
    }

    #[test]
    fn positional_missing_positions_are_empty() {
        let p = parse_content("Only title");
        assert_eq!(p.title, "Only title");
        assert!(p.price.is_empty() && p.brand.is_empty() && p.image.is_empty());
    }

    #[test]
    fn empty_content_is_all_defaults() {
        assert_eq!(parse_content(""), ParsedFields::default());
    }

    #[test]
    fn single_quoted_anchor() {
        assert_eq!(extract_image("x <a href='http://i/2.png'>y</a>").as_deref(), Some("http://i/2.png"));
    }
}

// src/notify/feed/render.rs
//! RSS 2.0 document writer.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::store::FeedEntry;
use crate::notify::DISPLAY_NAME;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Channel-level metadata, fixed for the life of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
}

impl FeedMeta {
    pub fn for_port(port: u16) -> Self {
        Self {
            title: DISPLAY_NAME.to_string(),
            description: "Latest items from Vinted matching your search queries".to_string(),
            link: format!("http://localhost:{port}"),
            language: "en".to_string(),
        }
    }
}

/// Item description: brand, price and an anchor to the image, one per line,
/// each HTML-escaped and omitted when empty.
pub fn format_description(brand: &str, price: &str, image: &str) -> String {
    let mut lines = Vec::with_capacity(3);
    if !brand.is_empty() {
        lines.push(html_escape::encode_quoted_attribute(brand).into_owned());
    }
    if !price.is_empty() {
        lines.push(html_escape::encode_quoted_attribute(price).into_owned());
    }
    if !image.is_empty() {
        let img = html_escape::encode_quoted_attribute(image);
        lines.push(format!(r#"<a href="{img}">{img}</a>"#));
    }
    lines.join("\n")
}

/// Render `entries` (already ordered newest first) as an RSS document.
pub fn render_feed(meta: &FeedMeta, entries: &[FeedEntry], now: DateTime<Utc>) -> Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("xml decl")?;
    w.write_event(Event::Start(
        BytesStart::new("rss").with_attributes([("version", "2.0"), ("xmlns:atom", ATOM_NS)]),
    ))
    .context("rss start")?;
    w.write_event(Event::Start(BytesStart::new("channel")))
        .context("channel start")?;

    text_element(&mut w, "title", &meta.title)?;
    text_element(&mut w, "link", &meta.link)?;
    text_element(&mut w, "description", &meta.description)?;
    w.write_event(Event::Empty(BytesStart::new("atom:link").with_attributes([
        ("href", meta.link.as_str()),
        ("rel", "self"),
        ("type", "application/rss+xml"),
    ])))
    .context("atom:link")?;
    text_element(&mut w, "language", &meta.language)?;
    text_element(&mut w, "lastBuildDate", &now.to_rfc2822())?;

    for e in entries {
        w.write_event(Event::Start(BytesStart::new("item")))
            .context("item start")?;
        text_element(&mut w, "title", &e.title)?;
        text_element(&mut w, "link", &e.url)?;
        text_element(
            &mut w,
            "description",
            &format_description(&e.brand, &e.price, &e.image),
        )?;
        w.write_event(Event::Start(
            BytesStart::new("guid").with_attributes([("isPermaLink", "false")]),
        ))
        .context("guid start")?;
        w.write_event(Event::Text(BytesText::new(&e.url)))
            .context("guid text")?;
        w.write_event(Event::End(BytesEnd::new("guid")))
            .context("guid end")?;
        text_element(&mut w, "pubDate", &e.published_at.to_rfc2822())?;
        w.write_event(Event::End(BytesEnd::new("item")))
            .context("item end")?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))
        .context("channel end")?;
    w.write_event(Event::End(BytesEnd::new("rss")))
        .context("rss end")?;

    String::from_utf8(w.into_inner()).context("feed is not utf-8")
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("<{name}> start"))?;
    w.write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("<{name}> text"))?;
    w.write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("<{name}> end"))?;
    Ok(())
}

//! Markdown page content (`content/about.md`).
//!
//! Uses pulldown-cmark; the store-history section is lifted out of the event
//! stream before rendering so the template can lay it out separately.

use anyhow::{Context, Result};
use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag};
use serde::{Deserialize, Serialize};
use std::{fs, ops::Range, path::Path};
use tracing::{debug, warn};

/// H2 title of the section listing the shop's past locations.
pub const STORE_HISTORY_HEADING: &str = "店舗の変遷";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub id: String,
    pub title: String,
    pub alt: String,
    pub image: String,
}

fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts
}

/// Parse with soft breaks rendered as `<br />`, matching how the form
/// answers and about page were written.
fn events(markdown: &str) -> Vec<Event<'_>> {
    Parser::new_ext(markdown, parser_options())
        .map(|ev| match ev {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        })
        .collect()
}

fn render(events: Vec<Event<'_>>) -> String {
    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

pub fn markdown_to_html(markdown: &str) -> String {
    render(events(markdown))
}

/// Plain text between `start` and the matching end event.
fn text_until_end(events: &[Event<'_>], start: usize) -> (String, usize) {
    let mut text = String::new();
    let mut depth = 0usize;
    for (i, ev) in events.iter().enumerate().skip(start) {
        match ev {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return (text, i);
                }
            }
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    (text, events.len())
}

/// Event range of the store-history section: from its H2 up to, not
/// including, the next thematic break.
fn store_history_range(events: &[Event<'_>]) -> Option<Range<usize>> {
    let start = events.iter().enumerate().position(|(i, ev)| {
        matches!(
            ev,
            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                ..
            })
        ) && text_until_end(events, i).0.trim() == STORE_HISTORY_HEADING
    })?;
    let end = events[start..]
        .iter()
        .position(|ev| matches!(ev, Event::Rule))
        .map(|offset| start + offset)?;
    Some(start..end)
}

fn store_entries(section: &[Event<'_>]) -> Vec<StoreEntry> {
    let mut titles = Vec::new();
    let mut images = Vec::new();

    for (i, ev) in section.iter().enumerate() {
        match ev {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H3,
                ..
            }) => titles.push(text_until_end(section, i).0),
            Event::Start(Tag::Image { dest_url, .. }) => {
                let alt = text_until_end(section, i).0;
                images.push((alt, dest_url.to_string()));
            }
            _ => {}
        }
    }

    if titles.len() != images.len() {
        debug!(
            titles = titles.len(),
            images = images.len(),
            "store history titles and images differ in count"
        );
    }

    titles
        .into_iter()
        .zip(images)
        .enumerate()
        .map(|(idx, (title, (alt, image)))| StoreEntry {
            id: format!("store{}", idx),
            title,
            alt,
            image,
        })
        .collect()
}

/// Render `markdown`, pulling the store-history section out of the HTML.
/// The section's closing thematic break stays in the page.
pub fn split_store_history(markdown: &str) -> (String, Vec<StoreEntry>) {
    let mut evs = events(markdown);
    let Some(range) = store_history_range(&evs) else {
        return (render(evs), Vec::new());
    };
    let stores = store_entries(&evs[range.clone()]);
    evs.drain(range);
    (render(evs), stores)
}

/// Read and render a Markdown file; a missing file renders as empty.
pub fn load_markdown<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "markdown file not found");
        return Ok(String::new());
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(markdown_to_html(&text))
}

/// Read the about page and split out its store history.
pub fn load_about<P: AsRef<Path>>(path: P) -> Result<(String, Vec<StoreEntry>)> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "about page not found");
        return Ok((String::new(), Vec::new()));
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(split_store_history(&text))
}

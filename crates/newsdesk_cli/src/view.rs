//! Stateless rendering of the news and events listings.

use newsdesk_core::{Feed, Record};
use serde_json::{json, Value};
use std::fmt::Write;

/// Which listing(s) to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    All,
    News,
    Events,
}

pub fn render_text(feed: &Feed<'_>, filter: ListFilter) -> String {
    let mut out = String::new();
    if filter != ListFilter::Events {
        push_section(&mut out, "News", &feed.news);
    }
    if filter != ListFilter::News {
        if !out.is_empty() {
            out.push('\n');
        }
        push_section(&mut out, "Events", &feed.events);
    }
    out
}

pub fn render_json(feed: &Feed<'_>, filter: ListFilter) -> Value {
    match filter {
        ListFilter::All => json!({ "news": feed.news, "events": feed.events }),
        ListFilter::News => json!({ "news": feed.news }),
        ListFilter::Events => json!({ "events": feed.events }),
    }
}

fn push_section(out: &mut String, title: &str, records: &[&Record]) {
    let _ = writeln!(out, "{title} ({})", records.len());
    if records.is_empty() {
        let _ = writeln!(out, "  (none)");
        return;
    }
    for record in records {
        let _ = writeln!(out, "  [{}] {}", record.id, record.fields.headline);
        let _ = writeln!(out, "      {}", record.fields.content.replace('\n', " "));
        let _ = writeln!(out, "      image: {}", record.fields.image);
    }
}

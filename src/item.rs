use chrono::{DateTime, FixedOffset};

use crate::feed::ATOM_NS;
use crate::xml::Element;

/// Canonical per-entry record that rules are evaluated against.
///
/// Built fresh for each `<item>`/`<entry>` and never mutated; an absent or
/// unparseable source field is simply `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    pub title: Option<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub description: Option<String>,
}

/// The field names a rule leaf may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Title,
    Date,
    Description,
}

impl ItemField {
    pub const NAMES: [&'static str; 3] = ["title", "date", "description"];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "title" => Some(ItemField::Title),
            "date" => Some(ItemField::Date),
            "description" => Some(ItemField::Description),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Title => "title",
            ItemField::Date => "date",
            ItemField::Description => "description",
        }
    }
}

impl Item {
    /// Builds an item from an RSS 2.0 `<item>` element.
    ///
    /// Children are matched un-namespaced; `pubDate` is RFC 2822.
    pub fn from_rss_item(item: &Element) -> Self {
        Item {
            title: child_text(item, None, "title"),
            date: child_text(item, None, "pubDate")
                .and_then(|raw| parse_date(&raw, DateTime::parse_from_rfc2822)),
            description: child_text(item, None, "description"),
        }
    }

    /// Builds an item from an Atom 1.0 `<entry>` element.
    ///
    /// Children are matched in the Atom namespace; `updated` is RFC 3339.
    pub fn from_atom_entry(entry: &Element) -> Self {
        Item {
            title: child_text(entry, Some(ATOM_NS), "title"),
            date: child_text(entry, Some(ATOM_NS), "updated")
                .and_then(|raw| parse_date(&raw, DateTime::parse_from_rfc3339)),
            description: child_text(entry, Some(ATOM_NS), "summary"),
        }
    }
}

fn child_text(el: &Element, ns: Option<&str>, local: &str) -> Option<String> {
    el.find_child(ns, local).and_then(|child| child.text())
}

/// A date that fails to parse makes only this field absent; the rest of the
/// feed keeps processing.
fn parse_date(
    raw: &str,
    parser: fn(&str) -> chrono::ParseResult<DateTime<FixedOffset>>,
) -> Option<DateTime<FixedOffset>> {
    match parser(raw.trim()) {
        Ok(dt) => Some(dt),
        Err(e) => {
            tracing::debug!(date = raw, error = %e, "Unparseable entry date, treating as absent");
            None
        }
    }
}

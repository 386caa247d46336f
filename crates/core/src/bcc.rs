//! Lenient reader for BCC subtitle documents.
//!
//! BCC files come from several producers that disagree on field names. Every
//! lookup goes through a priority table: the first key that yields a usable
//! value wins, otherwise the rule's fallback applies.
//!
//! | value      | keys, in order               | fallback               |
//! |------------|------------------------------|------------------------|
//! | entry list | `body`, `subtitles`, `events`| error                  |
//! | start      | `from`, `start`              | `0`                    |
//! | end        | `to`, `end`                  | start + default length |
//! | text       | `content`, `text`            | empty (entry dropped)  |

use crate::error::BccError;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Keys that may hold the entry array, highest priority first.
pub const ENTRY_LIST_KEYS: &[&str] = &["body", "subtitles", "events"];
/// Keys holding the start time in seconds.
pub const START_KEYS: &[&str] = &["from", "start"];
/// Keys holding the end time in seconds.
pub const END_KEYS: &[&str] = &["to", "end"];
/// Keys holding the subtitle text.
pub const TEXT_KEYS: &[&str] = &["content", "text"];

/// Raw input accepted by the normalizer.
#[derive(Debug, Clone, Copy)]
pub enum BccSource<'a> {
    Text(&'a str),
    Document(&'a Value),
}

impl<'a> From<&'a str> for BccSource<'a> {
    fn from(text: &'a str) -> Self {
        BccSource::Text(text)
    }
}

impl<'a> From<&'a String> for BccSource<'a> {
    fn from(text: &'a String) -> Self {
        BccSource::Text(text)
    }
}

impl<'a> From<&'a Value> for BccSource<'a> {
    fn from(doc: &'a Value) -> Self {
        BccSource::Document(doc)
    }
}

/// A subtitle line with its fields resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BccEntry {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub text: String,
}

/// Parse `source` and resolve every usable entry, in document order.
/// Entries without text are dropped here.
pub fn normalize(source: BccSource<'_>, default_duration: f64) -> Result<Vec<BccEntry>, BccError> {
    let parsed;
    let doc = match source {
        BccSource::Text(text) => {
            trace!("normalize: parsing {} bytes of text", text.len());
            parsed = serde_json::from_str::<Value>(text)?;
            &parsed
        }
        BccSource::Document(doc) => doc,
    };
    let items = entry_list(doc)?;
    let mut entries = Vec::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let Some(fields) = item.as_object() else {
            debug!("normalize: dropping entry {pos}: not an object");
            continue;
        };
        match resolve_entry(fields, default_duration) {
            Some(entry) => entries.push(entry),
            None => debug!("normalize: dropping entry {pos}: no text"),
        }
    }
    trace!(
        "normalize: kept {} of {} entries",
        entries.len(),
        items.len()
    );
    Ok(entries)
}

/// Return a copy of `entries` ordered by ascending start time.
pub fn sort_entries(entries: &[BccEntry]) -> Vec<BccEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    sorted
}

/// Locate the entry array using [`ENTRY_LIST_KEYS`].
fn entry_list(doc: &Value) -> Result<&Vec<Value>, BccError> {
    let map = doc.as_object().ok_or(BccError::MissingEntryList)?;
    for key in ENTRY_LIST_KEYS {
        if let Some(Value::Array(items)) = map.get(*key) {
            trace!("entry_list: using key={key} len={}", items.len());
            return Ok(items);
        }
    }
    Err(BccError::MissingEntryList)
}

fn resolve_entry(fields: &Map<String, Value>, default_duration: f64) -> Option<BccEntry> {
    let text = first_match(fields, TEXT_KEYS, as_text)?;
    let start = first_match(fields, START_KEYS, as_seconds).unwrap_or(0.0);
    let end = first_match(fields, END_KEYS, as_seconds).unwrap_or(start + default_duration);
    Some(BccEntry { start, end, text })
}

/// Apply `read` to each key in priority order and keep the first hit.
fn first_match<T>(
    fields: &Map<String, Value>,
    keys: &[&str],
    read: fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter().find_map(|key| fields.get(*key).and_then(read))
}

fn as_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

//! Conversion of raw record values into trait property values.

use std::path::Path;

use serde_json::Value;
use url::Url;

use super::Record;
use crate::config::{FieldKind, PropertySource};

/// Value of the first candidate field that converts cleanly.
///
/// Null and empty values are skipped, as are values the kind cannot
/// represent.
pub fn first_mapped_value(record: &Record, source: &PropertySource) -> Option<Value> {
    source.fields.iter().find_map(|field| {
        let raw = record.get(field).filter(|value| !is_empty(value))?;
        let converted = convert_value(source.kind, raw);
        if converted.is_none() {
            tracing::warn!(
                "Field '{}' holds a value not usable as {:?}: {}",
                field,
                source.kind,
                raw
            );
        }
        converted
    })
}

/// Convert one raw value according to its declared kind.
pub fn convert_value(kind: FieldKind, raw: &Value) -> Option<Value> {
    match kind {
        FieldKind::Location => location_url(raw).map(|url| Value::String(url.into())),
        FieldKind::Text => match raw {
            Value::String(text) if !text.is_empty() => Some(Value::String(text.clone())),
            Value::Number(number) => Some(Value::String(number.to_string())),
            _ => None,
        },
        FieldKind::Integer => match raw {
            Value::Number(number) => number.as_i64().map(Value::from),
            Value::String(text) => text.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        FieldKind::Raw => (!raw.is_null()).then(|| raw.clone()),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// URL of a file or attachment field.
///
/// Attachment objects prefer their `local_path`, then their `url`.
/// Plain strings are treated as paths unless they already carry a
/// scheme.
fn location_url(raw: &Value) -> Option<Url> {
    match raw {
        Value::Object(attachment) => {
            if let Some(local_path) = attachment
                .get("local_path")
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty())
            {
                return path_url(local_path);
            }
            attachment
                .get("url")
                .and_then(Value::as_str)
                .and_then(|url| Url::parse(url).ok())
        }
        Value::String(text) => {
            if has_scheme(text) {
                Url::parse(text).ok()
            } else {
                path_url(text)
            }
        }
        _ => None,
    }
}

fn path_url(path: &str) -> Option<Url> {
    let url = Url::from_file_path(Path::new(path)).ok();
    if url.is_none() {
        tracing::warn!("Ignoring non-absolute path '{}'", path);
    }
    url
}

/// Distinguishes `file:///x` or `https://x` from `C:\x` and `/x`.
fn has_scheme(text: &str) -> bool {
    match text.split_once("://") {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

//! Text encoding for entity references.

use super::spec::{DatabaseReference, EntityReference, ReferenceError, WorkfileReference};

/// Prefix every entity reference handled by this manager starts with.
pub const REFERENCE_PREFIX: &str = "fpt://";

pub(super) const ASSET_CATEGORY: &str = "asset";
pub(super) const WORKFILE_CATEGORY: &str = "workfile";

/// Cheap shape check used to tell references apart from arbitrary strings.
///
/// Only the prefix is inspected, so every string `decode` accepts is
/// reported as a reference. Strings that pass this check but fail to
/// decode are malformed references rather than non-references.
pub fn is_reference(text: &str) -> bool {
    text.starts_with(REFERENCE_PREFIX)
}

/// Parse a reference string.
///
/// Supports formats:
/// - `fpt://asset/{object_type}/{object_id}`
/// - `fpt://workfile/{template_name}/{field1}/{field2}/...`
pub fn decode(text: &str) -> Result<EntityReference, ReferenceError> {
    let body = text
        .strip_prefix(REFERENCE_PREFIX)
        .ok_or(ReferenceError::MissingPrefix)?;

    let (category, segments) = match body.split_once('/') {
        Some((category, rest)) => (category, rest.split('/').collect::<Vec<_>>()),
        None => (body, Vec::new()),
    };

    match category {
        ASSET_CATEGORY => decode_database(&segments).map(EntityReference::Database),
        WORKFILE_CATEGORY => decode_workfile(&segments).map(EntityReference::Workfile),
        other => Err(ReferenceError::UnknownCategory(other.to_string())),
    }
}

/// Format a reference string. Inverse of [`decode`].
pub fn encode(reference: &EntityReference) -> String {
    reference.to_string()
}

fn decode_database(segments: &[&str]) -> Result<DatabaseReference, ReferenceError> {
    let [object_type, object_id] = segments else {
        return Err(ReferenceError::SegmentCount {
            category: ASSET_CATEGORY,
            expected: "exactly 2",
            found: segments.len(),
        });
    };

    // `u64::from_str` tolerates a leading '+', which would not survive re-encoding.
    if object_id.is_empty() || !object_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReferenceError::InvalidObjectId(object_id.to_string()));
    }
    let object_id: u64 = object_id
        .parse()
        .map_err(|_| ReferenceError::InvalidObjectId(object_id.to_string()))?;

    DatabaseReference::new(*object_type, object_id)
}

fn decode_workfile(segments: &[&str]) -> Result<WorkfileReference, ReferenceError> {
    let Some((template_name, field_values)) = segments.split_first() else {
        return Err(ReferenceError::SegmentCount {
            category: WORKFILE_CATEGORY,
            expected: "at least 1",
            found: 0,
        });
    };

    WorkfileReference::new(*template_name, field_values.iter().copied())
}

//! Attachment discovery inside record fields

use crate::error::{Error, Result};
use crate::id::{ATTACHMENT_ID_PREFIX, is_valid_prefixed_id};
use crate::types::{Attachment, FieldValue, Tables};
use std::collections::BTreeMap;

/// Find every attachment descriptor in `tables`
///
/// A descriptor is a map element of a list-valued field that has a `url` key.
/// Each descriptor must carry a `url` starting with `link_prefix`, an `id`
/// that is a valid attachment identifier, and a whole non-negative `size`.
/// Any descriptor that fails these checks aborts extraction: it means the
/// remote schema changed in a way the download stage cannot handle safely.
///
/// Attachments are returned in discovery order (tables by ID, records as
/// fetched, fields by name) and are not deduplicated.
pub fn extract_attachments(tables: &Tables, link_prefix: &str) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::new();
    for (table, records) in tables {
        for record in records {
            for (field, value) in &record.fields {
                let FieldValue::List(items) = value else {
                    continue;
                };
                for item in items {
                    let FieldValue::Map(descriptor) = item else {
                        continue;
                    };
                    if !descriptor.contains_key("url") {
                        continue;
                    }
                    let attachment = parse_descriptor(descriptor, link_prefix).map_err(|reason| {
                        Error::InvalidAttachment {
                            table: table.clone(),
                            record: record.id.clone(),
                            field: field.clone(),
                            reason,
                        }
                    })?;
                    attachments.push(attachment);
                }
            }
        }
    }
    Ok(attachments)
}

fn parse_descriptor(
    descriptor: &BTreeMap<String, FieldValue>,
    link_prefix: &str,
) -> std::result::Result<Attachment, String> {
    let link = string_entry(descriptor, "url")?;
    if !link.starts_with(link_prefix) {
        return Err(format!("url {link:?} does not start with {link_prefix:?}"));
    }

    let id = string_entry(descriptor, "id")?;
    if !is_valid_prefixed_id(id, ATTACHMENT_ID_PREFIX) {
        return Err(format!("id {id:?} is not a valid attachment ID"));
    }

    let size = match descriptor.get("size") {
        Some(FieldValue::Number(n)) => declared_size(n)?,
        Some(other) => return Err(format!("size is a {}, expected a number", other.kind())),
        None => return Err("missing size".to_string()),
    };

    Ok(Attachment {
        link: link.to_string(),
        id: id.to_string(),
        size,
    })
}

fn string_entry<'a>(
    descriptor: &'a BTreeMap<String, FieldValue>,
    key: &str,
) -> std::result::Result<&'a str, String> {
    let value = descriptor.get(key).ok_or_else(|| format!("missing {key}"))?;
    value
        .as_str()
        .ok_or_else(|| format!("{key} is a {}, expected a string", value.kind()))
}

/// Sizes may arrive as floats (`42.0`); only whole non-negative values are accepted
fn declared_size(n: &serde_json::Number) -> std::result::Result<u64, String> {
    if let Some(size) = n.as_u64() {
        return Ok(size);
    }
    match n.as_f64() {
        // 2^64 is the first float past u64::MAX
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < 18_446_744_073_709_551_616.0 => {
            Ok(f as u64)
        }
        _ => Err(format!("size {n} is not a whole non-negative number")),
    }
}

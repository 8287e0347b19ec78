use crate::source::Target;
use crate::url::normalize_target_url;
use crate::SourceError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Reads and decodes the target list at `path`
///
/// `.toml` files are read as `[[link]]` tables; everything else as JSON, either a
/// top-level array or an object with a `links` array.
///
/// # Returns
///
/// * `Ok(Vec<Target>)` - Valid entries in source order (possibly empty)
/// * `Err(SourceError)` - The file is missing, unreadable, or not a list
pub fn read_targets(path: &Path) -> Result<Vec<Target>, SourceError> {
    let unreadable = |reason: String| SourceError::Unreadable {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let targets = if is_toml {
        parse_toml_targets(&content)
    } else {
        parse_json_targets(&content)
    }
    .map_err(unreadable)?;

    tracing::info!(
        "Read {} targets from {}",
        targets.len(),
        path.display()
    );

    Ok(targets)
}

/// Decodes a JSON link list
///
/// Returns `Err` with a reason only when the document itself is not a list.
pub fn parse_json_targets(content: &str) -> Result<Vec<Target>, String> {
    let document: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("links") {
            Some(Value::Array(entries)) => entries,
            _ => return Err("expected an array or an object with a `links` array".to_string()),
        },
        _ => return Err("expected an array of link entries".to_string()),
    };

    Ok(decode_entries(entries))
}

/// Decodes a TOML link list made of `[[link]]` tables
pub fn parse_toml_targets(content: &str) -> Result<Vec<Target>, String> {
    let document: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;

    let links = match document.get("link") {
        Some(toml::Value::Array(links)) => links,
        _ => return Err("expected `[[link]]` tables".to_string()),
    };

    let entries = links
        .iter()
        .map(|link| serde_json::to_value(link).unwrap_or(Value::Null))
        .collect();

    Ok(decode_entries(entries))
}

/// Converts raw entries into targets, skipping malformed entries and duplicate ids
fn decode_entries(entries: Vec<Value>) -> Vec<Target> {
    let mut seen_ids = HashSet::new();
    let mut targets = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        match decode_entry(&entry) {
            Ok(target) => {
                if !seen_ids.insert(target.id.clone()) {
                    tracing::warn!(
                        "Skipping link entry {}: duplicate id '{}'",
                        index,
                        target.id
                    );
                    continue;
                }
                targets.push(target);
            }
            Err(reason) => {
                tracing::warn!("Skipping link entry {}: {}", index, reason);
            }
        }
    }

    targets
}

fn decode_entry(entry: &Value) -> Result<Target, String> {
    let object = entry
        .as_object()
        .ok_or_else(|| "entry is not an object".to_string())?;

    // Numeric ids are common in key-value exports
    let id = match object.get("id") {
        Some(Value::String(id)) => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        Some(_) => return Err("`id` must be a string or number".to_string()),
        None => return Err("missing `id`".to_string()),
    };
    if id.is_empty() {
        return Err("empty `id`".to_string());
    }

    let raw_url = match object.get("url") {
        Some(Value::String(url)) => url,
        Some(_) => return Err(format!("`url` of '{}' must be a string", id)),
        None => return Err(format!("missing `url` for '{}'", id)),
    };

    let url = normalize_target_url(raw_url).map_err(|e| format!("bad url for '{}': {}", id, e))?;

    let title = match object.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => title.trim().to_string(),
        Some(Value::String(_)) | Some(Value::Null) | None => id.clone(),
        Some(_) => return Err(format!("`title` of '{}' must be a string", id)),
    };

    Ok(Target { id, title, url })
}

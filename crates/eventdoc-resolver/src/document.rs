//! YAML document loading and JSON pointer evaluation.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::error::ResolveError;

/// Read a YAML file into a JSON value tree.
///
/// `what` names the document kind in `NotFound` errors ("service file", ...).
/// An empty file loads as `Value::Null`.
pub fn load_document(path: &Path, what: &'static str) -> Result<Value, ResolveError> {
    if !path.is_file() {
        return Err(ResolveError::NotFound {
            what,
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    parse_document(&content).map_err(|message| ResolveError::Yaml {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse YAML (or JSON, which is valid YAML) text.
pub fn parse_document(input: &str) -> Result<Value, String> {
    if input.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(input).map_err(|e| e.to_string())
}

/// Evaluate an RFC 6901 pointer (without the leading `#`) against `root`.
///
/// The empty pointer selects the whole document.
pub fn resolve_pointer<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        return Some(root);
    }
    let rest = pointer.strip_prefix('/')?;
    let mut current = root;
    for segment in rest.split('/') {
        let key = unescape_segment(segment);
        current = match current {
            Value::Object(map) => map.get(&key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// The last segment of a pointer, unescaped. `None` for the empty pointer.
pub fn pointer_tail(pointer: &str) -> Option<String> {
    let rest = pointer.strip_prefix('/')?;
    rest.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(unescape_segment)
}

pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Read a scalar field as a string. Numbers are accepted so that an unquoted
/// `version: 1.2` still reads as `"1.2"`.
pub fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The message containers declared under `components.messages`, in document order.
pub fn declared_messages(doc: &Value) -> impl Iterator<Item = (&String, &Map<String, Value>)> {
    doc.pointer("/components/messages")
        .and_then(|v| v.as_object())
        .into_iter()
        .flat_map(|messages| messages.iter())
        .filter_map(|(key, value)| Some((key, value.as_object()?)))
}

/// Every `.yaml`/`.yml` file below `dir`, sorted, skipping hidden entries.
pub fn yaml_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
        })
        .flatten()
        .filter(|e| e.file_type().is_file() && is_yaml(e.path()))
        .map(|e| e.into_path())
        .collect()
}

pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

// Snapshot loading, plain or gzip JSON, with failures classified by cause.
//
// The loader decides nothing about component semantics. It only guarantees
// that a successful result is a JSON object decoded into the typed model.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use serde_json::{Map, Value};

use crate::graph::{Component, DependencyGraph};
use crate::{GraphError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Load a dependency graph snapshot from `path`.
///
/// Files ending in `.gz` are decompressed first. See [`read_document`] for
/// the failure classification.
pub fn load_graph(path: &Path) -> Result<DependencyGraph> {
    let document = read_document(path, "Dependency graph")?;
    document
        .into_iter()
        .map(|(id, value)| {
            let component: Component =
                serde_json::from_value(value).map_err(|e| GraphError::SchemaViolation {
                    path: path.display().to_string(),
                    message: format!("component {id:?}: {e}"),
                })?;
            Ok::<_, GraphError>((id, component))
        })
        .collect()
}

/// Read and decode the top-level JSON object stored at `path`.
///
/// `what` names the document in error messages ("Module tree", ...).
///
/// - missing path → [`GraphError::NotFound`]
/// - bad gzip stream → [`GraphError::CorruptArchive`]
/// - bad JSON → [`GraphError::MalformedData`] with line/column
/// - non-object top level → [`GraphError::SchemaViolation`]
pub fn read_document(path: &Path, what: &str) -> Result<Map<String, Value>> {
    match read_value(path, what)? {
        Value::Object(map) => Ok(map),
        other => Err(GraphError::SchemaViolation {
            path: path.display().to_string(),
            message: format!(
                "{what} must be a JSON object, got {}",
                json_type_name(&other)
            ),
        }),
    }
}

/// Read and decode the JSON value stored at `path`, whatever its shape.
///
/// Fails like [`read_document`] except that any top-level type is accepted.
pub fn read_value(path: &Path, what: &str) -> Result<Value> {
    let bytes = read_payload(path, what)?;
    serde_json::from_slice(&bytes).map_err(|e| malformed(path, &e))
}

/// Whether `path` follows the compressed naming convention.
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn read_payload(path: &Path, what: &str) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(GraphError::NotFound {
            what: what.to_string(),
            path: path.display().to_string(),
        });
    }

    let raw = std::fs::read(path)?;
    if !is_compressed(path) {
        return Ok(raw);
    }

    if raw.is_empty() {
        return Err(corrupt(path, "archive is empty (truncated)"));
    }
    if raw.len() < GZIP_MAGIC.len() && GZIP_MAGIC.starts_with(&raw) {
        return Err(corrupt(path, "archive ends inside the gzip header (truncated)"));
    }
    if !raw.starts_with(&GZIP_MAGIC) {
        return Err(corrupt(path, "invalid gzip format (missing gzip header)"));
    }

    let mut decoded = Vec::new();
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut decoded)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                corrupt(path, &format!("archive appears truncated: {e}"))
            }
            _ => corrupt(path, &format!("invalid gzip format: {e}")),
        })?;
    Ok(decoded)
}

fn corrupt(path: &Path, cause: &str) -> GraphError {
    GraphError::CorruptArchive {
        path: path.display().to_string(),
        cause: cause.to_string(),
    }
}

fn malformed(path: &Path, e: &serde_json::Error) -> GraphError {
    let full = e.to_string();
    let position = format!(" at line {} column {}", e.line(), e.column());
    GraphError::MalformedData {
        path: path.display().to_string(),
        line: e.line(),
        column: e.column(),
        message: full.trim_end_matches(&position).to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

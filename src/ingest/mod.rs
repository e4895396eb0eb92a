mod json;
mod jsonl;


pub use jsonl::JsonlReader;

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ChunkError;

/// Text extraction keys for JSON records, checked in priority order.
const TEXT_KEYS: [&str; 3] = ["text", "page_content", "body"];

/// One logical unit of input: a whole file, or a single JSON/JSONL record.
/// Immutable once created; consumed exactly once by a splitter.
#[derive(Debug, Clone)]
pub struct Document {
    pub source_id: String,
    pub text: String,
    pub page: Option<u32>,
    /// Scalar-valued metadata carried through from the record.
    pub metadata: Map<String, Value>,
}

/// What to do when a single record cannot be ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Report the record and keep going.
    Skip,
    /// Fail the whole run on the first bad record.
    Abort,
}

/// Report for a record that was skipped under [`ErrorPolicy::Skip`].
#[derive(Debug, Clone)]
pub struct RecordIssue {
    pub source_id: String,
    pub line: Option<usize>,
    pub reason: String,
}

impl RecordIssue {
    fn from_error(error: &ChunkError) -> Self {
        match error {
            ChunkError::MalformedRecord {
                source_id,
                line,
                reason,
            } => Self {
                source_id: source_id.clone(),
                line: *line,
                reason: reason.clone(),
            },
            other => Self {
                source_id: String::new(),
                line: None,
                reason: other.to_string(),
            },
        }
    }
}

/// Read every document under `path` (a file, or a directory walked
/// recursively). Returns the documents plus the issues skipped under the
/// given policy.
pub fn read_documents(
    path: &Path,
    policy: ErrorPolicy,
) -> Result<(Vec<Document>, Vec<RecordIssue>), ChunkError> {
    let mut documents = Vec::new();
    let mut issues = Vec::new();

    if path.is_dir() {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            // Depth 0 is the directory the caller asked for; hidden-name
            // filtering applies to its contents only.
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("walk failed under {}: {e}", path.display()))
            })?;
            if !entry.path().is_file() {
                continue;
            }
            if extension_of(entry.path()).is_none() {
                debug!(path = %entry.path().display(), "skipping unsupported file");
                continue;
            }
            read_file(entry.path(), policy, &mut documents, &mut issues)?;
        }
    } else {
        read_file(path, policy, &mut documents, &mut issues)?;
    }

    Ok((documents, issues))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "txt" | "md" | "markdown" | "json" | "jsonl" | "ndjson" => Some(ext),
        _ => None,
    }
}

/// Dispatch one file by extension, appending its documents and issues.
fn read_file(
    path: &Path,
    policy: ErrorPolicy,
    documents: &mut Vec<Document>,
    issues: &mut Vec<RecordIssue>,
) -> Result<(), ChunkError> {
    let source_id = path.to_string_lossy().to_string();
    let Some(ext) = extension_of(path) else {
        return Err(ChunkError::UnsupportedInput(source_id));
    };

    match ext.as_str() {
        "txt" | "md" | "markdown" => {
            let text = fs::read_to_string(path)?;
            documents.push(Document {
                source_id,
                text,
                page: None,
                metadata: Map::new(),
            });
        }
        "json" => {
            let file = fs::File::open(path)?;
            json::stream_records(&source_id, std::io::BufReader::new(file), |record| {
                collect_record(record, policy, documents, issues)
            })?;
        }
        "jsonl" | "ndjson" => {
            for record in JsonlReader::open(path)? {
                collect_record(record, policy, documents, issues)?;
            }
        }
        _ => return Err(ChunkError::UnsupportedInput(source_id)),
    }
    Ok(())
}

/// Apply the error policy to one parsed-or-failed record.
fn collect_record(
    record: Result<Document, ChunkError>,
    policy: ErrorPolicy,
    documents: &mut Vec<Document>,
    issues: &mut Vec<RecordIssue>,
) -> Result<(), ChunkError> {
    match record {
        Ok(document) => documents.push(document),
        Err(error) => match policy {
            ErrorPolicy::Abort => return Err(error),
            ErrorPolicy::Skip => {
                let issue = RecordIssue::from_error(&error);
                warn!(
                    source = %issue.source_id,
                    line = ?issue.line,
                    reason = %issue.reason,
                    "skipping malformed record"
                );
                issues.push(issue);
            }
        },
    }
    Ok(())
}

/// Turn one JSON record into a Document. `line` is the JSONL line number or
/// the array index for `.json` inputs.
pub(crate) fn document_from_record(
    source_id: &str,
    line: Option<usize>,
    record: Value,
) -> Result<Document, ChunkError> {
    let Value::Object(mut object) = record else {
        return Err(ChunkError::malformed(
            source_id,
            line,
            "record is not a JSON object",
        ));
    };

    let mut text = None;
    for key in TEXT_KEYS {
        match object.remove(key) {
            Some(Value::String(s)) => {
                text = Some(s);
                break;
            }
            Some(other) => {
                // Put it back; a non-string `text` must not shadow a valid
                // `page_content` or `body`.
                object.insert(key.to_string(), other);
            }
            None => {}
        }
    }
    let Some(text) = text else {
        return Err(ChunkError::malformed(
            source_id,
            line,
            "record has no string-valued 'text', 'page_content' or 'body' key",
        ));
    };

    let page = ["page", "page_number"]
        .iter()
        .find_map(|key| object.get(*key))
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok());

    // Keep scalar metadata only.
    let metadata: Map<String, Value> = object
        .into_iter()
        .filter(|(_, v)| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)))
        .collect();

    Ok(Document {
        source_id: source_id.to_string(),
        text,
        page,
        metadata,
    })
}

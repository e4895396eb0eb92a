use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::ChunkError;
use crate::ingest::{document_from_record, Document};

/// Streaming JSON Lines reader: one record materialized at a time, so an
/// arbitrarily large input stays in bounded memory. The file handle is
/// released when the reader is dropped. Forward-only; restart by reopening.
pub struct JsonlReader {
    source_id: String,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl JsonlReader {
    pub fn open(path: &Path) -> Result<Self, ChunkError> {
        let file = File::open(path)?;
        Ok(Self {
            source_id: path.to_string_lossy().to_string(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for JsonlReader {
    type Item = Result<Document, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            let record = match serde_json::from_str(&line) {
                Ok(value) => value,
                Err(e) => {
                    return Some(Err(ChunkError::malformed(
                        &self.source_id,
                        Some(self.line_no),
                        format!("invalid JSON: {e}"),
                    )))
                }
            };
            return Some(document_from_record(
                &self.source_id,
                Some(self.line_no),
                record,
            ));
        }
    }
}

use std::fmt;
use std::io::Read;

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};

use crate::error::ChunkError;
use crate::ingest::{document_from_record, Document};

/// Stream a `.json` input (a single object, or an array of objects) through
/// `sink` one record at a time. Array elements are deserialized lazily via
/// a sequence visitor, so a large array never lives in memory at once; the
/// record's array index is reported as its line.
///
/// A `sink` error aborts the traversal and is returned as-is.
pub(crate) fn stream_records<R, F>(
    source_id: &str,
    reader: R,
    mut sink: F,
) -> Result<(), ChunkError>
where
    R: Read,
    F: FnMut(Result<Document, ChunkError>) -> Result<(), ChunkError>,
{
    let mut abort: Option<ChunkError> = None;
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let outcome = RecordSeed {
        source_id,
        sink: &mut sink,
        abort: &mut abort,
    }
    .deserialize(&mut deserializer);

    if let Some(error) = abort {
        return Err(error);
    }
    outcome.map_err(|e| ChunkError::malformed(source_id, None, format!("invalid JSON: {e}")))?;
    deserializer
        .end()
        .map_err(|e| ChunkError::malformed(source_id, None, format!("trailing content: {e}")))?;
    Ok(())
}

struct RecordSeed<'a, F> {
    source_id: &'a str,
    sink: &'a mut F,
    abort: &'a mut Option<ChunkError>,
}

impl<'de, F> DeserializeSeed<'de> for RecordSeed<'_, F>
where
    F: FnMut(Result<Document, ChunkError>) -> Result<(), ChunkError>,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, F> Visitor<'de> for RecordSeed<'_, F>
where
    F: FnMut(Result<Document, ChunkError>) -> Result<(), ChunkError>,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object or an array of objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut index = 0;
        while let Some(value) = seq.next_element::<Value>()? {
            let record = document_from_record(self.source_id, Some(index), value);
            if let Err(error) = (self.sink)(record) {
                *self.abort = Some(error);
                return Err(de::Error::custom("ingestion aborted"));
            }
            index += 1;
        }
        Ok(())
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Map::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            object.insert(key, value);
        }
        let record = document_from_record(self.source_id, None, Value::Object(object));
        if let Err(error) = (self.sink)(record) {
            *self.abort = Some(error);
            return Err(de::Error::custom("ingestion aborted"));
        }
        Ok(())
    }
}

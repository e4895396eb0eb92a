use std::ops::Range;

use super::overlap::pad_with_overlap;
use super::{Measure, RecursiveSplitter, Span, TextSplitter};
use crate::embedder::{Batcher, EmbeddingProvider};
use crate::error::ChunkError;

const EMBED_BATCH_SIZE: usize = 32;

/// Embedding-distance break detection.
///
/// Each sentence is embedded; a split point is inserted between two
/// consecutive sentences whose cosine distance is strictly greater than the
/// configured percentile of all consecutive distances in the document.
/// Ties at the threshold never split, and the left-to-right scan makes the
/// break set deterministic. Low-distance runs are then merged up to the
/// chunk size.
pub struct SemanticSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    measure: Measure,
    threshold_percentile: f64,
    provider: Box<dyn EmbeddingProvider>,
    cascade: RecursiveSplitter,
}

impl SemanticSplitter {
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        measure: Measure,
        threshold_percentile: f64,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            measure: measure.clone(),
            threshold_percentile,
            provider,
            cascade: RecursiveSplitter::new(chunk_size, 0, measure, Vec::new()),
        }
    }

    /// Greedily pack one low-distance run of sentences into primaries of at
    /// most `chunk_size`; a single oversized sentence falls back to the
    /// separator cascade.
    fn pack_run(&self, text: &str, run: &[Range<usize>], primaries: &mut Vec<Range<usize>>) {
        let mut current: Option<Range<usize>> = None;
        for sentence in run {
            let sentence_size = self.measure.size_of(&text[sentence.clone()]);
            if sentence_size > self.chunk_size {
                if let Some(open) = current.take() {
                    primaries.push(open);
                }
                self.cascade.cascade_range(text, sentence.clone(), primaries);
                continue;
            }
            match current.take() {
                None => current = Some(sentence.clone()),
                Some(open) => {
                    let merged = self.measure.size_of(&text[open.start..sentence.end]);
                    if merged > self.chunk_size {
                        primaries.push(open);
                        current = Some(sentence.clone());
                    } else {
                        current = Some(open.start..sentence.end);
                    }
                }
            }
        }
        if let Some(open) = current {
            primaries.push(open);
        }
    }

    fn embed_sentences(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, ChunkError> {
        let batcher = Batcher::new(EMBED_BATCH_SIZE);
        let mut embeddings = Vec::with_capacity(sentences.len());
        for batch in batcher.split(sentences) {
            embeddings.extend(self.provider.embed(batch)?);
        }
        Ok(embeddings)
    }
}

impl TextSplitter for SemanticSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<Span>, ChunkError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        if self.measure.size_of(text) <= self.chunk_size {
            return Ok(pad_with_overlap(
                text,
                &[0..text.len()],
                self.chunk_overlap,
                &self.measure,
            ));
        }

        let sentences = sentence_ranges(text);
        if sentences.len() <= 1 {
            // No sentence boundaries to embed between; the separator
            // cascade enforces the size budget on its own.
            let mut primaries = Vec::new();
            self.cascade.cascade_range(text, 0..text.len(), &mut primaries);
            return Ok(pad_with_overlap(
                text,
                &primaries,
                self.chunk_overlap,
                &self.measure,
            ));
        }

        let sentence_texts: Vec<String> = sentences
            .iter()
            .map(|r| text[r.clone()].to_string())
            .collect();
        let embeddings = self.embed_sentences(&sentence_texts)?;

        let distances: Vec<f64> = embeddings
            .windows(2)
            .map(|pair| cosine_distance(&pair[0], &pair[1]))
            .collect();
        let threshold = percentile(&distances, self.threshold_percentile);

        // Group sentences between high-distance breaks, then pack each
        // low-distance run up to the size budget. A break is never merged
        // over; the size cap only adds further splits inside a run.
        let mut primaries: Vec<Range<usize>> = Vec::new();
        let mut run_start = 0;
        for boundary in 0..=distances.len() {
            let run_ends = boundary == distances.len() || distances[boundary] > threshold;
            if !run_ends {
                continue;
            }
            self.pack_run(text, &sentences[run_start..=boundary], &mut primaries);
            run_start = boundary + 1;
        }

        Ok(pad_with_overlap(
            text,
            &primaries,
            self.chunk_overlap,
            &self.measure,
        ))
    }
}

/// Split text into sentence byte ranges that tile the input: boundaries
/// after `. `, `! `, `? ` and at newlines. Whitespace-only pieces are glued
/// to their predecessor so ranges stay contiguous.
pub(super) fn sentence_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let boundary = match bytes[i] {
            b'\n' => Some(i + 1),
            b'.' | b'!' | b'?' if bytes.get(i + 1) == Some(&b' ') => Some(i + 2),
            _ => None,
        };
        if let Some(end) = boundary {
            if text[start..end].trim().is_empty() {
                // Extend the previous sentence over bare whitespace.
                if let Some(last) = ranges.last_mut() {
                    last.end = end;
                }
            } else {
                ranges.push(start..end);
            }
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }
    if start < text.len() {
        if text[start..].trim().is_empty() {
            if let Some(last) = ranges.last_mut() {
                last.end = text.len();
            }
        } else {
            ranges.push(start..text.len());
        }
    }
    ranges
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Nearest-rank percentile of `values`; `p` in [0, 100].
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("distances are finite"));
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

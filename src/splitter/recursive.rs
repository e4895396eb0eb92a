use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use super::overlap::pad_with_overlap;
use super::{default_separators, Measure, Span, TextSplitter};
use crate::error::ChunkError;

/// Hierarchical separator-cascade splitter.
///
/// Attempts the coarsest separator first and recurses into finer ones only
/// for fragments still exceeding the chunk size; adjacent undersized
/// fragments are merged back up to the size budget before a chunk closes.
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    measure: Measure,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        measure: Measure,
        separators: Vec<String>,
    ) -> Self {
        let separators = if separators.is_empty() {
            default_separators()
        } else {
            separators
        };
        Self {
            chunk_size,
            chunk_overlap,
            measure,
            separators,
        }
    }

    /// Split `range` of `text` into primary chunk ranges, appending to `out`.
    /// Also used by the markdown splitter for oversized structural blocks.
    pub(super) fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[String],
        out: &mut Vec<Range<usize>>,
    ) {
        let slice = &text[range.clone()];
        if slice.is_empty() {
            return;
        }
        // A fragment at or under the budget is never split further.
        if self.measure.size_of(slice) <= self.chunk_size {
            out.push(range);
            return;
        }
        let Some((separator, rest)) = separators.split_first() else {
            out.push(range);
            return;
        };

        if separator.is_empty() {
            self.split_by_units(text, range, out);
            return;
        }

        // Fragment boundaries local to the slice, separators excluded.
        let mut fragments: Vec<Range<usize>> = Vec::new();
        let mut cursor = 0;
        for (at, matched) in slice.match_indices(separator.as_str()) {
            fragments.push(cursor..at);
            cursor = at + matched.len();
        }
        fragments.push(cursor..slice.len());

        if fragments.len() == 1 {
            // Separator absent; fall through to the next finer one.
            self.split_range(text, range, rest, out);
            return;
        }

        let base = range.start;
        let mut current: Option<Range<usize>> = None;
        for fragment in fragments {
            if fragment.is_empty() {
                continue;
            }
            let fragment_size = self.measure.size_of(&slice[fragment.clone()]);

            if fragment_size > self.chunk_size {
                if let Some(open) = current.take() {
                    out.push(base + open.start..base + open.end);
                }
                self.split_range(text, base + fragment.start..base + fragment.end, rest, out);
                continue;
            }

            match current.take() {
                None => current = Some(fragment),
                Some(open) => {
                    // Size of the merged candidate, separator included.
                    let merged = self.measure.size_of(&slice[open.start..fragment.end]);
                    if merged > self.chunk_size {
                        out.push(base + open.start..base + open.end);
                        current = Some(fragment);
                    } else {
                        current = Some(open.start..fragment.end);
                    }
                }
            }
        }
        if let Some(open) = current {
            out.push(base + open.start..base + open.end);
        }
    }

    /// Last-resort split at the unit level (empty-string separator):
    /// fixed windows of `chunk_size` units, stepping over grapheme clusters
    /// so no window edge lands inside one.
    fn split_by_units(&self, text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
        let slice = &text[range.clone()];
        match &self.measure {
            Measure::Characters => {
                let mut window_start = 0;
                let mut units = 0;
                for (at, cluster) in slice.grapheme_indices(true) {
                    let cluster_units = cluster.chars().count();
                    if units + cluster_units > self.chunk_size && units > 0 {
                        out.push(range.start + window_start..range.start + at);
                        window_start = at;
                        units = 0;
                    }
                    units += cluster_units;
                }
                if window_start < slice.len() {
                    out.push(range.start + window_start..range.end);
                }
            }
            Measure::Tokens(encoder) => {
                let tokens = encoder.encode(slice);
                let mut offsets = vec![0];
                let mut boundary = self.chunk_size;
                while boundary < tokens.len() {
                    let (_, offset) = encoder.safe_boundary(slice, &tokens, boundary);
                    if offset > *offsets.last().expect("offsets never empty") {
                        offsets.push(offset);
                    }
                    boundary += self.chunk_size;
                }
                offsets.push(slice.len());
                for pair in offsets.windows(2) {
                    if pair[0] < pair[1] {
                        out.push(range.start + pair[0]..range.start + pair[1]);
                    }
                }
            }
        }
    }
}

impl RecursiveSplitter {
    /// Entry point for splitting a sub-range with the full cascade.
    pub(super) fn cascade_range(&self, text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
        self.split_range(text, range, &self.separators, out);
    }
}

impl TextSplitter for RecursiveSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<Span>, ChunkError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let mut primaries = Vec::new();
        self.split_range(text, 0..text.len(), &self.separators, &mut primaries);
        Ok(pad_with_overlap(
            text,
            &primaries,
            self.chunk_overlap,
            &self.measure,
        ))
    }
}

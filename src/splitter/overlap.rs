use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use super::{Measure, Span};
use crate::tokenizer::TokenEncoder;

/// Apply the bidirectional overlap contract to a document's primary chunk
/// ranges: chunk k is padded in front with the trailing `overlap` units of
/// chunk k-1 and behind with the leading `overlap` units of chunk k+1.
/// First and last chunks omit the missing side.
///
/// `primaries` are byte ranges into `text`, in source order. The returned
/// spans carry character offsets.
pub(crate) fn pad_with_overlap(
    text: &str,
    primaries: &[Range<usize>],
    overlap: usize,
    measure: &Measure,
) -> Vec<Span> {
    let mut padded: Vec<Range<usize>> = Vec::with_capacity(primaries.len());

    for (k, own) in primaries.iter().enumerate() {
        let start = if k == 0 || overlap == 0 {
            own.start
        } else {
            let prev = &primaries[k - 1];
            back_up(text, prev.end, prev.start, overlap, measure)
        };
        let end = if k + 1 == primaries.len() || overlap == 0 {
            own.end
        } else {
            let next = &primaries[k + 1];
            advance(text, next.start, next.end, overlap, measure)
        };
        padded.push(start..end);
    }

    let char_index = CharIndex::new(text);
    padded
        .into_iter()
        .map(|range| Span {
            text: text[range.clone()].to_string(),
            start: char_index.char_offset(range.start),
            end: char_index.char_offset(range.end),
        })
        .collect()
}

/// Step backward from `from` by `units`, never past `floor`. Character
/// units step over grapheme clusters so a combining sequence is never cut.
fn back_up(text: &str, from: usize, floor: usize, units: usize, measure: &Measure) -> usize {
    let slice = &text[floor..from];
    match measure {
        Measure::Characters => {
            let starts: Vec<usize> = slice.grapheme_indices(true).map(|(i, _)| i).collect();
            if starts.len() <= units {
                floor
            } else {
                floor + starts[starts.len() - units]
            }
        }
        Measure::Tokens(encoder) => {
            floor + token_boundary_from_end(encoder, slice, units)
        }
    }
}

/// Step forward from `from` by `units`, never past `cap`.
fn advance(text: &str, from: usize, cap: usize, units: usize, measure: &Measure) -> usize {
    let slice = &text[from..cap];
    match measure {
        Measure::Characters => {
            let starts: Vec<usize> = slice.grapheme_indices(true).map(|(i, _)| i).collect();
            if starts.len() <= units {
                cap
            } else {
                from + starts[units]
            }
        }
        Measure::Tokens(encoder) => {
            let tokens = encoder.encode(slice);
            if tokens.len() <= units {
                cap
            } else {
                let (_, offset) = encoder.safe_boundary(slice, &tokens, units);
                from + offset
            }
        }
    }
}

fn token_boundary_from_end(encoder: &TokenEncoder, slice: &str, units: usize) -> usize {
    let tokens = encoder.encode(slice);
    if tokens.len() <= units {
        0
    } else {
        let (_, offset) = encoder.safe_boundary(slice, &tokens, tokens.len() - units);
        offset
    }
}

/// Byte-offset to character-offset mapping for one document.
struct CharIndex {
    boundaries: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        Self {
            boundaries: text.char_indices().map(|(i, _)| i).collect(),
        }
    }

    fn char_offset(&self, byte_offset: usize) -> usize {
        self.boundaries.partition_point(|&b| b < byte_offset)
    }
}

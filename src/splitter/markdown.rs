use std::ops::Range;

use super::overlap::pad_with_overlap;
use super::{Measure, RecursiveSplitter, Span, TextSplitter};
use crate::error::ChunkError;

/// Structure-respecting markdown splitter.
///
/// Heading lines, list items and fenced code blocks are hard boundaries: a
/// chunk edge never lands inside one. A heading always opens a fresh chunk.
/// Oversized non-fence blocks fall back to the same separator cascade the
/// recursive splitter uses; an oversized code fence is emitted whole rather
/// than torn open.
pub struct MarkdownSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    measure: Measure,
    cascade: RecursiveSplitter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading,
    Fence,
    ListItem,
    Paragraph,
}

#[derive(Debug)]
struct Block {
    range: Range<usize>,
    kind: BlockKind,
}

impl MarkdownSplitter {
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        measure: Measure,
        separators: Vec<String>,
    ) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            measure: measure.clone(),
            cascade: RecursiveSplitter::new(chunk_size, 0, measure, separators),
        }
    }

    /// Segment the document into structural blocks.
    fn blocks(text: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut paragraph_start: Option<usize> = None;
        let mut fence_start: Option<usize> = None;
        let mut fence_marker = "";

        let mut line_start = 0;
        while line_start <= text.len() {
            let line_end = text[line_start..]
                .find('\n')
                .map(|i| line_start + i + 1)
                .unwrap_or(text.len());
            if line_start == text.len() {
                break;
            }
            let line = &text[line_start..line_end];
            let trimmed = line.trim_end_matches('\n').trim_start();

            if let Some(open) = fence_start {
                if trimmed.starts_with(fence_marker) {
                    blocks.push(Block {
                        range: open..line_end,
                        kind: BlockKind::Fence,
                    });
                    fence_start = None;
                }
                line_start = line_end;
                continue;
            }

            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                if let Some(open) = paragraph_start.take() {
                    blocks.push(Block {
                        range: open..line_start,
                        kind: BlockKind::Paragraph,
                    });
                }
                fence_marker = if trimmed.starts_with("```") { "```" } else { "~~~" };
                fence_start = Some(line_start);
            } else if is_heading(trimmed) {
                if let Some(open) = paragraph_start.take() {
                    blocks.push(Block {
                        range: open..line_start,
                        kind: BlockKind::Paragraph,
                    });
                }
                blocks.push(Block {
                    range: line_start..line_end,
                    kind: BlockKind::Heading,
                });
            } else if is_list_item(trimmed) {
                if let Some(open) = paragraph_start.take() {
                    blocks.push(Block {
                        range: open..line_start,
                        kind: BlockKind::Paragraph,
                    });
                }
                blocks.push(Block {
                    range: line_start..line_end,
                    kind: BlockKind::ListItem,
                });
            } else if trimmed.is_empty() {
                if let Some(open) = paragraph_start.take() {
                    blocks.push(Block {
                        range: open..line_start,
                        kind: BlockKind::Paragraph,
                    });
                }
            } else if paragraph_start.is_none() {
                paragraph_start = Some(line_start);
            }

            line_start = line_end;
        }

        // Unterminated fence or trailing paragraph runs to end of input.
        if let Some(open) = fence_start {
            blocks.push(Block {
                range: open..text.len(),
                kind: BlockKind::Fence,
            });
        }
        if let Some(open) = paragraph_start {
            blocks.push(Block {
                range: open..text.len(),
                kind: BlockKind::Paragraph,
            });
        }
        blocks
    }
}

fn is_heading(trimmed: &str) -> bool {
    let hashes = trimmed.bytes().take_while(|&b| b == b'#').count();
    (1..=6).contains(&hashes) && trimmed.as_bytes().get(hashes) == Some(&b' ')
}

fn is_list_item(trimmed: &str) -> bool {
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }
    let digits = trimmed.bytes().take_while(|b| b.is_ascii_digit()).count();
    digits > 0
        && (trimmed[digits..].starts_with(". ") || trimmed[digits..].starts_with(") "))
}

impl TextSplitter for MarkdownSplitter {
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

        let mut primaries: Vec<Range<usize>> = Vec::new();
        let mut current: Option<Range<usize>> = None;

        for block in Self::blocks(text) {
            let block_size = self.measure.size_of(&text[block.range.clone()]);

            if block_size > self.chunk_size {
                if let Some(open) = current.take() {
                    primaries.push(open);
                }
                if block.kind == BlockKind::Fence {
                    // Never split inside a code fence, even an oversized one.
                    primaries.push(block.range);
                } else {
                    self.cascade.cascade_range(text, block.range, &mut primaries);
                }
                continue;
            }

            match current.take() {
                None => current = Some(block.range),
                Some(open) => {
                    let merged_size = self.measure.size_of(&text[open.start..block.range.end]);
                    if block.kind == BlockKind::Heading || merged_size > self.chunk_size {
                        primaries.push(open);
                        current = Some(block.range);
                    } else {
                        current = Some(open.start..block.range.end);
                    }
                }
            }
        }
        if let Some(open) = current {
            primaries.push(open);
        }

        Ok(pad_with_overlap(
            text,
            &primaries,
            self.chunk_overlap,
            &self.measure,
        ))
    }
}

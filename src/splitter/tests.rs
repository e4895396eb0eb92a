use std::sync::Arc;

use super::*;
use crate::config::{ChunkConfig, OverlapUnit, Strategy};
use crate::error::ChunkError;
use crate::tokenizer::TokenEncoder;

fn config(strategy: Strategy, size: usize, overlap: usize) -> ChunkConfig {
    ChunkConfig::new(strategy, size, overlap).unwrap()
}

// --- recursive ---

#[test]
fn test_recursive_twenty_char_scenario() {
    // 20 characters, budget 10, overlap 2: two primary chunks of 10, the
    // second prefixed with the first's trailing two characters.
    let splitter = build_splitter(&config(Strategy::Recursive, 10, 2)).unwrap();
    let spans = splitter.split_text("abcdefghijklmnopqrst").unwrap();

    assert_eq!(spans.len(), 2);
    assert!(spans[1].text.starts_with("ij"));
    assert_eq!(spans[0].start, 0);
    assert_eq!(spans[1].start, 8);
    assert_eq!(spans[1].end, 20);
}

#[test]
fn test_recursive_short_input_single_chunk() {
    let splitter = build_splitter(&config(Strategy::Recursive, 100, 10)).unwrap();
    let spans = splitter.split_text("well under budget").unwrap();

    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].text, "well under budget");
    assert_eq!(spans[0].start, 0);
}

#[test]
fn test_recursive_empty_input_zero_chunks() {
    let splitter = build_splitter(&config(Strategy::Recursive, 100, 10)).unwrap();
    assert!(splitter.split_text("").unwrap().is_empty());
}

#[test]
fn test_recursive_merges_undersized_fragments() {
    let splitter = RecursiveSplitter::new(7, 0, Measure::Characters, Vec::new());
    let spans = splitter.split_text("aaa bbb ccc").unwrap();

    let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["aaa bbb", "ccc"]);
}

#[test]
fn test_recursive_prefers_paragraph_breaks() {
    let text = "para one.\n\npara two.\n\npara three.";
    let splitter = RecursiveSplitter::new(25, 0, Measure::Characters, Vec::new());
    let spans = splitter.split_text(text).unwrap();

    let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["para one.\n\npara two.", "para three."]);
}

#[test]
fn test_recursive_bidirectional_overlap() {
    let text = "para one.\n\npara two.\n\npara three.";
    let splitter = RecursiveSplitter::new(25, 4, Measure::Characters, Vec::new());
    let spans = splitter.split_text(text).unwrap();

    assert_eq!(spans.len(), 2);
    // Leading side of the successor, trailing side of the predecessor.
    assert!(spans[0].text.ends_with("para"));
    assert!(spans[1].text.starts_with("two."));
}

#[test]
fn test_recursive_exact_size_fragment_not_split() {
    let splitter = RecursiveSplitter::new(11, 0, Measure::Characters, Vec::new());
    let spans = splitter.split_text("exactly 11.").unwrap();
    assert_eq!(spans.len(), 1);
}

#[test]
fn test_recursive_token_measured() {
    let config = config(Strategy::Recursive, 8, 0).with_overlap_unit(OverlapUnit::Tokens);
    let splitter = build_splitter(&config).unwrap();
    let text = "First sentence here. Second sentence here. Third sentence here. \
                Fourth sentence here. Fifth sentence here.";
    let spans = splitter.split_text(text).unwrap();
    assert!(spans.len() > 1);

    let encoder = TokenEncoder::by_name("cl100k_base").unwrap();
    for span in &spans {
        assert!(encoder.count(&span.text) <= 8, "span over token budget: {:?}", span.text);
    }
}

// --- markdown ---

#[test]
fn test_markdown_heading_opens_fresh_chunk() {
    let text = "# Title\nIntro paragraph here.\n\n## Section A\nBody of section a.\n";
    let splitter = MarkdownSplitter::new(40, 0, Measure::Characters, Vec::new());
    let spans = splitter.split_text(text).unwrap();

    assert!(spans.len() >= 2);
    assert!(spans.iter().any(|s| s.text.starts_with("## Section A")));
    // Nothing from the intro bleeds past the heading boundary.
    let section = spans.iter().find(|s| s.text.starts_with("## Section A")).unwrap();
    assert!(!section.text.contains("Intro"));
}

#[test]
fn test_markdown_never_splits_code_fence() {
    let fence = "```\nlet x = 1;\nlet y = 2;\nlet z = 3;\n```\n";
    let text = format!("# Code\n\nSome prose before the fence.\n\n{fence}\nAfter the fence.\n");
    let splitter = MarkdownSplitter::new(30, 0, Measure::Characters, Vec::new());
    let spans = splitter.split_text(&text).unwrap();

    // The fence is oversized for the budget but still emitted whole.
    let with_fence: Vec<_> = spans.iter().filter(|s| s.text.contains("let x")).collect();
    assert_eq!(with_fence.len(), 1);
    assert!(with_fence[0].text.contains("let z = 3;"));
    assert_eq!(with_fence[0].text.matches("```").count(), 2);
}

#[test]
fn test_markdown_list_items_are_boundaries() {
    let text = "## List\n- item one is here\n- item two is here\n- item three is here\n";
    let splitter = MarkdownSplitter::new(28, 0, Measure::Characters, Vec::new());
    let spans = splitter.split_text(text).unwrap();

    // Chunk edges land between items, never inside one.
    for span in &spans {
        let items = span.text.matches("- item").count();
        for item in ["one", "two", "three"] {
            if span.text.contains(item) {
                assert!(span.text.contains(&format!("- item {item} is here")));
            }
        }
        assert!(items >= 1 || !span.text.contains("- item"));
    }
}

#[test]
fn test_markdown_short_input_single_chunk() {
    let splitter = MarkdownSplitter::new(100, 10, Measure::Characters, Vec::new());
    let spans = splitter.split_text("# Tiny\n\nA short note.").unwrap();
    assert_eq!(spans.len(), 1);
}

#[test]
fn test_markdown_empty_input_zero_chunks() {
    let splitter = MarkdownSplitter::new(100, 10, Measure::Characters, Vec::new());
    assert!(splitter.split_text("").unwrap().is_empty());
}

// --- token ---

#[test]
fn test_token_empty_input_zero_chunks() {
    let splitter = build_splitter(&config(Strategy::Token, 16, 4)).unwrap();
    assert!(splitter.split_text("").unwrap().is_empty());
}

#[test]
fn test_token_short_input_single_chunk() {
    let splitter = build_splitter(&config(Strategy::Token, 512, 64)).unwrap();
    let spans = splitter.split_text("short text").unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].text, "short text");
}

#[test]
fn test_token_windows_respect_budget_and_step() {
    let encoder = Arc::new(TokenEncoder::by_name("cl100k_base").unwrap());
    let splitter = TokenSplitter::new(8, 2, Arc::clone(&encoder));
    let text = "one two three four five six seven eight nine ten eleven twelve \
                thirteen fourteen fifteen sixteen";
    let spans = splitter.split_text(text).unwrap();

    assert!(spans.len() > 1);
    for span in &spans {
        assert!(span.end - span.start <= 8);
    }
    for pair in spans.windows(2) {
        assert_eq!(pair[1].start, pair[0].start + 6);
    }
}

#[test]
fn test_token_round_trip_reconstruction() {
    let encoder = Arc::new(TokenEncoder::by_name("cl100k_base").unwrap());
    let splitter = TokenSplitter::new(8, 3, Arc::clone(&encoder));
    let text = "The quick brown fox jumps over the lazy dog, then naps in the warm sun \
                until evening falls over the quiet field.";
    let spans = splitter.split_text(text).unwrap();
    assert!(spans.len() > 1);

    // Dropping each span's shared prefix via its token offsets must tile
    // the original text exactly.
    let tokens = encoder.encode(text);
    let mut reconstructed = String::new();
    let mut consumed = 0;
    for span in &spans {
        reconstructed.push_str(&encoder.decode(tokens[consumed..span.end].to_vec()).unwrap());
        consumed = span.end;
    }
    assert_eq!(reconstructed, text);
}

#[test]
fn test_token_never_splits_multibyte_content() {
    let encoder = Arc::new(TokenEncoder::by_name("cl100k_base").unwrap());
    let splitter = TokenSplitter::new(4, 1, encoder);
    let text = "naïve café 🌍 coöperate résumé 👍 straße";
    let spans = splitter.split_text(text).unwrap();

    // Every span is a well-formed slice of the input.
    for span in &spans {
        assert!(text.contains(&span.text));
    }
}

// --- semantic ---

struct TopicProvider;

impl crate::embedder::EmbeddingProvider for TopicProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChunkError> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("Rocket") {
                    vec![0.0, 1.0]
                } else {
                    vec![1.0, 0.0]
                }
            })
            .collect())
    }
}

struct DownProvider;

impl crate::embedder::EmbeddingProvider for DownProvider {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ChunkError> {
        Err(ChunkError::EmbeddingUnavailable("connection refused".to_string()))
    }
}

#[test]
fn test_semantic_splits_at_topic_change() {
    let splitter = SemanticSplitter::new(
        30,
        0,
        Measure::Characters,
        50.0,
        Box::new(TopicProvider),
    );
    let text = "Cats purr. Cats nap. Rockets fly. Rockets launch.";
    let spans = splitter.split_text(text).unwrap();

    assert_eq!(spans.len(), 2);
    assert!(spans[0].text.contains("Cats nap"));
    assert!(spans[1].text.trim_start().starts_with("Rockets fly"));
}

#[test]
fn test_semantic_break_is_not_merged_over() {
    // A purely size-driven packer would close the first chunk after
    // "Rockets launch. "; the detected topic break keeps the cat
    // sentences separate even though more would fit.
    let splitter = SemanticSplitter::new(
        62,
        0,
        Measure::Characters,
        50.0,
        Box::new(TopicProvider),
    );
    let text = "Cats purr. Cats nap. Rockets fly. Rockets launch. Rockets land.";
    let spans = splitter.split_text(text).unwrap();

    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].text, "Cats purr. Cats nap. ");
    assert!(spans[1].text.starts_with("Rockets fly"));
}

#[test]
fn test_semantic_provider_failure_is_fatal() {
    let splitter = SemanticSplitter::new(
        20,
        0,
        Measure::Characters,
        95.0,
        Box::new(DownProvider),
    );
    let err = splitter
        .split_text("First topic here. Second topic there. Third topic everywhere.")
        .unwrap_err();
    assert!(matches!(err, ChunkError::EmbeddingUnavailable(_)));
}

#[test]
fn test_semantic_short_input_skips_provider() {
    // A document under the budget never reaches the embedding call.
    let splitter = SemanticSplitter::new(
        200,
        0,
        Measure::Characters,
        95.0,
        Box::new(DownProvider),
    );
    let spans = splitter.split_text("One short note.").unwrap();
    assert_eq!(spans.len(), 1);
}

#[test]
fn test_semantic_single_oversized_sentence_respects_budget() {
    // One sentence with no terminator or newline still gets sized down;
    // there is nothing to embed between, so the provider is never called.
    let splitter = SemanticSplitter::new(
        30,
        0,
        Measure::Characters,
        95.0,
        Box::new(DownProvider),
    );
    let text = "words that simply keep going and going without a single boundary marker anywhere in sight";
    let spans = splitter.split_text(text).unwrap();

    assert!(spans.len() > 1);
    for span in &spans {
        assert!(
            span.text.chars().count() <= 30,
            "span over budget: {:?}",
            span.text
        );
    }
}

#[test]
fn test_semantic_empty_input_zero_chunks() {
    let splitter = SemanticSplitter::new(200, 0, Measure::Characters, 95.0, Box::new(DownProvider));
    assert!(splitter.split_text("").unwrap().is_empty());
}

// --- factory ---

#[test]
fn test_factory_dispatches_every_strategy() {
    assert!(build_splitter(&config(Strategy::Recursive, 100, 10)).is_ok());
    assert!(build_splitter(&config(Strategy::Markdown, 100, 10)).is_ok());
    assert!(build_splitter(&config(Strategy::Token, 100, 10)).is_ok());

    // Missing embedding target fails at config construction already.
    assert!(ChunkConfig::new(Strategy::Semantic, 100, 10).is_err());

    let mut semantic = ChunkConfig::new(Strategy::Recursive, 100, 10)
        .unwrap()
        .with_embedding("http://localhost:18115", "text-embedding-3-small")
        .unwrap();
    semantic.strategy = Strategy::Semantic;
    assert!(build_splitter_with_provider(&semantic, Box::new(TopicProvider)).is_ok());
}

#[test]
fn test_factory_guards_bypassed_validation() {
    // A config assembled field-by-field, skipping the constructor.
    let config = ChunkConfig {
        strategy: Strategy::Recursive,
        chunk_size: 10,
        chunk_overlap: 10,
        overlap_unit: OverlapUnit::Characters,
        encoding_name: "cl100k_base".to_string(),
        separators: Vec::new(),
        embed_model: None,
        azure_deployment: None,
        embed_endpoint: None,
        semantic_threshold_percentile: 95.0,
    };
    assert!(matches!(
        build_splitter(&config),
        Err(ChunkError::Configuration(_))
    ));
}

#[test]
fn test_factory_rejects_unknown_encoding() {
    let config = config(Strategy::Token, 100, 10).with_encoding("not_an_encoding");
    assert!(build_splitter(&config).is_err());
}

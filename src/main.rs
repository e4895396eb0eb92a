use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chunkmill::{
    build_splitter, chunk_document, read_documents, ChunkConfig, ErrorPolicy, IdAssigner,
    OverlapUnit, Strategy,
};

/// Split documents into token- or character-budgeted chunks with stable IDs.
#[derive(Parser, Debug)]
#[command(name = "chunkmill", version)]
struct Args {
    /// Input file or directory (.txt, .md, .markdown, .json, .jsonl, .ndjson)
    input: PathBuf,

    /// Output JSON Lines file, one chunk per line
    output: PathBuf,

    /// Splitting strategy: recursive, markdown, token or semantic
    #[arg(long, default_value = "recursive")]
    strategy: String,

    /// Chunk size budget (primary content, before overlap padding)
    #[arg(long, default_value_t = 512)]
    chunk_size: usize,

    /// Overlap shared with each neighbouring chunk
    #[arg(long, default_value_t = 64)]
    chunk_overlap: usize,

    /// Unit for overlap and character-strategy sizing: characters or tokens
    #[arg(long, default_value = "characters")]
    overlap_unit: String,

    /// tiktoken encoding table name
    #[arg(long, default_value = "cl100k_base")]
    encoding: String,

    /// Chunk ID path disclosure: rel, hash or abs
    #[arg(long, default_value = "rel")]
    id_mode: String,

    /// Base directory for rel-mode IDs (defaults to the input directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Acknowledge that abs-mode IDs expose local filesystem paths
    #[arg(long)]
    allow_abs_paths: bool,

    /// Malformed-record policy: skip or abort
    #[arg(long, default_value = "skip")]
    on_error: String,

    /// Embedding server endpoint (semantic strategy)
    #[arg(long)]
    embed_endpoint: Option<String>,

    /// Embedding model name (semantic strategy)
    #[arg(long)]
    embed_model: Option<String>,

    /// Azure deployment name (semantic strategy)
    #[arg(long)]
    azure_deployment: Option<String>,

    /// Percentile of sentence distances above which a semantic break opens
    #[arg(long, default_value_t = 95.0)]
    semantic_percentile: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = build_config(&args)?;

    let assigner = match args.id_mode.as_str() {
        "rel" => {
            let base = args.base_dir.clone().unwrap_or_else(|| default_base(&args.input));
            IdAssigner::relative(base)
        }
        "hash" => IdAssigner::hashed(),
        "abs" => IdAssigner::absolute(args.allow_abs_paths)?,
        other => bail!("unknown id mode '{other}' (expected rel, hash or abs)"),
    };

    let policy = match args.on_error.as_str() {
        "skip" => ErrorPolicy::Skip,
        "abort" => ErrorPolicy::Abort,
        other => bail!("unknown error policy '{other}' (expected skip or abort)"),
    };

    eprintln!("[chunkmill] Reading {}", args.input.display());
    let (documents, issues) = read_documents(&args.input, policy)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    eprintln!(
        "[chunkmill] ✓ {} documents ({} records skipped)",
        documents.len(),
        issues.len()
    );

    let splitter = build_splitter(&config)?;
    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut out = BufWriter::new(file);

    let mut total_chunks = 0usize;
    for document in &documents {
        let chunks = chunk_document(document, &*splitter, &assigner)
            .with_context(|| format!("failed to chunk {}", document.source_id))?;
        for chunk in &chunks {
            serde_json::to_writer(&mut out, chunk)?;
            out.write_all(b"\n")?;
        }
        total_chunks += chunks.len();
    }
    out.flush()?;

    eprintln!(
        "[chunkmill] ✓ Wrote {} chunks from {} documents to {}",
        total_chunks,
        documents.len(),
        args.output.display()
    );
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!(
                "[chunkmill] skipped {} line {:?}: {}",
                issue.source_id, issue.line, issue.reason
            );
        }
    }

    Ok(())
}

/// Assemble the full config before validating, so the embedding settings
/// are in place by the time the semantic strategy's requirements are
/// checked.
fn build_config(args: &Args) -> Result<ChunkConfig> {
    let config = ChunkConfig {
        strategy: Strategy::parse(&args.strategy)?,
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
        overlap_unit: parse_overlap_unit(&args.overlap_unit)?,
        encoding_name: args.encoding.clone(),
        separators: Vec::new(),
        embed_model: args.embed_model.clone(),
        azure_deployment: args.azure_deployment.clone(),
        embed_endpoint: args.embed_endpoint.clone(),
        semantic_threshold_percentile: args.semantic_percentile,
    };
    config.validate()?;
    Ok(config)
}

fn parse_overlap_unit(name: &str) -> Result<OverlapUnit> {
    match name {
        "characters" | "chars" => Ok(OverlapUnit::Characters),
        "tokens" => Ok(OverlapUnit::Tokens),
        other => bail!("unknown overlap unit '{other}' (expected characters or tokens)"),
    }
}

fn default_base(input: &PathBuf) -> PathBuf {
    if input.is_dir() {
        input.clone()
    } else {
        input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

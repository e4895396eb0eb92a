use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::ChunkError;

/// How much of the source path a chunk ID may disclose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdMode {
    /// Source path relative to a base directory; sources that escape the
    /// base fall back to `Hash` for that document.
    Rel { base: PathBuf },
    /// Fixed-length hash of the source path. Stable across machines,
    /// discloses nothing.
    Hash,
    /// The literal path. Leaks local filesystem structure, so it requires
    /// an explicit opt-in at construction.
    Abs,
}

/// Derives deterministic, collision-resistant chunk identifiers.
///
/// Stateless: the ID is a pure function of (source, page, position,
/// content) plus the configured mode, so re-chunking the same input always
/// reproduces the same IDs.
pub struct IdAssigner {
    mode: IdMode,
}

impl IdAssigner {
    pub fn relative(base: impl Into<PathBuf>) -> Self {
        Self {
            mode: IdMode::Rel { base: base.into() },
        }
    }

    pub fn hashed() -> Self {
        Self { mode: IdMode::Hash }
    }

    /// Absolute-path IDs require acknowledging the disclosure. The policy
    /// is checked here, before any document is processed.
    pub fn absolute(acknowledged: bool) -> Result<Self, ChunkError> {
        if !acknowledged {
            return Err(ChunkError::Policy(
                "absolute-path chunk IDs disclose local filesystem structure; \
                 pass the explicit opt-in to enable them"
                    .to_string(),
            ));
        }
        Ok(Self { mode: IdMode::Abs })
    }

    /// `<prefix>#p<page>.<position>-<hash12>`. Pages default to 1 for
    /// sources without page structure.
    pub fn assign(&self, source: &str, page: Option<u32>, position: usize, content: &str) -> String {
        let prefix = match &self.mode {
            IdMode::Rel { base } => relative_prefix(source, base)
                .unwrap_or_else(|| hashed_prefix(source)),
            IdMode::Hash => hashed_prefix(source),
            IdMode::Abs => normalize(Path::new(source))
                .map(|p| path_string(&p))
                .unwrap_or_else(|| source.to_string()),
        };
        let digest = short_sha256(content.as_bytes(), 12);
        format!("{prefix}#p{}.{position}-{digest}", page.unwrap_or(1))
    }
}

/// Resolve `source` against `base` and express it relative to `base`.
/// Returns `None` when the source escapes the base directory, including
/// through `..` traversal.
fn relative_prefix(source: &str, base: &Path) -> Option<String> {
    let base = normalize(base)?;
    let source_path = Path::new(source);
    let resolved = if source_path.is_absolute() {
        normalize(source_path)?
    } else {
        normalize(&base.join(source_path))?
    };
    let relative = resolved.strip_prefix(&base).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(path_string(relative))
}

fn hashed_prefix(source: &str) -> String {
    let canonical = normalize(Path::new(source))
        .map(|p| path_string(&p))
        .unwrap_or_else(|| source.to_string());
    short_sha256(canonical.as_bytes(), 16)
}

/// Lexical normalization: resolves `.` and `..` without touching the
/// filesystem, so URL-ish and not-yet-existing sources still get stable
/// IDs. Returns `None` when `..` pops past the start of the path.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}

/// Forward-slash rendering so IDs match across platforms.
fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn short_sha256(bytes: &[u8], len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(len);
    digest
}

//! Source text lookup for frames the client cannot open by path.
//! - SourceResolver: lookup seam used by the `source` request
//! - FsSourceResolver: plain files and entries inside `.zip` archives
//! - MemorySourceResolver: registered texts with an optional fallback

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;

use scriptdbg_runtime::harness::Program;

const ARCHIVE_SUFFIX: &str = ".zip";

/// Failures while resolving source text.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no source available for '{0}'")]
    Unavailable(SmolStr),

    #[error("read {path}: {source}")]
    Read {
        path: SmolStr,
        #[source]
        source: std::io::Error,
    },

    #[error("archive {archive}: {message}")]
    Archive { archive: SmolStr, message: String },
}

/// Produces source text for a file key (a path, an archive member path or a synthetic name).
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Result<String, SourceError>;
}

/// Whether a file key points into an archive.
#[must_use]
pub fn is_archive_path(path: &str) -> bool {
    archive_end(path).is_some()
}

/// End of the first `.zip` component, which must be followed by a separator or the end.
fn archive_end(path: &str) -> Option<usize> {
    path.match_indices(ARCHIVE_SUFFIX)
        .map(|(start, suffix)| start + suffix.len())
        .find(|end| matches!(path[*end..].chars().next(), None | Some('/' | '\\')))
}

/// Split `dir/lib.zip/pkg/mod.src` into the archive path and the member name.
#[must_use]
pub fn split_archive_path(path: &str) -> Option<(&str, &str)> {
    let end = archive_end(path)?;
    let (archive, rest) = path.split_at(end);
    let member = rest.trim_start_matches(['/', '\\']);
    if member.is_empty() {
        return None;
    }
    Some((archive, member))
}

/// Reads files from disk, looking inside `.zip` archives for archive member paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceResolver;

impl FsSourceResolver {
    fn read_archive_member(archive: &str, member: &str) -> Result<String, SourceError> {
        let file = std::fs::File::open(Path::new(archive)).map_err(|source| SourceError::Read {
            path: archive.into(),
            source,
        })?;
        let archive_error = |message: String| SourceError::Archive {
            archive: archive.into(),
            message,
        };
        let mut zip = zip::ZipArchive::new(file).map_err(|err| archive_error(err.to_string()))?;
        // Archive members always use forward slashes.
        let member = member.replace('\\', "/");
        let mut entry = zip
            .by_name(&member)
            .map_err(|err| archive_error(format!("{member}: {err}")))?;
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|err| archive_error(format!("{member}: {err}")))?;
        Ok(content)
    }
}

impl SourceResolver for FsSourceResolver {
    fn resolve(&self, key: &str) -> Result<String, SourceError> {
        if key.starts_with('<') && key.ends_with('>') {
            return Err(SourceError::Unavailable(key.into()));
        }
        if let Some((archive, member)) = split_archive_path(key) {
            return Self::read_archive_member(archive, member);
        }
        std::fs::read_to_string(key).map_err(|source| SourceError::Read {
            path: key.into(),
            source,
        })
    }
}

/// In-memory texts keyed by file name.
#[derive(Clone, Default)]
pub struct MemorySourceResolver {
    texts: HashMap<SmolStr, String>,
    fallback: Option<Arc<dyn SourceResolver>>,
}

impl MemorySourceResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rendered text of every file of a simulated program.
    #[must_use]
    pub fn from_program(program: &Program) -> Self {
        let mut resolver = Self::new();
        for file in program.files() {
            if let Some(text) = program.render_file(&file) {
                resolver.insert(file, text);
            }
        }
        resolver
    }

    pub fn insert(&mut self, key: impl Into<SmolStr>, text: impl Into<String>) {
        self.texts.insert(key.into(), text.into());
    }

    /// Consult `fallback` for keys that were never registered.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn SourceResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl std::fmt::Debug for MemorySourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySourceResolver")
            .field("files", &self.texts.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl SourceResolver for MemorySourceResolver {
    fn resolve(&self, key: &str) -> Result<String, SourceError> {
        if let Some(text) = self.texts.get(key) {
            return Ok(text.clone());
        }
        match &self.fallback {
            Some(fallback) => fallback.resolve(key),
            None => Err(SourceError::Unavailable(key.into())),
        }
    }
}

//! Document loading for ingestion.
//!
//! Three optional sources make up the corpus: a CSV table, a PDF guide and a
//! plain-text FAQ. Missing files are skipped, and a source that fails to parse
//! is logged and skipped so the others still get indexed.

pub mod chunking;


use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::CorpusConfig;
use crate::{RagError, Result};

pub use chunking::{page_to_unit, record_to_unit, snippet, split_paragraphs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Tabular,
    Paged,
    Plain,
}

impl fmt::Display for SourceKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tabular => f.write_str("tabular"),
            Self::Paged => f.write_str("paged"),
            Self::Plain => f.write_str("plain text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Loaded,
    Missing,
    Failed(String),
}

/// Outcome of loading one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub kind: SourceKind,
    pub path: PathBuf,
    pub status: SourceStatus,
    pub units: usize,
}

/// All units from every available source, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedCorpus {
    pub documents: Vec<String>,
    pub sources: Vec<SourceStats>,
}

impl LoadedCorpus {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Load every configured source that exists on disk.
#[inline]
pub fn load_corpus(corpus: &CorpusConfig) -> LoadedCorpus {
    let sources = [
        (SourceKind::Tabular, corpus.tabular_path()),
        (SourceKind::Paged, corpus.paged_path()),
        (SourceKind::Plain, corpus.plain_path()),
    ];

    let mut loaded = LoadedCorpus::default();

    for (kind, path) in sources {
        if !path.exists() {
            info!("Skipping {} source, not found: {}", kind, path.display());
            loaded.sources.push(SourceStats {
                kind,
                path,
                status: SourceStatus::Missing,
                units: 0,
            });
            continue;
        }

        info!("Processing {} source: {}", kind, path.display());
        let result = match kind {
            SourceKind::Tabular => load_tabular(&path, &corpus.row_separator),
            SourceKind::Paged => load_paged(&path),
            SourceKind::Plain => load_plain(&path),
        };

        match result {
            Ok(units) => {
                debug!("Loaded {} units from {}", units.len(), path.display());
                loaded.sources.push(SourceStats {
                    kind,
                    path,
                    status: SourceStatus::Loaded,
                    units: units.len(),
                });
                loaded.documents.extend(units);
            }
            Err(e) => {
                warn!("Error reading {} source {}: {}", kind, path.display(), e);
                loaded.sources.push(SourceStats {
                    kind,
                    path,
                    status: SourceStatus::Failed(e.to_string()),
                    units: 0,
                });
            }
        }
    }

    info!("Total documents to index: {}", loaded.len());
    loaded
}

/// One unit per CSV record, fields joined with `separator`. The header row is
/// not indexed.
#[inline]
pub fn load_tabular(path: &Path, separator: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| extraction_error(path, e))?;

    let mut units = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| extraction_error(path, e))?;
        if let Some(unit) = record_to_unit(record.iter(), separator) {
            units.push(unit);
        }
    }

    Ok(units)
}

/// One unit per PDF page with extractable text
#[inline]
pub fn load_paged(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;

    // The PDF parser panics on some malformed documents
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .map_err(|_| extraction_error(path, "PDF parser panicked"))?
        .map_err(|e| extraction_error(path, e))?;

    let total_pages = pages.len();
    let units: Vec<String> = pages.iter().filter_map(|page| page_to_unit(page)).collect();
    debug!(
        "Extracted {} of {} pages from {}",
        units.len(),
        total_pages,
        path.display()
    );

    Ok(units)
}

/// One unit per blank-line separated paragraph
#[inline]
pub fn load_plain(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| extraction_error(path, e))?;
    Ok(split_paragraphs(&content))
}

fn extraction_error(path: &Path, error: impl fmt::Display) -> RagError {
    RagError::Extraction {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

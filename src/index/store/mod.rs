//! Persistence for the index and its text table.
//!
//! The two artifacts are always written and read as a pair. `index.bin` holds a
//! bincode [`IndexHeader`] followed by the row-major vectors, `texts.csv` holds
//! one `text` column whose rows line up with the vectors. The header pins the
//! row count, a digest of the text rows and the embedding model so that a
//! mismatched pair is caught at load time instead of silently returning the
//! wrong text for a hit.


use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{ConsistencyReport, FlatIndex};
use crate::config::Config;
use crate::{RagError, Result};

pub const FORMAT_VERSION: u32 = 1;

const TEXT_COLUMN: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub format_version: u32,
    pub model_id: String,
    pub dimension: usize,
    pub count: usize,
    /// Hex SHA-256 over the text rows, see [`text_digest`]
    pub text_digest: String,
    pub built_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    header: IndexHeader,
    vectors: Vec<f32>,
}

/// A validated index and text table pair
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub header: IndexHeader,
    pub index: FlatIndex,
    pub texts: Vec<String>,
}

/// Raw artifacts before any cross-checking
struct RawArtifacts {
    file: IndexFile,
    texts: Vec<String>,
}

impl RawArtifacts {
    fn report(&self, active_model: &str) -> ConsistencyReport {
        let header = &self.file.header;
        ConsistencyReport::new(
            header.count,
            self.file.vectors.len() / header.dimension,
            self.texts.len(),
            text_digest(&self.texts) == header.text_digest,
            header.model_id.clone(),
            active_model.to_string(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    index_path: PathBuf,
    text_path: PathBuf,
}

impl ArtifactStore {
    #[inline]
    pub fn new(index_path: PathBuf, text_path: PathBuf) -> Self {
        Self {
            index_path,
            text_path,
        }
    }

    /// Store at the artifact locations under the configured base directory
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.index_path(), config.text_table_path())
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[inline]
    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    /// Whether both artifacts exist on disk
    #[inline]
    pub fn exists(&self) -> bool {
        self.index_path.exists() && self.text_path.exists()
    }

    /// Write the index and its text rows.
    ///
    /// Both files go to temporary siblings first and are only renamed into
    /// place once both writes succeeded, so a failure leaves the previous
    /// artifacts untouched.
    #[inline]
    pub fn save(&self, index: &FlatIndex, texts: &[String], model_id: &str) -> Result<IndexHeader> {
        if index.len() != texts.len() {
            return Err(RagError::Inconsistent(format!(
                "Refusing to save {} vectors with {} text rows",
                index.len(),
                texts.len()
            )));
        }

        for path in [&self.index_path, &self.text_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let header = IndexHeader {
            format_version: FORMAT_VERSION,
            model_id: model_id.to_string(),
            dimension: index.dimension(),
            count: index.len(),
            text_digest: text_digest(texts),
            built_at: Utc::now(),
        };

        let index_tmp = temp_path(&self.index_path);
        let text_tmp = temp_path(&self.text_path);

        let written = write_index_file(&index_tmp, &header, index.as_slice())
            .and_then(|()| write_text_table(&text_tmp, texts));
        if let Err(e) = written {
            let _ = fs::remove_file(&index_tmp);
            let _ = fs::remove_file(&text_tmp);
            return Err(e);
        }

        fs::rename(&index_tmp, &self.index_path)?;
        fs::rename(&text_tmp, &self.text_path)?;

        info!(
            "Saved index with {} vectors to {} and text table to {}",
            header.count,
            self.index_path.display(),
            self.text_path.display()
        );
        Ok(header)
    }

    /// Load and validate both artifacts for querying with `active_model`.
    #[inline]
    pub fn load(&self, active_model: &str) -> Result<LoadedArtifacts> {
        let raw = self.read_raw()?;
        let report = raw.report(active_model);

        if !report.counts_match() {
            return Err(RagError::Inconsistent(format!(
                "index header has {} rows, vector data has {}, text table has {}",
                report.header_rows, report.vector_rows, report.text_rows
            )));
        }
        if !report.digest_matches {
            return Err(RagError::Inconsistent(format!(
                "text table {} does not match the digest recorded in {}",
                self.text_path.display(),
                self.index_path.display()
            )));
        }
        if !report.model_matches() {
            return Err(RagError::ModelMismatch {
                built_with: report.built_with,
                active: report.active_model,
            });
        }

        let RawArtifacts { file, texts } = raw;
        let index = FlatIndex::from_raw(file.header.dimension, file.vectors)?;
        debug!(
            "Loaded index with {} vectors of dimension {}",
            index.len(),
            index.dimension()
        );

        Ok(LoadedArtifacts {
            header: file.header,
            index,
            texts,
        })
    }

    /// Compare the artifacts without failing on a mismatch.
    ///
    /// Missing or unreadable files are still errors.
    #[inline]
    pub fn check_consistency(&self, active_model: &str) -> Result<ConsistencyReport> {
        let report = self.read_raw()?.report(active_model);
        report.log();
        Ok(report)
    }

    /// Read just the header of `index.bin`
    #[inline]
    pub fn read_header(&self) -> Result<IndexHeader> {
        self.ensure_present()?;
        Ok(read_index_file(&self.index_path)?.header)
    }

    fn ensure_present(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(RagError::NotIngested {
                index_path: self.index_path.clone(),
                text_path: self.text_path.clone(),
            })
        }
    }

    fn read_raw(&self) -> Result<RawArtifacts> {
        self.ensure_present()?;
        let file = read_index_file(&self.index_path)?;
        if file.header.format_version != FORMAT_VERSION {
            return Err(RagError::Index(format!(
                "Unsupported index format version {} in {}",
                file.header.format_version,
                self.index_path.display()
            )));
        }
        let dimension = file.header.dimension;
        if dimension == 0 || file.vectors.len() % dimension != 0 {
            return Err(RagError::Inconsistent(format!(
                "vector data in {} holds {} values, not whole rows of dimension {}",
                self.index_path.display(),
                file.vectors.len(),
                dimension
            )));
        }
        let texts = read_text_table(&self.text_path)?;
        Ok(RawArtifacts { file, texts })
    }
}

/// SHA-256 over every row, each prefixed by its byte length.
#[inline]
pub fn text_digest(texts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for text in texts {
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_index_file(path: &Path, header: &IndexHeader, vectors: &[f32]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let file = IndexFile {
        header: header.clone(),
        vectors: vectors.to_vec(),
    };
    bincode::serialize_into(&mut writer, &file)
        .map_err(|e| RagError::Index(format!("Failed to write {}: {}", path.display(), e)))?;
    writer.flush()?;
    Ok(())
}

fn read_index_file(path: &Path) -> Result<IndexFile> {
    let mut reader = BufReader::new(File::open(path)?);
    bincode::deserialize_from(&mut reader)
        .map_err(|e| RagError::Index(format!("Failed to read {}: {}", path.display(), e)))
}

fn write_text_table(path: &Path, texts: &[String]) -> Result<()> {
    let table_error =
        |e: csv::Error| RagError::Index(format!("Failed to write {}: {}", path.display(), e));

    let mut writer = csv::Writer::from_path(path).map_err(table_error)?;
    writer.write_record([TEXT_COLUMN]).map_err(table_error)?;
    for text in texts {
        writer.write_record([text]).map_err(table_error)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_text_table(path: &Path) -> Result<Vec<String>> {
    let table_error =
        |e: csv::Error| RagError::Index(format!("Failed to read {}: {}", path.display(), e));

    let mut reader = csv::Reader::from_path(path).map_err(table_error)?;
    let headers = reader.headers().map_err(table_error)?;
    if headers.get(0) != Some(TEXT_COLUMN) {
        return Err(RagError::Index(format!(
            "{} is missing the '{}' column",
            path.display(),
            TEXT_COLUMN
        )));
    }

    let mut texts = Vec::new();
    for record in reader.records() {
        let record = record.map_err(table_error)?;
        texts.push(record.get(0).unwrap_or_default().to_string());
    }
    Ok(texts)
}

// Consistency validation between the persisted index and text table

use tracing::{info, warn};

/// Result of comparing `index.bin` against `texts.csv` and the active model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Row count recorded in the index header
    pub header_rows: usize,
    /// Rows actually present in the vector data
    pub vector_rows: usize,
    /// Rows in the text table
    pub text_rows: usize,
    /// Whether the text table digest equals the one in the header
    pub digest_matches: bool,
    /// Model the index was built with
    pub built_with: String,
    /// Model of the embedder that would query it
    pub active_model: String,
    pub is_consistent: bool,
}

impl ConsistencyReport {
    #[inline]
    pub fn new(
        header_rows: usize,
        vector_rows: usize,
        text_rows: usize,
        digest_matches: bool,
        built_with: String,
        active_model: String,
    ) -> Self {
        let is_consistent = header_rows == vector_rows
            && vector_rows == text_rows
            && digest_matches
            && built_with == active_model;

        Self {
            header_rows,
            vector_rows,
            text_rows,
            digest_matches,
            built_with,
            active_model,
            is_consistent,
        }
    }

    #[inline]
    pub fn counts_match(&self) -> bool {
        self.header_rows == self.vector_rows && self.vector_rows == self.text_rows
    }

    #[inline]
    pub fn model_matches(&self) -> bool {
        self.built_with == self.active_model
    }

    /// Get a human-readable summary of the consistency report
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Index is consistent: {} vectors, {} text rows, model {}",
                self.vector_rows, self.text_rows, self.built_with
            )
        } else {
            let mut problems = Vec::new();
            if !self.counts_match() {
                problems.push(format!(
                    "row counts differ (header {}, vectors {}, texts {})",
                    self.header_rows, self.vector_rows, self.text_rows
                ));
            }
            if !self.digest_matches {
                problems.push("text table digest does not match the header".to_string());
            }
            if !self.model_matches() {
                problems.push(format!(
                    "built with '{}' but active model is '{}'",
                    self.built_with, self.active_model
                ));
            }
            format!("Index inconsistencies found: {}", problems.join("; "))
        }
    }

    /// Get the total number of consistency issues
    #[inline]
    pub fn total_issues(&self) -> usize {
        [
            !self.counts_match(),
            !self.digest_matches,
            !self.model_matches(),
        ]
        .into_iter()
        .filter(|issue| *issue)
        .count()
    }

    /// Log the report at info when clean and at warn otherwise
    #[inline]
    pub fn log(&self) {
        if self.is_consistent {
            info!("{}", self.summary());
        } else {
            warn!("{}", self.summary());
        }
    }
}

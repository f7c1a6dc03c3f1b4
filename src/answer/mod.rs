//! Turn ranked retrieval results into a user-facing answer or an abstention.

#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::retrieval::RetrievalResult;

pub const ABSTENTION_MESSAGE: &str = "I could not find information about that in the first aid guidelines. If this is an emergency, please contact your local emergency services immediately.";

const ANSWER_PREFIX: &str = "Based on the first aid guidelines:\n\n";

/// A source cited by an answer: its row in the text table and the label of
/// the corpus it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub id: usize,
    pub source: String,
    pub snippet: String,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    #[serde(skip)]
    pub abstained: bool,
}

/// Cutoff on the best hit's distance, above which no answer is given
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerPolicy {
    pub distance_threshold: f32,
    pub abstention_message: String,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self {
            distance_threshold: 0.7,
            abstention_message: ABSTENTION_MESSAGE.to_string(),
        }
    }
}

impl AnswerPolicy {
    #[inline]
    pub fn from_config(retrieval: &RetrievalConfig) -> Self {
        Self {
            distance_threshold: retrieval.distance_threshold,
            ..Self::default()
        }
    }

    /// Answer from the top result, or abstain when there is none or it is
    /// farther than the threshold. A distance equal to the threshold answers.
    #[inline]
    pub fn decide(&self, results: &[RetrievalResult]) -> Answer {
        match results.first() {
            Some(top) if top.distance <= self.distance_threshold => Answer {
                answer: format!("{}{}", ANSWER_PREFIX, top.text),
                sources: results
                    .iter()
                    .map(|result| SourceRef {
                        id: result.id,
                        source: result.source_tag.clone(),
                        snippet: result.snippet.clone(),
                        distance: result.distance,
                    })
                    .collect(),
                abstained: false,
            },
            _ => self.abstain(),
        }
    }

    fn abstain(&self) -> Answer {
        Answer {
            answer: self.abstention_message.clone(),
            sources: Vec::new(),
            abstained: true,
        }
    }
}

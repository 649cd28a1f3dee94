use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub mod analyzer;
pub mod backend;
pub mod config_file;
pub mod document;
pub mod matcher;
pub mod orchestrator;
pub mod resolver;
pub mod rules;
pub mod text;
pub mod validator;

// Re-export for convenience
pub use backend::{ExtractionError, PageText, TextExtractor};
pub use document::{CorpusStats, Document, DocumentKind};
pub use orchestrator::{Pipeline, PipelineState, RunOutput, TaskSelection};
pub use resolver::UnresolvedTerm;
pub use rules::ConfidenceWeights;
pub use validator::{ReasonCode, TaskValidation, ValidationReport};

/// The page extent of a definition: one page, or a run of consecutive
/// pages when the definition crosses a page break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageSpan {
    /// First page, 1-based.
    pub start: u32,
    /// Last page when the span covers more than one.
    pub end: Option<u32>,
}

impl PageSpan {
    pub fn single(page: u32) -> Self {
        Self { start: page, end: None }
    }

    pub fn range(start: u32, end: u32) -> Self {
        Self {
            start,
            end: (end > start).then_some(end),
        }
    }

    /// Output label: `第3页`, or `第3-4页` for a multi-page span.
    pub fn label(&self) -> String {
        match self.end {
            Some(end) => format!("第{}-{}页", self.start, end),
            None => format!("第{}页", self.start),
        }
    }
}

impl fmt::Display for PageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// How a candidate definition was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    /// The term stands alone as a terminology-entry heading and the
    /// definition follows as the entry body.
    Heading,
    /// The term occurs in running text followed by a definitional lead-in.
    Inline,
}

/// A candidate definition found in one document. Every mention is kept
/// until resolution; nothing is discarded at match time.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub term: String,
    pub definition: String,
    /// Standardized id of the source document.
    pub document: String,
    /// Position of the source document in the sorted corpus listing.
    pub corpus_index: usize,
    pub pages: PageSpan,
    pub kind: MentionKind,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

/// A resolved terminology entry, one per requested term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermRecord {
    pub term: String,
    pub definition: String,
    pub document: String,
    pub pages: PageSpan,
}

/// The kind of relationship between two terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelationKind {
    Subordinate,
    Causal,
}

impl RelationKind {
    pub const ALL: [RelationKind; 2] = [RelationKind::Subordinate, RelationKind::Causal];

    pub fn label(&self) -> &'static str {
        match self {
            RelationKind::Subordinate => "主从关系",
            RelationKind::Causal => "因果关系",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        RelationKind::ALL.into_iter().find(|k| k.label() == label)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One supporting passage for a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceEntry {
    /// Standardized id of the source document.
    pub document: String,
    pub corpus_index: usize,
    pub pages: PageSpan,
}

/// A discovered relationship between two resolved terms, with all of its
/// supporting evidence.
#[derive(Debug, Clone)]
pub struct RelationPair {
    /// The two related terms, in task order.
    pub terms: [String; 2],
    pub kind: RelationKind,
    /// Best supporting-window confidence, in [0, 1].
    pub confidence: f64,
    /// Ordered by corpus position, then page.
    pub evidence: Vec<EvidenceEntry>,
}

/// Side-channel findings from term resolution. These never remove an
/// entry from the output; they are reported alongside it.
#[derive(Debug, Clone)]
pub enum TermIssue {
    /// No candidate definition anywhere in the corpus.
    Unresolved { term: String },
    /// The two best candidates came from different documents and their
    /// definitions diverged below the similarity threshold.
    Ambiguous {
        term: String,
        similarity: f64,
        chosen: EvidenceEntry,
        competing: EvidenceEntry,
    },
}

/// Progress events emitted during a pipeline run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The pipeline moved to a new stage.
    Stage { state: PipelineState },
    DocumentStarted {
        index: usize,
        total: usize,
        name: String,
    },
    DocumentFinished {
        index: usize,
        total: usize,
        name: String,
        pages: usize,
    },
    /// Extraction failed; the document is skipped and the run continues.
    DocumentSkipped {
        index: usize,
        total: usize,
        name: String,
        message: String,
    },
    TermResolved {
        index: usize,
        total: usize,
        term: String,
        document: String,
        pages: PageSpan,
    },
    TermUnresolved {
        index: usize,
        total: usize,
        term: String,
    },
    TermAmbiguous {
        index: usize,
        total: usize,
        term: String,
        similarity: f64,
    },
    RelationFound {
        terms: [String; 2],
        kind: RelationKind,
        confidence: f64,
    },
}

/// Summary statistics for a complete pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub documents_total: usize,
    pub documents_skipped: usize,
    pub terms_requested: usize,
    pub terms_resolved: usize,
    pub terms_unresolved: usize,
    pub terms_ambiguous: usize,
    pub relations_found: usize,
    pub relations_dropped: usize,
    pub records_invalid: usize,
}

impl RunSummary {
    /// A clean run had no skipped documents, no unresolved terms and no
    /// validation exclusions. Ambiguity warnings alone are still clean.
    pub fn is_clean(&self) -> bool {
        self.documents_skipped == 0 && self.terms_unresolved == 0 && self.records_invalid == 0
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("corpus directory not found: {}", .0.display())]
    CorpusDirMissing(PathBuf),
    #[error("no PDF documents in corpus directory: {}", .0.display())]
    EmptyCorpus(PathBuf),
    #[error("no document in {} yielded any text", .0.display())]
    NoReadableDocuments(PathBuf),
    #[error("failed to read task file {}: {source}", .path.display())]
    TaskFileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse task file {}: {source}", .path.display())]
    TaskFileParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("task file {} contains no terms", .0.display())]
    EmptyTask(PathBuf),
    #[error("term not found in corpus: {0}")]
    Unresolved(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for corpus PDFs.
    pub data_dir: PathBuf,
    /// Directory the result files are written into.
    pub output_dir: PathBuf,
    /// Token-overlap similarity below which competing definitions from
    /// different documents are flagged as ambiguous.
    pub similarity_threshold: f64,
    /// Definition length bounds, in characters.
    pub min_definition_length: usize,
    pub max_definition_length: usize,
    /// Relationship kinds the analyzer may emit.
    pub relationship_types: Vec<RelationKind>,
    /// Minimum best-window confidence for a relationship to be retained.
    pub min_confidence: f64,
    /// Fail on the first unresolved term instead of recording it.
    pub strict: bool,
    /// Extract and match documents on parallel workers, one per document.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("output"),
            similarity_threshold: 0.8,
            min_definition_length: 10,
            max_definition_length: 500,
            relationship_types: RelationKind::ALL.to_vec(),
            min_confidence: 0.7,
            strict: false,
            parallel: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(CoreError::Config(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(CoreError::Config(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.min_definition_length == 0 {
            return Err(CoreError::Config(
                "min_definition_length must be at least 1".to_string(),
            ));
        }
        if self.max_definition_length < self.min_definition_length {
            return Err(CoreError::Config(format!(
                "max_definition_length ({}) is below min_definition_length ({})",
                self.max_definition_length, self.min_definition_length
            )));
        }
        Ok(())
    }
}

/// Identifier for the index-th requested term (0-based): `W01`, `W02`, …
pub fn term_id(index: usize) -> String {
    format!("W{:02}", index + 1)
}

/// Identifier for the index-th discovered relationship (0-based): `R01`, …
pub fn relation_id(index: usize) -> String {
    format!("R{:02}", index + 1)
}

// =====================================================================
// Tests
// =====================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_span_labels() {
        assert_eq!(PageSpan::single(3).label(), "第3页");
        assert_eq!(PageSpan::range(3, 4).label(), "第3-4页");
        assert_eq!(PageSpan::range(3, 3).label(), "第3页");
    }

    #[test]
    fn page_spans_order_by_start_then_end() {
        assert!(PageSpan::single(2) < PageSpan::single(3));
        assert!(PageSpan::single(3) < PageSpan::range(3, 4));
    }

    #[test]
    fn relation_kind_labels_round_trip() {
        for kind in RelationKind::ALL {
            assert_eq!(RelationKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(RelationKind::from_label("未知关系"), None);
    }

    #[test]
    fn subordinate_orders_before_causal() {
        assert!(RelationKind::Subordinate < RelationKind::Causal);
    }

    #[test]
    fn identifier_formats() {
        assert_eq!(term_id(0), "W01");
        assert_eq!(term_id(9), "W10");
        assert_eq!(term_id(99), "W100");
        assert_eq!(relation_id(0), "R01");
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_thresholds() {
        let mut config = Config::default();
        config.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.min_confidence = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_definition_length = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn clean_summary_ignores_ambiguity() {
        let summary = RunSummary {
            documents_total: 3,
            terms_requested: 5,
            terms_resolved: 5,
            terms_ambiguous: 1,
            ..Default::default()
        };
        assert!(summary.is_clean());

        let summary = RunSummary {
            terms_unresolved: 1,
            ..Default::default()
        };
        assert!(!summary.is_clean());
    }
}

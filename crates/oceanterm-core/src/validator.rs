//! Output validation: structural and provenance checks on assembled
//! records. Failing entries are excluded and reported with a reason;
//! nothing is ever repaired in place.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::Document;
use crate::text;
use crate::{Config, PageSpan, RelationPair, TermRecord};

/// Completeness ratio a task must reach for its output to count as
/// passing.
pub const COMPLETENESS_PASS: f64 = 0.8;

/// Why a record was excluded from the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonCode {
    MissingField(&'static str),
    DefinitionTooShort { length: usize, min: usize },
    /// Document id still carries a `.pdf` suffix or forbidden characters.
    DocumentFormat,
    /// Page span is not a 1-based page or an ascending range.
    PageFormat,
    /// The definition text cannot be found on the cited pages.
    ProvenanceMismatch,
    /// The cited document is not part of the readable corpus.
    UnknownDocument,
    /// A relation references a term that was never resolved.
    UnknownTerm(String),
    SelfRelation,
    NoEvidence,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonCode::MissingField(field) => write!(f, "empty field {field}"),
            ReasonCode::DefinitionTooShort { length, min } => {
                write!(f, "definition length {length} below minimum {min}")
            }
            ReasonCode::DocumentFormat => write!(f, "document id not in standardized form"),
            ReasonCode::PageFormat => write!(f, "page span not a 1-based page or ascending range"),
            ReasonCode::ProvenanceMismatch => {
                write!(f, "definition text not found in cited pages")
            }
            ReasonCode::UnknownDocument => write!(f, "cited document not in corpus"),
            ReasonCode::UnknownTerm(term) => {
                write!(f, "relation references unresolved term {term}")
            }
            ReasonCode::SelfRelation => write!(f, "relation links a term to itself"),
            ReasonCode::NoEvidence => write!(f, "relation carries no evidence"),
        }
    }
}

/// Validate one terminology record against the corpus it cites.
pub fn validate_term(
    record: &TermRecord,
    documents: &[Document],
    config: &Config,
) -> Result<(), ReasonCode> {
    if record.term.trim().is_empty() {
        return Err(ReasonCode::MissingField("术语名称"));
    }
    if record.definition.trim().is_empty() {
        return Err(ReasonCode::MissingField("术语定义"));
    }
    if record.document.trim().is_empty() {
        return Err(ReasonCode::MissingField("文档出处"));
    }

    let length = record.definition.chars().count();
    if length < config.min_definition_length {
        return Err(ReasonCode::DefinitionTooShort {
            length,
            min: config.min_definition_length,
        });
    }

    check_document_id(&record.document)?;
    check_page_span(&record.pages)?;

    let doc = documents
        .iter()
        .find(|d| d.id == record.document)
        .ok_or(ReasonCode::UnknownDocument)?;

    // Provenance: the definition must appear verbatim on the cited pages,
    // modulo whitespace.
    let cited: String = doc
        .pages
        .iter()
        .filter(|p| {
            p.number >= record.pages.start && p.number <= record.pages.end.unwrap_or(record.pages.start)
        })
        .map(|p| text::strip_whitespace(&p.text))
        .collect();
    if !cited.contains(&text::strip_whitespace(&record.definition)) {
        return Err(ReasonCode::ProvenanceMismatch);
    }

    Ok(())
}

/// Validate one relationship against the set of resolved term names and
/// the corpus its evidence cites.
pub fn validate_relation(
    pair: &RelationPair,
    resolved: &HashSet<String>,
    documents: &[Document],
) -> Result<(), ReasonCode> {
    if pair.terms.iter().any(|t| t.trim().is_empty()) {
        return Err(ReasonCode::MissingField("术语关联"));
    }
    if pair.terms[0] == pair.terms[1] {
        return Err(ReasonCode::SelfRelation);
    }
    for term in &pair.terms {
        if !resolved.contains(term) {
            return Err(ReasonCode::UnknownTerm(term.clone()));
        }
    }
    if pair.evidence.is_empty() {
        return Err(ReasonCode::NoEvidence);
    }
    for entry in &pair.evidence {
        check_document_id(&entry.document)?;
        check_page_span(&entry.pages)?;
        if !documents.iter().any(|d| d.id == entry.document) {
            return Err(ReasonCode::UnknownDocument);
        }
    }
    Ok(())
}

fn check_document_id(id: &str) -> Result<(), ReasonCode> {
    static FORBIDDEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
    if id.ends_with(".pdf") || FORBIDDEN.is_match(id) {
        return Err(ReasonCode::DocumentFormat);
    }
    Ok(())
}

fn check_page_span(span: &PageSpan) -> Result<(), ReasonCode> {
    // A span passing these checks renders as 第N页 or 第N-M页.
    if span.start == 0 {
        return Err(ReasonCode::PageFormat);
    }
    if let Some(end) = span.end {
        if end <= span.start {
            return Err(ReasonCode::PageFormat);
        }
    }
    Ok(())
}

/// Validation tally for one task's entries.
#[derive(Debug, Clone, Default)]
pub struct TaskValidation {
    pub total: usize,
    pub valid: usize,
    /// Excluded entries: output id and the reason for exclusion.
    pub failures: Vec<(String, ReasonCode)>,
}

impl TaskValidation {
    pub fn record_pass(&mut self) {
        self.total += 1;
        self.valid += 1;
    }

    pub fn record_failure(&mut self, id: String, reason: ReasonCode) {
        self.total += 1;
        self.failures.push((id, reason));
    }

    /// Share of entries that validated. An empty task is trivially
    /// complete.
    pub fn completeness_score(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }

    pub fn passed(&self) -> bool {
        self.completeness_score() >= COMPLETENESS_PASS
    }

    pub fn status(&self) -> &'static str {
        status_label(self.passed())
    }
}

pub fn status_label(passed: bool) -> &'static str {
    if passed { "通过" } else { "需要改进" }
}

/// Combined validation outcome for a run. A task the run did not execute
/// stays `None` and is left out of the overall score.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub task1: Option<TaskValidation>,
    pub task2: Option<TaskValidation>,
}

impl ValidationReport {
    pub fn overall_score(&self) -> f64 {
        match (&self.task1, &self.task2) {
            (Some(t1), Some(t2)) => (t1.completeness_score() + t2.completeness_score()) / 2.0,
            (Some(t1), None) => t1.completeness_score(),
            (None, Some(t2)) => t2.completeness_score(),
            (None, None) => 1.0,
        }
    }

    pub fn overall_passed(&self) -> bool {
        self.overall_score() >= COMPLETENESS_PASS
    }

    pub fn status(&self) -> &'static str {
        status_label(self.overall_passed())
    }
}

// =====================================================================
// Tests
// =====================================================================

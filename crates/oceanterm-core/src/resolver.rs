//! Term resolution: pick the authoritative definition among a term's
//! candidates, and flag contradictory sources instead of hiding them.

use thiserror::Error;

use crate::text;
use crate::{Candidate, Config, EvidenceEntry, TermRecord};

/// A term with no candidate definition anywhere in the corpus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("term not found in corpus: {0}")]
pub struct UnresolvedTerm(pub String);

/// The outcome of resolving one term.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: TermRecord,
    /// Set when the best competing definition from another document
    /// diverged below the similarity threshold.
    pub ambiguity: Option<Ambiguity>,
}

/// Two documents define the term in ways that do not agree. The chosen
/// side still goes into the output; this is a warning, not an exclusion.
#[derive(Debug, Clone)]
pub struct Ambiguity {
    pub similarity: f64,
    pub chosen: EvidenceEntry,
    pub competing: EvidenceEntry,
}

/// Resolve one term from its candidates.
///
/// The winner is the highest-confidence candidate; ties go to the
/// earlier corpus document, then the earlier page, so resolution is
/// deterministic for a fixed corpus.
pub fn resolve(
    term: &str,
    candidates: &[Candidate],
    config: &Config,
) -> Result<Resolution, UnresolvedTerm> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.corpus_index.cmp(&b.corpus_index))
            .then_with(|| a.pages.cmp(&b.pages))
    });

    let best = *ranked.first().ok_or_else(|| UnresolvedTerm(term.to_string()))?;

    // Candidates within one document restate the same source, so only a
    // rival from a different document can make the term ambiguous.
    let ambiguity = ranked
        .iter()
        .skip(1)
        .find(|c| c.document != best.document)
        .and_then(|rival| {
            let similarity = text::token_overlap(&best.definition, &rival.definition);
            (similarity < config.similarity_threshold).then(|| Ambiguity {
                similarity,
                chosen: evidence_of(best),
                competing: evidence_of(rival),
            })
        });

    Ok(Resolution {
        record: TermRecord {
            term: term.to_string(),
            definition: best.definition.clone(),
            document: best.document.clone(),
            pages: best.pages,
        },
        ambiguity,
    })
}

fn evidence_of(candidate: &Candidate) -> EvidenceEntry {
    EvidenceEntry {
        document: candidate.document.clone(),
        corpus_index: candidate.corpus_index,
        pages: candidate.pages,
    }
}

// =====================================================================
// Tests
// =====================================================================

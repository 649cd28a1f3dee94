//! Relationship analysis: discover 主从 and 因果 links between resolved
//! terms from paragraph co-occurrence windows.

use std::collections::{BTreeMap, HashSet};

use crate::document::Document;
use crate::rules;
use crate::text;
use crate::{Config, EvidenceEntry, PageSpan, RelationKind, RelationPair, TermRecord};

/// Outcome of the analysis stage.
#[derive(Debug, Default)]
pub struct Analysis {
    /// Retained relationships in discovery order: pair order follows the
    /// task term order, and a pair carrying both kinds lists 主从关系
    /// before 因果关系.
    pub pairs: Vec<RelationPair>,
    /// Relationship candidates whose best window stayed below the
    /// retention threshold.
    pub dropped: usize,
}

/// Analyze every unordered pair of resolved terms against the corpus.
///
/// A window supports a pair when both terms occur in the same paragraph
/// together with at least one cue phrase. A (pair, kind) is retained when
/// its best window reaches `min_confidence`; all supporting windows stay
/// attached as evidence, ordered by corpus position and page.
pub fn analyze(records: &[TermRecord], documents: &[Document], config: &Config) -> Analysis {
    let mut analysis = Analysis::default();

    for i in 0..records.len() {
        for j in i + 1..records.len() {
            let term_a = records[i].term.as_str();
            let term_b = records[j].term.as_str();
            if term_a == term_b {
                continue;
            }

            let mut per_kind: BTreeMap<RelationKind, KindAccumulator> = BTreeMap::new();

            for doc in documents {
                for page in &doc.pages {
                    for raw_window in text::split_paragraphs(&page.text) {
                        let window = text::fold_whitespace(raw_window);
                        let Some(scored) = classify_window(&window, term_a, term_b, config)
                        else {
                            continue;
                        };
                        let acc = per_kind.entry(scored.kind).or_default();
                        if scored.confidence > acc.best {
                            acc.best = scored.confidence;
                        }
                        acc.evidence.push(EvidenceEntry {
                            document: doc.id.clone(),
                            corpus_index: doc.corpus_index,
                            pages: PageSpan::single(page.number),
                        });
                    }
                }
            }

            for (kind, acc) in per_kind {
                if acc.best >= config.min_confidence {
                    analysis.pairs.push(RelationPair {
                        terms: [term_a.to_string(), term_b.to_string()],
                        kind,
                        confidence: acc.best,
                        evidence: ordered_evidence(acc.evidence),
                    });
                } else {
                    analysis.dropped += 1;
                }
            }
        }
    }

    analysis
}

#[derive(Default)]
struct KindAccumulator {
    best: f64,
    evidence: Vec<EvidenceEntry>,
}

struct WindowScore {
    kind: RelationKind,
    confidence: f64,
}

/// Classify one co-occurrence window.
///
/// Every enabled cue occurrence is collected. A kind scores its best cue
/// weight plus a small bonus per additional distinct cue rule, capped at
/// 1.0. When cues of both kinds appear in one window, the occurrence
/// closest to the midpoint between the two term mentions decides the
/// kind; 主从关系 wins exact ties.
fn classify_window(
    window: &str,
    term_a: &str,
    term_b: &str,
    config: &Config,
) -> Option<WindowScore> {
    let pos_a = window.find(term_a)?;
    let pos_b = window.find(term_b)?;

    struct CueHit {
        kind: RelationKind,
        center: usize,
        rule_index: usize,
    }

    let mut hits = Vec::new();
    for (rule_index, cue) in rules::compiled_cues().iter().enumerate() {
        if !config.relationship_types.contains(&cue.kind) {
            continue;
        }
        for m in cue.regex.find_iter(window) {
            hits.push(CueHit {
                kind: cue.kind,
                center: m.start() + (m.end() - m.start()) / 2,
                rule_index,
            });
        }
    }
    if hits.is_empty() {
        return None;
    }

    let mut kind_scores: BTreeMap<RelationKind, f64> = BTreeMap::new();
    for kind in RelationKind::ALL {
        let rules_hit: HashSet<usize> = hits
            .iter()
            .filter(|h| h.kind == kind)
            .map(|h| h.rule_index)
            .collect();
        if rules_hit.is_empty() {
            continue;
        }
        let best = rules_hit
            .iter()
            .map(|&idx| rules::compiled_cues()[idx].weight)
            .fold(0.0, f64::max);
        let score = (best + rules::EXTRA_CUE_BONUS * (rules_hit.len() - 1) as f64).min(1.0);
        kind_scores.insert(kind, score);
    }

    let kind = if kind_scores.len() == 1 {
        *kind_scores.keys().next()?
    } else {
        let mid = (pos_a + term_a.len() / 2 + pos_b + term_b.len() / 2) / 2;
        hits.iter()
            .min_by(|x, y| {
                x.center
                    .abs_diff(mid)
                    .cmp(&y.center.abs_diff(mid))
                    .then_with(|| x.kind.cmp(&y.kind))
            })
            .map(|h| h.kind)?
    };

    let confidence = kind_scores.get(&kind).copied()?;
    (confidence >= rules::DETECTION_FLOOR).then_some(WindowScore { kind, confidence })
}

/// Sort evidence by corpus position then page and drop repeats of the
/// same document page.
fn ordered_evidence(mut evidence: Vec<EvidenceEntry>) -> Vec<EvidenceEntry> {
    evidence.sort_by(|a, b| {
        a.corpus_index
            .cmp(&b.corpus_index)
            .then_with(|| a.pages.cmp(&b.pages))
    });
    evidence.dedup_by(|a, b| a.document == b.document && a.pages == b.pages);
    evidence
}

// =====================================================================
// Tests
// =====================================================================

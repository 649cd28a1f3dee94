//! Term matching: locate every candidate definition of a term within one
//! document. All mentions are kept; choosing between them is the
//! resolver's job.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::Document;
use crate::rules::{self, ConfidenceWeights};
use crate::text;
use crate::{Candidate, Config, MentionKind, PageSpan};

/// Find all candidate definitions for `term` in one document, using the
/// default scoring weights.
pub fn match_document(doc: &Document, term: &str, config: &Config) -> Vec<Candidate> {
    match_document_with_weights(doc, term, config, &ConfidenceWeights::default())
}

pub fn match_document_with_weights(
    doc: &Document,
    term: &str,
    config: &Config,
    weights: &ConfidenceWeights,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if term.is_empty() {
        return candidates;
    }

    for page_idx in 0..doc.pages.len() {
        let next_page = doc.pages.get(page_idx + 1);
        scan_headings(doc, page_idx, next_page, term, config, weights, &mut candidates);
        scan_inline(doc, page_idx, next_page, term, config, weights, &mut candidates);
    }

    dedup(candidates)
}

/// Terminology-entry headings: a line carrying the term on its own,
/// optionally behind an entry number (`3.1 海洋灾害`) or in front of a
/// Latin gloss (`海洋灾害 marine disaster`). The entry body on the
/// following lines is the definition.
fn scan_headings(
    doc: &Document,
    page_idx: usize,
    next_page: Option<&crate::PageText>,
    term: &str,
    config: &Config,
    weights: &ConfidenceWeights,
    candidates: &mut Vec<Candidate>,
) {
    let page = &doc.pages[page_idx];
    let lines: Vec<&str> = page.text.lines().collect();

    for (line_idx, line) in lines.iter().enumerate() {
        let stripped = strip_entry_number(line);
        if stripped.is_empty() || !is_heading_for(stripped, term) {
            continue;
        }

        // Entry body: the following lines, minus any pure Latin gloss
        // lines directly under the heading.
        let body_raw: String = lines[line_idx + 1..]
            .iter()
            .skip_while(|l| !l.trim().is_empty() && !has_cjk(l))
            .copied()
            .collect::<Vec<_>>()
            .join("\n");
        let body = text::fold_whitespace(&body_raw);

        if let Some((definition, pages)) =
            definition_extent(&body, page.number, next_page, config.max_definition_length)
        {
            let confidence =
                score_candidate(MentionKind::Heading, 1.0, &definition, term, config, weights);
            candidates.push(Candidate {
                term: term.to_string(),
                definition,
                document: doc.id.clone(),
                corpus_index: doc.corpus_index,
                pages,
                kind: MentionKind::Heading,
                confidence,
            });
        }
    }
}

/// Inline mentions: the term in running text, directly followed by a
/// definitional lead-in (`风暴潮是指…`). Every occurrence on the page is
/// considered.
fn scan_inline(
    doc: &Document,
    page_idx: usize,
    next_page: Option<&crate::PageText>,
    term: &str,
    config: &Config,
    weights: &ConfidenceWeights,
    candidates: &mut Vec<Candidate>,
) {
    let page = &doc.pages[page_idx];
    let folded = text::fold_whitespace(&page.text);

    let mut search_from = 0;
    while let Some(rel) = folded[search_from..].find(term) {
        let at = search_from + rel;
        search_from = at + term.len();

        let rest = folded[search_from..].trim_start();
        let Some(lead_in) = rules::match_lead_in(rest) else {
            continue;
        };
        let body = rest[lead_in.token.len()..].trim_start();

        if let Some((definition, pages)) =
            definition_extent(body, page.number, next_page, config.max_definition_length)
        {
            let confidence = score_candidate(
                MentionKind::Inline,
                lead_in.weight,
                &definition,
                term,
                config,
                weights,
            );
            candidates.push(Candidate {
                term: term.to_string(),
                definition,
                document: doc.id.clone(),
                corpus_index: doc.corpus_index,
                pages,
                kind: MentionKind::Inline,
                confidence,
            });
        }
    }
}

/// Strip a leading entry number (`3.1`, `4.2.7`) from a heading line.
fn strip_entry_number(line: &str) -> &str {
    static ENTRY_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)*\s*").unwrap());
    let trimmed = line.trim();
    match ENTRY_NUMBER.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim_start(),
        None => trimmed,
    }
}

fn has_cjk(s: &str) -> bool {
    s.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// Whether a numbering-stripped line is a heading for `term`: the term
/// alone (tolerating extraction noise), or the term followed by a
/// non-CJK remainder such as an English gloss.
fn is_heading_for(stripped: &str, term: &str) -> bool {
    if text::line_matches_term(stripped, term) {
        return true;
    }
    match stripped.strip_prefix(term) {
        Some(remainder) => !remainder.trim().is_empty() && !has_cjk(remainder),
        None => false,
    }
}

/// The definition extent: body text up to and including the first
/// sentence terminator, within `max_chars`. A definition cut off by the
/// page break may finish on the next page; one without any terminator in
/// budget is not a definition.
fn definition_extent(
    body: &str,
    page_number: u32,
    next_page: Option<&crate::PageText>,
    max_chars: usize,
) -> Option<(String, PageSpan)> {
    match first_sentence(body, max_chars) {
        Cut::Complete(sentence) => Some((sentence, PageSpan::single(page_number))),
        Cut::Exhausted(consumed) => {
            // The page ended mid-sentence; try to finish on the next page.
            let next = next_page?;
            let remaining = max_chars.saturating_sub(consumed.chars().count());
            let next_folded = text::fold_whitespace(&next.text);
            match first_sentence(&next_folded, remaining) {
                Cut::Complete(tail) => {
                    let definition = format!("{consumed}{tail}");
                    Some((definition, PageSpan::range(page_number, next.number)))
                }
                _ => None,
            }
        }
        Cut::OverBudget => None,
    }
    .filter(|(definition, _)| !definition.is_empty())
}

enum Cut {
    /// A terminator was found within budget; carries the full sentence.
    Complete(String),
    /// The text ran out before any terminator; carries what was consumed.
    Exhausted(String),
    /// The budget ran out before any terminator.
    OverBudget,
}

fn first_sentence(body: &str, max_chars: usize) -> Cut {
    let mut taken = String::new();
    for (count, c) in body.chars().enumerate() {
        if count >= max_chars {
            return Cut::OverBudget;
        }
        taken.push(c);
        if text::SENTENCE_ENDS.contains(&c) {
            return Cut::Complete(taken);
        }
    }
    Cut::Exhausted(taken)
}

fn score_candidate(
    kind: MentionKind,
    lead_in_weight: f64,
    definition: &str,
    term: &str,
    config: &Config,
    weights: &ConfidenceWeights,
) -> f64 {
    let mut score = match kind {
        MentionKind::Heading => weights.heading_base,
        MentionKind::Inline => weights.inline_base * lead_in_weight,
    };
    if rules::contains_definition_keyword(definition) {
        score += weights.keyword_bonus;
    }
    if definition.ends_with(text::SENTENCE_ENDS) {
        score += weights.terminal_bonus;
    }
    if definition.contains(term) {
        score += weights.self_mention_bonus;
    }
    let length = definition.chars().count();
    if length < config.min_definition_length || length > config.max_definition_length {
        score -= weights.length_penalty;
    }
    score.clamp(0.0, 1.0)
}

/// Collapse duplicate finds of the same definition at the same place,
/// keeping the higher-confidence mention. Discovery order is preserved.
fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        match out
            .iter_mut()
            .find(|c| c.pages == candidate.pages && c.definition == candidate.definition)
        {
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                }
            }
            None => out.push(candidate),
        }
    }
    out
}

// =====================================================================
// Tests
// =====================================================================

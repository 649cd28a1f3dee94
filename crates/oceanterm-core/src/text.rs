//! Text utilities for Chinese standards documents.
//!
//! PDF extraction breaks lines mid-sentence and mid-term, so most matching
//! runs on a whitespace-folded view of the page text: whitespace between
//! two CJK characters disappears entirely, while whitespace between Latin
//! or digit runs collapses to a single space ("50 cm" stays readable,
//! "海洋\n灾害" becomes "海洋灾害").

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence terminators used for definition trimming and sentence splits.
pub const SENTENCE_ENDS: [char; 3] = ['。', '！', '？'];

/// Whether a character belongs to the CJK text being matched, including
/// CJK punctuation and full-width forms.
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}'   // CJK Unified Ideographs
        | '\u{3000}'..='\u{303f}' // CJK punctuation (。、《》【】…)
        | '\u{ff00}'..='\u{ffef}' // full-width forms (：！？（）…)
    )
}

/// Fold whitespace out of extracted page text.
///
/// Whitespace runs between two CJK characters are removed; any other
/// whitespace run collapses to a single ASCII space. Leading and trailing
/// whitespace is dropped.
pub fn fold_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            let join_cjk = is_cjk(c) && out.chars().next_back().is_some_and(is_cjk);
            if !join_cjk {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Remove all whitespace. The strongest normalization; used for the
/// provenance containment check so that no folding policy difference can
/// produce a false mismatch.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Token-overlap ratio (Jaccard) between two texts, in [0, 1].
///
/// Chinese has no word delimiters, so individual CJK characters count as
/// tokens; ASCII alphanumeric runs (standard codes like "GB" or "19721")
/// count whole. Identical token sets score 1.0, disjoint sets 0.0. Two
/// empty token sets count as fully overlapping.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    static TOKEN_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]|[A-Za-z0-9]+").unwrap());

    let set_a: std::collections::HashSet<&str> =
        TOKEN_RE.find_iter(a).map(|m| m.as_str()).collect();
    let set_b: std::collections::HashSet<&str> =
        TOKEN_RE.find_iter(b).map(|m| m.as_str()).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Split text into sentences on 。！？, keeping the terminator with the
/// sentence. Trailing text without a terminator forms a final sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if SENTENCE_ENDS.contains(&c) {
            let end = idx + c.len_utf8();
            let s = text[start..end].trim();
            if !s.is_empty() {
                sentences.push(s);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Split page text into paragraph windows at blank lines. A page without
/// blank lines is a single window.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    static BLANK_LINE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\n[ \t\u{3000}]*\n").unwrap());
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Whether `line` denotes `term`, tolerating minor extraction noise.
///
/// Exact equality after whitespace folding, or a fuzzy match at the same
/// cutoff used elsewhere for near-exact text comparison.
pub fn line_matches_term(line: &str, term: &str) -> bool {
    let folded = strip_whitespace(line);
    if folded == term {
        return true;
    }
    if folded.is_empty() || term.is_empty() {
        return false;
    }
    rapidfuzz::fuzz::ratio(folded.chars(), term.chars()) >= 0.95
}

// =====================================================================
// Tests
// =====================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ── whitespace folding ───────────────────────────────────────────

    #[test]
    fn fold_joins_cjk_across_line_breaks() {
        assert_eq!(fold_whitespace("海洋\n灾害"), "海洋灾害");
        assert_eq!(fold_whitespace("风暴潮 是指\n一种现象。"), "风暴潮是指一种现象。");
    }

    #[test]
    fn fold_keeps_single_space_between_latin_runs() {
        assert_eq!(fold_whitespace("增水超过  50   cm"), "增水超过 50 cm");
    }

    #[test]
    fn fold_joins_cjk_punctuation() {
        assert_eq!(fold_whitespace("灾害\n。"), "灾害。");
        assert_eq!(fold_whitespace("术语\n："), "术语：");
    }

    #[test]
    fn fold_trims_edges() {
        assert_eq!(fold_whitespace("  海啸  "), "海啸");
        assert_eq!(fold_whitespace(""), "");
        assert_eq!(fold_whitespace("   \n\t  "), "");
    }

    #[test]
    fn strip_removes_all_whitespace() {
        assert_eq!(strip_whitespace("海洋 灾害\n防治 50 cm"), "海洋灾害防治50cm");
    }

    // ── token overlap ────────────────────────────────────────────────

    #[test]
    fn overlap_identical_is_one() {
        let t = "海洋灾害是指发生在海洋的自然灾害。";
        assert_eq!(token_overlap(t, t), 1.0);
    }

    #[test]
    fn overlap_disjoint_is_zero() {
        assert_eq!(token_overlap("风暴增水预警发布", "赤潮生物毒素"), 0.0);
    }

    #[test]
    fn overlap_partial_between_zero_and_one() {
        let a = "海洋灾害。风暴潮。";
        let b = "海洋灾害。赤潮。";
        let sim = token_overlap(a, b);
        assert!(sim > 0.0 && sim < 1.0, "similarity was {sim}");
    }

    #[test]
    fn overlap_counts_ascii_codes() {
        assert!(token_overlap("GB 19721", "GB 19721") == 1.0);
        assert!(token_overlap("GB 19721", "HY 0123") == 0.0);
    }

    #[test]
    fn overlap_empty_sets_are_equal() {
        assert_eq!(token_overlap("", ""), 1.0);
        assert_eq!(token_overlap("。，！", "；："), 1.0);
    }

    // ── splitting ────────────────────────────────────────────────────

    #[test]
    fn sentences_split_on_terminators() {
        let s = split_sentences("第一句。第二句！第三句？尾部");
        assert_eq!(s, vec!["第一句。", "第二句！", "第三句？", "尾部"]);
    }

    #[test]
    fn sentences_of_empty_text() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let p = split_paragraphs("第一段第一行\n第一段第二行\n\n第二段");
        assert_eq!(p, vec!["第一段第一行\n第一段第二行", "第二段"]);
    }

    #[test]
    fn paragraphs_whole_page_without_blank_lines() {
        let p = split_paragraphs("只有一段\n没有空行");
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn paragraphs_tolerate_whitespace_only_separator_lines() {
        let p = split_paragraphs("第一段\n \t\n第二段");
        assert_eq!(p.len(), 2);
    }

    // ── line matching ────────────────────────────────────────────────

    #[test]
    fn line_match_exact_and_folded() {
        assert!(line_matches_term("海洋灾害", "海洋灾害"));
        assert!(line_matches_term("海洋 灾害", "海洋灾害"));
        assert!(line_matches_term("  海洋灾害  ", "海洋灾害"));
    }

    #[test]
    fn line_match_rejects_other_terms() {
        assert!(!line_matches_term("海洋环境", "海洋灾害"));
        assert!(!line_matches_term("", "海洋灾害"));
    }

    #[test]
    fn line_match_tolerates_minor_noise_on_long_terms() {
        assert!(line_matches_term("海洋灾害应急预警等级划分", "海洋灾害应急预警等级划分"));
        // One stray character in a long heading still matches.
        assert!(line_matches_term(
            "海洋灾害应急预警等级划分·",
            "海洋灾害应急预警等级划分"
        ));
    }
}

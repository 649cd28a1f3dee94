//! Declarative rule tables for definition matching and relationship cues.
//!
//! All pattern knowledge lives here as data: the matcher and analyzer
//! iterate these tables instead of hard-coding phrases. Weights are on a
//! [0, 1] scale throughout.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::RelationKind;

/// A definitional lead-in recognized directly after a term mention, e.g.
/// `风暴潮是指…`. Matching is first-wins in table order, so more specific
/// tokens come before tokens they could shadow.
#[derive(Debug, Clone, Copy)]
pub struct LeadIn {
    pub token: &'static str,
    /// Multiplier on the inline base score. A full-width colon or 是指 is
    /// as strong as a terminology-section entry; bare 为 is weak and often
    /// incidental.
    pub weight: f64,
}

pub const DEFINITION_LEAD_INS: [LeadIn; 8] = [
    LeadIn { token: "：", weight: 1.0 },
    LeadIn { token: ":", weight: 1.0 },
    LeadIn { token: "是指", weight: 1.0 },
    LeadIn { token: "指的是", weight: 1.0 },
    LeadIn { token: "定义为", weight: 1.0 },
    LeadIn { token: "即", weight: 0.9 },
    LeadIn { token: "表示", weight: 0.8 },
    LeadIn { token: "为", weight: 0.7 },
];

/// First lead-in whose token starts `rest`, where `rest` is the page text
/// immediately following a term occurrence.
pub fn match_lead_in(rest: &str) -> Option<&'static LeadIn> {
    DEFINITION_LEAD_INS.iter().find(|l| rest.starts_with(l.token))
}

/// Phrases whose presence anywhere in a definition marks it as definitional
/// prose rather than a passing mention.
pub const DEFINITION_KEYWORDS: [&str; 6] = ["是指", "定义为", "为", "即", "指的是", "表示"];

pub fn contains_definition_keyword(definition: &str) -> bool {
    DEFINITION_KEYWORDS.iter().any(|k| definition.contains(k))
}

/// Weights for candidate confidence scoring.
///
/// A candidate starts from a base score set by how it was found, collects
/// bonuses for definitional shape, loses a penalty when its length falls
/// outside the configured bounds, and is clamped to [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeights {
    /// Base score for a terminology-section heading match.
    pub heading_base: f64,
    /// Base score for an inline mention, before the lead-in multiplier.
    pub inline_base: f64,
    /// Bonus when the definition contains a definitional keyword.
    pub keyword_bonus: f64,
    /// Bonus when the definition ends with a sentence terminator.
    pub terminal_bonus: f64,
    /// Bonus when the definition mentions the term itself.
    pub self_mention_bonus: f64,
    /// Penalty when the definition length is outside the configured range.
    pub length_penalty: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            heading_base: 0.5,
            inline_base: 0.3,
            keyword_bonus: 0.2,
            terminal_bonus: 0.1,
            self_mention_bonus: 0.1,
            length_penalty: 0.25,
        }
    }
}

/// A relationship cue: a pattern that, occurring in a window containing two
/// terms, signals a relationship of `kind` with confidence `weight`.
#[derive(Debug, Clone, Copy)]
pub struct CueRule {
    pub pattern: &'static str,
    pub kind: RelationKind,
    pub weight: f64,
}

/// Master cue table. Strong explicit markers sit at 0.9 so that a single
/// occurrence clears the default retention threshold on its own; weaker,
/// more ambiguous phrasing needs corroboration.
pub const CUE_RULES: [CueRule; 29] = [
    // 主从关系
    CueRule { pattern: "是.{0,12}的一种", kind: RelationKind::Subordinate, weight: 0.9 },
    CueRule { pattern: "属于", kind: RelationKind::Subordinate, weight: 0.9 },
    CueRule { pattern: "包括", kind: RelationKind::Subordinate, weight: 0.9 },
    CueRule { pattern: "分为", kind: RelationKind::Subordinate, weight: 0.9 },
    CueRule { pattern: "包含", kind: RelationKind::Subordinate, weight: 0.85 },
    CueRule { pattern: "划分为", kind: RelationKind::Subordinate, weight: 0.85 },
    CueRule { pattern: "隶属于", kind: RelationKind::Subordinate, weight: 0.85 },
    CueRule { pattern: "涵盖", kind: RelationKind::Subordinate, weight: 0.8 },
    CueRule { pattern: "子类", kind: RelationKind::Subordinate, weight: 0.8 },
    CueRule { pattern: "归入", kind: RelationKind::Subordinate, weight: 0.75 },
    CueRule { pattern: "组成", kind: RelationKind::Subordinate, weight: 0.75 },
    CueRule { pattern: "构成", kind: RelationKind::Subordinate, weight: 0.75 },
    CueRule { pattern: "纳入", kind: RelationKind::Subordinate, weight: 0.7 },
    CueRule { pattern: "类型", kind: RelationKind::Subordinate, weight: 0.65 },
    CueRule { pattern: "类别", kind: RelationKind::Subordinate, weight: 0.65 },
    // 因果关系
    CueRule { pattern: "导致", kind: RelationKind::Causal, weight: 0.9 },
    CueRule { pattern: "引发", kind: RelationKind::Causal, weight: 0.9 },
    CueRule { pattern: "触发", kind: RelationKind::Causal, weight: 0.85 },
    CueRule { pattern: "造成", kind: RelationKind::Causal, weight: 0.85 },
    CueRule { pattern: "引起", kind: RelationKind::Causal, weight: 0.85 },
    CueRule { pattern: "诱发", kind: RelationKind::Causal, weight: 0.85 },
    CueRule { pattern: "由于", kind: RelationKind::Causal, weight: 0.75 },
    CueRule { pattern: "因此", kind: RelationKind::Causal, weight: 0.75 },
    CueRule { pattern: "因而", kind: RelationKind::Causal, weight: 0.7 },
    CueRule { pattern: "因为", kind: RelationKind::Causal, weight: 0.7 },
    CueRule { pattern: "所以", kind: RelationKind::Causal, weight: 0.7 },
    CueRule { pattern: "产生", kind: RelationKind::Causal, weight: 0.7 },
    CueRule { pattern: "影响", kind: RelationKind::Causal, weight: 0.65 },
    CueRule { pattern: "效应", kind: RelationKind::Causal, weight: 0.6 },
];

/// Bonus per additional distinct cue of the same kind found in a window.
pub const EXTRA_CUE_BONUS: f64 = 0.05;

/// Windows scoring below this are not considered evidence at all; the
/// configured retention threshold is applied later, per pair.
pub const DETECTION_FLOOR: f64 = 0.5;

/// A cue rule with its pattern compiled.
pub struct CompiledCue {
    pub regex: Regex,
    pub kind: RelationKind,
    pub weight: f64,
}

static COMPILED_CUES: Lazy<Vec<CompiledCue>> = Lazy::new(|| {
    CUE_RULES
        .iter()
        .map(|rule| CompiledCue {
            regex: Regex::new(rule.pattern).unwrap(),
            kind: rule.kind,
            weight: rule.weight,
        })
        .collect()
});

pub fn compiled_cues() -> &'static [CompiledCue] {
    &COMPILED_CUES
}

// =====================================================================
// Tests
// =====================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ── lead-ins ─────────────────────────────────────────────────────

    #[test]
    fn lead_in_matches_common_markers() {
        assert_eq!(match_lead_in("是指海底地震引起的波浪").map(|l| l.weight), Some(1.0));
        assert_eq!(match_lead_in("：灾害性海浪").map(|l| l.weight), Some(1.0));
        assert_eq!(match_lead_in("为海水异常升高").map(|l| l.weight), Some(0.7));
    }

    #[test]
    fn lead_in_specific_tokens_win_over_prefixes() {
        // 定义为 must not be claimed by the bare 为 rule.
        let l = match_lead_in("定义为海面异常升降").unwrap();
        assert_eq!(l.token, "定义为");
        assert_eq!(l.weight, 1.0);
    }

    #[test]
    fn lead_in_absent_for_plain_prose() {
        assert!(match_lead_in("等灾害的统称").is_none());
        assert!(match_lead_in("").is_none());
    }

    // ── keywords ─────────────────────────────────────────────────────

    #[test]
    fn keyword_detection() {
        assert!(contains_definition_keyword("海啸是指由海底地震引起的波浪。"));
        assert!(contains_definition_keyword("潮位定义为海面相对高度。"));
        assert!(!contains_definition_keyword("观测频次每日两次。"));
    }

    // ── cue table ────────────────────────────────────────────────────

    #[test]
    fn all_cue_patterns_compile() {
        assert_eq!(compiled_cues().len(), CUE_RULES.len());
    }

    #[test]
    fn strong_causal_cue_scores_point_nine() {
        let hits: Vec<_> = compiled_cues()
            .iter()
            .filter(|c| c.regex.is_match("风暴潮导致海岸侵蚀"))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, RelationKind::Causal);
        assert_eq!(hits[0].weight, 0.9);
    }

    #[test]
    fn gapped_subordinate_pattern_matches() {
        let cue = compiled_cues()
            .iter()
            .find(|c| c.regex.is_match("海啸是海洋灾害的一种"))
            .unwrap();
        assert_eq!(cue.kind, RelationKind::Subordinate);
        assert_eq!(cue.weight, 0.9);
    }

    #[test]
    fn weights_stay_in_unit_range() {
        for rule in CUE_RULES {
            assert!(rule.weight > 0.0 && rule.weight <= 1.0);
        }
        for lead_in in DEFINITION_LEAD_INS {
            assert!(lead_in.weight > 0.0 && lead_in.weight <= 1.0);
        }
    }
}

//! Corpus documents and per-corpus statistics.

use std::path::Path;

use crate::backend::PageText;

/// A corpus document after text extraction.
#[derive(Debug, Clone)]
pub struct Document {
    /// Standardized document identifier used in all outputs.
    pub id: String,
    /// Original file name on disk, extension included.
    pub file_name: String,
    /// Position of this document in the sorted corpus listing.
    pub corpus_index: usize,
    /// Extracted pages in reading order, 1-based numbering.
    pub pages: Vec<PageText>,
}

impl Document {
    pub fn new(path: &Path, corpus_index: usize, pages: Vec<PageText>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: standardize_name(&file_name),
            file_name,
            corpus_index,
            pages,
        }
    }

    /// Kind of standard this document carries, judged from its file name.
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::classify(&self.file_name)
    }
}

/// Derive the output document identifier from a PDF file name: drop the
/// `.pdf` extension and replace underscores with hyphens.
pub fn standardize_name(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(".pdf")
        .or_else(|| file_name.strip_suffix(".PDF"))
        .unwrap_or(file_name);
    stem.replace('_', "-")
}

/// Kind of standard, recognized from the file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// 国家标准 (GB, GB/T).
    National,
    /// 行业标准 (HY/T).
    Industry,
    /// Anything else.
    Other,
}

impl DocumentKind {
    /// GB_T before GB so that recommended national standards are not
    /// shadowed by the mandatory prefix.
    pub fn classify(file_name: &str) -> Self {
        if file_name.starts_with("GB_T") {
            DocumentKind::National
        } else if file_name.starts_with("HY_T") {
            DocumentKind::Industry
        } else if file_name.starts_with("GB") {
            DocumentKind::National
        } else {
            DocumentKind::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::National => "国家标准",
            DocumentKind::Industry => "行业标准",
            DocumentKind::Other => "其他",
        }
    }
}

/// Aggregate statistics over the readable corpus, reported at the end of
/// a run.
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    pub documents: usize,
    pub pages: usize,
    pub text_chars: usize,
    pub national: usize,
    pub industry: usize,
    pub other: usize,
}

impl CorpusStats {
    pub fn collect(documents: &[Document]) -> Self {
        let mut stats = CorpusStats::default();
        for doc in documents {
            stats.documents += 1;
            stats.pages += doc.pages.len();
            stats.text_chars += doc.pages.iter().map(|p| p.text.chars().count()).sum::<usize>();
            match doc.kind() {
                DocumentKind::National => stats.national += 1,
                DocumentKind::Industry => stats.industry += 1,
                DocumentKind::Other => stats.other += 1,
            }
        }
        stats
    }
}

// =====================================================================
// Tests
// =====================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    // ── name standardization ─────────────────────────────────────────

    #[test]
    fn standardize_strips_extension_and_replaces_underscores() {
        assert_eq!(
            standardize_name("GB_T_39419-2020-海啸等级-2020-11-19.pdf"),
            "GB-T-39419-2020-海啸等级-2020-11-19"
        );
    }

    #[test]
    fn standardize_handles_uppercase_extension() {
        assert_eq!(standardize_name("HY_T_0273-2019.PDF"), "HY-T-0273-2019");
    }

    #[test]
    fn standardize_leaves_plain_names_alone() {
        assert_eq!(standardize_name("海洋观测规范"), "海洋观测规范");
    }

    // ── classification ───────────────────────────────────────────────

    #[test]
    fn classify_prefixes() {
        assert_eq!(DocumentKind::classify("GB_T_39419.pdf"), DocumentKind::National);
        assert_eq!(DocumentKind::classify("GB19721.pdf"), DocumentKind::National);
        assert_eq!(DocumentKind::classify("HY_T_0273.pdf"), DocumentKind::Industry);
        assert_eq!(DocumentKind::classify("海洋观测.pdf"), DocumentKind::Other);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(DocumentKind::National.label(), "国家标准");
        assert_eq!(DocumentKind::Industry.label(), "行业标准");
        assert_eq!(DocumentKind::Other.label(), "其他");
    }

    // ── stats ────────────────────────────────────────────────────────

    #[test]
    fn stats_count_documents_pages_and_kinds() {
        let docs = vec![
            Document::new(
                &PathBuf::from("GB_T_39419.pdf"),
                0,
                vec![page(1, "海啸"), page(2, "等级")],
            ),
            Document::new(&PathBuf::from("HY_T_0273.pdf"), 1, vec![page(1, "赤潮监测")]),
        ];
        let stats = CorpusStats::collect(&docs);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.pages, 3);
        assert_eq!(stats.text_chars, 8);
        assert_eq!(stats.national, 1);
        assert_eq!(stats.industry, 1);
        assert_eq!(stats.other, 0);
    }

    #[test]
    fn document_new_standardizes_id() {
        let doc = Document::new(&PathBuf::from("/data/raw/GB_T_39419.pdf"), 3, vec![]);
        assert_eq!(doc.id, "GB-T-39419");
        assert_eq!(doc.file_name, "GB_T_39419.pdf");
        assert_eq!(doc.corpus_index, 3);
    }
}

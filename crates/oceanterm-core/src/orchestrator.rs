use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::validator::{self, TaskValidation, ValidationReport};
use crate::{
    Candidate, Config, CoreError, CorpusStats, Document, ProgressEvent, RelationPair, RunSummary,
    TermIssue, TermRecord, TextExtractor, analyzer, matcher, relation_id, resolver, term_id,
};

type Progress = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Which result files a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSelection {
    /// Terminology extraction only (`task1_results.json`).
    Terms,
    /// Relationship discovery only (`task2_results.json`). Terms are
    /// still resolved internally; they are not written out.
    Relations,
    /// Both result files.
    All,
}

impl TaskSelection {
    pub fn writes_terms(&self) -> bool {
        matches!(self, TaskSelection::Terms | TaskSelection::All)
    }

    pub fn writes_relations(&self) -> bool {
        matches!(self, TaskSelection::Relations | TaskSelection::All)
    }
}

/// Stages a run moves through, in order. `Failed` is reachable from any
/// stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Extracting,
    Matching,
    Resolving,
    Analyzing,
    Validating,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Init => "init",
            PipelineState::Extracting => "extracting",
            PipelineState::Matching => "matching",
            PipelineState::Resolving => "resolving",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Validating => "validating",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Everything a completed run produced, in output order.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Validated terminology entries, keyed `W01`, `W02`, … in task-file
    /// order. Empty when the selection does not write terms.
    pub term_entries: Vec<(String, TermRecord)>,
    /// Validated relationships, keyed `R01`, `R02`, … in discovery
    /// order. Empty when the selection does not write relations.
    pub relation_entries: Vec<(String, RelationPair)>,
    /// Unresolved and ambiguous terms encountered along the way.
    pub issues: Vec<TermIssue>,
    pub report: ValidationReport,
    pub summary: RunSummary,
    pub stats: CorpusStats,
}

/// Drives a full run: corpus extraction, term matching and resolution,
/// relationship analysis, then output validation.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            state: PipelineState::Init,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline over the corpus for the terms in `task_path`.
    ///
    /// Progress events are emitted via the callback. On error the
    /// pipeline lands in `Failed`; otherwise `Done`.
    pub async fn run(
        &mut self,
        task_path: &Path,
        selection: TaskSelection,
        extractor: Arc<dyn TextExtractor>,
        progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    ) -> Result<RunOutput, CoreError> {
        let progress: Progress = Arc::new(progress);
        let result = self
            .run_inner(task_path, selection, extractor, Arc::clone(&progress))
            .await;
        if result.is_err() {
            self.state = PipelineState::Failed;
            progress(ProgressEvent::Stage {
                state: PipelineState::Failed,
            });
        }
        result
    }

    async fn run_inner(
        &mut self,
        task_path: &Path,
        selection: TaskSelection,
        extractor: Arc<dyn TextExtractor>,
        progress: Progress,
    ) -> Result<RunOutput, CoreError> {
        let terms = load_task(task_path)?;
        let paths = list_corpus(&self.config.data_dir)?;

        let mut summary = RunSummary {
            documents_total: paths.len(),
            terms_requested: terms.len(),
            ..Default::default()
        };

        // ── extraction ──
        self.enter(PipelineState::Extracting, &progress);
        let documents = if self.config.parallel {
            extract_parallel(&paths, Arc::clone(&extractor), Arc::clone(&progress)).await
        } else {
            extract_sequential(&paths, extractor.as_ref(), &progress)
        };
        summary.documents_skipped = paths.len() - documents.len();
        if documents.is_empty() {
            return Err(CoreError::NoReadableDocuments(self.config.data_dir.clone()));
        }

        // ── matching ──
        self.enter(PipelineState::Matching, &progress);
        let mut candidates: Vec<Vec<Candidate>> = Vec::with_capacity(terms.len());
        for term in &terms {
            let mut found: Vec<Candidate> = Vec::new();
            for doc in &documents {
                found.extend(matcher::match_document(doc, term, &self.config));
            }
            tracing::debug!(term = %term, candidates = found.len(), "matched");
            candidates.push(found);
        }

        // ── resolution ──
        self.enter(PipelineState::Resolving, &progress);
        let total_terms = terms.len();
        let mut term_entries: Vec<(String, TermRecord)> = Vec::new();
        let mut issues: Vec<TermIssue> = Vec::new();
        let mut resolved_names: HashSet<String> = HashSet::new();

        for (index, term) in terms.iter().enumerate() {
            match resolver::resolve(term, &candidates[index], &self.config) {
                Ok(resolver::Resolution { record, ambiguity }) => {
                    summary.terms_resolved += 1;
                    resolved_names.insert(record.term.clone());
                    if let Some(ambiguity) = ambiguity {
                        summary.terms_ambiguous += 1;
                        tracing::warn!(
                            term = %term,
                            similarity = ambiguity.similarity,
                            chosen = %ambiguity.chosen.document,
                            competing = %ambiguity.competing.document,
                            "documents disagree on definition"
                        );
                        progress(ProgressEvent::TermAmbiguous {
                            index,
                            total: total_terms,
                            term: term.clone(),
                            similarity: ambiguity.similarity,
                        });
                        issues.push(TermIssue::Ambiguous {
                            term: term.clone(),
                            similarity: ambiguity.similarity,
                            chosen: ambiguity.chosen,
                            competing: ambiguity.competing,
                        });
                    }
                    progress(ProgressEvent::TermResolved {
                        index,
                        total: total_terms,
                        term: term.clone(),
                        document: record.document.clone(),
                        pages: record.pages,
                    });
                    term_entries.push((term_id(index), record));
                }
                Err(resolver::UnresolvedTerm(name)) => {
                    if self.config.strict {
                        return Err(CoreError::Unresolved(name));
                    }
                    summary.terms_unresolved += 1;
                    tracing::warn!(term = %name, "no definition found in corpus");
                    progress(ProgressEvent::TermUnresolved {
                        index,
                        total: total_terms,
                        term: name.clone(),
                    });
                    issues.push(TermIssue::Unresolved { term: name });
                }
            }
        }

        // ── analysis ──
        let mut relation_entries: Vec<(String, RelationPair)> = Vec::new();
        if selection.writes_relations() {
            self.enter(PipelineState::Analyzing, &progress);
            let records: Vec<TermRecord> =
                term_entries.iter().map(|(_, record)| record.clone()).collect();
            let analysis = analyzer::analyze(&records, &documents, &self.config);
            summary.relations_found = analysis.pairs.len();
            summary.relations_dropped = analysis.dropped;
            for (index, pair) in analysis.pairs.into_iter().enumerate() {
                tracing::debug!(
                    a = %pair.terms[0],
                    b = %pair.terms[1],
                    kind = %pair.kind,
                    confidence = pair.confidence,
                    "relationship found"
                );
                progress(ProgressEvent::RelationFound {
                    terms: pair.terms.clone(),
                    kind: pair.kind,
                    confidence: pair.confidence,
                });
                relation_entries.push((relation_id(index), pair));
            }
        }

        // ── validation ──
        self.enter(PipelineState::Validating, &progress);
        let mut report = ValidationReport::default();

        if selection.writes_terms() {
            let mut validation = TaskValidation::default();
            let mut kept = Vec::with_capacity(term_entries.len());
            for (id, record) in term_entries {
                match validator::validate_term(&record, &documents, &self.config) {
                    Ok(()) => {
                        validation.record_pass();
                        kept.push((id, record));
                    }
                    Err(reason) => {
                        summary.records_invalid += 1;
                        tracing::warn!(id = %id, reason = %reason, "excluding entry from results");
                        validation.record_failure(id, reason);
                    }
                }
            }
            term_entries = kept;
            report.task1 = Some(validation);
        } else {
            term_entries.clear();
        }

        if selection.writes_relations() {
            let mut validation = TaskValidation::default();
            let mut kept = Vec::with_capacity(relation_entries.len());
            for (id, pair) in relation_entries {
                match validator::validate_relation(&pair, &resolved_names, &documents) {
                    Ok(()) => {
                        validation.record_pass();
                        kept.push((id, pair));
                    }
                    Err(reason) => {
                        summary.records_invalid += 1;
                        tracing::warn!(id = %id, reason = %reason, "excluding entry from results");
                        validation.record_failure(id, reason);
                    }
                }
            }
            relation_entries = kept;
            report.task2 = Some(validation);
        }

        let stats = CorpusStats::collect(&documents);
        self.enter(PipelineState::Done, &progress);
        tracing::info!(
            resolved = summary.terms_resolved,
            requested = summary.terms_requested,
            relations = summary.relations_found,
            "run complete"
        );

        Ok(RunOutput {
            term_entries,
            relation_entries,
            issues,
            report,
            summary,
            stats,
        })
    }

    fn enter(&mut self, state: PipelineState, progress: &Progress) {
        tracing::debug!(stage = %state, "pipeline stage");
        self.state = state;
        progress(ProgressEvent::Stage { state });
    }
}

/// Read the task file: a JSON array of term names. Blank entries are
/// dropped.
fn load_task(path: &Path) -> Result<Vec<String>, CoreError> {
    let content = fs::read_to_string(path).map_err(|source| CoreError::TaskFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Vec<String> =
        serde_json::from_str(&content).map_err(|source| CoreError::TaskFileParse {
            path: path.to_path_buf(),
            source,
        })?;
    let terms: Vec<String> = raw
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return Err(CoreError::EmptyTask(path.to_path_buf()));
    }
    Ok(terms)
}

/// List corpus PDFs sorted by file name. The sorted position is the
/// document's corpus index for the whole run.
fn list_corpus(data_dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    if !data_dir.is_dir() {
        return Err(CoreError::CorpusDirMissing(data_dir.to_path_buf()));
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(CoreError::EmptyCorpus(data_dir.to_path_buf()));
    }
    Ok(paths)
}

fn extract_one(
    path: &Path,
    index: usize,
    total: usize,
    extractor: &dyn TextExtractor,
    progress: &Progress,
) -> Option<Document> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    progress(ProgressEvent::DocumentStarted {
        index,
        total,
        name: name.clone(),
    });
    match extractor.extract(path) {
        Ok(pages) => {
            let doc = Document::new(path, index, pages);
            progress(ProgressEvent::DocumentFinished {
                index,
                total,
                name,
                pages: doc.pages.len(),
            });
            Some(doc)
        }
        Err(e) => {
            tracing::warn!(document = %name, error = %e, "extraction failed, skipping");
            progress(ProgressEvent::DocumentSkipped {
                index,
                total,
                name,
                message: e.to_string(),
            });
            None
        }
    }
}

fn extract_sequential(
    paths: &[PathBuf],
    extractor: &dyn TextExtractor,
    progress: &Progress,
) -> Vec<Document> {
    let total = paths.len();
    let mut documents = Vec::with_capacity(total);
    for (index, path) in paths.iter().enumerate() {
        if let Some(doc) = extract_one(path, index, total, extractor, progress) {
            documents.push(doc);
        }
    }
    documents
}

/// Extract every document on its own blocking worker. Corpus indices are
/// assigned before spawning, so the merged result is identical to a
/// sequential run.
async fn extract_parallel(
    paths: &[PathBuf],
    extractor: Arc<dyn TextExtractor>,
    progress: Progress,
) -> Vec<Document> {
    let total = paths.len();
    let mut join_set = JoinSet::new();
    for (index, path) in paths.iter().cloned().enumerate() {
        let extractor = Arc::clone(&extractor);
        let progress = Arc::clone(&progress);
        join_set.spawn_blocking(move || {
            extract_one(&path, index, total, extractor.as_ref(), &progress)
        });
    }

    let mut documents = Vec::with_capacity(total);
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Some(doc)) => documents.push(doc),
            Ok(None) => {}
            Err(_) => continue,
        }
    }
    documents.sort_by_key(|d| d.corpus_index);
    documents
}

// =====================================================================
// Tests
// =====================================================================

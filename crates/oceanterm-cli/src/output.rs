use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use oceanterm_core::{
    Config, CorpusStats, EvidenceEntry, PipelineState, ProgressEvent, RunSummary, TaskValidation,
    TermIssue, ValidationReport,
};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Progress bar covering the document-extraction stage. Drawn on stderr
/// and hidden automatically when stderr is not a terminal.
#[derive(Clone)]
pub struct ExtractionBar {
    bar: ProgressBar,
    bar_style: ProgressStyle,
}

impl ExtractionBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap());
        bar.set_message("Scanning corpus...");
        bar.enable_steady_tick(Duration::from_millis(120));

        let bar_style =
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:40.cyan/dim}] {pos}/{len}")
                .unwrap()
                .progress_chars("=> ");

        Self { bar, bar_style }
    }

    pub fn update(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::DocumentStarted { total, name, .. } => {
                // Switch to a bar once the corpus size is known
                if self.bar.length() == Some(0) {
                    self.bar.set_length(*total as u64);
                    self.bar.set_style(self.bar_style.clone());
                }
                self.bar.set_message(name.clone());
            }
            ProgressEvent::DocumentFinished { .. } | ProgressEvent::DocumentSkipped { .. } => {
                // One terminal event arrives per document; completion
                // order is arbitrary under parallel extraction.
                self.bar.inc(1);
            }
            ProgressEvent::Stage { state } if *state != PipelineState::Extracting => {
                self.clear();
            }
            _ => {}
        }
    }

    pub fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Print the run header before the pipeline starts.
pub fn print_run_header(
    w: &mut dyn Write,
    task_path: &Path,
    config: &Config,
) -> std::io::Result<()> {
    writeln!(w, "Reading terms from {}...", task_path.display())?;
    writeln!(w, "Corpus directory: {}", config.data_dir.display())?;
    writeln!(w)?;
    Ok(())
}

/// Print a real-time progress event. Extraction progress is handled by
/// the [`ExtractionBar`] instead.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::DocumentSkipped { name, message, .. } => {
            if color.enabled() {
                writeln!(w, "{} skipped {}: {}", "WARNING:".yellow(), name, message)?;
            } else {
                writeln!(w, "WARNING: skipped {}: {}", name, message)?;
            }
        }
        ProgressEvent::TermResolved {
            index,
            total,
            term,
            document,
            pages,
        } => {
            let idx = index + 1;
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] {} -> {} ({}, {})",
                    idx,
                    total,
                    term,
                    "RESOLVED".green(),
                    document,
                    pages
                )?;
            } else {
                writeln!(
                    w,
                    "[{}/{}] {} -> RESOLVED ({}, {})",
                    idx, total, term, document, pages
                )?;
            }
        }
        ProgressEvent::TermUnresolved { index, total, term } => {
            let idx = index + 1;
            if color.enabled() {
                writeln!(w, "[{}/{}] {} -> {}", idx, total, term, "NOT FOUND".red())?;
            } else {
                writeln!(w, "[{}/{}] {} -> NOT FOUND", idx, total, term)?;
            }
        }
        ProgressEvent::TermAmbiguous {
            index,
            total,
            term,
            similarity,
        } => {
            let idx = index + 1;
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] {} -> {} (definitions diverge, similarity {:.2})",
                    idx,
                    total,
                    term,
                    "AMBIGUOUS".yellow(),
                    similarity
                )?;
            } else {
                writeln!(
                    w,
                    "[{}/{}] {} -> AMBIGUOUS (definitions diverge, similarity {:.2})",
                    idx, total, term, similarity
                )?;
            }
        }
        ProgressEvent::RelationFound {
            terms,
            kind,
            confidence,
        } => {
            if color.enabled() {
                writeln!(
                    w,
                    "{} {} <-> {} ({}, confidence {:.2})",
                    "RELATION".cyan(),
                    terms[0],
                    terms[1],
                    kind,
                    confidence
                )?;
            } else {
                writeln!(
                    w,
                    "RELATION {} <-> {} ({}, confidence {:.2})",
                    terms[0], terms[1], kind, confidence
                )?;
            }
        }
        ProgressEvent::Stage { .. }
        | ProgressEvent::DocumentStarted { .. }
        | ProgressEvent::DocumentFinished { .. } => {}
    }
    Ok(())
}

/// Print the detail blocks for unresolved and ambiguous terms.
pub fn print_issues(
    w: &mut dyn Write,
    issues: &[TermIssue],
    color: ColorMode,
) -> std::io::Result<()> {
    for issue in issues {
        match issue {
            TermIssue::Unresolved { term } => print_unresolved_block(w, term, color)?,
            TermIssue::Ambiguous {
                term,
                similarity,
                chosen,
                competing,
            } => print_ambiguous_block(w, term, *similarity, chosen, competing, color)?,
        }
    }
    Ok(())
}

fn print_unresolved_block(w: &mut dyn Write, term: &str, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold().red())?;
        writeln!(w, "{}", "TERM NOT FOUND".bold().red())?;
        writeln!(w, "{}", sep.bold().red())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "TERM NOT FOUND")?;
        writeln!(w, "{}", sep)?;
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(w, "{}:", "Term".bold())?;
        writeln!(w, "  {}", term.cyan())?;
    } else {
        writeln!(w, "Term:")?;
        writeln!(w, "  {}", term)?;
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(
            w,
            "{} No definition found in any corpus document",
            "Status:".red()
        )?;
    } else {
        writeln!(w, "Status: No definition found in any corpus document")?;
    }
    writeln!(w)?;
    Ok(())
}

fn print_ambiguous_block(
    w: &mut dyn Write,
    term: &str,
    similarity: f64,
    chosen: &EvidenceEntry,
    competing: &EvidenceEntry,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold().yellow())?;
        writeln!(w, "{}", "AMBIGUOUS DEFINITION".bold().yellow())?;
        writeln!(w, "{}", sep.bold().yellow())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "AMBIGUOUS DEFINITION")?;
        writeln!(w, "{}", sep)?;
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(w, "{}:", "Term".bold())?;
        writeln!(w, "  {}", term.cyan())?;
    } else {
        writeln!(w, "Term:")?;
        writeln!(w, "  {}", term)?;
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(
            w,
            "{} Documents disagree on the definition (similarity {:.2})",
            "Status:".yellow(),
            similarity
        )?;
    } else {
        writeln!(
            w,
            "Status: Documents disagree on the definition (similarity {:.2})",
            similarity
        )?;
    }
    writeln!(w)?;

    writeln!(w, "  Kept:      {} ({})", chosen.document, chosen.pages)?;
    writeln!(w, "  Competing: {} ({})", competing.document, competing.pages)?;
    writeln!(w)?;
    Ok(())
}

/// Print the validation outcome for each executed task.
pub fn print_validation(
    w: &mut dyn Write,
    report: &ValidationReport,
    color: ColorMode,
) -> std::io::Result<()> {
    print_task_validation(w, "Task 1 (terminology)", report.task1.as_ref(), color)?;
    print_task_validation(w, "Task 2 (relationships)", report.task2.as_ref(), color)?;
    Ok(())
}

fn print_task_validation(
    w: &mut dyn Write,
    label: &str,
    task: Option<&TaskValidation>,
    color: ColorMode,
) -> std::io::Result<()> {
    let Some(task) = task else {
        return Ok(());
    };

    let line = format!(
        "{}: {}/{} valid, completeness {:.2} ({})",
        label,
        task.valid,
        task.total,
        task.completeness_score(),
        task.status()
    );
    if color.enabled() {
        if task.passed() {
            writeln!(w, "{}", line.green())?;
        } else {
            writeln!(w, "{}", line.yellow())?;
        }
    } else {
        writeln!(w, "{}", line)?;
    }

    for (id, reason) in &task.failures {
        let msg = format!("  {} excluded: {}", id, reason);
        if color.enabled() {
            writeln!(w, "{}", msg.dimmed())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    }
    Ok(())
}

/// Print the final summary.
pub fn print_summary(
    w: &mut dyn Write,
    summary: &RunSummary,
    stats: &CorpusStats,
    report: &ValidationReport,
    written: &[PathBuf],
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(
        w,
        "  Documents read: {} ({} national, {} industry, {} other)",
        stats.documents, stats.national, stats.industry, stats.other
    )?;
    writeln!(w, "  Pages extracted: {}", stats.pages)?;
    writeln!(w, "  Text volume: {} chars", stats.text_chars)?;
    if summary.documents_skipped > 0 {
        let msg = format!("Documents skipped: {}", summary.documents_skipped);
        if color.enabled() {
            writeln!(w, "  {}", msg.red())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(
            w,
            "  {} {}/{}",
            "Terms resolved:".green(),
            summary.terms_resolved,
            summary.terms_requested
        )?;
    } else {
        writeln!(
            w,
            "  Terms resolved: {}/{}",
            summary.terms_resolved, summary.terms_requested
        )?;
    }
    if summary.terms_unresolved > 0 {
        if color.enabled() {
            writeln!(
                w,
                "  {} {}",
                "Terms not found:".red(),
                summary.terms_unresolved
            )?;
        } else {
            writeln!(w, "  Terms not found: {}", summary.terms_unresolved)?;
        }
    }
    if summary.terms_ambiguous > 0 {
        if color.enabled() {
            writeln!(
                w,
                "  {} {}",
                "Ambiguous definitions:".yellow(),
                summary.terms_ambiguous
            )?;
        } else {
            writeln!(w, "  Ambiguous definitions: {}", summary.terms_ambiguous)?;
        }
    }
    if report.task2.is_some() {
        writeln!(w, "  Relations found: {}", summary.relations_found)?;
        if summary.relations_dropped > 0 {
            let msg = format!("Below min confidence: {}", summary.relations_dropped);
            if color.enabled() {
                writeln!(w, "  {}", msg.dimmed())?;
            } else {
                writeln!(w, "  {}", msg)?;
            }
        }
    }
    if summary.records_invalid > 0 {
        if color.enabled() {
            writeln!(
                w,
                "  {} {}",
                "Excluded by validation:".red(),
                summary.records_invalid
            )?;
        } else {
            writeln!(w, "  Excluded by validation: {}", summary.records_invalid)?;
        }
    }

    writeln!(w)?;
    let overall = format!(
        "Overall score: {:.2} ({})",
        report.overall_score(),
        report.status()
    );
    if color.enabled() {
        if report.overall_passed() {
            writeln!(w, "  {}", overall.green())?;
        } else {
            writeln!(w, "  {}", overall.yellow())?;
        }
    } else {
        writeln!(w, "  {}", overall)?;
    }

    if !written.is_empty() {
        writeln!(w)?;
        for path in written {
            writeln!(w, "  Wrote: {}", path.display())?;
        }
    }

    writeln!(w)?;
    Ok(())
}

// =====================================================================
// Tests
// =====================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(index: usize, total: usize) -> ProgressEvent {
        ProgressEvent::DocumentFinished {
            index,
            total,
            name: format!("doc_{index}.pdf"),
            pages: 1,
        }
    }

    #[test]
    fn extraction_bar_counts_completions_in_any_order() {
        let progress = ExtractionBar::new();
        progress.update(&ProgressEvent::DocumentStarted {
            index: 0,
            total: 4,
            name: "doc_0.pdf".to_string(),
        });
        assert_eq!(progress.bar.length(), Some(4));

        // Parallel extraction finishes documents in arbitrary order.
        progress.update(&finished(2, 4));
        assert_eq!(progress.bar.position(), 1);
        progress.update(&finished(0, 4));
        assert_eq!(progress.bar.position(), 2);
        progress.update(&ProgressEvent::DocumentSkipped {
            index: 3,
            total: 4,
            name: "doc_3.pdf".to_string(),
            message: "unreadable".to_string(),
        });
        progress.update(&finished(1, 4));
        assert_eq!(progress.bar.position(), 4);
        progress.clear();
    }
}

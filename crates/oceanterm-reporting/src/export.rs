use std::io::Write;
use std::path::{Path, PathBuf};

use oceanterm_core::{RelationPair, TaskValidation, TermRecord, ValidationReport};

pub const TASK1_FILE: &str = "task1_results.json";
pub const TASK2_FILE: &str = "task2_results.json";
pub const REPORT_FILE: &str = "validation_report.json";

fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn json_str(s: &str) -> String {
    format!("\"{}\"", json_escape(s))
}

/// Render terminology entries as the task 1 result object.
///
/// Keys keep the order of `entries`; Chinese text is written as-is
/// rather than `\u` escaped.
pub fn task1_json(entries: &[(String, TermRecord)]) -> String {
    let mut out = String::from("{\n");
    for (i, (id, record)) in entries.iter().enumerate() {
        out.push_str(&format!("  {}: {{\n", json_str(id)));
        out.push_str(&format!("    \"术语名称\": {},\n", json_str(&record.term)));
        out.push_str(&format!(
            "    \"术语定义\": {},\n",
            json_str(&record.definition)
        ));
        out.push_str(&format!(
            "    \"文档出处\": {},\n",
            json_str(&record.document)
        ));
        out.push_str(&format!(
            "    \"文档页数\": {}\n",
            json_str(&record.pages.label())
        ));
        out.push_str("  }");
        if i + 1 < entries.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

/// Render relationship entries as the task 2 result object.
pub fn task2_json(entries: &[(String, RelationPair)]) -> String {
    let mut out = String::from("{\n");
    for (i, (id, pair)) in entries.iter().enumerate() {
        out.push_str(&format!("  {}: {{\n", json_str(id)));
        out.push_str(&format!(
            "    \"术语关联\": [{}, {}],\n",
            json_str(&pair.terms[0]),
            json_str(&pair.terms[1])
        ));
        out.push_str(&format!(
            "    \"关联关系\": {},\n",
            json_str(pair.kind.label())
        ));
        out.push_str("    \"关联描述\": [\n");
        for (j, entry) in pair.evidence.iter().enumerate() {
            out.push_str("      {\n");
            out.push_str(&format!(
                "        \"文档出处\": {},\n",
                json_str(&entry.document)
            ));
            out.push_str(&format!(
                "        \"文档页数\": {}\n",
                json_str(&entry.pages.label())
            ));
            out.push_str("      }");
            if j + 1 < pair.evidence.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str("    ]\n");
        out.push_str("  }");
        if i + 1 < entries.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

fn task_validation_json(key: &str, task: &TaskValidation) -> String {
    let mut out = String::new();
    out.push_str(&format!("  \"{key}\": {{\n"));
    out.push_str(&format!("    \"total\": {},\n", task.total));
    out.push_str(&format!("    \"valid\": {},\n", task.valid));
    out.push_str(&format!(
        "    \"completeness_score\": {:.2},\n",
        task.completeness_score()
    ));
    out.push_str(&format!("    \"status\": {},\n", json_str(task.status())));
    out.push_str("    \"failures\": [");
    for (i, (id, reason)) in task.failures.iter().enumerate() {
        out.push_str(&format!(
            "{{\"id\": {}, \"reason\": {}}}",
            json_str(id),
            json_str(&reason.to_string())
        ));
        if i + 1 < task.failures.len() {
            out.push_str(", ");
        }
    }
    out.push_str("]\n");
    out.push_str("  }");
    out
}

/// Render the validation report. Tasks the run did not execute are left
/// out entirely.
pub fn report_json(report: &ValidationReport) -> String {
    let mut out = String::from("{\n");
    if let Some(task) = &report.task1 {
        out.push_str(&task_validation_json("task1_validation", task));
        out.push_str(",\n");
    }
    if let Some(task) = &report.task2 {
        out.push_str(&task_validation_json("task2_validation", task));
        out.push_str(",\n");
    }
    out.push_str(&format!(
        "  \"overall_assessment\": {{\n    \"overall_score\": {:.2},\n    \"status\": {}\n  }}\n",
        report.overall_score(),
        json_str(report.status())
    ));
    out.push_str("}\n");
    out
}

fn write_output(output_dir: &Path, file_name: &str, content: &str) -> Result<PathBuf, String> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| format!("Failed to create output directory: {}", e))?;
    let path = output_dir.join(file_name);
    let mut file =
        std::fs::File::create(&path).map_err(|e| format!("Failed to create file: {}", e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| format!("Failed to write: {}", e))?;
    Ok(path)
}

/// Write `task1_results.json` into `output_dir`, creating it if needed.
pub fn write_task1(
    entries: &[(String, TermRecord)],
    output_dir: &Path,
) -> Result<PathBuf, String> {
    write_output(output_dir, TASK1_FILE, &task1_json(entries))
}

/// Write `task2_results.json` into `output_dir`, creating it if needed.
pub fn write_task2(
    entries: &[(String, RelationPair)],
    output_dir: &Path,
) -> Result<PathBuf, String> {
    write_output(output_dir, TASK2_FILE, &task2_json(entries))
}

/// Write `validation_report.json` into `output_dir`, creating it if
/// needed.
pub fn write_report(report: &ValidationReport, output_dir: &Path) -> Result<PathBuf, String> {
    write_output(output_dir, REPORT_FILE, &report_json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    use oceanterm_core::{EvidenceEntry, PageSpan, ReasonCode, RelationKind};

    fn record(term: &str, definition: &str, document: &str, pages: PageSpan) -> TermRecord {
        TermRecord {
            term: term.to_string(),
            definition: definition.to_string(),
            document: document.to_string(),
            pages,
        }
    }

    fn evidence(document: &str, pages: PageSpan) -> EvidenceEntry {
        EvidenceEntry {
            document: document.to_string(),
            corpus_index: 0,
            pages,
        }
    }

    // ── escaping ──

    #[test]
    fn escape_handles_specials() {
        assert_eq!(json_escape(r#"He said "hi""#), r#"He said \"hi\""#);
        assert_eq!(json_escape("back\\slash"), "back\\\\slash");
        assert_eq!(json_escape("line\nbreak"), "line\\nbreak");
        assert_eq!(json_escape("\x07"), "\\u0007");
    }

    #[test]
    fn chinese_text_passes_through_unescaped() {
        assert_eq!(json_escape("风暴潮"), "风暴潮");
        assert_eq!(json_str("第3页"), "\"第3页\"");
    }

    // ── task 1 ──

    #[test]
    fn task1_single_entry_layout() {
        let entries = vec![(
            "W01".to_string(),
            record(
                "海洋灾害",
                "由海洋自然环境异常变化引起的灾害。",
                "GB-T-39419",
                PageSpan::single(3),
            ),
        )];
        let expected = "{\n  \"W01\": {\n    \"术语名称\": \"海洋灾害\",\n    \"术语定义\": \"由海洋自然环境异常变化引起的灾害。\",\n    \"文档出处\": \"GB-T-39419\",\n    \"文档页数\": \"第3页\"\n  }\n}\n";
        assert_eq!(task1_json(&entries), expected);
    }

    #[test]
    fn task1_preserves_entry_order() {
        let entries = vec![
            (
                "W01".to_string(),
                record("风暴潮", "第一个定义文本内容。", "GB-T-14914", PageSpan::single(1)),
            ),
            (
                "W02".to_string(),
                record("海啸", "第二个定义文本内容。", "GB-T-19721", PageSpan::range(2, 3)),
            ),
        ];
        let json = task1_json(&entries);
        let w01 = json.find("\"W01\"").unwrap();
        let w02 = json.find("\"W02\"").unwrap();
        assert!(w01 < w02);
        assert!(json.contains("\"文档页数\": \"第2-3页\""));

        // Two entries, one comma between them.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn task1_empty_is_an_empty_object() {
        let json = task1_json(&[]);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }

    #[test]
    fn task1_is_valid_json_with_embedded_quotes() {
        let entries = vec![(
            "W01".to_string(),
            record(
                "海图",
                "标注\"水深\"等要素的专用地图。",
                "GB-T-12763",
                PageSpan::single(7),
            ),
        )];
        let value: serde_json::Value = serde_json::from_str(&task1_json(&entries)).unwrap();
        assert_eq!(
            value["W01"]["术语定义"],
            "标注\"水深\"等要素的专用地图。"
        );
    }

    // ── task 2 ──

    #[test]
    fn task2_entry_layout() {
        let entries = vec![(
            "R01".to_string(),
            RelationPair {
                terms: ["风暴潮".to_string(), "海岸侵蚀".to_string()],
                kind: RelationKind::Causal,
                confidence: 0.9,
                evidence: vec![
                    evidence("GB-T-14914", PageSpan::single(2)),
                    evidence("HY-T-0332", PageSpan::single(1)),
                ],
            },
        )];
        let json = task2_json(&entries);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["R01"]["术语关联"][0], "风暴潮");
        assert_eq!(value["R01"]["术语关联"][1], "海岸侵蚀");
        assert_eq!(value["R01"]["关联关系"], "因果关系");
        let descriptions = value["R01"]["关联描述"].as_array().unwrap();
        assert_eq!(descriptions.len(), 2);
        assert_eq!(descriptions[0]["文档出处"], "GB-T-14914");
        assert_eq!(descriptions[0]["文档页数"], "第2页");
        assert_eq!(descriptions[1]["文档出处"], "HY-T-0332");
    }

    #[test]
    fn task2_confidence_is_not_exported() {
        let entries = vec![(
            "R01".to_string(),
            RelationPair {
                terms: ["甲".to_string(), "乙".to_string()],
                kind: RelationKind::Subordinate,
                confidence: 0.85,
                evidence: vec![evidence("GB-T-1", PageSpan::single(1))],
            },
        )];
        let json = task2_json(&entries);
        assert!(!json.contains("0.85"));
        assert!(json.contains("主从关系"));
    }

    // ── validation report ──

    #[test]
    fn report_includes_only_executed_tasks() {
        let report = ValidationReport {
            task1: Some(TaskValidation {
                total: 2,
                valid: 2,
                failures: vec![],
            }),
            task2: None,
        };
        let json = report_json(&report);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("task1_validation").is_some());
        assert!(value.get("task2_validation").is_none());
        assert_eq!(value["overall_assessment"]["overall_score"], 1.0);
        assert_eq!(value["overall_assessment"]["status"], "通过");
    }

    #[test]
    fn report_lists_failures_with_reasons() {
        let report = ValidationReport {
            task1: Some(TaskValidation {
                total: 2,
                valid: 1,
                failures: vec![(
                    "W02".to_string(),
                    ReasonCode::DefinitionTooShort { length: 4, min: 10 },
                )],
            }),
            task2: Some(TaskValidation {
                total: 1,
                valid: 1,
                failures: vec![],
            }),
        };
        let json = report_json(&report);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["task1_validation"]["completeness_score"], 0.5);
        assert_eq!(value["task1_validation"]["status"], "需要改进");
        assert_eq!(value["task1_validation"]["failures"][0]["id"], "W02");
        assert_eq!(value["task2_validation"]["valid"], 1);
        assert_eq!(value["overall_assessment"]["overall_score"], 0.75);
    }

    // ── file writing ──

    #[test]
    fn writer_creates_directory_and_matches_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("output");
        let entries = vec![(
            "W01".to_string(),
            record("海啸", "由海底地震引起的巨大海浪。", "GB-T-19721", PageSpan::single(1)),
        )];

        let path = write_task1(&entries, &output_dir).unwrap();
        assert_eq!(path.file_name().unwrap(), TASK1_FILE);
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, task1_json(&entries));
    }

    #[test]
    fn repeated_writes_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![(
            "R01".to_string(),
            RelationPair {
                terms: ["风暴潮".to_string(), "海岸侵蚀".to_string()],
                kind: RelationKind::Causal,
                confidence: 0.9,
                evidence: vec![evidence("GB-T-14914", PageSpan::single(2))],
            },
        )];

        let path = write_task2(&entries, dir.path()).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_task2(&entries, dir.path()).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }
}

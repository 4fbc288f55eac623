//! Output formatting for run reports, subjects and configuration
//!
//! JSON and YAML serialize the report types directly; the human format is a
//! compact summary meant for terminals.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::{Subject, SubjectVocabulary};
use crate::config::NotefilerConfig;
use crate::pipeline::{NoteOutcome, NoteStatus, RunReport};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a run report according to the configured format
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "run report"),
            OutputFormat::Yaml => to_yaml(report, "run report"),
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_subjects(&self, vocabulary: &SubjectVocabulary) -> Result<String> {
        let subjects: Vec<&Subject> = vocabulary.iter().collect();
        match self.format {
            OutputFormat::Json => to_json(&subjects, "subjects"),
            OutputFormat::Yaml => to_yaml(&subjects, "subjects"),
            OutputFormat::Human => Ok(self.format_subjects_human(&subjects)),
        }
    }

    pub fn format_config(&self, config: &NotefilerConfig) -> Result<String> {
        let config_map: BTreeMap<String, String> = config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => to_json(&config_map, "config"),
            OutputFormat::Yaml => to_yaml(&config_map, "config"),
            OutputFormat::Human => Ok(format!("{}", config)),
        }
    }

    fn format_report_human(&self, report: &RunReport) -> String {
        let mut output = String::new();
        let summary = &report.summary;

        if report.cancelled {
            output.push_str("\u{26A0} Note Filing Report (Cancelled)\n");
        } else if report.has_failures() {
            output.push_str("\u{26A0} Note Filing Report\n");
        } else {
            output.push_str("\u{2713} Note Filing Report\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Run:        {}\n", report.run_id));
        output.push_str(&format!("Store:      {} (root {})\n", report.store, report.root_id));
        output.push_str(&format!("Threshold:  {:.2}\n\n", report.threshold));

        if !report.notes.is_empty() {
            output.push_str("Notes:\n");
            for (i, note) in report.notes.iter().enumerate() {
                let is_last = i == report.notes.len() - 1;
                let connector = if is_last { "\u{2514}" } else { "\u{251C}" };
                output.push_str(&format!("{}\u{2500} {}\n", connector, describe_note(note)));
            }
            output.push('\n');
        }

        output.push_str("Summary:\n");
        output.push_str(&format!("\u{251C}\u{2500} Uploaded: {}\n", summary.uploaded));
        output.push_str(&format!("\u{251C}\u{2500} Skipped:  {}\n", summary.skipped));
        output.push_str(&format!("\u{251C}\u{2500} Failed:   {}\n", summary.failed));
        output.push_str(&format!(
            "\u{2514}\u{2500} Folders created: {}\n",
            summary.folders_created
        ));

        if !summary.subjects.is_empty() {
            output.push_str("\nBy subject:\n");
            for (subject, count) in &summary.subjects {
                output.push_str(&format!("  {:<24} {}\n", subject, count));
            }
        }

        if let Some(avg) = summary.average_confidence {
            let filled_blocks = ((avg * 10.0).round() as usize).min(10);
            let bar = "\u{2588}".repeat(filled_blocks) + &"\u{2591}".repeat(10 - filled_blocks);
            output.push_str(&format!(
                "\nAverage confidence: {} {}%\n",
                bar,
                (avg * 100.0).round() as u32
            ));
        }

        let elapsed = report.finished_at - report.started_at;
        output.push_str(&format!(
            "\nProcessed {} note(s) in {}ms\n",
            summary.total,
            elapsed.num_milliseconds()
        ));

        output
    }

    fn format_subjects_human(&self, subjects: &[&Subject]) -> String {
        let mut output = String::new();

        output.push_str("Subjects\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        for subject in subjects {
            output.push_str(&format!("{}\n", subject.label));
            output.push_str(&format!("  {}\n", subject.description));
        }
        output.push_str(&format!(
            "\nNotes below the confidence threshold are filed under '{}'.\n",
            crate::classify::UNCATEGORIZED
        ));

        output
    }
}

fn describe_note(note: &NoteOutcome) -> String {
    let name = note
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| note.path.display().to_string());

    match note.status {
        NoteStatus::Failed => {
            let reason = note
                .failure
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            format!("\u{2717} {}  {}", name, reason)
        }
        status => {
            let symbol = if status == NoteStatus::Uploaded {
                "\u{2713}"
            } else {
                "\u{2192}"
            };
            let mut line = format!("{} {}", symbol, name);
            if let Some(dest) = &note.destination {
                let remote = dest.remote_name.as_deref().unwrap_or("");
                if !remote.is_empty() && remote != name {
                    line.push_str(&format!("  \u{2192} {}/{}", dest.folder_path, remote));
                } else {
                    line.push_str(&format!("  \u{2192} {}", dest.folder_path));
                }
            }
            if let Some(verdict) = &note.verdict {
                line.push_str(&format!(" ({:.2})", verdict.confidence));
            }
            if let Some(error) = &note.classification_error {
                line.push_str(&format!("  [classifier: {}]", error));
            }
            line
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}

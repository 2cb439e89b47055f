// src/formatting.rs

use crate::core::{AlarmEntry, AlarmRecord};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A trait for formatting an alarm record into a single message body.
pub trait TextFormatter: Send + Sync {
    fn format_record(&self, record: &AlarmRecord) -> String;
}

fn format_line(entry: &AlarmEntry) -> String {
    format!(
        "{} [P{}] {:<12} {}: {}",
        entry.timestamp.format(TIME_FORMAT),
        entry.priority,
        entry.state.to_string(),
        entry.tag,
        entry.text
    )
}

/// One line per entry, in arrival order. Used for email bodies.
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format_record(&self, record: &AlarmRecord) -> String {
        record
            .iter()
            .map(format_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The plain format wrapped in a Markdown code fence so chat platforms
/// render the columns aligned.
pub struct CodeBlockFormatter;

impl TextFormatter for CodeBlockFormatter {
    fn format_record(&self, record: &AlarmRecord) -> String {
        if record.is_empty() {
            return String::new();
        }
        format!("```\n{}\n```", PlainTextFormatter.format_record(record))
    }
}

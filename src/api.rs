use crate::diagnostic::{Diagnostic, Severity, DIAGNOSTIC_SOURCE};
use crate::error::ChartsError;
use crate::formatter::{Formatter, FormattingOptions, TextEdit};
#[cfg(feature = "lsp")]
use crate::lsp::{self, Hover};
use crate::registry::Registry;
#[cfg(feature = "lsp")]
use crate::text_range::Position;
use crate::text_range::Range;
use crate::utils::{normalize_line_endings, split_lines};
use crate::validator::Validator;
use miette::{GraphicalReportHandler, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The outcome of validating one document.
///
/// Holds the diagnostics in the order they were found, and the source text
/// so that they can be rendered against it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub file_name: String,
    #[serde(skip)]
    source: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Serializes the report into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the report into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == severity)
            .count()
    }

    /// Renders every diagnostic as a labeled snippet of the source.
    #[must_use]
    pub fn render(&self) -> String {
        let handler = GraphicalReportHandler::new();
        let mut buffer = String::new();
        for diagnostic in &self.diagnostics {
            let snippet = SourceSnippet {
                message: diagnostic.message.clone(),
                severity: diagnostic.severity,
                src: NamedSource::new(self.file_name.clone(), self.source.clone()),
                span: span_of(&self.source, diagnostic.range),
            };
            if handler.render_report(&mut buffer, &snippet).is_err() {
                buffer.push_str(&format!("{diagnostic}\n"));
            }
        }
        buffer
    }

    #[cfg(feature = "lsp")]
    /// Gets the description of the setting under the given position.
    ///
    /// # Errors
    /// Returns a `ChartsError` if the built-in registry can not be loaded.
    pub fn hover_at(&self, position: Position) -> Result<Option<Hover>, ChartsError> {
        Ok(lsp::hover(&self.source, position, Registry::builtin()?))
    }
}

/// One diagnostic bound to its source, in the form miette renders.
#[derive(Error, Debug)]
#[error("{message}")]
struct SourceSnippet {
    message: String,
    severity: Severity,
    src: NamedSource<String>,
    span: SourceSpan,
}

impl miette::Diagnostic for SourceSnippet {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(DIAGNOSTIC_SOURCE))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Information => miette::Severity::Advice,
        })
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.severity.to_string()),
            self.span,
        ))))
    }
}

/// Converts a line/character range into a byte span of `source`.
fn span_of(source: &str, range: Range) -> SourceSpan {
    let start = offset_of(source, range.start.line, range.start.character);
    let end = offset_of(source, range.end.line, range.end.character);
    (start, end.saturating_sub(start)).into()
}

fn offset_of(source: &str, line: u32, character: u32) -> usize {
    let mut offset = 0;
    for (index, text) in source.split('\n').enumerate() {
        if index == line as usize {
            return offset
                + text
                    .char_indices()
                    .nth(character as usize)
                    .map_or(text.len(), |(byte, _)| byte);
        }
        offset += text.len() + 1;
    }
    source.len()
}

/// Validates a configuration document against the built-in settings dictionary.
///
/// This is the primary entry point. Problems in the document are returned as
/// diagnostics inside the report; an `Err` means the engine itself failed.
///
/// # Arguments
///
/// * `source` - The configuration text.
/// * `file_name` - The name of the document, used when rendering diagnostics.
///
/// # Errors
///
/// Returns a `ChartsError` if the built-in registry can not be loaded or an
/// internal invariant of the engine is broken.
pub fn validate(source: &str, file_name: &str) -> Result<ValidationReport, ChartsError> {
    validate_with(source, file_name, Registry::builtin()?)
}

/// Validates a document against a caller-supplied registry.
///
/// # Errors
///
/// Returns a `ChartsError` if an internal invariant of the engine is broken.
pub fn validate_with(
    source: &str,
    file_name: &str,
    registry: &Registry,
) -> Result<ValidationReport, ChartsError> {
    let diagnostics = Validator::new(source, registry).line_by_line()?;
    Ok(ValidationReport {
        file_name: file_name.to_string(),
        source: normalize_line_endings(source),
        diagnostics,
    })
}

/// Computes the whitespace edits that re-indent `text`.
///
/// # Errors
///
/// Returns a `ChartsError` if the built-in registry can not be loaded.
pub fn format(text: &str, options: &FormattingOptions) -> Result<Vec<TextEdit>, ChartsError> {
    Ok(format_with(text, options, Registry::builtin()?))
}

#[must_use]
pub fn format_with(text: &str, options: &FormattingOptions, registry: &Registry) -> Vec<TextEdit> {
    Formatter::new(text, *options, registry).line_by_line()
}

/// Applies single-line edits, as produced by [`format`], to `text`.
/// Line endings of the result are `\n`.
#[must_use]
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut lines = split_lines(text);
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| {
        let start = |edit: &TextEdit| (edit.range.start.line, edit.range.start.character);
        start(b).cmp(&start(a))
    });
    for edit in ordered {
        let Some(line) = lines.get_mut(edit.range.start.line as usize) else {
            continue;
        };
        let byte = |character: u32| {
            line.char_indices()
                .nth(character as usize)
                .map_or(line.len(), |(byte, _)| byte)
        };
        let (start, end) = (byte(edit.range.start.character), byte(edit.range.end.character));
        line.replace_range(start..end, &edit.new_text);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_to_json() {
        let report = validate("[series]\n  entity = a", "test.config").unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["fileName"], "test.config");
        assert_eq!(json["diagnostics"][0]["message"], "metric is required");
        assert_eq!(json["diagnostics"][0]["severity"], "Error");
        assert_eq!(json["diagnostics"][0]["source"], "Axibase Charts");
        assert_eq!(json["diagnostics"][0]["range"]["start"]["character"], 1);
        assert!(json.get("source").is_none());
    }

    #[test]
    fn test_validate_to_yaml() {
        let report = validate("[widget]\n  type = chart", "ok.config").unwrap();
        assert_eq!(report.to_yaml().unwrap(), "fileName: ok.config\ndiagnostics: []\n");
        assert!(!report.has_errors());
    }

    #[test]
    fn test_render_names_the_file() {
        let report = validate("[widget]\n  type = chart\n  type = table", "dup.config").unwrap();
        assert_eq!(report.count(Severity::Error), 1);
        let rendered = report.render();
        assert!(rendered.contains("type is already defined"));
        assert!(rendered.contains("dup.config"));
    }

    #[test]
    fn test_span_of_counts_characters() {
        let source = "ä = 1\n  type = x";
        let span = span_of(source, Range::on_line(1, 2, 6));
        assert_eq!(span.offset(), 9);
        assert_eq!(span.len(), 4);
    }

    #[test]
    fn test_format_and_apply() {
        let text = "[widget]\ntype = chart  \n[series]\nentity = a";
        let edits = format(text, &FormattingOptions::default()).unwrap();
        assert_eq!(
            apply_edits(text, &edits),
            "[widget]\n  type = chart\n  [series]\n    entity = a"
        );
    }
}

use crate::setting::Setting;
use crate::text_range::Range;
use serde::Serialize;
use std::fmt;

/// Tag attached to every diagnostic produced by this crate.
pub const DIAGNOSTIC_SOURCE: &str = "Axibase Charts";

pub const DEPRECATED_TAG_SECTION: &str = "Replace [tag] sections with [tags].
Enclose the tag name in double quotes in case it contains special characters.

[tag]
  name = k
  value = v
[tag]
  name = my column
  value = my value

[tags]
  k = v
  \"my column\" = my value
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
        };
        f.write_str(name)
    }
}

/// A problem found in a document. Diagnostics are data, never failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    pub source: String,
}

impl Diagnostic {
    pub fn new(range: Range, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
            source: DIAGNOSTIC_SOURCE.to_string(),
        }
    }

    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Error, message)
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Warning, message)
    }

    pub fn information(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Information, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.range, self.message)
    }
}

pub fn unknown_token(found: &str) -> String {
    format!("{found} is unknown.")
}

pub fn already_defined(name: &str) -> String {
    format!("{name} is already defined")
}

pub fn settings_with_whitespaces(found: &str) -> String {
    let dashed = found.split_whitespace().collect::<Vec<_>>().join("-");
    format!("The setting {found} contains whitespaces. Replace them with the dash\n {dashed}.")
}

pub fn tag_name_with_whitespace(found: &str) -> String {
    format!("The tag name {found} contains whitespaces. Wrap it in double quotes.")
}

/// Finds the candidate closest to `found` by edit distance. Candidates
/// further than a third of the word's length are not considered.
pub fn closest_match<'a, I>(found: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let limit = found.chars().count() / 3;
    candidates
        .into_iter()
        .map(|candidate| (strsim::damerau_levenshtein(found, candidate), candidate))
        .filter(|(distance, _)| *distance <= limit)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// "x is unknown." with a "Did you mean y?" tail when `dictionary` has a close match.
pub fn suggestion_message<'a, I>(found: &str, dictionary: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    match closest_match(found, dictionary) {
        Some(suggestion) => format!("{} Did you mean {suggestion}?", unknown_token(found)),
        None => unknown_token(found),
    }
}

/// Diagnostic for a setting declared twice in one section. Settings that were
/// once allowed to repeat get a migration hint instead of an error.
pub fn repetition(range: Range, setting: &Setting, name: &str) -> Diagnostic {
    match setting.name.as_str() {
        "script" => Diagnostic::warning(
            range,
            "Multi-line scripts are deprecated.\n\
             Group multiple scripts into blocks:\nscript\nendscript",
        ),
        "thresholds" => Diagnostic::warning(
            range,
            "Replace multiple `thresholds` settings with one, for example:
thresholds = 0
thresholds = 60
thresholds = 80

thresholds = 0, 60, 80",
        ),
        "colors" => Diagnostic::warning(
            range,
            "Replace multiple `colors` settings with one, for example:
colors = red
colors = yellow
colors = green

colors = red, yellow, green",
        ),
        _ => Diagnostic::error(range, already_defined(name)),
    }
}

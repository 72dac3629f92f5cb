use crate::diagnostic::Diagnostic;
use crate::text_range::Range;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const BOOLEAN_KEYWORDS: [&str; 10] = [
    "false", "no", "null", "none", "0", "off", "true", "yes", "on", "1",
];

pub const INTERVAL_UNITS: [&str; 10] = [
    "nanosecond",
    "millisecond",
    "second",
    "minute",
    "hour",
    "day",
    "week",
    "month",
    "quarter",
    "year",
];

pub const CALENDAR_KEYWORDS: [&str; 38] = [
    "current_day",
    "current_hour",
    "current_minute",
    "current_month",
    "current_quarter",
    "current_week",
    "current_year",
    "first_day",
    "first_vacation_day",
    "first_working_day",
    "friday",
    "last_vacation_day",
    "last_working_day",
    "monday",
    "next_day",
    "next_hour",
    "next_minute",
    "next_month",
    "next_quarter",
    "next_vacation_day",
    "next_week",
    "next_working_day",
    "next_year",
    "now",
    "previous_day",
    "previous_hour",
    "previous_minute",
    "previous_month",
    "previous_quarter",
    "previous_vacation_day",
    "previous_week",
    "previous_working_day",
    "previous_year",
    "saturday",
    "sunday",
    "thursday",
    "tuesday",
    "wednesday",
];

static BOOLEAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i)^(?:{})$", BOOLEAN_KEYWORDS.join("|"))).expect("boolean regex")
});
static CALENDAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:{})(?:[ \t]*[-+][ \t]*(?:\d+|(?:\d+)?\.\d+)[ \t]*\*[ \t]*(?:{}))?$",
        CALENDAR_KEYWORDS.join("|"),
        INTERVAL_UNITS.join("|")
    ))
    .expect("calendar regex")
});
static INTEGER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+$").expect("integer regex"));
static INTERVAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:(?:[-+]?(?:(?:\d+|(?:\d+)?\.\d+)|@\{{.+\}})[ \t]*(?:{}))|all|auto|none)$",
        INTERVAL_UNITS.join("|")
    ))
    .expect("interval regex")
});
static LOCAL_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:19[7-9]|[2-9]\d\d)\d(?:-(?:0[1-9]|1[0-2])(?:-(?:0[1-9]|[12][0-9]|3[01])",
        r"(?: (?:[01]\d|2[0-4]):(?:[0-5][0-9])(?::(?:[0-5][0-9]))?(?:\.\d{1,9})?)?)?)?$",
    ))
    .expect("local date regex")
});
static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\-|\+)?(?:\.\d+|\d+(?:\.\d+)?)$").expect("number regex"));
static ZONED_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:19[7-9]|[2-9]\d\d)\d-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])",
        r"[tT](?:[01]\d|2[0-4]):(?:[0-5][0-9]):(?:[0-5][0-9])(?:\.\d{1,9})?",
        r"(?:[zZ]|[+-](?:[01]\d|2[0-4]):?(?:[0-5][0-9]))$",
    ))
    .expect("zoned date regex")
});
static CALCULATED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@$]\{.+\}").expect("calculated value regex"));
static SECONDS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("seconds regex"));
static NUM_PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\d\+").expect("numeric placeholder regex"));

/// True for values computed at render time (`@{...}`, `${...}`).
pub fn is_calculated(value: &str) -> bool {
    CALCULATED_REGEX.is_match(value)
}

pub fn is_date(value: &str) -> bool {
    CALENDAR_REGEX.is_match(value)
        || LOCAL_DATE_REGEX.is_match(value)
        || ZONED_DATE_REGEX.is_match(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingType {
    String,
    Number,
    Integer,
    Boolean,
    Enum,
    Interval,
    Date,
}

impl SettingType {
    pub fn parse(name: &str) -> Option<Self> {
        let setting_type = match name {
            "string" => SettingType::String,
            "number" => SettingType::Number,
            "integer" => SettingType::Integer,
            "boolean" => SettingType::Boolean,
            "enum" => SettingType::Enum,
            "interval" => SettingType::Interval,
            "date" => SettingType::Date,
            _ => return None,
        };
        Some(setting_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Number => "number",
            SettingType::Integer => "integer",
            SettingType::Boolean => "boolean",
            SettingType::Enum => "enum",
            SettingType::Interval => "interval",
            SettingType::Date => "date",
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of one configuration setting, e.g. `update-interval`.
#[derive(Debug, Clone)]
pub struct Setting {
    /// Lookup key: the display name lowercased with non-letters removed.
    pub name: String,
    pub display_name: String,
    pub setting_type: SettingType,
    pub example: String,
    pub description: String,
    pub default_value: Option<String>,
    /// Allowed values of an enum setting, lowercased. Entries are regex fragments.
    pub enum_values: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Display names of settings that must not appear in the same section.
    pub excludes: Vec<String>,
    /// Repeatable settings are exempt from the repetition check.
    pub multi_line: bool,
    pub section: Option<String>,
    enum_patterns: Vec<Regex>,
}

impl Setting {
    /// Lowercases the text and drops everything except latin letters.
    pub fn canonical_name(text: &str) -> String {
        text.chars()
            .map(|c| c.to_ascii_lowercase())
            .filter(char::is_ascii_lowercase)
            .collect()
    }

    pub fn new(
        display_name: impl Into<String>,
        setting_type: SettingType,
        example: impl Into<String>,
    ) -> Self {
        let display_name = display_name.into();
        Self {
            name: Self::canonical_name(&display_name),
            display_name,
            setting_type,
            example: example.into(),
            description: String::new(),
            default_value: None,
            enum_values: Vec::new(),
            min_value: None,
            max_value: None,
            excludes: Vec::new(),
            multi_line: false,
            section: None,
            enum_patterns: Vec::new(),
        }
    }

    /// Sets the allowed enum values, compiling each as a case-insensitive whole-value pattern.
    pub fn with_enum_values<I, S>(mut self, values: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.enum_values = values.into_iter().map(|v| v.as_ref().to_lowercase()).collect();
        self.enum_patterns = self
            .enum_values
            .iter()
            .map(|option| Regex::new(&format!("(?i)^(?:{option})$")))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn with_bounds(mut self, min_value: Option<f64>, max_value: Option<f64>) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn with_multi_line(mut self, multi_line: bool) -> Self {
        self.multi_line = multi_line;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default_value(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn with_section(mut self, section: Option<String>) -> Self {
        self.section = section;
        self
    }

    /// True when `other` (any spelling) is listed in this setting's exclusions.
    pub fn excludes(&self, other: &Setting) -> bool {
        self.excludes
            .iter()
            .any(|excluded| Self::canonical_name(excluded) == other.name)
    }

    /// Checks `value` against the declared type. `name` is the setting name as
    /// written by the user and `range` is where a problem is reported.
    /// `_widget` is the active widget type, reserved for widget-specific rules.
    pub fn check_type(
        &self,
        value: &str,
        range: Range,
        name: &str,
        _widget: Option<&str>,
    ) -> Option<Diagnostic> {
        if is_calculated(value) {
            return None;
        }
        match self.setting_type {
            SettingType::String => value
                .trim()
                .is_empty()
                .then(|| Diagnostic::error(range, format!("{name} can not be empty"))),
            SettingType::Number => {
                if !NUMBER_REGEX.is_match(value) {
                    return Some(Diagnostic::error(
                        range,
                        format!(
                            "{name} should be a real (floating-point) number. For example, {}",
                            self.example
                        ),
                    ));
                }
                self.check_bounds(value, range, name)
            }
            SettingType::Integer => {
                if !INTEGER_REGEX.is_match(value) {
                    return Some(Diagnostic::error(
                        range,
                        format!(
                            "{name} should be an integer number. For example, {}",
                            self.example
                        ),
                    ));
                }
                self.check_bounds(value, range, name)
            }
            SettingType::Boolean => (!BOOLEAN_REGEX.is_match(value)).then(|| {
                Diagnostic::error(
                    range,
                    format!("{name} should be a boolean value. For example, {}", self.example),
                )
            }),
            SettingType::Enum => {
                if self.enum_patterns.iter().any(|pattern| pattern.is_match(value)) {
                    return None;
                }
                let options = self.enum_values.join(";\n");
                let options = NUM_PLACEHOLDER_REGEX.replace_all(&options, "{num}");
                Some(Diagnostic::error(range, format!("{name} must be one of:\n{options}")))
            }
            SettingType::Interval => {
                if INTERVAL_REGEX.is_match(value) {
                    return None;
                }
                let hint = format!(
                    ".\nFor example, {}. Supported units:\n * {}",
                    self.example,
                    INTERVAL_UNITS.join("\n * ")
                );
                if self.name == "updateinterval" && SECONDS_REGEX.is_match(value) {
                    Some(Diagnostic::warning(
                        range,
                        format!(
                            "Specifying the interval in seconds is deprecated.\n\
                             Use `count unit` format{hint}"
                        ),
                    ))
                } else {
                    Some(Diagnostic::error(
                        range,
                        format!("{name} should be set as `count unit`{hint}"),
                    ))
                }
            }
            SettingType::Date => (!is_date(value)).then(|| {
                let message = format!("{name} should be a date. For example, {}", self.example);
                Diagnostic::error(range, message)
            }),
        }
    }

    fn check_bounds(&self, value: &str, range: Range, name: &str) -> Option<Diagnostic> {
        let number: f64 = value.parse().ok()?;
        if let Some(min) = self.min_value.filter(|min| number < *min) {
            return Some(Diagnostic::error(
                range,
                format!("{name} should be greater than or equal to {min}"),
            ));
        }
        if let Some(max) = self.max_value.filter(|max| number > *max) {
            return Some(Diagnostic::error(
                range,
                format!("{name} should be less than or equal to {max}"),
            ));
        }
        None
    }
}

impl PartialEq for Setting {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Setting {}

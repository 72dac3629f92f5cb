use crate::diagnostic::{self, Diagnostic};
use crate::error::EngineError;
use crate::registry::Registry;
use crate::setting::Setting;
use crate::text_range::{self, Keyword, KeywordMatch, Range, SectionHeader, TextRange};
use crate::utils::{
    char_column, char_len, count_csv_columns, delete_comments, is_blank, next_non_blank,
    normalize_line_endings, split_lines,
};
use log::{debug, trace};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static SETTING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([a-z].*?[a-z])\s*=\s*(.+?)\s*$").expect("setting regex"));
static FREEMARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#(?:list|assign)").expect("freemarker regex"));
static FREEMARKER_DECLARATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)<#(?:assign|list\s+(\w+)\s+as)\s+(\w+)")
        .expect("freemarker declaration regex")
});
static FREEMARKER_VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w[^}]*)\}").expect("freemarker value regex"));
static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word regex"));
static ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*alias\s*=\s*)(\S+)\s*$").expect("alias regex"));
static DE_ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"value\((?:'(\S+?)'|"(\S+?)")\)"#).expect("de-alias regex"));
static URL_PARAMETER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.+?)\}").expect("url parameter regex"));
static AT_EXPRESSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\{.+?\}").expect("@{} expression regex"));
static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z_]\w*").expect("identifier regex"));
static CSV_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*csv[ \t]+(\w+)[ \t]*=").expect("csv name regex"));
static CSV_HEADER_BELOW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=[ \t]*$").expect("csv header regex"));
static VAR_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvar\s+(\w+)\s*=").expect("var name regex"));
static LIST_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*list\s+(\w+)\s*=").expect("list name regex"));
static FOR_VARIABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*for\s+(\w+)\s+in\b").expect("for variable regex"));
static FOR_COLLECTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*for[ \t]+\w+[ \t]+in[ \t]+(?:object\.keys\((\w+)\)|(\w+))")
        .expect("for collection regex")
});
static SCRIPT_CONTENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*script\s*\S").expect("script content regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Scanning,
    Done,
}

/// Namespaces of names a document may declare and later reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Freemarker,
    ForVariables,
    ListNames,
    VarNames,
    CsvNames,
}

#[derive(Debug, Default)]
struct Variables {
    names: [Vec<String>; 5],
}

impl Variables {
    fn new() -> Self {
        let mut variables = Self::default();
        variables.names[VariableKind::Freemarker as usize] =
            ["entity", "entities", "type"].iter().map(|s| s.to_string()).collect();
        variables
    }

    fn get(&self, kind: VariableKind) -> &[String] {
        &self.names[kind as usize]
    }

    fn get_mut(&mut self, kind: VariableKind) -> &mut Vec<String> {
        &mut self.names[kind as usize]
    }

    fn contains(&self, name: &str) -> bool {
        self.names.iter().flatten().any(|known| known == name)
    }

    fn all(&self) -> impl Iterator<Item = &str> {
        self.names.iter().flatten().map(String::as_str)
    }
}

/// One `if`/`elseif`/`else` branch. Branches are told apart by their line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Branch {
    line: u32,
    keyword: Keyword,
}

impl From<&KeywordMatch> for Branch {
    fn from(found: &KeywordMatch) -> Self {
        Self {
            line: found.range.start.line,
            keyword: found.keyword,
        }
    }
}

#[derive(Debug, Default)]
struct SectionState<'r> {
    current: Option<TextRange>,
    settings: Vec<&'r Setting>,
    previous: Option<TextRange>,
    previous_settings: Vec<&'r Setting>,
    /// Settings of every section seen so far, by section name.
    parent_settings: HashMap<String, Vec<&'r Setting>>,
    /// Settings declared inside conditional branches of the current section.
    branches: Vec<(Branch, Vec<&'r Setting>)>,
    /// Slots added by the document itself, like `attribute` after `table`.
    extra_required: Vec<Vec<String>>,
    requirements_checked: bool,
}

impl SectionState<'_> {
    fn name(&self) -> Option<&str> {
        self.current.as_ref().map(|section| section.text.as_str())
    }
}

/// Single-pass diagnostic engine over one document.
///
/// A validator owns all per-document state and processes its document
/// exactly once; a second call to [`Validator::line_by_line`] fails.
#[derive(Debug)]
pub struct Validator<'r> {
    registry: &'r Registry,
    lines: Vec<String>,
    phase: Phase,
    line_number: u32,
    diagnostics: Vec<Diagnostic>,
    keywords: Vec<KeywordMatch>,
    section: SectionState<'r>,
    variables: Variables,
    aliases: Vec<String>,
    de_aliases: Vec<TextRange>,
    /// Canonical setting name to canonical value, for the current widget.
    setting_values: HashMap<String, String>,
    url_parameters: Vec<String>,
    csv_columns: usize,
    last_condition: Option<Branch>,
    current_widget: Option<String>,
    /// Loop collections unknown when their loop was opened.
    pending_collections: Vec<TextRange>,
    /// One entry per open `for`: whether it brought a loop variable into scope.
    loop_scopes: Vec<bool>,
}

impl<'r> Validator<'r> {
    pub fn new(text: &str, registry: &'r Registry) -> Self {
        let lines = split_lines(&delete_comments(&normalize_line_endings(text)))
            .into_iter()
            .map(|line| line.to_ascii_lowercase())
            .collect();
        Self {
            registry,
            lines,
            phase: Phase::NotStarted,
            line_number: 0,
            diagnostics: Vec::new(),
            keywords: Vec::new(),
            section: SectionState::default(),
            variables: Variables::new(),
            aliases: Vec::new(),
            de_aliases: Vec::new(),
            setting_values: HashMap::new(),
            url_parameters: Vec::new(),
            csv_columns: 0,
            last_condition: None,
            current_widget: None,
            pending_collections: Vec::new(),
            loop_scopes: Vec::new(),
        }
    }

    /// Walks the document once and returns every diagnostic in discovery order.
    ///
    /// # Errors
    /// Returns an `EngineError` if the validator was already used or an
    /// internal invariant is broken.
    pub fn line_by_line(&mut self) -> Result<Vec<Diagnostic>, EngineError> {
        if self.phase != Phase::NotStarted {
            return Err(EngineError::AlreadyProcessed);
        }
        self.phase = Phase::Scanning;
        debug!("Validating a document of {} lines", self.lines.len());

        for index in 0..self.lines.len() {
            self.line_number = index as u32;
            let line = self.lines[index].clone();
            let found = text_range::parse_keyword(&line, self.line_number);
            let keyword = found.as_ref().map(|found| found.keyword);

            if self.is_in_body_of(Keyword::Script, Keyword::EndScript, keyword) {
                continue;
            }
            if self.is_in_body_of(Keyword::Csv, Keyword::EndCsv, keyword) {
                self.validate_csv_row(&line);
                continue;
            }

            self.each_line(&line)?;

            if let Some(found) = found {
                trace!("Line {index}: keyword '{}'", found.keyword);
                if found.keyword.always_nests() {
                    self.keywords.push(found.clone());
                }
                self.switch_keyword(&found, &line, index)?;
            }
        }

        self.check_aliases();
        self.diagnostics_for_left_keywords();
        self.check_previous_section();
        self.check_pending_collections();

        self.phase = Phase::Done;
        debug!("Validation finished with {} diagnostics", self.diagnostics.len());
        Ok(std::mem::take(&mut self.diagnostics))
    }

    fn span(&self, line: &str, start: usize, end: usize) -> Range {
        Range::on_line(self.line_number, char_column(line, start), char_column(line, end))
    }

    fn is_in(&self, keyword: Keyword) -> bool {
        self.keywords.iter().any(|open| open.keyword == keyword)
    }

    /// Inside `block` on a line that is not its terminator.
    fn is_in_body_of(&self, block: Keyword, terminator: Keyword, found: Option<Keyword>) -> bool {
        self.is_in(block) && found != Some(terminator)
    }

    fn each_line(&mut self, line: &str) -> Result<(), EngineError> {
        self.check_freemarker(line);

        let header = text_range::parse_section_header(line, self.line_number);
        let leaves_tags = is_blank(line) && self.section.name() == Some("tags");
        if header.is_some() || leaves_tags {
            if let Some(header) = &header {
                self.spelling_check(header);
            }
            self.handle_section(header);
            return Ok(());
        }

        if let Some(captures) = SETTING_REGEX.captures(line) {
            self.handle_settings(line, &captures)?;
            if self.is_in(Keyword::For) {
                self.validate_for(line);
            }
        }
        if let Some(captures) = FREEMARKER_DECLARATION_REGEX.captures(line) {
            self.handle_freemarker(line, &captures);
        }
        if let Some(unclosed) = text_range::parse_unclosed_section(line, self.line_number) {
            self.diagnostics
                .push(Diagnostic::error(unclosed.range, "Section tag is unclosed"));
        }
        Ok(())
    }

    fn switch_keyword(
        &mut self,
        found: &KeywordMatch,
        line: &str,
        index: usize,
    ) -> Result<(), EngineError> {
        match found.keyword {
            Keyword::EndFor => {
                if self.loop_scopes.pop() == Some(true) {
                    self.variables.get_mut(VariableKind::ForVariables).pop();
                }
                self.check_end(found)?;
            }
            Keyword::EndIf
            | Keyword::EndVar
            | Keyword::EndCsv
            | Keyword::EndList
            | Keyword::EndScript => {
                self.check_end(found)?;
            }
            Keyword::Else | Keyword::ElseIf => self.handle_else(found),
            Keyword::Csv => self.handle_csv(line, index),
            Keyword::Var => self.handle_var(found, line),
            Keyword::List => self.handle_list(found, line, index),
            Keyword::For => {
                let scoped = self.handle_for(line);
                self.loop_scopes.push(scoped);
            }
            Keyword::If => self.last_condition = Some(Branch::from(found)),
            Keyword::Script => self.handle_script(found, line),
            Keyword::Import => {}
        }
        Ok(())
    }

    /// Pops the construct closed by `found`, reporting terminators that close
    /// nothing or close a construct out of order.
    fn check_end(&mut self, found: &KeywordMatch) -> Result<(), EngineError> {
        let expected = found.keyword.closes().ok_or_else(|| EngineError::UnhandledKeyword {
            keyword: found.keyword.to_string(),
        })?;
        let top = self.keywords.last().map(|open| open.keyword);
        if top == Some(expected) {
            self.keywords.pop();
            return Ok(());
        }
        let message = match self.keywords.iter().position(|open| open.keyword == expected) {
            Some(index) => {
                self.keywords.remove(index);
                let top = top.map(|keyword| keyword.as_str()).unwrap_or_default();
                format!("{expected} has finished before {top}")
            }
            None => format!("{} has no matching {expected}", found.keyword),
        };
        self.diagnostics.push(Diagnostic::error(found.range, message));
        Ok(())
    }

    fn handle_else(&mut self, found: &KeywordMatch) {
        self.last_condition = Some(Branch::from(found));
        let message = if !self.is_in(Keyword::If) {
            Some(format!("{} has no matching if", found.keyword))
        } else {
            match self.keywords.last() {
                Some(top) if top.keyword != Keyword::If => Some(format!(
                    "{} has started before {} has finished",
                    found.keyword, top.keyword
                )),
                _ => None,
            }
        };
        if let Some(message) = message {
            self.diagnostics.push(Diagnostic::error(found.range, message));
        }
    }

    fn handle_csv(&mut self, line: &str, index: usize) {
        let header = if CSV_HEADER_BELOW_REGEX.is_match(line) || !line.contains('=') {
            next_non_blank(&self.lines, index).map(|next| self.lines[next].clone())
        } else {
            line.split_once('=').map(|(_, rest)| rest.to_string())
        };
        if let Some(name) = CSV_NAME_REGEX.captures(line).and_then(|captures| captures.get(1)) {
            let range = self.span(line, name.start(), name.end());
            self.declare(VariableKind::CsvNames, name.as_str(), range);
        }
        self.csv_columns = header.as_deref().map_or(0, count_csv_columns);
    }

    fn validate_csv_row(&mut self, line: &str) {
        if is_blank(line) {
            return;
        }
        let columns = count_csv_columns(line);
        if columns != self.csv_columns {
            self.diagnostics.push(Diagnostic::error(
                Range::on_line(self.line_number, 0, char_len(line)),
                format!("Expected {} columns, but found {columns}", self.csv_columns),
            ));
        }
    }

    fn handle_var(&mut self, found: &KeywordMatch, line: &str) {
        if text_range::var_needs_end(line) {
            self.keywords.push(found.clone());
        }
        if let Some(name) = VAR_NAME_REGEX.captures(line).and_then(|captures| captures.get(1)) {
            let range = self.span(line, name.start(), name.end());
            self.declare(VariableKind::VarNames, name.as_str(), range);
        }
    }

    fn handle_list(&mut self, found: &KeywordMatch, line: &str, index: usize) {
        if let Some(name) = LIST_NAME_REGEX.captures(line).and_then(|captures| captures.get(1)) {
            let range = self.span(line, name.start(), name.end());
            self.declare(VariableKind::ListNames, name.as_str(), range);
        }
        if text_range::list_needs_end(&self.lines, index) {
            self.keywords.push(found.clone());
        }
    }

    /// `for item in collection`: the collection may be declared later in the
    /// document, so unknown names are checked again at the end.
    /// Returns whether the loop variable entered scope.
    fn handle_for(&mut self, line: &str) -> bool {
        let Some(captures) = FOR_VARIABLE_REGEX.captures(line) else {
            return false;
        };
        let (Some(whole), Some(variable)) = (captures.get(0), captures.get(1)) else {
            return false;
        };
        match FOR_COLLECTION_REGEX.captures(line) {
            Some(collection) => {
                if let Some(collection) = collection.get(1).or_else(|| collection.get(2)) {
                    if !self.variables.contains(collection.as_str()) {
                        trace!("Loop collection '{}' is not declared yet", collection.as_str());
                        let range = self.span(line, collection.start(), collection.end());
                        self.pending_collections
                            .push(TextRange::new(collection.as_str(), range));
                    }
                }
            }
            None => {
                let range = self.span(line, whole.end() - "in".len(), whole.end());
                self.diagnostics
                    .push(Diagnostic::error(range, "Empty 'in' statement"));
            }
        }
        let range = self.span(line, variable.start(), variable.end());
        self.declare(VariableKind::ForVariables, variable.as_str(), range)
    }

    fn handle_script(&mut self, found: &KeywordMatch, line: &str) {
        if text_range::is_one_line_script(line) {
            return;
        }
        self.keywords.push(found.clone());
        if SCRIPT_CONTENT_REGEX.is_match(line) {
            self.diagnostics.push(Diagnostic::error(
                found.range,
                "A linefeed character after 'script' keyword is required",
            ));
        }
    }

    fn handle_freemarker(&mut self, line: &str, captures: &Captures) {
        if let Some(collection) = captures.get(2) {
            let known = self.variables.get(VariableKind::Freemarker);
            if !known.iter().any(|name| name == collection.as_str()) {
                let message = diagnostic::suggestion_message(
                    collection.as_str(),
                    known.iter().map(String::as_str),
                );
                let range = self.span(line, collection.start(), collection.end());
                self.diagnostics.push(Diagnostic::error(range, message));
            }
        }
        if let Some(name) = captures.get(3) {
            let range = self.span(line, name.start(), name.end());
            self.declare(VariableKind::Freemarker, name.as_str(), range);
        }
    }

    /// Records a declared name. Redeclaring a name is an error, except for
    /// template variables, which may be assigned repeatedly.
    /// Returns whether the name was recorded.
    fn declare(&mut self, kind: VariableKind, name: &str, range: Range) -> bool {
        if kind != VariableKind::Freemarker && self.variables.contains(name) {
            self.diagnostics
                .push(Diagnostic::error(range, diagnostic::already_defined(name)));
            return false;
        }
        self.variables.get_mut(kind).push(name.to_string());
        true
    }

    fn check_freemarker(&mut self, line: &str) {
        if let Some(found) = FREEMARKER_REGEX.find(line) {
            let range = self.span(line, found.start(), found.end());
            self.diagnostics.push(Diagnostic::information(
                range,
                "Freemarker expressions are deprecated. \
                 Use a native collection: list, csv table, var object.",
            ));
        }
    }

    fn spelling_check(&mut self, header: &SectionHeader) {
        let registry = self.registry;
        if !registry.is_known_section(&header.name) {
            self.diagnostics.push(Diagnostic::error(
                header.range,
                diagnostic::suggestion_message(&header.name, registry.sections()),
            ));
        }
    }

    /// Closes the current section and, for a header, opens the next one.
    /// `None` means a blank line ended a `[tags]` block.
    fn handle_section(&mut self, header: Option<SectionHeader>) {
        self.check_previous_section();
        self.add_current_to_parent_settings();

        let Some(header) = header else {
            if let Some(previous) = self.section.previous.clone() {
                trace!("Blank line closes [tags], back to [{}]", previous.text);
                self.section.current = Some(previous);
                self.section.settings = self.section.previous_settings.clone();
                self.section.requirements_checked = true;
            }
            return;
        };

        if header.name.contains("widget") {
            self.check_aliases();
            self.de_aliases.clear();
            self.aliases.clear();
            self.setting_values.clear();
        }
        if header.name == "tag" {
            self.diagnostics
                .push(Diagnostic::warning(header.range, diagnostic::DEPRECATED_TAG_SECTION));
        }
        trace!("Line {}: entering [{}]", self.line_number, header.name);

        let registry = self.registry;
        let section = &mut self.section;
        section.previous_settings = std::mem::take(&mut section.settings);
        section.previous = section.current.take();
        section.branches.clear();
        section.requirements_checked = false;
        // A reopened section ends its own scope and the scopes nested in it.
        section.parent_settings.retain(|name, _| {
            name != &header.name && !registry.ancestor_sections_of(name).contains(&header.name)
        });
        section.current = Some(header.to_text_range());
    }

    fn add_current_to_parent_settings(&mut self) {
        let section = &mut self.section;
        let Some(current) = section.current.as_ref() else {
            return;
        };
        let inherited = section.parent_settings.entry(current.text.clone()).or_default();
        for setting in &section.settings {
            if !inherited.contains(setting) {
                inherited.push(*setting);
            }
        }
    }

    /// Reports every requirement slot of the current section that nothing satisfies.
    fn check_previous_section(&mut self) {
        let extra_required = std::mem::take(&mut self.section.extra_required);
        if self.section.requirements_checked {
            return;
        }
        self.section.requirements_checked = true;
        let Some(current) = self.section.current.clone() else {
            return;
        };
        let registry = self.registry;
        let ancestors = registry.ancestor_sections_of(&current.text);
        let slots = registry
            .required_settings_for(&current.text)
            .iter()
            .chain(extra_required.iter());
        let mut missing = Vec::new();
        for slot in slots {
            if self.is_requirement_satisfied(slot, &ancestors) {
                continue;
            }
            if let Some(first) = slot.first() {
                let name = registry
                    .lookup(first)
                    .map_or(first.as_str(), |setting| setting.display_name.as_str());
                missing.push(format!("{name} is required"));
            }
        }
        for message in missing {
            self.diagnostics.push(Diagnostic::error(current.range, message));
        }
    }

    /// A slot is satisfied by the section itself, by any ancestor section, or
    /// by every branch of an exhaustive conditional (as many `if` as `else`).
    fn is_requirement_satisfied(&self, slot: &[String], ancestors: &[String]) -> bool {
        let declares =
            |settings: &[&Setting]| settings.iter().any(|setting| slot.contains(&setting.name));

        if slot.first().is_some_and(|first| first == "metric")
            && self.setting_values.get("columnmetric").is_some_and(|v| v == "null")
            && self.setting_values.get("columnvalue").is_some_and(|v| v == "null")
        {
            return true;
        }
        if declares(&self.section.settings) {
            return true;
        }
        if ancestors.iter().any(|ancestor| {
            self.section
                .parent_settings
                .get(ancestor)
                .is_some_and(|settings| declares(settings))
        }) {
            return true;
        }
        let branches = &self.section.branches;
        if branches.is_empty() || !branches.iter().all(|(_, settings)| declares(settings)) {
            return false;
        }
        let count = |keyword: Keyword| {
            branches.iter().filter(|(branch, _)| branch.keyword == keyword).count()
        };
        count(Keyword::If) == count(Keyword::Else)
    }

    fn in_tags_section(&self) -> bool {
        self.section
            .name()
            .is_some_and(|name| name.contains("tag") || name.contains("key"))
    }

    fn handle_settings(&mut self, line: &str, captures: &Captures) -> Result<(), EngineError> {
        let (Some(name), Some(value)) = (captures.get(2), captures.get(3)) else {
            return Ok(());
        };
        let name_range = self.span(line, name.start(), name.end());
        let (name, value_start, value) = (name.as_str(), value.start(), value.as_str());

        if self.in_tags_section() {
            self.handle_tag(name, name_range);
            return Ok(());
        }

        self.setting_values
            .insert(Setting::canonical_name(name), Setting::canonical_name(value));
        let Some(setting) = self.setting_check(name, name_range) else {
            return Ok(());
        };
        if name.split_whitespace().nth(1).is_some() {
            self.diagnostics.push(Diagnostic::warning(
                name_range,
                diagnostic::settings_with_whitespaces(name),
            ));
        }

        match setting.name.as_str() {
            "table" => self.require("attribute"),
            "attribute" => self.require("table"),
            "type" => self.current_widget = Some(value.to_string()),
            _ => {}
        }

        if !setting.multi_line {
            self.check_repetition(setting, name, name_range)?;
        }
        // A one-line script may be left empty.
        let widget = self.current_widget.as_deref();
        if setting.name != "script" {
            if let Some(problem) = setting.check_type(value, name_range, name, widget) {
                self.diagnostics.push(problem);
            }
        }
        self.check_excludes(setting, name_range);

        if setting.name == "urlparameters" {
            self.find_url_parameters(value);
        } else {
            self.check_freemarker_value(line, value_start, value);
        }
        if setting.name == "alias" {
            self.declare_alias(line);
        }
        self.find_de_aliases(line);
        Ok(())
    }

    fn handle_tag(&mut self, name: &str, range: Range) {
        if self.registry.lookup(name).is_some() {
            self.diagnostics.push(Diagnostic::information(
                range,
                format!(
                    "{name} is interpreted as a series tag and is sent to the server. \
                     Remove the setting from the [tags] section or enclose it double-quotes \
                     to suppress the warning."
                ),
            ));
        }
        if name.split_whitespace().nth(1).is_some() {
            self.diagnostics
                .push(Diagnostic::warning(range, diagnostic::tag_name_with_whitespace(name)));
        }
    }

    fn require(&mut self, name: &str) {
        if let Some(setting) = self.registry.lookup(name) {
            let slot = vec![setting.name.clone()];
            if !self.section.extra_required.contains(&slot) {
                self.section.extra_required.push(slot);
            }
        }
    }

    /// Resolves a setting name, reporting unknown names with a suggestion.
    fn setting_check(&mut self, name: &str, range: Range) -> Option<&'r Setting> {
        let registry = self.registry;
        if let Some(setting) = registry.lookup(name) {
            return Some(setting);
        }
        if text_range::starts_with_keyword(name) || name.starts_with("column") {
            return None;
        }
        let mut dictionary: Vec<&str> = Vec::new();
        if self.section.name() == Some("placeholders") {
            if self.url_parameters.contains(&Setting::canonical_name(name)) {
                return None;
            }
            dictionary.extend(self.url_parameters.iter().map(String::as_str));
        }
        dictionary.extend(registry.display_names());
        dictionary.extend(self.variables.all().filter(|known| *known != name));
        let message = diagnostic::suggestion_message(name, dictionary);
        self.diagnostics.push(Diagnostic::error(range, message));
        None
    }

    /// Inside a conditional the setting is recorded for the active branch;
    /// redeclaring something already fixed outside the conditional is reported.
    fn check_repetition(
        &mut self,
        setting: &'r Setting,
        name: &str,
        range: Range,
    ) -> Result<(), EngineError> {
        if !self.is_in(Keyword::If) {
            if self.section.settings.contains(&setting) {
                self.diagnostics.push(diagnostic::repetition(range, setting, name));
            } else {
                self.section.settings.push(setting);
            }
            return Ok(());
        }

        let branch = self.last_condition.clone().ok_or(EngineError::MissingCondition {
            line: self.line_number,
        })?;
        let branches = &mut self.section.branches;
        let index = match branches.iter().position(|(known, _)| *known == branch) {
            Some(index) => index,
            None => {
                branches.push((branch, Vec::new()));
                branches.len() - 1
            }
        };
        let declared = &mut branches[index].1;
        let repeated_in_branch = declared.contains(&setting);
        if !repeated_in_branch {
            declared.push(setting);
        }
        if repeated_in_branch || self.section.settings.contains(&setting) {
            self.diagnostics.push(diagnostic::repetition(range, setting, name));
        }
        Ok(())
    }

    fn check_excludes(&mut self, setting: &Setting, range: Range) {
        let conflicts: Vec<String> = self
            .section
            .settings
            .iter()
            .filter(|declared| setting.excludes(declared))
            .map(|declared| {
                format!(
                    "{} can not be specified simultaneously with {}",
                    setting.display_name, declared.display_name
                )
            })
            .collect();
        for message in conflicts {
            self.diagnostics.push(Diagnostic::error(range, message));
        }
    }

    fn find_url_parameters(&mut self, value: &str) {
        self.url_parameters = URL_PARAMETER_REGEX
            .captures_iter(value)
            .filter_map(|captures| captures.get(1))
            .map(|parameter| Setting::canonical_name(parameter.as_str()))
            .collect();
    }

    /// Every word inside `${...}` must be a declared template variable;
    /// words with digits are treated as arithmetic.
    fn check_freemarker_value(&mut self, line: &str, value_start: usize, value: &str) {
        let mut problems = Vec::new();
        let known = self.variables.get(VariableKind::Freemarker);
        for expression in FREEMARKER_VALUE_REGEX.captures_iter(value) {
            let Some(body) = expression.get(1) else {
                continue;
            };
            for word in WORD_REGEX.find_iter(body.as_str()) {
                let text = word.as_str();
                if text.chars().any(|c| c.is_ascii_digit())
                    || known.iter().any(|name| name == text)
                {
                    continue;
                }
                let start = value_start + body.start() + word.start();
                let message =
                    diagnostic::suggestion_message(text, known.iter().map(String::as_str));
                problems.push((self.span(line, start, start + text.len()), message));
            }
        }
        for (range, message) in problems {
            self.diagnostics.push(Diagnostic::error(range, message));
        }
    }

    fn declare_alias(&mut self, line: &str) {
        let Some(alias) = ALIAS_REGEX.captures(line).and_then(|captures| captures.get(2)) else {
            return;
        };
        if self.aliases.iter().any(|known| known == alias.as_str()) {
            let range = self.span(line, alias.start(), alias.end());
            self.diagnostics
                .push(Diagnostic::error(range, diagnostic::already_defined(alias.as_str())));
        } else {
            self.aliases.push(alias.as_str().to_string());
        }
    }

    fn find_de_aliases(&mut self, line: &str) {
        for captures in DE_ALIAS_REGEX.captures_iter(line) {
            if let Some(alias) = captures.get(1).or_else(|| captures.get(2)) {
                let range = self.span(line, alias.start(), alias.end());
                self.de_aliases.push(TextRange::new(alias.as_str(), range));
            }
        }
    }

    fn check_aliases(&mut self) {
        let unresolved: Vec<Diagnostic> = self
            .de_aliases
            .iter()
            .filter(|de_alias| !self.aliases.contains(&de_alias.text))
            .map(|de_alias| {
                let aliases = self.aliases.iter().map(String::as_str);
                Diagnostic::error(
                    de_alias.range,
                    diagnostic::suggestion_message(&de_alias.text, aliases),
                )
            })
            .collect();
        self.diagnostics.extend(unresolved);
    }

    /// Checks identifiers inside `@{...}` against every declared name.
    /// Property access (`.name`), calls (`name(`) and quoted text are skipped.
    fn validate_for(&mut self, line: &str) {
        let mut problems = Vec::new();
        for expression in AT_EXPRESSION_REGEX.find_iter(line) {
            let text = expression.as_str();
            for identifier in IDENTIFIER_REGEX.find_iter(text) {
                let before = text[..identifier.start()].chars().next_back();
                let after = text[identifier.end()..].chars().next();
                if before == Some('.') || matches!(after, Some('"' | '(' | '\'')) {
                    continue;
                }
                if self.variables.contains(identifier.as_str()) {
                    continue;
                }
                let start = expression.start() + identifier.start();
                let message =
                    diagnostic::suggestion_message(identifier.as_str(), self.variables.all());
                problems.push((self.span(line, start, identifier.len() + start), message));
            }
        }
        for (range, message) in problems {
            self.diagnostics.push(Diagnostic::error(range, message));
        }
    }

    fn diagnostics_for_left_keywords(&mut self) {
        let unclosed: Vec<Diagnostic> = self
            .keywords
            .iter()
            .map(|open| {
                Diagnostic::error(
                    open.range,
                    format!("{} has no matching end{}", open.keyword, open.keyword),
                )
            })
            .collect();
        self.diagnostics.extend(unclosed);
    }

    fn check_pending_collections(&mut self) {
        let unresolved: Vec<Diagnostic> = self
            .pending_collections
            .iter()
            .filter(|collection| !self.variables.contains(&collection.text))
            .map(|collection| {
                Diagnostic::error(
                    collection.range,
                    diagnostic::suggestion_message(&collection.text, self.variables.all()),
                )
            })
            .collect();
        self.diagnostics.extend(unresolved);
    }
}

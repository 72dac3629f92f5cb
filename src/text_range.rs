use crate::utils::{char_column, next_non_blank};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static KEYWORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^([ \t]*)(import|endvar|endcsv|endfor|elseif|endif|endscript|endlist",
        r"|script|else|if|list|for|csv|var)\b",
    ))
    .expect("keyword regex")
});
static CLOSING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*(?:end(?:for|if|list|var|script|csv)|elseif|else)\b")
        .expect("closing regex")
});
static INDENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*(?:for|if|else|elseif|script|csv|var|list)\b").expect("indent regex")
});
static SECTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\t ]*\[)(\w+)\][\t ]*").expect("section regex"));
static UNCLOSED_SECTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*\[)(\w+)\s*$").expect("unclosed section regex"));
static SCRIPT_ONE_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*script\s*=").expect("one-line script regex"));
static VAR_OPENS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*(?:\[|\{)(?:|.*,)\s*$").expect("var block regex"));
static LIST_OPENS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:=|,)[ \t]*$").expect("list block regex"));
static LIST_CONTINUES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[ \t]*,|\bendlist\b").expect("list continuation regex"));

/// A zero-based line/character position inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open span of characters, possibly covering several lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Shorthand for a span that starts and ends on the same line.
    pub fn on_line(line: u32, start: u32, end: u32) -> Self {
        Self::new(Position::new(line, start), Position::new(line, end))
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position < self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.character, self.end.line, self.end.character
        )
    }
}

/// Recognized text (a keyword, a section name, an alias) and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRange {
    pub text: String,
    pub range: Range,
}

impl TextRange {
    pub fn new(text: impl Into<String>, range: Range) -> Self {
        Self {
            text: text.into(),
            range,
        }
    }
}

/// Reserved control words of the configuration language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Import,
    If,
    ElseIf,
    Else,
    EndIf,
    For,
    EndFor,
    List,
    EndList,
    Var,
    EndVar,
    Csv,
    EndCsv,
    Script,
    EndScript,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        let keyword = match word.to_ascii_lowercase().as_str() {
            "import" => Keyword::Import,
            "if" => Keyword::If,
            "elseif" => Keyword::ElseIf,
            "else" => Keyword::Else,
            "endif" => Keyword::EndIf,
            "for" => Keyword::For,
            "endfor" => Keyword::EndFor,
            "list" => Keyword::List,
            "endlist" => Keyword::EndList,
            "var" => Keyword::Var,
            "endvar" => Keyword::EndVar,
            "csv" => Keyword::Csv,
            "endcsv" => Keyword::EndCsv,
            "script" => Keyword::Script,
            "endscript" => Keyword::EndScript,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Import => "import",
            Keyword::If => "if",
            Keyword::ElseIf => "elseif",
            Keyword::Else => "else",
            Keyword::EndIf => "endif",
            Keyword::For => "for",
            Keyword::EndFor => "endfor",
            Keyword::List => "list",
            Keyword::EndList => "endlist",
            Keyword::Var => "var",
            Keyword::EndVar => "endvar",
            Keyword::Csv => "csv",
            Keyword::EndCsv => "endcsv",
            Keyword::Script => "script",
            Keyword::EndScript => "endscript",
        }
    }

    /// For a terminator, the construct it closes (`endfor` -> `for`).
    pub fn closes(&self) -> Option<Keyword> {
        match self {
            Keyword::EndIf => Some(Keyword::If),
            Keyword::EndFor => Some(Keyword::For),
            Keyword::EndList => Some(Keyword::List),
            Keyword::EndVar => Some(Keyword::Var),
            Keyword::EndCsv => Some(Keyword::Csv),
            Keyword::EndScript => Some(Keyword::Script),
            _ => None,
        }
    }

    /// Keywords pushed onto the block stack as soon as they are seen.
    /// `list`, `var` and `script` are pushed only when they span several lines.
    pub fn always_nests(&self) -> bool {
        matches!(self, Keyword::If | Keyword::For | Keyword::Csv)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyword found at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub keyword: Keyword,
    pub range: Range,
}

/// Parses a keyword at the start of the line with the index `line_number`.
pub fn parse_keyword(line: &str, line_number: u32) -> Option<KeywordMatch> {
    let captures = KEYWORD_REGEX.captures(line)?;
    let indent = captures.get(1)?;
    let word = captures.get(2)?;
    let keyword = Keyword::from_word(word.as_str())?;
    let start = char_column(line, indent.end());
    Some(KeywordMatch {
        keyword,
        range: Range::on_line(line_number, start, start + word.as_str().chars().count() as u32),
    })
}

/// True when the text begins with a reserved word, e.g. `list servers`.
pub fn starts_with_keyword(text: &str) -> bool {
    KEYWORD_REGEX.is_match(text)
}

/// The line closes a construct: `endX`, `else`, `elseif`.
pub fn is_closing(line: &str) -> bool {
    CLOSING_REGEX.is_match(line)
}

/// The line opens a construct that may be closed:
/// `for`, `if`, `list`, `var`, `script`, `csv`, `else`, `elseif`.
pub fn increases_indent(line: &str) -> bool {
    INDENT_REGEX.is_match(line)
}

/// `script = ...` is complete on its own line.
pub fn is_one_line_script(line: &str) -> bool {
    SCRIPT_ONE_LINE_REGEX.is_match(line)
}

/// `var name = [` or `var name = {a: 1,` continue on the following lines.
pub fn var_needs_end(line: &str) -> bool {
    VAR_OPENS_REGEX.is_match(line)
}

/// A list is multi-line when its line ends with `=` or `,`, or when the next
/// non-blank line continues it with a leading comma or closes it with `endlist`.
pub fn list_needs_end(lines: &[String], index: usize) -> bool {
    let line = match lines.get(index) {
        Some(line) => line,
        None => return false,
    };
    if LIST_OPENS_REGEX.is_match(line) {
        return true;
    }
    next_non_blank(lines, index).is_some_and(|next| LIST_CONTINUES_REGEX.is_match(&lines[next]))
}

/// Decides whether the construct opened on `lines[index]` expects a terminator.
pub fn needs_terminator(lines: &[String], index: usize) -> bool {
    let line = match lines.get(index) {
        Some(line) => line,
        None => return false,
    };
    match parse_keyword(line, index as u32).map(|found| found.keyword) {
        Some(Keyword::Var) => var_needs_end(line),
        Some(Keyword::List) => list_needs_end(lines, index),
        Some(Keyword::Script) => !is_one_line_script(line),
        Some(Keyword::For | Keyword::If | Keyword::Else | Keyword::ElseIf | Keyword::Csv) => true,
        _ => false,
    }
}

/// A `[name]` section declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: String,
    pub range: Range,
}

impl SectionHeader {
    pub fn to_text_range(&self) -> TextRange {
        TextRange::new(self.name.clone(), self.range)
    }
}

pub fn parse_section_header(line: &str, line_number: u32) -> Option<SectionHeader> {
    let captures = SECTION_REGEX.captures(line)?;
    let prefix = captures.get(1)?;
    let name = captures.get(2)?;
    let start = char_column(line, prefix.end());
    Some(SectionHeader {
        name: name.as_str().to_string(),
        range: Range::on_line(line_number, start, start + name.as_str().chars().count() as u32),
    })
}

/// `[name` without the closing bracket.
pub fn parse_unclosed_section(line: &str, line_number: u32) -> Option<TextRange> {
    let captures = UNCLOSED_SECTION_REGEX.captures(line)?;
    let prefix = captures.get(1)?;
    let name = captures.get(2)?;
    let start = char_column(line, prefix.end());
    Some(TextRange::new(
        name.as_str(),
        Range::on_line(line_number, start, start + name.as_str().chars().count() as u32),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_parse_keyword_with_indent() {
        let found = parse_keyword("\t  endfor", 3).unwrap();
        assert_eq!(found.keyword, Keyword::EndFor);
        assert_eq!(found.range, Range::on_line(3, 3, 9));
        assert_eq!(found.keyword.closes(), Some(Keyword::For));
    }

    #[test]
    fn test_parse_keyword_requires_word_boundary() {
        assert!(parse_keyword("format = x", 0).is_none());
        assert!(parse_keyword("iffy = 1", 0).is_none());
        assert_eq!(parse_keyword("IF a == b", 0).unwrap().keyword, Keyword::If);
        assert_eq!(parse_keyword("elseif a", 0).unwrap().keyword, Keyword::ElseIf);
    }

    #[test]
    fn test_closing_and_closeable() {
        assert!(is_closing("  endif"));
        assert!(is_closing("else"));
        assert!(!is_closing("endpoint = 1"));
        assert!(increases_indent("for x in y"));
        assert!(increases_indent("csv t ="));
        assert!(increases_indent("elseif x"));
        assert!(!increases_indent("import a"));
    }

    #[test]
    fn test_list_terminator_heuristics() {
        assert!(!needs_terminator(&lines("list a = 1, 2"), 0));
        assert!(needs_terminator(&lines("list a = 1,\n 2\nendlist"), 0));
        assert!(needs_terminator(&lines("list a = 1\n\n  , 2\nendlist"), 0));
        assert!(needs_terminator(&lines("list a = 1\nendlist"), 0));
        assert!(!needs_terminator(&lines("list a = 1\n[widget]"), 0));
    }

    #[test]
    fn test_var_and_script_terminators() {
        assert!(needs_terminator(&lines("var a = ["), 0));
        assert!(needs_terminator(&lines("var a = {"), 0));
        assert!(needs_terminator(&lines("var a = ['x',"), 0));
        assert!(!needs_terminator(&lines("var a = ['x']"), 0));
        assert!(!needs_terminator(&lines("script = a()"), 0));
        assert!(needs_terminator(&lines("script"), 0));
        assert!(needs_terminator(&lines("csv a = x, y"), 0));
        assert!(!needs_terminator(&lines("import a = b"), 0));
    }

    #[test]
    fn test_section_headers() {
        let header = parse_section_header(" [widget] ", 2).unwrap();
        assert_eq!(header.name, "widget");
        assert_eq!(header.range, Range::on_line(2, 2, 8));
        assert!(parse_section_header("[series", 0).is_none());
        let unclosed = parse_unclosed_section("[series", 0).unwrap();
        assert_eq!(unclosed.text, "series");
        assert_eq!(unclosed.range, Range::on_line(0, 1, 7));
    }
}

use crate::registry::Registry;
use crate::resources::SAME_LEVEL_SECTIONS;
use crate::text_range::{self, Keyword, Range};
use crate::utils::{
    char_column, char_len, delete_comments, is_blank, normalize_line_endings, split_lines,
};
use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TRAILING_WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+$").expect("trailing whitespace regex"));

/// Indentation style, in the shape editors send it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingOptions {
    pub tab_size: u32,
    pub insert_spaces: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            tab_size: 2,
            insert_spaces: true,
        }
    }
}

impl FormattingOptions {
    pub fn new(tab_size: u32, insert_spaces: bool) -> Self {
        Self {
            tab_size,
            insert_spaces,
        }
    }

    /// One indentation level.
    pub fn step(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size as usize)
        } else {
            "\t".to_string()
        }
    }
}

/// Replacement of a whitespace span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

#[derive(Debug)]
struct OpenSection {
    name: String,
    indent: String,
}

/// A keyword construct waiting for its terminator.
#[derive(Debug)]
struct Block {
    /// Indent of the opening line, restored by the terminator.
    indent: String,
    /// Indent of the first line inside the block.
    content: String,
    /// Number of open sections when the block started.
    depth: usize,
    /// Script bodies are left as written.
    script: bool,
}

/// Computes whitespace edits that re-indent a document by section nesting
/// and keyword blocks. Only leading and trailing whitespace is ever touched.
#[derive(Debug)]
pub struct Formatter<'r> {
    registry: &'r Registry,
    lines: Vec<String>,
    /// Comment-free lowercase copy of `lines`, used to recognize structure.
    analysed: Vec<String>,
    options: FormattingOptions,
    indent: String,
    sections: Vec<OpenSection>,
    blocks: Vec<Block>,
    edits: Vec<TextEdit>,
}

impl<'r> Formatter<'r> {
    pub fn new(text: &str, options: FormattingOptions, registry: &'r Registry) -> Self {
        let text = normalize_line_endings(text);
        let analysed = split_lines(&delete_comments(&text))
            .into_iter()
            .map(|line| line.to_ascii_lowercase())
            .collect();
        Self {
            registry,
            lines: split_lines(&text),
            analysed,
            options,
            indent: String::new(),
            sections: Vec::new(),
            blocks: Vec::new(),
            edits: Vec::new(),
        }
    }

    pub fn line_by_line(mut self) -> Vec<TextEdit> {
        debug!("Formatting a document of {} lines", self.lines.len());
        for index in 0..self.lines.len() {
            let line = self.lines[index].clone();
            let line_number = index as u32;
            self.strip_trailing_whitespace(line_number, &line);

            let analysed = self.analysed.get(index).cloned().unwrap_or_default();
            let keyword =
                text_range::parse_keyword(&analysed, line_number).map(|found| found.keyword);
            let in_script = self.blocks.last().is_some_and(|block| block.script);
            if in_script && keyword != Some(Keyword::EndScript) {
                continue;
            }
            if let Some(header) = text_range::parse_section_header(&analysed, line_number) {
                let indent = self.header_indent(&header.name);
                trace!("Line {index}: [{}] at indent {}", header.name, indent.len());
                self.check_indent(line_number, &line, &indent);
                self.indent = format!("{indent}{}", self.options.step());
                self.sections.push(OpenSection {
                    name: header.name,
                    indent,
                });
                continue;
            }
            if is_blank(&line) {
                continue;
            }
            if text_range::is_closing(&analysed) {
                if let Some(block) = self.blocks.pop() {
                    self.indent = block.indent;
                    self.sections.truncate(block.depth);
                }
            }
            let expected = self.indent.clone();
            self.check_indent(line_number, &line, &expected);
            if text_range::increases_indent(&analysed)
                && text_range::needs_terminator(&self.analysed, index)
            {
                let content = format!("{}{}", self.indent, self.options.step());
                self.blocks.push(Block {
                    indent: std::mem::replace(&mut self.indent, content.clone()),
                    content,
                    depth: self.sections.len(),
                    script: keyword == Some(Keyword::Script),
                });
            }
        }
        debug!("Formatting produced {} edits", self.edits.len());
        self.edits
    }

    /// Indent of a section header. `[configuration]` and `[group]` start at
    /// the margin; other sections go one level below their nearest open
    /// ancestor, or share the level of a section they replace.
    fn header_indent(&mut self, name: &str) -> String {
        if name == "group" || name == "configuration" {
            self.sections.clear();
            return String::new();
        }
        let (floor, base) = self
            .blocks
            .last()
            .map_or((0, String::new()), |block| (block.depth, block.content.clone()));
        let ancestors = self.registry.ancestor_sections_of(name);
        while self.sections.len() > floor {
            let Some(top) = self.sections.last() else {
                break;
            };
            if ancestors.contains(&top.name) {
                return format!("{}{}", top.indent, self.options.step());
            }
            if top.name == name || is_same_level(name, &top.name) || ancestors.is_empty() {
                return self.sections.pop().map(|top| top.indent).unwrap_or_default();
            }
            self.sections.pop();
        }
        base
    }

    fn check_indent(&mut self, line_number: u32, line: &str, expected: &str) {
        let content_start = line.len() - line.trim_start().len();
        let actual = &line[..content_start];
        if actual != expected {
            self.edits.push(TextEdit {
                range: Range::on_line(line_number, 0, char_len(actual)),
                new_text: expected.to_string(),
            });
        }
    }

    fn strip_trailing_whitespace(&mut self, line_number: u32, line: &str) {
        if let Some(trailing) = TRAILING_WHITESPACE_REGEX.find(line) {
            self.edits.push(TextEdit {
                range: Range::on_line(
                    line_number,
                    char_column(line, trailing.start()),
                    char_len(line),
                ),
                new_text: String::new(),
            });
        }
    }
}

fn is_same_level(current: &str, previous: &str) -> bool {
    SAME_LEVEL_SECTIONS
        .iter()
        .any(|(first, second)| *first == current && *second == previous)
}

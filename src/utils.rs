use regex::Regex;
use std::sync::LazyLock;

static BLOCK_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment regex"));
static LINE_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#.*$").expect("line comment regex"));

/// Converts a byte offset inside `line` into a zero-based character column.
pub fn char_column(line: &str, byte: usize) -> u32 {
    let end = byte.min(line.len());
    line.get(..end).map_or(0, |prefix| prefix.chars().count() as u32)
}

/// Number of characters in the line.
pub fn char_len(line: &str) -> u32 {
    line.chars().count() as u32
}

/// True if the line contains nothing but whitespace.
pub fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

/// Converts `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Splits text into lines, normalizing line endings first.
pub fn split_lines(text: &str) -> Vec<String> {
    normalize_line_endings(text)
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// Index of the first non-blank line after `index`.
pub fn next_non_blank(lines: &[String], index: usize) -> Option<usize> {
    (index + 1..lines.len()).find(|&i| !is_blank(&lines[i]))
}

/// Replaces `/* ... */` blocks and `#` comment lines with spaces.
/// Line breaks inside comments are kept, so every remaining character
/// stays on its original line and column.
pub fn delete_comments(text: &str) -> String {
    let without_blocks = blank_matches(text, &BLOCK_COMMENT_REGEX);
    blank_matches(&without_blocks, &LINE_COMMENT_REGEX)
}

fn blank_matches(text: &str, regex: &Regex) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for found in regex.find_iter(text) {
        result.push_str(&text[last..found.start()]);
        result.extend(
            found
                .as_str()
                .chars()
                .map(|c| if c == '\n' { '\n' } else { ' ' }),
        );
        last = found.end();
    }
    result.push_str(&text[last..]);
    result
}

/// Counts the columns of a CSV row. Columns are separated by commas, spaces
/// or tabs; a quoted value may contain separators.
pub fn count_csv_columns(line: &str) -> usize {
    let chars: Vec<char> = line.chars().collect();
    let is_separator = |c: char| c == ',' || c == ' ' || c == '\t';
    let mut count = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if is_separator(c) {
            i += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            // an empty pair of quotes is not a quoted value
            if let Some(offset) = chars[i + 1..].iter().skip(1).position(|&q| q == c) {
                count += 1;
                i += offset + 3;
                continue;
            }
        }
        count += 1;
        while i < chars.len() && !is_separator(chars[i]) {
            i += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_column_with_multibyte_prefix() {
        let line = "ä = 1";
        assert_eq!(char_column(line, 2), 1);
        assert_eq!(char_column(line, 100), 5);
    }

    #[test]
    fn test_delete_comments_keeps_positions() {
        let text = "a = 1 /* x\ny */ b = 2\n  # note\nc = 3";
        let cleaned = delete_comments(text);
        let lines: Vec<&str> = cleaned.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "a = 1     ");
        assert_eq!(lines[1], "     b = 2");
        assert!(is_blank(lines[2]));
        assert_eq!(lines[3], "c = 3");
    }

    #[test]
    fn test_hash_inside_value_is_not_a_comment() {
        assert_eq!(delete_comments("color = #fff"), "color = #fff");
    }

    #[test]
    fn test_count_csv_columns() {
        assert_eq!(count_csv_columns(""), 0);
        assert_eq!(count_csv_columns("name, ip"), 2);
        assert_eq!(count_csv_columns("  a,b,,c  "), 3);
        assert_eq!(count_csv_columns("\"a, b\", c"), 2);
        assert_eq!(count_csv_columns("'x' 'y', z"), 3);
        assert_eq!(count_csv_columns("\"unterminated, c"), 2);
    }

    #[test]
    fn test_next_non_blank_skips_whitespace_lines() {
        let lines = split_lines("csv t =\n\n  \t\nname, ip");
        assert_eq!(next_non_blank(&lines, 0), Some(3));
        assert_eq!(next_non_blank(&lines, 3), None);
    }

    #[test]
    fn test_split_lines_normalizes_endings() {
        assert_eq!(split_lines("a\r\nb\rc"), vec!["a", "b", "c"]);
    }
}

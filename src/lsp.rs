use crate::registry::Registry;
use crate::text_range::{Position, Range};
use crate::utils::{char_column, split_lines};
use serde::Serialize;

/// Documentation shown for the setting under the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hover {
    pub contents: String,
    pub range: Range,
}

/// Finds the setting name under the cursor, left of `=`, and returns its
/// description. A cursor on the indent or inside the value gets no hover.
pub fn hover(text: &str, position: Position, registry: &Registry) -> Option<Hover> {
    let lines = split_lines(text);
    let line = lines.get(position.line as usize)?;
    let equals = line.find('=')?;
    let name = line[..equals].trim();
    if name.is_empty() {
        return None;
    }
    let setting = registry.lookup(name)?;
    let start = line[..equals].find(name)?;
    let range = Range::on_line(
        position.line,
        char_column(line, start),
        char_column(line, start + name.len()),
    );
    range.contains(position).then(|| Hover {
        contents: setting.description.clone(),
        range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_on_setting_name() {
        let registry = Registry::builtin().unwrap();
        let text = "[widget]\n  update-interval = 5 minute";
        let hover = hover(text, Position::new(1, 4), registry).unwrap();
        assert_eq!(hover.range, Range::on_line(1, 2, 17));
        assert_eq!(hover.contents, registry.lookup("updateinterval").unwrap().description);
    }

    #[test]
    fn test_no_hover_on_value() {
        let registry = Registry::builtin().unwrap();
        assert!(hover("  type = chart", Position::new(0, 10), registry).is_none());
        assert!(hover("  type = chart", Position::new(0, 1), registry).is_none());
        assert!(hover("[widget]", Position::new(0, 2), registry).is_none());
        assert!(hover("  unknown-thing = 1", Position::new(0, 3), registry).is_none());
    }
}

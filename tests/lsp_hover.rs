#![cfg(feature = "lsp")]

use charts_core::lsp::hover;
use charts_core::{validate, Position, Range, Registry};

#[test]
fn test_hover_shows_setting_description() {
    let registry = Registry::builtin().unwrap();
    let text = "[series]\n  Add-Meta = true";
    let found = hover(text, Position::new(1, 3), registry).unwrap();
    assert_eq!(found.contents, "Request entity and metric metadata from the server.");
    assert_eq!(found.range, Range::on_line(1, 2, 10));
}

#[test]
fn test_hover_through_report() {
    let report = validate("[widget]\n  arrow-length = 0.5", "hover.config").unwrap();
    let found = report.hover_at(Position::new(1, 8)).unwrap().unwrap();
    assert_eq!(found.contents, "Length of the gauge arrow relative to the radius.");
    assert!(report.hover_at(Position::new(1, 19)).unwrap().is_none());
    assert!(report.hover_at(Position::new(7, 0)).unwrap().is_none());
}

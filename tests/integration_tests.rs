// Integration tests for charts-core using test fixtures
use charts_core::{format, validate, Diagnostic, FormattingOptions, Range};
use std::fs;
use std::path::PathBuf;

fn get_test_file_path(subdir: &str, filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(subdir)
        .join(filename)
}

fn read_test_file(subdir: &str, filename: &str) -> String {
    let path = get_test_file_path(subdir, filename);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read test file: {:?}", path))
}

fn assert_clean(filename: &str) {
    let content = read_test_file("ok", filename);
    let report = validate(&content, filename).unwrap();
    assert!(
        report.diagnostics.is_empty(),
        "Should validate without diagnostics: {:?}",
        report.diagnostics
    );
    let edits = format(&content, &FormattingOptions::default()).unwrap();
    assert!(edits.is_empty(), "Should already be formatted: {:?}", edits);
}

// Documents that should produce no diagnostics and no formatting edits
mod ok_tests {
    use super::*;

    #[test]
    fn test_portal() {
        assert_clean("portal.config");
    }

    #[test]
    fn test_loops() {
        assert_clean("loops.config");
    }

    #[test]
    fn test_script() {
        assert_clean("script.config");
    }
}

// Documents with known problems
mod bad_tests {
    use super::*;

    fn diagnostics(filename: &str) -> Vec<Diagnostic> {
        let content = read_test_file("bad", filename);
        validate(&content, filename).unwrap().diagnostics
    }

    #[test]
    fn test_misspelt() {
        assert_eq!(
            diagnostics("misspelt.config"),
            vec![
                Diagnostic::error(
                    Range::on_line(2, 2, 9),
                    "timespn is unknown. Did you mean timespan?"
                ),
                Diagnostic::error(Range::on_line(3, 3, 9), "metric is required"),
            ]
        );
    }

    #[test]
    fn test_unclosed() {
        assert_eq!(
            diagnostics("unclosed.config"),
            vec![
                Diagnostic::error(Range::on_line(1, 0, 3), "for has no matching endfor"),
                Diagnostic::error(Range::on_line(5, 2, 4), "if has no matching endif"),
            ]
        );
    }
}

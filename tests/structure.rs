use charts_core::{validate, Diagnostic, Range, Severity};

fn diagnostics(text: &str) -> Vec<Diagnostic> {
    validate(text, "structure.config").unwrap().diagnostics
}

fn messages(text: &str) -> Vec<String> {
    diagnostics(text).into_iter().map(|d| d.message).collect()
}

#[test]
fn test_resolved_alias() {
    let text = "[widget]
  type = chart
  [series]
    entity = a
    metric = b
    alias = s1
  [series]
    value = value('s1') * 2";
    assert!(diagnostics(text).is_empty());
}

#[test]
fn test_alias_declared_after_its_use() {
    let text = "[widget]
  type = chart
  [series]
    value = value('s1') * 2
  [series]
    entity = a
    metric = b
    alias = s1";
    assert!(diagnostics(text).is_empty());
}

#[test]
fn test_unresolved_alias() {
    let text = "[widget]
  type = chart
  [series]
    entity = a
    metric = b
    alias = s1
  [series]
    value = value('s2') * 2";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(7, 19, 21), "s2 is unknown.")]
    );
}

#[test]
fn test_aliases_are_scoped_to_widget() {
    let text = "[widget]
  type = chart
  [series]
    entity = a
    metric = b
    alias = first
[widget]
  type = chart
  [series]
    value = value(\"first\")";
    assert_eq!(messages(text), vec!["first is unknown."]);
}

#[test]
fn test_duplicate_alias() {
    let text = "[widget]
  type = chart
  [series]
    entity = a
    metric = b
    alias = s1
  [series]
    entity = c
    metric = d
    alias = s1";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(9, 12, 14), "s1 is already defined")]
    );
}

#[test]
fn test_mutually_exclusive_settings() {
    let text = "[series]\n  entity-group = g\n  entity-expression = x\n  metric = m";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(
            Range::on_line(2, 2, 19),
            "entity-expression can not be specified simultaneously with entity-group"
        )]
    );
}

#[test]
fn test_repeated_setting() {
    assert_eq!(
        diagnostics("[widget]\n  type = chart\n  type = table"),
        vec![Diagnostic::error(Range::on_line(2, 2, 6), "type is already defined")]
    );
}

#[test]
fn test_repeated_thresholds_and_colors_are_deprecated() {
    let text = "[widget]
  type = gauge
  thresholds = 0
  thresholds = 60
  colors = red
  colors = green";
    let found = diagnostics(text);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|d| d.severity == Severity::Warning));
    assert_eq!(found[0].range, Range::on_line(3, 2, 12));
    assert!(found[0].message.starts_with("Replace multiple `thresholds` settings with one"));
    assert_eq!(found[1].range, Range::on_line(5, 2, 8));
    assert!(found[1].message.ends_with("colors = red, yellow, green"));
}

#[test]
fn test_same_setting_in_sibling_sections() {
    let text = "[series]\n  entity = a\n  metric = b\n[series]\n  entity = a\n  metric = b";
    assert!(diagnostics(text).is_empty());
}

#[test]
fn test_exhaustive_condition_satisfies_requirement() {
    let text = "[series]
  entity = a
  if a == 1
    metric = b
  else
    metric = c
  endif";
    assert!(diagnostics(text).is_empty());
}

#[test]
fn test_condition_without_else_does_not_satisfy_requirement() {
    let text = "[series]
  entity = a
  if a == 1
    metric = b
  elseif a == 2
    metric = c
  endif";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(0, 1, 7), "metric is required")]
    );
}

#[test]
fn test_setting_repeated_inside_branch() {
    let text = "[series]
  entity = a
  metric = b
  if a == 1
    metric = c
  endif";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(4, 4, 10), "metric is already defined")]
    );
}

#[test]
fn test_table_requires_attribute() {
    assert_eq!(
        diagnostics("[series]\n  entity = a\n  table = t"),
        vec![Diagnostic::error(Range::on_line(0, 1, 7), "attribute is required")]
    );
    assert!(diagnostics("[series]\n  entity = a\n  table = t\n  attribute = cpu").is_empty());
}

#[test]
fn test_repeated_table_requires_attribute_once() {
    assert_eq!(
        diagnostics("[series]\n  entity = a\n  table = t\n  table = u"),
        vec![
            Diagnostic::error(Range::on_line(3, 2, 7), "table is already defined"),
            Diagnostic::error(Range::on_line(0, 1, 7), "attribute is required"),
        ]
    );
}

#[test]
fn test_null_columns_waive_metric() {
    let text = "[widget]
  type = table
  column-metric = null
  column-value = null
  [series]
    entity = a";
    assert!(diagnostics(text).is_empty());
}

#[test]
fn test_settings_are_inherited_from_ancestors_only() {
    let inherited = "[widget]\n  type = chart\n  entity = a\n  metric = b\n  [series]\n  [series]";
    assert!(diagnostics(inherited).is_empty());

    let sibling = "[series]\n  entity = a\n  metric = b\n[series]";
    assert_eq!(
        diagnostics(sibling),
        vec![
            Diagnostic::error(Range::on_line(3, 1, 7), "entity is required"),
            Diagnostic::error(Range::on_line(3, 1, 7), "metric is required"),
        ]
    );
}

#[test]
fn test_new_widget_drops_settings_of_previous_widget_children() {
    let text = "[widget]
  type = chart
  [column]
    entity = a
[widget]
  type = chart
  [series]
    metric = m";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(6, 3, 9), "entity is required")]
    );
}

#[test]
fn test_unclosed_multi_line_collections() {
    assert_eq!(messages("list servers = a,\n  b"), vec!["list has no matching endlist"]);
    assert_eq!(messages("var hosts = [\n  'a'"), vec!["var has no matching endvar"]);
}

#[test]
fn test_mismatched_terminators() {
    assert_eq!(messages("endfor"), vec!["endfor has no matching for"]);
    assert_eq!(
        messages("list a = 1, 2\nfor x in a\nif x == 1\nendfor\nendif"),
        vec!["for has finished before if"]
    );
}

use charts_core::{validate, Diagnostic, Range};

fn diagnostics(text: &str) -> Vec<Diagnostic> {
    validate(text, "loops.config").unwrap().diagnostics
}

fn unknown_servers(line: u32) -> Vec<Diagnostic> {
    vec![Diagnostic::error(
        Range::on_line(line, 11, 17),
        "server is unknown. Did you mean servers?",
    )]
}

#[test]
fn test_one_line_list() {
    let correct = "list servers = 'srv1', 'srv2'\nfor srv in servers\n   #do something\nendfor\n";
    assert!(diagnostics(correct).is_empty());
    let misspelt = "list servers = 'srv1', 'srv2'\nfor srv in server\n   #do something\nendfor\n";
    assert_eq!(diagnostics(misspelt), unknown_servers(1));
}

#[test]
fn test_one_line_var_array() {
    let correct = "var servers = ['srv1', 'srv2']\nfor srv in servers\n   #do something\nendfor\n";
    assert!(diagnostics(correct).is_empty());
    let misspelt = "var servers = ['srv1', 'srv2']\nfor srv in server\n   #do something\nendfor\n";
    assert_eq!(diagnostics(misspelt), unknown_servers(1));
}

#[test]
fn test_one_line_var_object() {
    let correct = "var servers = {'srv1': 'srv2'}\nfor srv in servers\n   #do something\nendfor\n";
    assert!(diagnostics(correct).is_empty());
    let misspelt = "var servers = {'srv1': 'srv2'}\nfor srv in server\n   #do something\nendfor\n";
    assert_eq!(diagnostics(misspelt), unknown_servers(1));
}

#[test]
fn test_multi_line_list() {
    let correct = "list servers = 'srv1', \n   'srv2'\nendlist\n\
        for srv in servers\n   #do something\nendfor\n";
    assert!(diagnostics(correct).is_empty());
    let misspelt = "list servers = 'srv1', \n   'srv2'\nendlist\n\
        for srv in server\n   #do something\nendfor\n";
    assert_eq!(diagnostics(misspelt), unknown_servers(3));
}

#[test]
fn test_multi_line_var() {
    let array = "var servers = ['srv1', \n   'srv2'\n]\nendvar\n\
        for srv in servers\n   #do something\nendfor\n";
    assert!(diagnostics(array).is_empty());
    let object = "var servers = {\n   'srv1': 'srv2'\n}\nendvar\n\
        for srv in server\n   #do something\nendfor\n";
    assert_eq!(diagnostics(object), unknown_servers(4));
}

#[test]
fn test_collection_declared_after_loop() {
    let text = "for srv in servers\n   #do something\nendfor\n\
        var servers = {\n   'srv1': 'srv2'\n}\nendvar\n";
    assert!(diagnostics(text).is_empty());
}

#[test]
fn test_collection_never_declared() {
    let text = "for srv in servers\n   #do something\nendfor\n";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(0, 11, 18), "servers is unknown.")]
    );
}

#[test]
fn test_csv_table_as_collection() {
    let text = "csv servers = name, ip\n  vps, 10.0.0.1\nendcsv\n\
        for srv in servers\n  [series]\n    entity = @{srv.name}\n    metric = cpu\nendfor";
    assert!(diagnostics(text).is_empty());
}

#[test]
fn test_object_keys_collection() {
    let text = "var hosts = {'a': 1}\nfor host in Object.keys(hosts)\nendfor";
    assert!(diagnostics(text).is_empty());
    let misspelt = "var hosts = {'a': 1}\nfor host in Object.keys(host)\nendfor";
    assert_eq!(
        diagnostics(misspelt),
        vec![Diagnostic::error(
            Range::on_line(1, 24, 28),
            "host is unknown. Did you mean hosts?"
        )]
    );
}

#[test]
fn test_empty_in_statement() {
    assert_eq!(
        diagnostics("for srv in \n   #do something\nendfor\n"),
        vec![Diagnostic::error(Range::on_line(0, 8, 10), "Empty 'in' statement")]
    );
}

#[test]
fn test_unknown_variable_inside_loop() {
    let text = "list servers = a, b
for srv in servers
  [series]
    entity = @{sr}
    metric = cpu
    label = @{srv.name + keys(srv)}
endfor";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(3, 15, 17), "sr is unknown.")]
    );
}

#[test]
fn test_loop_variable_is_scoped() {
    let text = "list servers = a, b
for srv in servers
endfor
for host in servers
  [series]
    entity = @{srv}
    metric = cpu
endfor";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(5, 15, 18), "srv is unknown.")]
    );
}

#[test]
fn test_duplicate_declaration() {
    let text = "list servers = a, b\nvar servers = ['c']";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(1, 4, 11), "servers is already defined")]
    );
}

#[test]
fn test_repeated_loop_variable_keeps_outer_scope() {
    let text = "list a = 1, 2
list b = 3
for x in a
  for x in b
  endfor
  [series]
    entity = @{x}
    metric = m
endfor";
    assert_eq!(
        diagnostics(text),
        vec![Diagnostic::error(Range::on_line(3, 6, 7), "x is already defined")]
    );
}

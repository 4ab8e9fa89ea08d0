//! End-to-end semantic validation through the public API.

use minipascal::{compile, compile_relaxed, parse};

fn error_messages(source: &str) -> Vec<String> {
    compile(source)
        .diagnostics
        .iter()
        .map(|report| report.to_string())
        .collect()
}

#[test]
fn valid_program_has_no_diagnostics() {
    let result = compile(
        "PROGRAM sums VAR total, n: INTEGER; BEGIN \
         total := 0; n := 1; \
         WHILE n <= 10 DO BEGIN total := total + n; n := n + 1 END; \
         PRINT(total) \
         END",
    );
    assert!(result.unit.is_some());
    assert!(result.diagnostics.is_empty());
}

#[test]
fn undeclared_identifier() {
    let messages = error_messages("PROGRAM p BEGIN x := 1 END");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("used before declaration")),
        "{messages:?}"
    );
}

#[test]
fn every_undeclared_use_is_reported() {
    let messages = error_messages("PROGRAM p BEGIN x := y END");
    // Both x and y are undeclared; one pass reports both.
    assert_eq!(
        messages
            .iter()
            .filter(|m| m.contains("used before declaration"))
            .count(),
        2
    );
}

#[test]
fn assignment_type_mismatch() {
    let messages = error_messages("PROGRAM p VAR x: INTEGER; BEGIN x := 1.5 END");
    assert!(
        messages.iter().any(|m| m.contains("type mismatch")),
        "{messages:?}"
    );
}

#[test]
fn non_boolean_if_condition() {
    let messages =
        error_messages("PROGRAM p VAR x: INTEGER; BEGIN IF x + 1 THEN x := 1 END");
    assert!(
        messages.iter().any(|m| m.contains("must be boolean")),
        "{messages:?}"
    );
}

#[test]
fn non_boolean_while_condition() {
    let messages =
        error_messages("PROGRAM p VAR x: INTEGER; BEGIN WHILE x DO x := x + 1 END");
    assert!(
        messages.iter().any(|m| m.contains("must be boolean")),
        "{messages:?}"
    );
}

#[test]
fn relational_operator_rejects_boolean_operands() {
    let messages =
        error_messages("PROGRAM p VAR x: INTEGER; BEGIN IF TRUE < 1 THEN x := 1 END");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("requires arithmetic operands")),
        "{messages:?}"
    );
}

#[test]
fn logical_operator_rejects_numeric_operands() {
    let messages = error_messages(
        "PROGRAM p VAR x, y: INTEGER; BEGIN IF x AND 1 < y THEN x := 1 END",
    );
    assert!(
        messages
            .iter()
            .any(|m| m.contains("requires boolean operands")),
        "{messages:?}"
    );
}

#[test]
fn call_arity_mismatch() {
    let messages = error_messages(
        "PROGRAM p PROCEDURE q(a: INTEGER); BEGIN a := 0 END; BEGIN q END",
    );
    assert!(
        messages.iter().any(|m| m.contains("expects 1 argument")),
        "{messages:?}"
    );
}

#[test]
fn call_argument_type_mismatch() {
    let messages = error_messages(
        "PROGRAM p PROCEDURE q(a: INTEGER); BEGIN a := 0 END; BEGIN q(1.5) END",
    );
    assert!(
        messages.iter().any(|m| m.contains("expected INTEGER")),
        "{messages:?}"
    );
}

#[test]
fn unknown_procedure() {
    let messages = error_messages("PROGRAM p BEGIN q(1) END");
    assert!(
        messages.iter().any(|m| m.contains("called before definition")),
        "{messages:?}"
    );
}

#[test]
fn shadowing_warns_without_failing() {
    let result = compile("PROGRAM p VAR x: INTEGER; x: REAL; BEGIN x := 1.5 END");
    assert!(result.unit.is_some());
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].to_string().contains("shadows"));
}

#[test]
fn relaxed_mode_auto_inserts_identifiers_as_real() {
    // x is auto-inserted with type REAL, so the real assignment passes
    // and the integer one fails the type check.
    let ok = compile_relaxed("PROGRAM p BEGIN x := 1.5 END");
    assert!(ok.unit.is_some(), "{:?}", ok.diagnostics);

    let mismatch = compile_relaxed("PROGRAM p BEGIN x := 1 END");
    assert!(mismatch.unit.is_none());
}

#[test]
fn procedure_sees_program_globals() {
    let result = compile(
        "PROGRAM p VAR g: INTEGER; \
         PROCEDURE q; BEGIN g := g + 1 END; \
         BEGIN q END",
    );
    assert!(result.unit.is_some(), "{:?}", result.diagnostics);
}

#[test]
fn procedure_locals_are_not_visible_outside() {
    let messages = error_messages(
        "PROGRAM p PROCEDURE q; VAR loc: INTEGER; BEGIN loc := 0 END; \
         BEGIN loc := 1 END",
    );
    assert!(
        messages
            .iter()
            .any(|m| m.contains("'loc' used before declaration")),
        "{messages:?}"
    );
}

#[test]
fn lexical_errors_fail_the_run_but_parsing_continues() {
    let result = parse("PROGRAM p BEGIN x := 1 ? END");
    // The illegal character is skipped, so the program still parses.
    assert!(result.ast.is_some());
    assert!(!result.diagnostics.is_empty());
}

#[test]
fn syntax_error_reports_the_offending_token() {
    let result = compile("PROGRAM p BEGIN x := * END");
    assert!(result.unit.is_none());
    assert!(result.diagnostics[0].to_string().contains("expected"));
}

//! Tests over the rendered C translation unit.

fn compile_c(source: &str) -> String {
    let result = minipascal::compile(source);
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        result.diagnostics
    );
    result.c_source.expect("expected C output")
}

/// Asserts that `needles` occur in `haystack` in the given order.
fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut position = 0;
    for needle in needles {
        match haystack[position..].find(needle) {
            Some(offset) => position += offset + needle.len(),
            None => panic!("expected '{needle}' after byte {position} in:\n{haystack}"),
        }
    }
}

#[test]
fn preamble_and_close() {
    let c = compile_c("PROGRAM p VAR x: INTEGER; BEGIN x := 1 END");
    assert_in_order(
        &c,
        &[
            "#include <stdio.h>",
            "#include <stdlib.h>",
            "#include <string.h>",
            "int main() {",
            "void* current_activation_record = NULL, *tmp_activation_record = NULL;",
            "int x;",
        ],
    );
    assert!(c.trim_end().ends_with('}'));
}

#[test]
fn straight_line_body_uses_a_temporary_array_slot() {
    let c = compile_c("PROGRAM p VAR x: INTEGER; BEGIN x := 1 + 2 END");
    assert_in_order(
        &c,
        &[
            "goto l1;",
            "l1: ;",
            "int temporary_INTEGER[1] = {0};",
            "temporary_INTEGER[0] = 1 + 2;",
            "x = temporary_INTEGER[0];",
        ],
    );
}

#[test]
fn if_else_renders_the_jump_diamond() {
    let c = compile_c(
        "PROGRAM p VAR x, y, z: INTEGER; BEGIN IF x < y THEN z := 1 ELSE z := 2 END",
    );
    assert_in_order(
        &c,
        &[
            "if (x < y) goto l2;",
            "goto l3;",
            "l2: ;",
            "z = 1;",
            "goto l4;",
            "l3: ;",
            "z = 2;",
            "l4: ;",
        ],
    );
}

#[test]
fn while_loops_back_to_the_condition() {
    let c = compile_c("PROGRAM p VAR x: INTEGER; BEGIN WHILE x < 10 DO x := x + 1 END");
    assert_in_order(
        &c,
        &[
            "l2: ;",
            "if (x < 10) goto l3;",
            "goto l4;",
            "l3: ;",
            "temporary_INTEGER[0] = x + 1;",
            "x = temporary_INTEGER[0];",
            "goto l2;",
            "l4: ;",
        ],
    );
}

#[test]
fn operator_spelling_follows_c() {
    let c = compile_c(
        "PROGRAM p VAR a, b: INTEGER; BEGIN \
         a := b DIV 2; \
         a := b MOD 2; \
         IF a = b THEN a := 1; \
         IF a <> b THEN a := 2 \
         END",
    );
    assert!(c.contains("= b / 2;"));
    assert!(c.contains("= b % 2;"));
    assert!(c.contains("if (a == b) goto"));
    assert!(c.contains("if (a != b) goto"));
}

#[test]
fn print_formats_follow_the_operand_type() {
    let c = compile_c(
        "PROGRAM p VAR i: INTEGER; r: REAL; BEGIN PRINT(i); PRINT(r) END",
    );
    assert!(c.contains("printf(\"%d\\n\", i);"));
    assert!(c.contains("printf(\"%f\\n\", r);"));
}

#[test]
fn unary_minus_renders_with_a_temporary() {
    let c = compile_c("PROGRAM p VAR x: INTEGER; BEGIN x := -x END");
    assert!(c.contains("temporary_INTEGER[0] = -x;"));
    assert!(c.contains("x = temporary_INTEGER[0];"));
}

#[test]
fn real_declarations_render_as_double() {
    let c = compile_c("PROGRAM p VAR r: REAL; BEGIN r := 2.5 END");
    assert!(c.contains("double r;"));
    assert!(c.contains("r = 2.5;"));
}

#[test]
fn activation_record_and_call_protocol() {
    let c = compile_c(
        "PROGRAM p VAR g: INTEGER; \
         PROCEDURE q(a: INTEGER); VAR loc: INTEGER; BEGIN loc := a + 1 END; \
         BEGIN q(5) END",
    );

    // The record struct is defined ahead of all code, with control link,
    // return address, parameters, locals, and temporaries.
    assert_in_order(
        &c,
        &[
            "int main() {",
            "struct activation_record_q {",
            "struct activation_record_q* control_link;",
            "void* return_address;",
            "struct {",
            "int a;",
            "} parameters;",
            "struct {",
            "int loc;",
            "} locals;",
            "int temporary_INTEGER[1];",
            "};",
            "typedef struct activation_record_q ActivationRecord_q;",
            "typedef ActivationRecord_q* ActivationRecordPtr_q;",
        ],
    );

    // Call site: heap allocation, zeroing, linking, return address, swap,
    // parameter store, jump to the body.
    assert_in_order(
        &c,
        &[
            "tmp_activation_record = malloc(sizeof(ActivationRecord_q));",
            "memset(tmp_activation_record, 0, sizeof(ActivationRecord_q));",
            "((ActivationRecordPtr_q)tmp_activation_record)->control_link = current_activation_record;",
            "((ActivationRecordPtr_q)tmp_activation_record)->return_address = &&l",
            "current_activation_record = tmp_activation_record;",
            "(((ActivationRecordPtr_q)current_activation_record)->parameters).a = 5;",
            "goto l1;",
        ],
    );

    // Return: restore the caller's record, free, computed goto.
    assert_in_order(
        &c,
        &[
            "tmp_activation_record = current_activation_record;",
            "current_activation_record = (void*)((ActivationRecordPtr_q)tmp_activation_record)->control_link;",
            "free(tmp_activation_record);",
            "goto *return_address;",
        ],
    );

    // Procedure-scope names go through the activation record.
    assert!(c.contains(
        "(((ActivationRecordPtr_q)current_activation_record)->locals).loc = \
         ((ActivationRecordPtr_q)current_activation_record)->temporary_INTEGER[0];"
    ));
}

#[test]
fn boolean_assignment_materializes_one_and_zero() {
    let c = compile_c("PROGRAM p VAR x: INTEGER; BEGIN x := TRUE AND FALSE END");
    assert_in_order(
        &c,
        &[
            "temporary_INTEGER[0] = 1;",
            "temporary_INTEGER[0] = 0;",
            "x = temporary_INTEGER[0];",
        ],
    );
}

#[test]
fn fragment_listing_is_not_a_translation_unit() {
    let lexed = minipascal::tokenize("a + b * c");
    let outcome =
        minipascal::Parser::new(&lexed.tokens).parse_start(minipascal::StartSymbol::Expression);
    let tree = outcome.tree.expect("fixture must parse");
    let generated = minipascal::generate_tree(&tree, true);
    let unit = generated.unit.expect("expected a unit");

    let listing = minipascal::render_listing(&unit);
    assert!(!listing.contains("int main()"));
    assert!(listing.contains("temporary_REAL[0] = b * c;"));
}

// Companion declarations for tracked variable declarations.

use umbra::engine::instrument_str;

fn instrument(source: &str) -> String {
    instrument_str(source, "test.js").expect("instrument").code
}

#[test]
fn number_declaration_gains_companion() {
    let expected = r#"let a = 2;
let a_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("let a = 2;"), expected);
}

#[test]
fn string_declaration_gains_companion() {
    let expected = r#"let bar = 'bar';
let bar_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("let bar = 'bar';"), expected);
}

#[test]
fn boolean_declaration_gains_companion() {
    let expected = r#"let bool = true;
let bool_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("let bool = true;"), expected);
}

#[test]
fn undefined_declaration_is_identity() {
    assert_eq!(
        instrument("let somethingUndefined = undefined;"),
        "let somethingUndefined = undefined;"
    );
}

#[test]
fn uninitialized_declaration_is_identity() {
    assert_eq!(instrument("let pending;"), "let pending;");
}

#[test]
fn null_declaration_gains_companion() {
    let expected = r#"let somethingNull = null;
let somethingNull_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("let somethingNull = null;"), expected);
}

#[test]
fn bigint_expression_declaration_gains_companion() {
    let expected = r#"const x = 2n ** 53n;
let x_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("const x = 2n ** 53n;"), expected);
}

#[test]
fn token_constructor_call_is_an_ordinary_primitive() {
    let expected = r#"let symbol = Symbol();
let symbol_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("let symbol = Symbol();"), expected);
}

#[test]
fn companion_is_always_let_even_for_const() {
    let out = instrument("const x = 1;");
    assert!(out.contains("let x_shadow = Symbol("));
}

#[test]
fn alias_declaration_is_left_alone() {
    let source = "const obj = {a: 2, b: 3};\nconst obj2 = obj;";
    let out = instrument(source);
    assert!(!out.contains("obj2_shadow"));
    assert!(out.ends_with("const obj2 = obj;"));
}

#[test]
fn companion_records_declaration_line() {
    let source = "let first = 1;\nlet second = 2;";
    let expected = r#"let first = 1;
let first_shadow = Symbol("{\"mutations\":[1]}");
let second = 2;
let second_shadow = Symbol("{\"mutations\":[2]}");"#;
    assert_eq!(instrument(source), expected);
}

#[test]
fn multi_declarator_statement_gains_one_companion_each() {
    let out = instrument("let a = 1, b = 2;");
    let expected = r#"let a = 1, b = 2;
let a_shadow = Symbol("{\"mutations\":[1]}");
let b_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(out, expected);
}

#[test]
fn type_annotations_pass_through() {
    let expected = r#"let a: number = 2;
let a_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("let a: number = 2;"), expected);
}

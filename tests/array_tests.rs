// Array-valued bindings: companion at declaration, record extension on
// method-style mutation calls.

use umbra::engine::instrument_str;

fn instrument(source: &str) -> String {
    instrument_str(source, "test.js").expect("instrument").code
}

#[test]
fn array_declaration_gains_companion() {
    let expected = r#"const array = [1, 3, 4, 5];
let array_shadow = Symbol("{\"mutations\":[1]}");"#;
    assert_eq!(instrument("const array = [1, 3, 4, 5];"), expected);
}

#[test]
fn push_call_extends_the_record() {
    let source = "const array = [1, 3, 4, 5];\narray.push(3);";
    let expected = r#"const array = [1, 3, 4, 5];
let array_shadow = Symbol("{\"mutations\":[1]}");
array.push(3);
let array_shadow_parsed = JSON.parse(array_shadow.description);
array_shadow_parsed.mutations.push(2);
array_shadow = Symbol(JSON.stringify(array_shadow_parsed));"#;
    assert_eq!(instrument(source), expected);
}

#[test]
fn any_method_call_on_an_array_binding_counts_as_a_mutation() {
    // No distinction between mutating and non-mutating methods.
    let source = "const array = [1];\narray.slice(0);";
    let out = instrument(source);
    assert!(out.contains("array_shadow_parsed.mutations.push(2);"));
}

#[test]
fn method_calls_on_non_array_bindings_are_not_mutations() {
    let source = "const text = 'abc';\ntext.trim();";
    let out = instrument(source);
    assert!(!out.contains("text_shadow_parsed"));
    assert!(out.contains("text.trim();"));
}

#[test]
fn array_reassignment_extends_like_a_primitive() {
    let source = "let array = [1];\narray = [2];";
    let out = instrument(source);
    assert!(out.contains("array_shadow_parsed.mutations.push(2);"));
}

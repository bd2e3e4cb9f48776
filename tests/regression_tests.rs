// Regression coverage for the traversal invariants: the origin guard must
// keep the tree-mutating walk from re-instrumenting its own output, and
// unresolvable constructs must be skipped rather than mangled.

use umbra::engine::instrument_str;
use umbra::errors::ErrorKind;

fn instrument(source: &str) -> String {
    instrument_str(source, "test.js").expect("instrument").code
}

#[test]
fn companions_are_not_instrumented_again() {
    let out = instrument("let a = 2;");
    // Exactly one companion, and no shadow-of-shadow.
    assert_eq!(out.matches("let a_shadow = Symbol(").count(), 1);
    assert!(!out.contains("a_shadow_shadow"));
}

#[test]
fn record_extensions_are_not_instrumented_again() {
    let out = instrument("let a = 2;\na = 3;");
    // The triplet's own assignments and declarations stay untouched.
    assert_eq!(out.matches("a_shadow_parsed").count(), 3);
    assert!(!out.contains("a_shadow_parsed_shadow"));
    assert!(!out.contains("a_shadow_parsed_parsed"));
}

#[test]
fn probe_internals_are_not_instrumented_again() {
    let out = instrument("a = 3;");
    assert!(!out.contains("a_shadow_declared_shadow"));
    // The probe's `a_shadow;` reference must not grow shadow arguments or
    // further probes of its own.
    assert_eq!(out.matches("let a_shadow_declared = true;").count(), 1);
}

#[test]
fn metadata_props_are_not_given_metadata() {
    let out = instrument("const obj = {a: 1};");
    assert_eq!(out.matches("Symbol.for(\"a\")").count(), 1);
}

#[test]
fn large_mixed_module_instruments_without_looping() {
    let source = "let a = 2;\nconst obj = { a: \"x\", b: \"y\"};\nobj.ta = \"a\";\na = 3;\nlet foo = 42;\nfunction passMeParams(foo) {\nconsole.log(foo);\n}\npassMeParams(foo);\nfor (let i = 0; i < 10; i++) {\nconsole.log(i);\n}";
    let out = instrument(source);
    assert!(out.contains("let a_shadow = Symbol("));
    assert!(out.contains("passMeParams(foo, foo_shadow);"));
    assert!(out.contains("for (let i = 0; i < 10; i++)"));
}

#[test]
fn for_head_declarator_is_never_instrumented() {
    let out = instrument("for (let i = 0; i < 10; i++) {\nconsole.log(i);\n}");
    assert!(!out.contains("i_shadow"));
}

#[test]
fn destructuring_declaration_of_a_call_result_is_fatal() {
    let err = instrument_str("let [a, b] = f();", "test.js").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingIdentifier { .. }));
    assert!(err
        .diagnostic_info
        .error_code
        .starts_with("umbra::rewrite::"));
}

#[test]
fn plain_destructuring_declaration_is_left_alone() {
    let out = instrument("let [a, b] = pair;");
    assert_eq!(out, "let [a, b] = pair;");
}

#[test]
fn unresolvable_constructs_are_silently_skipped() {
    assert_eq!(instrument("mystery(unknown);"), "mystery(unknown);");
    assert_eq!(instrument("unknown.method();"), "unknown.method();");
}

#[test]
fn rerunning_on_output_is_out_of_scope_but_terminates() {
    // Idempotence is explicitly not guaranteed: a second pass may duplicate
    // instrumentation. It must still terminate and parse its own output.
    let once = instrument("let a = 2;");
    let twice = instrument_str(&once, "test.js").expect("second pass").code;
    assert!(twice.len() >= once.len());
}

// Object literal metadata slots and property-write tracking.

use umbra::engine::instrument_str;

fn instrument(source: &str) -> String {
    instrument_str(source, "test.js").expect("instrument").code
}

#[test]
fn object_literal_gains_reversed_metadata_then_original_props() {
    let source = r#"const obj = { a: "not_a", b: "note_b" };"#;
    let expected = r#"const obj = { [Symbol.for("b")]: "{\"mutations\":[1]}", [Symbol.for("a")]: "{\"mutations\":[1]}", a: "not_a", b: "note_b" };"#;
    assert_eq!(instrument(source), expected);
}

#[test]
fn empty_object_literal_is_identity() {
    assert_eq!(instrument("const obj = {};"), "const obj = {};");
}

#[test]
fn object_binding_itself_gets_no_companion_variable() {
    let out = instrument("const obj = {a: 1};");
    assert!(!out.contains("obj_shadow"));
}

#[test]
fn property_assignment_gains_slot_existence_check() {
    let expected = r#"obj.ta = "a";
if (obj[Symbol.for("ta")]) {
  let ta_shadow_parsed = JSON.parse(obj[Symbol.for("ta")]);
  ta_shadow_parsed.mutations.push(1);
  obj[Symbol.for("ta")] = JSON.stringify(ta_shadow_parsed);
} else {
  obj[Symbol.for("ta")] = "{\"mutations\":[1]}";
}"#;
    assert_eq!(instrument(r#"obj.ta = "a";"#), expected);
}

#[test]
fn property_assignment_inside_iife_is_instrumented() {
    let source = r#"(function() { obj.ta = "b"; })()"#;
    let expected = r#"(function () {
  obj.ta = "b";
  if (obj[Symbol.for("ta")]) {
    let ta_shadow_parsed = JSON.parse(obj[Symbol.for("ta")]);
    ta_shadow_parsed.mutations.push(1);
    obj[Symbol.for("ta")] = JSON.stringify(ta_shadow_parsed);
  } else {
    obj[Symbol.for("ta")] = "{\"mutations\":[1]}";
  }
})();"#;
    assert_eq!(instrument(source), expected);
}

#[test]
fn copied_property_updates_the_target_objects_slot() {
    let source = "const obj = {a: 2, b: 3};\nconst obj2 = {};\nobj2.a = obj.a;";
    let out = instrument(source);
    assert!(out.contains(r#"if (obj2[Symbol.for("a")])"#));
    assert!(out.contains(r#"obj2[Symbol.for("a")] = "{\"mutations\":[3]}";"#));
    // The source object is read, not written; its slots stay metadata-only.
    assert!(!out.contains(r#"if (obj[Symbol.for("a")])"#));
}

#[test]
fn metadata_lines_use_the_literal_line() {
    let source = "const later = 1;\nconst obj = {a: 2};";
    let out = instrument(source);
    assert!(out.contains(r#"[Symbol.for("a")]: "{\"mutations\":[2]}""#));
}

#[test]
fn computed_member_assignment_is_left_alone() {
    let source = r#"obj[key] = "a";"#;
    assert_eq!(instrument(source), r#"obj[key] = "a";"#);
}

#[test]
fn nested_member_assignment_is_left_alone() {
    let source = r#"obj.inner.ta = "a";"#;
    assert_eq!(instrument(source), r#"obj.inner.ta = "a";"#);
}

// Instance-field tracking through truthiness-guarded shadow slots.

use umbra::engine::instrument_str;

fn instrument(source: &str) -> String {
    instrument_str(source, "test.js").expect("instrument").code
}

#[test]
fn constructor_writes_gain_guarded_slot_updates() {
    let source = "class Rectangle {\nconstructor(height, width) {\nthis.height = height;\nthis.width = width;\n}\n}";
    let expected = r#"class Rectangle {
  constructor(height, width) {
    this.height = height;
    if (this.height_shadow) {
      let height_shadow_parsed = JSON.parse(this.height_shadow.description);
      height_shadow_parsed.mutations.push(3);
      this.height_shadow = Symbol(JSON.stringify(height_shadow_parsed));
    } else {
      this.height_shadow = Symbol("{\"mutations\":[3]}");
    }
    this.width = width;
    if (this.width_shadow) {
      let width_shadow_parsed = JSON.parse(this.width_shadow.description);
      width_shadow_parsed.mutations.push(4);
      this.width_shadow = Symbol(JSON.stringify(width_shadow_parsed));
    } else {
      this.width_shadow = Symbol("{\"mutations\":[4]}");
    }
  }
}"#;
    assert_eq!(instrument(source), expected);
}

#[test]
fn method_writes_are_tracked_like_constructor_writes() {
    let source =
        "class Rectangle {\nconstructor(height) {\nthis.height = height;\n}\nmakeSquare() {\nthis.height = this.width;\n}\n}";
    let out = instrument(source);
    assert!(out.contains("mutations.push(3)"));
    assert!(out.contains("mutations.push(6)"));
    assert_eq!(out.matches("if (this.height_shadow)").count(), 2);
}

#[test]
fn method_parameters_stay_untouched() {
    let source = "class Box {\nresize(w) {\nthis.w = w;\n}\n}";
    let out = instrument(source);
    assert!(out.contains("resize(w) {"));
    assert!(!out.contains("resize(w, w_shadow)"));
}

#[test]
fn slot_updates_read_the_instance_field() {
    let out = instrument("class Box {\nset(v) {\nthis.v = v;\n}\n}");
    assert!(out.contains("JSON.parse(this.v_shadow.description)"));
    assert!(out.contains(r#"this.v_shadow = Symbol("{\"mutations\":[3]}");"#));
}

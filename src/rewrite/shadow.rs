//! Shadow-state policy
//!
//! Decides what code shape carries a tracked entity's mutation record and
//! synthesizes it: companion declarations, the three-statement record
//! extension, the runtime existence probe, and the metadata slots used for
//! object properties and instance fields. Every node built here is
//! `Origin::Synthetic`, which is what keeps the traversal from instrumenting
//! its own output.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::syntax::{
    ArrayLit, AssignExpr, AssignTarget, BinOp, BinaryExpr, CallExpr, DeclKind, Declarator,
    ElseBranch, Expr, ExprStmt, Ident, IfStmt, Lit, MemberExpr, MemberProp, Origin, Pattern, Prop,
    PropKey, Stmt, TryStmt, VarDecl,
};

/// Suffix appended to a tracked name to derive its companion's name.
pub const SHADOW_SUFFIX: &str = "_shadow";

/// The runtime value used as the opaque token constructor in emitted code.
pub const TOKEN_CONSTRUCTOR: &str = "Symbol";

/// Callees whose results are opaque token constructions rather than tracked
/// call results. A declaration initialized from one of these is an ordinary
/// primitive declaration.
static OPAQUE_CONSTRUCTORS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from([TOKEN_CONSTRUCTOR]));

pub fn is_opaque_constructor(name: &str) -> bool {
    OPAQUE_CONSTRUCTORS.contains(name)
}

/// `<name>` -> `<name>_shadow`. Collisions are not checked; the same source
/// name always yields the same shadow name within scope.
pub fn shadow_name(name: &str) -> String {
    format!("{name}{SHADOW_SUFFIX}")
}

fn parsed_name(shadow: &str) -> String {
    format!("{shadow}_parsed")
}

fn probe_flag_name(shadow: &str) -> String {
    format!("{shadow}_declared")
}

// ============================================================================
// MUTATION RECORDS
// ============================================================================

/// The ordered list of source lines at which a tracked entity was written,
/// as serialized into a token's descriptive text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub mutations: Vec<usize>,
}

impl MutationRecord {
    pub fn starting_at(line: usize) -> Self {
        Self {
            mutations: vec![line],
        }
    }

    /// Serialized record payload, e.g. `{"mutations":[1]}`.
    pub fn to_payload(&self) -> String {
        // A struct of one integer vec cannot fail to encode.
        serde_json::to_string(self).expect("mutation record serialization is infallible")
    }

    /// Parses a payload back; used by tooling and tests to inspect emitted
    /// records.
    pub fn from_payload(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

// ============================================================================
// COMPANION CODE SHAPES
// ============================================================================

/// `let <name>_shadow = Symbol("{\"mutations\":[<line>]}");`
pub fn companion_decl(name: &str, line: usize) -> Stmt {
    let record = MutationRecord::starting_at(line);
    let_stmt(
        DeclKind::Let,
        &shadow_name(name),
        token_call(&record.to_payload()),
    )
}

/// The three-statement record extension. Order is load-bearing: the parse
/// feeds the push, the push feeds the reserialization.
///
/// ```text
/// let <n>_parsed = JSON.parse(<n>.description);
/// <n>_parsed.mutations.push(<line>);
/// <n> = Symbol(JSON.stringify(<n>_parsed));
/// ```
pub fn extend_record(name: &str, line: usize) -> Vec<Stmt> {
    let shadow = shadow_name(name);
    let parsed = parsed_name(&shadow);
    vec![
        let_stmt(
            DeclKind::Let,
            &parsed,
            call(
                member_dot(ident("JSON"), "parse"),
                vec![member_dot(ident(&shadow), "description")],
            ),
        ),
        expr_stmt(call(
            member_dot(member_dot(ident(&parsed), "mutations"), "push"),
            vec![num(line)],
        )),
        expr_stmt(assign_ident(
            &shadow,
            call(
                ident(TOKEN_CONSTRUCTOR),
                vec![call(
                    member_dot(ident("JSON"), "stringify"),
                    vec![ident(&parsed)],
                )],
            ),
        )),
    ]
}

/// The runtime existence probe for names whose shadow cannot be statically
/// resolved. Declares a flag defaulting true, references the shadow inside a
/// guarded block, downgrades the flag on a resolution failure, then branches:
/// extend the existing record, or declare a fresh loosely-scoped one.
pub fn existence_probe(name: &str, line: usize) -> Vec<Stmt> {
    let shadow = shadow_name(name);
    let flag = probe_flag_name(&shadow);
    let record = MutationRecord::starting_at(line);

    let probe = Stmt::Try(TryStmt {
        block: vec![expr_stmt(ident(&shadow))],
        param: "e".to_string(),
        handler: vec![Stmt::If(IfStmt {
            test: binary(
                BinOp::StrictEq,
                member_dot(ident("e"), "name"),
                str_lit("ReferenceError"),
            ),
            consequent: vec![expr_stmt(assign_ident(&flag, bool_lit(false)))],
            alternate: None,
            origin: Origin::Synthetic,
        })],
        origin: Origin::Synthetic,
    });

    let branch = Stmt::If(IfStmt {
        test: ident(&flag),
        consequent: extend_record(name, line),
        alternate: Some(ElseBranch::Block(vec![let_stmt(
            DeclKind::Var,
            &shadow,
            token_call(&record.to_payload()),
        )])),
        origin: Origin::Synthetic,
    });

    vec![
        let_stmt(DeclKind::Let, &flag, bool_lit(true)),
        probe,
        branch,
    ]
}

/// Slot update for `obj.key = ...`: extend the interned metadata slot when it
/// already exists, create it otherwise.
pub fn property_slot_update(object: &str, key: &str, line: usize) -> Stmt {
    let parsed = parsed_name(&shadow_name(key));
    let record = MutationRecord::starting_at(line);

    Stmt::If(IfStmt {
        test: property_slot(object, key),
        consequent: vec![
            let_stmt(
                DeclKind::Let,
                &parsed,
                call(
                    member_dot(ident("JSON"), "parse"),
                    vec![property_slot(object, key)],
                ),
            ),
            expr_stmt(call(
                member_dot(member_dot(ident(&parsed), "mutations"), "push"),
                vec![num(line)],
            )),
            expr_stmt(assign_member(
                property_slot_member(object, key),
                call(
                    member_dot(ident("JSON"), "stringify"),
                    vec![ident(&parsed)],
                ),
            )),
        ],
        alternate: Some(ElseBranch::Block(vec![expr_stmt(assign_member(
            property_slot_member(object, key),
            str_lit(&record.to_payload()),
        ))])),
        origin: Origin::Synthetic,
    })
}

/// Slot update for `this.field = ...`. Mirrors the object-property case, but
/// the slot is a token-valued instance field guarded by runtime truthiness,
/// because constructors run once per instance and static visibility cannot
/// capture repeated invocations.
pub fn instance_slot_update(field: &str, line: usize) -> Stmt {
    let shadow = shadow_name(field);
    let parsed = parsed_name(&shadow);
    let record = MutationRecord::starting_at(line);

    Stmt::If(IfStmt {
        test: this_field(&shadow),
        consequent: vec![
            let_stmt(
                DeclKind::Let,
                &parsed,
                call(
                    member_dot(ident("JSON"), "parse"),
                    vec![member_dot(this_field(&shadow), "description")],
                ),
            ),
            expr_stmt(call(
                member_dot(member_dot(ident(&parsed), "mutations"), "push"),
                vec![num(line)],
            )),
            expr_stmt(assign_member(
                this_field_member(&shadow),
                call(
                    ident(TOKEN_CONSTRUCTOR),
                    vec![call(
                        member_dot(ident("JSON"), "stringify"),
                        vec![ident(&parsed)],
                    )],
                ),
            )),
        ],
        alternate: Some(ElseBranch::Block(vec![expr_stmt(assign_member(
            this_field_member(&shadow),
            token_call(&record.to_payload()),
        ))])),
        origin: Origin::Synthetic,
    })
}

/// Metadata property for one object-literal key, keyed by the interned token
/// for that key name: `[Symbol.for("<key>")]: "<record payload>"`.
pub fn metadata_prop(key: &str, line: usize) -> Prop {
    let record = MutationRecord::starting_at(line);
    Prop {
        key: PropKey::Computed(Box::new(interned_key(key))),
        value: str_lit(&record.to_payload()),
        origin: Origin::Synthetic,
    }
}

/// Pair of (value, shadow) for a rewritten return expression.
pub fn return_pair(value_ident: Ident, name: &str) -> Expr {
    let shadow = shadow_name(name);
    Expr::Array(ArrayLit {
        elements: vec![Expr::Ident(value_ident), ident(&shadow)],
        origin: Origin::Synthetic,
    })
}

// ============================================================================
// SYNTHETIC NODE BUILDERS
// ============================================================================

fn ident(name: &str) -> Expr {
    Expr::Ident(Ident::synthetic(name))
}

fn str_lit(value: &str) -> Expr {
    Expr::Str(Lit::synthetic_str(value))
}

fn num(value: usize) -> Expr {
    Expr::Number(Lit::synthetic_num(value))
}

fn bool_lit(value: bool) -> Expr {
    Expr::Bool(value, Origin::Synthetic)
}

fn member_dot(object: Expr, name: &str) -> Expr {
    Expr::Member(MemberExpr {
        object: Box::new(object),
        prop: MemberProp::Dot(name.to_string()),
        origin: Origin::Synthetic,
    })
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        callee: Box::new(callee),
        args,
        origin: Origin::Synthetic,
    })
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary(BinaryExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
        origin: Origin::Synthetic,
    })
}

/// `Symbol("<payload>")`
fn token_call(payload: &str) -> Expr {
    call(ident(TOKEN_CONSTRUCTOR), vec![str_lit(payload)])
}

/// `Symbol.for("<key>")`
fn interned_key(key: &str) -> Expr {
    call(
        member_dot(ident(TOKEN_CONSTRUCTOR), "for"),
        vec![str_lit(key)],
    )
}

/// `<object>[Symbol.for("<key>")]` as an expression.
fn property_slot(object: &str, key: &str) -> Expr {
    Expr::Member(property_slot_member(object, key))
}

fn property_slot_member(object: &str, key: &str) -> MemberExpr {
    MemberExpr {
        object: Box::new(ident(object)),
        prop: MemberProp::Computed(Box::new(interned_key(key))),
        origin: Origin::Synthetic,
    }
}

/// `this.<name>` as an expression.
fn this_field(name: &str) -> Expr {
    Expr::Member(this_field_member(name))
}

fn this_field_member(name: &str) -> MemberExpr {
    MemberExpr {
        object: Box::new(Expr::This(Origin::Synthetic)),
        prop: MemberProp::Dot(name.to_string()),
        origin: Origin::Synthetic,
    }
}

fn let_stmt(kind: DeclKind, name: &str, init: Expr) -> Stmt {
    Stmt::VarDecl(VarDecl {
        kind,
        declarators: vec![Declarator {
            target: Pattern::Ident(name.to_string()),
            ann: None,
            init: Some(init),
            origin: Origin::Synthetic,
        }],
        origin: Origin::Synthetic,
    })
}

fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(ExprStmt {
        expr,
        origin: Origin::Synthetic,
    })
}

fn assign_ident(name: &str, value: Expr) -> Expr {
    Expr::Assign(AssignExpr {
        target: AssignTarget::Ident(Ident::synthetic(name)),
        value: Box::new(value),
        origin: Origin::Synthetic,
    })
}

fn assign_member(target: MemberExpr, value: Expr) -> Expr {
    Expr::Assign(AssignExpr {
        target: AssignTarget::Member(target),
        value: Box::new(value),
        origin: Origin::Synthetic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::printer;
    use crate::syntax::Program;

    fn render(stmts: Vec<Stmt>) -> String {
        printer::print(&Program { body: stmts })
    }

    #[test]
    fn record_payload_round_trips() {
        let record = MutationRecord {
            mutations: vec![1, 4, 9],
        };
        let payload = record.to_payload();
        assert_eq!(payload, "{\"mutations\":[1,4,9]}");
        assert_eq!(MutationRecord::from_payload(&payload), Some(record));
    }

    #[test]
    fn companion_decl_shape() {
        let code = render(vec![companion_decl("a", 1)]);
        assert_eq!(
            code,
            "let a_shadow = Symbol(\"{\\\"mutations\\\":[1]}\");"
        );
    }

    #[test]
    fn extend_record_keeps_parse_push_reserialize_order() {
        let code = render(extend_record("a", 2));
        let expected = "let a_shadow_parsed = JSON.parse(a_shadow.description);\n\
                        a_shadow_parsed.mutations.push(2);\n\
                        a_shadow = Symbol(JSON.stringify(a_shadow_parsed));";
        assert_eq!(code, expected);
    }

    #[test]
    fn probe_declares_flag_then_probes_then_branches() {
        let stmts = existence_probe("a", 1);
        assert_eq!(stmts.len(), 3);
        let code = render(stmts);
        assert!(code.starts_with("let a_shadow_declared = true;"));
        assert!(code.contains("try {"));
        assert!(code.contains("e.name === \"ReferenceError\""));
        assert!(code.contains("var a_shadow = Symbol("));
    }

    #[test]
    fn every_synthesized_statement_is_positionless() {
        let mut stmts = existence_probe("x", 3);
        stmts.push(companion_decl("x", 3));
        stmts.extend(extend_record("x", 4));
        stmts.push(property_slot_update("o", "k", 5));
        stmts.push(instance_slot_update("f", 6));
        for stmt in &stmts {
            assert_eq!(stmt.pos(), None);
        }
    }

    #[test]
    fn opaque_constructor_is_only_the_token_constructor() {
        assert!(is_opaque_constructor("Symbol"));
        assert!(!is_opaque_constructor("doStuff"));
    }
}

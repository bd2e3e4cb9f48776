//! Binding index
//!
//! A lexical scope stack the rewrite engine maintains while it walks the
//! tree. It answers two boundary queries: "resolve this name to its binding,
//! if any" and "what shape did the binding's initializer have". Because the
//! index is built incrementally during the same single pass that rewrites the
//! tree, names used before their declaration resolve to nothing - that case
//! deliberately falls through to the runtime existence probe.

use std::collections::HashMap;

use crate::syntax::Expr;

/// The initializer shape of a declaration, as far as one pass can tell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InitShape {
    /// `= { ... }`
    ObjectLiteral,
    /// `= [ ... ]`
    ArrayLiteral,
    /// `= otherName` - refers to another binding; tracking it separately
    /// would double-count mutations.
    Alias,
    /// `= someCall(...)` where the callee is not the token constructor.
    CallResult,
    /// `= function ... {}` or `= (...) => ...`
    Function,
    /// Any other initializer: literals, operators, `new`, token construction.
    Value,
    /// No initializer, or `= undefined` - nothing observable to track yet.
    Absent,
}

impl InitShape {
    /// Classifies a declarator initializer. Call expressions always come back
    /// `CallResult`; the engine exempts the token constructor itself before
    /// registering.
    pub fn of(init: Option<&Expr>) -> Self {
        match init {
            None => InitShape::Absent,
            Some(expr) => Self::of_expr(expr),
        }
    }

    fn of_expr(expr: &Expr) -> Self {
        match expr {
            Expr::Object(_) => InitShape::ObjectLiteral,
            Expr::Array(_) => InitShape::ArrayLiteral,
            Expr::Ident(id) if id.name == "undefined" => InitShape::Absent,
            Expr::Ident(_) => InitShape::Alias,
            Expr::Call(_) => InitShape::CallResult,
            Expr::Func(_) | Expr::Arrow(_) => InitShape::Function,
            Expr::Paren(paren) => Self::of_expr(&paren.expr),
            _ => InitShape::Value,
        }
    }
}

/// What the index knows about one declared name.
#[derive(Debug, Clone)]
pub struct BindingInfo {
    pub shape: InitShape,
    /// Whether a companion shadow declaration is statically visible for this
    /// name (the engine sets this as it inserts companions).
    pub shadowed: bool,
}

/// Stack of lexical scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, BindingInfo>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        // The module scope at the bottom of the stack is never popped.
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Registers a name in the innermost scope.
    pub fn declare(&mut self, name: &str, shape: InitShape, shadowed: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), BindingInfo { shape, shadowed });
        }
    }

    /// Resolves a name, innermost scope outward.
    pub fn resolve(&self, name: &str) -> Option<&BindingInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Marks the nearest binding of `name` as having a visible companion.
    pub fn mark_shadowed(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(info) = scope.get_mut(name) {
                info.shadowed = true;
                return;
            }
        }
    }
}

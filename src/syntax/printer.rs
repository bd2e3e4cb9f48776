//! Umbra printer
//!
//! Renders a syntax tree back to source text. Output is normalized (two-space
//! indent, one statement per line, double-spaced nothing) rather than
//! whitespace-preserving; semantic equivalence is the contract, not byte
//! fidelity. Optionally emits a position map tying printed statement lines
//! back to original source lines.

use serde::{Deserialize, Serialize};

use crate::syntax::{
    ArrowBody, Declarator, ElseBranch, Expr, ForInit, IfStmt, MemberProp, Param, Pattern,
    Program, Prop, PropKey, Stmt, VarDecl,
};

// ============================================================================
// POSITION MAP
// ============================================================================

/// One generated-line to original-line correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMapping {
    pub generated: usize,
    pub original: usize,
}

/// Line-oriented position map: one entry per printed statement that carries a
/// source origin. Synthetic statements produce no entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMap {
    pub lines: Vec<LineMapping>,
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Print a program back to source text.
pub fn print(program: &Program) -> String {
    print_with_map(program).0
}

/// Print a program and the position map for its source-originated statements.
pub fn print_with_map(program: &Program) -> (String, PositionMap) {
    let mut printer = Printer::new();
    for stmt in &program.body {
        printer.write_stmt_line(stmt);
    }
    let Printer { mut out, map, .. } = printer;
    while out.ends_with('\n') {
        out.pop();
    }
    (out, map)
}

// ============================================================================
// PRINTER
// ============================================================================

struct Printer {
    out: String,
    indent: usize,
    line: usize,
    map: PositionMap,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            line: 1,
            map: PositionMap::default(),
        }
    }

    fn start_line(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn end_line(&mut self) {
        self.out.push('\n');
        self.line += 1;
    }

    /// Writes one statement as a full line (or lines), recording the position
    /// map entry for source-originated statements.
    fn write_stmt_line(&mut self, stmt: &Stmt) {
        if let Some(pos) = stmt.pos() {
            self.map.lines.push(LineMapping {
                generated: self.line,
                original: pos.line,
            });
        }
        self.start_line();
        self.write_stmt(stmt);
        self.end_line();
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(decl) => {
                self.write_var_decl(decl);
                self.out.push(';');
            }
            Stmt::Func(func) => {
                self.out.push_str("function ");
                self.out.push_str(&func.name);
                self.out.push('(');
                self.write_params(&func.params);
                self.out.push(')');
                if let Some(ann) = &func.ret_ann {
                    self.out.push_str(": ");
                    self.out.push_str(ann);
                }
                self.out.push(' ');
                self.write_block(&func.body);
            }
            Stmt::Class(class) => {
                self.out.push_str("class ");
                self.out.push_str(&class.name);
                self.out.push_str(" {");
                self.end_line();
                self.indent += 1;
                for method in &class.methods {
                    self.start_line();
                    self.out.push_str(&method.name);
                    self.out.push('(');
                    self.write_params(&method.params);
                    self.out.push(')');
                    if let Some(ann) = &method.ret_ann {
                        self.out.push_str(": ");
                        self.out.push_str(ann);
                    }
                    self.out.push(' ');
                    self.write_block(&method.body);
                    self.end_line();
                }
                self.indent -= 1;
                self.start_line();
                self.out.push('}');
            }
            Stmt::Return(ret) => {
                self.out.push_str("return");
                if let Some(arg) = &ret.arg {
                    self.out.push(' ');
                    self.write_expr(arg);
                }
                self.out.push(';');
            }
            Stmt::If(if_stmt) => self.write_if(if_stmt),
            Stmt::For(for_stmt) => {
                self.out.push_str("for (");
                match &for_stmt.init {
                    Some(ForInit::Decl(decl)) => self.write_var_decl(decl),
                    Some(ForInit::Expr(expr)) => self.write_expr(expr),
                    None => {}
                }
                self.out.push(';');
                if let Some(test) = &for_stmt.test {
                    self.out.push(' ');
                    self.write_expr(test);
                }
                self.out.push(';');
                if let Some(update) = &for_stmt.update {
                    self.out.push(' ');
                    self.write_expr(update);
                }
                self.out.push_str(") ");
                self.write_block(&for_stmt.body);
            }
            Stmt::Try(try_stmt) => {
                self.out.push_str("try ");
                self.write_block(&try_stmt.block);
                self.out.push_str(" catch (");
                self.out.push_str(&try_stmt.param);
                self.out.push_str(") ");
                self.write_block(&try_stmt.handler);
            }
            Stmt::Block(block) => self.write_block(&block.body),
            Stmt::Expr(expr_stmt) => {
                self.write_expr(&expr_stmt.expr);
                self.out.push(';');
            }
            Stmt::Empty(_) => self.out.push(';'),
        }
    }

    fn write_if(&mut self, if_stmt: &IfStmt) {
        self.out.push_str("if (");
        self.write_expr(&if_stmt.test);
        self.out.push_str(") ");
        self.write_block(&if_stmt.consequent);
        if let Some(alternate) = &if_stmt.alternate {
            self.out.push_str(" else ");
            match alternate {
                ElseBranch::Block(body) => self.write_block(body),
                ElseBranch::If(nested) => self.write_if(nested),
            }
        }
    }

    fn write_var_decl(&mut self, decl: &VarDecl) {
        self.out.push_str(decl.kind.as_str());
        self.out.push(' ');
        for (i, declarator) in decl.declarators.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_declarator(declarator);
        }
    }

    fn write_declarator(&mut self, declarator: &Declarator) {
        match &declarator.target {
            Pattern::Ident(name) => self.out.push_str(name),
            Pattern::Array(names) => {
                self.out.push('[');
                self.out.push_str(&names.join(", "));
                self.out.push(']');
            }
        }
        if let Some(ann) = &declarator.ann {
            self.out.push_str(": ");
            self.out.push_str(ann);
        }
        if let Some(init) = &declarator.init {
            self.out.push_str(" = ");
            self.write_expr(init);
        }
    }

    fn write_block(&mut self, body: &[Stmt]) {
        if body.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push('{');
        self.end_line();
        self.indent += 1;
        for stmt in body {
            self.write_stmt_line(stmt);
        }
        self.indent -= 1;
        self.start_line();
        self.out.push('}');
    }

    fn write_params(&mut self, params: &[Param]) {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&param.name);
            if let Some(ann) = &param.ann {
                self.out.push_str(": ");
                self.out.push_str(ann);
            }
        }
    }

    fn write_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(id) => self.out.push_str(&id.name),
            Expr::Number(lit) | Expr::Str(lit) => self.out.push_str(&lit.raw),
            Expr::Bool(value, _) => self.out.push_str(if *value { "true" } else { "false" }),
            Expr::Null(_) => self.out.push_str("null"),
            Expr::This(_) => self.out.push_str("this"),
            Expr::Array(array) => {
                self.out.push('[');
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_expr(element);
                }
                self.out.push(']');
            }
            Expr::Object(object) => {
                if object.props.is_empty() {
                    self.out.push_str("{}");
                    return;
                }
                self.out.push_str("{ ");
                for (i, prop) in object.props.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_prop(prop);
                }
                self.out.push_str(" }");
            }
            Expr::Func(func) => {
                self.out.push_str("function ");
                if let Some(name) = &func.name {
                    self.out.push_str(name);
                }
                self.out.push('(');
                self.write_params(&func.params);
                self.out.push(')');
                if let Some(ann) = &func.ret_ann {
                    self.out.push_str(": ");
                    self.out.push_str(ann);
                }
                self.out.push(' ');
                self.write_block(&func.body);
            }
            Expr::Arrow(arrow) => {
                self.out.push('(');
                self.write_params(&arrow.params);
                self.out.push_str(") => ");
                match &arrow.body {
                    ArrowBody::Block(body) => self.write_block(body),
                    ArrowBody::Expr(expr) => self.write_expr(expr),
                }
            }
            Expr::Member(member) => {
                self.write_expr(&member.object);
                match &member.prop {
                    MemberProp::Dot(name) => {
                        self.out.push('.');
                        self.out.push_str(name);
                    }
                    MemberProp::Computed(index) => {
                        self.out.push('[');
                        self.write_expr(index);
                        self.out.push(']');
                    }
                }
            }
            Expr::Call(call) => {
                self.write_expr(&call.callee);
                self.write_args(&call.args);
            }
            Expr::New(new) => {
                self.out.push_str("new ");
                self.write_expr(&new.callee);
                self.write_args(&new.args);
            }
            Expr::Assign(assign) => {
                match &assign.target {
                    crate::syntax::AssignTarget::Ident(id) => self.out.push_str(&id.name),
                    crate::syntax::AssignTarget::Member(member) => {
                        self.write_expr(&Expr::Member(member.clone()));
                    }
                    crate::syntax::AssignTarget::Array(names, _) => {
                        self.out.push('[');
                        self.out.push_str(&names.join(", "));
                        self.out.push(']');
                    }
                }
                self.out.push_str(" = ");
                self.write_expr(&assign.value);
            }
            Expr::Binary(binary) => {
                self.write_expr(&binary.left);
                self.out.push(' ');
                self.out.push_str(binary.op.as_str());
                self.out.push(' ');
                self.write_expr(&binary.right);
            }
            Expr::Unary(unary) => {
                self.out.push_str(unary.op.as_str());
                if unary.op.is_word() {
                    self.out.push(' ');
                }
                self.write_expr(&unary.arg);
            }
            Expr::Update(update) => {
                if update.prefix {
                    self.out.push_str(update.op.as_str());
                    self.write_expr(&update.arg);
                } else {
                    self.write_expr(&update.arg);
                    self.out.push_str(update.op.as_str());
                }
            }
            Expr::Paren(paren) => {
                self.out.push('(');
                self.write_expr(&paren.expr);
                self.out.push(')');
            }
        }
    }

    fn write_prop(&mut self, prop: &Prop) {
        match &prop.key {
            PropKey::Ident(name) => self.out.push_str(name),
            PropKey::Str(raw) => self.out.push_str(raw),
            PropKey::Computed(expr) => {
                self.out.push('[');
                self.write_expr(expr);
                self.out.push(']');
            }
        }
        self.out.push_str(": ");
        self.write_expr(&prop.value);
    }

    fn write_args(&mut self, args: &[Expr]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_expr(arg);
        }
        self.out.push(')');
    }
}

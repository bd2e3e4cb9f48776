//! Rewrite engine
//!
//! The single depth-first traversal that instruments a parsed program. One
//! rule per syntactic shape; every rule checks the node's origin first and
//! only fires on source-positioned nodes. Sibling statements synthesized by
//! the shadow-state policy are spliced in immediately after the statement
//! that produced them, in traversal order, so mutation records always
//! reflect source order.
//!
//! The traversal deliberately revisits the statements it inserts: the origin
//! guard, not index arithmetic, is what terminates instrumentation. That
//! invariant is covered by regression tests.

pub mod shadow;

use crate::analysis::{classify, InitShape, ScopeStack, Verdict};
use crate::errors::{ErrorReporting, PhaseContext, SourceContext, UmbraError};
use crate::syntax::{
    ArrowFunc, AssignExpr, AssignTarget, CallExpr, ClassDecl, ElseBranch, Expr, ExprStmt,
    ForInit, ForStmt, Ident, IfStmt, MemberProp, ObjectLit, Origin, Param, Pattern, Pos, Program,
    ReturnStmt, Stmt, TryStmt, VarDecl,
};

/// Rewrites the program in place, threading shadow companions through every
/// tracked declaration, assignment, function boundary, return, object
/// literal, and instance field write.
pub fn rewrite(program: &mut Program, source: &SourceContext) -> Result<(), UmbraError> {
    let mut engine = RewriteEngine::new(source);
    engine.visit_stmt_list(&mut program.body)
}

struct RewriteEngine {
    scopes: ScopeStack,
    ctx: PhaseContext,
}

impl RewriteEngine {
    fn new(source: &SourceContext) -> Self {
        Self {
            scopes: ScopeStack::new(),
            ctx: PhaseContext::new(source.clone(), "rewrite"),
        }
    }

    // ------------------------------------------------------------------------
    // Statement traversal
    // ------------------------------------------------------------------------

    fn visit_stmt_list(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), UmbraError> {
        let mut i = 0;
        while i < stmts.len() {
            let inserted = self.visit_stmt(&mut stmts[i])?;
            for (offset, stmt) in inserted.into_iter().enumerate() {
                stmts.insert(i + 1 + offset, stmt);
            }
            i += 1;
        }
        Ok(())
    }

    /// Visits one statement, returning siblings to insert immediately after
    /// it. Nodes without a source position are skipped outright - this guard
    /// is the sole termination mechanism of the traversal.
    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<Vec<Stmt>, UmbraError> {
        let Some(pos) = stmt.pos() else {
            return Ok(vec![]);
        };

        match stmt {
            Stmt::VarDecl(decl) => self.visit_var_decl(decl),
            Stmt::Func(func) => {
                self.scopes.declare(&func.name, InitShape::Function, false);
                self.visit_function(&mut func.params, &mut func.body)?;
                Ok(vec![])
            }
            Stmt::Class(class) => self.visit_class(class),
            Stmt::Return(ret) => self.visit_return(ret),
            Stmt::If(if_stmt) => {
                self.visit_if(if_stmt)?;
                Ok(vec![])
            }
            Stmt::For(for_stmt) => {
                self.visit_for(for_stmt)?;
                Ok(vec![])
            }
            Stmt::Try(try_stmt) => {
                self.visit_try(try_stmt)?;
                Ok(vec![])
            }
            Stmt::Block(block) => {
                self.scopes.push();
                self.visit_stmt_list(&mut block.body)?;
                self.scopes.pop();
                Ok(vec![])
            }
            Stmt::Expr(expr_stmt) => self.visit_expr_stmt(expr_stmt, pos),
            Stmt::Empty(_) => Ok(vec![]),
        }
    }

    fn visit_var_decl(&mut self, decl: &mut VarDecl) -> Result<Vec<Stmt>, UmbraError> {
        let mut inserted = Vec::new();

        for declarator in &mut decl.declarators {
            let Some(pos) = declarator.origin.pos() else {
                continue;
            };

            if let Some(init) = &mut declarator.init {
                self.visit_expr(init)?;
            }

            let name = match &declarator.target {
                Pattern::Ident(name) => name.clone(),
                Pattern::Array(names) => {
                    // A source-level destructuring target leaves no single
                    // name to derive a shadow from; if the initializer is a
                    // tracked call this is fatal rather than silently wrong.
                    if is_tracked_call(declarator.init.as_ref()) {
                        return Err(self.ctx.missing_identifier(
                            "destructuring declaration",
                            self.ctx.span_at(pos),
                        ));
                    }
                    for n in names {
                        self.scopes.declare(n, InitShape::Value, false);
                    }
                    continue;
                }
            };

            match InitShape::of(declarator.init.as_ref()) {
                InitShape::Absent => {
                    // Nothing observable to track yet; identity transform.
                    self.scopes.declare(&name, InitShape::Absent, false);
                }
                shape @ (InitShape::ObjectLiteral | InitShape::Alias | InitShape::Function) => {
                    self.scopes.declare(&name, shape, false);
                }
                InitShape::CallResult => {
                    if is_tracked_call(declarator.init.as_ref()) {
                        declarator.target =
                            Pattern::Array(vec![name.clone(), shadow::shadow_name(&name)]);
                        declarator.origin = Origin::Synthetic;
                        self.scopes.declare(&name, InitShape::CallResult, true);
                        inserted.extend(shadow::extend_record(&name, pos.line));
                    } else {
                        // Token construction: an ordinary primitive binding.
                        self.scopes.declare(&name, InitShape::Value, true);
                        inserted.push(shadow::companion_decl(&name, pos.line));
                    }
                }
                shape @ (InitShape::ArrayLiteral | InitShape::Value) => {
                    self.scopes.declare(&name, shape, true);
                    inserted.push(shadow::companion_decl(&name, pos.line));
                }
            }
        }

        Ok(inserted)
    }

    fn visit_class(&mut self, class: &mut ClassDecl) -> Result<Vec<Stmt>, UmbraError> {
        self.scopes.declare(&class.name, InitShape::Function, false);
        for method in &mut class.methods {
            if !method.origin.is_source() {
                continue;
            }
            // Method parameters stay untouched; instance fields are tracked
            // through `this.<field>_shadow` slots instead.
            self.scopes.push();
            for param in &method.params {
                self.scopes.declare(&param.name, InitShape::Value, false);
            }
            self.visit_stmt_list(&mut method.body)?;
            self.scopes.pop();
        }
        Ok(vec![])
    }

    fn visit_return(&mut self, ret: &mut ReturnStmt) -> Result<Vec<Stmt>, UmbraError> {
        let Some(arg) = &mut ret.arg else {
            return Ok(vec![]);
        };
        let returned_ident = match &*arg {
            Expr::Ident(id) if id.origin.is_source() => Some(id.clone()),
            _ => None,
        };
        match returned_ident {
            Some(id) => {
                let (verdict, shadowed) = self.lookup(&id.name);
                if verdict == Verdict::Primitive && shadowed {
                    let name = id.name.clone();
                    *arg = shadow::return_pair(id, &name);
                }
            }
            None => self.visit_expr(arg)?,
        }
        Ok(vec![])
    }

    fn visit_if(&mut self, if_stmt: &mut IfStmt) -> Result<(), UmbraError> {
        self.visit_expr(&mut if_stmt.test)?;
        self.scopes.push();
        self.visit_stmt_list(&mut if_stmt.consequent)?;
        self.scopes.pop();
        match &mut if_stmt.alternate {
            Some(ElseBranch::Block(body)) => {
                self.scopes.push();
                self.visit_stmt_list(body)?;
                self.scopes.pop();
            }
            Some(ElseBranch::If(nested)) => self.visit_if(nested)?,
            None => {}
        }
        Ok(())
    }

    fn visit_for(&mut self, for_stmt: &mut ForStmt) -> Result<(), UmbraError> {
        self.scopes.push();
        match &mut for_stmt.init {
            // The loop head's own declarators are structural: registered so
            // the body can resolve them, never instrumented themselves.
            Some(ForInit::Decl(decl)) => {
                for declarator in &decl.declarators {
                    if let Pattern::Ident(name) = &declarator.target {
                        self.scopes
                            .declare(name, InitShape::of(declarator.init.as_ref()), false);
                    }
                }
            }
            Some(ForInit::Expr(expr)) => self.visit_expr(expr)?,
            None => {}
        }
        if let Some(test) = &mut for_stmt.test {
            self.visit_expr(test)?;
        }
        if let Some(update) = &mut for_stmt.update {
            self.visit_expr(update)?;
        }
        self.visit_stmt_list(&mut for_stmt.body)?;
        self.scopes.pop();
        Ok(())
    }

    fn visit_try(&mut self, try_stmt: &mut TryStmt) -> Result<(), UmbraError> {
        self.scopes.push();
        self.visit_stmt_list(&mut try_stmt.block)?;
        self.scopes.pop();
        self.scopes.push();
        self.scopes
            .declare(&try_stmt.param, InitShape::Value, false);
        self.visit_stmt_list(&mut try_stmt.handler)?;
        self.scopes.pop();
        Ok(())
    }

    fn visit_expr_stmt(
        &mut self,
        stmt: &mut ExprStmt,
        pos: Pos,
    ) -> Result<Vec<Stmt>, UmbraError> {
        match &mut stmt.expr {
            Expr::Assign(assign) => self.visit_assignment(assign, pos),
            Expr::Call(call) => {
                if let Some(array_name) = self.array_mutation_target(call) {
                    // Method-style mutation call on an array binding: treated
                    // identically to a primitive reassignment. No distinction
                    // is made between mutating and non-mutating methods.
                    for arg in &mut call.args {
                        self.visit_expr(arg)?;
                    }
                    return Ok(shadow::extend_record(&array_name, pos.line));
                }
                self.visit_call(call)?;
                Ok(vec![])
            }
            other => {
                self.visit_expr(other)?;
                Ok(vec![])
            }
        }
    }

    fn visit_assignment(
        &mut self,
        assign: &mut AssignExpr,
        pos: Pos,
    ) -> Result<Vec<Stmt>, UmbraError> {
        self.visit_expr(&mut assign.value)?;

        let value_is_tracked_call = is_tracked_call(Some(&assign.value));

        let target_name = match &assign.target {
            AssignTarget::Ident(id) => Some(id.name.clone()),
            _ => None,
        };

        if let Some(name) = target_name {
            if value_is_tracked_call {
                // Compose the callee's returned shadow with this site's
                // usage: destructure the pair, then extend the record.
                assign.target = AssignTarget::Array(
                    vec![name.clone(), shadow::shadow_name(&name)],
                    Origin::Synthetic,
                );
                assign.origin = Origin::Synthetic;
                self.scopes.mark_shadowed(&name);
                return Ok(shadow::extend_record(&name, pos.line));
            }

            let (verdict, shadowed) = self.lookup(&name);
            return match verdict {
                Verdict::Primitive => {
                    if shadowed {
                        Ok(shadow::extend_record(&name, pos.line))
                    } else {
                        self.scopes.mark_shadowed(&name);
                        Ok(vec![shadow::companion_decl(&name, pos.line)])
                    }
                }
                Verdict::ObjectLike | Verdict::Alias => Ok(vec![]),
                Verdict::Unknown => Ok(shadow::existence_probe(&name, pos.line)),
            };
        }

        match &assign.target {
            AssignTarget::Member(member) => match (member.object.as_ref(), &member.prop) {
                (Expr::This(_), MemberProp::Dot(field)) => {
                    Ok(vec![shadow::instance_slot_update(field, pos.line)])
                }
                (Expr::Ident(object), MemberProp::Dot(prop)) => Ok(vec![
                    shadow::property_slot_update(&object.name, prop, pos.line),
                ]),
                // Computed and nested member targets are outside the covered
                // subset; left untouched.
                _ => Ok(vec![]),
            },
            AssignTarget::Ident(_) | AssignTarget::Array(..) => Ok(vec![]),
        }
    }

    // ------------------------------------------------------------------------
    // Expression traversal
    // ------------------------------------------------------------------------

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), UmbraError> {
        match expr {
            Expr::Object(object) => self.visit_object(object),
            Expr::Func(func) => {
                if func.origin.is_source() {
                    self.visit_function(&mut func.params, &mut func.body)?;
                }
                Ok(())
            }
            Expr::Arrow(arrow) => self.visit_arrow(arrow),
            Expr::Call(call) => self.visit_call(call),
            Expr::New(new) => {
                for arg in &mut new.args {
                    self.visit_expr(arg)?;
                }
                Ok(())
            }
            Expr::Member(member) => self.visit_expr(&mut member.object),
            // Assignments nested inside expressions have no statement list to
            // host companions; only their value side is traversed.
            Expr::Assign(assign) => self.visit_expr(&mut assign.value),
            Expr::Binary(binary) => {
                self.visit_expr(&mut binary.left)?;
                self.visit_expr(&mut binary.right)
            }
            Expr::Unary(unary) => self.visit_expr(&mut unary.arg),
            Expr::Update(update) => self.visit_expr(&mut update.arg),
            Expr::Paren(paren) => self.visit_expr(&mut paren.expr),
            Expr::Array(array) => {
                for element in &mut array.elements {
                    self.visit_expr(element)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit_object(&mut self, object: &mut ObjectLit) -> Result<(), UmbraError> {
        if let Some(pos) = object.origin.pos() {
            // One metadata slot per original property, each inserted at the
            // front in declaration order, so the final front-to-back order is
            // the reverse of the declaration order.
            let keys: Vec<String> = object
                .props
                .iter()
                .filter(|p| p.origin.is_source())
                .filter_map(|p| p.key.plain_name().map(str::to_string))
                .collect();
            for key in keys {
                object.props.insert(0, shadow::metadata_prop(&key, pos.line));
            }
        }
        for prop in &mut object.props {
            if prop.origin.is_source() {
                self.visit_expr(&mut prop.value)?;
            }
        }
        Ok(())
    }

    fn visit_function(
        &mut self,
        params: &mut Vec<Param>,
        body: &mut Vec<Stmt>,
    ) -> Result<(), UmbraError> {
        self.instrument_params(params);
        self.scopes.push();
        self.declare_params(params);
        self.visit_stmt_list(body)?;
        self.scopes.pop();
        Ok(())
    }

    fn visit_arrow(&mut self, arrow: &mut ArrowFunc) -> Result<(), UmbraError> {
        if !arrow.origin.is_source() {
            return Ok(());
        }
        self.instrument_params(&mut arrow.params);
        self.scopes.push();
        self.declare_params(&arrow.params);
        match &mut arrow.body {
            crate::syntax::ArrowBody::Block(body) => self.visit_stmt_list(body)?,
            crate::syntax::ArrowBody::Expr(expr) => self.visit_expr(expr)?,
        }
        self.scopes.pop();
        Ok(())
    }

    /// Appends a shadow parameter immediately after each source-originated
    /// parameter, preserving pairing order.
    fn instrument_params(&mut self, params: &mut Vec<Param>) {
        let mut i = 0;
        while i < params.len() {
            if params[i].origin.is_source() {
                let shadow = shadow::shadow_name(&params[i].name);
                params.insert(
                    i + 1,
                    Param {
                        name: shadow,
                        ann: None,
                        origin: Origin::Synthetic,
                    },
                );
                i += 2;
            } else {
                i += 1;
            }
        }
    }

    fn declare_params(&mut self, params: &[Param]) {
        for param in params {
            if param.origin.is_source() {
                self.scopes.declare(&param.name, InitShape::Value, true);
            }
        }
    }

    fn visit_call(&mut self, call: &mut CallExpr) -> Result<(), UmbraError> {
        self.visit_expr(&mut call.callee)?;
        for arg in &mut call.args {
            self.visit_expr(arg)?;
        }
        if call.origin.is_source() {
            self.add_shadow_args(call);
        }
        Ok(())
    }

    /// Appends a matching shadow argument after every plain-identifier
    /// argument whose binding classifies PRIMITIVE and has a visible
    /// companion. Unresolvable names are silently skipped.
    fn add_shadow_args(&mut self, call: &mut CallExpr) {
        let eligible = match call.callee.as_ref() {
            Expr::Ident(id) => !shadow::is_opaque_constructor(&id.name),
            Expr::Member(_) => true,
            _ => false,
        };
        if !eligible {
            return;
        }

        let mut i = 0;
        while i < call.args.len() {
            let shadow_arg = match &call.args[i] {
                Expr::Ident(id) if id.origin.is_source() => {
                    let (verdict, shadowed) = self.lookup(&id.name);
                    if verdict == Verdict::Primitive && shadowed {
                        Some(shadow::shadow_name(&id.name))
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some(name) = shadow_arg {
                call.args.insert(i + 1, Expr::Ident(Ident::synthetic(name)));
                i += 2;
            } else {
                i += 1;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    fn lookup(&self, name: &str) -> (Verdict, bool) {
        let binding = self.scopes.resolve(name);
        let shadowed = binding.map(|b| b.shadowed).unwrap_or(false);
        (classify(binding), shadowed)
    }

    /// True when the callee of a member-method call resolves to an
    /// array-literal binding with a visible companion.
    fn array_mutation_target(&self, call: &CallExpr) -> Option<String> {
        let Expr::Member(member) = call.callee.as_ref() else {
            return None;
        };
        let MemberProp::Dot(_) = &member.prop else {
            return None;
        };
        let Expr::Ident(object) = member.object.as_ref() else {
            return None;
        };
        let info = self.scopes.resolve(&object.name)?;
        if info.shape == InitShape::ArrayLiteral && info.shadowed {
            Some(object.name.clone())
        } else {
            None
        }
    }
}

/// True when the initializer is a call expression whose callee is not an
/// opaque token construction. Parenthesized calls count too.
fn is_tracked_call(init: Option<&Expr>) -> bool {
    match init {
        Some(Expr::Call(call)) => match call.callee.as_ref() {
            Expr::Ident(id) => !shadow::is_opaque_constructor(&id.name),
            Expr::Member(_) => true,
            _ => false,
        },
        Some(Expr::Paren(paren)) => is_tracked_call(Some(&paren.expr)),
        _ => false,
    }
}

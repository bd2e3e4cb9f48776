//! Umbra parser
//!
//! Converts source text in the supported JavaScript subset into the syntax
//! tree of `crate::syntax`, with per-node source positions. This parser is
//! purely syntactic - no binding resolution or classification happens here.

use miette::SourceSpan;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::errors::{ErrorReporting, PhaseContext, SourceContext, UmbraError};
use crate::syntax::{
    ArrayLit, ArrowBody, ArrowFunc, AssignExpr, AssignTarget, BinOp, BinaryExpr, BlockStmt,
    CallExpr, ClassDecl, ClassMethod, DeclKind, Declarator, ElseBranch, Expr, ExprStmt, ForInit,
    ForStmt, FuncDecl, FuncExpr, Ident, IfStmt, Lit, MemberExpr, MemberProp, NewExpr, ObjectLit,
    Origin, Param, ParenExpr, Pattern, Pos, Program, Prop, PropKey, ReturnStmt, Stmt, TryStmt,
    UnOp, UnaryExpr, UpdateExpr, UpdateOp, VarDecl,
};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct UmbraParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse source text into a `Program`.
pub fn parse(source_text: &str, source: &SourceContext) -> Result<Program, UmbraError> {
    let ctx = PhaseContext::new(source.clone(), "parse");

    if source_text.trim().is_empty() {
        return Ok(Program { body: vec![] });
    }

    let mut pairs = UmbraParser::parse(Rule::program, source_text)
        .map_err(|e| convert_parse_error(e, &ctx))?;

    let program = pairs.next().ok_or_else(|| {
        ctx.malformed_construct("program", crate::errors::unspanned())
    })?;

    let body = program
        .into_inner()
        .filter(|p| p.as_rule() == Rule::stmt)
        .map(|p| build_stmt(p, &ctx))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program { body })
}

// ============================================================================
// STATEMENT BUILDERS
// ============================================================================

fn source_origin(pair: &Pair<Rule>) -> Origin {
    let (line, column) = pair.as_span().start_pos().line_col();
    Origin::Source(Pos { line, column })
}

fn build_stmt(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Stmt, UmbraError> {
    let inner = first_inner(pair, ctx)?;
    match inner.as_rule() {
        Rule::var_decl_stmt => Ok(Stmt::VarDecl(build_var_decl(inner, ctx, false)?)),
        Rule::func_decl => build_func_decl(inner, ctx),
        Rule::class_decl => build_class_decl(inner, ctx),
        Rule::return_stmt => {
            let origin = source_origin(&inner);
            let arg = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::assign_expr)
                .map(|p| build_expr(p, ctx))
                .transpose()?;
            Ok(Stmt::Return(ReturnStmt { arg, origin }))
        }
        Rule::if_stmt => Ok(Stmt::If(build_if_stmt(inner, ctx)?)),
        Rule::for_stmt => build_for_stmt(inner, ctx),
        Rule::try_stmt => build_try_stmt(inner, ctx),
        Rule::block_stmt => {
            let origin = source_origin(&inner);
            let block = first_inner(inner, ctx)?;
            Ok(Stmt::Block(BlockStmt {
                body: build_block(block, ctx)?,
                origin,
            }))
        }
        Rule::empty_stmt => Ok(Stmt::Empty(source_origin(&inner))),
        Rule::expr_stmt => {
            let origin = source_origin(&inner);
            let expr = build_expr(first_inner(inner, ctx)?, ctx)?;
            Ok(Stmt::Expr(ExprStmt { expr, origin }))
        }
        other => Err(unexpected_rule(other, &inner, ctx)),
    }
}

/// Builds a `var`/`let`/`const` declaration. `structural` marks `for`-head
/// declarations, which carry no instrumentable position by design.
fn build_var_decl(
    pair: Pair<Rule>,
    ctx: &PhaseContext,
    structural: bool,
) -> Result<VarDecl, UmbraError> {
    let origin = if structural {
        Origin::Structural
    } else {
        source_origin(&pair)
    };

    let mut kind = DeclKind::Let;
    let mut declarators = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::decl_kind => {
                kind = match p.as_str().trim() {
                    "var" => DeclKind::Var,
                    "const" => DeclKind::Const,
                    _ => DeclKind::Let,
                };
            }
            Rule::declarator => declarators.push(build_declarator(p, ctx, structural)?),
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }

    Ok(VarDecl {
        kind,
        declarators,
        origin,
    })
}

fn build_declarator(
    pair: Pair<Rule>,
    ctx: &PhaseContext,
    structural: bool,
) -> Result<Declarator, UmbraError> {
    let origin = if structural {
        Origin::Structural
    } else {
        source_origin(&pair)
    };

    let mut target = None;
    let mut ann = None;
    let mut init = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::binding_target => {
                let t = first_inner(p, ctx)?;
                target = Some(match t.as_rule() {
                    Rule::ident => Pattern::Ident(t.as_str().to_string()),
                    Rule::array_pattern => Pattern::Array(pattern_names(t)),
                    other => return Err(unexpected_rule(other, &t, ctx)),
                });
            }
            Rule::type_ann => ann = Some(annotation_text(p)),
            Rule::assign_op => {}
            Rule::assign_expr => init = Some(build_expr(p, ctx)?),
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }

    let target = target
        .ok_or_else(|| ctx.malformed_construct("declarator", crate::errors::unspanned()))?;
    Ok(Declarator {
        target,
        ann,
        init,
        origin,
    })
}

fn pattern_names(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .collect()
}

fn annotation_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().trim().to_string())
        .unwrap_or_default()
}

fn build_func_decl(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Stmt, UmbraError> {
    let origin = source_origin(&pair);
    let mut name = String::new();
    let mut params = Vec::new();
    let mut ret_ann = None;
    let mut body = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_function => {}
            Rule::ident => name = p.as_str().to_string(),
            Rule::param_clause => params = build_params(p, ctx)?,
            Rule::type_ann => ret_ann = Some(annotation_text(p)),
            Rule::block => body = build_block(p, ctx)?,
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    Ok(Stmt::Func(FuncDecl {
        name,
        params,
        ret_ann,
        body,
        origin,
    }))
}

fn build_params(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Vec<Param>, UmbraError> {
    let mut params = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::param => {
                let origin = source_origin(&p);
                let mut name = String::new();
                let mut ann = None;
                for q in p.into_inner() {
                    match q.as_rule() {
                        Rule::ident => name = q.as_str().to_string(),
                        Rule::type_ann => ann = Some(annotation_text(q)),
                        other => return Err(unexpected_rule(other, &q, ctx)),
                    }
                }
                params.push(Param { name, ann, origin });
            }
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    Ok(params)
}

fn build_class_decl(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Stmt, UmbraError> {
    let origin = source_origin(&pair);
    let mut name = String::new();
    let mut methods = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_class => {}
            Rule::ident => name = p.as_str().to_string(),
            Rule::class_method => {
                let method_origin = source_origin(&p);
                let mut method_name = String::new();
                let mut params = Vec::new();
                let mut ret_ann = None;
                let mut body = Vec::new();
                for q in p.into_inner() {
                    match q.as_rule() {
                        Rule::ident => method_name = q.as_str().to_string(),
                        Rule::param_clause => params = build_params(q, ctx)?,
                        Rule::type_ann => ret_ann = Some(annotation_text(q)),
                        Rule::block => body = build_block(q, ctx)?,
                        other => return Err(unexpected_rule(other, &q, ctx)),
                    }
                }
                methods.push(ClassMethod {
                    name: method_name,
                    params,
                    ret_ann,
                    body,
                    origin: method_origin,
                });
            }
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    Ok(Stmt::Class(ClassDecl {
        name,
        methods,
        origin,
    }))
}

fn build_if_stmt(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<IfStmt, UmbraError> {
    let origin = source_origin(&pair);
    let mut test = None;
    let mut consequent = Vec::new();
    let mut alternate = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::expr => test = Some(build_expr(p, ctx)?),
            Rule::block => consequent = build_block(p, ctx)?,
            Rule::else_clause => {
                let span = pest_span(&p);
                let inner = p
                    .into_inner()
                    .find(|c| c.as_rule() != Rule::kw_else)
                    .ok_or_else(|| ctx.malformed_construct("else_clause", span))?;
                alternate = Some(match inner.as_rule() {
                    Rule::if_stmt => ElseBranch::If(Box::new(build_if_stmt(inner, ctx)?)),
                    Rule::block => ElseBranch::Block(build_block(inner, ctx)?),
                    other => return Err(unexpected_rule(other, &inner, ctx)),
                });
            }
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    let test =
        test.ok_or_else(|| ctx.malformed_construct("if statement", crate::errors::unspanned()))?;
    Ok(IfStmt {
        test,
        consequent,
        alternate,
        origin,
    })
}

fn build_for_stmt(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Stmt, UmbraError> {
    let origin = source_origin(&pair);
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::for_init => {
                let inner = first_inner(p, ctx)?;
                init = Some(match inner.as_rule() {
                    Rule::for_decl => ForInit::Decl(build_var_decl(inner, ctx, true)?),
                    Rule::expr => ForInit::Expr(build_expr(inner, ctx)?),
                    other => return Err(unexpected_rule(other, &inner, ctx)),
                });
            }
            Rule::for_test => test = Some(build_expr(first_inner(p, ctx)?, ctx)?),
            Rule::for_update => update = Some(build_expr(first_inner(p, ctx)?, ctx)?),
            Rule::block => body = build_block(p, ctx)?,
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    Ok(Stmt::For(ForStmt {
        init,
        test,
        update,
        body,
        origin,
    }))
}

fn build_try_stmt(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Stmt, UmbraError> {
    let origin = source_origin(&pair);
    let mut blocks = Vec::new();
    let mut param = String::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::block => blocks.push(build_block(p, ctx)?),
            Rule::ident => param = p.as_str().to_string(),
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    if blocks.len() != 2 {
        return Err(ctx.malformed_construct("try statement", crate::errors::unspanned()));
    }
    let handler = blocks.pop().unwrap_or_default();
    let block = blocks.pop().unwrap_or_default();
    Ok(Stmt::Try(TryStmt {
        block,
        param,
        handler,
        origin,
    }))
}

fn build_block(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Vec<Stmt>, UmbraError> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::stmt)
        .map(|p| build_stmt(p, ctx))
        .collect()
}

// ============================================================================
// EXPRESSION BUILDERS
// ============================================================================

fn build_expr(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    match pair.as_rule() {
        Rule::expr | Rule::assign_expr | Rule::conditional | Rule::primary | Rule::literal => {
            build_expr(first_inner(pair, ctx)?, ctx)
        }

        Rule::assignment => build_assignment(pair, ctx),
        Rule::arrow_func => build_arrow(pair, ctx),

        Rule::logical_or | Rule::logical_and | Rule::equality | Rule::relational
        | Rule::additive | Rule::multiplicative => build_binary_chain(pair, ctx),
        Rule::exponent => build_exponent(pair, ctx),

        Rule::unary => build_unary(pair, ctx),
        Rule::update_prefix => {
            let origin = source_origin(&pair);
            let mut inner = pair.into_inner();
            let op_pair = inner
                .next()
                .ok_or_else(|| ctx.malformed_construct("update", crate::errors::unspanned()))?;
            let op = update_op(op_pair.as_str());
            let arg = build_expr(
                inner.next().ok_or_else(|| {
                    ctx.malformed_construct("update", crate::errors::unspanned())
                })?,
                ctx,
            )?;
            Ok(Expr::Update(UpdateExpr {
                op,
                arg: Box::new(arg),
                prefix: true,
                origin,
            }))
        }
        Rule::postfix_expr => build_postfix(pair, ctx),

        Rule::func_expr => build_func_expr(pair, ctx),
        Rule::new_expr => build_new_expr(pair, ctx),
        Rule::this_expr => Ok(Expr::This(source_origin(&pair))),
        Rule::paren_expr => {
            let origin = source_origin(&pair);
            let inner = build_expr(first_inner(pair, ctx)?, ctx)?;
            Ok(Expr::Paren(ParenExpr {
                expr: Box::new(inner),
                origin,
            }))
        }
        Rule::array_lit => {
            let origin = source_origin(&pair);
            let elements = pair
                .into_inner()
                .map(|p| build_expr(p, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Array(ArrayLit { elements, origin }))
        }
        Rule::object_lit => build_object_lit(pair, ctx),

        Rule::ident => Ok(Expr::Ident(Ident {
            name: pair.as_str().to_string(),
            origin: source_origin(&pair),
        })),
        Rule::number => Ok(Expr::Number(Lit {
            raw: pair.as_str().to_string(),
            origin: source_origin(&pair),
        })),
        Rule::string => Ok(Expr::Str(Lit {
            raw: pair.as_str().to_string(),
            origin: source_origin(&pair),
        })),
        Rule::boolean => Ok(Expr::Bool(pair.as_str().trim() == "true", source_origin(&pair))),
        Rule::null_lit => Ok(Expr::Null(source_origin(&pair))),

        other => Err(unexpected_rule(other, &pair, ctx)),
    }
}

fn build_assignment(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let span = pest_span(&pair);
    let mut target = None;
    let mut value = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::assign_target => {
                let inner = first_inner(p, ctx)?;
                target = Some(match inner.as_rule() {
                    Rule::array_pattern => {
                        let pat_origin = source_origin(&inner);
                        AssignTarget::Array(pattern_names(inner), pat_origin)
                    }
                    Rule::postfix_expr => match build_postfix(inner, ctx)? {
                        Expr::Ident(id) => AssignTarget::Ident(id),
                        Expr::Member(m) => AssignTarget::Member(m),
                        _ => {
                            return Err(ctx.malformed_construct("assignment target", span));
                        }
                    },
                    other => return Err(unexpected_rule(other, &inner, ctx)),
                });
            }
            Rule::assign_op => {}
            Rule::assign_expr => value = Some(build_expr(p, ctx)?),
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    match (target, value) {
        (Some(target), Some(value)) => Ok(Expr::Assign(AssignExpr {
            target,
            value: Box::new(value),
            origin,
        })),
        _ => Err(ctx.malformed_construct("assignment", span)),
    }
}

fn build_arrow(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let mut params = Vec::new();
    let mut body = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::param_clause => params = build_params(p, ctx)?,
            Rule::arrow_single_param => {
                let id = first_inner(p, ctx)?;
                let param_origin = source_origin(&id);
                params = vec![Param {
                    name: id.as_str().to_string(),
                    ann: None,
                    origin: param_origin,
                }];
            }
            Rule::block => body = Some(ArrowBody::Block(build_block(p, ctx)?)),
            Rule::assign_expr => body = Some(ArrowBody::Expr(Box::new(build_expr(p, ctx)?))),
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    let body = body
        .ok_or_else(|| ctx.malformed_construct("arrow function", crate::errors::unspanned()))?;
    Ok(Expr::Arrow(ArrowFunc {
        params,
        body,
        origin,
    }))
}

fn build_binary_chain(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ctx.malformed_construct("expression", crate::errors::unspanned()))?;
    let mut acc = build_expr(first, ctx)?;
    while let Some(op_pair) = inner.next() {
        let op = binary_op(op_pair.as_str().trim());
        let rhs = build_expr(
            inner.next().ok_or_else(|| {
                ctx.malformed_construct("binary expression", crate::errors::unspanned())
            })?,
            ctx,
        )?;
        acc = Expr::Binary(BinaryExpr {
            op,
            left: Box::new(acc),
            right: Box::new(rhs),
            origin,
        });
    }
    Ok(acc)
}

/// `**` is right-associative; fold the flat chain from the right.
fn build_exponent(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let operands = pair
        .into_inner()
        .filter(|p| p.as_rule() != Rule::pow_op)
        .map(|p| build_expr(p, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    let mut iter = operands.into_iter().rev();
    let mut acc = iter
        .next()
        .ok_or_else(|| ctx.malformed_construct("expression", crate::errors::unspanned()))?;
    for lhs in iter {
        acc = Expr::Binary(BinaryExpr {
            op: BinOp::Pow,
            left: Box::new(lhs),
            right: Box::new(acc),
            origin,
        });
    }
    Ok(acc)
}

fn build_unary(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ctx.malformed_construct("expression", crate::errors::unspanned()))?;
    match first.as_rule() {
        Rule::un_op => {
            let op = match first.as_str().trim() {
                "!" => UnOp::Not,
                "-" => UnOp::Neg,
                "+" => UnOp::Plus,
                _ => UnOp::TypeOf,
            };
            let arg = build_expr(
                inner.next().ok_or_else(|| {
                    ctx.malformed_construct("unary expression", crate::errors::unspanned())
                })?,
                ctx,
            )?;
            Ok(Expr::Unary(UnaryExpr {
                op,
                arg: Box::new(arg),
                origin,
            }))
        }
        _ => build_expr(first, ctx),
    }
}

fn build_postfix(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let mut inner = pair.into_inner();
    let primary = inner
        .next()
        .ok_or_else(|| ctx.malformed_construct("expression", crate::errors::unspanned()))?;
    let mut acc = build_expr(primary, ctx)?;
    for p in inner {
        match p.as_rule() {
            Rule::postfix_suffix => {
                let origin = source_origin(&p);
                let suffix = first_inner(p, ctx)?;
                acc = match suffix.as_rule() {
                    Rule::dot_suffix => {
                        let name = first_inner(suffix, ctx)?.as_str().to_string();
                        Expr::Member(MemberExpr {
                            object: Box::new(acc),
                            prop: MemberProp::Dot(name),
                            origin,
                        })
                    }
                    Rule::index_suffix => {
                        let index = build_expr(first_inner(suffix, ctx)?, ctx)?;
                        Expr::Member(MemberExpr {
                            object: Box::new(acc),
                            prop: MemberProp::Computed(Box::new(index)),
                            origin,
                        })
                    }
                    Rule::call_suffix => {
                        let args = build_args(suffix, ctx)?;
                        Expr::Call(CallExpr {
                            callee: Box::new(acc),
                            args,
                            origin,
                        })
                    }
                    other => return Err(unexpected_rule(other, &suffix, ctx)),
                };
            }
            Rule::update_op => {
                let origin = source_origin(&p);
                acc = Expr::Update(UpdateExpr {
                    op: update_op(p.as_str()),
                    arg: Box::new(acc),
                    prefix: false,
                    origin,
                });
            }
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    Ok(acc)
}

fn build_args(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Vec<Expr>, UmbraError> {
    let mut args = Vec::new();
    for p in pair.into_inner() {
        if p.as_rule() == Rule::arg_list {
            for arg in p.into_inner() {
                args.push(build_expr(arg, ctx)?);
            }
        }
    }
    Ok(args)
}

fn build_func_expr(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let mut name = None;
    let mut params = Vec::new();
    let mut ret_ann = None;
    let mut body = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_function => {}
            Rule::ident => name = Some(p.as_str().to_string()),
            Rule::param_clause => params = build_params(p, ctx)?,
            Rule::type_ann => ret_ann = Some(annotation_text(p)),
            Rule::block => body = build_block(p, ctx)?,
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    Ok(Expr::Func(FuncExpr {
        name,
        params,
        ret_ann,
        body,
        origin,
    }))
}

fn build_new_expr(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let mut callee = None;
    let mut args = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_new => {}
            Rule::new_callee => {
                let mut inner = p.into_inner();
                let head = inner.next().ok_or_else(|| {
                    ctx.malformed_construct("new expression", crate::errors::unspanned())
                })?;
                let head_origin = source_origin(&head);
                let mut acc = Expr::Ident(Ident {
                    name: head.as_str().to_string(),
                    origin: head_origin,
                });
                for dot in inner {
                    let dot_origin = source_origin(&dot);
                    let name = first_inner(dot, ctx)?.as_str().to_string();
                    acc = Expr::Member(MemberExpr {
                        object: Box::new(acc),
                        prop: MemberProp::Dot(name),
                        origin: dot_origin,
                    });
                }
                callee = Some(acc);
            }
            Rule::new_args => args = build_args(p, ctx)?,
            other => return Err(unexpected_rule(other, &p, ctx)),
        }
    }
    let callee = callee
        .ok_or_else(|| ctx.malformed_construct("new expression", crate::errors::unspanned()))?;
    Ok(Expr::New(NewExpr {
        callee: Box::new(callee),
        args,
        origin,
    }))
}

fn build_object_lit(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expr, UmbraError> {
    let origin = source_origin(&pair);
    let mut props = Vec::new();
    for p in pair.into_inner() {
        if p.as_rule() != Rule::prop {
            continue;
        }
        let prop_origin = source_origin(&p);
        let inner = first_inner(p, ctx)?;
        match inner.as_rule() {
            Rule::keyed_prop => {
                let mut parts = inner.into_inner();
                let key_pair = parts.next().ok_or_else(|| {
                    ctx.malformed_construct("object property", crate::errors::unspanned())
                })?;
                let key_inner = first_inner(key_pair, ctx)?;
                let key = match key_inner.as_rule() {
                    Rule::ident => PropKey::Ident(key_inner.as_str().to_string()),
                    Rule::string => PropKey::Str(key_inner.as_str().to_string()),
                    other => return Err(unexpected_rule(other, &key_inner, ctx)),
                };
                let value = build_expr(
                    parts.next().ok_or_else(|| {
                        ctx.malformed_construct("object property", crate::errors::unspanned())
                    })?,
                    ctx,
                )?;
                props.push(Prop {
                    key,
                    value,
                    origin: prop_origin,
                });
            }
            Rule::computed_prop => {
                let mut parts = inner.into_inner();
                let key_expr = build_expr(
                    parts.next().ok_or_else(|| {
                        ctx.malformed_construct("object property", crate::errors::unspanned())
                    })?,
                    ctx,
                )?;
                let value = build_expr(
                    parts.next().ok_or_else(|| {
                        ctx.malformed_construct("object property", crate::errors::unspanned())
                    })?,
                    ctx,
                )?;
                props.push(Prop {
                    key: PropKey::Computed(Box::new(key_expr)),
                    value,
                    origin: prop_origin,
                });
            }
            other => return Err(unexpected_rule(other, &inner, ctx)),
        }
    }
    Ok(Expr::Object(ObjectLit { props, origin }))
}

// ============================================================================
// UTILITIES
// ============================================================================

fn binary_op(text: &str) -> BinOp {
    match text {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Rem,
        "<" => BinOp::Lt,
        "<=" => BinOp::Le,
        ">" => BinOp::Gt,
        ">=" => BinOp::Ge,
        "==" => BinOp::EqEq,
        "!=" => BinOp::NotEq,
        "===" => BinOp::StrictEq,
        "!==" => BinOp::StrictNotEq,
        "&&" => BinOp::And,
        _ => BinOp::Or,
    }
}

fn update_op(text: &str) -> UpdateOp {
    if text.trim() == "++" {
        UpdateOp::Incr
    } else {
        UpdateOp::Decr
    }
}

fn first_inner<'a>(
    pair: Pair<'a, Rule>,
    ctx: &PhaseContext,
) -> Result<Pair<'a, Rule>, UmbraError> {
    let rule = pair.as_rule();
    let span = pest_span(&pair);
    pair.into_inner()
        .next()
        .ok_or_else(|| ctx.malformed_construct(&format!("{rule:?}"), span))
}

fn pest_span(pair: &Pair<Rule>) -> SourceSpan {
    let span = pair.as_span();
    SourceSpan::from(span.start()..span.end())
}

fn unexpected_rule(rule: Rule, pair: &Pair<Rule>, ctx: &PhaseContext) -> UmbraError {
    ctx.unexpected_token(
        "a supported construct",
        &format!("{rule:?}"),
        pest_span(pair),
    )
}

fn convert_parse_error(e: pest::error::Error<Rule>, ctx: &PhaseContext) -> UmbraError {
    use pest::error::{ErrorVariant, InputLocation};

    let span = match e.location {
        InputLocation::Pos(p) => {
            let end = (p + 1).min(ctx.source.content.len().max(p));
            SourceSpan::from(p..end)
        }
        InputLocation::Span((start, end)) => SourceSpan::from(start..end),
    };

    match &e.variant {
        ErrorVariant::ParsingError { positives, .. } => {
            let expected = if positives.is_empty() {
                "a supported construct".to_string()
            } else {
                positives
                    .iter()
                    .map(|r| format!("{r:?}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            ctx.unexpected_token(&expected, "unexpected input", span)
        }
        ErrorVariant::CustomError { message } => ctx.malformed_construct(message, span),
    }
}

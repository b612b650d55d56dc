//! Normalization into administrative normal form
//!
//! After this pass every statement nests at most one level: operands of
//! binary operators, indexing and calls are locations (a variable, a literal
//! or `$n`), and an assignment's right-hand side is a location or one such
//! flat operation. Conditions of `if` and `while` are locations too.
//! Anything deeper is hoisted into fresh `__temp{n}` variables, in the
//! order the evaluator would have computed it.
//!
//! ```text
//! x = f(a + b)[i]        __temp2 = a + b;
//!                        __temp1 = f(__temp2);
//!                        x = __temp1[i]
//! ```

use super::ProgramPass;
use crate::ast::vars::{VarSet, defined_vars_block, used_vars_block};
use crate::ast::{Block, Expr, FnDecl, Program};

/// Prefix of generated temporaries
pub const TEMP_PREFIX: &str = "__temp";

/// Normalize the top-level block and every function body
pub fn normalize(program: &Program) -> Program {
    let func_names: VarSet = program.funcs.iter().map(|d| d.name.clone()).collect();

    let body = Normalizer::new(&program.body, &[], &func_names).compile_block(&program.body);
    let funcs = program
        .funcs
        .iter()
        .map(|decl| FnDecl {
            name: decl.name.clone(),
            params: decl.params.clone(),
            body: Normalizer::new(&decl.body, &decl.params, &func_names).compile_block(&decl.body),
        })
        .collect();

    Program::new(funcs, body)
}

/// The normalization step as a pipeline pass
pub struct Normalize;

impl ProgramPass for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn run(&self, program: &Program) -> Program {
        normalize(program)
    }
}

/// Per-function state: every name already taken, and the next temp number
struct Normalizer {
    taken: VarSet,
    next: usize,
}

impl Normalizer {
    fn new(block: &[Expr], params: &[String], func_names: &VarSet) -> Self {
        let mut taken = used_vars_block(block);
        taken.extend(defined_vars_block(block));
        taken.extend(params.iter().cloned());
        taken.extend(func_names.iter().cloned());
        Normalizer { taken, next: 1 }
    }

    fn fresh(&mut self) -> String {
        loop {
            let name = format!("{TEMP_PREFIX}{}", self.next);
            self.next += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }

    fn compile_block(&mut self, block: &[Expr]) -> Block {
        let mut out = Vec::new();
        for expr in block {
            self.compile_stmt(expr, &mut out);
        }
        out
    }

    /// Append root-level statements equivalent to evaluating `expr`. The
    /// last statement appended has the same value as `expr`.
    fn compile_stmt(&mut self, expr: &Expr, out: &mut Block) {
        match expr {
            Expr::Literal(_) | Expr::Var(_) | Expr::Arg(_) | Expr::Lambda(_) => out.push(expr.clone()),

            Expr::Block(block) => {
                for e in block {
                    self.compile_stmt(e, out);
                }
            }

            Expr::Assign { name, value } => {
                let (code, loc) = self.compile_expr(value, 1);
                out.extend(code);
                out.push(Expr::assign(name.clone(), loc));
            }

            Expr::Binary { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                let (code, flat) = self.flatten(expr);
                out.extend(code);
                out.push(flat);
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (code, cond) = self.compile_expr(cond, 0);
                out.extend(code);
                let then_branch = self.compile_block(then_branch);
                let else_branch = self.compile_block(else_branch);
                out.push(Expr::if_else(cond, then_branch, else_branch));
            }

            Expr::While { cond, body } => {
                let (cond_code, cond) = self.compile_expr(cond, 0);
                let body = if cond_code.is_empty() {
                    self.compile_block(body)
                } else {
                    self.loop_body_with_condition(body, &cond_code)
                };
                out.extend(cond_code);
                out.push(Expr::while_loop(cond, body));
            }
        }
    }

    /// A loop body followed by its condition's code. The body's value is
    /// saved first and re-emitted last, so the loop's value is unchanged.
    fn loop_body_with_condition(&mut self, body: &[Expr], cond_code: &[Expr]) -> Block {
        match body.split_last() {
            Some((last, init)) => {
                let result = self.fresh();
                let mut out = self.compile_block(init);
                self.compile_stmt(&Expr::assign(result.clone(), last.clone()), &mut out);
                out.extend(cond_code.iter().cloned());
                out.push(Expr::Var(result));
                out
            }
            None => {
                let mut out = cond_code.to_vec();
                out.push(Expr::literal(""));
                out
            }
        }
    }

    /// Returns code to run first and an expression equivalent to `expr`
    /// once that code has run. With `max_depth` 0 the expression is a
    /// location; with 1 it may be one flat operation over locations.
    fn compile_expr(&mut self, expr: &Expr, max_depth: u8) -> (Block, Expr) {
        match expr {
            Expr::Literal(_) | Expr::Var(_) | Expr::Arg(_) => (Vec::new(), expr.clone()),

            Expr::Lambda(_) if max_depth > 0 => (Vec::new(), expr.clone()),

            Expr::Assign { name, .. } => {
                let mut code = Vec::new();
                self.compile_stmt(expr, &mut code);
                (code, Expr::var(name.clone()))
            }

            Expr::Binary { .. } | Expr::Index { .. } | Expr::Call { .. } if max_depth > 0 => {
                self.flatten(expr)
            }

            // Hoisted at depth 0; lambdas capture when evaluated, so they
            // keep their place in the evaluation order
            Expr::Lambda(_) | Expr::Binary { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                let temp = self.fresh();
                let mut code = Vec::new();
                self.compile_stmt(&Expr::assign(temp.clone(), expr.clone()), &mut code);
                (code, Expr::Var(temp))
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let result = self.fresh();
                let lowered = Expr::if_else(
                    (**cond).clone(),
                    assign_last(then_branch, &result),
                    assign_last(else_branch, &result),
                );
                let mut code = Vec::new();
                self.compile_stmt(&lowered, &mut code);
                (code, Expr::Var(result))
            }

            Expr::While { cond, body } => {
                let result = self.fresh();
                // The loop may run zero times
                let mut code = vec![Expr::assign(result.clone(), Expr::literal(""))];
                let lowered = Expr::while_loop((**cond).clone(), assign_last(body, &result));
                self.compile_stmt(&lowered, &mut code);
                (code, Expr::Var(result))
            }

            Expr::Block(block) => match block.split_last() {
                Some((last, init)) => {
                    let mut code = self.compile_block(init);
                    let (last_code, loc) = self.compile_expr(last, max_depth);
                    code.extend(last_code);
                    (code, loc)
                }
                None => (Vec::new(), Expr::literal("")),
            },
        }
    }

    /// One flat operation over locations, plus the code computing them
    fn flatten(&mut self, expr: &Expr) -> (Block, Expr) {
        match expr {
            Expr::Binary { op, left, right } => {
                let (code, mut locs) = self.compile_operands(&[left.as_ref(), right.as_ref()]);
                let right = locs.pop().unwrap_or_else(|| Expr::literal(""));
                let left = locs.pop().unwrap_or_else(|| Expr::literal(""));
                (code, Expr::binary(*op, left, right))
            }
            Expr::Index { source, index } => {
                let (code, mut locs) = self.compile_operands(&[source.as_ref(), index.as_ref()]);
                let index = locs.pop().unwrap_or_else(|| Expr::literal(""));
                let source = locs.pop().unwrap_or_else(|| Expr::literal(""));
                (code, Expr::index(source, index))
            }
            Expr::Call { callee, args } => {
                // A named callee resolves by name and stays as it is; any
                // other callee becomes a location evaluated before the args
                let named = matches!(**callee, Expr::Var(_));
                let mut operands: Vec<&Expr> = Vec::with_capacity(args.len() + 1);
                if !named {
                    operands.push(callee.as_ref());
                }
                operands.extend(args.iter());

                let (code, mut locs) = self.compile_operands(&operands);
                let callee = if named {
                    (**callee).clone()
                } else {
                    locs.remove(0)
                };
                (code, Expr::call(callee, locs))
            }
            other => self.compile_expr(other, 0),
        }
    }

    /// Compile operands left to right into locations.
    ///
    /// A variable operand is read when the evaluator reaches it. If code
    /// hoisted for a later operand assigns that variable, the earlier read
    /// is pinned to a snapshot temp.
    fn compile_operands(&mut self, operands: &[&Expr]) -> (Block, Vec<Expr>) {
        let compiled: Vec<(Block, Expr)> = operands
            .iter()
            .map(|operand| self.compile_expr(operand, 0))
            .collect();

        let mut code = Vec::new();
        let mut locs = Vec::with_capacity(compiled.len());
        for (i, (operand_code, loc)) in compiled.iter().enumerate() {
            code.extend(operand_code.iter().cloned());
            let reassigned_later = match loc {
                Expr::Var(name) => compiled[i + 1..]
                    .iter()
                    .any(|(later, _)| defined_vars_block(later).contains(name)),
                _ => false,
            };
            if reassigned_later {
                let snapshot = self.fresh();
                code.push(Expr::assign(snapshot.clone(), loc.clone()));
                locs.push(Expr::Var(snapshot));
            } else {
                locs.push(loc.clone());
            }
        }
        (code, locs)
    }
}

/// `block` with its last statement assigned to `var`; an empty block
/// assigns the empty value
fn assign_last(block: &[Expr], var: &str) -> Block {
    let mut out = block.to_vec();
    match out.pop() {
        Some(last) => out.push(Expr::assign(var, last)),
        None => out.push(Expr::assign(var, Expr::literal(""))),
    }
    out
}

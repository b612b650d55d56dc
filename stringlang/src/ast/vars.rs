//! Structural variable and side-effect queries over the expression tree.
//!
//! These are shared by the evaluator (closure capture) and the optimizer
//! (liveness, normalization temporaries, dead-code removal).

use super::{Expr, Lambda};
use std::collections::BTreeSet;

/// A set of variable names, ordered for deterministic output.
pub type VarSet = BTreeSet<String>;

/// Every variable read by `expr`.
///
/// A call's callee counts as a use: a variable may hold a lambda value.
/// A lambda uses exactly the variables it would capture.
pub fn used_vars(expr: &Expr) -> VarSet {
    let mut out = VarSet::new();
    collect_used(expr, &mut out);
    out
}

pub fn used_vars_block(block: &[Expr]) -> VarSet {
    let mut out = VarSet::new();
    for e in block {
        collect_used(e, &mut out);
    }
    out
}

fn collect_used(expr: &Expr, out: &mut VarSet) {
    match expr {
        Expr::Literal(_) | Expr::Arg(_) => {}
        Expr::Var(name) => {
            out.insert(name.clone());
        }
        Expr::Binary { left, right, .. } => {
            collect_used(left, out);
            collect_used(right, out);
        }
        Expr::Assign { value, .. } => collect_used(value, out),
        Expr::Index { source, index } => {
            collect_used(source, out);
            collect_used(index, out);
        }
        Expr::Call { callee, args } => {
            collect_used(callee, out);
            for a in args {
                collect_used(a, out);
            }
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            collect_used(cond, out);
            then_branch.iter().for_each(|e| collect_used(e, out));
            else_branch.iter().for_each(|e| collect_used(e, out));
        }
        Expr::While { cond, body } => {
            collect_used(cond, out);
            body.iter().for_each(|e| collect_used(e, out));
        }
        Expr::Block(block) => block.iter().for_each(|e| collect_used(e, out)),
        Expr::Lambda(lambda) => out.extend(lambda_free_vars(lambda)),
    }
}

/// Every variable assigned by `expr` in the current frame.
pub fn defined_vars(expr: &Expr) -> VarSet {
    let mut out = VarSet::new();
    collect_defined(expr, &mut out);
    out
}

pub fn defined_vars_block(block: &[Expr]) -> VarSet {
    let mut out = VarSet::new();
    for e in block {
        collect_defined(e, &mut out);
    }
    out
}

fn collect_defined(expr: &Expr, out: &mut VarSet) {
    match expr {
        Expr::Literal(_) | Expr::Arg(_) | Expr::Var(_) | Expr::Lambda(_) => {}
        Expr::Binary { left, right, .. } => {
            collect_defined(left, out);
            collect_defined(right, out);
        }
        Expr::Assign { name, value } => {
            collect_defined(value, out);
            out.insert(name.clone());
        }
        Expr::Index { source, index } => {
            collect_defined(source, out);
            collect_defined(index, out);
        }
        Expr::Call { callee, args } => {
            collect_defined(callee, out);
            args.iter().for_each(|a| collect_defined(a, out));
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            collect_defined(cond, out);
            then_branch.iter().for_each(|e| collect_defined(e, out));
            else_branch.iter().for_each(|e| collect_defined(e, out));
        }
        Expr::While { cond, body } => {
            collect_defined(cond, out);
            body.iter().for_each(|e| collect_defined(e, out));
        }
        Expr::Block(block) => block.iter().for_each(|e| collect_defined(e, out)),
    }
}

/// Variables read in `block` before any assignment in it defines them.
///
/// Names in `predefined` (parameters, typically) are never reported. A
/// branch only counts as defining a name when both arms define it; a loop
/// body never does, since it may run zero times.
pub fn used_before_def_vars(block: &[Expr], predefined: &VarSet) -> VarSet {
    let mut defined = predefined.clone();
    let mut used = VarSet::new();
    for e in block {
        walk_before_def(e, &mut defined, &mut used);
    }
    used
}

/// Free variables of a lambda: what it captures when evaluated.
pub fn lambda_free_vars(lambda: &Lambda) -> VarSet {
    let params: VarSet = lambda.params.iter().cloned().collect();
    used_before_def_vars(&lambda.body, &params)
}

fn walk_before_def(expr: &Expr, defined: &mut VarSet, used: &mut VarSet) {
    match expr {
        Expr::Literal(_) | Expr::Arg(_) => {}
        Expr::Var(name) => {
            if !defined.contains(name) {
                used.insert(name.clone());
            }
        }
        Expr::Binary { left, right, .. } => {
            walk_before_def(left, defined, used);
            walk_before_def(right, defined, used);
        }
        Expr::Assign { name, value } => {
            walk_before_def(value, defined, used);
            defined.insert(name.clone());
        }
        Expr::Index { source, index } => {
            walk_before_def(source, defined, used);
            walk_before_def(index, defined, used);
        }
        Expr::Call { callee, args } => {
            walk_before_def(callee, defined, used);
            for a in args {
                walk_before_def(a, defined, used);
            }
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_before_def(cond, defined, used);
            let mut then_defined = defined.clone();
            for e in then_branch {
                walk_before_def(e, &mut then_defined, used);
            }
            let mut else_defined = defined.clone();
            for e in else_branch {
                walk_before_def(e, &mut else_defined, used);
            }
            *defined = &then_defined & &else_defined;
        }
        Expr::While { cond, body } => {
            walk_before_def(cond, defined, used);
            let mut body_defined = defined.clone();
            for e in body {
                walk_before_def(e, &mut body_defined, used);
            }
        }
        Expr::Block(block) => {
            for e in block {
                walk_before_def(e, defined, used);
            }
        }
        Expr::Lambda(lambda) => {
            for name in lambda_free_vars(lambda) {
                if !defined.contains(&name) {
                    used.insert(name);
                }
            }
        }
    }
}

/// Whether evaluating `expr` can change state outside the expression itself.
///
/// Assignments and calls always do; everything else only through its children.
/// Evaluating a lambda just produces its text.
pub fn has_side_effects(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) | Expr::Var(_) | Expr::Arg(_) | Expr::Lambda(_) => false,
        Expr::Assign { .. } | Expr::Call { .. } => true,
        Expr::Binary { left, right, .. } => has_side_effects(left) || has_side_effects(right),
        Expr::Index { source, index } => has_side_effects(source) || has_side_effects(index),
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            has_side_effects(cond)
                || block_has_side_effects(then_branch)
                || block_has_side_effects(else_branch)
        }
        Expr::While { cond, body } => has_side_effects(cond) || block_has_side_effects(body),
        Expr::Block(block) => block_has_side_effects(block),
    }
}

pub fn block_has_side_effects(block: &[Expr]) -> bool {
    block.iter().any(has_side_effects)
}

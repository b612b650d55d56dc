//! Live variable analysis
//!
//! A variable is live at a point if its current value may be read before
//! it is assigned again.
//!
//! - `IN[n]` = USED(n) UNION (OUT[n] - ASSIGNED(n))

use super::{Solution, VarSet, solve_backward, union};
use crate::ast::Expr;
use crate::ast::vars::used_vars;
use crate::cfg::{Cfg, Node};

/// Variables live into and out of every reachable node of `cfg`
pub fn analyze(cfg: &Cfg) -> Solution<VarSet> {
    solve_backward(cfg, union, transfer, VarSet::new())
}

fn transfer(out: &VarSet, node: &Node) -> VarSet {
    let Some(expr) = &node.expr else {
        return out.clone();
    };
    let mut live = out.clone();
    if let Expr::Assign { name, .. } = expr {
        live.remove(name);
    }
    live.extend(used_vars(expr));
    live
}

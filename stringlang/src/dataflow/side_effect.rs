//! Side-effect liveness
//!
//! A variable is side-effect live when its current value can still reach
//! something observable: the block's value (an exit node), the operands of
//! a call, or the condition that decides which of those happen.
//!
//! - exit node: `IN` = USED(n) UNION the regular transfer
//! - `x = e`: kills `x`; generates USED(e) if `x` is live in OUT or `e` has
//!   side effects
//! - branch or loop condition: generates USED(cond)
//! - any other expression with side effects (a call): generates USED(n)

use super::{Solution, VarSet, solve_backward, union};
use crate::ast::Expr;
use crate::ast::vars::{has_side_effects, used_vars};
use crate::cfg::{Cfg, Node};

/// Side-effect live variables into and out of every reachable node
pub fn analyze(cfg: &Cfg) -> Solution<VarSet> {
    solve_backward(
        cfg,
        union,
        |out: &VarSet, node: &Node| {
            let mut live = transfer(out, node);
            if cfg.is_exit(node.label) {
                if let Some(expr) = &node.expr {
                    live.extend(used_vars(expr));
                }
            }
            live
        },
        VarSet::new(),
    )
}

fn transfer(out: &VarSet, node: &Node) -> VarSet {
    let Some(expr) = &node.expr else {
        return out.clone();
    };
    let mut live = out.clone();
    match expr {
        Expr::Assign { name, value } => {
            let target_live = live.remove(name);
            if target_live || has_side_effects(value) {
                live.extend(used_vars(value));
            }
        }
        _ if node.is_branch() || has_side_effects(expr) => live.extend(used_vars(expr)),
        _ => {}
    }
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build;
    use crate::parser::parse_source;

    fn set(names: &[&str]) -> VarSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn solve(source: &str) -> Solution<VarSet> {
        let program = parse_source("test.sl", source).expect("parse");
        analyze(&build(&program.body))
    }

    #[test]
    fn test_exit_value_is_observable() {
        // 2: a = "1", 3: b = "2", 4: _ = a
        let solution = solve(r#"a = "1"; b = "2"; _ = a"#);
        assert_eq!(solution.in_fact(4), Some(&set(&["a"])));
        assert_eq!(solution.out_fact(3), Some(&set(&["a"])));
        assert_eq!(solution.in_fact(3), Some(&set(&["a"])));
        assert_eq!(solution.in_fact(2), Some(&set(&[])));
    }

    #[test]
    fn test_dead_chain_is_not_live() {
        // b only feeds c, which nothing observes
        let solution = solve(r#"b = "1"; c = b; "end""#);
        assert_eq!(solution.out_fact(2), Some(&set(&[])));
        assert_eq!(solution.in_fact(3), Some(&set(&[])));
    }

    #[test]
    fn test_call_operands_are_live() {
        let solution = solve(r#"x = "1"; print(x); "end""#);
        assert_eq!(solution.out_fact(2), Some(&set(&["print", "x"])));
    }

    #[test]
    fn test_call_assigned_to_dead_variable() {
        let solution = solve(r#"x = "1"; t = f(x); "end""#);
        assert_eq!(solution.out_fact(2), Some(&set(&["f", "x"])));
    }

    #[test]
    fn test_condition_is_live() {
        let solution = solve(r#"c = "1"; if (c) { f() } else { }; "end""#);
        assert_eq!(solution.out_fact(2), Some(&set(&["c", "f"])));
    }

    #[test]
    fn test_trailing_loop_keeps_carried_variables() {
        // 2: i = "", 3: while i != "aa", 4: i = i + "a"
        let solution = solve(r#"i = ""; while (i != "aa") { i = i + "a" }"#);
        assert_eq!(solution.out_fact(4), Some(&set(&["i"])));
        assert_eq!(solution.out_fact(2), Some(&set(&["i"])));
    }

    #[test]
    fn test_definition_feeding_live_variable() {
        let solution = solve(r#"a = "x"; b = a + "y"; b"#);
        assert_eq!(solution.in_fact(3), Some(&set(&["a"])));
        assert_eq!(solution.out_fact(2), Some(&set(&["a"])));
    }
}

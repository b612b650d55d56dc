//! Expression AST nodes

use crate::interp::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A statement list. Its value is the value of the last statement, or `""`.
pub type Block = Vec<Expr>;

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// String literal
    Literal(Value),

    /// Variable reference
    Var(String),

    /// Positional program argument: `$n`
    Arg(usize),

    /// Binary operation (both sides are always evaluated)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Assignment into the current frame: name = value
    Assign { name: String, value: Box<Expr> },

    /// Character index: source[index]
    Index { source: Box<Expr>, index: Box<Expr> },

    /// Function call. The callee is usually a bare variable but may be any
    /// expression that evaluates to lambda source text.
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Conditional: if (cond) { then_branch } else { else_branch }
    If {
        cond: Box<Expr>,
        then_branch: Block,
        else_branch: Block,
    },

    /// Loop: while (cond) { body }
    While { cond: Box<Expr>, body: Block },

    /// Statement sequence
    Block(Block),

    /// Anonymous function value
    Lambda(Lambda),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Or,
    And,
    Equals,
    NotEquals,
    Concat,
}

impl BinOp {
    /// Binding strength used when printing; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 10,
            BinOp::And => 20,
            BinOp::NotEquals => 30,
            BinOp::Equals => 40,
            BinOp::Concat => 50,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Or => write!(f, "||"),
            BinOp::And => write!(f, "&&"),
            BinOp::Equals => write!(f, "=="),
            BinOp::NotEquals => write!(f, "!="),
            BinOp::Concat => write!(f, "+"),
        }
    }
}

/// Anonymous function: fun(params) { body }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Block,
}

const ASSIGN_PRECEDENCE: u8 = 0;
const LEAF_PRECEDENCE: u8 = u8::MAX;

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Expr::Assign {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn index(source: Expr, index: Expr) -> Self {
        Expr::Index {
            source: Box::new(source),
            index: Box::new(index),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Call of a function by name
    pub fn call_named(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::call(Expr::var(name), args)
    }

    pub fn if_else(cond: Expr, then_branch: Block, else_branch: Block) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then_branch,
            else_branch,
        }
    }

    pub fn while_loop(cond: Expr, body: Block) -> Self {
        Expr::While {
            cond: Box::new(cond),
            body,
        }
    }

    /// A location is an operand that needs no further evaluation.
    pub fn is_location(&self) -> bool {
        matches!(self, Expr::Literal(_) | Expr::Var(_) | Expr::Arg(_))
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Assign { .. } => ASSIGN_PRECEDENCE,
            _ => LEAF_PRECEDENCE,
        }
    }
}

/// Quote a string so the lexer reads it back unchanged.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Statements joined with `;` and newlines.
pub fn format_block(block: &[Expr]) -> String {
    block
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(";\n")
}

/// A braced, tab-indented block body.
pub(crate) fn braced(block: &[Expr]) -> String {
    if block.is_empty() {
        "{\n}".to_string()
    } else {
        format!("{{\n\t{}\n}}", format_block(block).replace('\n', "\n\t"))
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, e: &Expr, parens: bool) -> fmt::Result {
    if parens { write!(f, "({e})") } else { write!(f, "{e}") }
}

fn write_call_target(f: &mut fmt::Formatter<'_>, e: &Expr) -> fmt::Result {
    write_operand(f, e, e.precedence() != LEAF_PRECEDENCE)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", quote(v.as_str())),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Arg(n) => write!(f, "${n}"),
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                write_operand(f, left, left.precedence() < prec)?;
                write!(f, " {op} ")?;
                write_operand(f, right, right.precedence() <= prec)
            }
            Expr::Assign { name, value } => write!(f, "{name} = {value}"),
            Expr::Index { source, index } => {
                write_call_target(f, source)?;
                write!(f, "[{index}]")
            }
            Expr::Call { callee, args } => {
                write_call_target(f, callee)?;
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "({})", args.join(", "))
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => write!(
                f,
                "if ({cond}) {} else {}",
                braced(then_branch),
                braced(else_branch)
            ),
            Expr::While { cond, body } => write!(f, "while ({cond}) {}", braced(body)),
            Expr::Block(block) => write!(f, "{}", format_block(block)),
            Expr::Lambda(lambda) => write!(f, "{lambda}"),
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fun({}) {}", self.params.join(", "), braced(&self.body))
    }
}

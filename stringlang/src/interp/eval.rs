//! Expression evaluator

use super::env::Environment;
use super::error::{InterpResult, RuntimeError};
use super::natives::EVAL;
use super::value::Value;
use crate::ast::vars::lambda_free_vars;
use crate::ast::{BinOp, Expr, FnDecl, Lambda, Program};
use crate::parser::parse_source;

/// Maximum call nesting before evaluation fails with a stack overflow
pub const MAX_CALL_DEPTH: usize = 10_000;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Register the program's functions, then evaluate its body
pub fn eval_program(program: &Program, env: &mut Environment) -> InterpResult<Value> {
    for decl in &program.funcs {
        env.register_function(decl.clone());
    }
    eval_block(&program.body, env)
}

/// Evaluate statements in order; the block's value is the last one
pub fn eval_block(block: &[Expr], env: &mut Environment) -> InterpResult<Value> {
    let mut last = Value::empty();
    for expr in block {
        last = eval(expr, env)?;
    }
    Ok(last)
}

/// Evaluate an expression in `env`
pub fn eval(expr: &Expr, env: &mut Environment) -> InterpResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => Ok(env.get(name)),
        Expr::Arg(index) => Ok(env.arg(*index)),

        Expr::Binary { op, left, right } => {
            // Both sides always run, in order
            let l = eval(left, env)?;
            let r = eval(right, env)?;
            Ok(eval_binary(*op, &l, &r))
        }

        Expr::Assign { name, value } => {
            let v = eval(value, env)?;
            env.set(name.clone(), v.clone());
            Ok(v)
        }

        Expr::Index { source, index } => {
            let s = eval(source, env)?;
            let i = eval(index, env)?;
            Ok(eval_index(&s, &i))
        }

        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval(cond, env)?.is_truthy() {
                eval_block(then_branch, env)
            } else {
                eval_block(else_branch, env)
            }
        }

        Expr::While { cond, body } => {
            let mut last = Value::empty();
            while eval(cond, env)?.is_truthy() {
                if env.check_exit() {
                    break;
                }
                last = eval_block(body, env)?;
            }
            Ok(last)
        }

        Expr::Block(block) => eval_block(block, env),

        Expr::Lambda(lambda) => Ok(Value::from(capture(lambda, env).to_string())),

        Expr::Call { callee, args } => eval_call(callee, args, env),
    }
}

fn eval_binary(op: BinOp, l: &Value, r: &Value) -> Value {
    match op {
        BinOp::Or => Value::from_bool(l.is_truthy() || r.is_truthy()),
        BinOp::And => Value::from_bool(l.is_truthy() && r.is_truthy()),
        BinOp::Equals => Value::from_bool(l == r),
        BinOp::NotEquals => Value::from_bool(l != r),
        BinOp::Concat => l.concat(r),
    }
}

/// Character at a decimal index; anything unusable gives the empty value
fn eval_index(source: &Value, index: &Value) -> Value {
    match index.as_str().parse::<usize>() {
        Ok(i) => source.char_at(i).unwrap_or_default(),
        Err(_) => Value::empty(),
    }
}

/// Snapshot the lambda's free variables from `env` into leading assignments.
///
/// Function names are call targets, not captures.
fn capture(lambda: &Lambda, env: &Environment) -> Lambda {
    let mut body: Vec<Expr> = lambda_free_vars(lambda)
        .into_iter()
        .filter(|name| !env.is_function_name(name))
        .map(|name| {
            let value = env.get(&name);
            Expr::assign(name, Expr::Literal(value))
        })
        .collect();
    body.extend(lambda.body.iter().cloned());
    Lambda {
        params: lambda.params.clone(),
        body,
    }
}

fn eval_args(args: &[Expr], env: &mut Environment) -> InterpResult<Vec<Value>> {
    args.iter().map(|a| eval(a, env)).collect()
}

fn eval_call(callee: &Expr, args: &[Expr], env: &mut Environment) -> InterpResult<Value> {
    if env.check_exit() {
        return Ok(Value::empty());
    }

    if let Expr::Var(name) = callee {
        if let Some(decl) = env.function(name) {
            let values = eval_args(args, env)?;
            return call_function(&decl, values, env);
        }
        if let Some(native) = env.native(name) {
            let values = eval_args(args, env)?;
            return Ok(native(&values));
        }
        if name == EVAL {
            let values = eval_args(args, env)?;
            return eval_intrinsic(values.first(), env);
        }
        // Only a variable (holding lambda text) may take the dynamic path
        if env.lookup(name).is_none() {
            return Err(RuntimeError::undefined_function(name));
        }
    }

    let text = eval(callee, env)?;
    let values = eval_args(args, env)?;
    match parse_lambda(&text) {
        Some(lambda) => call_function(&FnDecl::from_lambda(&lambda), values, env),
        None => Ok(Value::empty()),
    }
}

/// Run `decl` in a fresh child frame. Missing arguments bind to `""`.
pub fn call_function(decl: &FnDecl, args: Vec<Value>, env: &Environment) -> InterpResult<Value> {
    if env.depth() >= MAX_CALL_DEPTH {
        return Err(RuntimeError::stack_overflow(MAX_CALL_DEPTH));
    }

    let mut frame = env.child();
    let mut args = args.into_iter();
    for param in &decl.params {
        frame.set(param.clone(), args.next().unwrap_or_default());
    }

    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
        eval_block(&decl.body, &mut frame)
    })
}

/// Parse a callee value that should be the text of exactly one lambda
fn parse_lambda(text: &Value) -> Option<Lambda> {
    match parse_source("<dynamic call>", text.as_str()) {
        Ok(program) => {
            let lambda = program.as_single_lambda().cloned();
            if lambda.is_none() {
                tracing::warn!(callee = %text, "dynamic callee is not a single lambda");
            }
            lambda
        }
        Err(e) => {
            tracing::warn!(callee = %text, error = %e, "dynamic callee failed to parse");
            None
        }
    }
}

/// `eval(src)`: run `src` as a program in the calling frame
fn eval_intrinsic(source: Option<&Value>, env: &mut Environment) -> InterpResult<Value> {
    let Some(source) = source else {
        return Ok(Value::empty());
    };
    match parse_source("<eval>", source.as_str()) {
        Ok(program) => eval_program(&program, env),
        Err(e) => {
            tracing::warn!(error = %e, "eval source failed to parse");
            Ok(Value::empty())
        }
    }
}

//! Built-in native functions

use super::env::{NativeFn, Natives};
use super::Value;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

/// Name of the intrinsic that evaluates source text in the calling frame.
/// It needs the environment, so the evaluator handles it directly.
pub const EVAL: &str = "eval";

const DEFAULT_RANDOM_MAX: u64 = 10;

/// The natives every root environment starts with
pub fn default_natives() -> Natives {
    let mut natives = Natives::new();
    natives.insert("length".to_string(), builtin_length as NativeFn);
    natives.insert("random".to_string(), builtin_random as NativeFn);
    natives
}

/// length(s): number of characters in `s`
fn builtin_length(args: &[Value]) -> Value {
    Value::from(args.first().map(Value::char_len).unwrap_or(0))
}

/// random(): 1..=10; random(n): 1..=n; random(a, b, ...): one of the arguments
fn builtin_random(args: &[Value]) -> Value {
    match args {
        [] => Value::from(random_in(1, DEFAULT_RANDOM_MAX).to_string()),
        [single] => match single.as_str().parse::<i64>() {
            Ok(n) if n > 0 => Value::from(random_in(1, n as u64).to_string()),
            Ok(_) => Value::empty(),
            Err(_) => single.clone(),
        },
        choices => {
            let pick = random_in(0, choices.len() as u64 - 1) as usize;
            choices[pick].clone()
        }
    }
}

/// Uniform-ish integer in `lo..=hi`, seeded per call from the std hasher keys
fn random_in(lo: u64, hi: u64) -> u64 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(lo ^ hi.rotate_left(17));
    let span = hi - lo + 1;
    lo + hasher.finish() % span
}

//! REPL (Read-Eval-Print Loop) for stringlang
//!
//! Lines accumulate until they parse. Input that stops at end of file or
//! inside an open string literal asks for another line; any other parse
//! error drops the pending input. Each completed program runs in the same
//! environment, so variables and functions carry over, and its value is
//! stored in `_`.

use crate::interp::{Environment, eval_with_timeout};
use crate::parser::parse_source;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::time::Duration;

const PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = ". ";
const HISTORY_FILE: &str = ".stringlang_history";
const SPACES_PER_INDENT: usize = 4;

/// Time limit for each entered program
pub const REPL_TIMEOUT: Duration = Duration::from_secs(5);

/// Variable holding the previous result
pub const LAST_RESULT: &str = "_";

/// What a line of input led to
#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    /// Blank line with nothing pending
    Empty,
    /// The input so far could still become a program
    NeedMore,
    /// A program ran and produced this value
    Output(String),
    /// Only declarations were entered; this many were registered
    Registered(usize),
    Error(String),
    Reset,
    Quit,
}

/// REPL state without any terminal I/O
pub struct Session {
    env: Environment,
    pending: String,
    indent: usize,
    timeout: Duration,
}

impl Session {
    pub fn new() -> Self {
        Self::with_timeout(REPL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Session {
            env: Environment::default(),
            pending: String::new(),
            indent: 0,
            timeout,
        }
    }

    /// Whether earlier lines are waiting for more input
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Brace depth of the pending input
    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Drop pending input
    pub fn clear_pending(&mut self) {
        self.pending.clear();
        self.indent = 0;
    }

    /// Forget all variables and functions
    pub fn reset(&mut self) {
        self.env = Environment::default();
        self.clear_pending();
    }

    pub fn feed(&mut self, line: &str) -> Feed {
        let trimmed = line.trim();
        if is_command(trimmed, "quit") {
            return Feed::Quit;
        }
        if is_command(trimmed, "reset") {
            self.reset();
            return Feed::Reset;
        }
        if trimmed.is_empty() && !self.is_pending() {
            return Feed::Empty;
        }

        if self.is_pending() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);
        self.update_indent(line);

        let program = match parse_source("<repl>", &self.pending) {
            Ok(program) => program,
            Err(e) if e.needs_more_input() => return Feed::NeedMore,
            Err(e) => {
                self.clear_pending();
                return Feed::Error(format!("There was an error parsing your input: {e}"));
            }
        };
        self.clear_pending();

        if program.body.is_empty() {
            let count = program.funcs.len();
            for decl in program.funcs {
                self.env.register_function(decl);
            }
            return Feed::Registered(count);
        }

        match eval_with_timeout(&mut self.env, &program, self.timeout) {
            Ok(value) => {
                self.env.set(LAST_RESULT, value.clone());
                Feed::Output(value.into_string())
            }
            Err(e) => Feed::Error(format!("There was an error running your program: {e}")),
        }
    }

    fn update_indent(&mut self, line: &str) {
        let opens = line.matches('{').count();
        let closes = line.matches('}').count();
        self.indent = (self.indent + opens).saturating_sub(closes);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// `reset;;` and `quit;;` end a line
fn is_command(line: &str, name: &str) -> bool {
    line.ends_with(&format!("{name};;"))
}

/// Interactive shell over a [`Session`]
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new() -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            session: Session::new(),
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    pub fn run(&mut self) -> RlResult<()> {
        println!("Welcome to the stringlang REPL!");
        println!("The variable '_' holds the previous result.");
        println!("Reset with 'reset;;' and quit with 'quit;;' or Ctrl-D.\n");

        loop {
            let prompt = self.prompt();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }
                    match self.session.feed(&line) {
                        Feed::Empty | Feed::NeedMore | Feed::Registered(_) => {}
                        Feed::Output(value) => println!("{value}"),
                        Feed::Error(message) => eprintln!("{message}"),
                        Feed::Reset => println!("Reset!"),
                        Feed::Quit => break,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    self.session.clear_pending();
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }
        println!("Exiting REPL.");

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    fn prompt(&self) -> String {
        if self.session.is_pending() {
            format!(
                "{CONTINUATION_PROMPT}{}",
                " ".repeat(self.session.indent() * SPACES_PER_INDENT)
            )
        } else {
            PROMPT.to_string()
        }
    }
}

fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(s: &str) -> Feed {
        Feed::Output(s.to_string())
    }

    #[test]
    fn test_expression_result() {
        let mut session = Session::new();
        assert_eq!(session.feed(r#"a = "x""#), output("x"));
        assert_eq!(session.feed(r#"a + "y""#), output("xy"));
    }

    #[test]
    fn test_previous_result_is_underscore() {
        let mut session = Session::new();
        session.feed(r#""abc""#);
        assert_eq!(session.feed(r#"_ + _"#), output("abcabc"));
        assert_eq!(session.env().get(LAST_RESULT), "abcabc");
    }

    #[test]
    fn test_blank_line() {
        let mut session = Session::new();
        assert_eq!(session.feed("   "), Feed::Empty);
        assert!(!session.is_pending());
    }

    #[test]
    fn test_multiline_input() {
        let mut session = Session::new();
        assert_eq!(session.feed(r#"if ("1") {"#), Feed::NeedMore);
        assert!(session.is_pending());
        assert_eq!(session.indent(), 1);
        assert_eq!(session.feed(r#""t""#), Feed::NeedMore);
        assert_eq!(session.feed(r#"} else { "e" }"#), output("t"));
        assert!(!session.is_pending());
        assert_eq!(session.indent(), 0);
    }

    #[test]
    fn test_open_string_continues() {
        let mut session = Session::new();
        assert_eq!(session.feed(r#"s = "hello"#), Feed::NeedMore);
        assert_eq!(session.feed(r#"world""#), output("hello\nworld"));
    }

    #[test]
    fn test_parse_error_drops_input() {
        let mut session = Session::new();
        let Feed::Error(message) = session.feed("a = = b") else {
            panic!("expected a parse error");
        };
        assert!(message.starts_with("There was an error parsing your input"));
        assert!(!session.is_pending());
        assert_eq!(session.feed(r#""ok""#), output("ok"));
    }

    #[test]
    fn test_declarations_accumulate() {
        let mut session = Session::new();
        assert_eq!(session.feed(r#"fun f(x) { x + "!" }"#), Feed::Registered(1));
        assert_eq!(session.feed(r#"fun g(x) { f(f(x)) }"#), Feed::Registered(1));
        assert_eq!(session.feed(r#"g("a")"#), output("a!!"));
    }

    #[test]
    fn test_declarations_with_body_run() {
        let mut session = Session::new();
        assert_eq!(session.feed(r#"fun f() { "f" } f() + f()"#), output("ff"));
        assert_eq!(session.feed("f()"), output("f"));
    }

    #[test]
    fn test_reset() {
        let mut session = Session::new();
        session.feed(r#"fun f() { "f" } a = "1""#);
        assert_eq!(session.feed("reset;;"), Feed::Reset);
        assert_eq!(session.feed("a"), output(""));
        let Feed::Error(message) = session.feed("f()") else {
            panic!("expected an undefined function error");
        };
        assert!(message.contains("function f not found"));
    }

    #[test]
    fn test_reset_drops_pending_input() {
        let mut session = Session::new();
        session.feed("while (a) {");
        assert_eq!(session.feed("  reset;;"), Feed::Reset);
        assert!(!session.is_pending());
    }

    #[test]
    fn test_quit() {
        let mut session = Session::new();
        assert_eq!(session.feed("quit;;"), Feed::Quit);
    }

    #[test]
    fn test_timeout_keeps_session_usable() {
        let mut session = Session::with_timeout(Duration::from_millis(100));
        session.feed(r#"x = "kept""#);
        let Feed::Error(message) = session.feed(r#"while ("1") { y = "" }"#) else {
            panic!("expected a timeout");
        };
        assert!(message.contains("timed out"));
        assert_eq!(session.feed("x"), output("kept"));
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("quit;;", "quit"));
        assert!(is_command("a = \"1\"; reset;;", "reset"));
        assert!(!is_command("quit;", "quit"));
        assert!(!is_command("quit", "quit"));
    }

    #[test]
    fn test_dirs_home_returns_some() {
        // HOME should be set in test environment
        let home = dirs_home();
        assert!(home.is_some());
    }
}

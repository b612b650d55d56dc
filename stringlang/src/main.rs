//! stringlang CLI

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stringlang::ast::Program;
use stringlang::cfg::ProgramCfg;
use stringlang::cfg::export::{GraphDescription, TOPLEVEL};
use stringlang::config::RunConfig;
use stringlang::dataflow::{format_flows, liveness, side_effect};
use stringlang::interp::{Environment, Value, eval_with_timeout};
use stringlang::optimize::{Pipeline, normalize};

#[derive(Parser)]
#[command(name = "stringlang", version, about = "stringlang - a language where every value is a string")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program and print its value
    Run {
        /// Source file to run
        file: PathBuf,
        /// Program arguments, available as $0, $1, ...
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// Run configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Enforce the memory budget
        #[arg(long)]
        limit_memory: bool,
        /// Memory budget in bytes
        #[arg(long, allow_negative_numbers = true)]
        max_memory: Option<i64>,
    },
    /// Start the interactive shell
    Repl,
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Parse and dump the AST as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Print the normalized program
    Normalize {
        /// Source file to normalize
        file: PathBuf,
    },
    /// Print the program after normalization and dead code elimination
    Optimize {
        /// Source file to optimize
        file: PathBuf,
    },
    /// Dump control flow graphs
    Cfg {
        /// Source file to graph
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
        format: GraphFormat,
        /// Normalize before building graphs
        #[arg(long)]
        normalize: bool,
    },
    /// Print liveness and side-effect facts per graph node
    Analyze {
        /// Source file to analyze
        file: PathBuf,
        /// Normalize before analysis
        #[arg(long)]
        normalize: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GraphFormat {
    Dot,
    Json,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            file,
            args,
            config,
            timeout_ms,
            limit_memory,
            max_memory,
        } => {
            let overrides = Overrides {
                timeout_ms,
                limit_memory,
                max_memory,
            };
            run_file(&file, args, config.as_deref(), overrides)
        }
        Command::Repl => run_repl(),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Parse { file } => parse_file(&file),
        Command::Normalize { file } => normalize_file(&file),
        Command::Optimize { file } => optimize_file(&file),
        Command::Cfg {
            file,
            format,
            normalize,
        } => graph_file(&file, format, normalize),
        Command::Analyze { file, normalize } => analyze_file(&file, normalize),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr when RUST_LOG is set, e.g. `RUST_LOG=stringlang=debug`
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// Command-line values that win over the config file
struct Overrides {
    timeout_ms: Option<u64>,
    limit_memory: bool,
    max_memory: Option<i64>,
}

fn run_file(
    path: &Path,
    args: Vec<String>,
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(p) => RunConfig::load(p)?,
        None => RunConfig::default(),
    };
    if let Some(ms) = overrides.timeout_ms {
        config.timeout_ms = ms;
    }
    if overrides.limit_memory {
        config.limit_memory = true;
    }
    if let Some(max) = overrides.max_memory {
        config.max_memory = max;
    }

    let program = load_program(path)?;
    let mut env = Environment::new(args.into_iter().map(Value::new).collect());
    env.set_max_footprint(config.max_footprint());

    let value = eval_with_timeout(&mut env, &program, config.timeout())?;
    println!("{value}");
    Ok(())
}

fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut repl = stringlang::repl::Repl::new()?;
    repl.run()?;
    Ok(())
}

fn tokenize_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    let tokens = stringlang::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(())
}

fn parse_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(path)?;
    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}

fn normalize_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(path)?;
    println!("{}", normalize(&program));
    Ok(())
}

fn optimize_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(path)?;
    println!("{}", Pipeline::standard().run(&program));
    Ok(())
}

fn graph_file(path: &Path, format: GraphFormat, normalized: bool) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_for_analysis(path, normalized)?;
    let description = GraphDescription::from_program(&ProgramCfg::build(&program));
    match format {
        GraphFormat::Dot => print!("{}", description.to_dot()),
        GraphFormat::Json => println!("{}", description.to_json()?),
    }
    Ok(())
}

fn analyze_file(path: &Path, normalized: bool) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_for_analysis(path, normalized)?;
    let graphs = ProgramCfg::build(&program);

    let named = std::iter::once((TOPLEVEL, &graphs.body))
        .chain(graphs.funcs.iter().map(|(name, cfg)| (name.as_str(), cfg)));
    for (name, cfg) in named {
        println!("== {name} ==");
        println!("liveness:");
        print!("{}", format_flows(cfg, &liveness::analyze(cfg)));
        println!("side effects:");
        print!("{}", format_flows(cfg, &side_effect::analyze(cfg)));
        println!();
    }
    Ok(())
}

fn load_for_analysis(path: &Path, normalized: bool) -> Result<Program, Box<dyn std::error::Error>> {
    let program = load_program(path)?;
    Ok(if normalized { normalize(&program) } else { program })
}

/// Read and parse a source file, rendering parse errors with source context
fn load_program(path: &Path) -> Result<Program, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    match stringlang::parser::parse_source(&filename, &source) {
        Ok(program) => Ok(program),
        Err(e) => {
            stringlang::error::report_error(&filename, &source, &e);
            Err(format!("could not parse {filename}").into())
        }
    }
}

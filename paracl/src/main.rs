//! ParaCL CLI

use clap::{Parser, Subcommand};
use paracl::error::{report_error, report_runtime_error};
use paracl::interp::{EvalConfig, Interpreter};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "paracl", version, about = "ParaCL interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a ParaCL program, reading `?` input from stdin
    Run {
        /// Source file to run
        file: PathBuf,
        /// Deepest allowed chain of active calls
        #[arg(long, default_value_t = EvalConfig::default().max_call_depth)]
        max_call_depth: usize,
        /// Forward-reference retries allowed per top-level instruction
        #[arg(long, default_value_t = EvalConfig::default().max_forward_retries)]
        max_forward_retries: usize,
    },
    /// Parse and dump AST as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Dump the scope and node tree the interpreter runs (debug)
    Tree {
        /// Source file to lower
        file: PathBuf,
    },
}

/// Enable with `RUST_LOG=paracl=debug` or `RUST_LOG=paracl=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            file,
            max_call_depth,
            max_forward_retries,
        } => run_file(
            &file,
            EvalConfig {
                max_call_depth,
                max_forward_retries,
            },
        ),
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Tree { file } => tree_file(&file),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

type CliResult = Result<ExitCode, Box<dyn std::error::Error>>;

fn run_file(path: &PathBuf, config: EvalConfig) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let mut program = match paracl::compile(&filename, &source) {
        Ok(program) => program,
        Err(e) => {
            report_error(&filename, &source, &e)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let stdin = std::io::stdin().lock();
    let mut stdout = BufWriter::new(std::io::stdout().lock());
    let result = Interpreter::new(&mut program, stdin, &mut stdout)
        .with_config(config)
        .run();
    stdout.flush()?;

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            let span = e.node.map(|node| program.span(node));
            report_runtime_error(&filename, &source, &e, span)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn parse_file(path: &PathBuf) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let tokens = paracl::lexer::tokenize(&source)?;
    let ast = paracl::parser::parse(&filename, &source, tokens)?;

    println!("{}", serde_json::to_string_pretty(&ast)?);
    Ok(ExitCode::SUCCESS)
}

fn tokenize_file(path: &PathBuf) -> CliResult {
    let source = std::fs::read_to_string(path)?;

    let tokens = paracl::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(ExitCode::SUCCESS)
}

fn tree_file(path: &PathBuf) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let program = paracl::compile(&filename, &source)?;
    program.check_ownership()?;
    print!("{}", program.dump());
    Ok(ExitCode::SUCCESS)
}

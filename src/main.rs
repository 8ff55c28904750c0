use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::{Subcommand, ValueEnum};
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use ember_interpreter as ember;

use ember::ast_printer::AstPrinter;
use ember::error::LoxError;
use ember::interpreter::Interpreter;
use ember::parser::Parser;
use ember::resolver::DepthPolicy;
use ember::scanner::{self, Scanner};

/// Exit status for errors in the program text (lex, parse, resolve).
const EXIT_DATA_ERR: i32 = 65;

/// Exit status for errors raised while the program runs.
const EXIT_SOFTWARE: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Ember language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the token list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a program and prints each statement's AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as an Ember program
    Run {
        filename: Option<PathBuf>,

        /// How the resolver records distances of variables captured by closures
        #[arg(long, value_enum, default_value_t = Depths::Lexical)]
        depth_policy: Depths,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Depths {
    Lexical,
    FunctionRelative,
}

impl From<Depths> for DepthPolicy {
    fn from(depths: Depths) -> Self {
        match depths {
            Depths::Lexical => DepthPolicy::Lexical,
            Depths::FunctionRelative => DepthPolicy::FunctionRelative,
        }
    }
}

/// Maps the file read-only and copies it out as UTF‑8 text.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    // SAFETY: the map is read once, immediately copied into an owned String
    // and dropped before anything else could observe a concurrent truncation.
    let map = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&map)
        .map_err(LoxError::from)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", text.len(), filename);

    Ok(text)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'ember_interpreter::' from module path
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("ember_interpreter::").unwrap_or(module);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Prints `err` and exits with the status matching the failing stage.
fn fail(err: LoxError) -> ! {
    debug!("Exiting on error: {:?}", err);

    eprintln!("{}", err);

    if err.is_runtime() {
        process::exit(EXIT_SOFTWARE);
    }
    process::exit(EXIT_DATA_ERR);
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    if json {
        let tokens = scanner::scan(source).unwrap_or_else(|e| fail(e));
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);
        return Ok(());
    }

    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_DATA_ERR);
        process::exit(EXIT_DATA_ERR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str) {
    let tokens = scanner::scan(source).unwrap_or_else(|e| fail(e));
    let statements = Parser::new(&tokens).parse().unwrap_or_else(|e| fail(e));

    info!("Parsed {} statements", statements.len());

    for stmt in &statements {
        print!("{}", AstPrinter::print_stmt(stmt));
    }
}

fn evaluate(source: &str) {
    let tokens = scanner::scan(source).unwrap_or_else(|e| fail(e));
    let expr = Parser::new(&tokens)
        .parse_expression()
        .unwrap_or_else(|e| fail(e));

    debug!("AST: {}", AstPrinter::print(&expr));

    let mut interpreter = Interpreter::new();
    match interpreter.evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
        }
        Err(e) => fail(e),
    }
}

fn run(source: &str, policy: DepthPolicy) {
    info!("Provided input:\n {}", source);

    let stdout = io::stdout();
    if let Err(e) = ember::run_with_policy(source, stdout.lock(), policy) {
        fail(e);
    }

    info!("Program executed successfully");
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let filename = match &args.commands {
        Commands::Tokenize { filename, .. }
        | Commands::Parse { filename }
        | Commands::Evaluate { filename }
        | Commands::Run { filename, .. } => filename.clone(),
    };

    let Some(filename) = filename else {
        info!("No filepath provided");
        println!("No input filepath was provided. Exiting...");
        process::exit(0);
    };

    let source = read_file(&filename)?;

    match args.commands {
        Commands::Tokenize { json, .. } => tokenize(&source, json)?,
        Commands::Parse { .. } => parse(&source),
        Commands::Evaluate { .. } => evaluate(&source),
        Commands::Run { depth_policy, .. } => run(&source, depth_policy.into()),
    }

    Ok(())
}

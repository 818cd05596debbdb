// ABOUTME: CLI entry point: script execution and the interactive REPL

mod repl;

use clap::Parser;
use repl::ReplHelper;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use toyscript::config::{
    INPUT_PROMPT, PROMPT, SUPPORTED_OPERATIONS, VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE,
};
use toyscript::eval::{Flow, Interpreter};
use toyscript::parser;
use toyscript::session::{RunStatus, Session};
use tracing_subscriber::EnvFilter;

/// ToyScript interpreter
#[derive(Parser, Debug)]
#[command(name = "toyscript")]
#[command(version = VERSION)]
#[command(about = "A small imperative scripting language")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Enable verbose evaluator tracing
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match args.script {
        Some(path) => run_script(&path),
        None => run_repl(),
    }
}

/// `--verbose` turns on debug-level evaluator traces; otherwise only
/// warnings surface.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Script mode: run the file to completion, feeding `input()` from stdin.
/// Exits 0 on success and 1 on any parse or runtime error.
fn run_script(path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("cannot read script file {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let mut session = match Session::new(&source) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Parse error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut step = session.run();
    loop {
        for line in &step.output {
            println!("{}", line);
        }
        match step.status {
            RunStatus::Complete => return ExitCode::SUCCESS,
            RunStatus::RuntimeError(message) => {
                eprintln!("Error: {}", message);
                return ExitCode::FAILURE;
            }
            RunStatus::InputRequired { .. } => {
                let mut line = String::new();
                if std::io::stdin().read_line(&mut line).is_err() {
                    eprintln!("Error: failed to read input");
                    return ExitCode::FAILURE;
                }
                step = session.supply_input(line.trim_end_matches(['\r', '\n']));
            }
        }
    }
}

/// Interactive mode. Definitions and variables persist across submissions;
/// the helper keeps a submission open until its braces balance.
fn run_repl() -> ExitCode {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<ReplHelper, DefaultHistory> = match Editor::with_config(config) {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("failed to initialize REPL: {}", err);
            return ExitCode::FAILURE;
        }
    };
    rl.set_helper(Some(ReplHelper));

    let history_file = ".toyscript_history";
    let _ = rl.load_history(history_file);

    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);
    println!("{}", SUPPORTED_OPERATIONS);

    let mut interp = Interpreter::new();
    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                    println!("Goodbye!");
                    break;
                }
                evaluate_submission(&mut interp, &line, &mut rl);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    ExitCode::SUCCESS
}

/// Parses one REPL submission against the interpreter's accumulated
/// definitions and runs it, prompting inline when `input()` suspends.
fn evaluate_submission(
    interp: &mut Interpreter,
    source: &str,
    rl: &mut Editor<ReplHelper, DefaultHistory>,
) {
    let parser = parser::Parser::with_defs(source, interp.env().defs().clone());
    let statements = match parser.parse() {
        Ok((statements, _)) => statements,
        Err(err) => {
            eprintln!("Parse error: {}", err);
            return;
        }
    };

    let mut index = 0;
    while index < statements.len() {
        match interp.evaluate(&statements[index]) {
            Ok(_) | Err(Flow::Return(_)) => {
                flush_output(interp);
                index += 1;
            }
            Err(Flow::InputRequired { .. }) => {
                flush_output(interp);
                match rl.readline(INPUT_PROMPT) {
                    Ok(value) => interp.stage_input(value),
                    Err(_) => {
                        eprintln!("Error: input aborted");
                        return;
                    }
                }
            }
            Err(Flow::Error(err)) => {
                flush_output(interp);
                eprintln!("Error: {}", err);
                return;
            }
        }
    }
}

fn flush_output(interp: &mut Interpreter) {
    for line in interp.drain_output() {
        println!("{}", line);
    }
}

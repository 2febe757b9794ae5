// ABOUTME: CLI front-end: script runner and interactive REPL

use clap::Parser;
use duso::config::{
    HISTORY_FILE, PROMPT, VERSION, WELCOME_FOOTER, WELCOME_MESSAGE, WELCOME_SUBTITLE,
};
use duso::highlighter::DusoHelper;
use duso::interpreter::Interpreter;
use duso::value::Value;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use std::process::ExitCode;

/// Duso interpreter
#[derive(Parser, Debug)]
#[command(name = "duso")]
#[command(version = VERSION)]
#[command(about = "An embeddable scripting language for orchestrating agent workflows")]
struct CliArgs {
    /// Script file to execute (starts a REPL when omitted)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Log execution details to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let interp = Interpreter::new(args.verbose);

    match args.script {
        Some(path) => run_script(interp, &path),
        None => run_repl(interp),
    }
}

/// Execute a script file, print its captured output, and report any error
/// on stderr.
fn run_script(mut interp: Interpreter, path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("duso: cannot read {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };
    interp.set_source_name(&path.display().to_string());

    let (output, err) = interp.execute(&source);
    print!("{}", output);
    match err {
        Some(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

/// Interactive loop with history and syntax highlighting.
fn run_repl(mut interp: Interpreter) -> ExitCode {
    interp.set_source_name("<repl>");

    let config = Config::builder().auto_add_history(true).build();
    let mut rl = match Editor::with_config(config) {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("duso: failed to initialize REPL: {}", err);
            return ExitCode::FAILURE;
        }
    };
    rl.set_helper(Some(DusoHelper::new()));
    let _ = rl.load_history(HISTORY_FILE);

    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);
    println!("{}", WELCOME_FOOTER);

    // Output is cumulative; remember how much has been shown already
    let mut shown = 0usize;
    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "quit" || trimmed == "exit" {
                    println!("Goodbye!");
                    break;
                }

                let result = interp.execute_line(&line);
                let output = interp.get_output();
                print!("{}", &output[shown..]);
                shown = output.len();
                match result {
                    Ok(Value::Nil) => {}
                    Ok(value) => println!("=> {}", value),
                    Err(err) => eprintln!("Error: {}", err),
                }
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

    let _ = rl.save_history(HISTORY_FILE);
    ExitCode::SUCCESS
}

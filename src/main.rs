use std::path::{Path, PathBuf};
use std::process;
use std::sync::Once;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use lispy::INTERPRETER_STACK_SIZE;
use lispy::ast::{Function, Value};
use lispy::builtinops::io::load_file;
use lispy::builtinops::{find_builtin, get_builtin_ops};
use lispy::evaluator::{Environment, create_global_env, eval_source};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Prelude looked up in the working directory when `--prelude` is not given
const DEFAULT_PRELUDE: &str = "prelude.lispy";

#[derive(Parser, Debug)]
#[command(name = "lispy", version, about = "Lispy interpreter and REPL")]
struct Args {
    /// Source files to run in order. Without any, start the REPL.
    files: Vec<PathBuf>,

    /// Definitions to load before anything else.
    #[arg(long, value_name = "PATH")]
    prelude: Option<PathBuf>,

    /// Do not load a prelude.
    #[arg(long, conflicts_with = "prelude")]
    no_prelude: bool,
}

static TRACING_INIT: Once = Once::new();

/// Install a log subscriber on stderr when `RUST_LOG` is set.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let interpreter = thread::Builder::new()
        .name("lispy".into())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || run(&args))
        .context("could not start the interpreter thread")?;

    match interpreter.join() {
        Ok(result) => result,
        Err(panic_info) => {
            eprintln!("The interpreter encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut env = create_global_env();

    if !args.no_prelude {
        load_prelude(&mut env, args.prelude.as_deref())?;
    }

    if args.files.is_empty() {
        return run_repl(&mut env);
    }

    for file in &args.files {
        load_file(&mut env, file).with_context(|| format!("failed to run {}", file.display()))?;
    }
    Ok(())
}

/// An explicit prelude must load; the default one is optional.
fn load_prelude(env: &mut Environment, explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(path) => load_file(env, path)
            .with_context(|| format!("could not load prelude {}", path.display())),
        None if Path::new(DEFAULT_PRELUDE).exists() => {
            load_file(env, DEFAULT_PRELUDE).context("could not load the default prelude")
        }
        None => {
            tracing::debug!(path = DEFAULT_PRELUDE, "no prelude found, skipping");
            Ok(())
        }
    }
}

fn run_repl(env: &mut Environment) -> Result<()> {
    println!("Lispy Version {}", env!("CARGO_PKG_VERSION"));
    println!("Enter expressions like: (+ 1 2) or (eval {{head {{1 2 3}}}})");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().context("could not initialize the line editor")?;

    loop {
        match rl.readline("lispy> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                // Add the line to history
                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match eval_source(env, line) {
                    Ok(results) => {
                        for result in results {
                            println!("{result}");
                        }
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context("could not read input"));
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!("Lispy commands:");
    println!("  :help  - Show this help message");
    println!("  :env   - Show current environment bindings");
    println!("  :quit  - Exit the interpreter");
    println!("  :exit  - Exit the interpreter");
    println!("  Ctrl+C - Exit the interpreter");
    println!();
    println!("Syntax:");
    println!("  Numbers: 42, -5, 2.5     Strings: \"text\"     Characters: 'c'");
    println!("  S-expressions are evaluated: (+ 1 2)");
    println!("  Q-expressions are quoted:    {{+ 1 2}}");
    println!("  Comments run to end of line: ; like this");
    println!();
    println!("Examples:");
    println!("  (def {{x y}} 1 2)");
    println!("  (def {{add}} (\\ {{a b}} {{+ a b}}))");
    println!("  (map (\\ {{n}} {{* n n}}) {{1 2 3}})");
    println!();

    let names: Vec<&str> = get_builtin_ops().iter().flat_map(|op| op.names()).collect();
    println!("Builtins: {}", names.join(" "));
}

/// True when `name` is still bound to the builtin registered under it.
fn is_registered_builtin(name: &str, value: &Value) -> bool {
    match value {
        Value::Function(Function::Builtin(builtin)) => {
            find_builtin(name).is_some_and(|op| op.name == builtin.name)
        }
        _ => false,
    }
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate built-in functions from user-defined values
    let (builtins, user_defined): (Vec<_>, Vec<_>) = bindings
        .into_iter()
        .partition(|(name, value)| is_registered_builtin(name, value));

    // Print built-in functions
    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        // Print in columns for readability
        for row in builtins.chunks(4) {
            let line: String = row.iter().map(|(name, _)| format!("  {name:<15}")).collect();
            println!("{}", line.trim_end());
        }
        println!();
    }

    // Print user-defined values
    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}

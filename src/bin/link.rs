//! CLI front end: run one filter over standard input.
//!
//! Usage:
//!   link <command> [args...]
//!   <command> [args...]
//!
//! The second form applies when the binary is installed (copied or linked)
//! under a command's name. Diagnostics go to stderr; set `LINK_LOG=debug`
//! for run statistics.

use std::io::{self, ErrorKind};
use std::path::Path;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use link_filters::{ArgError, COMMANDS, Invocation, LinkError, decode_arguments, execute, find, prepare};

const LOG_ENV: &str = "LINK_LOG";
const PROGRAM: &str = "link";

#[derive(Parser)]
#[command(name = PROGRAM, version, about = "Composable line-oriented filters for shell pipelines")]
struct Cli {
    /// Command to run; lists the commands when omitted
    command: Option<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .with_level(false)
        .init();
}

/// The command name and its raw arguments.
///
/// Only the command name goes through clap; everything after it is handed to
/// the command's own grammar untouched.
fn resolve_command() -> Result<(Option<String>, Vec<String>), ArgError> {
    let mut argv = std::env::args_os();
    let program = argv
        .next()
        .map_or_else(|| PROGRAM.to_string(), |p| p.to_string_lossy().into_owned());
    let mut rest = decode_arguments(argv)?.into_iter();

    let invoked_as = Path::new(&program)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|stem| find(stem).is_some());
    if let Some(command) = invoked_as {
        return Ok((Some(command), rest.collect()));
    }

    let head = rest.next();
    let cli = Cli::parse_from(std::iter::once(program).chain(head));
    Ok((cli.command, rest.collect()))
}

fn list_commands() {
    println!("Usage: {PROGRAM} <command> [args...]\n");
    println!("Commands:");
    for spec in COMMANDS {
        println!("  {:<14}{}", spec.name, spec.summary);
    }
    println!("\nRun '{PROGRAM} <command> --h' for a command's help.");
}

fn run(command: &str, args: Vec<String>) -> Result<(), LinkError> {
    match prepare(command, args)? {
        Invocation::Help(text) => println!("{text}"),
        Invocation::Run(mut stage) => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            execute(stage.as_mut(), stdin.lock(), stdout.lock())?;
        }
    }
    Ok(())
}

fn main() {
    init_logging();

    let (command, args) = match resolve_command() {
        Ok(resolved) => resolved,
        Err(err) => {
            eprintln!("{PROGRAM}: {err}");
            process::exit(-1);
        }
    };
    let Some(command) = command else {
        list_commands();
        return;
    };

    match run(&command, args) {
        Ok(()) => {}
        // Downstream closed the pipe; nothing left to report.
        Err(LinkError::Io { ref source, .. }) if source.kind() == ErrorKind::BrokenPipe => {}
        Err(err @ LinkError::UnknownCommand(_)) => {
            eprintln!("{PROGRAM}: {err}");
            process::exit(-1);
        }
        Err(err) => {
            if err.wants_help_hint() {
                eprintln!("{command}: {err} Try '{command} --h' for help.");
            } else {
                eprintln!("{command}: {err}");
            }
            process::exit(-1);
        }
    }
}

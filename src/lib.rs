//! # link-filters
//!
//! Small line-oriented filters meant to be chained with shell pipes.
//!
//! Every command reads lines from standard input, writes lines to standard
//! output and reports problems on standard error. Commands share one
//! argument grammar and one regex-driven line transform.
//!
//! ## Overview
//!
//! - **Argument grammar**: positional parameters followed by `--name value...`
//!   options ([`args`])
//! - **Patterns and templates**: a regex plus a substitution template, with
//!   `$n`, `${name}` and context tokens ([`pattern`], [`engine`])
//! - **Stages**: each command builds one [`LineStage`] ([`stage`], [`commands`])
//! - **Executor**: streams lines through the stage, drains unread input and
//!   keeps going after per-line failures ([`executor`])
//!
//! ## Example
//!
//! ```
//! use link_filters::{Invocation, execute_str, prepare};
//!
//! let Invocation::Run(mut stage) = prepare("project", [r"^(\d+)-(\w+)$", "$2_$1"]).unwrap() else {
//!     panic!("unexpected help");
//! };
//! let (lines, _) = execute_str(stage.as_mut(), "42-foo\nnoise\n7-bar\n").unwrap();
//! assert_eq!(lines, vec!["foo_42", "bar_7"]);
//! ```

pub mod args;
pub mod commands;
pub mod engine;
pub mod error;
pub mod executor;
pub mod pattern;
pub mod stage;

pub use args::{HELP_OPTION, ParsedArguments, decode_arguments, parse_arguments};
pub use commands::{COMMANDS, CommandSpec, Invocation, find, prepare};
pub use engine::{DEFAULT_SEPARATOR, Extractor, LineFilter, PrependInput, Projector, evaluate};
pub use error::{ArgError, LineError, LinkError, PatternError, Result, UsageError};
pub use executor::{RunSummary, execute, execute_str};
pub use pattern::{CompiledPattern, Template};
pub use stage::{LineIter, LineStage};

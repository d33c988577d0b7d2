//! Command registry.
//!
//! Each command is a builder that validates [`ParsedArguments`] against its
//! own grammar and returns the [`LineStage`] that implements it. Builders
//! compile every pattern up front, so a malformed pattern is reported before
//! the first input line is read.
//!
//! Families:
//! - `text` - per-line string edits and simple generators
//! - `sequence` - positional take/skip/reverse
//! - `matching` - regex filters and projections
//! - `paths` - path-derived projections (`--rx`, `--pi`)
//! - `files` - filesystem side effects
//! - `enumerate` - directory listings

mod enumerate;
mod files;
mod matching;
mod paths;
mod sequence;
mod text;

pub use paths::format_size;

use std::borrow::Cow;

use crate::args::{ParsedArguments, parse_arguments};
use crate::engine::{Extractor, PrependInput};
use crate::error::{ArgError, LinkError, Result, UsageError};
use crate::stage::LineStage;

type BuildFn = fn(&ParsedArguments) -> Result<Box<dyn LineStage>>;

/// A named command: its grammar summary and its builder.
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    build: BuildFn,
}

impl CommandSpec {
    /// Validate `args` and build the command's stage.
    pub fn build(&self, args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
        (self.build)(args)
    }

    /// Text printed for `--h`.
    pub fn help(&self) -> String {
        format!(
            "{}\nVersion {}\nUsage:\t{} {}",
            self.summary,
            env!("CARGO_PKG_VERSION"),
            self.name,
            self.usage
        )
    }
}

macro_rules! command {
    ($name:literal, $usage:literal, $summary:literal, $build:path) => {
        CommandSpec {
            name: $name,
            usage: $usage,
            summary: $summary,
            build: $build,
        }
    };
}

/// Every command, in alphabetical order.
pub static COMMANDS: &[CommandSpec] = &[
    command!("append", "suffix [--h]", "Appends a string to each line.", text::append),
    command!("copyFiles", "ptrn dest [src] [--ri][--ovw][--cs][--h]", "Copies the files named by each matching line and returns the copies.", files::copy_files),
    command!("copyToDir", "dir [--ri][--ovw][--h]", "Copies each input file into a directory.", files::copy_to_dir),
    command!("count", "[--h]", "Returns the number of input lines.", text::count),
    command!("countFrq", "[--wrd][--frq [precision]][--sep separator][--h]", "Counts the occurrences of each character or word.", text::count_frq),
    command!("createDirs", "[--rx ptrn dir [--cs][--ri]] [--h]", "Creates each directory of the input sequence.", files::create_dirs),
    command!("delDirs", "[--rx ptrn dir [--cs][--ri]] [--h]", "Deletes each directory of the input sequence with its contents.", files::del_dirs),
    command!("delFiles", "[--rx ptrn file [--cs][--ri]] [--h]", "Deletes each file of the input sequence.", files::del_files),
    command!("dirsName", "[--rx ptrn path [--cs]][--pi [sep]][--h]", "Returns the directory part of each input path.", paths::dirs_name),
    command!("dirsSize", "[--rx ptrn dir [--cs]] [--pi [sep]][--fmt][--h]", "Returns the total size of each input directory.", paths::dirs_size),
    command!("distinct", "[--rx ptrn key][--cs][--h]", "Removes duplicate lines.", matching::distinct),
    command!("dump", "file [--rx ptrn [--cs]][--ovw][--h]", "Copies the input to the output and to a file.", files::dump),
    command!("emit", "[--rx ptrn file [--cs]][--h]", "Returns the contents of each input file.", files::emit),
    command!("endsWith", "suffix [--cs][--h]", "Returns the lines ending with a suffix.", text::ends_with),
    command!("enumDirs", "[dir_0 dir_1 ...] [--r [depth]][--hid][--dp][--h]", "Lists the subdirectories of directories.", enumerate::enum_dirs),
    command!("enumFiles", "[dir_0 dir_1 ...] [--r [depth]][--hid][--dp][--h]", "Lists the files of directories.", enumerate::enum_files),
    command!("filesName", "[--rx ptrn path [--cs]][--noext][--pi [sep]][--h]", "Returns the file name of each input path.", paths::files_name),
    command!("filesSize", "[--rx ptrn file [--cs]] [--pi [sep]][--fmt][--h]", "Returns the size of each input file.", paths::files_size),
    command!("fullPaths", "[--rx ptrn path [--cs]] [--pi [sep]] [--h]", "Returns the absolute form of each input path.", paths::full_paths),
    command!("groupBy", "ptrn key [--cs][--h]", "Groups matching lines by a templated key.", matching::group_by),
    command!("insert", "str ndx [--pi [sep]][--h]", "Inserts a string at a character index of each line.", text::insert),
    command!("join", "file_0 [file_1 file_2 ...][--sep str][--h]", "Joins each input line with the lines of files at the same index.", text::join),
    command!("length", "[--rx ptrn str [--cs]][--pi [sep]][--h]", "Returns the length of each line.", matching::length),
    command!("max", "[--rx ptrn key][--cs][--h]", "Returns the greatest line.", matching::max),
    command!("merge", "[sep] [--n N][--h]", "Merges input lines into one line, or into lines of N.", text::merge),
    command!("moveToDir", "dir [--ri][--ovw][--h]", "Moves each input file into a directory.", files::move_to_dir),
    command!("padEnd", "len [--c char][--h]", "Pads each line on the right to a length.", text::pad_end),
    command!("pathsDate", "[--rx ptrn path [--cs]] [--crd][--utc][--pi [sep]][--notm][--h]", "Returns the modification or creation date of each input path.", paths::paths_date),
    command!("prepend", "prefix [--h]", "Prepends a string to each line.", text::prepend),
    command!("project", "ptrn output [--cs][--h]", "Replaces each matching line with a templated projection.", matching::project),
    command!("putAt", "str ndx [--h]", "Inserts a line at an index of the input sequence.", text::put_at),
    command!("putFirst", "str [--h]", "Inserts a line before the input sequence.", text::put_first),
    command!("putLast", "str [--h]", "Appends a line after the input sequence.", text::put_last),
    command!("putWhen", "ptrn str [--cs][--h]", "Inserts a line after the first matching line.", matching::put_when),
    command!("range", "N [--init start][--stp step][--pad][--h]", "Generates a sequence of integers.", text::range),
    command!("relativePaths", "dir [--rx ptrn path [--cs]] [--pi [sep]][--h]", "Returns each input path relative to a directory.", paths::relative_paths),
    command!("remove", "str [--cs][--pi [sep]][--h]", "Removes every occurrence of a string from each line.", text::remove),
    command!("renFiles", "ptrn dest [src] [--ri][--ovw][--cs][--h]", "Renames or moves the files named by each matching line.", files::ren_files),
    command!("reorder", "[--rx ptrn key][--cs][--dsc][--h]", "Sorts the input lines.", matching::reorder),
    command!("repeat", "str N [--h]", "Repeats a string N times.", text::repeat),
    command!("reverse", "[--h]", "Returns the input lines in reverse order.", sequence::reverse),
    command!("serialize", "[sep] [--init start][--stp step][--h]", "Numbers each line.", text::serialize),
    command!("skip", "ptrn [--cs][--h]", "Drops the lines matching a pattern.", matching::skip),
    command!("skipFirst", "[N] [--h]", "Drops the first N lines.", sequence::skip_first),
    command!("skipLast", "[N] [--h]", "Drops the last N lines.", sequence::skip_last),
    command!("skipUntil", "ptrn [--cs][--h]", "Drops lines until one matches, then returns the rest.", matching::skip_until),
    command!("skipWhile", "ptrn [--cs][--h]", "Drops lines while they match, then returns the rest.", matching::skip_while),
    command!("slice", "ndxStart [N] [--pi [sep]] [--h]", "Returns a character range of each line.", text::slice),
    command!("split", "[sep][--nompty][--trim][--h]", "Splits each line into several lines.", text::split),
    command!("startsWith", "prefix [--cs][--h]", "Returns the lines starting with a prefix.", text::starts_with),
    command!("substitute", "oldStr newStr [--cs][--pi [sep]][--h]", "Replaces every occurrence of a string in each line.", text::substitute),
    command!("takeFirst", "[N] [--h]", "Returns the first N lines.", sequence::take_first),
    command!("takeLast", "[N] [--h]", "Returns the last N lines.", sequence::take_last),
    command!("takeUntil", "ptrn [--cs][--h]", "Returns lines until one matches.", matching::take_until),
    command!("takeWhile", "ptrn [--cs][--h]", "Returns lines while they match.", matching::take_while),
    command!("toLowerCase", "[--h]", "Converts each line to lowercase.", text::to_lower_case),
    command!("toUpperCase", "[--h]", "Converts each line to uppercase.", text::to_upper_case),
    command!("wrap", "N [--h]", "Breaks each line into lines of at most N characters.", text::wrap),
];

/// Look up a command by name (case-sensitive).
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// What an invocation resolved to.
pub enum Invocation {
    /// `--h` was given; print this and exit successfully.
    Help(String),
    Run(Box<dyn LineStage>),
}

/// Parse `args` for `command` and build its stage, or its help text.
pub fn prepare<I, S>(command: &str, args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let spec = find(command).ok_or_else(|| LinkError::UnknownCommand(command.to_string()))?;
    let parsed = parse_arguments(args)?;
    if parsed.help_requested() {
        return Ok(Invocation::Help(spec.help()));
    }
    Ok(Invocation::Run(spec.build(&parsed)?))
}

// ---------------------------------------------------------------------------
// Shared option handling
// ---------------------------------------------------------------------------

/// Parse a non-negative 32-bit count.
fn parse_count(s: &str) -> std::result::Result<usize, UsageError> {
    match s.parse::<i32>() {
        Ok(n) if n >= 0 => Ok(n as usize),
        _ => Err(UsageError),
    }
}

/// Parse a signed 32-bit integer.
fn parse_int(s: &str) -> std::result::Result<i32, UsageError> {
    s.parse::<i32>().map_err(|_| UsageError)
}

/// Optional `[N]` positional, defaulting to 1.
fn optional_count(args: &ParsedArguments) -> std::result::Result<usize, UsageError> {
    match args.expect_parameters(0..=1)? {
        [] => Ok(1),
        [n] => parse_count(n),
        _ => Err(UsageError),
    }
}

/// Commands that take no options at all.
fn no_options(args: &ParsedArguments) -> std::result::Result<(), ArgError> {
    args.reject_unknown(&[])
}

/// `[--rx ptrn tmpl [--cs]]`: `--cs` without `--rx` is a usage error.
fn rx_extractor(args: &ParsedArguments) -> Result<Extractor> {
    let rx = args.values("rx", 2..=2)?;
    let case_sensitive = args.flag("cs")?;
    if rx.is_none() && case_sensitive {
        return Err(UsageError.into());
    }
    Ok(Extractor::from_rx(rx, case_sensitive)?)
}

/// `[--pi [sep]]`
fn prepend_input(args: &ParsedArguments) -> std::result::Result<PrependInput, UsageError> {
    Ok(PrependInput::from_option(args.values("pi", 0..=1)?))
}

/// Comparison key honoring `--cs`.
fn fold_case(s: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.to_lowercase())
    }
}

#[cfg(test)]
pub(crate) fn run(name: &str, args: &[&str], input: &str) -> Result<Vec<String>> {
    match prepare(name, args.iter().copied())? {
        Invocation::Help(text) => Ok(text.lines().map(str::to_string).collect()),
        Invocation::Run(mut stage) => {
            let (out, _) = crate::executor::execute_str(stage.as_mut(), input)?;
            Ok(out)
        }
    }
}

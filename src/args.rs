//! Command-line grammar shared by every command.
//!
//! ```text
//! param0 param1 ... --k0 v00 v01 ... --k1 v10 v11 ...
//! ```
//!
//! - Tokens before the first `--name` are positional parameters.
//! - Each `--name` collects the tokens that follow it until the next `--name`.
//! - A bare `--` and a repeated `--name` are rejected.
//!
//! The parser knows nothing about individual commands. Builders validate the
//! result afterwards with [`ParsedArguments::reject_unknown`],
//! [`ParsedArguments::flag`] and [`ParsedArguments::values`].

use std::ffi::OsString;
use std::ops::RangeInclusive;

use crate::error::{ArgError, UsageError};

const OPTION_PREFIX: &str = "--";

/// Reserved option that prints a command's help and exits.
pub const HELP_OPTION: &str = "h";

/// Positional parameters and options of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArguments {
    parameters: Vec<String>,
    options: Vec<(String, Vec<String>)>,
}

/// Accumulator for the option phase.
struct OpenOption {
    token: String,
    values: Vec<String>,
}

/// Convert process arguments to strings, rejecting any that are not valid
/// Unicode.
pub fn decode_arguments<I>(args: I) -> Result<Vec<String>, ArgError>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|raw| ArgError::NotUnicode(raw.to_string_lossy().into_owned()))
        })
        .collect()
}

/// Parse a raw argument vector.
pub fn parse_arguments<I, S>(args: I) -> Result<ParsedArguments, ArgError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parsed = ParsedArguments::default();
    let mut open: Option<OpenOption> = None;

    for arg in args {
        let arg = arg.into();

        if !arg.starts_with(OPTION_PREFIX) {
            match open.as_mut() {
                Some(opt) => opt.values.push(arg),
                None => parsed.parameters.push(arg),
            }
            continue;
        }

        if arg.len() == OPTION_PREFIX.len() {
            return Err(ArgError::BareOption(arg));
        }

        if let Some(prev) = open.take() {
            parsed.commit(prev)?;
        }
        open = Some(OpenOption {
            token: arg,
            values: Vec::new(),
        });
    }

    if let Some(last) = open {
        parsed.commit(last)?;
    }

    Ok(parsed)
}

impl ParsedArguments {
    fn commit(&mut self, opt: OpenOption) -> Result<(), ArgError> {
        let name = &opt.token[OPTION_PREFIX.len()..];
        if self.has_option(name) {
            return Err(ArgError::DuplicateOption(opt.token));
        }
        self.options.push((name.to_string(), opt.values));
        Ok(())
    }

    /// Positional parameters in input order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Options in the order they appeared.
    pub fn options(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.options
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Values of an option, if present.
    pub fn option(&self, name: &str) -> Option<&[String]> {
        self.options
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|(n, _)| n == name)
    }

    /// True when `--h` was given.
    pub fn help_requested(&self) -> bool {
        self.has_option(HELP_OPTION)
    }

    /// Fail on the first option not in `allowed`.
    pub fn reject_unknown(&self, allowed: &[&str]) -> Result<(), ArgError> {
        match self.options().find(|(name, _)| !allowed.contains(name)) {
            Some((name, _)) => Err(ArgError::UnknownOption(format!("{OPTION_PREFIX}{name}"))),
            None => Ok(()),
        }
    }

    /// A switch: absent, or present with no values.
    pub fn flag(&self, name: &str) -> Result<bool, UsageError> {
        match self.option(name) {
            None => Ok(false),
            Some([]) => Ok(true),
            Some(_) => Err(UsageError),
        }
    }

    /// Values of an option whose arity must fall in `arity`.
    pub fn values(
        &self,
        name: &str,
        arity: RangeInclusive<usize>,
    ) -> Result<Option<&[String]>, UsageError> {
        match self.option(name) {
            Some(values) if !arity.contains(&values.len()) => Err(UsageError),
            other => Ok(other),
        }
    }

    /// Check the positional count against `arity`.
    pub fn expect_parameters(&self, arity: RangeInclusive<usize>) -> Result<&[String], UsageError> {
        if arity.contains(&self.parameters.len()) {
            Ok(&self.parameters)
        } else {
            Err(UsageError)
        }
    }
}

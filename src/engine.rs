//! The line-transform protocol shared by all regex-mode commands.
//!
//! One compiled pattern, one or two templates, one line in, zero or one
//! derived value out. Lines the pattern does not match are dropped without
//! comment; that is a filter, not an error.

use crate::error::PatternError;
use crate::pattern::{CompiledPattern, Template};

/// Separator used by `--pi` when none is given.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Evaluate `template` against the leftmost match of `pattern` in `line`.
pub fn evaluate(line: &str, pattern: &CompiledPattern, template: &Template) -> Option<String> {
    pattern
        .captures(line)
        .map(|caps| template.expand(&caps, line))
}

/// Filter mode: keep or drop the original line on a match test.
#[derive(Debug, Clone)]
pub struct LineFilter {
    pattern: CompiledPattern,
    keep_matching: bool,
}

impl LineFilter {
    /// Keep lines the pattern matches.
    pub fn matching(pattern: CompiledPattern) -> Self {
        Self {
            pattern,
            keep_matching: true,
        }
    }

    /// Keep lines the pattern does not match.
    pub fn rejecting(pattern: CompiledPattern) -> Self {
        Self {
            pattern,
            keep_matching: false,
        }
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    pub fn keeps(&self, line: &str) -> bool {
        self.pattern.is_match(line) == self.keep_matching
    }
}

/// Projection mode: replace a line with a template's evaluation.
#[derive(Debug, Clone)]
pub struct Projector {
    pattern: CompiledPattern,
    template: Template,
}

impl Projector {
    pub fn new(pattern: CompiledPattern, template: &str) -> Self {
        let template = pattern.template(template);
        Self { pattern, template }
    }

    /// Compile `pattern` and bind `template` to it.
    pub fn compile(pattern: &str, template: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        Ok(Self::new(CompiledPattern::new(pattern, case_sensitive)?, template))
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn project(&self, line: &str) -> Option<String> {
        evaluate(line, &self.pattern, &self.template)
    }

    /// Evaluate this projector's template and `other` against the same match.
    pub fn project_pair(&self, line: &str, other: &Template) -> Option<(String, String)> {
        self.pattern.captures(line).map(|caps| {
            (
                self.template.expand(&caps, line),
                other.expand(&caps, line),
            )
        })
    }
}

/// Where a command takes its operand from: the whole line, or a `--rx`
/// projection of it.
#[derive(Debug, Clone, Default)]
pub enum Extractor {
    #[default]
    WholeLine,
    Regex(Projector),
}

impl Extractor {
    /// Build from the values of a `--rx ptrn tmpl` option.
    pub fn from_rx(rx: Option<&[String]>, case_sensitive: bool) -> Result<Self, PatternError> {
        match rx {
            Some([pattern, template]) => Ok(Extractor::Regex(Projector::compile(
                pattern,
                template,
                case_sensitive,
            )?)),
            _ => Ok(Extractor::WholeLine),
        }
    }

    pub fn extract(&self, line: &str) -> Option<String> {
        match self {
            Extractor::WholeLine => Some(line.to_string()),
            Extractor::Regex(projector) => projector.project(line),
        }
    }
}

/// Output shape for commands supporting `--pi [sep]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrependInput {
    separator: Option<String>,
}

impl PrependInput {
    /// Build from the values of a `--pi [sep]` option.
    pub fn from_option(values: Option<&[String]>) -> Self {
        let separator = values.map(|v| {
            v.first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string())
        });
        Self { separator }
    }

    /// `value`, or `input<sep>value` when enabled.
    pub fn render(&self, input: &str, value: &str) -> String {
        match &self.separator {
            Some(sep) => format!("{input}{sep}{value}"),
            None => value.to_string(),
        }
    }
}

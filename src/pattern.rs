//! Compiled patterns and substitution templates.
//!
//! A [`CompiledPattern`] wraps a `regex::Regex` built once per command
//! invocation. A [`Template`] is parsed against that pattern into literal text
//! and capture references, then expanded per match.
//!
//! Template syntax:
//! - `$1`, `${1}` - numbered group, `$0` is the whole match
//! - `${name}` - named group
//! - `$$` - a literal `$`
//! - `$&` - the whole match
//! - `` $` `` / `$'` - the text before / after the match
//! - `$+` - the last numbered group
//! - `$_` - the entire input line
//!
//! A reference to a group the pattern does not define stays literal text.

use regex::{Captures, NoExpand, Regex, RegexBuilder};
use tracing::debug;

use crate::error::PatternError;

/// A regular expression compiled with a fixed case mode.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
}

impl CompiledPattern {
    /// Compile `source`. Case-insensitive matching uses simple Unicode case
    /// folding and does not depend on the process locale.
    pub fn new(source: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source_err| PatternError {
                pattern: source.to_string(),
                source: source_err,
            })?;
        debug!(pattern = source, case_sensitive, "compiled pattern");
        Ok(Self { regex })
    }

    /// True when the pattern matches anywhere in `line`.
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Leftmost match of the pattern in `line`.
    pub fn captures<'h>(&self, line: &'h str) -> Option<Captures<'h>> {
        self.regex.captures(line)
    }

    /// Compile a pattern that matches `text` literally.
    pub fn literal(text: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        Self::new(&regex::escape(text), case_sensitive)
    }

    /// Replace every match in `line` with `with`, taken verbatim.
    pub fn replace_all(&self, line: &str, with: &str) -> String {
        self.regex.replace_all(line, NoExpand(with)).into_owned()
    }

    fn group_count(&self) -> usize {
        self.regex.captures_len()
    }

    fn group_index(&self, name: &str) -> Option<usize> {
        self.regex
            .capture_names()
            .position(|n| n == Some(name))
    }

    /// Parse a substitution template against this pattern's groups.
    pub fn template(&self, source: &str) -> Template {
        Template::parse(source, self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(usize),
    Before,
    After,
    LastGroup,
    Input,
}

/// A substitution template bound to one pattern's capture groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(source: &str, pattern: &CompiledPattern) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            match parse_reference(after, pattern) {
                Some((segment, consumed)) => {
                    match segment {
                        Segment::Literal(text) => literal.push_str(&text),
                        other => {
                            if !literal.is_empty() {
                                segments.push(Segment::Literal(std::mem::take(&mut literal)));
                            }
                            segments.push(other);
                        }
                    }
                    rest = &after[consumed..];
                }
                None => {
                    literal.push('$');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Expand the template against one match of its pattern in `line`.
    pub fn expand(&self, caps: &Captures<'_>, line: &str) -> String {
        let whole = caps.get(0);
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Group(i) => {
                    if let Some(m) = caps.get(*i) {
                        out.push_str(m.as_str());
                    }
                }
                Segment::Before => {
                    if let Some(m) = whole {
                        out.push_str(&line[..m.start()]);
                    }
                }
                Segment::After => {
                    if let Some(m) = whole {
                        out.push_str(&line[m.end()..]);
                    }
                }
                Segment::LastGroup => {
                    let last = caps.len().saturating_sub(1);
                    if let Some(m) = caps.get(last) {
                        out.push_str(m.as_str());
                    }
                }
                Segment::Input => out.push_str(line),
            }
        }
        out
    }
}

/// Parse what follows a `$`. Returns the segment and the bytes consumed, or
/// `None` when the `$` is literal.
fn parse_reference(after: &str, pattern: &CompiledPattern) -> Option<(Segment, usize)> {
    let first = after.chars().next()?;
    match first {
        '$' => Some((Segment::Literal("$".to_string()), 1)),
        '&' => Some((Segment::Group(0), 1)),
        '`' => Some((Segment::Before, 1)),
        '\'' => Some((Segment::After, 1)),
        '+' => Some((Segment::LastGroup, 1)),
        '_' => Some((Segment::Input, 1)),
        '{' => {
            let close = after.find('}')?;
            let name = &after[1..close];
            let index = match name.parse::<usize>() {
                Ok(n) if n < pattern.group_count() => Some(n),
                Ok(_) => None,
                Err(_) => pattern.group_index(name),
            }?;
            Some((Segment::Group(index), close + 1))
        }
        c if c.is_ascii_digit() => {
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let index = after[..digits].parse::<usize>().ok()?;
            (index < pattern.group_count()).then_some((Segment::Group(index), digits))
        }
        _ => None,
    }
}

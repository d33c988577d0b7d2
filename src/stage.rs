//! Line-at-a-time stage trait and generic building blocks.
//!
//! Every command compiles down to one `LineStage`. The executor pushes each
//! input line through `process`, then calls `flush` once the input is
//! exhausted so materializing commands (sort, reverse, take-last) can emit
//! what they buffered. Source commands ignore input and hand the executor a
//! lazy iterator from `generate` instead.

use crate::error::{LineError, Result};

/// Lines produced by a source stage; an `Err` ends the run.
pub type LineIter = Box<dyn Iterator<Item = Result<String>>>;

/// A command that processes input one line at a time.
pub trait LineStage {
    /// Process a single input line, returning zero or more output lines.
    ///
    /// An `Err` is a per-line failure: the executor logs it and moves on to
    /// the next line.
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError>;

    /// Emit any accumulated output after the last input line.
    fn flush(&mut self) -> Result<Vec<String>> {
        Ok(vec![])
    }

    /// True once the stage will produce no more output. The executor then
    /// drains the remaining input without calling `process`.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Output of a source command, produced lazily instead of from input.
    ///
    /// `None` for stages that read input. The executor writes each generated
    /// line as soon as it is produced.
    fn generate(&mut self) -> Option<LineIter> {
        None
    }

    /// The command name, used as the prefix of diagnostics.
    fn name(&self) -> &str;
}

type MapFn = Box<dyn FnMut(String) -> Option<String>>;

/// Stateless one-to-at-most-one transform.
pub struct MapStage {
    name: &'static str,
    f: MapFn,
}

impl MapStage {
    pub fn new(name: &'static str, f: impl FnMut(String) -> Option<String> + 'static) -> Self {
        Self {
            name,
            f: Box::new(f),
        }
    }
}

impl LineStage for MapStage {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        Ok((self.f)(line).into_iter().collect())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// One line in, any number of lines out.
pub struct FlatMapStage {
    name: &'static str,
    f: Box<dyn FnMut(String) -> Vec<String>>,
}

impl FlatMapStage {
    pub fn new(name: &'static str, f: impl FnMut(String) -> Vec<String> + 'static) -> Self {
        Self {
            name,
            f: Box::new(f),
        }
    }
}

impl LineStage for FlatMapStage {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        Ok((self.f)(line))
    }

    fn name(&self) -> &str {
        self.name
    }
}

type TryMapFn = Box<dyn FnMut(String) -> std::result::Result<Option<String>, LineError>>;

/// One-to-at-most-one transform whose per-line work can fail.
pub struct TryMapStage {
    name: &'static str,
    f: TryMapFn,
}

impl TryMapStage {
    pub fn new(
        name: &'static str,
        f: impl FnMut(String) -> std::result::Result<Option<String>, LineError> + 'static,
    ) -> Self {
        Self {
            name,
            f: Box::new(f),
        }
    }
}

impl LineStage for TryMapStage {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        Ok((self.f)(line)?.into_iter().collect())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Buffers the whole input and hands it to `finish` on flush.
pub struct CollectStage {
    name: &'static str,
    lines: Vec<String>,
    finish: Box<dyn FnMut(Vec<String>) -> Vec<String>>,
}

impl CollectStage {
    pub fn new(name: &'static str, finish: impl FnMut(Vec<String>) -> Vec<String> + 'static) -> Self {
        Self {
            name,
            lines: Vec::new(),
            finish: Box::new(finish),
        }
    }
}

impl LineStage for CollectStage {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        self.lines.push(line);
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        Ok((self.finish)(std::mem::take(&mut self.lines)))
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Generates its lines from an iterator without reading input.
pub struct SourceStage {
    name: &'static str,
    lines: Option<LineIter>,
}

impl SourceStage {
    pub fn new(name: &'static str, lines: impl Iterator<Item = Result<String>> + 'static) -> Self {
        Self {
            name,
            lines: Some(Box::new(lines)),
        }
    }
}

impl LineStage for SourceStage {
    fn process(&mut self, _line: String) -> std::result::Result<Vec<String>, LineError> {
        Ok(vec![])
    }

    fn generate(&mut self) -> Option<LineIter> {
        Some(
            self.lines
                .take()
                .unwrap_or_else(|| Box::new(std::iter::empty())),
        )
    }

    fn name(&self) -> &str {
        self.name
    }
}

//! Positional selection over the input sequence.

use std::collections::VecDeque;

use super::{no_options, optional_count};
use crate::args::ParsedArguments;
use crate::error::{LineError, Result};
use crate::stage::{CollectStage, LineStage};

struct TakeFirst {
    limit: usize,
    taken: usize,
}

impl LineStage for TakeFirst {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        self.taken += 1;
        Ok(vec![line])
    }

    fn is_exhausted(&self) -> bool {
        self.taken >= self.limit
    }

    fn name(&self) -> &str {
        "takeFirst"
    }
}

struct SkipFirst {
    remaining: usize,
}

impl LineStage for SkipFirst {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        if self.remaining > 0 {
            self.remaining -= 1;
            Ok(vec![])
        } else {
            Ok(vec![line])
        }
    }

    fn name(&self) -> &str {
        "skipFirst"
    }
}

/// Keeps a window of the most recent `limit` lines.
struct Window {
    limit: usize,
    lines: VecDeque<String>,
    emit_evicted: bool,
    name: &'static str,
}

impl LineStage for Window {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        self.lines.push_back(line);
        if self.lines.len() <= self.limit {
            return Ok(vec![]);
        }
        let evicted = self.lines.pop_front();
        Ok(if self.emit_evicted {
            evicted.into_iter().collect()
        } else {
            vec![]
        })
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        let kept = std::mem::take(&mut self.lines);
        Ok(if self.emit_evicted {
            vec![]
        } else {
            kept.into()
        })
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub(super) fn take_first(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    Ok(Box::new(TakeFirst {
        limit: optional_count(args)?,
        taken: 0,
    }))
}

pub(super) fn skip_first(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    Ok(Box::new(SkipFirst {
        remaining: optional_count(args)?,
    }))
}

pub(super) fn take_last(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    Ok(Box::new(Window {
        limit: optional_count(args)?,
        lines: VecDeque::new(),
        emit_evicted: false,
        name: "takeLast",
    }))
}

pub(super) fn skip_last(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    Ok(Box::new(Window {
        limit: optional_count(args)?,
        lines: VecDeque::new(),
        emit_evicted: true,
        name: "skipLast",
    }))
}

pub(super) fn reverse(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    args.expect_parameters(0..=0)?;
    Ok(Box::new(CollectStage::new("reverse", |mut lines| {
        lines.reverse();
        lines
    })))
}

//! Regex filters, projections and key-based commands.
//!
//! Patterns are case-insensitive unless `--cs` is given. Keys produced by a
//! `--rx ptrn key` template are compared with the same case mode.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::{fold_case, prepend_input, rx_extractor};
use crate::args::ParsedArguments;
use crate::engine::{Extractor, LineFilter, Projector};
use crate::error::{LineError, Result};
use crate::pattern::CompiledPattern;
use crate::stage::{FlatMapStage, LineStage, MapStage};

/// `ptrn [--cs]` with the pattern compiled.
fn pattern_argument(args: &ParsedArguments) -> Result<CompiledPattern> {
    args.reject_unknown(&["cs"])?;
    let source = &args.expect_parameters(1..=1)?[0];
    Ok(CompiledPattern::new(source, args.flag("cs")?)?)
}

/// `ptrn tmpl [--cs]` bound into a projector.
fn projector_arguments(args: &ParsedArguments) -> Result<Projector> {
    args.reject_unknown(&["cs"])?;
    let params = args.expect_parameters(2..=2)?;
    Ok(Projector::compile(&params[0], &params[1], args.flag("cs")?)?)
}

/// `[--rx ptrn key][--cs]`: `--cs` alone selects case-sensitive comparison
/// of whole lines.
fn key_arguments(args: &ParsedArguments, allowed: &[&str]) -> Result<(Extractor, bool)> {
    args.reject_unknown(allowed)?;
    args.expect_parameters(0..=0)?;
    let case_sensitive = args.flag("cs")?;
    let extractor = Extractor::from_rx(args.values("rx", 2..=2)?, case_sensitive)?;
    Ok((extractor, case_sensitive))
}

pub(super) fn skip(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let filter = LineFilter::rejecting(pattern_argument(args)?);
    Ok(Box::new(MapStage::new("skip", move |line| {
        filter.keeps(&line).then_some(line)
    })))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Gate {
    SkipWhile,
    SkipUntil,
    TakeWhile,
    TakeUntil,
}

/// Passes or blocks lines until the pattern's verdict flips once.
struct GateStage {
    gate: Gate,
    filter: LineFilter,
    flipped: bool,
}

impl LineStage for GateStage {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        if self.flipped {
            return Ok(vec![line]);
        }
        let matched = self.filter.is_match(&line);
        let keep = match self.gate {
            Gate::SkipWhile => {
                self.flipped = !matched;
                !matched
            }
            Gate::SkipUntil => {
                self.flipped = matched;
                matched
            }
            Gate::TakeWhile => {
                self.flipped = !matched;
                matched
            }
            Gate::TakeUntil => {
                self.flipped = matched;
                !matched
            }
        };
        Ok(if keep { vec![line] } else { vec![] })
    }

    fn is_exhausted(&self) -> bool {
        self.flipped && matches!(self.gate, Gate::TakeWhile | Gate::TakeUntil)
    }

    fn name(&self) -> &str {
        match self.gate {
            Gate::SkipWhile => "skipWhile",
            Gate::SkipUntil => "skipUntil",
            Gate::TakeWhile => "takeWhile",
            Gate::TakeUntil => "takeUntil",
        }
    }
}

fn gate(gate: Gate, args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    Ok(Box::new(GateStage {
        gate,
        filter: LineFilter::matching(pattern_argument(args)?),
        flipped: false,
    }))
}

pub(super) fn skip_while(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    gate(Gate::SkipWhile, args)
}

pub(super) fn skip_until(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    gate(Gate::SkipUntil, args)
}

pub(super) fn take_while(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    gate(Gate::TakeWhile, args)
}

pub(super) fn take_until(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    gate(Gate::TakeUntil, args)
}

pub(super) fn put_when(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["cs"])?;
    let params = args.expect_parameters(2..=2)?;
    let filter = LineFilter::matching(CompiledPattern::new(&params[0], args.flag("cs")?)?);
    let mut pending = Some(params[1].clone());
    Ok(Box::new(FlatMapStage::new("putWhen", move |line| {
        let inserted = if pending.is_some() && filter.is_match(&line) {
            pending.take()
        } else {
            None
        };
        std::iter::once(line).chain(inserted).collect()
    })))
}

pub(super) fn project(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let projector = projector_arguments(args)?;
    Ok(Box::new(MapStage::new("project", move |line| {
        projector.project(&line)
    })))
}

/// Groups in first-seen key order, lines in input order within a group.
struct GroupBy {
    projector: Projector,
    index: HashMap<String, usize>,
    groups: Vec<Vec<String>>,
}

impl LineStage for GroupBy {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        if let Some(key) = self.projector.project(&line) {
            let next = self.groups.len();
            let slot = *self.index.entry(key).or_insert(next);
            if slot == next {
                self.groups.push(Vec::new());
            }
            self.groups[slot].push(line);
        }
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        Ok(std::mem::take(&mut self.groups).into_iter().flatten().collect())
    }

    fn name(&self) -> &str {
        "groupBy"
    }
}

pub(super) fn group_by(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    Ok(Box::new(GroupBy {
        projector: projector_arguments(args)?,
        index: HashMap::new(),
        groups: Vec::new(),
    }))
}

pub(super) fn distinct(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, case_sensitive) = key_arguments(args, &["rx", "cs"])?;
    let mut seen = HashSet::new();
    Ok(Box::new(MapStage::new("distinct", move |line| {
        let key = extractor.extract(&line)?;
        seen.insert(fold_case(&key, case_sensitive).into_owned())
            .then_some(line)
    })))
}

struct Reorder {
    extractor: Extractor,
    case_sensitive: bool,
    descending: bool,
    keyed: Vec<(String, String)>,
}

impl LineStage for Reorder {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        if let Some(key) = self.extractor.extract(&line) {
            let key = fold_case(&key, self.case_sensitive).into_owned();
            self.keyed.push((key, line));
        }
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        let mut keyed = std::mem::take(&mut self.keyed);
        if self.descending {
            keyed.sort_by(|a, b| b.0.cmp(&a.0));
        } else {
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Ok(keyed.into_iter().map(|(_, line)| line).collect())
    }

    fn name(&self) -> &str {
        "reorder"
    }
}

pub(super) fn reorder(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, case_sensitive) = key_arguments(args, &["rx", "cs", "dsc"])?;
    Ok(Box::new(Reorder {
        extractor,
        case_sensitive,
        descending: args.flag("dsc")?,
        keyed: Vec::new(),
    }))
}

struct Max {
    extractor: Extractor,
    case_sensitive: bool,
    best: Option<(String, String)>,
}

impl LineStage for Max {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        if let Some(key) = self.extractor.extract(&line) {
            let key = fold_case(&key, self.case_sensitive).into_owned();
            let greater = match &self.best {
                Some((best, _)) => key.cmp(best) == Ordering::Greater,
                None => true,
            };
            if greater {
                self.best = Some((key, line));
            }
        }
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        Ok(self.best.take().map(|(_, line)| line).into_iter().collect())
    }

    fn name(&self) -> &str {
        "max"
    }
}

pub(super) fn max(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, case_sensitive) = key_arguments(args, &["rx", "cs"])?;
    Ok(Box::new(Max {
        extractor,
        case_sensitive,
        best: None,
    }))
}

pub(super) fn length(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["rx", "cs", "pi"])?;
    args.expect_parameters(0..=0)?;
    let extractor = rx_extractor(args)?;
    let pi = prepend_input(args)?;
    Ok(Box::new(MapStage::new("length", move |line| {
        let value = extractor.extract(&line)?;
        Some(pi.render(&line, &value.chars().count().to_string()))
    })))
}

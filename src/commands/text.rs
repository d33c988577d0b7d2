//! Per-line string edits, line insertion and simple generators.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;

use super::{fold_case, no_options, parse_count, parse_int, prepend_input};
use crate::args::ParsedArguments;
use crate::engine::DEFAULT_SEPARATOR;
use crate::error::{LineError, LinkError, Result, UsageError};
use crate::pattern::CompiledPattern;
use crate::stage::{FlatMapStage, LineStage, MapStage, SourceStage};

/// Byte offset of the `n`th character, or of the end when `n` equals the
/// character count.
fn char_offset(s: &str, n: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(n)
}

fn separator_option(args: &ParsedArguments, name: &str) -> std::result::Result<String, UsageError> {
    Ok(args
        .values(name, 1..=1)?
        .map_or_else(|| DEFAULT_SEPARATOR.to_string(), |v| v[0].clone()))
}

pub(super) fn append(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    let suffix = args.expect_parameters(1..=1)?[0].clone();
    Ok(Box::new(MapStage::new("append", move |line| Some(line + &suffix))))
}

pub(super) fn prepend(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    let prefix = args.expect_parameters(1..=1)?[0].clone();
    Ok(Box::new(MapStage::new("prepend", move |line| {
        Some(format!("{prefix}{line}"))
    })))
}

pub(super) fn to_lower_case(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    args.expect_parameters(0..=0)?;
    Ok(Box::new(MapStage::new("toLowerCase", |line| Some(line.to_lowercase()))))
}

pub(super) fn to_upper_case(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    args.expect_parameters(0..=0)?;
    Ok(Box::new(MapStage::new("toUpperCase", |line| Some(line.to_uppercase()))))
}

struct Count {
    lines: u64,
}

impl LineStage for Count {
    fn process(&mut self, _line: String) -> std::result::Result<Vec<String>, LineError> {
        self.lines += 1;
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        Ok(vec![self.lines.to_string()])
    }

    fn name(&self) -> &str {
        "count"
    }
}

pub(super) fn count(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    args.expect_parameters(0..=0)?;
    Ok(Box::new(Count { lines: 0 }))
}

struct PutFirst {
    head: Option<String>,
}

impl LineStage for PutFirst {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        Ok(match self.head.take() {
            Some(head) => vec![head, line],
            None => vec![line],
        })
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        Ok(self.head.take().into_iter().collect())
    }

    fn name(&self) -> &str {
        "putFirst"
    }
}

pub(super) fn put_first(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    let head = args.expect_parameters(1..=1)?[0].clone();
    Ok(Box::new(PutFirst { head: Some(head) }))
}

struct PutLast {
    tail: Option<String>,
}

impl LineStage for PutLast {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        Ok(vec![line])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        Ok(self.tail.take().into_iter().collect())
    }

    fn name(&self) -> &str {
        "putLast"
    }
}

pub(super) fn put_last(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    let tail = args.expect_parameters(1..=1)?[0].clone();
    Ok(Box::new(PutLast { tail: Some(tail) }))
}

struct PutAt {
    line: Option<String>,
    index: usize,
    seen: usize,
}

impl LineStage for PutAt {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        let mut out = Vec::with_capacity(2);
        if self.seen == self.index {
            out.extend(self.line.take());
        }
        out.push(line);
        self.seen += 1;
        Ok(out)
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        match self.line.take() {
            Some(line) if self.seen == self.index => Ok(vec![line]),
            Some(_) => Err(LinkError::OutOfRange(
                "Index was outside the bounds of the input sequence.",
            )),
            None => Ok(vec![]),
        }
    }

    fn name(&self) -> &str {
        "putAt"
    }
}

pub(super) fn put_at(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    let params = args.expect_parameters(2..=2)?;
    let index = parse_count(&params[1])?;
    Ok(Box::new(PutAt {
        line: Some(params[0].clone()),
        index,
        seen: 0,
    }))
}

pub(super) fn pad_end(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["c"])?;
    let width = parse_count(&args.expect_parameters(1..=1)?[0])?;
    let fill = match args.values("c", 1..=1)? {
        None => ' ',
        Some([c]) => {
            let mut chars = c.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => ch,
                _ => return Err(UsageError.into()),
            }
        }
        Some(_) => return Err(UsageError.into()),
    };
    Ok(Box::new(MapStage::new("padEnd", move |mut line| {
        let len = line.chars().count();
        line.extend(std::iter::repeat_n(fill, width.saturating_sub(len)));
        Some(line)
    })))
}

pub(super) fn insert(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["pi"])?;
    let params = args.expect_parameters(2..=2)?;
    let value = params[0].clone();
    let index = parse_count(&params[1])?;
    let pi = prepend_input(args)?;
    Ok(Box::new(MapStage::new("insert", move |line| {
        let at = char_offset(&line, index)?;
        let result = format!("{}{value}{}", &line[..at], &line[at..]);
        Some(pi.render(&line, &result))
    })))
}

pub(super) fn slice(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["pi"])?;
    let params = args.expect_parameters(1..=2)?;
    let start = parse_count(&params[0])?;
    let len = params.get(1).map(|n| parse_count(n)).transpose()?;
    let pi = prepend_input(args)?;
    Ok(Box::new(MapStage::new("slice", move |line| {
        let chars = line.chars().skip(start);
        let result: String = match len {
            Some(n) => chars.take(n).collect(),
            None => chars.collect(),
        };
        Some(pi.render(&line, &result))
    })))
}

pub(super) fn remove(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["cs", "pi"])?;
    let target = args.expect_parameters(1..=1)?[0].clone();
    let case_sensitive = args.flag("cs")?;
    let pi = prepend_input(args)?;
    if target.is_empty() {
        return Ok(Box::new(MapStage::new("remove", Some)));
    }
    let pattern = CompiledPattern::literal(&target, case_sensitive)?;
    Ok(Box::new(MapStage::new("remove", move |line| {
        let result = pattern.replace_all(&line, "");
        Some(pi.render(&line, &result))
    })))
}

pub(super) fn substitute(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["cs", "pi"])?;
    let params = args.expect_parameters(2..=2)?;
    if params[0].is_empty() {
        return Err(UsageError.into());
    }
    let replacement = params[1].clone();
    let pattern = CompiledPattern::literal(&params[0], args.flag("cs")?)?;
    let pi = prepend_input(args)?;
    Ok(Box::new(MapStage::new("substitute", move |line| {
        let result = pattern.replace_all(&line, &replacement);
        Some(pi.render(&line, &result))
    })))
}

pub(super) fn split(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["nompty", "trim"])?;
    let sep = args
        .expect_parameters(0..=1)?
        .first()
        .filter(|s| !s.is_empty())
        .cloned();
    let no_empty = args.flag("nompty")?;
    let trim = args.flag("trim")?;

    Ok(Box::new(FlatMapStage::new("split", move |line| {
        let parts: Box<dyn Iterator<Item = &str> + '_> = match &sep {
            Some(sep) => Box::new(line.split(sep.as_str())),
            None => Box::new(line.split(char::is_whitespace)),
        };
        parts
            .map(|part| if trim { part.trim() } else { part })
            .filter(|part| !(no_empty && part.is_empty()))
            .map(str::to_string)
            .collect()
    })))
}

struct Merge {
    separator: String,
    chunk: Option<usize>,
    pending: Vec<String>,
}

impl LineStage for Merge {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        self.pending.push(line);
        match self.chunk {
            Some(n) if self.pending.len() == n => {
                Ok(vec![std::mem::take(&mut self.pending).join(&self.separator)])
            }
            _ => Ok(vec![]),
        }
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        if self.pending.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![std::mem::take(&mut self.pending).join(&self.separator)])
    }

    fn name(&self) -> &str {
        "merge"
    }
}

pub(super) fn merge(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["n"])?;
    let separator = args
        .expect_parameters(0..=1)?
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
    let chunk = match args.values("n", 1..=1)? {
        Some([n]) => match parse_count(n)? {
            0 => return Err(UsageError.into()),
            n => Some(n),
        },
        _ => None,
    };
    Ok(Box::new(Merge {
        separator,
        chunk,
        pending: Vec::new(),
    }))
}

pub(super) fn serialize(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["init", "stp"])?;
    let separator = args
        .expect_parameters(0..=1)?
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
    let start = match args.values("init", 1..=1)? {
        Some([s]) => parse_int(s)?,
        _ => 0,
    };
    let step = match args.values("stp", 1..=1)? {
        Some([s]) => match parse_int(s)? {
            0 => return Err(UsageError.into()),
            s => s,
        },
        _ => 1,
    };
    let mut next = i64::from(start);
    Ok(Box::new(MapStage::new("serialize", move |line| {
        let out = format!("{next}{separator}{line}");
        next += i64::from(step);
        Some(out)
    })))
}

pub(super) fn wrap(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&[])?;
    let width = match parse_count(&args.expect_parameters(1..=1)?[0])? {
        0 => return Err(UsageError.into()),
        n => n,
    };
    Ok(Box::new(FlatMapStage::new("wrap", move |line| {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= width {
            return vec![line];
        }
        chars
            .chunks(width)
            .map(|chunk| chunk.iter().collect())
            .collect()
    })))
}

fn affix_filter(
    name: &'static str,
    args: &ParsedArguments,
    test: fn(&str, &str) -> bool,
) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["cs"])?;
    let affix = args.expect_parameters(1..=1)?[0].clone();
    let case_sensitive = args.flag("cs")?;
    let affix = fold_case(&affix, case_sensitive).into_owned();
    Ok(Box::new(MapStage::new(name, move |line| {
        test(&fold_case(&line, case_sensitive), &affix).then_some(line)
    })))
}

pub(super) fn starts_with(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    affix_filter("startsWith", args, |line, affix| line.starts_with(affix))
}

pub(super) fn ends_with(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    affix_filter("endsWith", args, |line, affix| line.ends_with(affix))
}

struct Join {
    separator: String,
    files: Vec<(PathBuf, Lines<BufReader<File>>)>,
    done: bool,
}

impl LineStage for Join {
    fn process(&mut self, mut line: String) -> std::result::Result<Vec<String>, LineError> {
        for (path, lines) in &mut self.files {
            match lines.next() {
                Some(Ok(other)) => {
                    line.push_str(&self.separator);
                    line.push_str(&other);
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Err(LineError::io(path.clone(), err));
                }
                None => {
                    self.done = true;
                    return Ok(vec![]);
                }
            }
        }
        Ok(vec![line])
    }

    fn is_exhausted(&self) -> bool {
        self.done
    }

    fn name(&self) -> &str {
        "join"
    }
}

pub(super) fn join(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["sep"])?;
    let paths = args.expect_parameters(1..=usize::MAX)?;
    let separator = separator_option(args, "sep")?;
    for path in paths {
        if !PathBuf::from(path).is_file() {
            return Err(LinkError::MissingPath(path.into()));
        }
    }
    let files = paths
        .iter()
        .map(|path| -> Result<_> {
            let file = File::open(path).map_err(|e| LinkError::io(path.as_str(), e))?;
            Ok((PathBuf::from(path), BufReader::new(file).lines()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(Join {
        separator,
        files,
        done: false,
    }))
}

/// Occurrence counts in first-seen order.
struct CountFrq {
    words: bool,
    separator: String,
    precision: Option<usize>,
    index: HashMap<String, usize>,
    counts: Vec<(String, u64)>,
    total: u64,
}

impl CountFrq {
    fn record(&mut self, key: String) {
        self.total += 1;
        match self.index.get(&key) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(key.clone(), self.counts.len());
                self.counts.push((key, 1));
            }
        }
    }
}

/// Control and whitespace characters are reported by code point.
fn char_key(c: char) -> String {
    if c.is_control() || c.is_whitespace() {
        format!("U+{:04X}", c as u32)
    } else {
        c.to_string()
    }
}

impl LineStage for CountFrq {
    fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
        if self.words {
            for word in line.split_whitespace() {
                self.record(word.to_string());
            }
        } else {
            for c in line.chars() {
                self.record(char_key(c));
            }
        }
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        let sep = &self.separator;
        let total = self.total as f64;
        Ok(self
            .counts
            .iter()
            .map(|(key, n)| match self.precision {
                Some(prec) => format!("{key}{sep}{n}{sep}{:.prec$}", *n as f64 / total),
                None => format!("{key}{sep}{n}"),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "countFrq"
    }
}

pub(super) fn count_frq(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["wrd", "frq", "sep"])?;
    args.expect_parameters(0..=0)?;
    let precision = match args.values("frq", 0..=1)? {
        None => None,
        Some([]) => Some(4),
        Some([p]) => Some(parse_count(p)?),
        Some(_) => return Err(UsageError.into()),
    };
    Ok(Box::new(CountFrq {
        words: args.flag("wrd")?,
        separator: separator_option(args, "sep")?,
        precision,
        index: HashMap::new(),
        counts: Vec::new(),
        total: 0,
    }))
}

fn digits(n: i64) -> usize {
    n.unsigned_abs().to_string().len()
}

pub(super) fn range(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["init", "stp", "pad"])?;
    let count = parse_count(&args.expect_parameters(1..=1)?[0])? as i64;
    let start = match args.values("init", 1..=1)? {
        Some([s]) => i64::from(parse_int(s)?),
        _ => 0,
    };
    let step = match args.values("stp", 1..=1)? {
        Some([s]) => match parse_int(s)? {
            0 => return Err(UsageError.into()),
            s => i64::from(s),
        },
        _ => 1,
    };
    let end = start + count * step;
    if i32::try_from(end).is_err() {
        return Err(UsageError.into());
    }
    let width = if args.flag("pad")? {
        digits(start).max(digits(end))
    } else {
        0
    };

    let numbers = (0..count).map(move |i| {
        let n = start + i * step;
        Ok(if n < 0 {
            format!("-{:0width$}", n.unsigned_abs())
        } else {
            format!("{n:0width$}")
        })
    });
    Ok(Box::new(SourceStage::new("range", numbers)))
}

pub(super) fn repeat(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    no_options(args)?;
    let params = args.expect_parameters(2..=2)?;
    let line = params[0].clone();
    let count = parse_count(&params[1])?;
    Ok(Box::new(SourceStage::new(
        "repeat",
        std::iter::repeat_n(line, count).map(Ok),
    )))
}

#[cfg(test)]
mod tests {
    use crate::commands::{Invocation, prepare, run};
    use crate::error::LinkError;
    use std::io::Write;

    #[test]
    fn test_append_prepend() {
        assert_eq!(run("append", &[";"], "a\nb").unwrap(), vec!["a;", "b;"]);
        assert_eq!(run("prepend", &["> "], "a").unwrap(), vec!["> a"]);
        assert!(matches!(run("append", &[], "a"), Err(LinkError::Usage(_))));
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(run("toUpperCase", &[], "abc\nÉté").unwrap(), vec!["ABC", "ÉTÉ"]);
        assert_eq!(run("toLowerCase", &[], "ABC").unwrap(), vec!["abc"]);
    }

    #[test]
    fn test_count() {
        assert_eq!(run("count", &[], "a\nb\nc").unwrap(), vec!["3"]);
        assert_eq!(run("count", &[], "").unwrap(), vec!["0"]);
    }

    #[test]
    fn test_put_first_and_last() {
        assert_eq!(run("putFirst", &["h"], "a\nb").unwrap(), vec!["h", "a", "b"]);
        assert_eq!(run("putFirst", &["h"], "").unwrap(), vec!["h"]);
        assert_eq!(run("putLast", &["t"], "a").unwrap(), vec!["a", "t"]);
    }

    #[test]
    fn test_put_at() {
        assert_eq!(run("putAt", &["x", "1"], "a\nb").unwrap(), vec!["a", "x", "b"]);
        assert_eq!(run("putAt", &["x", "2"], "a\nb").unwrap(), vec!["a", "b", "x"]);
        assert_eq!(run("putAt", &["x", "0"], "").unwrap(), vec!["x"]);
        assert!(matches!(
            run("putAt", &["x", "3"], "a\nb"),
            Err(LinkError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_pad_end() {
        assert_eq!(run("padEnd", &["4"], "ab").unwrap(), vec!["ab  "]);
        assert_eq!(run("padEnd", &["4", "--c", "."], "ab\nabcdef").unwrap(), vec!["ab..", "abcdef"]);
        assert!(run("padEnd", &["4", "--c", ".."], "ab").is_err());
    }

    #[test]
    fn test_insert() {
        assert_eq!(run("insert", &["-", "2"], "abcd\na").unwrap(), vec!["ab-cd"]);
        assert_eq!(run("insert", &["!", "2"], "ab").unwrap(), vec!["ab!"]);
        assert_eq!(run("insert", &["-", "1", "--pi"], "ab").unwrap(), vec!["ab:a-b"]);
    }

    #[test]
    fn test_slice() {
        assert_eq!(run("slice", &["2"], "abcdef\na").unwrap(), vec!["cdef", ""]);
        assert_eq!(run("slice", &["1", "2"], "abcdef").unwrap(), vec!["bc"]);
        assert_eq!(run("slice", &["1", "1", "--pi", "|"], "héllo").unwrap(), vec!["héllo|é"]);
    }

    #[test]
    fn test_remove() {
        assert_eq!(run("remove", &["ab"], "xAByab").unwrap(), vec!["xy"]);
        assert_eq!(run("remove", &["ab", "--cs"], "xAByab").unwrap(), vec!["xABy"]);
        assert_eq!(run("remove", &[""], "keep").unwrap(), vec!["keep"]);
        assert_eq!(run("remove", &["."], "a.b").unwrap(), vec!["ab"]);
    }

    #[test]
    fn test_substitute() {
        assert_eq!(run("substitute", &["a", "$1"], "bAnana").unwrap(), vec!["b$1n$1n$1"]);
        assert_eq!(
            run("substitute", &["a", "o", "--cs", "--pi"], "bAnana").unwrap(),
            vec!["bAnana:bAnono"]
        );
        assert!(matches!(run("substitute", &["", "x"], "a"), Err(LinkError::Usage(_))));
    }

    #[test]
    fn test_split() {
        assert_eq!(run("split", &[], "a b  c").unwrap(), vec!["a", "b", "", "c"]);
        assert_eq!(run("split", &["--nompty"], "a b  c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(run("split", &[",", "--trim"], "a , b").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_merge() {
        assert_eq!(run("merge", &[], "a\nb\nc").unwrap(), vec!["a:b:c"]);
        assert_eq!(run("merge", &["-", "--n", "2"], "a\nb\nc").unwrap(), vec!["a-b", "c"]);
        assert!(run("merge", &[], "").unwrap().is_empty());
        assert!(matches!(run("merge", &["--n", "0"], "a"), Err(LinkError::Usage(_))));
    }

    #[test]
    fn test_serialize() {
        assert_eq!(run("serialize", &[], "a\nb").unwrap(), vec!["0:a", "1:b"]);
        assert_eq!(
            run("serialize", &[". ", "--init", "10", "--stp", "-5"], "a\nb").unwrap(),
            vec!["10. a", "5. b"]
        );
        assert!(run("serialize", &["--stp", "0"], "a").is_err());
    }

    #[test]
    fn test_wrap() {
        assert_eq!(run("wrap", &["2"], "abcde\nab").unwrap(), vec!["ab", "cd", "e", "ab"]);
        assert!(run("wrap", &["0"], "a").is_err());
    }

    #[test]
    fn test_starts_and_ends_with() {
        assert_eq!(run("startsWith", &["ab"], "ABc\nxab").unwrap(), vec!["ABc"]);
        assert!(run("startsWith", &["ab", "--cs"], "ABc").unwrap().is_empty());
        assert_eq!(run("endsWith", &[".RS"], "a.rs\nb.py").unwrap(), vec!["a.rs"]);
    }

    #[test]
    fn test_join() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("right.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "1\n2").unwrap();
        let p = path.to_str().unwrap();

        assert_eq!(run("join", &[p], "a\nb\nc").unwrap(), vec!["a:1", "b:2"]);
        assert_eq!(run("join", &[p, "--sep", "="], "a").unwrap(), vec!["a=1"]);

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            run("join", &[missing.to_str().unwrap()], "a"),
            Err(LinkError::MissingPath(_))
        ));
    }

    #[test]
    fn test_count_frq_chars() {
        assert_eq!(
            run("countFrq", &[], "aba c").unwrap(),
            vec!["a:2", "b:1", "U+0020:1", "c:1"]
        );
    }

    #[test]
    fn test_count_frq_words_with_frequency() {
        assert_eq!(
            run("countFrq", &["--wrd", "--frq", "2", "--sep", " "], "x y x\nx").unwrap(),
            vec!["x 3 0.75", "y 1 0.25"]
        );
    }

    #[test]
    fn test_range() {
        assert_eq!(run("range", &["3"], "ignored").unwrap(), vec!["0", "1", "2"]);
        assert_eq!(
            run("range", &["3", "--init", "8", "--pad"], "").unwrap(),
            vec!["08", "09", "10"]
        );
        assert_eq!(
            run("range", &["2", "--init", "-1", "--stp", "-10", "--pad"], "").unwrap(),
            vec!["-01", "-11"]
        );
        assert!(run("range", &["2", "--init", "2147483647"], "").is_err());
        assert!(run("range", &["-1"], "").is_err());
    }

    #[test]
    fn test_large_sources_stream() {
        for (name, args) in [("range", ["2147483647", "--pad"]), ("repeat", ["x", "2147483647"])] {
            let Invocation::Run(mut stage) = prepare(name, args).unwrap() else {
                panic!("unexpected help");
            };
            let mut lines = stage.generate().unwrap();
            assert!(lines.next().unwrap().is_ok());
            assert!(lines.next().unwrap().is_ok());
        }
    }

    #[test]
    fn test_repeat() {
        assert_eq!(run("repeat", &["x", "2"], "ignored").unwrap(), vec!["x", "x"]);
        assert!(run("repeat", &["x", "0"], "").unwrap().is_empty());
    }
}

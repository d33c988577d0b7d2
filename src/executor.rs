//! Streaming executor.
//!
//! Pulls lines from a `BufRead`, pushes each one through the command's stage
//! and writes the stage's output immediately. Source stages skip the input
//! and have their generated lines written one at a time. Per-line errors are
//! logged and the line skipped. Once a stage reports exhaustion the executor
//! switches to a drain phase that consumes the rest of the input without
//! processing it, so upstream writers never see a closed pipe.

use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::stage::LineStage;

/// Line counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines handed to the stage.
    pub input_count: usize,
    /// Lines read after the stage was exhausted.
    pub drained_count: usize,
    /// Lines written to the output.
    pub output_count: usize,
    /// Lines skipped because of a per-line error.
    pub error_count: usize,
}

fn write_line<W: Write>(output: &mut W, line: &str, summary: &mut RunSummary) -> Result<()> {
    writeln!(output, "{line}").map_err(|e| LinkError::io("write error", e))?;
    summary.output_count += 1;
    Ok(())
}

fn write_lines<W: Write>(output: &mut W, lines: Vec<String>, summary: &mut RunSummary) -> Result<()> {
    for line in lines {
        write_line(output, &line, summary)?;
    }
    Ok(())
}

/// Read the next raw line into `buf`, without its `\n` or `\r\n` terminator.
/// Returns false at end of input.
fn read_raw<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> Result<bool> {
    buf.clear();
    let read = input
        .read_until(b'\n', buf)
        .map_err(|e| LinkError::io("read error", e))?;
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(read > 0)
}

/// Run `stage` over `input`, writing to `output`.
///
/// Input bytes that are not valid UTF-8 are replaced with U+FFFD rather than
/// failing the run.
pub fn execute<R: BufRead, W: Write>(
    stage: &mut dyn LineStage,
    mut input: R,
    mut output: W,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    if let Some(lines) = stage.generate() {
        for line in lines {
            write_line(&mut output, &line?, &mut summary)?;
        }
    } else {
        let mut buf = Vec::new();

        // Active phase
        while !stage.is_exhausted() && read_raw(&mut input, &mut buf)? {
            summary.input_count += 1;
            let line = String::from_utf8_lossy(&buf).into_owned();

            match stage.process(line) {
                Ok(out) => write_lines(&mut output, out, &mut summary)?,
                Err(err) => {
                    warn!("{}: {err}", stage.name());
                    summary.error_count += 1;
                }
            }
        }

        // Drain phase
        while read_raw(&mut input, &mut buf)? {
            summary.drained_count += 1;
        }
    }

    let flushed = stage.flush()?;
    write_lines(&mut output, flushed, &mut summary)?;
    output.flush().map_err(|e| LinkError::io("write error", e))?;

    debug!(
        command = stage.name(),
        input = summary.input_count,
        drained = summary.drained_count,
        output = summary.output_count,
        errors = summary.error_count,
        "run complete"
    );

    Ok(summary)
}

/// Run `stage` over in-memory text.
///
/// Returns the output lines and the run summary.
pub fn execute_str(stage: &mut dyn LineStage, input: &str) -> Result<(Vec<String>, RunSummary)> {
    let mut buf = Vec::new();
    let summary = execute(stage, input.as_bytes(), &mut buf)?;
    let text = String::from_utf8_lossy(&buf);
    Ok((text.lines().map(str::to_string).collect(), summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LineError;
    use crate::stage::{CollectStage, MapStage, SourceStage};
    use std::cell::Cell;
    use std::io::ErrorKind;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct TakeTwo {
        seen: usize,
    }

    impl LineStage for TakeTwo {
        fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
            self.seen += 1;
            Ok(vec![line])
        }

        fn is_exhausted(&self) -> bool {
            self.seen >= 2
        }

        fn name(&self) -> &str {
            "takeTwo"
        }
    }

    struct FailOn(&'static str);

    impl LineStage for FailOn {
        fn process(&mut self, line: String) -> std::result::Result<Vec<String>, LineError> {
            if line == self.0 {
                Err(LineError::DestinationExists(PathBuf::from(line)))
            } else {
                Ok(vec![line])
            }
        }

        fn name(&self) -> &str {
            "failOn"
        }
    }

    #[test]
    fn test_streaming_preserves_order() {
        let mut stage = MapStage::new("id", Some);
        let (out, summary) = execute_str(&mut stage, "a\nb\nc\n").unwrap();
        assert_eq!(out, vec!["a", "b", "c"]);
        assert_eq!(summary.input_count, 3);
        assert_eq!(summary.output_count, 3);
    }

    #[test]
    fn test_crlf_input() {
        let mut stage = MapStage::new("id", Some);
        let (out, _) = execute_str(&mut stage, "a\r\nb\r\n").unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn test_drain_after_exhaustion() {
        let mut stage = TakeTwo { seen: 0 };
        let (out, summary) = execute_str(&mut stage, "1\n2\n3\n4\n5").unwrap();
        assert_eq!(out, vec!["1", "2"]);
        assert_eq!(summary.input_count, 2);
        assert_eq!(summary.drained_count, 3);
    }

    #[test]
    fn test_line_error_skips_line_and_continues() {
        let mut stage = FailOn("bad");
        let (out, summary) = execute_str(&mut stage, "a\nbad\nb").unwrap();
        assert_eq!(out, vec!["a", "b"]);
        assert_eq!(summary.error_count, 1);
    }

    #[test]
    fn test_flush_output_written_last() {
        let mut stage = CollectStage::new("rev", |mut l| {
            l.reverse();
            l
        });
        let (out, _) = execute_str(&mut stage, "x\ny").unwrap();
        assert_eq!(out, vec!["y", "x"]);
    }

    #[test]
    fn test_source_ignores_input() {
        let mut stage = SourceStage::new("gen", std::iter::once(Ok("only".to_string())));
        let (out, summary) = execute_str(&mut stage, "ignored\n").unwrap();
        assert_eq!(out, vec!["only"]);
        assert_eq!(summary.input_count, 0);
    }

    /// Accepts one line, then reports a closed pipe.
    #[derive(Default)]
    struct ClosesAfterOneLine {
        written: Vec<u8>,
    }

    impl Write for ClosesAfterOneLine {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written.contains(&b'\n') {
                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_source_lines_written_as_generated() {
        let produced = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&produced);
        let lines = (0..1_000_000).map(move |i| {
            counter.set(counter.get() + 1);
            Ok(i.to_string())
        });
        let mut stage = SourceStage::new("gen", lines);
        let mut sink = ClosesAfterOneLine::default();

        let err = execute(&mut stage, &b""[..], &mut sink).unwrap_err();
        assert!(matches!(err, LinkError::Io { ref source, .. } if source.kind() == ErrorKind::BrokenPipe));
        assert_eq!(sink.written, b"0\n");
        assert!(produced.get() <= 2);
    }

    #[test]
    fn test_source_error_ends_run() {
        let lines = vec![Ok("a".to_string()), Err(LinkError::OutOfRange("boom")), Ok("b".to_string())];
        let mut stage = SourceStage::new("gen", lines.into_iter());
        let mut buf = Vec::new();
        assert!(execute(&mut stage, &b""[..], &mut buf).is_err());
        assert_eq!(buf, b"a\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let mut stage = MapStage::new("append", |l| Some(l + "!"));
        let mut buf = Vec::new();
        let summary = execute(&mut stage, &b"a\n\xff\nb\r\nc"[..], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a!\n\u{FFFD}!\nb!\nc!\n");
        assert_eq!(summary.input_count, 4);
    }

    #[test]
    fn test_drain_tolerates_invalid_utf8() {
        let mut stage = TakeTwo { seen: 0 };
        let mut buf = Vec::new();
        let summary = execute(&mut stage, &b"1\n2\n\xfe\n3"[..], &mut buf).unwrap();
        assert_eq!(buf, b"1\n2\n");
        assert_eq!(summary.drained_count, 2);
    }

    #[test]
    fn test_empty_input() {
        let mut stage = MapStage::new("id", Some);
        let (out, summary) = execute_str(&mut stage, "").unwrap();
        assert!(out.is_empty());
        assert_eq!(summary, RunSummary::default());
    }
}

//! Commands with filesystem side effects.
//!
//! A failure on one line is logged and the line skipped; the command keeps
//! going. Lines whose target is already in the requested state are skipped
//! without a diagnostic.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::paths::absolute;
use crate::args::ParsedArguments;
use crate::engine::{Extractor, LineFilter, Projector};
use crate::error::{LineError, LinkError, Result, UsageError};
use crate::pattern::{CompiledPattern, Template};
use crate::stage::{LineStage, TryMapStage};

type LineResult<T> = std::result::Result<T, LineError>;

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| LinkError::io("current directory", e))
}

fn same_path(cwd: &Path, a: &str, b: &str) -> bool {
    absolute(cwd, Path::new(a)) == absolute(cwd, Path::new(b))
}

fn create_parent(path: &Path) -> LineResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
            fs::create_dir_all(dir).map_err(|e| LineError::io(dir, e))
        }
        _ => Ok(()),
    }
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(src: &Path, dest: &Path) -> LineResult<()> {
    if let Err(err) = fs::rename(src, dest) {
        debug!(src = %src.display(), dest = %dest.display(), "rename failed, copying: {err}");
        fs::copy(src, dest).map_err(|_| LineError::io(src, err))?;
        fs::remove_file(src).map_err(|e| LineError::io(src, e))?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Transfer {
    Copy,
    Move,
}

/// `ptrn dest [src] [--ri][--ovw][--cs]`
fn templated_transfer(
    name: &'static str,
    transfer: Transfer,
    args: &ParsedArguments,
) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["ri", "ovw", "cs"])?;
    let params = args.expect_parameters(2..=3)?;
    let projector = Projector::compile(&params[0], &params[1], args.flag("cs")?)?;
    let source: Option<Template> = params.get(2).map(|t| projector.pattern().template(t));
    let return_input = args.flag("ri")?;
    let overwrite = args.flag("ovw")?;
    let cwd = current_dir()?;

    Ok(Box::new(TryMapStage::new(name, move |line| {
        let pair = match &source {
            Some(template) => projector.project_pair(&line, template),
            None => projector.project(&line).map(|dest| (dest, line.clone())),
        };
        let Some((dest, src)) = pair else {
            return Ok(None);
        };
        let (src_path, dest_path) = (Path::new(&src), Path::new(&dest));

        match transfer {
            Transfer::Copy => {
                if same_path(&cwd, &src, &dest) || (!overwrite && dest_path.exists()) {
                    return Ok(None);
                }
                create_parent(dest_path)?;
                fs::copy(src_path, dest_path).map_err(|e| LineError::io(src_path, e))?;
            }
            Transfer::Move => {
                if !src_path.is_file() {
                    return Ok(None);
                }
                if !overwrite && dest_path.exists() {
                    return Err(LineError::DestinationExists(dest_path.to_path_buf()));
                }
                move_file(src_path, dest_path)?;
            }
        }
        Ok(Some(if return_input { line } else { dest }))
    })))
}

pub(super) fn copy_files(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    templated_transfer("copyFiles", Transfer::Copy, args)
}

pub(super) fn ren_files(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    templated_transfer("renFiles", Transfer::Move, args)
}

/// `dir [--ri][--ovw]`: the directory is created with the first input line.
fn to_dir(name: &'static str, transfer: Transfer, args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["ri", "ovw"])?;
    let dir = PathBuf::from(&args.expect_parameters(1..=1)?[0]);
    let return_input = args.flag("ri")?;
    let overwrite = args.flag("ovw")?;
    let cwd = current_dir()?;
    let mut dir_ready = false;

    Ok(Box::new(TryMapStage::new(name, move |line| {
        if !dir_ready {
            fs::create_dir_all(&dir).map_err(|e| LineError::io(&dir, e))?;
            dir_ready = true;
        }
        let src = Path::new(&line);
        let Some(file_name) = src.file_name() else {
            return Ok(None);
        };
        let dest = dir.join(file_name);
        let dest_str = dest.to_string_lossy().into_owned();
        if same_path(&cwd, &line, &dest_str) || (!overwrite && dest.exists()) {
            return Ok(None);
        }
        match transfer {
            Transfer::Copy => {
                fs::copy(src, &dest).map_err(|e| LineError::io(src, e))?;
            }
            Transfer::Move => move_file(src, &dest)?,
        }
        Ok(Some(if return_input { line } else { dest_str }))
    })))
}

pub(super) fn copy_to_dir(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    to_dir("copyToDir", Transfer::Copy, args)
}

pub(super) fn move_to_dir(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    to_dir("moveToDir", Transfer::Move, args)
}

/// `[--rx ptrn tmpl [--cs][--ri]]`: `--cs` and `--ri` require `--rx`.
fn target_options(args: &ParsedArguments) -> Result<(Extractor, bool)> {
    args.reject_unknown(&["rx", "cs", "ri"])?;
    args.expect_parameters(0..=0)?;
    let rx = args.values("rx", 2..=2)?;
    let case_sensitive = args.flag("cs")?;
    let return_input = args.flag("ri")?;
    if rx.is_none() && (case_sensitive || return_input) {
        return Err(UsageError.into());
    }
    Ok((Extractor::from_rx(rx, case_sensitive)?, return_input))
}

fn target_stage(
    name: &'static str,
    args: &ParsedArguments,
    apply: fn(&Path) -> LineResult<bool>,
) -> Result<Box<dyn LineStage>> {
    let (extractor, return_input) = target_options(args)?;
    Ok(Box::new(TryMapStage::new(name, move |line| {
        let Some(target) = extractor.extract(&line) else {
            return Ok(None);
        };
        if !apply(Path::new(&target))? {
            return Ok(None);
        }
        Ok(Some(if return_input { line } else { target }))
    })))
}

pub(super) fn del_files(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    target_stage("delFiles", args, |path| {
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(path).map_err(|e| LineError::io(path, e))?;
        Ok(true)
    })
}

pub(super) fn del_dirs(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    target_stage("delDirs", args, |path| {
        if !path.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(path).map_err(|e| LineError::io(path, e))?;
        Ok(true)
    })
}

pub(super) fn create_dirs(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    target_stage("createDirs", args, |path| {
        if path.as_os_str().is_empty() || path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(path).map_err(|e| LineError::io(path, e))?;
        Ok(true)
    })
}

/// Tees the input to stdout and to a file.
struct Dump {
    path: PathBuf,
    writer: BufWriter<File>,
    filter: Option<LineFilter>,
}

impl LineStage for Dump {
    fn process(&mut self, line: String) -> LineResult<Vec<String>> {
        if self.filter.as_ref().is_none_or(|f| f.is_match(&line)) {
            writeln!(self.writer, "{line}").map_err(|e| LineError::io(&self.path, e))?;
        }
        Ok(vec![line])
    }

    fn flush(&mut self) -> Result<Vec<String>> {
        self.writer
            .flush()
            .map_err(|e| LinkError::io(self.path.display().to_string(), e))?;
        Ok(vec![])
    }

    fn name(&self) -> &str {
        "dump"
    }
}

pub(super) fn dump(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["rx", "cs", "ovw"])?;
    let path = PathBuf::from(&args.expect_parameters(1..=1)?[0]);
    let rx = args.values("rx", 1..=1)?;
    let case_sensitive = args.flag("cs")?;
    if rx.is_none() && case_sensitive {
        return Err(UsageError.into());
    }
    let filter = rx
        .map(|p| CompiledPattern::new(&p[0], case_sensitive).map(LineFilter::matching))
        .transpose()?;

    let overwrite = args.flag("ovw")?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!overwrite)
        .truncate(overwrite)
        .open(&path)
        .map_err(|e| LinkError::io(path.display().to_string(), e))?;

    Ok(Box::new(Dump {
        path,
        writer: BufWriter::new(file),
        filter,
    }))
}

/// Replaces each existing file name with the file's lines.
struct Emit {
    extractor: Extractor,
}

impl LineStage for Emit {
    fn process(&mut self, line: String) -> LineResult<Vec<String>> {
        let Some(name) = self.extractor.extract(&line) else {
            return Ok(vec![]);
        };
        let path = Path::new(&name);
        if !path.is_file() {
            return Ok(vec![]);
        }
        let file = File::open(path).map_err(|e| LineError::io(path, e))?;
        BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| LineError::io(path, e))
    }

    fn name(&self) -> &str {
        "emit"
    }
}

pub(super) fn emit(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    args.reject_unknown(&["rx", "cs"])?;
    args.expect_parameters(0..=0)?;
    Ok(Box::new(Emit {
        extractor: super::rx_extractor(args)?,
    }))
}

#[cfg(test)]
mod tests {
    use crate::commands::run;
    use crate::error::LinkError;
    use std::fs;

    fn path_str(p: &std::path::Path) -> String {
        p.to_string_lossy().into_owned()
    }

    #[test]
    fn test_copy_files_with_template() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "data").unwrap();
        let input = path_str(&src);
        let ptrn = r"^(.*)/a\.txt$";

        let out = run("copyFiles", &[ptrn, "$1/out/b.txt"], &input).unwrap();
        let dest = dir.path().join("out/b.txt");
        assert_eq!(out, vec![path_str(&dest)]);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "data");

        // Existing destination without --ovw is skipped silently.
        fs::write(&src, "new").unwrap();
        assert!(run("copyFiles", &[ptrn, "$1/out/b.txt"], &input).unwrap().is_empty());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "data");

        let out = run("copyFiles", &[ptrn, "$1/out/b.txt", "--ovw", "--ri"], &input).unwrap();
        assert_eq!(out, vec![input.clone()]);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn test_copy_files_explicit_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.txt"), "x").unwrap();
        let line = format!("{} -> y.txt", path_str(&dir.path().join("x.txt")));
        let ptrn = r"^(.*)/(\w+\.txt) -> (.*)$";

        let out = run("copyFiles", &[ptrn, "$1/$3", "$1/$2"], &line).unwrap();
        assert_eq!(out, vec![path_str(&dir.path().join("y.txt"))]);
        assert!(dir.path().join("y.txt").is_file());

        assert!(run("copyFiles", &[ptrn, "$1/$2", "$1/$2"], &line).unwrap().is_empty());
    }

    #[test]
    fn test_ren_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("old.log");
        fs::write(&src, "1").unwrap();
        fs::write(dir.path().join("taken.log"), "2").unwrap();
        let input = path_str(&src);

        let out = run("renFiles", &[r"^(.*)/old\.log$", "$1/taken.log"], &input).unwrap();
        assert!(out.is_empty());
        assert!(src.is_file());

        let out = run("renFiles", &[r"^(.*)/old\.log$", "$1/new.log"], &input).unwrap();
        assert_eq!(out, vec![path_str(&dir.path().join("new.log"))]);
        assert!(!src.exists());
    }

    #[test]
    fn test_copy_and_move_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "a").unwrap();
        let target = dir.path().join("nested/target");
        let t = path_str(&target);

        let out = run("copyToDir", &[t.as_str()], &path_str(&a)).unwrap();
        assert_eq!(out, vec![path_str(&target.join("a.txt"))]);
        assert!(a.is_file());

        assert!(run("moveToDir", &[t.as_str()], &path_str(&a)).unwrap().is_empty());
        let out = run("moveToDir", &[t.as_str(), "--ovw", "--ri"], &path_str(&a)).unwrap();
        assert_eq!(out, vec![path_str(&a)]);
        assert!(!a.exists());
    }

    #[test]
    fn test_to_dir_not_created_without_input() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("never");
        assert!(run("copyToDir", &[path_str(&target).as_str()], "").unwrap().is_empty());
        assert!(!target.exists());
    }

    #[test]
    fn test_del_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f.txt");
        let d = dir.path().join("d/e");
        fs::write(&f, "").unwrap();
        fs::create_dir_all(&d).unwrap();
        let input = format!("{}\n{}", path_str(&f), path_str(&dir.path().join("d")));

        assert_eq!(run("delFiles", &[], &input).unwrap(), vec![path_str(&f)]);
        assert!(!f.exists());
        assert_eq!(run("delDirs", &[], &input).unwrap(), vec![path_str(&dir.path().join("d"))]);
        assert!(!d.exists());
    }

    #[test]
    fn test_create_dirs_with_rx() {
        let dir = tempfile::tempdir().unwrap();
        let root = path_str(dir.path());
        let input = format!("mk {root}/x/y\nmk {root}\nother");

        let out = run("createDirs", &["--rx", r"^mk (.*)$", "$1", "--ri"], &input).unwrap();
        assert_eq!(out, vec![format!("mk {root}/x/y")]);
        assert!(dir.path().join("x/y").is_dir());
    }

    #[test]
    fn test_target_options_require_rx() {
        assert!(matches!(run("delFiles", &["--ri"], "x"), Err(LinkError::Usage(_))));
        assert!(matches!(run("delDirs", &["--cs"], "x"), Err(LinkError::Usage(_))));
    }

    #[test]
    fn test_dump() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dump.txt");
        let f = path_str(&file);

        assert_eq!(run("dump", &[f.as_str()], "a\nb").unwrap(), vec!["a", "b"]);
        assert_eq!(run("dump", &[f.as_str(), "--rx", "^b"], "a\nB").unwrap(), vec!["a", "B"]);
        assert_eq!(fs::read_to_string(&file).unwrap(), "a\nb\nB\n");

        run("dump", &[f.as_str(), "--ovw"], "z").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "z\n");
    }

    #[test]
    fn test_emit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("in.txt");
        fs::write(&file, "1\n2\n").unwrap();
        let input = format!("{}\n{}/missing", path_str(&file), path_str(dir.path()));

        assert_eq!(run("emit", &[], &input).unwrap(), vec!["1", "2"]);
        let line = format!("see {}", path_str(&file));
        assert_eq!(run("emit", &["--rx", "^see (.*)$", "$1"], &line).unwrap(), vec!["1", "2"]);
    }
}

//! Projections of the path named by each line.
//!
//! Every command here takes `[--rx ptrn tmpl [--cs]]` to pull the path out
//! of a larger line and `[--pi [sep]]` to keep the input line in front of
//! the result. Paths that do not exist are skipped; other filesystem errors
//! are reported per line.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local, Utc};

use super::{prepend_input, rx_extractor};
use crate::args::ParsedArguments;
use crate::engine::{Extractor, PrependInput};
use crate::error::{LineError, LinkError, Result};
use crate::stage::{LineStage, TryMapStage};

type PathResult = std::result::Result<Option<String>, LineError>;
type PathFn = Box<dyn FnMut(&str) -> PathResult>;

/// Validate the options shared by path commands plus `extra`.
fn path_options(args: &ParsedArguments, extra: &[&str]) -> Result<(Extractor, PrependInput)> {
    let mut allowed = vec!["rx", "cs", "pi"];
    allowed.extend_from_slice(extra);
    args.reject_unknown(&allowed)?;
    Ok((rx_extractor(args)?, prepend_input(args)?))
}

fn path_stage(
    name: &'static str,
    extractor: Extractor,
    pi: PrependInput,
    mut f: PathFn,
) -> Box<dyn LineStage> {
    Box::new(TryMapStage::new(name, move |line| {
        let Some(path) = extractor.extract(&line) else {
            return Ok(None);
        };
        if path.trim().is_empty() {
            return Ok(None);
        }
        Ok(f(&path)?.map(|value| pi.render(&line, &value)))
    }))
}

fn current_dir() -> Result<PathBuf> {
    env::current_dir().map_err(|e| LinkError::io("current directory", e))
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
pub(crate) fn absolute(base: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `path` relative to `base`. Both must be absolute.
fn relative(base: &Path, path: &Path) -> PathBuf {
    let base: Vec<Component> = base.components().collect();
    let path: Vec<Component> = path.components().collect();
    if base.first() != path.first() {
        return path.iter().collect();
    }
    let common = base
        .iter()
        .zip(&path)
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Metadata of `path`, or `None` when it does not exist.
fn metadata(path: &str) -> std::result::Result<Option<fs::Metadata>, LineError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(LineError::io(path, err)),
    }
}

/// Human-readable size: the largest binary unit strictly exceeded, two
/// decimals, thousands separators.
pub fn format_size(size: u64) -> String {
    const UNITS: [(&str, u64); 4] = [
        ("T", 1 << 40),
        ("G", 1 << 30),
        ("M", 1 << 20),
        ("K", 1 << 10),
    ];
    let (unit, value) = UNITS
        .iter()
        .find(|(_, scale)| size > *scale)
        .map_or(("B", size as f64), |(unit, scale)| (*unit, size as f64 / *scale as f64));

    let fixed = format!("{value:.2}");
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{grouped}.{frac}{unit}")
}

pub(super) fn files_name(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, pi) = path_options(args, &["noext"])?;
    args.expect_parameters(0..=0)?;
    let strip_extension = args.flag("noext")?;
    Ok(path_stage(
        "filesName",
        extractor,
        pi,
        Box::new(move |path: &str| -> PathResult {
            if path.ends_with(['/', std::path::MAIN_SEPARATOR]) {
                return Ok(None);
            }
            let path = Path::new(path);
            let name = if strip_extension {
                path.file_stem()
            } else {
                path.file_name()
            };
            Ok(name.map(|n| n.to_string_lossy().into_owned()))
        }),
    ))
}

pub(super) fn dirs_name(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, pi) = path_options(args, &[])?;
    args.expect_parameters(0..=0)?;
    Ok(path_stage(
        "dirsName",
        extractor,
        pi,
        Box::new(|path: &str| -> PathResult {
            Ok(Path::new(path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.trim().is_empty()))
        }),
    ))
}

pub(super) fn full_paths(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, pi) = path_options(args, &[])?;
    args.expect_parameters(0..=0)?;
    let cwd = current_dir()?;
    Ok(path_stage(
        "fullPaths",
        extractor,
        pi,
        Box::new(move |path: &str| -> PathResult {
            Ok(Some(
                absolute(&cwd, Path::new(path)).to_string_lossy().into_owned(),
            ))
        }),
    ))
}

pub(super) fn relative_paths(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, pi) = path_options(args, &[])?;
    let cwd = current_dir()?;
    let base = absolute(&cwd, Path::new(&args.expect_parameters(1..=1)?[0]));
    Ok(path_stage(
        "relativePaths",
        extractor,
        pi,
        Box::new(move |path: &str| -> PathResult {
            let target = absolute(&cwd, Path::new(path));
            Ok(Some(relative(&base, &target).to_string_lossy().into_owned()))
        }),
    ))
}

fn render_size(size: u64, formatted: bool) -> String {
    if formatted {
        format_size(size)
    } else {
        size.to_string()
    }
}

pub(super) fn files_size(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, pi) = path_options(args, &["fmt"])?;
    args.expect_parameters(0..=0)?;
    let formatted = args.flag("fmt")?;
    Ok(path_stage(
        "filesSize",
        extractor,
        pi,
        Box::new(move |path: &str| -> PathResult {
            Ok(metadata(path)?
                .filter(fs::Metadata::is_file)
                .map(|meta| render_size(meta.len(), formatted)))
        }),
    ))
}

/// Recursive directory sizes, memoized by absolute path.
#[derive(Default)]
struct DirSizes {
    known: HashMap<PathBuf, u64>,
}

impl DirSizes {
    fn size(&mut self, dir: &Path) -> io::Result<u64> {
        if let Some(&size) = self.known.get(dir) {
            return Ok(size);
        }
        let mut total = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                total += self.size(&entry.path())?;
            } else if file_type.is_file() {
                total += entry.metadata()?.len();
            }
        }
        self.known.insert(dir.to_path_buf(), total);
        Ok(total)
    }
}

pub(super) fn dirs_size(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, pi) = path_options(args, &["fmt"])?;
    args.expect_parameters(0..=0)?;
    let formatted = args.flag("fmt")?;
    let cwd = current_dir()?;
    let mut sizes = DirSizes::default();
    Ok(path_stage(
        "dirsSize",
        extractor,
        pi,
        Box::new(move |path: &str| -> PathResult {
            if !metadata(path)?.is_some_and(|meta| meta.is_dir()) {
                return Ok(None);
            }
            let dir = absolute(&cwd, Path::new(path));
            let size = sizes.size(&dir).map_err(|e| LineError::io(path, e))?;
            Ok(Some(render_size(size, formatted)))
        }),
    ))
}

pub(super) fn paths_date(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let (extractor, pi) = path_options(args, &["crd", "utc", "notm"])?;
    args.expect_parameters(0..=0)?;
    let created = args.flag("crd")?;
    let utc = args.flag("utc")?;
    let format = if args.flag("notm")? {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%dT%H:%M:%S"
    };
    Ok(path_stage(
        "pathsDate",
        extractor,
        pi,
        Box::new(move |path: &str| -> PathResult {
            let Some(meta) = metadata(path)? else {
                return Ok(None);
            };
            let time = (if created { meta.created() } else { meta.modified() })
                .map_err(|e| LineError::io(path, e))?;
            let stamp = if utc {
                DateTime::<Utc>::from(time).format(format).to_string()
            } else {
                DateTime::<Local>::from(time).format(format).to_string()
            };
            Ok(Some(stamp))
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run;
    use std::io::Write;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512.00B");
        assert_eq!(format_size(1024), "1,024.00B");
        assert_eq!(format_size(1536), "1.50K");
        assert_eq!(format_size((1 << 20) + 1), "1.00M");
        assert_eq!(format_size(5000 * (1 << 40)), "5,000.00T");
        assert_eq!(format_size(0), "0.00B");
    }

    #[test]
    fn test_absolute_resolves_dots() {
        let base = Path::new("/work/dir");
        assert_eq!(absolute(base, Path::new("../x/./y")), PathBuf::from("/work/x/y"));
        assert_eq!(absolute(base, Path::new("/abs")), PathBuf::from("/abs"));
        assert_eq!(absolute(base, Path::new("../../../..")), PathBuf::from("/"));
    }

    #[test]
    fn test_relative() {
        let rel = |a: &str, b: &str| relative(Path::new(a), Path::new(b));
        assert_eq!(rel("/a/b", "/a/b/c/d"), PathBuf::from("c/d"));
        assert_eq!(rel("/a/b", "/a/x"), PathBuf::from("../x"));
        assert_eq!(rel("/a/b", "/a/b"), PathBuf::from("."));
    }

    #[test]
    fn test_files_name() {
        assert_eq!(run("filesName", &[], "a/b/c.txt\nd/").unwrap(), vec!["c.txt"]);
        assert_eq!(run("filesName", &["--noext"], "a/b/c.txt").unwrap(), vec!["c"]);
        assert_eq!(
            run("filesName", &["--rx", r"^file: (.*)$", "$1", "--pi"], "FILE: x/y.rs\nno").unwrap(),
            vec!["FILE: x/y.rs:y.rs"]
        );
    }

    #[test]
    fn test_dirs_name() {
        assert_eq!(run("dirsName", &[], "a/b/c.txt\nc.txt").unwrap(), vec!["a/b"]);
        assert_eq!(run("dirsName", &["--pi", "|"], "a/b").unwrap(), vec!["a/b|a"]);
    }

    #[test]
    fn test_full_and_relative_paths() {
        let cwd = env::current_dir().unwrap();
        let expected = cwd.join("x.txt").to_string_lossy().into_owned();
        assert_eq!(run("fullPaths", &[], "./x.txt").unwrap(), vec![expected]);

        let base = cwd.join("sub").to_string_lossy().into_owned();
        assert_eq!(
            run("relativePaths", &[base.as_str()], "sub/a/b.txt\nother.txt").unwrap(),
            vec!["a/b.txt", "../other.txt"]
        );
    }

    #[test]
    fn test_files_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        fs::File::create(&path).unwrap().write_all(&[0; 1536]).unwrap();
        let p = path.to_str().unwrap();
        let missing = dir.path().join("none").to_string_lossy().into_owned();
        let input = format!("{p}\n{missing}\n{}", dir.path().display());

        assert_eq!(run("filesSize", &[], &input).unwrap(), vec!["1536"]);
        assert_eq!(run("filesSize", &["--fmt", "--pi", " "], p).unwrap(), vec![format!("{p} 1.50K")]);
    }

    #[test]
    fn test_dirs_size_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top.txt"), "12345").unwrap();
        fs::write(dir.path().join("a/b/deep.txt"), "123").unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let sub = dir.path().join("a").to_string_lossy().into_owned();

        assert_eq!(
            run("dirsSize", &[], &format!("{root}\n{sub}\n{root}/missing")).unwrap(),
            vec!["8", "3"]
        );
    }

    #[test]
    fn test_paths_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.txt");
        fs::write(&path, "x").unwrap();
        let p = path.to_str().unwrap();

        let out = run("pathsDate", &["--utc", "--notm"], p).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], Utc::now().format("%Y-%m-%d").to_string());

        let out = run("pathsDate", &[], &format!("{p}\n{p}.missing")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), "2024-01-01T00:00:00".len());
    }
}

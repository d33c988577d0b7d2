//! Directory listings. These commands ignore their input.

use std::path::PathBuf;

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use super::parse_count;
use crate::args::ParsedArguments;
use crate::error::{LinkError, Result, UsageError};
use crate::stage::{LineStage, SourceStage};

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
}

struct Listing {
    roots: Vec<PathBuf>,
    /// Levels below each root to descend into; 0 lists the root only.
    depth: usize,
    hidden: bool,
    name_only: bool,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

impl Listing {
    fn parse(args: &ParsedArguments) -> Result<Self> {
        args.reject_unknown(&["r", "hid", "dp"])?;
        let depth = match args.values("r", 0..=1)? {
            None => 0,
            Some([]) => usize::MAX - 1,
            Some([d]) => parse_count(d)?,
            Some(_) => return Err(UsageError.into()),
        };
        let roots = match args.parameters() {
            [] => vec![std::env::current_dir().map_err(|e| LinkError::io("current directory", e))?],
            dirs => dirs.iter().map(PathBuf::from).collect(),
        };
        if let Some(missing) = roots.iter().find(|dir| !dir.is_dir()) {
            return Err(LinkError::MissingPath(missing.clone()));
        }
        Ok(Self {
            roots,
            depth,
            hidden: args.flag("hid")?,
            name_only: args.flag("dp")?,
        })
    }

    /// Entries of every root in walk order, read as the output is consumed.
    fn entries(self, kind: EntryKind) -> impl Iterator<Item = Result<String>> {
        let Listing {
            roots,
            depth,
            hidden,
            name_only,
        } = self;

        roots.into_iter().flat_map(move |root| {
            WalkDir::new(root)
                .min_depth(1)
                .max_depth(depth.saturating_add(1))
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(move |e| hidden || !is_hidden(e))
                .filter_map(|entry| match entry {
                    Ok(e) => Some(e),
                    Err(err) => {
                        warn!("{err}");
                        None
                    }
                })
                .filter(move |entry| match kind {
                    EntryKind::File => entry.file_type().is_file(),
                    EntryKind::Dir => entry.file_type().is_dir(),
                })
                .map(move |entry| {
                    Ok(if name_only {
                        entry.file_name().to_string_lossy().into_owned()
                    } else {
                        entry.path().to_string_lossy().into_owned()
                    })
                })
        })
    }
}

fn enumerate(name: &'static str, kind: EntryKind, args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    let listing = Listing::parse(args)?;
    Ok(Box::new(SourceStage::new(name, listing.entries(kind))))
}

pub(super) fn enum_files(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    enumerate("enumFiles", EntryKind::File, args)
}

pub(super) fn enum_dirs(args: &ParsedArguments) -> Result<Box<dyn LineStage>> {
    enumerate("enumDirs", EntryKind::Dir, args)
}

#[cfg(test)]
mod tests {
    use crate::commands::{Invocation, prepare, run};
    use crate::error::LinkError;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join(".dot"), "").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "").unwrap();
        fs::write(dir.path().join("sub/deeper/c.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden/d.txt"), "").unwrap();
        dir
    }

    #[test]
    fn test_enum_files_top_level() {
        let dir = tree();
        let root = dir.path().to_str().unwrap();
        let out = run("enumFiles", &[root], "ignored").unwrap();
        assert_eq!(out, vec![dir.path().join("a.txt").to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_enum_files_recursive_names() {
        let dir = tree();
        let root = dir.path().to_str().unwrap();
        assert_eq!(
            run("enumFiles", &[root, "--r", "--dp"], "").unwrap(),
            vec!["a.txt", "b.txt", "c.txt"]
        );
        assert_eq!(
            run("enumFiles", &[root, "--r", "1", "--dp"], "").unwrap(),
            vec!["a.txt", "b.txt"]
        );
        assert_eq!(
            run("enumFiles", &[root, "--r", "--dp", "--hid"], "").unwrap(),
            vec![".dot", "d.txt", "a.txt", "b.txt", "c.txt"]
        );
    }

    #[test]
    fn test_enum_dirs() {
        let dir = tree();
        let root = dir.path().to_str().unwrap();
        assert_eq!(run("enumDirs", &[root, "--dp"], "").unwrap(), vec!["sub"]);
        assert_eq!(run("enumDirs", &[root, "--dp", "--r"], "").unwrap(), vec!["sub", "deeper"]);
    }

    #[test]
    fn test_walk_is_lazy() {
        let dir = tree();
        let root = dir.path().to_str().unwrap();
        let Invocation::Run(mut stage) = prepare("enumFiles", [root, "--r", "--dp"]).unwrap() else {
            panic!("unexpected help");
        };
        let mut entries = stage.generate().unwrap();
        assert_eq!(entries.next().unwrap().unwrap(), "a.txt");

        // Entries not yet reached are picked up when the walk gets there.
        fs::write(dir.path().join("sub/deeper/late.txt"), "").unwrap();
        let rest: Vec<String> = entries.map(|e| e.unwrap()).collect();
        assert_eq!(rest, vec!["b.txt", "c.txt", "late.txt"]);
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            run("enumFiles", &[missing.to_str().unwrap()], ""),
            Err(LinkError::MissingPath(_))
        ));
    }
}

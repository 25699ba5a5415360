//! Finding script files on disk and parsing many of them at once.

use crate::error::CompilerError;
use crate::ParseResult;
use regex::Regex;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: ParseResult,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Recursively collects files under `root` whose path matches `pattern`,
/// sorted. A plain file is returned as-is, whatever its name.
pub fn discover(root: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, CompilerError> {
    if !root.exists() {
        return Err(CompilerError::FileNotFound(root.to_path_buf()));
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| CompilerError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && pattern.is_match(&entry.path().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    tracing::debug!(root = %root.display(), count = files.len(), "discovered scripts");
    Ok(files)
}

pub fn parse_file(path: &Path) -> Result<FileReport, CompilerError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => CompilerError::FileNotFound(path.to_path_buf()),
        _ => CompilerError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let source = std::str::from_utf8(&bytes).map_err(|error| CompilerError::InvalidEncoding {
        path: path.to_path_buf(),
        offset: error.valid_up_to(),
    })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "parsing file");
    let result = crate::parse(source);
    tracing::debug!(
        path = %path.display(),
        diagnostics = result.diagnostics.len(),
        "parsed file"
    );

    Ok(FileReport {
        path: path.to_path_buf(),
        result,
    })
}

/// Parses `paths` on up to `jobs` scoped worker threads. Workers pull the
/// next unclaimed index, so the output keeps the input order.
pub fn parse_files(
    paths: &[PathBuf],
    jobs: usize,
) -> Vec<(PathBuf, Result<FileReport, CompilerError>)> {
    run_parallel(paths, jobs, parse_file)
}

/// Runs `task` over every path. A panicking task becomes an error for its
/// own path; every path always gets exactly one result.
fn run_parallel<F>(
    paths: &[PathBuf],
    jobs: usize,
    task: F,
) -> Vec<(PathBuf, Result<FileReport, CompilerError>)>
where
    F: Fn(&Path) -> Result<FileReport, CompilerError> + Sync,
{
    let workers = jobs.clamp(1, paths.len().max(1));
    let next = AtomicUsize::new(0);

    let mut finished: Vec<(usize, Result<FileReport, CompilerError>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let next = &next;
                let task = &task;
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = paths.get(index) else {
                            break;
                        };
                        tracing::trace!(worker, path = %path.display(), "worker picked up file");
                        let result = panic::catch_unwind(AssertUnwindSafe(|| task(path)))
                            .unwrap_or_else(|payload| {
                                tracing::error!(path = %path.display(), "worker panicked");
                                Err(CompilerError::Panicked {
                                    path: path.to_path_buf(),
                                    message: panic_message(payload.as_ref()),
                                })
                            });
                        done.push((index, result));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    });

    finished.sort_by_key(|(index, _)| *index);
    finished
        .into_iter()
        .map(|(index, result)| (paths[index].clone(), result))
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        String::from(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SOURCE_PATTERN;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.psc", b"Scriptname B\n");
        write(dir.path(), "nested/a.PSC", b"Scriptname A\n");
        write(dir.path(), "notes.txt", b"hello");

        let pattern = Regex::new(DEFAULT_SOURCE_PATTERN).unwrap();
        let found = discover(dir.path(), &pattern).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["b.psc", "nested/a.PSC"]);
    }

    #[test]
    fn missing_root_is_not_found() {
        let pattern = Regex::new(DEFAULT_SOURCE_PATTERN).unwrap();
        let result = discover(Path::new("/definitely/not/here"), &pattern);
        assert!(matches!(result, Err(CompilerError::FileNotFound(_))));
    }

    #[test]
    fn non_utf8_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.psc", b"Scriptname \xff\n");
        assert!(matches!(
            parse_file(&path),
            Err(CompilerError::InvalidEncoding { offset: 11, .. })
        ));
    }

    #[test]
    fn parallel_results_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..12)
            .map(|i| {
                let source = if i % 3 == 0 {
                    format!("Scriptname S{}\nFunction F(\nEndFunction\n", i)
                } else {
                    format!("Scriptname S{}\nFunction F()\nEndFunction\n", i)
                };
                write(dir.path(), &format!("s{:02}.psc", i), source.as_bytes())
            })
            .collect();

        let results = parse_files(&paths, 4);
        assert_eq!(results.len(), 12);
        for (i, (path, result)) in results.iter().enumerate() {
            assert_eq!(path, &paths[i]);
            let report = result.as_ref().unwrap();
            assert_eq!(report.result.script.name.name, format!("S{}", i));
            assert_eq!(report.is_success(), i % 3 != 0);
        }
    }

    #[test]
    fn a_panicking_file_still_gets_a_result() {
        let paths: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("s{}.psc", i))).collect();
        let results = run_parallel(&paths, 3, |path| {
            if path.ends_with("s2.psc") {
                panic!("boom");
            }
            Ok(FileReport {
                path: path.to_path_buf(),
                result: crate::parse("Scriptname S\n"),
            })
        });

        assert_eq!(results.len(), 6);
        for (i, (path, result)) in results.iter().enumerate() {
            assert_eq!(path, &paths[i]);
            match result {
                Err(CompilerError::Panicked { message, .. }) => {
                    assert_eq!(i, 2);
                    assert_eq!(message, "boom");
                }
                other => assert!(other.is_ok(), "{:?}", other),
            }
        }
    }

    #[test]
    fn empty_input_spawns_nothing_useful() {
        assert!(parse_files(&[], 8).is_empty());
    }
}

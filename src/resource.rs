// Resource path resolution
// Locates the bundled image next to the executable, falling back to the working directory

use crate::error::StartupError;
use log::debug;
use std::env;
use std::path::{Path, PathBuf};

/// Directories searched for bundled resources, in priority order
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(exe_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    if let Ok(cwd) = env::current_dir() {
        if !dirs.contains(&cwd) {
            dirs.push(cwd);
        }
    }

    dirs
}

/// Resolve `name` against the default search directories
pub fn resolve(name: &str) -> Result<PathBuf, StartupError> {
    resolve_in(name, &search_dirs())
}

/// Resolve `name` against `dirs`, returning the first candidate that exists.
///
/// The error reports the first candidate as the expected location and lists
/// every path that was tried.
pub fn resolve_in(name: &str, dirs: &[PathBuf]) -> Result<PathBuf, StartupError> {
    let tried: Vec<PathBuf> = if dirs.is_empty() {
        vec![PathBuf::from(name)]
    } else {
        dirs.iter().map(|dir| dir.join(name)).collect()
    };

    for candidate in &tried {
        debug!("Looking for resource at {}", candidate.display());
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }

    Err(StartupError::MissingResource {
        path: tried[0].clone(),
        tried,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("lockimage-resource-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn first_existing_candidate_wins() {
        let first = scratch_dir("first");
        let second = scratch_dir("second");
        fs::write(first.join("windows.png"), b"a").unwrap();
        fs::write(second.join("windows.png"), b"b").unwrap();

        let found = resolve_in("windows.png", &[first.clone(), second]).unwrap();
        assert_eq!(found, first.join("windows.png"));
    }

    #[test]
    fn falls_back_to_later_directory() {
        let empty = scratch_dir("empty");
        let fallback = scratch_dir("fallback");
        fs::write(fallback.join("windows.png"), b"x").unwrap();

        let found = resolve_in("windows.png", &[empty, fallback.clone()]).unwrap();
        assert_eq!(found, fallback.join("windows.png"));
    }

    #[test]
    fn missing_file_names_primary_path() {
        let a = scratch_dir("missing-a");
        let b = scratch_dir("missing-b");

        let err = resolve_in("windows.png", &[a.clone(), b.clone()]).unwrap_err();
        match &err {
            StartupError::MissingResource { path, tried } => {
                assert_eq!(path, &a.join("windows.png"));
                assert_eq!(tried.len(), 2);
                assert_eq!(tried[1], b.join("windows.png"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("windows.png"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn directory_with_resource_name_is_not_a_match() {
        let dir = scratch_dir("dir-named");
        fs::create_dir_all(dir.join("windows.png")).unwrap();

        assert!(resolve_in("windows.png", &[dir]).is_err());
    }
}

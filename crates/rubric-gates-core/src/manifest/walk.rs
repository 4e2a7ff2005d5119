//! Directory enumeration with glob exclusions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A regular file under the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// `/`-separated path relative to the root.
    pub rel_path: String,
    pub path: PathBuf,
}

/// Every non-excluded regular file under `root`, sorted by relative path.
///
/// Directories whose name matches a pattern are not descended into. Symlinked
/// directories are not followed.
pub fn walk_files(root: &Path, exclude: &[String]) -> io::Result<Vec<WalkedFile>> {
    let mut files = Vec::new();
    walk_into(root, "", exclude, &mut files)?;
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

fn walk_into(dir: &Path, prefix: &str, exclude: &[String], out: &mut Vec<WalkedFile>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel_path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            if !exclude.iter().any(|p| glob_match(p, &name)) {
                walk_into(&path, &rel_path, exclude, out)?;
            }
        } else if path.is_file() && !is_excluded(&rel_path, exclude) {
            out.push(WalkedFile { rel_path, path });
        }
    }
    Ok(())
}

/// True when a pattern matches the trailing components of `rel_path` or any
/// one of its directory components.
pub fn is_excluded(rel_path: &str, patterns: &[String]) -> bool {
    let parts: Vec<&str> = rel_path.split('/').collect();
    patterns.iter().any(|pattern| {
        let depth = pattern.split('/').count();
        if depth <= parts.len() {
            let tail = parts[parts.len() - depth..].join("/");
            if glob_match(pattern, &tail) {
                return true;
            }
        }
        parts[..parts.len() - 1]
            .iter()
            .any(|dir| glob_match(pattern, dir))
    })
}

/// Glob match supporting `*` and `?`; neither crosses `/`.
pub fn glob_match(pattern: &str, value: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let v: Vec<char> = value.chars().collect();

    let mut pi = 0usize;
    let mut vi = 0usize;
    let mut last_star: Option<usize> = None;
    let mut star_vi = 0usize;

    while vi < v.len() {
        if pi < p.len() && (p[pi] == v[vi] || (p[pi] == '?' && v[vi] != '/')) {
            pi += 1;
            vi += 1;
            continue;
        }

        if pi < p.len() && p[pi] == '*' {
            last_star = Some(pi);
            pi += 1;
            star_vi = vi;
            continue;
        }

        if let Some(star) = last_star {
            if v[star_vi] == '/' {
                return false;
            }
            star_vi += 1;
            vi = star_vi;
            pi = star + 1;
            continue;
        }

        return false;
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }

    pi == p.len()
}

//! Finding source and header files, and the path arithmetic around them.

use crate::canon::canon_path;
use crate::error::{Error, Result};
use rustc_hash::FxHashSet;
use std::path::Path;

/// Makes `path` absolute relative to `root`, unless it already is.
pub fn expand_with_root(path: &str, root: &str) -> String {
    if path.starts_with('/') {
        canon_path(path)
    } else {
        canon_path(format!("{}/{}", root, path))
    }
}

pub fn expand_all_with_root(paths: &[String], root: &str) -> Vec<String> {
    paths
        .iter()
        .map(|path| expand_with_root(path, root))
        .collect()
}

/// Strips `prefix` (and the following slash) from `path`; paths outside
/// `prefix` come back unchanged.
pub fn relative_path(path: &str, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some("") => ".".to_string(),
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => path.to_string(),
    }
}

/// `path` relative to the directory `base`, climbing out of it with `..`
/// where needed.  Both must be absolute and canonical.
pub fn relative_to(path: &str, base: &str) -> String {
    let path: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let base: Vec<&str> = base.split('/').filter(|c| !c.is_empty()).collect();
    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts = vec![".."; base.len() - common];
    parts.extend_from_slice(&path[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

pub fn is_glob(path: &str) -> bool {
    path.contains(|c| c == '*' || c == '?' || c == '[')
}

fn glob_files(pattern: &str, out: &mut Vec<String>) -> Result<()> {
    let paths = glob::glob(pattern)
        .map_err(|err| Error::Config(format!("bad search pattern {:?}: {}", pattern, err)))?;
    for entry in paths {
        let path = entry.map_err(|err| Error::Io(err.into_error()))?;
        if path.is_file() {
            out.push(path.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

/// Expands search paths into files.  Each search path is either a file, a
/// glob pattern, or a directory whose `*.<extension>` files are taken.
/// Relative results are expanded against `root`; duplicates are dropped,
/// keeping the first occurrence.
pub fn find_files(search_paths: &[String], extension: &str, root: &str) -> Result<Vec<String>> {
    let mut found = Vec::new();
    for search in search_paths {
        let search = expand_with_root(search, root);
        if Path::new(&search).is_file() {
            found.push(search);
        } else if is_glob(&search) {
            glob_files(&search, &mut found)?;
        } else {
            let pattern = format!("{}/*.{}", glob::Pattern::escape(&search), extension);
            glob_files(&pattern, &mut found)?;
        }
    }

    let mut seen = FxHashSet::default();
    Ok(found
        .into_iter()
        .map(|path| expand_with_root(&path, root))
        .filter(|path| seen.insert(path.clone()))
        .collect())
}

/// The directory part of a search pattern before its first wildcard, e.g.
/// "include/**/*.h" gives "include".
pub fn glob_base(pattern: &str) -> &str {
    let fixed = match pattern.find(|c| c == '*' || c == '?' || c == '[') {
        Some(i) => &pattern[..i],
        None => pattern,
    };
    match fixed.rfind('/') {
        Some(i) => &fixed[..i],
        None => "",
    }
}

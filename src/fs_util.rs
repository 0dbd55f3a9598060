use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::error::DaxError;

pub fn ensure_dir(path: &Utf8Path) -> Result<(), DaxError> {
    if !path.as_std_path().is_dir() {
        tracing::debug!("creating {path}");
    }
    fs::create_dir_all(path.as_std_path()).map_err(|err| DaxError::fs(path, err))
}

/// True for anything occupying `path`, including dangling symlinks.
pub fn entry_exists(path: &Utf8Path) -> bool {
    fs::symlink_metadata(path.as_std_path()).is_ok()
}

pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DaxError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".dax-pointer")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| DaxError::fs(parent, err))?;
    std::io::Write::write_all(&mut temp, content).map_err(|err| DaxError::fs(path, err))?;
    temp.persist(path.as_std_path())
        .map_err(|err| DaxError::fs(path, err.error))?;
    Ok(())
}

pub fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf, DaxError> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| DaxError::NonUtf8Path(path.display().to_string()))
}

/// Immediate entries of `dir`, sorted by name. Entries whose names are not
/// UTF-8 are skipped with a warning.
pub fn list_dir(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, DaxError> {
    let entries = fs::read_dir(dir.as_std_path()).map_err(|err| DaxError::fs(dir, err))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| DaxError::fs(dir, err))?;
        match to_utf8(entry.path()) {
            Ok(path) => out.push(path),
            Err(err) => warn!("skipping entry in {dir}: {err}"),
        }
    }
    out.sort();
    Ok(out)
}

/// Directories matching `prefix/<pattern>`, where `prefix` is taken
/// literally and `pattern` is a glob.
pub fn glob_dirs(prefix: &Utf8Path, pattern: &str) -> Result<Vec<Utf8PathBuf>, DaxError> {
    let full = format!(
        "{}{}{pattern}",
        glob::Pattern::escape(prefix.as_str()),
        std::path::MAIN_SEPARATOR
    );
    let paths = glob::glob(&full).map_err(|err| DaxError::InvalidPattern {
        pattern: full.clone(),
        message: err.to_string(),
    })?;
    let mut out = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!("skipping unreadable path while scanning {full}: {err}");
                continue;
            }
        };
        if !path.is_dir() {
            continue;
        }
        match to_utf8(path) {
            Ok(path) => out.push(path),
            Err(err) => warn!("skipping {err}"),
        }
    }
    Ok(out)
}

use std::fmt;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::DaxError;
use crate::fetch::{FetchCache, Transport};
use crate::fs_util;

pub const FILE_SCHEME: &str = "file://";
pub const CHIRP_SCHEME: &str = "chirp://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// One-line text file holding the URL.
    #[default]
    Pointer,
    /// Symlink to the original file; remote files still get pointer files.
    Symlink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistOptions {
    pub force: bool,
    pub mode: PersistMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Written,
    Overwritten,
    Skipped,
}

/// A file already on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    url: String,
    path: Utf8PathBuf,
    name: String,
}

impl LocalFile {
    fn parse(url: &str) -> Result<Self, DaxError> {
        let path = url
            .strip_prefix(FILE_SCHEME)
            .ok_or_else(|| DaxError::UnsupportedScheme(url.to_string()))?;
        let name = basename(url, path)?;
        Ok(Self {
            url: url.to_string(),
            path: Utf8PathBuf::from(path),
            name,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// A file held by a Chirp server, copied into the scratch cache on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChirpFile {
    url: String,
    host: String,
    port: Option<u16>,
    remote: String,
    name: String,
}

impl ChirpFile {
    fn parse(url: &str) -> Result<Self, DaxError> {
        let rest = url
            .strip_prefix(CHIRP_SCHEME)
            .ok_or_else(|| DaxError::UnsupportedScheme(url.to_string()))?;
        let invalid = |reason: &str| DaxError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        let ix_path = rest.find('/').ok_or_else(|| invalid("missing remote path"))?;
        let remote = &rest[ix_path..];

        let parsed = Url::parse(url).map_err(|err| invalid(&err.to_string()))?;
        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => "localhost".to_string(),
        };
        let name = basename(url, remote)?;

        Ok(Self {
            url: url.to_string(),
            host,
            port: parsed.port(),
            remote: remote.to_string(),
            name,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }
}

/// Reference to one file's bytes. The URL never changes once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(LocalFile),
    Chirp(ChirpFile),
}

impl Location {
    pub fn from_url(url: &str) -> Result<Self, DaxError> {
        debug!("parsing url {url}");
        if url.starts_with("chirp") {
            Ok(Location::Chirp(ChirpFile::parse(url)?))
        } else if url.starts_with("file") {
            Ok(Location::Local(LocalFile::parse(url)?))
        } else {
            Err(DaxError::UnsupportedScheme(url.to_string()))
        }
    }

    pub fn local(path: &Utf8Path) -> Result<Self, DaxError> {
        Self::from_url(&format!("{FILE_SCHEME}{path}"))
    }

    pub fn chirp(host: &str, port: Option<u16>, remote: &str) -> Result<Self, DaxError> {
        if !remote.starts_with('/') {
            return Err(DaxError::InvalidUrl {
                url: format!("{CHIRP_SCHEME}{host}{remote}"),
                reason: format!("remote path {remote:?} is not absolute"),
            });
        }
        let authority = match port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Self::from_url(&format!("{CHIRP_SCHEME}{authority}{remote}"))
    }

    pub fn url(&self) -> &str {
        match self {
            Location::Local(file) => &file.url,
            Location::Chirp(file) => &file.url,
        }
    }

    /// Basename of the URL; the key under which a generation tracks it.
    pub fn name(&self) -> &str {
        match self {
            Location::Local(file) => &file.name,
            Location::Chirp(file) => &file.name,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Chirp(_))
    }

    /// Path of a local copy of the file, fetching remote files into the
    /// cache when they are not there yet. The copy is left in place.
    pub fn resolve<T: Transport>(&self, cache: &FetchCache<T>) -> Result<Utf8PathBuf, DaxError> {
        match self {
            Location::Local(file) => {
                if !file.path.as_std_path().exists() {
                    return Err(DaxError::OriginalMissing(file.path.to_string()));
                }
                Ok(file.path.clone())
            }
            Location::Chirp(file) => cache.resolve(&file.host, file.port, &file.remote),
        }
    }

    /// Resolves and hands back a guard; a fetched copy is deleted when the
    /// guard is dropped, on every exit path.
    pub fn acquire<T: Transport>(&self, cache: &FetchCache<T>) -> Result<LocalCopy, DaxError> {
        let path = self.resolve(cache)?;
        Ok(LocalCopy {
            path,
            cleanup: self.is_remote(),
        })
    }

    pub fn with_local<T, F, R>(&self, cache: &FetchCache<T>, f: F) -> Result<R, DaxError>
    where
        T: Transport,
        F: FnOnce(&Utf8Path) -> Result<R, DaxError>,
    {
        let copy = self.acquire(cache)?;
        f(copy.path())
    }

    pub fn read_pointer(path: &Utf8Path) -> Result<Self, DaxError> {
        let content =
            fs::read_to_string(path.as_std_path()).map_err(|err| DaxError::fs(path, err))?;
        Self::from_url(content.trim())
    }

    /// Builds a location from a generation directory entry: symlinks point
    /// at local originals, anything else is a pointer file.
    pub fn from_entry(path: &Utf8Path) -> Result<Self, DaxError> {
        let meta = fs::symlink_metadata(path.as_std_path())
            .map_err(|_| DaxError::SymlinkMissing(path.to_string()))?;
        if !meta.file_type().is_symlink() {
            return Self::read_pointer(path);
        }
        let target = fs::read_link(path.as_std_path()).map_err(|err| DaxError::fs(path, err))?;
        let target = fs_util::to_utf8(target)?;
        let target = match path.parent() {
            Some(parent) if target.is_relative() => parent.join(target),
            _ => target,
        };
        if !target.as_std_path().exists() {
            return Err(DaxError::OriginalMissing(target.to_string()));
        }
        Self::local(&target)
    }

    pub fn persist(&self, path: &Utf8Path, options: PersistOptions) -> Result<WriteOutcome, DaxError> {
        match (options.mode, self) {
            (PersistMode::Symlink, Location::Local(_)) => self.write_symlink(path, options.force),
            _ => self.write_pointer(path, options.force),
        }
    }

    pub fn write_pointer(&self, path: &Utf8Path, force: bool) -> Result<WriteOutcome, DaxError> {
        let outcome = match existing_entry(path, force) {
            Some(outcome) => outcome,
            None => return Ok(WriteOutcome::Skipped),
        };
        fs_util::write_atomic(path, format!("{}\n", self.url()).as_bytes())?;
        Ok(outcome)
    }

    pub fn write_symlink(&self, path: &Utf8Path, force: bool) -> Result<WriteOutcome, DaxError> {
        let Location::Local(file) = self else {
            return self.write_pointer(path, force);
        };
        // Relative targets would resolve from the link's directory.
        let target = std::path::absolute(file.path.as_std_path())
            .map_err(|err| DaxError::fs(&file.path, err))?;
        let target = fs_util::to_utf8(target)?;
        if !target.as_std_path().exists() {
            return Err(DaxError::OriginalMissing(target.to_string()));
        }
        let outcome = match existing_entry(path, force) {
            Some(outcome) => outcome,
            None => return Ok(WriteOutcome::Skipped),
        };
        if outcome == WriteOutcome::Overwritten {
            fs::remove_file(path.as_std_path()).map_err(|err| DaxError::fs(path, err))?;
        }
        symlink(&target, path).map_err(|err| DaxError::fs(path, err))?;
        Ok(outcome)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(file) => write!(f, "Local(url={:?}, path={:?})", file.url, file.path),
            Location::Chirp(file) => write!(
                f,
                "Chirp(url={:?}, host={:?}, port={:?}, remote={:?})",
                file.url, file.host, file.port, file.remote
            ),
        }
    }
}

/// Local path of a resolved location. Dropping it removes fetched copies.
#[derive(Debug)]
pub struct LocalCopy {
    path: Utf8PathBuf,
    cleanup: bool,
}

impl LocalCopy {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for LocalCopy {
    fn drop(&mut self) {
        if !self.cleanup {
            return;
        }
        debug!("unlinking local file {}", self.path);
        if let Err(err) = fs::remove_file(self.path.as_std_path()) {
            warn!("failed to remove cached copy {}: {err}", self.path);
        }
    }
}

/// `None` means skip; otherwise how the write will be reported.
fn existing_entry(path: &Utf8Path, force: bool) -> Option<WriteOutcome> {
    if !fs_util::entry_exists(path) {
        debug!("location {path} being written");
        Some(WriteOutcome::Written)
    } else if force {
        warn!("location {path} already exists, overwriting");
        Some(WriteOutcome::Overwritten)
    } else {
        warn!("location {path} already exists, skipping");
        None
    }
}

fn basename(url: &str, path: &str) -> Result<String, DaxError> {
    Utf8Path::new(path)
        .file_name()
        .filter(|_| !path.ends_with('/'))
        .map(str::to_string)
        .ok_or_else(|| DaxError::InvalidUrl {
            url: url.to_string(),
            reason: "no file name".to_string(),
        })
}

#[cfg(unix)]
fn symlink(original: &Utf8Path, link: &Utf8Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original.as_std_path(), link.as_std_path())
}

#[cfg(not(unix))]
fn symlink(_original: &Utf8Path, _link: &Utf8Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlink persistence requires a unix filesystem",
    ))
}

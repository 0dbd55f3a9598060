use std::fs;
use std::path::{MAIN_SEPARATOR, PathBuf};
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::DaxError;

/// Replaces path separators in a remote path to build a flat cache name.
pub const CACHE_SENTINEL: char = '!';

pub const DEFAULT_FETCH_COMMAND: &str = "chirp_get";

#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub host: &'a str,
    pub port: Option<u16>,
    pub remote: &'a str,
    pub destination: &'a Utf8Path,
}

impl FetchRequest<'_> {
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.to_string(),
        }
    }
}

/// Moves the bytes of one remote file to a local destination.
pub trait Transport {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), DaxError>;

    fn describe(&self, request: &FetchRequest<'_>) -> String {
        format!(
            "fetch {} {} {}",
            request.authority(),
            request.remote,
            request.destination
        )
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), DaxError> {
        (**self).fetch(request)
    }

    fn describe(&self, request: &FetchRequest<'_>) -> String {
        (**self).describe(request)
    }
}

/// Shells out to `chirp_get <host[:port]> <remote> <local>`.
#[derive(Debug, Clone)]
pub struct ChirpGet {
    program: PathBuf,
}

impl ChirpGet {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_FETCH_COMMAND)
    }

    /// Uses `program` as found on `PATH`, or verbatim when it is not there.
    pub fn with_program(program: &str) -> Self {
        let program = find_in_path(program).unwrap_or_else(|| PathBuf::from(program));
        Self { program }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    fn args(request: &FetchRequest<'_>) -> [String; 3] {
        [
            request.authority(),
            request.remote.to_string(),
            request.destination.to_string(),
        ]
    }
}

impl Default for ChirpGet {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ChirpGet {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), DaxError> {
        let command = self.describe(request);
        debug!("executing: {command}");
        let status = Command::new(&self.program)
            .args(Self::args(request))
            .status()
            .map_err(|err| DaxError::FetchSpawn {
                command: command.clone(),
                message: err.to_string(),
            })?;
        if status.success() {
            return Ok(());
        }
        Err(DaxError::Fetch {
            command,
            code: status.code(),
        })
    }

    fn describe(&self, request: &FetchRequest<'_>) -> String {
        let [authority, remote, local] = Self::args(request);
        format!(
            "{} {authority} '{remote}' '{local}'",
            self.program.display()
        )
    }
}

/// Scratch directory holding local copies of remote files.
#[derive(Debug, Clone)]
pub struct FetchCache<T: Transport> {
    scratch_dir: Utf8PathBuf,
    transport: T,
}

impl<T: Transport> FetchCache<T> {
    pub fn new(scratch_dir: impl Into<Utf8PathBuf>, transport: T) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            transport,
        }
    }

    pub fn scratch_dir(&self) -> &Utf8Path {
        &self.scratch_dir
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache_path(&self, remote: &str) -> Utf8PathBuf {
        self.scratch_dir
            .join(remote.replace(MAIN_SEPARATOR, &CACHE_SENTINEL.to_string()))
    }

    /// Returns the cached copy of `remote`, fetching it first on a miss.
    pub fn resolve(
        &self,
        host: &str,
        port: Option<u16>,
        remote: &str,
    ) -> Result<Utf8PathBuf, DaxError> {
        let local = self.cache_path(remote);
        if local.as_std_path().exists() {
            debug!("{local} is cached");
            return Ok(local);
        }
        self.fetch_into(host, port, remote, &local)?;
        Ok(local)
    }

    /// Fetches into a private temp directory, then renames onto `local`,
    /// so concurrent readers never observe a partial cache file.
    fn fetch_into(
        &self,
        host: &str,
        port: Option<u16>,
        remote: &str,
        local: &Utf8Path,
    ) -> Result<(), DaxError> {
        fs::create_dir_all(self.scratch_dir.as_std_path())
            .map_err(|err| DaxError::fs(&self.scratch_dir, err))?;
        let staging = tempfile::Builder::new()
            .prefix(".dax-fetch")
            .tempdir_in(self.scratch_dir.as_std_path())
            .map_err(|err| DaxError::fs(&self.scratch_dir, err))?;
        let staging_dir = Utf8PathBuf::from_path_buf(staging.path().to_path_buf())
            .map_err(|path| DaxError::NonUtf8Path(path.display().to_string()))?;
        let file_name = local.file_name().unwrap_or("fetched");
        let destination = staging_dir.join(file_name);

        let request = FetchRequest {
            host,
            port,
            remote,
            destination: &destination,
        };
        debug!(
            "getting remote:{remote} -> local:{local} via {}",
            request.authority()
        );
        self.transport.fetch(&request)?;

        if !destination.as_std_path().exists() {
            return Err(DaxError::FetchOutputMissing {
                command: self.transport.describe(&request),
                path: destination.to_string(),
            });
        }
        fs::rename(destination.as_std_path(), local.as_std_path())
            .map_err(|err| DaxError::fs(local, err))?;
        Ok(())
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.contains(MAIN_SEPARATOR) {
        return None;
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

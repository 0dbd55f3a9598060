use std::fs;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;
use tracing::info;

use crate::error::DaxError;
use crate::location::Location;
use crate::naming::{Coordinate, capture, parse_trajectory};

static RE_RESULTS: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"{}results-([0-9]+)",
        regex::escape(std::path::MAIN_SEPARATOR_STR)
    );
    Regex::new(&pattern).expect("static regex")
});

/// How bare paths in a manifest become locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestKind {
    Local,
    Chirp { host: String, port: Option<u16> },
}

impl ManifestKind {
    pub fn location(&self, entry: &str) -> Result<Location, DaxError> {
        if entry.contains("://") {
            return Location::from_url(entry);
        }
        match self {
            ManifestKind::Local => Location::local(Utf8Path::new(entry)),
            ManifestKind::Chirp { host, port } => Location::chirp(host, *port, entry),
        }
    }
}

/// Reads one path or URL per line; blank lines are ignored.
pub fn read_manifest(path: &Utf8Path, kind: &ManifestKind) -> Result<Vec<Location>, DaxError> {
    let content = fs::read_to_string(path.as_std_path()).map_err(|err| DaxError::fs(path, err))?;
    let locations = parse_manifest(&content, kind)?;
    info!("read {} entries from {path}", locations.len());
    Ok(locations)
}

pub fn parse_manifest(content: &str, kind: &ManifestKind) -> Result<Vec<Location>, DaxError> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| kind.location(line))
        .collect()
}

/// Coordinate for work-unit archives laid out as
/// `.../RUNr/CLONEc/results-NNN.tar.bz2`, where NNN is the generation.
pub fn results_locator(url: &str) -> Result<Coordinate, DaxError> {
    let traj = parse_trajectory(url)?;
    let generation = capture(&RE_RESULTS, "results-", url)?;
    Ok(traj.generation(generation))
}

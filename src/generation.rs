use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use tracing::{debug, warn};

use crate::error::DaxError;
use crate::fs_util;
use crate::location::{Location, PersistOptions, WriteOutcome};
use crate::naming::Coordinate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub written: usize,
    pub overwritten: usize,
    pub skipped: usize,
}

impl PersistSummary {
    pub fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written => self.written += 1,
            WriteOutcome::Overwritten => self.overwritten += 1,
            WriteOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: PersistSummary) {
        self.written += other.written;
        self.overwritten += other.overwritten;
        self.skipped += other.skipped;
    }
}

/// Files of one (run, clone, gen), keyed by basename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    coordinate: Coordinate,
    files: BTreeMap<String, Location>,
}

impl Generation {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            files: BTreeMap::new(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Location> {
        self.files.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Location)> {
        self.files.iter().map(|(name, loc)| (name.as_str(), loc))
    }

    pub fn add(&mut self, location: Location) -> Result<(), DaxError> {
        match self.files.entry(location.name().to_string()) {
            Entry::Occupied(entry) => Err(DaxError::Duplicate {
                name: entry.key().clone(),
                generation: self.coordinate.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(location);
                Ok(())
            }
        }
    }

    /// Reads every entry of `dir`; entries found on disk replace in-memory
    /// ones with the same name. Unreadable entries are skipped.
    pub fn load(&mut self, dir: &Utf8Path) -> Result<(), DaxError> {
        for path in fs_util::list_dir(dir)? {
            let Some(name) = path.file_name() else {
                continue;
            };
            if path.as_std_path().is_dir() {
                warn!("skipping directory {path} inside generation {}", self.coordinate);
                continue;
            }
            match Location::from_entry(&path) {
                Ok(location) => {
                    self.files.insert(name.to_string(), location);
                }
                Err(err) => warn!("skipping {path}: {err}"),
            }
        }
        Ok(())
    }

    pub fn dir(&self, project_root: &Utf8Path) -> Utf8PathBuf {
        project_root.join(self.coordinate.to_string())
    }

    pub fn persist(
        &self,
        project_root: &Utf8Path,
        options: PersistOptions,
    ) -> Result<PersistSummary, DaxError> {
        let dir = self.dir(project_root);
        debug!(
            "writing generation {} files {:?} to {dir}",
            self.coordinate,
            self.files.keys().collect::<Vec<_>>()
        );
        fs_util::ensure_dir(&dir)?;

        let mut summary = PersistSummary::default();
        for (name, location) in &self.files {
            summary.record(location.persist(&dir.join(name), options)?);
        }
        Ok(summary)
    }

    /// The single tracked file whose basename matches the shell wildcard.
    pub fn find(&self, pattern: &str) -> Result<&Location, DaxError> {
        let compiled = Pattern::new(pattern).map_err(|err| DaxError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        let matches = self
            .files
            .iter()
            .filter(|(name, _)| compiled.matches(name))
            .collect::<Vec<_>>();

        match matches.as_slice() {
            [(_, location)] => Ok(*location),
            [] => Err(DaxError::NoMatch {
                pattern: pattern.to_string(),
                candidates: self.candidates(),
            }),
            many => Err(DaxError::AmbiguousPattern {
                pattern: pattern.to_string(),
                matches: many.iter().map(|(name, _)| name.to_string()).collect(),
                candidates: self.candidates(),
            }),
        }
    }

    /// On-disk path of the tree entry written for `name`.
    pub fn entry_path(&self, project_root: &Utf8Path, name: &str) -> Result<Utf8PathBuf, DaxError> {
        if !self.files.contains_key(name) {
            return Err(DaxError::UnknownCoordinate(format!(
                "file {name} in generation {}",
                self.coordinate
            )));
        }
        let path = self.dir(project_root).join(name);
        if !fs_util::entry_exists(&path) {
            return Err(DaxError::SymlinkMissing(path.to_string()));
        }
        Ok(path)
    }

    fn candidates(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::DaxError;
use crate::fs_util;
use crate::generation::{Generation, PersistSummary};
use crate::index::TrajectoryIndex;
use crate::location::{Location, PersistOptions};
use crate::naming::{Coordinate, TrajectoryId, parse_trajectory_dir, project_name};
use crate::trajectory::Trajectory;

/// Root of a `<prefix>/<group>.<platform>.<projid>` tree.
///
/// `name` and `root` are derived from the identifying fields and are
/// recomputed by every setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    prefix: Utf8PathBuf,
    group: String,
    platform: String,
    projid: u32,
    name: String,
    root: Utf8PathBuf,
    trajectories: TrajectoryIndex,
}

impl Project {
    pub fn new(
        prefix: impl Into<Utf8PathBuf>,
        group: impl Into<String>,
        platform: impl Into<String>,
        projid: u32,
    ) -> Self {
        let mut project = Self {
            prefix: prefix.into(),
            group: group.into(),
            platform: platform.into(),
            projid,
            name: String::new(),
            root: Utf8PathBuf::new(),
            trajectories: TrajectoryIndex::new(),
        };
        project.update_name_root();
        project
    }

    fn update_name_root(&mut self) {
        self.name = project_name(&self.group, &self.platform, self.projid);
        self.root = self.prefix.join(&self.name);
    }

    pub fn set_prefix(&mut self, prefix: impl Into<Utf8PathBuf>) {
        self.prefix = prefix.into();
        self.update_name_root();
    }

    pub fn set_group(&mut self, group: impl Into<String>) {
        self.group = group.into();
        self.update_name_root();
    }

    pub fn set_platform(&mut self, platform: impl Into<String>) {
        self.platform = platform.into();
        self.update_name_root();
    }

    pub fn set_projid(&mut self, projid: u32) {
        self.projid = projid;
        self.update_name_root();
    }

    pub fn prefix(&self) -> &Utf8Path {
        &self.prefix
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn projid(&self) -> u32 {
        self.projid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn add(&mut self, coordinate: Coordinate, location: Location) -> Result<(), DaxError> {
        debug!("adding {coordinate} {location}");
        self.trajectories
            .get_or_create(coordinate.trajectory())
            .add(coordinate.generation, location)
    }

    pub fn trajectory(&self, id: TrajectoryId) -> Result<&Trajectory, DaxError> {
        self.trajectories.get(id).ok_or_else(|| {
            if self.trajectories.contains_run(id.run) {
                DaxError::UnknownCoordinate(format!("CLONE {} of RUN {}", id.clone, id.run))
            } else {
                DaxError::UnknownCoordinate(format!("RUN {}", id.run))
            }
        })
    }

    pub fn get_or_create(&mut self, id: TrajectoryId) -> &mut Trajectory {
        self.trajectories.get_or_create(id)
    }

    pub fn generation(&self, coordinate: Coordinate) -> Result<&Generation, DaxError> {
        self.trajectory(coordinate.trajectory())?
            .generation(coordinate.generation)
    }

    pub fn trajectories(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    pub fn generations(&self) -> impl Iterator<Item = &Generation> {
        self.trajectories.iter().flat_map(Trajectory::generations)
    }

    pub fn file_count(&self) -> usize {
        self.trajectories.iter().map(Trajectory::file_count).sum()
    }

    /// Adds each location at the coordinate `locator` derives from its URL.
    ///
    /// Stops at the first failure; locations added before it stay in the
    /// project.
    pub fn ingest<F, I>(&mut self, mut locator: F, locations: I) -> Result<usize, DaxError>
    where
        F: FnMut(&str) -> Result<Coordinate, DaxError>,
        I: IntoIterator<Item = Location>,
    {
        info!("ingesting locations into {}", self.name);
        let mut added = 0;
        for location in locations {
            let coordinate = locator(location.url())?;
            self.add(coordinate, location)?;
            added += 1;
        }
        Ok(added)
    }

    /// Loads every `RUN*/CLONE*` trajectory under `root`.
    pub fn load(&mut self) -> Result<(), DaxError> {
        let root = self.root.clone();
        info!("loading files from {root}");
        if !root.as_std_path().is_dir() {
            warn!("project root {root} does not exist");
            return Ok(());
        }
        for dir in fs_util::glob_dirs(&root, &format!("RUN*{}CLONE*", std::path::MAIN_SEPARATOR))? {
            let relative = dir.strip_prefix(&root).unwrap_or(dir.as_path());
            let id = match parse_trajectory_dir(relative.as_str()) {
                Ok(id) => id,
                Err(err) => {
                    warn!("skipping {dir}: {err}");
                    continue;
                }
            };
            if let Err(err) = self.trajectories.get_or_create(id).load(&dir) {
                warn!("skipping {dir}: {err}");
            }
        }
        Ok(())
    }

    pub fn persist(&self, options: PersistOptions) -> Result<PersistSummary, DaxError> {
        info!("writing project to {}", self.root);
        fs_util::ensure_dir(&self.root)?;

        let mut summary = PersistSummary::default();
        for trajectory in self.trajectories.iter() {
            summary.merge(trajectory.persist(&self.root, options)?);
        }
        Ok(summary)
    }

    /// The single match for `pattern` in every generation. Generations
    /// without exactly one match are logged and left out.
    pub fn locations(&self, pattern: &str) -> Vec<(Coordinate, &Location)> {
        self.generations()
            .filter_map(|generation| match generation.find(pattern) {
                Ok(location) => Some((generation.coordinate(), location)),
                Err(err) => {
                    error!(
                        "could not get location for {}: {err}",
                        generation.coordinate()
                    );
                    None
                }
            })
            .collect()
    }

    /// Like [`Project::locations`], but yields the tree entry paths.
    pub fn files(&self, pattern: &str) -> Vec<Utf8PathBuf> {
        self.generations()
            .filter_map(|generation| {
                let found = generation
                    .find(pattern)
                    .and_then(|location| generation.entry_path(&self.root, location.name()));
                match found {
                    Ok(path) => Some(path),
                    Err(err) => {
                        error!(
                            "could not get file for {}: {err}",
                            generation.coordinate()
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_recompute_name_and_root() {
        let mut project = Project::new("tests", "lcls", "fah", 10009);
        assert_eq!(project.name(), "lcls.fah.10009");
        assert_eq!(project.root(), Utf8Path::new("tests/lcls.fah.10009"));

        project.set_projid(10010);
        project.set_group("csweet");
        project.set_platform("gpu");
        project.set_prefix("/data");
        assert_eq!(project.name(), "csweet.gpu.10010");
        assert_eq!(project.root(), Utf8Path::new("/data/csweet.gpu.10010"));
    }
}

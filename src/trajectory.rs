use std::collections::BTreeMap;

use camino::Utf8Path;
use tracing::{info, warn};

use crate::error::DaxError;
use crate::fs_util;
use crate::generation::{Generation, PersistSummary};
use crate::location::{Location, PersistOptions};
use crate::naming::{TrajectoryId, format_trajectory, parse_generation_number};

/// Generations of one (run, clone), created on first reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trajectory {
    id: TrajectoryId,
    generations: BTreeMap<u32, Generation>,
}

impl Trajectory {
    pub fn new(id: TrajectoryId) -> Self {
        Self {
            id,
            generations: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> TrajectoryId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.generations.values().map(Generation::len).sum()
    }

    pub fn get(&self, generation: u32) -> Option<&Generation> {
        self.generations.get(&generation)
    }

    pub fn generation(&self, generation: u32) -> Result<&Generation, DaxError> {
        self.get(generation).ok_or_else(|| {
            DaxError::UnknownCoordinate(format!(
                "generation {}",
                self.id.generation(generation)
            ))
        })
    }

    pub fn get_or_create(&mut self, generation: u32) -> &mut Generation {
        let id = self.id;
        self.generations
            .entry(generation)
            .or_insert_with(|| Generation::new(id.generation(generation)))
    }

    pub fn generations(&self) -> impl Iterator<Item = &Generation> {
        self.generations.values()
    }

    pub fn add(&mut self, generation: u32, location: Location) -> Result<(), DaxError> {
        self.get_or_create(generation).add(location)
    }

    /// Loads every `GEN*` directory directly under `traj_dir`. Directories
    /// that cannot be read are logged and skipped.
    pub fn load(&mut self, traj_dir: &Utf8Path) -> Result<(), DaxError> {
        info!("loading trajectory {} from {traj_dir}", self.id);
        for dir in fs_util::glob_dirs(traj_dir, "GEN*")? {
            let Some(component) = dir.file_name() else {
                continue;
            };
            let generation = match parse_generation_number(component) {
                Ok(generation) => generation,
                Err(err) => {
                    warn!("skipping {dir}: {err}");
                    continue;
                }
            };
            if let Err(err) = self.get_or_create(generation).load(&dir) {
                warn!("skipping {dir}: {err}");
                if self.get(generation).is_some_and(Generation::is_empty) {
                    self.generations.remove(&generation);
                }
            }
        }
        Ok(())
    }

    pub fn persist(
        &self,
        project_root: &Utf8Path,
        options: PersistOptions,
    ) -> Result<PersistSummary, DaxError> {
        let traj_dir = project_root.join(format_trajectory(self.id.run, self.id.clone));
        info!(
            "writing trajectory {} with {} generations to {traj_dir}",
            self.id,
            self.len()
        );
        fs_util::ensure_dir(&traj_dir)?;

        let mut summary = PersistSummary::default();
        for generation in self.generations.values() {
            summary.merge(generation.persist(project_root, options)?);
        }
        Ok(summary)
    }
}

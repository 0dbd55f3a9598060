use std::collections::BTreeMap;

use crate::naming::TrajectoryId;
use crate::trajectory::Trajectory;

/// Two-level run → clone → trajectory map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrajectoryIndex {
    runs: BTreeMap<u32, BTreeMap<u32, Trajectory>>,
}

impl TrajectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TrajectoryId) -> Option<&Trajectory> {
        self.runs.get(&id.run)?.get(&id.clone)
    }

    pub fn get_mut(&mut self, id: TrajectoryId) -> Option<&mut Trajectory> {
        self.runs.get_mut(&id.run)?.get_mut(&id.clone)
    }

    pub fn get_or_create(&mut self, id: TrajectoryId) -> &mut Trajectory {
        self.runs
            .entry(id.run)
            .or_default()
            .entry(id.clone)
            .or_insert_with(|| Trajectory::new(id))
    }

    pub fn contains_run(&self, run: u32) -> bool {
        self.runs.contains_key(&run)
    }

    pub fn len(&self) -> usize {
        self.runs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trajectories ordered by (run, clone).
    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.runs.values().flat_map(BTreeMap::values)
    }
}

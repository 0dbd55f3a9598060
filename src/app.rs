use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::error::DaxError;
use crate::fetch::{FetchCache, Transport};
use crate::location::Location;
use crate::manifest::{ManifestKind, read_manifest, results_locator};
use crate::project::Project;

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub project: String,
    pub root: String,
    pub ingested: usize,
    pub written: usize,
    pub overwritten: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub project: String,
    pub root: String,
    pub trajectories: Vec<TrajectoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryEntry {
    pub run: u32,
    pub clone: u32,
    pub generations: Vec<GenerationEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationEntry {
    pub generation: u32,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateResult {
    pub pattern: String,
    pub matches: Vec<LocateEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateEntry {
    pub coordinate: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub url: String,
    pub local_path: String,
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<T: Transport> {
    config: ResolvedConfig,
    cache: FetchCache<T>,
}

impl<T: Transport> App<T> {
    pub fn new(config: ResolvedConfig, transport: T) -> Self {
        let cache = FetchCache::new(config.scratch_dir.clone(), transport);
        Self { config, cache }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn cache(&self) -> &FetchCache<T> {
        &self.cache
    }

    pub fn empty_project(&self) -> Project {
        Project::new(
            self.config.prefix.clone(),
            self.config.group.clone(),
            self.config.platform.clone(),
            self.config.projid,
        )
    }

    pub fn load_project(&self) -> Result<Project, DaxError> {
        let mut project = self.empty_project();
        project.load()?;
        Ok(project)
    }

    /// Places every manifest entry with [`results_locator`] and writes the
    /// resulting tree.
    pub fn ingest(
        &self,
        manifest: &Utf8Path,
        kind: &ManifestKind,
        sink: &dyn ProgressSink,
    ) -> Result<IngestResult, DaxError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Read; manifest {manifest}"),
            elapsed: None,
        });
        let locations = read_manifest(manifest, kind)?;

        let mut project = self.empty_project();
        let ingested = project.ingest(results_locator, locations)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Place; {ingested} files in {} trajectories",
                project.trajectories().count()
            ),
            elapsed: Some(started.elapsed()),
        });

        let summary = project.persist(self.config.persist)?;
        sink.event(ProgressEvent {
            message: format!("phase=Write; {}", project.root()),
            elapsed: Some(started.elapsed()),
        });

        Ok(IngestResult {
            project: project.name().to_string(),
            root: project.root().to_string(),
            ingested,
            written: summary.written,
            overwritten: summary.overwritten,
            skipped: summary.skipped,
        })
    }

    pub fn list(&self, sink: &dyn ProgressSink) -> Result<ListResult, DaxError> {
        let project = self.empty_project();
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; scanning {}", project.root()),
            elapsed: None,
        });
        let project = self.load_project()?;

        let trajectories = project
            .trajectories()
            .map(|traj| TrajectoryEntry {
                run: traj.id().run,
                clone: traj.id().clone,
                generations: traj
                    .generations()
                    .map(|generation| GenerationEntry {
                        generation: generation.coordinate().generation,
                        files: generation
                            .iter()
                            .map(|(name, location)| FileEntry {
                                name: name.to_string(),
                                url: location.url().to_string(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(ListResult {
            project: project.name().to_string(),
            root: project.root().to_string(),
            trajectories,
        })
    }

    /// URLs (or tree entry paths when `files` is set) of the one file per
    /// generation matching `pattern`.
    pub fn locate(
        &self,
        pattern: &str,
        files: bool,
        sink: &dyn ProgressSink,
    ) -> Result<LocateResult, DaxError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; matching {pattern}"),
            elapsed: None,
        });
        let project = self.load_project()?;

        let matches = if files {
            project
                .files(pattern)
                .into_iter()
                .map(|path| LocateEntry {
                    coordinate: None,
                    value: path.to_string(),
                })
                .collect()
        } else {
            project
                .locations(pattern)
                .into_iter()
                .map(|(coordinate, location)| LocateEntry {
                    coordinate: Some(coordinate.to_string()),
                    value: location.url().to_string(),
                })
                .collect()
        };

        Ok(LocateResult {
            pattern: pattern.to_string(),
            matches,
        })
    }

    /// Resolves `url` into the scratch cache and leaves the copy there.
    pub fn fetch(&self, url: &str, sink: &dyn ProgressSink) -> Result<FetchResult, DaxError> {
        let started = Instant::now();
        let location = Location::from_url(url)?;
        let cached = match &location {
            Location::Chirp(file) => self.cache.cache_path(file.remote()).as_std_path().exists(),
            Location::Local(_) => true,
        };
        let local = location.resolve(&self.cache)?;
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; {url} -> {local}"),
            elapsed: Some(started.elapsed()),
        });

        Ok(FetchResult {
            url: url.to_string(),
            local_path: local.to_string(),
            cached,
        })
    }
}

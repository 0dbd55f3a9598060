use std::io::{self, Write};

use serde::Serialize;

use crate::app::{FetchResult, IngestResult, ListResult, LocateResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_ingest(result: &IngestResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_locate(result: &LocateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Plain line output; progress goes to stderr.
pub struct TextOutput;

impl TextOutput {
    pub fn print_ingest(result: &IngestResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "project {} at {}", result.project, result.root)?;
        writeln!(
            out,
            "ingested {} files: {} written, {} overwritten, {} skipped",
            result.ingested, result.written, result.overwritten, result.skipped
        )
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "project {} at {}", result.project, result.root)?;
        for traj in &result.trajectories {
            writeln!(out, "RUN{:04} CLONE{:04}", traj.run, traj.clone)?;
            for generation in &traj.generations {
                writeln!(out, "  GEN{:04}", generation.generation)?;
                for file in &generation.files {
                    writeln!(out, "    {} -> {}", file.name, file.url)?;
                }
            }
        }
        Ok(())
    }

    pub fn print_locate(result: &LocateResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for entry in &result.matches {
            match &entry.coordinate {
                Some(coordinate) => writeln!(out, "{coordinate}\t{}", entry.value)?,
                None => writeln!(out, "{}", entry.value)?,
            }
        }
        Ok(())
    }

    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{}", result.local_path)
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.2}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}

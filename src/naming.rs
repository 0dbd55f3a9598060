use std::fmt;
use std::path::MAIN_SEPARATOR_STR;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::DaxError;

static RE_RUN: LazyLock<Regex> = LazyLock::new(|| anchored("RUN"));
static RE_CLONE: LazyLock<Regex> = LazyLock::new(|| anchored("CLONE"));
static RE_GEN: LazyLock<Regex> = LazyLock::new(|| anchored("GEN"));
static RE_RUN_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RUN([0-9]+)$").expect("static regex"));
static RE_CLONE_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CLONE([0-9]+)$").expect("static regex"));
static RE_GEN_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GEN([0-9]+)$").expect("static regex"));

/// Token regex that only matches at the start of the string or right
/// after a path separator, so `xRUN12` is not read as a run number.
fn anchored(token: &str) -> Regex {
    let pattern = format!(
        r"(?:^|{sep}){token}([0-9]+)",
        sep = regex::escape(MAIN_SEPARATOR_STR)
    );
    Regex::new(&pattern).expect("static regex")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrajectoryId {
    pub run: u32,
    pub clone: u32,
}

impl TrajectoryId {
    pub fn new(run: u32, clone: u32) -> Self {
        Self { run, clone }
    }

    pub fn generation(self, generation: u32) -> Coordinate {
        Coordinate::new(self.run, self.clone, generation)
    }
}

impl fmt::Display for TrajectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_trajectory(self.run, self.clone))
    }
}

impl FromStr for TrajectoryId {
    type Err = DaxError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_trajectory(value)
    }
}

/// The (run, clone, gen) triple addressing one generation's file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Coordinate {
    pub run: u32,
    pub clone: u32,
    pub generation: u32,
}

impl Coordinate {
    pub fn new(run: u32, clone: u32, generation: u32) -> Self {
        Self { run, clone, generation }
    }

    pub fn trajectory(&self) -> TrajectoryId {
        TrajectoryId::new(self.run, self.clone)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_generation(self.run, self.clone, self.generation))
    }
}

impl FromStr for Coordinate {
    type Err = DaxError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_generation(value)
    }
}

pub fn project_name(group: &str, platform: &str, projid: u32) -> String {
    format!("{group}.{platform}.{projid}")
}

pub fn format_trajectory(run: u32, clone: u32) -> String {
    format!("RUN{run:04}{MAIN_SEPARATOR_STR}CLONE{clone:04}")
}

pub fn format_generation(run: u32, clone: u32, generation: u32) -> String {
    format!(
        "{}{MAIN_SEPARATOR_STR}GEN{generation:04}",
        format_trajectory(run, clone)
    )
}

pub fn parse_trajectory(path: &str) -> Result<TrajectoryId, DaxError> {
    let run = capture(&RE_RUN, "RUN", path)?;
    let clone = capture(&RE_CLONE, "CLONE", path)?;
    Ok(TrajectoryId::new(run, clone))
}

pub fn parse_generation(path: &str) -> Result<Coordinate, DaxError> {
    let traj = parse_trajectory(path)?;
    let generation = capture(&RE_GEN, "GEN", path)?;
    Ok(traj.generation(generation))
}

/// Parses a project-relative `RUNnnnn/CLONEnnnn` directory, with nothing
/// else in either component.
pub fn parse_trajectory_dir(relative: &str) -> Result<TrajectoryId, DaxError> {
    let mut components = relative.split(MAIN_SEPARATOR_STR);
    let (Some(run), Some(clone), None) = (components.next(), components.next(), components.next())
    else {
        return Err(DaxError::Parse {
            token: "RUN",
            path: relative.to_string(),
        });
    };
    Ok(TrajectoryId::new(
        capture(&RE_RUN_COMPONENT, "RUN", run)?,
        capture(&RE_CLONE_COMPONENT, "CLONE", clone)?,
    ))
}

/// Parses a bare `GENnnnn` directory name.
pub fn parse_generation_number(component: &str) -> Result<u32, DaxError> {
    capture(&RE_GEN_COMPONENT, "GEN", component)
}

pub(crate) fn capture(regex: &Regex, token: &'static str, path: &str) -> Result<u32, DaxError> {
    let parse_error = || DaxError::Parse {
        token,
        path: path.to_string(),
    };
    let digits = regex
        .captures(path)
        .and_then(|caps| caps.get(1))
        .ok_or_else(parse_error)?;
    digits.as_str().parse().map_err(|_| parse_error())
}

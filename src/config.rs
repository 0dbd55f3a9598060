use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::DaxError;
use crate::fetch::DEFAULT_FETCH_COMMAND;
use crate::location::{PersistMode, PersistOptions};

pub const CONFIG_FILE: &str = "dax.json";

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub projid: Option<u32>,
    #[serde(default)]
    pub scratch_dir: Option<String>,
    #[serde(default)]
    pub fetch_command: Option<String>,
    #[serde(default)]
    pub persist_mode: Option<PersistMode>,
    #[serde(default)]
    pub force: Option<bool>,
}

/// Command-line values; any that are set win over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub prefix: Option<String>,
    pub group: Option<String>,
    pub platform: Option<String>,
    pub projid: Option<u32>,
    pub scratch_dir: Option<String>,
    pub fetch_command: Option<String>,
    pub persist_mode: Option<PersistMode>,
    pub force: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub prefix: Utf8PathBuf,
    pub group: String,
    pub platform: String,
    pub projid: u32,
    pub scratch_dir: Utf8PathBuf,
    pub fetch_command: String,
    pub persist: PersistOptions,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `dax.json` in the working directory. Only an
    /// explicit path has to exist.
    pub fn load(path: Option<&str>) -> Result<Config, DaxError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DaxError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| DaxError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, DaxError> {
        let config = Self::load(path)?;
        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, DaxError> {
        let group = overrides
            .group
            .or(config.group)
            .ok_or(DaxError::MissingSetting("group"))?;
        let platform = overrides
            .platform
            .or(config.platform)
            .ok_or(DaxError::MissingSetting("platform"))?;
        let projid = overrides
            .projid
            .or(config.projid)
            .ok_or(DaxError::MissingSetting("projid"))?;

        let prefix = overrides
            .prefix
            .or(config.prefix)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        let scratch_dir = match overrides.scratch_dir.or(config.scratch_dir) {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_scratch_dir()?,
        };
        let fetch_command = overrides
            .fetch_command
            .or(config.fetch_command)
            .unwrap_or_else(|| DEFAULT_FETCH_COMMAND.to_string());

        Ok(ResolvedConfig {
            prefix,
            group,
            platform,
            projid,
            scratch_dir,
            fetch_command,
            persist: PersistOptions {
                force: overrides.force.or(config.force).unwrap_or(false),
                mode: overrides
                    .persist_mode
                    .or(config.persist_mode)
                    .unwrap_or_default(),
            },
        })
    }
}

/// `<user cache dir>/dax-manager/scratch`, or the system temp dir when no
/// home directory can be found.
pub fn default_scratch_dir() -> Result<Utf8PathBuf, DaxError> {
    let base = BaseDirs::new()
        .map(|dirs| dirs.cache_dir().join("dax-manager").join("scratch"))
        .unwrap_or_else(std::env::temp_dir);
    Utf8PathBuf::from_path_buf(base)
        .map_err(|path| DaxError::NonUtf8Path(path.display().to_string()))
}

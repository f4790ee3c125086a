use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::aspects;
use super::cli::InvocationRequest;
use super::dirs;
use super::error::{Error, Result};
use super::host::Host;

pub const PROJECT_CONFIG: &str = ".drun.yaml";
pub const CONFIG_ENV: &str = "DRUN_CONFIG";

/// Read-only launcher settings. Every field is optional so layers can be merged.
///
/// `docker` names the program that gets executed and `mounts` exposes host paths, so both are
/// only honored from the global layer. A project file is whatever sits in the working directory.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mounts: Option<Vec<aspects::Mount>>,
    pub timezone: Option<aspects::Timezone>,
    pub network: Option<aspects::Network>,
    pub docker: Option<String>,
}

impl Config {
    pub fn empty() -> Config {
        Config::default()
    }

    /// Loads a single config file; a missing file is an empty layer.
    pub fn load_layer(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::empty());
        }
        let yaml = fs::read_to_string(path)?;
        Config::parse(&yaml, path)
    }

    fn parse(yaml: &str, path: &Path) -> Result<Config> {
        if yaml.trim().is_empty() {
            return Ok(Config::empty());
        }
        serde_yaml::from_str(yaml).map_err(|source| Error::FailedToLoadConfig {
            path: path.to_string_lossy().to_string(),
            source,
        })
    }

    /// Global config (`$DRUN_CONFIG` or the user config dir) overlaid with the project config in
    /// `workdir`.
    pub fn load(global: Option<PathBuf>, workdir: &Path) -> Result<Config> {
        let global_path = match global {
            Some(p) => p,
            None => dirs::get_config_dir()?.join("config.yaml"),
        };
        log::trace!("loading global config from {}", global_path.display());
        let global_config = Config::load_layer(&global_path)?;

        let project_path = workdir.join(PROJECT_CONFIG);
        log::trace!("loading project config from {}", project_path.display());
        let project_config = Config::load_layer(&project_path)?;
        project_config.check_project_layer(&project_path)?;

        Ok(global_config.merge(&project_config))
    }

    /// The configuration an invocation needs. Help and version requests never read config, and
    /// a missing image is reported before any file is touched.
    pub fn resolve(
        request: &InvocationRequest,
        host: &dyn Host,
        global: Option<PathBuf>,
    ) -> Result<Config> {
        if request.help || request.version {
            return Ok(Config::empty());
        }
        request.image()?;
        Config::load(global, &host.current_dir()?)
    }

    fn check_project_layer(&self, path: &Path) -> Result<()> {
        let field = if self.docker.is_some() {
            "docker"
        } else if self.mounts.is_some() {
            "mounts"
        } else {
            return Ok(());
        };
        Err(Error::GlobalOnlySetting {
            path: path.to_string_lossy().to_string(),
            field,
        })
    }

    /// Merge settings from the given Config into a copy of the current, return a new Config.
    /// Scalars from `other` win; mounts accumulate.
    pub fn merge(&self, other: &Config) -> Config {
        let mut cfg = (*self).clone();

        cfg.mounts = merge(&self.mounts, &other.mounts);

        if let Some(v) = &other.timezone {
            cfg.timezone = Some(v.clone());
        }

        if let Some(v) = &other.network {
            cfg.network = Some(v.clone());
        }

        if let Some(v) = &other.docker {
            cfg.docker = Some(v.clone());
        }

        cfg
    }

    pub fn network(&self) -> aspects::Network {
        self.network.clone().unwrap_or_default()
    }

    pub fn docker(&self) -> String {
        self.docker.clone().unwrap_or_else(|| "docker".to_string())
    }

    pub fn mounts(&self) -> Vec<aspects::Mount> {
        self.mounts.clone().unwrap_or_default()
    }
}

fn merge<T: Clone>(left: &Option<Vec<T>>, right: &Option<Vec<T>>) -> Option<Vec<T>> {
    let mut new = Vec::new();

    if let Some(v) = &left {
        new = v.clone();
    }

    if let Some(v) = &right {
        new.append(&mut v.clone());
    }

    match new.len() {
        x if x > 0 => Some(new),
        _ => None,
    }
}



#[cfg(test)]
mod resolve_should {
    use super::*;
    use crate::host::fake::FakeHost;

    fn host_in(dir: &Path) -> FakeHost {
        FakeHost {
            cwd: Some(dir.to_path_buf()),
            ..FakeHost::default()
        }
    }

    #[test]
    fn report_missing_image_before_reading_config() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_CONFIG), "network: [unterminated\n")?;
        let request = InvocationRequest {
            dry: true,
            ..InvocationRequest::default()
        };

        assert!(matches!(
            Config::resolve(&request, &host_in(dir.path()), None),
            Err(Error::MissingImage)
        ));
        Ok(())
    }

    #[test]
    fn skip_config_for_help_and_version() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_CONFIG), "network: [unterminated\n")?;
        let request = InvocationRequest {
            version: true,
            ..InvocationRequest::default()
        };

        assert_eq!(
            Config::resolve(&request, &host_in(dir.path()), None)?,
            Config::empty()
        );
        Ok(())
    }

    #[test]
    fn load_layers_for_a_run() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let global = dir.path().join("global.yaml");
        fs::write(&global, "network: bridge\n")?;
        let request = InvocationRequest {
            image: Some("alpine".to_string()),
            ..InvocationRequest::default()
        };

        let cfg = Config::resolve(&request, &host_in(dir.path()), Some(global))?;
        assert_eq!(cfg.network(), aspects::Network("bridge".to_string()));
        Ok(())
    }
}

//! Configuration file loading and workspace bootstrap

use crate::{Error, FetchConfig, Result};
use log::{error, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file, relative to the workspace root
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Working directories, relative to the workspace root
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub images_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("core/data"),
            pages_dir: PathBuf::from("core/pages"),
            images_dir: PathBuf::from("core/images"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Contents of the TOML configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchConfig,
    pub paths: Paths,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }
}

/// A prepared workspace: directories exist and settings are loaded.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub settings: Settings,
}

impl Workspace {
    /// Create the working directories under `root` and load `config_path`
    /// (resolved against `root` when relative).
    ///
    /// The config directory is created if needed, but a missing config file
    /// is an error. The other directories come from the loaded settings, so
    /// nothing else is created when loading fails.
    pub fn prepare(root: impl Into<PathBuf>, config_path: &Path) -> Result<Self> {
        let root = root.into();
        let config_path = root.join(config_path);
        if let Some(parent) = config_path.parent() {
            ensure_dir(parent)?;
        }

        if !config_path.is_file() {
            error!("no configuration file found in {}", config_path.display());
            return Err(Error::ConfigError(format!(
                "no configuration file found in {}",
                config_path.display()
            )));
        }
        let settings = Settings::load(&config_path)?;

        let workspace = Self { root, settings };
        for dir in [
            workspace.data_dir(),
            workspace.pages_dir(),
            workspace.images_dir(),
            workspace.templates_dir(),
            workspace.output_dir(),
        ] {
            ensure_dir(&dir)?;
        }
        Ok(workspace)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(&self.settings.paths.data_dir)
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(&self.settings.paths.pages_dir)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(&self.settings.paths.images_dir)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.images_dir().join("templates")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.settings.paths.output_dir)
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    info!("creating working directory {}", path.display());

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }
    builder.create(path)?;
    Ok(())
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reinforceable_game::{ContentLoader, MissionConfig, ScenarioPool};

/// Reads the pool and config from disk, falling back to the bundled pool and
/// default configuration when no path is given.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    pool_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl FileLoader {
    pub const fn new(pool_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Self {
        Self {
            pool_path,
            config_path,
        }
    }

    /// Where content comes from, for the banner.
    pub fn pool_source(&self) -> String {
        self.pool_path
            .as_ref()
            .map_or_else(|| "bundled".to_string(), |path| path.display().to_string())
    }
}

fn read(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
        .map_err(|err| io::Error::new(err.kind(), format!("{}: {err}", path.display())))
}

fn invalid(path: &Path, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}: {err}", path.display()),
    )
}

impl ContentLoader for FileLoader {
    type Error = io::Error;

    fn load_pool(&self) -> Result<ScenarioPool, Self::Error> {
        match &self.pool_path {
            Some(path) => ScenarioPool::from_json(&read(path)?).map_err(|err| invalid(path, err)),
            None => Ok(ScenarioPool::bundled()),
        }
    }

    fn load_config(&self) -> Result<MissionConfig, Self::Error> {
        match &self.config_path {
            Some(path) => MissionConfig::from_json(&read(path)?).map_err(|err| invalid(path, err)),
            None => Ok(MissionConfig::default()),
        }
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use podcast_core::PollSettings;
use podcast_engine::{RemoteSettings, RouteLayout, DEFAULT_API_BASE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;

pub(crate) const CONFIG_FILENAME: &str = "podcast_studio.ron";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings shared by every run. File values are overridden by the
/// environment and by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub use_mock: bool,
    pub api_base: String,
    /// `Jobs` for `jobs/{id}/status` and `jobs/{id}/cancel`, `Flat` for
    /// `progress/{id}` and `cancel/{id}`.
    pub routes: RouteLayout,
    pub request_timeout_secs: u64,
    /// Unset means the preset for the chosen backend.
    pub poll_interval_secs: Option<u64>,
    pub poll_timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            use_mock: false,
            api_base: DEFAULT_API_BASE.to_string(),
            routes: RouteLayout::default(),
            request_timeout_secs: 15,
            poll_interval_secs: None,
            poll_timeout_secs: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `explicit` if given, which then must exist. Otherwise reads
    /// `./podcast_studio.ron` when present and falls back to defaults.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = PathBuf::from(CONFIG_FILENAME);
                match Self::read(&path) {
                    Err(ConfigError::Read { source, .. })
                        if source.kind() == io::ErrorKind::NotFound =>
                    {
                        Ok(Self::default())
                    }
                    other => other,
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Applies flags and their environment fallbacks on top of this config.
    pub(crate) fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(use_mock) = cli.mock {
            self.use_mock = use_mock;
        }
        if let Some(api_base) = &cli.api_base {
            self.api_base = api_base.clone();
        }
        if let Some(secs) = cli.poll_interval {
            self.poll_interval_secs = Some(secs);
        }
        if let Some(secs) = cli.poll_timeout {
            self.poll_timeout_secs = Some(secs);
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == Some(0) {
            return Err(ConfigError::Invalid("poll interval must be at least 1 second".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request timeout must be at least 1 second".into()));
        }
        if !self.use_mock {
            self.remote_settings()?;
        }
        Ok(())
    }

    pub(crate) fn remote_settings(&self) -> Result<RemoteSettings, ConfigError> {
        let settings = RemoteSettings::with_base(&self.api_base)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(settings
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_routes(self.routes))
    }

    pub(crate) fn poll_settings(&self) -> PollSettings {
        let mut settings = if self.use_mock {
            PollSettings::simulated()
        } else {
            PollSettings::remote()
        };
        if let Some(secs) = self.poll_interval_secs {
            settings.interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = self.poll_timeout_secs {
            settings.timeout = Duration::from_secs(secs);
        }
        if settings.timeout < settings.interval {
            engine_warn!(
                "Poll timeout {:?} is shorter than the interval {:?}; only one check will run",
                settings.timeout,
                settings.interval
            );
        }
        settings
    }

    pub(crate) fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::new();
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }
}

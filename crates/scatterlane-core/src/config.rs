use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    generation::GenerationOptions,
    model::CrossfadeShape,
    scheduler::{DEFAULT_CHUNK_ITEM_CAP, ScheduleOptions},
};

pub const CONFIG_FILE_NAME: &str = "scatterlane.config.toml";
pub const CONFIG_PATH_ENV: &str = "SCATTERLANE_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    pub generation: GenerationConfig,
    pub assets: AssetsConfig,
    pub diagnostics: DiagnosticsConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub crossfade_shape: CrossfadeShape,
    pub chunk_item_cap: usize,
    pub seed: Option<u64>,
    pub default_window_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub asset_directories: Vec<PathBuf>,
    pub probe_cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    /// Mirror events to stderr next to the JSON log file.
    pub console: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub logs_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub plans_dir: PathBuf,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            crossfade_shape: CrossfadeShape::Linear,
            chunk_item_cap: DEFAULT_CHUNK_ITEM_CAP,
            seed: None,
            default_window_seconds: 60.0,
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            asset_directories: vec![PathBuf::from("data/sound-library")],
            probe_cache_dir: PathBuf::from("data/probe-cache"),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: crate::diagnostics::DEFAULT_LOG_FILTER.to_string(),
            trace_file_prefix: "scatterlane".to_string(),
            console: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            sessions_dir: PathBuf::from("data/sessions"),
            plans_dir: PathBuf::from("data/plans"),
        }
    }
}

impl PathsConfig {
    #[must_use]
    pub fn session_file(&self, file_name: &str) -> PathBuf {
        self.sessions_dir.join(file_name)
    }

    #[must_use]
    pub fn plan_file(&self, file_name: &str) -> PathBuf {
        self.plans_dir.join(file_name)
    }
}

impl From<&GenerationConfig> for GenerationOptions {
    fn from(value: &GenerationConfig) -> Self {
        Self {
            schedule: ScheduleOptions {
                crossfade_shape: value.crossfade_shape,
                chunk_item_cap: value.chunk_item_cap.max(1),
            },
            seed: value.seed,
        }
    }
}

impl ScatterConfig {
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file {}", config_path.display()))?;

        let config: ScatterConfig = toml::from_str(&content).with_context(|| {
            format!("failed to parse config TOML from {}", config_path.display())
        })?;

        Ok(config)
    }

    /// Falls back to defaults when no config file exists. A file that
    /// exists but does not parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        match discover_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(error) => {
                warn!(%error, "no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    #[must_use]
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::from(&self.generation)
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| Path::new(path).is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults_for_missing_sections() {
        let config: ScatterConfig = toml::from_str(
            r#"
            [generation]
            crossfade_shape = "equal_power"
            seed = 42
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.generation.crossfade_shape, CrossfadeShape::EqualPower);
        assert_eq!(config.generation.chunk_item_cap, DEFAULT_CHUNK_ITEM_CAP);
        assert_eq!(config.diagnostics.trace_file_prefix, "scatterlane");

        let options = config.generation_options();
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.schedule.crossfade_shape, CrossfadeShape::EqualPower);
    }

    #[test]
    fn zero_chunk_cap_is_raised_to_one() {
        let config = GenerationConfig {
            chunk_item_cap: 0,
            ..GenerationConfig::default()
        };
        assert_eq!(GenerationOptions::from(&config).schedule.chunk_item_cap, 1);
    }

    #[test]
    fn load_from_reads_explicit_path() {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[paths]\nlogs_dir = \"custom-logs\"\n")
            .expect("config should be writable");
        let config = ScatterConfig::load_from(&path).expect("config should load");
        assert_eq!(config.paths.logs_dir, PathBuf::from("custom-logs"));
    }

    #[test]
    fn output_files_resolve_under_configured_directories() {
        let config: ScatterConfig = toml::from_str(
            r#"
            [paths]
            sessions_dir = "out/sessions"
            plans_dir = "out/plans"
            "#,
        )
        .expect("paths config should parse");

        assert_eq!(
            config.paths.session_file("demo.scatterlane.json"),
            PathBuf::from("out/sessions/demo.scatterlane.json")
        );
        assert_eq!(
            config.paths.plan_file("report.json"),
            PathBuf::from("out/plans/report.json")
        );
        assert_eq!(config.paths.logs_dir, PathBuf::from("logs"));
    }
}

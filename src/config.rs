// Settings file management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub binaries: BinariesConfig,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub dependencies: DependenciesConfig,

    #[serde(default)]
    pub process: ProcessConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine executables; bare names are looked up on PATH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinariesConfig {
    #[serde(default = "default_vspipe")]
    pub vspipe: PathBuf,

    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Directories holding the Python filter modules (havsfunc, adjust, ...)
    #[serde(default)]
    pub python_path: Vec<PathBuf>,

    /// VapourSynth plugin autoload directory
    #[serde(default)]
    pub plugin_path: Option<PathBuf>,

    /// Extra variables for both engines; these win over the derived ones
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependenciesConfig {
    /// Plugins and modules known to be missing on this machine
    #[serde(default)]
    pub unavailable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Time between SIGTERM and SIGKILL
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Control loop wake-up interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Minimum spacing of progress records
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Overall limit for a full job, none by default
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,

    #[serde(default = "default_preview_timeout_secs")]
    pub preview_timeout_secs: u64,

    /// Frame engine lines kept for crash reports
    #[serde(default = "default_diagnostic_tail_lines")]
    pub diagnostic_tail_lines: usize,

    /// Keep the per-run script directory for debugging
    #[serde(default)]
    pub keep_temp_files: bool,

    /// Parent of the per-run directories, system temp dir when unset
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive; RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append-only log file in addition to stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_vspipe() -> PathBuf {
    PathBuf::from("vspipe")
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_grace_period_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_progress_interval_ms() -> u64 {
    500
}

fn default_preview_timeout_secs() -> u64 {
    120
}

fn default_diagnostic_tail_lines() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BinariesConfig {
    fn default() -> Self {
        Self {
            vspipe: default_vspipe(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            job_timeout_secs: None,
            preview_timeout_secs: default_preview_timeout_secs(),
            diagnostic_tail_lines: default_diagnostic_tail_lines(),
            keep_temp_files: false,
            temp_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl ProcessConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Never zero, so the control loop cannot spin
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    pub fn preview_timeout(&self) -> Duration {
        Duration::from_secs(self.preview_timeout_secs)
    }

    /// How long `cancel()` waits for a run to wind down
    pub fn cancel_settle_limit(&self) -> Duration {
        self.grace_period() * 2 + Duration::from_secs(1)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Settings {
    /// Default settings location: `<config_dir>/restorepipe/settings.toml`
    pub fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("restorepipe");
        Ok(config_dir.join("settings.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::settings_path()?,
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        Ok(())
    }

    /// Variables set on both engine processes.
    ///
    /// User site-packages are always disabled so a stray module cannot
    /// shadow the configured filter modules.
    pub fn engine_env(&self) -> Vec<(String, OsString)> {
        let mut env = vec![("PYTHONNOUSERSITE".to_string(), OsString::from("1"))];

        if !self.environment.python_path.is_empty() {
            match std::env::join_paths(&self.environment.python_path) {
                Ok(joined) => env.push(("PYTHONPATH".to_string(), joined)),
                Err(e) => tracing::warn!("ignoring python_path: {}", e),
            }
        }
        if let Some(plugins) = &self.environment.plugin_path {
            env.push((
                "VAPOURSYNTH_PLUGIN_PATH".to_string(),
                plugins.clone().into_os_string(),
            ));
        }
        for (key, value) in &self.environment.vars {
            env.retain(|(existing, _)| existing != key);
            env.push((key.clone(), OsString::from(value)));
        }
        env
    }
}

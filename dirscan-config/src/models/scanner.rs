use anyhow::{Context, anyhow};
use dirscan_core::{DEFAULT_BUFFER, Mode, ScanBuilder, filter::NamePattern};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::ConfigLoadError;
use crate::util::{parse_bool, parse_csv};

/// Path of a TOML or JSON config file.
pub const CONFIG_PATH_VAR: &str = "DIRSCAN_CONFIG_PATH";
/// Inline JSON configuration.
pub const CONFIG_JSON_VAR: &str = "DIRSCAN_CONFIG_JSON";
/// Overrides `workers`.
pub const WORKERS_VAR: &str = "DIRSCAN_WORKERS";
/// Overrides `buffer`.
pub const BUFFER_VAR: &str = "DIRSCAN_BUFFER";
/// Overrides `recursive`; accepts the usual boolean spellings.
pub const RECURSIVE_VAR: &str = "DIRSCAN_RECURSIVE";
/// Comma-separated extensions.
pub const EXTENSIONS_VAR: &str = "DIRSCAN_EXTENSIONS";
/// Comma-separated roots.
pub const ROOTS_VAR: &str = "DIRSCAN_ROOTS";

fn default_buffer() -> usize {
    DEFAULT_BUFFER
}

fn default_recursive() -> bool {
    true
}

/// Source that produced the scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScannerConfigSource {
    /// Nothing found; built-in defaults.
    #[default]
    Default,
    /// File named by `DIRSCAN_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// `DIRSCAN_CONFIG_JSON`.
    EnvInline,
    /// File given explicitly or found in the working directory.
    File(PathBuf),
}

/// Entry kinds a scan reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Every entry.
    #[default]
    All,
    /// Regular files only.
    Files,
    /// Directories only.
    Directories,
}

impl From<ScanMode> for Mode {
    fn from(mode: ScanMode) -> Self {
        match mode {
            ScanMode::All => Mode::All,
            ScanMode::Files => Mode::Files,
            ScanMode::Directories => Mode::Directories,
        }
    }
}

/// Scanner settings. Every field has a default so a config file only needs
/// the knobs it changes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Maximum directories listed at once. Unset means one per CPU. Raising
    /// it helps on network mounts with high latency; on a local SSD the
    /// default is usually already saturating.
    pub workers: Option<usize>,
    /// Entries buffered between the walk and the consumer before listing
    /// tasks start waiting.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
    /// Descend into subdirectories.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Entry kinds to report.
    pub mode: ScanMode,
    /// Only report entries with one of these extensions (case-insensitive).
    pub extensions: Vec<String>,
    /// File-name regular expression.
    pub pattern: Option<String>,
    /// Stop after this many entries.
    pub limit: Option<usize>,
    /// Directories to scan when none are given on the command line.
    pub roots: Vec<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: None,
            buffer: default_buffer(),
            recursive: default_recursive(),
            mode: ScanMode::default(),
            extensions: Vec::new(),
            pattern: None,
            limit: None,
            roots: Vec::new(),
        }
    }
}

impl ScannerConfig {
    /// Load scanner configuration using environment variables.
    /// Evaluation order:
    /// 1) `$DIRSCAN_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$DIRSCAN_CONFIG_JSON` (inline JSON),
    /// 3) the first default file found in the working directory,
    /// 4) defaults if none of the above is present.
    ///
    /// `DIRSCAN_WORKERS`, `DIRSCAN_BUFFER`, `DIRSCAN_RECURSIVE`,
    /// `DIRSCAN_EXTENSIONS` and `DIRSCAN_ROOTS` then override single fields.
    pub fn load_from_env() -> anyhow::Result<(Self, ScannerConfigSource)> {
        let cwd = env::current_dir().context("failed to resolve working directory")?;
        Self::load_with(|key| env::var(key).ok(), &cwd)
    }

    /// Same as [`load_from_env`](Self::load_from_env) with an explicit
    /// variable lookup and base directory for default files.
    pub fn load_with<F>(lookup: F, base_dir: &Path) -> anyhow::Result<(Self, ScannerConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let (mut config, source) = if let Some(path_str) = var(CONFIG_PATH_VAR) {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            (config, ScannerConfigSource::EnvPath(path))
        } else if let Some(raw) = var(CONFIG_JSON_VAR) {
            let parsed = Self::parse_json(&raw).context("failed to parse DIRSCAN_CONFIG_JSON")?;
            (parsed, ScannerConfigSource::EnvInline)
        } else if let Some(path) = Self::find_default_file(base_dir) {
            let config = Self::load_from_file(&path)?;
            (config, ScannerConfigSource::File(path))
        } else {
            (Self::default(), ScannerConfigSource::Default)
        };

        config.apply_overrides(var)?;
        debug!(target: "config::scanner", source = ?source, "scanner configuration resolved");
        Ok((config, source))
    }

    fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = var(WORKERS_VAR) {
            let workers = raw.trim().parse().map_err(|_| ConfigLoadError::InvalidEnvValue {
                key: WORKERS_VAR,
                value: raw.clone(),
            })?;
            self.workers = Some(workers);
        }
        if let Some(raw) = var(BUFFER_VAR) {
            self.buffer = raw.trim().parse().map_err(|_| ConfigLoadError::InvalidEnvValue {
                key: BUFFER_VAR,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = var(RECURSIVE_VAR) {
            self.recursive = parse_bool(&raw).ok_or(ConfigLoadError::InvalidEnvValue {
                key: RECURSIVE_VAR,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = var(EXTENSIONS_VAR) {
            self.extensions = parse_csv(&raw);
        }
        if let Some(raw) = var(ROOTS_VAR) {
            self.roots = parse_csv(&raw).into_iter().map(PathBuf::from).collect();
        }
        Ok(())
    }

    /// Read a config file. `.json` and `.toml` pick the parser; anything else
    /// tries both.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents)
                .with_context(|| format!("invalid scanner config {}", path.display())),
            Some("toml") | Some("tml") => toml::from_str(&contents)
                .map_err(|err| anyhow!("invalid scanner config {}: {}", path.display(), err)),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    /// Parse TOML, falling back to JSON. `origin` only labels errors.
    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse scanner config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    /// Parse inline JSON.
    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid scanner config json: {err}"))
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to render scanner config as toml")
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "dirscan.toml",
            "dirscan.json",
            "config/dirscan.toml",
            "config/dirscan.json",
        ];

        CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }

    /// Reject values the scanner would refuse at build time, with messages
    /// that point at the config field.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.workers == Some(0) {
            return Err(ConfigLoadError::InvalidWorkers);
        }
        if self.buffer == 0 {
            return Err(ConfigLoadError::InvalidBuffer);
        }
        if let Some(pattern) = &self.pattern {
            NamePattern::new(pattern).map_err(|source| ConfigLoadError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Builder preloaded with these settings.
    pub fn to_builder(&self) -> ScanBuilder {
        let mut builder = ScanBuilder::new()
            .mode(self.mode.into())
            .roots(self.roots.iter().cloned())
            .buffer(self.buffer);

        builder = if self.recursive {
            builder.recursive()
        } else {
            builder.flat()
        };
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }
        if !self.extensions.is_empty() {
            builder = builder.extensions(&self.extensions);
        }
        if let Some(pattern) = &self.pattern {
            builder = builder.pattern(pattern.clone());
        }
        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }
        builder
    }
}

//! Server configuration loaded from a TOML file.
//!
//! ```toml
//! [tools]
//! samtools = "/usr/local/bin/samtools"
//! primer3 = "/usr/local/bin/primer3_core"
//! pypy = "/usr/local/bin/pypy"
//!
//! [limits]
//! sites = 30
//! primers = 30
//! databases = 3
//! ```
//!
//! Every other section is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE_NAME: &str = "primerserver.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tools: ToolsConfig,
    pub limits: LimitsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// External programs invoked by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub samtools: PathBuf,
    pub primer3: PathBuf,
    pub pypy: PathBuf,
    /// Interpreter for the pipeline scripts.
    #[serde(default = "default_perl")]
    pub perl: PathBuf,
    /// Wall clock limit for a single tool invocation.
    pub timeout_secs: Option<u64>,
}

/// Per-request input limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum unique template regions in design mode.
    pub sites: usize,
    /// Maximum unique primer groups in check mode.
    pub primers: usize,
    /// Maximum databases selected for the specificity check.
    pub databases: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding run_primer3.pl, run_specificity_check.pl and run_final_selection.pl.
    #[serde(default = "default_scripts_dir")]
    pub scripts: PathBuf,
    /// Template and specificity databases.
    #[serde(default = "default_databases_dir")]
    pub databases: PathBuf,
    /// Root for per-job workspaces.
    #[serde(default = "default_work_dir")]
    pub work: PathBuf,
    /// Workspaces older than this are removed by a periodic sweep. Kept forever when absent.
    pub workspace_retention_hours: Option<u64>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts: default_scripts_dir(),
            databases: default_databases_dir(),
            work: default_work_dir(),
            workspace_retention_hours: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Job submissions allowed per client IP per minute. Unlimited when absent.
    pub rate_limit_per_minute: Option<u32>,
    /// Allowed CORS origins. Permissive when absent.
    pub cors_origins: Option<Vec<String>>,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Largest accepted job submission. Custom templates are sent inline.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rate_limit_per_minute: None,
            cors_origins: None,
            max_concurrent_jobs: default_max_concurrent_jobs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_perl() -> PathBuf {
    PathBuf::from("perl")
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("script")
}

fn default_databases_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

impl Config {
    /// Read, parse and validate the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tools = [
            ("tools.samtools", &self.tools.samtools),
            ("tools.primer3", &self.tools.primer3),
            ("tools.pypy", &self.tools.pypy),
            ("tools.perl", &self.tools.perl),
        ];
        for (key, path) in tools {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }

        if self.server.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid(
                "server.max_concurrent_jobs must be at least 1".to_string(),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be positive".to_string(),
            ));
        }

        if self.paths.workspace_retention_hours == Some(0) {
            return Err(ConfigError::Invalid(
                "paths.workspace_retention_hours must be positive".to_string(),
            ));
        }

        if self.tools.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "tools.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Configured paths that do not exist on this machine.
    ///
    /// Bare program names (such as `perl`) are resolved against `PATH`.
    pub fn missing_tools(&self) -> Vec<(&'static str, PathBuf)> {
        let entries = [
            ("tools.samtools", &self.tools.samtools),
            ("tools.primer3", &self.tools.primer3),
            ("tools.pypy", &self.tools.pypy),
            ("tools.perl", &self.tools.perl),
            ("paths.scripts", &self.paths.scripts),
            ("paths.databases", &self.paths.databases),
        ];

        entries
            .into_iter()
            .filter(|(_, path)| !program_exists(path))
            .map(|(key, path)| (key, path.clone()))
            .collect()
    }
}

fn program_exists(path: &Path) -> bool {
    if path.components().count() > 1 || path.is_absolute() {
        return path.exists();
    }
    if path.exists() {
        return true;
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(path).is_file()))
        .unwrap_or(false)
}

/// `./primerserver.toml` if present, otherwise the platform config directory.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    directories::ProjectDirs::from("", "", "primerserver")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .unwrap_or(local)
}

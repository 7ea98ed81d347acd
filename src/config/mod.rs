pub mod settings;

pub use settings::{Config, DebugLogRotation, OutputFormat, TEMPLATE};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "TAVILY_API_KEY";

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("tvly");

    Ok(config_dir.join("config.toml"))
}

/// Load configuration from `path` (or the default location).
///
/// A missing file is not an error; the defaults are used instead.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Write the commented config template to `path` (or the default location),
/// creating parent directories.
pub fn write_template(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(&path, TEMPLATE)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(path)
}

/// Where the API key was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Flag,
    Environment,
    DotEnv(PathBuf),
    ConfigFile,
}

/// Resolve the API key for this process.
///
/// Order: `--api-key`, `TAVILY_API_KEY`, `.env` in the current directory or its
/// parent, then the config file.
pub fn resolve_api_key(flag: Option<&str>, config: &Config) -> Result<(String, KeySource)> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    resolve_api_key_from(flag, std::env::var(API_KEY_ENV).ok().as_deref(), &cwd, config)
}

/// [`resolve_api_key`] with every source passed in explicitly.
pub fn resolve_api_key_from(
    flag: Option<&str>,
    env_value: Option<&str>,
    dir: &Path,
    config: &Config,
) -> Result<(String, KeySource)> {
    if let Some(key) = non_empty(flag) {
        return Ok((key, KeySource::Flag));
    }

    if let Some(key) = non_empty(env_value) {
        return Ok((key, KeySource::Environment));
    }

    for candidate in dotenv_candidates(dir) {
        if let Some(key) = read_dotenv_key(&candidate) {
            return Ok((key, KeySource::DotEnv(candidate)));
        }
    }

    if let Some(key) = non_empty(config.api_key.as_deref()) {
        return Ok((key, KeySource::ConfigFile));
    }

    anyhow::bail!(
        "API key is required. Set {API_KEY_ENV} in a .env file, as an environment variable, \
         in the config file, or provide it via --api-key.\n\
         Create a .env file with: {API_KEY_ENV}=your_key_here"
    )
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `.env` in `dir`, then in its parent.
fn dotenv_candidates(dir: &Path) -> Vec<PathBuf> {
    let mut out = vec![dir.join(".env")];
    if let Some(parent) = dir.parent() {
        out.push(parent.join(".env"));
    }
    out.into_iter().filter(|p| p.is_file()).collect()
}

/// Read `TAVILY_API_KEY` from a dotenv file without touching the process environment.
fn read_dotenv_key(path: &Path) -> Option<String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            tracing::debug!(error = %e, file = %path.display(), "failed to open .env file");
            return None;
        }
    };

    for item in iter {
        match item {
            Ok((key, value)) if key == API_KEY_ENV => return non_empty(Some(&value)),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, file = %path.display(), "skipping unparsable .env line");
            }
        }
    }
    None
}

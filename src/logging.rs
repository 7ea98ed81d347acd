use crate::config::{Config, DebugLogRotation};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "tvly-debug.log";
const DEBUG_DIRECTIVE: &str = "tvly=debug,warn";
/// One file per day suits short-lived invocations.
const DEFAULT_ROTATION: DebugLogRotation = DebugLogRotation::Daily;

#[allow(dead_code)]
pub struct LogGuard(WorkerGuard);

/// Initialize logging.
///
/// Each sink filters on its own. Stderr carries warnings only, or `tvly=debug`
/// with `verbose`, so stdout stays pipeable. `debug = true` in the config
/// writes `tvly=debug` logs to `~/.config/tvly/tvly-debug.log` (rotation per
/// `debug_log_rotation`) without touching stderr. `RUST_LOG` overrides both.
pub fn init(config: &Config, verbose: bool) -> Result<Option<LogGuard>> {
    let file = if config.debug {
        Some(open_debug_writer(config)?)
    } else {
        None
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter_for(if verbose { DEBUG_DIRECTIVE } else { "warn" }));

    let (file_layer, guard, log_path) = match file {
        Some((writer, path, guard)) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(filter_for(DEBUG_DIRECTIVE));
            (Some(layer), Some(LogGuard(guard)), Some(path))
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok(); // If already initialized (e.g., in tests), don't crash.

    if let Some(path) = log_path {
        tracing::info!(
            log_file = %path.display(),
            rotation = ?config.debug_log_rotation.unwrap_or(DEFAULT_ROTATION),
            "debug logging enabled"
        );
    }

    Ok(guard)
}

/// `RUST_LOG` if set and valid, else `default_directive`.
fn filter_for(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn open_debug_writer(config: &Config) -> Result<(NonBlocking, PathBuf, WorkerGuard)> {
    let rotation = config.debug_log_rotation.unwrap_or(DEFAULT_ROTATION);
    let keep = config.debug_log_keep;
    let base = resolve_base_log_path(config.debug_log_path.as_deref())?;

    match rotation {
        DebugLogRotation::None => {
            ensure_parent_dir(&base)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&base)
                .with_context(|| format!("Failed to open log file: {}", base.display()))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            Ok((non_blocking, base, guard))
        }
        DebugLogRotation::Daily => {
            let (dir, base_name) = split_dir_and_name(&base)?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            // Clean up before opening new writer to keep directory tidy.
            cleanup_rotated_logs(&dir, RotationKind::Daily { base_name: base_name.clone() }, keep)?;

            let appender = tracing_appender::rolling::daily(&dir, &base_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            Ok((non_blocking, base, guard))
        }
        DebugLogRotation::Session => {
            let (dir, base_name) = split_dir_and_name(&base)?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            cleanup_rotated_logs(
                &dir,
                RotationKind::Session {
                    base_name: base_name.clone(),
                },
                keep,
            )?;

            let session_path = build_session_log_path(&dir, &base_name);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&session_path)
                .with_context(|| format!("Failed to open log file: {}", session_path.display()))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            Ok((non_blocking, session_path, guard))
        }
    }
}

fn default_log_path() -> Result<PathBuf> {
    let config_path = crate::config::config_path()?;
    Ok(config_path.with_file_name(LOG_FILE_NAME))
}

fn resolve_base_log_path(config_value: Option<&str>) -> Result<PathBuf> {
    let Some(raw) = config_value else {
        return default_log_path();
    };

    let expanded = expand_tilde(raw);
    let path = PathBuf::from(expanded);

    // If it ends with a path separator, treat as directory.
    if raw.ends_with(std::path::MAIN_SEPARATOR) {
        return Ok(path.join(LOG_FILE_NAME));
    }

    // If it exists and is a directory, treat as directory.
    if path.is_dir() {
        return Ok(path.join(LOG_FILE_NAME));
    }

    // If it has an extension, treat as file path. Otherwise also treat as file path.
    Ok(path)
}

fn expand_tilde(raw: &str) -> String {
    if raw == "~" || raw.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let suffix = raw.strip_prefix('~').unwrap_or("");
            return format!("{}{}", home.display(), suffix);
        }
    }
    raw.to_string()
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    Ok(())
}

fn split_dir_and_name(path: &Path) -> Result<(PathBuf, String)> {
    let dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .context("Invalid debug_log_path: not valid UTF-8")?
        .to_string();
    Ok((dir, name))
}

fn build_session_log_path(dir: &Path, base_name: &str) -> PathBuf {
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let file_name = format!("{base_name}.session-{ts}");
    dir.join(file_name)
}

enum RotationKind {
    Daily { base_name: String },
    Session { base_name: String },
}

fn cleanup_rotated_logs(dir: &Path, kind: RotationKind, keep: Option<usize>) -> Result<()> {
    let keep = keep.unwrap_or(match kind {
        RotationKind::Daily { .. } => 7,
        RotationKind::Session { .. } => 20,
    });

    if keep == 0 {
        return Ok(());
    }

    let prefix = match &kind {
        // tracing_appender::rolling::daily uses: `{base_name}.{YYYY-MM-DD}`
        RotationKind::Daily { base_name } => format!("{base_name}."),
        RotationKind::Session { base_name } => format!("{base_name}.session-"),
    };

    let mut candidates: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory: {}", dir.display()))?
    {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else { continue };
        if name.starts_with(&prefix) {
            candidates.push(name.to_string());
        }
    }

    candidates.sort();
    candidates.reverse(); // newest first (lexicographic works for our suffix formats)

    for (idx, name) in candidates.iter().enumerate() {
        if idx < keep {
            continue;
        }
        let path = dir.join(name);
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::debug!(error = %e, file = %path.display(), "failed to remove old log file");
        }
    }

    Ok(())
}

/// Best-effort redaction for Tavily API keys (`tvly-...`).
pub fn redact_secrets(input: &str) -> String {
    const PREFIX: &str = "tvly-";
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;
    let mut i = 0usize;

    while i < input.len() {
        if input[i..].starts_with(PREFIX) {
            let mut j = i + PREFIX.len();
            while j < input.len() {
                match bytes[j] {
                    b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => j += 1,
                    _ => break,
                }
            }

            // Require a minimum length to reduce false positives.
            if j.saturating_sub(i + PREFIX.len()) >= 8 {
                out.push_str(&input[last..i]);
                out.push_str("tvly-***REDACTED***");
                last = j;
                i = j;
                continue;
            }
        }

        match input[i..].chars().next() {
            Some(ch) => i += ch.len_utf8(),
            None => break,
        }
    }

    out.push_str(&input[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_redacts_tavily_keys() {
        let input = "invalid key tvly-dev-AbCdEf123456 supplied";
        assert_eq!(redact_secrets(input), "invalid key tvly-***REDACTED*** supplied");
    }

    #[test]
    fn test_leaves_short_matches_and_unicode_alone() {
        assert_eq!(redact_secrets("tvly-abc rocks"), "tvly-abc rocks");
        assert_eq!(redact_secrets("héllo wörld"), "héllo wörld");
    }

    #[test]
    fn test_base_log_path_treats_directories_as_dirs() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().to_str().unwrap();
        assert_eq!(
            resolve_base_log_path(Some(raw)).unwrap(),
            dir.path().join(LOG_FILE_NAME)
        );

        let file = dir.path().join("custom.log");
        assert_eq!(resolve_base_log_path(file.to_str()).unwrap(), file);
    }

    #[test]
    fn test_cleanup_keeps_newest_sessions() {
        let dir = TempDir::new().unwrap();
        for ts in ["20260101-000000", "20260102-000000", "20260103-000000"] {
            std::fs::write(dir.path().join(format!("tvly.log.session-{ts}")), "").unwrap();
        }
        std::fs::write(dir.path().join("unrelated.txt"), "").unwrap();

        cleanup_rotated_logs(
            dir.path(),
            RotationKind::Session {
                base_name: "tvly.log".into(),
            },
            Some(2),
        )
        .unwrap();

        assert!(!dir.path().join("tvly.log.session-20260101-000000").exists());
        assert!(dir.path().join("tvly.log.session-20260102-000000").exists());
        assert!(dir.path().join("tvly.log.session-20260103-000000").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }
}

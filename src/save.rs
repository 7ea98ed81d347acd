//! Saving extracted pages to markdown files.

use crate::api::ExtractResult;
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Url;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const MAX_PATH_CHARS: usize = 50;
const MAX_NAME_CHARS: usize = 100;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("static regex"))
}

/// Build a file name for `url`: `<host>_<path>_<timestamp>.md`.
///
/// The host loses a leading `www.` and keeps an explicit port (`host_8080`),
/// the path is flattened with `_` and cut to 50 characters, anything outside
/// `[A-Za-z0-9_.-]` becomes `_`, and the name before the timestamp is capped
/// at 100 characters.
pub fn sanitize_filename(url: &str, timestamp: i64) -> String {
    let (host, path) = match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            let host = match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            (host, parsed.path().to_string())
        }
        // not a URL: fall back to the raw text as the "path"
        Err(_) => (String::new(), url.to_string()),
    };

    let path = path.trim_matches('/');

    let base = if path.is_empty() {
        host
    } else {
        let flattened: String = path.replace('/', "_").chars().take(MAX_PATH_CHARS).collect();
        if host.is_empty() {
            flattened
        } else {
            format!("{host}_{flattened}")
        }
    };

    let cleaned = unsafe_chars().replace_all(&base, "_");
    let truncated: String = cleaned.chars().take(MAX_NAME_CHARS).collect();
    let name = if truncated.is_empty() { "page".to_string() } else { truncated };

    format!("{name}_{timestamp}.md")
}

/// URL → saved file path, in response order
pub type SavedFiles = Vec<(String, PathBuf)>;

/// Write every result with content to `output_dir`.
///
/// The directory is resolved to an absolute path, so the returned paths and
/// the file headers stay valid from any working directory. Results without a
/// URL or content are skipped; a file that cannot be written is reported and
/// skipped.
pub fn save_results(results: &[ExtractResult], output_dir: &Path) -> Result<SavedFiles> {
    fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;
    let output_dir = fs::canonicalize(output_dir).with_context(|| {
        format!("Failed to resolve output directory: {}", output_dir.display())
    })?;
    let output_dir = output_dir.as_path();

    let now = chrono::Local::now();
    let mut saved = Vec::new();

    for result in results {
        if result.url.is_empty() || result.raw_content.is_empty() {
            tracing::debug!(url = %result.url, "skipping result without content");
            continue;
        }

        let filepath = unique_path(output_dir, &sanitize_filename(&result.url, now.timestamp()), &saved);
        let document = format!(
            "# Extracted from: {}\n# Extraction time: {}\n# File saved to: {}\n\n---\n\n{}",
            result.url,
            now.format("%Y-%m-%d %H:%M:%S"),
            filepath.display(),
            result.raw_content
        );

        match fs::write(&filepath, document) {
            Ok(()) => {
                tracing::debug!(url = %result.url, file = %filepath.display(), "saved extraction");
                saved.push((result.url.clone(), filepath));
            }
            Err(e) => {
                eprintln!("Warning: Failed to save {}: {}", result.url, e);
            }
        }
    }

    Ok(saved)
}

/// Same-second extractions of similar URLs would collide; number the duplicates.
fn unique_path(dir: &Path, file_name: &str, taken: &SavedFiles) -> PathBuf {
    let candidate = dir.join(file_name);
    if !taken.iter().any(|(_, p)| *p == candidate) {
        return candidate;
    }
    let stem = file_name.trim_end_matches(".md");
    (2..)
        .map(|n| dir.join(format!("{stem}-{n}.md")))
        .find(|p| !taken.iter().any(|(_, t)| t == p))
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn result(url: &str, content: &str) -> ExtractResult {
        ExtractResult {
            url: url.to_string(),
            raw_content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_domain_only() {
        assert_eq!(
            sanitize_filename("https://www.example.com/", 1700000000),
            "example.com_1700000000.md"
        );
    }

    #[test]
    fn test_path_flattened_and_cleaned() {
        assert_eq!(
            sanitize_filename("https://docs.rs/tokio/latest/tokio/index.html?x=1", 1),
            "docs.rs_tokio_latest_tokio_index.html_1.md"
        );
        assert_eq!(
            sanitize_filename("https://example.com/a b/c%20d", 2),
            "example.com_a_20b_c_20d_2.md"
        );
    }

    #[test]
    fn test_only_leading_www_is_stripped_and_port_kept() {
        assert_eq!(
            sanitize_filename("https://www.docs.www.example.com/a", 5),
            "docs.www.example.com_a_5.md"
        );
        assert_eq!(
            sanitize_filename("http://localhost:8080/status", 6),
            "localhost_8080_status_6.md"
        );
    }

    #[test]
    fn test_long_path_truncated() {
        let long = format!("https://example.com/{}", "x".repeat(200));
        let name = sanitize_filename(&long, 3);
        assert_eq!(name, format!("example.com_{}_3.md", "x".repeat(50)));
    }

    #[test]
    fn test_total_length_capped() {
        let host = format!("{a}.{a}.com", a = "h".repeat(50));
        let name = sanitize_filename(&format!("https://{host}/"), 4);
        assert_eq!(name, format!("{}.{}_4.md", "h".repeat(50), "h".repeat(49)));
    }

    #[test]
    fn test_save_writes_header_and_skips_empty() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let results = vec![
            result("https://example.com/page", "# Hello\n\nbody"),
            result("https://example.com/empty", ""),
            result("", "orphan content"),
        ];

        let saved = save_results(&results, &out).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "https://example.com/page");
        assert!(saved[0].1.is_absolute());

        let written = std::fs::read_to_string(&saved[0].1).unwrap();
        assert!(written.starts_with("# Extracted from: https://example.com/page\n# Extraction time: "));
        assert!(written.contains(&format!("# File saved to: {}\n", saved[0].1.display())));
        assert!(written.ends_with("\n---\n\n# Hello\n\nbody"));
    }

    #[test]
    fn test_duplicate_names_are_numbered() {
        let dir = TempDir::new().unwrap();
        let results = vec![
            result("https://example.com/a?page=1", "one"),
            result("https://example.com/a?page=2", "two"),
        ];

        let saved = save_results(&results, dir.path()).unwrap();
        assert_eq!(saved.len(), 2);
        assert_ne!(saved[0].1, saved[1].1);
        assert!(saved[1].1.to_string_lossy().ends_with("-2.md"));
    }
}

//! Rendering API responses for stdout.

use crate::api::{
    ApiResponse, CrawlResponse, ExtractResponse, SearchResponse, Usage, UsageResponse,
};
use crate::config::OutputFormat;
use crate::save::SavedFiles;
use serde::Serialize;

const CONTENT_PREVIEW_CHARS: usize = 200;
const IMAGE_PREVIEW_COUNT: usize = 3;

/// Pretty JSON; non-ASCII text and key order are kept as-is.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

pub fn render_search(
    response: &ApiResponse<SearchResponse>,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(&response.body),
        OutputFormat::Text => Ok(search_text(&response.data)),
    }
}

pub fn render_extract(
    response: &ApiResponse<ExtractResponse>,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(&response.body),
        OutputFormat::Text => Ok(extract_text(&response.data)),
    }
}

pub fn render_crawl(
    response: &ApiResponse<CrawlResponse>,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(&response.body),
        OutputFormat::Text => Ok(crawl_text(&response.data)),
    }
}

pub fn render_usage(
    response: &ApiResponse<UsageResponse>,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(&response.body),
        OutputFormat::Text => Ok(usage_text(&response.data)),
    }
}

/// URL → file mapping printed after `extract --output-dir`
pub fn render_saved(files: &SavedFiles, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = files
                .iter()
                .map(|(url, path)| (url.clone(), serde_json::Value::from(path.display().to_string())))
                .collect();
            to_json(&map)
        }
        OutputFormat::Text => {
            let mut lines = vec!["URL to file mapping:".to_string()];
            lines.extend(
                files
                    .iter()
                    .map(|(url, path)| format!("{} -> {}", url, path.display())),
            );
            Ok(lines.join("\n"))
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn push_footer(lines: &mut Vec<String>, response_time: Option<f64>, usage: Option<&Usage>) {
    if let Some(secs) = response_time {
        lines.push(format!("\nResponse time: {secs}s"));
    }
    if let Some(usage) = usage {
        lines.push(format!("Credits used: {}", usage.credits));
    }
}

fn search_text(response: &SearchResponse) -> String {
    let mut lines = Vec::new();
    let query = if response.query.is_empty() { "N/A" } else { response.query.as_str() };
    lines.push(format!("Query: {query}"));

    if let Some(answer) = response.answer.as_deref().filter(|a| !a.is_empty()) {
        lines.push(format!("\nAnswer: {answer}"));
    }

    if !response.results.is_empty() {
        lines.push(format!("\nResults ({}):", response.results.len()));
        for (idx, item) in response.results.iter().enumerate() {
            let title = if item.title.is_empty() { "No title" } else { item.title.as_str() };
            let content = if item.content.is_empty() { "No content" } else { item.content.as_str() };
            lines.push(format!("\n{}. {}", idx + 1, title));
            lines.push(format!("   URL: {}", item.url));
            lines.push(format!("   Content: {}...", preview(content, CONTENT_PREVIEW_CHARS)));
            if item.score != 0.0 {
                lines.push(format!("   Score: {:.3}", item.score));
            }
            if let Some(date) = &item.published_date {
                lines.push(format!("   Published: {date}"));
            }
        }
    }

    if !response.images.is_empty() {
        lines.push(format!("\nImages ({}):", response.images.len()));
        for image in response.images.iter().take(IMAGE_PREVIEW_COUNT) {
            lines.push(format!("  - {}", image.url()));
        }
    }

    push_footer(&mut lines, response.response_time, response.usage.as_ref());
    lines.join("\n")
}

fn extract_text(response: &ExtractResponse) -> String {
    let mut lines = vec![format!("Extracted ({}):", response.results.len())];

    for (idx, item) in response.results.iter().enumerate() {
        lines.push(format!("\n{}. {}", idx + 1, item.url));
        lines.push(format!("   Length: {} chars", item.raw_content.chars().count()));
        lines.push(format!(
            "   Content: {}...",
            preview(&item.raw_content, CONTENT_PREVIEW_CHARS)
        ));
        if !item.images.is_empty() {
            lines.push(format!("   Images: {}", item.images.len()));
        }
    }

    if !response.failed_results.is_empty() {
        lines.push(format!("\nFailed ({}):", response.failed_results.len()));
        for failed in &response.failed_results {
            lines.push(format!("  - {}: {}", failed.url, failed.error));
        }
    }

    push_footer(&mut lines, response.response_time, response.usage.as_ref());
    lines.join("\n")
}

fn crawl_text(response: &CrawlResponse) -> String {
    let mut lines = vec![
        format!("Base URL: {}", response.base_url),
        format!("\nPages ({}):", response.results.len()),
    ];

    for (idx, item) in response.results.iter().enumerate() {
        lines.push(format!("\n{}. {}", idx + 1, item.url));
        lines.push(format!(
            "   Content: {}...",
            preview(&item.raw_content, CONTENT_PREVIEW_CHARS)
        ));
    }

    push_footer(&mut lines, response.response_time, response.usage.as_ref());
    lines.join("\n")
}

fn usage_text(response: &UsageResponse) -> String {
    fn counter(label: &str, used: f64, limit: Option<f64>) -> String {
        match limit {
            Some(limit) => format!("  {label}: {used} / {limit}"),
            None => format!("  {label}: {used}"),
        }
    }

    let key = &response.key;
    let account = &response.account;
    let mut lines = vec!["API key:".to_string(), counter("Usage", key.usage, key.limit)];

    for (label, value) in [
        ("Search", key.search_usage),
        ("Extract", key.extract_usage),
        ("Crawl", key.crawl_usage),
        ("Map", key.map_usage),
        ("Research", key.research_usage),
    ] {
        if let Some(value) = value {
            lines.push(format!("  {label}: {value}"));
        }
    }

    lines.push("\nAccount:".to_string());
    let plan = if account.current_plan.is_empty() { "N/A" } else { account.current_plan.as_str() };
    lines.push(format!("  Plan: {plan}"));
    lines.push(counter("Plan usage", account.plan_usage, account.plan_limit));
    if let Some(paygo) = account.paygo_usage {
        lines.push(counter("Pay-as-you-go", paygo, account.paygo_limit));
    }

    lines.join("\n")
}

//! Command-line surface: flags map one-to-one onto API request fields.

use crate::api::{
    ApiError, ContentFormat, CrawlRequest, ExtractDepth, ExtractRequest, ExtractResponse,
    IncludeAnswer, IncludeRawContent, SearchDepth, SearchRequest, TavilyApi, TavilyClient,
    TimeRange, Topic, DEFAULT_API_BASE,
};
use crate::config::{self, OutputFormat};
use crate::{logging, output, save};
use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Most URLs a single extract call accepts
pub const MAX_EXTRACT_URLS: usize = 20;

#[derive(Debug, Parser)]
#[command(name = "tvly")]
#[command(version, about = "Search, extract and crawl the web with the Tavily API")]
#[command(after_help = "Examples:
  tvly search \"latest AI developments\"
  tvly search \"climate change\" --search-depth advanced --max-results 10
  tvly search \"who won the match\" --include-answer --format json
  tvly extract --urls https://example.com --output-dir ./extracted
  tvly crawl https://docs.tavily.com --max-depth 2 --limit 20
  tvly usage")]
pub struct Cli {
    /// Tavily API key (default: TAVILY_API_KEY from environment, .env file or config)
    #[arg(short = 'k', long, global = true)]
    pub api_key: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = "TAVILY_API_BASE")]
    pub api_base: Option<String>,

    /// Output format (default: text, or `default_format` from the config file)
    #[arg(short = 'f', long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// HTTP timeout in seconds (default depends on the endpoint)
    #[arg(long, global = true, value_name = "SECS")]
    pub http_timeout: Option<u64>,

    /// Config file (default: ~/.config/tvly/config.toml)
    #[arg(long, global = true, env = "TVLY_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log request details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search the web
    Search(SearchArgs),
    /// Extract page content from one or more URLs
    Extract(ExtractArgs),
    /// Crawl a site from a root URL
    Crawl(CrawlArgs),
    /// Show credit usage for the API key
    Usage,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config template
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location
    Path,
    /// Print the effective config (API key redacted)
    Show,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search query string
    pub query: String,

    /// Maximum number of results (0-20)
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(0..=20))]
    pub max_results: u8,

    /// Search depth
    #[arg(short = 'd', long, value_enum, default_value = "basic")]
    pub search_depth: SearchDepth,

    /// Search topic
    #[arg(short, long, value_enum, default_value = "general")]
    pub topic: Topic,

    /// Include an LLM-generated answer (basic, advanced, true or false; bare flag means basic)
    #[arg(short = 'a', long, num_args = 0..=1, default_missing_value = "basic", value_name = "MODE")]
    pub include_answer: Option<IncludeAnswer>,

    /// Only results published within this window
    #[arg(long, value_enum)]
    pub time_range: Option<TimeRange>,

    /// Only results published after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<String>,

    /// Only results published before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<String>,

    /// Content chunks per source for advanced search (1-3)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub chunks_per_source: Option<u8>,

    /// Include cleaned page content (markdown, text, true or false; bare flag means true)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "MODE")]
    pub include_raw_content: Option<IncludeRawContent>,

    /// Include query-related images
    #[arg(long)]
    pub include_images: bool,

    /// Add descriptions to returned images
    #[arg(long)]
    pub include_image_descriptions: bool,

    /// Include favicon URLs
    #[arg(long)]
    pub include_favicon: bool,

    /// Only search these domains (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub include_domains: Vec<String>,

    /// Never return these domains (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_domains: Vec<String>,

    /// Boost results from a country (full English name, e.g. "united states")
    #[arg(long)]
    pub country: Option<String>,

    /// Let the service pick search parameters from the query
    #[arg(long)]
    pub auto_parameters: bool,

    /// Report credits used
    #[arg(long)]
    pub include_usage: bool,
}

impl SearchArgs {
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            auto_parameters: self.auto_parameters.then_some(true),
            topic: Some(self.topic),
            search_depth: Some(self.search_depth),
            chunks_per_source: self.chunks_per_source,
            max_results: Some(self.max_results),
            time_range: self.time_range,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            include_answer: self.include_answer,
            include_raw_content: self.include_raw_content,
            include_images: self.include_images.then_some(true),
            include_image_descriptions: self.include_image_descriptions.then_some(true),
            include_favicon: self.include_favicon.then_some(true),
            include_domains: self.include_domains.clone(),
            exclude_domains: self.exclude_domains.clone(),
            country: self.country.clone(),
            include_usage: self.include_usage.then_some(true),
        }
    }
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["urls", "urls_file"])))]
pub struct ExtractArgs {
    /// URLs to extract (space separated, max 20)
    #[arg(long, num_args = 1..)]
    pub urls: Vec<String>,

    /// File with one URL per line (blank lines and # comments ignored)
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// Save each page as a markdown file in this directory and print the URL-to-file mapping
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Extraction depth
    #[arg(short = 'd', long, value_enum, default_value = "basic")]
    pub extract_depth: ExtractDepth,

    /// Rank extracted chunks against this query
    #[arg(short, long)]
    pub query: Option<String>,

    /// Chunks per source when a query is given (1-5)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub chunks_per_source: Option<u8>,

    /// Include images found on the pages
    #[arg(long)]
    pub include_images: bool,

    /// Include favicon URLs
    #[arg(long)]
    pub include_favicon: bool,

    /// Content format (forced to markdown with --output-dir)
    #[arg(long = "content-format", value_enum)]
    pub content_format: Option<ContentFormat>,

    /// Server-side timeout in seconds (1-60)
    #[arg(long, value_parser = parse_extract_timeout, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Report credits used
    #[arg(long)]
    pub include_usage: bool,
}

impl ExtractArgs {
    /// URLs from `--urls` or `--urls-file`, checked against the per-call limit.
    pub fn collect_urls(&self) -> anyhow::Result<Vec<String>> {
        let urls = match &self.urls_file {
            Some(path) => read_urls_file(path)?,
            None => self.urls.clone(),
        };

        if urls.is_empty() {
            anyhow::bail!("No valid URLs found");
        }
        if urls.len() > MAX_EXTRACT_URLS {
            anyhow::bail!("Maximum {MAX_EXTRACT_URLS} URLs allowed, got {}", urls.len());
        }
        Ok(urls)
    }

    pub fn to_request(&self, urls: Vec<String>) -> ExtractRequest {
        let format = if self.output_dir.is_some() {
            Some(ContentFormat::Markdown)
        } else {
            self.content_format
        };

        ExtractRequest {
            urls,
            query: self.query.clone(),
            chunks_per_source: self.chunks_per_source,
            extract_depth: Some(self.extract_depth),
            include_images: self.include_images.then_some(true),
            include_favicon: self.include_favicon.then_some(true),
            format,
            timeout: self.timeout,
            include_usage: self.include_usage.then_some(true),
        }
    }
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Root URL to start crawling from
    pub url: String,

    /// Natural-language instructions for the crawler
    #[arg(short, long)]
    pub instructions: Option<String>,

    /// How far from the root URL to go (1-5)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub max_depth: Option<u8>,

    /// Links followed per page (1-500)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=500))]
    pub max_breadth: Option<u16>,

    /// Total pages processed before stopping
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,

    /// Only follow paths matching these regexes (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub select_paths: Vec<String>,

    /// Only follow domains matching these regexes
    #[arg(long, value_delimiter = ',')]
    pub select_domains: Vec<String>,

    /// Skip paths matching these regexes
    #[arg(long, value_delimiter = ',')]
    pub exclude_paths: Vec<String>,

    /// Skip domains matching these regexes
    #[arg(long, value_delimiter = ',')]
    pub exclude_domains: Vec<String>,

    /// Follow links to external domains
    #[arg(long, value_name = "BOOL")]
    pub allow_external: Option<bool>,

    /// Include images found on the pages
    #[arg(long)]
    pub include_images: bool,

    /// Extraction depth
    #[arg(short = 'd', long, value_enum)]
    pub extract_depth: Option<ExtractDepth>,

    /// Content format
    #[arg(long = "content-format", value_enum)]
    pub content_format: Option<ContentFormat>,

    /// Include favicon URLs
    #[arg(long)]
    pub include_favicon: bool,

    /// Chunks per page when instructions are given (1-5)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub chunks_per_source: Option<u8>,

    /// Server-side timeout in seconds (10-150)
    #[arg(long, value_parser = parse_crawl_timeout, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Report credits used
    #[arg(long)]
    pub include_usage: bool,
}

impl CrawlArgs {
    pub fn to_request(&self) -> CrawlRequest {
        CrawlRequest {
            url: self.url.clone(),
            instructions: self.instructions.clone(),
            chunks_per_source: self.chunks_per_source,
            max_depth: self.max_depth,
            max_breadth: self.max_breadth,
            limit: self.limit,
            select_paths: self.select_paths.clone(),
            select_domains: self.select_domains.clone(),
            exclude_paths: self.exclude_paths.clone(),
            exclude_domains: self.exclude_domains.clone(),
            allow_external: self.allow_external,
            include_images: self.include_images.then_some(true),
            extract_depth: self.extract_depth,
            format: self.content_format,
            include_favicon: self.include_favicon.then_some(true),
            timeout: self.timeout,
            include_usage: self.include_usage.then_some(true),
        }
    }
}

/// Top-level failure, one variant per exit code category
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("API error: {0}")]
    Api(ApiError),

    #[error("API error: No content extracted from any URL")]
    NoContent,

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("Unexpected error: {0:#}")]
    Other(#[from] anyhow::Error),
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(e) => CliError::Network(e),
            other => CliError::Api(other),
        }
    }
}

impl CliError {
    /// Process exit code: 2 configuration, 3 API, 4 network, 1 anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            CliError::Api(_) | CliError::NoContent => 3,
            CliError::Network(_) => 4,
            CliError::Other(_) => 1,
        }
    }
}

/// Run one invocation and print its result to stdout.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    // config commands must work even when the file does not parse
    if let Command::Config { action } = &cli.command {
        let out = run_config_command(action, cli.config.as_deref())?;
        println!("{out}");
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref()).map_err(CliError::Config)?;
    let _log_guard = logging::init(&config, cli.verbose).map_err(CliError::Config)?;

    let (api_key, source) =
        config::resolve_api_key(cli.api_key.as_deref(), &config).map_err(CliError::Config)?;
    tracing::debug!(source = ?source, "api key resolved");

    let api_base = cli
        .api_base
        .clone()
        .or_else(|| config.api_base.clone())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let timeout = cli
        .http_timeout
        .or(config.timeout_secs)
        .map(Duration::from_secs);

    let client = TavilyClient::new(api_key)
        .with_api_base(api_base)
        .with_timeout(timeout);

    let format = cli.format.or(config.default_format);
    let out = dispatch(&cli.command, &client, format).await?;
    println!("{out}");
    Ok(())
}

/// Execute an API subcommand and render what goes to stdout.
///
/// `format` is the explicitly chosen output format, if any. Responses default
/// to text; the URL-to-file mapping of `extract --output-dir` defaults to JSON.
pub async fn dispatch(
    command: &Command,
    api: &dyn TavilyApi,
    format: Option<OutputFormat>,
) -> Result<String, CliError> {
    let response_format = format.unwrap_or_default();

    match command {
        Command::Search(args) => {
            let request = args.to_request();
            tracing::info!(
                query = %request.query,
                max_results = args.max_results,
                search_depth = ?args.search_depth,
                topic = ?args.topic,
                "searching"
            );
            let response = api.search(&request).await?;
            Ok(output::render_search(&response, response_format)
                .context("Failed to render response")?)
        }
        Command::Extract(args) => {
            let urls = args.collect_urls().map_err(CliError::Config)?;
            tracing::info!(count = urls.len(), urls = ?urls, "extracting");

            let request = args.to_request(urls);
            match &args.output_dir {
                Some(dir) => {
                    eprintln!("Extracting {} URLs...", request.urls.len());
                    let response = api.extract(&request).await?;
                    save_extraction(&response.data, dir, format.unwrap_or(OutputFormat::Json))
                }
                None => {
                    let response = api.extract(&request).await?;
                    Ok(output::render_extract(&response, response_format)
                        .context("Failed to render response")?)
                }
            }
        }
        Command::Crawl(args) => {
            let request = args.to_request();
            tracing::info!(url = %request.url, max_depth = ?request.max_depth, "crawling");
            let response = api.crawl(&request).await?;
            Ok(output::render_crawl(&response, response_format)
                .context("Failed to render response")?)
        }
        Command::Usage => {
            let response = api.usage().await?;
            Ok(output::render_usage(&response, response_format)
                .context("Failed to render response")?)
        }
        Command::Config { .. } => Err(CliError::Other(anyhow::anyhow!(
            "config commands do not call the API"
        ))),
    }
}

/// Save mode of `extract`: progress goes to stderr, the mapping to stdout.
fn save_extraction(
    response: &ExtractResponse,
    dir: &Path,
    format: OutputFormat,
) -> Result<String, CliError> {
    if !response.failed_results.is_empty() {
        eprintln!("Warning: {} URLs failed:", response.failed_results.len());
        for failed in &response.failed_results {
            let error = if failed.error.is_empty() { "Unknown error" } else { failed.error.as_str() };
            eprintln!("  - {}: {}", failed.url, error);
        }
    }

    if response.results.is_empty() {
        return Err(CliError::NoContent);
    }
    eprintln!("Successfully extracted {} URLs", response.results.len());

    let saved = save::save_results(&response.results, dir)?;

    if let Some(usage) = &response.usage {
        eprintln!("Credits used: {}", usage.credits);
    }

    Ok(output::render_saved(&saved, format).context("Failed to render mapping")?)
}

fn run_config_command(action: &ConfigCommand, path: Option<&Path>) -> Result<String, CliError> {
    let resolved = match path {
        Some(p) => p.to_path_buf(),
        None => config::config_path().map_err(CliError::Config)?,
    };

    match action {
        ConfigCommand::Path => Ok(resolved.display().to_string()),
        ConfigCommand::Init { force } => {
            if resolved.exists() && !force {
                return Err(CliError::Config(anyhow::anyhow!(
                    "config file already exists at {} (use --force to overwrite)",
                    resolved.display()
                )));
            }
            let written = config::write_template(Some(&resolved)).map_err(CliError::Config)?;
            Ok(format!(
                "Created config at: {}\nPlease edit this file to add your API key.",
                written.display()
            ))
        }
        ConfigCommand::Show => {
            let mut shown = config::load_config(Some(&resolved)).map_err(CliError::Config)?;
            if let Some(key) = shown.api_key.as_mut() {
                *key = logging::redact_secrets(key);
            }
            Ok(toml::to_string_pretty(&shown).context("Failed to serialize config")?)
        }
    }
}

/// Read URLs, one per line; blank lines and `#` comments are skipped.
pub fn read_urls_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URLs from file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn parse_date(raw: &str) -> Result<String, String> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| format!("'{raw}' is not a YYYY-MM-DD date"))
}

fn parse_seconds(raw: &str, min: f64, max: f64) -> Result<f64, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if !(min..=max).contains(&secs) {
        return Err(format!("timeout must be between {min} and {max} seconds"));
    }
    Ok(secs)
}

fn parse_extract_timeout(raw: &str) -> Result<f64, String> {
    parse_seconds(raw, 1.0, 60.0)
}

fn parse_crawl_timeout(raw: &str) -> Result<f64, String> {
    parse_seconds(raw, 10.0, 150.0)
}

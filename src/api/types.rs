use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

type Extra = serde_json::Map<String, serde_json::Value>;

/// Search category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    General,
    News,
    Finance,
}

/// Latency/relevance tradeoff for `/search`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SearchDepth {
    Basic,
    Advanced,
    Fast,
    UltraFast,
}

/// Publish-date window, counted back from today
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
    D,
    W,
    M,
    Y,
}

/// Extraction depth for `/extract` and `/crawl`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractDepth {
    Basic,
    Advanced,
}

/// Format of returned page content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
    Text,
}

/// Answer quality for `include_answer`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerLevel {
    Basic,
    Advanced,
}

/// `include_answer` accepts either a boolean or an answer level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IncludeAnswer {
    Flag(bool),
    Level(AnswerLevel),
}

impl FromStr for IncludeAnswer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Self::Flag(true)),
            "false" => Ok(Self::Flag(false)),
            "basic" => Ok(Self::Level(AnswerLevel::Basic)),
            "advanced" => Ok(Self::Level(AnswerLevel::Advanced)),
            other => Err(format!(
                "invalid answer mode '{other}' (expected basic, advanced, true or false)"
            )),
        }
    }
}

/// `include_raw_content` accepts either a boolean or a content format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IncludeRawContent {
    Flag(bool),
    Format(ContentFormat),
}

impl FromStr for IncludeRawContent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Self::Flag(true)),
            "false" => Ok(Self::Flag(false)),
            "markdown" => Ok(Self::Format(ContentFormat::Markdown)),
            "text" => Ok(Self::Format(ContentFormat::Text)),
            other => Err(format!(
                "invalid raw content mode '{other}' (expected markdown, text, true or false)"
            )),
        }
    }
}

/// Body of `POST /search`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_parameters: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_depth: Option<SearchDepth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_per_source: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_answer: Option<IncludeAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_raw_content: Option<IncludeRawContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_image_descriptions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_favicon: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub include_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exclude_domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_usage: Option<bool>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Credits consumed by a request, present when `include_usage` was set
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Usage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub credits: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Image entry; plain URL unless image descriptions were requested
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SearchImage {
    Url(String),
    Described {
        url: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl SearchImage {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Described { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Response of `POST /search`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub query: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<SearchImage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub auto_parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Body of `POST /extract`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractRequest {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_per_source: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract_depth: Option<ExtractDepth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_favicon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ContentFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_usage: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExtractResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FailedResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
}

/// Response of `POST /extract`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExtractResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<ExtractResult>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub failed_results: Vec<FailedResult>,
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Body of `POST /crawl`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrawlRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_per_source: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_breadth: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub select_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub select_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exclude_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exclude_domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_external: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract_depth: Option<ExtractDepth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ContentFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_favicon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_usage: Option<bool>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CrawlResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_content: String,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Response of `POST /crawl`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CrawlResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub base_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<CrawlResult>,
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Per-key counters from `GET /usage`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct KeyUsage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: f64,
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub search_usage: Option<f64>,
    #[serde(default)]
    pub extract_usage: Option<f64>,
    #[serde(default)]
    pub crawl_usage: Option<f64>,
    #[serde(default)]
    pub map_usage: Option<f64>,
    #[serde(default)]
    pub research_usage: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Per-account counters from `GET /usage`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AccountUsage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_plan: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plan_usage: f64,
    #[serde(default)]
    pub plan_limit: Option<f64>,
    #[serde(default)]
    pub paygo_usage: Option<f64>,
    #[serde(default)]
    pub paygo_limit: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Response of `GET /usage`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UsageResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: KeyUsage,
    #[serde(default, deserialize_with = "null_as_default")]
    pub account: AccountUsage,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A decoded response together with the body exactly as the service sent it.
///
/// `--format json` prints `body`; text rendering and file saving read `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub body: serde_json::Value,
    pub data: T,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    pub fn from_body(body: serde_json::Value) -> Result<Self, serde_json::Error> {
        let data = T::deserialize(&body)?;
        Ok(Self { body, data })
    }
}

/// The service sends `null` for absent values; treat it like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The four remote endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    Extract,
    Crawl,
    Usage,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Search => "/search",
            Endpoint::Extract => "/extract",
            Endpoint::Crawl => "/crawl",
            Endpoint::Usage => "/usage",
        }
    }

    /// Client-side timeout used when the user gives none.
    pub fn default_timeout_secs(&self) -> u64 {
        match self {
            Endpoint::Search | Endpoint::Usage => 30,
            Endpoint::Extract => 60,
            // crawl may run up to 150s server-side
            Endpoint::Crawl => 150,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_request_omits_unset_fields() {
        let req = SearchRequest::new("rust async");
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"query": "rust async"}));
    }

    #[test]
    fn test_search_request_serializes_wire_names() {
        let req = SearchRequest {
            search_depth: Some(SearchDepth::UltraFast),
            topic: Some(Topic::News),
            include_answer: Some(IncludeAnswer::Level(AnswerLevel::Advanced)),
            include_raw_content: Some(IncludeRawContent::Flag(true)),
            time_range: Some(TimeRange::W),
            include_domains: vec!["rust-lang.org".into()],
            ..SearchRequest::new("q")
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["search_depth"], "ultra-fast");
        assert_eq!(value["topic"], "news");
        assert_eq!(value["include_answer"], "advanced");
        assert_eq!(value["include_raw_content"], true);
        assert_eq!(value["time_range"], "w");
        assert_eq!(value["include_domains"], json!(["rust-lang.org"]));
        assert!(value.get("exclude_domains").is_none());
    }

    #[test]
    fn test_include_answer_parses_bool_and_levels() {
        assert_eq!("true".parse::<IncludeAnswer>().unwrap(), IncludeAnswer::Flag(true));
        assert_eq!(
            "Basic".parse::<IncludeAnswer>().unwrap(),
            IncludeAnswer::Level(AnswerLevel::Basic)
        );
        assert!("maybe".parse::<IncludeAnswer>().is_err());
    }

    #[test]
    fn test_search_response_accepts_both_image_shapes() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "query": "q",
            "images": [
                "https://img.example/a.png",
                {"url": "https://img.example/b.png", "description": "b"}
            ],
            "results": [],
            "response_time": 1.2,
            "follow_up_questions": null
        }))
        .unwrap();
        assert_eq!(resp.images.len(), 2);
        assert_eq!(resp.images[0].url(), "https://img.example/a.png");
        assert_eq!(resp.images[1].url(), "https://img.example/b.png");
        assert!(resp.extra.contains_key("follow_up_questions"));
    }

    #[test]
    fn test_usage_response_parses_partial_counters() {
        let resp: UsageResponse = serde_json::from_value(json!({
            "key": {"usage": 150, "limit": 1000},
            "account": {"current_plan": "Bootstrap", "plan_usage": 500, "plan_limit": 15000}
        }))
        .unwrap();
        assert_eq!(resp.key.usage, 150.0);
        assert_eq!(resp.key.limit, Some(1000.0));
        assert_eq!(resp.key.search_usage, None);
        assert_eq!(resp.account.current_plan, "Bootstrap");
    }

    #[test]
    fn test_null_fields_decode_as_defaults() {
        let resp: ApiResponse<SearchResponse> = ApiResponse::from_body(json!({
            "query": "q",
            "answer": null,
            "images": null,
            "results": [{"title": null, "url": "https://a.example", "content": null, "score": null}],
            "response_time": 0.4
        }))
        .unwrap();
        assert_eq!(resp.data.results[0].title, "");
        assert_eq!(resp.data.results[0].score, 0.0);
        assert!(resp.data.images.is_empty());
        assert_eq!(resp.body["results"][0]["title"], serde_json::Value::Null);

        let usage: UsageResponse = serde_json::from_value(json!({
            "key": {"usage": 7, "limit": null},
            "account": {"current_plan": null, "plan_usage": null}
        }))
        .unwrap();
        assert_eq!(usage.key.usage, 7.0);
        assert_eq!(usage.key.limit, None);
        assert_eq!(usage.account.current_plan, "");
    }

    #[test]
    fn test_endpoint_paths_and_timeouts() {
        assert_eq!(Endpoint::Search.path(), "/search");
        assert_eq!(Endpoint::Crawl.default_timeout_secs(), 150);
        assert_eq!(Endpoint::Usage.to_string(), "usage");
    }
}

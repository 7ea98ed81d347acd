pub mod client;
pub mod types;

pub use client::TavilyClient;
pub use types::*;

/// Default Tavily API base URL
pub const DEFAULT_API_BASE: &str = "https://api.tavily.com";

/// Tavily API abstraction - the CLI talks to this, tests can plug in a fake
#[async_trait::async_trait]
pub trait TavilyApi: Send + Sync {
    /// Run a web search
    async fn search(&self, request: &SearchRequest) -> Result<ApiResponse<SearchResponse>, ApiError>;

    /// Extract page content from up to 20 URLs
    async fn extract(&self, request: &ExtractRequest) -> Result<ApiResponse<ExtractResponse>, ApiError>;

    /// Crawl a site starting from a root URL
    async fn crawl(&self, request: &CrawlRequest) -> Result<ApiResponse<CrawlResponse>, ApiError>;

    /// Credit usage for the API key and its account
    async fn usage(&self) -> Result<ApiResponse<UsageResponse>, ApiError>;
}

/// Tavily API errors
///
/// Status codes follow the service's documented error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request (400): {0}")]
    BadRequest(String),

    #[error("Invalid API key (401): {0}")]
    InvalidApiKey(String),

    #[error("Rate limit exceeded (429): {0}")]
    RateLimitExceeded(String),

    #[error("Plan usage limit exceeded (432): {0}")]
    PlanLimitExceeded(String),

    #[error("Pay-as-you-go limit exceeded (433): {0}")]
    PayAsYouGoLimitExceeded(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Classify a non-success response from its status and body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body);
        match status {
            400 => ApiError::BadRequest(message),
            401 => ApiError::InvalidApiKey(message),
            429 => ApiError::RateLimitExceeded(message),
            432 => ApiError::PlanLimitExceeded(message),
            433 => ApiError::PayAsYouGoLimitExceeded(message),
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Http { status, message },
        }
    }

    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::InvalidApiKey(_) => Some(401),
            ApiError::RateLimitExceeded(_) => Some(429),
            ApiError::PlanLimitExceeded(_) => Some(432),
            ApiError::PayAsYouGoLimitExceeded(_) => Some(433),
            ApiError::Server { status, .. } | ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode { .. } => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Pull the human message out of an error body.
///
/// The service answers `{"detail": {"error": "..."}}`; older responses use a
/// plain `{"detail": "..."}`. Anything else is returned as-is.
fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(msg) = json["detail"]["error"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = json["detail"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = json["error"].as_str() {
            return msg.to_string();
        }
    }
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

use crate::api::{
    ApiError, ApiResponse, CrawlRequest, CrawlResponse, Endpoint, ExtractRequest, ExtractResponse,
    SearchRequest, SearchResponse, TavilyApi, UsageResponse, DEFAULT_API_BASE,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client for the Tavily REST API
///
/// Every call is a single request authenticated with `Authorization: Bearer <key>`.
/// Documentation: https://docs.tavily.com/documentation/api-reference
#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: String,
    api_base: String,
    timeout: Option<Duration>,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: None,
        }
    }

    /// Use a custom API base URL (proxies, local stubs).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-endpoint default timeouts.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.api_base, endpoint.path())
    }

    fn timeout_for(&self, endpoint: Endpoint) -> Duration {
        self.timeout
            .unwrap_or_else(|| Duration::from_secs(endpoint.default_timeout_secs()))
    }

    async fn send<B, R>(
        &self,
        method: Method,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<ApiResponse<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);

        tracing::debug!(
            %endpoint,
            url = %url,
            timeout_secs = self.timeout_for(endpoint).as_secs(),
            "sending tavily request"
        );

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .timeout(self.timeout_for(endpoint));

        if let Some(body) = body {
            if tracing::enabled!(tracing::Level::TRACE) {
                if let Ok(json) = serde_json::to_string(body) {
                    tracing::trace!(%endpoint, body = %json, "request body");
                }
            }
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            tracing::debug!(
                %endpoint,
                status = %status,
                error = %crate::logging::redact_secrets(&error_text),
                "tavily api error"
            );

            return Err(ApiError::from_status(status.as_u16(), &error_text));
        }

        let text = response.text().await?;
        let parsed = serde_json::from_str(&text)
            .and_then(ApiResponse::from_body)
            .map_err(|source| ApiError::Decode { endpoint, source })?;

        tracing::debug!(%endpoint, bytes = text.len(), "tavily request completed");

        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl TavilyApi for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<ApiResponse<SearchResponse>, ApiError> {
        tracing::debug!(
            query = %request.query,
            max_results = ?request.max_results,
            search_depth = ?request.search_depth,
            "performing tavily search"
        );
        let response: ApiResponse<SearchResponse> = self
            .send(Method::POST, Endpoint::Search, Some(request))
            .await?;
        tracing::debug!(result_count = response.data.results.len(), "tavily search completed");
        Ok(response)
    }

    async fn extract(
        &self,
        request: &ExtractRequest,
    ) -> Result<ApiResponse<ExtractResponse>, ApiError> {
        tracing::debug!(url_count = request.urls.len(), "performing tavily extract");
        let response: ApiResponse<ExtractResponse> = self
            .send(Method::POST, Endpoint::Extract, Some(request))
            .await?;
        tracing::debug!(
            succeeded = response.data.results.len(),
            failed = response.data.failed_results.len(),
            "tavily extract completed"
        );
        Ok(response)
    }

    async fn crawl(&self, request: &CrawlRequest) -> Result<ApiResponse<CrawlResponse>, ApiError> {
        tracing::debug!(url = %request.url, max_depth = ?request.max_depth, "performing tavily crawl");
        let response: ApiResponse<CrawlResponse> = self
            .send(Method::POST, Endpoint::Crawl, Some(request))
            .await?;
        tracing::debug!(page_count = response.data.results.len(), "tavily crawl completed");
        Ok(response)
    }

    async fn usage(&self) -> Result<ApiResponse<UsageResponse>, ApiError> {
        self.send::<(), _>(Method::GET, Endpoint::Usage, None).await
    }
}

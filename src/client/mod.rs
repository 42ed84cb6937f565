//! GitHub REST client used by every resource and data source.

use crate::auth::AuthMethod;
use crate::config::ProviderConfig;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult, RateLimitInfo};
use crate::observability::{Metrics, MetricsSnapshot, RequestTimer, TracingHooks};
use crate::pagination::{PaginationLinks, PaginationParams};
use crate::resilience::{
    RateLimitTracker, RequestThrottle, RetryExecutor, CORE_BUCKET, GRAPHQL_BUCKET,
};
use crate::services::{
    ActionsService, CollaboratorsService, EnvironmentsService, GitDataService, GraphQLService,
    HooksService, IssuesService, OrganizationsService, RepositoriesService, SearchService,
    UsersService,
};
use chrono::DateTime;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    Client, Method, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Default media type for REST requests.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github+json";

/// Characters escaped in a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes a value used as one path segment (environment names, label
/// names, secret names).
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Percent-encodes each segment of a slash-separated path (file paths).
pub fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// GitHub error response format.
#[derive(Debug, serde::Deserialize)]
struct GitHubErrorResponse {
    message: String,
    errors: Option<Vec<GitHubValidationError>>,
}

/// GitHub validation error.
#[derive(Debug, serde::Deserialize)]
struct GitHubValidationError {
    resource: Option<String>,
    field: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl GitHubValidationError {
    fn describe(&self) -> String {
        if let Some(ref message) = self.message {
            return message.clone();
        }
        format!(
            "{} {} {}",
            self.resource.as_deref().unwrap_or("resource"),
            self.field.as_deref().unwrap_or("field"),
            self.code.as_deref().unwrap_or("invalid"),
        )
    }
}

/// GitHub API client.
pub struct GitHubClient {
    http: Client,
    config: ProviderConfig,
    rest_url: String,
    graphql_url: String,
    auth: AuthMethod,
    retry: RetryExecutor,
    throttle: RequestThrottle,
    rate_limit: RateLimitTracker,
    metrics: Arc<Metrics>,
}

impl GitHubClient {
    /// Creates a new GitHub client.
    pub fn new(config: ProviderConfig, auth: AuthMethod) -> GitHubResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| {
                GitHubError::configuration(format!("Failed to create HTTP client: {}", e))
                    .with_cause(e)
            })?;

        tracing::debug!(
            base_url = %config.rest_url(),
            auth = auth.token_prefix(),
            parallel_requests = config.throttle.parallel_requests,
            "Creating GitHub client"
        );

        Ok(Self {
            http,
            rest_url: config.rest_url(),
            graphql_url: config.graphql_url(),
            auth,
            retry: RetryExecutor::new(config.retry.clone()),
            throttle: RequestThrottle::new(config.throttle.clone()),
            rate_limit: RateLimitTracker::new(config.rate_limit.low_watermark),
            metrics: Arc::new(Metrics::new()),
            config,
        })
    }

    /// Gets the REST base URL.
    pub fn base_url(&self) -> &str {
        &self.rest_url
    }

    /// Gets the GraphQL endpoint.
    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    /// Returns true when requests carry no credentials.
    pub fn is_anonymous(&self) -> bool {
        self.auth.is_anonymous()
    }

    /// Gets a metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Last rate limit headers seen for REST (`core`) or GraphQL calls.
    pub async fn rate_limit(&self, graphql: bool) -> Option<RateLimitInfo> {
        let bucket = if graphql { GRAPHQL_BUCKET } else { CORE_BUCKET };
        self.rate_limit.get(bucket).await
    }

    // Service accessors

    /// Gets the repositories service.
    pub fn repositories(&self) -> RepositoriesService<'_> {
        RepositoriesService::new(self)
    }

    /// Gets the branches and references service.
    pub fn git(&self) -> GitDataService<'_> {
        GitDataService::new(self)
    }

    /// Gets the collaborators service.
    pub fn collaborators(&self) -> CollaboratorsService<'_> {
        CollaboratorsService::new(self)
    }

    /// Gets the issues service.
    pub fn issues(&self) -> IssuesService<'_> {
        IssuesService::new(self)
    }

    /// Gets the organizations service.
    pub fn organizations(&self) -> OrganizationsService<'_> {
        OrganizationsService::new(self)
    }

    /// Gets the webhooks service.
    pub fn hooks(&self) -> HooksService<'_> {
        HooksService::new(self)
    }

    /// Gets the actions service.
    pub fn actions(&self) -> ActionsService<'_> {
        ActionsService::new(self)
    }

    /// Gets the environments service.
    pub fn environments(&self) -> EnvironmentsService<'_> {
        EnvironmentsService::new(self)
    }

    /// Gets the users service.
    pub fn users(&self) -> UsersService<'_> {
        UsersService::new(self)
    }

    /// Gets the search service.
    pub fn search(&self) -> SearchService<'_> {
        SearchService::new(self)
    }

    /// Gets the GraphQL service.
    pub fn graphql(&self) -> GraphQLService<'_> {
        GraphQLService::new(self)
    }

    // HTTP methods

    /// Makes a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<T> {
        self.request(Method::GET, path, DEFAULT_ACCEPT, Option::<&()>::None)
            .await
    }

    /// Makes a GET request, mapping 404 to `None`.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<Option<T>> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Makes a GET request with a custom media type.
    pub async fn get_with_accept<T: DeserializeOwned>(
        &self,
        path: &str,
        accept: &str,
    ) -> GitHubResult<T> {
        self.request(Method::GET, path, accept, Option::<&()>::None)
            .await
    }

    /// Makes a GET request with query parameters.
    pub async fn get_with_params<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: &P,
    ) -> GitHubResult<T> {
        let url = self.with_query(path, params)?;
        self.request(Method::GET, &url, DEFAULT_ACCEPT, Option::<&()>::None)
            .await
    }

    /// Fetches every page of a list endpoint, following `Link: rel="next"`.
    pub async fn get_all<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<Vec<T>> {
        self.get_all_with_params(path, &()).await
    }

    /// Fetches every page of a list endpoint with extra query parameters.
    pub async fn get_all_with_params<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: &P,
    ) -> GitHubResult<Vec<T>> {
        let first = self.with_query(path, params)?;
        let first = self.with_query(&first, &PaginationParams::max())?;

        let mut items = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            let response = self.execute(Method::GET, &url, DEFAULT_ACCEPT, None).await?;
            let links = PaginationLinks::from_headers(response.headers());
            if let Some(pages) = links.total_pages().filter(|_| items.is_empty()) {
                tracing::trace!(path = %path, pages, "Listing paginated collection");
            }
            let page: Vec<T> = Self::read_json(response).await?;
            items.extend(page);
            next = links.next;
        }

        Ok(items)
    }

    /// Fetches every page of an endpoint that wraps items in an object
    /// (`{"total_count": n, "<field>": [...]}`).
    pub async fn get_all_wrapped<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
    ) -> GitHubResult<Vec<T>> {
        let first = self.with_query(path, &PaginationParams::max())?;

        let mut items = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            let response = self.execute(Method::GET, &url, DEFAULT_ACCEPT, None).await?;
            let links = PaginationLinks::from_headers(response.headers());
            let mut body: serde_json::Value = Self::read_json(response).await?;
            let page = body
                .get_mut(field)
                .map(serde_json::Value::take)
                .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
            let page: Vec<T> = serde_json::from_value(page).map_err(|e| {
                GitHubError::deserialization(format!("Failed to deserialize {}: {}", field, e))
            })?;
            items.extend(page);
            next = links.next;
        }

        Ok(items)
    }

    /// Makes a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<T> {
        self.request(Method::POST, path, DEFAULT_ACCEPT, Some(body)).await
    }

    /// Makes a POST request without a response body.
    pub async fn post_no_response<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<()> {
        self.request_no_response(Method::POST, path, Some(body)).await
    }

    /// Makes a PUT request.
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<T> {
        self.request(Method::PUT, path, DEFAULT_ACCEPT, Some(body)).await
    }

    /// Makes a PUT request whose response may be empty (204) or carry a body (201).
    pub async fn put_optional<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<Option<T>> {
        let url = self.build_url(path);
        let bytes = Self::serialize_body(Some(body))?;
        let response = self.execute(Method::PUT, &url, DEFAULT_ACCEPT, bytes).await?;
        Self::read_optional_json(response).await
    }

    /// Makes a PUT request without a response body.
    pub async fn put_no_response<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<()> {
        self.request_no_response(Method::PUT, path, Some(body)).await
    }

    /// Makes a PATCH request.
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<T> {
        self.request(Method::PATCH, path, DEFAULT_ACCEPT, Some(body)).await
    }

    /// Makes a PATCH request without a response body.
    pub async fn patch_no_response<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<()> {
        self.request_no_response(Method::PATCH, path, Some(body)).await
    }

    /// Makes a DELETE request.
    pub async fn delete(&self, path: &str) -> GitHubResult<()> {
        self.request_no_response(Method::DELETE, path, Option::<&()>::None)
            .await
    }

    /// Makes a DELETE request with a JSON body.
    pub async fn delete_with_body<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<()> {
        self.request_no_response(Method::DELETE, path, Some(body)).await
    }

    /// Posts a GraphQL document to the v4 endpoint.
    pub async fn post_graphql<T: DeserializeOwned, B: Serialize>(
        &self,
        body: &B,
    ) -> GitHubResult<T> {
        let url = self.graphql_url.clone();
        self.request(Method::POST, &url, DEFAULT_ACCEPT, Some(body)).await
    }

    // Internal methods

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        accept: &str,
        body: Option<&B>,
    ) -> GitHubResult<T> {
        let url = self.build_url(path);
        let bytes = Self::serialize_body(body)?;
        let response = self.execute(method, &url, accept, bytes).await?;
        Self::read_json(response).await
    }

    async fn request_no_response<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> GitHubResult<()> {
        let url = self.build_url(path);
        let bytes = Self::serialize_body(body)?;
        self.execute(method, &url, DEFAULT_ACCEPT, bytes).await?;
        Ok(())
    }

    fn serialize_body<B: Serialize>(body: Option<&B>) -> GitHubResult<Option<Vec<u8>>> {
        body.map(serde_json::to_vec).transpose().map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::InvalidRequest,
                format!("Failed to serialize request body: {}", e),
            )
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> GitHubResult<T> {
        let bytes = response.bytes().await.map_err(|e| {
            GitHubError::deserialization(format!("Failed to read response body: {}", e))
        })?;
        let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(bytes).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
        })
    }

    async fn read_optional_json<T: DeserializeOwned>(
        response: Response,
    ) -> GitHubResult<Option<T>> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await.map_err(|e| {
            GitHubError::deserialization(format!("Failed to read response body: {}", e))
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
        })
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        accept: &str,
        body: Option<Vec<u8>>,
    ) -> GitHubResult<Response> {
        if self.config.rate_limit.wait_for_reset {
            self.rate_limit.wait_if_needed(self.bucket_for(url)).await;
        }

        let permit = self.throttle.acquire(&method).await;
        let attempts = AtomicU32::new(0);

        let result = self
            .retry
            .execute(&method, || {
                if attempts.fetch_add(1, Ordering::SeqCst) > 0 {
                    self.metrics.record_retry();
                }
                self.send_once(method.clone(), url, accept, body.clone())
            })
            .await;

        permit.release().await;

        let response = result?;
        if let Some(info) = Self::extract_rate_limit(response.headers()) {
            TracingHooks::on_rate_limit_update(&info);
            if self.rate_limit.update(&info).await {
                TracingHooks::on_rate_limit_low(&info);
            }
        }

        Ok(response)
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        accept: &str,
        body: Option<Vec<u8>>,
    ) -> GitHubResult<Response> {
        TracingHooks::on_request_start(method.as_str(), url);
        let timer = RequestTimer::new(self.metrics.clone());

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", &self.config.api_version);

        if let Some(auth_header) = self.auth.header_value() {
            request = request.header(AUTHORIZATION, auth_header);
        }

        if let Some(bytes) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                timer.failure();
                let error = if e.is_timeout() {
                    GitHubError::transport(format!("Request timed out: {}", e))
                } else if e.is_connect() {
                    GitHubError::transport(format!("Connection failed: {}", e))
                } else {
                    GitHubError::new(GitHubErrorKind::Unknown, format!("Request failed: {}", e))
                };
                TracingHooks::on_request_error(method.as_str(), url, &error.to_string());
                return Err(error);
            }
        };

        let status = response.status();
        if !status.is_success() {
            timer.failure();
            let rate_limit = Self::extract_rate_limit(response.headers());
            let error = Self::handle_error_response(response, rate_limit).await;
            if !error.is_not_found() {
                TracingHooks::on_request_error(method.as_str(), url, &error.to_string());
            }
            return Err(error);
        }

        let elapsed = timer.success();
        TracingHooks::on_request_complete(method.as_str(), url, status.as_u16(), elapsed);
        Ok(response)
    }

    fn bucket_for(&self, url: &str) -> &'static str {
        if url == self.graphql_url {
            GRAPHQL_BUCKET
        } else {
            CORE_BUCKET
        }
    }

    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.rest_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn with_query<P: Serialize>(&self, path: &str, params: &P) -> GitHubResult<String> {
        let url = self.build_url(path);
        let query_string = serde_urlencoded::to_string(params).map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::InvalidRequest,
                format!("Failed to serialize parameters: {}", e),
            )
        })?;

        if query_string.is_empty() {
            Ok(url)
        } else if url.contains('?') {
            Ok(format!("{}&{}", url, query_string))
        } else {
            Ok(format!("{}?{}", url, query_string))
        }
    }

    fn extract_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let limit = header("x-ratelimit-limit").and_then(|v| v.parse().ok())?;
        let remaining = header("x-ratelimit-remaining").and_then(|v| v.parse().ok())?;
        let reset_timestamp: i64 = header("x-ratelimit-reset").and_then(|v| v.parse().ok())?;
        let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

        Some(RateLimitInfo {
            limit,
            remaining,
            reset_at,
            retry_after: header("retry-after").and_then(|v| v.parse().ok()),
            resource: header("x-ratelimit-resource").map(String::from),
        })
    }

    async fn handle_error_response(
        response: Response,
        rate_limit: Option<RateLimitInfo>,
    ) -> GitHubError {
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-github-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if let Some(info) = rate_limit.as_ref().filter(|i| i.remaining == 0) {
            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                return GitHubError::rate_limited(info.clone()).with_status(status.as_u16());
            }
        }

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(body) => {
                let details: Vec<String> = body
                    .errors
                    .iter()
                    .flatten()
                    .map(GitHubValidationError::describe)
                    .collect();
                if details.is_empty() {
                    body.message
                } else {
                    format!("{}: {}", body.message, details.join(", "))
                }
            }
            Err(_) => format!("HTTP {} error", status.as_u16()),
        };

        let mut error = GitHubError::from_status(status.as_u16(), message);
        if let Some(id) = request_id {
            error = error.with_request_id(id);
        }
        match rate_limit {
            Some(info) => error.with_rate_limit(info),
            None => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        let config = ProviderConfig::builder().build().unwrap();
        GitHubClient::new(config, AuthMethod::token("test")).unwrap()
    }

    #[test]
    fn test_build_url() {
        let client = client();

        assert_eq!(
            client.build_url("/repos/owner/repo"),
            "https://api.github.com/repos/owner/repo"
        );
        assert_eq!(
            client.build_url("repos/owner/repo"),
            "https://api.github.com/repos/owner/repo"
        );
        assert_eq!(
            client.build_url("https://api.github.com/repos?page=2"),
            "https://api.github.com/repos?page=2"
        );
    }

    #[test]
    fn test_with_query_appends() {
        let client = client();
        let url = client
            .with_query("/repos/o/r/collaborators?affiliation=direct", &PaginationParams::max())
            .unwrap();
        assert_eq!(
            url,
            "https://api.github.com/repos/o/r/collaborators?affiliation=direct&per_page=100"
        );
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("production"), "production");
        assert_eq!(encode_segment("my env/1"), "my%20env%2F1");
        assert_eq!(encode_segment("bug: major"), "bug%3A%20major");
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("docs/read me.md"), "docs/read%20me.md");
        assert_eq!(encode_path("/.github/CODEOWNERS"), ".github/CODEOWNERS");
    }

    #[test]
    fn test_ghes_urls() {
        let config = ProviderConfig::builder()
            .base_url("https://ghes.example.com/")
            .build()
            .unwrap();
        let client = GitHubClient::new(config, AuthMethod::Anonymous).unwrap();
        assert_eq!(client.base_url(), "https://ghes.example.com/api/v3/");
        assert_eq!(client.graphql_url(), "https://ghes.example.com/api/graphql");
        assert!(client.is_anonymous());
    }
}

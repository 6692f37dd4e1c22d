//! Real-Debrid REST client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::DebridConfig;
use crate::metrics;

use super::rate_limiter::{EndpointClass, RateLimiters};
use super::retry::{with_retry, RetryPolicy};
use super::{
    AddedMagnet, DebridApi, DebridError, Download, FileSelection, LinkCheck, Torrent,
};

/// Real-Debrid client with rate limiting and retries.
pub struct RealDebridClient {
    client: Client,
    base_url: String,
    token: String,
    limiters: RateLimiters,
    retry: RetryPolicy,
}

impl RealDebridClient {
    /// Create a new client from configuration.
    pub fn new(config: &DebridConfig) -> Result<Self, DebridError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("strmsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DebridError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            limiters: RateLimiters::new(config.general_rate_limit, config.torrents_rate_limit),
            retry: RetryPolicy::with_max_attempts(config.max_retries),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Send a request built by `build`, throttled by `class` and retried.
    ///
    /// The token is taken once; retries after a 429 are not re-throttled.
    async fn execute<F>(
        &self,
        class: EndpointClass,
        label: &'static str,
        build: F,
    ) -> Result<String, DebridError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.limiters.acquire(class).await;

        with_retry(&self.retry, label, || {
            let request = build(&self.client).bearer_auth(&self.token);
            async move {
                let result = match request.send().await {
                    Ok(response) => read_response(response).await,
                    Err(e) => Err(classify_send_error(e)),
                };
                metrics::API_REQUESTS
                    .with_label_values(&[label, outcome_label(&result)])
                    .inc();
                result
            }
        })
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        class: EndpointClass,
        label: &'static str,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, DebridError> {
        let url = self.url(endpoint);
        let body = self
            .execute(class, label, |client| client.get(&url).query(query))
            .await?;
        decode_optional(&body)
    }

    async fn post_form(
        &self,
        class: EndpointClass,
        label: &'static str,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, DebridError> {
        let url = self.url(endpoint);
        self.execute(class, label, |client| client.post(&url).form(params))
            .await
    }

    async fn delete(
        &self,
        class: EndpointClass,
        label: &'static str,
        endpoint: &str,
    ) -> Result<(), DebridError> {
        let url = self.url(endpoint);
        self.execute(class, label, |client| client.delete(&url))
            .await
            .map(|_| ())
    }
}

/// Map a response status onto the error taxonomy and return the body.
async fn read_response(response: Response) -> Result<String, DebridError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after)
            .unwrap_or(Duration::ZERO);
        return Err(DebridError::RateLimited { retry_after });
    }

    let body = response.text().await.map_err(classify_send_error)?;

    if status.is_success() {
        return Ok(body);
    }

    let message = error_message(&body);
    if status == StatusCode::SERVICE_UNAVAILABLE {
        Err(DebridError::ServiceUnavailable(message))
    } else if status.is_server_error() {
        Err(DebridError::Transient(format!("HTTP {}: {}", status.as_u16(), message)))
    } else {
        Err(DebridError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn classify_send_error(e: reqwest::Error) -> DebridError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        DebridError::Transient(e.to_string())
    } else {
        DebridError::Client(e.to_string())
    }
}

fn outcome_label<T>(result: &Result<T, DebridError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(DebridError::RateLimited { .. }) => "rate_limited",
        Err(DebridError::ServiceUnavailable(_)) => "unavailable",
        Err(DebridError::Transient(_)) => "transient",
        Err(_) => "error",
    }
}

/// `Retry-After` in delta-seconds form.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Prefer the API's `error` field over the raw body.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ApiErrorBody {
        error: Option<String>,
    }

    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Decode a JSON body; an empty body (HTTP 204) decodes to `None`.
fn decode_optional<T: DeserializeOwned>(body: &str) -> Result<Option<T>, DebridError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| DebridError::Decode(e.to_string()))
}

fn decode_required<T: DeserializeOwned>(body: &str) -> Result<T, DebridError> {
    decode_optional(body)?.ok_or_else(|| DebridError::Decode("empty response body".to_string()))
}

fn page_query(page: usize, limit: usize) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("limit", limit.to_string())]
}

#[async_trait]
impl DebridApi for RealDebridClient {
    fn name(&self) -> &str {
        "real-debrid"
    }

    async fn list_torrents(&self, page: usize, limit: usize) -> Result<Vec<Torrent>, DebridError> {
        let torrents: Option<Vec<Torrent>> = self
            .get_json(
                EndpointClass::Torrents,
                "torrents",
                "/torrents",
                &page_query(page, limit),
            )
            .await?;
        let torrents = torrents.unwrap_or_default();
        debug!(page, count = torrents.len(), "Fetched torrents page");
        Ok(torrents)
    }

    async fn list_downloads(
        &self,
        page: usize,
        limit: usize,
    ) -> Result<Vec<Download>, DebridError> {
        let downloads: Option<Vec<Download>> = self
            .get_json(
                EndpointClass::General,
                "downloads",
                "/downloads",
                &page_query(page, limit),
            )
            .await?;
        let downloads = downloads.unwrap_or_default();
        debug!(page, count = downloads.len(), "Fetched downloads page");
        Ok(downloads)
    }

    async fn get_torrent_info(&self, id: &str) -> Result<Torrent, DebridError> {
        let endpoint = format!("/torrents/info/{}", id);
        let torrent: Option<Torrent> = self
            .get_json(EndpointClass::Torrents, "torrent_info", &endpoint, &[])
            .await?;
        torrent.ok_or_else(|| DebridError::Decode(format!("empty info for torrent {}", id)))
    }

    async fn add_magnet(
        &self,
        magnet: &str,
        host: Option<&str>,
    ) -> Result<AddedMagnet, DebridError> {
        let mut params = vec![("magnet", magnet)];
        if let Some(host) = host {
            params.push(("host", host));
        }
        let body = self
            .post_form(
                EndpointClass::Torrents,
                "add_magnet",
                "/torrents/addMagnet",
                &params,
            )
            .await?;
        decode_required(&body)
    }

    async fn select_files(&self, id: &str, files: &FileSelection) -> Result<(), DebridError> {
        let endpoint = format!("/torrents/selectFiles/{}", id);
        let files = files.as_param();
        self.post_form(
            EndpointClass::Torrents,
            "select_files",
            &endpoint,
            &[("files", files.as_str())],
        )
        .await
        .map(|_| ())
    }

    async fn unrestrict_link(
        &self,
        link: &str,
        password: Option<&str>,
    ) -> Result<Download, DebridError> {
        let mut params = vec![("link", link)];
        if let Some(password) = password {
            params.push(("password", password));
        }
        let body = self
            .post_form(
                EndpointClass::General,
                "unrestrict",
                "/unrestrict/link",
                &params,
            )
            .await
            .inspect_err(|e| {
                if e.is_service_unavailable() {
                    warn!(link = %link, error = %e, "Hoster unavailable");
                }
            })?;
        decode_required(&body)
    }

    async fn check_link(
        &self,
        link: &str,
        password: Option<&str>,
    ) -> Result<LinkCheck, DebridError> {
        let mut params = vec![("link", link)];
        if let Some(password) = password {
            params.push(("password", password));
        }
        let body = self
            .post_form(
                EndpointClass::General,
                "unrestrict_check",
                "/unrestrict/check",
                &params,
            )
            .await?;
        decode_required(&body)
    }

    async fn delete_download(&self, id: &str) -> Result<(), DebridError> {
        let endpoint = format!("/downloads/delete/{}", id);
        self.delete(EndpointClass::General, "delete_download", &endpoint)
            .await
    }

    async fn delete_torrent(&self, id: &str) -> Result<(), DebridError> {
        let endpoint = format!("/torrents/delete/{}", id);
        self.delete(EndpointClass::General, "delete_torrent", &endpoint)
            .await
    }
}

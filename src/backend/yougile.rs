//! YouGile REST API client.
//!
//! Fetches full collections page by page with a fixed pause between pages,
//! retrying transient failures with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::retry::{classify, RetryDecision, RetryPolicy};
use super::{ApiError, Endpoint, RawRecord, RemoteSource};
use crate::config::{ApiConfig, PaginationStyle};
use crate::constants::{ERROR_BODY_PREVIEW_CHARS, ITEM_KEYS};

/// One unwrapped page of a collection.
#[derive(Debug, Default, PartialEq)]
pub struct Page {
    pub records: Vec<RawRecord>,
    /// Server-side `paging.next` hint, when the body carries one.
    pub has_more: Option<bool>,
}

/// Normalize a response body into a flat list of records.
///
/// The body may be a bare list or an object carrying the list under one of
/// [`ITEM_KEYS`]. Anything else yields an empty page. Non-object list entries
/// are dropped.
pub fn unwrap_page(body: Value) -> Page {
    let (items, has_more) = match body {
        Value::Array(items) => (items, None),
        Value::Object(mut obj) => {
            let has_more = obj
                .get("paging")
                .and_then(|p| p.get("next"))
                .and_then(Value::as_bool);
            let items = ITEM_KEYS
                .iter()
                .find_map(|key| match obj.remove(*key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .unwrap_or_default();
            (items, has_more)
        }
        _ => (Vec::new(), None),
    };

    let records = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect();

    Page { records, has_more }
}

/// Read a `Retry-After` value: either delta-seconds or an HTTP-date.
///
/// A date in the past means "retry now".
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some((at.with_timezone(&Utc) - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

/// Bearer-authenticated client for the YouGile v2 API.
pub struct YougileClient {
    http: Client,
    base_url: String,
    page_size: u32,
    page_delay: Duration,
    pagination: PaginationStyle,
    retry: RetryPolicy,
}

impl YougileClient {
    /// Create a client with the given bearer token and API settings.
    ///
    /// # Errors
    /// Returns an error if the token cannot be used as a header value or the
    /// underlying HTTP client cannot be built.
    pub fn new(api_token: &str, config: &ApiConfig) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_token}"))
            .map_err(|e| ApiError::InvalidData(format!("API token is not a valid header value: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
            page_delay: Duration::from_millis(config.page_delay_ms),
            pagination: config.pagination,
            retry: RetryPolicy::from(&config.retry),
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    fn page_query(&self, page_index: u32) -> Vec<(&'static str, String)> {
        match self.pagination {
            PaginationStyle::Offset => vec![
                ("limit", self.page_size.to_string()),
                ("offset", (u64::from(page_index) * u64::from(self.page_size)).to_string()),
            ],
            PaginationStyle::Page => vec![
                ("page", (u64::from(page_index) + 1).to_string()),
                ("pageSize", self.page_size.to_string()),
            ],
        }
    }

    /// Issue one GET. `Ok(None)` means the endpoint answered 404.
    async fn send_once(&self, url: &str, query: &[(&'static str, String)]) -> Result<Option<Value>, ApiError> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(ApiError::RateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_PREVIEW_CHARS)
                .collect();
            let status = status.as_u16();
            return Err(if (500..600).contains(&status) {
                ApiError::Server { status, body }
            } else {
                ApiError::BadRequest { status, body }
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Some(Value::Null));
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ApiError::InvalidData(format!("{url}: {e}")))
    }

    /// GET with the retry loop applied.
    async fn get_with_retry(&self, url: &str, query: &[(&'static str, String)]) -> Result<Option<Value>, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match self.send_once(url, query).await {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            if classify(&err) == RetryDecision::Fail {
                return Err(err);
            }
            if attempt >= self.retry.max_attempts {
                return Err(ApiError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.retry.delay_for(attempt, &err);
            warn!(
                "⚠️  {url}: {err}; retrying in {delay:?} (attempt {attempt}/{})",
                self.retry.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteSource for YougileClient {
    async fn fetch_collection(&self, endpoint: Endpoint) -> Result<Vec<RawRecord>, ApiError> {
        let url = self.url(endpoint);
        let mut records = Vec::new();
        let mut page_index: u32 = 0;
        let mut previous_first_id: Option<Value> = None;

        loop {
            let query = self.page_query(page_index);
            let Some(body) = self.get_with_retry(&url, &query).await? else {
                debug!("/{endpoint} answered 404 on page {page_index}, treating as end of collection");
                break;
            };

            let page = unwrap_page(body);
            let count = page.records.len();
            let first_id = page.records.first().and_then(|r| r.get("id")).cloned();

            if page_index > 0 && first_id.is_some() && first_id == previous_first_id {
                warn!("⚠️  /{endpoint} returned the same page twice; the server seems to ignore paging parameters");
                break;
            }

            debug!("/{endpoint} page {page_index}: {count} records");
            records.extend(page.records);

            let last_page = count == 0 || count < self.page_size as usize || page.has_more == Some(false);
            if last_page {
                break;
            }

            previous_first_id = first_id;
            page_index += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        info!("✅ Fetched {} records from /{endpoint}", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_bare_list() {
        let page = unwrap_page(json!([{"id": "a"}, {"id": "b"}, 42]));
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.has_more, None);
    }

    #[test]
    fn test_unwrap_wrapped_content_with_paging() {
        let page = unwrap_page(json!({
            "paging": {"count": 1, "limit": 200, "offset": 0, "next": false},
            "content": [{"id": "a"}]
        }));
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.has_more, Some(false));
    }

    #[test]
    fn test_unwrap_items_and_data_keys() {
        assert_eq!(unwrap_page(json!({"items": [{"id": "a"}]})).records.len(), 1);
        assert_eq!(unwrap_page(json!({"data": [{"id": "a"}, {"id": "b"}]})).records.len(), 2);
    }

    #[test]
    fn test_retry_after_forms() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), Some(Duration::ZERO));

        let later = (Utc::now() + chrono::Duration::seconds(120)).to_rfc2822();
        let delay = parse_retry_after(&later).unwrap();
        assert!(delay > Duration::from_secs(100) && delay <= Duration::from_secs(120));

        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_unwrap_unknown_shapes_are_empty() {
        assert!(unwrap_page(json!({"something": [{"id": "a"}]})).records.is_empty());
        assert!(unwrap_page(json!("text")).records.is_empty());
        assert!(unwrap_page(Value::Null).records.is_empty());
    }
}

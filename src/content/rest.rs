//! PostgREST-style HTTP client for the content store.
//!
//! Each read is a single `GET {base}/rest/v1/{table}` filtered with
//! `column=eq.value`, ordered newest-first and limited to one row. An empty
//! JSON array is the store's way of saying "no record".

use super::{Card, ContentRecord, ContentStore, Link, QuoteRecord, StoreError};
use crate::menu::Selection;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Connection and table layout for a [`RestStore`].
#[derive(Clone)]
pub struct StoreSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub brief_table: String,
    pub quote_table: String,
    pub main_column: String,
    pub sub_column: String,
    pub category_column: String,
    pub order_column: String,
    pub timeout: Duration,
}

impl StoreSettings {
    /// Settings for the stock `daily_briefs` / `daily_quotes` layout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            brief_table: "daily_briefs".to_string(),
            quote_table: "daily_quotes".to_string(),
            main_column: "main_menu".to_string(),
            sub_column: "sub_menu".to_string(),
            category_column: "category".to_string(),
            order_column: "created_at".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl std::fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("brief_table", &self.brief_table)
            .field("quote_table", &self.quote_table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// Wire Rows
// ============================================================================

/// Brief row as stored. Every column is optional so schema drift between
/// store revisions decodes instead of failing the whole fetch.
#[derive(Debug, Deserialize)]
struct BriefRow {
    content: Option<String>,
    summary: Option<String>,
    cards: Option<Vec<Card>>,
    links: Option<Vec<Link>>,
    date: Option<NaiveDate>,
    created_at: Option<DateTime<Utc>>,
}

impl From<BriefRow> for ContentRecord {
    fn from(row: BriefRow) -> Self {
        Self {
            content: row.content.or(row.summary).unwrap_or_default(),
            cards: row.cards.unwrap_or_default(),
            links: row.links.unwrap_or_default(),
            date: row.date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteRow {
    content: Option<String>,
    author: Option<String>,
}

impl From<QuoteRow> for QuoteRecord {
    fn from(row: QuoteRow) -> Self {
        Self {
            content: row.content.unwrap_or_default(),
            author: row.author.unwrap_or_default(),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct RestStore {
    client: reqwest::Client,
    base: Url,
    settings: StoreSettings,
}

impl RestStore {
    /// Build a client for `settings`.
    ///
    /// The base URL must be HTTPS so the API key never travels in the clear;
    /// plain HTTP is accepted for localhost only.
    pub fn new(settings: StoreSettings) -> Result<Self, StoreError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|e| StoreError::InvalidBaseUrl(e.to_string()))?;

        match base.scheme() {
            "https" => {}
            "http" => {
                let is_localhost = matches!(base.host_str(), Some("localhost" | "127.0.0.1"));
                if !is_localhost {
                    tracing::error!(base_url = %base, "Rejecting non-HTTPS store URL");
                    return Err(StoreError::InsecureBaseUrl);
                }
                tracing::warn!(base_url = %base, "Using non-HTTPS store URL (localhost only)");
            }
            other => {
                return Err(StoreError::InvalidBaseUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidBaseUrl(settings.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base,
            settings,
        })
    }

    /// `{base}/rest/v1/{table}?select=*&filters...&order=..desc&limit=1`
    fn latest_row_url(&self, table: &str, filters: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["rest", "v1", table]);
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (column, value) in filters {
                query.append_pair(column, &format!("eq.{}", value));
            }
            query.append_pair("order", &format!("{}.desc", self.settings.order_column));
            query.append_pair("limit", "1");
        }
        url
    }

    async fn fetch_first<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, StoreError> {
        let timeout = self.settings.timeout;
        tokio::time::timeout(timeout, self.fetch_rows::<T>(url))
            .await
            .map_err(|_| StoreError::Timeout(timeout.as_secs()))?
            .map(|rows| rows.into_iter().next())
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, StoreError> {
        tracing::debug!(url = %url, "Querying content store");
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/json");
        if let Some(key) = &self.settings.api_key {
            request = request
                .header("apikey", key.expose_secret())
                .header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for RestStore {
    async fn fetch_latest_quote(&self) -> Result<Option<QuoteRecord>, StoreError> {
        let url = self.latest_row_url(&self.settings.quote_table, &[]);
        let row: Option<QuoteRow> = self.fetch_first(url).await?;
        Ok(row.map(QuoteRecord::from))
    }

    async fn fetch_latest_content(
        &self,
        selection: &Selection,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let url = match selection {
            Selection::Category(name) => self.latest_row_url(
                &self.settings.brief_table,
                &[(self.settings.category_column.as_str(), name.as_str())],
            ),
            Selection::Pair { main, sub } => self.latest_row_url(
                &self.settings.brief_table,
                &[
                    (self.settings.main_column.as_str(), main.as_str()),
                    (self.settings.sub_column.as_str(), sub.as_str()),
                ],
            ),
        };
        let row: Option<BriefRow> = self.fetch_first(url).await?;
        Ok(row.map(ContentRecord::from))
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, StoreError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(StoreError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(StoreError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FetchErrorKind;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> RestStore {
        let mut settings = StoreSettings::new(server.uri());
        settings.api_key = Some(SecretString::from("anon-key".to_string()));
        RestStore::new(settings).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_latest_content_pair() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/daily_briefs"))
            .and(query_param("main_menu", "eq.国内"))
            .and(query_param("sub_menu", "eq.AI"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("limit", "1"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"id":7,"date":"2024-05-01","main_menu":"国内","sub_menu":"AI",
                    "content":"综述","links":[{"title":"T","url":"https://e.com/1"}],
                    "created_at":"2024-05-01T08:00:00+00:00"}]"#,
            ))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let record = store
            .fetch_latest_content(&Selection::pair("国内", "AI"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.content, "综述");
        assert_eq!(record.links.len(), 1);
        assert_eq!(record.links[0].url, "https://e.com/1");
        assert!(record.cards.is_empty());
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert!(record.created_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_latest_content_category_and_summary_alias() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/daily_briefs"))
            .and(query_param("category", "eq.段子"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"summary":"笑话","cards":null,"links":null}]"#,
            ))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let record = store
            .fetch_latest_content(&Selection::category("段子"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content, "笑话");
        assert!(record.links.is_empty());
    }

    #[tokio::test]
    async fn test_empty_array_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let result = store
            .fetch_latest_content(&Selection::category("段子"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store
            .fetch_latest_content(&Selection::category("AI"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Status(503));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"message\":\"oops\"}"))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store.fetch_latest_quote().await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut settings = StoreSettings::new(server.uri());
        settings.timeout = Duration::from_millis(50);
        let store = RestStore::new(settings).unwrap();
        let err = store.fetch_latest_quote().await.unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_latest_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/daily_quotes"))
            .and(query_param("select", "*"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"content":"知行合一","author":"王阳明"}]"#,
            ))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let quote = store.fetch_latest_quote().await.unwrap().unwrap();
        assert_eq!(
            quote,
            QuoteRecord {
                content: "知行合一".to_string(),
                author: "王阳明".to_string(),
            }
        );
    }

    #[test]
    fn test_http_base_url_rejected() {
        let result = RestStore::new(StoreSettings::new("http://evil.example.com"));
        assert!(matches!(result, Err(StoreError::InsecureBaseUrl)));
    }

    #[test]
    fn test_unparseable_base_url_rejected() {
        let result = RestStore::new(StoreSettings::new("not a url"));
        assert!(matches!(result, Err(StoreError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_latest_row_url_keeps_base_path() {
        let store = RestStore::new(StoreSettings::new("https://db.example.com/")).unwrap();
        let url = store.latest_row_url("daily_briefs", &[("category", "AI")]);
        assert_eq!(
            url.as_str(),
            "https://db.example.com/rest/v1/daily_briefs?select=*&category=eq.AI&order=created_at.desc&limit=1"
        );
    }

    #[test]
    fn test_settings_debug_masks_key() {
        let mut settings = StoreSettings::new("https://db.example.com");
        settings.api_key = Some(SecretString::from("super-secret".to_string()));
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

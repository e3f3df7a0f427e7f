//! `RemoteStore` over a PostgREST endpoint (the REST dialect served by
//! Supabase projects).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::{ErrorKind, RemoteError};
use crate::types::Table;

use super::classify::classify_provider_error;
use super::traits::RemoteStore;

const PREFER: &str = "Prefer";

/// Error body returned by PostgREST on a failed request.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

pub struct PostgrestStore {
    client: reqwest::Client,
    rest_url: String,
}

impl PostgrestStore {
    /// Build an authenticated client. Fails if the parameters cannot form a
    /// valid endpoint or header; no request is sent.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let invalid = |message: String| RemoteError::new(ErrorKind::RemoteRejected, "-", message);

        let base = reqwest::Url::parse(config.url.trim())
            .map_err(|e| invalid(format!("invalid remote url: {e}")))?;

        let api_key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|e| invalid(format!("invalid api key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|e| invalid(format!("invalid api key: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| invalid(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", base.as_str().trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.rest_url, table.as_str())
    }

    /// Send the request and turn any failure into a classified `RemoteError`.
    async fn send(&self, table: Table, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(|e| transport_error(table, &e))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = describe(&body, &text, status);
        let kind = classify_provider_error(Some(status), body.code.as_deref(), &message);

        let mut err = RemoteError::new(kind, table.as_str(), message);
        if let Some(code) = body.code {
            err = err.with_code(code);
        }
        Err(err)
    }

    async fn send_rows(&self, table: Table, request: RequestBuilder) -> Result<Vec<Value>, RemoteError> {
        let response = self.send(table, request).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| transport_error(table, &e))
    }
}

#[async_trait]
impl RemoteStore for PostgrestStore {
    async fn select_all(&self, table: Table) -> Result<Vec<Value>, RemoteError> {
        let request = self.client.get(self.table_url(table)).query(&[("select", "*")]);
        self.send_rows(table, request).await
    }

    async fn upsert(&self, table: Table, row: Value, key_field: &str) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", key_field)])
            .header(PREFER, "resolution=merge-duplicates,return=minimal")
            .json(&row);
        self.send(table, request).await.map(|_| ())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(self.table_url(table))
            .header(PREFER, "return=minimal")
            .json(&row);
        self.send(table, request).await.map(|_| ())
    }

    async fn delete_by_key(
        &self,
        table: Table,
        key_field: &str,
        key: &str,
    ) -> Result<usize, RemoteError> {
        // Rows hidden by a policy are silently skipped, so the representation
        // is the only reliable affected-row count.
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[(key_field, format!("eq.{key}"))])
            .header(PREFER, "return=representation");
        let deleted = self.send_rows(table, request).await?;
        Ok(deleted.len())
    }

    async fn select_where_embedded_eq(
        &self,
        table: Table,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, RemoteError> {
        let request = self.client.get(self.table_url(table)).query(&[
            ("select".to_string(), "*".to_string()),
            (format!("data->>{field}"), format!("eq.{value}")),
        ]);
        self.send_rows(table, request).await
    }

    async fn select_recent(
        &self,
        table: Table,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        let request = self.client.get(self.table_url(table)).query(&[
            ("select", "*".to_string()),
            ("order", format!("{order_by}.desc")),
            ("limit", limit.to_string()),
        ]);
        self.send_rows(table, request).await
    }
}

fn transport_error(table: Table, e: &reqwest::Error) -> RemoteError {
    let status = e.status().map(|s| s.as_u16());
    let kind = if e.is_decode() {
        ErrorKind::RemoteRejected
    } else {
        classify_provider_error(status, None, &e.to_string())
    };
    RemoteError::new(kind, table.as_str(), e.to_string())
}

fn describe(body: &ErrorBody, raw: &str, status: u16) -> String {
    let mut message = body
        .message
        .clone()
        .unwrap_or_else(|| if raw.is_empty() { format!("HTTP {status}") } else { raw.to_string() });
    if let Some(details) = body.details.as_deref().filter(|d| !d.is_empty()) {
        message.push_str(&format!(" ({details})"));
    }
    if let Some(hint) = body.hint.as_deref().filter(|h| !h.is_empty()) {
        message.push_str(&format!(" hint: {hint}"));
    }
    message
}

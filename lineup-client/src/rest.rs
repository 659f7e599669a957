//! HTTP implementation of the remote boundary.
//!
//! Speaks a PostgREST-flavored dialect: one resource path per
//! collection, predicates as `field=op.value` query pairs, projection
//! via `select`, slices via `offset`/`limit`.

use async_trait::async_trait;
use lineup_core::{Collection, DataError, DataResult, Filter, Record, SortDirection};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;

use crate::config::{ClientConfig, ConfigError};
use crate::realtime::{RealtimeClient, Subscription};
use crate::remote::RemoteDataService;

/// REST + websocket client for the remote data service.
#[derive(Clone)]
pub struct RestDataService {
    client: reqwest::Client,
    base_url: String,
    auth_headers: HeaderMap,
    realtime: RealtimeClient,
}

impl RestDataService {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: e.to_string(),
            })?;

        let auth_headers = build_auth_headers(&config.auth)?;
        let realtime = RealtimeClient::new(
            config.realtime_endpoint.clone(),
            config.auth.api_key.clone(),
            config.auth.bearer_token.clone(),
            config.reconnect.clone(),
        );
        Ok(Self {
            client,
            base_url: config.rest_base_url.trim_end_matches('/').to_string(),
            auth_headers,
            realtime,
        })
    }

    fn url_for(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.wire_name())
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> DataResult<T> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| DataError::validation(format!("invalid response body: {e}")))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(DataError::from_status(status.as_u16(), text))
        }
    }
}

#[async_trait]
impl RemoteDataService for RestDataService {
    async fn select(&self, collection: Collection, filter: &Filter) -> DataResult<Vec<Record>> {
        let response = self
            .client
            .get(self.url_for(collection))
            .headers(self.auth_headers.clone())
            .query(&filter_query_pairs(filter))
            .send()
            .await
            .map_err(classify_transport)?;
        self.parse_response(response).await
    }

    async fn insert(&self, collection: Collection, record: &Record) -> DataResult<Record> {
        let response = self
            .client
            .post(self.url_for(collection))
            .headers(self.auth_headers.clone())
            .header("prefer", "return=representation")
            .json(record)
            .send()
            .await
            .map_err(classify_transport)?;
        let mut rows: Vec<Record> = self.parse_response(response).await?;
        rows.pop()
            .ok_or_else(|| DataError::validation("insert returned no representation"))
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Record,
    ) -> DataResult<Vec<Record>> {
        let response = self
            .client
            .patch(self.url_for(collection))
            .headers(self.auth_headers.clone())
            .header("prefer", "return=representation")
            .query(&filter_query_pairs(filter))
            .json(patch)
            .send()
            .await
            .map_err(classify_transport)?;
        self.parse_response(response).await
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> DataResult<()> {
        let response = self
            .client
            .delete(self.url_for(collection))
            .headers(self.auth_headers.clone())
            .query(&filter_query_pairs(filter))
            .send()
            .await
            .map_err(classify_transport)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(DataError::from_status(status.as_u16(), text))
        }
    }

    async fn subscribe(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> DataResult<Subscription> {
        Ok(self.realtime.subscribe(collection, filter))
    }
}

/// Render a filter as query pairs in the remote service's dialect.
fn filter_query_pairs(filter: &Filter) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if !filter.projection.is_empty() {
        pairs.push(("select".to_string(), filter.projection.join(",")));
    }
    for predicate in &filter.predicates {
        pairs.push((
            predicate.field.clone(),
            format!(
                "{}.{}",
                predicate.operator.wire_token(),
                render_value(&predicate.value)
            ),
        ));
    }
    if !filter.order.is_empty() {
        let terms: Vec<String> = filter
            .order
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    SortDirection::Asc => "asc",
                    SortDirection::Desc => "desc",
                };
                format!("{}.{}", o.field, dir)
            })
            .collect();
        pairs.push(("order".to_string(), terms.join(",")));
    }
    if let Some(slice) = filter.slice {
        pairs.push(("offset".to_string(), slice.from.to_string()));
        pairs.push(("limit".to_string(), slice.len().to_string()));
    }
    pairs
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Map transport-level failures into the taxonomy. Everything that
/// failed before a response arrived counts as connectivity; a body we
/// could not decode is a validation failure.
fn classify_transport(err: reqwest::Error) -> DataError {
    if err.is_decode() {
        DataError::validation(format!("invalid response body: {err}"))
    } else {
        DataError::connectivity(err.to_string())
    }
}

fn build_auth_headers(auth: &crate::config::CredentialsConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ConfigError::InvalidValue {
                field: "auth.api_key",
                reason: e.to_string(),
            })?,
        );
    }
    if let Some(token) = &auth.bearer_token {
        let value = format!("Bearer {token}");
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ConfigError::InvalidValue {
                field: "auth.bearer_token",
                reason: e.to_string(),
            })?,
        );
    }
    Ok(headers)
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{BackendError, DatabaseBackend, Filter, Query, Row, RpcArgs};
use crate::config::RemoteBackendConfig;

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_SINGLE_OBJECT: &str = "params=single-object";

/// Client for the hosted database's PostgREST endpoint.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl RestBackend {
    pub fn new(config: &RemoteBackendConfig, timeout: Duration) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.anon_key)
            .map_err(|err| BackendError::Network(format!("invalid api key header: {err}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key))
            .map_err(|err| BackendError::Network(format!("invalid api key header: {err}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rpc/{}", self.base_url, function)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| BackendError::Decode(err.to_string()))
    }
}

fn api_error(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let mut message = parsed.message.unwrap_or_else(|| body.to_string());
            if let Some(details) = parsed.details.filter(|details| !details.is_empty()) {
                message.push_str(&format!(" ({details})"));
            }
            if let Some(hint) = parsed.hint.filter(|hint| !hint.is_empty()) {
                message.push_str(&format!(" hint: {hint}"));
            }
            BackendError::Api {
                status,
                code: parsed.code,
                message,
            }
        }
        Err(_) => BackendError::Api {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

fn query_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), "*".to_string())];
    pairs.extend(filter_pairs(&query.filters));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        pairs.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    pairs
}

fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| (filter.column.clone(), format!("eq.{}", filter.rendered_value())))
        .collect()
}

fn into_rows(value: Value) -> Result<Vec<Row>, BackendError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(BackendError::Decode(format!("expected row object, found {other}"))),
            })
            .collect(),
        Value::Object(row) => Ok(vec![row]),
        other => Err(BackendError::Decode(format!("expected rows, found {other}"))),
    }
}

#[async_trait]
impl DatabaseBackend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        debug!(table, filters = query.filters.len(), "select");
        let request = self.client.get(self.table_url(table)).query(&query_pairs(query));
        into_rows(self.send(request).await?)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        debug!(table, "insert");
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&row);
        into_rows(self.send(request).await?)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("insert into {table} returned no row")))
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: Row,
    ) -> Result<Vec<Row>, BackendError> {
        debug!(table, column = %filter.column, "update");
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&filter_pairs(std::slice::from_ref(filter)))
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&patch);
        into_rows(self.send(request).await?)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize, BackendError> {
        debug!(table, column = %filter.column, "delete");
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&filter_pairs(std::slice::from_ref(filter)))
            .header("Prefer", PREFER_REPRESENTATION);
        Ok(into_rows(self.send(request).await?)?.len())
    }

    async fn rpc(&self, function: &str, args: RpcArgs) -> Result<Value, BackendError> {
        debug!(function, "rpc");
        let request = self.client.post(self.rpc_url(function));
        let request = match args {
            RpcArgs::None => request.json(&serde_json::json!({})),
            RpcArgs::Named(row) => request.json(&row),
            RpcArgs::Positional(values) => request
                .header("Prefer", PREFER_SINGLE_OBJECT)
                .json(&values),
        };
        self.send(request).await
    }
}

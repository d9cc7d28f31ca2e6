//! HTTP Router
//!
//! Maps the wire protocol's routes onto the [`FunctionHost`]:
//!
//! - `GET /api/discovery` - discovery document
//! - `POST /{archive}/{function}` - synchronous invocation (`200`)
//! - `POST /{archive}/{function}?mode=async[&client=ID]` - asynchronous
//!   invocation; responds `201 Created` with the job status to signal
//!   "created, not yet complete"
//! - `GET /{collection}?since=N&clients=a,b&ids=x,y` - collection poll
//! - `POST /{collection}/requests/{id}/cancel` - best-effort cancellation
//!
//! Collection segments accept the `~`-prefixed form used in job navigation
//! links.

use hyper::{Method, StatusCode};
use prodserve_common::protocol::error::ProdserveError;
use prodserve_common::protocol::requests::InvokeRequest;
use prodserve_common::transport::{HttpTransport, HyperResponse};
use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

use crate::host::FunctionHost;

/// HTTP router for a function host.
pub struct HostRouter {
    host: Arc<FunctionHost>,
}

impl HostRouter {
    /// Creates a new router over the given host.
    pub fn new(host: Arc<FunctionHost>) -> Self {
        Self { host }
    }

    /// Handles one HTTP exchange.
    ///
    /// # Arguments
    ///
    /// * `method` - Request method
    /// * `path` - Request path
    /// * `query` - Raw query string, when present
    /// * `body` - Collected request body
    pub async fn handle(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        body: Bytes,
    ) -> HyperResponse {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let query = parse_query(query);

        match segments.as_slice() {
            ["api", "discovery"] if method == Method::GET => self.discovery().await,
            [archive, function] if method == Method::POST => {
                self.invoke(archive, function, &query, body).await
            }
            [collection] if method == Method::GET => {
                self.poll_collection(collection, &query).await
            }
            [collection, "requests", job_id, "cancel"] if method == Method::POST => {
                self.cancel(collection, job_id).await
            }
            _ => HttpTransport::error_response(StatusCode::NOT_FOUND, "no such route"),
        }
    }

    async fn discovery(&self) -> HyperResponse {
        match self.host.discover().await {
            Ok(doc) => HttpTransport::json_response(StatusCode::OK, &doc),
            Err(e) => error_to_response(&e),
        }
    }

    async fn invoke(
        &self,
        archive: &str,
        function: &str,
        query: &HashMap<String, String>,
        body: Bytes,
    ) -> HyperResponse {
        let request: InvokeRequest = match HttpTransport::parse_body(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("malformed invocation body: {e}");
                return HttpTransport::error_response(
                    StatusCode::BAD_REQUEST,
                    format!("malformed request body: {e}"),
                );
            }
        };

        if query.get("mode").map(String::as_str) == Some("async") {
            let client = query.get("client").cloned();
            match self
                .host
                .call_async(archive, function, request, client, None)
                .await
            {
                Ok(status) => HttpTransport::json_response(StatusCode::CREATED, &status),
                Err(e) => error_to_response(&e),
            }
        } else {
            match self.host.call_sync(archive, function, request).await {
                Ok(response) => HttpTransport::json_response(StatusCode::OK, &response),
                Err(e) => error_to_response(&e),
            }
        }
    }

    async fn poll_collection(
        &self,
        collection: &str,
        query: &HashMap<String, String>,
    ) -> HyperResponse {
        // `since` must be present even though matching does not use it.
        if !query.contains_key("since") {
            return error_to_response(&ProdserveError::MissingParameter("since".to_string()));
        }

        let clients = query.get("clients").map(|v| split_list(v));
        let ids = query.get("ids").map(|v| split_list(v));

        match self
            .host
            .query_collection(strip_tilde(collection), clients.as_deref(), ids.as_deref())
            .await
        {
            Ok(response) => HttpTransport::json_response(StatusCode::OK, &response),
            Err(e) => error_to_response(&e),
        }
    }

    async fn cancel(&self, _collection: &str, job_id: &str) -> HyperResponse {
        match self.host.cancel(job_id).await {
            Some(status) => HttpTransport::json_response(StatusCode::OK, &status),
            None => {
                HttpTransport::error_response(StatusCode::NOT_FOUND, format!("no job {job_id}"))
            }
        }
    }
}

/// Maps a protocol error to its HTTP representation.
fn error_to_response(error: &ProdserveError) -> HyperResponse {
    let status = match error {
        ProdserveError::MissingParameter(_)
        | ProdserveError::ArgumentType { .. }
        | ProdserveError::UnsupportedType(_)
        | ProdserveError::JsonSerialization(_) => StatusCode::BAD_REQUEST,
        ProdserveError::UnknownArchive(_)
        | ProdserveError::UnknownFunction { .. }
        | ProdserveError::UnknownCollection(_) => StatusCode::NOT_FOUND,
        ProdserveError::InvalidRegistration { .. }
        | ProdserveError::Execution(_)
        | ProdserveError::Transport(_)
        | ProdserveError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpTransport::error_response(status, error.to_string())
}

/// Parses a query string into a key/value map.
///
/// Values in this protocol are plain tokens (identifiers, numbers,
/// comma-separated lists), so no percent-decoding is applied.
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Some(query) = query else {
        return out;
    };
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) => out.insert(key.to_string(), value.to_string()),
            None => out.insert(pair.to_string(), String::new()),
        };
    }
    out
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Navigation links prefix collection ids with `~`; accept both forms.
fn strip_tilde(collection: &str) -> &str {
    collection.strip_prefix('~').unwrap_or(collection)
}

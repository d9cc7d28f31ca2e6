//! HTTP Transport Utilities
//!
//! This module provides HTTP helpers shared by the server and tests:
//! parsing JSON request bodies and building JSON responses with an explicit
//! status code.
//!
//! # Components
//!
//! - **[`HttpTransport`]**: body parsing and response construction
//! - **[`HyperRequest`]**: type alias for Hyper incoming requests
//! - **[`HyperResponse`]**: type alias for Hyper responses
//!
//! # Example
//!
//! ```
//! use prodserve_common::transport::http::HttpTransport;
//! use prodserve_common::InvokeRequest;
//! use hyper::{body::Bytes, StatusCode};
//!
//! let body = Bytes::from(r#"{"rhs": [41]}"#);
//! let request: InvokeRequest = HttpTransport::parse_body(body).unwrap();
//! let response = HttpTransport::json_response(StatusCode::OK, &request);
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::protocol::error::{ProdserveError, Result};
use crate::protocol::responses::ErrorBody;

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// HTTP transport utility functions.
pub struct HttpTransport;

impl HttpTransport {
    /// Parses a JSON body into the given type.
    ///
    /// # Arguments
    ///
    /// * `body` - Raw HTTP body bytes
    ///
    /// # Returns
    ///
    /// The parsed value, or `ProdserveError::JsonSerialization` when the
    /// body is not valid JSON for the target type.
    pub fn parse_body<T: DeserializeOwned>(body: Bytes) -> Result<T> {
        serde_json::from_slice(&body).map_err(ProdserveError::JsonSerialization)
    }

    /// Builds a JSON HTTP response with the given status code.
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `payload` - Any serializable payload
    pub fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> HyperResponse {
        let body = serde_json::to_vec(payload).unwrap_or_default();

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    /// Builds a JSON error response: `{"error": "..."}` with the given status.
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `message` - Human-readable error description
    pub fn error_response(status: StatusCode, message: impl Into<String>) -> HyperResponse {
        Self::json_response(status, &ErrorBody::new(message))
    }
}

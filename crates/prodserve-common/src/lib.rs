//! Prodserve Common Types and Transport
//!
//! This crate provides the protocol definitions and HTTP transport helpers
//! for prodserve, a function hosting server that speaks the MATLAB
//! Production Server wire protocol.
//!
//! # Overview
//!
//! Prodserve exposes registered, typed functions over HTTP. Clients discover
//! function signatures, invoke them synchronously or asynchronously, and poll
//! asynchronous results by collection. This crate contains the shared pieces
//! used by the server and the CLI:
//!
//! - **Protocol Layer**: wire types, type specs, native values,
//!   request/response shapes and the error taxonomy
//! - **Transport Layer**: helpers for parsing HTTP bodies and building
//!   JSON HTTP responses
//!
//! # Wire Protocol
//!
//! - **Transport**: HTTP/1.1
//! - **Serialization**: JSON
//! - **Value envelope** (`large` output mode): `{mwtype, mwsize, mwdata}`
//! - **Discovery**: `GET /api/discovery` returns per-archive signatures
//!
//! # Components
//!
//! - [`protocol`] - Core protocol types (requests, responses, wire values, errors)
//! - [`transport`] - HTTP transport helpers
//!
//! # Example
//!
//! ```
//! use prodserve_common::{InvokeRequest, OutputMode};
//! use serde_json::json;
//!
//! let request = InvokeRequest::new(vec![json!(41)]).with_nargout(1);
//! assert_eq!(request.output_format.mode, OutputMode::Small);
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;

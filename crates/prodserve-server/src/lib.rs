//! Prodserve Server
//!
//! This crate hosts registered, typed functions behind the MATLAB
//! Production Server wire protocol: discovery, synchronous and asynchronous
//! invocation, and collection polling.
//!
//! # Components
//!
//! - [`marshal`] - type marshalling between native values and wire payloads
//! - [`registry`] - named archives of typed callables with generated schemas
//! - [`engine`] - argument coercion, invocation and result marshalling
//! - [`jobs`] - the asynchronous job tracker and sequence clock
//! - [`host`] - the façade tying registry, engine and tracker together
//! - [`http_router`] / [`http_server`] - the HTTP surface

pub mod engine;
pub mod host;
pub mod http_router;
pub mod http_server;
pub mod jobs;
pub mod limits;
pub mod marshal;
pub mod registry;

pub use host::FunctionHost;
pub use http_server::HttpServer;
pub use jobs::{Job, JobTracker, SequenceClock};
pub use limits::WorkerPoolConfig;
pub use registry::{Callable, FunctionDescriptor, Registry};

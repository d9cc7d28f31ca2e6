//! Function Host
//!
//! The façade tying the registry, execution engine and job tracker together.
//! The HTTP layer talks only to this type; embedders register functions on
//! it and run [`crate::HttpServer`] on top.

use prodserve_common::protocol::error::Result;
use prodserve_common::protocol::requests::InvokeRequest;
use prodserve_common::protocol::responses::{
    CollectionResponse, DiscoveryResponse, InvokeResponse, JobStatus,
};

use crate::engine;
use crate::jobs::JobTracker;
use crate::limits::WorkerPoolConfig;
use crate::registry::{Callable, FunctionDescriptor, Registry};

/// Hosts registered functions and tracks asynchronous invocations.
///
/// # Example
///
/// ```no_run
/// use prodserve_server::{FunctionHost, FunctionDescriptor};
/// use prodserve_common::{TypeSpec, Value, WireType};
/// use std::sync::Arc;
///
/// # async fn demo() {
/// let host = FunctionHost::new();
/// let descriptor = FunctionDescriptor::new("addOne")
///     .param("x", TypeSpec::Scalar(WireType::Int32))
///     .returns(TypeSpec::Scalar(WireType::Int32));
/// host.register_function("math", descriptor, Arc::new(|args| {
///     match args {
///         [Value::Int32(x)] => Ok(vec![Value::Int32(x + 1)]),
///         _ => Err("expected one int32".to_string()),
///     }
/// })).await;
/// # }
/// ```
pub struct FunctionHost {
    registry: Registry,
    tracker: JobTracker,
}

impl FunctionHost {
    /// Creates a host with default worker pool limits.
    pub fn new() -> Self {
        FunctionHost {
            registry: Registry::new(),
            tracker: JobTracker::new(&WorkerPoolConfig::default()),
        }
    }

    /// Creates a host with the given worker pool limits.
    ///
    /// # Errors
    ///
    /// Returns `Transport` when the configuration is invalid.
    pub fn with_config(config: WorkerPoolConfig) -> Result<Self> {
        config
            .validate()
            .map_err(prodserve_common::ProdserveError::Transport)?;
        Ok(FunctionHost {
            registry: Registry::new(),
            tracker: JobTracker::new(&config),
        })
    }

    /// Registers a typed callable under an archive name.
    pub async fn register_function(
        &self,
        archive: &str,
        descriptor: FunctionDescriptor,
        callable: Callable,
    ) {
        self.registry.register(archive, descriptor, callable).await;
    }

    /// Produces the discovery document over all archives.
    pub async fn discover(&self) -> Result<DiscoveryResponse> {
        self.registry.discover().await
    }

    /// Invokes a function synchronously, blocking the caller for the full
    /// duration of the underlying function.
    ///
    /// # Errors
    ///
    /// Lookup misses, coercion failures and callable failures all propagate
    /// to the caller as the call's own failure; there is no partial result.
    pub async fn call_sync(
        &self,
        archive: &str,
        function: &str,
        request: InvokeRequest,
    ) -> Result<InvokeResponse> {
        // Every top-level call advances the sequence clock.
        self.tracker.clock().next();

        let (descriptor, callable) = self.registry.lookup(archive, function).await?;
        let lhs = engine::invoke(
            &descriptor,
            &callable,
            &request.rhs,
            request.nargout,
            &request.output_format,
        )?;
        Ok(InvokeResponse { lhs })
    }

    /// Accepts a function invocation for asynchronous execution.
    ///
    /// The job is created in state `READING` and scheduled on a background
    /// task; the returned status handle is available immediately. Lookup
    /// misses still propagate here, but coercion and execution failures are
    /// recorded on the job as `ERROR`, never returned to this caller.
    pub async fn call_async(
        &self,
        archive: &str,
        function: &str,
        request: InvokeRequest,
        client: Option<String>,
        collection: Option<String>,
    ) -> Result<JobStatus> {
        let (descriptor, callable) = self.registry.lookup(archive, function).await?;

        let job = self.tracker.create(client, collection).await;
        let status = job.status();
        self.tracker.spawn_execution(
            job,
            descriptor,
            callable,
            request.rhs,
            request.nargout,
            request.output_format,
        );
        Ok(status)
    }

    /// Polls a collection. See [`JobTracker::query`].
    pub async fn query_collection(
        &self,
        collection: &str,
        clients: Option<&[String]>,
        ids: Option<&[String]>,
    ) -> Result<CollectionResponse> {
        self.tracker.query(collection, clients, ids).await
    }

    /// Cancels a job by identifier. Returns `None` for an unknown job.
    pub async fn cancel(&self, job_id: &str) -> Option<JobStatus> {
        self.tracker.cancel(job_id).await
    }

    /// The job tracker, exposed for embedders that poll jobs directly.
    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }
}

impl Default for FunctionHost {
    fn default() -> Self {
        Self::new()
    }
}

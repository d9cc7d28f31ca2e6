//! Job Tracker
//!
//! Manages the lifecycle of asynchronous invocations: creation, execution on
//! a background task, state transitions and collection polling. Every
//! state-changing event is stamped with a value from the process-wide
//! [`SequenceClock`] so pollers can detect what changed since they last
//! looked.
//!
//! # State machine
//!
//! `READING -> PROCESSING -> {READY | ERROR}`, with `CANCELLED` reachable
//! from any state. Cancellation is best-effort: a job cancelled while still
//! queued never runs, but a cancel landing mid-execution does not stop the
//! task, whose `READY`/`ERROR` stamp then overwrites the cancelled state.
//!
//! # Concurrency
//!
//! The clock is a single atomic counter, so no two transitions anywhere in
//! the process ever report the same sequence value. The job tables live
//! behind `tokio::sync::RwLock`; per-job mutable state sits behind a
//! `std::sync::Mutex` with short critical sections. Execution tasks are
//! gated by a semaphore sized from [`WorkerPoolConfig`]; excess jobs queue.
//!
//! Jobs are never evicted for the life of the process. That is an explicit
//! scope boundary of the protocol, and a known scaling limitation.

use prodserve_common::protocol::error::{ProdserveError, Result};
use prodserve_common::protocol::requests::OutputFormat;
use prodserve_common::protocol::responses::{CollectionResponse, JobState, JobStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{RwLock, Semaphore};
use uuid::Uuid;

use crate::engine;
use crate::limits::WorkerPoolConfig;
use crate::registry::{Callable, FunctionDescriptor};

/// The single monotonically increasing counter stamped onto every
/// state-changing event and top-level call.
///
/// `next` is an atomic increment-and-read, so two transitions anywhere in
/// the system never report the same value.
pub struct SequenceClock {
    counter: AtomicU64,
}

impl SequenceClock {
    pub fn new() -> Self {
        SequenceClock {
            counter: AtomicU64::new(0),
        }
    }

    /// Increments the clock and returns the new value.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reads the current value without advancing it.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for SequenceClock {
    fn default() -> Self {
        Self::new()
    }
}

struct JobInner {
    state: JobState,
    result: Vec<serde_json::Value>,
    last_modified_seq: u64,
}

/// A tracked asynchronous invocation.
///
/// Mutated only by its own execution task and by explicit cancellation.
pub struct Job {
    pub id: String,
    pub collection: String,
    pub client: String,
    inner: Mutex<JobInner>,
}

impl Job {
    fn new(collection: String, client: String, seq: u64) -> Self {
        Job {
            id: Uuid::new_v4().simple().to_string(),
            collection,
            client,
            inner: Mutex::new(JobInner {
                state: JobState::Reading,
                result: Vec::new(),
                last_modified_seq: seq,
            }),
        }
    }

    pub fn state(&self) -> JobState {
        self.inner.lock().unwrap().state
    }

    pub fn last_modified_seq(&self) -> u64 {
        self.inner.lock().unwrap().last_modified_seq
    }

    /// The marshalled result list, present once the job is `READY`.
    pub fn result(&self) -> Option<Vec<serde_json::Value>> {
        let inner = self.inner.lock().unwrap();
        if inner.state == JobState::Ready {
            Some(inner.result.clone())
        } else {
            None
        }
    }

    /// Status view for polling. Never includes the result payload.
    pub fn status(&self) -> JobStatus {
        let inner = self.inner.lock().unwrap();
        JobStatus {
            id: self.id.clone(),
            self_link: format!("/~{}/requests/{}", self.collection, self.id),
            up: format!("/~{}/requests", self.collection),
            last_modified_seq: inner.last_modified_seq,
            state: inner.state,
            client: self.client.clone(),
        }
    }

    fn transition(&self, state: JobState, seq: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = state;
        inner.last_modified_seq = seq;
    }

    fn complete(&self, result: Vec<serde_json::Value>, seq: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.result = result;
        inner.state = JobState::Ready;
        inner.last_modified_seq = seq;
    }
}

/// Tracks all asynchronous invocations, grouped into collections.
pub struct JobTracker {
    clock: Arc<SequenceClock>,
    collections: RwLock<HashMap<String, Vec<Arc<Job>>>>,
    jobs: RwLock<HashMap<String, Arc<Job>>>,
    permits: Arc<Semaphore>,
}

impl JobTracker {
    pub fn new(config: &WorkerPoolConfig) -> Self {
        JobTracker {
            clock: Arc::new(SequenceClock::new()),
            collections: RwLock::new(HashMap::new()),
            jobs: RwLock::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
        }
    }

    pub fn clock(&self) -> &SequenceClock {
        &self.clock
    }

    /// Allocates a job in state `READING` and appends it to its collection.
    ///
    /// The clock advances once for the accepting call and the new value is
    /// stamped onto the job. A fresh collection identifier is generated when
    /// the caller does not request grouping. Returns immediately; execution
    /// is scheduled separately via [`JobTracker::spawn_execution`].
    pub async fn create(&self, client: Option<String>, collection: Option<String>) -> Arc<Job> {
        let seq = self.clock.next();
        let collection = collection.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let job = Arc::new(Job::new(collection, client.unwrap_or_default(), seq));

        self.collections
            .write()
            .await
            .entry(job.collection.clone())
            .or_default()
            .push(job.clone());
        self.jobs
            .write()
            .await
            .insert(job.id.clone(), job.clone());

        tracing::debug!(job = %job.id, collection = %job.collection, "job created");
        job
    }

    /// Runs the invocation on a background task.
    ///
    /// The task waits for a worker permit (queueing, not rejecting), then
    /// drives `READING -> PROCESSING -> {READY | ERROR}`, stamping a fresh
    /// sequence value on each transition. A failure is recorded as `ERROR`
    /// only; the detail goes to the log, never the client-visible record.
    /// The caller is never blocked.
    pub fn spawn_execution(
        &self,
        job: Arc<Job>,
        descriptor: FunctionDescriptor,
        callable: Callable,
        rhs: Vec<serde_json::Value>,
        nargout: i32,
        format: OutputFormat,
    ) {
        let clock = self.clock.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed while the tracker lives.
                Err(_) => return,
            };

            // A job cancelled while queued never runs.
            if job.state() != JobState::Reading {
                return;
            }

            job.transition(JobState::Processing, clock.next());

            match engine::invoke(&descriptor, &callable, &rhs, nargout, &format) {
                Ok(lhs) => {
                    job.complete(lhs, clock.next());
                    tracing::debug!(job = %job.id, "job ready");
                }
                Err(e) => {
                    tracing::warn!(job = %job.id, function = %descriptor.name,
                        "async invocation failed: {e}");
                    job.transition(JobState::Error, clock.next());
                }
            }
        });
    }

    /// Unconditionally flips a job to `CANCELLED` and stamps a new sequence
    /// value. Best-effort: a running callable is not interrupted, and a job
    /// that already finished keeps its recorded outcome apart from the state
    /// field.
    pub async fn cancel(&self, job_id: &str) -> Option<JobStatus> {
        let job = self.jobs.read().await.get(job_id).cloned()?;
        job.transition(JobState::Cancelled, self.clock.next());
        tracing::debug!(job = %job.id, "job cancelled");
        Some(job.status())
    }

    /// Polls a collection for matching job statuses.
    ///
    /// A job matches when its identifier is in `ids` **or** its client
    /// identifier is in `clients` (OR across the two filters). At least one
    /// filter must be supplied.
    ///
    /// # Errors
    ///
    /// `MissingParameter` when neither filter is present, `UnknownCollection`
    /// when no job was ever created under `collection`.
    pub async fn query(
        &self,
        collection: &str,
        clients: Option<&[String]>,
        ids: Option<&[String]>,
    ) -> Result<CollectionResponse> {
        if clients.is_none() && ids.is_none() {
            return Err(ProdserveError::MissingParameter(
                "clients or ids".to_string(),
            ));
        }

        let collections = self.collections.read().await;
        let jobs = collections
            .get(collection)
            .ok_or_else(|| ProdserveError::UnknownCollection(collection.to_string()))?;

        let matches = |job: &Job| {
            ids.is_some_and(|ids| ids.iter().any(|id| *id == job.id))
                || clients.is_some_and(|clients| clients.iter().any(|c| *c == job.client))
        };

        let data = jobs
            .iter()
            .filter(|job| matches(job))
            .map(|job| job.status())
            .collect();

        Ok(CollectionResponse {
            created_seq: self.clock.current(),
            data,
        })
    }
}

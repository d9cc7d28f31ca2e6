//! Response shapes: invocation results, job status views and discovery
//! documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::wire::{WireShape, WireType};

/// Response to a synchronous invocation: the ordered result list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvokeResponse {
    pub lhs: Vec<serde_json::Value>,
}

/// Lifecycle state of an asynchronous invocation.
///
/// `READING -> PROCESSING -> {READY | ERROR}`, with `CANCELLED` reachable
/// from the non-terminal states. `READY`, `ERROR` and `CANCELLED` are
/// terminal. All states are client-visible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Reading,
    Processing,
    Ready,
    Error,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Ready | JobState::Error | JobState::Cancelled)
    }
}

/// Status view of an asynchronous invocation.
///
/// This is the polling-friendly record: it never carries the result payload.
/// `self` and `up` are navigation links built from the collection and job
/// identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    /// Globally unique job identifier
    pub id: String,
    /// Link to this job: `/~{collection}/requests/{id}`
    #[serde(rename = "self")]
    pub self_link: String,
    /// Link to the owning collection: `/~{collection}/requests`
    pub up: String,
    /// Sequence value stamped on the last state transition
    #[serde(rename = "lastModifiedSeq")]
    pub last_modified_seq: u64,
    /// Current lifecycle state
    pub state: JobState,
    /// Client identifier supplied at creation, empty when absent
    pub client: String,
}

impl JobStatus {
    /// Extracts the collection identifier from the `up` link.
    pub fn collection(&self) -> &str {
        self.up
            .trim_start_matches("/~")
            .trim_end_matches("/requests")
    }
}

/// Response to a collection poll: the sequence value at response time plus
/// the matching job statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionResponse {
    #[serde(rename = "createdSeq")]
    pub created_seq: u64,
    pub data: Vec<JobStatus>,
}

/// One input or output slot in a function signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignaturePort {
    pub name: String,
    pub mwtype: WireType,
    pub mwsize: WireShape,
}

/// A function signature: documentation plus ordered inputs and outputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signature {
    pub help: Option<String>,
    pub inputs: Vec<SignaturePort>,
    pub outputs: Vec<SignaturePort>,
}

/// Discovery entry for one function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionSchema {
    pub signatures: Vec<Signature>,
}

/// Discovery entry for one archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveSchema {
    #[serde(rename = "archiveSchemaVersion")]
    pub archive_schema_version: String,
    #[serde(rename = "archiveUuid")]
    pub archive_uuid: String,
    pub functions: BTreeMap<String, FunctionSchema>,
    #[serde(rename = "matlabRuntimeVersion")]
    pub matlab_runtime_version: String,
}

/// Top-level discovery document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryResponse {
    #[serde(rename = "discoverySchemaVersion")]
    pub discovery_schema_version: String,
    pub archives: BTreeMap<String, ArchiveSchema>,
}

/// JSON body of an error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorBody {
            error: error.into(),
        }
    }
}

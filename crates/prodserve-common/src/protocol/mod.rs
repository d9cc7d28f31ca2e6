pub mod error;
pub mod requests;
pub mod responses;
pub mod wire;


pub use error::{ProdserveError, Result};
pub use requests::{InvokeRequest, NanInfFormat, OutputFormat, OutputMode};
pub use responses::{
    ArchiveSchema, CollectionResponse, DiscoveryResponse, ErrorBody, FunctionSchema,
    InvokeResponse, JobState, JobStatus, Signature, SignaturePort,
};
pub use wire::{Dim, TypeSpec, Value, WireShape, WireType};

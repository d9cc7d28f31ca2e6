//! Function Registry
//!
//! Holds named, typed callables grouped into archives. An archive is created
//! lazily on first registration under its name and lives for the process
//! lifetime. Each archive carries a generated identifier (name prefix plus a
//! random component, stable for the process) and can produce a discovery
//! schema for all of its functions.

use prodserve_common::protocol::error::{ProdserveError, Result};
use prodserve_common::protocol::responses::{
    ArchiveSchema, DiscoveryResponse, FunctionSchema, Signature, SignaturePort,
};
use prodserve_common::protocol::wire::{TypeSpec, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const SCHEMA_VERSION: &str = "1.0.0";

/// A registered function body.
///
/// Callables receive the coerced positional arguments and return an ordered
/// result sequence; their error channel is caught by the execution engine
/// and never unwinds past it.
pub type Callable = Arc<dyn Fn(&[Value]) -> std::result::Result<Vec<Value>, String> + Send + Sync>;

/// Typed signature of a registered function.
///
/// Immutable once registered. Every parameter and return value carries a
/// declared type; the declared types drive both discovery schemas and
/// argument coercion.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub params: Vec<(String, TypeSpec)>,
    pub returns: Vec<TypeSpec>,
    pub help: Option<String>,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionDescriptor {
            name: name.into(),
            params: Vec::new(),
            returns: Vec::new(),
            help: None,
        }
    }

    /// Appends a declared parameter. Order is declaration order.
    pub fn param(mut self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.params.push((name.into(), spec));
        self
    }

    /// Appends a declared return value.
    pub fn returns(mut self, spec: TypeSpec) -> Self {
        self.returns.push(spec);
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }
}

struct RegisteredFunction {
    descriptor: FunctionDescriptor,
    callable: Callable,
}

struct Archive {
    uuid: String,
    functions: HashMap<String, RegisteredFunction>,
}

/// Process-wide table of archives.
///
/// All mutation happens behind a `tokio::sync::RwLock`, so registration,
/// lookup and discovery are safe under concurrent requests and background
/// execution tasks.
pub struct Registry {
    archives: RwLock<HashMap<String, Archive>>,
    runtime_version: String,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            archives: RwLock::new(HashMap::new()),
            runtime_version: format!("rust-{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Registers a callable under `archive_name`.
    ///
    /// The archive is created on first use. Re-registering an existing
    /// function name overwrites the previous descriptor and callable.
    pub async fn register(
        &self,
        archive_name: &str,
        descriptor: FunctionDescriptor,
        callable: Callable,
    ) {
        let mut archives = self.archives.write().await;
        let archive = archives
            .entry(archive_name.to_string())
            .or_insert_with(|| Archive {
                uuid: generate_archive_uuid(archive_name),
                functions: HashMap::new(),
            });

        tracing::info!(
            archive = archive_name,
            function = %descriptor.name,
            "registered function"
        );

        archive.functions.insert(
            descriptor.name.clone(),
            RegisteredFunction {
                descriptor,
                callable,
            },
        );
    }

    /// Resolves a function for invocation.
    pub async fn lookup(
        &self,
        archive_name: &str,
        function_name: &str,
    ) -> Result<(FunctionDescriptor, Callable)> {
        let archives = self.archives.read().await;
        let archive = archives
            .get(archive_name)
            .ok_or_else(|| ProdserveError::UnknownArchive(archive_name.to_string()))?;
        let function =
            archive
                .functions
                .get(function_name)
                .ok_or_else(|| ProdserveError::UnknownFunction {
                    archive: archive_name.to_string(),
                    function: function_name.to_string(),
                })?;
        Ok((function.descriptor.clone(), function.callable.clone()))
    }

    /// Produces the discovery schema for one archive.
    ///
    /// Fails with `UnknownArchive` when the archive was never registered and
    /// with `InvalidRegistration` when a function declares no return types;
    /// the missing-annotation fault is only fatal when a schema must be
    /// produced.
    pub async fn describe_archive(&self, archive_name: &str) -> Result<ArchiveSchema> {
        let archives = self.archives.read().await;
        let archive = archives
            .get(archive_name)
            .ok_or_else(|| ProdserveError::UnknownArchive(archive_name.to_string()))?;
        Self::schema_of(archive_name, archive, &self.runtime_version)
    }

    /// Produces the full discovery document over all archives.
    pub async fn discover(&self) -> Result<DiscoveryResponse> {
        let archives = self.archives.read().await;
        let mut out = BTreeMap::new();
        for (name, archive) in archives.iter() {
            out.insert(
                name.clone(),
                Self::schema_of(name, archive, &self.runtime_version)?,
            );
        }
        Ok(DiscoveryResponse {
            discovery_schema_version: SCHEMA_VERSION.to_string(),
            archives: out,
        })
    }

    fn schema_of(
        archive_name: &str,
        archive: &Archive,
        runtime_version: &str,
    ) -> Result<ArchiveSchema> {
        let mut functions = BTreeMap::new();
        for (name, function) in archive.functions.iter() {
            functions.insert(name.clone(), signature_of(archive_name, &function.descriptor)?);
        }
        Ok(ArchiveSchema {
            archive_schema_version: SCHEMA_VERSION.to_string(),
            archive_uuid: archive.uuid.clone(),
            functions,
            matlab_runtime_version: runtime_version.to_string(),
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// One signature per function: ordered input descriptors from the declared
/// parameters and outputs named `out1, out2, …` from the declared returns.
fn signature_of(archive_name: &str, descriptor: &FunctionDescriptor) -> Result<FunctionSchema> {
    if descriptor.returns.is_empty() {
        return Err(ProdserveError::InvalidRegistration {
            archive: archive_name.to_string(),
            function: descriptor.name.clone(),
            reason: "return type must be declared".to_string(),
        });
    }

    let inputs = descriptor
        .params
        .iter()
        .map(|(name, spec)| {
            let (mwtype, mwsize) = crate::marshal::describe(spec);
            SignaturePort {
                name: name.clone(),
                mwtype,
                mwsize,
            }
        })
        .collect();

    let outputs = descriptor
        .returns
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let (mwtype, mwsize) = crate::marshal::describe(spec);
            SignaturePort {
                name: format!("out{}", i + 1),
                mwtype,
                mwsize,
            }
        })
        .collect();

    Ok(FunctionSchema {
        signatures: vec![Signature {
            help: descriptor.help.clone(),
            inputs,
            outputs,
        }],
    })
}

/// Archive identifier: first 12 characters of the name plus a random
/// component, generated once per process lifetime.
fn generate_archive_uuid(name: &str) -> String {
    let prefix: String = name.chars().take(12).collect();
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

//! # prodserve CLI Entry Point
//!
//! Main binary for the prodserve function hosting server. Provides a
//! command-line interface for running a server with the built-in demo
//! archive and for invoking hosted functions.
//!
//! ## Usage
//!
//! ```bash
//! # Start a server with the demo archive
//! prodserve serve -b 0.0.0.0:9910
//!
//! # Start a server with a smaller worker pool
//! prodserve serve -b 0.0.0.0:9910 --max-concurrent-jobs 8
//!
//! # Invoke a function synchronously (outputs raw JSON)
//! prodserve call http://127.0.0.1:9910 math addOne --args '[41]'
//!
//! # Fetch the discovery document
//! prodserve discover http://127.0.0.1:9910
//! ```
//!
//! ## URL Format
//!
//! All server URLs must include the `http://` or `https://` prefix.

use anyhow::Result;
use argh::FromArgs;
use std::net::SocketAddr;
use std::sync::Arc;

use prodserve_common::{TypeSpec, Value, WireType};
use prodserve_server::{
    Callable, FunctionDescriptor, FunctionHost, HttpServer, WorkerPoolConfig,
};

/// Validates that a URL string starts with http:// or https://
///
/// # Errors
///
/// Returns an error if the URL doesn't start with http:// or https://
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

/// Main CLI structure parsed from command-line arguments.
///
/// Uses `argh` for declarative argument parsing. The top-level command
/// dispatches to one of the subcommands: serve, call, or discover.
#[derive(FromArgs)]
/// prodserve - HTTP function hosting server
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Serve**: Run a server hosting the built-in demo archive
/// - **Call**: Invoke a function synchronously (unix-friendly JSON output)
/// - **Discover**: Fetch a server's discovery document
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
    Discover(DiscoverArgs),
}

/// Arguments for running a prodserve server.
///
/// The server hosts the built-in `math` demo archive and exposes the full
/// HTTP surface: discovery, synchronous and asynchronous invocation,
/// collection polling and cancellation.
///
/// # Example
///
/// ```bash
/// prodserve serve -b 0.0.0.0:9910 --max-concurrent-jobs 8
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// run a prodserve server
struct ServeArgs {
    /// address to bind the HTTP server to
    ///
    /// Defaults to "0.0.0.0:9910". The actual bound address is logged at
    /// startup.
    #[argh(option, short = 'b', default = "\"0.0.0.0:9910\".into()")]
    bind: String,

    /// maximum number of concurrently executing asynchronous jobs
    ///
    /// Jobs beyond the limit queue in creation order. Defaults to 32.
    /// Must be between 1 and 4096.
    #[argh(option, long = "max-concurrent-jobs", default = "32")]
    max_concurrent_jobs: usize,
}

/// Arguments for invoking a hosted function.
///
/// The `call` command makes one synchronous invocation and outputs the
/// result as raw JSON to stdout, suitable for piping to `jq` and friends.
///
/// # Examples
///
/// ```bash
/// # Call with a single argument
/// prodserve call http://127.0.0.1:9910 math addOne --args '[41]'
///
/// # Request the large output format
/// prodserve call http://127.0.0.1:9910 math hypot -a '[3, 4]' --large
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// invoke a hosted function synchronously
struct CallArgs {
    /// address of the server to call
    ///
    /// Must include the http:// or https:// prefix (e.g., http://127.0.0.1:9910).
    #[argh(positional)]
    server_address: String,

    /// name of the archive containing the function
    #[argh(positional)]
    archive: String,

    /// name of the function to invoke
    #[argh(positional)]
    function: String,

    /// JSON array of positional arguments
    ///
    /// Must be a valid JSON array. Defaults to `[]`.
    #[argh(option, short = 'a', long = "args", default = "\"[]\".into()")]
    args: String,

    /// request the large output format (typed envelopes)
    #[argh(switch, long = "large")]
    large: bool,
}

/// Arguments for fetching a server's discovery document.
#[derive(FromArgs)]
#[argh(subcommand, name = "discover")]
/// fetch a server's discovery document
struct DiscoverArgs {
    /// address of the server to query
    ///
    /// Must include the http:// or https:// prefix (e.g., http://127.0.0.1:9910).
    #[argh(positional)]
    server_address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Initialize tracing only for the serve command; call and discover keep
    // stdout clean for unix tool usage (piping to jq, etc.)
    if matches!(cli.command, Commands::Serve(_)) {
        // Set default log level to INFO, but allow RUST_LOG env var to override
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Call(args) => run_call(args).await,
        Commands::Discover(args) => run_discover(args).await,
    }
}

/// Executes the `serve` subcommand.
async fn run_serve(args: ServeArgs) -> Result<()> {
    tracing::info!("Starting prodserve server");
    tracing::info!("Binding to: {}", args.bind);
    tracing::info!("Maximum concurrent jobs: {}", args.max_concurrent_jobs);

    let config = WorkerPoolConfig::new().with_max_concurrent_jobs(args.max_concurrent_jobs);
    let host = FunctionHost::with_config(config)?;
    register_demo_archive(&host).await;

    let addr: SocketAddr = args
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", args.bind, e))?;

    let server = HttpServer::new(Arc::new(host));
    server.run(addr).await?;

    Ok(())
}

/// Executes the `call` subcommand.
///
/// No tracing/logging is initialized for this command to keep output clean
/// for unix tool usage.
///
/// # Errors
///
/// Returns an error if:
/// - The args string is not a valid JSON array
/// - The connection to the server fails
/// - The invocation itself fails (the server's error body is surfaced)
async fn run_call(args: CallArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;

    let rhs: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in args: {}", e))?;
    if !rhs.is_array() {
        return Err(anyhow::anyhow!("args must be a JSON array, got: {}", rhs));
    }

    let mut body = serde_json::json!({ "rhs": rhs });
    if args.large {
        body["outputFormat"] = serde_json::json!({"mode": "large", "nanInfFormat": "string"});
    }

    let client = reqwest::Client::new();
    let response = client
        .post(format!(
            "{}/{}/{}",
            args.server_address.trim_end_matches('/'),
            args.archive,
            args.function
        ))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let result: serde_json::Value = response.json().await?;
    if !status.is_success() {
        return Err(anyhow::anyhow!(
            "server returned {}: {}",
            status,
            result["error"].as_str().unwrap_or("unknown error")
        ));
    }

    // Output raw JSON to stdout
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}

/// Executes the `discover` subcommand.
async fn run_discover(args: DiscoverArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;

    let client = reqwest::Client::new();
    let result: serde_json::Value = client
        .get(format!(
            "{}/api/discovery",
            args.server_address.trim_end_matches('/')
        ))
        .send()
        .await?
        .json()
        .await?;

    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}

/// Registers the built-in `math` demo archive.
///
/// The demo functions exercise the interesting marshalling paths: scalar
/// integers, double arrays and multiple return values.
async fn register_demo_archive(host: &FunctionHost) {
    let add_one = FunctionDescriptor::new("addOne")
        .param("x", TypeSpec::Scalar(WireType::Int32))
        .returns(TypeSpec::Scalar(WireType::Int32))
        .help("Adds one to x.");
    let add_one_fn: Callable = Arc::new(|args| match args {
        [Value::Int32(x)] => Ok(vec![Value::Int32(x + 1)]),
        _ => Err("expected one int32".to_string()),
    });
    host.register_function("math", add_one, add_one_fn).await;

    let hypot = FunctionDescriptor::new("hypot")
        .param("a", TypeSpec::Scalar(WireType::Double))
        .param("b", TypeSpec::Scalar(WireType::Double))
        .returns(TypeSpec::Scalar(WireType::Double))
        .help("Euclidean distance sqrt(a^2 + b^2).");
    let hypot_fn: Callable = Arc::new(|args| match args {
        [Value::Double(a), Value::Double(b)] => Ok(vec![Value::Double(a.hypot(*b))]),
        _ => Err("expected two doubles".to_string()),
    });
    host.register_function("math", hypot, hypot_fn).await;

    let min_max = FunctionDescriptor::new("minMax")
        .param(
            "xs",
            TypeSpec::Array {
                elem: WireType::Double,
                shape: vec![1, 0],
            },
        )
        .returns(TypeSpec::Scalar(WireType::Double))
        .returns(TypeSpec::Scalar(WireType::Double))
        .help("Smallest and largest element of xs.");
    let min_max_fn: Callable = Arc::new(|args| match args {
        [Value::Array { data, .. }] if !data.is_empty() => {
            let xs: Vec<f64> = data
                .iter()
                .map(|v| match v {
                    Value::Double(f) => Ok(*f),
                    _ => Err("expected a double array".to_string()),
                })
                .collect::<std::result::Result<_, _>>()?;
            let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            Ok(vec![Value::Double(min), Value::Double(max)])
        }
        _ => Err("expected one non-empty double array".to_string()),
    });
    host.register_function("math", min_max, min_max_fn).await;
}

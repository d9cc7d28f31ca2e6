//! Invocation request shapes.

use serde::{Deserialize, Serialize};

/// Body of a function invocation (synchronous or asynchronous).
///
/// `rhs` is the ordered argument list. `nargout` limits how many outputs are
/// returned; the default `-1` means "all". `outputFormat` controls how
/// results are marshalled onto the wire.
///
/// # Example
///
/// ```
/// use prodserve_common::{InvokeRequest, OutputFormat, OutputMode};
/// use serde_json::json;
///
/// let request = InvokeRequest::new(vec![json!(41)])
///     .with_output_format(OutputFormat::large());
/// assert_eq!(request.nargout, -1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvokeRequest {
    /// Ordered positional arguments
    pub rhs: Vec<serde_json::Value>,
    /// Requested output count; `-1` returns all outputs
    #[serde(default = "default_nargout")]
    pub nargout: i32,
    /// Output marshalling options
    #[serde(default, rename = "outputFormat")]
    pub output_format: OutputFormat,
}

fn default_nargout() -> i32 {
    -1
}

impl InvokeRequest {
    pub fn new(rhs: Vec<serde_json::Value>) -> Self {
        InvokeRequest {
            rhs,
            nargout: default_nargout(),
            output_format: OutputFormat::default(),
        }
    }

    pub fn with_nargout(mut self, nargout: i32) -> Self {
        self.nargout = nargout;
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }
}

/// Output marshalling options carried by an invocation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputFormat {
    /// Result rendering mode
    pub mode: OutputMode,
    /// Rendering policy for NaN and infinite values
    #[serde(rename = "nanInfFormat")]
    pub nan_inf_format: NanInfFormat,
}

impl OutputFormat {
    /// Convenience constructor for `{"mode": "large"}`.
    pub fn large() -> Self {
        OutputFormat {
            mode: OutputMode::Large,
            nan_inf_format: NanInfFormat::default(),
        }
    }
}

/// Result rendering mode.
///
/// `small` produces a flat sequence of scalars per result, with no envelope;
/// the wire type is implied by the discovery schema. `large` wraps each
/// result in a `{mwtype, mwsize, mwdata}` envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Small,
    Large,
}

/// Rendering policy for NaN/Inf values.
///
/// Accepted as configuration and carried through to the marshaller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NanInfFormat {
    #[default]
    String,
    Object,
}

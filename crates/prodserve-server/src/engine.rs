//! Execution Engine
//!
//! Validates and invokes a callable with positional arguments: each argument
//! is coerced to its declared type, the callable runs, and the results are
//! marshalled per the requested output format. A failing callable is reported
//! as an `Execution` error and never unwinds past the engine.

use prodserve_common::protocol::error::{ProdserveError, Result};
use prodserve_common::protocol::requests::OutputFormat;
use prodserve_common::protocol::wire::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::marshal;
use crate::registry::{Callable, FunctionDescriptor};

/// Invokes a registered function with raw JSON arguments.
///
/// # Arguments
///
/// * `descriptor` - The function's declared signature
/// * `callable` - The function body
/// * `rhs` - Ordered positional arguments
/// * `nargout` - Requested output count; negative means "all". Requesting
///   more outputs than the function returns is not validated here.
/// * `format` - Output marshalling options
///
/// # Returns
///
/// The ordered, marshalled result sequence (one wire value per result).
///
/// # Errors
///
/// `ArgumentType` when an argument cannot be coerced to its declared type,
/// `Execution` when the callable itself fails or panics.
pub fn invoke(
    descriptor: &FunctionDescriptor,
    callable: &Callable,
    rhs: &[serde_json::Value],
    nargout: i32,
    format: &OutputFormat,
) -> Result<Vec<serde_json::Value>> {
    if rhs.len() < descriptor.params.len() {
        let (missing, _) = &descriptor.params[rhs.len()];
        return Err(ProdserveError::argument(missing, "missing argument"));
    }
    if rhs.len() > descriptor.params.len() {
        return Err(ProdserveError::argument(
            format!("arg{}", descriptor.params.len() + 1),
            format!(
                "function takes {} argument(s), got {}",
                descriptor.params.len(),
                rhs.len()
            ),
        ));
    }

    let args = rhs
        .iter()
        .zip(descriptor.params.iter())
        .map(|(arg, (name, spec))| marshal::coerce(arg, spec, name))
        .collect::<Result<Vec<Value>>>()?;

    // The callable's own failure channel is its Result; a panic is caught
    // as well so a misbehaving function cannot take the engine down.
    let results = match catch_unwind(AssertUnwindSafe(|| callable(&args))) {
        Ok(Ok(results)) => results,
        Ok(Err(message)) => return Err(ProdserveError::Execution(message)),
        Err(_) => {
            return Err(ProdserveError::Execution(format!(
                "function '{}' panicked",
                descriptor.name
            )))
        }
    };

    let results = if nargout >= 0 {
        results.into_iter().take(nargout as usize).collect()
    } else {
        results
    };

    Ok(results
        .iter()
        .map(|value| marshal::to_wire(value, format))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodserve_common::protocol::requests::OutputMode;
    use prodserve_common::protocol::wire::{TypeSpec, WireType};
    use serde_json::json;
    use std::sync::Arc;

    fn add_one() -> (FunctionDescriptor, Callable) {
        let descriptor = FunctionDescriptor::new("addOne")
            .param("x", TypeSpec::Scalar(WireType::Int32))
            .returns(TypeSpec::Scalar(WireType::Int32));
        let callable: Callable = Arc::new(|args| match args {
            [Value::Int32(x)] => Ok(vec![Value::Int32(x + 1)]),
            _ => Err("expected one int32".to_string()),
        });
        (descriptor, callable)
    }

    fn min_max() -> (FunctionDescriptor, Callable) {
        let descriptor = FunctionDescriptor::new("minMax")
            .param(
                "xs",
                TypeSpec::Array {
                    elem: WireType::Double,
                    shape: vec![1, 4],
                },
            )
            .returns(TypeSpec::Scalar(WireType::Double))
            .returns(TypeSpec::Scalar(WireType::Double));
        let callable: Callable = Arc::new(|args| match args {
            [Value::Array { data, .. }] => {
                let xs: Vec<f64> = data
                    .iter()
                    .map(|v| match v {
                        Value::Double(f) => *f,
                        _ => 0.0,
                    })
                    .collect();
                let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                Ok(vec![Value::Double(min), Value::Double(max)])
            }
            _ => Err("expected one array".to_string()),
        });
        (descriptor, callable)
    }

    #[test]
    fn test_add_one_small_mode() {
        let (descriptor, callable) = add_one();
        let lhs = invoke(
            &descriptor,
            &callable,
            &[json!(41)],
            -1,
            &OutputFormat::default(),
        )
        .unwrap();
        assert_eq!(lhs, vec![json!([42])]);
    }

    #[test]
    fn test_result_count_without_nargout() {
        let (descriptor, callable) = min_max();
        let lhs = invoke(
            &descriptor,
            &callable,
            &[json!([3, 1, 4, 1])],
            -1,
            &OutputFormat::default(),
        )
        .unwrap();
        assert_eq!(lhs.len(), 2);
        assert_eq!(lhs[0], json!([1.0]));
        assert_eq!(lhs[1], json!([4.0]));
    }

    #[test]
    fn test_nargout_truncates() {
        let (descriptor, callable) = min_max();
        let lhs = invoke(
            &descriptor,
            &callable,
            &[json!([3, 1, 4, 1])],
            1,
            &OutputFormat::default(),
        )
        .unwrap();
        assert_eq!(lhs.len(), 1);
    }

    #[test]
    fn test_nargout_above_return_count_is_allowed() {
        let (descriptor, callable) = min_max();
        let lhs = invoke(
            &descriptor,
            &callable,
            &[json!([3, 1, 4, 1])],
            5,
            &OutputFormat::default(),
        )
        .unwrap();
        // Returning fewer elements than requested is allowed.
        assert_eq!(lhs.len(), 2);
    }

    #[test]
    fn test_large_mode_envelope() {
        let (descriptor, callable) = add_one();
        let lhs = invoke(
            &descriptor,
            &callable,
            &[json!(41)],
            -1,
            &OutputFormat::large(),
        )
        .unwrap();
        assert_eq!(lhs[0]["mwtype"], json!("int32"));
        assert_eq!(lhs[0]["mwsize"], json!([1, 1]));
        assert_eq!(lhs[0]["mwdata"], json!([42]));
    }

    #[test]
    fn test_coercion_failure_names_parameter() {
        let (descriptor, callable) = add_one();
        let err = invoke(
            &descriptor,
            &callable,
            &[json!([1, 2])],
            -1,
            &OutputFormat::default(),
        )
        .unwrap_err();
        match err {
            ProdserveError::ArgumentType { parameter, .. } => assert_eq!(parameter, "x"),
            other => panic!("expected ArgumentType, got {other}"),
        }
    }

    #[test]
    fn test_missing_argument() {
        let (descriptor, callable) = add_one();
        let err = invoke(&descriptor, &callable, &[], -1, &OutputFormat::default()).unwrap_err();
        match err {
            ProdserveError::ArgumentType { parameter, reason } => {
                assert_eq!(parameter, "x");
                assert_eq!(reason, "missing argument");
            }
            other => panic!("expected ArgumentType, got {other}"),
        }
    }

    #[test]
    fn test_extra_argument() {
        let (descriptor, callable) = add_one();
        let err = invoke(
            &descriptor,
            &callable,
            &[json!(1), json!(2)],
            -1,
            &OutputFormat::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ProdserveError::ArgumentType { .. }));
    }

    #[test]
    fn test_callable_error_becomes_execution_error() {
        let descriptor = FunctionDescriptor::new("broken")
            .returns(TypeSpec::Scalar(WireType::Double));
        let callable: Callable = Arc::new(|_| Err("intentional failure".to_string()));
        let err = invoke(&descriptor, &callable, &[], -1, &OutputFormat::default()).unwrap_err();
        match err {
            ProdserveError::Execution(message) => assert_eq!(message, "intentional failure"),
            other => panic!("expected Execution, got {other}"),
        }
    }

    #[test]
    fn test_callable_panic_is_caught() {
        let descriptor = FunctionDescriptor::new("panicky")
            .returns(TypeSpec::Scalar(WireType::Double));
        let callable: Callable = Arc::new(|_| panic!("boom"));
        let err = invoke(&descriptor, &callable, &[], -1, &OutputFormat::default()).unwrap_err();
        assert!(matches!(err, ProdserveError::Execution(_)));
    }

    #[test]
    fn test_small_mode_lhs_shape() {
        // addOne(x: int32) -> int32; rhs=[41] returns lhs=[[42]]
        let (descriptor, callable) = add_one();
        let lhs = invoke(
            &descriptor,
            &callable,
            &[json!(41)],
            -1,
            &OutputFormat {
                mode: OutputMode::Small,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(serde_json::to_value(&lhs).unwrap(), json!([[42]]));
    }
}

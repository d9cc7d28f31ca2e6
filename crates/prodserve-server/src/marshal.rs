//! Type Marshaller
//!
//! Bidirectional mapping between native values and the wire representation:
//! `describe` turns a declared type into the `(mwtype, mwsize)` pair used by
//! discovery schemas, `coerce` converts a raw JSON argument into the declared
//! native type, and `to_wire` renders a call result per the requested output
//! mode.
//!
//! # Shape rules
//!
//! - scalars describe as `[1, 1]`
//! - `char` describes as `[1, "X"]` in discovery (length left symbolic) but
//!   marshals with its concrete length in `large` mode
//! - arrays report their real dimensions
//!
//! # Output modes
//!
//! - `small`: a flat sequence of scalars per result, no envelope
//! - `large`: `{mwtype, mwsize, mwdata}` per result; the shape of a non-array
//!   result is `[1, len]` when the value has a measurable length, `[1, 1]`
//!   otherwise

use prodserve_common::protocol::error::{ProdserveError, Result};
use prodserve_common::protocol::requests::{NanInfFormat, OutputFormat, OutputMode};
use prodserve_common::protocol::wire::{TypeSpec, Value, WireShape, WireType};
use serde_json::json;

/// Maps a declared type to its discovery-schema wire type and shape.
pub fn describe(spec: &TypeSpec) -> (WireType, WireShape) {
    match spec {
        TypeSpec::Scalar(WireType::Char) => (WireType::Char, WireShape::char_symbolic()),
        TypeSpec::Scalar(ty) => (*ty, WireShape::scalar()),
        TypeSpec::Array { elem, shape } => (*elem, WireShape::of(shape)),
    }
}

/// Coerces one positional JSON argument to its declared native type.
///
/// Failure is always an `ArgumentType` error naming the offending parameter.
pub fn coerce(arg: &serde_json::Value, spec: &TypeSpec, parameter: &str) -> Result<Value> {
    match spec {
        TypeSpec::Scalar(ty) => coerce_scalar(arg, *ty, parameter),
        TypeSpec::Array { elem, shape } => {
            let items = arg.as_array().ok_or_else(|| {
                ProdserveError::argument(
                    parameter,
                    format!("expected an array of {elem}, got {arg}"),
                )
            })?;
            let data = items
                .iter()
                .map(|item| coerce_scalar(item, *elem, parameter))
                .collect::<Result<Vec<Value>>>()?;
            // Keep the declared dimensions when they account for every
            // element, otherwise fall back to a row vector.
            let shape = if shape.iter().product::<usize>() == data.len() {
                shape.clone()
            } else {
                vec![1, data.len()]
            };
            Ok(Value::Array {
                elem: *elem,
                shape,
                data,
            })
        }
    }
}

fn coerce_scalar(arg: &serde_json::Value, ty: WireType, parameter: &str) -> Result<Value> {
    let fail = |reason: String| ProdserveError::argument(parameter, reason);

    match ty {
        WireType::Char => match arg {
            serde_json::Value::String(s) => Ok(Value::Char(s.clone())),
            serde_json::Value::Number(n) => Ok(Value::Char(n.to_string())),
            serde_json::Value::Bool(b) => Ok(Value::Char(b.to_string())),
            other => Err(fail(format!("cannot convert {other} to char"))),
        },
        WireType::Double => Ok(Value::Double(as_f64(arg, ty, parameter)?)),
        WireType::Single => Ok(Value::Single(as_f64(arg, ty, parameter)? as f32)),
        WireType::Int8 => Ok(Value::Int8(as_i64(arg, ty, parameter)? as i8)),
        WireType::Int16 => Ok(Value::Int16(as_i64(arg, ty, parameter)? as i16)),
        WireType::Int32 => Ok(Value::Int32(as_i64(arg, ty, parameter)? as i32)),
        WireType::Int64 => Ok(Value::Int64(as_i64(arg, ty, parameter)?)),
        WireType::Uint8 => Ok(Value::Uint8(as_i64(arg, ty, parameter)? as u8)),
        WireType::Uint16 => Ok(Value::Uint16(as_i64(arg, ty, parameter)? as u16)),
        WireType::Uint32 => Ok(Value::Uint32(as_i64(arg, ty, parameter)? as u32)),
        WireType::Uint64 => Ok(Value::Uint64(as_i64(arg, ty, parameter)? as u64)),
        WireType::Logical => match arg {
            serde_json::Value::Bool(b) => Ok(Value::Logical(*b)),
            serde_json::Value::Number(n) => Ok(Value::Logical(n.as_f64() != Some(0.0))),
            other => Err(fail(format!("cannot convert {other} to logical"))),
        },
    }
}

fn as_f64(arg: &serde_json::Value, ty: WireType, parameter: &str) -> Result<f64> {
    match arg {
        serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| {
            ProdserveError::argument(parameter, format!("{n} is out of range for {ty}"))
        }),
        serde_json::Value::String(s) => s.parse::<f64>().map_err(|_| {
            ProdserveError::argument(parameter, format!("cannot parse {s:?} as {ty}"))
        }),
        serde_json::Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(ProdserveError::argument(
            parameter,
            format!("cannot convert {other} to {ty}"),
        )),
    }
}

fn as_i64(arg: &serde_json::Value, ty: WireType, parameter: &str) -> Result<i64> {
    match arg {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(u) = n.as_u64() {
                Ok(u as i64)
            } else {
                // Fractional input truncates toward zero, like a numeric cast.
                Ok(as_f64(arg, ty, parameter)? as i64)
            }
        }
        serde_json::Value::String(s) => s
            .parse::<i64>()
            .or_else(|_| s.parse::<f64>().map(|f| f as i64))
            .map_err(|_| {
                ProdserveError::argument(parameter, format!("cannot parse {s:?} as {ty}"))
            }),
        serde_json::Value::Bool(b) => Ok(*b as i64),
        other => Err(ProdserveError::argument(
            parameter,
            format!("cannot convert {other} to {ty}"),
        )),
    }
}

/// Renders one call result for the wire per the requested output format.
pub fn to_wire(value: &Value, format: &OutputFormat) -> serde_json::Value {
    match format.mode {
        OutputMode::Small => json!(flatten(value, format.nan_inf_format)),
        OutputMode::Large => json!({
            "mwtype": value.wire_type(),
            "mwsize": wire_size(value),
            "mwdata": flatten(value, format.nan_inf_format),
        }),
    }
}

/// Concrete wire shape of a marshalled value.
///
/// Arrays report their real dimensions. Non-array values use their
/// measurable length as `[1, len]` when they have one and `[1, 1]` otherwise.
fn wire_size(value: &Value) -> Vec<usize> {
    match value {
        Value::Array { shape, .. } => shape.clone(),
        other => match other.measurable_len() {
            Some(len) => vec![1, len],
            None => vec![1, 1],
        },
    }
}

/// Flattens a value into a sequence of rendered scalars.
///
/// Any value that is not already a sequence becomes a single-element
/// sequence; a string is one element, never unpacked into characters.
fn flatten(value: &Value, nan_inf: NanInfFormat) -> Vec<serde_json::Value> {
    match value {
        Value::Array { data, .. } => data.iter().map(|v| render_scalar(v, nan_inf)).collect(),
        scalar => vec![render_scalar(scalar, nan_inf)],
    }
}

fn render_scalar(value: &Value, nan_inf: NanInfFormat) -> serde_json::Value {
    match value {
        Value::Char(s) => json!(s),
        Value::Double(f) => render_float(*f, nan_inf),
        Value::Single(f) => render_float(*f as f64, nan_inf),
        Value::Int8(i) => json!(i),
        Value::Int16(i) => json!(i),
        Value::Int32(i) => json!(i),
        Value::Int64(i) => json!(i),
        Value::Uint8(u) => json!(u),
        Value::Uint16(u) => json!(u),
        Value::Uint32(u) => json!(u),
        Value::Uint64(u) => json!(u),
        Value::Logical(b) => json!(b),
        Value::Array { data, .. } => {
            // Nested arrays flatten in place; the outer shape already
            // accounts for their elements.
            json!(data
                .iter()
                .map(|v| render_scalar(v, nan_inf))
                .collect::<Vec<_>>())
        }
    }
}

fn render_float(f: f64, _nan_inf: NanInfFormat) -> serde_json::Value {
    // JSON numbers cannot represent non-finite values; both rendering
    // policies currently emit the string form.
    if f.is_nan() {
        json!("NaN")
    } else if f.is_infinite() {
        json!(if f > 0.0 { "Inf" } else { "-Inf" })
    } else {
        json!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodserve_common::protocol::wire::Dim;

    #[test]
    fn test_describe_scalar() {
        let (ty, shape) = describe(&TypeSpec::Scalar(WireType::Double));
        assert_eq!(ty, WireType::Double);
        assert_eq!(shape, WireShape::scalar());
    }

    #[test]
    fn test_describe_char_is_symbolic() {
        let (ty, shape) = describe(&TypeSpec::Scalar(WireType::Char));
        assert_eq!(ty, WireType::Char);
        assert_eq!(shape.0[1], Dim::Symbolic);
    }

    #[test]
    fn test_describe_array_reports_declared_dims() {
        let spec = TypeSpec::Array {
            elem: WireType::Int32,
            shape: vec![2, 3],
        };
        let (ty, shape) = describe(&spec);
        assert_eq!(ty, WireType::Int32);
        assert_eq!(shape, WireShape::of(&[2, 3]));
    }

    #[test]
    fn test_coerce_int32_from_number() {
        let v = coerce(&json!(41), &TypeSpec::Scalar(WireType::Int32), "x").unwrap();
        assert_eq!(v, Value::Int32(41));
    }

    #[test]
    fn test_coerce_int32_truncates_fraction() {
        let v = coerce(&json!(3.9), &TypeSpec::Scalar(WireType::Int32), "x").unwrap();
        assert_eq!(v, Value::Int32(3));
    }

    #[test]
    fn test_coerce_double_from_string() {
        let v = coerce(&json!("2.5"), &TypeSpec::Scalar(WireType::Double), "x").unwrap();
        assert_eq!(v, Value::Double(2.5));
    }

    #[test]
    fn test_coerce_char_from_number() {
        let v = coerce(&json!(7), &TypeSpec::Scalar(WireType::Char), "name").unwrap();
        assert_eq!(v, Value::Char("7".into()));
    }

    #[test]
    fn test_coerce_logical_from_zero_one() {
        let t = coerce(&json!(1), &TypeSpec::Scalar(WireType::Logical), "flag").unwrap();
        let f = coerce(&json!(0), &TypeSpec::Scalar(WireType::Logical), "flag").unwrap();
        assert_eq!(t, Value::Logical(true));
        assert_eq!(f, Value::Logical(false));
    }

    #[test]
    fn test_coerce_failure_names_parameter() {
        let err = coerce(
            &json!({"not": "a number"}),
            &TypeSpec::Scalar(WireType::Double),
            "weight",
        )
        .unwrap_err();
        match err {
            ProdserveError::ArgumentType { parameter, .. } => assert_eq!(parameter, "weight"),
            other => panic!("expected ArgumentType, got {other}"),
        }
    }

    #[test]
    fn test_coerce_array_elementwise() {
        let spec = TypeSpec::Array {
            elem: WireType::Double,
            shape: vec![1, 3],
        };
        let v = coerce(&json!([1, 2, 3]), &spec, "xs").unwrap();
        match v {
            Value::Array { elem, shape, data } => {
                assert_eq!(elem, WireType::Double);
                assert_eq!(shape, vec![1, 3]);
                assert_eq!(data[0], Value::Double(1.0));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_coerce_array_shape_falls_back_to_row() {
        let spec = TypeSpec::Array {
            elem: WireType::Double,
            shape: vec![2, 2],
        };
        let v = coerce(&json!([1, 2, 3]), &spec, "xs").unwrap();
        match v {
            Value::Array { shape, .. } => assert_eq!(shape, vec![1, 3]),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_small_mode_scalar_is_flat_sequence() {
        let wire = to_wire(&Value::Double(42.0), &OutputFormat::default());
        assert_eq!(wire, json!([42.0]));
    }

    #[test]
    fn test_small_mode_string_is_one_element() {
        let wire = to_wire(&Value::Char("hello".into()), &OutputFormat::default());
        assert_eq!(wire, json!(["hello"]));
    }

    #[test]
    fn test_large_mode_scalar_double() {
        let wire = to_wire(&Value::Double(42.0), &OutputFormat::large());
        assert_eq!(
            wire,
            json!({"mwtype": "double", "mwsize": [1, 1], "mwdata": [42.0]})
        );
    }

    #[test]
    fn test_large_mode_char_has_concrete_length() {
        let wire = to_wire(&Value::Char("hello".into()), &OutputFormat::large());
        assert_eq!(wire["mwtype"], json!("char"));
        assert_eq!(wire["mwsize"], json!([1, 5]));
        assert_eq!(wire["mwdata"], json!(["hello"]));
    }

    #[test]
    fn test_large_mode_array_reports_real_dims() {
        let arr = Value::Array {
            elem: WireType::Int32,
            shape: vec![2, 2],
            data: vec![
                Value::Int32(1),
                Value::Int32(2),
                Value::Int32(3),
                Value::Int32(4),
            ],
        };
        let wire = to_wire(&arr, &OutputFormat::large());
        assert_eq!(wire["mwsize"], json!([2, 2]));
        assert_eq!(wire["mwdata"], json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_non_finite_renders_as_strings() {
        let wire = to_wire(&Value::Double(f64::NAN), &OutputFormat::default());
        assert_eq!(wire, json!(["NaN"]));
        let wire = to_wire(&Value::Double(f64::INFINITY), &OutputFormat::default());
        assert_eq!(wire, json!(["Inf"]));
        let wire = to_wire(&Value::Double(f64::NEG_INFINITY), &OutputFormat::default());
        assert_eq!(wire, json!(["-Inf"]));
    }
}

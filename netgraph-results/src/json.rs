//! JSON-safe export (§6.3): `NaN`/`Inf` become strings rather than failing
//! `serde_json`'s native float encoding, and result types opt into export by
//! implementing [`ToDict`] (the idiomatic-Rust stand-in for "has a `to_dict()`
//! method" duck typing).

use serde_json::{Map, Value};

/// Encodes `x` as a JSON number, or as the string `"NaN"` / `"Infinity"` /
/// `"-Infinity"` when it isn't finite (`serde_json::Number` cannot represent
/// those, and silently failing the whole export over one bad float would be
/// worse than a clearly-tagged string).
pub fn safe_number(x: f64) -> Value {
    if x.is_nan() {
        Value::String("NaN".to_string())
    } else if x.is_infinite() {
        Value::String(if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
    } else {
        serde_json::Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// A type that knows how to render itself as a JSON-safe value for the Result
/// Store. Implemented for the domain result types (demand placement, max-flow
/// summaries, exclusion masks, Monte Carlo output) plus the usual scalar/container
/// building blocks.
pub trait ToDict {
    fn to_dict(&self) -> Value;
}

impl ToDict for f64 {
    fn to_dict(&self) -> Value {
        safe_number(*self)
    }
}

impl ToDict for bool {
    fn to_dict(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToDict for String {
    fn to_dict(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToDict for &str {
    fn to_dict(&self) -> Value {
        Value::String(self.to_string())
    }
}

macro_rules! impl_to_dict_via_json_number {
    ($($t:ty),*) => {
        $(
            impl ToDict for $t {
                fn to_dict(&self) -> Value {
                    serde_json::json!(*self)
                }
            }
        )*
    };
}

impl_to_dict_via_json_number!(u64, i64, usize, u32, i32);

impl<T: ToDict> ToDict for Vec<T> {
    fn to_dict(&self) -> Value {
        Value::Array(self.iter().map(ToDict::to_dict).collect())
    }
}

impl<T: ToDict> ToDict for Option<T> {
    fn to_dict(&self) -> Value {
        match self {
            Some(v) => v.to_dict(),
            None => Value::Null,
        }
    }
}

/// Builds a JSON object from a `name -> f64` map, sanitizing every value.
pub fn number_map(map: &indexmap::IndexMap<String, f64>) -> Value {
    let object: Map<String, Value> = map.iter().map(|(k, v)| (k.clone(), safe_number(*v))).collect();
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_and_infinity_become_strings() {
        assert_eq!(safe_number(f64::NAN), Value::String("NaN".to_string()));
        assert_eq!(safe_number(f64::INFINITY), Value::String("Infinity".to_string()));
        assert_eq!(safe_number(f64::NEG_INFINITY), Value::String("-Infinity".to_string()));
    }

    #[test]
    fn finite_floats_stay_numbers() {
        assert_eq!(safe_number(2.5), serde_json::json!(2.5));
    }
}

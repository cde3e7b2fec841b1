use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Number, Value as JsonValue};
use thiserror::Error;

use crate::tag::TypeTag;
use crate::value::{ObjectValue, Value};

/// Error converting a canonical value to JSON.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Non-finite number (NaN or an infinity) at the reported path.
    #[error("non-finite number at {0}")]
    NonFiniteNumber(String),
    /// Opaque value with no JSON form at the reported path.
    #[error("opaque value at {0} cannot be represented as JSON")]
    OpaqueValue(String),
}

// 2^53: integers at or below this magnitude are exact in an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Path through a nested value, rendered like `items[2].name`.
#[derive(Clone, Default)]
struct Path {
    segments: Vec<Segment>,
}

#[derive(Clone)]
enum Segment {
    Field(Rc<str>),
    Index(usize),
}

impl Path {
    fn field(&self, name: &Rc<str>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Field(name.clone()));
        Self { segments }
    }

    fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "root");
        }
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) => {
                    if position > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Converts a canonical value to a `serde_json` tree.
///
/// Type tags are not part of JSON and are dropped: two values differing only
/// by tag convert to the same JSON. Fails on opaque values and non-finite
/// numbers, naming the offending path.
pub fn to_json(value: &Value) -> Result<JsonValue, ConvertError> {
    json_at(value, Path::default())
}

fn json_at(value: &Value, path: Path) -> Result<JsonValue, ConvertError> {
    match value {
        Value::Null => Ok(JsonValue::Null),
        Value::Bool(flag) => Ok(JsonValue::Bool(*flag)),
        Value::Number(number) => json_number(*number, &path),
        Value::String(text) => Ok(JsonValue::String(text.to_string())),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(json_at(item, path.index(index))?);
            }
            Ok(JsonValue::Array(out))
        }
        Value::Object(object) => {
            let mut out = Map::new();
            for (key, child) in object.entries() {
                out.insert(key.to_string(), json_at(child, path.field(key))?);
            }
            Ok(JsonValue::Object(out))
        }
        Value::Opaque(_) => Err(ConvertError::OpaqueValue(path.to_string())),
    }
}

fn json_number(number: f64, path: &Path) -> Result<JsonValue, ConvertError> {
    if !number.is_finite() {
        return Err(ConvertError::NonFiniteNumber(path.to_string()));
    }
    // Integral values within the safe range round-trip as JSON integers.
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        return Ok(JsonValue::from(number as i64));
    }
    Number::from_f64(number)
        .map(JsonValue::Number)
        .ok_or_else(|| ConvertError::NonFiniteNumber(path.to_string()))
}

/// Builds an admissible value tree from a `serde_json` tree.
///
/// Every JSON object receives `tag`; clones of one tag share identity, so
/// trees built with the same tag coalesce under admission. Numbers become
/// `f64`, which is exact for integers up to 2^53.
pub fn from_json(json: &JsonValue, tag: &TypeTag) -> Rc<Value> {
    match json {
        JsonValue::Null => Rc::new(Value::Null),
        JsonValue::Bool(flag) => Rc::new(Value::Bool(*flag)),
        JsonValue::Number(number) => {
            Rc::new(Value::Number(number.as_f64().unwrap_or(f64::NAN)))
        }
        JsonValue::String(text) => Rc::new(Value::String(Rc::from(text.as_str()))),
        JsonValue::Array(items) => Rc::new(Value::Array(
            items.iter().map(|item| from_json(item, tag)).collect(),
        )),
        JsonValue::Object(map) => {
            let mut object = ObjectValue::new(tag.clone());
            for (key, child) in map {
                object.insert(Rc::from(key.as_str()), from_json(child, tag));
            }
            Rc::new(Value::Object(object))
        }
    }
}

//! Runtime value types

use super::errors::ErrorInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Runtime value type
///
/// Everything a coroutine receives on resume, returns, or passes between
/// frames is a `Val`. `Null` doubles as the "absent" slot of a capture pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    Obj(HashMap<String, Val>),
    /// Error value with code and message
    Error(ErrorInfo),
}

impl Val {
    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Val::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Val]> {
        match self {
            Val::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorInfo> {
        match self {
            Val::Error(info) => Some(info),
            _ => None,
        }
    }

    /// Build the two-slot `(error, value)` pair produced by a capture-both wait.
    ///
    /// Exactly one slot is populated; the other is `Null`.
    pub fn pair(error: Option<ErrorInfo>, value: Option<Val>) -> Val {
        Val::List(vec![
            error.map(Val::Error).unwrap_or(Val::Null),
            value.unwrap_or(Val::Null),
        ])
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<i64> for Val {
    fn from(n: i64) -> Self {
        Val::Num(n as f64)
    }
}

impl From<u64> for Val {
    fn from(n: u64) -> Self {
        Val::Num(n as f64)
    }
}

impl From<i32> for Val {
    fn from(n: i32) -> Self {
        Val::Num(f64::from(n))
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}

impl From<Vec<Val>> for Val {
    fn from(items: Vec<Val>) -> Self {
        Val::List(items)
    }
}

impl From<HashMap<String, Val>> for Val {
    fn from(map: HashMap<String, Val>) -> Self {
        Val::Obj(map)
    }
}

impl From<ErrorInfo> for Val {
    fn from(info: ErrorInfo) -> Self {
        Val::Error(info)
    }
}

/* ===================== JSON Conversion ===================== */

/// Convert a value to plain JSON (no serde tagging).
///
/// Whole numbers are emitted as integers so CLI output reads naturally.
/// Errors become `{ "code": ..., "message": ... }` objects.
pub fn val_to_json(val: &Val) -> JsonValue {
    match val {
        Val::Null => JsonValue::Null,
        Val::Bool(b) => JsonValue::Bool(*b),
        Val::Num(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                JsonValue::from(*n as i64)
            } else {
                serde_json::Number::from_f64(*n)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        Val::Str(s) => JsonValue::String(s.clone()),
        Val::List(items) => JsonValue::Array(items.iter().map(val_to_json).collect()),
        Val::Obj(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), val_to_json(v)))
                .collect(),
        ),
        Val::Error(info) => serde_json::json!({
            "code": info.code,
            "message": info.message,
        }),
    }
}

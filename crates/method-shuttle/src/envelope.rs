//! Work-unit envelopes.
//!
//! An envelope names the unit type and lists its captured fields in
//! parameter order. The ambient context slot travels as a bare
//! [`CapturedArg::Ambient`] marker and is never serialized itself.

use crate::{ShuttleError, ShuttleResult, WorkUnit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a work-unit parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    /// The ambient execution context, bound on the executing side.
    Ambient,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    TextList,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::Ambient => "ambient",
            ArgKind::Bool => "bool",
            ArgKind::Int => "int",
            ArgKind::Float => "float",
            ArgKind::Text => "text",
            ArgKind::Bytes => "bytes",
            ArgKind::TextList => "text_list",
        };
        f.write_str(name)
    }
}

/// One captured field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CapturedArg {
    /// Placeholder for the ambient context.
    Ambient,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    TextList(Vec<String>),
}

impl CapturedArg {
    pub fn kind(&self) -> ArgKind {
        match self {
            CapturedArg::Ambient => ArgKind::Ambient,
            CapturedArg::Bool(_) => ArgKind::Bool,
            CapturedArg::Int(_) => ArgKind::Int,
            CapturedArg::Float(_) => ArgKind::Float,
            CapturedArg::Text(_) => ArgKind::Text,
            CapturedArg::Bytes(_) => ArgKind::Bytes,
            CapturedArg::TextList(_) => ArgKind::TextList,
        }
    }

    /// Whether the value survives the channel unchanged.
    pub fn is_transport_safe(&self) -> bool {
        match self {
            CapturedArg::Float(value) => value.is_finite(),
            _ => true,
        }
    }
}

impl From<bool> for CapturedArg {
    fn from(value: bool) -> Self {
        CapturedArg::Bool(value)
    }
}

impl From<i64> for CapturedArg {
    fn from(value: i64) -> Self {
        CapturedArg::Int(value)
    }
}

impl From<i32> for CapturedArg {
    fn from(value: i32) -> Self {
        CapturedArg::Int(i64::from(value))
    }
}

impl From<f64> for CapturedArg {
    fn from(value: f64) -> Self {
        CapturedArg::Float(value)
    }
}

impl From<String> for CapturedArg {
    fn from(value: String) -> Self {
        CapturedArg::Text(value)
    }
}

impl From<&str> for CapturedArg {
    fn from(value: &str) -> Self {
        CapturedArg::Text(value.to_string())
    }
}

impl From<Vec<u8>> for CapturedArg {
    fn from(value: Vec<u8>) -> Self {
        CapturedArg::Bytes(value)
    }
}

impl From<Vec<String>> for CapturedArg {
    fn from(value: Vec<String>) -> Self {
        CapturedArg::TextList(value)
    }
}

/// Serializable description of a deferred invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnitEnvelope {
    /// Registered type tag of the work unit.
    pub unit_type: String,
    /// Captured fields in parameter order.
    pub args: Vec<CapturedArg>,
}

impl WorkUnitEnvelope {
    /// Capture a work unit.
    ///
    /// Fails when the captured fields do not match the unit's declared
    /// parameters one to one, or when a value is not transport-safe.
    pub fn capture<U: WorkUnit>(unit: &U) -> ShuttleResult<Self> {
        let args = unit.capture();
        check_args(U::UNIT_TYPE, U::PARAMS, &args).map_err(ShuttleError::Capture)?;
        if let Some((index, _)) = args
            .iter()
            .enumerate()
            .find(|(_, arg)| !arg.is_transport_safe())
        {
            return Err(ShuttleError::Capture(format!(
                "{}: parameter {} is not transport-safe",
                U::UNIT_TYPE,
                index
            )));
        }
        Ok(Self {
            unit_type: U::UNIT_TYPE.to_string(),
            args,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Check captured values against a parameter list: same arity, same kind at
/// every position.
pub(crate) fn check_args(
    unit_type: &str,
    params: &[ArgKind],
    args: &[CapturedArg],
) -> Result<(), String> {
    if params.len() != args.len() {
        return Err(format!(
            "{}: parameter count mismatch: expects {}, got {}",
            unit_type,
            params.len(),
            args.len()
        ));
    }
    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        if *param != arg.kind() {
            return Err(format!(
                "{}: parameter {} type mismatch: expects {}, got {}",
                unit_type,
                index,
                param,
                arg.kind()
            ));
        }
    }
    Ok(())
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Values held in brain memory
//!
//! Values carry their type through serialization (`{"type": "int", "value": 3}`),
//! so a durable store reads back exactly what was written.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MemoryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Json(serde_json::Value),
}

impl MemoryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MemoryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MemoryValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MemoryValue::Float(f) => Some(*f),
            MemoryValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MemoryValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            MemoryValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MemoryValue::Null)
    }
}

impl From<&str> for MemoryValue {
    fn from(s: &str) -> Self {
        MemoryValue::String(s.to_string())
    }
}

impl From<String> for MemoryValue {
    fn from(s: String) -> Self {
        MemoryValue::String(s)
    }
}

impl From<i64> for MemoryValue {
    fn from(i: i64) -> Self {
        MemoryValue::Int(i)
    }
}

impl From<i32> for MemoryValue {
    fn from(i: i32) -> Self {
        MemoryValue::Int(i64::from(i))
    }
}

impl From<f64> for MemoryValue {
    fn from(f: f64) -> Self {
        MemoryValue::Float(f)
    }
}

impl From<bool> for MemoryValue {
    fn from(b: bool) -> Self {
        MemoryValue::Bool(b)
    }
}

impl From<serde_json::Value> for MemoryValue {
    fn from(v: serde_json::Value) -> Self {
        MemoryValue::Json(v)
    }
}

impl std::fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryValue::Null => write!(f, "null"),
            MemoryValue::Bool(b) => write!(f, "{}", b),
            MemoryValue::Int(i) => write!(f, "{}", i),
            MemoryValue::Float(x) => write!(f, "{}", x),
            MemoryValue::String(s) => write!(f, "{}", s),
            MemoryValue::Json(v) => write!(f, "{}", v),
        }
    }
}

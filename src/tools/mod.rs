//! Tools the agent can invoke, and the registry that dispatches to them.
//!
//! A [`ToolCall`] is the structured intent pulled out of model text by
//! [`extract::parse`]. The [`ToolRegistry`] is built once at startup and then
//! shared read-only; it maps a call's name to a [`Tool`] and renders the
//! schemas taught to the model in the system prompt.

pub mod extract;
pub mod search_docs;

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::{RagError, RagResult};

/// A single parameter value from a tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Objects and arrays. Carried through extraction, refused at dispatch.
    Nested(serde_json::Value),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; accepts integral floats and numeric strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view; accepts `"true"`/`"false"` strings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested(_))
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub parameters: BTreeMap<String, ParamValue>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }
}

/// A capability the agent can call by name.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameter_schema(&self) -> serde_json::Value;

    fn execute(&self, call: &ToolCall) -> RagResult<String>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> RagResult<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RagError::validation(format!("tool already registered: {name}")));
        }
        tracing::debug!(tool = %name, "registered tool");
        self.tools.insert(name, Box::new(tool));
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn dispatch(&self, call: &ToolCall) -> RagResult<String> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| RagError::tool(&call.name, "unknown tool"))?;

        if let Some((key, _)) = call.parameters.iter().find(|(_, v)| v.is_nested()) {
            return Err(RagError::validation(format!(
                "parameter '{key}' of {} must be a string, number, or boolean",
                call.name
            )));
        }

        tracing::info!(tool = %call.name, params = call.parameters.len(), "dispatching tool");
        tool.execute(call)
    }

    /// Every tool's name, description and parameter schema as a JSON array.
    pub fn render_schemas(&self) -> String {
        let schemas: Vec<serde_json::Value> = self
            .tools
            .values()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameter_schema(),
                })
            })
            .collect();
        serde_json::to_string_pretty(&schemas).unwrap_or_else(|_| "[]".into())
    }
}

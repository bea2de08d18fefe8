//! Command composition
//!
//! Turns a raw command plus an optional JSON options payload into the command
//! line handed to the elevated shell. Nothing is quoted: the options channel is
//! trusted, the same as the raw command itself.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Parsed command request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    /// Command text, appended verbatim
    pub command: String,
    /// Working directory (`cwd` option)
    pub cwd: Option<String>,
    /// Exported variables (`env` option), in payload key order
    pub env: Vec<(String, String)>,
}

impl CommandRequest {
    /// Parse a raw command and its options payload.
    ///
    /// `options` must be a JSON object when present.
    pub fn parse(command: &str, options: Option<&str>) -> Result<Self> {
        let mut request = Self {
            command: command.to_string(),
            ..Self::default()
        };

        let Some(options) = options else {
            return Ok(request);
        };

        let opts: Map<String, Value> = match serde_json::from_str::<Value>(options)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidOptions(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        request.cwd = match opts.get("cwd") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value_to_string(value)).filter(|cwd| !cwd.is_empty()),
        };

        if let Some(Value::Object(env)) = opts.get("env") {
            request.env = env
                .iter()
                .map(|(key, value)| (key.clone(), value_to_string(value)))
                .collect();
        }

        Ok(request)
    }

    /// Render the final command line
    pub fn to_command_line(&self) -> String {
        let mut line = String::new();
        if let Some(cwd) = &self.cwd {
            line.push_str("cd ");
            line.push_str(cwd);
            line.push_str("; ");
        }
        for (key, value) in &self.env {
            line.push_str("export ");
            line.push_str(key);
            line.push('=');
            line.push_str(value);
            line.push_str("; ");
        }
        line.push_str(&self.command);
        line
    }
}

/// Build the final command line for `command` with an optional options payload
pub fn compose(command: &str, options: Option<&str>) -> Result<String> {
    Ok(CommandRequest::parse(command, options)?.to_command_line())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

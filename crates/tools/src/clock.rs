//! Clock tool — current time queries and timestamp formatting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parlance_core::error::ToolError;
use parlance_core::tool::{FunctionDefinition, Tool};

pub struct ClockTool;

const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "clock"
    }

    fn description(&self) -> &str {
        "Current date/time queries and timestamp formatting"
    }

    fn functions(&self) -> Vec<FunctionDefinition> {
        vec![
            FunctionDefinition {
                name: "current_time".into(),
                description: "Get the current UTC time, optionally with a strftime format".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "format": {
                            "type": "string",
                            "description": "strftime format string, default '%Y-%m-%d %H:%M:%S UTC'"
                        }
                    }
                }),
            },
            FunctionDefinition {
                name: "format_timestamp".into(),
                description: "Format a unix timestamp (seconds) as a human-readable UTC time"
                    .into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "timestamp": {
                            "type": "integer",
                            "description": "Seconds since the unix epoch"
                        },
                        "format": {
                            "type": "string",
                            "description": "strftime format string"
                        }
                    },
                    "required": ["timestamp"]
                }),
            },
        ]
    }

    async fn call(
        &self,
        function: &str,
        parameters: serde_json::Value,
    ) -> Result<String, ToolError> {
        let format = parameters["format"].as_str().unwrap_or(DEFAULT_FORMAT);

        match function {
            "current_time" => Ok(Utc::now().format(format).to_string()),
            "format_timestamp" => {
                let secs = parameters["timestamp"].as_i64().ok_or_else(|| {
                    ToolError::InvalidArguments("Missing 'timestamp' argument".into())
                })?;
                let time = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
                    ToolError::InvalidArguments(format!("Timestamp out of range: {secs}"))
                })?;
                Ok(time.format(format).to_string())
            }
            other => Err(ToolError::UnknownFunction(other.into())),
        }
    }
}

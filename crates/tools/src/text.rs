//! Text tool — small string utilities.

use async_trait::async_trait;
use parlance_core::error::ToolError;
use parlance_core::tool::{FunctionDefinition, Tool};

pub struct TextTool;

#[async_trait]
impl Tool for TextTool {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Text utilities: word counting, reversal, and case conversion"
    }

    fn functions(&self) -> Vec<FunctionDefinition> {
        vec![
            FunctionDefinition {
                name: "word_count".into(),
                description: "Count the whitespace-separated words in a text".into(),
                parameters: text_schema(),
            },
            FunctionDefinition {
                name: "reverse".into(),
                description: "Reverse the characters of a text".into(),
                parameters: text_schema(),
            },
            FunctionDefinition {
                name: "change_case".into(),
                description: "Convert a text to upper or lower case".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to convert"
                        },
                        "case": {
                            "type": "string",
                            "enum": ["upper", "lower"],
                            "description": "Target case"
                        }
                    },
                    "required": ["text", "case"]
                }),
            },
        ]
    }

    async fn call(
        &self,
        function: &str,
        parameters: serde_json::Value,
    ) -> Result<String, ToolError> {
        let text = parameters["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;

        match function {
            "word_count" => Ok(text.split_whitespace().count().to_string()),
            "reverse" => Ok(text.chars().rev().collect()),
            "change_case" => match parameters["case"].as_str() {
                Some("upper") => Ok(text.to_uppercase()),
                Some("lower") => Ok(text.to_lowercase()),
                Some(other) => Err(ToolError::InvalidArguments(format!(
                    "Unknown case '{other}', expected 'upper' or 'lower'"
                ))),
                None => Err(ToolError::InvalidArguments("Missing 'case' argument".into())),
            },
            other => Err(ToolError::UnknownFunction(other.into())),
        }
    }
}

fn text_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "text": {
                "type": "string",
                "description": "The text to operate on"
            }
        },
        "required": ["text"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_words() {
        let out = TextTool
            .call("word_count", serde_json::json!({"text": "  one   two three "}))
            .await
            .unwrap();
        assert_eq!(out, "3");
    }

    #[tokio::test]
    async fn reverses_characters() {
        let out = TextTool
            .call("reverse", serde_json::json!({"text": "abc"}))
            .await
            .unwrap();
        assert_eq!(out, "cba");
    }

    #[tokio::test]
    async fn changes_case() {
        let out = TextTool
            .call(
                "change_case",
                serde_json::json!({"text": "Hello", "case": "upper"}),
            )
            .await
            .unwrap();
        assert_eq!(out, "HELLO");
    }

    #[tokio::test]
    async fn rejects_unknown_case() {
        let err = TextTool
            .call(
                "change_case",
                serde_json::json!({"text": "x", "case": "title"}),
            )
            .await;
        assert!(matches!(err, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn missing_text_is_invalid_arguments() {
        let err = TextTool.call("word_count", serde_json::json!({})).await;
        assert!(matches!(err, Err(ToolError::InvalidArguments(_))));
    }
}

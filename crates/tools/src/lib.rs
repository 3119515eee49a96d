//! Built-in tools for the Parlance agent.
//!
//! Each tool implements `parlance_core::Tool` and is collected into the
//! default registry that the gateway exposes over `/tools`.

pub mod calculator;
pub mod clock;
pub mod text;

pub use calculator::CalculatorTool;
pub use clock::ClockTool;
pub use text::TextTool;

use parlance_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the default tool registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculatorTool));
    registry.register(Arc::new(ClockTool));
    registry.register(Arc::new(TextTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_lists_tools_in_order() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["calculator", "clock", "text"]);
    }

    #[tokio::test]
    async fn functions_resolve_across_tools() {
        let registry = default_registry();
        let result = registry
            .execute("calculate", serde_json::json!({"expression": "6 * 7"}))
            .await;
        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("42"));

        let result = registry
            .execute("word_count", serde_json::json!({"text": "one two three"}))
            .await;
        assert_eq!(result.output.as_deref(), Some("3"));
    }
}

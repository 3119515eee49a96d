//! Tool trait and registry — the catalog of callable named functions.
//!
//! A tool groups one or more functions under a name ("calculator" exposes
//! "calculate"; "clock" exposes "current_time" and "format_time"). Function
//! names live in a single registry-wide namespace, so callers can execute a
//! function without knowing which tool owns it.

use crate::error::ToolError;
use crate::provider::ProviderToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One callable function exposed by a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the function parameters
    pub parameters: serde_json::Value,
}

/// The catalog entry for a tool: its name, description, and functions
/// in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub functions: Vec<FunctionDefinition>,
}

/// The normalized outcome of a tool function execution.
///
/// Exactly one of `output`/`error` is populated, determined by `success`.
/// In-tool failures become `success: false` here and are never raised as
/// transport faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecutionResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// The core Tool trait.
///
/// Each tool implements this and is registered in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// The functions this tool exposes, in declaration order.
    fn functions(&self) -> Vec<FunctionDefinition>;

    /// Execute one of this tool's functions.
    ///
    /// Returns the textual output on success. Implementations signal their
    /// own failures (bad parameters, runtime faults) through `ToolError`;
    /// the registry normalizes those into a `ToolExecutionResult`.
    async fn call(
        &self,
        function: &str,
        parameters: serde_json::Value,
    ) -> std::result::Result<String, ToolError>;

    /// The catalog entry for this tool.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            functions: self.functions(),
        }
    }
}

/// A registry of available tools.
///
/// Registration order is preserved for listings. Function lookup is
/// registry-wide: `execute("calculate", ..)` works without naming the
/// calculator tool.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    /// function name → index into `tools`
    functions: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            functions: HashMap::new(),
        }
    }

    /// Register a tool. Its function names join the shared namespace;
    /// a later registration wins on collision.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let index = self.tools.len();
        for f in tool.functions() {
            self.functions.insert(f.name, index);
        }
        self.tools.push(tool);
    }

    /// All tool descriptors, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// All registered tool names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Look up one tool's descriptor by tool name.
    pub fn get(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.descriptor())
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    /// Execute a function by its registry-wide name.
    ///
    /// All execution outcomes — including an unknown function name and any
    /// fault inside the tool — are normalized into a `ToolExecutionResult`.
    pub async fn execute(
        &self,
        function: &str,
        parameters: serde_json::Value,
    ) -> ToolExecutionResult {
        let Some(&index) = self.functions.get(function) else {
            return ToolExecutionResult::err(format!("Unknown function: '{function}'"));
        };

        match self.tools[index].call(function, parameters).await {
            Ok(output) => ToolExecutionResult::ok(output),
            Err(e) => ToolExecutionResult::err(e.to_string()),
        }
    }

    /// Flattened function definitions for sending to the provider.
    pub fn provider_definitions(&self) -> Vec<ProviderToolDefinition> {
        self.tools
            .iter()
            .flat_map(|t| t.functions())
            .map(|f| ProviderToolDefinition {
                name: f.name,
                description: f.description,
                parameters: f.parameters,
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Calculator tool — evaluates arithmetic expressions.
//!
//! Shunting-yard to postfix, then a stack evaluation. Supports `+`, `-`,
//! `*`, `/`, parentheses, decimals, and unary negation.

use async_trait::async_trait;
use parlance_core::error::ToolError;
use parlance_core::tool::{FunctionDefinition, Tool};

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate arithmetic expressions with +, -, *, /, and parentheses"
    }

    fn functions(&self) -> Vec<FunctionDefinition> {
        vec![FunctionDefinition {
            name: "calculate".into(),
            description: "Evaluate an arithmetic expression and return the result".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "The expression to evaluate, e.g. '(2 + 3) * 4'"
                    }
                },
                "required": ["expression"]
            }),
        }]
    }

    async fn call(
        &self,
        function: &str,
        parameters: serde_json::Value,
    ) -> Result<String, ToolError> {
        if function != "calculate" {
            return Err(ToolError::UnknownFunction(function.into()));
        }
        let expr = parameters["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?;

        let value = evaluate(expr).map_err(|reason| ToolError::ExecutionFailed {
            function: "calculate".into(),
            reason,
        })?;

        // Integers render without a trailing .0
        Ok(if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            format!("{value}")
        })
    }
}

/// Evaluate an arithmetic expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let postfix = to_postfix(expr)?;
    eval_postfix(&postfix)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    /// Unary minus, highest precedence
    Neg,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
            Op::Neg => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Num(f64),
    Op(Op),
}

/// Convert infix to postfix via shunting-yard.
fn to_postfix(expr: &str) -> Result<Vec<Item>, String> {
    enum StackEntry {
        Op(Op),
        LParen,
    }

    let mut output = Vec::new();
    let mut stack: Vec<StackEntry> = Vec::new();
    // True when the next '-' is unary (start of expression or after an
    // operator/open paren).
    let mut expect_operand = true;

    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = literal
                    .parse()
                    .map_err(|_| format!("Invalid number: {literal}"))?;
                output.push(Item::Num(num));
                expect_operand = false;
            }
            '(' => {
                chars.next();
                stack.push(StackEntry::LParen);
                expect_operand = true;
            }
            ')' => {
                chars.next();
                loop {
                    match stack.pop() {
                        Some(StackEntry::Op(op)) => output.push(Item::Op(op)),
                        Some(StackEntry::LParen) => break,
                        None => return Err("Unbalanced parentheses".into()),
                    }
                }
                expect_operand = false;
            }
            '+' | '-' | '*' | '/' => {
                chars.next();
                let op = match (c, expect_operand) {
                    ('-', true) => Op::Neg,
                    ('-', false) => Op::Sub,
                    ('+', false) => Op::Add,
                    ('*', false) => Op::Mul,
                    ('/', false) => Op::Div,
                    _ => return Err(format!("Misplaced operator: '{c}'")),
                };
                // Unary minus is right-associative; binary ops are left-associative.
                while let Some(StackEntry::Op(top)) = stack.last() {
                    let pops = if op == Op::Neg {
                        top.precedence() > op.precedence()
                    } else {
                        top.precedence() >= op.precedence()
                    };
                    if !pops {
                        break;
                    }
                    output.push(Item::Op(*top));
                    stack.pop();
                }
                stack.push(StackEntry::Op(op));
                expect_operand = true;
            }
            other => return Err(format!("Unexpected character: '{other}'")),
        }
    }

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Op(op) => output.push(Item::Op(op)),
            StackEntry::LParen => return Err("Unbalanced parentheses".into()),
        }
    }

    if output.is_empty() {
        return Err("Empty expression".into());
    }
    Ok(output)
}

fn eval_postfix(items: &[Item]) -> Result<f64, String> {
    let mut stack: Vec<f64> = Vec::new();
    for item in items {
        match item {
            Item::Num(n) => stack.push(*n),
            Item::Op(Op::Neg) => {
                let v = stack.pop().ok_or("Malformed expression")?;
                stack.push(-v);
            }
            Item::Op(op) => {
                let rhs = stack.pop().ok_or("Malformed expression")?;
                let lhs = stack.pop().ok_or("Malformed expression")?;
                let value = match op {
                    Op::Add => lhs + rhs,
                    Op::Sub => lhs - rhs,
                    Op::Mul => lhs * rhs,
                    Op::Div => {
                        if rhs == 0.0 {
                            return Err("Division by zero".into());
                        }
                        lhs / rhs
                    }
                    Op::Neg => unreachable!(),
                };
                stack.push(value);
            }
        }
    }
    match stack.as_slice() {
        [value] => Ok(*value),
        _ => Err("Malformed expression".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_addition() {
        assert_eq!(evaluate("2 + 3").unwrap(), 5.0);
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
    }

    #[test]
    fn left_associative_subtraction() {
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
    }

    #[test]
    fn nested_parentheses() {
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn unary_negation() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("2 * -3").unwrap(), -6.0);
    }

    #[test]
    fn decimals() {
        assert_eq!(evaluate("3.5 * 2").unwrap(), 7.0);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(evaluate("1 / 0").is_err());
    }

    #[test]
    fn unbalanced_parentheses_rejected() {
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 + 2)").is_err());
    }

    #[test]
    fn trailing_operator_rejected() {
        assert!(evaluate("2 +").is_err());
    }

    #[test]
    fn empty_expression_rejected() {
        assert!(evaluate("").is_err());
        assert!(evaluate("   ").is_err());
    }

    #[tokio::test]
    async fn call_formats_integer_results() {
        let tool = CalculatorTool;
        let out = tool
            .call("calculate", serde_json::json!({"expression": "10 / 2"}))
            .await
            .unwrap();
        assert_eq!(out, "5");
    }

    #[tokio::test]
    async fn call_missing_expression_is_invalid_arguments() {
        let tool = CalculatorTool;
        let err = tool.call("calculate", serde_json::json!({})).await;
        assert!(matches!(err, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn call_bad_expression_is_execution_failure() {
        let tool = CalculatorTool;
        let err = tool
            .call("calculate", serde_json::json!({"expression": "1 / 0"}))
            .await;
        assert!(matches!(err, Err(ToolError::ExecutionFailed { .. })));
    }
}

//! Calculator tool — arithmetic over `+ - * /`, parentheses, and unary minus.
//!
//! Expressions are parsed, never evaluated as code.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('-' | '+') factor | number | '(' expr ')'
//! ```

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::{require_string, Tool};

/// Evaluates arithmetic expressions.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. \"(2 + 3) * 4\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let expression = require_string(&params, "expression")?;
        let result = evaluate(&expression)?;
        Ok(json!({ "result": result, "expression": expression }))
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> anyhow::Result<f64> {
    let mut parser = Parser {
        chars: expression.chars().peekable(),
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(c) = parser.chars.next() {
        anyhow::bail!("Invalid mathematical expression: unexpected '{c}'");
    }
    if !value.is_finite() {
        anyhow::bail!("Invalid mathematical expression: result is not finite");
    }
    Ok(value)
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.peek().copied()
    }

    fn expr(&mut self) -> anyhow::Result<f64> {
        let mut value = self.term()?;
        while let Some(op) = self.peek().filter(|c| matches!(c, '+' | '-')) {
            self.chars.next();
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> anyhow::Result<f64> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek().filter(|c| matches!(c, '*' | '/')) {
            self.chars.next();
            let rhs = self.factor()?;
            if op == '/' {
                if rhs == 0.0 {
                    anyhow::bail!("Invalid mathematical expression: division by zero");
                }
                value /= rhs;
            } else {
                value *= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> anyhow::Result<f64> {
        match self.peek() {
            Some('-') => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.chars.next();
                self.factor()
            }
            Some('(') => {
                self.chars.next();
                let value = self.expr()?;
                match self.peek() {
                    Some(')') => {
                        self.chars.next();
                        Ok(value)
                    }
                    _ => anyhow::bail!("Invalid mathematical expression: missing ')'"),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => anyhow::bail!("Invalid mathematical expression: unexpected '{c}'"),
            None => anyhow::bail!("Invalid mathematical expression: unexpected end of input"),
        }
    }

    fn number(&mut self) -> anyhow::Result<f64> {
        let mut literal = String::new();
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit() || *c == '.') {
            literal.push(c);
        }
        literal
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("Invalid mathematical expression: bad number '{literal}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_parens() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 / 4 - 1").unwrap(), 1.5);
        assert_eq!(evaluate("8 - 3 - 2").unwrap(), 3.0);
    }

    #[test]
    fn test_unary_and_decimals() {
        assert_eq!(evaluate("-3 + 5").unwrap(), 2.0);
        assert_eq!(evaluate("-(1.5 * 2)").unwrap(), -3.0);
        assert_eq!(evaluate(".5 + .25").unwrap(), 0.75);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1..2").is_err());
        assert!(evaluate("process.exit()").is_err());
        assert!(evaluate("3 4").is_err());
    }

    #[test]
    fn test_division_by_zero() {
        let err = evaluate("1 / (2 - 2)").unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[tokio::test]
    async fn test_tool_result_shape() {
        let mut params = HashMap::new();
        params.insert("expression".into(), json!("6 * 7"));
        let out = CalculatorTool.execute(params).await.unwrap();
        assert_eq!(out["result"], 42.0);
        assert_eq!(out["expression"], "6 * 7");
    }
}

//! Date/time tool — current time, or reformat a given date.

use std::collections::HashMap;
use std::fmt::Write;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::base::{optional_string, require_string, Tool};

pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Get current date/time or format dates"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": { "type": "string", "enum": ["now", "format"] },
                "date": {
                    "description": "RFC 3339 string or epoch milliseconds (required for `format`)"
                },
                "format": {
                    "type": "string",
                    "description": "strftime pattern for the `formatted` field, e.g. \"%Y-%m-%d\""
                }
            },
            "required": ["operation"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let operation = require_string(&params, "operation")?;
        let pattern = optional_string(&params, "format");

        let moment = match operation.as_str() {
            "now" => Utc::now(),
            "format" => {
                let date = params
                    .get("date")
                    .ok_or_else(|| anyhow::anyhow!("Date is required for format operation"))?;
                parse_date(date)?
            }
            other => anyhow::bail!("Unsupported operation: {other}"),
        };

        describe(moment, pattern.as_deref())
    }
}

fn parse_date(value: &Value) -> anyhow::Result<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| anyhow::anyhow!("Invalid date: {n}")),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| anyhow::anyhow!("Invalid date '{s}': {e}")),
        other => anyhow::bail!("Invalid date: {other}"),
    }
}

fn describe(moment: DateTime<Utc>, pattern: Option<&str>) -> anyhow::Result<Value> {
    let formatted = match pattern {
        Some(p) => {
            // Invalid strftime items surface as a fmt::Error
            let mut out = String::new();
            write!(out, "{}", moment.format(p))
                .map_err(|_| anyhow::anyhow!("Invalid format pattern: {p}"))?;
            out
        }
        None => moment.to_rfc2822(),
    };
    Ok(json!({
        "timestamp": moment.timestamp_millis(),
        "iso": moment.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "formatted": formatted,
    }))
}

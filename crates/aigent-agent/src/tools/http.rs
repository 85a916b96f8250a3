//! Network tools — generic HTTP requests and an OpenWeatherMap lookup.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::base::{optional_string, require_string, Tool};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org";

fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

// ─────────────────────────────────────────────
// HttpRequestTool
// ─────────────────────────────────────────────

/// Makes an arbitrary HTTP request and reports status, headers, and body.
///
/// Non-2xx statuses are returned as data, not treated as failures; only
/// transport errors fail the tool.
pub struct HttpRequestTool {
    client: Client,
}

impl HttpRequestTool {
    pub fn new() -> Self {
        Self {
            client: build_client(),
        }
    }
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make HTTP requests to external APIs or services"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "method": { "type": "string", "description": "GET, POST, PUT, DELETE, ..." },
                "url": { "type": "string" },
                "headers": { "type": "object", "additionalProperties": { "type": "string" } },
                "body": { "description": "String bodies are sent as text, anything else as JSON" }
            },
            "required": ["method", "url"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let method = require_string(&params, "method")?;
        let url = require_string(&params, "url")?;
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| anyhow::anyhow!("Invalid HTTP method: {method}"))?;

        debug!(method = %method, url = %url, "http_request");

        let mut request = self.client.request(method, &url);
        if let Some(Value::Object(headers)) = params.get("headers") {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key.as_str(), v);
                }
            }
        }
        request = match params.get("body") {
            None | Some(Value::Null) => request,
            Some(Value::String(text)) => request.body(text.clone()),
            Some(other) => request.json(other),
        };

        let response = request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("HTTP request to {url} failed: {e}"))?;

        let status = response.status();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), Value::from(v.to_str().ok()?))))
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read response body: {e}"))?;
        let data = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        Ok(json!({
            "status": status.as_u16(),
            "statusText": status.canonical_reason().unwrap_or(""),
            "headers": headers,
            "data": data,
        }))
    }
}

// ─────────────────────────────────────────────
// WeatherTool
// ─────────────────────────────────────────────

/// Current conditions from OpenWeatherMap. The API key is passed per call.
pub struct WeatherTool {
    client: Client,
    api_base: String,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self::with_api_base(OPENWEATHER_API_BASE)
    }

    /// Point at a different OpenWeatherMap-compatible endpoint.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get weather information for a location"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": { "type": "string", "description": "City name, e.g. \"Lisbon\"" },
                "apiKey": { "type": "string", "description": "OpenWeatherMap API key" }
            },
            "required": ["location", "apiKey"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let location = require_string(&params, "location")?;
        let api_key = optional_string(&params, "apiKey")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Weather API key is required"))?;

        debug!(location = %location, "weather lookup");

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.api_base))
            .query(&[
                ("q", location.as_str()),
                ("appid", api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to fetch weather data: {e}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch weather data: {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse weather data: {e}"))?;

        Ok(json!({
            "location": location,
            "temperature": body["main"]["temp"],
            "description": body["weather"][0]["description"],
            "humidity": body["main"]["humidity"],
            "windSpeed": body["wind"]["speed"],
        }))
    }
}

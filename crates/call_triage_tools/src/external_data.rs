use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use cache::Cache;
use context_server::{Tool, ToolContent, ToolExecutor};
use http_client::HttpClient;
use serde_json::{Value, json};

use crate::{
    non_empty_str, text_content,
    utils::{RetryPolicy, cached_json, make_request},
};

const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const NEWS_URL: &str = "https://newsapi.org/v2/everything";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const WEATHER_TTL: Duration = Duration::from_secs(30 * 60);
const NEWS_TTL: Duration = Duration::from_secs(15 * 60);
const GEOCODE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Shared plumbing for the third-party data tools.
#[derive(Clone)]
pub struct ExternalApi {
    http_client: Arc<dyn HttpClient>,
    cache: Arc<dyn Cache>,
    retry: RetryPolicy,
}

impl ExternalApi {
    pub fn new(http_client: Arc<dyn HttpClient>, cache: Arc<dyn Cache>, retry: RetryPolicy) -> Self {
        Self {
            http_client,
            cache,
            retry,
        }
    }

    async fn fetch(&self, key: &str, ttl: Duration, url: &str, params: Value) -> Result<Vec<ToolContent>> {
        let (http_client, retry, params) = (&self.http_client, &self.retry, &params);
        let (data, cached) = cached_json(&self.cache, key, ttl, move || async move {
            make_request(http_client, retry, url, Some(params)).await
        })
        .await?;

        text_content(&json!({
            "data": data,
            "cached": cached,
        }))
    }
}

fn require_key<'a>(api_key: &'a Option<String>, provider: &str) -> Result<&'a str> {
    api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| anyhow!("{} API key not configured", provider))
}

pub struct WeatherTool {
    api: ExternalApi,
    api_key: Option<String>,
}

impl WeatherTool {
    pub fn new(api: ExternalApi, api_key: Option<String>) -> Self {
        Self { api, api_key }
    }
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    async fn execute(&self, arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing WeatherTool");
        let args = arguments.ok_or_else(|| anyhow!("Missing arguments"))?;
        let city = non_empty_str(&args, "city")?;
        let units = args.get("units").and_then(|v| v.as_str()).unwrap_or("metric");
        let api_key = require_key(&self.api_key, "Weather")?;

        self.api
            .fetch(
                &format!("weather_{}_{}", city, units),
                WEATHER_TTL,
                WEATHER_URL,
                json!({
                    "q": city,
                    "appid": api_key,
                    "units": units,
                    "lang": "es",
                }),
            )
            .await
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "weather".into(),
            description: Some("Current weather for a city, cached for 30 minutes".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name"
                    },
                    "units": {
                        "type": "string",
                        "enum": ["metric", "imperial", "standard"],
                        "description": "Unit system. Default: metric"
                    }
                },
                "required": ["city"]
            }),
        }
    }
}

pub struct NewsTool {
    api: ExternalApi,
    api_key: Option<String>,
}

impl NewsTool {
    pub fn new(api: ExternalApi, api_key: Option<String>) -> Self {
        Self { api, api_key }
    }
}

#[async_trait]
impl ToolExecutor for NewsTool {
    async fn execute(&self, arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing NewsTool");
        let args = arguments.ok_or_else(|| anyhow!("Missing arguments"))?;
        let query = non_empty_str(&args, "query")?;
        let language = args.get("language").and_then(|v| v.as_str()).unwrap_or("es");
        let api_key = require_key(&self.api_key, "News")?;

        self.api
            .fetch(
                &format!("news_{}_{}", query, language),
                NEWS_TTL,
                NEWS_URL,
                json!({
                    "q": query,
                    "apiKey": api_key,
                    "language": language,
                    "sortBy": "publishedAt",
                }),
            )
            .await
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "news".into(),
            description: Some("Latest news articles matching a query, cached for 15 minutes".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search terms"
                    },
                    "language": {
                        "type": "string",
                        "description": "Two-letter language code. Default: es"
                    }
                },
                "required": ["query"]
            }),
        }
    }
}

pub struct GeocodeTool {
    api: ExternalApi,
    api_key: Option<String>,
}

impl GeocodeTool {
    pub fn new(api: ExternalApi, api_key: Option<String>) -> Self {
        Self { api, api_key }
    }
}

#[async_trait]
impl ToolExecutor for GeocodeTool {
    async fn execute(&self, arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing GeocodeTool");
        let args = arguments.ok_or_else(|| anyhow!("Missing arguments"))?;
        let address = non_empty_str(&args, "address")?;
        let api_key = require_key(&self.api_key, "Maps")?;

        self.api
            .fetch(
                &format!("location_{}", address),
                GEOCODE_TTL,
                GEOCODE_URL,
                json!({
                    "address": address,
                    "key": api_key,
                }),
            )
            .await
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "geocode".into(),
            description: Some("Geographic coordinates for a street address, cached for a day".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "address": {
                        "type": "string",
                        "description": "Free-form address"
                    }
                },
                "required": ["address"]
            }),
        }
    }
}

use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use cache::Cache;
use context_server::{Tool, ToolContent, ToolExecutor};
use serde_json::{Value, json};

use crate::{message_response, non_empty_str, text_content};

fn key_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "key": {
                "type": "string",
                "description": description
            }
        },
        "required": ["key"]
    })
}

pub struct CacheGetTool {
    cache: Arc<dyn Cache>,
}

impl CacheGetTool {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ToolExecutor for CacheGetTool {
    async fn execute(&self, arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing CacheGetTool");
        let args = arguments.ok_or_else(|| anyhow!("Missing arguments"))?;
        let key = non_empty_str(&args, "key")?;

        let value = self.cache.get(key);

        text_content(&json!({
            "key": key,
            "found": value.is_some(),
            "value": value,
        }))
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "cache_get".into(),
            description: Some("Read a value from the local cache. Expired values are reported as not found".into()),
            input_schema: key_schema("Cache key"),
        }
    }
}

pub struct CacheSetTool {
    cache: Arc<dyn Cache>,
}

impl CacheSetTool {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ToolExecutor for CacheSetTool {
    async fn execute(&self, arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing CacheSetTool");
        let args = arguments.ok_or_else(|| anyhow!("Missing arguments"))?;
        let key = non_empty_str(&args, "key")?;

        let value = args
            .get("value")
            .filter(|v| v.is_object())
            .cloned()
            .ok_or_else(|| anyhow!("Missing or invalid value parameter, expected an object"))?;

        let ttl = match args.get("duration") {
            None | Some(Value::Null) => None,
            Some(duration) => Some(Duration::from_secs(duration.as_u64().ok_or_else(|| {
                anyhow!("Invalid duration parameter, expected a non-negative number of seconds")
            })?)),
        };

        if !self.cache.set(key, value, ttl) {
            return Err(anyhow!("Error saving value for key '{}' in cache", key));
        }

        message_response(&format!("Value stored in cache under key '{}'", key), "success")
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "cache_set".into(),
            description: Some("Store a JSON object in the local cache for a number of seconds".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "key": {
                        "type": "string",
                        "description": "Cache key. '/' and ':' are stored as '_'"
                    },
                    "value": {
                        "type": "object",
                        "description": "Value to store"
                    },
                    "duration": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Seconds until the value expires. Default: the configured cache duration"
                    }
                },
                "required": ["key", "value"]
            }),
        }
    }
}

pub struct CacheDeleteTool {
    cache: Arc<dyn Cache>,
}

impl CacheDeleteTool {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ToolExecutor for CacheDeleteTool {
    async fn execute(&self, arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing CacheDeleteTool");
        let args = arguments.ok_or_else(|| anyhow!("Missing arguments"))?;
        let key = non_empty_str(&args, "key")?;

        if self.cache.delete(key) {
            message_response(&format!("Key '{}' deleted from cache", key), "success")
        } else {
            message_response(&format!("Key '{}' could not be deleted", key), "warning")
        }
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "cache_delete".into(),
            description: Some("Remove a key from the local cache. Removing a missing key succeeds".into()),
            input_schema: key_schema("Cache key to remove"),
        }
    }
}

pub struct CacheClearTool {
    cache: Arc<dyn Cache>,
}

impl CacheClearTool {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ToolExecutor for CacheClearTool {
    async fn execute(&self, _arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing CacheClearTool");

        if !self.cache.clear_all() {
            return Err(anyhow!("Error clearing cache"));
        }

        message_response("Cache cleared", "success")
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "cache_clear".into(),
            description: Some("Remove every entry from the local cache".into()),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }
}

pub struct CacheStatsTool {
    cache: Arc<dyn Cache>,
}

impl CacheStatsTool {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ToolExecutor for CacheStatsTool {
    async fn execute(&self, _arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing CacheStatsTool");

        let stats = self
            .cache
            .stats()
            .ok_or_else(|| anyhow!("Cache statistics are unavailable"))?;

        text_content(&stats)
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "cache_stats".into(),
            description: Some(
                "Count cache entries, their total size on disk and how many have expired".into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }
}

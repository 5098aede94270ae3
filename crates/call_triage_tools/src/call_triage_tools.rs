mod analyze_conversation;
mod cache_tools;
mod external_data;
mod utils;

use anyhow::{Result, anyhow};
use context_server::ToolContent;
use serde::Serialize;
use serde_json::{Value, json};

pub use crate::analyze_conversation::AnalyzeConversationTool;
pub use crate::cache_tools::{
    CacheClearTool, CacheDeleteTool, CacheGetTool, CacheSetTool, CacheStatsTool,
};
pub use crate::external_data::{ExternalApi, GeocodeTool, NewsTool, WeatherTool};
pub use crate::utils::{RetryPolicy, cached_json, make_request, with_timeout};

pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing or invalid {} parameter", name))
}

pub(crate) fn non_empty_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    let value = required_str(args, name)?;
    if value.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", name));
    }
    Ok(value)
}

pub(crate) fn text_content<T: Serialize + ?Sized>(body: &T) -> Result<Vec<ToolContent>> {
    Ok(vec![ToolContent::Text {
        text: serde_json::to_string_pretty(body)?,
    }])
}

/// Status message in the shape the HTTP API used for mutations.
pub(crate) fn message_response(message: &str, status: &str) -> Result<Vec<ToolContent>> {
    text_content(&json!({
        "message": message,
        "status": status,
        "timestamp": chrono::Local::now().naive_local(),
    }))
}

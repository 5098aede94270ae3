mod config;

use std::sync::Arc;

use anyhow::Result;
use cache::{Cache, MemoryCache};
use call_triage_tools::{
    AnalyzeConversationTool, CacheClearTool, CacheDeleteTool, CacheGetTool, CacheSetTool,
    CacheStatsTool, ExternalApi, GeocodeTool, NewsTool, WeatherTool,
};
use context_server::{ContextServer, ContextServerRpcRequest, ContextServerRpcResponse};
use context_server_utils::{
    prompt_registry::PromptRegistry, resource_registry::ResourceRegistry,
    tool_registry::ToolRegistry,
};
use http_client::HttpClient;
use http_client_reqwest::HttpClientReqwest;
use local_cache::LocalCache;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::Settings;

struct ContextServerState {
    rpc: ContextServer,
}

/// Falls back to an in-process cache when the cache directory is unusable,
/// so every tool keeps working.
fn open_cache(settings: &Settings) -> Arc<dyn Cache> {
    match LocalCache::new(&settings.cache_dir, Some(settings.cache_duration)) {
        Ok(cache) => {
            log::info!("Using cache directory {}", settings.cache_dir.display());
            Arc::new(cache)
        }
        Err(err) => {
            log::warn!("Local cache unavailable, keeping entries in memory: {:#}", err);
            Arc::new(MemoryCache::new(Some(settings.cache_duration)))
        }
    }
}

impl ContextServerState {
    fn new(http_client: Arc<dyn HttpClient>, settings: &Settings) -> Result<Self> {
        let resource_registry = Arc::new(ResourceRegistry::default());

        let tool_registry = Arc::new(ToolRegistry::default());

        let cache = open_cache(settings);
        tool_registry.register(Arc::new(CacheGetTool::new(cache.clone())));
        tool_registry.register(Arc::new(CacheSetTool::new(cache.clone())));
        tool_registry.register(Arc::new(CacheDeleteTool::new(cache.clone())));
        tool_registry.register(Arc::new(CacheClearTool::new(cache.clone())));
        tool_registry.register(Arc::new(CacheStatsTool::new(cache.clone())));
        tool_registry.register(Arc::new(AnalyzeConversationTool::new()));

        let external_api = ExternalApi::new(http_client, cache, settings.retry_policy());
        tool_registry.register(Arc::new(WeatherTool::new(
            external_api.clone(),
            settings.weather_api_key.clone(),
        )));
        tool_registry.register(Arc::new(NewsTool::new(
            external_api.clone(),
            settings.news_api_key.clone(),
        )));
        tool_registry.register(Arc::new(GeocodeTool::new(
            external_api,
            settings.maps_api_key.clone(),
        )));

        let prompt_registry = Arc::new(PromptRegistry::default());

        Ok(Self {
            rpc: ContextServer::builder()
                .with_server_info((env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
                .with_resources(resource_registry)
                .with_tools(tool_registry)
                .with_prompts(prompt_registry)
                .build()?,
        })
    }

    async fn process_request(
        &self,
        request: ContextServerRpcRequest,
    ) -> Result<Option<ContextServerRpcResponse>> {
        self.rpc.handle_incoming_message(request).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::from_env()?;
    for (name, key) in [
        ("WEATHER_API_KEY", &settings.weather_api_key),
        ("NEWS_API_KEY", &settings.news_api_key),
        ("MAPS_API_KEY", &settings.maps_api_key),
    ] {
        if key.is_none() {
            log::warn!("{} environment variable is not defined", name);
        }
    }

    let http_client = Arc::new(HttpClientReqwest::default());
    let state = ContextServerState::new(http_client, &settings)?;

    let mut stdin = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = stdin.next_line().await? {
        let request: ContextServerRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                log::error!("Error parsing request: {}", e);
                continue;
            }
        };

        if let Some(response) = state.process_request(request).await? {
            let response_json = serde_json::to_string(&response)?;
            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

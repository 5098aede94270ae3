use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Result, anyhow};
use call_triage_tools::RetryPolicy;
use directories::ProjectDirs;

const DEFAULT_CACHE_DURATION: u64 = 300;
const DEFAULT_API_TIMEOUT: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub cache_duration: Duration,
    pub api_timeout: Duration,
    pub max_retries: u32,
    pub weather_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub maps_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cache_dir = match lookup("CACHE_DIR").filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        Ok(Self {
            cache_dir,
            cache_duration: Duration::from_secs(parse_or(
                &lookup,
                "CACHE_DURATION",
                DEFAULT_CACHE_DURATION,
            )),
            api_timeout: Duration::from_secs(parse_or(&lookup, "API_TIMEOUT", DEFAULT_API_TIMEOUT)),
            max_retries: parse_or(&lookup, "MAX_RETRIES", DEFAULT_MAX_RETRIES),
            weather_api_key: lookup("WEATHER_API_KEY").filter(|key| !key.is_empty()),
            news_api_key: lookup("NEWS_API_KEY").filter(|key| !key.is_empty()),
            maps_api_key: lookup("MAPS_API_KEY").filter(|key| !key.is_empty()),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            timeout: self.api_timeout,
            ..RetryPolicy::default()
        }
    }
}

fn default_cache_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("code", "call-triage", "call-triage-mcp")
        .ok_or_else(|| anyhow!("unable to find project directory"))?;
    Ok(dirs.cache_dir().to_path_buf())
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}, using the default", name, raw);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn defaults() {
        let settings = settings(&[("CACHE_DIR", "./cache")]);

        assert_eq!(settings.cache_dir, PathBuf::from("./cache"));
        assert_eq!(settings.cache_duration, Duration::from_secs(300));
        assert_eq!(settings.api_timeout, Duration::from_secs(30));
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.weather_api_key, None);
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let settings = settings(&[
            ("CACHE_DIR", "/tmp/c"),
            ("CACHE_DURATION", "60"),
            ("API_TIMEOUT", "soon"),
            ("MAX_RETRIES", "5"),
            ("WEATHER_API_KEY", "abc"),
            ("NEWS_API_KEY", ""),
        ]);

        assert_eq!(settings.cache_duration, Duration::from_secs(60));
        assert_eq!(settings.api_timeout, Duration::from_secs(30));
        assert_eq!(settings.weather_api_key.as_deref(), Some("abc"));
        assert_eq!(settings.news_api_key, None);

        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }
}

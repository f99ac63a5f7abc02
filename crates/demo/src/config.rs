// Process-wide configuration for the demo binary: defaults, an optional
// `convoy.toml`, then `CONVOY_*` environment variables, in that order of
// increasing precedence.

use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    pub prefix: String,
    pub log_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub database: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    pub keys: KeysConfig,
    pub redis: RedisConfig,
}

impl DemoConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("keys.prefix", "convoy")?
            .set_default("keys.log_ttl_secs", 86_400)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .add_source(File::with_name("convoy").required(false))
            .add_source(Environment::with_prefix("CONVOY").separator("_").try_parsing(true));

        // `CONVOY_LOG_TTL_SECS` is a flat env name over a nested config key,
        // so it needs an explicit override rather than the prefix/separator
        // convention the other three keys follow.
        if let Ok(value) = std::env::var("CONVOY_LOG_TTL_SECS") {
            builder = builder.set_override("keys.log_ttl_secs", value)?;
        }

        builder.build()?.try_deserialize()
    }
}

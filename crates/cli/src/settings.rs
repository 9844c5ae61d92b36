//! Configuration loading
//!
//! Layers, lowest to highest precedence: built-in defaults, an optional
//! TOML file, then `DEADLETTER_*` environment variables.
//!
//! ```text
//! DEADLETTER_STORE__ADDRESS=redis.internal:6379
//! DEADLETTER_STORE__CREDENTIAL=secret
//! DEADLETTER_QUEUE_KEY=orders
//! DEADLETTER_DEAD_STATUS_CODES=429,500,503
//! DEADLETTER_HTTP__TIMEOUT_MS=10000
//! ```

use anyhow::{Context, Result};
use config::{Config, Environment, File, Map, Source};
use deadletter_core::config::ClientConfig;
use std::path::Path;

const ENV_PREFIX: &str = "DEADLETTER";

/// Load configuration from the optional file and the process environment
pub fn load(path: Option<&Path>) -> Result<ClientConfig> {
    let file = path.map(|p| File::from(p).required(true));
    resolve(file, environment(None))
        .with_context(|| match path {
            Some(p) => format!("Invalid configuration (file: {})", p.display()),
            None => "Invalid configuration".to_string(),
        })
}

fn environment(vars: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("dead_status_codes")
        .try_parsing(true)
        .source(vars)
}

fn resolve<S>(file: Option<S>, env: Environment) -> Result<ClientConfig>
where
    S: Source + Send + Sync + 'static,
{
    let mut builder = Config::builder();
    if let Some(file) = file {
        builder = builder.add_source(file);
    }
    let config: ClientConfig = builder.add_source(env).build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

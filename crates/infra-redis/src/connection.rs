// Redis Connection Setup

use crate::error::map_redis_error;
use deadletter_core::config::StoreConfig;
use deadletter_core::error::Result;
use redis::aio::MultiplexedConnection;
use redis::{Client, ConnectionInfo, IntoConnectionInfo};
use tracing::debug;

/// Resolve the configured address and credential into connection info
///
/// Accepts `host:port` or a full `redis://` URL. A configured credential
/// overrides any password embedded in the URL.
pub fn connection_info(config: &StoreConfig) -> Result<ConnectionInfo> {
    let url = if config.address.contains("://") {
        config.address.clone()
    } else {
        format!("redis://{}", config.address)
    };

    let mut info = url.as_str().into_connection_info().map_err(map_redis_error)?;
    if let Some(credential) = config.credential.as_ref().filter(|c| !c.is_empty()) {
        info.redis.password = Some(credential.clone());
    }
    Ok(info)
}

/// Open a multiplexed async connection
pub async fn connect(config: &StoreConfig) -> Result<MultiplexedConnection> {
    let client = Client::open(connection_info(config)?).map_err(map_redis_error)?;
    let conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(map_redis_error)?;
    debug!(address = %config.address, "Connected to store");
    Ok(conn)
}

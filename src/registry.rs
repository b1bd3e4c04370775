//! Process-wide driver registration.
//!
//! Applications opt in by name: the rewriting driver is registered next to
//! the native one, never in its place.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::config::ShimConfig;
use crate::driver::{Connection, Driver};
use crate::error::{ShimError, ShimResult};
use crate::intercept::RewritingDriver;

static DRIVERS: LazyLock<RwLock<HashMap<String, Arc<dyn Driver>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register `driver` under `name`.
pub fn register_driver(name: &str, driver: Arc<dyn Driver>) -> ShimResult<()> {
    let mut drivers = DRIVERS.write().unwrap_or_else(PoisonError::into_inner);
    if drivers.contains_key(name) {
        tracing::warn!(driver = name, "driver already registered");
        return Err(ShimError::DuplicateDriver(name.to_string()));
    }
    drivers.insert(name.to_string(), driver);
    tracing::debug!(driver = name, "registered driver");
    Ok(())
}

/// Wrap `inner` in a [`RewritingDriver`] and register it under the
/// configured name.
pub fn register_rewriting(config: &ShimConfig, inner: Arc<dyn Driver>) -> ShimResult<()> {
    register_driver(&config.driver_name, Arc::new(RewritingDriver::new(inner)))
}

/// Look up a registered driver.
pub fn driver(name: &str) -> ShimResult<Arc<dyn Driver>> {
    DRIVERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
        .ok_or_else(|| ShimError::UnknownDriver(name.to_string()))
}

/// Open a connection through the driver registered as `name`.
pub async fn open(name: &str, dsn: &str) -> ShimResult<Box<dyn Connection>> {
    let driver = driver(name)?;
    driver.open(dsn).await.map_err(ShimError::Driver)
}

/// Names of all registered drivers, sorted.
pub fn drivers() -> Vec<String> {
    let mut names: Vec<String> = DRIVERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

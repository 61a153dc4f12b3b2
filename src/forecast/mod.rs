pub mod autocomplete;
pub mod openmeteo;
pub mod types;

use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;
use types::*;

pub type ForecastCache = Cache<String, Forecast>;

pub fn init_cache(ttl: Duration) -> ForecastCache {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(ttl)
        .build()
}

/// Hex SHA-256 over `"{latitude}_{longitude}_{units}"`.
pub fn cache_key(latitude: f64, longitude: f64, units: Units) -> String {
    let digest = Sha256::digest(format!("{}_{}_{}", latitude, longitude, units).as_bytes());
    hex::encode(digest)
}

//! Parking discovery and the persisted detail cache.

mod cache;
mod directory;

pub use cache::{CacheError, DetailCacheConfig, ParkingDetailCache, PopulateReport};
pub use directory::{
    DEFAULT_CURRENCY_DECIMALS, ParkingDirectory, WarmCacheError, flat_price,
};

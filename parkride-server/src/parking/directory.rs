//! Parking discovery around a destination.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Coordinate, Parking, ParkingRecord};
use crate::geo;
use crate::providers::{ParkingDirectoryProvider, ProviderError, RetryPolicy};

use super::cache::{CacheError, ParkingDetailCache, PopulateReport, write_json};

/// Decimal places prices are rounded to.
pub const DEFAULT_CURRENCY_DECIMALS: u32 = 2;

/// Errors warming the detail cache.
#[derive(Debug, thiserror::Error)]
pub enum WarmCacheError {
    #[error("listing parkings failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A parking directory backed by the detail cache.
///
/// Listing and detail calls both go through the retry policy, so a
/// throttled directory slows discovery down instead of failing it.
pub struct ParkingDirectory<P> {
    provider: P,
    cache: Arc<ParkingDetailCache>,
    retry: RetryPolicy,
    currency_decimals: u32,
    listing_snapshot: Option<PathBuf>,
}

impl<P: ParkingDirectoryProvider> ParkingDirectory<P> {
    pub fn new(provider: P, cache: Arc<ParkingDetailCache>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            cache,
            retry,
            currency_decimals: DEFAULT_CURRENCY_DECIMALS,
            listing_snapshot: None,
        }
    }

    /// `warm_cache` also writes the raw listing it worked from to `path`.
    pub fn with_listing_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.listing_snapshot = Some(path.into());
        self
    }

    pub fn with_currency_decimals(mut self, decimals: u32) -> Self {
        self.currency_decimals = decimals;
        self
    }

    pub fn cache(&self) -> &Arc<ParkingDetailCache> {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn list_records(
        &self,
        center: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<ParkingRecord>, ProviderError> {
        let bbox = geo::bounding_box(center, radius_m);
        self.retry
            .run("parking listing", || self.provider.list(bbox))
            .await
    }

    /// Parkings within roughly `radius_m` of `destination`.
    ///
    /// Names and addresses come from the detail cache; a record that can't
    /// be fetched keeps them empty. The cache is flushed when it grew.
    pub async fn list_parkings(
        &self,
        destination: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<Parking>, ProviderError> {
        let records = self.list_records(destination, radius_m).await?;
        debug!(count = records.len(), %destination, radius_m, "listed parkings");

        let cached_before = self.cache.len();
        let mut parkings = Vec::with_capacity(records.len());

        for record in records {
            let price = flat_price(record.rate_24h, self.currency_decimals);
            let parking = Parking::new(record.id, record.coordinates, price);

            let parking = match self
                .cache
                .get_or_fetch(&self.provider, &self.retry, &parking.id)
                .await
            {
                Ok(detail) => parking.with_detail(&detail),
                Err(e) => {
                    warn!(id = %parking.id, error = %e, "no detail for parking");
                    parking
                }
            };
            parkings.push(parking);
        }

        if self.cache.len() > cached_before
            && let Err(e) = self.cache.flush()
        {
            warn!(error = %e, "failed to flush detail cache");
        }

        Ok(parkings)
    }

    /// Fetches detail records for every parking around `center` that the
    /// cache doesn't have yet.
    pub async fn warm_cache<C>(
        &self,
        center: Coordinate,
        radius_m: f64,
        cancel: C,
    ) -> Result<PopulateReport, WarmCacheError>
    where
        C: Future<Output = ()>,
    {
        let records = self.list_records(center, radius_m).await?;
        info!(count = records.len(), %center, radius_m, "warming detail cache");

        if let Some(path) = &self.listing_snapshot {
            write_json(path, &records)?;
            info!(path = %path.display(), "wrote listing snapshot");
        }

        let ids = records.into_iter().map(|r| r.id);
        Ok(self
            .cache
            .populate_all(&self.provider, &self.retry, ids, cancel)
            .await?)
    }
}

/// Half the published 24 hour rate, rounded to `decimals` places.
///
/// A site without a rate is free.
pub fn flat_price(rate_24h: Option<f64>, decimals: u32) -> f64 {
    let Some(rate) = rate_24h else {
        return 0.0;
    };
    let scale = 10f64.powi(decimals as i32);
    ((rate / 2.0) * scale).round() / scale
}

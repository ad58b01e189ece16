//! Application state for the web layer.

use std::sync::Arc;

use crate::parking::ParkingDirectory;
use crate::planner::{Planner, PlannerConfig};
use crate::providers::{DriveLegProvider, ParkingDirectoryProvider, TransitLegProvider};

/// Shared application state.
///
/// Generic over the providers so the same router serves the HTTP clients
/// in production and the stubs in tests.
pub struct AppState<D, T, P, G> {
    /// Road routing
    pub drive: Arc<D>,

    /// Public transport routing
    pub transit: Arc<T>,

    /// Parking discovery with its detail cache
    pub directory: Arc<ParkingDirectory<P>>,

    /// Address lookup
    pub geocoder: Arc<G>,

    /// Journey planner configuration
    pub config: Arc<PlannerConfig>,
}

impl<D, T, P, G> AppState<D, T, P, G> {
    /// Create a new app state.
    pub fn new(
        drive: Arc<D>,
        transit: Arc<T>,
        directory: Arc<ParkingDirectory<P>>,
        geocoder: Arc<G>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            drive,
            transit,
            directory,
            geocoder,
            config: Arc::new(config),
        }
    }

    /// A planner borrowing this state's providers.
    pub fn planner(&self) -> Planner<'_, D, T, P>
    where
        D: DriveLegProvider,
        T: TransitLegProvider,
        P: ParkingDirectoryProvider,
    {
        Planner::new(&self.drive, &self.transit, &self.directory, &self.config)
    }
}

impl<D, T, P, G> Clone for AppState<D, T, P, G> {
    fn clone(&self) -> Self {
        Self {
            drive: Arc::clone(&self.drive),
            transit: Arc::clone(&self.transit),
            directory: Arc::clone(&self.directory),
            geocoder: Arc::clone(&self.geocoder),
            config: Arc::clone(&self.config),
        }
    }
}

//! Configuration for the park-and-ride planner.

/// Configuration parameters for journey planning.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Time reserved between parking the car and boarding transit (seconds).
    pub transfer_buffer_secs: f64,

    /// Radius around the destination to look for parkings (metres).
    pub search_radius_m: f64,

    /// Number of candidate parkings whose legs are looked up concurrently.
    pub batch_size: usize,

    /// Number of lowest-price journeys kept.
    pub cheapest: usize,

    /// Number of shortest-duration journeys kept.
    pub quickest: usize,
}

impl PlannerConfig {
    /// Set the transfer buffer.
    pub fn with_transfer_buffer(mut self, secs: f64) -> Self {
        self.transfer_buffer_secs = secs;
        self
    }

    /// Set the parking search radius.
    pub fn with_search_radius(mut self, metres: f64) -> Self {
        self.search_radius_m = metres;
        self
    }

    /// Set the lookup batch size.
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            transfer_buffer_secs: 180.0, // 3 minutes
            search_radius_m: 1000.0,
            batch_size: 4,
            cheapest: 2,
            quickest: 2,
        }
    }
}

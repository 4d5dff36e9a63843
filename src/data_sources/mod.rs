//! External collaborators: where hotspots and region boundaries come from.
//!
//! The core never reaches for a global lookup. A [`FireDataSource`] and a
//! [`BoundaryProvider`] are handed to the service and orchestrator when they
//! are constructed.
//!
//! # Data Sources
//!
//! - [`firms`]: NASA FIRMS area API (VIIRS / MODIS hotspot CSV)
//! - [`boundaries`]: static region tables and the Nominatim geocoder

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{BoundingBox, Coordinate, Region};

pub mod boundaries;
pub mod firms;

pub use boundaries::{NominatimBoundaryProvider, StaticBoundaryProvider};
pub use firms::FirmsClient;

/// Hard limit on the number of days a single fetch may cover.
pub const MAX_DAYS_PER_REQUEST: u32 = 10;

/// Supplier of raw hotspot detections.
#[async_trait]
pub trait FireDataSource: Send + Sync {
    /// Fetch hotspots captured in `[start, start + day_range)`.
    ///
    /// `day_range` must be within `1..=10`. When `bbox` is `None` the whole
    /// world is queried. Low-confidence detections are already excluded.
    async fn fetch(
        &self,
        day_range: u32,
        start: NaiveDate,
        bbox: Option<BoundingBox>,
    ) -> Result<Vec<Coordinate>>;
}

/// Lookup of named administrative region boundaries.
#[async_trait]
pub trait BoundaryProvider: Send + Sync {
    /// Resolve a region by name; `Ok(None)` if no such region is known.
    async fn region(&self, name: &str) -> Result<Option<Region>>;
}

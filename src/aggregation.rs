//! Fire aggregation: clustering, region filtering and severity filtering.
//!
//! The free functions here are pure and synchronous. [`FireAggregationService`]
//! adds region name resolution through the configured [`BoundaryProvider`].
//!
//! Region and severity filtering are independent, so applying them in either
//! order yields the same set of fires.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clustering;
use crate::data_sources::BoundaryProvider;
use crate::error::Result;
use crate::geofence;
use crate::model::{BoundingBox, Coordinate, Fire, Region, SeverityFilter, is_all_regions};
use crate::severity;

/// Cluster raw hotspots into fires. Empty input gives an empty list.
pub fn create_fires(points: &[Coordinate]) -> Result<Vec<Fire>> {
    if points.is_empty() {
        return Ok(Vec::new());
    }
    clustering::cluster(points)
}

/// Keep the fires whose center lies inside `region`.
///
/// `None` stands for a named region that could not be resolved and yields no
/// fires. Callers that want no region restriction skip this call entirely.
pub fn filter_by_region(fires: &[Fire], region: Option<&Region>) -> Vec<Fire> {
    match region {
        Some(region) => fires
            .iter()
            .filter(|f| geofence::contains(f.center(), region))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

/// Keep the fires matching the severity filter.
pub fn filter_by_severity(fires: &[Fire], filter: SeverityFilter) -> Vec<Fire> {
    severity::classify(fires, filter)
}

/// What a requested region name resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionScope {
    /// The "All" pseudo-region: no filtering.
    All,
    /// A region with a known (possibly empty) boundary.
    Named(Region),
    /// A name the boundary provider does not know.
    Unresolved(String),
}

impl RegionScope {
    /// Label used in reports.
    pub fn label(&self) -> &str {
        match self {
            RegionScope::All => crate::model::ALL_REGIONS,
            RegionScope::Named(region) => &region.name,
            RegionScope::Unresolved(name) => name,
        }
    }

    /// Extent to restrict fetches to; `None` means the whole world.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            RegionScope::Named(region) => region.bounding_box(),
            _ => None,
        }
    }

    /// True when no fire can ever match this scope.
    pub fn is_empty(&self) -> bool {
        match self {
            RegionScope::All => false,
            RegionScope::Named(region) => !region.has_boundary(),
            RegionScope::Unresolved(_) => true,
        }
    }

    /// Filter fires to this scope.
    pub fn apply(&self, fires: &[Fire]) -> Vec<Fire> {
        match self {
            RegionScope::All => fires.to_vec(),
            RegionScope::Named(region) => filter_by_region(fires, Some(region)),
            RegionScope::Unresolved(_) => filter_by_region(fires, None),
        }
    }
}

/// Aggregation service bound to a boundary provider.
#[derive(Clone)]
pub struct FireAggregationService {
    boundaries: Arc<dyn BoundaryProvider>,
}

impl FireAggregationService {
    pub fn new(boundaries: Arc<dyn BoundaryProvider>) -> Self {
        Self { boundaries }
    }

    /// Resolve a region name; "All" never hits the boundary provider.
    ///
    /// Lookup transport failures propagate. A name that is simply not known
    /// becomes [`RegionScope::Unresolved`].
    pub async fn resolve(&self, name: &str) -> Result<RegionScope> {
        if is_all_regions(name) {
            return Ok(RegionScope::All);
        }
        match self.boundaries.region(name).await? {
            Some(region) => {
                debug!(region = %region.name, polygons = region.polygons.len(), "Region resolved");
                Ok(RegionScope::Named(region))
            }
            None => {
                warn!(region = %name, "Region not found, treating as no matches");
                Ok(RegionScope::Unresolved(name.trim().to_string()))
            }
        }
    }

    /// Resolve `name` and filter `fires` to it.
    pub async fn filter_by_region_name(&self, fires: &[Fire], name: &str) -> Result<Vec<Fire>> {
        Ok(self.resolve(name).await?.apply(fires))
    }
}

//! Firetrend - wildfire clustering and trend reporting from satellite hotspots.
//!
//! # Overview
//!
//! Firetrend fetches thermal-anomaly detections ("hotspots") for a date range,
//! clusters nearby hotspots into discrete fires, keeps the fires that fall
//! inside requested administrative regions, classifies them by radiative
//! power, and reports hotspot counts per day, month or year.
//!
//! Distances are planar lat/lon differences throughout.
//!
//! # Modules
//!
//! - [`model`]: Coordinates, fires, regions and report types
//! - [`error`]: Error taxonomy
//! - [`clustering`]: Chained-adjacency clustering of hotspots into fires
//! - [`severity`]: FRP-based severity filtering
//! - [`geofence`]: Point-in-region containment
//! - [`aggregation`]: Composition of clustering, geofencing and severity
//! - [`orchestrator`]: Day-limited batching and trend reports
//! - [`data_sources`]: Fire data source and boundary provider seams, with FIRMS and Nominatim clients
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod clustering;
pub mod data_sources;
pub mod error;
pub mod geofence;
pub mod model;
pub mod orchestrator;
pub mod severity;

pub use error::{FireError, Result};

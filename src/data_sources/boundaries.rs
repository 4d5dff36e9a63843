//! Region boundary providers.
//!
//! - [`StaticBoundaryProvider`]: a fixed table of regions, optionally loaded from JSON
//! - [`NominatimBoundaryProvider`]: OpenStreetMap Nominatim geocoder with polygon output
//!
//! # API Reference
//!
//! See: <https://nominatim.org/release-docs/latest/api/Search/>

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::BoundaryProvider;
use crate::error::{Result, data_source};
use crate::model::{Polygon, Region, Vertex};

/// Base URL for the public Nominatim instance.
const NOMINATIM_API_BASE: &str = "https://nominatim.openstreetmap.org";

/// In-memory boundary table with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticBoundaryProvider {
    regions: HashMap<String, Region>,
}

impl StaticBoundaryProvider {
    pub fn new(regions: Vec<Region>) -> Self {
        let regions = regions
            .into_iter()
            .map(|r| (r.name.trim().to_lowercase(), r))
            .collect();
        Self { regions }
    }

    /// Load regions from a JSON array of `{"name": ..., "polygons": [[{"lat": .., "lon": ..}]]}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let regions: Vec<Region> = serde_json::from_str(&contents)?;
        Ok(Self::new(regions))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[async_trait]
impl BoundaryProvider for StaticBoundaryProvider {
    async fn region(&self, name: &str) -> Result<Option<Region>> {
        Ok(self.regions.get(&name.trim().to_lowercase()).cloned())
    }
}

/// Boundary lookup backed by Nominatim's `polygon_geojson` search output.
#[derive(Clone)]
pub struct NominatimBoundaryProvider {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimBoundaryProvider {
    /// Create a new provider.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identifying user agent (required by the Nominatim usage policy).
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_url(NOMINATIM_API_BASE, user_agent)
    }

    /// Create a provider with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl BoundaryProvider for NominatimBoundaryProvider {
    #[instrument(skip(self))]
    async fn region(&self, name: &str) -> Result<Option<Region>> {
        let url = format!(
            "{}/search?q={}&format=json&polygon_geojson=1&limit=1",
            self.base_url,
            urlencoding::encode(name.trim())
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(data_source(format!("Nominatim returned HTTP {status}")));
        }

        let places = response.json::<Vec<NominatimPlace>>().await?;
        let region = places
            .into_iter()
            .next()
            .map(|place| Region::new(name.trim(), polygons_from_geojson(&place.geojson)));

        debug!(
            found = region.is_some(),
            polygons = region.as_ref().map_or(0, |r| r.polygons.len()),
            "Resolved region boundary"
        );
        Ok(region)
    }
}

/// A single search hit from Nominatim.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    geojson: Value,
}

/// Outer rings of a GeoJSON `Polygon` or `MultiPolygon`.
///
/// Other geometry types (points for small places, lines) have no area and
/// produce an empty list, i.e. an unknown boundary.
pub fn polygons_from_geojson(geometry: &Value) -> Vec<Polygon> {
    let coords = &geometry["coordinates"];
    match geometry["type"].as_str() {
        Some("Polygon") => coords
            .get(0)
            .map(ring_from_geojson)
            .into_iter()
            .collect(),
        Some("MultiPolygon") => coords
            .as_array()
            .map(|polys| {
                polys
                    .iter()
                    .filter_map(|p| p.get(0))
                    .map(ring_from_geojson)
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// GeoJSON positions are `[lon, lat]`.
fn ring_from_geojson(ring: &Value) -> Polygon {
    ring.as_array()
        .map(|positions| {
            positions
                .iter()
                .filter_map(|pos| {
                    let lon = pos.get(0)?.as_f64()?;
                    let lat = pos.get(1)?.as_f64()?;
                    Some(Vertex::new(lat, lon))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_lookup_is_case_insensitive() {
        let provider = StaticBoundaryProvider::new(vec![Region::unknown("Ontario")]);

        let found = provider.region("  ONTARIO ").await.unwrap();
        assert_eq!(found.unwrap().name, "Ontario");
        assert!(provider.region("Quebec").await.unwrap().is_none());
        assert_eq!(provider.len(), 1);
    }

    #[test]
    fn test_regions_from_json() {
        let text = r#"[{"name": "Box", "polygons": [[{"lat": 0, "lon": 0}, {"lat": 0, "lon": 1}, {"lat": 1, "lon": 1}]]}, {"name": "Nowhere"}]"#;
        let regions: Vec<Region> = serde_json::from_str(text).unwrap();
        assert_eq!(regions[0].polygons[0].len(), 3);
        assert!(regions[1].polygons.is_empty());
    }

    #[test]
    fn test_polygon_geojson() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [
                [[-80.0, 43.0], [-79.0, 43.0], [-79.0, 44.0], [-80.0, 43.0]],
                [[-79.6, 43.4], [-79.4, 43.4], [-79.4, 43.6], [-79.6, 43.4]]
            ]
        });
        let polygons = polygons_from_geojson(&geometry);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0][1], Vertex::new(43.0, -79.0));
    }

    #[test]
    fn test_multipolygon_geojson() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
            ]
        });
        let polygons = polygons_from_geojson(&geometry);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[1][0], Vertex::new(5.0, 5.0));
    }

    #[test]
    fn test_point_geojson_has_no_boundary() {
        let geometry = json!({"type": "Point", "coordinates": [1.0, 2.0]});
        assert!(polygons_from_geojson(&geometry).is_empty());
        assert!(polygons_from_geojson(&Value::Null).is_empty());
    }
}

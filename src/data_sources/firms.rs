//! NASA FIRMS (Fire Information for Resource Management System) client.
//!
//! FIRMS distributes near real-time active fire detections from the VIIRS and
//! MODIS instruments. The area API returns one CSV row per hotspot:
//!
//! ```text
//! [BASE_URL]/api/area/csv/[MAP_KEY]/[SOURCE]/[AREA]/[DAY_RANGE]/[DATE]
//! ```
//!
//! where `AREA` is `world` or `west,south,east,north` and `DAY_RANGE` is 1..10.
//!
//! # API Reference
//!
//! See: <https://firms.modaps.eosdis.nasa.gov/api/area/>

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{FireDataSource, MAX_DAYS_PER_REQUEST};
use crate::error::{Result, data_source};
use crate::model::{BoundingBox, Confidence, Coordinate, DayNight};

/// Base URL for the FIRMS API.
const FIRMS_API_BASE: &str = "https://firms.modaps.eosdis.nasa.gov";

/// Default product: VIIRS on Suomi NPP, near real-time.
pub const DEFAULT_FIRMS_SOURCE: &str = "VIIRS_SNPP_NRT";

/// Client for the FIRMS area API.
#[derive(Clone)]
pub struct FirmsClient {
    client: reqwest::Client,
    base_url: String,
    map_key: String,
    source: String,
}

impl FirmsClient {
    /// Create a new FIRMS client.
    ///
    /// # Arguments
    ///
    /// * `map_key` - FIRMS MAP_KEY (rate limited, keep private)
    /// * `source` - FIRMS product identifier, e.g. `VIIRS_SNPP_NRT` or `MODIS_NRT`
    pub fn new(map_key: &str, source: &str) -> Self {
        Self::with_base_url(FIRMS_API_BASE, map_key, source)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, map_key: &str, source: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            map_key: map_key.to_string(),
            source: source.to_string(),
        }
    }

    fn request_url(&self, day_range: u32, start: NaiveDate, bbox: Option<BoundingBox>) -> String {
        let area = bbox.map_or_else(|| "world".to_string(), |b| b.to_string());
        format!(
            "{}/api/area/csv/{}/{}/{}/{}/{}",
            self.base_url,
            self.map_key,
            self.source,
            area,
            day_range,
            start.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl FireDataSource for FirmsClient {
    #[instrument(skip(self), fields(source = %self.source))]
    async fn fetch(
        &self,
        day_range: u32,
        start: NaiveDate,
        bbox: Option<BoundingBox>,
    ) -> Result<Vec<Coordinate>> {
        if !(1..=MAX_DAYS_PER_REQUEST).contains(&day_range) {
            return Err(data_source(format!(
                "day range {day_range} outside 1..={MAX_DAYS_PER_REQUEST}"
            )));
        }

        let url = self.request_url(day_range, start, bbox);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(data_source(format!("FIRMS returned HTTP {status}")));
        }

        let body = response.text().await?;
        let hotspots = parse_hotspots(&body)?;
        debug!(count = hotspots.len(), "Fetched FIRMS hotspots");
        Ok(hotspots)
    }
}

/// Raw FIRMS CSV record. VIIRS and MODIS name their brightness columns differently.
#[derive(Debug, Deserialize)]
struct RawHotspot {
    latitude: f64,
    longitude: f64,
    #[serde(alias = "brightness", default)]
    bright_ti4: Option<f64>,
    #[serde(alias = "bright_t31", default)]
    bright_ti5: Option<f64>,
    acq_date: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    frp: Option<f64>,
    #[serde(default)]
    daynight: String,
}

/// Parse a FIRMS CSV body into hotspots.
///
/// Low-confidence rows and rows with out-of-range coordinates are dropped. A
/// body that is not CSV (FIRMS answers bad keys with a plain text message) is
/// a data source error. An empty body means no detections.
pub fn parse_hotspots(body: &str) -> Result<Vec<Coordinate>> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }
    if !body.starts_with("latitude") {
        let first_line = body.lines().next().unwrap_or_default();
        return Err(data_source(format!("unexpected FIRMS response: {first_line}")));
    }

    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut hotspots = Vec::new();

    for record in reader.deserialize() {
        let raw: RawHotspot = record?;

        let confidence = Confidence::from_code(&raw.confidence);
        if confidence == Some(Confidence::Low) {
            continue;
        }

        let coord = match Coordinate::new(raw.latitude, raw.longitude) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "Skipping FIRMS row");
                continue;
            }
        };

        let mut coord = coord
            .with_brightness(raw.bright_ti4.unwrap_or(0.0), raw.bright_ti5.unwrap_or(0.0))
            .with_frp(raw.frp.unwrap_or(0.0));
        if let Ok(date) = NaiveDate::parse_from_str(raw.acq_date.trim(), "%Y-%m-%d") {
            coord = coord.with_capture_date(date);
        }
        if let Some(dn) = DayNight::from_code(&raw.daynight) {
            coord = coord.with_day_night(dn);
        }
        if let Some(conf) = confidence {
            coord = coord.with_confidence(conf);
        }

        hotspots.push(coord);
    }

    Ok(hotspots)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIIRS_CSV: &str = "\
latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight
43.70000,-79.40000,330.5,0.39,0.36,2025-11-20,0612,N,VIIRS,n,2.0NRT,290.1,5.0,N
43.70010,-79.40010,331.0,0.39,0.36,2025-11-20,0612,N,VIIRS,h,2.0NRT,291.0,5.0,N
10.00000,10.00000,300.0,0.39,0.36,2025-11-21,1810,N,VIIRS,l,2.0NRT,280.0,0.7,D
";

    const MODIS_CSV: &str = "\
latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight
-33.9,151.2,320.4,1.0,1.0,2025-01-05,0300,Terra,MODIS,85,6.1NRT,295.0,12.5,D
-34.0,151.3,310.0,1.0,1.0,2025-01-05,0300,Terra,MODIS,20,6.1NRT,290.0,1.5,D
";

    #[test]
    fn test_parse_viirs_drops_low_confidence() {
        let hotspots = parse_hotspots(VIIRS_CSV).unwrap();
        assert_eq!(hotspots.len(), 2);

        let first = &hotspots[0];
        assert_eq!(first.lat(), 43.7);
        assert_eq!(first.lon(), -79.4);
        assert_eq!(first.brightness(), 330.5);
        assert_eq!(first.brightness_secondary(), 290.1);
        assert_eq!(first.frp(), 5.0);
        assert_eq!(first.capture_date(), NaiveDate::from_ymd_opt(2025, 11, 20));
        assert_eq!(first.day_night(), Some(DayNight::Night));
        assert_eq!(first.confidence(), Some(Confidence::Nominal));
        assert_eq!(hotspots[1].confidence(), Some(Confidence::High));
    }

    #[test]
    fn test_parse_modis_columns() {
        let hotspots = parse_hotspots(MODIS_CSV).unwrap();
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].brightness(), 320.4);
        assert_eq!(hotspots[0].brightness_secondary(), 295.0);
        assert_eq!(hotspots[0].confidence(), Some(Confidence::High));
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_hotspots("").unwrap().is_empty());
        assert!(parse_hotspots("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_message_body() {
        let err = parse_hotspots("Invalid MAP_KEY.").unwrap_err();
        assert!(matches!(err, crate::error::FireError::DataSource(_)));
        assert!(err.to_string().contains("Invalid MAP_KEY"));
    }

    #[test]
    fn test_request_url() {
        let client = FirmsClient::with_base_url("http://localhost:9999/", "KEY", "VIIRS_SNPP_NRT");
        let start = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();

        assert_eq!(
            client.request_url(3, start, None),
            "http://localhost:9999/api/area/csv/KEY/VIIRS_SNPP_NRT/world/3/2025-11-18"
        );

        let bbox = BoundingBox {
            min_lon: -80.5,
            min_lat: 43.0,
            max_lon: -79.0,
            max_lat: 44.5,
        };
        assert_eq!(
            client.request_url(1, start, Some(bbox)),
            "http://localhost:9999/api/area/csv/KEY/VIIRS_SNPP_NRT/-80.5,43,-79,44.5/1/2025-11-18"
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_day_range() {
        let client = FirmsClient::new("KEY", DEFAULT_FIRMS_SOURCE);
        let start = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();

        let err = client.fetch(11, start, None).await.unwrap_err();
        assert!(err.to_string().contains("day range 11"));
        assert!(client.fetch(0, start, None).await.is_err());
    }
}

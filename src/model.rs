//! Data models for Firetrend.
//!
//! Hotspots arrive as [`Coordinate`]s, get bundled into [`Fire`]s by the
//! clustering engine, and are attributed to administrative [`Region`]s by the
//! geofence. The report types at the bottom of this module are what the
//! orchestrator hands back to callers.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FireError, Result, validation};

/// Pseudo-region name meaning "do not restrict by region".
pub const ALL_REGIONS: &str = "All";

/// True if `name` is the "All" pseudo-region (case-insensitive).
pub fn is_all_regions(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(ALL_REGIONS)
}

/// Whether a detection was captured during the day or night pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayNight {
    Day,
    Night,
}

impl DayNight {
    /// Parse the FIRMS `daynight` code (`D` / `N`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "D" | "d" => Some(DayNight::Day),
            "N" | "n" => Some(DayNight::Night),
            _ => None,
        }
    }
}

/// Detection confidence class reported by the satellite product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Nominal,
    High,
}

impl Confidence {
    /// Parse a FIRMS confidence value.
    ///
    /// VIIRS products use `l`/`n`/`h`; MODIS reports a percentage where
    /// values below 30 are low and values below 80 are nominal.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        match code.to_ascii_lowercase().as_str() {
            "l" | "low" => Some(Confidence::Low),
            "n" | "nominal" => Some(Confidence::Nominal),
            "h" | "high" => Some(Confidence::High),
            _ => code.parse::<u8>().ok().map(|pct| {
                if pct < 30 {
                    Confidence::Low
                } else if pct < 80 {
                    Confidence::Nominal
                } else {
                    Confidence::High
                }
            }),
        }
    }
}

/// A single hotspot detection, or the synthetic center of a fire.
///
/// Latitude and longitude are validated on construction. Derived points carry
/// `None` for capture date, day/night flag and confidence since they have no
/// single capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
    capture_date: Option<NaiveDate>,
    day_night: Option<DayNight>,
    confidence: Option<Confidence>,
    brightness: f64,
    brightness_secondary: f64,
    frp: f64,
}

/// Unchecked wire form of [`Coordinate`]; deserialization goes through [`Coordinate::new`].
#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
    #[serde(default)]
    capture_date: Option<NaiveDate>,
    #[serde(default)]
    day_night: Option<DayNight>,
    #[serde(default)]
    confidence: Option<Confidence>,
    #[serde(default)]
    brightness: f64,
    #[serde(default)]
    brightness_secondary: f64,
    #[serde(default)]
    frp: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = FireError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Ok(Self {
            capture_date: raw.capture_date,
            day_night: raw.day_night,
            confidence: raw.confidence,
            brightness: raw.brightness,
            brightness_secondary: raw.brightness_secondary,
            frp: raw.frp,
            ..Self::new(raw.lat, raw.lon)?
        })
    }
}

impl Coordinate {
    /// Create a coordinate with no capture metadata.
    ///
    /// Fails with a validation error if `lat` is outside [-90, 90] or `lon`
    /// is outside [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(validation(format!("latitude {lat} out of range [-90, 90]")));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(validation(format!(
                "longitude {lon} out of range [-180, 180]"
            )));
        }
        Ok(Self {
            lat,
            lon,
            capture_date: None,
            day_night: None,
            confidence: None,
            brightness: 0.0,
            brightness_secondary: 0.0,
            frp: 0.0,
        })
    }

    pub fn with_capture_date(mut self, date: NaiveDate) -> Self {
        self.capture_date = Some(date);
        self
    }

    pub fn with_day_night(mut self, day_night: DayNight) -> Self {
        self.day_night = Some(day_night);
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set both brightness temperature channels (Kelvin).
    pub fn with_brightness(mut self, primary: f64, secondary: f64) -> Self {
        self.brightness = primary;
        self.brightness_secondary = secondary;
        self
    }

    pub fn with_frp(mut self, frp: f64) -> Self {
        self.frp = frp;
        self
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn capture_date(&self) -> Option<NaiveDate> {
        self.capture_date
    }

    pub fn day_night(&self) -> Option<DayNight> {
        self.day_night
    }

    pub fn confidence(&self) -> Option<Confidence> {
        self.confidence
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn brightness_secondary(&self) -> f64 {
        self.brightness_secondary
    }

    /// Fire radiative power in megawatts.
    pub fn frp(&self) -> f64 {
        self.frp
    }
}

/// A wildfire event: a cluster of nearby hotspots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fire {
    center: Coordinate,
    radius: f64,
    members: Vec<Coordinate>,
}

impl Fire {
    /// Create a fire; the radius must be positive and the member list non-empty.
    pub fn new(center: Coordinate, radius: f64, members: Vec<Coordinate>) -> Result<Self> {
        if radius.is_nan() || radius <= 0.0 {
            return Err(validation("radius must be > 0"));
        }
        if members.is_empty() {
            return Err(validation("a fire needs at least one member hotspot"));
        }
        Ok(Self {
            center,
            radius,
            members,
        })
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn members(&self) -> &[Coordinate] {
        &self.members
    }

    /// Number of hotspots bundled into this fire.
    pub fn hotspot_count(&self) -> usize {
        self.members.len()
    }
}

/// Total number of member hotspots across a list of fires.
pub fn hotspot_count(fires: &[Fire]) -> usize {
    fires.iter().map(Fire::hotspot_count).sum()
}

/// A polygon vertex in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub lat: f64,
    pub lon: f64,
}

impl Vertex {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// An implicitly closed ring of vertices.
pub type Polygon = Vec<Vertex>;

/// A named administrative region made up of one or more polygons.
///
/// An empty polygon list means the boundary is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub polygons: Vec<Polygon>,
}

impl Region {
    pub fn new(name: &str, polygons: Vec<Polygon>) -> Self {
        Self {
            name: name.to_string(),
            polygons,
        }
    }

    /// A region whose boundary could not be determined.
    pub fn unknown(name: &str) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn has_boundary(&self) -> bool {
        self.polygons.iter().any(|p| !p.is_empty())
    }

    /// Smallest box enclosing every vertex, or `None` if the boundary is unknown.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut vertices = self.polygons.iter().flatten();
        let first = vertices.next()?;
        let mut bbox = BoundingBox {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        for v in vertices {
            bbox.min_lon = bbox.min_lon.min(v.lon);
            bbox.min_lat = bbox.min_lat.min(v.lat);
            bbox.max_lon = bbox.max_lon.max(v.lon);
            bbox.max_lat = bbox.max_lat.max(v.lat);
        }
        Some(bbox)
    }
}

/// Geographic extent used to restrict a fetch.
///
/// Renders as `"minLon,minLat,maxLon,maxLat"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Severity bucket used to narrow a list of fires by radiative power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityFilter {
    /// No filtering.
    #[default]
    Reset,
    Medium,
    High,
}

impl FromStr for SeverityFilter {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reset" | "all" | "" => Ok(SeverityFilter::Reset),
            "medium" => Ok(SeverityFilter::Medium),
            "high" => Ok(SeverityFilter::High),
            other => Err(validation(format!("unknown severity filter '{other}'"))),
        }
    }
}

// ============================================================================
// Report types
// ============================================================================

/// One labelled count bucket (a day, month or year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    pub label: String,
    pub count: usize,
}

impl PeriodCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Result of a single-period load.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub region: String,
    /// First day of the fetched window.
    pub start: NaiveDate,
    /// Number of days fetched after clamping.
    pub days: u32,
    pub fires: Vec<Fire>,
    pub counts: Vec<PeriodCount>,
}

/// Result of the multi-year national overview.
#[derive(Debug, Clone, Serialize)]
pub struct YearlyTrend {
    pub region: String,
    /// Fires from every year that matched the national boundary.
    pub fires: Vec<Fire>,
    /// One bucket per year, oldest first.
    pub counts: Vec<PeriodCount>,
    /// Years whose fetch failed and were recorded as zero.
    pub failed_years: Vec<i32>,
}

/// Daily hotspot counts for one requested region.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSeries {
    pub region: String,
    pub fires: Vec<Fire>,
    /// One bucket per calendar day of the window, ascending ISO dates.
    pub days: Vec<PeriodCount>,
}

/// A batch that could not be fetched and contributed no hotspots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub start: NaiveDate,
    pub days: u32,
    pub message: String,
}

/// Result of the multi-region windowed comparison.
#[derive(Debug, Clone, Serialize)]
pub struct RegionComparison {
    /// First day of the expanded window (inclusive).
    pub window_start: NaiveDate,
    /// Last day of the expanded window (inclusive).
    pub window_end: NaiveDate,
    pub series: Vec<RegionSeries>,
    pub failed_batches: Vec<BatchFailure>,
}

// ============================================================================
// Query parameters
// ============================================================================

/// Query parameters for GET /fires.
#[derive(Debug, Deserialize)]
pub struct FiresQuery {
    /// ISO reference date; today if absent.
    pub date: Option<String>,

    /// Requested day range (default: 1).
    #[serde(default = "default_range")]
    pub range: u32,

    /// Region name, or "All" (default).
    #[serde(default = "default_region")]
    pub region: String,

    /// Optional severity filter applied to the returned fires.
    pub severity: Option<String>,
}

/// Query parameters for GET /trend/national.
#[derive(Debug, Deserialize)]
pub struct NationalTrendQuery {
    pub date: Option<String>,

    #[serde(default = "default_range")]
    pub range: u32,
}

/// Query parameters for GET /trend/compare.
#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub date: Option<String>,

    #[serde(default = "default_range")]
    pub range: u32,

    /// Comma-separated region names; "All" is allowed.
    #[serde(default = "default_region")]
    pub regions: String,
}

fn default_range() -> u32 {
    1
}

fn default_region() -> String {
    ALL_REGIONS.to_string()
}

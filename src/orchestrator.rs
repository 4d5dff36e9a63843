//! Windowed fetch orchestration.
//!
//! The fire data source accepts at most ten days per request. This module
//! splits longer ranges into batches, fetches them concurrently, and folds the
//! results into per-period hotspot counts:
//!
//! - [`FireTrendOrchestrator::load_period`]: one fetch, one count bucket
//! - [`FireTrendOrchestrator::national_overview`]: one fetch per year over the last few years
//! - [`FireTrendOrchestrator::compare_regions`]: a batched window with daily counts per region
//!
//! # Usage
//!
//! ```ignore
//! let orchestrator = FireTrendOrchestrator::new(source, boundaries, OrchestratorConfig::default());
//! let report = orchestrator.compare_regions(Some("2025-11-20"), 2, &["Ontario".into()]).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::aggregation::{FireAggregationService, RegionScope, create_fires};
use crate::data_sources::{BoundaryProvider, FireDataSource, MAX_DAYS_PER_REQUEST};
use crate::error::{FireError, Result, data_source, orchestration, validation};
use crate::model::{
    ALL_REGIONS, BatchFailure, BoundingBox, Coordinate, Fire, PeriodCount, PeriodReport,
    RegionComparison, RegionSeries, YearlyTrend, hotspot_count,
};

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of days per data source request.
    pub max_days_per_request: u32,

    /// Number of years covered by the national overview, current year included.
    pub overview_years: u32,

    /// Region used as the national boundary for the overview.
    pub national_region: String,

    /// Per-batch deadline. A batch that exceeds it counts as a failed fetch.
    pub batch_timeout: Option<Duration>,

    /// Upper bound on batch fetches in flight at once.
    pub max_concurrent_fetches: usize,

    /// Largest day range accepted by the region comparison.
    pub max_comparison_range: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_days_per_request: MAX_DAYS_PER_REQUEST,
            overview_years: 4,
            national_region: "Canada".to_string(),
            batch_timeout: Some(Duration::from_secs(60)),
            max_concurrent_fetches: 4,
            max_comparison_range: 366,
        }
    }
}

/// One request to the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub start: NaiveDate,
    pub days: u32,
}

/// Parse a reference date (`YYYY-MM-DD`); a missing or blank value means `today`.
pub fn parse_reference_date(date: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match date.map(str::trim) {
        None | Some("") => Ok(today),
        Some(s) => Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?),
    }
}

fn add_days(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| orchestration(format!("date overflow adding {days} days to {date}")))
}

/// Expanded comparison window `[reference - range, reference + 2 * range)`.
///
/// Returns the first day and the number of days (`3 * range`).
pub fn comparison_window(reference: NaiveDate, range: u32) -> Result<(NaiveDate, u32)> {
    let start = reference
        .checked_sub_days(Days::new(u64::from(range)))
        .ok_or_else(|| orchestration(format!("date overflow subtracting {range} days")))?;
    let total = range
        .checked_mul(3)
        .ok_or_else(|| orchestration(format!("day range {range} too large")))?;
    // make sure the whole window is representable
    add_days(start, total)?;
    Ok((start, total))
}

/// Split `total_days` starting at `start` into consecutive batches of at most `max_days`.
pub fn split_into_batches(start: NaiveDate, total_days: u32, max_days: u32) -> Result<Vec<Batch>> {
    let max_days = max_days.max(1);
    let mut batches = Vec::new();
    let mut offset = 0;
    while offset < total_days {
        let days = (total_days - offset).min(max_days);
        batches.push(Batch {
            index: batches.len(),
            start: add_days(start, offset)?,
            days,
        });
        offset += days;
    }
    Ok(batches)
}

/// Hotspot counts per calendar day of `[start, start + total_days)`.
///
/// Every day appears, zero-count days included, in ascending order. Hotspots
/// without a capture date or outside the window are ignored.
pub fn daily_counts(fires: &[Fire], start: NaiveDate, total_days: u32) -> Vec<PeriodCount> {
    let mut buckets: BTreeMap<NaiveDate, usize> = start
        .iter_days()
        .take(total_days as usize)
        .map(|d| (d, 0))
        .collect();

    for date in fires
        .iter()
        .flat_map(|f| f.members())
        .filter_map(Coordinate::capture_date)
    {
        if let Some(count) = buckets.get_mut(&date) {
            *count += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, count)| PeriodCount::new(date.format("%Y-%m-%d").to_string(), count))
        .collect()
}

/// Same month/day as `reference` in `year`; Feb 29 falls back to Feb 28.
fn anniversary(reference: NaiveDate, year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, reference.month(), reference.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, reference.month(), 28))
        .ok_or_else(|| orchestration(format!("no anniversary of {reference} in {year}")))
}

/// Coordinates the data source, clustering and region filtering for trend reports.
#[derive(Clone)]
pub struct FireTrendOrchestrator {
    source: Arc<dyn FireDataSource>,
    aggregation: FireAggregationService,
    config: Arc<OrchestratorConfig>,
}

impl FireTrendOrchestrator {
    pub fn new(
        source: Arc<dyn FireDataSource>,
        boundaries: Arc<dyn BoundaryProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            source,
            aggregation: FireAggregationService::new(boundaries),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn aggregation(&self) -> &FireAggregationService {
        &self.aggregation
    }

    fn clamp_days(&self, range: u32) -> u32 {
        range.clamp(1, self.config.max_days_per_request.max(1))
    }

    /// Load fires for `[date, date + range)` with `range` clamped to the per-request limit.
    ///
    /// Emits one count bucket labelled with the start month (e.g. `Nov 2025`)
    /// holding the number of hotspots in the surviving fires. Any fetch
    /// failure fails the whole call.
    #[instrument(skip(self))]
    pub async fn load_period(
        &self,
        date: Option<&str>,
        range: u32,
        region: &str,
    ) -> Result<PeriodReport> {
        let start = parse_reference_date(date, Utc::now().date_naive())?;
        let days = self.clamp_days(range);
        let scope = self.aggregation.resolve(region).await?;
        let label = start.format("%b %Y").to_string();

        let fires = if scope.is_empty() {
            Vec::new()
        } else {
            let batch = Batch {
                index: 0,
                start,
                days,
            };
            let points = fetch_batch(
                self.source.clone(),
                batch,
                scope.bounding_box(),
                self.config.batch_timeout,
            )
            .await?;
            scope.apply(&create_fires(&points)?)
        };

        let count = hotspot_count(&fires);
        info!(
            region = %scope.label(),
            %start,
            days,
            fires = fires.len(),
            hotspots = count,
            "Period loaded"
        );

        Ok(PeriodReport {
            region: scope.label().to_string(),
            start,
            days,
            fires,
            counts: vec![PeriodCount::new(label, count)],
        })
    }

    /// Hotspot counts inside the national boundary for the same date window
    /// in each of the last `overview_years` years, oldest first.
    ///
    /// A year whose fetch fails is recorded with a zero count.
    #[instrument(skip(self))]
    pub async fn national_overview(&self, date: Option<&str>, range: u32) -> Result<YearlyTrend> {
        let reference = parse_reference_date(date, Utc::now().date_naive())?;
        let days = self.clamp_days(range);
        let scope = self.aggregation.resolve(&self.config.national_region).await?;

        let years: Vec<i32> = (0..self.config.overview_years as i32)
            .rev()
            .map(|back| reference.year() - back)
            .collect();

        let batches = years
            .iter()
            .enumerate()
            .map(|(index, &year)| {
                Ok(Batch {
                    index,
                    start: anniversary(reference, year)?,
                    days,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let results: Vec<(Batch, Result<Vec<Coordinate>>)> = if scope.is_empty() {
            batches.iter().map(|b| (*b, Ok(Vec::new()))).collect()
        } else {
            self.fetch_batches(&batches, scope.bounding_box()).await
        };

        let mut fires = Vec::new();
        let mut counts = Vec::with_capacity(years.len());
        let mut failed_years = Vec::new();

        for ((batch, result), year) in results.into_iter().zip(&years) {
            let count = match result {
                Ok(points) => {
                    let matched = scope.apply(&create_fires(&points)?);
                    let count = hotspot_count(&matched);
                    fires.extend(matched);
                    count
                }
                Err(e) => {
                    warn!(year, start = %batch.start, error = %e, "Year fetch failed, recording zero");
                    failed_years.push(*year);
                    0
                }
            };
            counts.push(PeriodCount::new(year.to_string(), count));
        }

        info!(
            region = %scope.label(),
            years = counts.len(),
            failed = failed_years.len(),
            fires = fires.len(),
            "National overview computed"
        );

        Ok(YearlyTrend {
            region: scope.label().to_string(),
            fires,
            counts,
            failed_years,
        })
    }

    /// Daily hotspot counts per region over `[date - range, date + 2 * range)`.
    ///
    /// The window is fetched in batches; a failed batch is logged and
    /// contributes nothing while the others still count. An empty region list
    /// compares "All". A range above `max_comparison_range` is rejected.
    #[instrument(skip(self))]
    pub async fn compare_regions(
        &self,
        date: Option<&str>,
        range: u32,
        regions: &[String],
    ) -> Result<RegionComparison> {
        if range > self.config.max_comparison_range {
            return Err(validation(format!(
                "range {range} exceeds the maximum of {} days",
                self.config.max_comparison_range
            )));
        }
        let reference = parse_reference_date(date, Utc::now().date_naive())?;
        let (window_start, total_days) = comparison_window(reference, range.max(1))?;
        let window_end = add_days(window_start, total_days - 1)?;

        let names: Vec<String> = if regions.is_empty() {
            vec![ALL_REGIONS.to_string()]
        } else {
            regions.to_vec()
        };

        let mut scopes = Vec::with_capacity(names.len());
        for name in &names {
            scopes.push(self.aggregation.resolve(name).await?);
        }

        let batches =
            split_into_batches(window_start, total_days, self.config.max_days_per_request)?;

        let mut points = Vec::new();
        let mut failed_batches = Vec::new();

        if scopes.iter().any(|s| !s.is_empty()) {
            for (batch, result) in self.fetch_batches(&batches, fetch_extent(&scopes)).await {
                match result {
                    Ok(batch_points) => points.extend(batch_points),
                    Err(e) => {
                        warn!(
                            start = %batch.start,
                            days = batch.days,
                            error = %e,
                            "Batch fetch failed, continuing without it"
                        );
                        failed_batches.push(BatchFailure {
                            start: batch.start,
                            days: batch.days,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        let fires = create_fires(&points)?;
        let series: Vec<RegionSeries> = scopes
            .iter()
            .map(|scope| {
                let matched = scope.apply(&fires);
                RegionSeries {
                    region: scope.label().to_string(),
                    days: daily_counts(&matched, window_start, total_days),
                    fires: matched,
                }
            })
            .collect();

        info!(
            %window_start,
            %window_end,
            batches = batches.len(),
            failed = failed_batches.len(),
            hotspots = points.len(),
            regions = series.len(),
            "Region comparison computed"
        );

        Ok(RegionComparison {
            window_start,
            window_end,
            series,
            failed_batches,
        })
    }

    /// Fetch all batches concurrently, at most `max_concurrent_fetches` at a time.
    ///
    /// Each task owns its result; the results are returned in batch order
    /// regardless of completion order.
    async fn fetch_batches(
        &self,
        batches: &[Batch],
        bbox: Option<BoundingBox>,
    ) -> Vec<(Batch, Result<Vec<Coordinate>>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)));
        let mut tasks = JoinSet::new();
        for &batch in batches {
            let source = self.source.clone();
            let timeout = self.config.batch_timeout;
            let sem = semaphore.clone();
            tasks.spawn(async move {
                let result = match sem.acquire_owned().await {
                    // the deadline starts once the permit is held
                    Ok(_permit) => fetch_batch(source, batch, bbox, timeout).await,
                    Err(_) => Err(data_source("fetch limiter closed")),
                };
                (batch.index, result)
            });
        }

        let mut slots: Vec<Option<Result<Vec<Coordinate>>>> = batches.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(e) => warn!(error = %e, "Batch task aborted"),
            }
        }

        batches
            .iter()
            .zip(slots)
            .map(|(batch, slot)| {
                let result = slot.unwrap_or_else(|| Err(data_source("batch task aborted")));
                (*batch, result)
            })
            .collect()
    }
}

async fn fetch_batch(
    source: Arc<dyn FireDataSource>,
    batch: Batch,
    bbox: Option<BoundingBox>,
    timeout: Option<Duration>,
) -> Result<Vec<Coordinate>> {
    let fetch = source.fetch(batch.days, batch.start, bbox);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fetch).await.map_err(|_| {
            FireError::DataSource(format!(
                "fetch of {} days from {} timed out after {:?}",
                batch.days, batch.start, limit
            ))
        })?,
        None => fetch.await,
    }
}

/// Extent covering every requested scope; `None` (whole world) if "All" is requested.
fn fetch_extent(scopes: &[RegionScope]) -> Option<BoundingBox> {
    if scopes.iter().any(|s| matches!(s, RegionScope::All)) {
        return None;
    }
    scopes
        .iter()
        .filter_map(RegionScope::bounding_box)
        .reduce(|a, b| a.union(&b))
}

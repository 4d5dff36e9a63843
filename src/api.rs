//! HTTP API handlers for Firetrend.
//!
//! - **GET /fires**: clustered fires for one period and region
//! - **GET /trend/national**: yearly hotspot counts inside the national boundary
//! - **GET /trend/compare**: daily hotspot counts per region over a batched window
//! - **GET /health**: liveness
//!
//! Failures are returned as `{"error": "<message>"}` with a status derived from
//! the error kind.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::aggregation::filter_by_severity;
use crate::error::{FireError, validation};
use crate::model::{
    CompareQuery, FiresQuery, NationalTrendQuery, PeriodReport, RegionComparison, SeverityFilter,
    YearlyTrend,
};
use crate::orchestrator::FireTrendOrchestrator;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: FireTrendOrchestrator,
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(e: &FireError) -> ApiError {
    let status = match e {
        FireError::Validation(_) | FireError::Orchestration(_) => StatusCode::BAD_REQUEST,
        FireError::DataSource(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
}

/// Unwrap query parameters, reporting malformed ones as a JSON validation error.
fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query.map(|Query(q)| q).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected query parameters");
        error_response(&validation(rejection.body_text()))
    })
}

/// GET /fires - Fires for `[date, date + range)` within one region.
///
/// # Query Parameters
///
/// - `date` (optional): ISO start date, defaults to today
/// - `range` (optional): number of days, clamped to 1..10 (default: 1)
/// - `region` (optional): region name or "All" (default)
/// - `severity` (optional): `reset`, `medium` or `high`; narrows the returned
///   fires but not the count bucket
///
/// # Response
///
/// ```json
/// {
///     "region": "Ontario",
///     "start": "2025-11-20",
///     "days": 3,
///     "fires": [ ... ],
///     "counts": [{"label": "Nov 2025", "count": 42}]
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_fires(
    State(state): State<AppState>,
    query: Result<Query<FiresQuery>, QueryRejection>,
) -> Result<Json<PeriodReport>, ApiError> {
    let query = parse_query(query)?;
    let severity = match query.severity.as_deref() {
        Some(s) => s.parse::<SeverityFilter>().map_err(|e| {
            warn!(severity = %s, "Invalid severity filter");
            error_response(&e)
        })?,
        None => SeverityFilter::Reset,
    };

    match state
        .orchestrator
        .load_period(query.date.as_deref(), query.range, &query.region)
        .await
    {
        Ok(mut report) => {
            report.fires = filter_by_severity(&report.fires, severity);
            info!(
                region = %report.region,
                severity = ?severity,
                fires = report.fires.len(),
                "Fires queried"
            );
            Ok(Json(report))
        }
        Err(e) => {
            warn!(region = %query.region, error = %e, "Failed to load fires");
            Err(error_response(&e))
        }
    }
}

/// GET /trend/national - Yearly hotspot counts for the national boundary.
///
/// # Query Parameters
///
/// - `date` (optional): reference date, defaults to today
/// - `range` (optional): days per year window, clamped to 1..10 (default: 1)
#[instrument(skip(state))]
pub async fn get_national_trend(
    State(state): State<AppState>,
    query: Result<Query<NationalTrendQuery>, QueryRejection>,
) -> Result<Json<YearlyTrend>, ApiError> {
    let query = parse_query(query)?;
    match state
        .orchestrator
        .national_overview(query.date.as_deref(), query.range)
        .await
    {
        Ok(trend) => {
            info!(
                region = %trend.region,
                years = trend.counts.len(),
                failed_years = trend.failed_years.len(),
                "National trend queried"
            );
            Ok(Json(trend))
        }
        Err(e) => {
            warn!(error = %e, "Failed to compute national trend");
            Err(error_response(&e))
        }
    }
}

/// GET /trend/compare - Daily hotspot counts per region.
///
/// # Query Parameters
///
/// - `date` (optional): reference date, defaults to today
/// - `range` (optional): the window is `[date - range, date + 2 * range)` (default: 1)
/// - `regions` (optional): comma-separated names, "All" allowed (default: "All")
#[instrument(skip(state))]
pub async fn get_region_comparison(
    State(state): State<AppState>,
    query: Result<Query<CompareQuery>, QueryRejection>,
) -> Result<Json<RegionComparison>, ApiError> {
    let query = parse_query(query)?;
    let regions: Vec<String> = query
        .regions
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    match state
        .orchestrator
        .compare_regions(query.date.as_deref(), query.range, &regions)
        .await
    {
        Ok(comparison) => {
            info!(
                window_start = %comparison.window_start,
                window_end = %comparison.window_end,
                regions = comparison.series.len(),
                failed_batches = comparison.failed_batches.len(),
                "Region comparison queried"
            );
            Ok(Json(comparison))
        }
        Err(e) => {
            warn!(regions = %query.regions, error = %e, "Failed to compare regions");
            Err(error_response(&e))
        }
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

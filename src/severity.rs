//! Severity classification of fires by fire radiative power (FRP).

use crate::model::{Fire, SeverityFilter};

/// Minimum center FRP (MW) kept by [`SeverityFilter::Medium`].
pub const MEDIUM_FRP: f64 = 3.0;

/// Minimum center FRP (MW) kept by [`SeverityFilter::High`].
pub const HIGH_FRP: f64 = 7.0;

impl SeverityFilter {
    /// Inclusive lower FRP bound, or `None` if the filter keeps everything.
    pub fn min_frp(&self) -> Option<f64> {
        match self {
            SeverityFilter::Reset => None,
            SeverityFilter::Medium => Some(MEDIUM_FRP),
            SeverityFilter::High => Some(HIGH_FRP),
        }
    }

    pub fn matches(&self, fire: &Fire) -> bool {
        self.min_frp()
            .is_none_or(|min| fire.center().frp() >= min)
    }
}

/// Keep the fires matching `filter`, preserving order.
///
/// `Reset` returns every fire. The input is never modified.
pub fn classify(fires: &[Fire], filter: SeverityFilter) -> Vec<Fire> {
    fires.iter().filter(|f| filter.matches(f)).cloned().collect()
}

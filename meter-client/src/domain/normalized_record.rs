use crate::domain::MonthlyEntry;

/// Placeholder used for identity fields missing from the API response.
pub const UNKNOWN: &str = "Unknown";

/// Validated snapshot of one successful poll.
///
/// Built whole by the normalizer and never mutated afterwards; a newer poll
/// replaces it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NormalizedRecord {
    pub meter_name: String,
    pub consumer_id: String,
    pub sc_num: String,
    pub total_bill_amount: f64,
    pub total_dues_amount: f64,
    /// Oldest month first.
    pub meter_analytics: Vec<MonthlyEntry>,
}

impl NormalizedRecord {
    /// First entry of the sorted monthly sequence.
    pub fn current_month(&self) -> Option<&MonthlyEntry> {
        self.meter_analytics.first()
    }
}

pub mod calendar;
pub mod monthly_entry;
pub mod normalized_record;

pub use calendar::{month_sort_key, sort_chronologically, NEPALI_MONTHS};
pub use monthly_entry::MonthlyEntry;
pub use normalized_record::{NormalizedRecord, UNKNOWN};

use crate::domain::MonthlyEntry;

/// Billing months of the Nepali (Bikram Sambat) calendar, in year order.
pub const NEPALI_MONTHS: [&str; 12] = [
    "Baisakh", "Jestha", "Ashad", "Shrawan", "Bhadra", "Ashwin", "Kartik", "Mangsir", "Poush",
    "Magh", "Falgun", "Chaitra",
];

/// Sort key for a `"<MonthName>/<yy>"` label.
///
/// Any malformed label (no `/`, unparseable year, unknown month name) maps
/// to `(0, 0)` so it sorts ahead of every well-formed month.
pub fn month_sort_key(label: &str) -> (u32, usize) {
    let mut parts = label.split('/');
    let name = parts.next().unwrap_or_default().trim();
    let Some(year) = parts.next() else {
        return (0, 0);
    };

    let Ok(year) = year.trim().parse::<u32>() else {
        return (0, 0);
    };
    match NEPALI_MONTHS.iter().position(|m| *m == name) {
        Some(month) => (year, month),
        None => (0, 0),
    }
}

/// Stable ascending sort by `(year, month index)`.
pub fn sort_chronologically(entries: &mut [MonthlyEntry]) {
    entries.sort_by_key(|e| month_sort_key(e.month()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(month: &str, units: f64) -> MonthlyEntry {
        MonthlyEntry::new(month, "Paid", units, 0.0, 0.0)
    }

    fn months(entries: &[MonthlyEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.month()).collect()
    }

    #[test]
    fn sort_key_uses_year_then_calendar_position() {
        assert_eq!(month_sort_key("Baisakh/81"), (81, 0));
        assert_eq!(month_sort_key("Poush/80"), (80, 8));
        assert_eq!(month_sort_key("Chaitra/80"), (80, 11));
    }

    #[test]
    fn labels_without_separator_sort_first() {
        assert_eq!(month_sort_key("Unknown"), (0, 0));
        assert_eq!(month_sort_key(""), (0, 0));
    }

    #[test]
    fn bad_year_or_unknown_month_sorts_as_malformed() {
        assert_eq!(month_sort_key("Poush/xx"), (0, 0));
        assert_eq!(month_sort_key("Smarch/80"), (0, 0));
    }

    #[test]
    fn malformed_labels_precede_well_formed_ones() {
        let mut entries = vec![
            entry("Baisakh/79", 1.0),
            entry("Smarch/80", 2.0),
            entry("Magh/xx", 3.0),
        ];
        sort_chronologically(&mut entries);
        assert_eq!(months(&entries), vec!["Smarch/80", "Magh/xx", "Baisakh/79"]);
    }

    #[test]
    fn sorts_across_year_boundary() {
        let mut entries = vec![
            entry("Chaitra/80", 1.0),
            entry("Baisakh/81", 2.0),
            entry("Poush/80", 3.0),
        ];
        sort_chronologically(&mut entries);
        assert_eq!(months(&entries), vec!["Poush/80", "Chaitra/80", "Baisakh/81"]);
    }

    #[test]
    fn malformed_labels_go_to_front_and_ties_keep_input_order() {
        let mut entries = vec![
            entry("Magh/80", 1.0),
            entry("garbage", 2.0),
            entry("Magh/80", 3.0),
            entry("Unknown", 4.0),
        ];
        sort_chronologically(&mut entries);

        assert_eq!(months(&entries), vec!["garbage", "Unknown", "Magh/80", "Magh/80"]);
        assert_eq!(entries[2].consumed_units(), 1.0);
        assert_eq!(entries[3].consumed_units(), 3.0);
    }
}

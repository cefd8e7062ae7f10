/// Consumption and billing figures for one billing month.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonthlyEntry {
    month: String,
    status: String,
    consumed_units: f64,
    bill_amount: f64,
    payable_amount: f64,
    rebate_amount: f64,
}

impl MonthlyEntry {
    pub fn new(
        month: impl Into<String>,
        status: impl Into<String>,
        consumed_units: f64,
        bill_amount: f64,
        payable_amount: f64,
    ) -> Self {
        Self {
            month: month.into(),
            status: status.into(),
            consumed_units,
            bill_amount,
            payable_amount,
            rebate_amount: bill_amount - payable_amount,
        }
    }

    /// `"<MonthName>/<yy>"`, e.g. `"Baisakh/81"`.
    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// kWh consumed during the month.
    pub fn consumed_units(&self) -> f64 {
        self.consumed_units
    }

    pub fn bill_amount(&self) -> f64 {
        self.bill_amount
    }

    pub fn payable_amount(&self) -> f64 {
        self.payable_amount
    }

    /// Bill minus payable. Negative when a surcharge was applied.
    pub fn rebate_amount(&self) -> f64 {
        self.rebate_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebate_is_bill_minus_payable() {
        let e = MonthlyEntry::new("Magh/80", "Paid", 120.0, 1500.0, 1455.0);
        assert_eq!(e.rebate_amount(), 45.0);
    }

    #[test]
    fn rebate_is_not_clamped() {
        let e = MonthlyEntry::new("Magh/80", "Overdue", 120.0, 1500.0, 1650.0);
        assert_eq!(e.rebate_amount(), -150.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_with_derived_rebate() {
        let e = MonthlyEntry::new("Magh/80", "Paid", 120.0, 1500.0, 1455.0);
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["month"], "Magh/80");
        assert_eq!(v["rebate_amount"], 45.0);
    }
}

//! Published values derived from the cached record.
//!
//! Every consumer-facing value is one row of [`FIELDS`]: a key, display
//! metadata and an extraction function over `NormalizedRecord`.

use meter_client::domain::NormalizedRecord;
use serde::Serialize;
use serde_json::{json, Value};

use crate::coordinator::PollStatus;

pub const DOMAIN: &str = "nea_electricity_usage";
pub const MANUFACTURER: &str = "NEA";
pub const MODEL: &str = "Smart Meter";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    extract: fn(&NormalizedRecord) -> Option<FieldValue>,
    attributes: Option<fn(&NormalizedRecord) -> Value>,
}

impl FieldSpec {
    pub fn value(&self, record: &NormalizedRecord) -> Option<FieldValue> {
        (self.extract)(record)
    }

    pub fn attributes(&self, record: &NormalizedRecord) -> Option<Value> {
        self.attributes.map(|f| f(record))
    }
}

fn text(s: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(s.to_string()))
}

fn monthly_data(record: &NormalizedRecord) -> Value {
    json!({ "monthly_data": record.meter_analytics })
}

pub static FIELDS: [FieldSpec; 6] = [
    FieldSpec {
        key: "total_bill_amount",
        label: "Total Bill Amount",
        unit: Some("NPR"),
        device_class: Some("monetary"),
        state_class: Some("total"),
        extract: |r| Some(FieldValue::Number(r.total_bill_amount)),
        attributes: None,
    },
    FieldSpec {
        key: "total_dues_amount",
        label: "Total Dues Amount",
        unit: Some("NPR"),
        device_class: Some("monetary"),
        state_class: Some("total"),
        extract: |r| Some(FieldValue::Number(r.total_dues_amount)),
        attributes: None,
    },
    FieldSpec {
        key: "meter_name",
        label: "Meter Name",
        unit: None,
        device_class: None,
        state_class: None,
        extract: |r| text(&r.meter_name),
        attributes: None,
    },
    FieldSpec {
        key: "consumer_id",
        label: "Consumer ID",
        unit: None,
        device_class: None,
        state_class: None,
        extract: |r| text(&r.consumer_id),
        attributes: None,
    },
    FieldSpec {
        key: "sc_num",
        label: "SC Number",
        unit: None,
        device_class: None,
        state_class: None,
        extract: |r| text(&r.sc_num),
        attributes: None,
    },
    FieldSpec {
        key: "monthly_data",
        label: "Monthly Data",
        unit: Some("kWh"),
        device_class: None,
        state_class: None,
        extract: |r| r.current_month().map(|m| FieldValue::Number(m.consumed_units())),
        attributes: Some(monthly_data),
    },
];

pub fn field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.key == key)
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedValue {
    pub unique_id: String,
    pub name: String,
    pub key: &'static str,
    pub value: Option<FieldValue>,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub attributes: Option<Value>,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedMeter {
    pub device: DeviceInfo,
    pub values: Vec<PublishedValue>,
}

/// Render every field for the current status.
///
/// Without a cached record the meter name is `unknown` and every value is
/// `None`.
pub fn publish(status: &PollStatus) -> PublishedMeter {
    let record = status.record.as_deref();
    let meter = record.map_or("unknown", |r| r.meter_name.as_str());
    let stale = status.is_stale();

    let values = FIELDS
        .iter()
        .map(|f| PublishedValue {
            unique_id: format!("{DOMAIN}_{meter}_{}", f.key),
            name: format!("{} {meter}", f.label),
            key: f.key,
            value: record.and_then(|r| f.value(r)),
            unit: f.unit,
            device_class: f.device_class,
            state_class: f.state_class,
            attributes: record.and_then(|r| f.attributes(r)),
            stale,
        })
        .collect();

    PublishedMeter {
        device: DeviceInfo {
            identifier: format!("{DOMAIN}:{meter}"),
            name: format!("Electricity Meter {meter}"),
            manufacturer: MANUFACTURER,
            model: MODEL,
        },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::domain::MonthlyEntry;
    use std::sync::Arc;

    fn status_with_record() -> PollStatus {
        PollStatus {
            record: Some(Arc::new(NormalizedRecord {
                meter_name: "Home".to_string(),
                consumer_id: "C-1".to_string(),
                sc_num: "SC-1".to_string(),
                total_bill_amount: 1200.5,
                total_dues_amount: 30.0,
                meter_analytics: vec![
                    MonthlyEntry::new("Poush/80", "Paid", 90.0, 1000.0, 980.0),
                    MonthlyEntry::new("Magh/80", "Unpaid", 110.0, 1200.0, 1200.0),
                ],
            })),
            ..PollStatus::default()
        }
    }

    fn value_of<'a>(meter: &'a PublishedMeter, key: &str) -> &'a PublishedValue {
        meter.values.iter().find(|v| v.key == key).unwrap()
    }

    #[test]
    fn every_field_is_published_with_meter_scoped_ids() {
        let meter = publish(&status_with_record());

        assert_eq!(meter.values.len(), FIELDS.len());
        let bill = value_of(&meter, "total_bill_amount");
        assert_eq!(bill.unique_id, "nea_electricity_usage_Home_total_bill_amount");
        assert_eq!(bill.name, "Total Bill Amount Home");
        assert_eq!(bill.value, Some(FieldValue::Number(1200.5)));
        assert_eq!(bill.unit, Some("NPR"));
        assert_eq!(meter.device.name, "Electricity Meter Home");
    }

    #[test]
    fn monthly_value_is_first_entry_with_full_sequence_attribute() {
        let meter = publish(&status_with_record());
        let monthly = value_of(&meter, "monthly_data");

        assert_eq!(monthly.value, Some(FieldValue::Number(90.0)));
        let attrs = monthly.attributes.as_ref().unwrap();
        assert_eq!(attrs["monthly_data"].as_array().unwrap().len(), 2);
        assert_eq!(attrs["monthly_data"][0]["month"], "Poush/80");
        assert_eq!(attrs["monthly_data"][0]["rebate_amount"], 20.0);
    }

    #[test]
    fn text_fields_come_from_the_record() {
        let meter = publish(&status_with_record());

        assert_eq!(value_of(&meter, "consumer_id").value, Some(FieldValue::Text("C-1".to_string())));
        assert_eq!(value_of(&meter, "sc_num").value, Some(FieldValue::Text("SC-1".to_string())));
        assert!(field("meter_name").is_some());
        assert!(field("nope").is_none());
    }

    #[test]
    fn no_record_publishes_empty_values() {
        let meter = publish(&PollStatus::default());

        assert!(meter.values.iter().all(|v| v.value.is_none() && v.attributes.is_none()));
        assert_eq!(meter.device.name, "Electricity Meter unknown");
    }

    #[test]
    fn stale_flag_follows_failure_streak() {
        let mut status = status_with_record();
        status.consecutive_failures = 2;

        let meter = publish(&status);

        assert!(meter.values.iter().all(|v| v.stale));
        assert_eq!(value_of(&meter, "total_dues_amount").value, Some(FieldValue::Number(30.0)));
    }
}

use meter_client::domain::{sort_chronologically, MonthlyEntry, NormalizedRecord, UNKNOWN};
use serde_json::{Map, Value};

use crate::pipeline::FetchError;

#[derive(thiserror::Error, Debug)]
enum FieldError {
    #[error("field '{0}' is null")]
    Null(&'static str),
    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
    #[error("field '{field}' must be finite and non-negative, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("entry is not an object: {0}")]
    NotAnObject(String),
}

/// Truthiness of the `data` wrapper: null, false, zero and empty values
/// count as "no data".
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn text_or_unknown(obj: &Map<String, Value>, field: &str) -> String {
    match obj.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Absent fields read as zero; numeric strings and booleans are accepted.
fn parse_number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, FieldError> {
    match obj.get(field) {
        None => Ok(0.0),
        Some(Value::Null) => Err(FieldError::Null(field)),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| FieldError::NotNumeric {
            field,
            value: n.to_string(),
        }),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| FieldError::NotNumeric {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(FieldError::NotNumeric {
            field,
            value: other.to_string(),
        }),
    }
}

fn parse_quantity(obj: &Map<String, Value>, field: &'static str) -> Result<f64, FieldError> {
    let value = parse_number(obj, field)?;
    if !value.is_finite() || value < 0.0 {
        return Err(FieldError::OutOfRange { field, value });
    }
    Ok(value)
}

/// Top-level amounts fall back to zero instead of failing the cycle.
/// Same non-negative, finite rule as the monthly quantities.
fn amount_or_zero(obj: &Map<String, Value>, field: &'static str) -> f64 {
    match parse_quantity(obj, field) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "unusable amount, using 0");
            0.0
        }
    }
}

fn monthly_entry(item: &Value) -> Result<MonthlyEntry, FieldError> {
    let Some(obj) = item.as_object() else {
        return Err(FieldError::NotAnObject(item.to_string()));
    };

    let consumed_units = parse_quantity(obj, "consumedUnits")?;
    let bill_amount = parse_quantity(obj, "billAmt")?;
    let payable_amount = parse_quantity(obj, "payableAmount")?;

    Ok(MonthlyEntry::new(
        text_or_unknown(obj, "month"),
        text_or_unknown(obj, "status"),
        consumed_units,
        bill_amount,
        payable_amount,
    ))
}

/// Map the inner `data` object onto a `NormalizedRecord`.
///
/// Monthly entries with bad numbers are dropped one by one; a
/// `meterAnalytics` value that is present but not a list fails the whole
/// record.
pub fn normalize_data(data: &Map<String, Value>) -> Result<NormalizedRecord, FetchError> {
    let items: &[Value] = match data.get("meterAnalytics") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FetchError::Malformed(format!(
                "meterAnalytics is not a list: {other}"
            )))
        }
    };

    let mut meter_analytics = Vec::with_capacity(items.len());
    for item in items {
        match monthly_entry(item) {
            Ok(entry) => meter_analytics.push(entry),
            Err(e) => {
                metrics::counter!("nea_monthly_entries_dropped_total").increment(1);
                tracing::warn!(error = %e, "dropping meter analytics entry");
            }
        }
    }
    sort_chronologically(&mut meter_analytics);

    Ok(NormalizedRecord {
        meter_name: text_or_unknown(data, "meterName"),
        consumer_id: text_or_unknown(data, "consumerId"),
        sc_num: text_or_unknown(data, "scNum"),
        total_bill_amount: amount_or_zero(data, "totalBillAmount"),
        total_dues_amount: amount_or_zero(data, "totalDuesAmount"),
        meter_analytics,
    })
}

/// Validate a decoded response body and normalize its `data` wrapper.
pub fn normalize_payload(body: &Value) -> Result<NormalizedRecord, FetchError> {
    let Some(top) = body.as_object() else {
        return Err(FetchError::Malformed("response body is not a JSON object".to_string()));
    };

    let data = match top.get("data") {
        Some(d) if is_truthy(d) => d,
        _ => return Err(FetchError::EmptyPayload),
    };

    let Some(data) = data.as_object() else {
        return Err(FetchError::Malformed(format!("data is not an object: {data}")));
    };

    normalize_data(data)
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_f64(hasher: &mut blake3::Hasher, v: f64) {
    hasher.update(&v.to_bits().to_le_bytes());
}

/// Content digest of a record, stable across identical payloads.
pub fn fingerprint(record: &NormalizedRecord) -> String {
    let mut h = blake3::Hasher::new();
    hash_str(&mut h, &record.meter_name);
    hash_str(&mut h, &record.consumer_id);
    hash_str(&mut h, &record.sc_num);
    hash_f64(&mut h, record.total_bill_amount);
    hash_f64(&mut h, record.total_dues_amount);

    h.update(&(record.meter_analytics.len() as u64).to_le_bytes());
    for e in &record.meter_analytics {
        hash_str(&mut h, e.month());
        hash_str(&mut h, e.status());
        hash_f64(&mut h, e.consumed_units());
        hash_f64(&mut h, e.bill_amount());
        hash_f64(&mut h, e.payable_amount());
    }
    h.finalize().to_hex().to_string()
}

//! Shaping of JSON documents into flat measurement rows.
//!
//! Nested objects are flattened to dot-joined keys and, at MPPT level, the
//! per-inverter `mppts` array is unwound into one row per MPPT.

use anyhow::{Result, bail};
use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::warn;

use crate::analyzers::types::Level;
use crate::records::MeasurementRecord;

const MPPTS_FIELD: &str = "mppts";
const ID_FIELD: &str = "_id";
const DATE_WRAPPER: &str = "$date";
const NUMBER_LONG_WRAPPER: &str = "$numberLong";

/// Turns one document into the rows it contributes at `level`.
pub fn records_from_document(doc: Value, level: Level) -> Result<Vec<MeasurementRecord>> {
    let doc = match doc {
        Value::Object(fields) => fields,
        other => bail!("expected a JSON object per line, got {}", kind(&other)),
    };

    if level == Level::Mppt {
        if let Some(mppts) = doc.get(MPPTS_FIELD) {
            return unwind_mppts(&doc, mppts);
        }
    }

    Ok(vec![flatten_document(&doc)])
}

/// Flattens a document: `{"a": {"b": 1}}` becomes `a.b = "1"`, arrays get
/// `[i]` suffixes, `{"$date": ..}` wrappers collapse to their value, nulls
/// and `_id` are skipped.
pub fn flatten_document(doc: &Map<String, Value>) -> MeasurementRecord {
    let mut record = MeasurementRecord::default();
    for (key, value) in doc {
        if key == ID_FIELD {
            continue;
        }
        flatten_into(&mut record, key, value);
    }
    record
}

/// Follows `$unwind` semantics: `null` and empty arrays contribute no rows,
/// a single embedded object counts as a one-element array.
fn unwind_mppts(doc: &Map<String, Value>, mppts: &Value) -> Result<Vec<MeasurementRecord>> {
    let items = match mppts {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => std::slice::from_ref(mppts),
        Value::Null => return Ok(Vec::new()),
        other => {
            warn!(kind = kind(other), "Skipping document with non-array '{MPPTS_FIELD}'");
            return Ok(Vec::new());
        }
    };

    let mut parent = doc.clone();
    parent.remove(MPPTS_FIELD);
    let base = flatten_document(&parent);

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(fields) = item else {
            bail!("'{MPPTS_FIELD}' entries must be objects, got {}", kind(item));
        };
        let mut row = base.clone();
        for (key, value) in fields {
            flatten_into(&mut row, key, value);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn flatten_into(record: &mut MeasurementRecord, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => record.set(key, if *b { "1" } else { "0" }),
        Value::Number(n) => record.set(key, n.to_string()),
        Value::String(s) => record.set(key, s.as_str()),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(record, &format!("{key}[{i}]"), item);
            }
        }
        Value::Object(fields) => {
            if let Some(date) = fields.get(DATE_WRAPPER).filter(|_| fields.len() == 1) {
                match extended_date(date) {
                    Some(text) => record.set(key, text),
                    None => warn!(field = key, "Unrecognized {DATE_WRAPPER} value"),
                }
                return;
            }
            for (child, v) in fields {
                flatten_into(record, &format!("{key}.{child}"), v);
            }
        }
    }
}

/// Text of a `$date` payload: ISO strings pass through, epoch milliseconds
/// (bare or `$numberLong`) become a naive UTC timestamp.
fn extended_date(value: &Value) -> Option<String> {
    let millis = match value {
        Value::String(s) => return Some(s.clone()),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::Object(fields) => fields
            .get(NUMBER_LONG_WRAPPER)
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse::<i64>().ok())?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_plant_document() {
        let doc = json!({
            "_id": {"$oid": "65a1"},
            "timestamp": "2025-01-01 10:00:00",
            "dataItemMap": {"inverter_power": 41.5, "radiation_intensity": 0.61},
            "note": null
        });

        let rows = records_from_document(doc, Level::Plant).unwrap();

        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.get("dataItemMap.inverter_power"), Some("41.5"));
        assert_eq!(r.get("dataItemMap.radiation_intensity"), Some("0.61"));
        assert_eq!(r.get("_id"), None);
        assert_eq!(r.get("note"), None);
    }

    #[test]
    fn test_date_wrapper_collapses() {
        let doc = json!({"timestamp": {"$date": "2025-01-01T10:00:00Z"}});
        let rows = records_from_document(doc, Level::Inverter).unwrap();
        assert_eq!(rows[0].get("timestamp"), Some("2025-01-01T10:00:00Z"));
    }

    #[test]
    fn test_unwind_mppts() {
        let doc = json!({
            "Plant": "Metro DHA",
            "sn": "6T21B9040017",
            "timestamp": "2025-01-01 10:00:00",
            "InverterPower": 20.0,
            "radiation_intensity": 0.5,
            "mppts": [
                {"mpptId": "MPPT1", "mppt_Power": 10.0, "mppt_Capacity": 12.0},
                {"mpptId": "MPPT2", "mppt_Power": 0.0, "mppt_Capacity": 12.0}
            ]
        });

        let rows = records_from_document(doc, Level::Mppt).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("mpptId"), Some("MPPT1"));
        assert_eq!(rows[0].get("mppt_Power"), Some("10.0"));
        assert_eq!(rows[1].get("mpptId"), Some("MPPT2"));
        assert_eq!(rows[1].get("sn"), Some("6T21B9040017"));
        assert_eq!(rows[1].get("radiation_intensity"), Some("0.5"));
        assert_eq!(rows[0].get("mppts[0].mpptId"), None);
    }

    #[test]
    fn test_empty_mppts_yield_no_rows() {
        let doc = json!({"sn": "X", "mppts": []});
        assert!(records_from_document(doc, Level::Mppt).unwrap().is_empty());
    }

    #[test]
    fn test_null_mppts_yield_no_rows() {
        let doc = json!({
            "sn": "X",
            "timestamp": "2025-01-01 10:00:00",
            "radiation_intensity": 0.5,
            "mppts": null
        });
        assert!(records_from_document(doc, Level::Mppt).unwrap().is_empty());
    }

    #[test]
    fn test_scalar_mppts_document_is_skipped() {
        let doc = json!({"sn": "X", "mppts": "MPPT1"});
        assert!(records_from_document(doc, Level::Mppt).unwrap().is_empty());
    }

    #[test]
    fn test_single_mppt_object_unwinds_to_one_row() {
        let doc = json!({"sn": "X", "mppts": {"mpptId": "MPPT3", "mppt_Power": 1.5}});
        let rows = records_from_document(doc, Level::Mppt).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("mpptId"), Some("MPPT3"));
        assert_eq!(rows[0].get("sn"), Some("X"));
    }

    #[test]
    fn test_date_wrapper_number_long_is_epoch_millis() {
        let doc = json!({"timestamp": {"$date": {"$numberLong": "1736935200000"}}});
        let rows = records_from_document(doc, Level::Inverter).unwrap();
        assert_eq!(rows[0].get("timestamp"), Some("2025-01-15 10:00:00"));
        assert_eq!(rows[0].get("timestamp.$numberLong"), None);
    }

    #[test]
    fn test_date_wrapper_bare_millis() {
        let doc = json!({"timestamp": {"$date": 1736935200250_i64}});
        let rows = records_from_document(doc, Level::Inverter).unwrap();
        assert_eq!(rows[0].get("timestamp"), Some("2025-01-15 10:00:00.250"));

        let parsed = crate::parser::parse_timestamp(rows[0].get("timestamp").unwrap()).unwrap();
        assert_eq!(parsed.date(), chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }

    #[test]
    fn test_mppts_left_nested_at_other_levels() {
        let doc = json!({"sn": "X", "mppts": [{"mpptId": "MPPT1"}]});
        let rows = records_from_document(doc, Level::Inverter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("mppts[0].mpptId"), Some("MPPT1"));
    }

    #[test]
    fn test_bool_flag_becomes_numeric() {
        let doc = json!({"String_Configured": true});
        let rows = records_from_document(doc, Level::String).unwrap();
        assert_eq!(rows[0].get("String_Configured"), Some("1"));
    }

    #[test]
    fn test_non_object_line_is_rejected() {
        assert!(records_from_document(json!([1, 2]), Level::Plant).is_err());
    }
}

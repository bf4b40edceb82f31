use std::{
    fmt,
    hash::{Hash, Hasher},
};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::schema::ColumnKind;

/// Tokens that load as a missing cell rather than as text.
pub const MISSING_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Point in time for temporal values; text is parsed on demand so a date
    /// column that failed inference can still be ordered and filtered.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::DateTime(dt) => Some(*dt),
            Value::Text(s) => parse_temporal(s).ok(),
            _ => None,
        }
    }
}

/// Floats compare by canonical bit pattern so `Eq` and `Hash` agree:
/// positive and negative zero collapse, every NaN equals every other NaN.
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_key(*a) == float_key(*b),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => float_key(*f).hash(state),
            Value::Text(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_none(),
            other => serializer.serialize_str(&other.as_display()),
        }
    }
}

pub fn is_missing_token(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed)
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Accepts either a date or a date-time; dates map to midnight.
pub fn parse_temporal(value: &str) -> Result<NaiveDateTime> {
    if let Ok(date) = parse_naive_date(value) {
        return date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("Failed to build midnight for '{value}'"));
    }
    parse_naive_datetime(value)
}

pub fn parse_typed_value(value: &str, kind: ColumnKind) -> Result<Option<Value>> {
    if is_missing_token(value) {
        return Ok(None);
    }
    let trimmed = value.trim();
    let parsed = match kind {
        ColumnKind::Integer => {
            let parsed: i64 = trimmed
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        ColumnKind::Float => {
            let parsed: f64 = trimmed
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            Value::Float(parsed)
        }
        ColumnKind::Date => Value::Date(parse_naive_date(trimmed)?),
        ColumnKind::DateTime => Value::DateTime(parse_naive_datetime(trimmed)?),
        ColumnKind::Categorical | ColumnKind::Text => Value::Text(value.to_string()),
    };
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_naive_date_accepts_iso_forms_only() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_naive_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/06").unwrap(), expected);
        assert!(parse_naive_date("06/05/2024").is_err());
    }

    #[test]
    fn parse_temporal_maps_dates_to_midnight() {
        let parsed = parse_temporal("2024-05-06").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "00:00:00");
        let with_time = parse_temporal("2024-05-06T14:30:00").unwrap();
        assert_eq!(with_time.format("%H:%M").to_string(), "14:30");
    }

    #[test]
    fn parse_typed_value_treats_placeholders_as_missing() {
        assert_eq!(parse_typed_value("", ColumnKind::Integer).unwrap(), None);
        assert_eq!(parse_typed_value("NA", ColumnKind::Float).unwrap(), None);
        assert_eq!(parse_typed_value(" null ", ColumnKind::Text).unwrap(), None);
        assert!(parse_typed_value("abc", ColumnKind::Integer).is_err());
    }

    #[test]
    fn float_equality_is_hash_consistent() {
        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        set.insert(Value::Float(-0.0));
        set.insert(Value::Float(f64::NAN));
        set.insert(Value::Float(f64::NAN));
        assert_eq!(set.len(), 2);
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn serializes_non_finite_floats_as_null() {
        let json = serde_json::to_string(&Value::Float(f64::INFINITY)).unwrap();
        assert_eq!(json, "null");
        let date = Value::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2023-01-02\"");
    }
}

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

// Epoch values above this are taken to be milliseconds. 1e11 seconds is far in the future, 1e11
// milliseconds is 1973.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Accepts RFC 3339, `%Y-%m-%d %H:%M:%S` (assumed UTC), `%Y-%m-%dT%H:%M:%S` without an offset,
/// and epoch seconds or milliseconds, either as JSON numbers or numeric strings.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => from_epoch(n.as_f64()?),
        _ => None,
    }
}

pub(crate) fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    from_epoch(raw.parse::<f64>().ok()?)
}

fn from_epoch(x: f64) -> Option<DateTime<Utc>> {
    if !x.is_finite() || x < 0.0 {
        return None;
    }
    let millis = if x >= EPOCH_MILLIS_THRESHOLD {
        x
    } else {
        x * 1000.0
    };
    let millis = millis.round() as i64;
    Utc.timestamp_opt(millis.div_euclid(1000), (millis.rem_euclid(1000) * 1_000_000) as u32)
        .single()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn formats() {
        let expected = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        assert_eq!(parse_timestamp(&json!("2020-09-13T12:26:40Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2020-09-13 12:26:40")), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_600_000_000)), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_600_000_000_000u64)), Some(expected));
        assert_eq!(parse_timestamp(&json!("1600000000")), Some(expected));
    }

    #[test]
    fn garbage() {
        assert_eq!(parse_timestamp(&json!("yesterday-ish")), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
        assert_eq!(parse_timestamp(&json!({"t": 1})), None);
        assert_eq!(parse_timestamp(&json!(-5)), None);
    }
}

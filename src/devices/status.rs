use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Devices unseen for more than this many days get the warning badge and
/// become eligible for deletion.
pub const LONG_OFFLINE_THRESHOLD_DAYS: i64 = 30;

const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub is_online: bool,
    pub last_seen_display: String,
    pub days_offline: Option<i64>,
    pub is_long_offline: bool,
}

/// Online iff the vendor sent `true`, `1`, `"true"` (any case) or `"1"`.
///
/// This is the only place the raw flag is inspected; everything downstream
/// reads the resulting boolean.
pub fn classify_online(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

/// Parses the timestamp shapes the API has been seen to emit. Naive values are
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole days elapsed, floored. Negative when `then` lies in the future.
pub fn days_since(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_milliseconds().div_euclid(MS_PER_DAY)
}

pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - then).num_milliseconds();
    let minutes = diff_ms.div_euclid(MS_PER_MINUTE);
    let hours = diff_ms.div_euclid(MS_PER_HOUR);
    let days = diff_ms.div_euclid(MS_PER_DAY);

    if days > 0 {
        plural(days, "day")
    } else if hours > 0 {
        plural(hours, "hour")
    } else if minutes > 0 {
        plural(minutes, "minute")
    } else {
        "Just now".to_string()
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

pub fn is_long_offline(days_offline: Option<i64>) -> bool {
    days_offline.is_some_and(|d| d > LONG_OFFLINE_THRESHOLD_DAYS)
}

pub fn classify(online: Option<&Value>, last_seen: Option<&str>, now: DateTime<Utc>) -> DeviceStatus {
    let is_online = classify_online(online);
    let seen = last_seen.and_then(parse_timestamp);

    let (last_seen_display, days_offline) = match seen {
        Some(then) => (format_relative(then, now), Some(days_since(then, now))),
        None => ("Unknown".to_string(), None),
    };

    DeviceStatus {
        is_online,
        last_seen_display,
        days_offline,
        is_long_offline: is_long_offline(days_offline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn online_predicate_is_total() {
        let cases = [
            (Some(json!(true)), true),
            (Some(json!(1)), true),
            (Some(json!(1.0)), true),
            (Some(json!("true")), true),
            (Some(json!("TRUE")), true),
            (Some(json!("1")), true),
            (Some(json!(false)), false),
            (Some(json!(0)), false),
            (Some(json!(2)), false),
            (Some(json!("false")), false),
            (Some(json!("yes")), false),
            (Some(json!(" 1")), false),
            (Some(json!(null)), false),
            (Some(json!([true])), false),
            (Some(json!({ "online": true })), false),
            (None, false),
        ];

        for (raw, expected) in cases {
            assert_eq!(classify_online(raw.as_ref()), expected, "raw = {raw:?}");
        }
    }

    #[test]
    fn parses_known_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-02"),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single()
        );
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn relative_time_granularity() {
        let now = now();
        assert_eq!(format_relative(now - Duration::days(3), now), "3 days ago");
        assert_eq!(format_relative(now - Duration::hours(25), now), "1 day ago");
        assert_eq!(format_relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_relative(now - Duration::minutes(61), now), "1 hour ago");
        assert_eq!(format_relative(now - Duration::minutes(2), now), "2 minutes ago");
        assert_eq!(format_relative(now - Duration::seconds(30), now), "Just now");
        assert_eq!(format_relative(now + Duration::hours(2), now), "Just now");
    }

    #[test]
    fn days_are_floored_and_not_clamped() {
        let now = now();
        assert_eq!(days_since(now - Duration::hours(47), now), 1);
        assert_eq!(days_since(now + Duration::hours(1), now), -1);
    }

    #[test]
    fn string_one_without_last_seen_is_online_and_not_stale() {
        let status = classify(Some(&json!("1")), None, now());
        assert_eq!(
            status,
            DeviceStatus {
                is_online: true,
                last_seen_display: "Unknown".to_string(),
                days_offline: None,
                is_long_offline: false,
            }
        );
    }

    #[test]
    fn offline_for_45_days_is_long_offline() {
        let now = now();
        let seen = (now - Duration::days(45)).to_rfc3339();
        let status = classify(Some(&json!(false)), Some(&seen), now);

        assert!(!status.is_online);
        assert_eq!(status.days_offline, Some(45));
        assert!(status.is_long_offline);
        assert_eq!(status.last_seen_display, "45 days ago");
    }

    #[test]
    fn threshold_is_strictly_greater_than_thirty() {
        assert!(!is_long_offline(Some(30)));
        assert!(is_long_offline(Some(31)));
        assert!(!is_long_offline(None));
    }

    #[test]
    fn unparsable_last_seen_degrades() {
        let status = classify(Some(&json!(0)), Some("yesterday-ish"), now());
        assert_eq!(status.last_seen_display, "Unknown");
        assert_eq!(status.days_offline, None);
        assert!(!status.is_long_offline);
    }
}

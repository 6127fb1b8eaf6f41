//! `deserialize_with` helpers for persisted records whose scalar fields may
//! have been written by other tools as strings, booleans or fractions.

use super::LooseValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

fn scalar<'de, D>(deserializer: D) -> Result<Option<LooseValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<LooseValue>::deserialize(deserializer)
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar(deserializer)?.map(|v| v.as_f64()).unwrap_or(0.0))
}

/// Whole meters, rounded.
pub fn size<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number(deserializer)?.round() as i64)
}

pub fn id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number(deserializer)?.max(0.0).round() as u64)
}

/// 0/1 flag from any truthy or falsy scalar.
pub fn flag<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u8::from(scalar(deserializer)?.is_some_and(|v| v.is_truthy())))
}

/// Text kept verbatim; numbers and booleans take their canonical key form.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match scalar(deserializer)? {
        Some(LooseValue::Text(t)) => t,
        Some(other) => other.to_key(),
        None => String::new(),
    })
}

/// Identifier in canonical key form, so `7`, `7.0` and `"7"` agree.
pub fn key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar(deserializer)?.map(|v| v.to_key()).unwrap_or_default())
}

pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, a bare date or epoch milliseconds.
/// Anything else reads as the Unix epoch.
pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match scalar(deserializer)? {
        Some(LooseValue::Text(t)) => parse_timestamp(t.trim()),
        Some(LooseValue::Number(ms)) if ms.is_finite() => {
            DateTime::from_timestamp_millis(ms as i64)
        }
        _ => None,
    };
    Ok(parsed.unwrap_or_default())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use crate::models::{Asteroid, User};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_asteroid_reads_loose_scalars() {
        let a: Asteroid = serde_json::from_value(json!({
            "id": "3",
            "name": "Apophis",
            "velocity": "12.3",
            "distance": null,
            "size": 490.5,
            "is_hazardous": true,
            "approach_date": null,
            "created_at": "2025-03-14 08:00:00",
            "updated_at": 1741939200000_i64
        }))
        .unwrap();

        assert_eq!(a.id, 3);
        assert_eq!(a.velocity, 12.3);
        assert_eq!(a.distance, 0.0);
        assert_eq!(a.size, 491);
        assert_eq!(a.is_hazardous, 1);
        assert_eq!(a.approach_date, "");
        assert_eq!(a.created_at, Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap());
        assert_eq!(a.updated_at, Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap());

        let b: Asteroid = serde_json::from_value(json!({
            "name": "Bennu",
            "is_hazardous": "0",
            "created_at": "whenever"
        }))
        .unwrap();
        assert_eq!(b.is_hazardous, 0);
        assert_eq!(b.created_at, chrono::DateTime::<Utc>::default());
    }

    #[test]
    fn test_user_reads_loose_fields() {
        let user: User = serde_json::from_value(json!({
            "id": 1741939200000_i64,
            "username": "neo",
            "email": "neo@example.com",
            "password": "digest",
            "createdAt": "2025-03-14T08:00:00.000Z",
            "avatarUrl": null,
            "watchedAsteroids": [
                { "id": 2025, "name": "(2025 AB)", "addedAt": "2025-03-14T09:00:00Z" }
            ],
            "alerts": null
        }))
        .unwrap();

        assert_eq!(user.id, "1741939200000");
        assert_eq!(user.watched_asteroids[0].id, "2025");
        assert!(user.alerts.is_empty());
        assert!(user.avatar_url.is_none());
    }
}

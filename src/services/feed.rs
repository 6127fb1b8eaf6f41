use crate::config::AppConfig;
use crate::models::{AsteroidInput, LooseValue};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Every way a feed call can fail. All variants read as the same opaque
/// failure to API callers.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to fetch cosmic data: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to fetch cosmic data: upstream returned {0}")]
    Status(u16),

    #[error("Failed to fetch cosmic data: {0}")]
    Malformed(String),
}

/// Source of near-Earth-object data for one calendar day.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<AsteroidInput>, FeedError>;
}

#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub element_count: Option<u64>,
    #[serde(default)]
    pub near_earth_objects: HashMap<String, Vec<NearEarthObject>>,
}

#[derive(Debug, Deserialize)]
pub struct NearEarthObject {
    pub name: String,
    pub is_potentially_hazardous_asteroid: bool,
    pub estimated_diameter: EstimatedDiameter,
    #[serde(default)]
    pub close_approach_data: Vec<CloseApproach>,
}

#[derive(Debug, Deserialize)]
pub struct EstimatedDiameter {
    pub meters: DiameterRange,
}

#[derive(Debug, Deserialize)]
pub struct DiameterRange {
    pub estimated_diameter_max: f64,
}

#[derive(Debug, Deserialize)]
pub struct CloseApproach {
    #[serde(default)]
    pub close_approach_date_full: Option<String>,
    pub relative_velocity: RelativeVelocity,
    pub miss_distance: MissDistance,
}

#[derive(Debug, Deserialize)]
pub struct RelativeVelocity {
    pub kilometers_per_second: String,
}

#[derive(Debug, Deserialize)]
pub struct MissDistance {
    pub kilometers: String,
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn parse_number(raw: &str, field: &str, name: &str) -> Result<f64, FeedError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FeedError::Malformed(format!("{name}: invalid {field} '{raw}'")))
}

/// Reshapes one vendor record using its first close-approach sample.
pub fn normalize(neo: NearEarthObject) -> Result<AsteroidInput, FeedError> {
    let approach = neo.close_approach_data.first().ok_or_else(|| {
        FeedError::Malformed(format!("{}: no close approach data", neo.name))
    })?;

    let velocity = parse_number(
        &approach.relative_velocity.kilometers_per_second,
        "velocity",
        &neo.name,
    )?;
    let miss_km = parse_number(&approach.miss_distance.kilometers, "distance", &neo.name)?;
    let approach_date = approach.close_approach_date_full.clone();

    Ok(AsteroidInput {
        velocity: LooseValue::from(one_decimal(velocity)),
        distance: LooseValue::from(one_decimal(miss_km / 1_000_000.0)),
        size: LooseValue::from(neo.estimated_diameter.meters.estimated_diameter_max.round()),
        is_hazardous: LooseValue::from(neo.is_potentially_hazardous_asteroid),
        approach_date,
        name: neo.name,
    })
}

/// Pulls the entries for exactly `date` out of a feed payload.
pub fn extract_day(
    mut response: FeedResponse,
    date: NaiveDate,
) -> Result<Vec<AsteroidInput>, FeedError> {
    let key = date.format("%Y-%m-%d").to_string();
    response
        .near_earth_objects
        .remove(&key)
        .unwrap_or_default()
        .into_iter()
        .map(normalize)
        .collect()
}

/// Client for the NASA NeoWs `feed` endpoint.
pub struct NasaFeedClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NasaFeedClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.feed_timeout_secs))
            .build()?;
        Ok(Self::new(
            http,
            config.nasa_feed_url.clone(),
            config.nasa_api_key.clone(),
        ))
    }
}

#[async_trait]
impl FeedClient for NasaFeedClient {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<AsteroidInput>, FeedError> {
        let day = date.format("%Y-%m-%d").to_string();
        info!("📡 Fetching NEO feed for {}", day);

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("start_date", day.as_str()),
                ("end_date", day.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let payload: FeedResponse =
            serde_json::from_slice(&body).map_err(|e| FeedError::Malformed(e.to_string()))?;
        let element_count = payload.element_count.unwrap_or(0);

        let records = extract_day(payload, date)?;
        info!(
            "📡 Feed returned {} objects for {} (element_count={})",
            records.len(),
            day,
            element_count
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "element_count": 2,
            "near_earth_objects": {
                "2025-03-14": [{
                    "name": "(2025 AB)",
                    "is_potentially_hazardous_asteroid": true,
                    "estimated_diameter": {"meters": {"estimated_diameter_min": 60.1, "estimated_diameter_max": 149.6}},
                    "close_approach_data": [
                        {
                            "close_approach_date": "2025-03-14",
                            "close_approach_date_full": "2025-Mar-14 06:42",
                            "relative_velocity": {"kilometers_per_second": "12.3456"},
                            "miss_distance": {"kilometers": "4549999.5"}
                        },
                        {
                            "close_approach_date_full": "2031-Jan-01 00:00",
                            "relative_velocity": {"kilometers_per_second": "99.9"},
                            "miss_distance": {"kilometers": "1"}
                        }
                    ]
                }],
                "2025-03-15": [{
                    "name": "(other day)",
                    "is_potentially_hazardous_asteroid": false,
                    "estimated_diameter": {"meters": {"estimated_diameter_max": 10.0}},
                    "close_approach_data": []
                }]
            }
        })
    }

    #[test]
    fn test_extract_day_normalizes_first_approach() {
        let payload: FeedResponse = serde_json::from_value(sample_payload()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let records = extract_day(payload, date).unwrap();

        assert_eq!(records.len(), 1);
        let rock = &records[0];
        assert_eq!(rock.name, "(2025 AB)");
        assert_eq!(rock.velocity.as_f64(), 12.3);
        assert_eq!(rock.distance.as_f64(), 4.5);
        assert_eq!(rock.size.as_f64(), 150.0);
        assert!(rock.is_hazardous.is_truthy());
        assert_eq!(rock.approach_date.as_deref(), Some("2025-Mar-14 06:42"));
    }

    #[test]
    fn test_missing_date_key_is_empty() {
        let payload: FeedResponse = serde_json::from_value(sample_payload()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        assert!(extract_day(payload, date).unwrap().is_empty());
    }

    #[test]
    fn test_missing_close_approach_fails_whole_day() {
        let payload: FeedResponse = serde_json::from_value(sample_payload()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let err = extract_day(payload, date).unwrap_err();
        assert!(err.to_string().starts_with("Failed to fetch cosmic data"));
    }

    #[test]
    fn test_unparseable_velocity_is_malformed() {
        let neo: NearEarthObject = serde_json::from_value(json!({
            "name": "bad",
            "is_potentially_hazardous_asteroid": false,
            "estimated_diameter": {"meters": {"estimated_diameter_max": 1.0}},
            "close_approach_data": [{
                "relative_velocity": {"kilometers_per_second": "fast"},
                "miss_distance": {"kilometers": "1"}
            }]
        }))
        .unwrap();
        assert!(matches!(normalize(neo), Err(FeedError::Malformed(_))));
    }
}

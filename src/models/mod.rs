use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod loose;

/// Stored asteroid record. `name` is the natural key, `id` is assigned
/// as max existing id + 1 on first insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asteroid {
    #[serde(deserialize_with = "loose::id")]
    pub id: u64,
    #[serde(deserialize_with = "loose::text")]
    pub name: String,
    #[serde(deserialize_with = "loose::number")]
    pub velocity: f64,
    #[serde(deserialize_with = "loose::number")]
    pub distance: f64,
    #[serde(deserialize_with = "loose::size")]
    pub size: i64,
    #[serde(deserialize_with = "loose::flag")]
    pub is_hazardous: u8,
    #[serde(deserialize_with = "loose::text")]
    pub approach_date: String,
    #[serde(deserialize_with = "loose::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "loose::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Asteroid {
    pub fn hazardous(&self) -> bool {
        self.is_hazardous == 1
    }
}

/// A JSON scalar that may arrive as a number, numeric text or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Default for LooseValue {
    fn default() -> Self {
        LooseValue::Number(0.0)
    }
}

impl LooseValue {
    /// Numeric coercion; anything unparseable or non-finite is 0.
    pub fn as_f64(&self) -> f64 {
        let value = match self {
            LooseValue::Bool(b) => f64::from(u8::from(*b)),
            LooseValue::Number(n) => *n,
            LooseValue::Text(t) => t.trim().parse().unwrap_or(0.0),
        };
        if value.is_finite() { value } else { 0.0 }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            LooseValue::Bool(b) => *b,
            LooseValue::Number(n) => *n != 0.0 && !n.is_nan(),
            LooseValue::Text(t) => {
                let t = t.trim();
                !t.is_empty() && t != "0" && !t.eq_ignore_ascii_case("false")
            }
        }
    }

    /// Canonical string form used as an identifier, so `42`, `42.0`,
    /// `"42"` and `"42.0"` all map to `"42"`.
    pub fn to_key(&self) -> String {
        match self {
            LooseValue::Bool(b) => b.to_string(),
            LooseValue::Number(n) => number_key(*n),
            LooseValue::Text(t) => {
                let t = t.trim();
                // plain digit strings stay exact, even beyond f64 precision
                let digits = t.strip_prefix('-').unwrap_or(t);
                if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                    return t.to_string();
                }
                match t.parse::<f64>() {
                    Ok(n) if n.is_finite() && t.bytes().any(|b| b.is_ascii_digit()) => {
                        number_key(n)
                    }
                    _ => t.to_string(),
                }
            }
        }
    }
}

fn number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl From<f64> for LooseValue {
    fn from(value: f64) -> Self {
        LooseValue::Number(value)
    }
}

impl From<i64> for LooseValue {
    fn from(value: i64) -> Self {
        LooseValue::Number(value as f64)
    }
}

impl From<bool> for LooseValue {
    fn from(value: bool) -> Self {
        LooseValue::Bool(value)
    }
}

impl From<&str> for LooseValue {
    fn from(value: &str) -> Self {
        LooseValue::Text(value.to_string())
    }
}

/// Ingestion shape accepted by `upsert`, from the feed normalizer or a
/// seed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsteroidInput {
    pub name: String,
    #[serde(default)]
    pub velocity: LooseValue,
    #[serde(default)]
    pub distance: LooseValue,
    #[serde(default)]
    pub size: LooseValue,
    #[serde(default)]
    pub is_hazardous: LooseValue,
    #[serde(default)]
    pub approach_date: Option<String>,
}

/// Outward-facing asteroid: fixed one-decimal strings for velocity and
/// distance, a real boolean for the hazard flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AsteroidView {
    pub id: u64,
    pub name: String,
    pub velocity: String,
    pub distance: String,
    pub size: i64,
    pub is_hazardous: bool,
    pub approach_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Asteroid> for AsteroidView {
    fn from(a: &Asteroid) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            velocity: format!("{:.1}", a.velocity),
            distance: format!("{:.1}", a.distance),
            size: a.size,
            is_hazardous: a.hazardous(),
            approach_date: a.approach_date.clone(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Response envelope for the asteroid list, also the cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AsteroidFeed {
    pub count: usize,
    pub asteroids: Vec<AsteroidView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl AsteroidFeed {
    pub fn from_records(records: &[Asteroid]) -> Self {
        Self {
            count: records.len(),
            asteroids: records.iter().map(AsteroidView::from).collect(),
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_asteroids: usize,
    pub hazardous_asteroids: usize,
    pub average_size: i64,
    pub db_path: String,
    pub db_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchedAsteroid {
    #[serde(default, deserialize_with = "loose::key")]
    pub id: String,
    #[serde(default, deserialize_with = "loose::text")]
    pub name: String,
    #[serde(default, deserialize_with = "loose::timestamp")]
    pub added_at: DateTime<Utc>,
}

/// Persisted account record, keyed by `id` in users.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "loose::key")]
    pub id: String,
    #[serde(deserialize_with = "loose::text")]
    pub username: String,
    #[serde(default, deserialize_with = "loose::text")]
    pub email: String,
    #[serde(deserialize_with = "loose::text")]
    pub password: String,
    #[serde(default, deserialize_with = "loose::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "loose::list")]
    pub watched_asteroids: Vec<WatchedAsteroid>,
    #[serde(default, deserialize_with = "loose::list")]
    pub alerts: Vec<serde_json::Value>,
}

/// Everything about a user except the password digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub avatar_url: Option<String>,
    pub watched_asteroids: Vec<WatchedAsteroid>,
    #[schema(value_type = Vec<Object>)]
    pub alerts: Vec<serde_json::Value>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            avatar_url: user.avatar_url,
            watched_asteroids: user.watched_asteroids,
            alerts: user.alerts,
        }
    }
}

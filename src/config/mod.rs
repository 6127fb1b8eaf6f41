use std::env;
use std::path::PathBuf;

/// Runtime configuration for the dashboard backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address (default: "0.0.0.0")
    pub host: String,

    /// Preferred port, tried before the fallback list (default: 8000)
    pub port: u16,

    /// Ports tried in order when the preferred one is taken
    pub fallback_ports: Vec<u16>,

    /// NeoWs API key (default: "DEMO_KEY")
    pub nasa_api_key: String,

    /// NeoWs feed endpoint
    pub nasa_feed_url: String,

    /// Timeout for the outbound feed request in seconds (default: 30)
    pub feed_timeout_secs: u64,

    /// Secret used to sign session tokens and key password digests
    pub jwt_secret: String,

    /// Session token lifetime in days (default: 7)
    pub token_ttl_days: i64,

    /// Directory holding asteroids.json, cache.json and users.json
    pub data_dir: PathBuf,

    /// Directory avatars are written to, served under /uploads
    pub uploads_dir: PathBuf,

    /// Static dashboard directory
    pub public_dir: PathBuf,

    /// Upstream auth service for `--mode asteroids` deployments
    pub auth_service_url: Option<String>,

    /// Lifetime of cached asteroid envelopes in minutes (default: 60)
    pub cache_ttl_minutes: i64,

    /// Maximum avatar size in bytes (default: 2 MB)
    pub max_avatar_size: usize,

    /// Avatar assigned to new accounts
    pub default_avatar_url: String,

    /// Optional asteroid seed document loaded at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            fallback_ports: vec![8000, 3000, 5000, 8001, 3001],
            nasa_api_key: "DEMO_KEY".to_string(),
            nasa_feed_url: "https://api.nasa.gov/neo/rest/v1/feed".to_string(),
            feed_timeout_secs: 30,
            jwt_secret: "dev-secret".to_string(),
            token_ttl_days: 7,
            data_dir: PathBuf::from("data"),
            uploads_dir: PathBuf::from("uploads"),
            public_dir: PathBuf::from("public"),
            auth_service_url: None,
            cache_ttl_minutes: 60,
            max_avatar_size: 2 * 1024 * 1024, // 2 MB
            default_avatar_url: "/images/default-avatar.png".to_string(),
            seed_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to
    /// defaults for missing or unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(default.host),

            port: non_empty("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default.port),

            fallback_ports: non_empty("FALLBACK_PORTS")
                .map(|v| {
                    v.split(',')
                        .filter_map(|p| p.trim().parse().ok())
                        .collect::<Vec<u16>>()
                })
                .filter(|ports| !ports.is_empty())
                .unwrap_or(default.fallback_ports),

            nasa_api_key: non_empty("NASA_API_KEY").unwrap_or(default.nasa_api_key),

            nasa_feed_url: non_empty("NASA_FEED_URL").unwrap_or(default.nasa_feed_url),

            feed_timeout_secs: non_empty("FEED_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.feed_timeout_secs),

            jwt_secret: non_empty("JWT_SECRET").unwrap_or(default.jwt_secret),

            token_ttl_days: non_empty("TOKEN_TTL_DAYS")
                .and_then(|v| v.parse().ok())
                .filter(|days: &i64| *days > 0)
                .unwrap_or(default.token_ttl_days),

            data_dir: non_empty("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.data_dir),

            uploads_dir: non_empty("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.uploads_dir),

            public_dir: non_empty("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.public_dir),

            auth_service_url: non_empty("AUTH_SERVICE_URL")
                .map(|v| v.trim_end_matches('/').to_string()),

            cache_ttl_minutes: non_empty("CACHE_TTL_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.cache_ttl_minutes),

            max_avatar_size: non_empty("MAX_AVATAR_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_avatar_size),

            default_avatar_url: non_empty("DEFAULT_AVATAR_URL")
                .unwrap_or(default.default_avatar_url),

            seed_file: non_empty("SEED_FILE").map(PathBuf::from),
        }
    }

    /// Preferred port followed by the fallback list, without duplicates.
    pub fn candidate_ports(&self) -> Vec<u16> {
        let mut ports = vec![self.port];
        for port in &self.fallback_ports {
            if !ports.contains(port) {
                ports.push(*port);
            }
        }
        ports
    }

    pub fn asteroids_file(&self) -> PathBuf {
        self.data_dir.join("asteroids.json")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.data_dir.join("cache.json")
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.cache_ttl_minutes, 60);
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.max_avatar_size, 2 * 1024 * 1024);
        assert!(config.auth_service_url.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "4000"),
            ("FALLBACK_PORTS", "4001, 4002,nope"),
            ("JWT_SECRET", "s3cret"),
            ("AUTH_SERVICE_URL", "http://auth.local:4000/"),
            ("DATA_DIR", "/tmp/neo"),
        ]));

        assert_eq!(config.port, 4000);
        assert_eq!(config.fallback_ports, vec![4001, 4002]);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(
            config.auth_service_url.as_deref(),
            Some("http://auth.local:4000")
        );
        assert_eq!(config.asteroids_file(), PathBuf::from("/tmp/neo/asteroids.json"));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("CACHE_TTL_MINUTES", "soon"),
            ("TOKEN_TTL_DAYS", "0"),
            ("NASA_API_KEY", "   "),
        ]));

        assert_eq!(config.port, 8000);
        assert_eq!(config.cache_ttl_minutes, 60);
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.nasa_api_key, "DEMO_KEY");
    }

    #[test]
    fn test_candidate_ports_skip_duplicates() {
        let config = AppConfig {
            port: 3000,
            ..AppConfig::default()
        };
        assert_eq!(config.candidate_ports(), vec![3000, 8000, 5000, 8001, 3001]);
    }
}

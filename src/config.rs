use chrono_tz::Tz;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Base URL of the signal service's position API.
    pub positions_api_url: String,
    /// Timezone in which calendar days are derived for snapshot dating.
    pub snapshot_timezone: Tz,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let positions_api_url = env_map
            .get("POSITIONS_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("POSITIONS_API_URL".to_string()))?;

        let snapshot_timezone = env_map
            .get("SNAPSHOT_TIMEZONE")
            .map(|s| s.as_str())
            .unwrap_or("America/New_York")
            .parse::<Tz>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SNAPSHOT_TIMEZONE".to_string(),
                    "must be an IANA timezone name".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            positions_api_url,
            snapshot_timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert(
            "POSITIONS_API_URL".to_string(),
            "http://localhost:9000".to_string(),
        );
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.snapshot_timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_positions_api_url() {
        let mut env_map = setup_required_env();
        env_map.remove("POSITIONS_API_URL");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "POSITIONS_API_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_timezone() {
        let mut env_map = setup_required_env();
        env_map.insert("SNAPSHOT_TIMEZONE".to_string(), "Mars/Olympus".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SNAPSHOT_TIMEZONE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_custom_timezone() {
        let mut env_map = setup_required_env();
        env_map.insert("SNAPSHOT_TIMEZONE".to_string(), "Europe/Berlin".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.snapshot_timezone, chrono_tz::Europe::Berlin);
    }
}

use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_busy_timeout() -> u64 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    pub ticket_prefix: String,
    /// Ticket-number candidates tried before a booking fails with IDENTIFIER_COLLISION.
    pub ticket_number_attempts: u32,
    /// Reject bookings on flights that have already departed.
    #[serde(default = "default_recheck")]
    pub recheck_departure: bool,
}

fn default_recheck() -> bool { true }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            ticket_prefix: "SL".to_string(),
            ticket_number_attempts: 5,
            recheck_departure: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://skyledger.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.busy_timeout_seconds", 5)?
            .set_default("auth.jwt_secret", "change-me")?
            .set_default("auth.jwt_expiration_seconds", 3600)?
            .set_default("booking.ticket_prefix", "SL")?
            .set_default("booking.ticket_number_attempts", 5)?
            .set_default("booking.recheck_departure", true)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. SKYLEDGER__DATABASE__URL=sqlite::memory:
            .add_source(config::Environment::with_prefix("SKYLEDGER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_files() {
        let config = Config::load().unwrap();
        assert!(config.booking.ticket_number_attempts > 0);
        assert!(!config.booking.ticket_prefix.is_empty());
        assert!(config.database.max_connections > 0);
    }
}

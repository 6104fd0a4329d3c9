// src/config/mod.rs
// All tunables come from the environment (.env supported); the gateway
// bearer token lives here and nowhere else - it is never sent to a client.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct MentorConfig {
    // ── Gateway Configuration
    pub gateway_url: String,
    pub gateway_api_key: String,
    pub gateway_connect_timeout: u64,

    // ── Database Configuration
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Server Configuration
    pub host: String,
    pub port: u16,

    // ── Logging Configuration
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            // Tolerate trailing comments and whitespace in .env values
            let clean_val = val.split('#').next().unwrap_or("").trim();
            clean_val.parse::<T>().unwrap_or(default)
        }
        Err(_) => default,
    }
}

impl MentorConfig {
    pub fn from_env() -> Self {
        // Load .env if present; plain environment variables still win
        let _ = dotenvy::dotenv();

        Self {
            gateway_url: env_var_or(
                "MENTOR_GATEWAY_URL",
                "http://localhost:8788/ai-mentor".to_string(),
            ),
            gateway_api_key: env_var_or("MENTOR_GATEWAY_API_KEY", String::new()),
            gateway_connect_timeout: env_var_or("MENTOR_GATEWAY_CONNECT_TIMEOUT", 10),
            database_url: env_var_or("DATABASE_URL", "sqlite:./mentor.db".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 10),
            host: env_var_or("MENTOR_HOST", "0.0.0.0".to_string()),
            port: env_var_or("MENTOR_PORT", 3040),
            log_level: env_var_or("MENTOR_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<MentorConfig> = Lazy::new(MentorConfig::from_env);

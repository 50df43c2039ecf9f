use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// HMAC key for ticket QR payloads
    pub ticket_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub hold_ttl_seconds: i64,
    pub max_hold_ttl_seconds: i64,
    pub max_seats_per_hold: usize,
    pub sweep_interval_seconds: u64,
    pub lock_timeout_ms: u64,
}

fn env_or<T: FromStr>(key: &str, default: &str) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{} must be a number", key))
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            ticket_secret: env::var("TICKET_SECRET")
                .expect("TICKET_SECRET must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env_or("SERVER_PORT", "3000"),
            hold_ttl_seconds: env_or("HOLD_TTL_SECONDS", "300"),
            max_hold_ttl_seconds: env_or("MAX_HOLD_TTL_SECONDS", "1800"),
            max_seats_per_hold: env_or("MAX_SEATS_PER_HOLD", "10"),
            sweep_interval_seconds: env_or("SWEEP_INTERVAL_SECONDS", "30"),
            lock_timeout_ms: env_or("LOCK_TIMEOUT_MS", "5000"),
        }
    }

    /// Configuration with the given secrets and every tunable at its default.
    pub fn with_secrets(database_url: &str, jwt_secret: &str, ticket_secret: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            jwt_secret: jwt_secret.to_string(),
            ticket_secret: ticket_secret.to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            hold_ttl_seconds: 300,
            max_hold_ttl_seconds: 1800,
            max_seats_per_hold: 10,
            sweep_interval_seconds: 30,
            lock_timeout_ms: 5000,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::FixedOffset;
use dotenvy::dotenv;

use crate::attendance::retention::RolloverPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    Csv,
    Sql,
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" | "file" | "excel" => Ok(StorageMode::Csv),
            "sql" | "sqlite" | "db" => Ok(StorageMode::Sql),
            other => Err(format!("unknown storage mode `{other}`")),
        }
    }
}

/// India Standard Time, the zone every "today" is computed in unless overridden.
const DEFAULT_TZ_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Knobs of the attendance engine that do not depend on the transport.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub tz_offset: FixedOffset,
    /// Retention horizon, in blocks of 30 days.
    pub month_limit: u32,
    /// Maximum rows in the active attendance partition.
    pub row_limit: usize,
    pub rollover_policy: RolloverPolicy,
    pub geofence_buffer_meters: f64,
    pub admin_phones: Vec<String>,
    pub default_admin_password: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tz_offset: FixedOffset::east_opt(DEFAULT_TZ_OFFSET_SECS).expect("+05:30 is a valid offset"),
            month_limit: 10,
            row_limit: 1_048_000,
            rollover_policy: RolloverPolicy::Migrate,
            geofence_buffer_meters: 150.0,
            admin_phones: Vec::new(),
            default_admin_password: "change-me".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub access_token_ttl: usize,

    pub storage_mode: StorageMode,
    pub data_dir: PathBuf,
    pub database_url: String,

    pub engine: EngineConfig,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_signup_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = EngineConfig::default();

        let tz_offset = env::var("TZ_OFFSET")
            .ok()
            .and_then(|raw| parse_offset(&raw))
            .unwrap_or(defaults.tz_offset);

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env_or("ACCESS_TOKEN_TTL", 43_200), // default 12h

            storage_mode: env_or("STORAGE_MODE", StorageMode::Csv),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://attendance.db".to_string()),

            engine: EngineConfig {
                tz_offset,
                month_limit: env_or("MONTH_LIMIT", defaults.month_limit),
                row_limit: at_least(
                    "ROW_LIMIT",
                    env_or("ROW_LIMIT", defaults.row_limit),
                    1,
                    defaults.row_limit,
                ),
                rollover_policy: env_or("ROLLOVER_POLICY", defaults.rollover_policy),
                geofence_buffer_meters: env_or(
                    "GEOFENCE_BUFFER_METERS",
                    defaults.geofence_buffer_meters,
                ),
                admin_phones: env::var("ADMIN_PHONES")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
                default_admin_password: env::var("DEFAULT_ADMIN_PASSWORD")
                    .unwrap_or(defaults.default_admin_password),
            },

            rate_login_per_min: env_or("RATE_LOGIN_PER_MIN", 60),
            rate_signup_per_min: env_or("RATE_SIGNUP_PER_MIN", 30),
            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", 1000),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring malformed config value");
                default
            }
        },
        Err(_) => default,
    }
}

/// Falls back to `default` when `value` is below `min`.
fn at_least<T: PartialOrd + std::fmt::Display>(key: &str, value: T, min: T, default: T) -> T {
    if value < min {
        tracing::warn!(key, %value, %min, "Ignoring out-of-range config value");
        return default;
    }
    value
}

/// Parses `+05:30`, `-04:00` or `+0530` into a fixed offset.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => (1, raw),
    };
    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_offset("-0400").unwrap().local_minus_utc(), -14_400);
        assert!(parse_offset("+5:30").is_none());
        assert!(parse_offset("+05:75").is_none());
    }

    #[test]
    fn storage_mode_accepts_aliases() {
        assert_eq!("SQLite".parse::<StorageMode>().unwrap(), StorageMode::Sql);
        assert_eq!("excel".parse::<StorageMode>().unwrap(), StorageMode::Csv);
        assert!("mongo".parse::<StorageMode>().is_err());
    }

    #[test]
    fn row_limit_below_one_falls_back() {
        assert_eq!(at_least("ROW_LIMIT", 0usize, 1, 1_048_000), 1_048_000);
        assert_eq!(at_least("ROW_LIMIT", 1usize, 1, 1_048_000), 1);
        assert_eq!(at_least("ROW_LIMIT", 500usize, 1, 1_048_000), 500);
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(" 111, ,222,"), vec!["111", "222"]);
    }
}

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8086,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// PostgreSQL settings. Without a connection string the in-memory store is used.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub connection_string: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds
    pub connect_timeout_secs: u64,
    /// Seconds
    pub idle_timeout_secs: u64,
    /// Seconds
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        }
    }
}

/// Longest retention accepted, about a century
pub const MAX_RETENTION_DAYS: u32 = 36_500;
/// Longest interval between cleanup passes, one year
pub const MAX_CLEANUP_INTERVAL_HOURS: u64 = 24 * 365;

/// Recycle bin settings
#[derive(Debug, Clone)]
pub struct TrashConfig {
    /// Entries older than this are purged; 0 keeps them forever
    pub retention_days: u32,
    pub cleanup_interval_hours: u64,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: 0,
            cleanup_interval_hours: 24,
        }
    }
}

impl TrashConfig {
    pub fn cleanup_enabled(&self) -> bool {
        self.retention_days > 0
    }

    pub fn cleanup_interval(&self) -> Duration {
        let hours = self.cleanup_interval_hours.clamp(1, MAX_CLEANUP_INTERVAL_HOURS);
        Duration::from_secs(hours * 60 * 60)
    }
}

/// Global application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub trash: TrashConfig,
}

impl AppConfig {
    /// Builds the configuration from `PORTAL_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reading from an arbitrary source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        parse_into(&lookup, "PORTAL_SERVER_HOST", &mut config.server.host);
        parse_into(&lookup, "PORTAL_SERVER_PORT", &mut config.server.port);

        config.database.connection_string = lookup("PORTAL_DB_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        parse_into(&lookup, "PORTAL_DB_MAX_CONNECTIONS", &mut config.database.max_connections);
        parse_into(&lookup, "PORTAL_DB_MIN_CONNECTIONS", &mut config.database.min_connections);
        parse_into(&lookup, "PORTAL_DB_CONNECT_TIMEOUT", &mut config.database.connect_timeout_secs);
        parse_into(&lookup, "PORTAL_DB_IDLE_TIMEOUT", &mut config.database.idle_timeout_secs);
        parse_into(&lookup, "PORTAL_DB_MAX_LIFETIME", &mut config.database.max_lifetime_secs);

        parse_into(&lookup, "PORTAL_TRASH_RETENTION_DAYS", &mut config.trash.retention_days);
        parse_into(
            &lookup,
            "PORTAL_TRASH_CLEANUP_INTERVAL_HOURS",
            &mut config.trash.cleanup_interval_hours,
        );
        clamp_to(
            "PORTAL_TRASH_RETENTION_DAYS",
            &mut config.trash.retention_days,
            MAX_RETENTION_DAYS,
        );
        clamp_to(
            "PORTAL_TRASH_CLEANUP_INTERVAL_HOURS",
            &mut config.trash.cleanup_interval_hours,
            MAX_CLEANUP_INTERVAL_HOURS,
        );

        config
    }
}

fn parse_into<T, F>(lookup: &F, key: &str, target: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw),
        }
    }
}

fn clamp_to<T>(key: &str, target: &mut T, max: T)
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if *target > max {
        tracing::warn!("{} = {} is too large, using {}", key, target, max);
        *target = max;
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
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.server.port, 8086);
        assert!(config.database.connection_string.is_none());
        assert!(!config.trash.cleanup_enabled());
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORTAL_SERVER_PORT", "9000"),
            ("PORTAL_DB_URL", "postgres://portal@localhost/portal"),
            ("PORTAL_DB_MAX_CONNECTIONS", "many"),
            ("PORTAL_TRASH_RETENTION_DAYS", "30"),
        ]));

        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.database.connection_string.as_deref(),
            Some("postgres://portal@localhost/portal")
        );
        assert_eq!(config.database.max_connections, 10);
        assert!(config.trash.cleanup_enabled());
        assert_eq!(config.trash.retention_days, 30);
    }

    #[test]
    fn oversized_trash_values_are_clamped() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORTAL_TRASH_RETENTION_DAYS", "100000000"),
            ("PORTAL_TRASH_CLEANUP_INTERVAL_HOURS", "18446744073709551615"),
        ]));

        assert_eq!(config.trash.retention_days, MAX_RETENTION_DAYS);
        assert_eq!(config.trash.cleanup_interval_hours, MAX_CLEANUP_INTERVAL_HOURS);
        assert_eq!(
            config.trash.cleanup_interval(),
            Duration::from_secs(MAX_CLEANUP_INTERVAL_HOURS * 3600)
        );
    }

    #[test]
    fn cleanup_interval_is_bounded_when_built_directly() {
        let trash = TrashConfig { retention_days: 7, cleanup_interval_hours: u64::MAX };
        assert_eq!(trash.cleanup_interval(), Duration::from_secs(MAX_CLEANUP_INTERVAL_HOURS * 3600));
    }

    #[test]
    fn cleanup_interval_has_a_floor_of_one_hour() {
        let trash = TrashConfig { retention_days: 7, cleanup_interval_hours: 0 };
        assert_eq!(trash.cleanup_interval(), Duration::from_secs(3600));
    }
}

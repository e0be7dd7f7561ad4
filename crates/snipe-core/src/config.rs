use std::{
    env, fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use crate::{
    cache::DEFAULT_CAPACITY, errors::Error, messaging::throttled::ThrottleConfig,
    notify::DEFAULT_ROLE, router::DEFAULT_COMMAND_PREFIX, Result,
};

/// Typed configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub discord_token: String,
    pub snipe_role: String,
    pub command_prefix: String,

    // Caches
    pub history_capacity: usize,
    pub message_cache_size: usize,

    // Health endpoint
    pub health_enabled: bool,
    pub health_addr: SocketAddr,

    // Presence / keep-alive
    pub presence_interval: Duration,
    pub keepalive_interval: Duration,
    pub inactivity_check_interval: Duration,
    pub inactivity_threshold: Duration,

    // Outbound rate limiting
    pub throttle: ThrottleConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let discord_token = get("DISCORD_TOKEN").ok_or_else(|| {
            Error::Config("DISCORD_TOKEN environment variable is required".to_string())
        })?;

        let snipe_role = get("SNIPE_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string());
        let command_prefix =
            get("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        let history_capacity = parse_or(&get, "HISTORY_CAPACITY", DEFAULT_CAPACITY)?.max(1);
        let message_cache_size = parse_or(&get, "MESSAGE_CACHE_SIZE", 200usize)?;

        let health_enabled = match get("HEALTH_ENABLED") {
            Some(v) => parse_bool(&v),
            None => true,
        };
        let bind = parse_or(&get, "HEALTH_BIND", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = match get("HEALTH_PORT") {
            Some(_) => parse_or(&get, "HEALTH_PORT", 8000u16)?,
            None => parse_or(&get, "PORT", 8000u16)?,
        };

        let presence_interval = secs(parse_or(&get, "PRESENCE_INTERVAL_SECS", 30)?);
        let keepalive_interval = secs(parse_or(&get, "KEEPALIVE_INTERVAL_SECS", 300)?);
        let inactivity_check_interval = secs(parse_or(&get, "INACTIVITY_CHECK_SECS", 60)?);
        let inactivity_threshold = secs(parse_or(&get, "INACTIVITY_THRESHOLD_SECS", 300)?);

        let throttle = ThrottleConfig {
            global_min_interval: Duration::from_millis(parse_or(&get, "GLOBAL_MIN_INTERVAL_MS", 25)?),
            per_target_min_interval: Duration::from_millis(parse_or(&get, "DM_MIN_INTERVAL_MS", 250)?),
        };

        Ok(Self {
            discord_token,
            snipe_role,
            command_prefix,
            history_capacity,
            message_cache_size,
            health_enabled,
            health_addr: SocketAddr::new(bind, port),
            presence_interval,
            keepalive_interval,
            inactivity_check_interval,
            inactivity_threshold,
            throttle,
        })
    }
}

// Zero-length intervals would make tokio::time::interval panic.
fn secs(n: u64) -> Duration {
    Duration::from_secs(n.max(1))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("invalid {key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn token_is_required() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
        assert!(config(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn defaults() {
        let c = config(&[("DISCORD_TOKEN", "t")]).unwrap();
        assert_eq!(c.snipe_role, DEFAULT_ROLE);
        assert_eq!(c.command_prefix, DEFAULT_COMMAND_PREFIX);
        assert_eq!(c.history_capacity, 10);
        assert_eq!(c.message_cache_size, 200);
        assert!(c.health_enabled);
        assert_eq!(c.health_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(c.presence_interval, Duration::from_secs(30));
        assert_eq!(c.keepalive_interval, Duration::from_secs(300));
        assert_eq!(c.inactivity_check_interval, Duration::from_secs(60));
        assert_eq!(c.inactivity_threshold, Duration::from_secs(300));
        assert_eq!(c.throttle.per_target_min_interval, Duration::from_millis(250));
        assert_eq!(c.throttle.global_min_interval, Duration::from_millis(25));
    }

    #[test]
    fn overrides_and_port_fallback() {
        let c = config(&[
            ("DISCORD_TOKEN", "t"),
            ("SNIPE_ROLE", "Mods"),
            ("HISTORY_CAPACITY", "0"),
            ("HEALTH_ENABLED", "off"),
            ("PORT", "3000"),
        ])
        .unwrap();
        assert_eq!(c.snipe_role, "Mods");
        assert_eq!(c.history_capacity, 1);
        assert!(!c.health_enabled);
        assert_eq!(c.health_addr.port(), 3000);

        let c = config(&[("DISCORD_TOKEN", "t"), ("PORT", "3000"), ("HEALTH_PORT", "9000")]).unwrap();
        assert_eq!(c.health_addr.port(), 9000);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config(&[("DISCORD_TOKEN", "t"), ("HEALTH_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("HEALTH_PORT"));
    }

    #[test]
    fn dotenv_lines_are_parsed() {
        let parsed = parse_dotenv(
            "# comment\n\nDISCORD_TOKEN=\"abc\"\nexport SNIPE_ROLE='EGO'\nnot a pair\n=x\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("DISCORD_TOKEN".to_string(), "abc".to_string()),
                ("SNIPE_ROLE".to_string(), "EGO".to_string()),
            ]
        );
    }
}

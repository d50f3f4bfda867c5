use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use parley_gateway::{GatewayOptions, SendRoute};

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub gateway: GatewayOptions,
    /// Where the session token is kept between runs. `None` keeps it in
    /// memory only.
    pub token_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset or empty variables take
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = GatewayOptions::default();

        let gateway = GatewayOptions {
            socket_url: get("PARLEY_SOCKET_URL").unwrap_or(defaults.socket_url),
            send_route: parse(&get, "PARLEY_SEND_ROUTE", defaults.send_route)?,
            send_timeout: secs(&get, "PARLEY_SEND_TIMEOUT_SECS", defaults.send_timeout)?,
            heartbeat_interval: secs(&get, "PARLEY_HEARTBEAT_SECS", defaults.heartbeat_interval)?,
            reconnect_delay: millis(&get, "PARLEY_RECONNECT_MS", defaults.reconnect_delay)?,
            max_reconnect_delay: millis(&get, "PARLEY_MAX_RECONNECT_MS", defaults.max_reconnect_delay)?,
        };

        Ok(Self {
            api_url: get("PARLEY_API_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            gateway,
            token_file: get("PARLEY_TOKEN_FILE").map(PathBuf::from),
        })
    }
}

fn parse<G, T>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn secs<G>(get: &G, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    non_zero(var, parse(get, var, default.as_secs())?).map(Duration::from_secs)
}

fn millis<G>(get: &G, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let default = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    non_zero(var, parse(get, var, default)?).map(Duration::from_millis)
}

/// Every duration here paces a timer or a retry loop.
fn non_zero(var: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError {
            var,
            value: value.to_string(),
            reason: "must be non-zero".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.gateway, GatewayOptions::default());
        assert_eq!(config.token_file, None);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("PARLEY_API_URL", "https://api.example.com"),
            ("PARLEY_SOCKET_URL", "wss://live.example.com"),
            ("PARLEY_SEND_ROUTE", "socket"),
            ("PARLEY_SEND_TIMEOUT_SECS", "3"),
            ("PARLEY_RECONNECT_MS", "250"),
            ("PARLEY_TOKEN_FILE", "/tmp/parley.token"),
        ])
        .unwrap();

        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.gateway.relay_base(), "https://live.example.com");
        assert_eq!(config.gateway.send_route, SendRoute::Socket);
        assert_eq!(config.gateway.send_timeout, Duration::from_secs(3));
        assert_eq!(config.gateway.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.gateway.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.token_file, Some(PathBuf::from("/tmp/parley.token")));
    }

    #[test]
    fn empty_values_fall_back() {
        let config = config(&[("PARLEY_SEND_ROUTE", "  "), ("PARLEY_TOKEN_FILE", "")]).unwrap();
        assert_eq!(config.gateway.send_route, SendRoute::Rest);
        assert_eq!(config.token_file, None);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = config(&[("PARLEY_HEARTBEAT_SECS", "often")]).unwrap_err();
        assert_eq!(err.var, "PARLEY_HEARTBEAT_SECS");
        assert_eq!(err.value, "often");

        let err = config(&[("PARLEY_SEND_ROUTE", "fax")]).unwrap_err();
        assert_eq!(err.var, "PARLEY_SEND_ROUTE");
    }

    #[test]
    fn zero_durations_are_rejected() {
        for var in [
            "PARLEY_SEND_TIMEOUT_SECS",
            "PARLEY_HEARTBEAT_SECS",
            "PARLEY_RECONNECT_MS",
            "PARLEY_MAX_RECONNECT_MS",
        ] {
            let err = config(&[(var, "0")]).unwrap_err();
            assert_eq!(err.var, var);
            assert_eq!(err.value, "0");
            assert_eq!(err.reason, "must be non-zero");
        }
    }
}

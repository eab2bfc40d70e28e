//! Mediator configuration.

use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::bus::DEFAULT_CAPACITY;

pub const DECISION_TIMEOUT_ENV: &str = "MEDIATOR_DECISION_TIMEOUT_MS";
pub const BUS_CAPACITY_ENV: &str = "MEDIATOR_BUS_CAPACITY";
pub const BIND_ADDR_ENV: &str = "MEDIATOR_BIND_ADDR";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Mediator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediatorConfig {
    /// How long a restricted request may wait for a decision. `None` waits
    /// until the user acts.
    pub decision_timeout: Option<Duration>,
    /// Per-subscriber buffer of the decision bus.
    pub bus_capacity: usize,
    /// Listen address of the socket transport.
    pub bind_addr: SocketAddr,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            decision_timeout: None,
            bus_capacity: DEFAULT_CAPACITY,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl MediatorConfig {
    /// Read overrides from the process environment.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read overrides through `lookup`; unset variables keep defaults.
    ///
    /// A timeout of `0` disables the timeout.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unparsable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ms) = parse(&lookup, DECISION_TIMEOUT_ENV)? {
            config.decision_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(capacity) = parse::<usize>(&lookup, BUS_CAPACITY_ENV)? {
            if capacity == 0 {
                return Err(ConfigError::InvalidValue {
                    var: BUS_CAPACITY_ENV,
                    value: capacity.to_string(),
                });
            }
            config.bus_capacity = capacity;
        }
        if let Some(addr) = parse(&lookup, BIND_ADDR_ENV)? {
            config.bind_addr = addr;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = MediatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MediatorConfig::default());
        assert!(config.decision_timeout.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = MediatorConfig::from_lookup(lookup(&[
            (DECISION_TIMEOUT_ENV, "1500"),
            (BUS_CAPACITY_ENV, "8"),
            (BIND_ADDR_ENV, "0.0.0.0:9000"),
        ]))
        .unwrap();

        assert_eq!(config.decision_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.bus_capacity, 8);
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = MediatorConfig::from_lookup(lookup(&[(DECISION_TIMEOUT_ENV, "0")])).unwrap();
        assert!(config.decision_timeout.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let err = MediatorConfig::from_lookup(lookup(&[(DECISION_TIMEOUT_ENV, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(DECISION_TIMEOUT_ENV));

        tokio_test::assert_err!(MediatorConfig::from_lookup(lookup(&[(BUS_CAPACITY_ENV, "0")])));
        tokio_test::assert_err!(MediatorConfig::from_lookup(lookup(&[(
            BIND_ADDR_ENV,
            "nowhere"
        )])));
    }
}

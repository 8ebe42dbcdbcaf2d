//! Runtime settings read from the environment.
//!
//! Numeric values that fail to parse are logged and replaced by their default;
//! an unusable bind address is an error.

use crate::RateLimitConfig;
use crate::algorithms::DEFAULT_SWEEP_PROBABILITY;
use crate::api::RouteLimits;
use crate::error::ConfigError;
use crate::middleware::ClientIdPolicy;
use crate::upstream::UpstreamConfig;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub upstream: UpstreamConfig,
    pub limits: RouteLimits,
    pub sweep_probability: f64,
    pub client_ids: ClientIdPolicy,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr: SocketAddr = match lookup("GENPROXY_BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "GENPROXY_BIND_ADDR",
                value,
            })?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "GENPROXY_BIND_ADDR",
                    value: DEFAULT_BIND_ADDR.to_string(),
                })?,
        };

        let defaults = UpstreamConfig::default();
        let upstream = UpstreamConfig {
            image_base_url: lookup("GENPROXY_IMAGE_API_URL").unwrap_or(defaults.image_base_url),
            text_base_url: lookup("GENPROXY_TEXT_API_URL").unwrap_or(defaults.text_base_url),
            image_model: lookup("GENPROXY_IMAGE_MODEL").unwrap_or(defaults.image_model),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "GENPROXY_UPSTREAM_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
        };

        let logo = RateLimitConfig::per_millis(
            parse_or(&lookup, "GENPROXY_LOGO_RATE_LIMIT", 1u32),
            parse_or(&lookup, "GENPROXY_LOGO_RATE_WINDOW_MS", 1000u64),
        );
        logo.validate()?;

        let explain = match lookup("GENPROXY_EXPLAIN_RATE_LIMIT") {
            Some(_) => {
                let config = RateLimitConfig::per_millis(
                    parse_or(&lookup, "GENPROXY_EXPLAIN_RATE_LIMIT", 1u32),
                    parse_or(&lookup, "GENPROXY_EXPLAIN_RATE_WINDOW_MS", 1000u64),
                );
                config.validate()?;
                Some(config)
            }
            None => None,
        };

        let sweep_probability = parse_or(
            &lookup,
            "GENPROXY_SWEEP_PROBABILITY",
            DEFAULT_SWEEP_PROBABILITY,
        )
        .clamp(0.0, 1.0);

        let client_ids = ClientIdPolicy {
            trust_proxy_headers: parse_or(&lookup, "GENPROXY_TRUST_PROXY_HEADERS", false),
        };

        Ok(Self {
            bind_addr,
            upstream,
            limits: RouteLimits { logo, explain },
            sweep_probability,
            client_ids,
        })
    }
}

fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return default;
    };
    match value.trim().parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(
                env_var = var,
                value = %value,
                default = %default,
                "Invalid value for environment variable, using default"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let settings = settings(&[]).expect("defaults are valid");

        assert_eq!(settings.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(settings.limits.logo, RateLimitConfig::per_millis(1, 1000));
        assert!(settings.limits.explain.is_none());
        assert_eq!(settings.sweep_probability, DEFAULT_SWEEP_PROBABILITY);
        assert_eq!(settings.upstream.image_model, "flux");
        assert!(!settings.client_ids.trust_proxy_headers);
    }

    #[test]
    fn proxy_headers_trusted_only_when_enabled() {
        let enabled = settings(&[("GENPROXY_TRUST_PROXY_HEADERS", "true")]).expect("valid");
        let garbage = settings(&[("GENPROXY_TRUST_PROXY_HEADERS", "yes please")]).expect("valid");

        assert!(enabled.client_ids.trust_proxy_headers);
        assert!(!garbage.client_ids.trust_proxy_headers);
    }

    #[test]
    fn explain_gate_is_opt_in() {
        let settings = settings(&[
            ("GENPROXY_EXPLAIN_RATE_LIMIT", "5"),
            ("GENPROXY_EXPLAIN_RATE_WINDOW_MS", "60000"),
        ])
        .expect("valid");

        assert_eq!(
            settings.limits.explain,
            Some(RateLimitConfig::per_millis(5, 60_000))
        );
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let settings = settings(&[
            ("GENPROXY_LOGO_RATE_LIMIT", "many"),
            ("GENPROXY_SWEEP_PROBABILITY", "7"),
        ])
        .expect("valid");

        assert_eq!(settings.limits.logo.max_request, 1);
        assert_eq!(settings.sweep_probability, 1.0);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            settings(&[("GENPROXY_LOGO_RATE_LIMIT", "0")]),
            Err(ConfigError::RateLimit(_))
        ));
    }

    #[test]
    fn bad_bind_address_is_an_error() {
        assert!(matches!(
            settings(&[("GENPROXY_BIND_ADDR", "localhost")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}

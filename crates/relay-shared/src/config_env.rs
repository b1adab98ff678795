use std::net::IpAddr;
use std::str::FromStr;

use crate::config::ConfigError;

pub(crate) type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn optional_trimmed_env(env: EnvLookup<'_>, key: &str) -> Option<String> {
    env(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn parse_int_env<T: FromStr>(
    env: EnvLookup<'_>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match optional_trimmed_env(env, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_f32_env(env: EnvLookup<'_>, key: &str, default: f32) -> Result<f32, ConfigError> {
    match optional_trimmed_env(env, key) {
        Some(raw) => raw
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ConfigError::ParseFloat(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_ip_list_env(env: EnvLookup<'_>, key: &str) -> Result<Vec<IpAddr>, ConfigError> {
    parse_list_env(env, key)
        .into_iter()
        .map(|item| {
            item.parse::<IpAddr>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{key} contains invalid IP address '{item}'"
                ))
            })
        })
        .collect()
}

pub(crate) fn parse_list_env(env: EnvLookup<'_>, key: &str) -> Vec<String> {
    let Some(raw) = env(key) else {
        return Vec::new();
    };

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

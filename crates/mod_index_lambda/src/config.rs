//! Environment-derived configuration for the Lambda binaries.

use chrono::Duration;
use mod_index_core::listing::ListingScope;
use mod_index_core::sweep::{SweepConfig, DEFAULT_GRACE_PERIOD_DAYS, SWEEP_PAGE_SIZE};
use thiserror::Error;

pub const DEFAULT_DEADLINE_MARGIN_MS: i64 = 10_000;
pub const MAX_GRACE_PERIOD_DAYS: i64 = 3_650;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    pub bucket: String,
    pub prefix: String,
    pub scope: ListingScope,
}

impl ListConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let scope = match non_empty(&lookup, "LISTING_SCOPE").as_deref() {
            None | Some("all") => ListingScope::AllPartitions,
            Some("published") => ListingScope::Published,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LISTING_SCOPE",
                    value: other.to_string(),
                    reason: "expected 'published' or 'all'",
                })
            }
        };

        Ok(Self {
            bucket: required(&lookup, "MOD_INDEX_BUCKET")?,
            prefix: non_empty(&lookup, "MOD_INDEX_PREFIX").unwrap_or_default(),
            scope,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    pub bucket: String,
    pub grace_period_days: i64,
    pub deadline_margin_ms: i64,
}

impl CleanupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: required(&lookup, "MOD_BLOB_BUCKET")?,
            grace_period_days: positive_integer(
                &lookup,
                "GRACE_PERIOD_DAYS",
                MAX_GRACE_PERIOD_DAYS,
            )?
            .unwrap_or(DEFAULT_GRACE_PERIOD_DAYS),
            deadline_margin_ms: positive_integer(&lookup, "SWEEP_DEADLINE_MARGIN_MS", i64::MAX)?
                .unwrap_or(DEFAULT_DEADLINE_MARGIN_MS),
        })
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            grace_period: Duration::days(self.grace_period_days),
            page_size: SWEEP_PAGE_SIZE,
        }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    non_empty(lookup, name).ok_or(ConfigError::Missing(name))
}

fn positive_integer(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    max: i64,
) -> Result<Option<i64>, ConfigError> {
    let Some(value) = non_empty(lookup, name) else {
        return Ok(None);
    };
    match value.parse::<i64>() {
        Ok(parsed) if parsed > 0 && parsed <= max => Ok(Some(parsed)),
        Ok(parsed) if parsed > max => Err(ConfigError::Invalid {
            name,
            value,
            reason: "value is too large",
        }),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected a positive integer",
        }),
    }
}

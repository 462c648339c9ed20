// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use anyhow::{Context, Result};
use std::env;

/// Linker configuration, shared read-only by every operation
#[derive(Debug, Clone)]
pub struct Config {
    /// Prepended to a component name to get its pipeline service account name
    pub service_account_prefix: String,
    /// Label key selecting secrets that are linked to every component
    pub common_secrets_label: String,
    /// Skip appending a secret that a service account already references
    pub dedupe_on_link: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service_account_prefix: defaults::SERVICE_ACCOUNT_PREFIX.to_string(),
            common_secrets_label: defaults::COMMON_SECRETS_LABEL.to_string(),
            dedupe_on_link: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let service_account_prefix = env::var("SERVICE_ACCOUNT_PREFIX")
            .unwrap_or_else(|_| defaults::SERVICE_ACCOUNT_PREFIX.to_string());
        let common_secrets_label = env::var("COMMON_SECRETS_LABEL")
            .unwrap_or_else(|_| defaults::COMMON_SECRETS_LABEL.to_string());
        // The operator re-runs links on every restart, so it dedupes unless told otherwise
        let dedupe_on_link = parse_flag(env::var("DEDUPE_ON_LINK").ok().as_deref(), true)
            .context("DEDUPE_ON_LINK must be 'true' or 'false'")?;

        Ok(Config {
            service_account_prefix,
            common_secrets_label,
            dedupe_on_link,
        })
    }

    /// Label selector matching the common secrets
    pub fn common_secrets_selector(&self) -> String {
        format!("{}=true", self.common_secrets_label)
    }
}

fn parse_flag(value: Option<&str>, default: bool) -> Result<bool> {
    match value {
        None => Ok(default),
        Some(v) => Ok(v.trim().parse::<bool>()?),
    }
}

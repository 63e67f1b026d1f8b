use anyhow::Context;

use crate::aggregator::{parse_fine_rate, FineConfig};

pub const FINE_RATE_VAR: &str = "ATTENDANCE_FINE_RATE";
pub const SHOW_FINES_VAR: &str = "ATTENDANCE_SHOW_FINES";
pub const LOG_LEVEL_VAR: &str = "RUST_LOG";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub fines: FineConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            fines: FineConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(raw) = lookup(FINE_RATE_VAR) {
            config.fines.fine_rate =
                parse_fine_rate(&raw).with_context(|| format!("invalid {FINE_RATE_VAR}"))?;
        }
        if let Some(raw) = lookup(SHOW_FINES_VAR) {
            config.fines.show_fines = parse_flag(&raw)
                .with_context(|| format!("{SHOW_FINES_VAR} must be true/false, got {raw:?}"))?;
        }
        if let Some(level) = lookup(LOG_LEVEL_VAR).filter(|level| !level.trim().is_empty()) {
            config.log_level = level;
        }

        Ok(config)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

use std::env;

use anyhow::Context;
use chrono::FixedOffset;

use crate::numbering::SequenceMode;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub clinic_offset: FixedOffset,
    pub sequence_mode: SequenceMode,
    pub doc_number_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);

        let offset_hours = env::var("CLINIC_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(7);
        let clinic_offset = FixedOffset::east_opt(offset_hours * 3600)
            .with_context(|| format!("CLINIC_UTC_OFFSET_HOURS out of range: {offset_hours}"))?;

        let sequence_mode = if parse_flag(env::var("DOC_SEQUENCE_RESET_YEARLY").ok().as_deref()) {
            SequenceMode::YearlyReset
        } else {
            SequenceMode::Continuous
        };

        let doc_number_max_attempts = env::var("DOC_NUMBER_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(3);

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            clinic_offset,
            sequence_mode,
            doc_number_max_attempts,
        })
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flag_values() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" YES ")));
        assert!(parse_flag(Some("1")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }
}

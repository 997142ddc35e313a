use anyhow::{Result, anyhow};
use clap::ValueEnum;
use platform_db::DatabaseSettings;

/// Which record store backs the service.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    #[default]
    Database,
    /// Process-local mock store seeded with demo data; nothing persists.
    Memory,
}

impl StoreKind {
    pub fn parse(raw: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(raw.trim(), true)
            .map_err(|_| anyhow!("invalid STORE {raw:?} (use database|memory)"))
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub store: StoreKind,
    pub cors_allowed_origins: Vec<String>,
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the environment; `.env` is loaded by the binary beforehand.
    pub fn load() -> Result<Self> {
        let store = match std::env::var("STORE") {
            Ok(raw) if !raw.trim().is_empty() => StoreKind::parse(&raw)?,
            _ => StoreKind::default(),
        };
        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );
        let otlp_endpoint = std::env::var("OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());

        Ok(Self {
            database: DatabaseSettings::from_env(),
            store,
            cors_allowed_origins,
            otlp_endpoint,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn store_kind_parses_case_insensitively() {
        assert_eq!(StoreKind::parse("Memory").unwrap(), StoreKind::Memory);
        assert_eq!(StoreKind::parse("database").unwrap(), StoreKind::Database);
        assert!(StoreKind::parse("redis").is_err());
    }
}

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use ebbinghaus_algo::sanitize::sanitize_display_days;
use ebbinghaus_algo::{InferencePolicy, ReviewOffsets, MAX_DISPLAY_DAYS};

use crate::db::config::{SqliteConfig, StoreKind};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub store: StoreKind,
    pub sqlite: SqliteConfig,
    /// Offsets applied to plans created without an explicit sequence
    pub review_offsets: ReviewOffsets,
    pub inference_policy: InferencePolicy,
    pub min_display_days: Option<u32>,
    /// Problems found while reading the environment, logged once tracing is up
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut warnings = Vec::new();

        let port = var("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = var("HOST")
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let store = match var("EBBINGHAUS_STORE") {
            Some(value) => StoreKind::parse(&value).unwrap_or_else(|| {
                warnings.push(format!("unknown EBBINGHAUS_STORE={value}, using memory"));
                StoreKind::Memory
            }),
            None => StoreKind::Memory,
        };

        let review_offsets = match var("EBBINGHAUS_REVIEW_OFFSETS") {
            Some(value) => {
                let (offsets, warning) = parse_offsets(&value);
                if let Some(reason) = warning {
                    warnings.push(format!("EBBINGHAUS_REVIEW_OFFSETS ignored: {reason}"));
                }
                offsets
            }
            None => ReviewOffsets::default(),
        };

        let inference_policy = match var("EBBINGHAUS_INFERENCE_POLICY") {
            Some(value) => InferencePolicy::from_str(&value).unwrap_or_else(|| {
                warnings.push(format!(
                    "unknown EBBINGHAUS_INFERENCE_POLICY={value}, using {}",
                    InferencePolicy::default().as_str()
                ));
                InferencePolicy::default()
            }),
            None => InferencePolicy::default(),
        };

        let min_display_days = match var("EBBINGHAUS_MIN_DISPLAY_DAYS") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(days) => {
                    let (days, clamped) = sanitize_display_days(Some(days));
                    if clamped.is_some() {
                        warnings.push(format!(
                            "EBBINGHAUS_MIN_DISPLAY_DAYS={value} capped at {MAX_DISPLAY_DAYS}"
                        ));
                    }
                    days
                }
                Err(err) => {
                    warnings.push(format!("EBBINGHAUS_MIN_DISPLAY_DAYS={value} ignored: {err}"));
                    None
                }
            },
            None => None,
        };

        Self {
            host,
            port,
            log_level,
            store,
            sqlite: SqliteConfig::from_vars(&var),
            review_offsets,
            inference_policy,
            min_display_days,
            warnings,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

/// Parse a comma separated offset list such as `1,2,4,7,15`.
fn parse_offsets(value: &str) -> (ReviewOffsets, Option<String>) {
    let parsed: Result<Vec<i64>, _> = value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse::<i64>)
        .collect();

    match parsed {
        Ok(raw) => match ReviewOffsets::new(&raw) {
            Ok(offsets) => (offsets, None),
            Err(err) => (ReviewOffsets::default(), Some(err.to_string())),
        },
        Err(err) => (ReviewOffsets::default(), Some(err.to_string())),
    }
}

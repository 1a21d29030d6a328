use log::{info, warn};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

use crate::decoding::{ClassifierOptions, DecodeMode, MissingValue};
use crate::error::ConfigError;
use crate::models::TimeRange;
use crate::utils::{format_datetime, parse_datetime};

const DEFAULT_API_URL: &str = "https://api.sofarocean.com/api";
const DEFAULT_CHUNK_SIZE_DAYS: u32 = 5;
const DEFAULT_PAGE_LIMIT: u32 = 500;
const DEFAULT_DAYS_AFTER: u32 = 1;

/// Connection settings for the Sofar API.
#[derive(Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: String,
    pub page_limit: u32,
    pub processing_sources: String,
    pub timeout: Option<Duration>,
}

// The token stays out of logs
impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("page_limit", &self.page_limit)
            .field("processing_sources", &self.processing_sources)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// One spotter and the interval to fetch for it.
#[derive(Debug, Clone)]
pub struct SpotterTarget {
    pub spotter_id: String,
    pub range: TimeRange,
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub api: ApiSettings,
    pub spotters: Vec<SpotterTarget>,
    pub chunk_size_days: u32,
    pub output_dir: PathBuf,
    pub classifier: ClassifierOptions,
}

impl EtlConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process
    /// environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("SOFAR_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("SOFAR_API_TOKEN"))?;

        let api = ApiSettings {
            base_url: lookup("SOFAR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: token.trim().to_string(),
            page_limit: parse_or(&lookup, "PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?,
            processing_sources: lookup("PROCESSING_SOURCES").unwrap_or_else(|| "all".to_string()),
            timeout: lookup("REQUEST_TIMEOUT_SECS")
                .map(|v| parse_value::<u64>("REQUEST_TIMEOUT_SECS", &v))
                .transpose()?
                .map(Duration::from_secs),
        };

        let chunk_size_days = parse_or(&lookup, "CHUNK_SIZE_DAYS", DEFAULT_CHUNK_SIZE_DAYS)?;
        if chunk_size_days == 0 {
            return Err(ConfigError::Invalid {
                name: "CHUNK_SIZE_DAYS",
                value: "0".to_string(),
            });
        }

        let classifier = ClassifierOptions {
            decode_mode: match lookup("DECODE_MODE").as_deref().map(str::trim) {
                None | Some("lossy") => DecodeMode::Lossy,
                Some("printable") => DecodeMode::PrintablePrefix,
                Some(other) => return Err(invalid("DECODE_MODE", other)),
            },
            missing_value: match lookup("MISSING_VALUE").as_deref().map(str::trim) {
                None | Some("absent") => MissingValue::Absent,
                Some("zero") => MissingValue::Zero,
                Some(other) => return Err(invalid("MISSING_VALUE", other)),
            },
            binary_unit_unmanaged: match lookup("BINARY_UNIT_UNMANAGED") {
                None => false,
                Some(v) => parse_bool("BINARY_UNIT_UNMANAGED", &v)?,
            },
        };

        let spotters = load_spotters(&lookup, OffsetDateTime::now_utc())?;

        info!("Total spotters loaded: {}", spotters.len());
        for target in &spotters {
            info!(
                "Spotter: {} from {} to {}",
                target.spotter_id,
                format_datetime(&target.range.start),
                format_datetime(&target.range.end)
            );
        }

        Ok(EtlConfig {
            api,
            spotters,
            chunk_size_days,
            output_dir: PathBuf::from(lookup("OUTPUT_DIR").unwrap_or_else(|| ".".to_string())),
            classifier,
        })
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => parse_value(name, &value),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_instant(
    name: &'static str,
    value: &str,
    now: OffsetDateTime,
) -> Result<OffsetDateTime, ConfigError> {
    if value.trim().eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    parse_datetime(value).ok_or_else(|| invalid(name, value))
}

/// Parse `SPOTTERS` (`ID=START/END,...`), falling back to the single
/// `SPOTTER_ID` / `START_DATE` / `END_DATE` or `DAYS_AFTER` variables.
fn load_spotters<F>(lookup: &F, now: OffsetDateTime) -> Result<Vec<SpotterTarget>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut spotters = Vec::new();

    if let Some(list) = lookup("SPOTTERS") {
        for entry in list.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (spotter_id, window) = entry
                .split_once('=')
                .ok_or_else(|| invalid("SPOTTERS", entry))?;
            let (start, end) = window
                .split_once('/')
                .ok_or_else(|| invalid("SPOTTERS", entry))?;

            let spotter_id = spotter_id.trim();
            if spotter_id.is_empty() {
                warn!("Ignoring SPOTTERS entry without an id: '{}'", entry);
                continue;
            }

            spotters.push(SpotterTarget {
                spotter_id: spotter_id.to_string(),
                range: TimeRange::new(
                    parse_instant("SPOTTERS", start, now)?,
                    parse_instant("SPOTTERS", end, now)?,
                )?,
            });
        }
    } else if let Some(spotter_id) = lookup("SPOTTER_ID") {
        let start_value = lookup("START_DATE").ok_or(ConfigError::Missing("START_DATE"))?;
        let start = parse_instant("START_DATE", &start_value, now)?;

        let end = match lookup("END_DATE") {
            Some(end_value) => parse_instant("END_DATE", &end_value, now)?,
            None => {
                let days: u32 = parse_or(lookup, "DAYS_AFTER", DEFAULT_DAYS_AFTER)?;
                start
                    .checked_add(time::Duration::days(i64::from(days)))
                    .ok_or_else(|| invalid("DAYS_AFTER", &days.to_string()))?
            }
        };

        spotters.push(SpotterTarget {
            spotter_id: spotter_id.trim().to_string(),
            range: TimeRange::new(start, end)?,
        });
    }

    if spotters.is_empty() {
        return Err(ConfigError::NoSpotters);
    }

    Ok(spotters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use time::macros::datetime;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_single_spotter_with_days_after() {
        let config = EtlConfig::from_lookup(lookup_from(&[
            ("SOFAR_API_TOKEN", "abc123"),
            ("SPOTTER_ID", "SPOT-31088C"),
            ("START_DATE", "2024-11-24T00:00:00Z"),
            ("DAYS_AFTER", "3"),
        ]))
        .unwrap();

        assert_eq!(config.spotters.len(), 1);
        assert_eq!(config.spotters[0].spotter_id, "SPOT-31088C");
        assert_eq!(config.spotters[0].range.end, datetime!(2024-11-27 00:00 UTC));
        assert_eq!(config.chunk_size_days, 5);
        assert_eq!(config.api.page_limit, 500);
        assert_eq!(config.api.base_url, "https://api.sofarocean.com/api");
        assert_eq!(config.api.timeout, None);
        assert_eq!(config.classifier, ClassifierOptions::default());
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_spotter_list_and_options() {
        let config = EtlConfig::from_lookup(lookup_from(&[
            ("SOFAR_API_TOKEN", "abc123"),
            (
                "SPOTTERS",
                "SPOT-31088C=2025-01-28/2025-02-03, SPOT-30022R=2024-08-20T00:00:00Z/2024-11-20T00:00:00Z",
            ),
            ("CHUNK_SIZE_DAYS", "2"),
            ("REQUEST_TIMEOUT_SECS", "30"),
            ("DECODE_MODE", "printable"),
            ("MISSING_VALUE", "zero"),
            ("BINARY_UNIT_UNMANAGED", "true"),
            ("OUTPUT_DIR", "/tmp/spotter"),
        ]))
        .unwrap();

        let ids: Vec<&str> = config.spotters.iter().map(|s| s.spotter_id.as_str()).collect();
        assert_eq!(ids, vec!["SPOT-31088C", "SPOT-30022R"]);
        assert_eq!(config.spotters[0].range.start, datetime!(2025-01-28 00:00 UTC));
        assert_eq!(config.chunk_size_days, 2);
        assert_eq!(config.api.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.classifier.decode_mode, DecodeMode::PrintablePrefix);
        assert_eq!(config.classifier.missing_value, MissingValue::Zero);
        assert!(config.classifier.binary_unit_unmanaged);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/spotter"));
    }

    #[test]
    fn test_missing_token() {
        let result = EtlConfig::from_lookup(lookup_from(&[("SPOTTER_ID", "SPOT-1")]));
        assert!(matches!(result, Err(ConfigError::Missing("SOFAR_API_TOKEN"))));
    }

    #[test]
    fn test_no_spotters() {
        let result = EtlConfig::from_lookup(lookup_from(&[("SOFAR_API_TOKEN", "abc")]));
        assert!(matches!(result, Err(ConfigError::NoSpotters)));
    }

    #[test]
    fn test_invalid_values() {
        let base = [
            ("SOFAR_API_TOKEN", "abc"),
            ("SPOTTER_ID", "SPOT-1"),
            ("START_DATE", "2024-11-24"),
        ];

        let mut zero_chunk = base.to_vec();
        zero_chunk.push(("CHUNK_SIZE_DAYS", "0"));
        assert!(matches!(
            EtlConfig::from_lookup(lookup_from(&zero_chunk)),
            Err(ConfigError::Invalid { name: "CHUNK_SIZE_DAYS", .. })
        ));

        let mut bad_mode = base.to_vec();
        bad_mode.push(("DECODE_MODE", "strict"));
        assert!(matches!(
            EtlConfig::from_lookup(lookup_from(&bad_mode)),
            Err(ConfigError::Invalid { name: "DECODE_MODE", .. })
        ));

        let mut inverted = base.to_vec();
        inverted.push(("END_DATE", "2024-11-01"));
        assert!(matches!(
            EtlConfig::from_lookup(lookup_from(&inverted)),
            Err(ConfigError::EmptyRange { .. })
        ));

        let mut far_future = base.to_vec();
        far_future.push(("DAYS_AFTER", "4000000"));
        assert!(matches!(
            EtlConfig::from_lookup(lookup_from(&far_future)),
            Err(ConfigError::Invalid { name: "DAYS_AFTER", .. })
        ));

        let mut huge_chunk = base.to_vec();
        huge_chunk.push(("CHUNK_SIZE_DAYS", "4000000"));
        assert_eq!(
            EtlConfig::from_lookup(lookup_from(&huge_chunk))
                .unwrap()
                .chunk_size_days,
            4_000_000
        );

        let malformed = [("SOFAR_API_TOKEN", "abc"), ("SPOTTERS", "SPOT-1:2024-11-24")];
        assert!(matches!(
            EtlConfig::from_lookup(lookup_from(&malformed)),
            Err(ConfigError::Invalid { name: "SPOTTERS", .. })
        ));
    }

    #[test]
    fn test_end_now() {
        let now = datetime!(2025-02-01 12:00 UTC);
        let spotters = load_spotters(
            &lookup_from(&[("SPOTTERS", "SPOT-31088C=2025-01-28/now")]),
            now,
        )
        .unwrap();
        assert_eq!(spotters[0].range.end, now);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = EtlConfig::from_lookup(lookup_from(&[
            ("SOFAR_API_TOKEN", "super-secret"),
            ("SPOTTER_ID", "SPOT-1"),
            ("START_DATE", "2024-11-24"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}

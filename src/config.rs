//! Application-level configuration loading: club branding, leaderboard size and evidence policy.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use time::{UtcOffset, format_description::FormatItem, macros::format_description};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FPV_LEADERBOARD_CONFIG_PATH";
const DEFAULT_CLUB_NAME: &str = "Aeroquantum-15";
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
/// Largest leaderboard a client may ask for.
pub const MAX_LEADERBOARD_LIMIT: usize = 50;
const DEFAULT_EVIDENCE_DIR: &str = "evidence";
/// `+03:00`, `+05:30`
const UTC_OFFSET_FORMAT: &[FormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// What happens to the image sent along with a time that did not beat the stored best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedEvidencePolicy {
    /// Delete the image; nothing references it.
    #[default]
    Discard,
    /// Leave the image on disk for manual review.
    Keep,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    club_name: String,
    leaderboard_limit: usize,
    evidence_dir: PathBuf,
    rejected_evidence: RejectedEvidencePolicy,
    utc_offset: Option<UtcOffset>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    ///
    /// Without a configured `utc_offset` the host's local offset is detected, which only
    /// succeeds while the process is still single-threaded: call this before starting the
    /// async runtime.
    pub fn load() -> Self {
        let config = Self::read_file();
        if config.utc_offset.is_some() {
            return config;
        }
        match UtcOffset::current_local_offset() {
            Ok(offset) => config.with_utc_offset(offset),
            Err(err) => {
                warn!(error = %err, "cannot detect local UTC offset; leaderboard times use UTC");
                config
            }
        }
    }

    fn read_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        club = %app_config.club_name,
                        limit = app_config.leaderboard_limit,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Club name printed in leaderboard headers.
    pub fn club_name(&self) -> &str {
        &self.club_name
    }

    /// Number of ranks a leaderboard shows when the client does not ask otherwise.
    pub fn leaderboard_limit(&self) -> usize {
        self.leaderboard_limit
    }

    /// Root directory holding evidence images.
    pub fn evidence_dir(&self) -> &PathBuf {
        &self.evidence_dir
    }

    /// Policy applied to the evidence of a submission that did not beat the stored best.
    pub fn rejected_evidence(&self) -> RejectedEvidencePolicy {
        self.rejected_evidence
    }

    /// Offset of the club's wall clock, used for leaderboard timestamps. UTC when unknown.
    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset.unwrap_or(UtcOffset::UTC)
    }

    /// Same configuration with a fixed wall-clock offset.
    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    /// Same configuration with a different rejected-evidence policy.
    pub fn with_rejected_evidence(mut self, policy: RejectedEvidencePolicy) -> Self {
        self.rejected_evidence = policy;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            club_name: DEFAULT_CLUB_NAME.to_owned(),
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            evidence_dir: PathBuf::from(DEFAULT_EVIDENCE_DIR),
            rejected_evidence: RejectedEvidencePolicy::default(),
            utc_offset: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every field is optional.
struct RawConfig {
    club_name: Option<String>,
    leaderboard_limit: Option<usize>,
    evidence_dir: Option<PathBuf>,
    rejected_evidence: Option<RejectedEvidencePolicy>,
    /// Wall-clock offset such as `"+03:00"`.
    utc_offset: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let leaderboard_limit = match raw.leaderboard_limit {
            Some(limit) if (1..=MAX_LEADERBOARD_LIMIT).contains(&limit) => limit,
            Some(limit) => {
                warn!(
                    limit,
                    max = MAX_LEADERBOARD_LIMIT,
                    "configured leaderboard limit out of range; using default"
                );
                defaults.leaderboard_limit
            }
            None => defaults.leaderboard_limit,
        };

        let utc_offset = raw.utc_offset.and_then(|text| {
            UtcOffset::parse(text.trim(), UTC_OFFSET_FORMAT)
                .inspect_err(|err| {
                    warn!(offset = %text, error = %err, "invalid utc_offset; detecting local offset");
                })
                .ok()
        });

        Self {
            club_name: raw
                .club_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.club_name),
            leaderboard_limit,
            evidence_dir: raw.evidence_dir.unwrap_or(defaults.evidence_dir),
            rejected_evidence: raw.rejected_evidence.unwrap_or(defaults.rejected_evidence),
            utc_offset,
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"club_name": "Skyhawks", "rejected_evidence": "keep"}"#)
                .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.club_name(), "Skyhawks");
        assert_eq!(config.leaderboard_limit(), DEFAULT_LEADERBOARD_LIMIT);
        assert_eq!(config.rejected_evidence(), RejectedEvidencePolicy::Keep);
        assert_eq!(config.evidence_dir(), &PathBuf::from(DEFAULT_EVIDENCE_DIR));
    }

    #[test]
    fn out_of_range_limit_falls_back_to_default() {
        let raw: RawConfig = serde_json::from_str(r#"{"leaderboard_limit": 0}"#).unwrap();
        assert_eq!(
            AppConfig::from(raw).leaderboard_limit(),
            DEFAULT_LEADERBOARD_LIMIT
        );
    }

    #[test]
    fn utc_offset_is_parsed_from_the_file() {
        let raw: RawConfig = serde_json::from_str(r#"{"utc_offset": "+03:00"}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.utc_offset(), UtcOffset::from_hms(3, 0, 0).unwrap());

        let raw: RawConfig = serde_json::from_str(r#"{"utc_offset": "+05:30"}"#).unwrap();
        assert_eq!(
            AppConfig::from(raw).utc_offset(),
            UtcOffset::from_hms(5, 30, 0).unwrap()
        );
    }

    #[test]
    fn malformed_utc_offset_is_ignored() {
        let raw: RawConfig = serde_json::from_str(r#"{"utc_offset": "Moscow"}"#).unwrap();
        assert_eq!(AppConfig::from(raw).utc_offset(), UtcOffset::UTC);
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        assert!(serde_json::from_str::<RawConfig>(r#"{"rejected_evidence": "archive"}"#).is_err());
    }
}

use crate::components::executor::ExecutorConfig;
use crate::components::normalizer::NormalizerConfig;
use crate::error::{config_error, SyncResult};
use crate::utils::retry::RetryConfig;
use crate::utils::time::parse_timezone;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_INPUT_FILE: &str = "calendar.mhtml";
pub const DEFAULT_OUTPUT_FILE: &str = "outlook_calendar.ics";
pub const DEFAULT_EMAIL_DOMAIN: &str = "domain.com";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
/// Optional tuning file, relative to the working directory
pub const SYNC_SETTINGS_FILE: &str = "config/sync.toml";

/// Google Calendar endpoints and HTTP settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub api_base: String,
    pub token_url: String,
    pub request_timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/calendar/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Contents of `config/sync.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub sync: ExecutorConfig,
    pub retry: RetryConfig,
    pub google: GoogleSettings,
}

impl SyncSettings {
    /// Read the settings file; a missing file yields defaults
    pub fn load(path: &Path) -> SyncResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loading sync settings from {}", path.display());
                toml::from_str(&content)
                    .map_err(|e| config_error(&format!("Invalid {}: {}", path.display(), e)))
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Saved Outlook page (HTML or MHTML)
    pub input_file: PathBuf,
    /// ICS file written when not syncing to Google
    pub output_file: PathBuf,
    /// Domain used to synthesize organizer addresses
    pub email_domain: String,
    /// IANA zone the export's wall-clock times are in
    pub timezone: String,
    /// Meeting link appended to every event description
    pub meeting_link: Option<String>,
    /// Google Calendar ID to write to
    pub google_calendar_id: Option<String>,
    /// Name of a separate calendar to find or create
    pub google_calendar_name: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    /// OAuth token written by `get_calendar_token`
    pub token_file: PathBuf,
    pub settings: SyncSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from(DEFAULT_INPUT_FILE),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            meeting_link: None,
            google_calendar_id: None,
            google_calendar_name: None,
            google_client_id: None,
            google_client_secret: None,
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            settings: SyncSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the environment and `config/sync.toml`
    pub fn load() -> SyncResult<Self> {
        // Load .env file if it exists
        dotenv().ok();
        Self::from_env(Path::new(SYNC_SETTINGS_FILE))
    }

    /// Build from the current environment and the given settings file
    pub fn from_env(settings_path: &Path) -> SyncResult<Self> {
        let defaults = Self::default();

        Ok(Config {
            input_file: env_var("OUTLOOK_INPUT_FILE").map(PathBuf::from).unwrap_or(defaults.input_file),
            output_file: env_var("OUTLOOK_OUTPUT_FILE").map(PathBuf::from).unwrap_or(defaults.output_file),
            email_domain: env_var("OUTLOOK_EMAIL_DOMAIN").unwrap_or(defaults.email_domain),
            timezone: env_var("OUTLOOK_TIMEZONE").unwrap_or(defaults.timezone),
            meeting_link: env_var("TEAMS_MEETING_LINK"),
            google_calendar_id: env_var("GOOGLE_CALENDAR_ID"),
            google_calendar_name: env_var("GOOGLE_CALENDAR_NAME"),
            google_client_id: env_var("GOOGLE_CLIENT_ID"),
            google_client_secret: env_var("GOOGLE_CLIENT_SECRET"),
            token_file: env_var("GOOGLE_TOKEN_FILE").map(PathBuf::from).unwrap_or(defaults.token_file),
            settings: SyncSettings::load(settings_path)?,
        })
    }

    /// Normalizer settings; fails on an unknown time zone
    pub fn normalizer_config(&self) -> SyncResult<NormalizerConfig> {
        let timezone = parse_timezone(&self.timezone)
            .ok_or_else(|| config_error(&format!("Unknown time zone '{}'", self.timezone)))?;
        let domain = self.email_domain.trim();
        if domain.is_empty() {
            return Err(config_error("Email domain must not be empty"));
        }

        Ok(NormalizerConfig {
            email_domain: domain.to_string(),
            timezone,
            meeting_link: self.meeting_link.clone().filter(|l| !l.trim().is_empty()),
        })
    }

    /// Executor settings with the retry table folded in
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            retry: self.settings.retry.clone(),
            ..self.settings.sync.clone()
        }
    }
}

/// Non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_settings_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sync]\nconcurrency = 8\n\n[retry]\nmax_attempts = 2\ninitial_delay_ms = 10\n\n[google]\napi_base = \"http://localhost:9999\""
        )
        .unwrap();

        let settings = SyncSettings::load(file.path()).unwrap();
        assert_eq!(settings.sync.concurrency, 8);
        assert_eq!(settings.sync.progress_interval, 10);
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.multiplier, 2.0);
        assert_eq!(settings.google.api_base, "http://localhost:9999");
        assert_eq!(settings.google.token_url, GoogleSettings::default().token_url);
    }

    #[test]
    fn test_missing_settings_file_is_default() {
        let settings = SyncSettings::load(Path::new("/nonexistent/sync.toml")).unwrap();
        assert_eq!(settings, SyncSettings::default());
    }

    #[test]
    fn test_invalid_settings_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\nconcurrency = \"lots\"").unwrap();
        assert!(SyncSettings::load(file.path()).is_err());
    }

    #[test]
    fn test_normalizer_config_validates_timezone() {
        let mut config = Config::default();
        assert!(config.normalizer_config().is_ok());

        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.normalizer_config().is_err());
    }

    #[test]
    fn test_executor_config_carries_retry() {
        let mut config = Config::default();
        config.settings.retry.max_attempts = 7;
        config.settings.sync.concurrency = 3;
        let executor = config.executor_config();
        assert_eq!(executor.retry.max_attempts, 7);
        assert_eq!(executor.concurrency, 3);
    }
}

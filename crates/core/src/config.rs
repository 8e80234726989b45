use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use chrono_tz::Tz;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::classify::{Bucket, GroupConfig, UnmatchedPolicy};

/// Fully merged and validated configuration: defaults, then the TOML file,
/// then `SHOWTALLY_*` environment overrides, then programmatic overrides.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub timezone: Tz,
    pub snapshot_dir: PathBuf,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub plankton: Option<PlanktonConfig>,
    pub quicket: Option<QuicketConfig>,
    pub shopify: Option<ShopifyConfig>,
    pub email: Option<EmailConfig>,
    pub events: Vec<EventConfig>,
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub retries: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct PlanktonConfig {
    pub base_url: String,
    pub auth: SecretString,
    pub cookie: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QuicketConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub user_token: SecretString,
    pub page_size: u32,
}

#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    pub base_url: String,
    pub access_token: SecretString,
    pub currency: String,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub to: Vec<String>,
    pub subject_prefix: String,
}

/// One tracked event: which vendor serves it, how its ticket types group
/// into buckets, and the reporting metadata. Immutable once loaded; the
/// pipeline consumes these by reference.
#[derive(Clone, Debug)]
pub struct EventConfig {
    pub source: EventSource,
    pub id: String,
    pub name: String,
    pub capacity: u64,
    pub groups: GroupConfig,
    /// Manual override; when absent the vendor's own event date is probed.
    pub event_date: Option<NaiveDate>,
}

impl EventConfig {
    /// Stable snapshot-store key. Plankton GUIDs are globally unique and
    /// keep their historical un-namespaced form; Quicket's numeric ids get
    /// a `quicket:` namespace.
    pub fn snapshot_key(&self) -> String {
        match self.source {
            EventSource::Plankton => self.id.clone(),
            EventSource::Quicket => format!("quicket:{}", self.id),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Plankton,
    Quicket,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub timezone: Option<String>,
    pub snapshot_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Africa::Johannesburg,
            snapshot_dir: PathBuf::from("data/snapshots"),
            http: HttpConfig { connect_timeout_secs: 5, read_timeout_secs: 15, retries: 2 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            plankton: None,
            quicket: None,
            shopify: None,
            email: None,
            events: Vec::new(),
        }
    }
}

const DEFAULT_PLANKTON_BASE: &str = "https://plankton.mobi";
const DEFAULT_QUICKET_BASE: &str = "https://api.quicket.co.za";
const DEFAULT_QUICKET_PAGE_SIZE: u32 = 500;

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("showtally.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides)?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(timezone) = patch.timezone {
            self.timezone = parse_timezone(&timezone)?;
        }
        if let Some(dir) = patch.snapshot_dir {
            self.snapshot_dir = dir;
        }

        if let Some(http) = patch.http {
            if let Some(connect) = http.connect_timeout_secs {
                self.http.connect_timeout_secs = connect;
            }
            if let Some(read) = http.read_timeout_secs {
                self.http.read_timeout_secs = read;
            }
            if let Some(retries) = http.retries {
                self.http.retries = retries;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(plankton) = patch.plankton {
            let section = self.plankton.get_or_insert_with(default_plankton);
            if let Some(base_url) = plankton.base_url {
                section.base_url = base_url;
            }
            if let Some(auth) = plankton.auth {
                section.auth = auth.into();
            }
            if let Some(cookie) = plankton.cookie {
                section.cookie = Some(cookie);
            }
        }

        if let Some(quicket) = patch.quicket {
            let section = self.quicket.get_or_insert_with(default_quicket);
            if let Some(base_url) = quicket.base_url {
                section.base_url = base_url;
            }
            if let Some(api_key) = quicket.api_key {
                section.api_key = api_key.into();
            }
            if let Some(user_token) = quicket.user_token {
                section.user_token = user_token.into();
            }
            if let Some(page_size) = quicket.page_size {
                section.page_size = page_size;
            }
        }

        if let Some(shopify) = patch.shopify {
            let section = self.shopify.get_or_insert_with(default_shopify);
            if let Some(base_url) = shopify.base_url {
                section.base_url = base_url;
            }
            if let Some(access_token) = shopify.access_token {
                section.access_token = access_token.into();
            }
            if let Some(currency) = shopify.currency {
                section.currency = currency;
            }
        }

        if let Some(email) = patch.email {
            let section = self.email.get_or_insert_with(default_email);
            if let Some(host) = email.host {
                section.host = host;
            }
            if let Some(port) = email.port {
                section.port = port;
            }
            if let Some(user) = email.user {
                section.user = user;
            }
            if let Some(password) = email.password {
                section.password = password.into();
            }
            if let Some(to) = email.to {
                section.to = to;
            }
            if let Some(subject_prefix) = email.subject_prefix {
                section.subject_prefix = subject_prefix;
            }
        }

        for entry in patch.events {
            let event = entry.into_event()?;
            self.events.push(event);
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOWTALLY_TIMEZONE") {
            self.timezone = parse_timezone(&value)?;
        }
        if let Some(value) = read_env("SHOWTALLY_SNAPSHOT_DIR") {
            self.snapshot_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("SHOWTALLY_HTTP_RETRIES") {
            self.http.retries = parse_u32("SHOWTALLY_HTTP_RETRIES", &value)?;
        }
        if let Some(value) = read_env("SHOWTALLY_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("SHOWTALLY_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("SHOWTALLY_PLANKTON_AUTH") {
            self.plankton.get_or_insert_with(default_plankton).auth = value.into();
        }
        if let Some(value) = read_env("SHOWTALLY_PLANKTON_COOKIE") {
            self.plankton.get_or_insert_with(default_plankton).cookie = Some(value);
        }

        if let Some(value) = read_env("SHOWTALLY_QUICKET_API_KEY") {
            self.quicket.get_or_insert_with(default_quicket).api_key = value.into();
        }
        if let Some(value) = read_env("SHOWTALLY_QUICKET_USER_TOKEN") {
            self.quicket.get_or_insert_with(default_quicket).user_token = value.into();
        }

        if let Some(value) = read_env("SHOWTALLY_SHOPIFY_BASE_URL") {
            self.shopify.get_or_insert_with(default_shopify).base_url = value;
        }
        if let Some(value) = read_env("SHOWTALLY_SHOPIFY_ACCESS_TOKEN") {
            self.shopify.get_or_insert_with(default_shopify).access_token = value.into();
        }

        if let Some(value) = read_env("SHOWTALLY_EMAIL_HOST") {
            self.email.get_or_insert_with(default_email).host = value;
        }
        if let Some(value) = read_env("SHOWTALLY_EMAIL_PORT") {
            self.email.get_or_insert_with(default_email).port =
                parse_u16("SHOWTALLY_EMAIL_PORT", &value)?;
        }
        if let Some(value) = read_env("SHOWTALLY_EMAIL_USER") {
            self.email.get_or_insert_with(default_email).user = value;
        }
        if let Some(value) = read_env("SHOWTALLY_EMAIL_PASSWORD") {
            self.email.get_or_insert_with(default_email).password = value.into();
        }
        if let Some(value) = read_env("SHOWTALLY_EMAIL_TO") {
            self.email.get_or_insert_with(default_email).to = value
                .split(',')
                .map(str::trim)
                .filter(|recipient| !recipient.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(timezone) = overrides.timezone {
            self.timezone = parse_timezone(&timezone)?;
        }
        if let Some(dir) = overrides.snapshot_dir {
            self.snapshot_dir = dir;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(plankton) = &self.plankton {
            require_secret(&plankton.auth, "plankton.auth", "SHOWTALLY_PLANKTON_AUTH")?;
        }
        if let Some(quicket) = &self.quicket {
            require_secret(&quicket.api_key, "quicket.api_key", "SHOWTALLY_QUICKET_API_KEY")?;
            require_secret(
                &quicket.user_token,
                "quicket.user_token",
                "SHOWTALLY_QUICKET_USER_TOKEN",
            )?;
            if quicket.page_size == 0 {
                return Err(ConfigError::Validation(
                    "quicket.page_size must be at least 1".to_string(),
                ));
            }
        }
        if let Some(shopify) = &self.shopify {
            if shopify.base_url.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "shopify.base_url is required (or set SHOWTALLY_SHOPIFY_BASE_URL)".to_string(),
                ));
            }
            require_secret(
                &shopify.access_token,
                "shopify.access_token",
                "SHOWTALLY_SHOPIFY_ACCESS_TOKEN",
            )?;
        }
        if let Some(email) = &self.email {
            if email.user.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "email.user is required (or set SHOWTALLY_EMAIL_USER)".to_string(),
                ));
            }
            require_secret(&email.password, "email.password", "SHOWTALLY_EMAIL_PASSWORD")?;
            if email.to.is_empty() {
                return Err(ConfigError::Validation(
                    "email.to must list at least one recipient (or set SHOWTALLY_EMAIL_TO)"
                        .to_string(),
                ));
            }
        }

        for event in &self.events {
            let present = match event.source {
                EventSource::Plankton => self.plankton.is_some(),
                EventSource::Quicket => self.quicket.is_some(),
            };
            if !present {
                let (section, var) = match event.source {
                    EventSource::Plankton => ("plankton.auth", "SHOWTALLY_PLANKTON_AUTH"),
                    EventSource::Quicket => ("quicket.api_key", "SHOWTALLY_QUICKET_API_KEY"),
                };
                return Err(ConfigError::Validation(format!(
                    "event `{}` needs credentials: set {section} (or {var})",
                    event.name
                )));
            }
        }

        Ok(())
    }
}

fn default_plankton() -> PlanktonConfig {
    PlanktonConfig {
        base_url: DEFAULT_PLANKTON_BASE.to_string(),
        auth: String::new().into(),
        cookie: None,
    }
}

fn default_quicket() -> QuicketConfig {
    QuicketConfig {
        base_url: DEFAULT_QUICKET_BASE.to_string(),
        api_key: String::new().into(),
        user_token: String::new().into(),
        page_size: DEFAULT_QUICKET_PAGE_SIZE,
    }
}

fn default_shopify() -> ShopifyConfig {
    ShopifyConfig {
        base_url: String::new(),
        access_token: String::new().into(),
        currency: "R".to_string(),
    }
}

fn default_email() -> EmailConfig {
    EmailConfig {
        host: "smtp.gmail.com".to_string(),
        port: 465,
        user: String::new(),
        password: String::new().into(),
        to: Vec::new(),
        subject_prefix: "Daily sales summary".to_string(),
    }
}

fn require_secret(secret: &SecretString, key: &str, var: &str) -> Result<(), ConfigError> {
    use secrecy::ExposeSecret;
    if secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(format!("{key} is required (or set {var})")));
    }
    Ok(())
}

fn parse_timezone(value: &str) -> Result<Tz, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::Validation(format!("unknown timezone `{value}` (expected an IANA name)"))
    })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        return None;
    }
    let default = PathBuf::from("showtally.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    timezone: Option<String>,
    snapshot_dir: Option<PathBuf>,
    http: Option<HttpPatch>,
    logging: Option<LoggingPatch>,
    plankton: Option<PlanktonPatch>,
    quicket: Option<QuicketPatch>,
    shopify: Option<ShopifyPatch>,
    email: Option<EmailPatch>,
    #[serde(default, rename = "event")]
    events: Vec<EventEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpPatch {
    connect_timeout_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
    retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanktonPatch {
    base_url: Option<String>,
    auth: Option<String>,
    cookie: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuicketPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    user_token: Option<String>,
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShopifyPatch {
    base_url: Option<String>,
    access_token: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmailPatch {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    to: Option<Vec<String>>,
    subject_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventEntry {
    source: EventSource,
    id: String,
    name: String,
    #[serde(default)]
    capacity: u64,
    #[serde(default, rename = "group")]
    groups: Vec<GroupEntry>,
    #[serde(default)]
    exclude: Vec<String>,
    unmatched: Option<UnmatchedPolicy>,
    event_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupEntry {
    name: String,
    members: Vec<String>,
}

impl EventEntry {
    fn into_event(self) -> Result<EventConfig, ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Validation(format!("event `{}` has an empty id", self.name)));
        }
        if self.groups.is_empty() {
            return Err(ConfigError::Validation(format!(
                "event `{}` declares no ticket groups",
                self.name
            )));
        }

        let buckets: Vec<Bucket> = self
            .groups
            .into_iter()
            .map(|group| Bucket { name: group.name, members: group.members })
            .collect();

        // Defaults mirror the two vendor shapes: guest-list counting folds
        // unknown types into the first bucket, summary counting ignores them.
        let unmatched = self.unmatched.unwrap_or_else(|| match self.source {
            EventSource::Plankton => UnmatchedPolicy::Drop,
            EventSource::Quicket => UnmatchedPolicy::AssignTo(buckets[0].name.clone()),
        });

        if let UnmatchedPolicy::AssignTo(target) = &unmatched {
            let known = buckets
                .iter()
                .any(|bucket| bucket.name.trim().eq_ignore_ascii_case(target.trim()));
            if !known {
                return Err(ConfigError::Validation(format!(
                    "event `{}`: unmatched.assign-to names unknown bucket `{target}`",
                    self.name
                )));
            }
        }

        let event_date = match self.event_date {
            Some(raw) => Some(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                ConfigError::Validation(format!(
                    "event `{}`: event_date `{raw}` is not YYYY-MM-DD",
                    self.name
                ))
            })?),
            None => None,
        };

        Ok(EventConfig {
            source: self.source,
            id: self.id,
            name: self.name,
            capacity: self.capacity,
            groups: GroupConfig::new(buckets, self.exclude, unmatched),
            event_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    use tempfile::NamedTempFile;

    use super::*;
    use crate::classify::UnmatchedPolicy;

    // Process env is global state: every load must be serialized against
    // the tests that set SHOWTALLY_* variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load_toml(body: &str) -> Result<AppConfig, ConfigError> {
        let _guard = env_guard();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            ..LoadOptions::default()
        })
    }

    const FULL: &str = r#"
timezone = "Africa/Johannesburg"
snapshot_dir = "/tmp/showtally-test-snapshots"

[plankton]
auth = "token-123"

[quicket]
api_key = "key-123"
user_token = "tok-456"

[email]
user = "reports@example.test"
password = "hunter2"
to = ["a@example.test", "b@example.test"]

[[event]]
source = "plankton"
id = "5aa195ca-dd0f-4e35-b4e6-acb06cbefd83"
name = "Loftus Park"
capacity = 2000

[[event.group]]
name = "GA (Adults)"
members = ["Early Bird", "Phase 1", "Phase 2"]

[[event.group]]
name = "Kids"
members = ["Kids Under 12"]

[[event]]
source = "quicket"
id = "349783"
name = "Snowflake Potch"
capacity = 2000
exclude = ["Honorary", "Complimentary"]
event_date = "2026-02-21"

[[event.group]]
name = "Adults"
members = ["Early Bird", "Fase Een"]

[[event.group]]
name = "Kids"
members = ["Kids Under 13"]
"#;

    #[test]
    fn loads_a_full_config_file() {
        let config = load_toml(FULL).unwrap();
        assert_eq!(config.timezone, chrono_tz::Africa::Johannesburg);
        assert_eq!(config.events.len(), 2);

        let loftus = &config.events[0];
        assert_eq!(loftus.snapshot_key(), "5aa195ca-dd0f-4e35-b4e6-acb06cbefd83");
        assert_eq!(loftus.groups.unmatched, UnmatchedPolicy::Drop);

        let snowflake = &config.events[1];
        assert_eq!(snowflake.snapshot_key(), "quicket:349783");
        assert_eq!(snowflake.groups.unmatched, UnmatchedPolicy::AssignTo("Adults".to_string()));
        assert_eq!(snowflake.event_date, NaiveDate::from_ymd_opt(2026, 2, 21));
        assert_eq!(snowflake.groups.exclude, vec!["Honorary", "Complimentary"]);
    }

    #[test]
    fn event_without_credentials_names_the_missing_key() {
        let body = r#"
[[event]]
source = "quicket"
id = "1"
name = "Orphan"

[[event.group]]
name = "Adults"
members = ["GA"]
"#;
        let error = load_toml(body).unwrap_err().to_string();
        assert!(error.contains("quicket.api_key"), "got: {error}");
        assert!(error.contains("SHOWTALLY_QUICKET_API_KEY"), "got: {error}");
    }

    #[test]
    fn blank_credential_fails_validation() {
        let body = r#"
[plankton]
auth = "  "
"#;
        let error = load_toml(body).unwrap_err().to_string();
        assert!(error.contains("plankton.auth"), "got: {error}");
    }

    #[test]
    fn assign_to_must_name_a_declared_bucket() {
        let body = r#"
[quicket]
api_key = "k"
user_token = "t"

[[event]]
source = "quicket"
id = "9"
name = "Bad Policy"
unmatched = { assign-to = "VIP" }

[[event.group]]
name = "Adults"
members = ["GA"]
"#;
        let error = load_toml(body).unwrap_err().to_string();
        assert!(error.contains("unknown bucket `VIP`"), "got: {error}");
    }

    #[test]
    fn email_requires_recipients() {
        let body = r#"
[email]
user = "reports@example.test"
password = "hunter2"
to = []
"#;
        let error = load_toml(body).unwrap_err().to_string();
        assert!(error.contains("email.to"), "got: {error}");
    }

    #[test]
    fn bad_timezone_is_rejected() {
        let error = load_toml("timezone = \"Mars/Olympus\"").unwrap_err().to_string();
        assert!(error.contains("unknown timezone"), "got: {error}");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _guard = env_guard();
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/showtally.toml")),
            require_file: true,
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn env_overrides_beat_the_file_and_split_recipients() {
        let _guard = env_guard();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        env::set_var("SHOWTALLY_SNAPSHOT_DIR", "/tmp/from-env");
        env::set_var("SHOWTALLY_EMAIL_TO", "a@example.test, b@example.test,,");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            ..LoadOptions::default()
        });
        env::remove_var("SHOWTALLY_SNAPSHOT_DIR");
        env::remove_var("SHOWTALLY_EMAIL_TO");

        let config = result.unwrap();
        assert_eq!(config.snapshot_dir, PathBuf::from("/tmp/from-env"));
        let email = config.email.unwrap();
        assert_eq!(email.to, vec!["a@example.test", "b@example.test"]);
    }

    #[test]
    fn env_credentials_stand_in_for_a_config_section() {
        let _guard = env_guard();
        env::set_var("SHOWTALLY_PLANKTON_AUTH", "env-token");
        let result = AppConfig::load(LoadOptions::default());
        env::remove_var("SHOWTALLY_PLANKTON_AUTH");

        let config = result.unwrap();
        let plankton = config.plankton.unwrap();
        assert_eq!(plankton.base_url, DEFAULT_PLANKTON_BASE);
        {
            use secrecy::ExposeSecret;
            assert_eq!(plankton.auth.expose_secret(), "env-token");
        }
    }

    #[test]
    fn invalid_env_number_names_the_variable() {
        let _guard = env_guard();
        env::set_var("SHOWTALLY_HTTP_RETRIES", "many");
        let result = AppConfig::load(LoadOptions::default());
        env::remove_var("SHOWTALLY_HTTP_RETRIES");

        let error = result.unwrap_err().to_string();
        assert!(error.contains("SHOWTALLY_HTTP_RETRIES"), "got: {error}");
        assert!(error.contains("many"), "got: {error}");
    }

    #[test]
    fn programmatic_overrides_win() {
        let _guard = env_guard();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides {
                timezone: Some("Europe/London".to_string()),
                snapshot_dir: Some(PathBuf::from("/tmp/elsewhere")),
                log_level: Some("debug".to_string()),
            },
        })
        .unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::London);
        assert_eq!(config.snapshot_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.logging.level, "debug");
    }
}

//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{
    CliArgs, Command, GlobalOverrides, PrerenderArgs, ReadArgs, RouteArgs, WatchArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const ENV_PREFIX: &str = "FOLIO";
const DEFAULT_API_URL: &str = "http://127.0.0.1:2333/api/v2";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ENTRY_LIMIT: u64 = 500;
const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub gateway: GatewaySettings,
    pub cache: CacheSettings,
    pub session: SessionSettings,
    pub watch: WatchSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub entry_limit: NonZeroUsize,
    pub ttl: Duration,
    pub liked_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_global_overrides(&cli.overrides);
    if let Command::Watch(args) = &cli.command {
        raw.apply_watch_overrides(args);
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    gateway: RawGatewaySettings,
    cache: RawCacheSettings,
    session: RawSessionSettings,
    watch: RawWatchSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.api_url.as_ref() {
            self.gateway.base_url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(token) = overrides.token.as_ref() {
            self.session.token = Some(token.clone());
        }
    }

    fn apply_watch_overrides(&mut self, args: &WatchArgs) {
        if let Some(seconds) = args.interval_seconds {
            self.watch.interval_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            gateway,
            cache,
            session,
            watch,
            logging,
        } = raw;

        Ok(Self {
            gateway: build_gateway_settings(gateway)?,
            cache: build_cache_settings(cache)?,
            session: build_session_settings(session),
            watch: build_watch_settings(watch)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_gateway_settings(gateway: RawGatewaySettings) -> Result<GatewaySettings, LoadError> {
    let raw_url = gateway
        .base_url
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("gateway.base_url", format!("invalid URL: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "gateway.base_url",
            format!("unsupported scheme `{}`", base_url.scheme()),
        ));
    }
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "gateway.base_url",
            "URL cannot carry a path",
        ));
    }

    let timeout = positive_seconds(
        gateway.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
        "gateway.timeout_seconds",
    )?;

    Ok(GatewaySettings { base_url, timeout })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let limit = cache.entry_limit.unwrap_or(DEFAULT_ENTRY_LIMIT);
    let limit: usize = limit
        .try_into()
        .map_err(|_| LoadError::invalid("cache.entry_limit", "value exceeds supported range"))?;
    let entry_limit = NonZeroUsize::new(limit)
        .ok_or_else(|| LoadError::invalid("cache.entry_limit", "must be greater than zero"))?;

    let ttl = Duration::from_secs(cache.ttl_seconds.unwrap_or(DEFAULT_TTL_SECS));
    let liked_path = cache.liked_path.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    });

    Ok(CacheSettings {
        entry_limit,
        ttl,
        liked_path,
    })
}

fn build_session_settings(session: RawSessionSettings) -> SessionSettings {
    let token = session.token.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });
    SessionSettings { token }
}

fn build_watch_settings(watch: RawWatchSettings) -> Result<WatchSettings, LoadError> {
    let interval = positive_seconds(
        watch
            .interval_seconds
            .unwrap_or(DEFAULT_WATCH_INTERVAL_SECS),
        "watch.interval_seconds",
    )?;
    Ok(WatchSettings { interval })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGatewaySettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    entry_limit: Option<u64>,
    ttl_seconds: Option<u64>,
    liked_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWatchSettings {
    interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

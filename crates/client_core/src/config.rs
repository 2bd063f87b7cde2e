use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "docqa.toml";

/// What the session shows when the backend cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendUnavailablePolicy {
    /// Keep the last good catalog (flagged stale) and answer failed queries
    /// with a local offline notice.
    Degrade,
    /// Reset the catalog to empty and answer failed queries with a plain apology.
    #[default]
    SurfaceError,
}

impl FromStr for BackendUnavailablePolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "surface-error" | "surface_error" => Ok(Self::SurfaceError),
            other => Err(anyhow!(
                "unknown backend-unavailable policy '{other}' (expected 'degrade' or 'surface-error')"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_root: String,
    pub status_retry_delay: Duration,
    pub toast_duration: Duration,
    pub toast_transition: Duration,
    pub request_timeout: Duration,
    pub on_backend_unavailable: BackendUnavailablePolicy,
    /// Keep polling after a failed status check instead of stopping in Error.
    pub retry_status_on_error: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_root: "http://127.0.0.1:8000/api".into(),
            status_retry_delay: Duration::from_millis(2000),
            toast_duration: Duration::from_millis(4000),
            toast_transition: Duration::from_millis(300),
            request_timeout: Duration::from_secs(90),
            on_backend_unavailable: BackendUnavailablePolicy::default(),
            retry_status_on_error: false,
        }
    }
}

impl Settings {
    pub fn set_api_root(&mut self, raw: &str) -> anyhow::Result<()> {
        self.api_root = normalize_api_root(raw)?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_root: Option<String>,
    status_retry_ms: Option<u64>,
    toast_duration_ms: Option<u64>,
    toast_transition_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    on_backend_unavailable: Option<BackendUnavailablePolicy>,
    retry_status_on_error: Option<bool>,
}

/// Defaults, then the TOML file, then environment overrides.
///
/// A missing default file is fine; a missing file that was asked for
/// explicitly is an error.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let explicit = path.is_some();
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
    }

    apply_env(&mut settings, |name| std::env::var(name).ok())?;
    settings.api_root = normalize_api_root(&settings.api_root)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.api_root {
        settings.api_root = v;
    }
    if let Some(v) = file.status_retry_ms {
        settings.status_retry_delay = Duration::from_millis(v);
    }
    if let Some(v) = file.toast_duration_ms {
        settings.toast_duration = Duration::from_millis(v);
    }
    if let Some(v) = file.toast_transition_ms {
        settings.toast_transition = Duration::from_millis(v);
    }
    if let Some(v) = file.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file.on_backend_unavailable {
        settings.on_backend_unavailable = v;
    }
    if let Some(v) = file.retry_status_on_error {
        settings.retry_status_on_error = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("DOCQA_API_ROOT") {
        settings.api_root = v;
    }
    if let Some(v) = lookup("APP__API_ROOT") {
        settings.api_root = v;
    }
    if let Some(v) = lookup("APP__STATUS_RETRY_MS") {
        settings.status_retry_delay = Duration::from_millis(parse_env("APP__STATUS_RETRY_MS", &v)?);
    }
    if let Some(v) = lookup("APP__TOAST_DURATION_MS") {
        settings.toast_duration = Duration::from_millis(parse_env("APP__TOAST_DURATION_MS", &v)?);
    }
    if let Some(v) = lookup("APP__TOAST_TRANSITION_MS") {
        settings.toast_transition =
            Duration::from_millis(parse_env("APP__TOAST_TRANSITION_MS", &v)?);
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout = Duration::from_secs(parse_env("APP__REQUEST_TIMEOUT_SECS", &v)?);
    }
    if let Some(v) = lookup("APP__ON_BACKEND_UNAVAILABLE") {
        settings.on_backend_unavailable = v.parse()?;
    }
    if let Some(v) = lookup("APP__RETRY_STATUS_ON_ERROR") {
        settings.retry_status_on_error = parse_env("APP__RETRY_STATUS_ON_ERROR", &v)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("{name} has an invalid value '{raw}'"))
}

fn normalize_api_root(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).with_context(|| format!("api root '{raw}' is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("api root '{raw}' must start with http:// or https://");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

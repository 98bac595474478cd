use std::{fs, io::ErrorKind, path::Path};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use shared::domain::{StaffRole, UserId};
use url::Url;

use crate::types::OperatorIdentity;

pub const DEFAULT_SETTINGS_FILE: &str = "portal.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct PortalSettings {
    pub server_url: String,
    pub operator: OperatorIdentity,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            operator: OperatorIdentity::new(UserId(0), "unassigned", StaffRole::Doctor),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    server_url: Option<String>,
    operator_id: Option<i64>,
    operator_name: Option<String>,
    operator_role: Option<StaffRole>,
}

/// Defaults, then `portal.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<PortalSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Same as [`load_settings`] with the file path and variable lookup supplied
/// by the caller. A missing file is skipped; an unreadable or malformed one
/// is an error.
pub fn load_settings_from<F>(path: &Path, env: F) -> anyhow::Result<PortalSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = PortalSettings::default();

    let file_cfg = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<SettingsFile>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => SettingsFile::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.operator_id {
        settings.operator.user_id = UserId(v);
    }
    if let Some(v) = file_cfg.operator_name {
        settings.operator.display_name = v;
    }
    if let Some(v) = file_cfg.operator_role {
        settings.operator.role = v;
    }

    if let Some(v) = env("PORTAL_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("PORTAL_OPERATOR_ID") {
        let parsed = v
            .trim()
            .parse::<i64>()
            .with_context(|| format!("PORTAL_OPERATOR_ID '{v}' is not an integer"))?;
        settings.operator.user_id = UserId(parsed);
    }
    if let Some(v) = env("PORTAL_OPERATOR_NAME") {
        settings.operator.display_name = v;
    }
    if let Some(v) = env("PORTAL_OPERATOR_ROLE") {
        settings.operator.role = v.parse::<StaffRole>().map_err(|err| anyhow!(err))?;
    }

    settings.server_url = normalize_server_url(&settings.server_url)?;
    Ok(settings)
}

pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(PortalSettings::default().server_url);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    Url::parse(&candidate).with_context(|| format!("invalid server url '{raw}'"))?;
    Ok(candidate)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

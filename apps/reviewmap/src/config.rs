use std::{collections::HashMap, fs, path::PathBuf};

use serde::Deserialize;

const SETTINGS_FILE: &str = "reviewmap.toml";
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub profile_path: PathBuf,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            profile_path: PathBuf::from("./data/profile.json"),
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// Flat `key = "value"` table; unknown keys are ignored and an unparsable
/// file leaves the settings untouched.
fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = normalize_api_base_url(v);
    }
    if let Some(v) = file_cfg.get("profile_path") {
        settings.profile_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("REVIEWMAP_API_BASE_URL") {
        settings.api_base_url = normalize_api_base_url(&v);
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = normalize_api_base_url(&v);
    }

    if let Some(v) = lookup("REVIEWMAP_PROFILE_PATH") {
        settings.profile_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("APP__PROFILE_PATH") {
        settings.profile_path = PathBuf::from(v);
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn normalize_api_base_url(raw_api_base_url: &str) -> String {
    let trimmed = raw_api_base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_API_BASE_URL.to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

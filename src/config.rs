// docsync/src/config.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_TITLE_PROPERTY: &str = "Name";

/// Persisted settings, as read from the YAML config file.
/// Every field is optional; environment variables take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notion: NotionSettings,
    pub confluence: ConfluenceSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    pub title_property: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceSettings {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub space_key: Option<String>,
    pub parent_page_id: Option<String>,
}

/// Effective Notion configuration. The database id is kept raw (it may be a URL);
/// the session normalises it.
#[derive(Clone, PartialEq, Eq)]
pub struct NotionConfig {
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    pub title_property: String,
    pub api_base: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        NotionConfig {
            api_key: None,
            database_id: None,
            title_property: DEFAULT_TITLE_PROPERTY.to_string(),
            api_base: NOTION_API_BASE.to_string(),
        }
    }
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_key", &mask_secret(self.api_key.as_deref()))
            .field("database_id", &mask_secret(self.database_id.as_deref()))
            .field("title_property", &self.title_property)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Effective Confluence configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConfluenceConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub space_key: Option<String>,
    pub parent_page_id: Option<String>,
}

impl fmt::Debug for ConfluenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfluenceConfig")
            .field("base_url", &self.base_url)
            .field("username", &mask_secret(self.username.as_deref()))
            .field("api_token", &mask_secret(self.api_token.as_deref()))
            .field("space_key", &self.space_key)
            .field("parent_page_id", &self.parent_page_id)
            .finish()
    }
}

/// Both platforms' effective configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub notion: NotionConfig,
    pub confluence: ConfluenceConfig,
}

impl ResolvedConfig {
    pub fn trace_loaded(&self) {
        info!(
            notion_api_key_set = self.notion.api_key.is_some(),
            notion_database_set = self.notion.database_id.is_some(),
            confluence_base_url = self.confluence.base_url.as_deref().unwrap_or("(not set)"),
            confluence_space_key = self.confluence.space_key.as_deref().unwrap_or("(not set)"),
            "Resolved configuration"
        );
        debug!(?self, "Resolved configuration (masked debug)");
    }

    /// Masked, human-readable summary of the effective configuration.
    pub fn describe(&self) -> String {
        let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "(not set)".to_string());
        [
            "Docs Sync - Effective Configuration (masked)".to_string(),
            "---".to_string(),
            format!("Notion API Key: {}", mask_secret(self.notion.api_key.as_deref())),
            format!("Notion Database ID: {}", mask_secret(self.notion.database_id.as_deref())),
            format!("Notion Title Property: {}", self.notion.title_property),
            String::new(),
            format!("Confluence Base URL: {}", or_unset(&self.confluence.base_url)),
            format!("Confluence Username: {}", mask_secret(self.confluence.username.as_deref())),
            format!("Confluence Space Key: {}", or_unset(&self.confluence.space_key)),
            format!("Confluence Parent Page ID: {}", or_unset(&self.confluence.parent_page_id)),
        ]
        .join("\n")
    }
}

/// Resolves configuration from the process environment, then `settings`.
pub fn resolve(settings: &Settings) -> ResolvedConfig {
    resolve_with(settings, |key| std::env::var(key).ok())
}

/// Resolves every field from `lookup` (the environment) first, then from `settings`.
/// Blank values count as absent.
pub fn resolve_with<F>(settings: &Settings, lookup: F) -> ResolvedConfig
where
    F: Fn(&str) -> Option<String>,
{
    let pick = |env_key: &str, setting: &Option<String>| {
        non_blank(lookup(env_key)).or_else(|| non_blank(setting.clone()))
    };

    let notion = &settings.notion;
    let confluence = &settings.confluence;

    ResolvedConfig {
        notion: NotionConfig {
            api_key: pick("NOTION_API_KEY", &notion.api_key),
            database_id: pick("NOTION_DATABASE_ID", &notion.database_id)
                .map(|id| strip_quotes(&id))
                .and_then(|id| non_blank(Some(id))),
            title_property: pick("NOTION_TITLE_PROPERTY", &notion.title_property)
                .unwrap_or_else(|| DEFAULT_TITLE_PROPERTY.to_string()),
            api_base: NOTION_API_BASE.to_string(),
        },
        confluence: ConfluenceConfig {
            base_url: pick("CONFLUENCE_BASE_URL", &confluence.base_url),
            username: pick("CONFLUENCE_USERNAME", &confluence.username),
            api_token: pick("CONFLUENCE_API_TOKEN", &confluence.api_token),
            space_key: pick("CONFLUENCE_SPACE_KEY", &confluence.space_key),
            parent_page_id: pick("CONFLUENCE_PARENT_PAGE_ID", &confluence.parent_page_id),
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Removes one pair of surrounding quotes, as left behind by quoted `.env` values.
pub fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    trimmed
        .strip_suffix(['"', '\''])
        .unwrap_or(trimmed)
        .to_string()
}

/// Shows only the first and last four characters of a secret.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None | Some("") => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 8 => "****".to_string(),
        Some(s) => {
            let chars: Vec<char> = s.chars().collect();
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

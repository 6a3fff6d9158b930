use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CleanupError, Result};
use crate::models::{Rule, RuleAction};

/// Global settings for one run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub app: AppConfig,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_user_id() -> String {
    "me".to_string()
}

fn default_dry_run() -> bool {
    true
}

fn default_page_size() -> u32 {
    200
}

impl AppConfig {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            user_id: default_user_id(),
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
            dry_run: default_dry_run(),
            page_size: default_page_size(),
        }
    }
}

impl Settings {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CleanupError::ConfigError(format!(
                "Config file not found at {:?}",
                path
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CleanupError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let settings = Self::from_yaml(&content)?;
        tracing::info!("Loaded {} rules from {:?}", settings.rules.len(), path);
        Ok(settings)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(content)
            .map_err(|e| CleanupError::ConfigError(format!("Failed to parse config file: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CleanupError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| CleanupError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| CleanupError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.app.user_id.trim().is_empty() {
            return Err(CleanupError::ConfigError(
                "app.user_id cannot be empty".to_string(),
            ));
        }
        if self.app.page_size == 0 {
            return Err(CleanupError::ConfigError(
                "app.page_size must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(CleanupError::ConfigError(format!(
                    "rules[{}].name cannot be empty",
                    index
                )));
            }
            if rule.query.trim().is_empty() {
                return Err(CleanupError::ConfigError(format!(
                    "rule '{}' has an empty query",
                    rule.name
                )));
            }
            if rule.max_results == 0 {
                return Err(CleanupError::ConfigError(format!(
                    "rule '{}': max_results must be at least 1",
                    rule.name
                )));
            }
            if !seen.insert(rule.name.as_str()) {
                tracing::warn!("Rule name '{}' is used more than once", rule.name);
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// True if any rule asks for permanent deletion
    pub fn uses_delete(&self) -> bool {
        self.rules.iter().any(|r| r.action == RuleAction::Delete)
    }

    /// Example configuration with a single trash rule
    pub fn example() -> Self {
        Self {
            app: AppConfig::new("config/credentials.json", "config/token.json"),
            rules: vec![Rule::new("old-promos", "category:promotions older_than:1y")
                .with_max_results(2000)],
        }
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::example().save(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
app:
  user_id: me
  credentials_path: config/credentials.json
  token_path: config/token.json
  dry_run: false
  page_size: 300
rules:
  - name: old-promos
    query: "category:promotions older_than:1y"
    action: TRASH
    max_results: 250
  - name: spam-purge
    query: "in:spam"
    action: DELETE
    include_spam_trash: true
"#;

    #[test]
    fn test_parse_full_config() {
        let settings = Settings::from_yaml(FULL_CONFIG).unwrap();
        assert_eq!(settings.app.user_id, "me");
        assert!(!settings.app.dry_run);
        assert_eq!(settings.app.page_size, 300);
        assert_eq!(settings.rules.len(), 2);
        assert_eq!(settings.rules[0].name, "old-promos");
        assert_eq!(settings.rules[0].max_results, 250);
        assert_eq!(settings.rules[1].action, RuleAction::Delete);
        assert_eq!(settings.rules[1].max_results, 2000);
        assert!(settings.rules[1].include_spam_trash);
        assert!(settings.uses_delete());
    }

    #[test]
    fn test_app_defaults() {
        let settings = Settings::from_yaml(
            "app:\n  credentials_path: c.json\n  token_path: t.json\n",
        )
        .unwrap();
        assert_eq!(settings.app.user_id, "me");
        assert!(settings.app.dry_run);
        assert_eq!(settings.app.page_size, 200);
        assert!(settings.rules.is_empty());
        assert!(!settings.uses_delete());
    }

    #[test]
    fn test_missing_required_paths() {
        let result = Settings::from_yaml("app:\n  user_id: me\n");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = "app:\n  credentials_path: c\n  token_path: t\nrules:\n  - name: a\n    query: q\n    action: ARCHIVE\n";
        assert!(Settings::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validation_zero_page_size() {
        let mut settings = Settings::example();
        settings.app.page_size = 0;
        let result = settings.validate();
        assert!(result.unwrap_err().to_string().contains("page_size"));
    }

    #[test]
    fn test_validation_empty_user_id() {
        let mut settings = Settings::example();
        settings.app.user_id = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rule_fields() {
        let mut settings = Settings::example();
        settings.rules[0].max_results = 0;
        assert!(settings
            .validate()
            .unwrap_err()
            .to_string()
            .contains("max_results"));

        let mut settings = Settings::example();
        settings.rules[0].query = String::new();
        assert!(settings.validate().unwrap_err().to_string().contains("empty query"));

        let mut settings = Settings::example();
        settings.rules[0].name = String::new();
        assert!(settings.validate().unwrap_err().to_string().contains("name"));
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let mut settings = Settings::example();
        settings.rules.push(settings.rules[0].clone());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_large_page_size_accepted() {
        let mut settings = Settings::example();
        settings.app.page_size = 5000;
        assert!(settings.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Settings::load(Path::new("/tmp/nonexistent-gmail-cleaner-rules.yaml")).await;
        assert!(matches!(result, Err(CleanupError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "app: [unterminated")
            .await
            .unwrap();

        let result = Settings::load(temp_file.path()).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[tokio::test]
    async fn test_create_example_then_load() {
        let temp_file = NamedTempFile::new().unwrap();
        Settings::create_example(temp_file.path()).await.unwrap();

        let loaded = Settings::load(temp_file.path()).await.unwrap();
        assert_eq!(loaded, Settings::example());
        assert!(loaded.app.dry_run);
    }
}

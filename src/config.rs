use crate::analyzer::muscle::MuscleRules;
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".liftlens";
const CONFIG_FILE: &str = "config.json";
const MUSCLE_RULES_FILE: &str = "muscle_rules.json";
pub const DEFAULT_USER_ID: &str = "local";
pub const DEFAULT_RECENT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_port: u16,
    pub user_id: String,
    pub recent_window_days: u32,
    pub weekly_target_workouts: u32,
    pub muscle_rules_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("workouts.db"),
            api_port: 7891,
            user_id: DEFAULT_USER_ID.to_string(),
            recent_window_days: DEFAULT_RECENT_WINDOW_DAYS,
            weekly_target_workouts: 3,
            muscle_rules_path: root.join(MUSCLE_RULES_FILE),
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        if !self.muscle_rules_path.exists() {
            write_default_muscle_rules(&self.muscle_rules_path)?;
        }

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "user_id" => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    bail!("user_id must not be empty");
                }
                self.user_id = trimmed.to_string();
            }
            "recent_window_days" => {
                let days = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("recent_window_days must be a number"))?;
                if days == 0 {
                    bail!("recent_window_days must be at least 1");
                }
                self.recent_window_days = days;
            }
            "weekly_target_workouts" => {
                self.weekly_target_workouts = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("weekly_target_workouts must be a number"))?;
            }
            "muscle_rules_path" => {
                self.muscle_rules_path = expand_home(value);
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, api_port|api.port, user_id|user.id, recent_window_days|dashboard.window_days, weekly_target_workouts|dashboard.weekly_target, muscle_rules_path|muscle_rules.path"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "user_id" => Some(self.user_id.clone()),
            "recent_window_days" => Some(self.recent_window_days.to_string()),
            "weekly_target_workouts" => Some(self.weekly_target_workouts.to_string()),
            "muscle_rules_path" => Some(self.muscle_rules_path.display().to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "api_port" | "api.port" => "api_port",
        "user_id" | "user.id" => "user_id",
        "recent_window_days" | "dashboard.window_days" => "recent_window_days",
        "weekly_target_workouts" | "dashboard.weekly_target" => "weekly_target_workouts",
        "muscle_rules_path" | "muscle_rules.path" => "muscle_rules_path",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn write_default_muscle_rules(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create muscle rules directory: {}", parent.display())
        })?;
    }

    let content = serde_json::to_string_pretty(&MuscleRules::default())
        .context("Failed to serialize default muscle rules")?;
    fs::write(path, content).with_context(|| {
        format!(
            "Failed to create default muscle rules file: {}",
            path.display()
        )
    })?;
    set_mode_600(path)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Config, write_default_muscle_rules};
    use crate::analyzer::muscle::MuscleRules;

    #[test]
    fn dotted_aliases_resolve_to_fields() {
        let mut config = Config::default();

        config.set_value("dashboard.weekly_target", "4").expect("set");
        config.set_value("user.id", " lifter-1 ").expect("set");

        assert_eq!(config.weekly_target_workouts, 4);
        assert_eq!(config.get_value("user_id").as_deref(), Some("lifter-1"));
        assert_eq!(config.get_value("dashboard.window_days").as_deref(), Some("30"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Config::default();

        assert!(config.set_value("api.port", "eighty").is_err());
        assert!(config.set_value("recent_window_days", "0").is_err());
        assert!(config.set_value("user_id", "   ").is_err());
        assert!(config.set_value("report_time", "23:30").is_err());
        assert!(config.get_value("report_time").is_none());
    }

    #[test]
    fn partial_config_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"api_port": 9000}"#).expect("config");

        assert_eq!(config.api_port, 9000);
        assert_eq!(config.recent_window_days, 30);
        assert_eq!(config.user_id, "local");
    }

    #[test]
    fn default_muscle_rules_file_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules").join("muscle_rules.json");

        write_default_muscle_rules(&path).expect("written");

        assert_eq!(MuscleRules::load(&path).expect("loaded"), MuscleRules::default());
    }
}

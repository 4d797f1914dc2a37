use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use crate::calendar::Locale;
use crate::coords::ZoomLevel;
use crate::engine::EngineOptions;
use crate::progress::Weighting;

/// Project directory holding the board and config files.
pub const PROJECT_DIR: &str = ".sprintline";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// First day of a week-zoom header segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl From<WeekStart> for Weekday {
    fn from(value: WeekStart) -> Self {
        match value {
            WeekStart::Sunday => Self::Sun,
            WeekStart::Monday => Self::Mon,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default)]
    pub zoom: ZoomLevel,
    #[serde(default)]
    pub week_start: WeekStart,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default)]
    pub weighting: Weighting,
}

impl ProjectConfig {
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            zoom: self.timeline.zoom,
            week_start: self.timeline.week_start.into(),
            locale: self.calendar.locale,
            weighting: self.progress.weighting,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Read `.sprintline/config.toml` under `project_root`. A missing file yields defaults.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read the per-user config from the platform config directory.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("sprintline/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config, and the output-mode overrides.
///
/// # Errors
///
/// Propagates config load failures.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("SPRINTLINE_FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(cli_json: bool, user_output: Option<&str>, env_format: Option<&str>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with(config: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir must be created");
        let sprintline = dir.path().join(PROJECT_DIR);
        std::fs::create_dir_all(&sprintline).expect("create project dir");
        std::fs::write(sprintline.join("config.toml"), config).expect("write config");
        dir
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.timeline.zoom, ZoomLevel::Month);
        assert_eq!(cfg.timeline.week_start, WeekStart::Sunday);
        assert_eq!(cfg.calendar.locale, Locale::Poland);
        assert_eq!(cfg.progress.weighting, Weighting::WorkingDays);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let root = project_with(
            r#"
[timeline]
zoom = "week"
week_start = "monday"

[progress]
weighting = "calendar"
"#,
        );
        let cfg = load_project_config(root.path()).expect("load should succeed");
        let options = cfg.engine_options();
        assert_eq!(options.zoom, ZoomLevel::Week);
        assert_eq!(options.week_start, Weekday::Mon);
        assert_eq!(options.locale, Locale::Poland);
        assert_eq!(options.weighting, Weighting::Calendar);
    }

    #[test]
    fn unknown_values_are_parse_errors() {
        let root = project_with("[timeline]\nzoom = \"decade\"\n");
        let err = load_project_config(root.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn weekends_only_locale_parses() {
        let root = project_with("[calendar]\nlocale = \"weekends-only\"\n");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.calendar.locale, Locale::WeekendsOnly);
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_beats_user_and_aliases_are_normalized() {
        assert_eq!(resolve_output(false, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("human"), Some("table")), "text");
        assert_eq!(resolve_output(false, Some("json"), Some("bogus")), "json");
    }

    #[test]
    fn user_config_parses_output() {
        let cfg: UserConfig = toml::from_str("output = \"json\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
    }
}

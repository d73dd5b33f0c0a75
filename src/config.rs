// File: ./src/config.rs
// Portal constants, output locations and the institution's schedule layout
use crate::model::DayCodes;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory before the per-user one.
pub const LOCAL_CONFIG_FILE: &str = "schedscrape.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub school_id: String,
    pub group_ids: Vec<String>,
    pub form_build_id: String,
    pub form_id: String,
    pub page_size: u32,
    pub retry_margin_ms: u64,
    pub allow_insecure_certs: bool,
    pub output: OutputPaths,
    pub schedule: ScheduleLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://bca.schoology.com".to_string(),
            school_id: "11897239".to_string(),
            group_ids: vec!["2233228305".to_string()],
            form_build_id: "489d854-djh1fsa2DkrmcVrso_nzX105TaBTc4arsSHbbof2FZI".to_string(),
            form_id: "s_user_login_form".to_string(),
            page_size: 30,
            retry_margin_ms: 250,
            allow_insecure_certs: false,
            output: OutputPaths::default(),
            schedule: ScheduleLayout::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub student_file: String,
    pub course_file: String,
    pub translated_student_file: String,
    pub translated_course_file: String,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            student_file: "studentdata.csv".to_string(),
            course_file: "coursedata.csv".to_string(),
            translated_student_file: "translated-studentdata.csv".to_string(),
            translated_course_file: "translated-coursedata.csv".to_string(),
        }
    }
}

impl OutputPaths {
    pub fn student_path(&self) -> PathBuf {
        self.dir.join(&self.student_file)
    }

    pub fn course_path(&self) -> PathBuf {
        self.dir.join(&self.course_file)
    }

    pub fn translated_student_path(&self) -> PathBuf {
        self.dir.join(&self.translated_student_file)
    }

    pub fn translated_course_path(&self) -> PathBuf {
        self.dir.join(&self.translated_course_file)
    }
}

/// Shape of the institution's week: which letters name the days and how
/// many numbered slots a day has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleLayout {
    pub day_codes: String,
    pub day_names: Vec<String>,
    pub slot_label: String,
    pub slot_count: u32,
}

impl Default for ScheduleLayout {
    fn default() -> Self {
        Self {
            day_codes: "ABCDE".to_string(),
            day_names: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            slot_label: "Period".to_string(),
            slot_count: 9,
        }
    }
}

impl ScheduleLayout {
    /// Lines per student block: identity, header, one per slot, separator.
    pub fn stride(&self) -> usize {
        self.slot_count as usize + 3
    }

    pub fn header_line(&self) -> String {
        let mut line = self.slot_label.clone();
        for name in &self.day_names {
            line.push(',');
            line.push_str(name);
        }
        line
    }

    pub fn day_codes(&self) -> Result<DayCodes> {
        DayCodes::parse(&self.day_codes)
    }
}

impl Config {
    pub fn get_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        if let Some(proj) = ProjectDirs::from("com", "schedscrape", "schedscrape") {
            let path = proj.config_dir().join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Loads the first config file found, or the built-in defaults.
    pub fn load() -> Result<Self> {
        match Self::get_path() {
            Some(path) => Self::load_from(&path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule.day_codes()?;
        if self.schedule.day_names.len() != crate::model::DAYS_PER_WEEK {
            bail!(
                "schedule.day_names needs {} entries, got {}",
                crate::model::DAYS_PER_WEEK,
                self.schedule.day_names.len()
            );
        }
        if self.schedule.slot_count == 0 {
            bail!("schedule.slot_count must be at least 1");
        }
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.group_ids.is_empty() {
            bail!("group_ids must name at least one group");
        }
        Ok(())
    }

    pub fn retry_margin(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_margin_ms)
    }
}

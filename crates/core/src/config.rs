use crate::rewriter::{DeviceStamp, DEFAULT_SEGMENT_LIMIT};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Location of the catalog inside a Monument installation root.
pub const CATALOG_RELATIVE_PATH: &str = "monument/.userdata/m.sqlite3";

/// Persisted defaults. Command line flags are layered on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub flatten: bool,
    pub save_edits: bool,
    pub save_comments: bool,
    pub export_gps: bool,
    pub export_tags: bool,
    pub tags_as_folders: bool,
    pub edited_make: String,
    pub edited_model: String,
    pub segment_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            flatten: false,
            save_edits: false,
            save_comments: false,
            export_gps: false,
            export_tags: false,
            tags_as_folders: false,
            edited_make: "Monument".to_string(),
            edited_model: "Monument Photo Editor".to_string(),
            segment_limit: DEFAULT_SEGMENT_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("org", "monument-export", "monument-export")
        .context("could not determine the platform configuration directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read config file: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("could not parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(&paths.config_path, config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("could not serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("could not write config file: {}", path.display()))?;
    Ok(())
}

/// Fully resolved options for one export run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOptions {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub flatten: bool,
    pub save_edits: bool,
    pub save_comments: bool,
    pub export_gps: bool,
    pub export_tags: bool,
    pub tags_as_folders: bool,
    pub dry_run: bool,
    pub edited_device: DeviceStamp,
    pub segment_limit: usize,
}

impl ExportOptions {
    pub fn from_config(source: PathBuf, destination: PathBuf, config: &AppConfig) -> Self {
        Self {
            source,
            destination,
            flatten: config.flatten,
            save_edits: config.save_edits,
            save_comments: config.save_comments,
            export_gps: config.export_gps,
            export_tags: config.export_tags,
            tags_as_folders: config.tags_as_folders,
            dry_run: false,
            edited_device: DeviceStamp {
                make: config.edited_make.clone(),
                model: config.edited_model.clone(),
            },
            segment_limit: config.segment_limit,
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.source.join(CATALOG_RELATIVE_PATH)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.source.exists() {
            anyhow::bail!("source directory does not exist: {}", self.source.display());
        }
        if !self.source.is_dir() {
            anyhow::bail!("source path is not a directory: {}", self.source.display());
        }
        let catalog = self.catalog_path();
        if !catalog.is_file() {
            anyhow::bail!(
                "catalog not found at {}; the source must be the root of a Monument installation",
                catalog.display()
            );
        }
        if self.destination.exists() && !self.destination.is_dir() {
            anyhow::bail!(
                "destination path is not a directory: {}",
                self.destination.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_file_gives_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_config_from(&temp.path().join("nope.toml")).expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "export_gps = true\nedited_make = \"Acme\"\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert!(config.export_gps);
        assert!(!config.flatten);
        assert_eq!(config.edited_make, "Acme");
        assert_eq!(config.segment_limit, DEFAULT_SEGMENT_LIMIT);
    }

    #[test]
    fn saved_config_loads_back() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested/config.toml");
        let config = AppConfig {
            flatten: true,
            segment_limit: 4096,
            ..AppConfig::default()
        };

        save_config_to(&path, &config).expect("save");
        assert_eq!(load_config_from(&path).expect("load"), config);
    }

    #[test]
    fn broken_config_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "export_gps = \"maybe\"").expect("write");
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn validate_requires_catalog() {
        let temp = tempdir().expect("tempdir");
        let options = ExportOptions::from_config(
            temp.path().to_path_buf(),
            temp.path().join("out"),
            &AppConfig::default(),
        );
        let err = options.validate().expect_err("no catalog");
        assert!(err.to_string().contains("catalog not found"));

        let catalog = options.catalog_path();
        fs::create_dir_all(catalog.parent().expect("parent")).expect("mkdir");
        fs::write(&catalog, b"").expect("write catalog");
        options.validate().expect("valid");
    }

    #[test]
    fn validate_rejects_missing_source() {
        let temp = tempdir().expect("tempdir");
        let options = ExportOptions::from_config(
            temp.path().join("missing"),
            temp.path().join("out"),
            &AppConfig::default(),
        );
        let err = options.validate().expect_err("missing source");
        assert!(err.to_string().contains("does not exist"));
    }
}

//! Service settings: an optional TOML file, then environment overrides.
//!
//! ```toml
//! addr = "127.0.0.1:3001"
//! data_dir = "data"
//!
//! [form222]
//! background = "assets/form222.png"
//! background_opacity = 0.35
//! show_grid = false
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::SettingsError;

pub const CONFIG_ENV: &str = "RXRETURNS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "rxreturns.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub form222: Form222Settings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            data_dir: PathBuf::from("data"),
            form222: Form222Settings::default(),
        }
    }
}

/// Calibration aids for the Form 222 overlay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Form222Settings {
    pub background: Option<PathBuf>,
    pub background_opacity: f32,
    pub show_grid: bool,
}

impl Default for Form222Settings {
    fn default() -> Self {
        Form222Settings {
            background: None,
            background_opacity: 0.35,
            show_grid: false,
        }
    }
}

impl Settings {
    /// Reads the file named by `RXRETURNS_CONFIG` (or `rxreturns.toml` if
    /// present) and applies environment overrides. An explicitly named file
    /// must exist.
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Settings::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Applies `RXRETURNS_ADDR`, `RXRETURNS_DATA_DIR`, `FORM222_BACKGROUND`
    /// and `FORM222_GRID` as returned by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("RXRETURNS_ADDR") {
            self.addr = addr.parse().map_err(|_| SettingsError::InvalidValue {
                key: "RXRETURNS_ADDR",
                value: addr.clone(),
            })?;
        }
        if let Some(dir) = lookup("RXRETURNS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("FORM222_BACKGROUND") {
            self.form222.background = (!path.trim().is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(flag) = lookup("FORM222_GRID") {
            self.form222.show_grid = parse_flag(&flag).ok_or(SettingsError::InvalidValue {
                key: "FORM222_GRID",
                value: flag.clone(),
            })?;
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.addr.port(), 3001);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert!(settings.form222.background.is_none());
        assert!(!settings.form222.show_grid);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rxreturns.toml");
        std::fs::write(
            &path,
            r#"
addr = "0.0.0.0:8080"

[form222]
background = "form.png"
show_grid = true
"#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.addr.port(), 8080);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.form222.background, Some(PathBuf::from("form.png")));
        assert!(settings.form222.show_grid);
        assert_eq!(settings.form222.background_opacity, 0.35);
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.toml");
        assert!(matches!(
            Settings::from_file(&missing),
            Err(SettingsError::FileNotFound(_))
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "addr = [").unwrap();
        assert!(matches!(Settings::from_file(&bad), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(env(&[
                ("RXRETURNS_ADDR", "127.0.0.1:9000"),
                ("RXRETURNS_DATA_DIR", "/var/lib/rx"),
                ("FORM222_BACKGROUND", "/tmp/form.png"),
                ("FORM222_GRID", "1"),
            ]))
            .unwrap();

        assert_eq!(settings.addr.port(), 9000);
        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/rx"));
        assert_eq!(settings.form222.background, Some(PathBuf::from("/tmp/form.png")));
        assert!(settings.form222.show_grid);
    }

    #[test]
    fn test_invalid_overrides() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.apply_overrides(env(&[("RXRETURNS_ADDR", "localhost")])),
            Err(SettingsError::InvalidValue { key: "RXRETURNS_ADDR", .. })
        ));
        assert!(matches!(
            settings.apply_overrides(env(&[("FORM222_GRID", "maybe")])),
            Err(SettingsError::InvalidValue { key: "FORM222_GRID", .. })
        ));
    }
}

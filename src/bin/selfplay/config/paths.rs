use std::path::{Path, PathBuf};

use super::error::ConfigError;

const APP_DIR: &str = "selfplay";

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl ConfigPaths {
    /// `~/.config/selfplay/config.toml` unless `config_override` points
    /// elsewhere; logs always live under `~/.local/share/selfplay/logs`.
    pub fn resolve(config_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::MissingHome)?;
        Ok(Self::under(&home, config_override))
    }

    fn under(home: &Path, config_override: Option<PathBuf>) -> Self {
        let data_dir = home.join(".local").join("share").join(APP_DIR);
        let logs_dir = data_dir.join("logs");
        match config_override {
            Some(config_file) => {
                let config_dir = config_file
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                Self {
                    config_file,
                    config_dir,
                    data_dir,
                    logs_dir,
                }
            }
            None => {
                let config_dir = home.join(".config").join(APP_DIR);
                Self {
                    config_file: config_dir.join("config.toml"),
                    config_dir,
                    data_dir,
                    logs_dir,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_under_home() {
        let paths = ConfigPaths::under(Path::new("/home/ada"), None);
        assert_eq!(
            paths.config_file,
            PathBuf::from("/home/ada/.config/selfplay/config.toml")
        );
        assert_eq!(
            paths.logs_dir,
            PathBuf::from("/home/ada/.local/share/selfplay/logs")
        );
    }

    #[test]
    fn override_keeps_its_directory() {
        let paths = ConfigPaths::under(Path::new("/home/ada"), Some(PathBuf::from("/tmp/sp.toml")));
        assert_eq!(paths.config_dir, PathBuf::from("/tmp"));
        assert_eq!(paths.config_file, PathBuf::from("/tmp/sp.toml"));
    }
}

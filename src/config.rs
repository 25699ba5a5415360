use crate::error::CompilerError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_PATTERN: &str = r"(?i)\.psc$";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub scripts_dir: PathBuf,
    #[serde(default = "default_source_pattern")]
    pub source_pattern: String,
    /// Worker threads for `check`. 0 means one per available core.
    #[serde(default)]
    pub jobs: usize,
    #[serde(skip)]
    pub env_name: String,
}

fn default_source_pattern() -> String {
    String::from(DEFAULT_SOURCE_PATTERN)
}

fn env_name() -> String {
    env::var("PAPYRUS_ENV").unwrap_or_else(|_| String::from("default"))
}

fn home_dir() -> PathBuf {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    PathBuf::from(env::var(var).unwrap_or_else(|_| String::from(".")))
}

impl Default for Config {
    fn default() -> Self {
        let scripts_dir = match env::var("PAPYRUS_SCRIPTS_DIR") {
            Ok(custom_dir) => PathBuf::from(custom_dir),
            Err(_) => PathBuf::from("."),
        };

        Config {
            scripts_dir,
            source_pattern: default_source_pattern(),
            jobs: 0,
            env_name: env_name(),
        }
    }
}

impl Config {
    /// Reads the config for the current environment. A missing or unreadable
    /// file yields the defaults; `PAPYRUS_SCRIPTS_DIR` always wins.
    pub fn load() -> Self {
        let config_path = Self::get_config_path();
        let mut config = match Self::read(&config_path) {
            Ok(config) => config,
            Err(error) => {
                tracing::debug!(path = %config_path.display(), %error, "using default config");
                Config::default()
            }
        };

        config.env_name = env_name();
        if let Ok(custom_dir) = env::var("PAPYRUS_SCRIPTS_DIR") {
            config.scripts_dir = PathBuf::from(custom_dir);
        }
        config
    }

    pub fn read(path: &Path) -> Result<Self, CompilerError> {
        if !path.exists() {
            return Err(CompilerError::FileNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path).map_err(|source| CompilerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<PathBuf, CompilerError> {
        let config_path = Self::get_config_path();
        let io_error = |source| CompilerError::Io {
            path: config_path.clone(),
            source,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents).map_err(io_error)?;
        Ok(config_path)
    }

    /// `$HOME/.papyrus/<PAPYRUS_ENV>/config.json`
    pub fn get_config_path() -> PathBuf {
        home_dir()
            .join(".papyrus")
            .join(env_name())
            .join("config.json")
    }

    pub fn source_regex(&self) -> Result<Regex, CompilerError> {
        Ok(Regex::new(&self.source_pattern)?)
    }

    /// The configured worker count, resolving 0 to the machine's parallelism.
    pub fn worker_count(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_pattern_matches_psc_files() {
        let regex = Config::default().source_regex().unwrap();
        assert!(regex.is_match("Scripts/Source/MyQuest.psc"));
        assert!(regex.is_match("LOUD.PSC"));
        assert!(!regex.is_match("MyQuest.pex"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let config = Config {
            source_pattern: String::from("(unclosed"),
            ..Config::default()
        };
        assert!(matches!(config.source_regex(), Err(CompilerError::Pattern(_))));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "scripts_dir": "/data/scripts" }}"#).unwrap();

        let config = Config::read(file.path()).unwrap();
        assert_eq!(config.scripts_dir, PathBuf::from("/data/scripts"));
        assert_eq!(config.source_pattern, DEFAULT_SOURCE_PATTERN);
        assert_eq!(config.jobs, 0);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Config::read(file.path()),
            Err(CompilerError::Config(_))
        ));
    }

    #[test]
    fn explicit_jobs_win() {
        let config = Config {
            jobs: 3,
            ..Config::default()
        };
        assert_eq!(config.worker_count(), 3);
        assert!(Config::default().worker_count() >= 1);
    }
}

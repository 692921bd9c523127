use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(about = "Runs the library catalog web service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".catalog")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_enforce_foreign_keys")]
    pub enforce_foreign_keys: bool,
}

fn default_database() -> String {
    "library.sqlite3".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_enforce_foreign_keys() -> bool {
    true
}

impl Default for App {
    fn default() -> Self {
        App {
            database: default_database(),
            host: default_host(),
            port: default_port(),
            enforce_foreign_keys: default_enforce_foreign_keys(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_keys_missing() {
        let cfg = Config::from_yaml("app: {}\n").unwrap();
        assert_eq!(cfg.app.get_db(), "library.sqlite3");
        assert_eq!(cfg.app.get_address(), "0.0.0.0:5000");
        assert!(cfg.app.enforce_foreign_keys);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
app:
  database: ":memory:"
  host: 127.0.0.1
  port: 8080
  enforce_foreign_keys: false
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_db(), ":memory:");
        assert_eq!(cfg.app.get_port(), 8080);
        assert_eq!(cfg.app.get_address(), "127.0.0.1:8080");
        assert!(!cfg.app.enforce_foreign_keys);
    }

    #[test]
    fn test_env_substitution_with_default() {
        let yaml = "app:\n  port: ${CATALOG_TEST_UNSET_PORT:-6001}\n  database: ${CATALOG_TEST_UNSET_DB:-shelf.db}\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_port(), 6001);
        assert_eq!(cfg.app.get_db(), "shelf.db");
    }

    #[test]
    fn test_unterminated_placeholder_is_left_alone() {
        let raw = "app:\n  database: ${CATALOG_TEST_UNSET_DB:-shelf.db\n";
        let substituted = Config::substitute_env_vars(raw).unwrap();
        assert_eq!(substituted, raw);

        let mixed = "a: ${CATALOG_TEST_UNSET_A:-one}\nb: ${CATALOG_TEST_UNSET_B\n";
        let substituted = Config::substitute_env_vars(mixed).unwrap();
        assert_eq!(substituted, "a: one\nb: ${CATALOG_TEST_UNSET_B\n");
    }

    #[test]
    fn test_env_substitution_from_environment() {
        let home = env::var("PATH").unwrap_or_default();
        let substituted = Config::substitute_env_vars("path: ${PATH}").unwrap();
        assert_eq!(substituted, format!("path: {}", home));
    }
}

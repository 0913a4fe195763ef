//! Handles settings for the application. Configuration is written in
//! `config/hsa.toml` (or the file named by `HSA_CONFIG`) and can be
//! overridden with `HSA_`-prefixed environment variables, using `__` between
//! nested keys (e.g. `HSA_SERVER__PORT=9000`).

use std::{net::IpAddr, path::PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/hsa.toml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("hsa.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ocr {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for Ocr {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub root: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/data/hsa"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Selection {
    /// Most eligible receipts a deduction searches over.
    pub max_candidates: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            max_candidates: engine::DEFAULT_MAX_CANDIDATES,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub server: Server,
    pub ocr: Ocr,
    pub storage: Storage,
    pub household: String,
    pub selection: Selection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: App::default(),
            database: Database::default(),
            server: Server::default(),
            ocr: Ocr::default(),
            storage: Storage::default(),
            household: engine::DEFAULT_HOUSEHOLD.to_string(),
            selection: Selection::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var("HSA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("HSA").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = from_toml("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database, Database::Sqlite("hsa.db".to_string()));
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.ocr.url, "http://localhost:8001");
        assert_eq!(settings.storage.root, PathBuf::from("/data/hsa"));
        assert_eq!(settings.household, "household");
        assert_eq!(settings.selection.max_candidates, 25);
    }

    #[test]
    fn reads_nested_sections() {
        let settings = from_toml(
            r#"
            household = "smiths"
            database = "memory"

            [server]
            bind = "0.0.0.0"
            port = 9000

            [ocr]
            url = "http://ocr:8001"
            timeout_secs = 5

            [storage]
            root = "/srv/receipts"
            "#,
        );
        assert_eq!(settings.household, "smiths");
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.server.bind, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.ocr.timeout_secs, 5);
        assert_eq!(settings.storage.root, PathBuf::from("/srv/receipts"));
    }

    #[test]
    fn sqlite_path_is_a_table() {
        let settings = from_toml(
            r#"
            [database]
            sqlite = "/var/lib/hsa/hsa.db"
            "#,
        );
        assert_eq!(
            settings.database,
            Database::Sqlite("/var/lib/hsa/hsa.db".to_string())
        );
    }
}

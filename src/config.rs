use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use config::{Config, Environment, File};
use regex::Regex;
use serde::Deserialize;

use crate::error::SettingsError;

pub const CONFIG_ENV: &str = "COMPANY_MASTER_CONFIG";
const DEFAULT_FILE: &str = "company_master.toml";

static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// One collector table, processed in list order during `merge`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub table: String,
}

impl SourceSpec {
    fn new(name: &str, table: &str) -> Self {
        SourceSpec {
            name: name.to_string(),
            table: table.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceSpec>,
    #[serde(default = "default_master_table")]
    pub master_table: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/companies.sqlite")
}

fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new("seed", "companies_seed"),
        SourceSpec::new("enriched", "enriched_companies"),
        SourceSpec::new("jobs_detailed", "jobs_detailed"),
        SourceSpec::new("jobs_simple", "jobs_simplified"),
    ]
}

fn default_master_table() -> String {
    "companies_master".to_string()
}

fn default_top_n() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: default_db_path(),
            sources: default_sources(),
            master_table: default_master_table(),
            top_n: default_top_n(),
        }
    }
}

impl Settings {
    /// Defaults, then `company_master.toml` (or `$COMPANY_MASTER_CONFIG`), then
    /// `COMPANY_MASTER_*` environment variables.
    pub fn load() -> Result<Self, SettingsError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("COMPANY_MASTER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Table names end up inside SQL text, so they must be plain identifiers.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.sources.is_empty() {
            return Err(SettingsError::NoSources);
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(SettingsError::DuplicateSource(source.name.clone()));
            }
            check_table(&source.table)?;
        }
        check_table(&self.master_table)
    }

    pub fn source(&self, name: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.name == name)
    }
}

fn check_table(table: &str) -> Result<(), SettingsError> {
    if TABLE_NAME_RE.is_match(table) {
        Ok(())
    } else {
        Err(SettingsError::InvalidTable(table.to_string()))
    }
}

//! Process configuration read from the environment

use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;
use crate::services::draft_manager::DEFAULT_SEARCH_LIMIT;
use crate::services::CART_KEY;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub nats_url: Option<String>,
    pub changes_subject: String,
    /// In-memory cart storage when unset.
    pub cart_store_dir: Option<PathBuf>,
    pub cart_key: String,
    pub currency: String,
    /// Staff account signed in on this terminal.
    pub pos_operator_id: Option<Uuid>,
    pub edge_function_url: Option<String>,
    pub edge_function_key: Option<String>,
    pub search_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            port: parsed(&get, "PORT")?.unwrap_or(8083),
            database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            nats_url: get("NATS_URL"),
            changes_subject: or("CHANGES_SUBJECT", "db.changes"),
            cart_store_dir: get("CART_STORE_DIR").map(PathBuf::from),
            cart_key: or("CART_KEY", CART_KEY),
            currency: or("CURRENCY", "VND"),
            pos_operator_id: parsed(&get, "POS_OPERATOR_ID")?,
            edge_function_url: get("EDGE_FUNCTION_URL"),
            edge_function_key: get("EDGE_FUNCTION_KEY"),
            search_limit: parsed(&get, "SEARCH_LIMIT")?.filter(|n| *n > 0).unwrap_or(DEFAULT_SEARCH_LIMIT),
        })
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    match get(name) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid { name, value }),
    }
}
